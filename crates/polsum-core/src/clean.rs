//! Normalization of raw extracted text.
//!
//! Extractor output is messy in predictable ways: typographic ligatures,
//! stray control characters from content streams, and whitespace runs
//! from column layouts. Cleaning collapses those while preserving
//! paragraph breaks, which the chunker and the summary completeness
//! heuristic both rely on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Normalize raw extracted text: expand ligatures, strip control
/// characters, collapse horizontal whitespace runs, and cap consecutive
/// blank lines at one (so paragraph boundaries survive as `\n\n`).
pub fn clean_text(raw: &str) -> String {
    static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
    static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

    let text = expand_ligatures(raw);

    // Drop control characters except newlines and tabs; form feeds
    // become page-break newlines since extractors emit them between pages.
    let text: String = text
        .chars()
        .map(|c| if c == '\u{C}' { '\n' } else { c })
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect();

    let text = HORIZONTAL_WS.replace_all(&text, " ");

    // Trim trailing spaces per line before collapsing blank runs.
    let text: String = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
