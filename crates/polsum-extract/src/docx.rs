//! DOCX text extraction: read `word/document.xml` out of the ZIP
//! container and collect the `w:t` runs, with paragraph and line breaks
//! preserved.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use tokio_util::sync::CancellationToken;

use polsum_core::MediaType;

use crate::config::ExtractionConfig;
use crate::strategy::{ExtractionStrategy, SpooledDocument, StrategyFuture, StrategyYield};
use crate::ExtractError;

pub struct DocxStrategy;

impl ExtractionStrategy for DocxStrategy {
    fn name(&self) -> &'static str {
        "docx-xml"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Docx
    }

    fn budget(&self, config: &ExtractionConfig) -> std::time::Duration {
        config.structural_timeout
    }

    fn extract<'a>(
        &'a self,
        doc: &'a SpooledDocument,
        _config: &'a ExtractionConfig,
        cancel: &'a CancellationToken,
    ) -> StrategyFuture<'a> {
        Box::pin(async move {
            let data = doc.bytes().to_vec();
            let handle = tokio::task::spawn_blocking(move || extract_docx_text(&data));

            let text = tokio::select! {
                _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                joined = handle => match joined {
                    Ok(result) => result?,
                    Err(_) => return Err(ExtractError::Extraction("docx parser panicked".into())),
                },
            };

            // DOCX has no fixed pagination; the whole body counts as one page.
            Ok(StrategyYield {
                text,
                pages_recovered: 1,
                total_pages: 1,
            })
        })
    }
}

/// Pull visible text out of a DOCX byte buffer.
pub(crate) fn extract_docx_text(data: &[u8]) -> Result<String, ExtractError> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractError::Open(format!("not a DOCX container: {e}")))?;

    let mut xml = String::new();
    {
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Open(format!("missing word/document.xml: {e}")))?;
        entry
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError::Extraction(format!("unreadable document.xml: {e}")))?;
    }

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| ExtractError::Extraction(format!("malformed document.xml: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                // Paragraph boundary: blank line, like the PDF extractors.
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:br" => out.push('\n'),
                b"w:tab" => out.push('\t'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| ExtractError::Extraction(format!("bad text run: {e}")))?;
                out.push_str(&unescaped);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>{body_xml}</w:body>
</w:document>"#
        );

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn extracts_text_runs_with_paragraphs() {
        let data = docx_with_body(
            "<w:p><w:r><w:t>Coverage A: Dwelling.</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Coverage B: Liability.</w:t></w:r></w:p>",
        );
        let text = extract_docx_text(&data).unwrap();
        assert!(text.contains("Coverage A: Dwelling."));
        assert!(text.contains("\n\n"));
        assert!(text.contains("Coverage B: Liability."));
    }

    #[test]
    fn line_breaks_and_tabs_are_preserved() {
        let data = docx_with_body(
            "<w:p><w:r><w:t>limit</w:t><w:tab/><w:t>$500,000</w:t><w:br/><w:t>per claim</w:t></w:r></w:p>",
        );
        let text = extract_docx_text(&data).unwrap();
        assert!(text.contains("limit\t$500,000\nper claim"));
    }

    #[test]
    fn xml_entities_are_unescaped() {
        let data = docx_with_body("<w:p><w:r><w:t>Smith &amp; Sons</w:t></w:r></w:p>");
        let text = extract_docx_text(&data).unwrap();
        assert!(text.contains("Smith & Sons"));
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let data = docx_with_body(
            "<w:p><w:pPr>style noise</w:pPr><w:r><w:t>real text</w:t></w:r></w:p>",
        );
        let text = extract_docx_text(&data).unwrap();
        assert!(text.contains("real text"));
        assert!(!text.contains("style noise"));
    }

    #[test]
    fn non_zip_bytes_fail_to_open() {
        let err = extract_docx_text(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Open(_)));
    }

    #[test]
    fn zip_without_document_xml_fails_to_open() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("other.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"hello").unwrap();
            writer.finish().unwrap();
        }
        let err = extract_docx_text(&cursor.into_inner()).unwrap_err();
        assert!(matches!(err, ExtractError::Open(_)));
    }
}
