pub mod regenerate;
pub mod result;
pub mod status;
pub mod upload;

pub async fn healthz() -> &'static str {
    "ok"
}
