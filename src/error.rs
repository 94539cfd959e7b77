use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("unknown agency: {0}")]
    UnknownAgency(String),

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("browser error: {0}")]
    Browser(String),
}
