#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] phpls_parser::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
