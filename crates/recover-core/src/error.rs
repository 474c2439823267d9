use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Invalid recording: {0}")]
    Recording(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RecoverError>;
