use miette::Diagnostic;
use thiserror::Error;

/// Main error type for recolour operations
#[derive(Error, Diagnostic, Debug)]
pub enum RecolourError {
    #[error("IO error: {0}")]
    #[diagnostic(code(recolour::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(recolour::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(recolour::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Bitmap buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    #[diagnostic(code(recolour::dimensions))]
    Dimensions {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Encode error: {message}")]
    #[diagnostic(code(recolour::encode))]
    Encode {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Watch error: {message}")]
    #[diagnostic(code(recolour::watch))]
    Watch { message: String },
}

pub type Result<T> = std::result::Result<T, RecolourError>;
