//! Errors raised while decoding ROOT files.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RootError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    #[error("unexpected end of buffer at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow { offset: usize, need: usize, have: usize },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("unsupported class '{class}' for key '{name}'")]
    UnsupportedClass { name: String, class: String },

    #[error("decompression error: {0}")]
    Decompression(String),

    #[error("malformed object: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, RootError>;
