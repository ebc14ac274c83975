use std::io;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("ERR - io: {0}")]
    Io(#[from] io::Error),

    #[error("ERR - other: {0}")]
    Other(#[from] anyhow::Error),
}

/// Conditions that abort a single decode call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DecodeError {
    #[error("truncated buffer: {needed} bytes needed at offset {offset}, {available} available")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid page type {byte:#04x} at offset {offset}")]
    InvalidPageType { offset: usize, byte: u8 },
}
