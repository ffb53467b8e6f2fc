use std::io;
use thiserror::Error;

/// Possible errors that arise from attempting to convert compressed chunk data
/// into its decompressed data, or vice versa.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A command header held a tag outside of the seven known commands
    #[error("invalid command {tag} at offset {offset:#x}")]
    InvalidCommand { tag: u8, offset: usize },

    /// The chunk ran past the end of the input before its terminator
    #[error("unexpected end of compressed data at offset {offset:#x}")]
    UnexpectedEnd { offset: usize },

    #[error("{0}")]
    Io(#[from] io::Error),
}
