use std::io;

use thiserror::Error;

/// Failures that make a DVI file impossible to index. When one of these is
/// returned no DVIFile exists.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("malformed preamble: {0}")]
    MalformedHeader(String),

    #[error("truncated file: {0}")]
    TruncatedFile(String),

    #[error("corrupt postamble: {0}")]
    CorruptPostamble(String),

    #[error(
        "postamble units {postamble_num}/{postamble_den} (mag {postamble_mag}) \
         disagree with preamble units {preamble_num}/{preamble_den} (mag {preamble_mag})"
    )]
    InconsistentUnits {
        preamble_num: u32,
        preamble_den: u32,
        preamble_mag: u32,
        postamble_num: u32,
        postamble_den: u32,
        postamble_mag: u32,
    },

    #[error("corrupt page {page} at offset {offset}: {reason}")]
    CorruptPage {
        page: usize,
        offset: u32,
        reason: String,
    },

    #[error("failed to read DVI file: {0}")]
    Io(#[from] io::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Misuse of the accessors of an already loaded file.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("page index {index} is out of range, the file has {total} pages")]
    PageIndexOutOfRange { index: usize, total: usize },
}
