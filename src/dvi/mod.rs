pub mod byte_cursor;
mod error;
mod file;
pub mod file_writer;
mod fonts;
pub mod opcodes;
mod page_index;
mod postamble;
mod preamble;
mod specials;

pub use error::{AccessError, LoadError, LoadResult};
pub use file::{DVIFile, LoadOptions};
pub use file_writer::DVIFileWriter;
pub use fonts::{FontDefinition, FontRegistry, Registration};
pub use page_index::PrescanSummary;
pub use postamble::Postamble;
pub use preamble::Preamble;
