#[macro_use]
extern crate lazy_static;

pub mod dvi;
pub mod page_size;
mod paths;
pub mod rotation;

pub use dvi::{
    AccessError, DVIFile, DVIFileWriter, FontDefinition, FontRegistry,
    LoadError, LoadOptions, LoadResult,
};
pub use rotation::{RotatedImage, Rotation, RotationJob, RotationWorker};
