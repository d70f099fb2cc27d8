//! Grid-based image slicing: cut an image along user-placed lines, upsample
//! each cell and export the results as PNG files or a single zip archive.

pub mod editor;
pub mod geometry;
pub mod lines;
pub mod package;
pub mod render;
pub mod session;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use editor::{Bounds, DragState, LineEditor};
pub use geometry::{compute_cells, percent_to_pixel, Cell, CutSet};
pub use lines::{Axis, LineModel};
pub use package::Archive;
pub use render::{Background, RenderOptions, SCALE};
pub use session::{SliceBatch, SliceJob, SliceSession, SourceImage};
pub use store::{HandleRegistry, MemoryHandles, SliceResult, SliceStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("Source load error: {0}")]
    SourceLoad(#[source] image::ImageError),
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("No source image loaded")]
    NoImage,
    #[error("Failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid colour: {0}")]
    InvalidColor(String),
    #[error("Handle error: {0}")]
    Handle(String),
    #[error("Archive support is not available in this build")]
    ArchiveUnavailable,
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("No slice at index {0}")]
    SliceNotFound(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SliceError>;
