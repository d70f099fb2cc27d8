//! Editor session - owns the source image, the cut lines and the current slices.
//!
//! Processing is split into `begin_process` / `SliceJob::run` / `publish` so a
//! host can render off the UI path. Each `begin_process` takes a new
//! generation; a batch from an older generation is discarded on publish.

use crate::geometry::{compute_cells, Cell};
use crate::lines::{Axis, LineModel};
use crate::package::{self, Archive};
use crate::render::{self, Background, RenderOptions, RenderedSlice};
use crate::store::{HandleRegistry, SliceResult, SliceStore};
use crate::{Result, SliceError};
use base64::Engine;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

/// Decoded source bitmap, shared with in-flight jobs.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    /// Decode an encoded file (PNG, JPEG, WebP, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(SliceError::SourceLoad)?;
        Ok(Self::from_image(image))
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let invalid = |why: &str| SliceError::InvalidSource(format!("data URL {why}"));
        let rest = url.strip_prefix("data:").ok_or_else(|| invalid("missing data: prefix"))?;
        let (meta, payload) = rest.split_once(',').ok_or_else(|| invalid("missing payload"))?;
        if !meta.ends_with(";base64") {
            return Err(invalid("is not base64 encoded"));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| SliceError::InvalidSource(format!("data URL payload: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Wrap raw RGBA8 pixels, e.g. from a canvas `ImageData`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let len = pixels.len();
        let image = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            SliceError::InvalidSource(format!("{len} bytes do not form a {width}x{height} RGBA image"))
        })?;
        Ok(Self { pixels: Arc::new(image) })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self { pixels: Arc::new(image.to_rgba8()) }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Self-contained unit of rendering work for one generation.
#[derive(Clone, Debug)]
pub struct SliceJob {
    generation: u64,
    image: Arc<RgbaImage>,
    cells: Vec<Cell>,
    options: RenderOptions,
}

impl SliceJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cells in row-major order, for hosts that render one cell at a time.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn render(&self, cell: &Cell) -> Result<RenderedSlice> {
        render::render_slice(&self.image, cell, &self.options)
    }

    /// Package slices rendered step by step through [`SliceJob::render`].
    pub fn into_batch(self, slices: Vec<RenderedSlice>) -> SliceBatch {
        SliceBatch { generation: self.generation, slices }
    }

    /// Render and encode every cell. One failing cell fails the whole batch.
    pub fn run(self) -> Result<SliceBatch> {
        self.run_with(render::render_slice)
    }

    /// Like [`SliceJob::run`] with a caller-supplied per-cell renderer.
    pub fn run_with<F>(self, render: F) -> Result<SliceBatch>
    where
        F: Fn(&RgbaImage, &Cell, &RenderOptions) -> Result<RenderedSlice> + Sync + Send,
    {
        let rendered = render::render_all_with(&self.cells, |cell| render(&*self.image, cell, &self.options));
        match rendered {
            Ok(slices) => Ok(self.into_batch(slices)),
            Err(e) => {
                tracing::warn!(generation = self.generation, "slice batch failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Rendered output of one job, waiting to be published.
#[derive(Clone, Debug)]
pub struct SliceBatch {
    generation: u64,
    slices: Vec<RenderedSlice>,
}

pub struct SliceSession<R: HandleRegistry> {
    image: Option<SourceImage>,
    lines: LineModel,
    options: RenderOptions,
    store: SliceStore<R>,
    generation: u64,
}

impl<R: HandleRegistry> SliceSession<R> {
    pub fn new(registry: R) -> Self {
        Self {
            image: None,
            lines: LineModel::new(),
            options: RenderOptions::default(),
            store: SliceStore::new(registry),
            generation: 0,
        }
    }

    /// Replace the source image. Lines and slices from the previous image are discarded.
    pub fn load_image(&mut self, image: SourceImage) {
        self.clear_image();
        tracing::info!("loaded source image {}x{}", image.width(), image.height());
        self.image = Some(image);
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.load_with(|| SourceImage::from_bytes(bytes))
    }

    pub fn load_data_url(&mut self, url: &str) -> Result<()> {
        self.load_with(|| SourceImage::from_data_url(url))
    }

    pub fn load_rgba(&mut self, width: u32, height: u32, pixels: Vec<u8>) -> Result<()> {
        self.load_with(|| SourceImage::from_rgba(width, height, pixels))
    }

    fn load_with(&mut self, decode: impl FnOnce() -> Result<SourceImage>) -> Result<()> {
        match decode() {
            Ok(image) => {
                self.load_image(image);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("source image failed to load: {}", e);
                self.clear_image();
                Err(e)
            }
        }
    }

    /// Drop the image, its lines and every slice handle.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.lines.clear();
        self.store.release_all();
        self.generation += 1;
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    pub fn lines(&self) -> &LineModel {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut LineModel {
        &mut self.lines
    }

    pub fn add_line(&mut self, axis: Axis, percent: f64) -> usize {
        self.lines.add_line(axis, percent)
    }

    pub fn remove_line(&mut self, axis: Axis, index: usize) -> Option<f64> {
        self.lines.remove_line(axis, index)
    }

    /// Replace the lines with an evenly spaced `rows` × `cols` layout.
    pub fn auto_layout(&mut self, rows: u32, cols: u32) {
        self.lines = LineModel::grid(rows, cols);
    }

    pub fn set_force_square(&mut self, enabled: bool) {
        self.options.force_square = enabled;
    }

    pub fn set_background(&mut self, background: Background) {
        self.options.background = background;
    }

    /// Cells the current lines would produce, without rendering them.
    pub fn cells(&self) -> Vec<Cell> {
        match &self.image {
            Some(image) => compute_cells(&self.lines, image.width(), image.height()),
            None => Vec::new(),
        }
    }

    /// Start a new run: clears the current slices and captures everything the
    /// render needs, resolved against the image's current dimensions.
    pub fn begin_process(&mut self) -> Result<SliceJob> {
        let image = self.image.as_ref().ok_or(SliceError::NoImage)?;
        let cells = compute_cells(&self.lines, image.width(), image.height());
        let image = Arc::clone(&image.pixels);

        self.store.release_all();
        self.generation += 1;
        tracing::debug!(generation = self.generation, cells = cells.len(), "slice run started");

        Ok(SliceJob {
            generation: self.generation,
            image,
            cells,
            options: self.options,
        })
    }

    /// Install a finished batch. Returns `Ok(false)` when a newer run or an
    /// image change has superseded it.
    pub fn publish(&mut self, batch: SliceBatch) -> Result<bool> {
        if batch.generation != self.generation {
            tracing::warn!(
                stale = batch.generation,
                current = self.generation,
                "discarding superseded slice batch"
            );
            return Ok(false);
        }
        let count = batch.slices.len();
        self.store.replace(batch.slices)?;
        tracing::info!(generation = self.generation, "published {} slices", count);
        Ok(true)
    }

    /// Full synchronous recompute. Returns the number of slices published.
    pub fn process(&mut self) -> Result<usize> {
        let batch = self.begin_process()?.run()?;
        self.publish(batch)?;
        Ok(self.store.len())
    }

    pub fn slices(&self) -> &[SliceResult<R::Handle>] {
        self.store.slices()
    }

    pub fn store(&self) -> &SliceStore<R> {
        &self.store
    }

    /// Release every slice handle, keeping the image and lines.
    pub fn release_slices(&mut self) {
        self.store.release_all();
    }

    /// `(file name, PNG bytes)` of one slice.
    pub fn download_one(&self, index: usize) -> Result<(&str, &[u8])> {
        let slice = self.store.get(index).ok_or(SliceError::SliceNotFound(index))?;
        Ok((slice.name.as_str(), slice.binary.as_slice()))
    }

    /// Every current slice in one archive named after `epoch_ms`.
    pub fn download_all(&self, epoch_ms: i64) -> Result<Archive> {
        if self.image.is_none() {
            return Err(SliceError::NoImage);
        }
        package::package(
            self.store
                .slices()
                .iter()
                .map(|s| (s.name.as_str(), s.binary.as_slice())),
            epoch_ms,
        )
    }
}
