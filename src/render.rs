//! Cell rasterization - upsamples each cell 2x, optionally padded to a square.

use crate::geometry::{Cell, PixelRect};
use crate::{Result, SliceError};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Fixed upsampling factor applied to every exported cell.
pub const SCALE: u32 = 2;

pub const PNG_MIME: &str = "image/png";

/// Fill colour for square-pad mode, parsed from `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Background(pub [u8; 4]);

impl Default for Background {
    fn default() -> Self {
        Background([255, 255, 255, 255])
    }
}

impl FromStr for Background {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || SliceError::InvalidColor(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|n| n * 17)
                .map_err(|_| invalid())
        };
        match hex.len() {
            3 => Ok(Background([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
            6 => Ok(Background([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Ok(Background([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Background {
    type Error = SliceError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Background> for String {
    fn from(bg: Background) -> String {
        bg.to_string()
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub force_square: bool,
    pub background: Background,
}

impl RenderOptions {
    pub fn with_force_square(mut self, enabled: bool) -> Self {
        self.force_square = enabled;
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }
}

/// Output canvas geometry for one cell, in output pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub source: PixelRect,
}

pub fn canvas_layout(cell: &Cell, options: &RenderOptions) -> CanvasLayout {
    let source = cell.pixel_rect();
    let content_width = source.width * SCALE;
    let content_height = source.height * SCALE;

    if !options.force_square {
        return CanvasLayout {
            canvas_width: content_width,
            canvas_height: content_height,
            offset_x: 0,
            offset_y: 0,
            content_width,
            content_height,
            source,
        };
    }

    let max_dim = source.width.max(source.height);
    CanvasLayout {
        canvas_width: max_dim * SCALE,
        canvas_height: max_dim * SCALE,
        offset_x: (max_dim - source.width) * SCALE / 2,
        offset_y: (max_dim - source.height) * SCALE / 2,
        content_width,
        content_height,
        source,
    }
}

/// Rasterize one cell of `image` into a fresh canvas.
pub fn render_cell(image: &RgbaImage, cell: &Cell, options: &RenderOptions) -> RgbaImage {
    let layout = canvas_layout(cell, options);
    let PixelRect { x, y, width, height } = layout.source;
    let region = imageops::crop_imm(image, x, y, width, height).to_image();
    let scaled = imageops::resize(
        &region,
        layout.content_width,
        layout.content_height,
        FilterType::Triangle,
    );

    if !options.force_square {
        return scaled;
    }

    let mut canvas = RgbaImage::from_pixel(
        layout.canvas_width,
        layout.canvas_height,
        Rgba(options.background.0),
    );
    imageops::overlay(&mut canvas, &scaled, layout.offset_x as i64, layout.offset_y as i64);
    canvas
}

pub fn encode_png(image: &RgbaImage) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// An encoded cell, not yet registered with a display handle.
#[derive(Clone, Debug)]
pub struct RenderedSlice {
    pub cell: Cell,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub binary: Vec<u8>,
}

pub fn render_slice(image: &RgbaImage, cell: &Cell, options: &RenderOptions) -> Result<RenderedSlice> {
    let canvas = render_cell(image, cell, options);
    let name = cell.file_name();
    let binary = encode_png(&canvas).map_err(|source| SliceError::Encode {
        name: name.clone(),
        source,
    })?;
    Ok(RenderedSlice {
        cell: *cell,
        name,
        width: canvas.width(),
        height: canvas.height(),
        binary,
    })
}

/// Apply `render` to every cell, in parallel on native targets.
/// Any single failure fails the batch; output keeps the order of `cells`.
pub fn render_all_with<F>(cells: &[Cell], render: F) -> Result<Vec<RenderedSlice>>
where
    F: Fn(&Cell) -> Result<RenderedSlice> + Sync + Send,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        use rayon::prelude::*;
        cells.par_iter().map(render).collect()
    }
    #[cfg(target_arch = "wasm32")]
    {
        cells.iter().map(render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(w: f64, h: f64) -> Cell {
        Cell { row: 0, col: 0, src_x: 0.0, src_y: 0.0, src_w: w, src_h: h }
    }

    #[test]
    fn background_parses_hex_forms() {
        assert_eq!("#fff".parse::<Background>().unwrap(), Background([255, 255, 255, 255]));
        assert_eq!("102030".parse::<Background>().unwrap(), Background([16, 32, 48, 255]));
        assert_eq!("#10203040".parse::<Background>().unwrap(), Background([16, 32, 48, 64]));
        assert!("#12345".parse::<Background>().is_err());
        assert!("#gggggg".parse::<Background>().is_err());
        assert!("#ééé".parse::<Background>().is_err());
    }

    #[test]
    fn background_round_trips_through_json() {
        let options = RenderOptions::default()
            .with_force_square(true)
            .with_background("#000".parse().unwrap());
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("#000000ff"));
        let back: RenderOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn direct_layout_scales_source() {
        let layout = canvas_layout(&cell(600.0, 400.0), &RenderOptions::default());
        assert_eq!((layout.canvas_width, layout.canvas_height), (1200, 800));
        assert_eq!((layout.offset_x, layout.offset_y), (0, 0));
    }

    #[test]
    fn square_layout_centers_content() {
        let options = RenderOptions::default().with_force_square(true);
        let layout = canvas_layout(&cell(300.0, 100.0), &options);
        assert_eq!((layout.canvas_width, layout.canvas_height), (600, 600));
        assert_eq!((layout.offset_x, layout.offset_y), (0, 200));
        assert_eq!((layout.content_width, layout.content_height), (600, 200));
    }

    #[test]
    fn square_render_fills_background() {
        let source = RgbaImage::from_pixel(6, 2, Rgba([255, 0, 0, 255]));
        let options = RenderOptions::default()
            .with_force_square(true)
            .with_background("#0000ff".parse().unwrap());
        let out = render_cell(&source, &cell(6.0, 2.0), &options);
        assert_eq!(out.dimensions(), (12, 12));
        assert_eq!(out.get_pixel(6, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(6, 6), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(6, 11), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn encoded_slice_is_png() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let slice = render_slice(&source, &cell(4.0, 4.0), &RenderOptions::default()).unwrap();
        assert_eq!(slice.name, "slice_1_1.png");
        assert_eq!((slice.width, slice.height), (8, 8));
        assert_eq!(&slice.binary[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn batch_keeps_cell_order_and_fails_as_a_whole() {
        let source = RgbaImage::from_pixel(8, 2, Rgba([0, 0, 0, 255]));
        let cells: Vec<Cell> = (0..4)
            .map(|col| Cell { row: 0, col, src_x: col as f64 * 2.0, src_y: 0.0, src_w: 2.0, src_h: 2.0 })
            .collect();
        let options = RenderOptions::default();

        let all = render_all_with(&cells, |cell| render_slice(&source, cell, &options)).unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["slice_1_1.png", "slice_1_2.png", "slice_1_3.png", "slice_1_4.png"]);

        let failed = render_all_with(&cells, |cell| {
            if cell.col == 2 {
                let kind = image::error::LimitErrorKind::InsufficientMemory;
                return Err(SliceError::Encode {
                    name: cell.file_name(),
                    source: image::ImageError::Limits(image::error::LimitError::from_kind(kind)),
                });
            }
            render_slice(&source, cell, &options)
        });
        assert!(matches!(failed, Err(SliceError::Encode { ref name, .. }) if name == "slice_1_3.png"));
    }
}
