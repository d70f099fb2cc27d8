//! gridslice CLI - slice an image along cut lines and export the cells

use clap::Parser;
use gridslice::{package, Axis, Background, SliceError, SliceSession, MemoryHandles};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridslice", about = "Slice an image into a grid of PNG cells")]
struct Args {
    /// Input image file
    input: PathBuf,
    /// Horizontal cut line, as a percent of the image height (repeatable)
    #[arg(short = 'H', long = "horizontal")]
    horizontal: Vec<f64>,
    /// Vertical cut line, as a percent of the image width (repeatable)
    #[arg(short = 'V', long = "vertical")]
    vertical: Vec<f64>,
    /// Evenly spaced layout as ROWSxCOLS, replacing -H/-V
    #[arg(short, long, value_parser = parse_grid)]
    grid: Option<(u32, u32)>,
    /// Pad every cell to a square canvas
    #[arg(short, long)]
    square: bool,
    /// Fill colour for square padding
    #[arg(short, long, default_value = "#ffffff")]
    background: Background,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Write a single zip archive instead of individual files
    #[arg(short, long)]
    zip: bool,
}

fn parse_grid(s: &str) -> Result<(u32, u32), String> {
    let (rows, cols) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    Ok((parse(rows)?, parse(cols)?))
}

fn main() -> Result<(), SliceError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut session = SliceSession::new(MemoryHandles::new());
    session.load_bytes(&std::fs::read(&args.input)?)?;

    match args.grid {
        Some((rows, cols)) => session.auto_layout(rows, cols),
        None => {
            for &p in &args.horizontal {
                session.add_line(Axis::Horizontal, p);
            }
            for &p in &args.vertical {
                session.add_line(Axis::Vertical, p);
            }
        }
    }
    session.set_force_square(args.square);
    session.set_background(args.background);

    let count = session.process()?;
    std::fs::create_dir_all(&args.output)?;

    if args.zip {
        let archive = session.download_all(package::now_epoch_ms())?;
        let path = args.output.join(&archive.name);
        std::fs::write(&path, &archive.bytes)?;
        println!("{}", path.display());
    } else {
        for index in 0..count {
            let (name, bytes) = session.download_one(index)?;
            let path = args.output.join(name);
            std::fs::write(&path, bytes)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
