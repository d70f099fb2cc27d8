//! Bulk export - bundles every slice into one zip archive.

use crate::Result;
#[cfg(not(feature = "archive"))]
use crate::SliceError;

/// Folder every slice is placed under inside the archive.
pub const ARCHIVE_FOLDER: &str = "slices/";

#[derive(Clone, Debug)]
pub struct Archive {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `slices_<epoch-ms>.zip`
pub fn archive_name(epoch_ms: i64) -> String {
    format!("slices_{epoch_ms}.zip")
}

pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Bundle `(file name, bytes)` entries under [`ARCHIVE_FOLDER`].
///
/// The archive is assembled fully in memory; on any error nothing is returned.
#[cfg(feature = "archive")]
pub fn package<'a, I>(entries: I, epoch_ms: i64) -> Result<Archive>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    use crate::SliceError;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    let archive_err = |e: zip::result::ZipError| SliceError::Archive(e.to_string());

    // PNG payloads are already compressed
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.add_directory(ARCHIVE_FOLDER, options).map_err(archive_err)?;

    let mut count = 0usize;
    for (name, bytes) in entries {
        writer
            .start_file(format!("{ARCHIVE_FOLDER}{name}"), options)
            .map_err(archive_err)?;
        writer
            .write_all(bytes)
            .map_err(|e| SliceError::Archive(e.to_string()))?;
        count += 1;
    }

    let bytes = writer.finish().map_err(archive_err)?.into_inner();
    let name = archive_name(epoch_ms);
    tracing::info!("packaged {} slices into {} ({} bytes)", count, name, bytes.len());
    Ok(Archive { name, bytes })
}

#[cfg(not(feature = "archive"))]
pub fn package<'a, I>(_entries: I, _epoch_ms: i64) -> Result<Archive>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    Err(SliceError::ArchiveUnavailable)
}
