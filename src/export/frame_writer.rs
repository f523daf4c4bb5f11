use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use image::codecs::png::PngEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filename::frame_filename;
use crate::render::{BYTES_PER_PIXEL, PixelBuffer};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export directory not found: {0}")]
    ExportDirNotFound(PathBuf),

    #[error("Unsupported image extension for {0} (use .png or .ppm)")]
    UnsupportedFormat(PathBuf),

    #[error("Frame is {width}x{height}, too large to encode")]
    TooLarge { width: usize, height: usize },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Png,
    /// Binary pixmap (P6), alpha dropped
    Ppm,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Ppm => "ppm",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => Ok(ExportFormat::Png),
            Some("ppm") | Some("pnm") => Ok(ExportFormat::Ppm),
            _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn rgb_bytes(frame: &PixelBuffer) -> Vec<u8> {
    frame
        .as_bytes()
        .chunks_exact(BYTES_PER_PIXEL)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}

/// Write `frame` to `path`, picking the encoding from the extension
pub fn save_frame(frame: &PixelBuffer, path: &Path) -> Result<(), ExportError> {
    let format = ExportFormat::from_path(path)?;
    let too_large = || ExportError::TooLarge {
        width: frame.width(),
        height: frame.height(),
    };
    let width = u32::try_from(frame.width()).map_err(|_| too_large())?;
    let height = u32::try_from(frame.height()).map_err(|_| too_large())?;

    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let encode_err = |source| ExportError::Encode {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    match format {
        ExportFormat::Png => PngEncoder::new(&mut writer)
            .write_image(frame.as_bytes(), width, height, ExtendedColorType::Rgba8)
            .map_err(encode_err)?,
        ExportFormat::Ppm => PnmEncoder::new(&mut writer)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .write_image(&rgb_bytes(frame), width, height, ExtendedColorType::Rgb8)
            .map_err(encode_err)?,
    }
    writer.flush().map_err(io_err)?;

    info!(
        "Exported {}x{} frame to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(())
}

/// Save `frame` under a timestamped name inside `dir`
pub fn export_to_dir(
    frame: &PixelBuffer,
    dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    if !dir.is_dir() {
        return Err(ExportError::ExportDirNotFound(dir.to_path_buf()));
    }
    let path = dir.join(frame_filename(&Local::now(), format));
    save_frame(frame, &path)?;
    Ok(path)
}
