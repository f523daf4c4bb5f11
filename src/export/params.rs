//! JSON dump of the live zoom parameters

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use serde::Serialize;

use super::filename::params_filename;
use super::frame_writer::ExportError;
use crate::render::{Controller, ViewState, ZoomCommand, ZoomParams};

/// Snapshot of everything needed to return to the current view
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDump {
    pub timestamp: String,
    pub view: ViewState,
    pub zoom_command: ZoomCommand,
    pub zoom: ZoomParams,
    pub initial_decay: f64,
    pub frame_width: usize,
    pub frame_height: usize,
    pub frames_published: u64,
    pub generate_failures: u64,
    pub last_generate_ms: f64,
}

impl ParameterDump {
    pub fn from_controller(controller: &Controller) -> Self {
        let config = controller.config();
        let stats = controller.stats_snapshot();
        Self {
            timestamp: Local::now().to_rfc3339(),
            view: controller.view_snapshot(),
            zoom_command: controller.zoom_command(),
            zoom: config.zoom,
            initial_decay: config.initial_decay,
            frame_width: config.width,
            frame_height: config.height,
            frames_published: stats.frames_published,
            generate_failures: stats.generate_failures,
            last_generate_ms: stats.last_generate.as_secs_f64() * 1000.0,
        }
    }
}

/// Write `dump` as pretty JSON under a timestamped name inside `dir`
pub fn dump_parameters(dump: &ParameterDump, dir: &Path) -> Result<PathBuf, ExportError> {
    if !dir.is_dir() {
        return Err(ExportError::ExportDirNotFound(dir.to_path_buf()));
    }
    let path = dir.join(params_filename(&Local::now()));
    let io_err = |source| ExportError::Io {
        path: path.clone(),
        source,
    };

    let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, dump).map_err(|source| ExportError::Json {
        path: path.clone(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    info!("Dumped parameters to {}", path.display());
    Ok(path)
}
