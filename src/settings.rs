use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::ExportFormat;
use crate::palette::PaletteId;
use crate::render::{ComputeConfig, MandelbrotGenerator, ViewState, ZoomParams};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "mandelzoom";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Fractal and compute-loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    pub frame_width: usize,
    pub frame_height: usize,
    pub initial_offset_x: f64,
    pub initial_offset_y: f64,
    /// Milliseconds slept at the start of every compute tick
    pub loop_wait_ms: u64,
    pub max_iterations: u32,
    pub scale_a: f64,
    pub scale_b: f64,
    pub zoom_alpha: f64,
    pub zoom_beta: f64,
    /// Zoom-out steps at or above this are dropped
    pub max_delta_scale_a: f64,
    pub initial_decay: f64,
    pub min_scale: f64,
    pub palette: PaletteId,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            frame_width: 160,
            frame_height: 96,
            // Seahorse valley, a spot that stays interesting deep into the zoom.
            initial_offset_x: -0.743_643_887_037_151,
            initial_offset_y: 0.131_825_904_205_330,
            loop_wait_ms: 5,
            max_iterations: MandelbrotGenerator::DEFAULT_ITERATIONS,
            scale_a: 1.0,
            scale_b: 4.0,
            zoom_alpha: 0.05,
            zoom_beta: 2.5,
            max_delta_scale_a: 0.5,
            initial_decay: 0.000_005_5,
            min_scale: ZoomParams::DEFAULT_MIN_SCALE,
            palette: PaletteId::default(),
        }
    }
}

/// Terminal presentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub window_title: String,
    pub fps_cap: u32,
    pub show_overlay: bool,
    pub show_crosshair: bool,
    pub crosshair_color: [u8; 3],
    pub export_dir: PathBuf,
    /// Encoding used by the frame export key
    pub export_format: ExportFormat,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            window_title: "Mandelbrot Fractal".to_string(),
            fps_cap: 60,
            show_overlay: true,
            show_crosshair: true,
            crosshair_color: [255, 255, 255],
            export_dir: PathBuf::from("."),
            export_format: ExportFormat::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub compute: ComputeSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_log_file() -> PathBuf {
    PathBuf::from("mandelzoom.log")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            compute: ComputeSettings::default(),
            display: DisplaySettings::default(),
            log_file: default_log_file(),
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            field,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            field,
            reason: format!("must be finite, got {value}"),
        })
    }
}

impl Settings {
    /// Reject values the compute loop cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let c = &self.compute;
        if c.frame_width == 0 || c.frame_height == 0 {
            return Err(SettingsError::Invalid {
                field: "compute.frame_width/frame_height",
                reason: format!("must be non-zero, got {}x{}", c.frame_width, c.frame_height),
            });
        }
        if c.max_iterations == 0 {
            return Err(SettingsError::Invalid {
                field: "compute.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("compute.scale_a", c.scale_a)?;
        positive("compute.scale_b", c.scale_b)?;
        positive("compute.zoom_alpha", c.zoom_alpha)?;
        positive("compute.max_delta_scale_a", c.max_delta_scale_a)?;
        positive("compute.min_scale", c.min_scale)?;
        finite("compute.zoom_beta", c.zoom_beta)?;
        finite("compute.initial_offset_x", c.initial_offset_x)?;
        finite("compute.initial_offset_y", c.initial_offset_y)?;
        finite("compute.initial_decay", c.initial_decay)?;
        if c.min_scale >= c.scale_a {
            return Err(SettingsError::Invalid {
                field: "compute.min_scale",
                reason: format!("must be below scale_a ({})", c.scale_a),
            });
        }
        if self.display.fps_cap == 0 {
            return Err(SettingsError::Invalid {
                field: "display.fps_cap",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parameters for the compute loop
    pub fn compute_config(&self) -> ComputeConfig {
        let c = &self.compute;
        ComputeConfig {
            width: c.frame_width,
            height: c.frame_height,
            tick_interval: Duration::from_millis(c.loop_wait_ms),
            zoom: ZoomParams {
                alpha: c.zoom_alpha,
                beta: c.zoom_beta,
                max_delta: c.max_delta_scale_a,
                min_scale: c.min_scale,
            },
            initial_decay: c.initial_decay,
            initial_view: ViewState {
                offset_x: c.initial_offset_x,
                offset_y: c.initial_offset_y,
                scale_a: c.scale_a,
                scale_b: c.scale_b,
            },
        }
    }

    pub fn generator(&self) -> MandelbrotGenerator {
        MandelbrotGenerator::new(self.compute.max_iterations, self.compute.palette)
    }

    /// Target duration of one display tick
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / self.display.fps_cap.max(1)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load from `explicit` if given (it must exist), otherwise from the default
/// location, creating that file with defaults on first run.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    if let Some(path) = explicit {
        return load_settings_from_path(path);
    }

    let Some(path) = default_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Ok(Settings::default());
    };

    if path.exists() {
        return load_settings_from_path(&path);
    }

    info!("Settings file not found, creating with defaults at {path:?}");
    let settings = Settings::default();
    if let Err(e) = save_settings_to_file(&settings, &path) {
        // Running without a writable config dir is fine.
        warn!("{e}");
    }
    Ok(settings)
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings = parse_settings(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings_to_file(&settings, path)?;
    }

    settings.validate()?;
    Ok(settings)
}

pub fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut content = String::from("# mandelzoom settings\n");
    content.push_str(&serde_yaml::to_string(settings)?);

    fs::write(path, content).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Saved settings to {path:?}");
    Ok(())
}
