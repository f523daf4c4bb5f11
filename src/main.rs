use std::{
    fs::File,
    io::stdout,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::EnableMouseCapture,
    execute,
    terminal::{EnterAlternateScreen, SetTitle, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use mandelzoom::{
    App, Controller, ImageGenerator, Settings, TerminalSink, run_app_with_event_source,
    event_source::KeyboardEventSource,
    export::save_frame,
    panic_handler::{initialize_panic_handler, restore_terminal},
    settings::load_settings,
};

#[derive(Parser, Debug)]
#[command(name = "mandelzoom")]
#[command(about = "Continuously zooming Mandelbrot explorer for the terminal")]
#[command(version)]
struct Args {
    /// Settings file (default: <config dir>/mandelzoom/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file, overrides the settings value
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<usize>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<usize>,

    /// Escape-time iteration limit
    #[arg(long)]
    iterations: Option<u32>,

    /// Display frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Render the initial view to a .png or .ppm file and exit
    #[arg(long, value_name = "PATH")]
    render: Option<PathBuf>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.log_file {
            settings.log_file = path.clone();
        }
        if let Some(width) = self.width {
            settings.compute.frame_width = width;
        }
        if let Some(height) = self.height {
            settings.compute.frame_height = height;
        }
        if let Some(iterations) = self.iterations {
            settings.compute.max_iterations = iterations;
        }
        if let Some(fps) = self.fps {
            settings.display.fps_cap = fps;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("Failed to load settings")?;
    args.apply(&mut settings);
    settings.validate()?;

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&settings.log_file)
            .with_context(|| format!("Failed to create {}", settings.log_file.display()))?,
    )?;

    info!("Starting mandelzoom");

    if let Some(path) = &args.render {
        return render_single_frame(&settings, path);
    }

    let res = run_interactive(settings);
    restore_terminal();

    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down mandelzoom");
    res
}

fn render_single_frame(settings: &Settings, path: &Path) -> Result<()> {
    let config = settings.compute_config();
    let frame = settings
        .generator()
        .generate(&config.initial_view, config.width, config.height)
        .context("Failed to render frame")?;
    save_frame(&frame, path)?;
    println!("Saved {}x{} frame to {}", config.width, config.height, path.display());
    Ok(())
}

fn run_interactive(settings: Settings) -> Result<()> {
    initialize_panic_handler();

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetTitle(&settings.display.window_title)
    )?;
    let terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("Failed to initialize terminal")?;
    let mut sink = TerminalSink::new(terminal, settings.display.window_title.clone())?
        .with_crosshair(settings.display.crosshair_color);

    let generator: Arc<dyn ImageGenerator> = Arc::new(settings.generator());
    let mut controller = Controller::new(settings.compute_config(), generator);
    controller.create_compute_thread()?;

    let mut app = App::new(controller, settings);
    run_app_with_event_source(&mut sink, &mut app, &mut KeyboardEventSource)?;

    sink.into_terminal().show_cursor()?;
    Ok(())
}
