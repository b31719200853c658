use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use dpmaker::app::DpMakerApp;
use dpmaker::compose::BackgroundOption;
use dpmaker::config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Make an event profile picture: crop, restyle, frame and share"
)]
struct Args {
    /// Photo to open straight away (PNG or JPEG)
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// URL of the restyle proxy; AI styling is disabled without one
    #[arg(short = 'e', long)]
    restyle_endpoint: Option<String>,

    /// Directory downloads are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Device pixel ratio used when rasterizing the crop (defaults to the screen's)
    #[arg(short, long)]
    pixel_density: Option<f32>,

    /// Initial frame background
    #[arg(short, long, value_enum)]
    background: Option<BackgroundOption>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "dpmaker=debug" } else { "dpmaker=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = config::load(args.config.as_deref())?;
    if let Some(endpoint) = args.restyle_endpoint.filter(|e| !e.trim().is_empty()) {
        config.restyle_endpoint = Some(endpoint);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(background) = args.background {
        config.default_background = background;
    }
    let pixel_density = args.pixel_density.filter(|d| *d > 0.0);
    let image = args.image;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "DevFest DP maker",
        native_options,
        Box::new(
            move |cc| match DpMakerApp::new(cc, config, pixel_density, image) {
                Ok(app) => Ok(Box::new(app) as Box<dyn eframe::App>),
                Err(err) => Err(err.into()),
            },
        ),
    )?;

    Ok(())
}
