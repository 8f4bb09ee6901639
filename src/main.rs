//! InMoov head demo: face tracking and finger counting from a webcam.

use anyhow::Result;
use clap::Parser;
use inmoov_vision::{
    app::DemoApp,
    config::{Config, EXAMPLE_CONFIG},
    pipeline::PipelineFlags,
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Serial device of the servo controller
    #[arg(long)]
    device: Option<PathBuf>,

    /// Run without driving servos
    #[arg(long)]
    no_servos: bool,

    /// Start with face tracking enabled
    #[arg(short, long)]
    faces: bool,

    /// Start with finger counting enabled
    #[arg(short, long)]
    count: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("InMoov Vision");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path).and_then(|cfg| cfg.validate().map(|()| cfg)) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config file: {e}. Using defaults.");
                    Config::default()
                }
            }
        }
        None => Config::default(),
    };

    // Command line overrides
    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if let Some(device) = args.device {
        config.bus.device = device;
    }
    if args.no_servos {
        config.bus.enabled = false;
    }

    let flags = PipelineFlags {
        track_faces: args.faces,
        enable_counting: args.count,
    };

    let app = DemoApp::new(config, flags)?;
    app.run()?;

    Ok(())
}
