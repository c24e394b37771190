//! Shutterpi daemon.
//!
//! Wires the pieces together: loads configuration, opens the camera,
//! starts the capture coordinator, binds the GPIO push-button, and runs
//! the web gallery until a shutdown signal arrives.

use clap::Parser;
use shutterpi::camera::Camera;
use shutterpi::capture::CaptureCoordinator;
use shutterpi::config::AppConfig;
use shutterpi::store::PhotoStore;
use shutterpi::web::{self, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "shutterpi",
    version,
    about = "Push-button camera appliance with a local web photo gallery"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the photo directory.
    #[arg(long, value_name = "DIR")]
    photo_dir: Option<PathBuf>,

    /// Override the HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the camera device (path or index).
    #[arg(long)]
    device: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "shutterpi=info",
        1 => "shutterpi=debug",
        _ => "shutterpi=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_camera() -> Box<dyn Camera> {
    #[cfg(feature = "camera")]
    {
        Box::new(shutterpi::camera::UvcCamera::new())
    }
    #[cfg(not(feature = "camera"))]
    {
        tracing::warn!("built without the `camera` feature; captures use the mock camera");
        Box::new(shutterpi::camera::MockCamera::new())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("shutterpi v{}", shutterpi::VERSION);

    let mut config = match &cli.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.photo_dir {
        config.photo.dir = dir;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(device) = cli.device {
        config.camera.device = device;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    let store = match PhotoStore::new(&config.photo.dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open photo directory: {e}");
            std::process::exit(1);
        }
    };
    info!(dir = %store.dir().display(), "photo store ready");

    // No capture without a camera: device failure here is fatal.
    let coordinator = match CaptureCoordinator::start(
        build_camera(),
        &config.camera,
        config.capture.strategy(),
        store.clone(),
        config.photo.encode.clone(),
    ) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e) => {
            eprintln!("Failed to start capture: {e}");
            std::process::exit(1);
        }
    };

    #[cfg(feature = "gpio")]
    let _button = if config.button.enabled {
        match shutterpi::trigger::ShutterButton::bind(&config.button, Arc::clone(&coordinator)) {
            Ok(button) => Some(button),
            Err(e) => {
                tracing::warn!(error = %e, "continuing without the push-button");
                None
            }
        }
    } else {
        None
    };
    #[cfg(not(feature = "gpio"))]
    if config.button.enabled {
        info!("built without the `gpio` feature; push-button disabled");
    }

    // SIGINT/SIGTERM: release the device first, then let the server drain.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let signal_result = {
        let coordinator = Arc::clone(&coordinator);
        let shutdown_tx = Mutex::new(Some(shutdown_tx));
        ctrlc::set_handler(move || {
            info!("shutdown signal received");
            coordinator.shutdown();
            let tx = shutdown_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(tx) = tx {
                let _ = tx.send(());
            }
        })
    };
    if let Err(e) = signal_result {
        eprintln!("Failed to install signal handler: {e}");
        std::process::exit(1);
    }

    let state = AppState {
        coordinator: Arc::clone(&coordinator),
        store,
        refresh_secs: config.web.refresh_secs,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], config.web.port));

    let served = web::serve(state, addr, async {
        let _ = shutdown_rx.await;
    })
    .await;

    // Normal exit path; a no-op if the signal handler already ran.
    coordinator.shutdown();

    if let Err(e) = served {
        error!(error = %e, "web server failed");
        std::process::exit(1);
    }
    info!("shutterpi stopped");
}
