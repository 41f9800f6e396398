use clap::Parser;
use log::info;
use server::hub::{Hub, HubConfig, DEFAULT_QUEUE_CAPACITY};
use server::network;
use shared::GAME_FPS;
use std::future::IntoFuture;
use std::path::PathBuf;
use tokio::net::TcpListener;

/// Main-method of the application.
/// Parses command-line arguments, starts the hub and serves HTTP until a shutdown signal.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value_t = GAME_FPS)]
        tick_rate: u32,
        /// Frames buffered per client before it is dropped as unresponsive
        #[clap(short, long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        queue_capacity: usize,
        /// Directory holding index.html
        #[clap(short, long, default_value = "./static")]
        static_dir: PathBuf,
    }

    let args = Args::parse();

    let hub = Hub::spawn(HubConfig {
        tick_rate: args.tick_rate,
        queue_capacity: args.queue_capacity,
    });
    let app = network::router(hub, &args.static_dir);

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {}", listener.local_addr()?);

    // Hub state is discarded on shutdown
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        _ = shutdown_signal() => {
            info!("Received shutdown signal, closing listener");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
