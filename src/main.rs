use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;
use homework_notifier::{
    app_init::{AppComponents, initialize_app, load_bot_config},
    config::default_config_path,
    id::Cursor,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging, also dumps raw review API responses
    #[arg(short, long)]
    debug: bool,

    /// Run a single poll and exit
    #[arg(long)]
    once: bool,

    /// Start polling this many seconds in the past
    #[arg(long, default_value_t = 0)]
    since: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = load_bot_config(&config_path)?;

    let AppComponents { service, poller, forwarder, _log_guard } =
        initialize_app(config, args.debug).await?;
    info!(config = %config_path.display(), "Configuration loaded");

    let cursor = Cursor::now().rewind(args.since);

    let result = if args.once {
        let iteration = service.run_iteration(cursor).await;
        match iteration.outcome.failure() {
            Some(kind) => {
                warn!(%kind, "Single poll failed");
                Err(eyre!("single poll failed: {kind} error"))
            },
            None => {
                info!(cursor = %iteration.cursor, outcome = ?iteration.outcome, "Single poll finished");
                Ok(())
            },
        }
    } else {
        let shutdown = poller.shutdown_sender();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down");
                let _ = shutdown.send(());
            }
        });

        info!(interval = ?poller.config().interval, "Polling homework statuses");
        poller.start(cursor).await;
        Ok(())
    };

    if let Some(forwarder) = forwarder
        && !forwarder.flush().await
    {
        warn!("Some error records were not forwarded before exit");
    }

    result
}
