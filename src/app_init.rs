use std::{path::Path, sync::Arc};

use compact_str::{CompactString, format_compact};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    client::{ClientConfig, HomeworkPoller, HomeworkService, ReviewApi, TelegramApi},
    config::{BotConfig, load_config},
    logging::{ErrorForwarder, Forwarded, LoggingConfig, init_logging, spawn_error_forwarder},
    result::Result,
};

pub struct AppComponents {
    pub service: Arc<HomeworkService>,
    pub poller: HomeworkPoller,
    pub forwarder: Option<ErrorForwarder>,
    pub _log_guard: Option<WorkerGuard>,
}

/// Config file values with environment overrides applied
pub fn load_bot_config(config_path: &Path) -> Result<BotConfig> {
    load_config(config_path)?.with_env_overrides(|key| std::env::var(key).ok())
}

pub async fn initialize_app(config: BotConfig, debug: bool) -> Result<AppComponents> {
    let client_config =
        ClientConfig::try_from(&config)?.with_debug_logging(config.log_responses || debug);

    let telegram = Arc::new(TelegramApi::new(
        client_config.telegram.clone(),
        &client_config.request,
    )?);

    let (forward_tx, forward_rx) = if config.forward_errors {
        let (tx, rx) = mpsc::unbounded_channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let log_guard = initialize_logging(&config, debug, forward_tx.clone())?;
    let forwarder = forward_tx.zip(forward_rx).map(|(tx, rx)| {
        spawn_error_forwarder(tx, rx, telegram.clone(), client_config.request.timeout)
    });
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        chat_id = %client_config.telegram.chat_id,
        "Homework notifier starting up"
    );

    let review = Arc::new(ReviewApi::new(
        client_config.review.clone(),
        &client_config.request,
        client_config.debug.clone(),
    )?);

    let service = Arc::new(HomeworkService::new(review, telegram));
    let poller = HomeworkPoller::new(service.clone(), client_config.polling.clone());

    Ok(AppComponents {
        service,
        poller,
        forwarder,
        _log_guard: log_guard,
    })
}

fn initialize_logging(
    config: &BotConfig,
    debug: bool,
    forward_to: Option<mpsc::UnboundedSender<Forwarded>>,
) -> Result<Option<WorkerGuard>> {
    init_logging(&logging_config(config, debug), forward_to)
}

fn logging_config(config: &BotConfig, debug: bool) -> LoggingConfig {
    let mut logging_config =
        LoggingConfig::new("homework_notifier=info,warn", config.log_dir.clone())
            .with_max_log_files(config.log_max_files);

    if debug {
        logging_config.level = "homework_notifier=debug,warn".into();
    } else if let Some(level) = &config.log_level {
        // Disable file logging if set to "Off"
        if level.eq_ignore_ascii_case("off") {
            logging_config.log_dir = None;
        } else {
            logging_config.level = filter_directive(level);
        }
    }

    logging_config
}

/// Bare levels apply to this crate only, full directives are used as given
fn filter_directive(level: &str) -> CompactString {
    if level.contains('=') || level.contains(',') {
        level.into()
    } else {
        format_compact!("homework_notifier={},warn", level.to_lowercase())
    }
}
