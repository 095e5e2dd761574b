use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;

use crate::core::{
    alerts::{cooldown::CooldownFilter, engine::EscalationEngine, triggers::AlertClassifier},
    config::{self, ConfigManager, Settings},
    coordinator::{self, CoordinatorHandle},
    error::{ConfigError, SourceError},
    sink::{
        alarm::AlarmSink,
        notification::{ConsoleRenderer, NotificationBoard},
        sound::AlarmSound,
        vibration::NoVibrator,
        wake::NoWakeGuard,
    },
    sources::{
        listener::NotificationListener,
        poller::{AlertPoller, PollSettings},
    },
};

#[derive(Parser)]
#[command(name = "alarm-watch", about = "Repeating alarm for trading alerts")]
struct Cli {
    /// Directory holding settings.json
    #[arg(long, env = "ALARM_WATCH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Poll this URL for alerts (overrides settings.json)
    #[arg(long)]
    poll_url: Option<String>,

    /// Fire a test alert on startup
    #[arg(long)]
    test_alert: bool,
}

pub fn run() {
    // Respects RUST_LOG, defaults to info. `log` records are bridged.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli);
    // Opening audio blocks until the device is ready, so it happens before the runtime starts.
    let sound = open_sound(&settings);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(cli.test_alert, settings, sound)) {
        log::error!("alarm-watch stopped: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(cli: &Cli) -> Settings {
    let config_dir = cli.config_dir.clone().unwrap_or_else(config::default_config_dir);
    let config_manager = ConfigManager::new(config_dir);
    let mut settings = config_manager.load();
    if let Some(url) = &cli.poll_url {
        settings.poll = Some(PollSettings::new(url.clone()));
    }
    log::info!("Using settings from {}", config_manager.path().display());
    settings
}

fn open_sound(settings: &Settings) -> Option<AlarmSound> {
    match AlarmSound::open(settings.sound.clone()) {
        Ok(sound) => Some(sound),
        Err(e) => {
            log::warn!("No audio output, alarms will be silent: {}", e);
            None
        }
    }
}

async fn serve(
    test_alert: bool,
    settings: Settings,
    sound: Option<AlarmSound>,
) -> Result<(), SourceError> {
    let handle = start_coordinator(&settings, sound);

    let classifier = AlertClassifier::new(&settings.classifier).map_err(ConfigError::from)?;
    let listener = NotificationListener::new(classifier, handle.clone(), settings.monitoring_enabled);
    if !settings.monitoring_enabled {
        log::info!("Monitoring is disabled; only stop requests are accepted");
    }
    tokio::spawn(async move {
        if let Err(e) = listener.run(BufReader::new(tokio::io::stdin())).await {
            log::warn!("Notification listener stopped: {}", e);
        }
    });

    if let Some(poll) = settings.poll.clone() {
        let poller = AlertPoller::new(poll, handle.clone())?;
        tokio::spawn(async move {
            if let Err(e) = poller.run().await {
                log::warn!("Alert poller stopped: {}", e);
            }
        });
    }

    if test_alert {
        handle.test_alert().await?;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down, silencing active alerts");
    handle.shutdown().await?;
    Ok(())
}

fn start_coordinator(settings: &Settings, sound: Option<AlarmSound>) -> CoordinatorHandle {
    let board = NotificationBoard::new(Box::new(ConsoleRenderer));
    let sink = AlarmSink::new(
        sound,
        Box::new(NoVibrator),
        Box::new(NoWakeGuard),
        board,
        settings.escalation.alert_duration(),
    );

    let engine = EscalationEngine::new(sink, settings.escalation.clone());
    let filter = CooldownFilter::new(settings.escalation.dedup_cooldown());
    let (handle, _task) = coordinator::spawn(engine, filter);
    handle
}
