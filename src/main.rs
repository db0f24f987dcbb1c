use anyhow::Context;
use clap::Parser;
use grocery_expiry::adapters::email::SmtpEmailSink;
use grocery_expiry::adapters::image::{BrowserImageFinder, NoImages};
use grocery_expiry::adapters::oracle::CompletionOracle;
use grocery_expiry::core::{spawn_daily_sweep, sweep_and_log, DailySchedule};
use grocery_expiry::domain::ports::{ImageFinder, NotificationSink};
use grocery_expiry::server::{self, AppState};
use grocery_expiry::utils::{logger, validation::Validate};
use grocery_expiry::{AppConfig, CliArgs, ExpiryResolver, NotificationSweeper, SqliteRecordStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_server_logger(args.verbose);
    }

    tracing::info!("Starting grocery-expiry");

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let store = Arc::new(
        SqliteRecordStore::open(&config.storage.database_path)
            .await
            .with_context(|| format!("opening {}", config.storage.database_path))?,
    );
    tracing::info!("🗄️  Record store at {}", config.storage.database_path);

    let oracle = Arc::new(CompletionOracle::new(config.oracle.clone())?);
    let resolver = Arc::new(ExpiryResolver::new(
        store.clone(),
        oracle,
        image_finder(&config),
    ));

    let sweeper = Arc::new(NotificationSweeper::new(
        store,
        config.subscribers.targets(),
        notification_sinks(&config)?,
    ));
    tracing::info!("🔔 {} notification targets", sweeper.targets().len());

    if args.sweep_now {
        tracing::info!("Running startup sweep");
        sweep_and_log(&sweeper, chrono::Local::now().date_naive()).await;
    }

    let sweep_task = if config.sweep.enabled {
        let schedule = DailySchedule::new(config.sweep.time_of_day()?);
        Some(spawn_daily_sweep(sweeper.clone(), schedule))
    } else {
        tracing::info!("Daily sweep disabled");
        None
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    let app = server::router(AppState { resolver });
    server::serve(listener, app, shutdown_signal()).await?;

    if let Some(task) = sweep_task {
        task.abort();
    }
    tracing::info!("👋 Shutdown complete");
    Ok(())
}

fn image_finder(config: &AppConfig) -> Arc<dyn ImageFinder> {
    if !config.image.enabled {
        tracing::info!("Image enrichment disabled");
        return Arc::new(NoImages);
    }

    #[cfg(feature = "browser")]
    let launcher = Arc::new(grocery_expiry::adapters::webdriver::WebDriverLauncher::new(
        config.image.webdriver_url.clone(),
    ));
    #[cfg(not(feature = "browser"))]
    let launcher = {
        tracing::warn!("Built without the browser feature, images will be empty");
        Arc::new(grocery_expiry::adapters::image::NoBrowser)
    };

    Arc::new(BrowserImageFinder::new(launcher, config.image.clone()))
}

fn notification_sinks(config: &AppConfig) -> anyhow::Result<Vec<Arc<dyn NotificationSink>>> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();

    if config.email.is_configured() {
        sinks.push(Arc::new(SmtpEmailSink::new(&config.email)?));
        tracing::info!("📧 Email alerts via {}", config.email.smtp_host);
    }

    #[cfg(feature = "push")]
    if config.push.is_configured() {
        sinks.push(Arc::new(
            grocery_expiry::adapters::push::WebPushSink::new(&config.push)?,
        ));
        tracing::info!("📱 Web push alerts enabled");
    }

    #[cfg(not(feature = "push"))]
    if !config.subscribers.push.is_empty() {
        tracing::warn!("Push subscribers configured but built without the push feature");
    }

    Ok(sinks)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
