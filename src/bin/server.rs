use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use statusboard::db::memory::SeedData;
use statusboard::db::{IncidentStore, InMemoryStore, SeaOrmStore, ServiceStore};
use statusboard::monitoring::HealthCheckScheduler;
use statusboard::monitoring::probe::HttpProbeClient;
use statusboard::notifications::NotificationService;
use statusboard::server::config::ServerConfig;
use statusboard::version::VERSION;
use statusboard::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "statusboard.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn open_stores(
    config: &ServerConfig,
) -> Result<(Arc<dyn ServiceStore>, Arc<dyn IncidentStore>), Box<dyn std::error::Error + Send + Sync>>
{
    if let Some(database_url) = &config.database_url {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(10).sqlx_logging(false);
        let db = Database::connect(opt).await?;
        let store = Arc::new(SeaOrmStore::new(Arc::new(db)));
        store.ensure_schema().await?;
        info!("Connected to database.");
        let services: Arc<dyn ServiceStore> = store.clone();
        let incidents: Arc<dyn IncidentStore> = store;
        return Ok((services, incidents));
    }

    let seed = match &config.seed_file {
        Some(path) => {
            let seed = SeedData::from_file(path)?;
            info!(
                seed_file = ?path,
                services = seed.services.len(),
                groups = seed.groups.len(),
                incidents = seed.incidents.len(),
                "Loaded seed data."
            );
            seed
        }
        None => SeedData::default(),
    };
    warn!("No database_url configured; status data lives in memory and is lost on exit.");
    let store = Arc::new(InMemoryStore::from_seed(seed));
    let services: Arc<dyn ServiceStore> = store.clone();
    let incidents: Arc<dyn IncidentStore> = store;
    Ok((services, incidents))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, listen_addr = %config.listen_addr, "Starting status server.");

    let (services, incidents) = open_stores(&config).await?;

    let probe = Arc::new(HttpProbeClient::new(config.probe_settings())?);
    let notifier = Arc::new(NotificationService::new(config.notification_channels.clone()));
    info!(channels = notifier.channel_count(), "Notification channels configured.");

    let mut scheduler = HealthCheckScheduler::new(
        services.clone(),
        probe,
        notifier,
        config.scheduler_config(),
    );
    scheduler.start();

    let app = create_axum_router(services, incidents);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("HTTP server listening on {}", config.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    served?;

    info!("Status server stopped.");
    Ok(())
}
