use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::Parser,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    clipferry_channels::Delivery,
    clipferry_config::AppConfig,
    clipferry_media::{ArtifactStore, MediaFetcher, YtDlpFetcher},
    clipferry_pipeline::Pipeline,
    clipferry_telegram::{TelegramConfig, TelegramDelivery},
};

#[derive(Parser)]
#[command(name = "clipferry", about = "Clipferry — media-fetch relay bot")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Port for the liveness endpoint (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Artifact root directory (overrides DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    // Missing credentials must be fatal before any transport connection.
    let mut config = AppConfig::from_env().context("configuration error")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.artifact_root = data_dir;
    }
    info!(?config, "starting clipferry");

    let store = Arc::new(
        ArtifactStore::open(&config.artifact_root).with_context(|| {
            format!(
                "failed to open artifact root at {}",
                config.artifact_root.display()
            )
        })?,
    );

    let mut fetcher = YtDlpFetcher::new(Arc::clone(&store), config.fetch_workers);
    if let Some(cookies) = &config.cookie_file {
        fetcher = fetcher.with_cookie_file(cookies);
    }

    let telegram_config = TelegramConfig {
        token: config.token.clone(),
    };
    let bot = clipferry_telegram::connect(&telegram_config)
        .await
        .context("telegram startup failed")?;

    let delivery: Arc<dyn Delivery> = Arc::new(TelegramDelivery::new(bot.clone()));
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(fetcher);
    let pipeline = Arc::new(Pipeline::new(
        delivery,
        fetcher,
        Arc::clone(&store),
        config.limits,
    ));

    // Hosting platforms require a bound port; serve the probe alongside
    // the polling loop.
    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = clipferry_gateway::serve(port).await {
            error!(error = %e, "liveness endpoint failed");
        }
    });

    let cancel = clipferry_telegram::start_polling(bot, pipeline);
    info!("clipferry is polling");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    cancel.cancel();
    Ok(())
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}
