use std::sync::Arc;

use ad_studio::assets::{self, AssetKind};
use ad_studio::brief_client::{BriefAnalyzer, CatalogAnalyzer, HttpBriefAnalyzer};
use ad_studio::config::{DriveMode, StudioConfig};
use ad_studio::export::BundleAssembler;
use ad_studio::pipeline::Pipeline;
use ad_studio::store::{MemoryStepStore, PgStepStore, StepStatusStore};
use ad_studio::voiceover_client::{HttpVoiceoverClient, VoiceoverSynthesizer};
use ad_studio::{db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = StudioConfig::from_env()?;

    // Step store: Postgres when configured, otherwise in-memory
    let (db_pool, store): (Option<sqlx::PgPool>, Arc<dyn StepStatusStore>) = match config.database_url {
        Some(ref url) => {
            tracing::info!("Connecting to step status database...");
            let pool = db::create_pool(url).await?;
            (Some(pool.clone()), Arc::new(PgStepStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not found. Session history is kept in memory only.");
            (None, Arc::new(MemoryStepStore::new()))
        }
    };

    let analyzer: Arc<dyn BriefAnalyzer> = match config.brief_analysis_url {
        Some(ref url) => {
            tracing::info!("Initializing brief analysis client ({})...", url);
            Arc::new(HttpBriefAnalyzer::new(
                url.clone(),
                config.functions_api_key.clone(),
                config.http_timeout,
            )?)
        }
        None => {
            tracing::warn!("BRIEF_ANALYSIS_URL not found. Briefs are matched against the campaign catalog.");
            Arc::new(CatalogAnalyzer)
        }
    };

    let voiceover: Option<Arc<dyn VoiceoverSynthesizer>> = match config.voiceover_url {
        Some(ref url) => {
            tracing::info!("🎙️ Initializing voiceover client ({})...", url);
            Some(Arc::new(HttpVoiceoverClient::new(
                url.clone(),
                config.functions_api_key.clone(),
                config.http_timeout,
            )?))
        }
        None => {
            tracing::warn!("VOICEOVER_URL not found. Voiceover synthesis will be disabled.");
            None
        }
    };

    let audio_store = assets::from_source(AssetKind::Audio, &config.audio_assets, config.asset_fetch_timeout)?;
    let video_store = assets::from_source(AssetKind::Video, &config.video_assets, config.asset_fetch_timeout)?;
    if audio_store.is_none() || video_store.is_none() {
        tracing::warn!("Asset stores incomplete. Bundles will omit media that cannot be located.");
        tracing::info!("To bundle media, set AUDIO_ASSETS_DIR / VIDEO_ASSETS_DIR or STORAGE_URL");
    }

    match config.pipeline.mode {
        DriveMode::Simulated => tracing::info!("⏱️ Pipeline running in simulated mode"),
        DriveMode::Polled { interval, max_attempts } => tracing::info!(
            "📡 Pipeline polling the step store every {}ms (max {} checks)",
            interval.as_millis(),
            max_attempts
        ),
    }

    let pipeline = Arc::new(Pipeline::new(
        analyzer,
        voiceover.clone(),
        store.clone(),
        config.pipeline.clone(),
    ));

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState {
        config,
        pipeline,
        store,
        voiceover,
        bundler: BundleAssembler::new(audio_store, video_store),
        db_pool,
    });

    let app = ad_studio::app(shared_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,ad_studio=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,ad_studio=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    tracing::info!("🎬 Ad studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    let configured = |key: &str| if std::env::var(key).is_ok() { "✅" } else { "❌" };
    tracing::info!(
        "Configuration - Database: {}, Brief analysis: {}, Voiceover: {}, Storage: {}",
        configured("DATABASE_URL"),
        configured("BRIEF_ANALYSIS_URL"),
        configured("VOICEOVER_URL"),
        configured("STORAGE_URL")
    );

    Ok(())
}
