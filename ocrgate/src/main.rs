use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ocrgate::api::{create_router, AppState};
use ocrgate::config::Config;
use ocrgate::db::{Database, DatabaseBackend, LibSqlBackend};
use ocrgate::demo::{self, DemoOptions};
use ocrgate::models::{JobRequest, Language};
use ocrgate::ocr::{OcrEngine, OcrProvider};
use ocrgate::pipeline::PipelineSettings;
use ocrgate::queue::{self, QueueConsumer};

#[derive(Parser)]
#[command(name = "ocrgate", version)]
#[command(about = "OCR post-processing service: confidence filtering and bounding-box overlays")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API, with the queue consumer in the background
    Serve {
        /// Do not consume the input queue in this process
        #[arg(long)]
        no_consumer: bool,
    },
    /// Run only the queue consumer
    Consume,
    /// Process local images and print their results
    Demo {
        /// Image file to process; repeat for several images
        #[arg(long = "image", required = true)]
        images: Vec<PathBuf>,
        #[arg(long, default_value = "en")]
        lang: Language,
        /// Defaults to PIPELINE_DEFAULT_CONFIDENCE
        #[arg(long)]
        confidence: Option<f64>,
        #[arg(long, default_value = "demo_output")]
        output_dir: PathBuf,
    },
    /// Publish an image file as a job on the input queue
    Enqueue {
        image: PathBuf,
        #[arg(long, default_value = "en")]
        lang: Language,
        #[arg(long)]
        confidence: Option<f64>,
        #[arg(long)]
        destination_folder: Option<String>,
        #[arg(long)]
        filename: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve { no_consumer: false }) {
        Command::Serve { no_consumer } => serve(config, !no_consumer).await,
        Command::Consume => consume(config).await,
        Command::Demo {
            images,
            lang,
            confidence,
            output_dir,
        } => {
            let options = DemoOptions {
                images,
                lang,
                confidence,
                output_dir,
            };
            run_demo(config, options).await
        }
        Command::Enqueue {
            image,
            lang,
            confidence,
            destination_folder,
            filename,
        } => {
            let bytes = tokio::fs::read(&image).await?;
            let mut request =
                JobRequest::new(base64::engine::general_purpose::STANDARD.encode(bytes));
            request.lang = lang;
            request.confidence = confidence;
            request.destination_folder = destination_folder;
            request.filename = filename;

            let db = open_database(&config).await?;
            let job_id = queue::enqueue(db.as_ref(), &config.queue, &request).await?;
            println!("{job_id}");
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ocrgate=info,tower_http=debug".into());
    let json = std::env::var("OCRGATE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<dyn DatabaseBackend>> {
    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
    db.sync().await?;
    Ok(db)
}

fn open_engine(config: &Config) -> Arc<dyn OcrEngine> {
    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let engine = OcrProvider::new(&config.ocr);
    if !engine.is_available() {
        tracing::warn!("OCR unavailable - jobs will fail with engine_unavailable");
    }
    Arc::new(engine)
}

async fn serve(config: Config, with_consumer: bool) -> anyhow::Result<()> {
    if config.server.api_keys.is_empty() {
        tracing::warn!("OCRGATE_API_KEYS is not set - v1 endpoints are open to everyone");
    }

    let db = open_database(&config).await?;
    let engine = open_engine(&config);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db, engine);

    let cancel_token = CancellationToken::new();

    let consumer_task = if with_consumer {
        tracing::info!("Starting queue consumer...");
        let consumer = QueueConsumer::new(
            state.db.clone(),
            state.pipeline.clone(),
            state.artifacts.clone(),
            state.config.queue.clone(),
        );
        let token = cancel_token.child_token();
        Some(tokio::spawn(async move {
            if let Err(e) = consumer.run(token).await {
                tracing::error!("Queue consumer stopped: {}", e);
            }
        }))
    } else {
        None
    };

    let app = create_router(state);

    tracing::info!("ocrgate starting on http://{}", addr);
    tracing::info!("  Legacy OCR:   http://{}/process_image", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    if let Some(task) = consumer_task {
        task.await?;
    }

    Ok(())
}

async fn consume(config: Config) -> anyhow::Result<()> {
    let db = open_database(&config).await?;
    let engine = open_engine(&config);
    let state = AppState::new(config, db, engine);
    let consumer = QueueConsumer::new(
        state.db.clone(),
        state.pipeline.clone(),
        state.artifacts.clone(),
        state.config.queue.clone(),
    );

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    consumer.run(cancel_token).await?;
    Ok(())
}

async fn run_demo(config: Config, options: DemoOptions) -> anyhow::Result<()> {
    let engine = open_engine(&config);
    let reports = demo::run(&options, engine, PipelineSettings::from_config(&config)).await?;

    for report in reports {
        println!(
            "{} -> {}",
            report.source.display(),
            report.overlay_path.display()
        );
        println!("{}\n", demo::render_table(&report.rows));
    }
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, stopping consumers...");
    cancel_token.cancel();
}
