use anyhow::{Context, Result};
use clap::Parser;
use scribe_stream::{ChannelHost, Delivery, Script, ScriptedStub, SessionHost, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "streamscribe", about = "Streaming speech recognition session runner")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Raw 16-bit PCM to feed into the session
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// JSON script of service responses to replay
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Bytes per media frame (defaults to the configured chunk size)
    #[arg(long)]
    frame_bytes: Option<usize>,

    /// Delay between media frames
    #[arg(long, default_value_t = 20)]
    frame_interval_ms: u64,

    /// Call leg identifier
    #[arg(long, default_value = "leg-1")]
    session_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = scribe_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("streamscribe starting");

    let stub = match cli.script {
        Some(ref path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {path:?}"))?;
            ScriptedStub::from_json(&json)
                .with_context(|| format!("failed to parse script {path:?}"))?
        }
        None => ScriptedStub::new(Script {
            wait_for_writes_done: true,
            ..Script::default()
        }),
    };

    let audio = match cli.audio {
        Some(ref path) => {
            std::fs::read(path).with_context(|| format!("failed to read audio {path:?}"))?
        }
        None => Vec::new(),
    };

    let (delivery_tx, mut delivery_rx) = tokio::sync::mpsc::unbounded_channel::<Delivery>();
    let host = Arc::new(ChannelHost::new(delivery_tx));
    host.attach(&cli.session_id);

    // Deliveries go to stdout, logs to stderr
    let printer = tokio::spawn(async move {
        while let Some(delivery) = delivery_rx.recv().await {
            println!("[{}] {}", delivery.stream_tag, delivery.payload);
        }
    });

    let dyn_host: Arc<dyn SessionHost> = host.clone();
    let manager = SessionManager::new(Arc::new(stub), dyn_host, &config.general);
    let handle = manager
        .start(&cli.session_id, &config.session, &config.variables)
        .with_context(|| format!("failed to start session '{}'", cli.session_id))?;

    let frame_bytes = cli.frame_bytes.unwrap_or(config.general.chunk_size).max(1);
    let interval = Duration::from_millis(cli.frame_interval_ms);
    tracing::info!(
        frames = audio.len().div_ceil(frame_bytes),
        frame_bytes,
        "feeding audio"
    );

    let feed = async {
        for frame in audio.chunks(frame_bytes) {
            if !handle.feed_frame(frame) {
                tracing::info!("session stopped accepting audio");
                break;
            }
            tokio::time::sleep(interval).await;
        }
    };

    let interrupted = tokio::select! {
        _ = feed => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    tracing::info!(interrupted, "shutting down");
    if interrupted {
        host.hang_up(&cli.session_id);
    }
    let closure = handle.stop(interrupted).await;
    tracing::info!(closure = ?closure, "session closed");

    drop(manager);
    drop(host);
    let _ = printer.await;

    Ok(())
}
