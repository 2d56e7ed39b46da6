use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use hand_cursor_core::{
    AppConfig, BroadcastLoop, HandCursorError, ReplaySource, SubscriberRegistry, Subscription,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> hand_cursor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
        } => run_replay(&input, output.as_deref(), config.as_deref()).await,
        Commands::Config { config } => print_config(config.as_deref()),
    }
}

async fn run_replay(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
) -> hand_cursor_core::Result<()> {
    let config = load_config(config)?;
    tracing::info!(?input, ?output, "replaying recorded detections");

    let reader: Box<dyn BufRead + Send> = if input == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };
    let sink: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    let registry = SubscriberRegistry::new(config.broadcast.subscriber_capacity);
    let subscription = registry.subscribe()?;
    let subscriber_id = subscription.id;
    let writer = tokio::spawn(write_lines(subscription, sink));

    let broadcast = BroadcastLoop::new(&config, ReplaySource::new(reader), registry.clone());
    let stop = broadcast.stop_handle();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, stopping");
        stop.stop();
    })
    .map_err(|err| HandCursorError::msg(format!("failed to install Ctrl-C handler: {err}")))?;

    let summary = broadcast.run().await?;

    registry.unsubscribe(subscriber_id)?;
    let written = writer
        .await
        .map_err(|err| HandCursorError::msg(format!("output writer failed: {err}")))??;

    tracing::info!(frames = summary.frames, written, "replay finished");
    Ok(())
}

/// Writes every received frame output as one JSON line until the
/// subscription is closed.
async fn write_lines(
    mut subscription: Subscription,
    mut sink: Box<dyn Write + Send>,
) -> hand_cursor_core::Result<u64> {
    let mut written = 0;
    while let Some(message) = subscription.receiver.recv().await {
        writeln!(sink, "{message}")?;
        sink.flush()?;
        written += 1;
    }
    Ok(written)
}

fn print_config(config: Option<&Path>) -> hand_cursor_core::Result<()> {
    let config = load_config(config)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> hand_cursor_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Hand landmark cursor tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tracking pipeline over recorded detector output.
    Replay {
        /// Newline-delimited JSON detection frames, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
        /// File that receives one JSON frame output per line. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config {
        /// Optional JSON configuration file to validate and print.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
