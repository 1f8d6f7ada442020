use clap::Parser;
use colored::Colorize;
use rtd_merge::{build_app, CancellationToken, PipelineConfig};
use std::path::PathBuf;
use std::process;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;

/// With no flags this runs the compiled-in deployment: POST the fixed body to
/// the RTD endpoint and print the wrapped response on stdout.
#[derive(Parser, Debug)]
#[command(name = "rtdx", version, about = "Fetch the RTD payload and print it wrapped as indented JSON")]
struct Cli {
    /// JSON file with any of: url, request_body, template, timeout_ms
    #[arg(long, env = "RTD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the POST target
    #[arg(long, env = "RTD_URL")]
    url: Option<String>,

    /// Override the overall request deadline
    #[arg(long, env = "RTD_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(url) = &cli.url {
        cfg.url = url.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        cfg.timeout_ms = ms;
    }
    Ok(cfg)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // stdout carries the document, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = resolve_config(&cli)?;
    debug!(url = %cfg.url, timeout_ms = cfg.timeout_ms, "config resolved");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut app = build_app(&cfg, tokio::io::stdout())?;
    app.run(&cancel).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} failed to run app: {}", "error:".red().bold(), e);
        process::exit(EXIT_FAILURE);
    }
}
