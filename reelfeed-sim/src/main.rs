use anyhow::Context;
use clap::Parser;
use reelfeed_config::CoordinatorConfig;
use reelfeed_sim::{Script, Session, SessionOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replay a scripted scroll session against the playback coordinator
#[derive(Parser, Debug)]
#[command(name = "reelfeed-sim", version)]
#[command(
    about = "Replay a scripted scroll session against the playback coordinator"
)]
struct Cli {
    /// Session script (TOML) with `[[step]]` entries
    #[arg(long)]
    script: PathBuf,

    /// Coordinator config (TOML or JSON). Defaults to REELFEED_CONFIG_PATH,
    /// REELFEED_CONFIG_JSON, then reelfeed.toml in the working directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of synthetic posts (overrides the script)
    #[arg(long)]
    posts: Option<usize>,

    /// Videos per post carousel (overrides the script)
    #[arg(long)]
    videos_per_post: Option<usize>,

    /// Simulated player load latency in milliseconds (overrides the script)
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Print the final report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays machine readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,reelfeed::analytics=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => CoordinatorConfig::load_from_file(path)?,
        None => {
            let (config, source) = CoordinatorConfig::load_from_env()?;
            info!(?source, "coordinator config loaded");
            config
        }
    };

    let script = Script::load(&cli.script)?;
    let options = SessionOptions::resolve(
        &script,
        cli.posts,
        cli.videos_per_post,
        cli.latency_ms,
    );

    let mut session = Session::new(config, options)?;
    session.run(&script);
    let report = session.report();

    if cli.json {
        let rendered = serde_json::to_string_pretty(&report)
            .context("failed to render report")?;
        println!("{rendered}");
    } else {
        println!("{report}");
    }
    Ok(())
}
