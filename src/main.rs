mod backoff;
mod config;
mod io;
mod openai;
mod pipeline;
mod prompt;
mod providers;
mod setter;
mod store;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "wallgen",
    version,
    about = "Generate an AI wallpaper and apply it as the desktop background"
)]
struct Cli {
    /// Output directory for the rendered wallpaper
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Provider backend: openai or mock
    #[arg(long)]
    provider: Option<String>,

    /// Save the wallpaper without applying it to the desktop
    #[arg(long)]
    no_apply: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!("wallpaper run failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::Config::from_env()?;
    if let Some(dir) = cli.out_dir {
        cfg.out_dir = dir;
    }
    if let Some(provider) = cli.provider {
        cfg.provider = provider;
    }
    if cli.no_apply {
        cfg.apply = false;
    }

    let store = store::PromptStore::new(cfg.state_file.clone());
    let setter = setter::detect();
    info!(
        provider = %cfg.provider,
        setter = setter.name(),
        out_dir = %cfg.out_dir.display(),
        "starting wallpaper run"
    );

    let outcome = match cfg.provider.as_str() {
        "mock" => {
            let mock = providers::MockProvider;
            pipeline::run(&cfg, &store, &mock, &mock, setter.as_ref()).await?
        }
        "openai" => {
            let key = cfg
                .api_key
                .clone()
                .context("OPENAI_API_KEY not set (environment or .env)")?;
            let client = openai::OpenAiClient::new(&cfg, key)?;
            pipeline::run(&cfg, &store, &client, &client, setter.as_ref()).await?
        }
        other => bail!("unknown provider '{other}' (expected openai or mock)"),
    };

    info!(path = %outcome.image_path.display(), applied = outcome.applied, "run complete");
    Ok(())
}
