use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use studymate_lib::config::ServerConfig;

#[derive(Parser)]
#[command(
    name = "studymate",
    about = "OAuth and table API proxy for the studymate tracker",
    version
)]
struct Args {
    /// TOML config file (default: <config dir>/studymate/server.toml if present)
    #[arg(long, env = "STUDYMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load server config")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
        config.validate().context("Invalid --bind address")?;
    }

    studymate_lib::server::serve(config)
        .await
        .context("Proxy server failed")?;
    Ok(())
}
