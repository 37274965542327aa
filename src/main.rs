use std::io;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use kvscript::store::{MemoryConnector, RedisConnector};
use kvscript::{script, Config, Mode, Runner};

#[derive(Parser)]
#[command(name = "kvscript")]
#[command(about = "Runs a fixed walkthrough of string, list and hash commands against a key-value store")]
pub struct Args {
    /// Endpoint host name
    #[arg(long, env = "KV_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "KV_PORT", default_value_t = Config::DEFAULT_PORT)]
    port: u16,

    /// Connect over TLS
    #[arg(long, env = "KV_TLS")]
    tls: bool,

    #[arg(long, env = "KV_MODE", value_enum, default_value_t = Mode::Cluster)]
    mode: Mode,

    /// Seconds to wait for the initial connection
    #[arg(long, env = "KV_CONNECT_TIMEOUT", default_value = "10")]
    connect_timeout: u64,

    /// Run the script against a process-local store instead of a server
    #[arg(long)]
    in_memory: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let config = Config::new(self.host.clone(), self.port, self.tls)
            .context("Failed to build connection settings")?
            .with_mode(self.mode)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .context("Failed to build connection settings")?;
        Ok(config)
    }
}

async fn run(args: Args) -> Result<()> {
    let runner = Runner::new(args.config()?, script::demo());
    info!("Running {} steps against {}", runner.steps().len(), runner.config());

    let mut out = io::stdout().lock();
    if args.in_memory {
        runner.run(&MemoryConnector::new(), &mut out).await?;
    } else {
        runner.run(&RedisConnector, &mut out).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
