mod config;
mod error;
mod ethereum;
mod server;

use anyhow::Result;
use clap::Parser;
use config::Config;
use server::WalletMcpServer;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "wallet-mcp", version)]
#[command(about = "MCP wallet server for EVM chains", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Default network to use (bsc-testnet, ethereum, sepolia)
    #[arg(short, long)]
    network: Option<String>,

    /// RPC endpoint URL for the default network
    #[arg(short, long, value_name = "URL")]
    rpc_url: Option<String>,

    /// Allow write operations (transfers, contract writes, raw broadcasts)
    #[arg(long)]
    allow_writes: bool,

    /// Generate a sample configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// Print the default configuration file path and exit
    #[arg(long)]
    config_path: bool,
}

impl Cli {
    /// Command-line flags win over the configuration file.
    fn apply(&self, config: &mut Config) {
        if let Some(network) = &self.network {
            config.default_network = network.clone();
        }

        if let Some(rpc_url) = &self.rpc_url {
            if let Some(network_config) = config.networks.get_mut(&config.default_network) {
                network_config.rpc_url = rpc_url.clone();
            }
        }

        if self.allow_writes {
            config.security.allow_write_operations = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if cli.config_path {
        let path = Config::default_config_path().map_err(|e| {
            error!("Could not determine default config path: {}", e);
            e
        })?;
        println!("{}", path.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(cli.config.as_deref()).await;
    cli.apply(&mut config);
    config.validate()?;

    let mut networks: Vec<&str> = config.networks.keys().map(String::as_str).collect();
    networks.sort_unstable();
    info!(
        default_network = %config.default_network,
        networks = ?networks,
        allow_writes = config.security.allow_write_operations,
        "Configuration loaded"
    );

    let server = WalletMcpServer::new(config)?;

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
