use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use umbra_core::types::ChainId;

mod commands;
use commands::{
    find_broadcaster, handle_config_command, probe_chain, utils::print_error, ConfigCommands,
};

#[derive(Parser)]
#[command(name = "umbra-cli")]
#[command(about = "Umbra CLI - configuration checks, endpoint probes and relay lookups")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config/config.toml")]
    file: String,

    /// Log verbosity for the workspace crates
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Ping every RPC endpoint of a chain and show the preferred one
    Probe {
        /// Chain to probe; all configured chains when omitted
        #[arg(short, long)]
        chain_id: Option<ChainId>,
    },

    /// Find a relay that accepts fees in a token
    Broadcaster {
        #[arg(short, long)]
        chain_id: ChainId,

        /// Fee token address
        #[arg(short, long)]
        token: String,

        /// Require relay-adapt support
        #[arg(long)]
        relay_adapt: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,umbra_core={level},cli={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let outcome = match cli.command {
        Commands::Config(config_command) => handle_config_command(config_command, &cli.file),
        Commands::Probe { chain_id } => probe_chain(&cli.file, chain_id).await,
        Commands::Broadcaster { chain_id, token, relay_adapt } => {
            find_broadcaster(&cli.file, chain_id, &token, relay_adapt).await
        }
    };

    if let Err(e) = outcome {
        print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}
