use clap::Subcommand;
use std::path::Path;

use super::utils::{load_config, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate,

    /// Print the effective configuration
    Show,

    /// Write a sample configuration file
    Generate {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands, file: &str) -> CliResult<()> {
    match command {
        ConfigCommands::Validate => validate_config(file),
        ConfigCommands::Show => show_config(file),
        ConfigCommands::Generate { force } => generate_config(file, force),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        return Err(CliError::Config(format!("file not found: {file}")));
    }

    print_info(&format!("Validating {file}..."));
    let config = load_config(file)?;
    print_success("Configuration is valid");

    println!("  Server: {}:{}", config.server.bind_address, config.server.bind_port);
    println!("  Chains: {}", config.chains.len());
    println!("  Relay: {}", config.broadcaster.relay_base_url);
    println!(
        "  P2P discovery: {}",
        if config.has_production_chains() { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn show_config(file: &str) -> CliResult<()> {
    let config = load_config(file)?;

    println!("Configuration from {file}:");

    println!("\n[Server]");
    println!("  Bind: {}:{}", config.server.bind_address, config.server.bind_port);
    println!("  Max Concurrent Requests: {}", config.server.max_concurrent_requests);
    println!("  Request Timeout: {}s", config.server.request_timeout_seconds);

    println!("\n[Chains]");
    for chain in &config.chains {
        println!("  {} ({}, {})", chain.chain_id, chain.name, chain.network);
        for (position, url) in chain.rpc_urls.iter().enumerate() {
            println!("    {}. {url}", position + 1);
        }
    }

    println!("\n[Broadcaster]");
    println!("  Relay: {}", config.broadcaster.relay_base_url);
    println!("  Fee TTL: {}s", config.broadcaster.fee_ttl_seconds);
    println!("  Fee Fetch Timeout: {}s", config.broadcaster.fee_fetch_timeout_seconds);
    println!("  Discovery Timeout: {}s", config.broadcaster.discovery_timeout_seconds);
    println!("  Bootstrap Peers: {}", config.broadcaster.bootstrap_peers.len());
    println!("  Min Peers: {}", config.broadcaster.min_peers);

    println!("\n[Quorum]");
    println!("  Quorum: {}", config.quorum.quorum);
    println!("  Stall Timeout: {}ms", config.quorum.stall_timeout_ms);

    println!("\n[Gas]");
    println!(
        "  Relay Adapt: {}",
        config.gas.relay_adapt_address.as_deref().unwrap_or("(not set)")
    );
    println!("  Relay Adapt Overhead: {} gas", config.gas.relay_adapt_overhead_gas);

    println!("\n[Timeouts]");
    println!("  Query: {}s", config.timeouts.query_seconds);
    println!("  Submit: {}s", config.timeouts.submit_seconds);

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# umbra configuration

[server]
bind_address = "127.0.0.1"
bind_port = 3030
max_concurrent_requests = 100
request_timeout_seconds = 150

# Endpoints are tried in order; the last one that answered is tried first next time.
[[chains]]
chain_id = 11155111
name = "sepolia"
network = "test"
rpc_urls = [
    "https://ethereum-sepolia-rpc.publicnode.com",
    "https://rpc.sepolia.org",
]

[[chains]]
chain_id = 1
name = "ethereum"
network = "production"
rpc_urls = ["https://eth.llamarpc.com", "https://ethereum-rpc.publicnode.com"]

[broadcaster]
relay_base_url = "http://127.0.0.1:3000"
fee_ttl_seconds = 60
fee_fetch_timeout_seconds = 10
discovery_timeout_seconds = 60
bootstrap_peers = []
min_peers = 1

[quorum]
quorum = 1
stall_timeout_ms = 2500

[gas]
relay_adapt_overhead_gas = 150000

[timeouts]
query_seconds = 5
submit_seconds = 120

[logging]
level = "info"
format = "pretty"
"#;

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "{output} already exists, use --force to overwrite"
        )));
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration written to {output}"));
    print_info("Add bootstrap peers before enabling production chains");
    Ok(())
}
