use umbra_core::{types::ChainId, upstream::UpstreamManagerBuilder};

use super::utils::{load_config, print_error, print_info, print_success, CliError, CliResult};

/// Pings every endpoint of the selected chains and reports which one would be tried first.
///
/// Without `chain_id` every configured chain is probed.
pub async fn probe_chain(file: &str, chain_id: Option<ChainId>) -> CliResult<()> {
    let config = load_config(file)?;

    let chains: Vec<ChainId> = match chain_id {
        Some(id) if config.chain(id).is_none() => {
            return Err(CliError::Config(format!("chain {id} is not configured")));
        }
        Some(id) => vec![id],
        None => config.chains.iter().map(|c| c.chain_id).collect(),
    };

    let manager = UpstreamManagerBuilder::from_config(&config).build()?;
    let mut unreachable = 0;

    for chain in chains {
        let name = manager.chain_name(chain).unwrap_or("unknown");
        print_info(&format!("Probing chain {chain} ({name})..."));

        for result in manager.probe(chain).await? {
            match (result.block_number, &result.error) {
                (Some(block), _) => {
                    let url = &result.url;
                    println!("  OK    {url:<50} block {block:<10} {}ms", result.latency_ms);
                }
                (None, error) => {
                    println!(
                        "  FAIL  {:<50} {} ({}ms)",
                        result.url,
                        error.as_deref().unwrap_or("no response"),
                        result.latency_ms
                    );
                }
            }
        }

        match manager.registry().peek_preferred(chain)? {
            Some(preferred) => {
                print_success(&format!("Chain {chain}: preferred endpoint {preferred}"));
            }
            None => {
                unreachable += 1;
                print_error(&format!("Chain {chain}: every endpoint failed"));
            }
        }
    }

    if unreachable > 0 {
        return Err(CliError::Network(format!("{unreachable} chain(s) unreachable")));
    }
    Ok(())
}
