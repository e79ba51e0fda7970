use std::sync::Arc;
use umbra_core::{
    broadcaster::BroadcasterService,
    types::{ChainId, TokenAddress},
    upstream::HttpClient,
};

use super::utils::{load_config, print_info, print_success, CliError, CliResult};

/// Runs one discovery round for `token` on `chain_id` and prints the selected relay as JSON.
pub async fn find_broadcaster(
    file: &str,
    chain_id: ChainId,
    token: &str,
    relay_adapt: bool,
) -> CliResult<()> {
    let config = load_config(file)?;
    let token: TokenAddress =
        token.parse().map_err(|e| CliError::Config(format!("invalid token address: {e}")))?;

    let http_client = Arc::new(HttpClient::new()?);
    let service = BroadcasterService::from_config(&config, http_client)?;

    print_info(&format!(
        "Looking up a relay for {token} on chain {chain_id} via {} discovery...",
        service.mode(chain_id)?
    ));

    let outcome = service.find_broadcaster(chain_id, &token, relay_adapt).await;
    service.shutdown().await;

    match outcome? {
        Some(selection) => {
            print_success("Relay found");
            let rendered = serde_json::to_string_pretty(&selection)
                .map_err(|e| CliError::Discovery(e.to_string()))?;
            println!("{rendered}");
            Ok(())
        }
        None => Err(CliError::Discovery(format!(
            "no relay accepts {token} on chain {chain_id}{}",
            if relay_adapt { " with relay-adapt" } else { "" }
        ))),
    }
}
