//! Relay mock serving fee schedules, submissions and diagnostics.

use mockito::{Mock, Server, ServerGuard};
use serde_json::{json, Map, Value};

/// One mock relay.
pub struct RelayMockBuilder {
    server: ServerGuard,
}

impl RelayMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Serves `GET /fees` listing `(token, feePerUnitGas, feesID)` entries.
    ///
    /// The returned mock expects exactly `hits` requests; call `assert_async` on it to check.
    pub async fn mock_fees(
        &mut self,
        relay_address: &str,
        fees: &[(&str, &str, &str)],
        hits: usize,
    ) -> Mock {
        let fees: Map<String, Value> = fees
            .iter()
            .map(|(token, fee, id)| {
                ((*token).to_string(), json!({ "feePerUnitGas": fee, "feesID": id }))
            })
            .collect();

        self.server
            .mock("GET", "/fees")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "railgunAddress": relay_address, "fees": fees }).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Makes `GET /fees` fail with `status`.
    pub async fn mock_fees_failure(&mut self, status: usize, hits: usize) -> Mock {
        self.server
            .mock("GET", "/fees")
            .with_status(status)
            .with_body("relay unavailable")
            .expect(hits)
            .create_async()
            .await
    }

    /// Accepts `POST /submit` and answers with `response`.
    pub async fn mock_submit(&mut self, response: &Value) -> Mock {
        self.server
            .mock("POST", "/submit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .create_async()
            .await
    }

    /// Serves `GET /debug/v1/info`.
    pub async fn mock_info(&mut self, info: &Value) -> Mock {
        self.server
            .mock("GET", "/debug/v1/info")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(info.to_string())
            .create_async()
            .await
    }

    pub fn server(&mut self) -> &mut ServerGuard {
        &mut self.server
    }
}
