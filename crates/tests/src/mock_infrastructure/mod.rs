//! Mock RPC nodes and relays backed by mockito.
//!
//! ```ignore
//! use tests::mock_infrastructure::{RelayMockBuilder, RpcMockBuilder};
//!
//! let mut node = RpcMockBuilder::new().await;
//! node.mock_block_number(100);
//!
//! let mut relay = RelayMockBuilder::new().await;
//! relay.mock_fees("0zk1relay", &[(USDC, "0x0de0b6b3a7640000", "fees-1")]);
//! ```

pub mod relay_mock;
pub mod test_helpers;

pub use relay_mock::RelayMockBuilder;
pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
