//! HTTP middleware for the server.

pub mod correlation_id;
pub mod validation;

pub use correlation_id::{create_request_id_layers, make_request_span, X_REQUEST_ID};
pub use validation::require_json_content_type;
