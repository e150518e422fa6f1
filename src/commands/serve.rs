//! HTTP server command

use crate::error::Result;
use crate::server::{serve, AppState};
use std::sync::Arc;

/// Run the HTTP API on the given address
pub async fn cmd_serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    serve(state, addr).await
}
