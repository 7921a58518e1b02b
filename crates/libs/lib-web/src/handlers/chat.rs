//! # Chat HTTP Handlers
//!
//! Administrative endpoints next to the chat socket.
//!
//! ## Endpoints
//!
//! - `POST /delete-chat` - Delete the whole message log

use crate::chat::ConversationPipeline;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Response body of `POST /delete-chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub success: bool,
}

/// Delete every stored message.
///
/// **Route**: `POST /delete-chat`
///
/// Connected clients are not notified and keep what they have on screen.
///
/// # Returns
///
/// * `200 OK` - `{"success": true}`
/// * `500 Internal Server Error` - `{"success": false}`
pub async fn delete_chat(
    State(pipeline): State<Arc<ConversationPipeline>>,
) -> (StatusCode, Json<PurgeResponse>) {
    match pipeline.purge().await {
        Ok(_) => (StatusCode::OK, Json(PurgeResponse { success: true })),
        Err(e) => {
            error!(error = %e, "Purge failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PurgeResponse { success: false }),
            )
        }
    }
}
