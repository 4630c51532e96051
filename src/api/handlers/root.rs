use axum::response::IntoResponse;

use crate::APP_USER_AGENT;

// Undocumented banner route; probes and humans both hit `/`.
pub async fn root() -> impl IntoResponse {
    APP_USER_AGENT
}
