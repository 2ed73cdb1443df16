//! Client context extraction
//!
//! Saved-tender operations are scoped to a client. Upstream auth terminates
//! at the edge proxy, which forwards the authenticated client identity in
//! the `X-Client-ID` header; handlers receive it through this extractor.

use crate::errors::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Extracted client context available to handlers
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// Client the request acts on behalf of
    pub client_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// Axum extractor for ClientContext
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let client_id = parts
            .headers
            .get("x-client-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-Client-ID header".to_string(),
            })?;

        Ok(ClientContext {
            client_id,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_client_id() {
        let request = Request::builder()
            .header("x-client-id", "a6f1f6f2-1111-4222-8333-444455556666")
            .header("x-request-id", "req-1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = ClientContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(
            ctx.client_id,
            Uuid::parse_str("a6f1f6f2-1111-4222-8333-444455556666").unwrap()
        );
        assert_eq!(ctx.request_id, "req-1");
    }

    #[tokio::test]
    async fn test_missing_client_id_rejected() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let result = ClientContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }
}
