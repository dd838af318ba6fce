//! Per-request correlation IDs.
//!
//! Every dashboard request gets an ID that ties together its `http_request`
//! span, the Google calls made on its behalf and any Sentry event. A proxy's
//! `x-request-id` is reused when it looks sane; anything else is replaced.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the correlation ID, inbound and outbound.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest upstream ID that is reused as-is.
const MAX_UPSTREAM_ID_LEN: usize = 64;

/// Correlation ID of the current request, available as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse `upstream` when it is short printable ASCII, otherwise mint a UUID.
    fn from_upstream(upstream: Option<&HeaderValue>) -> Self {
        let reusable = upstream
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_UPSTREAM_ID_LEN
                    && id.bytes().all(|b| b.is_ascii_graphic())
            });

        Self(reusable.map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string))
    }
}

/// Assign the request ID, record it on the trace span and Sentry scope, and
/// echo it in the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_upstream(request.headers().get(&REQUEST_ID_HEADER));

    tracing::Span::current().record("request_id", id.0.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &id.0));

    let header = HeaderValue::from_str(&id.0).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Some(header) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), header);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Extension, Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn call(upstream: Option<&str>) -> (String, String) {
        let mut request = axum::http::Request::get("/");
        if let Some(upstream) = upstream {
            request = request.header(&REQUEST_ID_HEADER, upstream);
        }
        let response = router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let echoed = response.headers()[&REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_upstream_id_is_reused() {
        let (echoed, seen) = call(Some("cf-7b1e2d")).await;
        assert_eq!(echoed, "cf-7b1e2d");
        assert_eq!(seen, "cf-7b1e2d");
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let (echoed, seen) = call(None).await;
        assert_eq!(echoed, seen);
        assert!(Uuid::parse_str(&echoed).is_ok());
    }

    #[test]
    fn test_unusable_upstream_ids_are_replaced() {
        let too_long = HeaderValue::from_str(&"a".repeat(MAX_UPSTREAM_ID_LEN + 1)).unwrap();
        let spaced = HeaderValue::from_static("two words");
        let blank = HeaderValue::from_static("   ");

        for value in [too_long, spaced, blank] {
            let id = RequestId::from_upstream(Some(&value));
            assert!(Uuid::parse_str(&id.0).is_ok(), "{value:?} was reused");
        }
    }
}
