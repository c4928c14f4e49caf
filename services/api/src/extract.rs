//! Request extractors

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HOST, request::Parts},
};

/// Scheme and host the client used to reach us, e.g. `http://localhost:5000`
///
/// Honours `X-Forwarded-Proto` so URLs stay correct behind a TLS proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BaseUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http");

        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Ok(BaseUrl(format!("{}://{}", scheme, host)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn base_url(request: Request<()>) -> String {
        let (mut parts, _) = request.into_parts();
        BaseUrl::from_request_parts(&mut parts, &())
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_base_url_from_headers() {
        let request = Request::builder()
            .uri("/api/note/get")
            .header(HOST, "notes.example.com")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();
        assert_eq!(base_url(request).await, "https://notes.example.com");

        let request = Request::builder()
            .uri("/api/note/get")
            .header(HOST, "localhost:5000")
            .body(())
            .unwrap();
        assert_eq!(base_url(request).await, "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_base_url_fallback() {
        let request = Request::builder().uri("/x").body(()).unwrap();
        assert_eq!(base_url(request).await, "http://localhost");
    }
}
