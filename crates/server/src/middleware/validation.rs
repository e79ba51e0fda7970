use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// Rejects bodies that are not declared as JSON.
///
/// # Errors
///
/// `415 Unsupported Media Type` when the content type is missing or not `application/json`.
pub async fn require_json_content_type(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let content_type =
        request.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();

    if !content_type.starts_with("application/json") {
        tracing::warn!(content_type, path = %request.uri().path(), "non-json body rejected");
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    Ok(next.run(request).await)
}
