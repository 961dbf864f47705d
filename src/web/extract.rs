//! Pulling the address out of a request body.
//!
//! Extraction never fails: unsupported content types, unreadable bodies and
//! parse errors all come back as `None`, which callers treat the same as
//! "field not present".

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};

/// Body encodings the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/json` or any `+json` media type.
    Json,
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `multipart/form-data`.
    Multipart,
}

impl BodyKind {
    /// Classifies a request by its `Content-Type` header.
    ///
    /// Parameters such as `charset` are ignored and the media type is
    /// compared case-insensitively.
    ///
    /// ```
    /// use axum::http::{header::CONTENT_TYPE, HeaderMap};
    /// use email_gate::web::BodyKind;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(CONTENT_TYPE, "Application/JSON; charset=utf-8".parse().unwrap());
    /// assert_eq!(BodyKind::of(&headers), Some(BodyKind::Json));
    ///
    /// headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
    /// assert_eq!(BodyKind::of(&headers), None);
    /// ```
    pub fn of(headers: &HeaderMap) -> Option<Self> {
        let media_type = headers
            .get(CONTENT_TYPE)?
            .to_str()
            .ok()?
            .split(';')
            .next()?
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/json" => Some(BodyKind::Json),
            "application/x-www-form-urlencoded" => Some(BodyKind::UrlEncoded),
            "multipart/form-data" => Some(BodyKind::Multipart),
            other if other.starts_with("application/") && other.ends_with("+json") => {
                Some(BodyKind::Json)
            }
            _ => None,
        }
    }
}

/// Reads `field` from the body of `request`.
///
/// Consumes the request; the body cannot be read again afterwards. Returns
/// the value only when it is a string (JSON) or a text field (forms).
///
/// # Examples
///
/// ```
/// use axum::body::Body;
/// use axum::http::Request;
/// use email_gate::web::extract_field;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let request = Request::post("/signup")
///     .header("content-type", "application/json")
///     .body(Body::from(r#"{"email":"x@y.com"}"#))
///     .unwrap();
///
/// assert_eq!(extract_field(request, "email").await.as_deref(), Some("x@y.com"));
/// # }
/// ```
pub async fn extract_field(request: Request, field: &str) -> Option<String> {
    let kind = BodyKind::of(request.headers())?;
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.ok()?;
    extract_from_bytes(kind, parts.headers.get(CONTENT_TYPE), bytes, field).await
}

/// Reads `field` from an already buffered body.
///
/// The bytes are parsed in place, so no size limit beyond the caller's
/// buffering limit applies.
pub(crate) async fn extract_from_bytes(
    kind: BodyKind,
    content_type: Option<&HeaderValue>,
    bytes: Bytes,
    field: &str,
) -> Option<String> {
    match kind {
        BodyKind::Json => {
            let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
            value.get(field)?.as_str().map(str::to_owned)
        }
        BodyKind::UrlEncoded => serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
            .ok()?
            .into_iter()
            .find_map(|(name, value)| (name == field).then_some(value)),
        BodyKind::Multipart => {
            let boundary = multer::parse_boundary(content_type?.to_str().ok()?).ok()?;
            let stream = futures::stream::once(async move { Ok::<_, Infallible>(bytes) });
            let mut multipart = multer::Multipart::new(stream, boundary);
            while let Ok(Some(part)) = multipart.next_field().await {
                if part.name() == Some(field) {
                    return part.text().await.ok();
                }
            }
            None
        }
    }
}
