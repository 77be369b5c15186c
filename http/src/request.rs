use http::HeaderMap;
use http::header::HOST;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// Decode `application/x-www-form-urlencoded` pairs, keeping order and
/// duplicates. Malformed input decodes to nothing.
pub fn decode_pairs(raw: &[u8]) -> Vec<(String, String)> {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(raw) {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::warn!(error = %err, "undecodable form data");
            Vec::new()
        }
    }
}

/// Route-table key for a request path: trailing slashes are ignored.
pub fn route_path(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// The origin the carrier used to reach us.
///
/// A configured public base URL always wins. Behind a proxy the carrier
/// signs the public URL, so the `X-Forwarded-*` headers are consulted next.
pub fn external_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured.map(str::trim).filter(|base| !base.is_empty()) {
        return base.trim_end_matches('/').to_string();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let proto = header(FORWARDED_PROTO).unwrap_or("http");
    let host = header(FORWARDED_HOST)
        .or_else(|| header(HOST.as_str()))
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}
