//! gzip handling for request and response bodies.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use http::HeaderMap;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING};

#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    #[error("corrupt gzip body: {0}")]
    Corrupt(#[from] io::Error),

    #[error("inflated body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

fn is_gzip_token(token: &str) -> bool {
    token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip")
}

/// True when the request declares a gzip-encoded body.
pub fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| is_gzip_token(token.trim()))
}

/// True when `Accept-Encoding` accepts gzip with a non-zero quality.
///
/// An explicit `gzip` entry takes precedence over a `*` wildcard.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    let mut gzip = None;
    let mut wildcard = None;
    let entries = headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','));

    for entry in entries {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or("").trim();
        let slot = if is_gzip_token(coding) {
            &mut gzip
        } else if coding == "*" {
            &mut wildcard
        } else {
            continue;
        };
        let quality = parts
            .find_map(|param| {
                let (name, value) = param.split_once('=')?;
                name.trim().eq_ignore_ascii_case("q").then(|| value.trim())
            })
            .map(|q| q.parse::<f32>().unwrap_or(0.0))
            .unwrap_or(1.0);
        *slot = Some(quality);
    }

    gzip.or(wildcard).is_some_and(|quality| quality > 0.0)
}

/// Inflate a gzip body, refusing to produce more than `limit` bytes.
pub fn inflate(body: &[u8], limit: usize) -> Result<Vec<u8>, InflateError> {
    let mut inflated = Vec::new();
    GzDecoder::new(body)
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut inflated)?;
    if inflated.len() > limit {
        return Err(InflateError::TooLarge { limit });
    }
    Ok(inflated)
}

pub fn gzip(body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
