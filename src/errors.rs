use crate::providers::ProviderKind;
use itertools::Itertools;
use thiserror::Error;

/// How far into a response body error snippets reach before truncation.
pub const BODY_SNIPPET_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider} returned HTTP {status}: {snippet}")]
    Network {
        provider: ProviderKind,
        status: u16,
        snippet: String,
    },
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: ProviderKind,
        message: String,
    },
    #[error("no live board provider is configured")]
    NotConfigured,
    #[error("no station code found in {0:?}")]
    NoMatch(String),
    #[error("missing template values: {}", .0.join(", "))]
    MissingTemplateValues(Vec<String>),
    #[error("all providers failed: {}", format_attempts(.attempts))]
    Exhausted {
        attempts: Vec<(ProviderKind, String)>,
    },
    #[error("station catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("geocoder failed: {0}")]
    Geocoder(String),
    #[error("no details known for service {0}")]
    UnknownService(String),
}

fn format_attempts(attempts: &[(ProviderKind, String)]) -> String {
    attempts
        .iter()
        .map(|(provider, message)| format!("{}: {}", provider, message))
        .join("; ")
}

impl FetchError {
    /// Map a provider-level failure onto the HTTP status the server surfaces.
    pub fn http_status(&self) -> u16 {
        match self {
            FetchError::Network { status, .. } => {
                if *status >= 400 { *status } else { 502 }
            }
            FetchError::NoMatch(_) | FetchError::MissingTemplateValues(_) => 400,
            FetchError::NotConfigured => 503,
            FetchError::UnknownService(_) => 404,
            _ => 502,
        }
    }
}

pub fn truncate_snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut cut = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body[..cut].to_string()
}
