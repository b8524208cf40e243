use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::debug;

use crate::error::UpstreamError;

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SNIPPET_CHARS: usize = 220;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, UpstreamError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport {
                adapter: "http_client",
                message: format!("failed to build http client: {e}"),
            })
    })
}

/// One GET against an upstream provider. Every call carries its own timeout;
/// callers pick it per provider.
pub struct JsonRequest<'a> {
    pub adapter: &'static str,
    pub url: &'a str,
    pub query: &'a [(&'a str, &'a str)],
    pub headers: &'a [(&'a str, &'a str)],
    pub timeout: Duration,
}

pub fn fetch_text(req: &JsonRequest<'_>) -> Result<String, UpstreamError> {
    let client = http_client()?;
    let mut builder = client
        .get(req.url)
        .query(req.query)
        .timeout(req.timeout)
        .header(USER_AGENT, BROWSER_UA)
        .header(ACCEPT, "application/json, text/plain, */*");
    for (name, value) in req.headers {
        builder = builder.header(*name, *value);
    }

    debug!(adapter = req.adapter, url = req.url, "upstream request");
    let resp = builder
        .send()
        .map_err(|e| classify(req.adapter, req.timeout, e))?;
    let status = resp.status();
    let body = resp
        .text()
        .map_err(|e| classify(req.adapter, req.timeout, e))?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            adapter: req.adapter,
            status: status.as_u16(),
            snippet: snippet(&body),
        });
    }
    Ok(body)
}

fn classify(adapter: &'static str, timeout: Duration, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            adapter,
            secs: timeout.as_secs(),
        }
    } else {
        UpstreamError::Transport {
            adapter,
            message: err.to_string(),
        }
    }
}

pub fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

/// Empty bodies and a literal `null` count as malformed payloads.
pub fn non_empty_body<'a>(adapter: &'static str, body: &'a str) -> Result<&'a str, UpstreamError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(UpstreamError::parse(adapter, "empty response body"));
    }
    Ok(trimmed)
}
