//! `bdstoken` lookup for an already logged-in account.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::instrument;

use crate::config::LoginConfig;
use crate::error::{LoginError, Result};
use crate::headers::WEB_UA;
use crate::transport::Transport;

static BDSTOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var bdstoken = '(.*?)'").unwrap());

/// Fetches the `bdstoken` of the account identified by `cookies`.
#[instrument(skip_all)]
pub async fn fetch_bdstoken(
    transport: &dyn Transport,
    config: &LoginConfig,
    cookies: &str,
) -> Result<String> {
    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(USER_AGENT, HeaderValue::from_static(WEB_UA));
    headers.insert(
        COOKIE,
        HeaderValue::from_str(cookies).map_err(|e| LoginError::InvalidCookie(e.to_string()))?,
    );

    let body = transport.get(&config.bdstoken_url, headers).await?;
    parse_bdstoken(&String::from_utf8_lossy(&body))
        .map(str::to_owned)
        .ok_or(LoginError::BdstokenNotFound)
}

pub fn parse_bdstoken(html: &str) -> Option<&str> {
    BDSTOKEN_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
