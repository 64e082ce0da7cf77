//! Status poller: waits until the QR code has been confirmed in the app.
//!
//! Every failure of a single poll (network, JSONP, JSON, missing `v`) only
//! means "not confirmed yet". The loop ends on success, on cancellation, or
//! when the optional deadline in [`LoginConfig::poll_timeout`] elapses.

use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::LoginConfig;
use crate::error::{LoginError, Result};
use crate::gid::Gid;
use crate::headers::FetchKind;
use crate::jsonp::{parse_json, parse_jsonp};
use crate::transport::Transport;
use crate::utils::{epoch_millis, join_url, tangram_callback};

const UNICAST_PATH: &str = "/channel/unicast";

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    channel_v: String,
}

#[derive(Debug, Deserialize)]
struct ChannelValue {
    #[serde(default)]
    v: Option<serde_json::Value>,
}

/// Polls the status channel of `sign` until the scan is confirmed.
///
/// Returns the channel value `v`, which is exchanged for a session next.
#[instrument(skip(transport, config, cancel))]
pub async fn poll_until_confirmed(
    transport: &dyn Transport,
    config: &LoginConfig,
    sign: &str,
    gid: &Gid,
    cancel: &CancellationToken,
) -> Result<String> {
    let deadline = config
        .poll_timeout
        .map(|timeout| (Instant::now() + timeout, timeout));
    let mut attempt: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(LoginError::Cancelled),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
        if let Some((deadline, timeout)) = deadline
            && Instant::now() >= deadline
        {
            return Err(LoginError::PollTimeout(timeout));
        }

        attempt += 1;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(LoginError::Cancelled),
            outcome = poll_once(transport, config, sign, gid) => outcome,
        };

        match outcome {
            Ok(Some(v)) => {
                debug!(attempt, "QR code confirmed");
                return Ok(v);
            }
            Ok(None) => debug!(attempt, "QR code not confirmed yet"),
            Err(e) => warn!(attempt, error = %e, "QR status poll failed, retrying"),
        }
    }
}

/// Performs one status request. `Ok(None)` means "not confirmed yet".
pub async fn poll_once(
    transport: &dyn Transport,
    config: &LoginConfig,
    sign: &str,
    gid: &Gid,
) -> Result<Option<String>> {
    let t = epoch_millis()?;
    let callback = tangram_callback(t);
    let tt = t + 5;
    let underscore = tt + 5;
    let url = format!(
        "{}?channel_id={sign}&tpl=netdisk&gid={gid}&callback={callback}&apiver=v3&tt={tt}&_={underscore}",
        join_url(&config.passport_base, UNICAST_PATH),
    );

    let body = transport.get(&url, FetchKind::Script.headers()).await?;
    let body = String::from_utf8_lossy(&body);
    let query: QueryData = parse_jsonp(&body, &callback)?;
    parse_channel_value(&query.channel_v)
}

/// Reads `v` out of the JSON text carried in `channel_v`.
pub fn parse_channel_value(channel_v: &str) -> Result<Option<String>> {
    let channel: ChannelValue = parse_json(channel_v)?;
    Ok(channel
        .v
        .as_ref()
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_owned))
}
