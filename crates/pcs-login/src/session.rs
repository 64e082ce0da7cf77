//! Session exchange: trades the confirmed channel value for session tokens.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LoginConfig;
use crate::error::Result;
use crate::headers::FetchKind;
use crate::jsonp::{repair_and_parse, unwrap_jsonp};
use crate::stoken::extract_netdisk_stoken;
use crate::transport::Transport;
use crate::utils::{epoch_millis, join_url};

const QR_BDUSS_LOGIN_PATH: &str = "/v3/login/main/qrbdusslogin";

/// Fixed callback name the web page uses for the confirmation request.
pub const LOGIN_CALLBACK: &str = "bd__cbs__ay6xvs";

/// Session tokens of a logged-in account.
///
/// Values returned by [`exchange_session`] always carry the `netdisk`
/// scoped `stoken`, never the top-level one from the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub bduss: String,
    #[serde(default)]
    pub ptoken: String,
    #[serde(default)]
    pub stoken: String,
    #[serde(default, rename = "stokenList")]
    pub stoken_list: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    data: SessionData,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    session: SessionInfo,
}

/// Exchanges `channel_v` for a session.
#[instrument(skip_all)]
pub async fn exchange_session(
    transport: &dyn Transport,
    config: &LoginConfig,
    channel_v: &str,
) -> Result<SessionInfo> {
    let t = epoch_millis()?;
    let time = t + 225;
    // The page double-encodes the redirect target.
    let redirect = urlencoding::encode(&urlencoding::encode(&config.redirect_url)).into_owned();
    let url = format!(
        "{}?v={t}&bduss={bduss}&loginVersion=v4&qrcode=1&tpl=netdisk&apiver=v3&tt={t}&traceid=&time={time}&alg=v3&callback={LOGIN_CALLBACK}&u={redirect}",
        join_url(&config.passport_base, QR_BDUSS_LOGIN_PATH),
        bduss = urlencoding::encode(channel_v),
    );

    let body = transport.get(&url, FetchKind::Document.headers()).await?;
    let body = String::from_utf8_lossy(&body);
    debug!(len = body.len(), "qrbdusslogin response");

    parse_session_payload(unwrap_jsonp(&body, LOGIN_CALLBACK)?)
}

/// Parses the unwrapped confirmation payload and scopes its `stoken`.
pub fn parse_session_payload(payload: &str) -> Result<SessionInfo> {
    let login: LoginData = repair_and_parse(payload)?;
    let mut session = login.data.session;
    session.stoken = extract_netdisk_stoken(&session.stoken_list)?;
    Ok(session)
}
