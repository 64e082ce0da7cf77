//! Code request: asks the passport for a fresh QR code bound to a gid.

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::LoginConfig;
use crate::error::{LoginError, Result};
use crate::gid::Gid;
use crate::headers::FetchKind;
use crate::jsonp::parse_jsonp;
use crate::transport::Transport;
use crate::utils::{epoch_millis, join_url, tangram_callback};

const GET_QRCODE_PATH: &str = "/v2/api/getqrcode";

// Cache-busting offsets the web page adds to the request timestamp.
const TT_OFFSET_MS: i64 = 21232;
const UNDERSCORE_OFFSET_MS: i64 = 4;

/// A QR code ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannableCode {
    /// Absolute URL of the QR code image.
    pub image_url: String,
    /// Channel id to poll for the scan result.
    pub sign: String,
}

#[derive(Debug, Deserialize)]
struct QrImageData {
    #[serde(default)]
    imgurl: String,
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    sign: String,
}

/// Requests a new QR code for `gid`.
#[instrument(skip(transport, config))]
pub async fn request_code(
    transport: &dyn Transport,
    config: &LoginConfig,
    gid: &Gid,
) -> Result<ScannableCode> {
    let t = epoch_millis()?;
    let tt = t + TT_OFFSET_MS;
    let underscore = tt + UNDERSCORE_OFFSET_MS;
    let callback = tangram_callback(t);
    let url = format!(
        "{}?lp=pc&qrloginfrom=pc&gid={gid}&callback={callback}&apiver=v3&tt={tt}&tpl=netdisk&_={underscore}",
        join_url(&config.passport_base, GET_QRCODE_PATH),
    );

    let body = transport.get(&url, FetchKind::Script.headers()).await?;
    let body = String::from_utf8_lossy(&body);
    debug!(body = %body, "getqrcode response");

    let data: QrImageData = parse_jsonp(&body, &callback)?;
    if data.errno != 0 {
        return Err(LoginError::Provider { errno: data.errno });
    }
    if data.sign.is_empty() || data.imgurl.is_empty() {
        return Err(LoginError::ResponseFormat(
            "getqrcode response without imgurl or sign".to_string(),
        ));
    }

    Ok(ScannableCode {
        image_url: normalize_image_url(&data.imgurl),
        sign: data.sign,
    })
}

/// Downloads the QR code image so it can be decoded or displayed.
#[instrument(skip(transport))]
pub async fn fetch_code_image(transport: &dyn Transport, image_url: &str) -> Result<Bytes> {
    let url = normalize_image_url(image_url);
    transport.get(&url, FetchKind::Image.headers()).await
}

/// Makes a provider image URL absolute.
///
/// `//host/path` and bare `host/path` become `https://...`; URLs that
/// already carry `http://` or `https://` are returned unchanged.
pub fn normalize_image_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}
