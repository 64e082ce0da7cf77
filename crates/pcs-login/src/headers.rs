//! Request header families expected by the passport endpoints.
//!
//! The provider checks that requests look like they come from the web login
//! page, so each kind of fetch (script, image, document) carries the exact
//! header set a browser would send for it. `Host`, `Connection` and
//! `Accept-Encoding` are left to the HTTP client.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// User agent used for script and image fetches.
pub const WEB_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.116 Safari/537.36";

/// User agent used for the login confirmation document.
pub const DOCUMENT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36 Edg/87.0.664.66";

pub const PAN_REFERER: &str = "https://pan.baidu.com/";

const SEC_FETCH_DEST: HeaderName = HeaderName::from_static("sec-fetch-dest");
const SEC_FETCH_MODE: HeaderName = HeaderName::from_static("sec-fetch-mode");
const SEC_FETCH_SITE: HeaderName = HeaderName::from_static("sec-fetch-site");
const SEC_FETCH_USER: HeaderName = HeaderName::from_static("sec-fetch-user");

/// Kind of browser fetch a request imitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// `<script>` JSONP loads: code request and status polling.
    Script,
    /// `<img>` load of the QR code.
    Image,
    /// Top-level navigation: login confirmation.
    Document,
}

impl FetchKind {
    pub fn headers(self) -> HeaderMap {
        match self {
            Self::Script => script_headers(),
            Self::Image => image_headers(),
            Self::Document => document_headers(),
        }
    }
}

fn same_site_headers(accept: &'static str, dest: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(7);
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en,zh-CN;q=0.9,zh;q=0.8"),
    );
    headers.insert(REFERER, HeaderValue::from_static(PAN_REFERER));
    headers.insert(SEC_FETCH_DEST, HeaderValue::from_static(dest));
    headers.insert(SEC_FETCH_MODE, HeaderValue::from_static("no-cors"));
    headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("same-site"));
    headers.insert(USER_AGENT, HeaderValue::from_static(WEB_UA));
    headers
}

pub fn script_headers() -> HeaderMap {
    same_site_headers("*/*", "script")
}

pub fn image_headers() -> HeaderMap {
    same_site_headers("image/webp,image/apng,image/*,*/*;q=0.8", "image")
}

pub fn document_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(9);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "application/json,text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(SEC_FETCH_DEST, HeaderValue::from_static("document"));
    headers.insert(SEC_FETCH_MODE, HeaderValue::from_static("navigate"));
    headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("none"));
    headers.insert(SEC_FETCH_USER, HeaderValue::from_static("?1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DOCUMENT_UA));
    headers
}
