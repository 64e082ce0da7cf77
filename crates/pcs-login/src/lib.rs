//! QR code login for Baidu Netdisk (PCS) accounts.
//!
//! The handshake mirrors the web login page:
//!
//! 1. generate a per-attempt [`Gid`],
//! 2. request a QR code bound to it ([`qrcode::request_code`]),
//! 3. show the code and poll its status channel until the mobile app confirms
//!    ([`poller::poll_until_confirmed`]),
//! 4. exchange the confirmation for session tokens
//!    ([`session::exchange_session`]), keeping only the `netdisk` scoped
//!    STOKEN,
//! 5. hand the resulting [`ExtractedCredential`] to a [`CredentialStore`].
//!
//! [`QrLogin`] wires the steps together.

pub mod bdstoken;
pub mod config;
pub mod error;
pub mod gid;
pub mod handshake;
pub mod headers;
pub mod jsonp;
pub mod poller;
pub mod qrcode;
pub mod session;
pub mod stoken;
pub mod store;
pub mod transport;
mod utils;

pub use config::LoginConfig;
pub use error::{LoginError, Result};
pub use gid::Gid;
pub use handshake::{CodePresenter, HandshakeStage, QrLogin};
pub use qrcode::ScannableCode;
pub use session::SessionInfo;
pub use store::{CredentialStore, ExtractedCredential};
pub use transport::{Transport, default_client};

pub use tokio_util::sync::CancellationToken;
