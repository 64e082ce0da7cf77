//! The full QR login handshake.
//!
//! `Start → CodeRequested → Polling → SessionExchanged → CredentialExtracted
//! → Done`. Polling loops until the code is confirmed; every other stage
//! fails fast. The credential store is only written once everything else has
//! succeeded.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::bdstoken::fetch_bdstoken;
use crate::config::LoginConfig;
use crate::error::Result;
use crate::gid::Gid;
use crate::poller::poll_until_confirmed;
use crate::qrcode::{ScannableCode, fetch_code_image, request_code};
use crate::session::{SessionInfo, exchange_session};
use crate::store::{CredentialStore, ExtractedCredential};
use crate::transport::Transport;

/// Stage of a running handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Start,
    CodeRequested,
    Polling,
    SessionExchanged,
    CredentialExtracted,
    Done,
    Failed,
}

impl HandshakeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CodeRequested => "code_requested",
            Self::Polling => "polling",
            Self::SessionExchanged => "session_exchanged",
            Self::CredentialExtracted => "credential_extracted",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shows a freshly requested code to the user.
#[async_trait]
pub trait CodePresenter: Send + Sync {
    async fn present(&self, code: &ScannableCode) -> Result<()>;
}

/// QR login service bound to a transport and an account store.
pub struct QrLogin<T, S> {
    transport: T,
    store: S,
    config: LoginConfig,
}

impl<T, S> QrLogin<T, S>
where
    T: Transport,
    S: CredentialStore,
{
    pub fn new(transport: T, store: S, config: LoginConfig) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn request_code(&self, gid: &Gid) -> Result<ScannableCode> {
        request_code(&self.transport, &self.config, gid).await
    }

    pub async fn fetch_code_image(&self, code: &ScannableCode) -> Result<Bytes> {
        fetch_code_image(&self.transport, &code.image_url).await
    }

    /// Waits for the code to be confirmed and returns the channel value.
    pub async fn poll(
        &self,
        code: &ScannableCode,
        gid: &Gid,
        cancel: &CancellationToken,
    ) -> Result<String> {
        poll_until_confirmed(&self.transport, &self.config, &code.sign, gid, cancel).await
    }

    /// Exchanges the channel value for a session and hands the resulting
    /// credential to the store.
    pub async fn login(&self, channel_v: &str) -> Result<ExtractedCredential> {
        let session = exchange_session(&self.transport, &self.config, channel_v).await?;
        stage(HandshakeStage::SessionExchanged);
        self.hand_off(session).await
    }

    pub async fn bdstoken(&self, cookies: &str) -> Result<String> {
        fetch_bdstoken(&self.transport, &self.config, cookies).await
    }

    /// Runs the complete handshake.
    ///
    /// `presenter` is called once with the requested code; `cancel` aborts
    /// the wait for confirmation.
    #[instrument(skip_all)]
    pub async fn run<P>(&self, presenter: &P, cancel: &CancellationToken) -> Result<ExtractedCredential>
    where
        P: CodePresenter + ?Sized,
    {
        let result = self.run_stages(presenter, cancel).await;
        if let Err(e) = &result {
            error!(stage = %HandshakeStage::Failed, error = %e, "QR login failed");
        }
        result
    }

    async fn run_stages<P>(
        &self,
        presenter: &P,
        cancel: &CancellationToken,
    ) -> Result<ExtractedCredential>
    where
        P: CodePresenter + ?Sized,
    {
        stage(HandshakeStage::Start);
        let gid = Gid::generate();
        info!(gid = %gid, "Generated login gid");

        let code = self.request_code(&gid).await?;
        stage(HandshakeStage::CodeRequested);
        presenter.present(&code).await?;

        stage(HandshakeStage::Polling);
        let channel_v = self.poll(&code, &gid, cancel).await?;

        self.login(&channel_v).await
    }

    async fn hand_off(&self, session: SessionInfo) -> Result<ExtractedCredential> {
        let credential = ExtractedCredential::from_session(session);
        stage(HandshakeStage::CredentialExtracted);

        self.store
            .setup_user_by_bduss(
                &credential.bduss,
                "",
                &credential.stoken,
                &credential.cookie_header,
            )
            .await?;
        stage(HandshakeStage::Done);
        info!("QR login succeeded");
        Ok(credential)
    }
}

fn stage(stage: HandshakeStage) {
    info!(stage = %stage, "QR login stage");
}
