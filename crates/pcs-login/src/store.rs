//! Handoff of the final credential to the account store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionInfo;

/// Credential produced by a completed login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCredential {
    pub bduss: String,
    pub ptoken: String,
    /// `netdisk` scoped STOKEN.
    pub stoken: String,
    /// `BDUSS=..;PTOKEN=..;STOKEN=..;`
    pub cookie_header: String,
}

impl ExtractedCredential {
    /// Builds the credential from a session returned by
    /// [`exchange_session`](crate::session::exchange_session).
    pub(crate) fn from_session(session: SessionInfo) -> Self {
        let cookie_header = cookie_header(&session.bduss, &session.ptoken, &session.stoken);
        Self {
            bduss: session.bduss,
            ptoken: session.ptoken,
            stoken: session.stoken,
            cookie_header,
        }
    }
}

/// Formats the cookie header used by storage API requests.
pub fn cookie_header(bduss: &str, ptoken: &str, stoken: &str) -> String {
    format!("BDUSS={bduss};PTOKEN={ptoken};STOKEN={stoken};")
}

/// Account store receiving the credential of a successful login.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts or updates the account identified by `bduss` and makes it
    /// the active one.
    async fn setup_user_by_bduss(
        &self,
        bduss: &str,
        ptoken: &str,
        stoken: &str,
        cookies: &str,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header() {
        assert_eq!(cookie_header("B", "P", "S"), "BDUSS=B;PTOKEN=P;STOKEN=S;");
    }

    #[test]
    fn test_from_session() {
        let session = SessionInfo {
            bduss: "B".into(),
            ptoken: "P".into(),
            stoken: "S".into(),
            stoken_list: String::new(),
        };
        let credential = ExtractedCredential::from_session(session);
        assert_eq!(credential.cookie_header, "BDUSS=B;PTOKEN=P;STOKEN=S;");
        assert_eq!(credential.stoken, "S");
    }
}
