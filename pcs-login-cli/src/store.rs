//! JSON file backed account store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pcs_login::{CredentialStore, LoginError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BDUSS must not be empty")]
    EmptyBduss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub bduss: String,
    pub ptoken: String,
    pub stoken: String,
    pub cookies: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accounts {
    /// BDUSS of the active account.
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
}

impl Accounts {
    pub fn active_account(&self) -> Option<&AccountRecord> {
        let active = self.active.as_deref()?;
        self.accounts.iter().find(|a| a.bduss == active)
    }

    /// Inserts or replaces the record with the same BDUSS and activates it.
    ///
    /// An empty `ptoken` keeps the one already stored.
    fn upsert(&mut self, bduss: &str, ptoken: &str, stoken: &str, cookies: &str) {
        let now = Utc::now();
        match self.accounts.iter_mut().find(|a| a.bduss == bduss) {
            Some(record) => {
                if !ptoken.is_empty() {
                    record.ptoken = ptoken.to_string();
                }
                record.stoken = stoken.to_string();
                record.cookies = cookies.to_string();
                record.updated_at = now;
            }
            None => self.accounts.push(AccountRecord {
                bduss: bduss.to_string(),
                ptoken: ptoken.to_string(),
                stoken: stoken.to_string(),
                cookies: cookies.to_string(),
                updated_at: now,
            }),
        }
        self.active = Some(bduss.to_string());
    }
}

pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Accounts, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Accounts::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, accounts: &Accounts) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(accounts)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn upsert(
        &self,
        bduss: &str,
        ptoken: &str,
        stoken: &str,
        cookies: &str,
    ) -> Result<(), StoreError> {
        if bduss.is_empty() {
            return Err(StoreError::EmptyBduss);
        }

        let _guard = self.lock.lock().await;
        let mut accounts = self.load().await?;
        accounts.upsert(bduss, ptoken, stoken, cookies);
        self.save(&accounts).await?;
        debug!(path = %self.path.display(), total = accounts.accounts.len(), "Saved account");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn setup_user_by_bduss(
        &self,
        bduss: &str,
        ptoken: &str,
        stoken: &str,
        cookies: &str,
    ) -> pcs_login::Result<()> {
        self.upsert(bduss, ptoken, stoken, cookies)
            .await
            .map_err(|e| LoginError::Store(e.to_string()))
    }
}
