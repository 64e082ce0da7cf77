use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{LoginError, Result};

/// Milliseconds since the Unix epoch.
pub(crate) fn epoch_millis() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| LoginError::SystemTime)?;
    i64::try_from(elapsed.as_millis()).map_err(|_| LoginError::SystemTime)
}

/// JSONP callback name used by the passport web page for timestamp `t`.
#[inline]
pub(crate) fn tangram_callback(t: i64) -> String {
    format!("tangram_guid_{t}")
}

/// Joins a base URL and an absolute path without doubling the slash.
#[inline]
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
