use std::time::Duration;

/// Production passport host.
pub const DEFAULT_PASSPORT_BASE: &str = "https://passport.baidu.com";

/// Page embedding the `bdstoken` value of a logged-in account.
pub const DEFAULT_BDSTOKEN_URL: &str = "https://tongxunlu.baidu.com";

/// Where the web login page would land after a successful scan.
pub const DEFAULT_REDIRECT_URL: &str = "https://pan.baidu.com/disk/home";

/// Interval between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Settings of a QR login handshake.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Scheme and host of the passport endpoints, without trailing path.
    pub passport_base: String,

    pub bdstoken_url: String,

    /// Redirect target sent with the login confirmation.
    pub redirect_url: String,

    /// Delay before each status poll.
    pub poll_interval: Duration,

    /// Give up polling after this long. `None` waits until the code is
    /// confirmed or the handshake is cancelled.
    pub poll_timeout: Option<Duration>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            passport_base: DEFAULT_PASSPORT_BASE.to_owned(),
            bdstoken_url: DEFAULT_BDSTOKEN_URL.to_owned(),
            redirect_url: DEFAULT_REDIRECT_URL.to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: None,
        }
    }
}

impl LoginConfig {
    pub fn with_passport_base(mut self, base: impl Into<String>) -> Self {
        self.passport_base = base.into();
        self
    }

    pub fn with_bdstoken_url(mut self, url: impl Into<String>) -> Self {
        self.bdstoken_url = url.into();
        self
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }
}
