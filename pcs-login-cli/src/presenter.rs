use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::ProgressBar;
use pcs_login::qrcode::fetch_code_image;
use pcs_login::{CodePresenter, LoginError, ScannableCode};
use reqwest::Client;
use tracing::{debug, warn};

use crate::qr;

#[cfg(feature = "colored-output")]
use colored::*;

/// Shows the QR code in the terminal, falling back to saving the image
/// to disk when it cannot be decoded, then starts the waiting spinner.
pub struct ImagePresenter {
    client: Client,
    image_path: PathBuf,
    spinner: ProgressBar,
}

impl ImagePresenter {
    pub fn new(client: Client, image_path: PathBuf, spinner: ProgressBar) -> Self {
        Self {
            client,
            image_path,
            spinner,
        }
    }

    async fn save(&self, image: &[u8]) -> bool {
        match tokio::fs::write(&self.image_path, image).await {
            Ok(()) => {
                debug!(path = %self.image_path.display(), bytes = image.len(), "Saved QR code");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save QR code image");
                false
            }
        }
    }
}

#[async_trait]
impl CodePresenter for ImagePresenter {
    async fn present(&self, code: &ScannableCode) -> pcs_login::Result<()> {
        let image = match fetch_code_image(&self.client, &code.image_url).await {
            Ok(image) => Some(image),
            Err(LoginError::Transport(e)) => {
                warn!(error = %e, "Failed to download QR code image");
                None
            }
            Err(e) => return Err(e),
        };

        let rendered = image.as_deref().and_then(|bytes| {
            match qr::decode(bytes).and_then(|content| qr::render(&content)) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(error = %e, "Cannot show QR code in the terminal");
                    None
                }
            }
        });
        let saved = match (&rendered, &image) {
            (None, Some(image)) => self.save(image).await,
            _ => false,
        };

        #[cfg(feature = "colored-output")]
        {
            println!("{}", "Scan the QR code with the Baidu Netdisk app:".green().bold());
            if let Some(text) = &rendered {
                println!("{text}");
            }
            if saved {
                println!("  {} {}", "Image:".yellow(), self.image_path.display().to_string().cyan());
            }
            println!("  {} {}", "URL:".yellow(), code.image_url.blue());
        }
        #[cfg(not(feature = "colored-output"))]
        {
            println!("Scan the QR code with the Baidu Netdisk app:");
            if let Some(text) = &rendered {
                println!("{text}");
            }
            if saved {
                println!("  Image: {}", self.image_path.display());
            }
            println!("  URL: {}", code.image_url);
        }

        self.spinner.set_message("Waiting for confirmation in the app...");
        self.spinner.enable_steady_tick(Duration::from_millis(120));
        Ok(())
    }
}
