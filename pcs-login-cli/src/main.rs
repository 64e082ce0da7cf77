mod cli;
mod config;
mod presenter;
mod qr;
mod store;

use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
#[cfg(feature = "colored-output")]
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use pcs_login::{CancellationToken, QrLogin, default_client};
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::config::AppConfig;
use crate::presenter::ImagePresenter;
use crate::store::FileCredentialStore;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {:#}", e);
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Login {
            image,
            poll_interval,
            poll_timeout,
            json,
        } => {
            if image.is_some() {
                config.image_path = image;
            }
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            if poll_timeout.is_some() {
                config.poll_timeout_secs = poll_timeout;
            }
            login(&config, json).await?;
        }

        Commands::Who => {
            let store = FileCredentialStore::new(config.store_path());
            let accounts = store.load().await?;
            if accounts.accounts.is_empty() {
                println!("No accounts logged in");
            }
            for account in &accounts.accounts {
                let marker = if accounts.active.as_deref() == Some(account.bduss.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} BDUSS={}  updated {}",
                    marker,
                    mask(&account.bduss),
                    account.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        Commands::Bdstoken => {
            let store = FileCredentialStore::new(config.store_path());
            let accounts = store.load().await?;
            let account = accounts
                .active_account()
                .context("No active account, run `pcslogin login` first")?;
            let login = QrLogin::new(default_client()?, store, config.login_config());
            let token = login
                .bdstoken(&account.cookies)
                .await
                .context("Failed to fetch bdstoken")?;
            println!("{token}");
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn login(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let client = default_client()?;
    let store = FileCredentialStore::new(config.store_path());
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.blue} {msg}")?.tick_strings(&[
        "▹▹▹▹▹",
        "▸▹▹▹▹",
        "▹▸▹▹▹",
        "▹▹▸▹▹",
        "▹▹▹▸▹",
        "▹▹▹▹▸",
        "▪▪▪▪▪",
    ]));
    let presenter = ImagePresenter::new(client.clone(), config.image_path(), pb.clone());
    let login = QrLogin::new(client, store, config.login_config());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling login");
            interrupt.cancel();
        }
    });

    let credential = login.run(&presenter, &cancel).await;
    pb.finish_and_clear();
    let credential = credential.context("QR login failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&credential)?);
    } else {
        #[cfg(feature = "colored-output")]
        {
            println!("{}", "Login successful".green().bold());
            println!("  {} {}", "BDUSS:".yellow(), mask(&credential.bduss).cyan());
            println!("  {} {}", "STOKEN:".yellow(), mask(&credential.stoken).cyan());
            println!("  {} {}", "PTOKEN:".yellow(), mask(&credential.ptoken).cyan());
        }
        #[cfg(not(feature = "colored-output"))]
        {
            println!("Login successful");
            println!("  BDUSS: {}", mask(&credential.bduss));
            println!("  STOKEN: {}", mask(&credential.stoken));
            println!("  PTOKEN: {}", mask(&credential.ptoken));
        }
        println!("Saved to {}", login.store().path().display());
    }
    Ok(())
}

/// Shows only the edges of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
