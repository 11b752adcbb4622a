//! cmsc-ai - AI content command line
//!
//! Streams AI completions to the terminal and installs generated content
//! bundles into a bucket.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmsc_ai::config::{CliOverrides, Settings};
use cmsc_ai::models::ContentBundle;
use cmsc_ai::services::{
    AiClient, ChatContext, ChatMessage, ChatRequest, HttpGateway, HttpMediaUploader,
};
use cmsc_ai::stream::{IngestError, ProgressInfo, StreamCallbacks};
use cmsc_ai::ContentInstaller;
#[cfg(unix)]
use cmsc_common::config::check_toml_permissions_loose;
use cmsc_common::config::{
    default_config_path, load_toml_config, write_toml_config, TomlConfig, DEFAULT_AI_URL,
    DEFAULT_API_URL, DEFAULT_MODEL,
};

#[derive(Parser, Debug)]
#[command(name = "cmsc-ai")]
#[command(about = "AI content generation and installation for CMS buckets")]
#[command(version)]
struct Args {
    /// Target bucket slug
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Backend API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "CMSC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream an AI completion to stdout
    Chat {
        prompt: String,

        /// Type slug to include as context (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,

        /// URL for the AI to read (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,

        #[arg(long)]
        model: Option<String>,
    },
    /// Install a JSON bundle of types and records
    Install { bundle: PathBuf },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Writes streamed text straight to stdout
struct TerminalCallbacks {
    stdout: std::io::Stdout,
}

impl StreamCallbacks for TerminalCallbacks {
    fn on_chunk(&mut self, text: &str) {
        let mut out = self.stdout.lock();
        // A closed pipe just stops the echo; the stream still completes
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_progress(&mut self, info: &ProgressInfo) {
        match &info.filename {
            Some(name) => eprintln!("[{}/{}] {}", info.current, info.total, name),
            None => eprintln!("[{}/{}]", info.current, info.total),
        }
    }

    fn on_complete(&mut self, full_text: &str, _correlation_id: Option<&str>) {
        if !full_text.ends_with('\n') {
            println!();
        }
    }

    fn on_error(&mut self, error: &IngestError) {
        eprintln!("\nError: {}", error);
    }
}

fn init_tracing(debug: bool, level: &str) {
    let default_filter = if debug {
        "cmsc_ai=debug,cmsc_common=debug".to_string()
    } else {
        format!("cmsc_ai={}", level)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().context("Failed to locate config directory")?,
    };

    if let Command::Config {
        action: ConfigAction::Init { force },
    } = &args.command
    {
        init_tracing(args.debug, "info");
        return config_init(&config_path, *force);
    }

    // Loaded before logging starts so the file can set the level
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    init_tracing(args.debug, &toml_config.logging.level);
    debug!(path = %config_path.display(), "Loaded config");

    #[cfg(unix)]
    {
        if matches!(check_toml_permissions_loose(&config_path), Ok(true)) {
            warn!(
                "Config file {} is readable by other users (chmod 600 recommended)",
                config_path.display()
            );
        }
    }

    let model_override = match &args.command {
        Command::Chat { model, .. } => model.clone(),
        _ => None,
    };
    let settings = Settings::resolve(
        &CliOverrides {
            api_url: args.api_url.clone(),
            bucket: args.bucket.clone(),
            model: model_override,
        },
        &toml_config,
    );

    match args.command {
        Command::Chat {
            prompt,
            types,
            links,
            ..
        } => chat(&settings, prompt, types, links).await,
        Command::Install { bundle } => install(&settings, &bundle).await,
        Command::Config { .. } => Ok(()),
    }
}

async fn chat(
    settings: &Settings,
    prompt: String,
    types: Vec<String>,
    links: Vec<String>,
) -> Result<()> {
    let bucket = settings.require_bucket()?;
    let client = AiClient::new(&settings.ai_url, bucket, settings.write_key.clone())?;

    let request = ChatRequest::new(&settings.model, vec![ChatMessage::user(prompt)]).with_context(
        ChatContext {
            object_types: types,
            links,
        },
    );

    let mut callbacks = TerminalCallbacks {
        stdout: std::io::stdout(),
    };

    // Ctrl-C drops the stream future, which closes the connection
    tokio::select! {
        result = client.stream_chat(&request, &mut callbacks) => {
            let outcome = result?;
            if let Some(id) = &outcome.correlation_id {
                info!(message_id = %id, chars = outcome.text.len(), "Chat complete");
            }
        }
        _ = signal::ctrl_c() => {
            eprintln!();
            info!("Interrupted, closing stream");
        }
    }

    Ok(())
}

async fn install(settings: &Settings, bundle_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(bundle_path)
        .with_context(|| format!("Failed to read {}", bundle_path.display()))?;
    let bundle: ContentBundle = serde_json::from_str(&content)
        .with_context(|| format!("Invalid bundle {}", bundle_path.display()))?;

    let gateway_settings = settings.gateway_settings()?;
    let gateway = HttpGateway::new(gateway_settings.clone())?;
    let uploader = HttpMediaUploader::new(gateway_settings)?;

    let installer = ContentInstaller::new(&gateway, &uploader, settings.install_settings());
    let summary = installer.install_bundle(&bundle).await?;

    println!("{}", summary.display_string());
    for error in summary.type_errors.iter().chain(summary.record_errors.iter()) {
        println!("  {}: {}", error.title, error.message);
    }

    if summary.has_errors() {
        bail!("Install finished with errors");
    }
    Ok(())
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let starter = TomlConfig {
        api_url: Some(DEFAULT_API_URL.to_string()),
        ai_url: Some(DEFAULT_AI_URL.to_string()),
        model: Some(DEFAULT_MODEL.to_string()),
        ..TomlConfig::default()
    };
    write_toml_config(&starter, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
