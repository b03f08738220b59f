//! Linkshare CLI
//!
//! Thin wrapper around linkshare-core for local administration.
//!
//! ## Usage
//!
//! ```bash
//! # Show a profile
//! linkshare profile show <owner>
//!
//! # Edit a profile (runs the same validation and upload as the editor)
//! linkshare profile set <owner> --first-name Jane --last-name Doe --avatar me.png
//!
//! # Seed and list links
//! linkshare links add <owner> GitHub https://github.com/jane
//! linkshare links list <owner>
//! linkshare links remove <owner> <link-id>
//!
//! # Render the public preview
//! linkshare preview <owner>
//!
//! # Print the effective configuration
//! linkshare config
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkshare_core::{
    LinkId, LinkRecord, LinkshareConfig, LinkshareEngine, OwnerId, Platform, PreviewProjector,
    PreviewState, RouteLog, SubmitOutcome, UploadedAsset, MOCKUP_SLOTS,
};

/// Config file looked up in the data directory when `--config` is not given
const CONFIG_FILE_NAME: &str = "linkshare.toml";

/// How long `preview` waits when no preview timeout is configured
const DEFAULT_PREVIEW_WAIT: Duration = Duration::from_secs(5);

/// Linkshare - link-sharing profiles
#[derive(Parser)]
#[command(name = "linkshare")]
#[command(version = "0.1.0")]
#[command(about = "Linkshare - link-sharing profiles")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: platform data dir + /linkshare)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/linkshare.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile management
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Link management
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Render an owner's public preview
    Preview {
        /// Owner id
        owner: String,

        /// Show the fixed phone-mockup slots instead of the plain link list
        #[arg(long)]
        mockup: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show a stored profile
    Show {
        /// Owner id
        owner: String,
    },

    /// Update profile fields; omitted fields keep their stored value
    Set {
        /// Owner id
        owner: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Path to an avatar image
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LinksAction {
    /// List an owner's link records, including unknown platforms
    List {
        /// Owner id
        owner: String,
    },

    /// Add a link record
    Add {
        /// Owner id
        owner: String,
        /// Platform name (GitHub, LinkedIn, YouTube, Facebook)
        platform: String,
        url: String,
    },

    /// Remove one of an owner's link records
    Remove {
        /// Owner id
        owner: String,
        /// Link id as printed by `links add` and `links list`
        id: String,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (<platform data dir>/linkshare)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linkshare")
}

fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<LinkshareConfig> {
    let config = match explicit {
        Some(path) => LinkshareConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?,
        None => LinkshareConfig::load_or_default(data_dir.join(CONFIG_FILE_NAME))?,
    };
    Ok(config)
}

fn parse_owner(s: &str) -> Result<OwnerId> {
    OwnerId::new(s).map_err(|e| anyhow::anyhow!("{}", e))
}

/// Read an avatar file, taking its MIME type from the file extension
fn read_avatar(path: &Path) -> Result<UploadedAsset> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read avatar file: {}", e))?;
    let mime_type = image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedAsset::new(file_name, mime_type, bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config = load_config(cli.config.as_deref(), &data_dir)?;
    tracing::debug!(?data_dir, ?config, "Starting linkshare");

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let engine = LinkshareEngine::open(&data_dir, config)?;

    match cli.command {
        Commands::Profile { action } => match action {
            ProfileAction::Show { owner } => {
                let owner = parse_owner(&owner)?;
                match engine.profiles().load(&owner).await? {
                    Some(profile) => {
                        println!("Profile for {}:", owner);
                        println!("  First name: {}", profile.first_name);
                        println!("  Last name: {}", profile.last_name);
                        println!(
                            "  Email: {}",
                            if profile.email.is_empty() { "(empty)" } else { &profile.email }
                        );
                        if let Some(url) = &profile.image_url {
                            println!("  Avatar: {}", url);
                        }
                    }
                    None => println!("No profile for {}.", owner),
                }
            }

            ProfileAction::Set {
                owner,
                first_name,
                last_name,
                email,
                avatar,
            } => {
                let owner = parse_owner(&owner)?;
                if first_name.is_none() && last_name.is_none() && email.is_none() && avatar.is_none()
                {
                    println!("No changes made.");
                    return Ok(());
                }

                let editor = engine.editor(Arc::new(RouteLog::new()));
                editor.bind(&owner).await?;
                if let Some(v) = first_name {
                    editor.set_first_name(v);
                }
                if let Some(v) = last_name {
                    editor.set_last_name(v);
                }
                if let Some(v) = email {
                    editor.set_email(v);
                }
                if let Some(path) = avatar {
                    editor.select_asset(read_avatar(&path)?);
                }

                match editor.submit().await {
                    SubmitOutcome::Saved(profile) => {
                        println!("Profile updated!");
                        if let Some(url) = profile.image_url {
                            println!("  Avatar: {}", url);
                        }
                    }
                    SubmitOutcome::Invalid(errors) => {
                        for error in errors.iter() {
                            eprintln!("  {}", error);
                        }
                        anyhow::bail!("Profile not saved: invalid fields");
                    }
                    SubmitOutcome::UploadFailed(e) => {
                        anyhow::bail!("{}", e.user_message());
                    }
                    SubmitOutcome::PersistFailed(e) => {
                        anyhow::bail!("{}", e);
                    }
                    SubmitOutcome::Rejected => {
                        anyhow::bail!("Profile not saved: another save is in progress");
                    }
                }
            }
        },

        Commands::Links { action } => match action {
            LinksAction::List { owner } => {
                let owner = parse_owner(&owner)?;
                let links = engine.links().fetch_links(&owner).await?;
                if links.is_empty() {
                    println!("No links for {}.", owner);
                } else {
                    println!("Links for {} ({}):", owner, links.len());
                    for link in links {
                        let note = if link.known_platform().is_some() {
                            ""
                        } else {
                            " (unknown platform, hidden from preview)"
                        };
                        println!("  {} {} {}{}", link.id, link.platform, link.url, note);
                    }
                }
            }

            LinksAction::Add {
                owner,
                platform,
                url,
            } => {
                let owner = parse_owner(&owner)?;
                if Platform::from_name(&platform).is_none() {
                    eprintln!(
                        "Warning: '{}' is not a known platform and will not appear in previews",
                        platform
                    );
                }
                let link = LinkRecord::new(owner, platform, url);
                engine.storage().save_link(&link)?;
                println!("Link added!");
                println!("  ID: {}", link.id);
            }

            LinksAction::Remove { owner, id } => {
                let owner = parse_owner(&owner)?;
                let id = LinkId::from_string(&id)
                    .map_err(|e| anyhow::anyhow!("Invalid link id '{}': {}", id, e))?;
                let links = engine.links().fetch_links(&owner).await?;
                if !links.iter().any(|link| link.id == id) {
                    anyhow::bail!("No link {} for {}", id, owner);
                }
                engine.storage().delete_link(&id)?;
                println!("Link removed.");
            }
        },

        Commands::Preview { owner, mockup } => {
            let owner = parse_owner(&owner)?;
            let wait = engine.config().preview_timeout().unwrap_or(DEFAULT_PREVIEW_WAIT);
            let projector =
                PreviewProjector::with_timeout(engine.profiles(), engine.links(), &owner, Some(wait));

            match projector.settled().await {
                PreviewState::Ready(preview) => {
                    println!(
                        "{}",
                        preview.display_name.as_deref().unwrap_or("(no name)")
                    );
                    if let Some(email) = &preview.email {
                        println!("{}", email);
                    }
                    if let Some(url) = &preview.image_url {
                        println!("Avatar: {}", url);
                    }
                    if let Some(error) = &preview.link_error {
                        eprintln!("Links unavailable: {}", error);
                    }
                    println!();
                    if mockup {
                        for (i, slot) in preview.mockup_slots(MOCKUP_SLOTS).into_iter().enumerate() {
                            match slot {
                                Some(link) => {
                                    println!("  {}. {} [{}] {}", i + 1, link.platform, link.color, link.url)
                                }
                                None => println!("  {}. (empty)", i + 1),
                            }
                        }
                    } else if preview.links.is_empty() {
                        println!("No links.");
                    } else {
                        for link in &preview.links {
                            println!("  {} [{}] {}", link.platform, link.color, link.url);
                        }
                    }
                }
                PreviewState::Unavailable | PreviewState::Loading => {
                    anyhow::bail!("No profile for {}", owner);
                }
            }
        }

        // Printed before the engine is opened
        Commands::Config => {}
    }

    Ok(())
}
