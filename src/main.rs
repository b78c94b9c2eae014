use anyhow::Context;
use clap::{Parser, Subcommand};
use portalkeys::{logging, Key, KeyApi, PortalClient, PortalConfig, ServiceId};
use std::{path::PathBuf, sync::Arc};

/// Manage keys on the developer portal.
#[derive(Parser, Debug)]
#[command(name = "portalkeys", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every key for the configured team.
    List,
    /// Show a single key and its services.
    Show { id: String },
    /// Create a new key.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        apns: bool,
        #[arg(long)]
        device_check: bool,
        /// The portal-generated MusicKit identifier.
        #[arg(long)]
        music_kit_id: Option<String>,
    },
    /// Revoke a key.
    Revoke { id: String },
    /// Download a key's private key. Keys can only be downloaded once.
    Download {
        id: String,
        /// Where to write the key, rather than stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = PortalConfig::load().context("unable to load portal configuration")?;
    logging::init_logging(&config.log_level);

    let client: Arc<dyn KeyApi> = Arc::new(PortalClient::new(&config)?);

    match cli.command {
        Command::List => {
            for key in Key::list_all(client).await? {
                println!("{}\t{}", key.id(), key.name());
            }
        }
        Command::Show { id } => {
            let mut key = Key::find(client, &id).await?;
            println!("{} ({})", key.name(), key.id());
            println!("can download: {}", key.can_download());
            println!("can revoke: {}", key.can_revoke());

            for service in key.services().await? {
                let label = match service.service_id() {
                    Some(known) => known.to_string(),
                    None => service.name.clone().unwrap_or_else(|| service.id.clone()),
                };
                println!("service: {label} {:?}", service.configurations);
            }
        }
        Command::Create {
            name,
            apns,
            device_check,
            music_kit_id,
        } => {
            let mut key =
                Key::create(client, &name, apns, device_check, music_kit_id.as_deref()).await?;
            println!("created {} ({})", key.name(), key.id());

            for service in ServiceId::ALL {
                if key.has_service(service).await? {
                    println!("enabled: {service}");
                }
            }
        }
        Command::Revoke { id } => {
            let key = Key::find(client, &id).await?;
            key.revoke().await?;
            println!("revoked {}", key.id());
        }
        Command::Download { id, output } => {
            let key = Key::find(client, &id).await?;
            let contents = key.download().await?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, contents)
                        .await
                        .with_context(|| format!("unable to write key to {}", path.display()))?;
                    tracing::info!(path = %path.display(), "saved key");
                }
                None => print!("{contents}"),
            }
        }
    }

    Ok(())
}
