//! Image Sets - CLI
//!
//! Command-line interface for managing image sets.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;

use image_sets::prompt::obtain_password;
use image_sets::{
    encrypt_folder, CatalogStatus, Protection, SetStore, StoreConfig, TerminalPrompt,
};

#[derive(Parser)]
#[command(name = "image-sets")]
#[command(version = image_sets::VERSION)]
#[command(about = "Image Sets - manage plain and password-protected photo sets")]
struct Cli {
    /// Images root directory
    #[arg(short, long, default_value = "./images")]
    images_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add images from a source folder as a new set
    Add {
        /// Source folder
        source: PathBuf,

        /// Set display name
        name: String,

        /// Encrypt the set (prompts for a password)
        #[arg(long)]
        encrypt: bool,

        /// Password to use instead of prompting
        #[arg(long, requires = "encrypt")]
        password: Option<String>,
    },

    /// Remove a set
    Remove {
        /// Set identifier
        id: String,
    },

    /// List all sets
    List,

    /// Regenerate images.json for plain sets and the catalog
    Refresh,

    /// Encrypt a folder into an output folder, without touching any catalog
    Encrypt {
        /// Source folder
        source: PathBuf,

        /// Output folder
        output: PathBuf,

        /// Set display name
        name: String,
    },

    /// Decrypt an encrypted set into a folder
    Export {
        /// Set identifier
        id: String,

        /// Output folder
        output: PathBuf,

        /// Password to use instead of prompting
        #[arg(long)]
        password: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn report_catalog(status: &CatalogStatus) {
    match status {
        CatalogStatus::Updated { default_set: Some(id) } => {
            println!("✅ Updated manifest.json (default: {})", id)
        }
        CatalogStatus::Updated { default_set: None } => {
            println!("✅ No sets left, removed manifest.json")
        }
        CatalogStatus::Stale { reason } => {
            eprintln!("⚠️ manifest.json was not updated and is out of date: {}", reason);
            eprintln!("   Run `image-sets refresh` to rebuild it.");
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = StoreConfig::new(&cli.images_dir);

    match cli.command {
        Commands::Add { source, name, encrypt, password } => {
            let store = SetStore::new(config);
            let protection = if encrypt {
                Protection::Encrypted { password: password.map(SecretString::from) }
            } else {
                Protection::Plain
            };

            let added = store
                .add(&source, &name, protection)
                .with_context(|| format!("adding {} as \"{}\"", source.display(), name))?;

            let kind = if added.summary.encrypted { "encrypted set" } else { "image set" };
            println!(
                "✅ Added {}: {} ({} images)",
                kind, added.summary.id, added.summary.image_count
            );
            report_catalog(&added.catalog);
        }

        Commands::Remove { id } => {
            let store = SetStore::new(config);
            let status = store.remove(&id).with_context(|| format!("removing \"{}\"", id))?;

            println!("🗑️ Removed set: {}", id);
            report_catalog(&status);
        }

        Commands::List => {
            let store = SetStore::new(config);
            let sets = store.list()?;

            if sets.is_empty() {
                println!("📭 No image sets found");
            } else {
                for set in sets {
                    let kind = if set.encrypted { "encrypted images" } else { "images" };
                    println!("  {}: {} ({} {})", set.id, set.name, set.image_count, kind);
                }
            }
        }

        Commands::Refresh => {
            let store = SetStore::new(config);
            let report = store.refresh()?;

            for set in &report.sets {
                let kind = if set.encrypted { "encrypted set" } else { "image set" };
                println!("  Found {}: {} ({} images)", kind, set.id, set.image_count);
            }
            match report.catalog {
                Some(catalog) => println!(
                    "✅ Generated manifest.json (default: {})",
                    catalog.default_set.unwrap_or_default()
                ),
                None => println!("📭 No image sets found"),
            }
        }

        Commands::Encrypt { source, output, name } => {
            let password = obtain_password(&TerminalPrompt)?;
            let count = encrypt_folder(&source, &output, &name, password, &config.extensions)
                .with_context(|| format!("encrypting {}", source.display()))?;

            println!("✅ Encryption complete! {} images", count);
            println!("   Output folder: {}", output.display());
            println!("   Manifest: {}", output.join("manifest.json").display());
        }

        Commands::Export { id, output, password } => {
            let store = SetStore::new(config);
            let names = store
                .export(&id, &output, password.map(SecretString::from))
                .with_context(|| format!("exporting \"{}\"", id))?;

            println!("📤 Exported {} images to {}", names.len(), output.display());
        }
    }

    Ok(())
}
