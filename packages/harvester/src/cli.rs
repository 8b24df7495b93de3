//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::law_to_api_json;
use crate::catalog::HttpCatalog;
use crate::config::{validate_slug, DataLocation, HarvesterConfig};
use crate::error::{HarvesterError, Result};
use crate::gii::parse_law_file;
use crate::location::open_location;
use crate::store::{LawStore, YamlFileStore};
use crate::sync::{ingest_law, ingest_location, sync_laws, sync_location, SyncOptions, SyncReport};

/// Rechtsinfo Harvester - Ingest German federal law from gesetze-im-internet.de.
#[derive(Parser)]
#[command(name = "rechtsinfo-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where downloaded law archives live.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationArgs {
    /// Directory or s3://bucket/prefix of downloaded law archives (default: $DATA_LOCATION)
    #[arg(short, long)]
    pub data_location: Option<String>,

    /// Maximum number of laws a run may remove (default: $MAX_REMOVALS or 250)
    #[arg(long)]
    pub max_removals: Option<usize>,
}

/// Output format of the `parse` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Read API JSON document
    Api,
    /// Parsed law as JSON
    Json,
    /// Parsed law as YAML
    Yaml,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a single gii XML file and print the result.
    Parse {
        /// Path to the XML file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Api)]
        format: OutputFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Download new and updated law archives from the catalog.
    Download {
        #[command(flatten)]
        location: LocationArgs,

        /// Catalog URL (default: $GII_TOC_URL or gesetze-im-internet.de)
        #[arg(long)]
        toc_url: Option<String>,
    },

    /// Ingest downloaded laws into the law store.
    Ingest {
        #[command(flatten)]
        location: LocationArgs,

        /// Law store directory (default: $STORE_PATH or ./store)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Only ingest the law with this catalog slug
        #[arg(long)]
        slug: Option<String>,
    },

    /// Run the full pipeline: download, ingest and remove.
    Update {
        #[command(flatten)]
        location: LocationArgs,

        /// Law store directory (default: $STORE_PATH or ./store)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Catalog URL (default: $GII_TOC_URL or gesetze-im-internet.de)
        #[arg(long)]
        toc_url: Option<String>,
    },

    /// Print the API JSON of a stored law.
    Export {
        /// URL slug of the law (e.g., skaufg)
        slug: String,

        /// Law store directory (default: $STORE_PATH or ./store)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            file,
            format,
            pretty,
        } => parse_command(&file, format, pretty),
        Commands::Download { location, toc_url } => {
            let config = resolve_config(&location, None, toc_url)?;
            download_command(&config)
        }
        Commands::Ingest {
            location,
            store,
            slug,
        } => {
            let config = resolve_config(&location, store, None)?;
            ingest_command(&config, slug.as_deref())
        }
        Commands::Update {
            location,
            store,
            toc_url,
        } => {
            let config = resolve_config(&location, store, toc_url)?;
            update_command(&config)
        }
        Commands::Export {
            slug,
            store,
            pretty,
        } => export_command(&slug, store.as_deref(), pretty),
    }
}

/// Merge command-line flags over the environment configuration.
pub fn resolve_config(
    location: &LocationArgs,
    store: Option<PathBuf>,
    toc_url: Option<String>,
) -> Result<HarvesterConfig> {
    let mut config = match &location.data_location {
        Some(value) => HarvesterConfig::with_env_defaults(DataLocation::parse(value)?)?,
        None => HarvesterConfig::from_env()?,
    };

    if let Some(store) = store {
        config.store_path = store;
    }
    if let Some(toc_url) = toc_url {
        config.toc_url = toc_url;
    }
    if let Some(max_removals) = location.max_removals {
        config.max_removals = max_removals;
    }
    Ok(config)
}

fn sync_options(config: &HarvesterConfig) -> SyncOptions {
    SyncOptions {
        max_removals: config.max_removals,
    }
}

/// Create a progress spinner with a message.
fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn print_report(report: &SyncReport) {
    println!("{} {}", style("Done:").green().bold(), report);
    for failed in &report.failed {
        println!(
            "  {} {}: {}",
            style("failed").red().bold(),
            style(&failed.slug).cyan(),
            failed.error
        );
    }
}

/// Execute the parse command.
fn parse_command(file: &Path, format: OutputFormat, pretty: bool) -> Result<()> {
    let law = parse_law_file(file)?;

    let output = match format {
        OutputFormat::Api => law_to_api_json(&law, pretty)?,
        OutputFormat::Json if pretty => serde_json::to_string_pretty(&law)?,
        OutputFormat::Json => serde_json::to_string(&law)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(&law)?,
    };
    println!("{output}");
    Ok(())
}

/// Execute the download command.
fn download_command(config: &HarvesterConfig) -> Result<()> {
    println!(
        "{} {} into {}",
        style("Downloading").bold(),
        style(&config.toc_url).cyan(),
        style(&config.data_location).green()
    );

    let catalog = HttpCatalog::new(config.toc_url.clone())?;
    let location = open_location(&config.data_location)?;

    let pb = spinner("Syncing law archives...");
    let result = sync_location(&catalog, location.as_ref(), &sync_options(config));
    pb.finish_and_clear();

    print_report(&result?);
    Ok(())
}

/// Execute the ingest command.
fn ingest_command(config: &HarvesterConfig, slug: Option<&str>) -> Result<()> {
    let location = open_location(&config.data_location)?;
    let mut store = YamlFileStore::open(&config.store_path)?;

    if let Some(slug) = slug {
        validate_slug(slug)?;
        println!("{} {}", style("Ingesting").bold(), style(slug).cyan());
        ingest_law(location.as_ref(), &mut store, slug)?;
        println!("{} {}", style("Stored:").green().bold(), store.path_for(slug)?.display());
        return Ok(());
    }

    println!(
        "{} {} into {}",
        style("Ingesting").bold(),
        style(&config.data_location).cyan(),
        style(config.store_path.display()).green()
    );

    let pb = spinner("Parsing laws...");
    let result = ingest_location(location.as_ref(), &mut store, &sync_options(config));
    pb.finish_and_clear();

    print_report(&result?);
    Ok(())
}

/// Execute the update command.
fn update_command(config: &HarvesterConfig) -> Result<()> {
    println!(
        "{} {} into {}",
        style("Updating").bold(),
        style(&config.data_location).cyan(),
        style(config.store_path.display()).green()
    );

    let catalog = HttpCatalog::new(config.toc_url.clone())?;
    let location = open_location(&config.data_location)?;
    let mut store = YamlFileStore::open(&config.store_path)?;

    let pb = spinner("Syncing laws...");
    let result = sync_laws(&catalog, location.as_ref(), &mut store, &sync_options(config));
    pb.finish_and_clear();

    print_report(&result?);
    Ok(())
}

/// Execute the export command.
fn export_command(slug: &str, store: Option<&Path>, pretty: bool) -> Result<()> {
    let store_path = store.map_or_else(HarvesterConfig::store_path_from_env, Path::to_path_buf);

    let store = YamlFileStore::open(store_path)?;
    let law = store
        .find_by_slug(slug)?
        .ok_or_else(|| HarvesterError::LawNotFound(slug.to_string()))?;

    println!("{}", law_to_api_json(&law.law, pretty)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_parse() {
        let cli = Cli::parse_from(["rechtsinfo-harvester", "parse", "law.xml", "--pretty"]);

        let Commands::Parse {
            file,
            format,
            pretty,
        } = cli.command
        else {
            panic!("expected parse command");
        };
        assert_eq!(file, PathBuf::from("law.xml"));
        assert_eq!(format, OutputFormat::Api);
        assert!(pretty);
    }

    #[test]
    fn test_cli_parse_format() {
        let cli = Cli::parse_from(["rechtsinfo-harvester", "parse", "law.xml", "-f", "yaml"]);

        let Commands::Parse { format, .. } = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(format, OutputFormat::Yaml);
    }

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::parse_from([
            "rechtsinfo-harvester",
            "ingest",
            "--data-location",
            "/data",
            "--store",
            "/store",
            "--slug",
            "skaufg",
        ]);

        let Commands::Ingest {
            location,
            store,
            slug,
        } = cli.command
        else {
            panic!("expected ingest command");
        };
        assert_eq!(location.data_location.as_deref(), Some("/data"));
        assert_eq!(store, Some(PathBuf::from("/store")));
        assert_eq!(slug.as_deref(), Some("skaufg"));
    }

    #[test]
    fn test_cli_parse_update_with_limit() {
        let cli = Cli::parse_from([
            "rechtsinfo-harvester",
            "update",
            "-d",
            "/data",
            "--max-removals",
            "10",
        ]);

        let Commands::Update { location, .. } = cli.command else {
            panic!("expected update command");
        };
        assert_eq!(location.max_removals, Some(10));
    }

    #[test]
    fn test_resolve_config_flags_override() {
        let location = LocationArgs {
            data_location: Some("/data".to_string()),
            max_removals: Some(5),
        };
        let config = resolve_config(
            &location,
            Some(PathBuf::from("/store")),
            Some("http://localhost/toc.xml".to_string()),
        )
        .unwrap();

        assert_eq!(config.data_location, DataLocation::Local(PathBuf::from("/data")));
        assert_eq!(config.store_path, PathBuf::from("/store"));
        assert_eq!(config.toc_url, "http://localhost/toc.xml");
        assert_eq!(config.max_removals, 5);
    }

    #[test]
    fn test_resolve_config_s3_location() {
        let location = LocationArgs {
            data_location: Some("s3://rechtsinfo/gii".to_string()),
            max_removals: None,
        };
        let config = resolve_config(&location, Some(PathBuf::from("/store")), None).unwrap();

        assert_eq!(
            config.data_location,
            DataLocation::S3 {
                bucket: "rechtsinfo".to_string(),
                prefix: "gii".to_string(),
            }
        );
    }
}
