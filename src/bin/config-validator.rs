//! # Migrator Configuration Validator
//!
//! Command-line tool for validating migrator configuration directories across
//! environments before a migration is started.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use migrator_core::config::{ConfigManager, MigratorConfig};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate migrator configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment whose override file is applied on top of migrator.yaml
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration sections
    All,

    /// Validate a single section
    Component {
        /// Section name (storage, cleanup, capture, compression, polling, replatform)
        name: String,
    },

    /// List environments that have an override file
    Environments,

    /// Print the merged configuration as JSON
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {e:#}");
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn config_dir(cli: &Cli) -> PathBuf {
    cli.config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config"))
}

fn load(cli: &Cli) -> anyhow::Result<MigratorConfig> {
    let dir = config_dir(cli);
    let manager = ConfigManager::load_from_directory_with_env(Some(dir.clone()), &cli.environment)
        .with_context(|| format!("loading configuration from {}", dir.display()))?;
    Ok(manager.config().clone())
}

fn validate_all(cli: &Cli) -> anyhow::Result<()> {
    println!("🔧 Validating Migrator Configuration");
    println!("Environment: {}", cli.environment);
    println!("Config Directory: {}", config_dir(cli).display());
    println!();

    let config = load(cli)?;
    println!("✅ Configuration loaded and validated");

    for section in SECTIONS {
        validate_section(&config, section)?;
    }

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

const SECTIONS: [&str; 6] = [
    "storage",
    "cleanup",
    "capture",
    "compression",
    "polling",
    "replatform",
];

fn validate_component(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let config = load(cli)?;
    validate_section(&config, &name.to_lowercase())?;
    println!("✅ Component '{name}' validation passed!");
    Ok(())
}

fn validate_section(config: &MigratorConfig, section: &str) -> anyhow::Result<()> {
    match section {
        "storage" => {
            println!("🪣 Storage");
            println!("   ✅ Bucket: {} ({})", config.storage.bucket, config.storage.region);
        }
        "cleanup" => {
            println!("🧹 Cleanup");
            println!(
                "   ✅ Delete working directory: {}, delete bucket folder: {}",
                config.cleanup.delete_working_directory,
                config.cleanup.delete_bucket_after_completion
            );
        }
        "capture" => {
            println!("📸 Capture");
            let workdir = &config.capture.working_directory;
            if !workdir.is_dir() {
                println!("   ⚠️  Working directory {} does not exist yet", workdir.display());
            } else {
                println!("   ✅ Working directory: {}", workdir.display());
            }
            check_file(&config.capture.cancel_script_path, "cancel script")?;
        }
        "compression" => {
            println!("🗜️  Compression");
            println!("   ✅ Archiver: {}", config.compression.program);
        }
        "polling" => {
            println!("⏱️  Polling");
            let operation = config.polling.operation_policy();
            if operation.interval > operation.max_wait {
                bail!("operation poll interval exceeds the maximum wait");
            }
            println!(
                "   ✅ Operations every {:?}, instances every {:?}, ceiling {:?}",
                operation.interval,
                config.polling.instance_policy().interval,
                operation.max_wait
            );
        }
        "replatform" => {
            println!("🔧 Replatform");
            println!(
                "   ✅ Connectivity: {} attempts, {}ms apart",
                config.replatform.connectivity_attempts, config.replatform.connectivity_interval_ms
            );
        }
        other => bail!("Unknown component: {other}"),
    }
    Ok(())
}

fn check_file(path: &Path, what: &str) -> anyhow::Result<()> {
    if !path.is_file() {
        bail!("{what} {} not found", path.display());
    }
    println!("   ✅ {what}: {}", path.display());
    Ok(())
}

fn list_environments(cli: &Cli) -> anyhow::Result<()> {
    let dir = config_dir(cli);
    println!("📋 Available Environments in {}:", dir.display());

    let mut environments = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_yaml = path.extension().is_some_and(|ext| ext == "yaml");
        if let (true, Some(stem)) = (is_yaml, path.file_stem().and_then(|s| s.to_str())) {
            if stem != "migrator" {
                environments.push(stem.to_string());
            }
        }
    }
    environments.sort();

    for env in environments {
        println!("  • {env}");
    }
    Ok(())
}

fn show_config(cli: &Cli) -> anyhow::Result<()> {
    let config = load(cli)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
