//! Package signature verifier CLI
//!
//! Verifies a package's detached CMS signatures against a trust policy built
//! from the configuration file and command-line overrides.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use package_signature_verifier::{
    CancellationToken, ConfigManager, DetachedSignaturePackage, ExportFormat, RevocationMode,
    SignatureRequirement, VerifierConfiguration, VerifyWorkflow,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "package-sig-verify")]
#[command(about = "Verify package signatures, certificate chains and timestamps")]
#[command(long_about = "
Package Signature Verifier - checks signed packages against a trust policy

EXAMPLES:
    # Verify a package with its detached signature
    package-sig-verify verify --content pkg.bin --signature pkg.p7s --trusted-roots ./roots

    # Verify offline, accepting an untrusted root, JSON report
    package-sig-verify verify --content pkg.bin -s pkg.p7s --revocation-mode offline \\
        --allow-untrusted-root --format json

    # Create the default configuration file
    package-sig-verify config init

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user location)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a package and its signatures
    Verify(VerifyArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct VerifyArgs {
    /// Package content to verify
    #[arg(long, value_name = "FILE")]
    content: PathBuf,

    /// Detached primary signature (DER CMS SignedData)
    #[arg(short, long, value_name = "FILE")]
    signature: Option<PathBuf>,

    /// Detached repository countersignature
    #[arg(long, value_name = "FILE")]
    repository_signature: Option<PathBuf>,

    /// Directory of trusted root certificates (overrides config)
    #[arg(long, value_name = "DIR")]
    trusted_roots: Option<PathBuf>,

    /// Directory of cached CRLs (overrides config)
    #[arg(long, value_name = "DIR")]
    crl_cache: Option<PathBuf>,

    /// Revocation checking mode (overrides config)
    #[arg(long, value_enum)]
    revocation_mode: Option<RevocationModeArg>,

    /// Accept chains that end in an untrusted root
    #[arg(long)]
    allow_untrusted_root: bool,

    /// Accept packages without any signature
    #[arg(long)]
    allow_unsigned: bool,

    /// Require an author or repository signature
    #[arg(long, value_name = "KIND", value_parser = parse_requirement)]
    require: Option<SignatureRequirement>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ReportFormat,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. `allow_untrusted_root`, `revocation.mode`)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        /// Configuration file to import
        file: PathBuf,
        /// Import format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RevocationModeArg {
    Online,
    Offline,
    None,
}

impl From<RevocationModeArg> for RevocationMode {
    fn from(arg: RevocationModeArg) -> Self {
        match arg {
            RevocationModeArg::Online => RevocationMode::Online,
            RevocationModeArg::Offline => RevocationMode::Offline,
            RevocationModeArg::None => RevocationMode::None,
        }
    }
}

fn parse_requirement(value: &str) -> std::result::Result<SignatureRequirement, String> {
    value.parse().map_err(|e: package_signature_verifier::VerifierError| e.to_string())
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormatArg {
    Toml,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    match cli.command {
        Commands::Verify(args) => {
            let passed = handle_verify_command(&config_manager, args).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Config(cmd) => handle_config_command(&config_manager, cmd)?,
    }

    Ok(())
}

fn apply_overrides(config: &mut VerifierConfiguration, args: &VerifyArgs) {
    if let Some(dir) = &args.trusted_roots {
        config.trusted_roots_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.crl_cache {
        config.revocation.crl_cache_dir = Some(dir.clone());
    }
    if let Some(mode) = args.revocation_mode {
        config.revocation.mode = mode.into();
    }
    if let Some(kind) = args.require {
        config.required_signature = kind;
    }
    config.allow_untrusted_root |= args.allow_untrusted_root;
    config.allow_unsigned |= args.allow_unsigned;
}

async fn handle_verify_command(config_manager: &ConfigManager, args: VerifyArgs) -> Result<bool> {
    let mut config = if config_manager.config_path().exists() {
        config_manager.load().into_diagnostic()?
    } else {
        VerifierConfiguration::default()
    };
    apply_overrides(&mut config, &args);

    let package = DetachedSignaturePackage::from_files(
        &args.content,
        args.signature.as_deref(),
        args.repository_signature.as_deref(),
    )
    .into_diagnostic()?;
    let workflow = VerifyWorkflow::from_config(&config).await.into_diagnostic()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling verification");
            ctrl_c.cancel();
        }
    });

    let result = workflow.run(&package, &cancel).await.into_diagnostic()?;
    match args.format {
        ReportFormat::Text => println!("{result}"),
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        }
    }
    Ok(result.is_valid())
}

fn handle_config_command(config_manager: &ConfigManager, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                let policy = config.to_policy().into_diagnostic()?;
                println!("Current configuration ({}):", config_manager.config_path().display());
                println!("  Allow unsigned: {}", policy.allow_unsigned);
                println!("  Allow untrusted root: {}", policy.allow_untrusted_root);
                println!("  Allow missing timestamp: {}", policy.allow_no_timestamp);
                println!("  Required signature: {:?}", policy.required_signature);
                println!("  Revocation mode: {}", policy.revocation_mode);
                println!("  Revocation timeout: {:?}", policy.revocation_timeout);
                println!(
                    "  Trusted roots: {}",
                    config
                        .trusted_roots_dir
                        .as_ref()
                        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
                );
            }
            Err(_) => {
                println!("No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "Configuration initialized: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value).into_diagnostic()?;
            println!("Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager.export_config(format.into()).into_diagnostic()?;
            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            config_manager
                .import_config(&content, format.into())
                .into_diagnostic()?;
            println!("Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}
