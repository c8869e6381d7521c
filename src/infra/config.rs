//! Configuration management infrastructure.
//!
//! This module provides configuration file support, allowing users to save
//! and load verification policy, trusted roots and revocation settings.

use crate::domain::crypto::CertFingerprint;
use crate::domain::policy::{RevocationMode, SignatureRequirement, TrustPolicy};
use crate::infra::error::{VerifierError, VerifierResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration with all verification preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfiguration {
    /// Allow packages without any signature
    pub allow_unsigned: bool,

    /// Report malformed signatures as warnings
    pub allow_illegal: bool,

    /// Accept trust results that only carry warnings
    pub allow_untrusted: bool,

    /// Accept chains ending in a root outside the trust store (as a warning)
    pub allow_untrusted_root: bool,

    /// Accept signatures without a timestamp (as a warning)
    pub allow_no_timestamp: bool,

    /// Downgrade an invalid timestamp to warnings instead of failing
    pub allow_ignore_timestamp: bool,

    /// Accept signatures carrying more than one timestamp
    pub allow_multiple_timestamps: bool,

    /// Required signature kind: any, author, repository, author-or-repository
    pub required_signature: SignatureRequirement,

    /// SHA-256 fingerprints (hex) treated as trust anchors
    pub trusted_certificates: Vec<String>,

    /// SHA-256 fingerprints (hex) that are always rejected
    pub untrusted_certificates: Vec<String>,

    /// Directory of PEM/DER root certificates
    pub trusted_roots_dir: Option<PathBuf>,

    /// User agent for CRL downloads
    pub user_agent: String,

    /// Revocation checking preferences
    pub revocation: RevocationConfig,
}

/// Revocation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevocationConfig {
    /// online, offline or none
    pub mode: RevocationMode,

    /// Per-certificate responder timeout
    pub timeout_seconds: u64,

    /// Treat unknown revocation as a warning rather than an error
    pub allow_unknown: bool,

    /// Emit a warning when revocation status is unknown
    pub report_unknown: bool,

    /// Directory of cached `.crl` files
    pub crl_cache_dir: Option<PathBuf>,
}

impl Default for VerifierConfiguration {
    fn default() -> Self {
        let policy = TrustPolicy::verify_default();
        Self {
            allow_unsigned: policy.allow_unsigned,
            allow_illegal: policy.allow_illegal,
            allow_untrusted: policy.allow_untrusted,
            allow_untrusted_root: policy.allow_untrusted_root,
            allow_no_timestamp: policy.allow_no_timestamp,
            allow_ignore_timestamp: policy.allow_ignore_timestamp,
            allow_multiple_timestamps: policy.allow_multiple_timestamps,
            required_signature: SignatureRequirement::Any,
            trusted_certificates: Vec::new(),
            untrusted_certificates: Vec::new(),
            trusted_roots_dir: None,
            user_agent: format!("package-sig-verify/{}", env!("CARGO_PKG_VERSION")),
            revocation: RevocationConfig::default(),
        }
    }
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            mode: RevocationMode::Online,
            timeout_seconds: 15,
            allow_unknown: true,
            report_unknown: true,
            crl_cache_dir: None,
        }
    }
}

impl VerifierConfiguration {
    /// Check every value without building a policy.
    pub fn validate(&self) -> VerifierResult<()> {
        self.to_policy().map(|_| ())
    }

    /// Build the immutable policy for a verification run.
    pub fn to_policy(&self) -> VerifierResult<TrustPolicy> {
        if self.revocation.timeout_seconds == 0 {
            return Err(VerifierError::Configuration(
                "Revocation timeout must be greater than 0".to_string(),
            ));
        }

        Ok(TrustPolicy {
            allow_unsigned: self.allow_unsigned,
            allow_illegal: self.allow_illegal,
            allow_untrusted: self.allow_untrusted,
            allow_untrusted_root: self.allow_untrusted_root,
            allow_no_timestamp: self.allow_no_timestamp,
            allow_ignore_timestamp: self.allow_ignore_timestamp,
            allow_multiple_timestamps: self.allow_multiple_timestamps,
            allow_unknown_revocation: self.revocation.allow_unknown,
            report_unknown_revocation: self.revocation.report_unknown,
            revocation_mode: self.revocation.mode,
            revocation_timeout: Duration::from_secs(self.revocation.timeout_seconds),
            required_signature: self.required_signature,
            trusted_certificates: parse_fingerprints(&self.trusted_certificates)?,
            untrusted_certificates: parse_fingerprints(&self.untrusted_certificates)?,
        })
    }
}

fn parse_fingerprints(values: &[String]) -> VerifierResult<BTreeSet<CertFingerprint>> {
    values
        .iter()
        .map(|v| {
            CertFingerprint::new(v).map_err(|e| {
                VerifierError::Configuration(format!("Invalid certificate fingerprint '{v}': {e}"))
            })
        })
        .collect()
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> VerifierResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> VerifierResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir
                .join("package-signature-verifier")
                .join("config.toml"))
        } else {
            Ok(PathBuf::from("package-signature-verifier.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> VerifierResult<VerifierConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = VerifierConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> VerifierResult<VerifierConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            VerifierError::Configuration(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: VerifierConfiguration = toml::from_str(&content).map_err(|e| {
            VerifierError::Configuration(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &VerifierConfiguration) -> VerifierResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                VerifierError::Configuration(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            VerifierError::Configuration(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            VerifierError::Configuration(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Update a single top-level or revocation value
    pub fn update_value(&self, key: &str, value: &str) -> VerifierResult<()> {
        let mut config = self.load()?;
        let parse_bool = |v: &str| {
            v.parse::<bool>().map_err(|_| {
                VerifierError::Configuration(format!("Invalid boolean value: {v}"))
            })
        };

        match key {
            "allow_unsigned" => config.allow_unsigned = parse_bool(value)?,
            "allow_illegal" => config.allow_illegal = parse_bool(value)?,
            "allow_untrusted" => config.allow_untrusted = parse_bool(value)?,
            "allow_untrusted_root" => config.allow_untrusted_root = parse_bool(value)?,
            "allow_no_timestamp" => config.allow_no_timestamp = parse_bool(value)?,
            "allow_ignore_timestamp" => config.allow_ignore_timestamp = parse_bool(value)?,
            "allow_multiple_timestamps" => config.allow_multiple_timestamps = parse_bool(value)?,
            "required_signature" => config.required_signature = value.parse()?,
            "revocation.mode" => config.revocation.mode = value.parse()?,
            "revocation.timeout_seconds" => {
                config.revocation.timeout_seconds = value.parse().map_err(|_| {
                    VerifierError::Configuration(format!("Invalid timeout: {value}"))
                })?;
            }
            "revocation.allow_unknown" => config.revocation.allow_unknown = parse_bool(value)?,
            "revocation.report_unknown" => config.revocation.report_unknown = parse_bool(value)?,
            _ => {
                return Err(VerifierError::Configuration(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        config.validate()?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> VerifierResult<String> {
        let config = self.load()?;
        render(&config, format)
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> VerifierResult<()> {
        let config: VerifierConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                VerifierError::Configuration(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                VerifierError::Configuration(format!("JSON import failed: {e}"))
            })?,
        };

        config.validate()?;
        self.save(&config)
    }
}

/// Serialize a configuration in `format`.
pub fn render(config: &VerifierConfiguration, format: ExportFormat) -> VerifierResult<String> {
    match format {
        ExportFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| VerifierError::Configuration(format!("TOML export failed: {e}"))),
        ExportFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| VerifierError::Configuration(format!("JSON export failed: {e}"))),
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
}
