use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::passkey::platform::PlatformTarget;
use crate::passkey::marshal::DEFAULT_ASSERTION_TIMEOUT_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasskeySettings {
    /// Enforce the local biometric check before a ceremony starts.
    /// When unset it is enforced on Apple targets only.
    pub require_biometrics: Option<bool>,
    /// Relying party id for assertions whose options omit `rpId`
    pub default_rp_id: Option<String>,
    /// Timeout passed to the provider for assertions without one
    pub assertion_timeout_ms: u32,
    /// Log a warning for each requested extension missing from a result
    pub warn_on_missing_extensions: bool,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for PasskeySettings {
    fn default() -> Self {
        Self {
            require_biometrics: None,
            default_rp_id: None,
            assertion_timeout_ms: DEFAULT_ASSERTION_TIMEOUT_MS,
            warn_on_missing_extensions: true,
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PasskeySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        settings.apply_env_overrides();

        settings.initialize_logging();
        Ok(settings)
    }

    /// Initialize `env_logger` with the configured level.
    /// An already installed logger is left in place.
    fn initialize_logging(&self) {
        if env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init()
            .is_err()
        {
            log::debug!("Logger already initialized, keeping it");
        }
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSKEYS_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            println!(
                "✓ Loaded passkey settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(config_dir) = std::env::var("PASSKEYS_CONFIG_DIR") {
            let config_path = Path::new(&config_dir).join("Settings.toml");
            if config_path.exists() {
                settings = Self::from_file(&config_path)?;
                println!("✓ Overriding passkey settings from {}", config_path.display());
            } else {
                println!(
                    "ℹ PASSKEYS_CONFIG_DIR set but no Settings.toml found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("PASSKEYS_REQUIRE_BIOMETRICS") {
            if let Ok(required) = value.parse::<bool>() {
                self.require_biometrics = Some(required);
            }
        }
        if let Ok(rp_id) = std::env::var("PASSKEYS_RP_ID") {
            if !rp_id.is_empty() {
                self.default_rp_id = Some(rp_id);
            }
        }
        if let Ok(value) = std::env::var("PASSKEYS_ASSERTION_TIMEOUT_MS") {
            if let Ok(timeout) = value.parse::<u32>() {
                self.assertion_timeout_ms = timeout;
            }
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Whether the biometric guard applies on `target`
    #[must_use]
    pub fn requires_biometrics(&self, target: PlatformTarget) -> bool {
        self.require_biometrics
            .unwrap_or(target == PlatformTarget::Apple)
    }
}
