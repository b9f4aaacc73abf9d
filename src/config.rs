//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/linetree/linetree.toml`
//! 3. Account config: `--account-config <path>`, else `<document dir>/.linetree.toml`
//! 4. Environment variables: `LINETREE__*` (`__` separates sections)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{AggregationMode, ComputePolicy, CostPolicy, MarginFormula, PricingPolicy};

/// File name of the per-account config next to a document.
pub const ACCOUNT_CONFIG_FILE: &str = ".linetree.toml";

/// Raw pricing section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPricing {
    pub unit_price_digits: Option<u32>,
    pub quantity_digits: Option<u32>,
    pub coefficient_digits: Option<u32>,
    pub total_digits: Option<u32>,
}

/// Raw construction section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawConstruction {
    pub unit_price_calculation: Option<bool>,
    pub margin_formula: Option<MarginFormula>,
    pub margin_digits: Option<u32>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub aggregation_mode: Option<AggregationMode>,
    pub pricing: RawPricing,
    pub construction: RawConstruction,
}

/// Unified configuration for linetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Which lines the flat persisted list keeps
    pub aggregation_mode: AggregationMode,
    /// Decimal precision of the price path
    pub pricing: PricingPolicy,
    /// Cost price aggregation and margins
    pub construction: CostPolicy,
}

/// Get the XDG config directory for linetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "linetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("linetree.toml"))
}

/// Get the path to the account config file that applies to a document.
pub fn account_config_path(document: &Path) -> PathBuf {
    document
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(ACCOUNT_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Policies handed to one recompute operation.
    pub fn compute_policy(&self) -> ComputePolicy {
        ComputePolicy {
            pricing: self.pricing,
            cost: self.construction,
        }
    }

    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let pricing = &overlay.pricing;
        let construction = &overlay.construction;
        Self {
            aggregation_mode: overlay.aggregation_mode.unwrap_or(self.aggregation_mode),
            pricing: PricingPolicy {
                unit_price_digits: pricing.unit_price_digits.unwrap_or(self.pricing.unit_price_digits),
                quantity_digits: pricing.quantity_digits.unwrap_or(self.pricing.quantity_digits),
                coefficient_digits: pricing.coefficient_digits.unwrap_or(self.pricing.coefficient_digits),
                total_digits: pricing.total_digits.unwrap_or(self.pricing.total_digits),
            },
            construction: CostPolicy {
                unit_price_calculation: construction
                    .unit_price_calculation
                    .unwrap_or(self.construction.unit_price_calculation),
                margin_formula: construction.margin_formula.unwrap_or(self.construction.margin_formula),
                margin_digits: construction.margin_digits.unwrap_or(self.construction.margin_digits),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `account_config` - Optional account config file, merged when it exists
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/linetree/linetree.toml`
    /// 3. Account config
    /// 4. Environment variables: `LINETREE__*`
    pub fn load(account_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        let current = Self::load_files(global.as_deref(), account_config)?;
        Self::apply_env_overrides(current)
    }

    /// Defaults plus the given files, each merged only when it exists.
    pub fn load_files(global: Option<&Path>, account: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();
        for path in [global, account].into_iter().flatten() {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }
        Ok(current)
    }

    /// Apply LINETREE__* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let source = Environment::with_prefix("LINETREE").separator("__");
        Self::apply_overrides(settings, source)
    }

    fn apply_overrides(mut settings: Self, source: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder().add_source(source).build().map_err(config_err)?;

        if let Ok(val) = config.get_string("aggregation_mode") {
            settings.aggregation_mode = val.parse().map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get::<u32>("pricing.unit_price_digits") {
            settings.pricing.unit_price_digits = val;
        }
        if let Ok(val) = config.get::<u32>("pricing.quantity_digits") {
            settings.pricing.quantity_digits = val;
        }
        if let Ok(val) = config.get::<u32>("pricing.coefficient_digits") {
            settings.pricing.coefficient_digits = val;
        }
        if let Ok(val) = config.get::<u32>("pricing.total_digits") {
            settings.pricing.total_digits = val;
        }
        if let Ok(val) = config.get_bool("construction.unit_price_calculation") {
            settings.construction.unit_price_calculation = val;
        }
        if let Ok(val) = config.get_string("construction.margin_formula") {
            settings.construction.margin_formula =
                val.parse().map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get::<u32>("construction.margin_digits") {
            settings.construction.margin_digits = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# linetree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/linetree/linetree.toml  (defaults for every account)
#   Account: <document dir>/.linetree.toml     (or --account-config <path>)
#   Env:     LINETREE__* environment variables, e.g. LINETREE__PRICING__TOTAL_DIGITS=2

# Lines kept in the flat persisted list: ALL, ONLY_LEAVES or ONLY_TOP_LEVEL
# aggregation_mode = "ALL"

[pricing]
# unit_price_digits = 4
# quantity_digits = 2
# coefficient_digits = 4
# total_digits = 2

[construction]
# Aggregate cost prices and derive gross margins
# unit_price_calculation = false

# markup:        price / cost - (1 + general_expenses)
# expense_ratio: price / (general_expenses * cost)
# margin_formula = "markup"
# margin_digits = 2
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
