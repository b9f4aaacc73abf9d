//! Integration tests for Settings loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global → Account: each layer REPLACES the keys it sets
//! - Unset keys inherit from the layer below
//!
//! These tests pass explicit file paths, so no real global config is read.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use linetree::config::{account_config_path, Settings, ACCOUNT_CONFIG_FILE};
use linetree::domain::{AggregationMode, MarginFormula};

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================
// Settings::load_files() layering
// ============================================================

#[test]
fn given_global_and_account_config_when_loading_then_account_wins_per_key() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(
        &dir,
        "linetree.toml",
        r#"
aggregation_mode = "ONLY_LEAVES"

[pricing]
unit_price_digits = 6
total_digits = 3
"#,
    );
    let account = write(
        &dir,
        ACCOUNT_CONFIG_FILE,
        r#"
[pricing]
total_digits = 2

[construction]
unit_price_calculation = true
margin_formula = "expense_ratio"
"#,
    );

    // Act
    let settings = Settings::load_files(Some(&global), Some(&account)).expect("load settings");

    // Assert
    assert_eq!(settings.aggregation_mode, AggregationMode::OnlyLeaves);
    assert_eq!(settings.pricing.unit_price_digits, 6);
    assert_eq!(settings.pricing.total_digits, 2);
    assert_eq!(settings.pricing.quantity_digits, 2, "unset key keeps default");
    assert!(settings.construction.unit_price_calculation);
    assert_eq!(settings.construction.margin_formula, MarginFormula::ExpenseRatio);
    assert_eq!(settings.compute_policy().pricing, settings.pricing);
}

#[test]
fn given_missing_files_when_loading_then_defaults_apply() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let settings = Settings::load_files(Some(&missing), None).expect("load settings");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_invalid_toml_when_loading_then_config_error_names_file() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let account = write(&dir, ACCOUNT_CONFIG_FILE, "[pricing]\ntotal_digits = \"two\"\n");

    // Act
    let err = Settings::load_files(None, Some(&account)).unwrap_err();

    // Assert
    assert!(err.to_string().contains(ACCOUNT_CONFIG_FILE), "got: {err}");
}

#[test]
fn given_document_path_when_resolving_account_config_then_sibling_file() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("invoice.json");

    assert_eq!(account_config_path(&document), dir.path().join(ACCOUNT_CONFIG_FILE));
}

#[test]
fn given_settings_when_rendering_then_toml_round_trips_through_loader() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        aggregation_mode: AggregationMode::OnlyTopLevel,
        ..Settings::default()
    };
    let path = write(&dir, "shown.toml", &settings.to_toml().unwrap());

    // Act
    let loaded = Settings::load_files(Some(&path), None).unwrap();

    // Assert
    assert_eq!(loaded, settings);
}

#[test]
fn given_template_when_parsing_then_is_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "template.toml", &Settings::template());

    let settings = Settings::load_files(Some(&path), None).expect("template parses");

    assert_eq!(settings, Settings::default());
}
