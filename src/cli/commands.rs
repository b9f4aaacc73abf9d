//! Command dispatch: each subcommand loads its document, runs one service call and reports.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::parse_payload_str;
use crate::application::services::EditOutcome;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{account_config_path, global_config_path, Settings};
use crate::domain::AggregationMode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::document::Document;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Recompute { document, edit }) => recompute(cli, document, edit),
        Some(Commands::Reprice { document }) => reprice(cli, document),
        Some(Commands::Flatten { document, mode }) => flatten(cli, document, mode.map(Into::into)),
        Some(Commands::Tree { document }) => tree(cli, document),
        Some(Commands::NextIndex { document, parent }) => next_index(cli, document, parent.as_deref()),
        Some(Commands::Config { command }) => config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

/// Account config that applies to `document`: explicit flag first, then the sibling file.
fn resolve_account_config(cli: &Cli, document: Option<&Path>) -> CliResult<Option<PathBuf>> {
    match (&cli.account_config, document) {
        (Some(path), _) if !path.is_file() => Err(CliError::InvalidArgs(format!(
            "account config not found: {}",
            path.display()
        ))),
        (Some(path), _) => Ok(Some(path.clone())),
        (None, Some(document)) => Ok(Some(account_config_path(document))),
        (None, None) => Ok(None),
    }
}

fn container(cli: &Cli, document: Option<&Path>) -> CliResult<ServiceContainer> {
    let account = resolve_account_config(cli, document)?;
    let settings = Settings::load(account.as_deref()).map_err(InfraError::from)?;
    debug!("effective settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

fn load_document(container: &ServiceContainer, path: &Path) -> CliResult<Document> {
    Ok(container.document_store().load(path)?)
}

fn save_document(cli: &Cli, container: &ServiceContainer, path: &Path, document: &Document) -> CliResult<PathBuf> {
    let target = cli.output.clone().unwrap_or_else(|| path.to_path_buf());
    container.document_store().save(&target, document)?;
    Ok(target)
}

#[instrument(skip(cli))]
fn recompute(cli: &Cli, path: &Path, edit: &Path) -> CliResult<()> {
    let container = container(cli, Some(path))?;
    let store = container.document_store();
    let mut document = load_document(&container, path)?;
    let payload = parse_payload_str(&store.read_text(edit)?).map_err(InfraError::from)?;

    let service = container.recompute_service(&document);
    let policy = container.settings.compute_policy();
    let mut tree = document.tree();
    let outcome = service
        .update_related_lines(&mut tree, &payload, &policy)
        .map_err(InfraError::from)?;

    match &outcome {
        EditOutcome::Applied { line, updated } => {
            let previous = std::mem::take(&mut document.flat_lines);
            let previous_len = previous.len();
            let surviving = service.remove_detached_lines(previous, &tree);
            let flat = service.synchronize(&tree, container.settings.aggregation_mode);
            document.set_tree(&tree, flat);
            let target = save_document(cli, &container, path, &document)?;
            output::success(&format!("recomputed line {line}"));
            output::detail(&format!("{updated} sub-lines propagated"));
            output::detail(&format!("{} detached flat lines removed", previous_len - surviving.len()));
            output::detail(&format!("written to {}", target.display()));
        }
        EditOutcome::NoDirtyLine => output::warning("no line flagged as changed, document unchanged"),
        EditOutcome::IdentityMismatch { line } => {
            output::warning(&format!("line {line} not found in document, document unchanged"))
        }
    }
    Ok(())
}

#[instrument(skip(cli))]
fn reprice(cli: &Cli, path: &Path) -> CliResult<()> {
    let container = container(cli, Some(path))?;
    let mut document = load_document(&container, path)?;
    let service = container.recompute_service(&document);

    let mut tree = document.tree();
    service
        .recalculate_all_prices(&mut tree, &container.settings.compute_policy())
        .map_err(InfraError::from)?;
    let flat = service.synchronize(&tree, container.settings.aggregation_mode);
    document.set_tree(&tree, flat);

    let target = save_document(cli, &container, path, &document)?;
    output::success(&format!("repriced {} top-level lines", tree.roots().len()));
    output::detail(&format!("written to {}", target.display()));
    Ok(())
}

#[instrument(skip(cli))]
fn flatten(cli: &Cli, path: &Path, mode: Option<AggregationMode>) -> CliResult<()> {
    let container = container(cli, Some(path))?;
    let document = load_document(&container, path)?;
    let mode = mode.unwrap_or(container.settings.aggregation_mode);

    let flat = container
        .recompute_service(&document)
        .synchronize(&document.tree(), mode);
    let json = serde_json::to_string_pretty(&flat)
        .map_err(|e| InfraError::json("serialize flat lines", e))?;
    output::info(&json);
    Ok(())
}

#[instrument(skip(cli))]
fn tree(cli: &Cli, path: &Path) -> CliResult<()> {
    let container = container(cli, Some(path))?;
    let document = load_document(&container, path)?;
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    output::info(&document.tree().to_display_tree(&title));
    Ok(())
}

#[instrument(skip(cli))]
fn next_index(cli: &Cli, path: &Path, parent: Option<&str>) -> CliResult<()> {
    let container = container(cli, Some(path))?;
    let document = load_document(&container, path)?;
    let index = container
        .recompute_service(&document)
        .next_index(&document.tree(), parent)
        .map_err(InfraError::from)?;
    output::info(&index);
    Ok(())
}

fn config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { document } => {
            let container = container(cli, document.as_deref())?;
            let toml = container.settings.to_toml().map_err(InfraError::from)?;
            output::info(&toml);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path { document } => {
            output::header("Config files (lowest to highest precedence)");
            match global_config_path() {
                Some(path) => output::detail(&format!("global:  {}", describe(&path))),
                None => output::detail("global:  <no config directory>"),
            }
            match resolve_account_config(cli, document.as_deref())? {
                Some(path) => output::detail(&format!("account: {}", describe(&path))),
                None => output::detail("account: <none, pass a document or --account-config>"),
            }
            output::detail("env:     LINETREE__*");
        }
    }
    Ok(())
}

fn describe(path: &Path) -> String {
    if path.is_file() {
        path.display().to_string()
    } else {
        format!("{} (missing)", path.display())
    }
}
