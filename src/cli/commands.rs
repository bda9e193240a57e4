//! Command dispatch: each subcommand opens its document in a fresh session,
//! runs one edit and saves when something changed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::services::{DocumentId, Session};
use crate::application::{ClickModifiers, ExportFormat, RowDescriptor, COLUMNS};
use crate::cli::args::{Cli, Commands, ConfigCommands, FieldName};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{format_hours, DomainError, EditOp, FieldEdit, FieldStatus, NodeId, Rgb};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{Confirmation, FixedPrompter, RealFileSystem};
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeOutline;
use crate::util::path::PathExt;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current directory", e))?,
    };
    let settings = Settings::load(Some(&project_dir))?;
    debug!("settings: {:?}", settings);

    match command {
        Commands::New { file, root } => cmd_new(settings, file.as_deref(), root.as_deref()),
        Commands::Show { file } => cmd_show(settings, file),
        Commands::Table { file, collapse } => cmd_table(settings, file, collapse),
        Commands::Add {
            file,
            item,
            name,
            sibling,
            duration,
            resource,
        } => cmd_add(
            settings,
            file,
            *item,
            AddFields {
                name: name.as_deref(),
                sibling: *sibling,
                duration: *duration,
                resource: resource.as_deref(),
            },
        ),
        Commands::Edit {
            file,
            op,
            item,
            yes,
        } => cmd_edit(settings, file, *op, *item, *yes),
        Commands::Key {
            file,
            item,
            chord,
            yes,
        } => cmd_key(settings, file, *item, chord, *yes),
        Commands::Set {
            file,
            item,
            field,
            value,
        } => cmd_set(settings, file, *item, *field, value),
        Commands::Move { file, item, parent } => cmd_move(settings, file, *item, *parent),
        Commands::Duplicate {
            file,
            item,
            deep,
            to,
        } => cmd_duplicate(settings, file, *item, *deep, *to),
        Commands::Export {
            file,
            format,
            output,
        } => cmd_export(settings, file, *format, output.as_deref()),
        Commands::Config { command } => cmd_config(settings, command, &project_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

// ============================================================
// Helpers
// ============================================================

/// With `yes`, destructive edits are confirmed without asking.
fn container(settings: Settings, yes: bool) -> ServiceContainer {
    if yes {
        ServiceContainer::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(FixedPrompter(Confirmation::Yes)),
        )
    } else {
        ServiceContainer::new(settings)
    }
}

fn open(settings: Settings, file: &Path, yes: bool) -> CliResult<(Session, DocumentId)> {
    let mut session = container(settings, yes).session()?;
    let doc = session.open(file)?;
    Ok((session, doc))
}

fn resolve(session: &Session, doc: DocumentId, ordinal: usize) -> CliResult<NodeId> {
    let id = session
        .document(doc)?
        .tree()
        .find_by_ordinal(ordinal)
        .ok_or(DomainError::OrdinalNotFound(ordinal))?;
    Ok(id)
}

/// `<ordinal> <name>` of a node, for status lines.
fn describe(session: &Session, doc: DocumentId, id: NodeId) -> CliResult<String> {
    let tree = session.document(doc)?.tree();
    let node = tree.find_by_id(id).ok_or(DomainError::NodeNotFound(id))?;
    let ordinal = tree
        .display_ordinal(id)
        .map(|o| o.to_string())
        .unwrap_or_else(|| "?".into());
    Ok(format!("{} {}", ordinal, node.data.name))
}

fn save_if_modified(session: &mut Session, doc: DocumentId) -> CliResult<bool> {
    if session.is_saved(doc)? {
        return Ok(false);
    }
    session.save(doc)?;
    Ok(true)
}

fn report_status(status: FieldStatus, what: &str) {
    if status == FieldStatus::Invalid {
        output::warning(&format!("invalid {what}, left unchanged or flagged"));
    }
}

// ============================================================
// Document commands
// ============================================================

#[instrument(skip(settings))]
fn cmd_new(settings: Settings, file: Option<&Path>, root: Option<&str>) -> CliResult<()> {
    let extension = settings.file_extension.clone();
    let mut session = container(settings, false).session()?;
    let doc = session.new_document();
    if let Some(name) = root {
        let root_id = session.document(doc)?.tree().root();
        session.set_field(doc, root_id, FieldEdit::Name(name.to_string()))?;
    }
    let path = match file {
        Some(file) => file.with_default_extension(&extension),
        None => session.document(doc)?.path().to_path_buf(),
    };
    session.save_as(doc, &path)?;
    output::action("Created", &path.display());
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_show(settings: Settings, file: &Path) -> CliResult<()> {
    let (session, doc) = open(settings, file, false)?;
    output::info(&session.document(doc)?.tree().to_outline());
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_table(settings: Settings, file: &Path, collapse: &[usize]) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, false)?;
    let targets = collapse
        .iter()
        .map(|&ordinal| resolve(&session, doc, ordinal))
        .collect::<CliResult<Vec<_>>>()?;
    for id in targets {
        let expanded = session
            .document(doc)?
            .tree()
            .find_by_id(id)
            .is_some_and(|n| n.is_expanded());
        if expanded {
            session.toggle_expanded(doc, id)?;
        }
    }

    let rows = session.document(doc)?.rows();
    output::header(&COLUMNS.join("\t"));
    for row in &rows {
        print_row(row);
    }
    Ok(())
}

fn print_row(row: &RowDescriptor) {
    let ordinal = row
        .ordinal
        .map(|o| o.to_string())
        .unwrap_or_else(|| "?".into());
    let marker = if row.is_leaf {
        " "
    } else if row.expanded {
        "-"
    } else {
        "+"
    };
    let name = format!(
        "{}{} {}",
        "  ".repeat(row.level.saturating_sub(1)),
        marker,
        row.name
    );
    let resource = match row.resource_status {
        FieldStatus::Valid => row.resource.as_str().normal(),
        FieldStatus::Invalid => row.resource.as_str().red(),
    };
    let predecessors = match row.predecessors_status {
        FieldStatus::Valid => row.predecessors.as_str().normal(),
        FieldStatus::Invalid => row.predecessors.as_str().red(),
    };
    let line = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        ordinal,
        name,
        format_hours(row.duration),
        row.person_duration,
        resource,
        predecessors,
        row.notes1,
        row.notes2
    );
    if row.is_header {
        output::header(&line);
    } else {
        output::info(&line);
    }
}

struct AddFields<'a> {
    name: Option<&'a str>,
    sibling: bool,
    duration: Option<f64>,
    resource: Option<&'a str>,
}

#[instrument(skip(settings, fields))]
fn cmd_add(settings: Settings, file: &Path, item: usize, fields: AddFields<'_>) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, false)?;
    let anchor = resolve(&session, doc, item)?;
    let op = if fields.sibling {
        EditOp::AddSibling
    } else {
        EditOp::AddChild
    };
    let id = session
        .apply(doc, op, anchor)?
        .ok_or_else(|| CliError::Usage("the root item has no siblings".into()))?;

    if let Some(name) = fields.name {
        session.set_field(doc, id, FieldEdit::Name(name.to_string()))?;
    }
    if let Some(hours) = fields.duration {
        let status = session.set_field(doc, id, FieldEdit::Duration(hours))?;
        report_status(status, "duration");
    }
    if let Some(resource) = fields.resource {
        let status = session.set_field(doc, id, FieldEdit::Resource(resource.to_string()))?;
        report_status(status, "resource");
    }

    session.save(doc)?;
    output::action("Added", &describe(&session, doc, id)?);
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_edit(settings: Settings, file: &Path, op: EditOp, item: usize, yes: bool) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, yes)?;
    let node = resolve(&session, doc, item)?;
    let focus = session.apply(doc, op, node)?;
    if !save_if_modified(&mut session, doc)? {
        output::detail(&format!("{}: nothing changed", op.label()));
        return Ok(());
    }
    match focus {
        Some(id) if session.document(doc)?.tree().contains(id) => {
            output::action(op.label(), &describe(&session, doc, id)?)
        }
        _ => output::action(op.label(), &format!("item {item}")),
    }
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_key(settings: Settings, file: &Path, item: usize, chord: &str, yes: bool) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, yes)?;
    if session.keymap().lookup(chord).is_none() {
        return Err(CliError::InvalidArgs(format!("unbound key: {chord}")));
    }
    let node = resolve(&session, doc, item)?;
    session.click(doc, node, ClickModifiers::PLAIN)?;
    if session.handle_key(doc, chord)? && save_if_modified(&mut session, doc)? {
        output::action(chord, &format!("item {item}"));
    } else {
        output::detail(&format!("{chord}: nothing changed"));
    }
    Ok(())
}

fn field_edit(field: FieldName, value: &str) -> CliResult<FieldEdit> {
    let color = |v: &str| v.parse::<Rgb>().map_err(CliError::from);
    Ok(match field {
        FieldName::Name => FieldEdit::Name(value.to_string()),
        FieldName::Duration => FieldEdit::Duration(value.trim().parse().map_err(|_| {
            CliError::InvalidArgs(format!("duration is not a number: {value}"))
        })?),
        FieldName::Resource => FieldEdit::Resource(value.to_string()),
        FieldName::Notes1 => FieldEdit::Notes1(value.to_string()),
        FieldName::Notes2 => FieldEdit::Notes2(value.to_string()),
        FieldName::Color => FieldEdit::Color(color(value)?),
        FieldName::GroupColor => FieldEdit::SiblingGroupColor(color(value)?),
        FieldName::Predecessors => FieldEdit::Predecessors(value.to_string()),
    })
}

#[instrument(skip(settings))]
fn cmd_set(settings: Settings, file: &Path, item: usize, field: FieldName, value: &str) -> CliResult<()> {
    let edit = field_edit(field, value)?;
    let (mut session, doc) = open(settings, file, false)?;
    let node = resolve(&session, doc, item)?;
    let status = session.set_field(doc, node, edit)?;
    report_status(status, &format!("{field:?}").to_lowercase());
    if save_if_modified(&mut session, doc)? {
        output::action("Updated", &describe(&session, doc, node)?);
    }
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_move(settings: Settings, file: &Path, item: usize, parent: usize) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, false)?;
    let node = resolve(&session, doc, item)?;
    let target = resolve(&session, doc, parent)?;
    if session.reparent(doc, node, target)? {
        session.save(doc)?;
        output::action("Moved", &describe(&session, doc, node)?);
    } else {
        output::detail("the root item cannot be moved");
    }
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_duplicate(
    settings: Settings,
    file: &Path,
    item: usize,
    deep: bool,
    to: Option<usize>,
) -> CliResult<()> {
    let (mut session, doc) = open(settings, file, false)?;
    let node = resolve(&session, doc, item)?;
    let copy = if deep {
        let target = match to {
            Some(ordinal) => resolve(&session, doc, ordinal)?,
            None => session
                .document(doc)?
                .tree()
                .parent(node)
                .ok_or_else(|| CliError::Usage("give --to when copying the root".into()))?,
        };
        session.deep_copy(doc, node, target)?
    } else {
        session
            .apply(doc, EditOp::Duplicate, node)?
            .ok_or_else(|| CliError::Usage("the root item cannot be duplicated".into()))?
    };
    session.save(doc)?;
    output::action("Copied", &describe(&session, doc, copy)?);
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_export(
    settings: Settings,
    file: &Path,
    format: Option<ExportFormat>,
    target: Option<&Path>,
) -> CliResult<()> {
    let format = format.unwrap_or(settings.export.format);
    let (mut session, doc) = open(settings, file, false)?;
    match target {
        Some(path) => {
            session.export(doc, path, format)?;
            output::action("Exported", &path.display());
        }
        None => print!("{}", session.render_export(doc, format)?),
    }
    Ok(())
}

// ============================================================
// Config commands
// ============================================================

fn cmd_config(settings: Settings, cmd: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match cmd {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            let global: Option<PathBuf> = global_config_path();
            match global {
                Some(path) => show_path("global", &path),
                None => output::failure("global: no config directory on this platform"),
            }
            show_path("local", &local_config_path(project_dir));
            Ok(())
        }
        ConfigCommands::Template => {
            print!("{}", Settings::template());
            Ok(())
        }
    }
}

fn show_path(label: &str, path: &Path) {
    if path.exists() {
        output::success_detail(&format!("{label}: {}", path.display()));
    } else {
        output::failure(&format!("{label}: {} (not found)", path.display()));
    }
}
