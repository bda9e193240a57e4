//! Flat exports: one row per non-root node in DFS order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::application::projection::{render_row, COLUMNS};
use crate::application::ApplicationError;
use crate::domain::{format_hours, WbsTree};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Indented, tab-separated
    #[default]
    Text,
    /// Spreadsheet layout, item names offset by level
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Text => f.write_str("text"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ApplicationError::Config {
                message: format!("unknown export format: {other}"),
            }),
        }
    }
}

/// Cells of one exported row, without layout.
struct ExportRow {
    level: usize,
    cells: [String; 8],
}

/// Renumbers first so predecessor cells show current short names.
fn collect_rows(tree: &mut WbsTree) -> Vec<ExportRow> {
    tree.renumber();
    let tree: &WbsTree = tree;
    tree.all_nodes()
        .skip(1)
        .map(|(id, _)| id)
        .filter_map(|id| render_row(tree, id))
        .map(|row| ExportRow {
            level: row.level,
            cells: [
                row.ordinal.map(|o| o.to_string()).unwrap_or_default(),
                row.name,
                format_hours(row.duration),
                row.person_duration.to_string(),
                row.resource,
                row.predecessors,
                row.notes1,
                row.notes2,
            ],
        })
        .collect()
}

pub fn export(tree: &mut WbsTree, format: ExportFormat, indent_width: usize) -> String {
    match format {
        ExportFormat::Text => export_text(tree, indent_width),
        ExportFormat::Csv => export_csv(tree),
    }
}

/// Root name, the column header, then one indented tab-separated line per node.
#[instrument(level = "debug", skip(tree))]
pub fn export_text(tree: &mut WbsTree, indent_width: usize) -> String {
    let root_name = tree
        .find_by_id(tree.root())
        .map(|n| n.data.name.clone())
        .unwrap_or_default();
    let mut out = format!("{root_name}\n{}\n", COLUMNS.join("\t"));
    for row in collect_rows(tree) {
        let indent = " ".repeat(indent_width * row.level.saturating_sub(1));
        out.push_str(&indent);
        out.push_str(&row.cells.join("\t"));
        out.push('\n');
    }
    out
}

/// The item-name column spans one cell per level; each name sits in the
/// cell of its level.
#[instrument(level = "debug", skip(tree))]
pub fn export_csv(tree: &mut WbsTree) -> String {
    let rows = collect_rows(tree);
    let span = rows.iter().map(|r| r.level).max().unwrap_or(1).max(1);

    let mut header: Vec<String> = vec![COLUMNS[0].to_string(), COLUMNS[1].to_string()];
    header.extend(std::iter::repeat(String::new()).take(span - 1));
    header.extend(COLUMNS[2..].iter().map(|c| c.to_string()));

    let mut out = csv_line(&header);
    for row in rows {
        let [ordinal, name, rest @ ..] = row.cells;
        let offset = row.level.saturating_sub(1);
        let mut line: Vec<String> = vec![ordinal];
        line.extend(std::iter::repeat(String::new()).take(offset));
        line.push(name);
        line.extend(std::iter::repeat(String::new()).take(span - 1 - offset));
        line.extend(rest);
        out.push_str(&csv_line(&line));
    }
    out
}

fn csv_line(cells: &[String]) -> String {
    let mut line = cells.iter().map(|c| csv_cell(c)).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// RFC 4180 quoting.
fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
