//! Duration roll-up and person-duration computation.
//!
//! A malformed resource expression does not fail the computation. It turns
//! the person-duration of its node into [`PersonDuration::Invalid`], which
//! absorbs every addition on the way up to the root.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::domain::arena::WbsTree;
use crate::domain::entities::{FieldStatus, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// `Name[50%]`: a name followed by one trailing bracket group.
static ALLOCATION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]*[^\[\]\s])\s*\[([^\[\]]*)\]$").expect("allocation regex is valid")
});

/// Why a resource expression could not be turned into a multiplier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource without a name: {0:?}")]
    MissingName(String),

    #[error("malformed allocation: {0:?}")]
    MalformedAllocation(String),
}

/// Allocation factor of a comma-separated resource expression.
///
/// Every non-empty token counts 1.0, or `p / 100` when written as `Name[p%]`.
/// The empty expression has no resources and yields 0.
pub fn resource_multiplier(expr: &str) -> Result<f64, ResourceError> {
    expr.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(token_multiplier)
        .sum()
}

fn token_multiplier(token: &str) -> Result<f64, ResourceError> {
    if token.starts_with('[') {
        return Err(ResourceError::MissingName(token.to_string()));
    }
    if !token.contains(['[', ']']) {
        return Ok(1.0);
    }
    let malformed = || ResourceError::MalformedAllocation(token.to_string());
    let caps = ALLOCATION_TOKEN.captures(token).ok_or_else(malformed)?;
    let percentage = caps[2].trim().strip_suffix('%').ok_or_else(malformed)?.trim();
    let value: f64 = percentage.parse().map_err(|_| malformed())?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed());
    }
    Ok(value / 100.0)
}

/// Field flag for a resource expression.
pub fn resource_status(expr: &str) -> FieldStatus {
    match resource_multiplier(expr) {
        Ok(_) => FieldStatus::Valid,
        Err(_) => FieldStatus::Invalid,
    }
}

/// Effort in person-hours, or the poisoned value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PersonDuration {
    Hours(f64),
    Invalid,
}

impl PersonDuration {
    pub fn is_valid(self) -> bool {
        matches!(self, PersonDuration::Hours(_))
    }

    pub fn hours(self) -> Option<f64> {
        match self {
            PersonDuration::Hours(h) => Some(h),
            PersonDuration::Invalid => None,
        }
    }
}

impl Default for PersonDuration {
    fn default() -> Self {
        PersonDuration::Hours(0.0)
    }
}

impl Add for PersonDuration {
    type Output = PersonDuration;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (PersonDuration::Hours(a), PersonDuration::Hours(b)) => PersonDuration::Hours(a + b),
            _ => PersonDuration::Invalid,
        }
    }
}

impl Sum for PersonDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(PersonDuration::default(), Add::add)
    }
}

impl fmt::Display for PersonDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonDuration::Hours(h) => write!(f, "{}", format_hours(*h)),
            PersonDuration::Invalid => write!(f, "ERROR"),
        }
    }
}

/// Renders hours with at least one decimal place (`8.0`, `5.5`).
pub fn format_hours(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Σ duration × resource multiplier over the subtree rooted at `id`.
#[instrument(level = "trace", skip(tree))]
pub fn person_duration(tree: &WbsTree, id: NodeId) -> PersonDuration {
    tree.branch(id)
        .map(|(_, node)| match resource_multiplier(&node.data.resource) {
            Ok(multiplier) => PersonDuration::Hours(node.duration() * multiplier),
            Err(_) => PersonDuration::Invalid,
        })
        .sum()
}

/// Assigns a leaf duration and refreshes every ancestor's roll-up.
///
/// Returns `Ok(false)` without touching the tree when `id` is not a leaf.
#[instrument(level = "debug", skip(tree))]
pub fn set_leaf_duration(tree: &mut WbsTree, id: NodeId, value: f64) -> DomainResult<bool> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::InvalidDuration { node: id, value });
    }
    if !tree.node(id)?.is_leaf() {
        return Ok(false);
    }
    let node = tree.node_mut(id)?;
    node.data.duration = value;
    node.aggregate = value;

    let ancestors: Vec<NodeId> = tree.ancestors(id).collect();
    for ancestor in ancestors {
        let total = children_total(tree, ancestor);
        tree.set_aggregate(ancestor, total);
    }
    tree.mark_modified();
    Ok(true)
}

/// Recomputes every aggregate bottom-up; used after structural edits.
#[instrument(level = "debug", skip(tree))]
pub fn recompute_durations(tree: &mut WbsTree) {
    let order: Vec<(NodeId, bool, f64)> = tree
        .iter_postorder()
        .map(|(id, node)| (id, node.is_leaf(), node.data.duration))
        .collect();
    for (id, is_leaf, leaf_value) in order {
        let value = if is_leaf {
            leaf_value
        } else {
            children_total(tree, id)
        };
        tree.set_aggregate(id, value);
    }
    trace!("aggregates recomputed");
}

fn children_total(tree: &WbsTree, id: NodeId) -> f64 {
    tree.children(id)
        .iter()
        .filter_map(|&c| tree.find_by_id(c))
        .map(|c| c.duration())
        .sum()
}
