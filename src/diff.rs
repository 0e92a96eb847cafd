//! Diff rendering
//!
//! Turns a plan into text for human review. Two modes: the default
//! structural mode shows each changed resource field by field, with
//! element-level add/remove for lists and line-level add/remove for JSON
//! values; `--ids-only` compresses each change to one line, naming the
//! changed fields for updates.
//!
//! Output order follows the plan, which is sorted by id, so two runs over
//! the same sets render identically.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::apply::Change;
use crate::error::ResourceResult;
use crate::resources::resource::indent;
use crate::resources::{FieldValue, Resource, ResourceSet};

/// Render a plan for review
pub fn render(changes: &[Change], ids_only: bool) -> String {
    if ids_only {
        render_ids_only(changes)
    } else {
        render_structural(changes)
    }
}

/// A copy of `set` with every description blanked, so diffs can ignore
/// description-only drift (normalization turns the blank back into the
/// bare banner on both sides).
pub fn strip_descriptions(set: &ResourceSet) -> ResourceResult<ResourceSet> {
    set.map(|resource| match resource {
        Resource::Role(mut role) => {
            role.description = String::new();
            Resource::Role(role)
        }
        Resource::Client(mut client) => {
            client.description = String::new();
            Resource::Client(client)
        }
        Resource::Hook(mut hook) => {
            hook.description = String::new();
            Resource::Hook(hook)
        }
        Resource::WorkerPool(mut pool) => {
            pool.description = String::new();
            Resource::WorkerPool(pool)
        }
        secret @ Resource::Secret(_) => secret,
    })
}

fn render_ids_only(changes: &[Change]) -> String {
    changes
        .iter()
        .map(|change| match change {
            Change::Create { resource } => format!("{} {}", "+".green(), resource.id()),
            Change::Delete { resource } => format!("{} {}", "-".red(), resource.id()),
            Change::Update { current, generated } => format!(
                "{} {} ({})",
                "!".yellow(),
                generated.id(),
                changed_field_names(current, generated).join(", ")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_structural(changes: &[Change]) -> String {
    changes
        .iter()
        .map(|change| match change {
            Change::Create { resource } => prefix_lines(&resource.to_string(), "+")
                .green()
                .to_string(),
            Change::Delete { resource } => {
                prefix_lines(&resource.to_string(), "-").red().to_string()
            }
            Change::Update { current, generated } => render_update(current, generated),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Names of the fields whose values differ, in declaration order.
///
/// When the two sides are different kinds (a pathological state the plan
/// still treats as an update), every field of either side counts.
fn changed_field_names(current: &Resource, generated: &Resource) -> Vec<&'static str> {
    if current.kind() != generated.kind() {
        let mut names: Vec<&'static str> =
            current.fields().into_iter().map(|(name, _)| name).collect();
        for (name, _) in generated.fields() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        return names;
    }

    let old: BTreeMap<&'static str, FieldValue> = current.fields().into_iter().collect();
    generated
        .fields()
        .into_iter()
        .filter(|(name, value)| old.get(name) != Some(value))
        .map(|(name, _)| name)
        .collect()
}

fn render_update(current: &Resource, generated: &Resource) -> String {
    let mut out = format!("{} {}:", "!".yellow(), generated.id().underline());

    if current.kind() != generated.kind() {
        // kind changed; field-by-field comparison is meaningless, show both
        // sides whole
        out.push('\n');
        out.push_str(&prefix_lines(&current.to_string(), "-").red().to_string());
        out.push('\n');
        out.push_str(
            &prefix_lines(&generated.to_string(), "+")
                .green()
                .to_string(),
        );
        return out;
    }

    let old: BTreeMap<&'static str, FieldValue> = current.fields().into_iter().collect();
    for (name, new_value) in generated.fields() {
        let old_value = match old.get(name) {
            Some(value) if *value == new_value => continue,
            Some(value) => value,
            None => continue,
        };
        out.push('\n');
        out.push_str(&format!("  {}:\n", name.bold()));
        out.push_str(&indent(&diff_field(old_value, &new_value), "    "));
    }
    out
}

fn diff_field(old: &FieldValue, new: &FieldValue) -> String {
    match (old, new) {
        (FieldValue::List(old_items), FieldValue::List(new_items)) => {
            render_hunks(&lcs_diff(old_items, new_items))
        }
        _ => {
            let old_lines: Vec<String> = old.render().lines().map(str::to_string).collect();
            let new_lines: Vec<String> = new.render().lines().map(str::to_string).collect();
            render_hunks(&lcs_diff(&old_lines, &new_lines))
        }
    }
}

enum Edit<'a> {
    Keep(&'a str),
    Remove(&'a str),
    Add(&'a str),
}

fn render_hunks(edits: &[Edit<'_>]) -> String {
    edits
        .iter()
        .map(|edit| match edit {
            Edit::Keep(line) => format!("  {}", line),
            Edit::Remove(line) => format!("- {}", line).red().to_string(),
            Edit::Add(line) => format!("+ {}", line).green().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Minimal edit script between two line/element sequences.
///
/// Quadratic table; field values are at most a few hundred lines, so this
/// never matters.
fn lcs_diff<'a>(old: &'a [String], new: &'a [String]) -> Vec<Edit<'a>> {
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut edits = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            edits.push(Edit::Keep(&old[i]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            edits.push(Edit::Remove(&old[i]));
            i += 1;
        } else {
            edits.push(Edit::Add(&new[j]));
            j += 1;
        }
    }
    edits.extend(old[i..].iter().map(|line| Edit::Remove(line)));
    edits.extend(new[j..].iter().map(|line| Edit::Add(line)));
    edits
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
