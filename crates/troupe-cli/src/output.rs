use chrono::{DateTime, Utc};
use serde::Serialize;
use troupe_core::detect::DetectScope;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Two-space aligned table with a dashed rule under the header. Empty
/// cells render as `-` so columns stay scannable.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (cell, width) in row.iter().zip(widths.iter_mut()) {
            *width = (*width).max(display_cell(cell).len());
        }
    }

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    print_row(&header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("  "));
    for row in &rows {
        print_row(row, &widths);
    }
}

fn print_row(cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter().copied())
        .map(|(cell, w)| format!("{:<w$}", display_cell(cell)))
        .collect();
    println!("{}", line.join("  ").trim_end());
}

fn display_cell(cell: &str) -> &str {
    if cell.is_empty() {
        "-"
    } else {
        cell
    }
}

/// Render a timestamp for table cells.
pub fn fmt_stamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Like [`fmt_stamp`], with `-` for never.
pub fn fmt_time(time: Option<DateTime<Utc>>) -> String {
    time.map(fmt_stamp).unwrap_or_else(|| "-".to_string())
}

pub fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

/// Human label for a detection scope.
pub fn scope_label(scope: &DetectScope) -> String {
    match scope {
        DetectScope::User => "user".to_string(),
        DetectScope::Project(path) => format!("project:{path}"),
        DetectScope::Plugin(id) => format!("plugin:{id}"),
    }
}
