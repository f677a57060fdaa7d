//! Human renderer for CLI outputs.
//!
//! Pure formatting; handlers gather the data. JSON mode bypasses this
//! module entirely.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::core::{HistoryRow, IndexEntry, ShowRow, VersionRow};

pub fn ok(message: &str, emojis: bool) -> String {
    if emojis {
        format!("✓ {message}")
    } else {
        message.to_string()
    }
}

fn short_sha(raw: &str) -> &str {
    if raw.len() >= 40 { &raw[..7] } else { raw }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn table(header: Vec<String>, rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }
    let mut out = String::new();
    for (i, cell) in header.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
    }
    out.push('\n');
    for (i, _) in header.iter().enumerate() {
        out.push_str(&format!("{:-<width$}  ", "", width = widths[i]));
    }
    for row in rows {
        out.push('\n');
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
    }
    out
}

pub fn render_show_overview(rows: &[ShowRow], emojis: bool) -> String {
    if rows.is_empty() {
        return "nothing is registered yet".to_string();
    }
    // One column per stage seen anywhere in the registry.
    let mut stage_names: Vec<String> = rows
        .iter()
        .flat_map(|r| r.stages.keys().map(|s| s.to_string()))
        .collect();
    stage_names.sort();
    stage_names.dedup();

    let mut header = vec!["name".to_string(), "latest".to_string()];
    header.extend(stage_names.iter().map(|s| format!("#{s}")));

    let body = rows
        .iter()
        .map(|row| {
            let mut name = row.name.to_string();
            if row.deprecated {
                name.push_str(if emojis { " 🗑" } else { " (deprecated)" });
            }
            let mut cells = vec![
                name,
                row.latest.clone().unwrap_or_else(|| "-".to_string()),
            ];
            for stage in &stage_names {
                let cell = row
                    .stages
                    .iter()
                    .find(|(s, _)| s.as_str() == stage.as_str())
                    .map(|(_, versions)| versions.join(", "))
                    .unwrap_or_else(|| "-".to_string());
                cells.push(cell);
            }
            cells
        })
        .collect();
    table(header, body)
}

pub fn render_versions(rows: &[VersionRow]) -> String {
    if rows.is_empty() {
        return "no versions".to_string();
    }
    let body = rows
        .iter()
        .map(|row| {
            let status = if row.deregistered {
                "deregistered"
            } else if row.discovered {
                "discovered"
            } else {
                "registered"
            };
            vec![
                row.version.clone(),
                short_sha(&row.commit).to_string(),
                timestamp(row.created_at),
                row.author.clone(),
                status.to_string(),
                row.stages
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect();
    table(
        ["version", "commit", "created", "author", "status", "stages"]
            .into_iter()
            .map(String::from)
            .collect(),
        body,
    )
}

pub fn render_history(rows: &[HistoryRow]) -> String {
    if rows.is_empty() {
        return "no events".to_string();
    }
    let body = rows
        .iter()
        .map(|row| match row {
            HistoryRow::Event(e) => vec![
                timestamp(e.created_at),
                e.artifact.to_string(),
                e.kind.as_str().to_string(),
                e.version.clone().unwrap_or_else(|| "-".to_string()),
                e.stage
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                e.reference.clone(),
            ],
            HistoryRow::Degraded {
                artifact,
                stage,
                tag,
                ..
            } => vec![
                "-".to_string(),
                artifact.to_string(),
                "conflict".to_string(),
                "-".to_string(),
                stage.to_string(),
                format!("{tag} (simple tag, history unavailable)"),
            ],
        })
        .collect();
    table(
        ["timestamp", "artifact", "event", "version", "stage", "ref"]
            .into_iter()
            .map(String::from)
            .collect(),
        body,
    )
}

pub fn render_describe(entry: &IndexEntry) -> String {
    serde_yaml::to_string(entry)
        .unwrap_or_default()
        .trim_end()
        .to_string()
}
