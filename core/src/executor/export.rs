//! Delimited-text export of a run's log history.

use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;

use super::log::LogEntry;

pub const LOG_COLUMNS: [&str; 5] = ["timestamp", "level", "message", "item", "attempt"];

/// Render the log as delimited text, header first, one line per entry.
pub fn to_delimited(entries: &[LogEntry], delimiter: char) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_delimited(&mut buf, entries, delimiter);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn write_delimited<W: Write>(
    out: &mut W,
    entries: &[LogEntry],
    delimiter: char,
) -> std::io::Result<()> {
    write_row(out, LOG_COLUMNS.iter().map(|c| c.to_string()), delimiter)?;
    for entry in entries {
        let fields = [
            entry
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.level.to_string(),
            entry.message.clone(),
            entry.item.clone().unwrap_or_default(),
            entry.attempt.map(|a| a.to_string()).unwrap_or_default(),
        ];
        write_row(out, fields.into_iter(), delimiter)?;
    }
    Ok(())
}

/// Write the log to `path`, creating parent directories as needed.
pub fn export_to_file(
    entries: &[LogEntry],
    path: impl AsRef<Path>,
    delimiter: char,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    write_delimited(&mut out, entries, delimiter)?;
    out.flush()?;
    Ok(())
}

fn write_row<W: Write>(
    out: &mut W,
    fields: impl Iterator<Item = String>,
    delimiter: char,
) -> std::io::Result<()> {
    let row: Vec<String> = fields.map(|f| quote_field(&f, delimiter)).collect();
    writeln!(out, "{}", row.join(&delimiter.to_string()))
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
