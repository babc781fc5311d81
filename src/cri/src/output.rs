//! Table and value formatting for CLI output.

use comfy_table::{ContentArrangement, Table};

/// Create a borderless table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// First 13 characters of a runtime ID, the way `crictl` prints them.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(13) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Relative age of a CRI timestamp (nanoseconds since the epoch).
pub fn format_age(created_at_ns: i64) -> String {
    let created = chrono::DateTime::from_timestamp(
        created_at_ns.div_euclid(1_000_000_000),
        created_at_ns.rem_euclid(1_000_000_000) as u32,
    );
    let Some(created) = created else {
        return "unknown".to_string();
    };

    let secs = chrono::Utc::now().signed_duration_since(created).num_seconds();
    if secs < 0 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{secs} seconds ago")
    } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
    } else if secs < 86_400 {
        format!("{} hours ago", secs / 3600)
    } else {
        format!("{} days ago", secs / 86_400)
    }
}
