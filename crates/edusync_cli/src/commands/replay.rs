//! Replay command implementation.

use super::report::SyncReport;
use edusync_core::{Category, EntityId, Payload, SyncConfig, Synchronizer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

fn default_source() -> String {
    "replay".to_string()
}

/// One line of a replay file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayLine {
    /// Category of the update.
    pub category: Category,
    /// Entity the update belongs to.
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    /// Update payload.
    #[serde(default)]
    pub payload: Payload,
    /// Source label.
    #[serde(default = "default_source")]
    pub source: String,
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResult {
    /// Replayed file.
    pub path: String,
    /// Lines published.
    pub published: usize,
    /// Lines skipped as unparseable, with their 1-based line numbers.
    pub skipped: Vec<usize>,
    /// Final synchronizer state.
    pub report: SyncReport,
}

/// Parses replay lines, skipping blanks and `#` comments.
///
/// Returns the parsed updates and the numbers of lines that failed.
pub fn parse(contents: &str) -> (Vec<ReplayLine>, Vec<usize>) {
    let mut lines = Vec::new();
    let mut skipped = Vec::new();
    for (i, raw) in contents.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<ReplayLine>(raw) {
            Ok(line) => lines.push(line),
            Err(e) => {
                warn!(line = i + 1, error = %e, "skipping unparseable line");
                skipped.push(i + 1);
            }
        }
    }
    (lines, skipped)
}

/// Runs the replay command.
pub async fn run(config: SyncConfig, path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No replay file found at {:?}", path).into());
    }
    let contents = std::fs::read_to_string(path)?;
    let (lines, skipped) = parse(&contents);

    let sync = Synchronizer::new(config)?;
    let published = lines.len();
    for line in lines {
        sync.update_data(line.category, line.payload, line.entity_id, &line.source);
    }
    sync.flush().await;

    let result = ReplayResult {
        path: path.display().to_string(),
        published,
        skipped,
        report: SyncReport::capture(&sync),
    };
    sync.shutdown();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Replayed {}", result.path);
            println!("Published: {}", result.published);
            if !result.skipped.is_empty() {
                println!("Skipped lines: {:?}", result.skipped);
            }
            println!();
            result.report.print_text();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_reports_bad_ones() {
        let contents = r#"
# seed a student
{"category": "progress", "entityId": "s1", "payload": {"completed": true, "role": "student"}}
{"category": "grades", "payload": {}}
{"category": "module", "payload": {"moduleId": "m1"}, "source": "cms"}
not json
"#;
        let (lines, skipped) = parse(contents);
        assert_eq!(lines.len(), 2);
        assert_eq!(skipped, [4, 6]);

        assert_eq!(lines[0].category, Category::Progress);
        assert_eq!(lines[0].entity_id, Some(EntityId::from("s1")));
        assert_eq!(lines[0].source, "replay");
        assert_eq!(lines[1].source, "cms");
        assert_eq!(lines[1].entity_id, None);
    }
}
