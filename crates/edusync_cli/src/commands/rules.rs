//! Rules command implementation.

use edusync_core::{invalidations_for, rule_for, Category, EntityId, Emit};
use serde::Serialize;

/// Effect of an update in one category.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRow {
    /// Category of the update.
    pub category: Category,
    /// Keys dropped, shown for an example entity.
    pub invalidates: Vec<String>,
    /// Follow-up channel, if any.
    pub emits: Option<String>,
    /// Whether student updates reach the parent dashboard.
    pub parent_cascade: bool,
}

/// Builds the rules table.
pub fn table() -> Vec<RuleRow> {
    let example = EntityId::from("<entity>");
    Category::ALL
        .into_iter()
        .map(|category| {
            let rule = rule_for(category);
            RuleRow {
                category,
                invalidates: invalidations_for(category, Some(&example))
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                emits: match rule.emit {
                    Emit::Nothing => None,
                    Emit::Entity => Some(format!("{category}:<entity>")),
                    Emit::Module => Some("module:<moduleId>".to_string()),
                },
                parent_cascade: rule.parent_cascade,
            }
        })
        .collect()
}

/// Runs the rules command.
pub fn run(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let rows = table();
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            for row in &rows {
                println!("{}", row.category);
                if row.invalidates.is_empty() && row.emits.is_none() {
                    println!("  (cached only)");
                }
                for key in &row.invalidates {
                    println!("  invalidates {}", key);
                }
                if let Some(channel) = &row.emits {
                    println!("  emits on {}", channel);
                }
                if row.parent_cascade {
                    println!("  forwards student updates to parent-dashboard:<entity>");
                }
            }
        }
    }
    Ok(())
}
