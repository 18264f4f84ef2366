//! Plain-text rendering for the memory panels and status lines.

use crate::agent::{AgentId, Scenario};
use crate::chatbot::{short_id, AuditRow, EntityRow, ExportStarted, MemoryRow, RelationshipRow};
use crate::keyoku::{CleanupResult, CleanupSuggestions, ExtractStateResponse, Stats};
use crate::Result;
use chrono::{DateTime, Utc};

/// Importance as a colored dot, a 10-cell bar and the score.
pub fn format_importance(score: f64) -> String {
    let filled = ((score * 10.0) as usize).min(10);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));
    let dot = if score >= 0.7 {
        "🟢"
    } else if score >= 0.4 {
        "🟡"
    } else {
        "🔴"
    };
    format!("{dot} {bar} {score:.2}")
}

/// RFC 3339 timestamps as UTC `YYYY-MM-DD HH:MM:SS`. Anything else passes through.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn render_stats(stats: &Result<Stats>) -> String {
    match stats {
        Ok(stats) => {
            let mut text = format!("Total Memories: {}\n", stats.total_memories);
            if !stats.by_type.is_empty() {
                text.push_str("By Type:\n");
                for (memory_type, count) in &stats.by_type {
                    text.push_str(&format!("  • {memory_type}: {count}\n"));
                }
            }
            text
        }
        Err(e) => format!("Error: {e}"),
    }
}

pub fn render_memories(rows: &[MemoryRow]) -> String {
    if rows.is_empty() {
        return "No memories yet.".to_string();
    }
    rows.iter()
        .map(|row| {
            format!(
                "{}  [{}]  {}",
                format_importance(row.importance),
                row.memory_type,
                row.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_entities(rows: &[EntityRow]) -> String {
    if rows.is_empty() {
        return "No entities yet.".to_string();
    }
    rows.iter()
        .map(|row| format!("{} ({})", row.name, row.entity_type))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_relationships(rows: &[RelationshipRow]) -> String {
    if rows.is_empty() {
        return "No relationships yet.".to_string();
    }
    rows.iter()
        .map(|row| format!("{} --{}--> {}", row.source, row.relationship_type, row.target))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_audit_logs(rows: &[AuditRow]) -> String {
    if rows.is_empty() {
        return "No audit entries.".to_string();
    }
    rows.iter()
        .map(|row| {
            let resource = if row.resource_id.is_empty() {
                row.resource_type.clone()
            } else {
                format!("{} {}", row.resource_type, short_id(&row.resource_id))
            };
            format!(
                "{}  {}  {}  {}",
                short_id(&row.id),
                format_timestamp(&row.created_at),
                row.operation,
                resource
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render any panel listing, or its error.
pub fn render_listing<T>(rows: &Result<Vec<T>>, render: impl Fn(&[T]) -> String) -> String {
    match rows {
        Ok(rows) => render(rows),
        Err(e) => format!("Error: {e}"),
    }
}

pub fn render_cleanup_suggestions(result: &Result<CleanupSuggestions>) -> String {
    match result {
        Ok(suggestions) => {
            let mut lines = vec!["Cleanup strategies:".to_string()];
            for s in &suggestions.suggestions {
                lines.push(format!("- {}: {}", s.strategy, s.description));
            }
            let usage = &suggestions.usage;
            if usage.memories_limit > 0 {
                lines.push(format!(
                    "Usage: {}/{} ({:.1}%)",
                    usage.memories_stored, usage.memories_limit, usage.percentage
                ));
            }
            lines.join("\n")
        }
        Err(e) => format!("❌ Error: {e}"),
    }
}

pub fn render_cleanup_result(result: &Result<CleanupResult>, dry_run: bool) -> String {
    match result {
        Ok(result) if dry_run => format!("🧹 Would delete {} memories", result.deleted_count),
        Ok(result) => format!("🧹 Deleted {} memories", result.deleted_count),
        Err(e) => format!("❌ Error: {e}"),
    }
}

pub fn render_clear_status(result: &Result<()>) -> String {
    match result {
        Ok(()) => "✅ All memories cleared".to_string(),
        Err(e) => format!("❌ Error: {e}"),
    }
}

pub fn render_export_status(result: &Result<ExportStarted>) -> String {
    match result {
        Ok(started) => format!("📤 {}", started.message()),
        Err(e) => format!("📤 Export failed: {e}"),
    }
}

pub fn render_extraction(result: &ExtractStateResponse) -> String {
    let mut lines = vec![format!(
        "{} state v{} ({}), confidence {:.2}",
        if result.is_new { "New" } else { "Updated" },
        result.state.version,
        result.state.status,
        result.confidence
    )];
    if !result.changed_fields.is_empty() {
        lines.push(format!("Changed: {}", result.changed_fields.join(", ")));
    }
    if !result.reasoning.is_empty() {
        lines.push(format!("Reasoning: {}", result.reasoning));
    }
    if let Some(action) = &result.suggested_action {
        lines.push(format!("Suggested action: {action}"));
    }
    if let Some(err) = &result.validation_error {
        lines.push(format!("⚠️ Validation: {err}"));
    }
    lines.join("\n")
}

pub fn render_agents(current: Option<AgentId>) -> String {
    AgentId::all()
        .iter()
        .map(|id| {
            let marker = if Some(*id) == current { "*" } else { " " };
            let table = id.transitions();
            let flow = table
                .rules
                .iter()
                .map(|(from, next)| {
                    if next.is_empty() {
                        format!("{from} (final)")
                    } else {
                        format!("{from} -> {}", next.join("|"))
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            format!(
                "{marker} {:<16} {} - {}\n    schema {} / {}: {}",
                id.as_str(),
                id.name(),
                id.description(),
                id.schema_name(),
                table.field,
                flow
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_scenarios(scenarios: &[Scenario]) -> String {
    scenarios
        .iter()
        .map(|s| {
            let mut text = format!("{:<15} {} - {}", s.id, s.name, s.description);
            for (i, step) in s.steps.iter().enumerate() {
                text.push_str(&format!("\n    {}. [{}] {}", i + 1, step.agent, step.message));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n")
}
