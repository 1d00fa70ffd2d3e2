//! Console reporter for comparison results
//!
//! Human-readable summary with a table of changed fields. Unchanged fields
//! are counted but not listed.

use anyhow::Result;
use form_types::{AttributeDiff, BoundingBox, ChangeStatus, ComparisonResult, FieldChange};
use std::fmt::Write;

/// Widest field id column before ids are truncated
const MAX_ID_WIDTH: usize = 40;

pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn format(result: &ComparisonResult) -> Result<String> {
        let mut output = String::new();
        let m = &result.metrics;

        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                    FORM COMPARISON                           ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(
            output,
            "Source:  v{} ({})",
            result.source_version_number, result.source_version_id
        )?;
        writeln!(
            output,
            "Target:  v{} ({})",
            result.target_version_number, result.target_version_id
        )?;
        writeln!(output, "Pages:   {} → {}", m.source_page_count, m.target_page_count)?;
        writeln!(output, "Fields:  {} → {}", m.source_field_count, m.target_field_count)?;
        writeln!(output)?;

        writeln!(output, "Summary:")?;
        writeln!(output, "  Added:      {}", m.fields_added)?;
        writeln!(output, "  Removed:    {}", m.fields_removed)?;
        writeln!(output, "  Modified:   {}", m.fields_modified)?;
        writeln!(output, "  Unchanged:  {}", m.fields_unchanged)?;
        writeln!(output, "  Changed:    {:.2}%", m.modification_percentage)?;
        writeln!(output)?;

        let changed: Vec<&FieldChange> = result
            .field_changes
            .iter()
            .filter(|c| c.status != ChangeStatus::Unchanged)
            .collect();

        if changed.is_empty() {
            writeln!(output, "────────────────────────────────────────────────────────────────")?;
            writeln!(output, "✓ No field changes")?;
            writeln!(output)?;
            return Ok(output);
        }

        Self::format_table(&mut output, &changed)?;

        let modified: Vec<&&FieldChange> = changed
            .iter()
            .filter(|c| c.status == ChangeStatus::Modified)
            .collect();
        if !modified.is_empty() {
            writeln!(output, "Details:")?;
            for change in modified {
                Self::format_details(&mut output, change)?;
            }
            writeln!(output)?;
        }

        Ok(output)
    }

    fn format_table(output: &mut String, changes: &[&FieldChange]) -> Result<()> {
        let width = changes
            .iter()
            .map(|c| c.field_id.chars().count())
            .max()
            .unwrap_or(0)
            .clamp("Field".len(), MAX_ID_WIDTH);
        let bar = "─".repeat(width + 2);

        writeln!(output, "┌{}┬───────────┬─────────┬─────────┬──────────┬──────┐", bar)?;
        writeln!(
            output,
            "│ {:<width$} │ Status    │ Label   │ Options │ Position │ Page │",
            "Field"
        )?;
        writeln!(output, "├{}┼───────────┼─────────┼─────────┼──────────┼──────┤", bar)?;
        for change in changes {
            writeln!(
                output,
                "│ {:<width$} │ {:<9} │ {:<7} │ {:<7} │ {:<8} │ {:<4} │",
                truncate(&change.field_id, width),
                status_label(change.status),
                diff_label(change.near_text_diff),
                diff_label(change.value_options_diff),
                diff_label(change.position_change),
                if change.page_number_changed { "✗" } else { "" },
            )?;
        }
        writeln!(output, "└{}┴───────────┴─────────┴─────────┴──────────┴──────┘", bar)?;
        writeln!(output)?;
        Ok(())
    }

    fn format_details(output: &mut String, change: &FieldChange) -> Result<()> {
        writeln!(output, "  {}", change.field_id)?;
        if change.near_text_diff.is_different() {
            writeln!(
                output,
                "    label:    {} → {}",
                quoted(change.source_near_text.as_deref()),
                quoted(change.target_near_text.as_deref())
            )?;
        }
        if change.value_options_diff.is_different() {
            writeln!(
                output,
                "    options:  {} → {}",
                options(change.source_value_options.as_deref()),
                options(change.target_value_options.as_deref())
            )?;
        }
        if change.position_change.is_different() {
            writeln!(
                output,
                "    position: {} → {}",
                position(change.source_position.as_ref()),
                position(change.target_position.as_ref())
            )?;
        }
        if change.page_number_changed {
            writeln!(
                output,
                "    page:     {} → {}",
                page(change.source_page_number),
                page(change.target_page_number)
            )?;
        }
        Ok(())
    }
}

fn status_label(status: ChangeStatus) -> &'static str {
    match status {
        ChangeStatus::Added => "+ added",
        ChangeStatus::Removed => "- removed",
        ChangeStatus::Modified => "~ changed",
        ChangeStatus::Unchanged => "",
    }
}

fn diff_label(diff: AttributeDiff) -> &'static str {
    match diff {
        AttributeDiff::Equal => "✓",
        AttributeDiff::Different => "✗",
        AttributeDiff::NotApplicable => "-",
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn quoted(text: Option<&str>) -> String {
    text.map_or_else(|| "(none)".to_string(), |t| format!("\"{}\"", t))
}

fn options(values: Option<&[String]>) -> String {
    values.map_or_else(|| "(none)".to_string(), |v| format!("[{}]", v.join(", ")))
}

fn position(bbox: Option<&BoundingBox>) -> String {
    bbox.map_or_else(
        || "(none)".to_string(),
        |b| format!("({:.1}, {:.1}, {:.1}, {:.1})", b.x0, b.y0, b.x1, b.y1),
    )
}

fn page(number: Option<u32>) -> String {
    number.map_or_else(|| "?".to_string(), |n| n.to_string())
}
