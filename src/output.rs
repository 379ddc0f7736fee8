//! CLI output formatting.
//!
//! Each display has a `format_*` function returning `Vec<String>` for
//! testability and, where the CLI needs it, a `print_*` wrapper that writes to
//! stdout. Format functions do no I/O.
//!
//! ## Process
//!
//! ```text
//! 001 → public/uploads/42/
//!     copy: public/uploads/42/photo_0192a4b7.jpg
//! 002 → public/images/42/
//!     cleaned
//!     resized: public/images/42/photo_0192a4b7.jpg
//!     thumbnail: public/images/42/thumb_photo_0192a4b7.jpg
//! Stored as photo_0192a4b7.jpg (2 steps, 3 files)
//! ```
//!
//! ## Delete
//!
//! ```text
//! Removed public/uploads/42/
//! Missing public/images/42/
//! Cleanup: 1 removed, 1 missing
//! ```

use crate::handler::{HandlerSpec, OutputKind};
use crate::paths::PathExpr;
use crate::pipeline::{CleanupReport, PipelineEvent, SaveReport};
use crate::steps::{CleanupAction, Step};

/// Format a 0-based step index as a 1-based, 3-digit position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

fn kind_label(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Copy => "copy",
        OutputKind::Resized => "resized",
        OutputKind::Thumbnail => "thumbnail",
        OutputKind::Original => "original",
        OutputKind::Custom => "custom",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format a single progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::StepStarted { index, directory } => {
            vec![format!("{} → {}", format_index(*index), directory)]
        }
        PipelineEvent::DirectoryCleaned { .. } => vec!["    cleaned".to_string()],
        PipelineEvent::FileWritten { kind, path, .. } => {
            vec![format!("    {}: {}", kind_label(*kind), path.display())]
        }
        PipelineEvent::DirectoryRemoved { directory } => vec![format!("Removed {directory}")],
        PipelineEvent::DirectorySkipped { directory } => vec![format!("Missing {directory}")],
        PipelineEvent::RootRefused { index } => vec![format!(
            "{}: refusing to remove the filesystem root",
            format_index(*index)
        )],
    }
}

/// Summary lines after a save.
pub fn format_save_report(report: &SaveReport) -> Vec<String> {
    match &report.stored_name {
        Some(name) => vec![format!(
            "Stored as {} ({}, {})",
            name,
            plural(report.steps.len(), "step"),
            plural(report.files_written(), "file")
        )],
        None => vec!["No upload processed (scenario not enabled)".to_string()],
    }
}

pub fn print_save_report(report: &SaveReport) {
    for line in format_save_report(report) {
        println!("{}", line);
    }
}

/// Summary lines after a delete.
pub fn format_cleanup_report(report: &CleanupReport) -> Vec<String> {
    if !report.enabled {
        return vec!["delete_on_delete is disabled, nothing removed".to_string()];
    }

    let count = |action: CleanupAction| {
        report
            .directories
            .iter()
            .filter(|d| d.action == action)
            .count()
    };
    let mut summary = format!(
        "Cleanup: {} removed, {} missing",
        count(CleanupAction::Removed),
        count(CleanupAction::Missing)
    );
    let refused = count(CleanupAction::RefusedRoot);
    if refused > 0 {
        summary.push_str(&format!(", {refused} refused (filesystem root)"));
    }
    vec![summary]
}

pub fn print_cleanup_report(report: &CleanupReport) {
    for line in format_cleanup_report(report) {
        println!("{}", line);
    }
}

/// Describe one configured step for `check`.
///
/// ```text
/// 002 @webroot/images/{id}
///     resize 400x400 q80, thumbnail 100x100 q70, original
/// ```
fn step_lines(index: usize, step: &Step) -> Vec<String> {
    let path = match &step.path {
        PathExpr::Static(s) => s.clone(),
        PathExpr::Dynamic(_) => "<computed path>".to_string(),
    };
    let handler = match &step.handler {
        None => "copy".to_string(),
        Some(HandlerSpec::Custom(_)) => "custom handler".to_string(),
        Some(HandlerSpec::Policy(policy)) => {
            let mut parts = vec![format!("resize {} q{}", policy.size, policy.quality)];
            if let Some(size) = policy.thumbnail_size {
                parts.push(format!(
                    "thumbnail {} q{}",
                    size,
                    policy.effective_thumbnail_quality().value()
                ));
            }
            if policy.save_original {
                parts.push("original".to_string());
            }
            parts.join(", ")
        }
    };
    vec![
        format!("{} {}", format_index(index), path),
        format!("    {}", handler),
    ]
}

pub fn format_step_list(steps: &[Step]) -> Vec<String> {
    steps
        .iter()
        .enumerate()
        .flat_map(|(i, step)| step_lines(i, step))
        .collect()
}

pub fn print_step_list(steps: &[Step]) {
    for line in format_step_list(steps) {
        println!("{}", line);
    }
}
