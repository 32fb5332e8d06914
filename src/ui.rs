use colored::Colorize;

use crate::engine::{ExecuteSummary, Outcome};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// One-line summary, e.g. "2 created, 1 modified, 3 commands run"
pub fn format_summary(summary: &ExecuteSummary) -> String {
    let parts: Vec<String> = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.executed, "commands run"),
        (summary.no_change, "unchanged"),
        (summary.skipped, "skipped"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{count} {label}"))
    .collect();

    if parts.is_empty() {
        "nothing to do".to_string()
    } else {
        parts.join(", ")
    }
}

/// Headline for a completed run; a run that changed nothing says so
pub fn applied_headline(instance_id: &str, summary: &ExecuteSummary) -> String {
    if summary.total_changes() == 0 {
        format!(
            "Provisioned {instance_id} without changes: {}",
            format_summary(summary)
        )
    } else {
        format!(
            "Provisioned {instance_id} ({} changes): {}",
            summary.total_changes(),
            format_summary(summary)
        )
    }
}

/// Print the result of a provisioning pass
pub fn report(instance_id: &str, outcome: &Outcome) {
    match outcome {
        Outcome::AlreadyProvisioned => {
            info(&format!("Instance {instance_id} is already provisioned"));
        }
        Outcome::DryRun {
            already_provisioned,
            summary,
        } => {
            header("Dry run");
            kv("instance", instance_id);
            kv(
                "marker",
                if *already_provisioned {
                    "present (a real run would do nothing)"
                } else {
                    "absent"
                },
            );
            kv("directives", &summary.total().to_string());
            warn("No changes made");
        }
        Outcome::Applied(summary) => {
            success(&applied_headline(instance_id, summary));
        }
    }
}
