//! CLI output formatting

use crate::tasks::{Task, TaskKind, TaskPlan};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One line per task for plan output
pub fn format_task(task: &Task) -> String {
    match &task.kind {
        TaskKind::Shell { command } => {
            let first_line = command.lines().next().unwrap_or("");
            format!(
                "{} {} {}",
                style(&task.id).bold(),
                style("[shell]").cyan(),
                style(first_line).dim()
            )
        }
        TaskKind::RemoteJob { job } => format!(
            "{} {} {}",
            style(&task.id).bold(),
            style("[dbt job]").cyan(),
            style(job.to_string()).dim()
        ),
        TaskKind::WaitForDag {
            external_dag_id, ..
        } => format!(
            "{} {} {}",
            style(&task.id).bold(),
            style("[wait for dag]").cyan(),
            style(external_dag_id).dim()
        ),
    }
}

/// Render a whole plan for humans
pub fn format_plan(plan: &TaskPlan) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} {} ({})\n",
        INFO,
        style(&plan.dag.dag_id).bold(),
        plan.dag.description
    ));
    out.push_str(&format!(
        "  schedule: {}  owner: {}\n\n",
        plan.dag.schedule_interval, plan.dag.owner
    ));

    for task in &plan.tasks {
        out.push_str(&format!("  {}\n", format_task(task)));
    }

    if !plan.edges.is_empty() {
        out.push('\n');
        for edge in &plan.edges {
            out.push_str(&format!(
                "  {} -> {}\n",
                plan.tasks[edge.upstream].id, plan.tasks[edge.downstream].id
            ));
        }
    }

    out
}
