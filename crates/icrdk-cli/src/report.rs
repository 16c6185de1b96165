//! Terminal rendering of progress events and command results.

use anyhow::Result;
use console::style;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use icrdk_core::deploy::TaskOutcome;
use icrdk_core::package::PackageRecord;
use icrdk_core::progress::ProgressEvent;

use crate::OutputFormat;

/// Final result of a command.
pub(crate) enum Report {
    Installed(TaskOutcome),
    Uninstalled(TaskOutcome),
    Packages(Vec<PackageRecord>),
}

impl Report {
    /// A task the appliance reported as failed becomes the process error.
    pub(crate) fn into_result(self) -> Result<()> {
        match self {
            Report::Installed(outcome) | Report::Uninstalled(outcome) if !outcome.is_success() => {
                anyhow::bail!(
                    "{} task {} ended {}: {}",
                    outcome.operation,
                    outcome.task_id,
                    outcome.state(),
                    outcome.error_message().unwrap_or("no error message from appliance")
                )
            }
            _ => Ok(()),
        }
    }
}

/// Print progress events on stderr until every sender is dropped.
pub(crate) fn spawn_progress_printer(mut events: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            eprintln!("{}", render_event(&event));
        }
    })
}

fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::ChunkResponse { status, .. } if *status >= 400 => {
            style(event).red().to_string()
        }
        ProgressEvent::UploadFinished { .. } | ProgressEvent::TaskSubmitted { .. } => {
            style(event).green().to_string()
        }
        ProgressEvent::TaskFinished { error_message: Some(_), .. } => style(event).red().to_string(),
        ProgressEvent::TaskFinished { .. } => style(event).green().to_string(),
        _ => style(event).dim().to_string(),
    }
}

pub(crate) fn print(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(report))?),
    }
    Ok(())
}

fn print_table(report: &Report) {
    match report {
        Report::Installed(outcome) | Report::Uninstalled(outcome) => {
            if outcome.is_success() {
                println!(
                    "{} {} task {} {}",
                    style("✓").green(),
                    outcome.operation,
                    outcome.task_id,
                    outcome.state()
                );
            } else {
                println!(
                    "{} {} task {} {}",
                    style("✗").red(),
                    outcome.operation,
                    outcome.task_id,
                    outcome.state()
                );
                if let Some(message) = outcome.error_message() {
                    println!("  {}", style(message).red());
                }
            }
        }
        Report::Packages(records) if records.is_empty() => println!("No installed packages."),
        Report::Packages(records) => {
            println!("{}", style("NAME\tVERSION\tPACKAGE").bold());
            for record in records {
                println!("{}\t{}\t{}", record.name, record.version, record.package_name);
            }
        }
    }
}

fn to_json(report: &Report) -> serde_json::Value {
    match report {
        Report::Installed(outcome) | Report::Uninstalled(outcome) => serde_json::json!({
            "operation": outcome.operation,
            "task_id": outcome.task_id,
            "status": outcome.state().to_string(),
            "error_message": outcome.error_message(),
        }),
        Report::Packages(records) => serde_json::json!({ "packages": records }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icrdk_core::task::{TaskOperation, TaskState, TaskStatus};

    fn outcome(state: TaskState, error_message: Option<&str>) -> TaskOutcome {
        TaskOutcome::new(
            TaskOperation::Install,
            "t-1".to_string(),
            TaskStatus {
                state,
                error_message: error_message.map(str::to_string),
            },
        )
    }

    #[test]
    fn failed_task_becomes_error() {
        let report = Report::Installed(outcome(TaskState::Failed, Some("missing dependency")));
        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "INSTALL task t-1 ended FAILED: missing dependency");
    }

    #[test]
    fn finished_task_is_ok() {
        assert!(Report::Uninstalled(outcome(TaskState::Finished, None)).into_result().is_ok());
        assert!(Report::Packages(Vec::new()).into_result().is_ok());
    }

    #[test]
    fn json_uses_wire_names() {
        let report = Report::Packages(vec![PackageRecord {
            name: "pkgA".to_string(),
            version: "1.0".to_string(),
            package_name: "pkgA-1.0".to_string(),
        }]);
        assert_eq!(
            to_json(&report),
            serde_json::json!({
                "packages": [{"name": "pkgA", "version": "1.0", "packageName": "pkgA-1.0"}]
            })
        );

        let failed = to_json(&Report::Installed(outcome(TaskState::Failed, Some("boom"))));
        assert_eq!(failed["operation"], "INSTALL");
        assert_eq!(failed["status"], "FAILED");
        assert_eq!(failed["error_message"], "boom");
    }
}
