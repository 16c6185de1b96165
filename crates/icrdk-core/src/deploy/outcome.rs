use crate::task::{TaskOperation, TaskState, TaskStatus};

/// Terminal result of an install or uninstall task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub operation: TaskOperation,
    pub task_id: String,
    pub status: TaskStatus,
}

impl TaskOutcome {
    pub fn new(operation: TaskOperation, task_id: String, status: TaskStatus) -> Self {
        Self {
            operation,
            task_id,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.state == TaskState::Finished
    }

    pub fn state(&self) -> &TaskState {
        &self.status.state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status.error_message.as_deref()
    }
}
