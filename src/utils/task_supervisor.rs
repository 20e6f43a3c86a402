use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Tracks long-lived background tasks (the price refresh loop, for one) and
/// reports any that terminated when they were expected to run forever.
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a background task and register it for monitoring.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        info!("spawned background task: {}", name);
        self.tasks.insert(name, tokio::spawn(future));
        self
    }

    /// Returns an error if any registered task has stopped. Dead tasks are
    /// dropped from tracking so the next call reports only new failures.
    pub fn check_health(&mut self) -> Result<()> {
        let dead: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if dead.is_empty() {
            return Ok(());
        }

        for name in &dead {
            error!("background task terminated unexpectedly: {}", name);
            self.tasks.remove(name);
        }
        Err(Error::TaskError(format!(
            "tasks terminated unexpectedly: {:?}",
            dead
        )))
    }

    /// Abort every registered task.
    pub fn shutdown_all(&mut self) {
        info!("shutting down {} background tasks", self.tasks.len());
        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn check_health_reports_a_dead_task_once() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("short_lived", async {});
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(
            supervisor.check_health(),
            Err(Error::TaskError(_))
        ));
        // The dead task was dropped from tracking, so the failure is not
        // reported again.
        assert!(supervisor.check_health().is_ok());
    }

    #[tokio::test]
    async fn healthy_tasks_pass_and_shutdown_aborts_them() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("forever", std::future::pending());
        assert!(supervisor.check_health().is_ok());

        supervisor.shutdown_all();
        assert!(supervisor.check_health().is_ok());
    }
}
