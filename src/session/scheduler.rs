use std::future::Future;
use tokio::task::JoinHandle;

/// Background task owned by the coordinator. Dropping the handle aborts the task, so a
/// timer can never outlive the state that started it.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "Scheduled task started");
        Self {
            name,
            handle: Some(tokio::spawn(future)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn cancel(self) {
        drop(self);
    }

    /// Release ownership without aborting. Used by a task that is finishing its own work
    /// and must not be cancelled half-way through.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                tracing::debug!(task = self.name, "Scheduled task cancelled");
            }
            handle.abort();
        }
    }
}
