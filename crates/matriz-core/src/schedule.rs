//! Recurring task scheduler.
//!
//! Each periodic job owns a child [`CancellationToken`] of the scheduler's
//! root token, so a single job can be stopped on its own and the whole set
//! is torn down with [`Scheduler::shutdown`]. Tick bodies are synchronous
//! and must not block; they spawn their own short-lived work.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct RecurringTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTask {
    /// Runs `tick` immediately and then every `period` until `cancel` fires.
    /// Late ticks are skipped rather than bunched up.
    pub fn spawn<F>(
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                task = name,
                period_ms = period.as_millis() as u64,
                "recurring_task_started"
            );
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!(task = name, "recurring_task_tick");
                        tick();
                    }
                }
            }
            info!(task = name, "recurring_task_stopped");
        });
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the task and waits for its loop to exit.
    pub async fn join(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Default)]
pub struct Scheduler {
    root: CancellationToken,
    tasks: Vec<RecurringTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every<F>(&mut self, name: &'static str, period: Duration, tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let task = RecurringTask::spawn(name, period, self.root.child_token(), tick);
        self.tasks.push(task);
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(RecurringTask::name).collect()
    }

    pub fn stop_task(&self, name: &str) -> bool {
        match self.tasks.iter().find(|task| task.name() == name) {
            Some(task) => {
                task.stop();
                true
            }
            None => false,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    pub async fn shutdown(self) {
        self.root.cancel();
        for task in self.tasks {
            task.join().await;
        }
    }
}
