//! Bounded task pool for per-page build tasks.
//!
//! Runs at most `width` tasks at once, first come first served, and always
//! joins every task before returning. A failing task contributes a
//! `TaskOutcome::Failed` to the result; it never aborts its siblings and
//! there is no retry.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Result of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The page was rendered (or re-rendered).
    Success,
    /// Nothing to do for this page.
    Skipped(String),
    /// The task failed; the build continues.
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Cache,
    Render,
    Write,
    Internal,
}

/// Aggregate of all task outcomes for one build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BuildSummary {
    pub fn from_outcomes(outcomes: &[TaskOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Success => summary.succeeded += 1,
                TaskOutcome::Skipped(_) => summary.skipped += 1,
                TaskOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Run `tasks` with at most `width` in flight at once, returning one outcome
/// per task in submission order. A task that panics yields
/// `Failed { kind: Internal }` for its slot only.
pub async fn run_bounded<F>(width: usize, tasks: Vec<F>) -> Vec<TaskOutcome>
where
    F: Future<Output = TaskOutcome> + Send + 'static,
{
    let count = tasks.len();
    let semaphore = Arc::new(Semaphore::new(width.max(1)));
    let mut join_set = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        index,
                        TaskOutcome::Failed {
                            kind: FailureKind::Internal,
                            message: "task pool closed".to_string(),
                        },
                    );
                }
            };
            (index, task.await)
        });
    }

    // Slots left untouched belong to tasks that panicked before reporting.
    let mut outcomes = vec![
        TaskOutcome::Failed {
            kind: FailureKind::Internal,
            message: "task panicked".to_string(),
        };
        count
    ];
    while let Some(joined) = join_set.join_next().await {
        if let Ok((index, outcome)) = joined {
            outcomes[index] = outcome;
        }
    }
    outcomes
}
