use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use rocket::tokio::{
    self,
    task::{JoinError, JoinHandle},
    time::Duration,
};

/// A task scheduled for a specific point in the future.
/// It will automatically execute at that point unless cancelled first.
pub struct ScheduledTask<T> {
    handle: JoinHandle<T>,
    run_at: DateTime<Utc>,
}

impl<T> ScheduledTask<T>
where
    T: Send + 'static,
{
    /// Schedule the given task to execute at time `run_at`.
    /// If `run_at` is in the past, the task will execute immediately.
    pub fn new<Fut>(task: Fut, run_at: DateTime<Utc>) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let sleep_duration = datetime_to_duration(run_at, Utc::now());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(sleep_duration).await;
            task.await
        });
        Self { handle, run_at }
    }

    /// When the task is due.
    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }

    /// Cancel the task. Returns true iff it had already completed before we could cancel it.
    pub async fn cancel(self) -> bool {
        self.handle.abort();
        self.handle.await.is_ok()
    }
}

/// Implement `Future` for `ScheduledTask` so we can directly `await` it.
impl<T> Future for ScheduledTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx)
    }
}

/// The time from `now` until `datetime`.
/// A `datetime` in the past produces a duration of zero.
fn datetime_to_duration(datetime: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (datetime - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn past_times_run_immediately() {
        let now = Utc::now();
        assert_eq!(
            datetime_to_duration(now - chrono::Duration::hours(1), now),
            Duration::ZERO
        );
        assert_eq!(
            datetime_to_duration(now + chrono::Duration::seconds(2), now),
            Duration::from_secs(2)
        );
    }

    #[rocket::async_test]
    async fn runs_when_due() {
        let task = ScheduledTask::new(async { 42 }, Utc::now() + chrono::Duration::milliseconds(20));
        assert_eq!(task.await.unwrap(), 42);
    }

    #[rocket::async_test]
    async fn cancelled_task_never_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = ScheduledTask::new(
            async move { flag.store(true, Ordering::SeqCst) },
            Utc::now() + chrono::Duration::seconds(60),
        );
        assert!(!task.cancel().await);
        assert!(!ran.load(Ordering::SeqCst));
    }
}
