use std::{future, pin::Pin, time::Duration};

use tokio::time::{sleep, Sleep};

struct Pending<R> {
    timer: Pin<Box<Sleep>>,
    action: Box<dyn FnOnce() -> R + Send>,
}

/// Runs an action once its input has been quiet for a fixed period.
///
/// The timer is only polled by whoever awaits [`Debouncer::fired`], so
/// [`Debouncer::schedule`] and [`Debouncer::cancel`] take effect immediately:
/// an action that has been replaced or cancelled can never run.
pub struct Debouncer<R> {
    quiet: Duration,
    pending: Option<Pending<R>>,
}

impl<R> Debouncer<R> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Arms the timer with `action(value)`, replacing whatever was armed.
    pub fn schedule<T, F>(&mut self, value: T, action: F)
    where
        T: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        if self.pending.is_some() {
            log::trace!("Debounce timer re-armed");
        }
        self.pending = Some(Pending {
            timer: Box::pin(sleep(self.quiet)),
            action: Box::new(move || action(value)),
        });
    }

    /// Disarms the timer. Returns whether something was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the armed timer and returns the output of its action.
    ///
    /// Never completes while nothing is armed. Cancel safe, the action is
    /// taken and run in the same poll that observes the expiry.
    pub async fn fired(&mut self) -> R {
        match self.pending.as_mut() {
            Some(pending) => pending.timer.as_mut().await,
            None => future::pending().await,
        }

        match self.pending.take() {
            Some(pending) => (pending.action)(),
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::time::{advance, timeout, Instant};

    const QUIET: Duration = Duration::from_millis(300);

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_quiet_period() {
        let mut deb = Debouncer::new(QUIET);
        let start = Instant::now();
        deb.schedule("piz".to_string(), |q| q);
        assert!(deb.is_armed());

        assert_eq!(deb.fired().await, "piz");
        assert_elapsed(start, QUIET);
        assert!(!deb.is_armed());

        assert!(timeout(Duration::from_secs(5), deb.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesces_bursts() {
        let mut deb = Debouncer::new(QUIET);
        let start = Instant::now();
        for q in ["p", "pi", "piz", "pizz"] {
            deb.schedule(q, |q: &str| q.to_uppercase());
            advance(Duration::from_millis(100)).await;
        }

        assert_eq!(deb.fired().await, "PIZZ");
        // last schedule happened at 300ms
        assert_elapsed(start, Duration::from_millis(600));
        assert!(timeout(Duration::from_secs(5), deb.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mut deb = Debouncer::new(QUIET);
        assert!(!deb.cancel());

        deb.schedule(1, |x| x + 1);
        advance(Duration::from_millis(299)).await;
        assert!(deb.cancel());
        assert!(!deb.is_armed());
        assert!(timeout(Duration::from_secs(5), deb.fired()).await.is_err());

        deb.schedule(10, |x| x + 1);
        assert_eq!(deb.fired().await, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_but_unpolled_timer_can_still_be_cancelled() {
        let mut deb = Debouncer::new(QUIET);
        deb.schedule((), |()| "first");
        advance(Duration::from_secs(1)).await;
        deb.schedule((), |()| "second");
        assert_eq!(deb.fired().await, "second");
    }
}
