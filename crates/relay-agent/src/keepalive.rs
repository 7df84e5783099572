//! Typing indicator kept alive for the duration of an operation.
//!
//! Discord's typing status expires after roughly ten seconds, so while a
//! model is generating we re-send it every [`TYPING_INTERVAL_SECS`]. The
//! signal loop lives inside the same future as the operation and therefore
//! stops the moment the operation settles, whatever the result.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub use relay_core::config::TYPING_INTERVAL_SECS;

use crate::pipeline::ChatChannel;

/// Default period between typing signals.
pub fn default_interval() -> Duration {
    Duration::from_secs(TYPING_INTERVAL_SECS)
}

/// Drive `operation` to completion while signalling "typing" on `channel`.
///
/// The first signal goes out immediately, then one per `period`. A
/// permission failure stops further signals but never the operation; any
/// other signal failure is logged and retried on the next tick.
pub async fn run_with_keepalive<C, F>(channel: &C, period: Duration, operation: F) -> F::Output
where
    C: ChatChannel + ?Sized,
    F: Future,
{
    tokio::pin!(operation);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut signalling = true;

    loop {
        tokio::select! {
            biased;
            out = &mut operation => return out,
            _ = ticker.tick(), if signalling => {
                tokio::select! {
                    biased;
                    out = &mut operation => return out,
                    res = channel.send_typing() => match res {
                        Ok(()) => debug!("typing signal sent"),
                        Err(e) if e.is_permission() => {
                            warn!(error = %e, "no permission to signal typing, giving up on keepalive");
                            signalling = false;
                        }
                        Err(e) => warn!(error = %e, "typing signal failed"),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use relay_core::ChannelError;

    use super::*;

    struct TypingRecorder {
        signals: AtomicUsize,
        fail_with: Option<ChannelError>,
    }

    impl TypingRecorder {
        fn ok() -> Self {
            Self {
                signals: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(err: ChannelError) -> Self {
            Self {
                signals: AtomicUsize::new(0),
                fail_with: Some(err),
            }
        }

        fn count(&self) -> usize {
            self.signals.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatChannel for TypingRecorder {
        async fn can_send(&self) -> bool {
            true
        }

        async fn send_typing(&self) -> Result<(), ChannelError> {
            self.signals.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn reply(&self, _text: &str) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn five() -> Duration {
        Duration::from_secs(5)
    }

    #[tokio::test(start_paused = true)]
    async fn twelve_second_operation_gets_three_signals() {
        let recorder = TypingRecorder::ok();
        let out = run_with_keepalive(&recorder, five(), async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            "done"
        })
        .await;

        assert_eq!(out, "done");
        // t = 0, 5, 10
        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_signals_after_operation_settles() {
        let recorder = TypingRecorder::ok();
        run_with_keepalive(&recorder, five(), async {
            tokio::time::sleep(Duration::from_secs(7)).await;
        })
        .await;
        let settled = recorder.count();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(recorder.count(), settled);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_operation_still_stops_signals() {
        let recorder = TypingRecorder::ok();
        let out: Result<(), &str> = run_with_keepalive(&recorder, five(), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Err("boom")
        })
        .await;

        assert_eq!(out, Err("boom"));
        assert_eq!(recorder.count(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_stops_signalling_but_not_the_operation() {
        let recorder = TypingRecorder::failing(ChannelError::PermissionDenied("Missing Permissions".into()));
        let out = run_with_keepalive(&recorder, five(), async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            42
        })
        .await;

        assert_eq!(out, 42);
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_keep_signalling() {
        let recorder = TypingRecorder::failing(ChannelError::Other("gateway hiccup".into()));
        run_with_keepalive(&recorder, five(), async {
            tokio::time::sleep(Duration::from_secs(12)).await;
        })
        .await;

        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn instant_operation_may_skip_signalling() {
        let recorder = TypingRecorder::ok();
        let out = run_with_keepalive(&recorder, five(), async { 1 }).await;
        assert_eq!(out, 1);
        assert_eq!(recorder.count(), 0);
    }
}
