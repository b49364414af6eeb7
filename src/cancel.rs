//! Cancellation for in-flight backend calls.
//!
//! A view owns a [`CancelSource`] for as long as it is mounted and hands a
//! [`CancelToken`] to every accessor call it makes. Dropping the source (the
//! view going away) cancels every outstanding call.

use std::future::Future;

use tokio::sync::watch;
use tracing::warn;

use crate::error::ClientError;

#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Cancels once `signal` fires. If the signal cannot be installed the
    /// source stays alive and is never cancelled by this task.
    pub async fn cancel_on<F>(self, signal: F)
    where
        F: Future<Output = std::io::Result<()>>,
    {
        match signal.await {
            Ok(()) => self.cancel(),
            Err(err) => {
                warn!(?err, "cancel signal unavailable");
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CancelSource {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow(),
            None => false,
        }
    }

    /// Resolves once the owning source is cancelled or dropped.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // Sender dropped: Drop already sent `true`, but treat a closed
            // channel as cancelled either way.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Runs `fut` unless the token fires first.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ClientError>,
    {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ClientError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::time::Duration;

    #[tokio::test]
    async fn never_token_runs_to_completion() {
        let token = CancelToken::never();
        let value = token
            .run(async { Ok::<_, BackendError>(7) })
            .await
            .expect("value");
        assert_eq!(value, 7);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_future() {
        let source = CancelSource::new();
        let token = source.token();

        let handle = tokio::spawn(async move {
            token
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, BackendError>(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel();

        let result = handle.await.expect("join");
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn failed_signal_keeps_source_alive() {
        let source = CancelSource::new();
        let token = source.token();
        let task = tokio::spawn(source.cancel_on(async {
            Err(std::io::Error::other("signal handler unavailable"))
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!token.is_cancelled());
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test]
    async fn fired_signal_cancels() {
        let source = CancelSource::new();
        let token = source.token();
        tokio::spawn(source.cancel_on(async { Ok(()) }))
            .await
            .expect("join");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_source_cancels_tokens() {
        let source = CancelSource::new();
        let token = source.token();
        drop(source);

        assert!(token.is_cancelled());
        let result = token.run(async { Ok::<_, BackendError>(1) }).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
