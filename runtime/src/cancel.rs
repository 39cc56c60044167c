//! Cooperative cancellation shared by the worker and fan-out fetches.
//!
//! ```
//! use recipe_catalog_runtime::CancelToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let token = CancelToken::new();
//! let child = token.clone();
//!
//! let waiter = tokio::spawn(async move { child.cancelled().await });
//! token.cancel();
//! waiter.await.ok();
//! assert!(token.is_cancelled());
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::watch;

/// A cancellation flag that can be awaited.
///
/// Clones share the same flag. Once cancelled a token stays cancelled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token, waking every task awaiting [`CancelToken::cancelled`].
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the token has been fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token is fired. Returns immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Only fails if the sender is dropped, which cannot happen while
        // `self` holds it.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let child = token.clone();
        let waiter = tokio::spawn(async move { child.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_fired() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn uncancelled_token_stays_pending() {
        let token = CancelToken::new();
        let result = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(result.is_err());
    }
}
