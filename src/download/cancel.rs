use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, level-triggered cancellation flag.
///
/// Once requested it stays set until [`reset`](Self::reset) is called at the
/// start of the next operation. Holders poll it at coarse checkpoints.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones_until_reset() {
        let token = CancellationToken::new();
        let seen_elsewhere = token.clone();
        assert!(!seen_elsewhere.is_requested());

        token.request();
        assert!(seen_elsewhere.is_requested());
        // stays set: level-triggered
        assert!(seen_elsewhere.is_requested());

        seen_elsewhere.reset();
        assert!(!token.is_requested());
    }
}
