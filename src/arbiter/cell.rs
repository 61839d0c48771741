use std::sync::Arc;

use tokio::sync::Mutex;

use super::ArbiterState;

/// The arbiter's state as seen by the render task. The arbitration task is
/// the only writer; the render task consumes the one-shot flags.
#[derive(Debug, Clone, Default)]
pub struct StateCell {
    inner: Arc<Mutex<ArbiterState>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the arbiter's latest state. One-shot flags that the render
    /// task has not consumed yet are kept.
    pub async fn publish(&self, state: ArbiterState) {
        let mut shared = self.inner.lock().await;
        let mode_changed = shared.mode_changed || state.mode_changed;
        let clear_requested = shared.clear_requested || state.clear_requested;

        *shared = ArbiterState {
            mode_changed,
            clear_requested,
            ..state
        };
    }

    /// Snapshot for one render tick; clears the one-shot flags
    pub async fn take(&self) -> ArbiterState {
        let mut shared = self.inner.lock().await;
        let snapshot = *shared;
        shared.mode_changed = false;
        shared.clear_requested = false;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    #[tokio::test]
    async fn test_flags_survive_until_taken() {
        let cell = StateCell::new();

        cell.publish(ArbiterState {
            current_mode: Mode::Active,
            mode_changed: true,
            clear_requested: true,
            ..Default::default()
        })
        .await;

        // A second tick before the render task looked at the first one
        cell.publish(ArbiterState {
            current_mode: Mode::Active,
            ..Default::default()
        })
        .await;

        let snapshot = cell.take().await;
        assert_eq!(Mode::Active, snapshot.current_mode);
        assert!(snapshot.mode_changed);
        assert!(snapshot.clear_requested);

        let snapshot = cell.take().await;
        assert_eq!(Mode::Active, snapshot.current_mode);
        assert!(!snapshot.mode_changed);
        assert!(!snapshot.clear_requested);
    }
}
