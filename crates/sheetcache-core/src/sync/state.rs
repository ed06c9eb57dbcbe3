//! Flush state machine.
//!
//! ```text
//! Idle -> Batching -> Attempting -> {Success, RateLimited, FatalError}
//! RateLimited -> Attempting   while attempts < max_retries
//! RateLimited -> Exhausted    once attempts == max_retries
//! ```
//!
//! Transitions are pure; the engine drives them and performs the side effects.

/// Where a flush currently is. `attempt` is 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Batching,
    Attempting { attempt: u32 },
    RateLimited { attempt: u32 },
    Success,
    FatalError,
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushEvent {
    /// A flush was requested.
    Begin,
    /// The batch snapshot is ready.
    Batched,
    RemoteOk,
    RemoteRateLimited,
    /// Any remote error that is not a rate limit.
    RemoteFailed,
    /// Backoff finished; try the next credential.
    Retry,
}

impl FlushState {
    /// Next state after `event`. Events that do not apply leave the state unchanged.
    pub fn on(self, event: FlushEvent, max_retries: u32) -> FlushState {
        use FlushEvent::*;
        use FlushState::*;

        match (self, event) {
            (Idle, Begin) => Batching,
            (Batching, Batched) => Attempting { attempt: 0 },
            (Attempting { .. }, RemoteOk) => Success,
            (Attempting { attempt }, RemoteRateLimited) => RateLimited { attempt },
            (Attempting { .. }, RemoteFailed) => FatalError,
            (RateLimited { attempt }, Retry) => {
                let next = attempt.saturating_add(1);
                if next < max_retries {
                    Attempting { attempt: next }
                } else {
                    Exhausted
                }
            }
            (state, _) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlushState::Success | FlushState::FatalError | FlushState::Exhausted
        )
    }
}
