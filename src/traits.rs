use async_trait::async_trait;
use std::time::Duration;

use crate::chronicle::NarrativeLog;
use crate::types::{MatchState, Phase};

/// Read-only view of a playthrough for whatever renders it
pub trait MatchView {
    /// Current phase of the round state machine
    fn phase(&self) -> Phase;

    /// Round in progress, starting at 1
    fn round_number(&self) -> u32;

    /// Rounds won by the crab's companions
    fn crab_wins(&self) -> u32;

    /// Rounds won by the monkey's companions
    fn monkey_wins(&self) -> u32;

    /// Everything narrated so far, oldest first
    fn narrative(&self) -> &NarrativeLog;
}

impl MatchView for MatchState {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn round_number(&self) -> u32 {
        self.round_number
    }

    fn crab_wins(&self) -> u32 {
        self.crab_wins
    }

    fn monkey_wins(&self) -> u32 {
        self.monkey_wins
    }

    fn narrative(&self) -> &NarrativeLog {
        &self.log
    }
}

/// Presentation pacing between the two summons of a round.
///
/// Has no effect on the outcome of a round.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Waits on the tokio timer
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self, _duration: Duration) {}
}
