use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::chronicle::NarrativeLog;

/// Wins needed to end a playthrough
pub const WINNING_SCORE: u32 = 3;

/// Where a playthrough currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    AwaitingCrabSummon,
    AwaitingMonkeySummon,
    AwaitingBattleResolution,
    RoundResolved,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::AwaitingCrabSummon => "awaiting the crab's summon",
            Phase::AwaitingMonkeySummon => "awaiting the monkey's summon",
            Phase::AwaitingBattleResolution => "awaiting battle resolution",
            Phase::RoundResolved => "round resolved",
            Phase::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// One of the two combatants' camps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Crab,
    Monkey,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Crab => "crab",
            Side::Monkey => "monkey",
        }
    }
}

/// Result of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    CrabWin,
    MonkeyWin,
    Draw,
    Undetermined,
}

impl Outcome {
    /// The side that gains a point, if any
    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::CrabWin => Some(Side::Crab),
            Outcome::MonkeyWin => Some(Side::Monkey),
            Outcome::Draw | Outcome::Undetermined => None,
        }
    }
}

impl From<Side> for Outcome {
    fn from(side: Side) -> Self {
        match side {
            Side::Crab => Outcome::CrabWin,
            Side::Monkey => Outcome::MonkeyWin,
        }
    }
}

/// Input to [`crate::RoundEngine::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user names the crab's companion for this round
    SubmitCrabSummon(String),
    /// Moves the round to its next phase
    Advance,
    /// Throws the playthrough away and starts over
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitCrabSummon(_) => "SubmitCrabSummon",
            Event::Advance => "Advance",
            Event::Reset => "Reset",
        }
    }
}

/// The whole state of one playthrough
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchState {
    /// Increases on every reset; generation results are only applied to the
    /// playthrough that requested them
    pub playthrough: u64,
    pub phase: Phase,
    pub round_number: u32,
    pub crab_wins: u32,
    pub monkey_wins: u32,
    pub current_crab_character: Option<String>,
    pub current_monkey_character: Option<String>,
    /// Winner the battle narration was asked to declare
    pub intended_winner: Option<Side>,
    pub monkey_summoned_history: BTreeSet<String>,
    pub log: NarrativeLog,
    /// Only meaningful while `phase == RoundResolved`
    pub last_outcome: Outcome,
}

impl MatchState {
    /// Creates the canonical initial state for a playthrough
    pub fn new(playthrough: u64) -> Self {
        Self {
            playthrough,
            phase: Phase::AwaitingCrabSummon,
            round_number: 1,
            crab_wins: 0,
            monkey_wins: 0,
            current_crab_character: None,
            current_monkey_character: None,
            intended_winner: None,
            monkey_summoned_history: BTreeSet::new(),
            log: NarrativeLog::new(),
            last_outcome: Outcome::Undetermined,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// The side that won the match, once it has ended
    pub fn victor(&self) -> Option<Side> {
        if self.crab_wins >= WINNING_SCORE {
            Some(Side::Crab)
        } else if self.monkey_wins >= WINNING_SCORE {
            Some(Side::Monkey)
        } else {
            None
        }
    }

    /// Checks the consistency rules the engine relies on.
    ///
    /// Returns a description of the first broken rule.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.round_number == 0 {
            return Err("round number is zero".to_string());
        }
        if self.crab_wins > WINNING_SCORE || self.monkey_wins > WINNING_SCORE {
            return Err(format!(
                "score {}-{} exceeds {}",
                self.crab_wins, self.monkey_wins, WINNING_SCORE
            ));
        }
        let someone_won = self.crab_wins == WINNING_SCORE || self.monkey_wins == WINNING_SCORE;
        if self.crab_wins == WINNING_SCORE && self.monkey_wins == WINNING_SCORE {
            return Err("both sides reached the winning score".to_string());
        }
        match self.phase {
            Phase::Ended if !someone_won => {
                return Err("match ended without a winner".to_string());
            }
            Phase::Ended => {}
            _ if someone_won => {
                return Err(format!("winning score reached while {}", self.phase));
            }
            _ => {}
        }

        let needs_crab = matches!(
            self.phase,
            Phase::AwaitingMonkeySummon | Phase::AwaitingBattleResolution | Phase::RoundResolved
        );
        if needs_crab && self.current_crab_character.is_none() {
            return Err(format!("no crab character while {}", self.phase));
        }
        let needs_monkey = matches!(
            self.phase,
            Phase::AwaitingBattleResolution | Phase::RoundResolved
        );
        if needs_monkey && self.current_monkey_character.is_none() {
            return Err(format!("no monkey character while {}", self.phase));
        }
        if self.phase == Phase::RoundResolved && self.last_outcome == Outcome::Undetermined {
            return Err("round resolved without an outcome".to_string());
        }
        Ok(())
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_consistent() {
        let state = MatchState::new(7);
        assert_eq!(state.playthrough, 7);
        assert_eq!(state.phase, Phase::AwaitingCrabSummon);
        assert_eq!(state.round_number, 1);
        assert_eq!((state.crab_wins, state.monkey_wins), (0, 0));
        assert!(state.log.is_empty());
        assert_eq!(state.check_invariants(), Ok(()));
    }

    #[test]
    fn score_over_limit_is_rejected() {
        let mut state = MatchState::new(0);
        state.crab_wins = 4;
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn winning_score_requires_ended_phase() {
        let mut state = MatchState::new(0);
        state.monkey_wins = WINNING_SCORE;
        assert!(state.check_invariants().is_err());

        state.phase = Phase::Ended;
        assert_eq!(state.check_invariants(), Ok(()));
        assert_eq!(state.victor(), Some(Side::Monkey));
    }

    #[test]
    fn battle_phase_requires_both_combatants() {
        let mut state = MatchState::new(0);
        state.phase = Phase::AwaitingBattleResolution;
        state.current_crab_character = Some("Bee".to_string());
        assert!(state.check_invariants().is_err());

        state.current_monkey_character = Some("Demon".to_string());
        assert_eq!(state.check_invariants(), Ok(()));
    }

    #[test]
    fn outcome_winner_mapping() {
        assert_eq!(Outcome::from(Side::Crab), Outcome::CrabWin);
        assert_eq!(Outcome::MonkeyWin.winner(), Some(Side::Monkey));
        assert_eq!(Outcome::Draw.winner(), None);
    }
}
