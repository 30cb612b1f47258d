use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::chronicle::{EntryKind, LogEntry};
use crate::config::EngineConfig;
use crate::error::{StepError, ValidationError};
use crate::llm::{NarrativeGenerator, Narrator};
use crate::opponent::{OpponentSelector, Selection};
use crate::prompts::{BattleBrief, EpilogueBrief, PromptBuilder, PromptLoader, PROLOGUE};
use crate::resolver::{BattleContext, OutcomeResolver};
use crate::traits::{Pacer, TokioPacer};
use crate::types::{Event, MatchState, Outcome, Phase, Side, WINNING_SCORE};

/// Runs the crab-versus-monkey summoning battle, one transition at a time
pub struct RoundEngine {
    /// Current playthrough; never locked across an await
    state: Mutex<MatchState>,

    /// Serialises steps and owns the RNG
    turn: tokio::sync::Mutex<StdRng>,

    narrator: Narrator,
    prompts: PromptBuilder,
    selector: OpponentSelector,
    resolver: OutcomeResolver,
    pacer: Arc<dyn Pacer>,
    config: EngineConfig,
}

impl RoundEngine {
    /// Create a new engine with the given narrative generator
    pub fn new(generator: impl NarrativeGenerator + 'static, config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prompts = PromptBuilder::new(PromptLoader::new(config.prompts_dir.as_ref()));

        Self {
            state: Mutex::new(MatchState::new(0)),
            turn: tokio::sync::Mutex::new(rng),
            narrator: Narrator::new(Arc::new(generator), config.generation_timeout),
            prompts,
            selector: OpponentSelector::default(),
            resolver: OutcomeResolver::default(),
            pacer: Arc::new(TokioPacer),
            config,
        }
    }

    /// Replace the pacer used between the two summons
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Replace the opponent-selection policy
    pub fn with_selector(mut self, selector: OpponentSelector) -> Self {
        self.resolver = OutcomeResolver::new(selector.pairing().clone());
        self.selector = selector;
        self
    }

    /// Opening of the tale, shown before the first summon
    pub fn prologue(&self) -> &'static str {
        PROLOGUE
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the current playthrough
    pub fn state(&self) -> MatchState {
        self.lock_state().clone()
    }

    /// Discards the playthrough and starts a fresh one.
    ///
    /// Steps still waiting on the generator will find their playthrough gone
    /// and drop their results.
    pub fn reset(&self) -> MatchState {
        let mut state = self.lock_state();
        let fresh = MatchState::new(state.playthrough + 1);
        log::info!("🔄 Starting playthrough {}", fresh.playthrough);
        *state = fresh;
        state.clone()
    }

    /// Applies one event and returns the resulting state
    pub async fn step(&self, event: Event) -> Result<MatchState, StepError> {
        if event == Event::Reset {
            return Ok(self.reset());
        }

        let mut rng = self.turn.lock().await;
        let snapshot = self.checked_snapshot()?;

        match (snapshot.phase, event) {
            (Phase::Ended, _) => Err(StepError::MatchEnded),
            (Phase::AwaitingCrabSummon, Event::SubmitCrabSummon(name)) => {
                self.summon_crab(&snapshot, &name).await
            }
            (Phase::AwaitingMonkeySummon, Event::Advance) => {
                self.summon_monkey(&snapshot, &mut rng).await
            }
            (Phase::AwaitingBattleResolution, Event::Advance) => {
                self.resolve_battle(&snapshot).await
            }
            (Phase::RoundResolved, Event::Advance) => self.settle_round(&snapshot).await,
            (phase, event) => Err(StepError::invalid(phase, &event)),
        }
    }

    /// Submits the crab's summon and advances until the round is settled
    pub async fn play_round(&self, summon: &str) -> Result<MatchState, StepError> {
        let mut state = self
            .step(Event::SubmitCrabSummon(summon.to_string()))
            .await?;
        while !matches!(state.phase, Phase::AwaitingCrabSummon | Phase::Ended) {
            state = self.step(Event::Advance).await?;
        }
        Ok(state)
    }

    async fn summon_crab(&self, snapshot: &MatchState, raw: &str) -> Result<MatchState, StepError> {
        let name = self.validate_summon(raw)?;
        let round = snapshot.round_number;
        log::info!("🦀 Round {}: the crab summons {}", round, name);

        let text = self
            .narrate(self.prompts.build_summon_prompt(&name), || {
                self.prompts.summon_placeholder(&name)
            })
            .await;

        self.commit(snapshot.playthrough, |state| {
            state.current_crab_character = Some(name.clone());
            state.current_monkey_character = None;
            state.intended_winner = None;
            state.last_outcome = Outcome::Undetermined;
            state.log.push(LogEntry::summon(round, Side::Crab, name.as_str(), text));
            state.phase = Phase::AwaitingMonkeySummon;
        })
    }

    async fn summon_monkey(
        &self,
        snapshot: &MatchState,
        rng: &mut StdRng,
    ) -> Result<MatchState, StepError> {
        let Some(crab) = snapshot.current_crab_character.as_deref() else {
            return Err(self.violation("no crab character to oppose"));
        };
        let round = snapshot.round_number;

        self.pacer.pause(self.config.summon_delay).await;

        let selection = self
            .selector
            .select(
                crab,
                &snapshot.monkey_summoned_history,
                &self.narrator,
                &self.prompts,
                &mut *rng,
            )
            .await;
        log::info!("🐒 Round {}: the monkey summons {:?}", round, selection);

        let (intended, battle_text) = match &selection {
            Selection::Reserved(monkey) => (None, self.prompts.reconciliation(crab, monkey)),
            _ => {
                let monkey = selection.name();
                let side = if rng.gen_bool(self.crab_win_probability()) {
                    Side::Crab
                } else {
                    Side::Monkey
                };
                let winner = match side {
                    Side::Crab => crab,
                    Side::Monkey => monkey,
                };
                log::debug!("Round {} narration will favour {}", round, winner);

                let brief = BattleBrief {
                    round,
                    crab,
                    monkey,
                    winner,
                    crab_wins: snapshot.crab_wins,
                    monkey_wins: snapshot.monkey_wins,
                };
                let text = self
                    .narrate(self.prompts.build_battle_prompt(&brief), || {
                        self.prompts.battle_placeholder(crab, monkey, winner)
                    })
                    .await;
                (Some(side), text)
            }
        };

        let monkey = selection.into_name();
        let summon_line = self.prompts.monkey_summon_line(&monkey);
        self.commit(snapshot.playthrough, |state| {
            state.monkey_summoned_history.insert(monkey.clone());
            state
                .log
                .push(LogEntry::summon(round, Side::Monkey, monkey.as_str(), summon_line));
            state.log.push(LogEntry::new(EntryKind::Battle, round, battle_text));
            state.current_monkey_character = Some(monkey);
            state.intended_winner = intended;
            state.phase = Phase::AwaitingBattleResolution;
        })
    }

    async fn resolve_battle(&self, snapshot: &MatchState) -> Result<MatchState, StepError> {
        let (Some(crab), Some(monkey)) = (
            snapshot.current_crab_character.as_deref(),
            snapshot.current_monkey_character.as_deref(),
        ) else {
            return Err(self.violation("battle without both combatants"));
        };
        let round = snapshot.round_number;
        let narration = snapshot
            .log
            .latest(EntryKind::Battle, round)
            .map(|entry| entry.text.as_str())
            .unwrap_or_default();

        let battle = BattleContext {
            crab,
            monkey,
            narration,
            intended: snapshot.intended_winner,
        };
        let (outcome, resolution) = self
            .resolver
            .resolve(&battle, &self.narrator, &self.prompts)
            .await;
        log::info!("⚔️  Round {}: {:?} ({:?})", round, outcome, resolution);

        self.commit(snapshot.playthrough, |state| {
            state.last_outcome = outcome;
            state.phase = Phase::RoundResolved;
        })
    }

    async fn settle_round(&self, snapshot: &MatchState) -> Result<MatchState, StepError> {
        let round = snapshot.round_number;
        let outcome = snapshot.last_outcome;
        let (mut crab_wins, mut monkey_wins) = (snapshot.crab_wins, snapshot.monkey_wins);
        match outcome {
            Outcome::CrabWin => crab_wins += 1,
            Outcome::MonkeyWin => monkey_wins += 1,
            Outcome::Draw => {}
            Outcome::Undetermined => return Err(self.violation("settling an undetermined round")),
        }

        let winner = outcome.winner().and_then(|side| {
            let name = match side {
                Side::Crab => snapshot.current_crab_character.as_deref(),
                Side::Monkey => snapshot.current_monkey_character.as_deref(),
            };
            name.map(|name| (side, name))
        });
        let verdict = self
            .prompts
            .verdict_line(round, winner, crab_wins, monkey_wins);

        let victor = if crab_wins >= WINNING_SCORE {
            Some(Side::Crab)
        } else if monkey_wins >= WINNING_SCORE {
            Some(Side::Monkey)
        } else {
            None
        };

        let epilogue = match victor {
            Some(victor) => Some(
                self.write_epilogue(snapshot, victor, crab_wins, monkey_wins)
                    .await,
            ),
            None => None,
        };

        self.commit(snapshot.playthrough, |state| {
            state.crab_wins = crab_wins;
            state.monkey_wins = monkey_wins;
            state.log.push(LogEntry::new(EntryKind::Verdict, round, verdict));

            match (victor, epilogue) {
                (Some(victor), Some(text)) => {
                    log::info!(
                        "🏁 The {} wins the match {}-{}",
                        victor.label(),
                        crab_wins,
                        monkey_wins
                    );
                    state
                        .log
                        .push(LogEntry::new(EntryKind::Epilogue, round, text).with_side(victor));
                    state.phase = Phase::Ended;
                }
                _ => {
                    state.round_number += 1;
                    state.current_crab_character = None;
                    state.current_monkey_character = None;
                    state.intended_winner = None;
                    state.last_outcome = Outcome::Undetermined;
                    state.phase = Phase::AwaitingCrabSummon;
                }
            }
        })
    }

    async fn write_epilogue(
        &self,
        snapshot: &MatchState,
        victor: Side,
        crab_wins: u32,
        monkey_wins: u32,
    ) -> String {
        let crab_summons = snapshot.log.summoned_by(Side::Crab);
        let monkey_summons = snapshot.log.summoned_by(Side::Monkey);
        let brief = EpilogueBrief {
            victor,
            crab_summons: &crab_summons,
            monkey_summons: &monkey_summons,
            crab_wins,
            monkey_wins,
        };

        self.narrate(self.prompts.build_epilogue_prompt(&brief), || {
            self.prompts
                .epilogue_placeholder(victor, crab_wins, monkey_wins)
        })
        .await
    }

    /// Requests narration, falling back to fixed text on any failure
    async fn narrate<F>(&self, prompt: anyhow::Result<String>, fallback: F) -> String
    where
        F: FnOnce() -> String,
    {
        let prompt = match prompt {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("Failed to build prompt: {}", e);
                return fallback();
            }
        };

        match self.narrator.request(prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Narration unavailable, using placeholder: {}", e);
                fallback()
            }
        }
    }

    fn crab_win_probability(&self) -> f64 {
        let probability = self.config.crab_win_probability;
        if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    fn validate_summon(&self, raw: &str) -> Result<String, ValidationError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySummon);
        }
        let len = name.chars().count();
        if len > self.config.max_summon_chars {
            return Err(ValidationError::SummonTooLong {
                len,
                max: self.config.max_summon_chars,
            });
        }
        Ok(name.to_string())
    }

    /// Applies `apply` if the playthrough that started the step is still current
    fn commit<F>(&self, playthrough: u64, apply: F) -> Result<MatchState, StepError>
    where
        F: FnOnce(&mut MatchState),
    {
        let mut state = self.lock_state();
        if state.playthrough != playthrough {
            log::warn!(
                "Dropping result for playthrough {}; now on {}",
                playthrough,
                state.playthrough
            );
            return Err(StepError::Superseded {
                started: playthrough,
            });
        }
        apply(&mut state);
        Ok(state.clone())
    }

    /// Clones the state, resetting it first if it is inconsistent
    fn checked_snapshot(&self) -> Result<MatchState, StepError> {
        let mut state = self.lock_state();
        if let Err(problem) = state.check_invariants() {
            log::error!("Invariant violated: {}; resetting", problem);
            *state = MatchState::new(state.playthrough + 1);
            return Err(StepError::InvariantViolation(problem));
        }
        Ok(state.clone())
    }

    fn violation(&self, problem: &str) -> StepError {
        let mut state = self.lock_state();
        log::error!("Invariant violated: {}; resetting", problem);
        *state = MatchState::new(state.playthrough + 1);
        StepError::InvariantViolation(problem.to_string())
    }

    fn lock_state(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::llm::ScriptedGenerator;
    use crate::traits::NoPacing;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn engine(generator: impl NarrativeGenerator + 'static, config: EngineConfig) -> RoundEngine {
        RoundEngine::new(generator, config).with_pacer(Arc::new(NoPacing))
    }

    #[tokio::test]
    async fn empty_summon_is_rejected_without_advancing() {
        let engine = engine(ScriptedGenerator::new(), EngineConfig::for_tests(1));
        let before = engine.state();

        let err = engine
            .step(Event::SubmitCrabSummon("   ".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err, StepError::Validation(ValidationError::EmptySummon));
        assert_eq!(engine.state(), before);
    }

    #[tokio::test]
    async fn too_long_summon_is_rejected() {
        let config = EngineConfig::for_tests(1).with_max_summon_chars(5);
        let engine = engine(ScriptedGenerator::new(), config);

        let err = engine
            .step(Event::SubmitCrabSummon("Mortar and pestle".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StepError::Validation(ValidationError::SummonTooLong { max: 5, .. })
        ));
    }

    #[tokio::test]
    async fn generator_failure_uses_placeholder() {
        let generator =
            ScriptedGenerator::new().fail(GenerationError::RequestFailed("503".to_string()));
        let engine = engine(generator, EngineConfig::for_tests(1));

        let state = engine
            .step(Event::SubmitCrabSummon(" Bee ".to_string()))
            .await
            .unwrap();

        assert_eq!(state.phase, Phase::AwaitingMonkeySummon);
        assert_eq!(state.current_crab_character.as_deref(), Some("Bee"));
        assert_eq!(state.log.entries()[0].text, "Bee was summoned.");
    }

    #[tokio::test]
    async fn advance_is_rejected_before_summon() {
        let engine = engine(ScriptedGenerator::new(), EngineConfig::for_tests(1));

        let err = engine.step(Event::Advance).await.unwrap_err();
        assert_eq!(
            err,
            StepError::InvalidTransition {
                phase: Phase::AwaitingCrabSummon,
                event: "Advance"
            }
        );
    }

    #[tokio::test]
    async fn corrupted_state_triggers_reset() {
        let engine = engine(ScriptedGenerator::new(), EngineConfig::for_tests(1));
        engine.lock_state().crab_wins = 5;

        let err = engine.step(Event::Advance).await.unwrap_err();

        assert!(matches!(err, StepError::InvariantViolation(_)));
        let state = engine.state();
        assert_eq!(state.crab_wins, 0);
        assert_eq!(state.phase, Phase::AwaitingCrabSummon);
        assert_eq!(state.playthrough, 1);
    }

    struct Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl NarrativeGenerator for Gated {
        async fn generate(&self, _prompt: String) -> Result<String, GenerationError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("A bee buzzed in from the orchard.".to_string())
        }
    }

    #[tokio::test]
    async fn reset_mid_step_discards_result() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let engine = Arc::new(engine(
            Gated {
                entered: entered.clone(),
                release: release.clone(),
            },
            EngineConfig::for_tests(1),
        ));

        let stepping = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .step(Event::SubmitCrabSummon("Bee".to_string()))
                    .await
            })
        };

        entered.notified().await;
        assert_eq!(engine.reset().playthrough, 1);
        release.notify_one();

        let result = stepping.await.unwrap();
        assert_eq!(result, Err(StepError::Superseded { started: 0 }));

        let state = engine.state();
        assert_eq!(state.phase, Phase::AwaitingCrabSummon);
        assert!(state.log.is_empty());
        assert!(state.current_crab_character.is_none());
    }
}
