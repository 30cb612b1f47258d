//! # Summon Battle
//!
//! Round engine for a retelling of the crab and the monkey: the player names
//! a companion for the young crab each round, a language model narrates the
//! summons and the battle, and the first side to win three rounds ends the tale.
//!
//! ## Features
//!
//! - **Round Engine**: Explicit state machine driven by a single `step(event)` call
//! - **Opponent Selection**: Reserved pairing, model-suggested rivals and a seeded
//!   fallback roster
//! - **Outcome Resolution**: Literal win phrase, secondary judgment and a fixed default
//! - **Graceful Degradation**: Every narration has a fixed placeholder when the model
//!   is unavailable
//! - **LLM Integration**: Built-in Gemini support behind the `NarrativeGenerator` trait
//!
//! ## Example
//!
//! ```rust,no_run
//! use summon_battle::{EngineConfig, Event, RoundEngine, llm::GeminiClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Create the engine with Gemini
//! let llm = GeminiClient::from_env()?;
//! let engine = RoundEngine::new(llm, EngineConfig::from_env()?);
//!
//! // Play a complete round
//! let state = engine.play_round("Bee").await?;
//!
//! // Or drive it one transition at a time
//! engine.step(Event::SubmitCrabSummon("Chestnut".into())).await?;
//! engine.step(Event::Advance).await?;
//! # Ok(())
//! # }
//! ```

pub mod chronicle;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod opponent;
pub mod prompts;
pub mod resolver;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use chronicle::{EntryKind, LogEntry, NarrativeLog};
pub use config::EngineConfig;
pub use engine::RoundEngine;
pub use error::{ConfigError, GenerationError, StepError, ValidationError};
pub use llm::NarrativeGenerator;
pub use opponent::{OpponentSelector, ReservedPairing, Selection};
pub use resolver::{OutcomeResolver, AMBIGUOUS_DEFAULT};
pub use traits::{MatchView, NoPacing, Pacer, TokioPacer};
pub use types::{Event, MatchState, Outcome, Phase, Side, WINNING_SCORE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
