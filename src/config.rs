//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default pause between the crab's and the monkey's summon
pub const DEFAULT_SUMMON_DELAY: Duration = Duration::from_millis(1500);

/// Default bound on a single generation request
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on the length of a summon name
pub const DEFAULT_MAX_SUMMON_CHARS: usize = 40;

/// Configuration for a [`crate::RoundEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// RNG seed for opponent picks and intended winners; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Presentation pause before the monkey summons
    pub summon_delay: Duration,
    /// Bound on each generation request
    pub generation_timeout: Duration,
    /// Chance that the battle narration is asked to let the crab win (0.0-1.0)
    pub crab_win_probability: f64,
    /// Longest accepted summon name, in characters
    pub max_summon_chars: usize,
    /// Directory with prompt overrides (`summon.md`, `battle.md`, ...)
    pub prompts_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            summon_delay: DEFAULT_SUMMON_DELAY,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            crab_win_probability: 0.5,
            max_summon_chars: DEFAULT_MAX_SUMMON_CHARS,
            prompts_dir: None,
        }
    }
}

impl EngineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_summon_delay(mut self, delay: Duration) -> Self {
        self.summon_delay = delay;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Set the crab-win probability (clamped to 0.0-1.0).
    pub fn with_crab_win_probability(mut self, probability: f64) -> Self {
        self.crab_win_probability = if probability.is_nan() {
            0.5
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_max_summon_chars(mut self, max: usize) -> Self {
        self.max_summon_chars = max.max(1);
        self
    }

    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    /// Configuration for tests: fixed seed, no pacing.
    pub fn for_tests(seed: u64) -> Self {
        Self::default()
            .with_seed(seed)
            .with_summon_delay(Duration::ZERO)
            .with_generation_timeout(Duration::from_secs(5))
    }

    /// Create configuration from environment variables.
    ///
    /// Loads a `.env` file first if one exists. Recognised variables:
    /// `SUMMON_SEED`, `SUMMON_DELAY_MS`, `SUMMON_TIMEOUT_SECS`,
    /// `SUMMON_CRAB_WIN_PROBABILITY`, `SUMMON_MAX_CHARS`, `SUMMON_PROMPTS_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("SUMMON_SEED") {
            config = config.with_seed(parse("SUMMON_SEED", &value)?);
        }
        if let Some(value) = get("SUMMON_DELAY_MS") {
            let millis = parse("SUMMON_DELAY_MS", &value)?;
            config = config.with_summon_delay(Duration::from_millis(millis));
        }
        if let Some(value) = get("SUMMON_TIMEOUT_SECS") {
            let secs: u64 = parse("SUMMON_TIMEOUT_SECS", &value)?;
            if secs == 0 {
                return Err(invalid("SUMMON_TIMEOUT_SECS", &value));
            }
            config = config.with_generation_timeout(Duration::from_secs(secs));
        }
        if let Some(value) = get("SUMMON_CRAB_WIN_PROBABILITY") {
            let probability: f64 = parse("SUMMON_CRAB_WIN_PROBABILITY", &value)?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(invalid("SUMMON_CRAB_WIN_PROBABILITY", &value));
            }
            config = config.with_crab_win_probability(probability);
        }
        if let Some(value) = get("SUMMON_MAX_CHARS") {
            config = config.with_max_summon_chars(parse("SUMMON_MAX_CHARS", &value)?);
        }
        if let Some(value) = get("SUMMON_PROMPTS_DIR") {
            config = config.with_prompts_dir(value.trim());
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}
