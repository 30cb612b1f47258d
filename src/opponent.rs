//! Picks the monkey's summon for a round.
//!
//! Order of precedence: the reserved pairing, then a related character
//! suggested by the generator, then a random pick from a fixed roster.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use crate::llm::Narrator;
use crate::prompts::PromptBuilder;

/// The two names that are each other's only possible opponent
pub const RESERVED_PAIR: (&str, &str) = ("Maru", "Sne");

/// Archetypal opponents used when no related character is available
pub const DEFAULT_ROSTER: &[&str] = &[
    "Demon",
    "Thunder God",
    "Ice Spirit",
    "Wind God",
    "Giant Serpent",
    "Tengu",
    "Kappa",
    "Nine-Tailed Fox",
];

/// Longest related-character reply accepted as a name
const MAX_RELATED_CHARS: usize = 40;

/// Replies meaning "no related character"
const NO_MATCH_SENTINELS: &[&str] = &[
    "none", "unknown", "n/a", "no one", "nobody", "なし", "不明",
];

/// Two names that always face each other and always draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPairing {
    first: String,
    second: String,
}

impl ReservedPairing {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// The other member of the pair, if `name` is one of them
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(&self.first) {
            Some(&self.second)
        } else if name.eq_ignore_ascii_case(&self.second) {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Whether `a` and `b` are the two members of the pair
    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.partner_of(a)
            .is_some_and(|partner| partner.eq_ignore_ascii_case(b.trim()))
    }
}

impl Default for ReservedPairing {
    fn default() -> Self {
        Self::new(RESERVED_PAIR.0, RESERVED_PAIR.1)
    }
}

/// How the opponent was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Reserved(String),
    Related(String),
    Fallback(String),
}

impl Selection {
    pub fn name(&self) -> &str {
        match self {
            Selection::Reserved(name)
            | Selection::Related(name)
            | Selection::Fallback(name) => name,
        }
    }

    pub fn into_name(self) -> String {
        match self {
            Selection::Reserved(name)
            | Selection::Related(name)
            | Selection::Fallback(name) => name,
        }
    }
}

/// Opponent-selection policy
#[derive(Debug, Clone)]
pub struct OpponentSelector {
    pairing: ReservedPairing,
    roster: Vec<String>,
}

impl OpponentSelector {
    /// An empty roster is replaced by [`DEFAULT_ROSTER`]
    pub fn new(pairing: ReservedPairing, roster: Vec<String>) -> Self {
        let roster = if roster.is_empty() {
            DEFAULT_ROSTER.iter().map(|name| name.to_string()).collect()
        } else {
            roster
        };
        Self { pairing, roster }
    }

    pub fn pairing(&self) -> &ReservedPairing {
        &self.pairing
    }

    /// Chooses the monkey's summon against `crab`.
    ///
    /// Only the related-character lookup touches the generator; a failed
    /// lookup falls through to the roster.
    pub async fn select<R: Rng + Send>(
        &self,
        crab: &str,
        history: &BTreeSet<String>,
        narrator: &Narrator,
        prompts: &PromptBuilder,
        rng: &mut R,
    ) -> Selection {
        if let Some(partner) = self.pairing.partner_of(crab) {
            log::debug!("{} is reserved against {}", crab, partner);
            return Selection::Reserved(partner.to_string());
        }

        match prompts.build_related_prompt(crab) {
            Ok(prompt) => match narrator.request(prompt).await {
                Ok(reply) => {
                    if let Some(name) = accept_related(&reply, crab, history) {
                        return Selection::Related(name);
                    }
                    log::debug!("Related lookup for {} gave nothing usable: {:?}", crab, reply);
                }
                Err(e) => log::warn!("Related lookup for {} failed: {}", crab, e),
            },
            Err(e) => log::error!("Failed to build related prompt for {}: {}", crab, e),
        }

        Selection::Fallback(self.pick_fallback(history, rng))
    }

    /// Uniform pick from the roster, skipping names already used.
    ///
    /// Once every roster name has been used, repeats are allowed.
    pub fn pick_fallback<R: Rng + ?Sized>(
        &self,
        history: &BTreeSet<String>,
        rng: &mut R,
    ) -> String {
        let fresh: Vec<&String> = self
            .roster
            .iter()
            .filter(|name| !already_used(name, history))
            .collect();

        let picked = if fresh.is_empty() {
            log::debug!("Fallback roster exhausted, allowing repeats");
            self.roster.choose(rng)
        } else {
            fresh.choose(rng).copied()
        };

        // the roster is never empty, see `new`
        picked.cloned().unwrap_or_else(|| DEFAULT_ROSTER[0].to_string())
    }
}

impl Default for OpponentSelector {
    fn default() -> Self {
        Self::new(ReservedPairing::default(), Vec::new())
    }
}

/// Normalises a related-character reply, or rejects it.
///
/// Rejects sentinels, over-long replies, the crab's own character and names
/// already used by the monkey.
pub fn accept_related(reply: &str, crab: &str, history: &BTreeSet<String>) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|line| !line.is_empty())?;
    let name = line
        .trim_matches(|c: char| {
            matches!(
                c,
                '"' | '\''
                    | '`'
                    | '*'
                    | '「'
                    | '」'
                    | '『'
                    | '』'
                    | '“'
                    | '”'
                    | '.'
                    | '。'
                    | ' '
            )
        })
        .trim();

    if name.is_empty() || name.chars().count() > MAX_RELATED_CHARS {
        return None;
    }
    let lowered = name.to_lowercase();
    if NO_MATCH_SENTINELS.iter().any(|sentinel| lowered == *sentinel) {
        return None;
    }
    if name.eq_ignore_ascii_case(crab.trim()) || already_used(name, history) {
        return None;
    }
    Some(name.to_string())
}

/// History lookup ignoring ASCII case, as the reserved pairing does
fn already_used(name: &str, history: &BTreeSet<String>) -> bool {
    history.iter().any(|used| used.eq_ignore_ascii_case(name))
}
