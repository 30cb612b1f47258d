//! Turns battle narration into a round outcome.

use regex::Regex;
use std::sync::LazyLock;

use crate::llm::Narrator;
use crate::opponent::ReservedPairing;
use crate::prompts::PromptBuilder;
use crate::types::{Outcome, Side};

/// Outcome used when neither the narration nor the judgment names a winner.
///
/// Deliberately favours the monkey rather than breaking ties at random.
pub const AMBIGUOUS_DEFAULT: Outcome = Outcome::MonkeyWin;

/// A side followed, within a few words, by a win word
static SIDE_THEN_WIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<side>crabs?|monkeys?)(?:['’]s)?(?:[\s_:-]+\w+){0,3}?[\s_:-]+(?:wins?|won|winner|victor(?:y|ious)?)\b",
    )
    .expect("valid regex")
});
/// A winner label followed by a side
static WINNER_THEN_SIDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:winner|victor)(?:\s+is)?[\s:-]+(?:the\s+)?|勝者(?:は|:|：)\s*)(?P<side>crabs?|monkeys?|カニ|蟹|かに|サル|猿|さる)",
    )
    .expect("valid regex")
});
static JA_SIDE_WIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<side>カニ|蟹|かに|サル|猿|さる)(?:側|陣営)?(?:の|が|は)?勝")
        .expect("valid regex")
});
static NEGATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnot\b|\bnever\b|n['’]t\b").expect("valid regex"));
static DRAW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdraw\b|\btie\b|引き分け|相打ち").expect("valid regex"));

/// One battle to be resolved
#[derive(Debug, Clone, Copy)]
pub struct BattleContext<'a> {
    pub crab: &'a str,
    pub monkey: &'a str,
    pub narration: &'a str,
    /// Side the narration was asked to declare the winner
    pub intended: Option<Side>,
}

/// How an outcome was reached, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ReservedDraw,
    WinPhrase,
    Judgment,
    Default,
}

/// Outcome resolver
#[derive(Debug, Clone, Default)]
pub struct OutcomeResolver {
    pairing: ReservedPairing,
}

impl OutcomeResolver {
    pub fn new(pairing: ReservedPairing) -> Self {
        Self { pairing }
    }

    /// Resolves a battle.
    ///
    /// The reserved pairing always draws. Otherwise the literal win phrase
    /// decides, then a judgment request, then [`AMBIGUOUS_DEFAULT`].
    pub async fn resolve(
        &self,
        battle: &BattleContext<'_>,
        narrator: &Narrator,
        prompts: &PromptBuilder,
    ) -> (Outcome, Resolution) {
        if self.pairing.matches(battle.crab, battle.monkey) {
            return (Outcome::Draw, Resolution::ReservedDraw);
        }

        if let Some(side) =
            match_win_phrase(battle.narration, battle.crab, battle.monkey, battle.intended)
        {
            return (side.into(), Resolution::WinPhrase);
        }

        log::debug!(
            "No win phrase for {} or {}, asking for a judgment",
            battle.crab,
            battle.monkey
        );
        let prompt =
            match prompts.build_judge_prompt(battle.crab, battle.monkey, battle.narration) {
                Ok(prompt) => prompt,
                Err(e) => {
                    log::error!("Failed to build judgment prompt: {}", e);
                    return (AMBIGUOUS_DEFAULT, Resolution::Default);
                }
            };

        match narrator.request(prompt).await {
            Ok(reply) => match classify_judgment(&reply) {
                Some(outcome) => (outcome, Resolution::Judgment),
                None => {
                    log::warn!(
                        "Ambiguous judgment {:?}, defaulting to {:?}",
                        reply,
                        AMBIGUOUS_DEFAULT
                    );
                    (AMBIGUOUS_DEFAULT, Resolution::Default)
                }
            },
            Err(e) => {
                log::warn!(
                    "Judgment request failed ({}), defaulting to {:?}",
                    e,
                    AMBIGUOUS_DEFAULT
                );
                (AMBIGUOUS_DEFAULT, Resolution::Default)
            }
        }
    }
}

/// Finds the side whose combatant is declared by the literal `"<name> won."`.
///
/// Exactly one side must be declared. When one name ends with the other
/// (`"Fox"` and `"Red Fox"`), a hit for the shorter name that is part of a hit
/// for the longer one does not count. When both sides share a name, the
/// intended winner decides.
pub fn match_win_phrase(
    text: &str,
    crab: &str,
    monkey: &str,
    intended: Option<Side>,
) -> Option<Side> {
    let (crab, monkey) = (crab.trim(), monkey.trim());
    if crab.is_empty() || monkey.is_empty() {
        return None;
    }

    let crab_phrase = format!("{} won.", crab);
    let monkey_phrase = format!("{} won.", monkey);

    if crab == monkey {
        return if text.contains(&crab_phrase) { intended } else { None };
    }

    let crab_hits = phrase_spans(text, &crab_phrase);
    let monkey_hits = phrase_spans(text, &monkey_phrase);

    let crab_declared = crab_hits.iter().any(|hit| !shadowed(*hit, &monkey_hits));
    let monkey_declared = monkey_hits.iter().any(|hit| !shadowed(*hit, &crab_hits));

    match (crab_declared, monkey_declared) {
        (true, false) => Some(Side::Crab),
        (false, true) => Some(Side::Monkey),
        _ => None,
    }
}

fn phrase_spans(text: &str, phrase: &str) -> Vec<(usize, usize)> {
    text.match_indices(phrase)
        .map(|(start, matched)| (start, start + matched.len()))
        .collect()
}

/// Whether `hit` lies inside a longer hit ending at the same place
fn shadowed(hit: (usize, usize), others: &[(usize, usize)]) -> bool {
    others
        .iter()
        .any(|&(start, end)| end == hit.1 && start < hit.0)
}

/// Reads a judgment reply as crab win, monkey win or draw.
///
/// Returns `None` when the reply names no result or more than one.
pub fn classify_judgment(reply: &str) -> Option<Outcome> {
    let mut crab = false;
    let mut monkey = false;

    let patterns = [&*SIDE_THEN_WIN_RE, &*WINNER_THEN_SIDE_RE, &*JA_SIDE_WIN_RE];
    for caps in patterns.iter().flat_map(|re| re.captures_iter(reply)) {
        if NEGATION_RE.is_match(&caps[0]) {
            continue;
        }
        let side = caps["side"].to_lowercase();
        if side.starts_with("crab") || matches!(side.as_str(), "カニ" | "蟹" | "かに") {
            crab = true;
        } else {
            monkey = true;
        }
    }
    let draw = DRAW_RE.is_match(reply);

    match (crab, monkey, draw) {
        (true, false, false) => Some(Outcome::CrabWin),
        (false, true, false) => Some(Outcome::MonkeyWin),
        (false, false, true) => Some(Outcome::Draw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use std::sync::Arc;
    use std::time::Duration;

    fn battle<'a>(crab: &'a str, monkey: &'a str, narration: &'a str) -> BattleContext<'a> {
        BattleContext {
            crab,
            monkey,
            narration,
            intended: None,
        }
    }

    async fn resolve_with(
        battle: BattleContext<'_>,
        generator: ScriptedGenerator,
    ) -> (Outcome, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        let narrator = Narrator::new(generator.clone(), Duration::from_secs(1));
        let (outcome, _) = OutcomeResolver::default()
            .resolve(&battle, &narrator, &PromptBuilder::default())
            .await;
        (outcome, generator)
    }

    #[test]
    fn win_phrase_picks_declared_side() {
        assert_eq!(match_win_phrase("Fox won.", "Fox", "Owl", None), Some(Side::Crab));
        assert_eq!(match_win_phrase("Fox won.", "Owl", "Fox", None), Some(Side::Monkey));
        assert_eq!(match_win_phrase("They fought all night.", "Fox", "Owl", None), None);
    }

    #[test]
    fn win_phrase_requires_exactly_one_side() {
        assert_eq!(match_win_phrase("Fox won. Owl won.", "Fox", "Owl", None), None);
        assert_eq!(match_win_phrase("fox won.", "Fox", "Owl", None), None);
    }

    #[test]
    fn longer_name_shadows_its_suffix() {
        assert_eq!(
            match_win_phrase("In the end Red Fox won.", "Fox", "Red Fox", None),
            Some(Side::Monkey)
        );
        assert_eq!(
            match_win_phrase("In the end Fox won.", "Fox", "Red Fox", None),
            Some(Side::Crab)
        );
    }

    #[test]
    fn identical_names_use_intended_side() {
        assert_eq!(
            match_win_phrase("Demon won.", "Demon", "Demon", Some(Side::Crab)),
            Some(Side::Crab)
        );
        assert_eq!(match_win_phrase("Demon won.", "Demon", "Demon", None), None);
    }

    #[test]
    fn classifies_labels_and_loose_wording() {
        assert_eq!(classify_judgment("CRAB_WIN"), Some(Outcome::CrabWin));
        assert_eq!(classify_judgment("monkey-side win"), Some(Outcome::MonkeyWin));
        assert_eq!(classify_judgment("The crab's side won"), Some(Outcome::CrabWin));
        assert_eq!(classify_judgment("draw"), Some(Outcome::Draw));
        assert_eq!(classify_judgment("DRAW."), Some(Outcome::Draw));
        assert_eq!(classify_judgment("カニの勝ち"), Some(Outcome::CrabWin));
        assert_eq!(classify_judgment("サル側の勝利"), Some(Outcome::MonkeyWin));
        assert_eq!(classify_judgment("引き分け"), Some(Outcome::Draw));
    }

    #[test]
    fn classifies_free_form_sentences() {
        assert_eq!(classify_judgment("The crab has won."), Some(Outcome::CrabWin));
        assert_eq!(classify_judgment("Winner: crab"), Some(Outcome::CrabWin));
        assert_eq!(
            classify_judgment("The crab side is the winner."),
            Some(Outcome::CrabWin)
        );
        assert_eq!(classify_judgment("The crab was victorious."), Some(Outcome::CrabWin));
        assert_eq!(classify_judgment("カニが勝った"), Some(Outcome::CrabWin));
        assert_eq!(
            classify_judgment("The monkey clearly won."),
            Some(Outcome::MonkeyWin)
        );
        assert_eq!(
            classify_judgment("The winner is the monkey."),
            Some(Outcome::MonkeyWin)
        );
        assert_eq!(classify_judgment("猿は勝利した"), Some(Outcome::MonkeyWin));
        assert_eq!(classify_judgment("勝者はサル"), Some(Outcome::MonkeyWin));
    }

    #[test]
    fn negated_or_distant_wins_do_not_count() {
        assert_eq!(classify_judgment("The monkey did not win."), None);
        assert_eq!(
            classify_judgment("The monkey didn't win; the crab won."),
            Some(Outcome::CrabWin)
        );
        assert_eq!(classify_judgment("The monkey, tired, fell. Rain won the day."), None);
    }

    #[test]
    fn conflicting_or_empty_judgments_are_ambiguous() {
        assert_eq!(classify_judgment("crab win or monkey win"), None);
        assert_eq!(classify_judgment("crab win, or maybe a draw"), None);
        assert_eq!(classify_judgment("I cannot decide."), None);
        assert_eq!(classify_judgment("drawing"), None);
    }

    #[tokio::test]
    async fn exact_phrase_needs_no_judgment() {
        let (outcome, generator) =
            resolve_with(battle("Fox", "Owl", "Fox won."), ScriptedGenerator::new()).await;
        assert_eq!(outcome, Outcome::CrabWin);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn draw_judgment_is_respected() {
        let (outcome, generator) = resolve_with(
            battle("Fox", "Owl", "Both fell into the river."),
            ScriptedGenerator::new().reply("draw"),
        )
        .await;
        assert_eq!(outcome, Outcome::Draw);
        assert!(generator.prompts()[0].contains("Both fell into the river."));
    }

    #[tokio::test]
    async fn sentence_judgment_for_the_crab_is_respected() {
        let (outcome, _) = resolve_with(
            battle("Fox", "Owl", "Both fell into the river."),
            ScriptedGenerator::new().reply("After a long night, the crab has won."),
        )
        .await;
        assert_eq!(outcome, Outcome::CrabWin);
    }

    #[tokio::test]
    async fn unparseable_judgment_defaults_to_monkey() {
        let (outcome, _) = resolve_with(
            battle("Fox", "Owl", "Both fell into the river."),
            ScriptedGenerator::new().reply("It was a beautiful evening."),
        )
        .await;
        assert_eq!(outcome, Outcome::MonkeyWin);
    }

    #[tokio::test]
    async fn failed_judgment_defaults_to_monkey() {
        let (outcome, _) = resolve_with(
            battle("Fox", "Owl", "Both fell into the river."),
            ScriptedGenerator::new(),
        )
        .await;
        assert_eq!(outcome, Outcome::MonkeyWin);
    }

    #[tokio::test]
    async fn reserved_pair_always_draws() {
        let (outcome, generator) =
            resolve_with(battle("Maru", "Sne", "Maru won."), ScriptedGenerator::new()).await;
        assert_eq!(outcome, Outcome::Draw);
        assert!(generator.prompts().is_empty());
    }
}
