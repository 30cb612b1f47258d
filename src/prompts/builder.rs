use anyhow::Result;

use super::loader::PromptLoader;
use super::templates::{
    BATTLE_DEFAULT, BATTLE_PLACEHOLDER, EPILOGUE_DEFAULT, EPILOGUE_PLACEHOLDER, JUDGE_DEFAULT,
    MONKEY_SUMMON_LINE, RECONCILIATION, RELATED_DEFAULT, SUMMON_DEFAULT, SUMMON_PLACEHOLDER,
};
use crate::types::Side;

/// Everything the battle prompt needs to know about the round
#[derive(Debug, Clone, Copy)]
pub struct BattleBrief<'a> {
    pub round: u32,
    pub crab: &'a str,
    pub monkey: &'a str,
    pub winner: &'a str,
    pub crab_wins: u32,
    pub monkey_wins: u32,
}

/// Inputs for the closing scene
#[derive(Debug, Clone, Copy)]
pub struct EpilogueBrief<'a> {
    pub victor: Side,
    pub crab_summons: &'a [&'a str],
    pub monkey_summons: &'a [&'a str],
    pub crab_wins: u32,
    pub monkey_wins: u32,
}

/// Builds generation prompts and fixed narration from templates
pub struct PromptBuilder {
    loader: PromptLoader,
}

impl PromptBuilder {
    pub fn new(loader: PromptLoader) -> Self {
        Self { loader }
    }

    /// Prompt for the narration of the crab's summon
    pub fn build_summon_prompt(&self, character: &str) -> Result<String> {
        let template = self.loader.load("summon", SUMMON_DEFAULT)?;
        Ok(fill(&template, &[("character", character)]))
    }

    /// Prompt for the battle, constrained to end with `"<winner> won."`
    pub fn build_battle_prompt(&self, brief: &BattleBrief<'_>) -> Result<String> {
        let template = self.loader.load("battle", BATTLE_DEFAULT)?;
        let round = brief.round.to_string();
        let crab_wins = brief.crab_wins.to_string();
        let monkey_wins = brief.monkey_wins.to_string();
        Ok(fill(
            &template,
            &[
                ("round", &round),
                ("crab", brief.crab),
                ("monkey", brief.monkey),
                ("winner", brief.winner),
                ("crab_wins", &crab_wins),
                ("monkey_wins", &monkey_wins),
            ],
        ))
    }

    /// Prompt asking for one rival related to `character`, or `none`
    pub fn build_related_prompt(&self, character: &str) -> Result<String> {
        let template = self.loader.load("related", RELATED_DEFAULT)?;
        Ok(fill(&template, &[("character", character)]))
    }

    /// Prompt asking for a crab win / monkey win / draw label
    pub fn build_judge_prompt(&self, crab: &str, monkey: &str, narration: &str) -> Result<String> {
        let template = self.loader.load("judge", JUDGE_DEFAULT)?;
        Ok(fill(
            &template,
            &[("crab", crab), ("monkey", monkey), ("narration", narration)],
        ))
    }

    pub fn build_epilogue_prompt(&self, brief: &EpilogueBrief<'_>) -> Result<String> {
        let template = self.loader.load("epilogue", EPILOGUE_DEFAULT)?;
        let (crab_summons, monkey_summons) = (
            list_or_nobody(brief.crab_summons),
            list_or_nobody(brief.monkey_summons),
        );
        let crab_wins = brief.crab_wins.to_string();
        let monkey_wins = brief.monkey_wins.to_string();
        Ok(fill(
            &template,
            &[
                ("crab_summons", &crab_summons),
                ("monkey_summons", &monkey_summons),
                ("victor", victor_label(brief.victor)),
                ("crab_wins", &crab_wins),
                ("monkey_wins", &monkey_wins),
            ],
        ))
    }

    // Fixed narration. Never goes through the loader so it is always available.

    pub fn summon_placeholder(&self, character: &str) -> String {
        fill(SUMMON_PLACEHOLDER, &[("character", character)])
    }

    pub fn monkey_summon_line(&self, character: &str) -> String {
        fill(MONKEY_SUMMON_LINE, &[("character", character)])
    }

    pub fn battle_placeholder(&self, crab: &str, monkey: &str, winner: &str) -> String {
        fill(
            BATTLE_PLACEHOLDER,
            &[("crab", crab), ("monkey", monkey), ("winner", winner)],
        )
    }

    pub fn reconciliation(&self, crab: &str, monkey: &str) -> String {
        fill(RECONCILIATION, &[("crab", crab), ("monkey", monkey)])
    }

    pub fn epilogue_placeholder(&self, victor: Side, crab_wins: u32, monkey_wins: u32) -> String {
        fill(
            EPILOGUE_PLACEHOLDER,
            &[
                ("victor", victor_label(victor)),
                ("crab_wins", &crab_wins.to_string()),
                ("monkey_wins", &monkey_wins.to_string()),
            ],
        )
    }

    /// One-line announcement of a round result
    pub fn verdict_line(
        &self,
        round: u32,
        winner: Option<(Side, &str)>,
        crab_wins: u32,
        monkey_wins: u32,
    ) -> String {
        let result = match winner {
            Some((side, name)) => format!("{} won round {} for the {}", name, round, side.label()),
            None => format!("Round {} ended in a draw", round),
        };
        format!(
            "{}. Score: crab {}, monkey {}.",
            result, crab_wins, monkey_wins
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptLoader::builtin())
    }
}

fn victor_label(side: Side) -> &'static str {
    match side {
        Side::Crab => "young crab",
        Side::Monkey => "monkey",
    }
}

fn list_or_nobody(names: &[&str]) -> String {
    if names.is_empty() {
        "nobody".to_string()
    } else {
        names.join(", ")
    }
}

/// Replaces every `{key}` in `template` with its value.
///
/// Values are inserted verbatim and never rescanned, so user text containing
/// braces is safe.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match replaced {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
