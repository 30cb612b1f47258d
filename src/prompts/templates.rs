//! Built-in prompt templates and fixed narration.
//!
//! Placeholders are written as `{name}` and filled by [`super::PromptBuilder`].

/// Opening of the tale, shown before the first summon
pub const PROLOGUE: &str = r#"Long ago, in a small village by the sea, there lived a mother crab and her child.
One day a cunning monkey tricked the mother crab and killed her.
Left alone, the young crab discovered the power hidden in a mysterious shell handed down by its mother.
That shell could summon anything in the world.

The young crab swore revenge on the monkey with this power.
But the monkey, too, was a master of summoning.

Now the legendary summoning battle begins.
Whom will the young crab call to its side?"#;

/// Default summon narration prompt
pub const SUMMON_DEFAULT: &str = r#"Describe the moment "{character}" is summoned by the young crab in the tale of the crab and the monkey.
Follow these rules:
- Write in the style of a short passage from a novel
- Do not include any dialogue
- Do not use exclamation marks
- Keep it under two sentences"#;

/// Default battle narration prompt
pub const BATTLE_DEFAULT: &str = r#"This is round {round} of the summoning battle from the tale of the crab and the monkey.
The young crab has summoned {crab}. The monkey has answered by summoning {monkey}.
Score so far: crab {crab_wins}, monkey {monkey_wins}.

Describe the clash between {crab} and {monkey} in about three sentences.
Follow these rules:
- Do not include any dialogue
- Do not use exclamation marks
- {winner} must win this battle
- End the text with exactly this sentence: {winner} won."#;

/// Default prompt asking for a rival related to the crab's summon
pub const RELATED_DEFAULT: &str = r#"Name one character that is closely related to "{character}" by genre, setting or era and would make a fitting rival for it.
Reply with the name only, on a single line, with no explanation.
If you cannot think of one, reply with exactly: none"#;

/// Default prompt asking for a verdict on a battle narration
pub const JUDGE_DEFAULT: &str = r#"Below is a description of a battle between {crab}, fighting for the crab, and {monkey}, fighting for the monkey.
Decide how the battle ended.
Reply with exactly one of these labels and nothing else: CRAB_WIN, MONKEY_WIN, DRAW

{narration}"#;

/// Default closing-scene prompt
pub const EPILOGUE_DEFAULT: &str = r#"This is the final scene of the summoning battle from the tale of the crab and the monkey.
Companions summoned by the young crab: {crab_summons}
Companions summoned by the monkey: {monkey_summons}
The {victor} won the battle {crab_wins} to {monkey_wins}.

Write the closing scene of the tale in about four sentences, without dialogue.
End it with: And they all lived happily ever after."#;

/// Fallback when summon narration is unavailable
pub const SUMMON_PLACEHOLDER: &str = "{character} was summoned.";

/// Announcement of the monkey's summon
pub const MONKEY_SUMMON_LINE: &str = "The monkey answered by summoning {character}.";

/// Fallback when battle narration is unavailable; ends with the win phrase
pub const BATTLE_PLACEHOLDER: &str =
    "{crab} and {monkey} clashed on the shore until the dust settled. {winner} won.";

/// Substituted for the battle when the reserved pair meet
pub const RECONCILIATION: &str = r#"{crab} and {monkey} knew each other at a glance.
Whatever feud once stood between them had ended long before the young crab was born, and neither would raise a hand against the other.
They sat down side by side on the shore and watched the tide come in. The round ended in a draw."#;

/// Fallback when the closing scene is unavailable
pub const EPILOGUE_PLACEHOLDER: &str =
    "The summoning battle was over. The {victor} had won, {crab_wins} to {monkey_wins}. And they all lived happily ever after.";
