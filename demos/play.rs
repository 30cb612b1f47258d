use std::sync::Arc;

use summon_battle::llm::{GeminiClient, NarrativeGenerator, ScriptedGenerator};
use summon_battle::{
    EngineConfig, EntryKind, LogEntry, MatchView, RoundEngine, StepError, VERSION,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = EngineConfig::from_env()?;
    let generator: Arc<dyn NarrativeGenerator> = match GeminiClient::from_env() {
        Ok(client) => {
            println!("(narrating with {})", client.model());
            Arc::new(client)
        }
        Err(e) => {
            println!("({}; playing with fixed narration)", e);
            Arc::new(ScriptedGenerator::new())
        }
    };
    let engine = RoundEngine::new(generator, config);

    println!("=== The Summoning Battle of the Crab and the Monkey (v{}) ===\n", VERSION);
    println!("{}\n", engine.prologue());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = 0;

    loop {
        let state = engine.state();
        if state.is_ended() {
            println!("\nPlay again? [y/N]");
            match lines.next_line().await? {
                Some(answer) if answer.trim().eq_ignore_ascii_case("y") => {
                    engine.reset();
                    seen = 0;
                    println!("\n{}\n", engine.prologue());
                    continue;
                }
                _ => break,
            }
        }

        println!(
            "Round {} (crab {} - monkey {}). Whom does the young crab summon? (max {} chars)",
            state.round_number(),
            state.crab_wins(),
            state.monkey_wins(),
            engine.config().max_summon_chars
        );
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match engine.play_round(&line).await {
            Ok(state) => {
                for entry in state.narrative().since(seen) {
                    print_entry(entry);
                }
                seen = state.narrative().len();
            }
            Err(StepError::Validation(e)) => println!("{}", e),
            Err(e) => {
                println!("Something went wrong: {}", e);
                seen = engine.state().narrative().len();
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &LogEntry) {
    match (entry.kind, entry.side, entry.character.as_deref()) {
        (EntryKind::Summon, Some(side), Some(character)) => {
            println!("\n[{} summons {}]", side.label(), character);
            println!("{}", entry.text);
        }
        (EntryKind::Battle, _, _) => println!("\n{}", entry.text),
        (EntryKind::Verdict, _, _) => println!("\n>> {}\n", entry.text),
        (EntryKind::Epilogue, _, _) => println!("\n=== Epilogue ===\n{}", entry.text),
        _ => println!("{}", entry.text),
    }
}
