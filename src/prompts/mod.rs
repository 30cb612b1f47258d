pub mod builder;
pub mod loader;
pub mod templates;

pub use builder::{BattleBrief, EpilogueBrief, PromptBuilder};
pub use loader::PromptLoader;
pub use templates::PROLOGUE;
