//! Start command: /start

use serenity::all::CreateCommand;

pub const NAME: &str = "start";

pub const GREETING: &str =
    "👋 I am ready! Send me a voice message, and I will transcribe it instantly using Groq.";

/// Register start command
pub fn register() -> Vec<CreateCommand> {
    vec![CreateCommand::new(NAME).description("Check that the bot is listening")]
}
