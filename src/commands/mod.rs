//! Slash commands

pub mod start;

use serenity::all::CreateCommand;

/// Every command the bot registers
pub fn all() -> Vec<CreateCommand> {
    start::register()
}
