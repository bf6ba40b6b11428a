//! Owner allow-list check

use std::fmt::Display;

/// Check if the sender is the owner of the bot.
///
/// With no owner configured every sender is allowed.
pub fn is_authorized(sender_id: impl Display, owner: Option<&str>) -> bool {
    match owner.map(str::trim) {
        None | Some("") => true,
        Some(owner) => sender_id.to_string().trim() == owner,
    }
}
