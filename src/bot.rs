//! Discord Bot event handler

use crate::commands;
use crate::config::Config;
use crate::event::{AttachmentRef, EventKind, IncomingEvent, Sender};
use crate::platform::{HttpAttachmentSource, ReplyError, Replier};
use crate::relay::VoiceRelay;
use crate::transcriber::GroqTranscriber;
use serenity::all::{
    ChannelId, Client, CommandInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, GuildId, Http,
    Interaction, Message, MessageFlags, MessageId, Ready, User,
};
use serenity::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

pub type DiscordRelay = VoiceRelay<GroqTranscriber, HttpAttachmentSource>;

/// Bot state shared across handlers
pub struct BotState {
    pub config: Arc<Config>,
    pub relay: DiscordRelay,
}

/// Main event handler for the bot
pub struct Handler {
    pub state: Arc<BotState>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);

        let commands = commands::all();

        // If guild ID is set, register to specific guild (faster for dev)
        if let Some(guild_id) = self.state.config.guild_id {
            let guild = GuildId::new(guild_id);
            match guild.set_commands(&ctx.http, commands).await {
                Ok(cmds) => info!("Registered {} guild commands", cmds.len()),
                Err(e) => error!("Failed to register guild commands: {}", e),
            }
        } else {
            match serenity::all::Command::set_global_commands(&ctx.http, commands).await {
                Ok(cmds) => info!("Registered {} global commands", cmds.len()),
                Err(e) => error!("Failed to register global commands: {}", e),
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            let kind = match command.data.name.as_str() {
                commands::start::NAME => EventKind::Start,
                _ => EventKind::Other,
            };
            let event = IncomingEvent::new(sender(&command.user), command.channel_id.get(), kind);

            let replier = CommandReplier {
                http: ctx.http.clone(),
                command,
            };
            let outcome = self.state.relay.dispatch(&event, &replier).await;
            debug!("Command from {} handled: {:?}", event.sender.id, outcome);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let event = event_from_message(&msg);
        if event.kind == EventKind::Other {
            return;
        }

        let replier = MessageReplier {
            http: ctx.http.clone(),
            channel_id: msg.channel_id,
            message_id: msg.id,
        };
        let outcome = self.state.relay.dispatch(&event, &replier).await;
        debug!("Message {} handled: {:?}", msg.id, outcome);
    }
}

/// Replies to a message as a Discord reply
struct MessageReplier {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

#[async_trait]
impl Replier for MessageReplier {
    async fn send_typing(&self) -> Result<(), ReplyError> {
        self.channel_id.broadcast_typing(&self.http).await?;
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<(), ReplyError> {
        let msg = CreateMessage::new()
            .content(text)
            .reference_message((self.channel_id, self.message_id));
        self.channel_id.send_message(&self.http, msg).await?;
        Ok(())
    }
}

/// Answers a slash command interaction
struct CommandReplier {
    http: Arc<Http>,
    command: CommandInteraction,
}

#[async_trait]
impl Replier for CommandReplier {
    async fn send_typing(&self) -> Result<(), ReplyError> {
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<(), ReplyError> {
        self.command
            .create_response(
                &self.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new().content(text),
                ),
            )
            .await?;
        Ok(())
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.get(),
        display_name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
    }
}

/// Classify a gateway message
fn event_from_message(msg: &Message) -> IncomingEvent {
    let voice = msg
        .attachments
        .iter()
        .find(|a| is_voice_message(msg.flags, a.content_type.as_deref()));

    let kind = match voice {
        Some(attachment) => EventKind::Voice(AttachmentRef {
            id: attachment.id.get(),
            url: attachment.url.clone(),
            filename: attachment.filename.clone(),
            size: attachment.size as u64,
            content_type: attachment.content_type.clone(),
        }),
        _ => EventKind::Other,
    };

    IncomingEvent::new(sender(&msg.author), msg.channel_id.get(), kind)
}

/// Flagged voice messages, or plain Ogg uploads from clients that don't set the flag
fn is_voice_message(flags: Option<MessageFlags>, content_type: Option<&str>) -> bool {
    flags.is_some_and(|f| f.contains(MessageFlags::IS_VOICE_MESSAGE))
        || content_type.is_some_and(|c| c.starts_with("audio/ogg"))
}

/// Create and run the Discord bot
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(config);

    let transcriber = GroqTranscriber::new(
        config.groq_api_key.clone(),
        config.groq_base_url.clone(),
        config.transcribe_timeout,
    )?;
    let source = HttpAttachmentSource::new()?;
    let relay = VoiceRelay::new(&config, transcriber, source);

    let state = Arc::new(BotState {
        config: config.clone(),
        relay,
    });

    let handler = Handler { state };

    // Attachments of guild messages are only delivered with MESSAGE_CONTENT
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    info!("Bot is listening for voice messages...");
    client.start().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_flag() {
        assert!(is_voice_message(Some(MessageFlags::IS_VOICE_MESSAGE), None));
        assert!(is_voice_message(
            Some(MessageFlags::IS_VOICE_MESSAGE | MessageFlags::SUPPRESS_EMBEDS),
            Some("audio/ogg")
        ));
        assert!(!is_voice_message(Some(MessageFlags::SUPPRESS_EMBEDS), Some("image/png")));
        assert!(!is_voice_message(None, None));
    }

    #[test]
    fn test_ogg_content_type_without_flag() {
        assert!(is_voice_message(None, Some("audio/ogg")));
        assert!(is_voice_message(None, Some("audio/ogg; codecs=opus")));
        assert!(!is_voice_message(None, Some("audio/mpeg")));
    }

    fn message_json(flags: Option<u64>, content_type: &str) -> serde_json::Value {
        let mut msg = serde_json::json!({
            "id": "1100000000000000001",
            "channel_id": "1100000000000000002",
            "author": {
                "id": "42",
                "username": "owner",
                "discriminator": "0",
                "global_name": "Owner",
                "avatar": null
            },
            "content": "",
            "timestamp": "2024-05-01T12:00:00.000000+00:00",
            "edited_timestamp": null,
            "tts": false,
            "mention_everyone": false,
            "mentions": [],
            "mention_roles": [],
            "attachments": [{
                "id": "1100000000000000003",
                "filename": "voice-message.ogg",
                "size": 5120,
                "url": "https://cdn.discordapp.com/attachments/1/2/voice-message.ogg",
                "proxy_url": "https://media.discordapp.net/attachments/1/2/voice-message.ogg",
                "content_type": content_type
            }],
            "embeds": [],
            "pinned": false,
            "type": 0
        });
        if let Some(flags) = flags {
            msg["flags"] = serde_json::json!(flags);
        }
        msg
    }

    #[test]
    fn test_event_from_unflagged_ogg_message() {
        let msg: Message = serde_json::from_value(message_json(None, "audio/ogg")).unwrap();
        let event = event_from_message(&msg);

        assert_eq!(event.sender.id, 42);
        assert_eq!(event.sender.display_name, "Owner");
        match event.kind {
            EventKind::Voice(attachment) => {
                assert_eq!(attachment.filename, "voice-message.ogg");
                assert_eq!(attachment.size, 5120);
            }
            other => panic!("expected voice event, got {other:?}"),
        }
    }

    #[test]
    fn test_event_from_flagged_and_plain_messages() {
        let flagged = message_json(Some(MessageFlags::IS_VOICE_MESSAGE.bits()), "audio/ogg");
        let msg: Message = serde_json::from_value(flagged).unwrap();
        assert!(matches!(event_from_message(&msg).kind, EventKind::Voice(_)));

        let msg: Message = serde_json::from_value(message_json(None, "image/png")).unwrap();
        assert_eq!(event_from_message(&msg).kind, EventKind::Other);
    }
}
