use crate::bridge::{Bridge, InboundMessage, ReplySink};
use crate::card::{Card, FormattedCard};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ApplicationId, Client, Colour, Context, CreateAttachment, CreateEmbed, CreateEmbedAuthor,
    CreateMessage, EventHandler, GatewayIntents, Message, Ready, ShardManager, Timestamp,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Discord refuses messages with more attachments than this
const MAX_ATTACHMENTS: usize = 10;

struct Handler {
    bridge: Arc<Bridge>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let inbound = InboundMessage {
            content: &msg.content,
            from_bot: msg.author.bot,
        };
        let sink = DiscordReply {
            ctx: &ctx,
            message: &msg,
        };
        self.bridge.handle_message(inbound, &sink).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}!", ready.user.name);
    }
}

/// Replies to the triggering message in its channel
struct DiscordReply<'a> {
    ctx: &'a Context,
    message: &'a Message,
}

#[async_trait]
impl ReplySink for DiscordReply<'_> {
    async fn post(&self, reply: &FormattedCard) -> Result<()> {
        let mut attachments = Vec::new();
        for path in attachment_paths(&reply.files) {
            let attachment = CreateAttachment::path(path)
                .await
                .with_context(|| format!("Failed to read attachment {}", path.display()))?;
            attachments.push(attachment);
        }

        let builder = CreateMessage::new()
            .embed(embed(&reply.card))
            .add_files(attachments)
            .reference_message(self.message);

        self.message
            .channel_id
            .send_message(&self.ctx.http, builder)
            .await
            .context("Failed to send reply")?;
        Ok(())
    }
}

/// The files that fit in one reply
fn attachment_paths(files: &[PathBuf]) -> &[PathBuf] {
    if files.len() > MAX_ATTACHMENTS {
        warn!(
            "Ad has {} images, attaching the first {}",
            files.len(),
            MAX_ATTACHMENTS
        );
    }
    &files[..files.len().min(MAX_ATTACHMENTS)]
}

fn embed(card: &Card) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .colour(Colour::new(card.colour))
        .title(&card.title)
        .url(&card.url)
        .author(CreateEmbedAuthor::new(&card.author))
        .description(&card.description);

    if let Some(thumbnail) = &card.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    for field in &card.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Ok(timestamp) = Timestamp::from_unix_timestamp(card.timestamp.timestamp()) {
        embed = embed.timestamp(timestamp);
    }
    embed
}

/// Owned gateway session. Created once, started, stopped on shutdown.
pub struct DiscordBridge {
    client: Client,
}

impl DiscordBridge {
    pub async fn connect(token: &str, client_id: u64, bridge: Arc<Bridge>) -> Result<Self> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let client = Client::builder(token, intents)
            .application_id(ApplicationId::new(client_id))
            .event_handler(Handler { bridge })
            .await
            .context("Failed to create Discord client")?;

        Ok(Self { client })
    }

    /// Handle used to stop the session from another task
    pub fn shard_manager(&self) -> Arc<ShardManager> {
        self.client.shard_manager.clone()
    }

    /// Run the gateway until stopped or disconnected
    pub async fn start(&mut self) -> Result<()> {
        self.client
            .start()
            .await
            .context("Discord client stopped with an error")
    }

    pub async fn stop(shard_manager: &ShardManager) {
        info!("Shutting down Discord session");
        shard_manager.shutdown_all().await;
    }
}
