use crate::service::{Accent, Body, Command, CommandService, Listing, Reply, Visibility};
use chrono::Utc;
use serenity::all::{
    Colour, Command as SlashCommand, CommandInteraction, CommandOptionType, Context,
    CreateAllowedMentions, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, GuildId,
    Interaction, Message, Ready,
};
use serenity::{async_trait, Client};
use std::sync::Arc;
use tracing::{error, info, warn};

struct Handler {
    service: Arc<CommandService>,
    guild_id: Option<GuildId>,
}

pub async fn run(
    token: &str,
    guild_id: Option<u64>,
    service: Arc<CommandService>,
) -> serenity::Result<()> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = Handler {
        service,
        guild_id: guild_id.map(GuildId::new),
    };

    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    client.start().await
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let commands = slash_commands();
        let registered = match self.guild_id {
            Some(guild_id) => guild_id.set_commands(&ctx.http, commands).await,
            None => SlashCommand::set_global_commands(&ctx.http, commands).await,
        };

        match registered {
            Ok(commands) => info!("Registered {} slash commands", commands.len()),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }
        info!("Bot is ready! Logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, message: Message) {
        if message.author.bot {
            return;
        }

        let response = self
            .service
            .on_message(message.author.id.get(), &message.content);

        if let Some(value) = response.lookup {
            send_lookup(&ctx, &message, &value).await;
        }

        if let Some(text) = response.confirmation {
            let builder = CreateMessage::new().content(text);
            if let Err(e) = message.channel_id.send_message(&ctx.http, builder).await {
                error!("Failed to send confirmation result: {}", e);
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(interaction) = interaction else {
            return;
        };

        if let Err(e) = self.handle_command(&ctx, &interaction).await {
            error!("Failed to answer /{}: {}", interaction.data.name, e);
        }
    }
}

impl Handler {
    async fn handle_command(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> serenity::Result<()> {
        let Some(command) = parse_command(interaction) else {
            warn!("Unknown or malformed command /{}", interaction.data.name);
            return Ok(());
        };
        let user_id = interaction.user.id.get();

        if let Err(reply) = self.service.admit(user_id, &command, Utc::now()) {
            let response = CreateInteractionResponse::Message(response_message(&reply));
            return interaction.create_response(&ctx.http, response).await;
        }

        let deferred = command.is_slow();
        if deferred {
            interaction.defer(&ctx.http).await?;
        }

        let replies = self.service.execute(user_id, command).await;
        deliver(ctx, interaction, replies, deferred).await
    }
}

/// A lookup sent as a reply to another message answers that message.
async fn send_lookup(ctx: &Context, message: &Message, value: &str) {
    let builder = CreateMessage::new().content(value);

    let referenced = message
        .message_reference
        .as_ref()
        .and_then(|reference| reference.message_id);

    if let Some(referenced) = referenced {
        let reply = builder
            .clone()
            .reference_message((message.channel_id, referenced))
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false));

        match message.channel_id.send_message(&ctx.http, reply).await {
            Ok(_) => return,
            Err(e) => warn!("Could not reply to referenced message, sending plainly: {}", e),
        }
    }

    if let Err(e) = message.channel_id.send_message(&ctx.http, builder).await {
        error!("Failed to send lookup: {}", e);
    }
}

async fn deliver(
    ctx: &Context,
    interaction: &CommandInteraction,
    replies: Vec<Reply>,
    deferred: bool,
) -> serenity::Result<()> {
    for (i, reply) in replies.iter().enumerate() {
        if i == 0 && !deferred {
            let response = CreateInteractionResponse::Message(response_message(reply));
            interaction.create_response(&ctx.http, response).await?;
            continue;
        }

        // The first follow-up after a defer inherits the defer's visibility,
        // so a private answer has to replace the public "thinking" message.
        if i == 0 && reply.visibility == Visibility::Private {
            interaction.delete_response(&ctx.http).await?;
        }

        interaction
            .create_followup(&ctx.http, followup_message(reply))
            .await?;
    }

    Ok(())
}

fn parse_command(interaction: &CommandInteraction) -> Option<Command> {
    let option = |name: &str| {
        interaction
            .data
            .options
            .iter()
            .find(|opt| opt.name == name)
            .and_then(|opt| opt.value.as_str())
            .map(str::to_string)
    };

    let command = match interaction.data.name.as_str() {
        "list" => Command::List,
        "roulette" => Command::Roulette,
        "help" => Command::Help,
        "add" => Command::Add {
            key: option("key")?,
            value: option("value")?,
        },
        "remove" => Command::Remove {
            key: option("key")?,
        },
        "update" => Command::Update {
            key: option("key")?,
            new_value: option("new_value")?,
        },
        "talk" => Command::Talk {
            prompt: option("prompt")?,
        },
        "translate" => Command::Translate {
            text: option("text")?,
        },
        _ => return None,
    };

    Some(command)
}

fn slash_commands() -> Vec<CreateCommand> {
    let text = |name: &str, description: &str| {
        CreateCommandOption::new(CommandOptionType::String, name, description).required(true)
    };

    vec![
        CreateCommand::new("list").description("List all available dictionary keys"),
        CreateCommand::new("roulette").description("Get a random dictionary entry"),
        CreateCommand::new("help").description("Show all available commands"),
        CreateCommand::new("add")
            .description("[ADMIN] Add a new dictionary entry")
            .add_option(text("key", "The key to add"))
            .add_option(text("value", "The value/text for this key")),
        CreateCommand::new("remove")
            .description("[ADMIN] Remove a dictionary entry")
            .add_option(text("key", "The key to remove")),
        CreateCommand::new("update")
            .description("[ADMIN] Update a dictionary entry")
            .add_option(text("key", "The key to update"))
            .add_option(text("new_value", "The new value/text")),
        CreateCommand::new("talk")
            .description("Talk to the AI assistant")
            .add_option(text("prompt", "Your message or question for the AI")),
        CreateCommand::new("translate")
            .description("Translate text to Jamaican Patois using AI")
            .add_option(text(
                "text",
                "The text you want to translate to Jamaican Patois",
            )),
    ]
}

fn embed(listing: &Listing) -> CreateEmbed {
    let colour = match listing.accent {
        Accent::Blue => Colour::BLUE,
        Accent::Gold => Colour::GOLD,
    };

    listing.fields.iter().fold(
        CreateEmbed::new()
            .title(&listing.title)
            .description(&listing.description)
            .colour(colour),
        |embed, (name, value)| embed.field(name, value, false),
    )
}

fn response_message(reply: &Reply) -> CreateInteractionResponseMessage {
    let message =
        CreateInteractionResponseMessage::new().ephemeral(reply.visibility == Visibility::Private);
    match &reply.body {
        Body::Text(text) => message.content(text),
        Body::Listing(listing) => message.embed(embed(listing)),
    }
}

fn followup_message(reply: &Reply) -> CreateInteractionResponseFollowup {
    let message =
        CreateInteractionResponseFollowup::new().ephemeral(reply.visibility == Visibility::Private);
    match &reply.body {
        Body::Text(text) => message.content(text),
        Body::Listing(listing) => message.embed(embed(listing)),
    }
}
