use super::*;
use crate::manager::NewEvent;

pub struct CreateEvent;

fn text_option(name: &str, description: &str, required: bool) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(required)
}

#[async_trait]
impl Command for CreateEvent {
    fn name(&self) -> &'static str {
        "createevent"
    }

    fn create(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Create an event")
            .add_option(text_option("name", "Event title", true))
            .add_option(text_option("info", "What the event is about", true))
            .add_option(text_option(
                "delay",
                "When to post it: number + s/m/h/d, e.g. 30s, 5m, 48h, 2d (default 0s)",
                false,
            ))
            .add_option(text_option("reward1", "1st place reward", false))
            .add_option(text_option("reward2", "2nd place reward", false))
            .add_option(text_option("reward3", "3rd place reward", false))
            .add_option(text_option(
                "participation_reward",
                "Reward for everyone taking part",
                false,
            ))
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Where to post the announcement",
                )
                .channel_types(vec![ChannelType::Text])
                .required(false),
            )
    }

    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        _config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        let options = command.data.options();
        let text = |name| string_option(&options, name).map(str::to_string);

        let new = NewEvent {
            // Both are required options
            name: text("name").unwrap_or_default(),
            info: text("info").unwrap_or_default(),
            delay: text("delay").unwrap_or_else(|| "0s".to_string()),
            rewards: [text("reward1"), text("reward2"), text("reward3")],
            participation_reward: text("participation_reward"),
            channel_id: options.iter().find_map(|o| match o.value {
                ResolvedValue::Channel(channel) if o.name == "channel" => Some(channel.id.get()),
                _ => None,
            }),
        };

        let (event, delay) = manager.create_event(creator_of(command), new).await?;

        let content = if delay > 0 {
            format!("⏳ Event '{}' will be posted in {} seconds.", event.name, delay)
        } else {
            format!("✅ Event '{}' has been posted!", event.name)
        };
        respond(ctx, command, ephemeral(content)).await;

        Ok(())
    }
}
