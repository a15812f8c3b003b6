use super::*;

pub struct Events;

pub fn upcoming_embed(events: &[EventRecord]) -> CreateEmbed {
    CreateEmbed::new()
        .title("🎉 Upcoming Events")
        .description("Here are the scheduled events:")
        .colour(Colour::DARK_GREEN)
        .fields(events.iter().map(|e| upcoming_field(e, None)))
}

#[async_trait]
impl Command for Events {
    fn name(&self) -> &'static str {
        "events"
    }

    fn create(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Shows all upcoming events")
    }

    fn staff_only(&self) -> bool {
        false
    }

    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        _config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        let upcoming = manager.upcoming(Utc::now()).await;

        let message = if upcoming.is_empty() {
            ephemeral("🚫 There are currently no upcoming events.")
        } else {
            CreateInteractionResponseMessage::new().embed(upcoming_embed(&upcoming))
        };
        respond(ctx, command, message).await;

        Ok(())
    }
}
