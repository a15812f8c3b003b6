use super::*;

pub struct DeleteEvent;

#[async_trait]
impl Command for DeleteEvent {
    fn name(&self) -> &'static str {
        "deleteevent"
    }

    fn create(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Delete an upcoming event")
    }

    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        _config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        let events = manager.upcoming(Utc::now()).await;

        let message = if events.is_empty() {
            ephemeral("There are no upcoming events to delete.")
        } else {
            event_menu::picker(MenuKind::Delete, &events)
        };
        respond(ctx, command, message).await;

        Ok(())
    }
}
