use super::*;

pub struct EditEvent;

#[async_trait]
impl Command for EditEvent {
    fn name(&self) -> &'static str {
        "editevent"
    }

    fn create(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Edit one of your upcoming events")
    }

    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        _config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        let events = manager.editable_by(command.user.id.get(), Utc::now()).await;

        let message = if events.is_empty() {
            ephemeral("You have no upcoming events to edit.")
        } else {
            event_menu::picker(MenuKind::Edit, &events)
        };
        respond(ctx, command, message).await;

        Ok(())
    }
}
