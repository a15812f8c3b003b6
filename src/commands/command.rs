use super::*;

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(&self) -> CreateCommand;

    /// Whether only members holding a staff role may invoke the command.
    fn staff_only(&self) -> bool {
        true
    }

    /// Responds to the interaction itself on success. An error is sent back
    /// to the invoking member as an ephemeral reply.
    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError>;
}
