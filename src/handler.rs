use crate::{
    announcer::{Announcer, DiscordPublisher},
    commands::{self, authorize, ephemeral, member_roles, respond, Command},
    config::Config,
    error::CommandError,
    event_menu::{self, MenuKind},
    manager::Manager,
    reaction,
    repository::Repository,
    scheduler::Scheduler,
};
use serenity::{
    all::{
        CommandInteraction, ComponentInteraction, Context, CreateInteractionResponse,
        EventHandler, Interaction, ModalInteraction, Reaction, Ready, RoleId,
    },
    async_trait,
};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

pub struct Handler {
    config: Arc<Config>,
    repository: Arc<Repository>,
    // Built on the first ready, once the gateway's http and cache exist
    manager: OnceLock<Arc<Manager>>,
    commands: Vec<Box<dyn Command>>,
}

impl Handler {
    pub fn new(config: Arc<Config>, repository: Arc<Repository>) -> Self {
        Self {
            config,
            repository,
            manager: OnceLock::new(),
            commands: commands::all(),
        }
    }

    fn manager(&self) -> Result<&Manager, CommandError> {
        self.manager.get().map(Arc::as_ref).ok_or_else(|| {
            warn!("Interaction received before the bot was ready");
            CommandError::NotReady
        })
    }

    async fn run_command(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(handler) = self.commands.iter().find(|c| c.name() == command.data.name) else {
            warn!("Unknown command {}", command.data.name);
            return;
        };
        if let Err(e) = self.dispatch(handler.as_ref(), ctx, command).await {
            info!(
                "Command {} from {} rejected: {}",
                command.data.name, command.user.name, e
            );
            respond(ctx, command, ephemeral(e.to_string())).await;
        }
    }

    async fn dispatch(
        &self,
        handler: &dyn Command,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        let manager = self.manager()?;
        let roles = member_roles(command.member.as_deref());
        authorize(handler, roles, &self.config.staff_role_ids)?;

        handler.handle(ctx, manager, &self.config, command).await
    }

    async fn run_component(&self, ctx: &Context, component: &ComponentInteraction) {
        if MenuKind::from_menu_id(&component.data.custom_id).is_none() {
            return;
        }
        let roles = member_roles(component.member.as_ref());
        match self.gate(roles) {
            Ok(manager) => event_menu::handle_component(ctx, manager, component).await,
            Err(e) => {
                if let Err(why) = component.create_response(&ctx.http, rejection(&e)).await {
                    error!("Cannot respond to component interaction: {}", why);
                }
            }
        }
    }

    async fn run_modal(&self, ctx: &Context, modal: &ModalInteraction) {
        if MenuKind::from_modal_id(&modal.data.custom_id).is_none() {
            return;
        }
        let roles = member_roles(modal.member.as_ref());
        match self.gate(roles) {
            Ok(manager) => event_menu::handle_modal(ctx, manager, modal).await,
            Err(e) => {
                if let Err(why) = modal.create_response(&ctx.http, rejection(&e)).await {
                    error!("Cannot respond to modal submit: {}", why);
                }
            }
        }
    }

    /// Menus and modals are staff-only and need a running manager.
    fn gate(&self, roles: &[RoleId]) -> Result<&Manager, CommandError> {
        let manager = self.manager()?;
        if !commands::is_staff(roles, &self.config.staff_role_ids) {
            return Err(CommandError::NotStaff);
        }
        Ok(manager)
    }
}

fn rejection(error: &CommandError) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(ephemeral(error.to_string()))
}

#[async_trait]
impl EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.run_command(&ctx, &command).await,
            Interaction::Component(component) => self.run_component(&ctx, &component).await,
            Interaction::Modal(modal) => self.run_modal(&ctx, &modal).await,
            _ => (),
        }
    }

    async fn reaction_add(&self, ctx: Context, add_reaction: Reaction) {
        reaction::on_reaction(&ctx, &self.config, &self.repository, &add_reaction, true).await;
    }

    async fn reaction_remove(&self, ctx: Context, removed_reaction: Reaction) {
        reaction::on_reaction(&ctx, &self.config, &self.repository, &removed_reaction, false)
            .await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let manager = self.manager.get_or_init(|| {
            let publisher = DiscordPublisher::new(
                Arc::clone(&ctx.http),
                Arc::clone(&ctx.cache),
                self.config.guild_id,
                self.config.announce_role_id,
            );
            let announcer = Announcer::new(Arc::clone(&self.repository), Arc::new(publisher));
            Arc::new(Manager::new(
                Arc::clone(&self.repository),
                Scheduler::new(Arc::new(announcer)),
            ))
        });

        let definitions = self.commands.iter().map(|c| c.create()).collect();
        match self
            .config
            .guild_id
            .set_commands(&ctx.http, definitions)
            .await
        {
            Ok(registered) => info!(
                "Registered {} commands in guild {}",
                registered.len(),
                self.config.guild_id
            ),
            Err(e) => error!("Failed to register commands: {}", e),
        }

        let scheduled = manager.start_events().await;
        info!("Scheduled {} upcoming events", scheduled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StoreConfig,
        store::{memory::MemoryStore, EventStore},
    };
    use serenity::all::GuildId;

    fn handler() -> Handler {
        let config = Config {
            discord_token: "token".to_string(),
            guild_id: GuildId::new(1),
            staff_role_ids: vec![RoleId::new(2)],
            participant_role_id: RoleId::new(3),
            announce_role_id: RoleId::new(4),
            store: StoreConfig {
                token: None,
                api_url: "http://localhost".to_string(),
                repo: "owner/bot".to_string(),
                path: "events.json".to_string(),
                branch: "main".to_string(),
            },
            port: 0,
        };
        let store: Arc<dyn EventStore> = Arc::new(MemoryStore::default());

        Handler::new(Arc::new(config), Arc::new(Repository::new(store)))
    }

    #[test]
    fn interactions_before_ready_are_answered() {
        let handler = handler();

        assert_eq!(handler.manager().err(), Some(CommandError::NotReady));
        assert_eq!(handler.gate(&[RoleId::new(2)]).err(), Some(CommandError::NotReady));
        assert_eq!(
            CommandError::NotReady.to_string(),
            "The bot is still starting up, please try again in a moment."
        );
    }
}
