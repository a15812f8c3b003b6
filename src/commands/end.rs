use super::*;
use serenity::all::{GuildId, Http, UserId};
use tracing::{info, warn};

const MEMBER_PAGE: u64 = 1000;

const CLOSED_NOTICE: &str = "This channel is temporarily closed until an event is being held. \
It will reopen once the event starts.\n\
If you have any questions about upcoming events, feel free to ping the host, DM them, or ask in the events channel.\n";
const KEEP_WATCHING: &str = "Keep an eye out for future events! 👀";

pub struct End;

pub fn summary_embed(upcoming: &[EventRecord]) -> CreateEmbed {
    let mut description = CLOSED_NOTICE.to_string();
    if upcoming.is_empty() {
        description.push_str("🚫 **There are currently no upcoming events scheduled.**");
    } else {
        description.push_str("🗓️ **Current Upcoming Events:**");
    }

    CreateEmbed::new()
        .title("🎉 Event Information")
        .description(description)
        .colour(Colour::ORANGE)
        .fields(upcoming.iter().map(|e| upcoming_field(e, Some(KEEP_WATCHING))))
}

/// Removes `role_id` from every member holding it. Failures are logged and
/// the remaining members are still processed.
async fn strip_role(http: &Http, guild_id: GuildId, role_id: RoleId) -> usize {
    let mut removed = 0;
    let mut after: Option<UserId> = None;

    loop {
        let members = match guild_id.members(http, Some(MEMBER_PAGE), after).await {
            Ok(members) => members,
            Err(e) => {
                error!("Failed to list members of {}: {}", guild_id, e);
                break;
            }
        };

        for member in members.iter().filter(|m| m.roles.contains(&role_id)) {
            match http
                .remove_member_role(guild_id, member.user.id, role_id, Some("Event ended"))
                .await
            {
                Ok(()) => {
                    removed += 1;
                    info!("Removed participant role from {}", member.display_name());
                }
                Err(e) => warn!(
                    "Failed to remove participant role from {}: {}",
                    member.display_name(),
                    e
                ),
            }
        }

        if (members.len() as u64) < MEMBER_PAGE {
            break;
        }
        after = members.last().map(|m| m.user.id);
    }

    removed
}

#[async_trait]
impl Command for End {
    fn name(&self) -> &'static str {
        "end"
    }

    fn create(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Sends the event info and clears the Participant role")
    }

    async fn handle(
        &self,
        ctx: &Context,
        manager: &Manager,
        config: &Config,
        command: &CommandInteraction,
    ) -> Result<(), CommandError> {
        respond(
            ctx,
            command,
            ephemeral("Ending event and removing Participant role."),
        )
        .await;

        let removed = strip_role(&ctx.http, config.guild_id, config.participant_role_id).await;
        info!("Event ended, participant role removed from {} members", removed);

        let upcoming = manager.upcoming(Utc::now()).await;
        if let Err(e) = command
            .channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(summary_embed(&upcoming)))
            .await
        {
            error!("Failed to post event summary in {}: {}", command.channel_id, e);
        }

        Ok(())
    }
}
