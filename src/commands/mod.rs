use crate::{
    config::Config,
    error::CommandError,
    event::{Creator, EventRecord},
    event_menu::{self, MenuKind},
    manager::Manager,
};
use chrono::Utc;
use serenity::{
    all::{
        ChannelType, Colour, CommandInteraction, CommandOptionType, Context, CreateCommand,
        CreateCommandOption, CreateEmbed, CreateInteractionResponse,
        CreateInteractionResponseMessage, CreateMessage, Member, ResolvedOption, ResolvedValue,
        RoleId,
    },
    async_trait,
};
use tracing::error;

mod command;
mod create;
mod delete;
mod edit;
mod end;
mod events;

pub use command::Command;
pub use create::CreateEvent;
pub use delete::DeleteEvent;
pub use edit::EditEvent;
pub use end::End;
pub use events::Events;

pub fn all() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(CreateEvent),
        Box::new(EditEvent),
        Box::new(DeleteEvent),
        Box::new(End),
        Box::new(Events),
    ]
}

pub fn is_staff(roles: &[RoleId], staff_role_ids: &[RoleId]) -> bool {
    roles.iter().any(|r| staff_role_ids.contains(r))
}

pub fn member_roles(member: Option<&Member>) -> &[RoleId] {
    member.map(|m| m.roles.as_slice()).unwrap_or_default()
}

/// Rejects members without a staff role before a staff-only command runs.
pub fn authorize(
    command: &dyn Command,
    roles: &[RoleId],
    staff_role_ids: &[RoleId],
) -> Result<(), CommandError> {
    if command.staff_only() && !is_staff(roles, staff_role_ids) {
        return Err(CommandError::NotStaff);
    }
    Ok(())
}

pub fn ephemeral(content: impl Into<String>) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(true)
}

pub async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    message: CreateInteractionResponseMessage,
) {
    if let Err(why) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await
    {
        error!("Cannot respond to slash command: {}", why);
    }
}

/// A string option, with empty input treated as absent.
fn string_option<'a>(options: &[ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match o.value {
            ResolvedValue::String(s) => Some(s),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
}

fn creator_of(command: &CommandInteraction) -> Creator {
    let display_name = command
        .member
        .as_deref()
        .map(Member::display_name)
        .unwrap_or_else(|| command.user.display_name());

    Creator {
        id: command.user.id.get(),
        display_name: display_name.to_string(),
    }
}

/// Embed field used wherever upcoming events are listed.
pub fn upcoming_field(event: &EventRecord, footer: Option<&str>) -> (String, String, bool) {
    let mut value = format!(
        "Starts <t:{}:F>\nCreated by: <@{}>",
        event.start_time.timestamp(),
        event.creator.id
    );
    if let Some(footer) = footer {
        value.push('\n');
        value.push_str(footer);
    }

    (event.name.clone(), value, false)
}
