use serenity::all::{Context, Message, Reaction, UserId};
use tracing::{error, info, warn};

use crate::{
    announcer::{event_id_from_footer, is_participate_reaction},
    config::Config,
    event::{EventId, EventRecord},
    repository::Repository,
};

/// The event announced by a message, if the bot posted it, reacted to it
/// with ✅ and left the event id in the embed footer.
fn linked_event(
    author_id: UserId,
    bot_id: UserId,
    bot_reacted: bool,
    footer: Option<&str>,
) -> Option<EventId> {
    if author_id != bot_id || !bot_reacted {
        return None;
    }
    footer.and_then(event_id_from_footer)
}

fn announced_event(message: &Message, bot_id: UserId) -> Option<EventId> {
    let bot_reacted = message
        .reactions
        .iter()
        .any(|r| r.me && is_participate_reaction(&r.reaction_type));
    let footer = message
        .embeds
        .first()
        .and_then(|e| e.footer.as_ref())
        .map(|f| f.text.as_str());

    linked_event(message.author.id, bot_id, bot_reacted, footer)
}

fn accepts_participants(event: &EventRecord) -> bool {
    event.started && !event.deleted
}

/// Grants or revokes the participant role for a `✅` reaction on an
/// announcement.
pub async fn on_reaction(
    ctx: &Context,
    config: &Config,
    repository: &Repository,
    reaction: &Reaction,
    added: bool,
) {
    if !is_participate_reaction(&reaction.emoji) || reaction.guild_id != Some(config.guild_id) {
        return;
    }
    let Some(user_id) = reaction.user_id else {
        return;
    };
    let bot_id = ctx.cache.current_user().id;
    if user_id == bot_id {
        return;
    }

    let message = match reaction.message(&ctx.http).await {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to fetch reacted message {}: {}", reaction.message_id, e);
            return;
        }
    };
    let Some(id) = announced_event(&message, bot_id) else {
        return;
    };
    let snapshot = repository.snapshot().await;
    let Some(event) = snapshot.iter().find(|e| e.id == id) else {
        return;
    };
    if !accepts_participants(event) {
        return;
    }

    let member = match config.guild_id.member(&ctx.http, user_id).await {
        Ok(member) => member,
        Err(e) => {
            warn!("Failed to fetch member {}: {}", user_id, e);
            return;
        }
    };
    let role_id = config.participant_role_id;
    let has_role = member.roles.contains(&role_id);

    let result = match (added, has_role) {
        (true, false) => {
            ctx.http
                .add_member_role(
                    config.guild_id,
                    user_id,
                    role_id,
                    Some("Event participation reaction"),
                )
                .await
        }
        (false, true) => {
            ctx.http
                .remove_member_role(
                    config.guild_id,
                    user_id,
                    role_id,
                    Some("Event participation reaction removed"),
                )
                .await
        }
        _ => return,
    };

    match result {
        Ok(()) if added => info!(
            "Gave participant role to {} for {}",
            member.display_name(),
            event.name
        ),
        Ok(()) => info!(
            "Removed participant role from {} for {}",
            member.display_name(),
            event.name
        ),
        Err(e) => error!(
            "Failed to update participant role for {}: {}",
            member.display_name(),
            e
        ),
    }
}
