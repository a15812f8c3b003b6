use chrono::{DateTime, Utc};
use serenity::{
    all::{
        ChannelId, ChannelType, Colour, CreateAllowedMentions, CreateEmbed, CreateEmbedFooter,
        CreateMessage, GuildId, Mentionable, ReactionType, RoleId,
    },
    async_trait,
    cache::Cache,
    http::Http,
};
use std::{num::NonZeroU64, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::{
    error::AppError,
    event::{EventId, EventRecord},
    repository::Repository,
    scheduler::Announce,
};

pub const PARTICIPATE_EMOJI: &str = "✅";

const FOOTER_EVENT_PREFIX: &str = "Event ";
// Discord rejects empty field names
const BLANK: &str = "\u{200b}";
const PARTICIPATE_TEXT: &str =
    "To participate in this event, tick the reaction below and you will be given the Participant role.";

pub fn participate_reaction() -> ReactionType {
    ReactionType::Unicode(PARTICIPATE_EMOJI.to_string())
}

pub fn is_participate_reaction(emoji: &ReactionType) -> bool {
    matches!(emoji, ReactionType::Unicode(e) if e == PARTICIPATE_EMOJI)
}

/// The announcement embed. The footer carries the event id so reactions on
/// the message can be traced back to the event.
pub fn announcement_embed(event: &EventRecord) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(event.name.to_uppercase())
        .description(&event.info)
        .colour(Colour::BLUE);

    event
        .rewards()
        .fold(embed, |embed, (label, reward)| embed.field(label, reward, false))
        .field(BLANK, PARTICIPATE_TEXT, false)
        .footer(CreateEmbedFooter::new(format!(
            "Created by {} • {}{}",
            event.creator.display_name, FOOTER_EVENT_PREFIX, event.id
        )))
}

pub fn event_id_from_footer(footer: &str) -> Option<EventId> {
    footer
        .rsplit_once(FOOTER_EVENT_PREFIX)
        .and_then(|(_, id)| id.trim().parse().ok())
}

/// Delivers an announcement for an event to the guild.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, event: &EventRecord) -> Result<(), AppError>;
}

/// Re-reads the record behind a finished wait. It is only due if it is still
/// pending and its start has not moved past the time the wait was scheduled
/// for; a later start belongs to the wait spawned by the edit.
pub async fn due_event(
    repository: &Repository,
    id: EventId,
    scheduled_for: DateTime<Utc>,
) -> Option<EventRecord> {
    let Some(event) = repository.get(id).await else {
        warn!("Event {} no longer exists, skipping announcement", id);
        return None;
    };
    if !event.is_pending() {
        info!("Event {} already started or deleted, skipping", event.name);
        return None;
    }
    if event.start_time > scheduled_for.max(Utc::now()) {
        debug!(
            "Event {} was moved to {}, skipping stale wait",
            event.name, event.start_time
        );
        return None;
    }

    Some(event)
}

/// Announces events whose wait elapsed and flags them started.
pub struct Announcer {
    repository: Arc<Repository>,
    publisher: Arc<dyn Publish>,
}

impl Announcer {
    pub fn new(repository: Arc<Repository>, publisher: Arc<dyn Publish>) -> Self {
        Self {
            repository,
            publisher,
        }
    }
}

#[async_trait]
impl Announce for Announcer {
    async fn announce(&self, id: EventId, scheduled_for: DateTime<Utc>) {
        let Some(event) = due_event(&self.repository, id, scheduled_for).await else {
            return;
        };

        if let Err(e) = self.publisher.publish(&event).await {
            error!("Failed to announce event {}: {}", event.name, e);
            return;
        }

        if self.repository.mark_started(id).await {
            info!("Event announced: {}", event.name);
        }
    }
}

/// Posts the role ping, the embed and the opt-in reaction.
pub struct DiscordPublisher {
    http: Arc<Http>,
    cache: Arc<Cache>,
    guild_id: GuildId,
    announce_role_id: RoleId,
}

impl DiscordPublisher {
    pub fn new(
        http: Arc<Http>,
        cache: Arc<Cache>,
        guild_id: GuildId,
        announce_role_id: RoleId,
    ) -> Self {
        Self {
            http,
            cache,
            guild_id,
            announce_role_id,
        }
    }

    /// Explicit channel if the event has one, otherwise the first text
    /// channel the bot may post in.
    fn destination(&self, event: &EventRecord) -> Option<ChannelId> {
        if let Some(id) = event.channel_id.and_then(NonZeroU64::new) {
            return Some(ChannelId::from(id));
        }

        let bot_id = self.cache.current_user().id;
        let guild = self.cache.guild(self.guild_id)?;
        let me = guild.members.get(&bot_id)?;

        let mut channels: Vec<_> = guild
            .channels
            .values()
            .filter(|c| c.kind == ChannelType::Text)
            .filter(|c| guild.user_permissions_in(c, me).send_messages())
            .collect();
        channels.sort_by_key(|c| (c.position, c.id));

        channels.first().map(|c| c.id)
    }
}

#[async_trait]
impl Publish for DiscordPublisher {
    async fn publish(&self, event: &EventRecord) -> Result<(), AppError> {
        let channel_id = self
            .destination(event)
            .ok_or_else(|| AppError::NoChannel(event.name.clone()))?;

        let ping = CreateMessage::new()
            .content(self.announce_role_id.mention().to_string())
            .allowed_mentions(CreateAllowedMentions::new().roles(vec![self.announce_role_id]));
        channel_id.send_message(&self.http, ping).await?;

        let message = channel_id
            .send_message(&self.http, CreateMessage::new().embed(announcement_embed(event)))
            .await?;
        message.react(&self.http, participate_reaction()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::Creator,
        store::{memory::MemoryStore, EventStore},
    };
    use chrono::Duration;
    use std::sync::Mutex;

    /// Records published events, optionally failing every delivery.
    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<EventId>>,
        fail: bool,
    }

    impl RecordingPublisher {
        fn published(&self) -> Vec<EventId> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Publish for RecordingPublisher {
        async fn publish(&self, event: &EventRecord) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::NoChannel(event.name.clone()));
            }
            self.published.lock().unwrap().push(event.id);
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        publisher: Arc<RecordingPublisher>,
        announcer: Announcer,
    }

    fn fixture(events: &[EventRecord], fail: bool) -> Fixture {
        let store = Arc::new(MemoryStore::with_events(events));
        let publisher = Arc::new(RecordingPublisher {
            fail,
            ..Default::default()
        });
        let repository = Arc::new(Repository::new(store.clone()));
        let announcer = Announcer::new(repository, publisher.clone());

        Fixture {
            store,
            publisher,
            announcer,
        }
    }

    fn event() -> EventRecord {
        EventRecord {
            id: EventId::new(),
            name: "Hide and seek".to_string(),
            info: "Find the host".to_string(),
            reward1: Some("Nitro".to_string()),
            reward2: None,
            reward3: Some("Role".to_string()),
            participation_reward: Some("Badge".to_string()),
            start_time: Utc::now(),
            started: false,
            deleted: false,
            creator: Creator {
                id: 5,
                display_name: "Host • Name".to_string(),
            },
            channel_id: None,
        }
    }

    #[test]
    fn embed_lists_present_rewards() {
        let event = event();
        let embed = serde_json::to_value(announcement_embed(&event)).unwrap();

        assert_eq!(embed["title"], "HIDE AND SEEK");
        assert_eq!(embed["description"], "Find the host");

        let names: Vec<_> = embed["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "🎁 1st Place Reward",
                "🎁 3rd Place Reward",
                "🎖️ Participation Reward",
                BLANK
            ]
        );
    }

    #[test]
    fn footer_round_trips_event_id() {
        let event = event();
        let embed = serde_json::to_value(announcement_embed(&event)).unwrap();
        let footer = embed["footer"]["text"].as_str().unwrap();

        assert!(footer.starts_with("Created by Host • Name"));
        assert_eq!(event_id_from_footer(footer), Some(event.id));
    }

    #[test]
    fn foreign_footers_have_no_event() {
        assert_eq!(event_id_from_footer("Created by someone"), None);
        assert_eq!(event_id_from_footer("Event not-a-uuid"), None);
    }

    #[test]
    fn only_the_check_mark_counts() {
        assert!(is_participate_reaction(&participate_reaction()));
        assert!(!is_participate_reaction(&ReactionType::Unicode("❌".to_string())));
    }

    #[tokio::test]
    async fn due_event_is_published_and_started() {
        let event = event();
        let f = fixture(&[event.clone()], false);

        f.announcer.announce(event.id, event.start_time).await;

        assert_eq!(f.publisher.published(), [event.id]);
        let stored = f.store.fetch().await.unwrap();
        assert!(stored[0].started);
        assert_eq!(f.store.commits(), 1);

        // A second wait for the same event finds it started
        f.announcer.announce(event.id, event.start_time).await;
        assert_eq!(f.publisher.published(), [event.id]);
    }

    #[tokio::test]
    async fn missing_started_or_deleted_events_are_not_published() {
        let mut started = event();
        started.started = true;
        let mut deleted = event();
        deleted.soft_delete();
        let f = fixture(&[started.clone(), deleted.clone()], false);

        f.announcer.announce(EventId::new(), Utc::now()).await;
        f.announcer.announce(started.id, started.start_time).await;
        f.announcer.announce(deleted.id, Utc::now()).await;

        assert!(f.publisher.published().is_empty());
        assert_eq!(f.store.commits(), 0);
    }

    #[tokio::test]
    async fn stale_wait_leaves_moved_event_alone() {
        let scheduled_for = Utc::now();
        let mut moved = event();
        moved.start_time = scheduled_for + Duration::minutes(5);
        let f = fixture(&[moved.clone()], false);

        f.announcer.announce(moved.id, scheduled_for).await;

        assert!(f.publisher.published().is_empty());
        assert!(!f.store.fetch().await.unwrap()[0].started);
    }

    #[tokio::test]
    async fn early_wakeup_still_fires_scheduled_start() {
        let mut event = event();
        event.start_time = Utc::now() + Duration::milliseconds(500);
        let f = fixture(&[event.clone()], false);

        assert!(due_event(&f.announcer.repository, event.id, event.start_time)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn failed_delivery_keeps_event_pending() {
        let event = event();
        let f = fixture(&[event.clone()], true);

        f.announcer.announce(event.id, event.start_time).await;

        assert!(!f.store.fetch().await.unwrap()[0].started);
        assert_eq!(f.store.commits(), 0);
    }
}
