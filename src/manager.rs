use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::{
    error::CommandError,
    event::{parse_delay, start_time_after, Creator, EventId, EventRecord},
    repository::Repository,
    scheduler::Scheduler,
};

/// Fields of a new event as entered by staff.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub name: String,
    pub info: String,
    pub delay: String,
    pub rewards: [Option<String>; 3],
    pub participation_reward: Option<String>,
    pub channel_id: Option<u64>,
}

/// Replacement values submitted through the edit form. A missing delay keeps
/// the current start time.
#[derive(Debug, Clone, Default)]
pub struct EventEdit {
    pub name: String,
    pub info: String,
    pub delay: Option<String>,
    pub rewards: [Option<String>; 3],
    pub participation_reward: Option<String>,
}

pub struct Manager {
    repository: Arc<Repository>,
    scheduler: Scheduler,
}

impl Manager {
    pub fn new(repository: Arc<Repository>, scheduler: Scheduler) -> Self {
        Self {
            repository,
            scheduler,
        }
    }

    /// Schedules every upcoming event from a fresh copy of the store.
    pub async fn start_events(&self) -> usize {
        let events = self.repository.refresh().await;
        self.scheduler.reschedule_all(&events, Utc::now()).await
    }

    pub async fn create_event(
        &self,
        creator: Creator,
        new: NewEvent,
    ) -> Result<(EventRecord, u64), CommandError> {
        let delay = parse_delay(&new.delay)?;
        let [reward1, reward2, reward3] = new.rewards;

        let event = EventRecord {
            id: EventId::new(),
            name: new.name,
            info: new.info,
            reward1,
            reward2,
            reward3,
            participation_reward: new.participation_reward,
            start_time: start_time_after(Utc::now(), delay)?,
            started: false,
            deleted: false,
            creator,
            channel_id: new.channel_id,
        };

        self.repository.append(event.clone()).await;
        self.scheduler.schedule(&event).await;
        info!(
            "Event {} created by {} for {}",
            event.name, event.creator.display_name, event.start_time
        );

        Ok((event, delay))
    }

    pub async fn upcoming(&self, now: DateTime<Utc>) -> Vec<EventRecord> {
        self.repository.upcoming(now).await
    }

    /// Upcoming events the given member may edit.
    pub async fn editable_by(&self, creator_id: u64, now: DateTime<Utc>) -> Vec<EventRecord> {
        self.upcoming(now)
            .await
            .into_iter()
            .filter(|e| e.creator.id == creator_id)
            .collect()
    }

    pub async fn find(&self, id: EventId) -> Option<EventRecord> {
        self.repository.get(id).await
    }

    pub async fn edit_event(
        &self,
        id: EventId,
        editor_id: u64,
        edit: EventEdit,
    ) -> Result<EventRecord, CommandError> {
        let now = Utc::now();
        let start_time = edit
            .delay
            .as_deref()
            .map(|d| parse_delay(d).and_then(|secs| start_time_after(now, secs)))
            .transpose()?;

        let event = self
            .repository
            .update(id, |event| {
                if !event.is_upcoming(now) {
                    return Err(CommandError::NotEditable);
                }
                if event.creator.id != editor_id {
                    return Err(CommandError::NotCreator);
                }

                let [reward1, reward2, reward3] = edit.rewards;
                event.name = edit.name;
                event.info = edit.info;
                event.reward1 = reward1;
                event.reward2 = reward2;
                event.reward3 = reward3;
                event.participation_reward = edit.participation_reward;
                if let Some(start_time) = start_time {
                    event.start_time = start_time;
                }

                Ok(())
            })
            .await?;

        let events = self.repository.snapshot().await;
        self.scheduler.reschedule_all(&events, Utc::now()).await;
        info!("Event {} edited, starts {}", event.name, event.start_time);

        Ok(event)
    }

    /// Soft-deletes an upcoming event once `confirmation` matches its name.
    pub async fn delete_event(
        &self,
        id: EventId,
        confirmation: &str,
    ) -> Result<EventRecord, CommandError> {
        let event = self.find(id).await.ok_or(CommandError::NotFound)?;
        if !confirmation.trim().eq_ignore_ascii_case(event.name.trim()) {
            return Err(CommandError::ConfirmationMismatch);
        }

        let event = self.repository.soft_delete(id, Utc::now()).await?;
        self.scheduler.cancel(id).await;
        info!("Event {} deleted", event.name);

        Ok(event)
    }
}
