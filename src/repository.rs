use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    error::CommandError,
    event::{EventId, EventRecord},
    store::{EventStore, StoreError},
};

/// In-process copy of the event collection. Every mutation re-reads the
/// store, applies the change to the whole list and commits the whole list.
pub struct Repository {
    store: Arc<dyn EventStore>,
    events: RwLock<Vec<EventRecord>>,
}

impl Repository {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            events: RwLock::new(Vec::new()),
        }
    }

    /// Fetches the stored collection. Records without an id get one derived
    /// from their contents, and writing the ids back is best-effort.
    async fn fetch(&self) -> Result<Vec<EventRecord>, StoreError> {
        let mut events = self.store.fetch().await?;

        let mut assigned = 0;
        for event in events.iter_mut().filter(|e| e.id.is_unassigned()) {
            event.id = EventId::legacy(&event.name, event.creator.id, event.start_time);
            assigned += 1;
        }
        if assigned > 0 {
            match self.store.commit(&events).await {
                Ok(()) => info!("Assigned ids to {} stored events", assigned),
                Err(e) => warn!("Failed to persist ids of {} stored events: {}", assigned, e),
            }
        }

        Ok(events)
    }

    /// Replaces the cache with the stored collection, falling back to an
    /// empty one if the store cannot be read.
    pub async fn load(&self) -> usize {
        let events = self.fetch().await.unwrap_or_else(|e| {
            error!("Failed to load events: {}", e);
            Vec::new()
        });
        let count = events.len();
        *self.events.write().await = events;

        count
    }

    pub async fn snapshot(&self) -> Vec<EventRecord> {
        self.events.read().await.clone()
    }

    /// Re-reads the store. On failure the cached copy is returned unchanged.
    pub async fn refresh(&self) -> Vec<EventRecord> {
        let mut events = self.events.write().await;
        match self.fetch().await {
            Ok(fresh) => *events = fresh,
            Err(e) => warn!("Using cached events, refresh failed: {}", e),
        }

        events.clone()
    }

    pub async fn get(&self, id: EventId) -> Option<EventRecord> {
        self.refresh().await.into_iter().find(|e| e.id == id)
    }

    /// Upcoming events in storage order.
    pub async fn upcoming(&self, now: DateTime<Utc>) -> Vec<EventRecord> {
        self.refresh()
            .await
            .into_iter()
            .filter(|e| e.is_upcoming(now))
            .collect()
    }

    pub async fn append(&self, event: EventRecord) {
        self.mutate(|events| {
            events.push(event);
            Ok::<_, CommandError>(())
        })
        .await
        .ok();
    }

    /// Applies `f` to the record with the given id and persists the result.
    /// Nothing is committed when `f` fails.
    pub async fn update<F>(&self, id: EventId, f: F) -> Result<EventRecord, CommandError>
    where
        F: FnOnce(&mut EventRecord) -> Result<(), CommandError>,
    {
        self.mutate(|events| {
            let event = events
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(CommandError::NotFound)?;
            f(event)?;

            Ok(event.clone())
        })
        .await
    }

    /// Flags a pending event as fired. Returns false if it was not pending.
    pub async fn mark_started(&self, id: EventId) -> bool {
        self.update(id, |event| {
            if !event.is_pending() {
                return Err(CommandError::NotEditable);
            }
            event.started = true;
            Ok(())
        })
        .await
        .is_ok()
    }

    pub async fn soft_delete(
        &self,
        id: EventId,
        now: DateTime<Utc>,
    ) -> Result<EventRecord, CommandError> {
        self.update(id, |event| {
            if !event.is_upcoming(now) {
                return Err(CommandError::NotEditable);
            }
            event.soft_delete();
            Ok(())
        })
        .await
    }

    async fn mutate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<EventRecord>) -> Result<T, E>,
    {
        let mut events = self.events.write().await;
        match self.fetch().await {
            Ok(fresh) => *events = fresh,
            Err(e) => warn!("Using cached events, refresh failed: {}", e),
        }

        let result = f(&mut events)?;

        if let Err(e) = self.store.commit(&events).await {
            error!("Failed to persist events: {}", e);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::Creator, store::memory::MemoryStore};
    use chrono::Duration;
    use serde_json::json;
    use serenity::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn fetch(&self) -> Result<Vec<EventRecord>, StoreError> {
            Err(StoreError::MissingToken)
        }

        async fn commit(&self, _events: &[EventRecord]) -> Result<(), StoreError> {
            Err(StoreError::MissingToken)
        }
    }

    fn event(name: &str, start_time: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: EventId::new(),
            name: name.to_string(),
            info: "info".to_string(),
            reward1: None,
            reward2: None,
            reward3: None,
            participation_reward: None,
            start_time,
            started: false,
            deleted: false,
            creator: Creator {
                id: 1,
                display_name: "host".to_string(),
            },
            channel_id: None,
        }
    }

    #[tokio::test]
    async fn append_commits_whole_collection() {
        let now = Utc::now();
        let existing = event("first", now + Duration::hours(1));
        let store = Arc::new(MemoryStore::with_events(&[existing.clone()]));
        let repo = Repository::new(store.clone());

        repo.append(event("second", now + Duration::hours(2))).await;

        let stored = store.fetch().await.unwrap();
        assert_eq!(store.commits(), 1);
        assert_eq!(
            stored.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            ["first", "second"]
        );
        assert_eq!(stored[0].id, existing.id);
    }

    #[tokio::test]
    async fn committed_timestamps_read_back_equal() {
        let store = Arc::new(MemoryStore::default());
        let repo = Repository::new(store.clone());
        let original = event("quiz", Utc::now() + Duration::minutes(30));

        repo.append(original.clone()).await;
        let fetched = Repository::new(store).refresh().await;

        assert_eq!(fetched[0].start_time.timestamp(), original.start_time.timestamp());
    }

    #[tokio::test]
    async fn soft_delete_keeps_collection_length() {
        let now = Utc::now();
        let target = event("doomed", now + Duration::hours(1));
        let store = Arc::new(MemoryStore::with_events(&[
            target.clone(),
            event("kept", now + Duration::hours(2)),
        ]));
        let repo = Repository::new(store.clone());

        repo.soft_delete(target.id, now).await.unwrap();

        let stored = store.fetch().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].deleted);
        let upcoming = repo.upcoming(now).await;
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].name, "kept");
    }

    #[tokio::test]
    async fn soft_delete_refuses_started_events() {
        let now = Utc::now();
        let mut fired = event("fired", now + Duration::hours(1));
        fired.started = true;
        let store = Arc::new(MemoryStore::with_events(&[fired.clone()]));
        let repo = Repository::new(store.clone());

        assert_eq!(
            repo.soft_delete(fired.id, now).await,
            Err(CommandError::NotEditable)
        );
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let repo = Repository::new(Arc::new(MemoryStore::default()));
        let result = repo.update(EventId::new(), |_| Ok(())).await;
        assert_eq!(result, Err(CommandError::NotFound));
    }

    #[tokio::test]
    async fn mark_started_only_once() {
        let now = Utc::now();
        let pending = event("pending", now);
        let repo = Repository::new(Arc::new(MemoryStore::with_events(&[pending.clone()])));

        assert!(repo.mark_started(pending.id).await);
        assert!(!repo.mark_started(pending.id).await);
    }

    #[tokio::test]
    async fn upcoming_keeps_storage_order() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_events(&[
            event("later", now + Duration::days(2)),
            event("past", now - Duration::days(1)),
            event("sooner", now + Duration::hours(1)),
        ]));
        let repo = Repository::new(store);

        let names: Vec<_> = repo
            .upcoming(now)
            .await
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["later", "sooner"]);
    }

    fn legacy_document() -> String {
        json!([{
            "name": "Quiz",
            "info": "Trivia",
            "reward1": "",
            "start_time": "2030-01-01T00:00:00+00:00",
            "started": false,
            "creator": { "id": 1, "name": "host" }
        }])
        .to_string()
    }

    /// Serves a fixed document and rejects every write.
    struct ReadOnlyStore(String);

    #[async_trait]
    impl EventStore for ReadOnlyStore {
        async fn fetch(&self) -> Result<Vec<EventRecord>, StoreError> {
            Ok(serde_json::from_str(&self.0)?)
        }

        async fn commit(&self, _events: &[EventRecord]) -> Result<(), StoreError> {
            Err(StoreError::MissingToken)
        }
    }

    #[tokio::test]
    async fn legacy_records_load_from_read_only_store() {
        let repo = Repository::new(Arc::new(ReadOnlyStore(legacy_document())));
        let now = Utc::now();

        assert_eq!(repo.load().await, 1);
        let upcoming = repo.upcoming(now).await;
        assert_eq!(upcoming.len(), 1);

        // Nothing was written back, yet every read agrees on the id
        let id = upcoming[0].id;
        assert_eq!(repo.refresh().await[0].id, id);
        assert_eq!(repo.get(id).await.map(|e| e.name), Some("Quiz".to_string()));
    }

    #[tokio::test]
    async fn legacy_records_get_stable_ids() {
        let store = Arc::new(MemoryStore::with_document(legacy_document()));
        let repo = Repository::new(store.clone());

        assert_eq!(repo.load().await, 1);
        let id = repo.snapshot().await[0].id;

        assert!(!id.is_unassigned());
        assert_eq!(store.commits(), 1);
        assert_eq!(repo.get(id).await.map(|e| e.name), Some("Quiz".to_string()));
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn unreadable_store_degrades() {
        let repo = Repository::new(Arc::new(BrokenStore));
        assert_eq!(repo.load().await, 0);

        let now = Utc::now();
        repo.append(event("offline", now + Duration::hours(1))).await;

        // Kept in memory even though nothing could be persisted
        assert_eq!(repo.upcoming(now).await.len(), 1);
        assert_eq!(repo.snapshot().await.len(), 1);
    }
}
