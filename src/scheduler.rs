use ahash::AHasher;
use chrono::{DateTime, Utc};
use serenity::async_trait;
use std::{
    collections::HashMap,
    hash::BuildHasherDefault,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tracing::debug;

use crate::event::{EventId, EventRecord};

/// Invoked once an event's wait has elapsed. `scheduled_for` is the start
/// time the wait was computed from.
#[async_trait]
pub trait Announce: Send + Sync {
    async fn announce(&self, id: EventId, scheduled_for: DateTime<Utc>);
}

pub async fn wait_until(datetime: DateTime<Utc>) {
    // A negative remaining duration fails the conversion, in which case there
    // is nothing to wait for
    if let Ok(remaining) = datetime.signed_duration_since(Utc::now()).to_std() {
        sleep(remaining).await;
    }
}

struct Task {
    generation: u64,
    handle: JoinHandle<()>,
}

type Tasks = HashMap<EventId, Task, BuildHasherDefault<AHasher>>;

/// One wait-task per pending event, keyed by event id.
pub struct Scheduler {
    announcer: Arc<dyn Announce>,
    tasks: Arc<Mutex<Tasks>>,
    generation: AtomicU64,
}

impl Scheduler {
    pub fn new(announcer: Arc<dyn Announce>) -> Self {
        Self {
            announcer,
            tasks: Arc::new(Mutex::new(HashMap::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// Starts (or restarts) the wait for a single event. Events that already
    /// fired or were deleted are ignored.
    pub async fn schedule(&self, event: &EventRecord) {
        if !event.is_pending() {
            return;
        }

        let mut tasks = self.tasks.lock().await;
        self.spawn(&mut tasks, event);
    }

    pub async fn cancel(&self, id: EventId) {
        if let Some(task) = self.tasks.lock().await.remove(&id) {
            task.handle.abort();
            debug!("Cancelled wait for event {}", id);
        }
    }

    /// Aborts every wait and starts a fresh one for each upcoming event.
    pub async fn reschedule_all(&self, events: &[EventRecord], now: DateTime<Utc>) -> usize {
        let mut tasks = self.tasks.lock().await;
        for (_, task) in tasks.drain() {
            task.handle.abort();
        }

        events
            .iter()
            .filter(|e| e.is_upcoming(now))
            .for_each(|e| self.spawn(&mut tasks, e));

        tasks.len()
    }

    pub async fn scheduled(&self) -> usize {
        self.tasks.lock().await.len()
    }

    fn spawn(&self, tasks: &mut Tasks, event: &EventRecord) {
        let id = event.id;
        let start_time = event.start_time;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let announcer = Arc::clone(&self.announcer);
        let task_map = Arc::clone(&self.tasks);

        // The lock on `tasks` is held by the caller until the handle is
        // inserted, so the task cannot remove its entry before it exists
        let handle = tokio::spawn(async move {
            wait_until(start_time).await;

            {
                let mut tasks = task_map.lock().await;
                if tasks.get(&id).is_some_and(|t| t.generation == generation) {
                    tasks.remove(&id);
                }
            }

            announcer.announce(id, start_time).await;
        });

        debug!("Scheduled event {} for {}", id, start_time);
        if let Some(stale) = tasks.insert(id, Task { generation, handle }) {
            stale.handle.abort();
        }
    }
}
