mod de;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// Deleted events are backdated to this instant so that every "upcoming"
/// projection drops them, even in readers that ignore the `deleted` flag.
pub fn deleted_sentinel() -> DateTime<Utc> {
    // 2000-01-01T00:00:00Z
    DateTime::from_timestamp(946_684_800, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Id for a record stored before ids existed, derived from the fields
    /// that used to identify it so every read yields the same value.
    pub fn legacy(name: &str, creator_id: u64, start_time: DateTime<Utc>) -> Self {
        let key = format!("{}\n{}\n{}", name, creator_id, start_time.to_rfc3339());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }

    /// Placeholder for records stored before ids existed.
    pub fn unassigned() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: u64,
    #[serde(alias = "name")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default = "EventId::unassigned")]
    pub id: EventId,
    pub name: String,
    pub info: String,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub reward1: Option<String>,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub reward2: Option<String>,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub reward3: Option<String>,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub participation_reward: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub deleted: bool,
    pub creator: Creator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
}

impl EventRecord {
    /// An event is upcoming while it is scheduled in the future and has
    /// neither fired nor been deleted.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now && !self.started && !self.deleted
    }

    pub fn is_pending(&self) -> bool {
        !self.started && !self.deleted
    }

    pub fn soft_delete(&mut self) {
        self.start_time = deleted_sentinel();
        self.deleted = true;
    }

    pub fn rewards(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("🎁 1st Place Reward", &self.reward1),
            ("🎁 2nd Place Reward", &self.reward2),
            ("🎁 3rd Place Reward", &self.reward3),
            ("🎖️ Participation Reward", &self.participation_reward),
        ]
        .into_iter()
        .filter_map(|(label, reward)| reward.as_deref().map(|r| (label, r)))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelayError {
    #[error("Invalid time format. Use number + s/m/h/d, e.g. 30s, 5m, 48h, 2d.")]
    InvalidFormat,
}

/// Parses `<integer><s|m|h|d>` into a number of seconds.
pub fn parse_delay(delay: &str) -> Result<u64, DelayError> {
    let delay = delay.to_ascii_lowercase();
    let unit = delay.chars().last().ok_or(DelayError::InvalidFormat)?;
    let value = &delay[..delay.len() - unit.len_utf8()];

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DelayError::InvalidFormat);
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => return Err(DelayError::InvalidFormat),
    };

    value
        .parse::<u64>()
        .ok()
        .and_then(|v| v.checked_mul(multiplier))
        .ok_or(DelayError::InvalidFormat)
}

/// The instant `delay` seconds after `now`, if representable.
pub fn start_time_after(now: DateTime<Utc>, delay: u64) -> Result<DateTime<Utc>, DelayError> {
    i64::try_from(delay)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(DelayError::InvalidFormat)
}

/// Splits a multi-line rewards input into the three ranked reward slots.
pub fn split_rewards(input: &str) -> [Option<String>; 3] {
    let mut rewards = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    [rewards.next(), rewards.next(), rewards.next()]
}
