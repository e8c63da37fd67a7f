// ── Activity record types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{ActivityId, SpotId};

/// What kind of lifecycle event a record describes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActivityKind {
    Entry,
    Exit,
    Payment,
    System,
}

/// One append-only entry in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub spot_number: Option<u32>,
}

/// An activity waiting for its id. The log assigns ids on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub spot: Option<SpotId>,
}

impl NewActivity {
    pub fn new(
        kind: ActivityKind,
        title: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
            timestamp,
            spot: None,
        }
    }

    pub fn at_spot(mut self, spot: SpotId) -> Self {
        self.spot = Some(spot);
        self
    }

    pub(crate) fn into_record(self, id: ActivityId) -> ActivityRecord {
        ActivityRecord {
            id,
            kind: self.kind,
            title: self.title,
            description: self.description,
            timestamp: self.timestamp,
            spot_number: self.spot.map(SpotId::get),
        }
    }
}
