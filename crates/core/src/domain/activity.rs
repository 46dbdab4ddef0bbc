use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Upcoming,
    Active,
    Ended,
    Undecided,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Undecided => "undecided",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            "undecided" => Ok(Self::Undecided),
            other => anyhow::bail!("unknown activity status: {other}"),
        }
    }
}

/// Point-in-time copy of one promotional activity. Owned by the external
/// activity-management collaborator; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub id: Uuid,
    pub platform: String,
    pub discount: String,
    pub commission: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: ActivityStatus,
    pub room_types: Vec<String>,
}
