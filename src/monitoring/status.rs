//! The ranked service status shared by the scheduler and the aggregator.
//!
//! Severity ordering is defined once, by [`Status::rank`]. `Ord` is derived
//! from it so that a *greater* status is a *more severe* one, which makes
//! every "worst of" reduction a plain `max`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "service_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "major_outage")]
    MajorOutage,
    #[sea_orm(string_value = "partial_outage")]
    PartialOutage,
    #[sea_orm(string_value = "degraded")]
    Degraded,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "operational")]
    Operational,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

impl Status {
    /// All statuses, most severe first.
    pub const RANKED: [Status; 6] = [
        Status::MajorOutage,
        Status::PartialOutage,
        Status::Degraded,
        Status::Maintenance,
        Status::Operational,
        Status::Unknown,
    ];

    /// Position in the severity table. Lower is more severe.
    pub const fn rank(self) -> u8 {
        match self {
            Status::MajorOutage => 0,
            Status::PartialOutage => 1,
            Status::Degraded => 2,
            Status::Maintenance => 3,
            Status::Operational => 4,
            Status::Unknown => 5,
        }
    }

    /// The more severe of `self` and `other`.
    pub fn worse(self, other: Status) -> Status {
        self.max(other)
    }

    /// The most severe status in `statuses`, or `None` when empty.
    pub fn worst_of<I>(statuses: I) -> Option<Status>
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max()
    }

    /// Canonical platform-wide message for this status.
    pub const fn overall_message(self) -> &'static str {
        match self {
            Status::MajorOutage => "Major service outage impacting multiple systems.",
            Status::PartialOutage => "Partial outage affecting some systems.",
            Status::Degraded => "Some systems are experiencing degraded performance.",
            Status::Maintenance => "Scheduled maintenance is in progress.",
            Status::Operational => "All systems operational.",
            Status::Unknown => "System status is currently unknown.",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::MajorOutage => "major_outage",
            Status::PartialOutage => "partial_outage",
            Status::Degraded => "degraded",
            Status::Maintenance => "maintenance",
            Status::Operational => "operational",
            Status::Unknown => "unknown",
        }
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown service status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::RANKED
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_table_is_sorted_by_rank() {
        for (index, status) in Status::RANKED.iter().enumerate() {
            assert_eq!(status.rank() as usize, index);
        }
    }

    #[test]
    fn more_severe_compares_greater() {
        assert!(Status::MajorOutage > Status::PartialOutage);
        assert!(Status::Degraded > Status::Maintenance);
        assert!(Status::Operational > Status::Unknown);
        assert_eq!(Status::Degraded.worse(Status::Maintenance), Status::Degraded);
        assert_eq!(Status::Unknown.worse(Status::Operational), Status::Operational);
    }

    #[test]
    fn worst_of_picks_most_severe() {
        let statuses = [Status::Operational, Status::Degraded, Status::Maintenance];
        assert_eq!(Status::worst_of(statuses), Some(Status::Degraded));
        assert_eq!(Status::worst_of(Vec::new()), None);
    }

    #[test]
    fn string_forms_round_trip() {
        for status in Status::RANKED {
            assert_eq!(status.to_string().parse::<Status>().unwrap(), status);
        }
        assert!("sideways".parse::<Status>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&Status::PartialOutage).unwrap();
        assert_eq!(json, "\"partial_outage\"");
    }
}
