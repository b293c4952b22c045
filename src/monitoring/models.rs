use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

use super::status::Status;
use crate::db::enums::{IncidentImpact, IncidentStatus, IncidentType};

pub type ServiceId = Uuid;

/// A sub-part of a service with its own operator-set status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
}

/// Supported probe cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PingInterval {
    TwoMinutes,
    #[default]
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
}

impl PingInterval {
    pub const fn minutes(self) -> u32 {
        match self {
            PingInterval::TwoMinutes => 2,
            PingInterval::FiveMinutes => 5,
            PingInterval::TenMinutes => 10,
            PingInterval::FifteenMinutes => 15,
        }
    }

    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.minutes() as u64 * 60)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported ping interval: {0} minutes (expected 2, 5, 10 or 15)")]
pub struct InvalidPingInterval(pub u32);

impl TryFrom<u32> for PingInterval {
    type Error = InvalidPingInterval;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            2 => Ok(PingInterval::TwoMinutes),
            5 => Ok(PingInterval::FiveMinutes),
            10 => Ok(PingInterval::TenMinutes),
            15 => Ok(PingInterval::FifteenMinutes),
            other => Err(InvalidPingInterval(other)),
        }
    }
}

impl From<PingInterval> for u32 {
    fn from(interval: PingInterval) -> Self {
        interval.minutes()
    }
}

/// Active health check settings of a service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "intervalMinutes")]
    pub interval: PingInterval,
    #[serde(default)]
    pub alerts_muted: bool,
}

impl PingConfig {
    /// The probe target, when one is configured.
    pub fn target(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// Whether the scheduler should run a recurring check for this config.
    pub fn is_eligible(&self) -> bool {
        self.enabled && self.target().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Online,
    Slow,
    Offline,
    Timeout,
    Error,
    Unknown,
}

/// How the scheduler counts a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
    Indeterminate,
}

impl ProbeStatus {
    pub const fn outcome(self) -> ProbeOutcome {
        match self {
            ProbeStatus::Online | ProbeStatus::Slow => ProbeOutcome::Success,
            ProbeStatus::Offline | ProbeStatus::Timeout | ProbeStatus::Error => {
                ProbeOutcome::Failure
            }
            ProbeStatus::Unknown => ProbeOutcome::Indeterminate,
        }
    }
}

/// Result of a single probe. Replaced wholesale on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ProbeResult {
    pub fn new(status: ProbeStatus) -> Self {
        Self {
            status,
            status_code: None,
            response_time_ms: None,
            error: None,
            checked_at: Utc::now(),
        }
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(elapsed.as_millis() as u64);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredService {
    pub id: ServiceId,
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub last_probe_result: Option<ProbeResult>,
}

fn default_true() -> bool {
    true
}

impl MonitoredService {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status,
            components: Vec::new(),
            group_id: None,
            is_public: true,
            ping: PingConfig::default(),
            last_probe_result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    #[serde(default)]
    pub impact: IncidentImpact,
    pub status: IncidentStatus,
    #[serde(default)]
    pub affected_service_ids: HashSet<ServiceId>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

impl Incident {
    /// Whether this incident should currently shape the public status page.
    pub fn is_active_and_visible(&self) -> bool {
        self.is_public && self.status.is_active()
    }

    pub fn affects(&self, service_id: ServiceId) -> bool {
        self.affected_service_ids.contains(&service_id)
    }

    pub fn implied_status(&self) -> Option<Status> {
        self.incident_type.implied_status(self.impact)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}
