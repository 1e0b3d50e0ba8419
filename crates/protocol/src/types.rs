use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Service-assigned job identifier (a GUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    /// Accepts both the braced (`{...}`) and the bare hyphenated form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(trimmed).map(Self)
    }
}

/// Lifecycle state of a job, as reported by the transfer service.
///
/// The discriminants match the service's raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued = 0,
    Connecting = 1,
    Transferring = 2,
    Suspended = 3,
    Error = 4,
    TransientError = 5,
    Transferred = 6,
    Acknowledged = 7,
    Cancelled = 8,
}

impl JobState {
    /// Converts a raw service value. Unknown values yield `None`.
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Queued,
            1 => Self::Connecting,
            2 => Self::Transferring,
            3 => Self::Suspended,
            4 => Self::Error,
            5 => Self::TransientError,
            6 => Self::Transferred,
            7 => Self::Acknowledged,
            8 => Self::Cancelled,
            _ => return None,
        })
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// True for the two states in which the service holds an error payload.
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::TransientError)
    }

    /// True once the job has been acknowledged or cancelled; no further
    /// transitions are possible.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Connecting => "connecting",
            Self::Transferring => "transferring",
            Self::Suspended => "suspended",
            Self::Error => "error",
            Self::TransientError => "transient_error",
            Self::Transferred => "transferred",
            Self::Acknowledged => "acknowledged",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Scheduling priority of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Foreground = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl JobPriority {
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Foreground,
            1 => Self::High,
            2 => Self::Normal,
            3 => Self::Low,
            _ => return None,
        })
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Where in the transfer pipeline an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorContext {
    #[default]
    None = 0,
    Unknown = 1,
    GeneralQueueManager = 2,
    QueueManagerNotification = 3,
    LocalFile = 4,
    RemoteFile = 5,
    GeneralTransport = 6,
}

impl ErrorContext {
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::Unknown,
            2 => Self::GeneralQueueManager,
            3 => Self::QueueManagerNotification,
            4 => Self::LocalFile,
            5 => Self::RemoteFile,
            6 => Self::GeneralTransport,
            _ => return None,
        })
    }
}

/// Whose jobs an enumeration covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOwner {
    #[default]
    CurrentUser = 0,
    AllUsers = 1,
}

/// Raw job counters as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    pub files_total: u32,
    pub files_transferred: u32,
}

/// Raw per-file counters as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProgress {
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    pub completed: bool,
}

/// Job timestamps. `transfer_completion` stays `None` until every file
/// has been transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTimes {
    pub creation: DateTime<Utc>,
    pub modification: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_completion: Option<DateTime<Utc>>,
}

/// Error payload attached to a failed service call.
///
/// The default value is the empty payload: the job was not in an error
/// state, or the payload could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub code: i32,
    pub context: ErrorContext,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl JobError {
    pub fn is_empty(&self) -> bool {
        self.code == 0 && self.context == ErrorContext::None && self.description.is_empty()
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no job error");
        }
        write!(
            f,
            "{:?} error {:#010x}: {}",
            self.context, self.code, self.description
        )
    }
}
