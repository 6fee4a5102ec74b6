use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::error::CommandError;

/// Risk classification of a recorded command.
///
/// Serialized as its integer level so stored documents stay compatible
/// with the session recorder that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RiskLevel {
    Ordinary,
    Dangerous,
}

impl RiskLevel {
    pub fn level(self) -> u8 {
        match self {
            Self::Ordinary => 0,
            Self::Dangerous => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::Dangerous => "dangerous",
        }
    }
}

impl From<u8> for RiskLevel {
    /// Unrecognized levels are treated as ordinary.
    fn from(level: u8) -> Self {
        match level {
            5 => Self::Dangerous,
            _ => Self::Ordinary,
        }
    }
}

impl From<RiskLevel> for u8 {
    fn from(risk: RiskLevel) -> Self {
        risk.level()
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single command event recorded from an interactive session.
///
/// `timestamp` (epoch seconds) is the canonical time axis. An empty
/// `org_id` means the command belongs to no organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Login user that ran the command.
    pub user: String,
    /// Target asset the session was opened against.
    pub asset: String,
    /// System account the command executed as.
    pub system_user: String,
    /// The command line as typed.
    pub input: String,
    /// Captured command output.
    pub output: String,
    pub risk_level: RiskLevel,
    /// Session id the command belongs to.
    pub session: String,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Owning organization, empty for unscoped commands.
    #[serde(default)]
    pub org_id: String,
}

/// The stored wire shape: every `CommandRecord` field plus the redundant
/// `date` column the backend uses for calendar range queries.
///
/// `date` is derived from `timestamp` at write time only; reads always
/// trust `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDocument {
    pub user: String,
    pub asset: String,
    pub system_user: String,
    pub input: String,
    pub output: String,
    pub risk_level: RiskLevel,
    pub session: String,
    pub timestamp: i64,
    #[serde(default)]
    pub org_id: String,
    /// RFC 3339 UTC rendering of `timestamp`.
    pub date: String,
}

impl CommandDocument {
    /// Build the wire document, deriving `date` from the record's timestamp.
    pub fn from_record(record: &CommandRecord) -> Result<Self, CommandError> {
        let date = OffsetDateTime::from_unix_timestamp(record.timestamp)
            .map_err(|_| CommandError::InvalidTimestamp(record.timestamp))?
            .format(&Rfc3339)
            .map_err(|_| CommandError::InvalidTimestamp(record.timestamp))?;

        Ok(Self {
            user: record.user.clone(),
            asset: record.asset.clone(),
            system_user: record.system_user.clone(),
            input: record.input.clone(),
            output: record.output.clone(),
            risk_level: record.risk_level,
            session: record.session.clone(),
            timestamp: record.timestamp,
            org_id: record.org_id.clone(),
            date,
        })
    }

    /// Convert a retrieved document back into the domain record.
    pub fn into_record(self) -> CommandRecord {
        CommandRecord {
            user: self.user,
            asset: self.asset,
            system_user: self.system_user,
            input: self.input,
            output: self.output,
            risk_level: self.risk_level,
            session: self.session,
            timestamp: self.timestamp,
            org_id: self.org_id,
        }
    }
}
