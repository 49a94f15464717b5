use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome stored for one application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Failed,
    Skipped,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(ApplicationStatus::Applied),
            "failed" => Ok(ApplicationStatus::Failed),
            "skipped" => Ok(ApplicationStatus::Skipped),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

/// One row of the `applications` ledger table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub platform: String,
    pub job_title: String,
    pub company: String,
    pub date_applied: DateTime<Utc>,
    pub status: String,
    pub job_url: String,
    pub notes: Option<String>,
}

impl ApplicationRow {
    #[cfg(test)]
    pub fn status(&self) -> Option<ApplicationStatus> {
        self.status.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ApplicationStatus::Applied,
            ApplicationStatus::Failed,
            ApplicationStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&ApplicationStatus::Applied).unwrap();
        assert_eq!(json, r#""applied""#);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("success".parse::<ApplicationStatus>().is_err());
    }
}
