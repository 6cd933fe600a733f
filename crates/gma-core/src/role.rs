//! Staff / director role table.

use crate::error::GmaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys that differ per role in GMA paths and response bodies.
#[derive(Debug, PartialEq, Eq)]
pub struct RoleKeys {
    /// Path segment and assignments response key (`staff`, `director`).
    pub segment: &'static str,
    /// Response key holding the report list in report searches.
    pub reports_key: &'static str,
    /// Field naming the report id inside each listed report.
    pub id_key: &'static str,
}

const STAFF_KEYS: RoleKeys = RoleKeys {
    segment: "staff",
    reports_key: "staffReports",
    id_key: "staffReportId",
};

const DIRECTOR_KEYS: RoleKeys = RoleKeys {
    segment: "director",
    reports_key: "directorReports",
    id_key: "directorReportId",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Staff,
    Director,
}

impl Role {
    pub fn keys(self) -> &'static RoleKeys {
        match self {
            Role::Staff => &STAFF_KEYS,
            Role::Director => &DIRECTOR_KEYS,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.keys().segment
    }

    /// `?q=gmaservices/gma_{role}Report{suffix}`
    pub fn report_path(self, suffix: &str) -> String {
        format!("?q=gmaservices/gma_{}Report{}", self.as_str(), suffix)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staff" => Ok(Role::Staff),
            "director" => Ok(Role::Director),
            other => Err(GmaError::invalid_params(format!(
                "unknown role '{other}', expected staff or director"
            ))),
        }
    }
}
