use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::AppFields;

/// Opaque document id assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaunchStatus {
    #[default]
    #[serde(rename = "Coming Soon")]
    ComingSoon,
    #[serde(rename = "Coming in selected date")]
    ComingOnDate,
    #[serde(rename = "Coming in selected weeks")]
    ComingInWeeks,
    #[serde(rename = "Launched")]
    Launched,
}

impl LaunchStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::ComingSoon => "Coming Soon",
            Self::ComingOnDate => "Coming in selected date",
            Self::ComingInWeeks => "Coming in selected weeks",
            Self::Launched => "Launched",
        }
    }
}

impl fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored app entry as delivered by the live query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub launch_status: LaunchStatus,
    #[serde(default)]
    pub launch_date: Option<String>,
    #[serde(default)]
    pub launch_weeks: Option<u32>,
    #[serde(default)]
    pub external_link: Option<String>,
    pub created_at: i64,
}

impl AppRecord {
    pub fn from_fields(id: RecordId, fields: AppFields) -> Self {
        Self {
            id,
            name: fields.name,
            tagline: fields.tagline,
            description: fields.description,
            launch_status: fields.launch_status,
            launch_date: fields.launch_date,
            launch_weeks: fields.launch_weeks,
            external_link: fields.external_link,
            created_at: fields.created_at,
        }
    }

    pub fn fields(&self) -> AppFields {
        AppFields {
            name: self.name.clone(),
            tagline: self.tagline.clone(),
            description: self.description.clone(),
            launch_status: self.launch_status,
            launch_date: self.launch_date.clone(),
            launch_weeks: self.launch_weeks,
            external_link: self.external_link.clone(),
            created_at: self.created_at,
        }
    }

    /// Secondary status line shown under the status label in listings.
    pub fn launch_summary(&self) -> Option<String> {
        match self.launch_status {
            LaunchStatus::ComingOnDate => self
                .launch_date
                .as_deref()
                .map(|date| format!("Target: {date}")),
            LaunchStatus::ComingInWeeks => self
                .launch_weeks
                .map(|weeks| format!("In {weeks} weeks")),
            LaunchStatus::ComingSoon | LaunchStatus::Launched => None,
        }
    }
}

/// Live-query ordering: newest first, ties broken by id.
pub fn sort_newest_first(records: &mut [AppRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
