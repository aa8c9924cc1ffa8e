//! Admin form state, validation, and payload building.

use shared::{AppFields, AppRecord, LaunchStatus};

use crate::error::ValidationError;

pub const DEFAULT_LAUNCH_WEEKS: i64 = 1;

/// Editable fields of the admin form.
///
/// Optional record fields are held as plain strings, with `""` meaning
/// absent. `launch_weeks` stays signed and optional so that cleared or
/// negative input can be represented and rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppForm {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub launch_status: LaunchStatus,
    pub external_link: String,
    pub launch_date: String,
    pub launch_weeks: Option<i64>,
}

impl AppForm {
    /// The template the form starts from and returns to after save or cancel.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            tagline: String::new(),
            description: String::new(),
            launch_status: LaunchStatus::ComingSoon,
            external_link: String::new(),
            launch_date: String::new(),
            launch_weeks: Some(DEFAULT_LAUNCH_WEEKS),
        }
    }

    pub fn from_record(record: &AppRecord) -> Self {
        Self {
            name: record.name.clone(),
            tagline: record.tagline.clone().unwrap_or_default(),
            description: record.description.clone().unwrap_or_default(),
            launch_status: record.launch_status,
            external_link: record.external_link.clone().unwrap_or_default(),
            launch_date: record.launch_date.clone().unwrap_or_default(),
            launch_weeks: Some(
                record
                    .launch_weeks
                    .map_or(DEFAULT_LAUNCH_WEEKS, i64::from),
            ),
        }
    }

    /// Builds the write payload. The field of the inactive status branch is
    /// always `None`, whatever the form currently holds for it.
    pub fn to_fields(&self, created_at: i64) -> Result<AppFields, ValidationError> {
        check(self)?;

        let launch_date = match self.launch_status {
            LaunchStatus::ComingOnDate => Some(self.launch_date.clone()),
            _ => None,
        };
        let launch_weeks = match (self.launch_status, self.launch_weeks) {
            (LaunchStatus::ComingInWeeks, Some(weeks)) => {
                Some(u32::try_from(weeks).map_err(|_| ValidationError::InvalidLaunchWeeks)?)
            }
            _ => None,
        };
        let external_link = if self.external_link.is_empty() {
            None
        } else {
            Some(self.external_link.clone())
        };

        Ok(AppFields {
            name: self.name.clone(),
            tagline: Some(self.tagline.clone()),
            description: Some(self.description.clone()),
            launch_status: self.launch_status,
            launch_date,
            launch_weeks,
            external_link,
            created_at,
        })
    }
}

impl Default for AppForm {
    fn default() -> Self {
        Self::empty()
    }
}

/// Runs the validation rules in order and reports the first failure.
pub fn check(form: &AppForm) -> Result<(), ValidationError> {
    if form.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if form.launch_status == LaunchStatus::ComingOnDate && form.launch_date.is_empty() {
        return Err(ValidationError::MissingLaunchDate);
    }
    if form.launch_status == LaunchStatus::ComingInWeeks
        && !matches!(form.launch_weeks, Some(weeks) if weeks >= 0)
    {
        return Err(ValidationError::InvalidLaunchWeeks);
    }
    Ok(())
}

pub fn validate(form: &AppForm) -> bool {
    check(form).is_ok()
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
