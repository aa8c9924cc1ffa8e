use serde::{Deserialize, Serialize};

use crate::domain::LaunchStatus;

/// Document body written to the record store on create and update.
///
/// Every optional field is always present: absent values serialize as `null`
/// rather than being dropped, so an update always overwrites stale values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppFields {
    pub name: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub launch_status: LaunchStatus,
    pub launch_date: Option<String>,
    pub launch_weeks: Option<u32>,
    pub external_link: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_absent_fields_as_explicit_nulls() {
        let fields = AppFields {
            name: "Ludo Supreme".into(),
            tagline: Some(String::new()),
            description: Some(String::new()),
            launch_status: LaunchStatus::ComingInWeeks,
            launch_date: None,
            launch_weeks: Some(3),
            external_link: None,
            created_at: 42,
        };

        let value = serde_json::to_value(&fields).expect("encode");
        let object = value.as_object().expect("object");
        assert!(object["launchDate"].is_null());
        assert!(object["externalLink"].is_null());
        assert_eq!(object["launchWeeks"], 3);
        assert_eq!(object["launchStatus"], "Coming in selected weeks");
        assert!(!object.contains_key("id"));
    }
}
