use super::*;

#[test]
fn validation_failures_share_the_required_fields_message() {
    for err in [
        ValidationError::MissingName,
        ValidationError::MissingLaunchDate,
        ValidationError::InvalidLaunchWeeks,
    ] {
        let notice = ControllerError::from(err).notice();
        assert_eq!(notice.category(), ErrorCategory::Validation);
        assert_eq!(notice.message(), REQUIRED_FIELDS_MESSAGE);
    }
}

#[test]
fn timeout_notice_names_the_write() {
    let create = ControllerError::StoreTimeout {
        operation: StoreOperation::Create,
        after: Duration::from_secs(30),
    };
    assert!(create.is_timeout());
    assert_eq!(create.notice().message(), "Database save timed out.");
    assert_eq!(create.notice().category(), ErrorCategory::Timeout);
    assert!(create.to_string().contains("30s"));

    let delete = ControllerError::StoreTimeout {
        operation: StoreOperation::Delete,
        after: Duration::from_secs(30),
    };
    assert_eq!(delete.notice().message(), "Database delete timed out.");
}

#[test]
fn store_failure_carries_the_store_detail() {
    let err = ControllerError::Store {
        operation: StoreOperation::Update,
        source: StoreError::permission_denied("missing or insufficient permissions"),
    };
    let notice = err.notice();
    assert_eq!(
        notice.message(),
        "Failed to save app: missing or insufficient permissions"
    );
    assert!(notice.requires_reauth());
    assert!(!err.is_timeout());
}

#[test]
fn blank_store_detail_falls_back_to_generic_hint() {
    let err = ControllerError::Store {
        operation: StoreOperation::Delete,
        source: StoreError::unavailable("  "),
    };
    let notice = err.notice();
    assert_eq!(notice.category(), ErrorCategory::Transport);
    assert_eq!(
        notice.message(),
        "Failed to delete app: please check your connection"
    );
    assert!(!notice.requires_reauth());
}

#[test]
fn lifecycle_errors_map_to_lifecycle_notices() {
    assert_eq!(
        ControllerError::Busy(UserAction::Save).notice().message(),
        "Please wait for the current save to finish."
    );
    assert_eq!(
        ControllerError::ConfirmationRequired(UserAction::Delete)
            .notice()
            .category(),
        ErrorCategory::Lifecycle
    );
    assert_eq!(
        ControllerError::UnknownRecord(RecordId::from("abc"))
            .notice()
            .category(),
        ErrorCategory::NotFound
    );
    assert_eq!(
        ControllerError::Detached.notice().to_string(),
        "The dashboard was closed before the operation finished."
    );
}
