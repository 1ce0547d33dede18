//! Shared validation helpers for inbound HTTP adapters.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Error, ExternalId, TaskId, TaskKind, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidExternalId,
    InvalidTimestamp,
    InvalidTaskId,
    InvalidTaskKind,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidExternalId => "invalid_external_id",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidTaskId => "invalid_task_id",
            ErrorCode::InvalidTaskKind => "invalid_task_type",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            value,
        )
    })
}

pub(crate) fn parse_external_id(value: &str, field: FieldName) -> Result<ExternalId, Error> {
    ExternalId::new(value).map_err(|err| {
        field_error(
            field,
            format!("{}: {err}", field.as_str()),
            ErrorCode::InvalidExternalId,
            value,
        )
    })
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| {
                    field_error(
                        field,
                        format!("{} must be an RFC 3339 timestamp", field.as_str()),
                        ErrorCode::InvalidTimestamp,
                        raw,
                    )
                })
        })
        .transpose()
}

pub(crate) fn parse_task_id(value: &str, field: FieldName) -> Result<TaskId, Error> {
    value
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(TaskId::new)
        .ok_or_else(|| {
            field_error(
                field,
                format!("{} must be a positive integer", field.as_str()),
                ErrorCode::InvalidTaskId,
                value,
            )
        })
}

pub(crate) fn parse_optional_task_kind(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<TaskKind>, Error> {
    value
        .map(|raw| {
            raw.parse::<TaskKind>().map_err(|err| {
                field_error(
                    field,
                    format!("{}: {err}", field.as_str()),
                    ErrorCode::InvalidTaskKind,
                    raw,
                )
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode as DomainErrorCode;

    const FIELD: FieldName = FieldName::new("userId");

    #[rstest]
    fn user_id_errors_carry_field_details() {
        let err = parse_user_id("nope", FIELD).expect_err("invalid uuid");
        assert_eq!(err.code(), DomainErrorCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], "userId");
        assert_eq!(details["value"], "nope");
        assert_eq!(details["code"], "invalid_uuid");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_external_ids_are_rejected(#[case] raw: &str) {
        let err = parse_external_id(raw, FieldName::new("externalId")).expect_err("blank");
        assert_eq!(err.details().expect("details")["code"], "invalid_external_id");
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("2026-01-02T03:04:05Z"), Some("2026-01-02T03:04:05+00:00"))]
    #[case(Some("2026-01-02T05:04:05+02:00"), Some("2026-01-02T03:04:05+00:00"))]
    fn timestamps_normalise_to_utc(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let parsed = parse_optional_rfc3339_timestamp(raw, FieldName::new("asOf"))
            .expect("valid timestamp");
        assert_eq!(parsed.map(|ts| ts.to_rfc3339()), expected.map(str::to_owned));
    }

    #[rstest]
    fn malformed_timestamp_is_invalid_request() {
        let err = parse_optional_rfc3339_timestamp(Some("yesterday"), FieldName::new("asOf"))
            .expect_err("malformed");
        assert_eq!(err.details().expect("details")["code"], "invalid_timestamp");
    }

    #[rstest]
    #[case("0")]
    #[case("-3")]
    #[case("two")]
    fn task_ids_must_be_positive_integers(#[case] raw: &str) {
        let err = parse_task_id(raw, FieldName::new("taskId")).expect_err("invalid id");
        assert_eq!(err.details().expect("details")["code"], "invalid_task_id");
    }

    #[rstest]
    fn unknown_task_type_is_invalid_request() {
        let err = parse_optional_task_kind(Some("hourly"), FieldName::new("type"))
            .expect_err("unknown type");
        assert_eq!(err.details().expect("details")["code"], "invalid_task_type");
    }
}
