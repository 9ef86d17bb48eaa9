//! Retention tags: writing them on new snapshots and judging them on old ones.
//!
//! Provider tags only hold strings, so timestamps are formatted on the way
//! out and parsed on the way in. The written format is
//! `2026-10-22 08:15:00 UTC`; parsing also accepts the other common
//! spellings people put in tags by hand.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::config::TagNames;
use crate::provider::{SnapshotFilter, SnapshotRecord, SnapshotStatus, TagMap};

/// Format used for the completion and expiration tags.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Values of the delete-after-expiration tag that opt a snapshot into pruning.
pub const TRUTHY_VALUES: [&str; 3] = ["true", "yes", "1"];

/// Value written to the delete-after-expiration tag.
pub const MANAGED_MARKER_VALUE: &str = "true";

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%a %b %e %H:%M:%S UTC %Y",
];

/// Errors raised when a tag value is not a usable timestamp.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TimestampError {
    /// The tag value was blank.
    #[error("timestamp is empty")]
    Empty,
    /// The tag value matched none of the accepted formats.
    #[error("'{value}' is not a recognised date/time")]
    Unrecognised {
        /// Offending tag value.
        value: String,
    },
}

/// Formats an instant for a retention tag.
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a retention tag value as an absolute instant.
///
/// Values without a zone are read as UTC; a bare date means midnight UTC.
/// The default output of `date` (`Thu Oct 22 08:15:00 UTC 2026`) is accepted
/// too.
///
/// # Errors
///
/// Returns [`TimestampError`] when the value is blank or unrecognised.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // RFC 2822 spelled with a `UTC` zone name.
    if let Some(local) = trimmed.strip_suffix(" UTC")
        && let Ok(parsed) = DateTime::parse_from_rfc2822(&format!("{local} +0000"))
    {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(TimestampError::Unrecognised {
        value: trimmed.to_owned(),
    })
}

/// Returns `true` when a delete-after-expiration value opts in to pruning.
///
/// Matching is exact and case-sensitive.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    TRUTHY_VALUES.contains(&value)
}

/// Builds the three tags attached to a freshly created snapshot.
#[must_use]
pub fn retention_tags(completed: DateTime<Utc>, expires: DateTime<Utc>, names: &TagNames) -> TagMap {
    TagMap::from([
        (names.completed.clone(), format_timestamp(completed)),
        (names.expiration.clone(), format_timestamp(expires)),
        (
            names.delete_after_expiration.clone(),
            MANAGED_MARKER_VALUE.to_owned(),
        ),
    ])
}

/// Provider-side filters selecting snapshots this tool manages.
#[must_use]
pub fn managed_snapshot_filters(names: &TagNames) -> Vec<SnapshotFilter> {
    vec![
        SnapshotFilter::Status(SnapshotStatus::Completed),
        SnapshotFilter::TagValue {
            key: names.delete_after_expiration.clone(),
            values: TRUTHY_VALUES.iter().map(|value| (*value).to_owned()).collect(),
        },
        SnapshotFilter::TagKey(names.expiration.clone()),
    ]
}

/// What the pruner should do with one snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PruneDecision {
    /// The expiration has passed; delete the snapshot.
    Expired {
        /// Parsed expiration instant.
        expires_at: DateTime<Utc>,
    },
    /// The expiration is still ahead; keep the snapshot.
    Retained {
        /// Parsed expiration instant.
        expires_at: DateTime<Utc>,
    },
    /// The snapshot is not eligible for automated deletion at all.
    Unmanaged,
    /// The expiration tag could not be parsed; keep the snapshot.
    InvalidExpiration(TimestampError),
}

/// Judges a snapshot against the pruning rules at instant `now`.
///
/// A snapshot is only ever [`PruneDecision::Expired`] when it is completed,
/// carries a truthy delete-after-expiration tag, and has an expiration tag
/// that parses to an instant strictly before `now` (compared in whole
/// seconds).
#[must_use]
pub fn evaluate_snapshot(
    snapshot: &SnapshotRecord,
    names: &TagNames,
    now: DateTime<Utc>,
) -> PruneDecision {
    if snapshot.status != SnapshotStatus::Completed {
        return PruneDecision::Unmanaged;
    }
    let opted_in = snapshot
        .tags
        .get(&names.delete_after_expiration)
        .is_some_and(|value| is_truthy(value));
    if !opted_in {
        return PruneDecision::Unmanaged;
    }
    let Some(raw) = snapshot.tags.get(&names.expiration) else {
        return PruneDecision::Unmanaged;
    };

    match parse_timestamp(raw) {
        Ok(expires_at) if expires_at.timestamp() < now.timestamp() => {
            PruneDecision::Expired { expires_at }
        }
        Ok(expires_at) => PruneDecision::Retained { expires_at },
        Err(err) => PruneDecision::InvalidExpiration(err),
    }
}
