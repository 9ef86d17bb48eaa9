//! Shared fixtures for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/fixtures.rs"]
//! mod fixtures;
//! ```

use chrono::{DateTime, TimeZone, Utc};
use snapwarden::test_support::FixedClock;
use snapwarden::{SnapshotRecord, SnapshotStatus, TagNames};

/// Instant every scenario treats as "now".
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
        .single()
        .expect("valid instant")
}

/// Clock frozen at [`now`].
pub fn clock() -> FixedClock {
    FixedClock(now())
}

/// Completed snapshot opted in to pruning with the given expiration tag.
pub fn managed_snapshot(id: &str, expiration: &str) -> SnapshotRecord {
    let names = TagNames::default();
    SnapshotRecord::new(id, SnapshotStatus::Completed)
        .with_tag(names.delete_after_expiration, "true")
        .with_tag(names.expiration, expiration)
}
