//! Creation and mutation timestamps for stored objects
//!
//! The store owns both timestamps. Callers never supply them; every
//! successful mutation advances `updated_at` without ever moving it
//! backwards, even if the wall clock does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps tracked for every memory object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalMetadata {
    /// When the object was first committed
    pub created_at: DateTime<Utc>,
    /// When the object was last committed
    pub updated_at: DateTime<Utc>,
}

impl TemporalMetadata {
    /// Metadata for an object committed right now
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Metadata for an object committed at `time`
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            created_at: time,
            updated_at: time,
        }
    }

    /// Record a mutation at the current time.
    ///
    /// Returns the new `updated_at`, which is never earlier than the
    /// previous one nor than `created_at`.
    pub fn touch(&mut self) -> DateTime<Utc> {
        self.touch_at(Utc::now())
    }

    /// Record a mutation at `time`, clamped to keep the timeline monotonic
    pub fn touch_at(&mut self, time: DateTime<Utc>) -> DateTime<Utc> {
        self.updated_at = time.max(self.updated_at).max(self.created_at);
        self.updated_at
    }

    /// Whether the object has been mutated since creation
    pub fn is_modified(&self) -> bool {
        self.updated_at > self.created_at
    }

    /// Check the `updated_at >= created_at` invariant
    pub fn is_consistent(&self) -> bool {
        self.updated_at >= self.created_at
    }

    /// Age of the last mutation relative to `now`
    pub fn since_update(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.updated_at
    }
}

impl Default for TemporalMetadata {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_now_is_consistent() {
        let meta = TemporalMetadata::now();
        assert_eq!(meta.created_at, meta.updated_at);
        assert!(meta.is_consistent());
        assert!(!meta.is_modified());
    }

    #[test]
    fn test_touch_advances() {
        let start = Utc::now() - Duration::seconds(10);
        let mut meta = TemporalMetadata::at(start);

        let updated = meta.touch();
        assert!(updated > start);
        assert!(meta.is_modified());
        assert!(meta.is_consistent());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let start = Utc::now();
        let mut meta = TemporalMetadata::at(start);
        meta.touch_at(start + Duration::seconds(5));

        // Clock skew: an earlier wall-clock reading must not rewind the object.
        let after_skew = meta.touch_at(start - Duration::seconds(30));
        assert_eq!(after_skew, start + Duration::seconds(5));
        assert!(meta.updated_at >= meta.created_at);
    }

    #[test]
    fn test_since_update() {
        let start = Utc::now() - Duration::hours(2);
        let meta = TemporalMetadata::at(start);
        assert_eq!(meta.since_update(start + Duration::hours(2)).num_hours(), 2);
    }

    #[test]
    fn test_serialization() {
        let meta = TemporalMetadata::now();
        let json = serde_json::to_string(&meta).unwrap();
        let back: TemporalMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
