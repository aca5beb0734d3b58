//! Decoded samples and the point references that point back at them.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// Technique name as stored by every component. Shared, never re-interpreted.
pub type Technique = Arc<str>;

/// One (technique, x, y) observation. Immutable once the decoder creates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub technique: Technique,
    pub x: f64,
    pub y: f64,
    /// Arrival-order identity assigned by the decoder (starts at 1).
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
}

impl Sample {
    /// Decode-time capture in a lexicographically sortable form.
    pub fn timestamp_text(&self) -> String {
        format_timestamp(&self.received_at)
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reference to a sample picked in the chart or the table.
///
/// `sequence` is `None` only for legacy payloads that carry bare coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPoint {
    pub technique: Technique,
    pub x: f64,
    pub y: f64,
    pub sequence: Option<u64>,
}

impl SelectedPoint {
    pub fn of(sample: &Sample) -> Self {
        Self {
            technique: sample.technique.clone(),
            x: sample.x,
            y: sample.y,
            sequence: Some(sample.sequence),
        }
    }

    /// Match by sequence when known, otherwise exact `(technique, x, y)` equality.
    pub fn matches(&self, sample: &Sample) -> bool {
        match self.sequence {
            Some(seq) => seq == sample.sequence,
            None => {
                *self.technique == *sample.technique && self.x == sample.x && self.y == sample.y
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(seq: u64, x: f64, y: f64) -> Sample {
        Sample {
            technique: Arc::from("CV"),
            x,
            y,
            sequence: seq,
            received_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sequence_wins_over_duplicate_coordinates() {
        let a = sample(1, 0.5, 1.0);
        let b = sample(2, 0.5, 1.0);
        let sel = SelectedPoint::of(&b);
        assert!(!sel.matches(&a));
        assert!(sel.matches(&b));
    }

    #[test]
    fn legacy_reference_falls_back_to_values() {
        let a = sample(1, 0.5, 1.0);
        let sel = SelectedPoint {
            technique: Arc::from("CV"),
            x: 0.5,
            y: 1.0,
            sequence: None,
        };
        assert!(sel.matches(&a));
    }

    #[test]
    fn timestamp_text_is_rfc3339_millis() {
        let s = sample(1, 0.0, 0.0);
        assert_eq!(s.timestamp_text(), "2024-05-01T12:00:00.000Z");
    }
}
