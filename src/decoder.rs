//! Wire-frame decoding.
//!
//! Every frame coming off the transport passes through [`Decoder::decode`]
//! exactly once. This is the only place that looks at raw technique values:
//! the producer sends them either as a bare string or as an object with a
//! `text` field, and both collapse to the same plain string here.
//!
//! Decoding never fails. Anything that cannot be turned into a typed event is
//! returned as [`WireEvent::Unknown`] and logged.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sample::{Sample, Technique};

/// Source of decode-time timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A classified wire frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    DataPoint(Sample),
    TechniqueChange { technique: Technique },
    ConnectionAck { message: String },
    Unknown { raw: String, reason: UnknownReason },
}

/// Why a frame was classified as [`WireEvent::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownReason {
    /// Not JSON, not an object, or a required field is missing.
    Malformed(String),
    /// `x` or `y` is present but not a finite number.
    NonNumeric { field: &'static str },
    /// Well-formed frame with a `type` this decoder does not handle.
    UnrecognizedType(String),
}

impl UnknownReason {
    /// Faults count as anomalies; unrecognised types are forward-compatible noise.
    pub fn is_fault(&self) -> bool {
        !matches!(self, UnknownReason::UnrecognizedType(_))
    }
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Malformed(msg) => write!(f, "malformed frame: {msg}"),
            UnknownReason::NonNumeric { field } => write!(f, "non-numeric `{field}`"),
            UnknownReason::UnrecognizedType(kind) => write!(f, "unrecognised type `{kind}`"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    DataPoint {
        technique: Value,
        x: Value,
        y: Value,
    },
    TechniqueChange {
        technique: Value,
    },
    ConnectionEstablished {
        #[serde(default)]
        message: Option<Value>,
    },
    #[serde(other)]
    Other,
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce any technique value to its canonical string.
///
/// Strings pass through, objects with a `text` property yield that property's
/// string form, anything else is stringified whole.
pub fn normalize_technique(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text") {
            Some(text) => stringify(text),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn finite(v: &Value, field: &'static str) -> Result<f64, UnknownReason> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or(UnknownReason::NonNumeric { field }),
        _ => Err(UnknownReason::NonNumeric { field }),
    }
}

/// Stateful decoder: assigns sequence numbers and capture timestamps.
pub struct Decoder {
    next_sequence: u64,
    clock: Clock,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            next_sequence: 1,
            clock,
        }
    }

    /// Sequence the next data point will get.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Restart sequence numbering.
    pub fn reset(&mut self) {
        self.next_sequence = 1;
    }

    pub fn decode(&mut self, raw: &str) -> WireEvent {
        match self.classify(raw) {
            Ok(event) => event,
            Err(reason) => {
                if reason.is_fault() {
                    warn!(%reason, frame = raw, "dropping frame");
                } else {
                    debug!(%reason, "ignoring frame");
                }
                WireEvent::Unknown {
                    raw: raw.to_string(),
                    reason,
                }
            }
        }
    }

    fn classify(&mut self, raw: &str) -> Result<WireEvent, UnknownReason> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| UnknownReason::Malformed(e.to_string()))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();
        let frame: Frame =
            serde_json::from_value(value).map_err(|e| UnknownReason::Malformed(e.to_string()))?;

        match frame {
            Frame::DataPoint { technique, x, y } => {
                let x = finite(&x, "x")?;
                let y = finite(&y, "y")?;
                let sample = Sample {
                    technique: Technique::from(normalize_technique(&technique)),
                    x,
                    y,
                    sequence: self.next_sequence,
                    received_at: (self.clock)(),
                };
                self.next_sequence += 1;
                Ok(WireEvent::DataPoint(sample))
            }
            Frame::TechniqueChange { technique } => Ok(WireEvent::TechniqueChange {
                technique: Technique::from(normalize_technique(&technique)),
            }),
            Frame::ConnectionEstablished { message } => Ok(WireEvent::ConnectionAck {
                message: message.as_ref().map(stringify).unwrap_or_default(),
            }),
            Frame::Other => Err(UnknownReason::UnrecognizedType(kind)),
        }
    }
}
