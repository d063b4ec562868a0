use crate::ValidationError;
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 255;
const MAX_UNIT_LEN: usize = 50;

/// A single metric reading with an enforced finite float value.
///
/// Field names on the wire (`metric_name`, `metric_value`, `unit`) are kept
/// for compatibility with the existing ingestion server schema.
///
/// `Deserialize` is routed through [`MetricEntry::new`] (via `try_from`) so
/// a value that deserializes to a non-finite `f64` — `1e400`, `NaN` is
/// rejected by JSON itself but a huge literal overflows to `inf` — can
/// never reach a constructed `MetricEntry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricEntryWire")]
pub struct MetricEntry {
    #[serde(rename = "metric_name")]
    name: String,
    #[serde(rename = "metric_value")]
    value: f64,
    #[serde(default)]
    unit: String,
}

#[derive(Deserialize)]
struct MetricEntryWire {
    metric_name: String,
    metric_value: f64,
    #[serde(default)]
    unit: String,
}

impl TryFrom<MetricEntryWire> for MetricEntry {
    type Error = ValidationError;

    fn try_from(wire: MetricEntryWire) -> Result<Self, Self::Error> {
        MetricEntry::new(wire.metric_name, wire.metric_value, wire.unit)
    }
}

impl MetricEntry {
    /// Construct a metric entry, validating name, value, and unit.
    ///
    /// `value` is always widened to `f64` by the caller before this is
    /// invoked — integers never reach this type directly.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let unit = unit.into();

        if name.is_empty() {
            return Err(ValidationError::Required { field: "name" });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max_length: MAX_NAME_LEN,
                actual: name.len(),
            });
        }
        if unit.len() > MAX_UNIT_LEN {
            return Err(ValidationError::TooLong {
                field: "unit",
                max_length: MAX_UNIT_LEN,
                actual: unit.len(),
            });
        }
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field: "value", value });
        }

        Ok(Self { name, value, unit })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}
