//! Normalization of raw instant-query samples

use crate::error::SampleError;
use crate::query::RawSample;
use std::collections::BTreeMap;

/// Node name used when the capture agent could not resolve the caller
pub const UNKNOWN_SOURCE: &str = "UNKNOWN";

/// Upper bound label of the terminal histogram bucket
pub const TERMINAL_BUCKET: &str = "+Inf";

mod labels {
    pub const SOURCE: &str = "source";
    pub const SOURCE_NAMESPACE: &str = "source_ns";
    pub const DESTINATION: &str = "destination";
    pub const DESTINATION_NAMESPACE: &str = "destination_ns";
    pub const RESPONSE_CODE: &str = "response_code";
    pub const DESTINATION_PORT: &str = "destination_port";
    pub const BUCKET_BOUND: &str = "le";
}

/// One observed measurement with combined node identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    /// `<source>.<source_ns>` or `UNKNOWN`
    pub source: String,
    /// `<destination>.<destination_ns>`
    pub destination: String,
    pub response_code: u16,
    pub destination_port: String,
    pub bucket_bound: Option<String>,
    pub count: u64,
}

impl MetricSample {
    pub fn is_terminal(&self) -> bool {
        self.bucket_bound.as_deref() == Some(TERMINAL_BUCKET)
    }
}

impl TryFrom<&RawSample> for MetricSample {
    type Error = SampleError;

    fn try_from(raw: &RawSample) -> Result<Self, Self::Error> {
        normalize(&raw.metric, &raw.value)
    }
}

/// Normalize a label set and its `[timestamp, "value"]` pair
pub fn normalize(
    metric: &BTreeMap<String, String>,
    value: &[serde_json::Value],
) -> Result<MetricSample, SampleError> {
    let label = |name: &str| metric.get(name).map(String::as_str);
    let required = |name: &'static str| label(name).ok_or(SampleError::MissingLabel(name));

    let source = match label(labels::SOURCE) {
        Some(source) if !source.is_empty() => format!(
            "{}.{}",
            source,
            label(labels::SOURCE_NAMESPACE).unwrap_or_default()
        ),
        _ => UNKNOWN_SOURCE.to_string(),
    };

    let destination = format!(
        "{}.{}",
        required(labels::DESTINATION)?,
        required(labels::DESTINATION_NAMESPACE)?
    );

    let code = required(labels::RESPONSE_CODE)?;
    let response_code = code
        .trim()
        .parse::<u16>()
        .map_err(|_| SampleError::InvalidResponseCode(code.to_string()))?;

    Ok(MetricSample {
        source,
        destination,
        response_code,
        destination_port: label(labels::DESTINATION_PORT)
            .unwrap_or_default()
            .to_string(),
        bucket_bound: label(labels::BUCKET_BOUND).map(str::to_string),
        count: parse_count(value)?,
    })
}

/// Prometheus encodes sample values as decimal strings
fn parse_count(value: &[serde_json::Value]) -> Result<u64, SampleError> {
    match value.get(1) {
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| SampleError::InvalidValue(s.clone())),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| SampleError::InvalidValue(n.to_string())),
        Some(other) => Err(SampleError::InvalidValue(other.to_string())),
        None => Err(SampleError::InvalidValue(
            serde_json::Value::Array(value.to_vec()).to_string(),
        )),
    }
}
