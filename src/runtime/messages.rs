use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compressor and output gain parameters sent on every "apply"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorSettings {
    /// Level above which compression starts (dB)
    pub threshold: f32,
    /// Input/output ratio above the threshold
    pub ratio: f32,
    /// Attack time in seconds
    pub attack: f32,
    /// Release time in seconds
    pub release: f32,
    /// Linear output gain
    pub gain: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub stream_id: String,
}

/// One telemetry sample: the compressor's instantaneous gain reduction (dB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainReduction {
    pub reduction: f32,
}

/// Every message exchanged between the coordinator, audio host and control panel
///
/// Decoding never fails on an unrecognized `type`, whatever its `data`; such
/// messages become [`RuntimeMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RuntimeMessage {
    CheckHostExists,
    StartStreaming(StreamRequest),
    UpdateSettings(CompressorSettings),
    ProcessStream(StreamRequest),
    StopProcessing,
    HostReady,
    GainReductionUpdate(GainReduction),
    Unknown,
}

/// Wire shape read before the tag is matched
#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn payload<T: DeserializeOwned, E: de::Error>(data: serde_json::Value) -> Result<T, E> {
    serde_json::from_value(data).map_err(E::custom)
}

impl<'de> Deserialize<'de> for RuntimeMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let RawMessage { kind, data } = RawMessage::deserialize(deserializer)?;

        Ok(match kind.as_str() {
            "check-host-exists" => Self::CheckHostExists,
            "start-streaming" => Self::StartStreaming(payload(data)?),
            "update-settings" => Self::UpdateSettings(payload(data)?),
            "process-stream" => Self::ProcessStream(payload(data)?),
            "stop-processing" => Self::StopProcessing,
            "host-ready" => Self::HostReady,
            "gain-reduction-update" => Self::GainReductionUpdate(payload(data)?),
            _ => Self::Unknown,
        })
    }
}

impl RuntimeMessage {
    pub fn start_streaming(stream_id: impl Into<String>) -> Self {
        Self::StartStreaming(StreamRequest {
            stream_id: stream_id.into(),
        })
    }

    pub fn process_stream(stream_id: impl Into<String>) -> Self {
        Self::ProcessStream(StreamRequest {
            stream_id: stream_id.into(),
        })
    }

    /// Wire name of the message, used in logs and unknown-message errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CheckHostExists => "check-host-exists",
            Self::StartStreaming(_) => "start-streaming",
            Self::UpdateSettings(_) => "update-settings",
            Self::ProcessStream(_) => "process-stream",
            Self::StopProcessing => "stop-processing",
            Self::HostReady => "host-ready",
            Self::GainReductionUpdate(_) => "gain-reduction-update",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RuntimeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Reply to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Exists {
        ready: bool,
    },
}

impl Response {
    pub fn ok() -> Self {
        Self::Status {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        Self::Status {
            success: false,
            error: Some(error.to_string()),
        }
    }

    pub fn exists(ready: bool) -> Self {
        Self::Exists { ready }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Status { success: true, .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Status { error, .. } => error.as_deref(),
            Self::Exists { .. } => None,
        }
    }
}

impl From<anyhow::Result<()>> for Response {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failure(format!("{:#}", e)),
        }
    }
}
