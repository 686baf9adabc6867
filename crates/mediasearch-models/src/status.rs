//! Pipeline status enums shared across the asset state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an asset in the pipeline.
///
/// Transitions are described in full in the queue/lease engine; this type
/// only carries the discriminant and its SQL text representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Processing,
    Proxied,
    AnalyzedLight,
    Completed,
    Failed,
    Poisoned,
}

impl AssetStatus {
    /// Terminal states are never claimed and never reclaimed automatically.
    pub fn is_terminal(self) -> bool {
        matches!(self, AssetStatus::Completed | AssetStatus::Poisoned)
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Processing => "processing",
            AssetStatus::Proxied => "proxied",
            AssetStatus::AnalyzedLight => "analyzed_light",
            AssetStatus::Completed => "completed",
            AssetStatus::Failed => "failed",
            AssetStatus::Poisoned => "poisoned",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssetStatus::Pending),
            "processing" => Ok(AssetStatus::Processing),
            "proxied" => Ok(AssetStatus::Proxied),
            "analyzed_light" => Ok(AssetStatus::AnalyzedLight),
            "completed" => Ok(AssetStatus::Completed),
            "failed" => Ok(AssetStatus::Failed),
            "poisoned" => Ok(AssetStatus::Poisoned),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown asset status: {0}")]
pub struct UnknownStatus(pub String);

/// Media kind discovered by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_db_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Library scan state (mutually exclusive with concurrent scans via SKIP LOCKED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    ScanRequested,
    Scanning,
}

impl ScanState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::ScanRequested => "scan_requested",
            ScanState::Scanning => "scanning",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl std::str::FromStr for ScanState {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ScanState::Idle),
            "scan_requested" => Ok(ScanState::ScanRequested),
            "scanning" => Ok(ScanState::Scanning),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Per-worker-process state reported via heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Idle,
    Processing,
    Paused,
    Offline,
}

impl WorkerState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Processing => "processing",
            WorkerState::Paused => "paused",
            WorkerState::Offline => "offline",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Out-of-band command delivered to a worker through its `WorkerStatus` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerCommand {
    #[default]
    None,
    Pause,
    Resume,
    Shutdown,
    ForensicDump,
}

impl WorkerCommand {
    pub fn as_db_str(self) -> &'static str {
        match self {
            WorkerCommand::None => "none",
            WorkerCommand::Pause => "pause",
            WorkerCommand::Resume => "resume",
            WorkerCommand::Shutdown => "shutdown",
            WorkerCommand::ForensicDump => "forensic_dump",
        }
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Why a video scene was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Phash,
    Temporal,
    Forced,
}

impl CloseReason {
    pub fn as_db_str(self) -> &'static str {
        match self {
            CloseReason::Phash => "phash",
            CloseReason::Temporal => "temporal",
            CloseReason::Forced => "forced",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Stage a worker process specializes in. Each process hosts exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Scanner,
    ImageProxy,
    VideoProxy,
    AiImage,
    AiVideo,
}

impl WorkerRole {
    pub fn as_db_str(self) -> &'static str {
        match self {
            WorkerRole::Scanner => "scanner",
            WorkerRole::ImageProxy => "image-proxy",
            WorkerRole::VideoProxy => "video-proxy",
            WorkerRole::AiImage => "ai-image",
            WorkerRole::AiVideo => "ai-video",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Mode in which the AI stage analyzes an asset/scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Light,
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_db_str() {
        for s in [
            AssetStatus::Pending,
            AssetStatus::Processing,
            AssetStatus::Proxied,
            AssetStatus::AnalyzedLight,
            AssetStatus::Completed,
            AssetStatus::Failed,
            AssetStatus::Poisoned,
        ] {
            let parsed: AssetStatus = s.as_db_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn terminal_states_are_exactly_completed_and_poisoned() {
        assert!(AssetStatus::Completed.is_terminal());
        assert!(AssetStatus::Poisoned.is_terminal());
        assert!(!AssetStatus::Failed.is_terminal());
        assert!(!AssetStatus::Pending.is_terminal());
    }
}
