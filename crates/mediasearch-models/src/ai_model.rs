//! AIModel entity and the system-wide metadata key/value store.

use serde::{Deserialize, Serialize};

use crate::ids::AiModelId;

/// A registered `(name, version)` analyzer, unique on the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: AiModelId,
    pub name: String,
    pub version: String,
}

impl AiModel {
    pub fn model_card(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Well-known `system_metadata` keys.
pub mod system_metadata_keys {
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const DEFAULT_AI_MODEL_ID: &str = "default_ai_model_id";
}
