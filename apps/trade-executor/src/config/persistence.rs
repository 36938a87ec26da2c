//! State persistence configuration.

use serde::{Deserialize, Serialize};

/// State persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON state file.
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "./data/state.json".to_string()
}
