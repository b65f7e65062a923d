//! Home Assistant API Schemas
//! The schemas module defines the data structures used to interact with the Home Assistant API.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StateCreateOrUpdate {
    pub state: String,
    pub attributes: Option<HashMap<String, String>>,
}

/// Subset of the state object returned by `GET /api/states/<entity_id>`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StateGet {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}
