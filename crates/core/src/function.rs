use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deployed function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// Incremented every time the function's configuration changes.
    #[serde(default)]
    pub function_version: i32,
    /// Trigger expressions, kept opaque to the dispatcher.
    #[serde(default)]
    pub triggers: Vec<serde_json::Value>,
}

impl Function {
    pub fn new(id: Uuid, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            name: slug.clone(),
            slug,
            function_version: 1,
            triggers: Vec::new(),
        }
    }
}
