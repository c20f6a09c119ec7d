use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identity of a single function run.
///
/// Every queue item carries one of these; it is also the identity handed to
/// the finalizer when the run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub run_id: Uuid,
    /// The function this run belongs to.
    pub workflow_id: Uuid,
    #[serde(default)]
    pub workflow_version: i32,
    pub account_id: Uuid,
    pub workspace_id: Uuid,
    pub app_id: Uuid,
    /// Internal id of the event that triggered the run, if any.
    #[serde(default)]
    pub event_id: Option<Uuid>,
}
