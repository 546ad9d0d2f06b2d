use serde::Deserialize;
use chrono::{DateTime, Utc};

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Overrides the stored high-water mark.
    pub since: Option<DateTime<Utc>>,
}
