use std::fs;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use crate::common::UserIdentity;

/// The signed-in user's record, as left behind by the login flow.
///
/// Read once at startup and never written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "company_id", alias = "company")]
    pub company_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl SessionRecord {
    /// The chat identity, or `None` without a usable display name.
    ///
    /// Records without an id get a per-process one so that self-detection
    /// never relies on the name alone.
    pub fn identity(&self) -> Option<UserIdentity> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
        let id = self
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));
        Some(UserIdentity {
            id,
            name: name.to_string(),
        })
    }

    pub fn room_id(&self) -> Option<String> {
        self.company_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

pub fn load_session(path: &Path) -> SessionRecord {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<SessionRecord>(&content) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("Failed to parse session file {}: {err}", path.display());
                SessionRecord::default()
            }
        },
        Err(err) => {
            log::info!(
                "No session at {} ({err}); chat stays inactive",
                path.display()
            );
            SessionRecord::default()
        }
    }
}
