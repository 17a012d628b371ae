use serde::{Deserialize, Serialize};

/// Mount id used when the host does not name one.
pub const DEFAULT_MOUNT_ID: &str = "cesium";

/// Identifies the page element a viewer instance is bound to.
///
/// Mount ids are compared verbatim; no normalization is applied.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountId(String);

impl MountId {
    pub fn new(id: impl Into<String>) -> Self {
        MountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MountId {
    fn default() -> Self {
        MountId(DEFAULT_MOUNT_ID.to_string())
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MountId {
    fn from(value: &str) -> Self {
        MountId::new(value)
    }
}

impl From<String> for MountId {
    fn from(value: String) -> Self {
        MountId(value)
    }
}
