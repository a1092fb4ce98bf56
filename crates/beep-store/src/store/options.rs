use serde::{Deserialize, Serialize};

/// Options for [`LocalStore::set_with`](super::LocalStore::set_with) and
/// [`LocalStore::update_with`](super::LocalStore::update_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetOptions {
    /// Keep the expiry of the existing record instead of starting a new TTL window.
    pub preserve_expiry: bool,
}

impl SetOptions {
    /// Options that keep the existing expiry.
    pub const fn preserve_expiry() -> Self {
        Self {
            preserve_expiry: true,
        }
    }
}
