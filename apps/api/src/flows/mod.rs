// Concrete flows registered with the service. Each one owns a distinct
// storage key so snapshots from different wizards never collide.

pub mod career_os;
pub mod contributor;

use crate::wizard::registry::Flow;

/// Storage keys of every registered flow.
pub const STORAGE_KEYS: &[&str] = &[
    career_os::CareerOsFlow::STORAGE_KEY,
    contributor::ContributorFlow::STORAGE_KEY,
];

/// True when no two registered flows persist under the same key.
pub fn storage_keys_are_unique() -> bool {
    STORAGE_KEYS
        .iter()
        .enumerate()
        .all(|(i, k)| !STORAGE_KEYS[i + 1..].contains(k))
}
