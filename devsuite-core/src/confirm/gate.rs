use crate::installables::ItemKey;

/// Deselects dependents when their prerequisite stops being configured.
///
/// Fires on the first evaluation and then only on change. A prerequisite
/// that becomes configured again leaves the dependents as they are.
#[derive(Debug, Clone)]
pub struct PrerequisiteGate {
    pub prerequisite: ItemKey,
    pub dependents: &'static [ItemKey],
    last: Option<bool>,
}

impl PrerequisiteGate {
    pub const fn new(prerequisite: ItemKey, dependents: &'static [ItemKey]) -> Self {
        Self {
            prerequisite,
            dependents,
            last: None,
        }
    }

    /// JBDS runs on the suite's JDK.
    pub const fn jdk() -> Self {
        Self::new(ItemKey::Jdk, &[ItemKey::Jbds])
    }

    pub fn guards(&self, key: ItemKey) -> bool {
        self.dependents.contains(&key)
    }

    /// Feed the prerequisite's current state; returns the dependents to
    /// deselect.
    pub fn evaluate(&mut self, configured: bool) -> Vec<ItemKey> {
        let fired = self.last != Some(configured);
        self.last = Some(configured);

        if fired && !configured {
            self.dependents.to_vec()
        } else {
            Vec::new()
        }
    }
}
