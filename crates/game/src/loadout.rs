//! The combatant's equipped items.

use disasters::{EquipmentStore, ItemId};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Loadout {
    items: BTreeSet<ItemId>,
}

impl Loadout {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self { items: names.iter().map(|n| ItemId::from(n.as_ref())).collect() }
    }

    pub fn equip(&mut self, item: &str) -> bool {
        self.items.insert(ItemId::from(item))
    }

    pub fn unequip(&mut self, item: &str) -> bool {
        self.items.remove(&ItemId::from(item))
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }
}

/// Shared handle so the loop can swap gear while the weather engine reads it.
#[derive(Clone, Default)]
pub struct SharedLoadout(pub Rc<RefCell<Loadout>>);

impl EquipmentStore for SharedLoadout {
    fn has_item(&self, id: &ItemId) -> bool {
        // A loadout being edited counts as not wearing anything.
        self.0.try_borrow().is_ok_and(|l| l.items.contains(id))
    }
}
