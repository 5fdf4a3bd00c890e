//! Live container contents as observed from the host.

use std::collections::BTreeMap;

use fairkeep_types::{ContainerId, ItemType};

/// A stack of interchangeable units occupying one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub item: ItemType,
    pub amount: u32,
}

impl Stack {
    #[must_use]
    pub fn new(item: ItemType, amount: u32) -> Self {
        Self { item, amount }
    }
}

/// Read access to a container the host owns, plus the one mutation the
/// table performs itself: clearing units that `remove_items` hands back to
/// the host as world drops.
pub trait LiveContainer {
    fn id(&self) -> ContainerId;

    /// Non-empty stacks in slot order.
    fn stacks(&self) -> Vec<Stack>;

    /// Remove up to `amount` units of `item` front to back. Returns how many
    /// were removed.
    fn take(&mut self, item: &ItemType, amount: u32) -> u32;

    /// Units per item type.
    fn quantities(&self) -> BTreeMap<ItemType, u32> {
        let mut totals = BTreeMap::new();
        for stack in self.stacks() {
            if stack.amount > 0 {
                let total: &mut u32 = totals.entry(stack.item).or_default();
                *total = total.saturating_add(stack.amount);
            }
        }
        totals
    }

    fn count(&self, item: &ItemType) -> u32 {
        self.stacks()
            .iter()
            .filter(|stack| &stack.item == item)
            .fold(0u32, |sum, stack| sum.saturating_add(stack.amount))
    }
}

/// In-memory slot container.
#[derive(Debug, Clone)]
pub struct SlotContainer {
    id: ContainerId,
    slots: Vec<Option<Stack>>,
}

impl SlotContainer {
    #[must_use]
    pub fn new(id: ContainerId, size: usize) -> Self {
        Self {
            id,
            slots: vec![None; size],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Stack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Replace the contents of one slot. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, stack: Option<Stack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack.filter(|s| s.amount > 0);
        }
    }

    /// Put `amount` units into the first slot holding `item`, or the first
    /// free slot. Returns false when the container is full.
    pub fn put(&mut self, item: &ItemType, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }
        if let Some(stack) = self.slots.iter_mut().flatten().find(|s| &s.item == item) {
            stack.amount = stack.amount.saturating_add(amount);
            return true;
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(Stack::new(item.clone(), amount));
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

impl LiveContainer for SlotContainer {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn stacks(&self) -> Vec<Stack> {
        self.slots.iter().flatten().cloned().collect()
    }

    fn take(&mut self, item: &ItemType, amount: u32) -> u32 {
        let mut left = amount;
        for slot in &mut self.slots {
            if left == 0 {
                break;
            }
            let Some(stack) = slot else { continue };
            if &stack.item != item {
                continue;
            }
            if stack.amount <= left {
                left -= stack.amount;
                *slot = None;
            } else {
                stack.amount -= left;
                left = 0;
            }
        }
        amount - left
    }
}
