use crate::{
    collaborators::Inventory,
    items::GrantedItem,
};
use color_eyre::eyre::{
    Result,
    bail,
    eyre,
};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
struct Entry {
    item: GrantedItem,
    acknowledged: bool,
}

/// Local view of the player's backpack, keyed by item id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryInventory {
    items: BTreeMap<u64, Entry>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with items the player already knows about.
    pub fn with_items(items: impl IntoIterator<Item = GrantedItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| {
                (
                    item.item_id,
                    Entry {
                        item,
                        acknowledged: true,
                    },
                )
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &GrantedItem> {
        self.items.values().map(|entry| &entry.item)
    }
}

impl Inventory for InMemoryInventory {
    fn item_by_id(&self, item_id: u64) -> Option<GrantedItem> {
        self.items.get(&item_id).map(|entry| entry.item)
    }

    fn add_item(&mut self, item: GrantedItem) -> Result<()> {
        if self.items.contains_key(&item.item_id) {
            bail!("item {} already in inventory", item.item_id);
        }
        self.items.insert(
            item.item_id,
            Entry {
                item,
                acknowledged: false,
            },
        );
        Ok(())
    }

    fn acknowledge_item(&mut self, item_id: u64) -> Result<()> {
        let entry = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| eyre!("cannot acknowledge unknown item {item_id}"))?;
        entry.acknowledged = true;
        Ok(())
    }

    fn is_unacknowledged(&self, item_id: u64) -> bool {
        self.items
            .get(&item_id)
            .is_some_and(|entry| !entry.acknowledged)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::items::{
        ItemOrigin,
        ItemQuality,
        Rarity,
    };

    fn item(item_id: u64) -> GrantedItem {
        GrantedItem {
            item_id,
            definition_index: 200,
            quality: ItemQuality::Unique,
            rarity: Rarity::Mercenary,
            origin: ItemOrigin::TradeUp,
            is_strange: false,
            is_unusual: false,
        }
    }

    #[test]
    fn add_item__rejects_duplicate_ids() {
        let mut inventory = InMemoryInventory::new();
        inventory.add_item(item(1)).unwrap();

        assert!(inventory.add_item(item(1)).is_err());
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn acknowledge_item__clears_unacknowledged_flag() {
        // given
        let mut inventory = InMemoryInventory::new();
        inventory.add_item(item(5)).unwrap();
        assert!(inventory.is_unacknowledged(5));

        // when
        inventory.acknowledge_item(5).unwrap();

        // then
        assert!(!inventory.is_unacknowledged(5));
    }

    #[test]
    fn with_items__seeds_acknowledged_items() {
        let inventory = InMemoryInventory::with_items([item(3), item(4)]);
        assert!(inventory.contains(3));
        assert!(!inventory.is_unacknowledged(4));
    }
}
