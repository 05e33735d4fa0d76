use crate::items::{
    GrantedItem,
    ItemCollection,
    ItemDefinition,
};
use color_eyre::eyre::Result;

pub trait Inventory {
    fn item_by_id(&self, item_id: u64) -> Option<GrantedItem>;

    /// insert a new item; inserting an id that already exists is an error
    fn add_item(&mut self, item: GrantedItem) -> Result<()>;

    /// mark an item as seen by the player
    fn acknowledge_item(&mut self, item_id: u64) -> Result<()>;

    fn is_unacknowledged(&self, item_id: u64) -> bool;

    fn contains(&self, item_id: u64) -> bool {
        self.item_by_id(item_id).is_some()
    }
}

pub trait ItemSchema {
    fn item_definition(&self, index: u32) -> Option<ItemDefinition>;

    fn collection(&self, index: u32) -> Option<ItemCollection>;

    /// Resolve every definition of a collection, skipping indices the schema
    /// does not know.
    fn collection_candidates(&self, index: u32) -> Option<Vec<ItemDefinition>> {
        let collection = self.collection(index)?;
        let candidates = collection
            .items
            .iter()
            .filter_map(|def_index| {
                let def = self.item_definition(*def_index);
                if def.is_none() {
                    tracing::warn!(
                        collection = index,
                        definition = def_index,
                        "collection references unknown item definition"
                    );
                }
                def
            })
            .collect();
        Some(candidates)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    CraftCollectionUpgrade,
    CraftCommonStatClock,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutboundRequest {
    pub kind: MessageKind,
    pub item_ids: Vec<u64>,
}

/// Fire-and-forget channel to the authoritative backend.
pub trait RequestSender {
    fn send(&mut self, request: OutboundRequest) -> Result<()>;
}

/// Notification that the backend created an item for the local player.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ItemGranted {
    pub item: GrantedItem,
    pub unacknowledged: bool,
}
