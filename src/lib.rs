pub mod catalog;
pub mod collaborators;
pub mod command;
pub mod countdown;
pub mod inventory;
pub mod items;
pub mod ledger;
pub mod lottery;
pub mod panel;
pub mod reveal;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use collaborators::{
    Inventory,
    ItemGranted,
    ItemSchema,
    RequestSender,
};
pub use items::{
    GrantedItem,
    ItemOrigin,
    ItemQuality,
    LOCAL_ITEM_ID_START,
    Rarity,
};
pub use ledger::RewardLedger;
pub use panel::{
    CraftingPanel,
    PanelConfig,
    PanelState,
    Recipe,
};
