use crate::{
    catalog::{
        CONCEALED_KILLER_COLLECTION,
        Catalog,
    },
    collaborators::{
        ItemGranted,
        OutboundRequest,
        RequestSender,
    },
    inventory::InMemoryInventory,
    items::{
        GrantedItem,
        ItemOrigin,
        ItemQuality,
        Rarity,
    },
    ledger::RewardLedger,
    panel::{
        CraftingPanel,
        PanelConfig,
        Recipe,
    },
};
use color_eyre::eyre::{
    Result,
    bail,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    path::Path,
    time::Duration,
};
use tempdir::TempDir;

pub type TestPanel = CraftingPanel<Catalog, InMemoryInventory, RecordingSender, StdRng>;

/// Backpack items every test panel starts with, one per slot.
pub const BACKPACK_START_ID: u64 = 5_000;

#[derive(Clone, Debug, Default)]
pub struct RecordingSender {
    pub sent: Vec<OutboundRequest>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            sent: Vec::new(),
            fail: true,
        }
    }
}

impl RequestSender for RecordingSender {
    fn send(&mut self, request: OutboundRequest) -> Result<()> {
        if self.fail {
            bail!("backend unreachable");
        }
        self.sent.push(request);
        Ok(())
    }
}

pub struct TestContext {
    dir: TempDir,
    config: PanelConfig,
}

impl TestContext {
    pub fn new() -> Self {
        Self::new_with_config(PanelConfig {
            response_timeout: Duration::from_secs(5),
            reveal_interval: Duration::from_secs(1),
            slot_count: 3,
        })
    }

    pub fn new_with_config(config: PanelConfig) -> Self {
        let dir = TempDir::new("collection-crafting").expect("create temp ledger dir");
        Self { dir, config }
    }

    pub fn ledger_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn open_ledger(&self) -> RewardLedger {
        RewardLedger::open(self.dir.path())
    }

    pub fn backpack(&self) -> InMemoryInventory {
        InMemoryInventory::with_items(
            (0..self.config.slot_count as u64).map(|n| backpack_item(BACKPACK_START_ID + n)),
        )
    }

    pub fn backpack_ids(&self) -> Vec<u64> {
        (0..self.config.slot_count as u64)
            .map(|n| BACKPACK_START_ID + n)
            .collect()
    }

    pub fn panel(&self) -> TestPanel {
        self.panel_with(Recipe::CollectionUpgrade, RecordingSender::default())
    }

    pub fn panel_with(&self, recipe: Recipe, sender: RecordingSender) -> TestPanel {
        CraftingPanel::new(
            self.config.clone(),
            recipe,
            self.open_ledger(),
            Catalog::builtin(),
            self.backpack(),
            sender,
            StdRng::seed_from_u64(7),
        )
    }

    /// Panel with every slot filled and the request already sent.
    pub fn submitted_panel(&self) -> TestPanel {
        let mut panel = self.panel();
        panel
            .show(CONCEALED_KILLER_COLLECTION, &self.backpack_ids())
            .expect("show panel");
        panel.submit().expect("submit request");
        panel
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub fn backpack_item(item_id: u64) -> GrantedItem {
    GrantedItem {
        item_id,
        definition_index: 15000,
        quality: ItemQuality::Unique,
        rarity: Rarity::Mercenary,
        origin: ItemOrigin::Crafted,
        is_strange: false,
        is_unusual: false,
    }
}

/// Grant notification as the backend would send it.
pub fn backend_grant(item_id: u64, origin: ItemOrigin) -> ItemGranted {
    ItemGranted {
        item: GrantedItem {
            item_id,
            definition_index: 15003,
            quality: ItemQuality::Unique,
            rarity: Rarity::Commando,
            origin,
            is_strange: false,
            is_unusual: false,
        },
        unacknowledged: true,
    }
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
