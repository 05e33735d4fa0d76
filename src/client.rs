use crate::ui;
use collection_crafting::{
    CraftingPanel,
    Inventory,
    ItemGranted,
    ItemSchema,
    PanelConfig,
    PanelState,
    Recipe,
    RewardLedger,
    catalog::{
        CONCEALED_KILLER_COLLECTION,
        Catalog,
        MANN_CO_CRATE_COLLECTION,
    },
    collaborators::{
        OutboundRequest,
        RequestSender,
    },
    command::{
        Feedback,
        PanelCommand,
    },
    inventory::InMemoryInventory,
    items::{
        GrantedItem,
        ItemOrigin,
        ItemQuality,
        Rarity,
    },
    lottery,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    collections::VecDeque,
    path::PathBuf,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
    },
};

pub const DEFAULT_BACKEND_LATENCY: Duration = Duration::from_secs(2);
const TICK_INTERVAL: Duration = Duration::from_millis(100);
const SERVER_ITEM_ID_START: u64 = 1_000_000;
const BACKPACK_ITEM_ID_START: u64 = 100;
const MAX_LOG_LINES: usize = 8;
const MAX_ERRORS: usize = 3;

type AppPanel = CraftingPanel<Catalog, InMemoryInventory, SimulatedBackend, StdRng>;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub panel: PanelConfig,
    pub recipe: Recipe,
    pub backend_latency: Duration,
    pub offline: bool,
}

impl AppConfig {
    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[derive(Clone, Debug)]
pub struct SlotView {
    pub item_id: Option<u64>,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct RevealView {
    pub item_id: u64,
    pub name: String,
    pub rarity: Rarity,
    pub quality: ItemQuality,
    pub origin: ItemOrigin,
    pub is_local: bool,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub state: String,
    pub recipe: Recipe,
    pub collection: Option<String>,
    pub visible: bool,
    pub prevents_closure: bool,
    pub slots: Vec<SlotView>,
    pub selecting_slot: Option<usize>,
    pub can_submit: bool,
    pub response_remaining: Option<Duration>,
    pub current_reveal: Option<RevealView>,
    pub pending_rewards: usize,
    pub can_show_next: bool,
    pub backpack: Vec<(u64, String)>,
    pub offline: bool,
    pub status: String,
    pub log: Vec<String>,
    pub errors: Vec<String>,
}

/// Work handed to the simulated backend.
enum BackendCommand {
    Craft(OutboundRequest),
    OpenCrate,
    Shutdown,
}

/// `RequestSender` that forwards crafting requests to the simulated backend
/// task.
pub struct SimulatedBackend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
}

impl SimulatedBackend {
    fn open_crate(&self) -> Result<()> {
        self.cmd_tx
            .send(BackendCommand::OpenCrate)
            .map_err(|_| eyre!("backend worker stopped"))
    }

    fn shutdown(&self) {
        let _ = self.cmd_tx.send(BackendCommand::Shutdown);
    }
}

impl RequestSender for SimulatedBackend {
    fn send(&mut self, request: OutboundRequest) -> Result<()> {
        tracing::info!(kind = ?request.kind, items = ?request.item_ids, "sending crafting request");
        self.cmd_tx
            .send(BackendCommand::Craft(request))
            .map_err(|_| eyre!("backend worker stopped"))
    }
}

pub struct AppController {
    panel: AppPanel,
    offline: bool,
    status: String,
    log: VecDeque<String>,
    errors: Vec<String>,
}

impl AppController {
    fn new(config: &AppConfig, backend: SimulatedBackend) -> Result<Self> {
        let catalog = load_catalog(config)?;
        let ledger = RewardLedger::open(config.ledger_dir());
        let inventory = seed_backpack(&catalog, config.panel.slot_count);
        let mut panel = CraftingPanel::new(
            config.panel.clone(),
            config.recipe,
            ledger,
            catalog,
            inventory,
            backend,
            StdRng::from_os_rng(),
        );
        let restored = panel.restore_dropped_items();
        let status = if restored > 0 {
            format!("Restored {restored} dropped item(s)")
        } else {
            String::from("Ready")
        };
        Ok(Self {
            panel,
            offline: config.offline,
            status,
            log: VecDeque::new(),
            errors: Vec::new(),
        })
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn push_error(&mut self, err: impl std::fmt::Display) {
        let message = err.to_string();
        tracing::warn!(%message, "panel action rejected");
        self.errors.push(message);
        if self.errors.len() > MAX_ERRORS {
            let overflow = self.errors.len() - MAX_ERRORS;
            self.errors.drain(..overflow);
        }
    }

    fn push_log(&mut self, line: String) {
        self.log.push_back(line);
        while self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
    }

    fn item_name(&self, item_id: u64) -> String {
        match self.panel.inventory().item_by_id(item_id) {
            Some(item) => self
                .panel
                .schema()
                .definition_name(item.definition_index)
                .to_string(),
            None => format!("#{item_id}"),
        }
    }

    pub fn open_trade_up(&mut self) {
        let starting: Vec<u64> = self.panel.slots().iter().flatten().copied().collect();
        match self.panel.show(CONCEALED_KILLER_COLLECTION, &starting) {
            Ok(()) => self.set_status("Select input items"),
            Err(err) => self.push_error(err),
        }
    }

    pub fn open_crate(&mut self) {
        let result = self
            .panel
            .wait_for_item(ItemOrigin::FoundInCrate, Some(MANN_CO_CRATE_COLLECTION))
            .and_then(|()| self.panel.sender().open_crate());
        match result {
            Ok(()) => self.set_status("Opening crate..."),
            Err(err) => self.push_error(err),
        }
    }

    /// Apply a panel command. Returns whether it was accepted.
    pub fn handle_command(&mut self, command: PanelCommand) -> bool {
        match self.panel.handle_command(command) {
            Ok(()) => {
                if command == PanelCommand::SendEnvelope {
                    self.set_status("Request sent, waiting for the backend");
                }
                true
            }
            Err(err) => {
                self.push_error(err);
                false
            }
        }
    }

    pub fn selection_returned(&mut self, item_id: Option<u64>) {
        if let Err(err) = self.panel.selection_returned(item_id) {
            self.push_error(err);
        }
    }

    pub fn on_item_granted(&mut self, grant: ItemGranted) {
        tracing::debug!(item_id = grant.item.item_id, "grant from backend");
        self.panel.on_item_granted(grant);
    }

    pub fn tick(&mut self, dt: Duration) {
        let was_awaiting = matches!(self.panel.state(), PanelState::AwaitingConfirmation(_));
        self.panel.tick(dt);
        if was_awaiting && self.panel.state() == &PanelState::Revealing {
            let local = self
                .panel
                .current_reveal()
                .is_some_and(|item| item.is_local());
            self.set_status(if local {
                "No answer from the backend, granted a local item"
            } else {
                "Item received"
            });
        }
        self.collect_feedback();
    }

    fn collect_feedback(&mut self) {
        for feedback in self.panel.drain_feedback() {
            let line = match feedback {
                Feedback::Animation(sequence) => format!("anim {}", sequence.script_name()),
                Feedback::Sound(sound) => format!("sound {}", sound.path()),
                Feedback::ItemRevealed {
                    item_id,
                    more_pending,
                } => {
                    let more = if more_pending { " (more pending)" } else { "" };
                    format!("revealed {}{more}", self.item_name(item_id))
                }
                Feedback::Closed => String::from("panel closed"),
            };
            self.push_log(line);
        }
    }

    pub fn shutdown(&self) {
        self.panel.sender().shutdown();
    }

    pub fn snapshot(&mut self) -> AppSnapshot {
        self.collect_feedback();
        let panel = &self.panel;
        let slots = panel
            .slots()
            .iter()
            .map(|slot| SlotView {
                item_id: *slot,
                name: slot
                    .map(|id| self.item_name(id))
                    .unwrap_or_else(|| String::from("(empty)")),
            })
            .collect();
        let current_reveal = panel.current_reveal().map(|item| RevealView {
            item_id: item.item_id,
            name: panel
                .schema()
                .definition_name(item.definition_index)
                .to_string(),
            rarity: item.rarity,
            quality: item.quality,
            origin: item.origin,
            is_local: item.is_local(),
        });
        let backpack = panel
            .inventory()
            .items()
            .filter(|item| panel.slot_holding(item.item_id).is_none())
            .map(|item| {
                (
                    item.item_id,
                    panel
                        .schema()
                        .definition_name(item.definition_index)
                        .to_string(),
                )
            })
            .collect();
        let collection = panel
            .collection()
            .and_then(|index| panel.schema().collection(index))
            .map(|collection| collection.name);
        AppSnapshot {
            state: panel.state().name().to_string(),
            recipe: panel.recipe(),
            collection,
            visible: panel.is_visible(),
            prevents_closure: panel.prevents_closure(),
            slots,
            selecting_slot: panel.selecting_slot(),
            can_submit: panel.can_submit(),
            response_remaining: panel.response_remaining(),
            current_reveal,
            pending_rewards: panel.pending_rewards().len(),
            can_show_next: panel.can_show_next(),
            backpack,
            offline: self.offline,
            status: self.status.clone(),
            log: self.log.iter().cloned().collect(),
            errors: self.errors.clone(),
        }
    }
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .wrap_err_with(|| format!("Failed to load catalog {}", path.display())),
        None => Ok(Catalog::builtin()),
    }
}

/// Backpack of tradeable inputs: a couple of copies of every weapon in the
/// trade-up collection.
fn seed_backpack(catalog: &Catalog, slot_count: usize) -> InMemoryInventory {
    let weapons = catalog
        .collection_candidates(CONCEALED_KILLER_COLLECTION)
        .unwrap_or_default();
    let items = weapons
        .iter()
        .cycle()
        .take(slot_count.max(weapons.len()) * 2)
        .zip(BACKPACK_ITEM_ID_START..)
        .map(|(def, item_id)| GrantedItem {
            item_id,
            definition_index: def.index,
            quality: ItemQuality::Unique,
            rarity: def.rarity,
            origin: ItemOrigin::Crafted,
            is_strange: false,
            is_unusual: false,
        });
    InMemoryInventory::with_items(items)
}

async fn backend_worker(
    catalog: Catalog,
    latency: Duration,
    offline: bool,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    grant_tx: mpsc::UnboundedSender<ItemGranted>,
) -> Result<()> {
    let mut rng = StdRng::from_os_rng();
    let mut next_item_id = SERVER_ITEM_ID_START;

    while let Some(cmd) = cmd_rx.recv().await {
        let (collection, origin) = match cmd {
            BackendCommand::Craft(request) => {
                tracing::debug!(kind = ?request.kind, "backend received crafting request");
                (CONCEALED_KILLER_COLLECTION, ItemOrigin::TradeUp)
            }
            BackendCommand::OpenCrate => (MANN_CO_CRATE_COLLECTION, ItemOrigin::FoundInCrate),
            BackendCommand::Shutdown => break,
        };
        if offline {
            tracing::info!(?origin, "backend offline, dropping request");
            continue;
        }
        let candidates = catalog
            .collection_candidates(collection)
            .ok_or_else(|| eyre!("backend catalog has no collection {collection}"))?;
        let draw = lottery::draw(&candidates, &mut rng)?;
        let grant = ItemGranted {
            item: GrantedItem {
                item_id: next_item_id,
                definition_index: draw.definition_index,
                quality: draw.quality,
                rarity: draw.rarity,
                origin,
                is_strange: draw.is_strange,
                is_unusual: draw.is_unusual,
            },
            unacknowledged: true,
        };
        next_item_id += 1;
        let grant_tx = grant_tx.clone();
        tokio::spawn(async move {
            time::sleep(latency).await;
            if grant_tx.send(grant).is_err() {
                tracing::debug!("grant receiver dropped");
            }
        });
    }
    Ok(())
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (grant_tx, grant_rx) = mpsc::unbounded_channel();
    let backend_catalog = load_catalog(&config)?;
    let backend = tokio::spawn(backend_worker(
        backend_catalog,
        config.backend_latency,
        config.offline,
        cmd_rx,
        grant_tx,
    ));
    let controller = AppController::new(&config, SimulatedBackend { cmd_tx })?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!(data_dir = %config.data_dir.display(), "starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, &mut input_events, grant_rx).await;
    ui::terminal_exit()?;
    match backend.await {
        Ok(Err(err)) => tracing::error!(?err, "backend worker failed"),
        Err(err) => tracing::error!(?err, "backend worker panicked"),
        Ok(Ok(())) => {}
    }
    res
}

async fn run_loop(
    mut controller: AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
    mut grant_rx: mpsc::UnboundedReceiver<ItemGranted>,
) -> Result<()> {
    let mut ticker = time::interval(TICK_INTERVAL);
    let mut last_tick = Instant::now();
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            now = ticker.tick() => {
                let dt = now.saturating_duration_since(last_tick);
                last_tick = now;
                controller.tick(dt);
                ui::draw(ui_state, &controller.snapshot()).wrap_err("draw after tick failed")?;
            }
            Some(grant) = grant_rx.recv() => {
                controller.on_item_granted(grant);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::OpenTradeUp => controller.open_trade_up(),
                    ui::UserEvent::OpenCrate => controller.open_crate(),
                    ui::UserEvent::Command(command) => {
                        let accepted = controller.handle_command(command);
                        if let (true, PanelCommand::SelectSlot(slot)) = (accepted, command) {
                            ui_state.open_picker(slot);
                        }
                    }
                    ui::UserEvent::Picked(item_id) => controller.selection_returned(item_id),
                }
                ui::draw(ui_state, &controller.snapshot()).wrap_err("draw after input failed")?;
            }
        }
    }
    controller.shutdown();
    Ok(())
}
