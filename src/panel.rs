use crate::{
    collaborators::{
        Inventory,
        ItemGranted,
        ItemSchema,
        MessageKind,
        OutboundRequest,
        RequestSender,
    },
    command::{
        AnimationSequence,
        Feedback,
        PanelCommand,
        Sound,
    },
    countdown::Countdown,
    items::{
        GrantedItem,
        ItemOrigin,
    },
    ledger::RewardLedger,
    lottery,
    reveal::RevealSequencer,
};
use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    bail,
    eyre,
};
use rand::Rng;
use std::{
    collections::HashSet,
    time::Duration,
};
use tracing::{
    debug,
    info,
    warn,
};

#[cfg(test)]
mod tests;

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SLOT_COUNT: usize = 10;

#[derive(Clone, Debug)]
pub struct PanelConfig {
    /// how long to wait for the backend before synthesizing an item locally
    pub response_timeout: Duration,
    /// minimum time each reveal stays up before the next queued item shows
    pub reveal_interval: Duration,
    pub slot_count: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            reveal_interval: DEFAULT_RESPONSE_TIMEOUT,
            slot_count: DEFAULT_SLOT_COUNT,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recipe {
    CollectionUpgrade,
    CommonStatClock,
}

impl Recipe {
    pub fn message_kind(self) -> MessageKind {
        match self {
            Recipe::CollectionUpgrade => MessageKind::CraftCollectionUpgrade,
            Recipe::CommonStatClock => MessageKind::CraftCommonStatClock,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingRequest {
    pub requested_at: DateTime<Utc>,
    pub origin: ItemOrigin,
    pub timeout: Duration,
    /// collection to draw a local item from if the backend stays silent
    pub fallback_collection: Option<u32>,
    pub synthesis_attempted: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PanelState {
    Idle,
    AwaitingConfirmation(PendingRequest),
    Revealing,
}

impl PanelState {
    pub fn name(&self) -> &'static str {
        match self {
            PanelState::Idle => "Idle",
            PanelState::AwaitingConfirmation(_) => "Awaiting confirmation",
            PanelState::Revealing => "Revealing",
        }
    }
}

pub struct CraftingPanel<Schema, Inv, Sender, R> {
    config: PanelConfig,
    recipe: Recipe,
    ledger: RewardLedger,
    schema: Schema,
    inventory: Inv,
    sender: Sender,
    rng: R,
    state: PanelState,
    response: Countdown,
    sequencer: RevealSequencer,
    slots: Vec<Option<u64>>,
    selecting_slot: Option<usize>,
    collection: Option<u32>,
    visible: bool,
    prevent_closure: bool,
    feedback: Vec<Feedback>,
}

impl<Schema, Inv, Sender, R> CraftingPanel<Schema, Inv, Sender, R> {
    pub fn new(
        config: PanelConfig,
        recipe: Recipe,
        ledger: RewardLedger,
        schema: Schema,
        inventory: Inv,
        sender: Sender,
        rng: R,
    ) -> Self {
        let sequencer = RevealSequencer::new(config.reveal_interval);
        let slots = vec![None; config.slot_count];
        Self {
            config,
            recipe,
            ledger,
            schema,
            inventory,
            sender,
            rng,
            state: PanelState::Idle,
            response: Countdown::default(),
            sequencer,
            slots,
            selecting_slot: None,
            collection: None,
            visible: false,
            prevent_closure: false,
            feedback: Vec::new(),
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn recipe(&self) -> Recipe {
        self.recipe
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// While set, the surrounding UI must not close the panel.
    pub fn prevents_closure(&self) -> bool {
        self.prevent_closure
    }

    pub fn slots(&self) -> &[Option<u64>] {
        &self.slots
    }

    pub fn selecting_slot(&self) -> Option<usize> {
        self.selecting_slot
    }

    pub fn collection(&self) -> Option<u32> {
        self.collection
    }

    pub fn can_submit(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Option::is_some)
    }

    pub fn can_show_next(&self) -> bool {
        self.sequencer.can_show_next()
    }

    /// Granted items not yet dismissed, in reveal order: the current reveal
    /// first, then everything queued behind it.
    pub fn pending_rewards(&self) -> Vec<u64> {
        self.sequencer
            .current()
            .into_iter()
            .chain(self.sequencer.queued().copied())
            .collect()
    }

    pub fn current_reveal_id(&self) -> Option<u64> {
        self.sequencer.current()
    }

    pub fn response_remaining(&self) -> Option<Duration> {
        match self.state {
            PanelState::AwaitingConfirmation(_) => self.response.remaining(),
            _ => None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn inventory(&self) -> &Inv {
        &self.inventory
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.feedback)
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.state != PanelState::Idle {
            bail!("cannot {action} while {}", self.state.name().to_lowercase());
        }
        Ok(())
    }

    /// Slot currently holding `item_id`, if any.
    pub fn slot_holding(&self, item_id: u64) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(item_id))
    }

    fn hide(&mut self) {
        self.visible = false;
        self.prevent_closure = false;
        self.selecting_slot = None;
        self.feedback.push(Feedback::Closed);
    }
}

impl<Schema, Inv, Sender, R> CraftingPanel<Schema, Inv, Sender, R>
where
    Schema: ItemSchema,
    Inv: Inventory,
    Sender: RequestSender,
    R: Rng,
{
    pub fn inventory_mut(&mut self) -> &mut Inv {
        &mut self.inventory
    }

    /// Put items remembered from earlier sessions back into the inventory.
    pub fn restore_dropped_items(&mut self) -> usize {
        self.ledger.restore_into(&mut self.inventory)
    }

    pub fn current_reveal(&self) -> Option<GrantedItem> {
        self.sequencer
            .current()
            .and_then(|id| self.inventory.item_by_id(id))
    }

    /// Open the trade-up form for a collection, pre-filling slots with the
    /// given items.
    pub fn show(&mut self, collection: u32, starting_items: &[u64]) -> Result<()> {
        self.ensure_idle("open the trade-up form")?;
        if self.schema.collection(collection).is_none() {
            bail!("unknown collection {collection}");
        }
        self.collection = Some(collection);
        let mut placed = HashSet::new();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            *entry = starting_items
                .get(slot)
                .copied()
                .filter(|id| self.inventory.contains(*id) && placed.insert(*id));
        }
        self.visible = true;
        self.prevent_closure = true;
        self.feedback
            .push(Feedback::Animation(AnimationSequence::Intro));
        self.feedback.push(Feedback::Sound(Sound::PanelSlide));
        self.update_ok_button();
        info!(collection, recipe = ?self.recipe, "crafting panel shown");
        Ok(())
    }

    /// Wait for an item the backend is about to grant without sending a
    /// request from this panel (crate opening).
    pub fn wait_for_item(&mut self, origin: ItemOrigin, collection: Option<u32>) -> Result<()> {
        self.ensure_idle("wait for an item")?;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.collection = collection;
        self.visible = true;
        self.prevent_closure = true;
        self.begin_waiting(origin, collection);
        self.feedback
            .push(Feedback::Animation(AnimationSequence::WaitForItemsOnly));
        Ok(())
    }

    pub fn handle_command(&mut self, command: PanelCommand) -> Result<()> {
        debug!(?command, state = self.state.name(), "panel command");
        match command {
            PanelCommand::SelectSlot(slot) => self.begin_selection(slot),
            PanelCommand::DoneSelectingItems => {
                self.ensure_idle("seal the envelope")?;
                if !self.can_submit() {
                    bail!("every input slot must be filled first");
                }
                self.feedback
                    .push(Feedback::Animation(AnimationSequence::LetterStart));
                Ok(())
            }
            PanelCommand::PlaceStamp => {
                self.ensure_idle("place the stamp")?;
                self.feedback
                    .push(Feedback::Animation(AnimationSequence::PlaceStamp));
                Ok(())
            }
            PanelCommand::SendEnvelope => self.submit(),
            PanelCommand::NextItem => {
                self.next_item();
                Ok(())
            }
            PanelCommand::Dismiss => self.dismiss(),
            PanelCommand::Cancel => self.cancel(),
        }
    }

    fn begin_selection(&mut self, slot: usize) -> Result<()> {
        self.ensure_idle("select items")?;
        if slot >= self.slots.len() {
            bail!("slot {slot} out of range (panel has {})", self.slots.len());
        }
        self.selecting_slot = Some(slot);
        Ok(())
    }

    /// Result of the item picker opened by `SelectSlot`. `None` means the
    /// picker was closed without choosing.
    pub fn selection_returned(&mut self, item_id: Option<u64>) -> Result<()> {
        let Some(slot) = self.selecting_slot.take() else {
            bail!("no slot is being selected");
        };
        match item_id {
            Some(id) => self.select_item(slot, id),
            None => Ok(()),
        }
    }

    pub fn select_item(&mut self, slot: usize, item_id: u64) -> Result<()> {
        self.ensure_idle("select items")?;
        if slot >= self.slots.len() {
            bail!("slot {slot} out of range (panel has {})", self.slots.len());
        }
        if !self.inventory.contains(item_id) {
            bail!("item {item_id} is not in the inventory");
        }
        if let Some(other) = self.slot_holding(item_id).filter(|other| *other != slot) {
            bail!("item {item_id} is already in slot {other}");
        }
        self.slots[slot] = Some(item_id);
        self.feedback.push(Feedback::Sound(Sound::ApplySticker));
        self.update_ok_button();
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: usize) -> Result<()> {
        self.ensure_idle("clear a slot")?;
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| eyre!("slot {slot} out of range"))?;
        *entry = None;
        Ok(())
    }

    fn update_ok_button(&mut self) {
        if self.can_submit() {
            self.feedback
                .push(Feedback::Animation(AnimationSequence::OkBlink));
        }
    }

    /// Send the crafting request for the selected items and start waiting
    /// for the backend's answer.
    pub fn submit(&mut self) -> Result<()> {
        self.ensure_idle("submit")?;
        if !self.can_submit() {
            bail!("every input slot must be filled before submitting");
        }
        let item_ids: Vec<u64> = self.slots.iter().flatten().copied().collect();
        let request = OutboundRequest {
            kind: self.recipe.message_kind(),
            item_ids,
        };
        self.sender
            .send(request)
            .wrap_err("Failed to send crafting request")?;
        self.begin_waiting(ItemOrigin::TradeUp, self.collection);
        self.feedback
            .push(Feedback::Animation(AnimationSequence::LetterSend));
        Ok(())
    }

    fn begin_waiting(&mut self, origin: ItemOrigin, fallback_collection: Option<u32>) {
        self.sequencer.clear();
        self.response.start(self.config.response_timeout);
        let pending = PendingRequest {
            requested_at: Utc::now(),
            origin,
            timeout: self.config.response_timeout,
            fallback_collection,
            synthesis_attempted: false,
        };
        info!(
            ?origin,
            ?fallback_collection,
            timeout_secs = pending.timeout.as_secs_f32(),
            "waiting for granted item"
        );
        self.state = PanelState::AwaitingConfirmation(pending);
    }

    /// Backend reported a newly created item.
    pub fn on_item_granted(&mut self, grant: ItemGranted) {
        let item = grant.item;
        let PanelState::AwaitingConfirmation(pending) = &self.state else {
            debug!(item_id = item.item_id, state = self.state.name(), "ignoring grant outside wait");
            return;
        };
        if item.origin != pending.origin {
            debug!(
                item_id = item.item_id,
                origin = ?item.origin,
                expected = ?pending.origin,
                "ignoring grant with mismatched origin"
            );
            return;
        }
        let already_seen = self.inventory.contains(item.item_id)
            && !self.inventory.is_unacknowledged(item.item_id);
        if !grant.unacknowledged || already_seen {
            debug!(item_id = item.item_id, "ignoring already acknowledged grant");
            return;
        }
        if self.sequencer.holds(item.item_id) {
            debug!(item_id = item.item_id, "ignoring repeated grant notification");
            return;
        }
        if !self.inventory.contains(item.item_id) {
            if let Err(err) = self.inventory.add_item(item) {
                warn!(?err, item_id = item.item_id, "failed to add granted item");
                return;
            }
        }
        if let Err(err) = self.inventory.acknowledge_item(item.item_id) {
            warn!(?err, item_id = item.item_id, "failed to acknowledge granted item");
        }
        info!(item_id = item.item_id, definition = item.definition_index, "backend granted item");
        self.sequencer.push(item.item_id);
    }

    pub fn tick(&mut self, dt: Duration) {
        let (origin, fallback, attempted) = match &self.state {
            PanelState::Idle => return,
            PanelState::Revealing => {
                if let Some(id) = self.sequencer.tick(dt) {
                    self.announce_reveal(id);
                }
                return;
            }
            PanelState::AwaitingConfirmation(pending) => (
                pending.origin,
                pending.fallback_collection,
                pending.synthesis_attempted,
            ),
        };

        self.response.advance(dt);
        if !self.sequencer.is_exhausted() {
            self.response.stop();
            self.enter_revealing();
            return;
        }
        if !self.response.is_elapsed() || attempted {
            return;
        }

        if let PanelState::AwaitingConfirmation(pending) = &mut self.state {
            pending.synthesis_attempted = true;
        }
        let Some(collection) = fallback else {
            warn!(?origin, "no response from backend and no collection to draw a fallback from");
            return;
        };
        match self.synthesize(collection, origin) {
            Ok(item) => {
                self.sequencer.push(item.item_id);
                self.enter_revealing();
            }
            Err(err) => warn!(?err, collection, "local item synthesis failed"),
        }
    }

    /// Roll a local item for a request the backend never answered.
    fn synthesize(&mut self, collection: u32, origin: ItemOrigin) -> Result<GrantedItem> {
        let candidates = self
            .schema
            .collection_candidates(collection)
            .ok_or_else(|| eyre!("unknown collection {collection}"))?;
        if candidates.is_empty() {
            bail!("collection {collection} has no item definitions");
        }
        let draw = lottery::draw(&candidates, &mut self.rng)?;
        let definition = self
            .schema
            .item_definition(draw.definition_index)
            .ok_or_else(|| eyre!("item definition {} missing from schema", draw.definition_index))?;

        let item = GrantedItem {
            item_id: self.ledger.next_item_id(),
            definition_index: draw.definition_index,
            quality: draw.quality,
            rarity: draw.rarity,
            origin,
            is_strange: draw.is_strange,
            is_unusual: draw.is_unusual,
        };
        self.inventory
            .add_item(item)
            .wrap_err("Failed to add synthesized item to inventory")?;
        self.ledger.record(&item, &definition);
        info!(
            item_id = item.item_id,
            definition = %definition.name,
            rarity = %item.rarity,
            quality = %item.quality,
            quality_code = item.quality.code(),
            "synthesized fallback item"
        );
        Ok(item)
    }

    fn enter_revealing(&mut self) {
        self.state = PanelState::Revealing;
        if let Some(id) = self.sequencer.reveal_next() {
            self.announce_reveal(id);
        }
    }

    fn announce_reveal(&mut self, item_id: u64) {
        self.feedback
            .push(Feedback::Animation(AnimationSequence::ItemReceived));
        self.feedback.push(Feedback::ItemRevealed {
            item_id,
            more_pending: self.sequencer.can_show_next(),
        });
    }

    pub fn next_item(&mut self) {
        if self.state != PanelState::Revealing {
            debug!(state = self.state.name(), "next item ignored");
            return;
        }
        if let Some(id) = self.sequencer.request_next() {
            self.announce_reveal(id);
        }
    }

    /// Close the current reveal. With more items queued this advances
    /// instead; after the last one the panel returns to idle.
    pub fn dismiss(&mut self) -> Result<()> {
        if self.state != PanelState::Revealing {
            bail!("nothing to dismiss while {}", self.state.name().to_lowercase());
        }
        if self.sequencer.can_show_next() {
            self.next_item();
            return Ok(());
        }
        let dismissed = self.sequencer.dismiss();
        self.state = PanelState::Idle;
        self.prevent_closure = false;
        info!(?dismissed, "all granted items revealed");
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        match &self.state {
            PanelState::Idle => {
                self.hide();
                Ok(())
            }
            PanelState::AwaitingConfirmation(pending) if self.response.is_elapsed() => {
                warn!(origin = ?pending.origin, "abandoning unanswered request");
                self.sequencer.clear();
                self.response.stop();
                self.state = PanelState::Idle;
                self.hide();
                Ok(())
            }
            PanelState::AwaitingConfirmation(_) => {
                bail!("cannot close while waiting for the backend")
            }
            PanelState::Revealing => bail!("cannot close before the granted items are revealed"),
        }
    }
}
