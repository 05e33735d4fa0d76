#![allow(non_snake_case)]

use super::*;
use crate::{
    catalog::{
        CONCEALED_KILLER_COLLECTION,
        MANN_CO_CRATE_COLLECTION,
    },
    test_helpers::*,
};

const EPSILON: Duration = Duration::from_millis(1);

fn tick_for(panel: &mut TestPanel, total: Duration, step: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        panel.tick(step);
        elapsed += step;
    }
}

#[test]
fn show__prefills_known_items_and_blocks_closure() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    let mut items = ctx.backpack_ids();
    items[1] = 99_999;

    // when
    panel.show(CONCEALED_KILLER_COLLECTION, &items).unwrap();

    // then
    assert_eq!(panel.slots(), &[Some(items[0]), None, Some(items[2])]);
    assert!(panel.is_visible());
    assert!(panel.prevents_closure());
    assert!(!panel.can_submit());
}

#[test]
fn submit__rejects_incomplete_slots() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel
        .show(CONCEALED_KILLER_COLLECTION, &ctx.backpack_ids()[..1])
        .unwrap();

    assert!(panel.submit().is_err());
    assert_eq!(panel.state(), &PanelState::Idle);
    assert!(panel.sender().sent.is_empty());
}

#[test]
fn submit__sends_selected_item_ids() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel.show(CONCEALED_KILLER_COLLECTION, &[]).unwrap();
    for (slot, id) in ctx.backpack_ids().into_iter().enumerate() {
        panel.handle_command(PanelCommand::SelectSlot(slot)).unwrap();
        panel.selection_returned(Some(id)).unwrap();
    }

    // when
    panel.handle_command(PanelCommand::SendEnvelope).unwrap();

    // then
    let sent = &panel.sender().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, MessageKind::CraftCollectionUpgrade);
    assert_eq!(sent[0].item_ids, ctx.backpack_ids());
    assert!(matches!(
        panel.state(),
        PanelState::AwaitingConfirmation(PendingRequest {
            origin: ItemOrigin::TradeUp,
            ..
        })
    ));
}

#[test]
fn submit__stat_clock_recipe_uses_its_own_message() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel_with(Recipe::CommonStatClock, RecordingSender::default());
    panel
        .show(CONCEALED_KILLER_COLLECTION, &ctx.backpack_ids())
        .unwrap();

    panel.submit().unwrap();

    assert_eq!(panel.sender().sent[0].kind, MessageKind::CraftCommonStatClock);
}

#[test]
fn submit__failed_send_stays_idle() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel_with(Recipe::CollectionUpgrade, RecordingSender::failing());
    panel
        .show(CONCEALED_KILLER_COLLECTION, &ctx.backpack_ids())
        .unwrap();

    assert!(panel.submit().is_err());
    assert_eq!(panel.state(), &PanelState::Idle);
}

#[test]
fn submit__rejected_while_request_in_flight() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();

    assert!(panel.submit().is_err());
    assert!(panel.wait_for_item(ItemOrigin::FoundInCrate, None).is_err());
    assert_eq!(panel.sender().sent.len(), 1);
}

#[test]
fn tick__synthesizes_exactly_one_item_after_timeout() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();

    // when
    panel.tick(Duration::from_secs(5) + EPSILON);

    // then
    assert_eq!(panel.state(), &PanelState::Revealing);
    let rewards = panel.pending_rewards();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0], LOCAL_ITEM_ID);
    let item = panel.current_reveal().unwrap();
    assert_eq!(item.origin, ItemOrigin::TradeUp);
    assert_eq!(panel.ledger().load_all(), vec![item]);

    // and no second fallback on later ticks
    tick_for(&mut panel, Duration::from_secs(20), Duration::from_millis(500));
    assert_eq!(panel.ledger().load_all().len(), 1);
}

const LOCAL_ITEM_ID: u64 = 2_146_435_073;

#[test]
fn tick__does_nothing_before_timeout() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();

    tick_for(&mut panel, Duration::from_millis(4_900), Duration::from_millis(100));

    assert!(matches!(panel.state(), PanelState::AwaitingConfirmation(_)));
    assert!(panel.pending_rewards().is_empty());
    assert!(panel.response_remaining().unwrap() <= Duration::from_millis(100));
}

#[test]
fn on_item_granted__before_timeout_prevents_fallback() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    panel.tick(Duration::from_secs(2));

    // when
    panel.on_item_granted(backend_grant(42, ItemOrigin::TradeUp));
    tick_for(&mut panel, Duration::from_secs(10), Duration::from_millis(250));

    // then
    assert_eq!(panel.state(), &PanelState::Revealing);
    assert_eq!(panel.pending_rewards(), vec![42]);
    assert!(panel.ledger().load_all().is_empty());
    assert!(!panel.inventory().is_unacknowledged(42));
}

#[test]
fn on_item_granted__ignores_mismatched_origin() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();

    panel.on_item_granted(backend_grant(42, ItemOrigin::FoundInCrate));
    panel.tick(Duration::from_secs(1));

    assert!(matches!(panel.state(), PanelState::AwaitingConfirmation(_)));
    assert!(!panel.inventory().contains(42));
}

#[test]
fn on_item_granted__ignores_acknowledged_items() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    let mut grant = backend_grant(42, ItemOrigin::TradeUp);
    grant.unacknowledged = false;

    panel.on_item_granted(grant);
    panel.tick(Duration::from_secs(1));

    assert!(panel.pending_rewards().is_empty());
}

#[test]
fn on_item_granted__ignored_once_revealing() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    panel.tick(Duration::from_secs(6));
    assert_eq!(panel.state(), &PanelState::Revealing);

    // when
    panel.on_item_granted(backend_grant(42, ItemOrigin::TradeUp));

    // then
    assert_eq!(panel.pending_rewards(), vec![LOCAL_ITEM_ID]);
    assert!(!panel.inventory().contains(42));
}

#[test]
fn next_item__reveals_queued_grants_one_at_a_time() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel
        .wait_for_item(ItemOrigin::FoundInCrate, Some(MANN_CO_CRATE_COLLECTION))
        .unwrap();
    for id in [100, 101, 102] {
        panel.on_item_granted(backend_grant(id, ItemOrigin::FoundInCrate));
    }
    panel.tick(Duration::from_millis(100));
    assert_eq!(panel.current_reveal_id(), Some(100));
    assert!(panel.can_show_next());

    // when
    panel.handle_command(PanelCommand::NextItem).unwrap();
    panel.handle_command(PanelCommand::NextItem).unwrap();

    // then
    assert_eq!(panel.current_reveal_id(), Some(100));
    panel.tick(Duration::from_secs(1));
    assert_eq!(panel.current_reveal_id(), Some(101));
    assert_eq!(panel.pending_rewards(), vec![101, 102]);
}

#[test]
fn dismiss__returns_to_idle_after_last_reveal() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    panel.tick(Duration::from_secs(6));
    assert!(panel.prevents_closure());

    // when
    panel.handle_command(PanelCommand::Dismiss).unwrap();

    // then
    assert_eq!(panel.state(), &PanelState::Idle);
    assert!(!panel.prevents_closure());
    assert!(panel.pending_rewards().is_empty());
}

#[test]
fn dismiss__advances_while_items_remain() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel.wait_for_item(ItemOrigin::FoundInCrate, None).unwrap();
    panel.on_item_granted(backend_grant(100, ItemOrigin::FoundInCrate));
    panel.on_item_granted(backend_grant(101, ItemOrigin::FoundInCrate));
    panel.tick(Duration::from_millis(100));
    panel.tick(Duration::from_secs(1));

    panel.dismiss().unwrap();

    assert_eq!(panel.state(), &PanelState::Revealing);
    assert_eq!(panel.current_reveal_id(), Some(101));
    assert!(panel.prevents_closure());
}

#[test]
fn tick__failed_synthesis_keeps_waiting_without_retry() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel
        .wait_for_item(ItemOrigin::FoundInCrate, Some(999))
        .unwrap();

    // when
    tick_for(&mut panel, Duration::from_secs(12), Duration::from_secs(1));

    // then
    assert!(matches!(
        panel.state(),
        PanelState::AwaitingConfirmation(PendingRequest {
            synthesis_attempted: true,
            ..
        })
    ));
    assert!(panel.pending_rewards().is_empty());
    assert_eq!(panel.ledger().peek_next_item_id(), LOCAL_ITEM_ID);

    // a late confirmation still resolves the request
    panel.on_item_granted(backend_grant(7, ItemOrigin::FoundInCrate));
    panel.tick(Duration::from_millis(10));
    assert_eq!(panel.pending_rewards(), vec![7]);
}

#[test]
fn cancel__only_allowed_once_wait_has_timed_out() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel.wait_for_item(ItemOrigin::FoundInCrate, None).unwrap();

    assert!(panel.cancel().is_err());
    panel.tick(Duration::from_secs(6));
    panel.cancel().unwrap();

    assert_eq!(panel.state(), &PanelState::Idle);
    assert!(!panel.is_visible());
    assert!(!panel.prevents_closure());
}

#[test]
fn cancel__rejected_while_revealing() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    panel.tick(Duration::from_secs(6));

    assert!(panel.handle_command(PanelCommand::Cancel).is_err());
    assert!(panel.is_visible());
}

#[test]
fn drain_feedback__reports_reveal_cues() {
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    panel.drain_feedback();

    panel.tick(Duration::from_secs(6));

    let feedback = panel.drain_feedback();
    assert!(feedback.contains(&Feedback::Animation(AnimationSequence::ItemReceived)));
    assert!(feedback.contains(&Feedback::ItemRevealed {
        item_id: LOCAL_ITEM_ID,
        more_pending: false,
    }));
    assert!(panel.drain_feedback().is_empty());
}

#[test]
fn on_item_granted__duplicate_notification_queued_once() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();

    // when
    panel.on_item_granted(backend_grant(42, ItemOrigin::TradeUp));
    panel.on_item_granted(backend_grant(42, ItemOrigin::TradeUp));
    panel.tick(Duration::from_millis(10));

    // then
    assert_eq!(panel.pending_rewards(), vec![42]);
}

#[test]
fn on_item_granted__ignores_item_already_acknowledged_in_inventory() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.submitted_panel();
    let known = ctx.backpack_ids()[0];

    // when
    panel.on_item_granted(backend_grant(known, ItemOrigin::TradeUp));
    panel.tick(Duration::from_millis(10));

    // then
    assert!(matches!(panel.state(), PanelState::AwaitingConfirmation(_)));
    assert!(panel.pending_rewards().is_empty());
}

#[test]
fn select_item__rejects_item_already_in_another_slot() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel.show(CONCEALED_KILLER_COLLECTION, &[]).unwrap();
    let id = ctx.backpack_ids()[0];
    panel.select_item(0, id).unwrap();

    // when
    let second = panel.select_item(1, id);
    let third = panel.select_item(2, id);

    // then
    assert!(second.is_err());
    assert!(third.is_err());
    assert_eq!(panel.slots(), &[Some(id), None, None]);
    assert!(panel.submit().is_err());
    assert!(panel.sender().sent.is_empty());

    // reselecting the same slot is fine
    panel.select_item(0, id).unwrap();
    assert_eq!(panel.slot_holding(id), Some(0));
}

#[test]
fn show__drops_repeated_starting_items() {
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    let id = ctx.backpack_ids()[0];

    panel
        .show(CONCEALED_KILLER_COLLECTION, &[id, id, id])
        .unwrap();

    assert_eq!(panel.slots(), &[Some(id), None, None]);
    assert!(!panel.can_submit());
}

#[test]
fn tick__failed_inventory_insert_is_not_recorded() {
    // given
    let ctx = TestContext::new();
    let mut panel = ctx.panel();
    panel
        .inventory_mut()
        .add_item(backpack_item(LOCAL_ITEM_ID))
        .unwrap();
    panel
        .show(CONCEALED_KILLER_COLLECTION, &ctx.backpack_ids())
        .unwrap();
    panel.submit().unwrap();

    // when
    panel.tick(Duration::from_secs(6));

    // then
    assert!(panel.ledger().load_all().is_empty());
    assert!(panel.pending_rewards().is_empty());
    assert!(matches!(panel.state(), PanelState::AwaitingConfirmation(_)));
}
