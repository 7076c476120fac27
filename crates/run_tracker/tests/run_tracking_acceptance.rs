use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use run_tracker::{RunBoundaryConfig, RunIdService};
use shared::{
    cards::{CardCatalog, SignatureTreasureSet},
    domain::{
        CardId, GameMode, LiveSessionCounters, MatchRecord, MatchResult, ReviewId, RunTally,
    },
    events::StoreEvent,
};
use state_core::{default_registry, SnapshotSource, StateStore};
use storage::MemoryPreferences;

const SIGNATURE: &str = "PVPDR_SIG_Priest_01";

fn live(wins: u32, losses: u32) -> StoreEvent {
    StoreEvent::DuelsInfoUpdated {
        info: LiveSessionCounters {
            hero_card_id: Some(CardId::new("PVPDR_Hero_Anduin")),
            starting_hero_power: Some(CardId::new("PVPDR_HP_Priest_01")),
            player_class: Some("priest".into()),
            wins,
            losses,
            rating: 7020,
            deck_list: vec![CardId::new(SIGNATURE), CardId::new("CS2_235")],
            ..LiveSessionCounters::default()
        },
    }
}

#[tokio::test]
async fn runs_are_tracked_across_matches_and_split_on_reset() {
    let catalog = Arc::new(SignatureTreasureSet::new([CardId::new(SIGNATURE)]));
    let store = StateStore::new(default_registry(
        Arc::new(MemoryPreferences::default()),
        catalog.clone(),
    ));
    let service = RunIdService::spawn(store.as_ref(), RunBoundaryConfig::default(), catalog);

    let initial = service.current();
    let mut ids = service.stream();
    assert_eq!(ids.next().await, Some(initial));

    let seq = store.submit(live(0, 0));
    let first_run = service.settled(seq).await.expect("settled");
    assert_ne!(first_run, initial);
    assert_eq!(ids.next().await, Some(first_run));

    let played = [
        ("review-1", MatchResult::Won, RunTally::new(0, 0), live(1, 0)),
        ("review-2", MatchResult::Lost, RunTally::new(1, 0), live(1, 1)),
        ("review-3", MatchResult::Won, RunTally::new(1, 1), live(2, 1)),
    ];
    for (review, result, tally, counters) in played {
        let game = MatchRecord::new(ReviewId::new(review), GameMode::Duels, result, Utc::now())
            .with_tally(tally)
            .with_run_id(service.current());
        store.submit(StoreEvent::RecomputeGameStats { game_stat: game });
        let seq = store.submit(counters);
        assert_eq!(service.settled(seq).await, Some(first_run));
    }

    let snapshot = store.latest();
    let run = snapshot
        .state
        .duels
        .run_containing(&ReviewId::new("review-3"))
        .expect("tracked run");
    assert_eq!(run.id, first_run);
    assert_eq!(run.tally(), RunTally::new(2, 1));
    assert_eq!(run.steps.len(), 3);
    assert_eq!(
        run.signature_treasure_card_id,
        Some(CardId::new(SIGNATURE))
    );
    assert_eq!(
        service.latest_match().map(|game| game.review_id),
        Some(ReviewId::new("review-3"))
    );

    let seq = store.submit(live(0, 0));
    let second_run = service.settled(seq).await.expect("settled");
    assert_ne!(second_run, first_run);
    assert_eq!(ids.next().await, Some(second_run));

    store.shutdown().await;
}

#[tokio::test]
async fn unrelated_events_do_not_change_the_run_id() {
    let catalog = Arc::new(SignatureTreasureSet::default());
    let store = StateStore::new(default_registry(
        Arc::new(MemoryPreferences::default()),
        catalog.clone(),
    ));
    let service = RunIdService::spawn(store.as_ref(), RunBoundaryConfig::default(), catalog);

    let seq = store.submit(live(0, 0));
    let run_id = service.settled(seq).await.expect("settled");
    let mut changes = service.subscribe();
    changes.mark_unchanged();

    store.submit(StoreEvent::NavigateTo {
        app: shared::state::AppPanel::Battlegrounds,
    });
    let seq = store.submit(live(0, 0));
    assert_eq!(service.settled(seq).await, Some(run_id));
    assert!(!changes.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn tally_at_the_counter_limit_does_not_stop_run_tracking() {
    let catalog = Arc::new(SignatureTreasureSet::new([CardId::new(SIGNATURE)]));
    let store = StateStore::new(default_registry(
        Arc::new(MemoryPreferences::default()),
        catalog.clone(),
    ));
    let service = RunIdService::spawn(store.as_ref(), RunBoundaryConfig::default(), catalog);

    let seq = store.submit(live(1, 0));
    let before = service.settled(seq).await.expect("settled");

    let game = MatchRecord::new(
        ReviewId::new("review-max"),
        GameMode::Duels,
        MatchResult::Won,
        Utc::now(),
    )
    .with_tally(RunTally::new(u32::MAX, 0))
    .with_run_id(before);
    let seq = store.submit(StoreEvent::RecomputeGameStats { game_stat: game });
    let after_match = service.settled(seq).await.expect("still running");
    assert_ne!(after_match, before);

    let seq = store.submit(live(0, 0));
    let after_reset = service.settled(seq).await.expect("still running");
    assert_ne!(after_reset, after_match);

    store.shutdown().await;
}

struct UnavailableCatalog;

impl CardCatalog for UnavailableCatalog {
    fn is_signature_treasure(&self, _card_id: &CardId) -> bool {
        panic!("card catalog unavailable")
    }
}

#[tokio::test]
async fn failing_evaluation_starts_a_new_run_and_keeps_tracking() {
    let catalog = Arc::new(SignatureTreasureSet::new([CardId::new(SIGNATURE)]));
    let store = StateStore::new(default_registry(
        Arc::new(MemoryPreferences::default()),
        catalog,
    ));
    let service = RunIdService::spawn(
        store.as_ref(),
        RunBoundaryConfig::default(),
        Arc::new(UnavailableCatalog),
    );

    let seq = store.submit(live(0, 0));
    let first = service.settled(seq).await.expect("settled");

    // no tally, so the decision falls through to the signature check
    let game = MatchRecord::new(
        ReviewId::new("review-1"),
        GameMode::Duels,
        MatchResult::Won,
        Utc::now(),
    )
    .with_run_id(first);
    store.submit(StoreEvent::RecomputeGameStats { game_stat: game });
    let seq = store.submit(live(1, 0));
    let restarted = service.settled(seq).await.expect("worker survived");
    assert_ne!(restarted, first);

    let seq = store.submit(live(0, 0));
    let reset = service.settled(seq).await.expect("worker survived");
    assert_ne!(reset, restarted);

    store.shutdown().await;
}
