use std::sync::Arc;

use chrono::Utc;
use shared::{
    cards::SignatureTreasureSet,
    domain::{
        CardId, GameMode, LiveSessionCounters, MatchRecord, MatchResult, ReviewId, RunId,
        RunRecord, RunTally,
    },
};

use crate::{
    config::RunBoundaryConfig,
    detector::{
        BoundaryReason, ContinuationReason, DetectorInputs, RunBoundaryDetector, RunDecision,
    },
};

const HERO_POWER: &str = "PVPDR_HP_Mage_01";
const SIGNATURE: &str = "PVPDR_SIG_Mage_01";
const RATING: i32 = 6150;

fn detector() -> RunBoundaryDetector {
    let catalog = SignatureTreasureSet::new([CardId::new(SIGNATURE)]);
    RunBoundaryDetector::new(RunBoundaryConfig::default(), Arc::new(catalog))
}

fn live(wins: u32, losses: u32) -> LiveSessionCounters {
    LiveSessionCounters {
        hero_card_id: Some(CardId::new("PVPDR_Hero_Jaina")),
        starting_hero_power: Some(CardId::new(HERO_POWER)),
        player_class: Some("mage".into()),
        wins,
        losses,
        rating: RATING,
        deck_list: vec![CardId::new("CS2_029"), CardId::new(SIGNATURE)],
        ..LiveSessionCounters::default()
    }
}

fn tracked_run(id: RunId, wins: u32, losses: u32, review: &str) -> RunRecord {
    RunRecord {
        hero_power_card_id: Some(CardId::new(HERO_POWER)),
        signature_treasure_card_id: Some(CardId::new(SIGNATURE)),
        rating_at_start: Some(RATING),
        wins,
        losses,
        steps: vec![ReviewId::new(review)],
        ..RunRecord::start(id)
    }
}

fn duels_match(
    review: &str,
    result: MatchResult,
    tally: Option<&str>,
    run_id: Option<RunId>,
) -> MatchRecord {
    let mut game = MatchRecord::new(ReviewId::new(review), GameMode::Duels, result, Utc::now());
    game.additional_result = tally.map(|raw| raw.parse::<RunTally>().expect("tally"));
    game.run_id = run_id;
    game
}

fn inputs(
    last_match: Option<MatchRecord>,
    live: LiveSessionCounters,
    current_run: Option<RunRecord>,
) -> DetectorInputs {
    DetectorInputs {
        last_match,
        live: Some(live),
        current_run,
    }
}

fn assert_new_run(decision: RunDecision, expected: BoundaryReason) -> RunId {
    match decision {
        RunDecision::NewRun { run_id, reason } => {
            assert_eq!(reason, expected);
            run_id
        }
        other => panic!("expected a new run ({expected:?}), got {other:?}"),
    }
}

fn assert_continues(decision: RunDecision, expected: ContinuationReason) -> RunId {
    match decision {
        RunDecision::Continue { run_id, reason } => {
            assert_eq!(reason, expected);
            run_id
        }
        other => panic!("expected a continuation ({expected:?}), got {other:?}"),
    }
}

#[test]
fn no_previous_match_starts_a_run() {
    let mut detector = detector();
    let initial = detector.current_run_id();
    let run_id = assert_new_run(
        detector.evaluate(inputs(None, live(0, 0), None)),
        BoundaryReason::NoPreviousMatch,
    );
    assert_ne!(run_id, initial);
    assert_eq!(detector.current_run_id(), run_id);
}

#[test]
fn tally_below_thresholds_keeps_the_run_id() {
    let mut detector = detector();
    let run = RunId::generate();
    let decision = detector.evaluate(inputs(
        Some(duels_match("m5", MatchResult::Won, Some("4-1"), Some(run))),
        live(5, 1),
        Some(tracked_run(run, 3, 1, "m5")),
    ));
    assert_eq!(
        assert_continues(decision, ContinuationReason::TallyBelowThreshold),
        run
    );
    assert_eq!(detector.current_run_id(), run);
}

#[test]
fn continuation_without_stamped_id_keeps_the_current_one() {
    let mut detector = detector();
    let current = detector.current_run_id();
    let decision = detector.evaluate(inputs(
        Some(duels_match("m2", MatchResult::Lost, Some("1-0"), None)),
        live(1, 1),
        None,
    ));
    assert_eq!(
        assert_continues(decision, ContinuationReason::TallyBelowThreshold),
        current
    );
}

#[test]
fn counters_reset_to_zero_split_the_run() {
    let mut detector = detector();
    let run = RunId::generate();
    let game = duels_match("m4", MatchResult::Won, Some("2-1"), Some(run));
    let tracked = tracked_run(run, 3, 1, "m4");

    assert_continues(
        detector.evaluate(inputs(Some(game.clone()), live(3, 1), Some(tracked.clone()))),
        ContinuationReason::TallyBelowThreshold,
    );
    let next = assert_new_run(
        detector.evaluate(inputs(Some(game), live(0, 0), Some(tracked))),
        BoundaryReason::FreshSession,
    );
    assert_ne!(next, run);
}

#[test]
fn opening_tie_does_not_split_twice() {
    let mut detector = detector();
    let first = assert_new_run(
        detector.evaluate(inputs(None, live(0, 0), None)),
        BoundaryReason::NoPreviousMatch,
    );

    let tie = duels_match("m1", MatchResult::Tied, None, None);
    let after_tie = assert_continues(
        detector.evaluate(inputs(Some(tie.clone()), live(0, 0), None)),
        ContinuationReason::OpeningTie,
    );
    assert_eq!(after_tie, first);

    let mut grown_deck = live(0, 0);
    grown_deck.deck_list.push(CardId::new("PVPDR_Treasure_01"));
    let again = assert_continues(
        detector.evaluate(inputs(Some(tie), grown_deck, None)),
        ContinuationReason::UnchangedInputs,
    );
    assert_eq!(again, first);

    let stamped_tie = duels_match("m1", MatchResult::Tied, Some("0-0"), Some(first));
    let stamped = assert_continues(
        detector.evaluate(inputs(Some(stamped_tie), live(0, 0), None)),
        ContinuationReason::TallyBelowThreshold,
    );
    assert_eq!(stamped, first);
}

#[test]
fn twelfth_win_ends_the_run() {
    let mut detector = detector();
    let run = RunId::generate();
    let mut finished = live(12, 1);
    finished.last_rating_change = 84;
    let next = assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m13", MatchResult::Won, Some("11-1"), Some(run))),
            finished,
            Some(tracked_run(run, 12, 1, "m13")),
        )),
        BoundaryReason::RatingChanged,
    );
    assert_ne!(next, run);
}

#[test]
fn terminal_match_with_no_other_evidence_still_splits() {
    let mut detector = detector();
    let run = RunId::generate();
    let next = assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m7", MatchResult::Lost, Some("4-2"), Some(run))),
            live(4, 3),
            Some(tracked_run(run, 4, 3, "m7")),
        )),
        BoundaryReason::Ambiguous,
    );
    assert_ne!(next, run);
}

#[test]
fn missing_tally_is_not_a_continuation() {
    let mut detector = detector();
    let run = RunId::generate();
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m6", MatchResult::Won, None, Some(run))),
            live(5, 1),
            Some(tracked_run(run, 5, 1, "m6")),
        )),
        BoundaryReason::Ambiguous,
    );
}

#[test]
fn live_counters_below_the_tally_override_continuation() {
    let mut detector = detector();
    let run = RunId::generate();
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m6", MatchResult::Won, Some("5-1"), Some(run))),
            live(2, 0),
            Some(tracked_run(run, 6, 1, "m6")),
        )),
        BoundaryReason::CountersDecreased,
    );
}

#[test]
fn counters_behind_the_tracked_run_split() {
    let mut detector = detector();
    let run = RunId::generate();
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m6", MatchResult::Won, None, Some(run))),
            live(2, 2),
            Some(tracked_run(run, 6, 1, "m6")),
        )),
        BoundaryReason::CountersDecreased,
    );
}

#[test]
fn untracked_match_splits() {
    let mut detector = detector();
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m2", MatchResult::Won, None, None)),
            live(1, 0),
            None,
        )),
        BoundaryReason::NoTrackedRun,
    );
}

#[test]
fn different_hero_power_splits() {
    let mut detector = detector();
    let run = RunId::generate();
    let mut other_power = live(3, 1);
    other_power.starting_hero_power = Some(CardId::new("PVPDR_HP_Mage_02"));
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m4", MatchResult::Won, None, Some(run))),
            other_power,
            Some(tracked_run(run, 3, 1, "m4")),
        )),
        BoundaryReason::HeroPowerChanged,
    );
}

#[test]
fn rating_drift_since_run_start_splits() {
    let mut detector = detector();
    let run = RunId::generate();
    let mut rerated = live(3, 1);
    rerated.rating = RATING - 40;
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m4", MatchResult::Won, None, Some(run))),
            rerated,
            Some(tracked_run(run, 3, 1, "m4")),
        )),
        BoundaryReason::RatingChanged,
    );
}

#[test]
fn different_signature_treasure_splits() {
    let mut detector = detector();
    let run = RunId::generate();
    let mut no_signature = live(3, 1);
    no_signature.deck_list = vec![CardId::new("CS2_029")];
    assert_new_run(
        detector.evaluate(inputs(
            Some(duels_match("m4", MatchResult::Won, None, Some(run))),
            no_signature,
            Some(tracked_run(run, 3, 1, "m4")),
        )),
        BoundaryReason::SignatureChanged,
    );
}

#[test]
fn missing_live_counters_split() {
    let mut detector = detector();
    let decision = detector.evaluate(DetectorInputs {
        last_match: Some(duels_match("m2", MatchResult::Won, None, None)),
        live: None,
        current_run: None,
    });
    assert_new_run(decision, BoundaryReason::NoLiveCounters);
}

#[test]
fn tally_at_the_counter_limit_is_terminal_and_splits() {
    let mut detector = detector();
    let run = RunId::generate();
    let saturated = format!("{}-0", u32::MAX);
    let game = duels_match("m2", MatchResult::Won, Some(&saturated), Some(run));
    let tracked = tracked_run(run, 1, 0, "m2");

    let next = assert_new_run(
        detector.evaluate(inputs(Some(game.clone()), live(1, 0), Some(tracked.clone()))),
        BoundaryReason::CountersDecreased,
    );
    assert_ne!(next, run);
    let after_reset = assert_new_run(
        detector.evaluate(inputs(Some(game), live(0, 0), Some(tracked))),
        BoundaryReason::FreshSession,
    );
    assert_ne!(after_reset, next);

    let lost = duels_match("m3", MatchResult::Lost, Some(&format!("0-{}", u32::MAX)), None);
    assert_new_run(
        detector.evaluate(inputs(Some(lost), live(0, 1), None)),
        BoundaryReason::CountersDecreased,
    );
}

#[test]
fn starting_a_new_run_forgets_the_last_inputs() {
    let mut detector = detector();
    let evidence = inputs(None, live(0, 0), None);
    let first = detector.evaluate(evidence.clone()).run_id();

    let restarted = assert_new_run(
        detector.start_new_run(BoundaryReason::EvaluationFailed),
        BoundaryReason::EvaluationFailed,
    );
    assert_ne!(restarted, first);
    assert_eq!(detector.current_run_id(), restarted);

    let again = assert_new_run(detector.evaluate(evidence), BoundaryReason::NoPreviousMatch);
    assert_ne!(again, restarted);
}

#[test]
fn identical_inputs_never_mint_a_new_id() {
    let mut detector = detector();
    let evidence = inputs(
        Some(duels_match("m6", MatchResult::Won, None, None)),
        live(5, 1),
        None,
    );
    let first = assert_new_run(
        detector.evaluate(evidence.clone()),
        BoundaryReason::NoTrackedRun,
    );
    for _ in 0..3 {
        let again = assert_continues(
            detector.evaluate(evidence.clone()),
            ContinuationReason::UnchangedInputs,
        );
        assert_eq!(again, first);
    }

    let mut rerated = live(5, 1);
    rerated.rating += 1;
    let changed = detector.evaluate(inputs(
        Some(duels_match("m6", MatchResult::Won, None, None)),
        rerated,
        None,
    ));
    assert!(changed.is_new_run());
    assert_ne!(changed.run_id(), first);
}

#[test]
fn decisions_serialize_with_reason() {
    let run = RunId::generate();
    let json = serde_json::to_value(RunDecision::NewRun {
        run_id: run,
        reason: BoundaryReason::SignatureChanged,
    })
    .expect("json");
    assert_eq!(json["decision"], "new_run");
    assert_eq!(json["reason"], "signature_changed");
    assert_eq!(json["run_id"], run.to_string());
}
