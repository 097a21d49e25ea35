//! Checkpoint, restore, and halting-consistency tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use shac::{Direction, Error, Parameter, SearchSpace, ShacConfig, ShacEngine};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut path = std::env::temp_dir();
    path.push(format!(
        "shac_checkpoint_{}_{}_{tag}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

fn space() -> SearchSpace {
    SearchSpace::new(vec![
        Parameter::uniform("x", -5.0, 5.0),
        Parameter::uniform("y", -2.0, 2.0),
    ])
    .unwrap()
}

fn objective(sample: &shac::Sample) -> Result<f64, Error> {
    let x = sample.f64("x").unwrap();
    let y = sample.f64("y").unwrap();
    Ok((2.0 * x - y - 4.0).powi(2))
}

fn config(budget: usize) -> ShacConfig {
    ShacConfig::new(budget, 10)
        .objective(Direction::Minimize)
        .skip_cv_checks(true)
        .seed(42)
}

// =============================================================================
// Test: restore equivalence, a restored engine predicts identically
// =============================================================================

#[test]
fn restored_engine_predicts_identically() {
    let dir = temp_dir("equiv");

    // Train for 5 epochs; every epoch end checkpoints into `dir`.
    let mut engine: ShacEngine = ShacEngine::new(space(), config(50)).checkpoint_dir(&dir);
    engine.fit(|_, s| objective(s)).unwrap();
    assert_eq!(engine.epochs_completed(), 5);

    let restored: ShacEngine = ShacEngine::restore(&dir).unwrap();
    assert_eq!(restored.epochs_completed(), 5);
    assert_eq!(restored.cascade_len(), engine.cascade_len());
    assert_eq!(restored.dataset().records(), engine.dataset().records());

    // Sample sequences drawn from each must be identical.
    assert_eq!(engine.predict(50).unwrap(), restored.predict(50).unwrap());

    std::fs::remove_dir_all(&dir).ok();
}

// =============================================================================
// Test: explicit save to a second directory round-trips
// =============================================================================

#[test]
fn explicit_save_round_trips() {
    let dir = temp_dir("save_src");
    let copy = temp_dir("save_dst");

    let mut engine: ShacEngine = ShacEngine::new(space(), config(30)).checkpoint_dir(&dir);
    engine.fit(|_, s| objective(s)).unwrap();
    engine.save(&copy).unwrap();

    let restored: ShacEngine = ShacEngine::restore(&copy).unwrap();
    assert_eq!(restored.dataset().records(), engine.dataset().records());
    assert_eq!(restored.predict(20).unwrap(), engine.predict(20).unwrap());

    std::fs::remove_dir_all(&dir).ok();
    std::fs::remove_dir_all(&copy).ok();
}

// =============================================================================
// Test: a failing evaluator leaves only completed epochs on disk
// =============================================================================

#[test]
fn evaluator_failure_preserves_completed_epochs() {
    let dir = temp_dir("halt");

    let mut engine: ShacEngine = ShacEngine::new(space(), config(50)).checkpoint_dir(&dir);

    // Fail on the 7th evaluation of the third epoch (evaluation #27 overall).
    let calls = AtomicUsize::new(0);
    let result = engine.fit(|_, s| {
        if calls.fetch_add(1, Ordering::SeqCst) == 26 {
            return Err(Error::Evaluation {
                message: "synthetic failure".into(),
            });
        }
        objective(s)
    });
    assert!(matches!(result, Err(Error::Evaluation { .. })));

    // On-disk state reflects epochs 1 and 2 completely, nothing from epoch 3.
    let restored: ShacEngine = ShacEngine::restore(&dir).unwrap();
    assert_eq!(restored.epochs_completed(), 2);
    assert_eq!(restored.dataset().len(), 20);

    std::fs::remove_dir_all(&dir).ok();
}

// =============================================================================
// Test: an interrupted run, resumed, matches an uninterrupted one
// =============================================================================

#[test]
fn resumed_training_matches_uninterrupted_run() {
    let dir_full = temp_dir("full");
    let dir_resumed = temp_dir("resumed");

    let mut uninterrupted: ShacEngine =
        ShacEngine::new(space(), config(50)).checkpoint_dir(&dir_full);
    uninterrupted.fit(|_, s| objective(s)).unwrap();

    // Same seed, but the evaluator dies in epoch 3.
    let mut interrupted: ShacEngine =
        ShacEngine::new(space(), config(50)).checkpoint_dir(&dir_resumed);
    let calls = AtomicUsize::new(0);
    let result = interrupted.fit(|_, s| {
        if calls.fetch_add(1, Ordering::SeqCst) >= 20 {
            return Err(Error::Evaluation {
                message: "synthetic failure".into(),
            });
        }
        objective(s)
    });
    assert!(result.is_err());

    // Resume from the checkpoint and finish the budget.
    let mut resumed: ShacEngine = ShacEngine::restore(&dir_resumed).unwrap();
    assert_eq!(resumed.epochs_completed(), 2);
    resumed.fit(|_, s| objective(s)).unwrap();

    assert_eq!(resumed.dataset().len(), 50);
    assert_eq!(
        resumed.dataset().records(),
        uninterrupted.dataset().records()
    );
    assert_eq!(
        resumed.predict(30).unwrap(),
        uninterrupted.predict(30).unwrap()
    );

    std::fs::remove_dir_all(&dir_full).ok();
    std::fs::remove_dir_all(&dir_resumed).ok();
}

// =============================================================================
// Test: restore refuses inconsistent state
// =============================================================================

#[test]
fn restore_refuses_schema_conflicts() {
    let dir = temp_dir("conflict");

    let mut engine: ShacEngine = ShacEngine::new(space(), config(20)).checkpoint_dir(&dir);
    engine.fit(|_, s| objective(s)).unwrap();

    // Swap the schema for one with a different parameter name: the stored
    // dataset rows no longer conform.
    let other = SearchSpace::new(vec![
        Parameter::uniform("a", -5.0, 5.0),
        Parameter::uniform("y", -2.0, 2.0),
    ])
    .unwrap();
    let schema = serde_json::to_vec_pretty(&other).unwrap();
    std::fs::write(dir.join("parameters.json"), schema).unwrap();

    let result = ShacEngine::<shac::ForestClassifier>::restore(&dir);
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn restore_from_missing_directory_fails() {
    let dir = temp_dir("missing");
    let result = ShacEngine::<shac::ForestClassifier>::restore(&dir);
    assert!(matches!(result, Err(Error::Persistence(_))));
}

#[test]
fn restore_refuses_missing_classifier_files() {
    let dir = temp_dir("lost_cls");

    let mut engine: ShacEngine = ShacEngine::new(space(), config(30)).checkpoint_dir(&dir);
    engine.fit(|_, s| objective(s)).unwrap();
    assert!(engine.cascade_len() >= 1);

    std::fs::remove_file(dir.join("classifiers").join("cls_000.bin")).unwrap();
    let result = ShacEngine::<shac::ForestClassifier>::restore(&dir);
    assert!(matches!(result, Err(Error::Persistence(_))));

    std::fs::remove_dir_all(&dir).ok();
}
