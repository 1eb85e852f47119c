use std::collections::BTreeMap;

use chrono::Duration;
use storage::repository::{
    NewVerbRecord, SessionRecorder, SessionStatus, StorageError, VerbRepository,
};
use storage::seed::{DEFAULT_VERBS, seed_default_catalog};
use storage::sqlite::SqliteRepository;
use verbs_core::model::{PauseRecord, PauseSnapshot, QuizMode, SessionReport, VerbId};
use verbs_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn snapshot(session: u64, current_index: usize) -> PauseSnapshot {
    PauseSnapshot {
        session_id: Some(verbs_core::model::SessionId::new(session)),
        round_number: 2,
        global_correct: 6,
        global_total: 9,
        error_tally: BTreeMap::from([(VerbId::new(3), 2), (VerbId::new(5), 1)]),
        pool: vec![VerbId::new(3), VerbId::new(5), VerbId::new(8)],
        retry: vec![VerbId::new(3)],
        current_index,
        round_correct: 1,
        mode: QuizMode::Preterit,
    }
}

#[tokio::test]
async fn sqlite_seeds_catalog_once_and_orders_by_infinitive() {
    let repo = connect("memdb_seed").await;

    let inserted = seed_default_catalog(&repo).await.unwrap();
    assert_eq!(inserted, DEFAULT_VERBS.len());
    assert_eq!(seed_default_catalog(&repo).await.unwrap(), 0);

    let verbs = repo.list_verbs().await.unwrap();
    assert_eq!(verbs.len(), DEFAULT_VERBS.len());
    assert_eq!(verbs[0].infinitive(), "awake");
    assert!(
        verbs
            .windows(2)
            .all(|w| w[0].infinitive() <= w[1].infinitive())
    );

    let be = verbs.iter().find(|v| v.infinitive() == "be").unwrap();
    assert_eq!(be.past_simple(), "was / were");
}

#[tokio::test]
async fn sqlite_rejects_blank_verbs() {
    let repo = connect("memdb_blank").await;
    let err = repo
        .insert_verbs(&[NewVerbRecord::new("go", "", "gone", "aller")])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
    assert!(repo.list_verbs().await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_pause_roundtrips_snapshot_json() {
    let repo = connect("memdb_pause").await;
    let id = repo.create_session(fixed_now()).await.unwrap();
    assert!(repo.pending_session().await.unwrap().is_none());

    let paused_at = fixed_now() + Duration::minutes(3);
    let mut snap = snapshot(id.value(), 2);
    snap.session_id = Some(id);
    repo.save_pause(id, &PauseRecord::from_snapshot(snap.clone()), paused_at)
        .await
        .unwrap();

    let pending = repo.pending_session().await.unwrap().expect("pending");
    assert_eq!(pending.id, id);
    assert_eq!(pending.paused_at, paused_at);
    assert_eq!(pending.snapshot, snap);

    let row = repo.get_session(id).await.unwrap();
    assert_eq!(row.status, SessionStatus::Paused);
    assert_eq!(row.total_correct, 6);
    assert_eq!(row.total_errors, 3);
    assert_eq!(row.rounds, 2);

    repo.mark_resumed(id).await.unwrap();
    assert!(repo.pending_session().await.unwrap().is_none());
    assert_eq!(
        repo.get_session(id).await.unwrap().status,
        SessionStatus::Active
    );
}

#[tokio::test]
async fn sqlite_keeps_single_pending_session() {
    let repo = connect("memdb_single_pending").await;
    let first = repo.create_session(fixed_now()).await.unwrap();
    let second = repo.create_session(fixed_now()).await.unwrap();

    repo.save_pause(
        first,
        &PauseRecord::from_snapshot(snapshot(first.value(), 1)),
        fixed_now(),
    )
    .await
    .unwrap();
    repo.save_pause(
        second,
        &PauseRecord::from_snapshot(snapshot(second.value(), 1)),
        fixed_now() + Duration::minutes(1),
    )
    .await
    .unwrap();

    let pending = repo.pending_session().await.unwrap().unwrap();
    assert_eq!(pending.id, second);
    assert_eq!(
        repo.get_session(first).await.unwrap().status,
        SessionStatus::Active
    );
}

#[tokio::test]
async fn sqlite_final_report_stores_verb_errors() {
    let repo = connect("memdb_final").await;
    let id = repo.create_session(fixed_now()).await.unwrap();
    repo.save_pause(
        id,
        &PauseRecord::from_snapshot(snapshot(id.value(), 1)),
        fixed_now(),
    )
    .await
    .unwrap();

    let tally = BTreeMap::from([(VerbId::new(7), 2), (VerbId::new(2), 1)]);
    let report = SessionReport::new(3, 12, 15, &tally);
    repo.record_final(id, &report, fixed_now() + Duration::minutes(9))
        .await
        .unwrap();

    let row = repo.get_session(id).await.unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.completed_at, Some(fixed_now() + Duration::minutes(9)));
    assert_eq!(row.total_errors, 3);
    assert!(row.snapshot.is_none());
    assert_eq!(row.verb_errors, report.verb_errors);
    assert!(repo.pending_session().await.unwrap().is_none());

    let err = repo
        .save_pause(
            id,
            &PauseRecord::from_snapshot(snapshot(id.value(), 3)),
            fixed_now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_unknown_session_is_not_found() {
    let repo = connect("memdb_missing").await;
    let missing = verbs_core::model::SessionId::new(404);
    assert!(matches!(
        repo.get_session(missing).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert!(matches!(
        repo.mark_resumed(missing).await.unwrap_err(),
        StorageError::NotFound
    ));
}
