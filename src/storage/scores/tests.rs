use super::*;
use crate::storage::model::TargetScore;
use tempfile::TempDir;

fn record(category: &str, scores: &[(&str, f32)]) -> PointRecord {
    PointRecord {
        category: category.to_string(),
        scores: scores
            .iter()
            .map(|(target, score)| TargetScore::new(*target, *score))
            .collect(),
    }
}

fn write_store(path: &Path, records: &[(&str, PointRecord)]) {
    let mut writer = ScoreStoreWriter::open(path).expect("writer should open");
    let mut txn = writer.begin();
    for (uid, record) in records {
        txn.put(uid, record).expect("put should succeed");
    }
    txn.commit().expect("commit should succeed");
}

#[test]
fn test_get_returns_record() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    let a = record("coding", &[("t1", 0.5), ("t2", 1.0)]);

    write_store(&path, &[("a", a.clone())]);

    let store = ScoreStore::open(&path).expect("store should open");
    assert_eq!(store.get("a").expect("a exists"), a);
    assert_eq!(store.collection(), "main");
    assert_eq!(store.len(), 1);
    assert!(!store.is_empty());
    assert!(store.contains("a"));
    assert!(!store.contains("b"));
}

#[test]
fn test_miss_names_uid() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    write_store(&path, &[("a", record("c1", &[("t1", 0.5)]))]);

    let store = ScoreStore::open(&path).expect("store should open");
    let err = store.get("missing-uid").unwrap_err();

    assert!(matches!(err, StoreError::NotFound { ref uid } if uid == "missing-uid"));
    assert_eq!(err.to_string(), "point UID 'missing-uid' not found");
}

#[test]
fn test_empty_batch_creates_empty_store() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    write_store(&path, &[]);

    let store = ScoreStore::open(&path).expect("store should open");
    assert!(store.is_empty());
    assert_eq!(store.point_count(), 0);
}

#[test]
fn test_iter_in_uid_order() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    write_store(
        &path,
        &[
            ("b", record("c2", &[("t1", 0.1)])),
            ("a", record("c1", &[("t1", 0.2)])),
        ],
    );

    let store = ScoreStore::open(&path).expect("store should open");
    let items: Vec<(String, PointRecord)> = store
        .iter()
        .collect::<StoreResult<_>>()
        .expect("iteration should succeed");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].0, "a");
    assert_eq!(items[1].0, "b");
    assert_eq!(items[1].1.category, "c2");
}

#[test]
fn test_writer_sees_committed_records() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    write_store(&path, &[("a", record("c1", &[]))]);

    let writer = ScoreStoreWriter::open(&path).expect("writer should open");
    let existing = writer.get("a").expect("decode should succeed");
    assert_eq!(existing.map(|r| r.category), Some("c1".to_string()));
    assert!(writer.get("b").expect("decode should succeed").is_none());
}

#[test]
fn test_reader_unaffected_by_later_commit() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scores.db");
    write_store(&path, &[("a", record("c1", &[("t1", 0.5)]))]);

    let store = ScoreStore::open(&path).expect("store should open");
    write_store(&path, &[("b", record("c2", &[("t2", 0.5)]))]);

    assert_eq!(store.len(), 1);
    assert!(!store.contains("b"));

    let reopened = ScoreStore::open(&path).expect("store should reopen");
    assert_eq!(reopened.len(), 2);
}

#[test]
fn test_mock_lookup() {
    let mock = MockScoreStore::new();
    mock.insert_scores("a", "c1", &[("t1", 0.5)]);

    assert_eq!(mock.point_count(), 1);
    assert_eq!(mock.lookup("a").expect("present").scores[0].target, "t1");
    assert!(matches!(
        mock.lookup("b"),
        Err(StoreError::NotFound { .. })
    ));

    mock.remove("a");
    assert_eq!(mock.point_count(), 0);
}
