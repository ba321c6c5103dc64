use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use worthwatch::storage::{JsonFileSnapshotStore, SaveOutcome, SnapshotRecord, SnapshotStore};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn record(d: u32, total: i64) -> SnapshotRecord {
    SnapshotRecord {
        date: day(d),
        brokerage_value: Decimal::from(total / 2),
        crypto_value: Decimal::from(total - total / 2),
        bullion_value: Decimal::ZERO,
        total_value: Decimal::from(total),
        conversion_rate: Decimal::new(17346, 4),
        reporting_currency: "BGN".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, d, 8, 30, 0).unwrap(),
    }
}

#[tokio::test]
async fn save_is_an_upsert_per_day() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());

    assert_eq!(store.save_snapshot(&record(1, 1000)).await?, SaveOutcome::Created);
    assert_eq!(store.save_snapshot(&record(1, 1500)).await?, SaveOutcome::Replaced);

    let snapshots = store.list_snapshots().await?;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].total_value, Decimal::from(1500));
    assert!(dir.path().join("snapshots").join("2024-05-01.json").exists());

    Ok(())
}

#[tokio::test]
async fn empty_store_has_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());

    assert!(store.list_snapshots().await?.is_empty());
    assert!(store.latest_snapshot().await?.is_none());
    assert!(store.snapshot_for(day(1)).await?.is_none());
    assert_eq!(store.delete_before(day(30)).await?, 0);

    Ok(())
}

#[tokio::test]
async fn queries_are_ordered_and_inclusive() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());
    for (d, total) in [(5, 500), (1, 100), (3, 300), (2, 200), (4, 400)] {
        store.save_snapshot(&record(d, total)).await?;
    }

    let latest = store.latest_snapshot().await?.unwrap();
    assert_eq!(latest.date, day(5));

    let range = store.snapshots_between(day(2), day(4)).await?;
    let dates: Vec<_> = range.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(2), day(3), day(4)]);

    let third = store.snapshot_for(day(3)).await?.unwrap();
    assert_eq!(third, record(3, 300));

    Ok(())
}

#[tokio::test]
async fn delete_before_removes_strictly_older_days() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());
    for d in 1..=5 {
        store.save_snapshot(&record(d, 100)).await?;
    }

    assert_eq!(store.delete_before(day(3)).await?, 2);

    let dates: Vec<_> = store
        .list_snapshots()
        .await?
        .iter()
        .map(|s| s.date)
        .collect();
    assert_eq!(dates, vec![day(3), day(4), day(5)]);

    Ok(())
}

#[tokio::test]
async fn skips_corrupt_and_foreign_files() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());
    store.save_snapshot(&record(1, 100)).await?;

    let snapshots_dir = dir.path().join("snapshots");
    std::fs::write(snapshots_dir.join("2024-05-02.json"), "{ not json")?;
    std::fs::write(snapshots_dir.join("notes.json"), "{}")?;
    std::fs::write(snapshots_dir.join("README"), "hello")?;

    let snapshots = store.list_snapshots().await?;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].date, day(1));

    assert!(store.snapshot_for(day(2)).await.is_err());

    Ok(())
}

#[tokio::test]
async fn file_name_is_the_day_key() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileSnapshotStore::new(dir.path());
    store.save_snapshot(&record(1, 100)).await?;

    // A copy under another day's name answers for that day.
    let snapshots_dir = dir.path().join("snapshots");
    std::fs::copy(
        snapshots_dir.join("2024-05-01.json"),
        snapshots_dir.join("2024-05-07.json"),
    )?;

    let copied = store.snapshot_for(day(7)).await?.unwrap();
    assert_eq!(copied.date, day(7));
    assert_eq!(store.list_snapshots().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn save_reports_unreadable_snapshot_location() -> Result<()> {
    let dir = TempDir::new()?;
    // A plain file where the snapshots directory should be.
    std::fs::write(dir.path().join("snapshots"), "not a directory")?;
    let store = JsonFileSnapshotStore::new(dir.path());

    let err = store.save_snapshot(&record(1, 100)).await.unwrap_err();

    assert!(
        format!("{err:#}").contains("Failed to check for existing snapshot"),
        "error was: {err:#}"
    );
    Ok(())
}
