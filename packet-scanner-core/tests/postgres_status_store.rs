//! Requires a disposable Postgres database:
//! `DATABASE_URL=postgres://... cargo test -p packet-scanner-core -- --ignored`

#![cfg(feature = "database")]

use packet_scanner_core::{
    domain::{PacketId, PacketStatus, PacketStatusRecord},
    infrastructure::PostgresStatusStore,
    ports::StatusStore,
};

async fn store() -> PostgresStatusStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PostgresStatusStore::connect(&url, 2)
        .await
        .expect("connect to Postgres");
    store.migrate().await.expect("migrations");
    store
}

fn unique_id(tag: &str) -> PacketId {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .expect("timestamp in range");
    PacketId::new(format!("it-{tag}-{nanos}")).unwrap()
}

#[tokio::test]
#[ignore = "needs a Postgres database"]
async fn quarantine_round_trip() {
    let store = store().await;
    store.health_check().await.unwrap();

    let id = unique_id("quarantine");
    let record = PacketStatusRecord::awaiting_scan(id.clone(), "REGISTRATION_CLIENT");
    assert!(store.register(&record).await.unwrap());
    assert!(!store.register(&record).await.unwrap());

    let listed = store
        .list_by_status(PacketStatus::AwaitingScan)
        .await
        .unwrap();
    assert!(listed.iter().any(|r| r.id == id && r.retry_count.is_none()));

    store
        .update(&record.into_quarantined("PACKET_SCANNER_JOB"))
        .await
        .unwrap();

    let stored = store.find(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, PacketStatus::ScanRetry);
    assert_eq!(stored.retry_count, Some(1));
    assert_eq!(stored.updated_by.as_deref(), Some("PACKET_SCANNER_JOB"));
    assert!(stored.updated_at.is_some());
}

#[tokio::test]
#[ignore = "needs a Postgres database"]
async fn update_of_unknown_packet_is_store_unavailable() {
    let store = store().await;
    let record = PacketStatusRecord::awaiting_scan(unique_id("ghost"), "test");

    let err = store.update(&record).await.unwrap_err();
    assert_eq!(err.kind(), packet_scanner_core::FailureKind::StoreUnavailable);
}
