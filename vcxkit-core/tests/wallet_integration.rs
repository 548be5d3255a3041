mod common;

use serde_json::{json, Value};
use tokio_test::assert_ok;
use vcxkit_core::{wallet::Wallet, CommunicationMethod, ErrorKind, NativeCode};

async fn seeded_wallet() -> Wallet {
    let session = common::session(CommunicationMethod::Proprietary);
    let wallet = Wallet::new(session);
    for (id, colour) in [("c", "red"), ("a", "red"), ("b", "blue"), ("d", "red")] {
        let tags = json!({ "colour": colour }).to_string();
        wallet
            .add_record("note", id, &format!("value-{id}"), Some(&tags))
            .await
            .unwrap();
    }
    wallet
        .add_record("other", "a", "elsewhere", None)
        .await
        .unwrap();
    wallet
}

fn ids(records: &[Value]) -> Vec<&str> {
    records.iter().filter_map(|record| record["id"].as_str()).collect()
}

#[tokio::test]
async fn test_record_crud() -> eyre::Result<()> {
    let wallet = seeded_wallet().await;

    let record: Value = serde_json::from_str(&wallet.get_record("note", "a", None).await?)?;
    assert_eq!(record["id"], "a");
    assert_eq!(record["value"], "value-a");
    assert_eq!(record["tags"], Value::Null);

    wallet.update_record_value("note", "a", "changed").await?;
    let options = r#"{"retrieveType":true,"retrieveValue":true,"retrieveTags":true}"#;
    let record: Value = serde_json::from_str(&wallet.get_record("note", "a", Some(options)).await?)?;
    assert_eq!(record["type"], "note");
    assert_eq!(record["value"], "changed");
    assert_eq!(record["tags"], json!({ "colour": "red" }));

    assert_ok!(wallet.delete_record("note", "a").await);
    let error = wallet.get_record("note", "a", None).await.unwrap_err();
    assert_eq!(error.code(), NativeCode::WALLET_RECORD_NOT_FOUND.0);
    assert_eq!(error.kind(), ErrorKind::CallbackError);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_and_missing_records() {
    let wallet = seeded_wallet().await;

    let error = wallet.add_record("note", "a", "again", None).await.unwrap_err();
    assert_eq!(error.code(), NativeCode::DUPLICATE_WALLET_RECORD.0);

    for error in [
        wallet.update_record_value("note", "zz", "v").await.unwrap_err(),
        wallet.delete_record("note", "zz").await.unwrap_err(),
    ] {
        assert_eq!(error.code(), NativeCode::WALLET_RECORD_NOT_FOUND.0);
    }

    let error = wallet
        .add_record("note", "e", "v", Some("not json"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidJson);
}

#[tokio::test]
async fn test_search_pages_in_stable_order() -> eyre::Result<()> {
    let wallet = seeded_wallet().await;

    let search = wallet.open_search("note", r#"{"colour":"red"}"#, None).await?;
    let first = search.next_batch(2).await?;
    assert_eq!(first.total_count, Some(3));
    let first = first.records.unwrap_or_default();
    assert_eq!(ids(&first), ["a", "c"]);

    let second = search.next_batch(2).await?.records.unwrap_or_default();
    assert_eq!(ids(&second), ["d"]);

    // Exhausted.
    let done = search.next_batch(2).await?;
    assert_eq!(done.records, None);
    search.close().await?;

    // Reopening yields the same order.
    let again = wallet.open_search("note", r#"{"colour":"red"}"#, None).await?;
    let all = again.next_batch(10).await?.records.unwrap_or_default();
    assert_eq!(ids(&all), ["a", "c", "d"]);
    again.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_empty_query_matches_every_record_of_the_type() -> eyre::Result<()> {
    let wallet = seeded_wallet().await;
    let search = wallet.open_search("note", "{}", None).await?;
    let batch = search.next_batch(10).await?;
    assert_eq!(batch.total_count, Some(4));
    assert_eq!(ids(&batch.records.unwrap_or_default()), ["a", "b", "c", "d"]);

    let error = wallet.open_search("note", "[]", None).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidJson);
    Ok(())
}

#[tokio::test]
async fn test_closed_search_is_invalid() {
    let wallet = seeded_wallet().await;
    let search = wallet.open_search("note", "{}", None).await.unwrap();
    search.close().await.unwrap();

    let error = search.next_records(1).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
    assert_eq!(error.code(), NativeCode::INVALID_WALLET_HANDLE.0);

    let error = search.close().await.unwrap_err();
    assert_eq!(error.code(), NativeCode::INVALID_WALLET_HANDLE.0);
}
