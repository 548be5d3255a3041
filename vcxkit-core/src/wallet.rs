//! Non-secret wallet records and record search.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    handle::{Handle, HandleKind, SlotKind},
    session::Session,
    VcxKitResult,
};

/// Options used when the caller has no preference.
pub const DEFAULT_RECORD_OPTIONS: &str =
    r#"{"retrieveType":false,"retrieveValue":true,"retrieveTags":false}"#;

/// Marker for wallet search handles.
#[derive(Debug)]
pub struct WalletSearchKind;

impl HandleKind for WalletSearchKind {
    const SLOT: SlotKind = SlotKind::WalletSearch;
}

/// Record operations on the session's wallet.
#[derive(Debug, Clone)]
pub struct Wallet {
    session: Arc<Session>,
}

impl Wallet {
    #[must_use]
    pub const fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Adds a record. `tags` is a flat JSON object of string values.
    ///
    /// # Errors
    /// Duplicate record, malformed tags or engine failure.
    pub async fn add_record(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
        tags: Option<&str>,
    ) -> VcxKitResult<()> {
        let tags = tags.unwrap_or("{}");
        self.session
            .call("vcx_wallet_add_record", |engine, command, callback| {
                engine.wallet_add_record(command, record_type, id, value, tags, callback)
            })
            .await
    }

    /// Reads a record as JSON. `options` selects which parts are returned.
    ///
    /// # Errors
    /// Missing record or engine failure.
    pub async fn get_record(
        &self,
        record_type: &str,
        id: &str,
        options: Option<&str>,
    ) -> VcxKitResult<String> {
        let options = options.unwrap_or(DEFAULT_RECORD_OPTIONS);
        self.session
            .call("vcx_wallet_get_record", |engine, command, callback| {
                engine.wallet_get_record(command, record_type, id, options, callback)
            })
            .await
    }

    /// Replaces a record's value.
    ///
    /// # Errors
    /// Missing record or engine failure.
    pub async fn update_record_value(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
    ) -> VcxKitResult<()> {
        self.session
            .call("vcx_wallet_update_record_value", |engine, command, callback| {
                engine.wallet_update_record_value(command, record_type, id, value, callback)
            })
            .await
    }

    /// Deletes a record.
    ///
    /// # Errors
    /// Missing record or engine failure.
    pub async fn delete_record(&self, record_type: &str, id: &str) -> VcxKitResult<()> {
        self.session
            .call("vcx_wallet_delete_record", |engine, command, callback| {
                engine.wallet_delete_record(command, record_type, id, callback)
            })
            .await
    }

    /// Opens a search over records of `record_type` matching `query`, a flat JSON
    /// object of tag values (`{}` matches every record).
    ///
    /// # Errors
    /// Malformed query or engine failure.
    pub async fn open_search(
        &self,
        record_type: &str,
        query: &str,
        options: Option<&str>,
    ) -> VcxKitResult<WalletSearch> {
        let options = options.unwrap_or("{}");
        let raw: u32 = self
            .session
            .call("vcx_wallet_open_search", |engine, command, callback| {
                engine.wallet_open_search(command, record_type, query, options, callback)
            })
            .await?;
        let handle = self.session.registry().register::<WalletSearchKind>(raw)?;
        Ok(WalletSearch {
            session: Arc::clone(&self.session),
            handle: Some(handle),
        })
    }
}

/// One batch of search results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBatch {
    pub total_count: Option<u64>,
    pub records: Option<Vec<Value>>,
}

/// An open wallet search.
#[derive(Debug)]
pub struct WalletSearch {
    session: Arc<Session>,
    handle: Option<Handle<WalletSearchKind>>,
}

impl WalletSearch {
    /// The raw search handle, after checking it is still open.
    ///
    /// # Errors
    /// `INVALID_WALLET_HANDLE` when the search was closed or the session shut down.
    pub fn live_handle(&self) -> VcxKitResult<u32> {
        self.session
            .registry()
            .validate(self.handle.as_ref())
            .map(|handle| handle.raw())
    }

    /// The next `count` records as JSON (`{"totalCount":n,"records":[..]|null}`).
    /// `records` is null once the search is exhausted.
    ///
    /// # Errors
    /// Closed search or engine failure.
    pub async fn next_records(&self, count: u32) -> VcxKitResult<String> {
        let search = self.live_handle()?;
        self.session
            .call("vcx_wallet_search_next_records", |engine, command, callback| {
                engine.wallet_search_next_records(command, search, count, callback)
            })
            .await
    }

    /// [`Self::next_records`], parsed.
    ///
    /// # Errors
    /// See [`Self::next_records`].
    pub async fn next_batch(&self, count: u32) -> VcxKitResult<SearchBatch> {
        let batch = self.next_records(count).await?;
        Ok(serde_json::from_str(&batch)?)
    }

    /// Closes the search. Closing twice fails the second time without reaching the
    /// engine.
    ///
    /// # Errors
    /// Closed search or engine failure.
    pub async fn close(&self) -> VcxKitResult<()> {
        let handle = self.session.registry().validate(self.handle.as_ref())?;
        self.session.registry().release(&handle)?;
        let search = handle.raw();
        self.session
            .call("vcx_wallet_close_search", |engine, command, callback| {
                engine.wallet_close_search(command, search, callback)
            })
            .await
    }
}
