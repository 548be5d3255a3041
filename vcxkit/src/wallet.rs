use std::sync::Arc;

use vcxkit_core::{wallet, VcxKitError};

use crate::VcxSession;

/// Non-secret records in the session's wallet.
#[derive(Debug, uniffi::Object)]
pub struct Wallet(wallet::Wallet);

#[uniffi::export(async_runtime = "tokio")]
impl Wallet {
    #[uniffi::constructor]
    #[must_use]
    pub fn new(session: &VcxSession) -> Self {
        Self(wallet::Wallet::new(session.core()))
    }

    /// # Errors
    /// Duplicate record, malformed tags or engine failure.
    pub async fn add_record(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
        tags: Option<String>,
    ) -> Result<(), VcxKitError> {
        self.0
            .add_record(record_type, id, value, tags.as_deref())
            .await
    }

    /// # Errors
    /// Missing record or engine failure.
    pub async fn get_record(
        &self,
        record_type: &str,
        id: &str,
        options: Option<String>,
    ) -> Result<String, VcxKitError> {
        self.0.get_record(record_type, id, options.as_deref()).await
    }

    /// # Errors
    /// Missing record or engine failure.
    pub async fn update_record_value(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
    ) -> Result<(), VcxKitError> {
        self.0.update_record_value(record_type, id, value).await
    }

    /// # Errors
    /// Missing record or engine failure.
    pub async fn delete_record(&self, record_type: &str, id: &str) -> Result<(), VcxKitError> {
        self.0.delete_record(record_type, id).await
    }

    /// # Errors
    /// Malformed query or engine failure.
    pub async fn open_search(
        &self,
        record_type: &str,
        query: &str,
        options: Option<String>,
    ) -> Result<Arc<WalletSearch>, VcxKitError> {
        let search = self
            .0
            .open_search(record_type, query, options.as_deref())
            .await?;
        Ok(Arc::new(WalletSearch(search)))
    }
}

/// An open record search.
#[derive(Debug, uniffi::Object)]
pub struct WalletSearch(wallet::WalletSearch);

#[uniffi::export(async_runtime = "tokio")]
impl WalletSearch {
    /// The next `count` records as `{"totalCount":n,"records":[..]|null}`.
    ///
    /// # Errors
    /// Closed search or engine failure.
    pub async fn next_records(&self, count: u32) -> Result<String, VcxKitError> {
        self.0.next_records(count).await
    }

    /// # Errors
    /// The search was already closed.
    pub async fn close(&self) -> Result<(), VcxKitError> {
        self.0.close().await
    }
}
