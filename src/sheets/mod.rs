//! Google Sheets backing store.

pub mod client;
pub mod rows;
pub mod store;
pub mod token;

pub use client::SheetsClient;
pub use store::SheetsStore;
pub use token::{ServiceAccountKey, TokenSource};

use crate::config::SheetsConfig;
use crate::store::{StoreError, StoreResult};

/// Build the spreadsheet store from configuration.
///
/// A static `GOOGLE_ACCESS_TOKEN` takes precedence over the service account.
pub fn store_from_config(config: &SheetsConfig) -> StoreResult<SheetsStore> {
    let spreadsheet_id = config
        .spreadsheet_id
        .clone()
        .ok_or_else(|| StoreError::ConfigMissing("SHEET_ID is missing".to_string()))?;

    let tokens = match (&config.access_token, &config.service_account_json) {
        (Some(token), _) => TokenSource::Static(token.clone()),
        (None, Some(raw)) => TokenSource::service_account(ServiceAccountKey::from_json(raw)?),
        (None, None) => {
            return Err(StoreError::ConfigMissing(
                "GOOGLE_SERVICE_ACCOUNT_JSON is missing".to_string(),
            ))
        }
    };

    let client = SheetsClient::new(&config.api_base, spreadsheet_id, tokens)?;
    Ok(SheetsStore::new(client, config.members_tab.clone(), config.groups_tab.clone()))
}
