use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::CoreError;

/// Broker API credentials for one account, stored as a JSON secret file.
///
/// The file schema matches what the provisioning CLI writes: one file per
/// account, readable by the dashboard process at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerCredentials {
    /// HTS login id.
    pub id: String,

    /// Application key issued by the broker.
    #[serde(rename = "appkey")]
    pub app_key: String,

    /// Application secret issued by the broker.
    #[serde(rename = "secretkey")]
    pub app_secret: String,

    /// Account number, usually "XXXXXXXX-XX".
    #[serde(rename = "account")]
    pub account_number: String,

    /// True for a virtual (paper-trading) account.
    #[serde(rename = "virtual", default)]
    pub virtual_account: bool,
}

impl BrokerCredentials {
    /// Load credentials from a JSON secret file.
    ///
    /// A missing file is the distinct `MissingCredential` error so that
    /// service initialization can degrade to disconnected state instead
    /// of treating it like a corrupt file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::MissingCredential(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::Deserialization(format!(
                "Invalid credential file {}: {e}",
                path.display()
            ))
        })
    }

    /// Write credentials to a JSON secret file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize credentials: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Split the account number into the broker's (account, product-code)
    /// pair. Accepts both "12345678-01" and a bare 10-digit string.
    #[must_use]
    pub fn account_parts(&self) -> (String, String) {
        if let Some((cano, prdt)) = self.account_number.split_once('-') {
            (cano.to_string(), prdt.to_string())
        } else if self.account_number.len() > 8 {
            let (cano, prdt) = self.account_number.split_at(8);
            (cano.to_string(), prdt.to_string())
        } else {
            (self.account_number.clone(), "01".to_string())
        }
    }
}
