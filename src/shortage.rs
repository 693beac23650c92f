//! Inventory shortage lookups.
//!
//! The inventory subsystem is an external collaborator. The engine asks it
//! whether a hanger is short of material and records the answer on the
//! assignment. The answer is advisory: failures and timeouts count as "no
//! shortage" and never abort a placement.
//!
//! Configuration is via environment variables:
//! - `CREWCAP_INVENTORY_URL` - Base URL of the inventory API (unset disables lookups)
//! - `CREWCAP_INVENTORY_API_KEY` - Bearer token for the inventory API (optional)

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Shortage lookup errors.
#[derive(Debug, Error)]
pub enum ShortageError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inventory returned {0}")]
    Status(StatusCode),
}

/// Side-effect-free query against inventory.
#[async_trait]
pub trait ShortageEvaluator: Send + Sync {
    async fn has_shortage(&self, hanger_id: Uuid) -> Result<bool, ShortageError>;
}

/// Build the evaluator described by the environment.
pub fn from_env() -> Arc<dyn ShortageEvaluator> {
    match std::env::var("CREWCAP_INVENTORY_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let api_key = std::env::var("CREWCAP_INVENTORY_API_KEY").ok();
            tracing::info!("Inventory shortage lookups enabled against {}", url);
            Arc::new(HttpShortageEvaluator::new(url, api_key))
        }
        _ => Arc::new(NoShortages),
    }
}

/// Reports no shortages. Used when no inventory system is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShortages;

#[async_trait]
impl ShortageEvaluator for NoShortages {
    async fn has_shortage(&self, _hanger_id: Uuid) -> Result<bool, ShortageError> {
        Ok(false)
    }
}

/// In-memory shortage list, flagged and cleared by hanger.
#[derive(Debug, Clone, Default)]
pub struct FlaggedShortages {
    hangers: Arc<RwLock<HashSet<Uuid>>>,
}

impl FlaggedShortages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, hanger_id: Uuid) {
        self.hangers
            .write()
            .expect("shortage list lock poisoned")
            .insert(hanger_id);
    }

    pub fn clear(&self, hanger_id: Uuid) {
        self.hangers
            .write()
            .expect("shortage list lock poisoned")
            .remove(&hanger_id);
    }
}

#[async_trait]
impl ShortageEvaluator for FlaggedShortages {
    async fn has_shortage(&self, hanger_id: Uuid) -> Result<bool, ShortageError> {
        Ok(self
            .hangers
            .read()
            .expect("shortage list lock poisoned")
            .contains(&hanger_id))
    }
}

#[derive(Debug, Deserialize)]
struct ShortageResponse {
    shortage: bool,
}

/// HTTP client for the inventory API.
///
/// Issues `GET {base_url}/hangers/{id}/shortage` and expects
/// `{"shortage": bool}`. A 404 means inventory does not track the hanger,
/// which is reported as no shortage.
#[derive(Debug, Clone)]
pub struct HttpShortageEvaluator {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpShortageEvaluator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ShortageEvaluator for HttpShortageEvaluator {
    async fn has_shortage(&self, hanger_id: Uuid) -> Result<bool, ShortageError> {
        let url = format!("{}/hangers/{}/shortage", self.base_url, hanger_id);
        let mut req = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        match response.status() {
            status if status.is_success() => {
                let body: ShortageResponse = response.json().await?;
                Ok(body.shortage)
            }
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ShortageError::Status(status)),
        }
    }
}
