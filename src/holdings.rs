//! Operator-maintained holdings: quantities of crypto assets and bullion.
//!
//! The file is plain JSON:
//!
//! ```json
//! {
//!   "crypto": { "BTC": 0.1, "ETH": 2.5 },
//!   "bullion": { "XAU": 3 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantities held, keyed by asset symbol (crypto) or metal code (bullion).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldingsSet {
    pub crypto: BTreeMap<String, Decimal>,
    pub bullion: BTreeMap<String, Decimal>,
}

impl HoldingsSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crypto(mut self, symbol: impl Into<String>, quantity: Decimal) -> Self {
        self.crypto.insert(symbol.into(), quantity);
        self
    }

    pub fn with_bullion(mut self, metal: impl Into<String>, quantity: Decimal) -> Self {
        self.bullion.insert(metal.into(), quantity);
        self
    }
}

/// Load holdings from a JSON file.
pub fn load_holdings(path: &Path) -> Result<HoldingsSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read holdings file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse holdings file: {}", path.display()))
}

/// Source of the current holdings, consulted once per valuation cycle.
#[async_trait::async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn load(&self) -> Result<HoldingsSet>;
}

/// Holdings re-read from a JSON file on every load, so edits take effect on
/// the next cycle without a restart.
#[derive(Debug, Clone)]
pub struct HoldingsFile {
    path: PathBuf,
}

impl HoldingsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl HoldingsSource for HoldingsFile {
    async fn load(&self) -> Result<HoldingsSet> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_holdings(&path))
            .await
            .context("Holdings loader task failed")?
    }
}

#[async_trait::async_trait]
impl HoldingsSource for HoldingsSet {
    async fn load(&self) -> Result<HoldingsSet> {
        Ok(self.clone())
    }
}
