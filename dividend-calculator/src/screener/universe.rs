//! Index constituent lists that make up the scrape universe.

use serde::Deserialize;
use std::path::Path;

use super::Result;

/// Listing currency whose Yahoo code is used for FTSE 100 constituents.
const FTSE_LISTING_CURRENCY: &str = "GBP";

/// Constituent lists shipped with the binary.
const BUNDLED_UNIVERSE: &str = include_str!("../../data/universe.json");

/// One exchange listing of a constituent.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub yahoo: String,
    pub currency: String,
}

/// One index constituent.
#[derive(Debug, Clone, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    #[serde(default)]
    pub symbols: Vec<Listing>,
}

/// FTSE 100 and S&P 500 constituents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Universe {
    #[serde(rename = "FTSE 100", default)]
    pub ftse_100: Vec<Constituent>,
    #[serde(rename = "S&P 500", default)]
    pub snp_500: Vec<Constituent>,
}

impl Universe {
    /// The FTSE 100 and S&P 500 lists bundled into the binary.
    pub fn bundled() -> Result<Self> {
        Ok(serde_json::from_str(BUNDLED_UNIVERSE)?)
    }

    /// Load a universe file. A missing file is an empty universe.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Universe file not found, using an empty universe");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Yahoo codes of the GBP listings of FTSE 100 constituents.
    pub fn ftse_100_symbols(&self) -> Vec<String> {
        self.ftse_100
            .iter()
            .flat_map(|c| &c.symbols)
            .filter(|l| l.currency == FTSE_LISTING_CURRENCY)
            .map(|l| l.yahoo.clone())
            .collect()
    }

    pub fn snp_500_symbols(&self) -> Vec<String> {
        self.snp_500.iter().map(|c| c.symbol.clone()).collect()
    }

    /// FTSE 100 symbols followed by S&P 500 symbols.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols = self.ftse_100_symbols();
        symbols.extend(self.snp_500_symbols());
        symbols
    }
}
