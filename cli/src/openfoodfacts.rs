use anyhow::{Context, Result};
use tracing::debug;

use pfc_core::models::FoodEstimate;
use pfc_core::openfoodfacts::{ProductResponse, product_to_estimate};
use pfc_core::service::BarcodeLookup;

const PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v0/product";

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
}

impl OpenFoodFactsClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "pfc-cli/{} (nutrient tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rt: tokio::runtime::Handle::current(),
        })
    }

    pub async fn lookup_barcode_async(&self, barcode: &str) -> Result<Option<FoodEstimate>> {
        let url = format!("{PRODUCT_URL}/{barcode}.json");
        debug!(%url, "looking up barcode");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach OpenFoodFacts API")?;

        let data: ProductResponse = resp
            .json()
            .await
            .context("Failed to parse OpenFoodFacts barcode response")?;

        if data.status != 1 {
            return Ok(None);
        }

        Ok(data.product.and_then(product_to_estimate))
    }
}

/// Blocks on the runtime; call from `tokio::task::block_in_place` when already inside it.
impl BarcodeLookup for OpenFoodFactsClient {
    fn lookup_barcode(&self, code: &str) -> Result<Option<FoodEstimate>> {
        self.rt.block_on(self.lookup_barcode_async(code))
    }
}
