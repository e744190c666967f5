use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A persisted YAML price-sheet entry, read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSpec {
    pub provider: String,
    pub service: String,
    pub sku: String,
    pub currency: String,
    pub pricing: PricingDetail,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingDetail {
    #[serde(rename = "onDemandHourly", alias = "hourlyRate")]
    pub on_demand_hourly: Option<f64>,
    #[serde(rename = "reservedHourly")]
    pub reserved_hourly: Option<f64>,
    #[serde(rename = "spotHourly")]
    pub spot_hourly: Option<f64>,
    #[serde(rename = "monthlyEstimate")]
    pub monthly_estimate: Option<f64>,
    #[serde(rename = "pricePerGBMonth")]
    pub price_per_gb_month: Option<f64>,
}
