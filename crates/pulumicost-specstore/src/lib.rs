//! Read-only lookup over local YAML price sheets (spec §4.2, C2 Spec
//! Store). Scans a directory once at construction — mirrors the teacher's
//! directory-walk-then-index shape in `nclav_config::load_enclaves` — and
//! answers `(provider, service, sku)` lookups with no I/O afterward.

pub mod error;

use std::collections::BTreeMap;
use std::path::Path;

use pulumicost_domain::{PricingSpec, ResourceDescriptor};
use tracing::{debug, warn};

pub use error::SpecStoreError;

/// Property keys checked in priority order to recover a resource's SKU
/// (§4.2). The last resort is the type token's trailing `:Kind` segment.
const SKU_KEYS: &[&str] = &["instanceType", "vmSize", "machineType", "dbInstanceClass", "sku"];

/// Fallback SKUs tried, in order, when the descriptor's own SKU has no
/// matching spec (§4.2 lookup order, step 3).
const FALLBACK_SKUS: &[&str] = &["standard", "basic", "default"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Compute,
    Database,
    Storage,
}

impl Category {
    /// Category default monthly cost in the configured currency (§4.2).
    fn default_monthly(self) -> f64 {
        match self {
            Category::Compute => 20.0,
            Category::Database => 50.0,
            Category::Storage => 5.0,
        }
    }
}

/// A read-only, in-memory index of `PricingSpec`s keyed by
/// `(provider, service, sku)`, built by scanning a directory of
/// `<provider>-<service>-<sku>.yaml` files.
pub struct SpecStore {
    specs: BTreeMap<(String, String, String), PricingSpec>,
}

impl SpecStore {
    /// Scan `dir` for `<provider>-<service>-<sku>.yaml` files and build the
    /// index. A missing directory is not an error (mirrors the Plugin
    /// Registry's "missing root → empty" rule in §4.3) — returns an empty
    /// store.
    pub fn load(dir: &Path) -> Result<Self, SpecStoreError> {
        let mut specs = BTreeMap::new();

        if !dir.exists() {
            debug!(dir = %dir.display(), "spec directory does not exist; starting with an empty store");
            return Ok(SpecStore { specs });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| SpecStoreError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| SpecStoreError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }

            let content = std::fs::read_to_string(&path).map_err(|e| SpecStoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            let spec: PricingSpec = match serde_yaml::from_str(&content) {
                Ok(s) => s,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed pricing spec");
                    continue;
                }
            };

            let key = (spec.provider.clone(), spec.service.clone(), spec.sku.clone());
            specs.insert(key, spec);
        }

        debug!(count = specs.len(), "loaded pricing specs");
        Ok(SpecStore { specs })
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Resolve a spec for a descriptor following the lookup order in §4.2:
    /// exact SKU, then `(provider, service, "default")`, then the common
    /// fallback SKUs in order.
    pub fn lookup(&self, descriptor: &ResourceDescriptor) -> Option<&PricingSpec> {
        let service = service_of(&descriptor.resource_type)?;
        let sku = sku_of(descriptor)?;

        if let Some(spec) = self.specs.get(&(descriptor.provider.clone(), service.clone(), sku)) {
            return Some(spec);
        }
        if let Some(spec) = self.specs.get(&(descriptor.provider.clone(), service.clone(), "default".to_string())) {
            return Some(spec);
        }
        for fallback in FALLBACK_SKUS {
            if let Some(spec) = self.specs.get(&(descriptor.provider.clone(), service.clone(), fallback.to_string())) {
                return Some(spec);
            }
        }
        None
    }

    /// Derive a monthly/hourly estimate from a matched spec (§4.2 "Cost
    /// derivation"), or `None` if no spec matches at all — the caller (the
    /// Engine) falls back to the category default or the `none` adapter.
    pub fn estimate(&self, descriptor: &ResourceDescriptor) -> Option<Estimate> {
        let spec = self.lookup(descriptor)?;
        let category = category_of(&descriptor.resource_type);

        if let Some(monthly) = spec.pricing.monthly_estimate {
            return Some(Estimate { monthly, hourly: monthly / 730.0, currency: spec.currency.clone() });
        }
        if let Some(hourly) = spec.pricing.on_demand_hourly {
            return Some(Estimate { monthly: hourly * 730.0, hourly, currency: spec.currency.clone() });
        }
        if category == Category::Storage {
            if let Some(per_gb) = spec.pricing.price_per_gb_month {
                let size = descriptor
                    .first_present(&["sizeGb", "size", "allocatedStorage"])
                    .and_then(|(_, v)| v.as_f64())
                    .unwrap_or(DEFAULT_STORAGE_SIZE_GB);
                let monthly = per_gb * size;
                return Some(Estimate { monthly, hourly: monthly / 730.0, currency: spec.currency.clone() });
            }
        }

        Some(Estimate {
            monthly: category.default_monthly(),
            hourly: category.default_monthly() / 730.0,
            currency: spec.currency.clone(),
        })
    }
}

const DEFAULT_STORAGE_SIZE_GB: f64 = 100.0;

/// A derived cost estimate before it's wrapped into a `CostResult` by the
/// Engine (which also knows the resource id/type and `adapter` label).
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub monthly: f64,
    pub hourly: f64,
    pub currency: String,
}

/// Parse the service out of a type token's middle segment
/// (`provider:service/sub:Kind` → `service`), per §4.2.
fn service_of(resource_type: &str) -> Option<String> {
    let mid = resource_type.split(':').nth(1)?;
    let service = mid.split('/').next()?;
    if service.is_empty() {
        None
    } else {
        Some(service.to_string())
    }
}

/// Category classification used for the compute/database/storage default
/// (§4.2). Derived from the service token and the type's trailing `Kind`.
fn category_of(resource_type: &str) -> Category {
    let lower = resource_type.to_lowercase();
    if lower.contains("bucket") || lower.contains("volume") || lower.contains("disk") || lower.contains("storage") {
        Category::Storage
    } else if lower.contains("rds") || lower.contains("database") || lower.contains("sql") || lower.contains("db") {
        Category::Database
    } else {
        Category::Compute
    }
}

/// Recover the SKU from a descriptor's well-known property keys, falling
/// back to the type token's trailing `:Kind` segment (§4.2).
fn sku_of(descriptor: &ResourceDescriptor) -> Option<String> {
    if let Some((_, value)) = descriptor.first_present(SKU_KEYS) {
        if let Some(s) = value.as_str() {
            return Some(s.to_string());
        }
    }
    descriptor.resource_type.rsplit(':').next().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::Value;
    use std::collections::BTreeMap as Map;

    fn descriptor_with(resource_type: &str, props: &[(&str, Value)]) -> ResourceDescriptor {
        let mut properties = Map::new();
        for (k, v) in props {
            properties.insert(k.to_string(), v.clone());
        }
        ResourceDescriptor::new(resource_type, "urn:test").with_properties(properties)
    }

    #[test]
    fn service_of_splits_middle_segment_on_slash() {
        assert_eq!(service_of("aws:ec2/instance:Instance"), Some("ec2".to_string()));
    }

    #[test]
    fn missing_directory_yields_empty_store() {
        let store = SpecStore::load(Path::new("/no/such/spec/dir")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn exact_match_then_default_then_fallback_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("aws-ec2-default.yaml"),
            "provider: aws\nservice: ec2\nsku: default\ncurrency: USD\npricing:\n  onDemandHourly: 0.02\n",
        )
        .unwrap();
        let store = SpecStore::load(dir.path()).unwrap();

        let d = descriptor_with("aws:ec2/instance:Instance", &[("instanceType", Value::String("m5.large".into()))]);
        let est = store.estimate(&d).unwrap();
        assert!((est.hourly - 0.02).abs() < 1e-9);
    }

    #[test]
    fn s1_scenario_ondemand_hourly_times_730() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("aws-ec2-t3.micro.yaml"),
            "provider: aws\nservice: ec2\nsku: t3.micro\ncurrency: USD\npricing:\n  onDemandHourly: 0.0104\n",
        )
        .unwrap();
        let store = SpecStore::load(dir.path()).unwrap();

        let d = descriptor_with("aws:ec2/instance:Instance", &[("instanceType", Value::String("t3.micro".into()))]);
        let est = store.estimate(&d).unwrap();
        assert!((est.monthly - 7.592).abs() < 1e-6);
        assert_eq!(est.currency, "USD");
    }

    #[test]
    fn no_matching_spec_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpecStore::load(dir.path()).unwrap();
        let d = descriptor_with("aws:ec2/instance:Instance", &[("instanceType", Value::String("t3.micro".into()))]);
        assert!(store.estimate(&d).is_none());
    }

    #[test]
    fn storage_uses_price_per_gb_times_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("aws-s3-default.yaml"),
            "provider: aws\nservice: s3\nsku: default\ncurrency: USD\npricing:\n  pricePerGBMonth: 0.023\n",
        )
        .unwrap();
        let store = SpecStore::load(dir.path()).unwrap();
        let d = descriptor_with("aws:s3/bucket:Bucket", &[("size", Value::Number(200.0))]);
        let est = store.estimate(&d).unwrap();
        assert!((est.monthly - 4.6).abs() < 1e-9);
    }
}
