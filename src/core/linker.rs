use crate::domain::model::LinkSummary;
use crate::domain::ports::{Filter, SalesTable, SelectQuery};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the owner-enrichment second stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub sales_table: String,
    pub parcels_table: String,
    /// Placeholder seller value acting as the idempotency key: only rows
    /// still carrying it are touched, so re-running the stage is safe.
    pub sentinel: String,
    pub seller_field: String,
    pub address_field: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            sales_table: "sales_transactions".to_string(),
            parcels_table: "parcels".to_string(),
            sentinel: "PROPERTY TRANSFER".to_string(),
            seller_field: "grantor".to_string(),
            address_field: "street_address".to_string(),
        }
    }
}

/// Enriches already-imported sales with owner data from the parcels table.
/// Runs after (and independently of) the import; invoked as its own
/// subcommand.
pub struct OwnerLinker {
    config: LinkConfig,
}

impl OwnerLinker {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, dest: &dyn SalesTable) -> Result<LinkSummary> {
        let mut summary = LinkSummary::default();

        let candidates = dest
            .select(
                &self.config.sales_table,
                SelectQuery::new().filter(Filter::Eq(
                    self.config.seller_field.clone(),
                    self.config.sentinel.clone(),
                )),
            )
            .await?;

        summary.candidates = candidates.len() as u64;
        tracing::info!(
            "Found {} sales still carrying the '{}' placeholder",
            summary.candidates,
            self.config.sentinel
        );

        for sale in &candidates {
            let (Some(id), Some(address)) = (sale.get("id"), sale.get_str(&self.config.address_field))
            else {
                summary.failed += 1;
                continue;
            };

            let parcels = match dest
                .select(
                    &self.config.parcels_table,
                    SelectQuery::new()
                        .filter(Filter::Ilike(
                            "address".to_string(),
                            format!("{}%", address),
                        ))
                        .limit(1),
                )
                .await
            {
                Ok(parcels) => parcels,
                Err(e) => {
                    tracing::warn!("Parcel lookup failed for '{}': {}", address, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let Some(parcel) = parcels.first() else {
                summary.unmatched += 1;
                continue;
            };

            let mut changes: HashMap<String, serde_json::Value> = HashMap::new();
            changes.insert(
                self.config.seller_field.clone(),
                parcel
                    .get("owner_full_name")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!("UNKNOWN OWNER")),
            );
            for (target, source) in [
                ("year_built", "year_built"),
                ("square_feet", "total_floor_area"),
                ("property_zip", "zip_code"),
            ] {
                if let Some(value) = parcel.get(source) {
                    changes.insert(target.to_string(), value.clone());
                }
            }

            match dest
                .update(
                    &self.config.sales_table,
                    Filter::Eq("id".to_string(), id_to_string(id)),
                    &changes,
                )
                .await
            {
                Ok(()) => {
                    summary.updated += 1;
                    if summary.updated % 100 == 0 {
                        tracing::info!("Updated {} sales so far", summary.updated);
                    }
                }
                Err(e) => {
                    tracing::warn!("Update failed for sale {}: {}", id_to_string(id), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
