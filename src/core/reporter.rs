use crate::domain::ports::{Filter, SalesTable, SelectQuery};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub table: String,
    /// Threshold for the notable-sales section.
    pub highlight_price: f64,
    pub sample_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            table: "sales_transactions".to_string(),
            highlight_price: 100_000.0,
            sample_size: 5,
        }
    }
}

/// Post-run verification: read-only queries rendered as summary text.
/// Every query failure is swallowed; it only costs that section of the
/// report.
pub struct Reporter {
    config: ReportConfig,
}

impl Reporter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub async fn report(&self, dest: &dyn SalesTable) -> String {
        let mut out = String::from("Verifying destination data...\n");

        match dest.count(&self.config.table).await {
            Ok(total) => out.push_str(&format!("Total rows in {}: {}\n", self.config.table, total)),
            Err(e) => tracing::debug!("Count query suppressed: {}", e),
        }

        match dest
            .select(
                &self.config.table,
                SelectQuery::new()
                    .order_by("sale_date", true)
                    .limit(self.config.sample_size),
            )
            .await
        {
            Ok(rows) if !rows.is_empty() => {
                out.push_str("\nMost recent sales:\n");
                for sale in &rows {
                    out.push_str(&format!(
                        "  - {}: ${:.0} on {}\n",
                        sale.get_str("street_address").unwrap_or("Unknown"),
                        sale.get("sale_price").and_then(|v| v.as_f64()).unwrap_or(0.0),
                        sale.get_str("sale_date").unwrap_or("?"),
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Recent-sales query suppressed: {}", e),
        }

        match dest
            .select(
                &self.config.table,
                SelectQuery::new()
                    .filter(Filter::Gte(
                        "sale_price".to_string(),
                        format!("{}", self.config.highlight_price),
                    ))
                    .order_by("sale_price", true)
                    .limit(self.config.sample_size),
            )
            .await
        {
            Ok(rows) if !rows.is_empty() => {
                out.push_str(&format!(
                    "\nSales at or above ${:.0}:\n",
                    self.config.highlight_price
                ));
                for sale in &rows {
                    out.push_str(&format!(
                        "  - {}: ${:.0} ({} -> {})\n",
                        sale.get_str("street_address").unwrap_or("Unknown"),
                        sale.get("sale_price").and_then(|v| v.as_f64()).unwrap_or(0.0),
                        sale.get_str("grantor").unwrap_or("Unknown"),
                        sale.get_str("grantee").unwrap_or("Unknown"),
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Notable-sales query suppressed: {}", e),
        }

        out
    }
}
