use crate::domain::model::{SaleRecord, SourceRow};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a source cell becomes a target field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldParser {
    Text,
    Date,
    Int,
    Float,
    /// Float that tolerates `$` and thousands separators.
    Currency,
}

/// One row of the declarative column-mapping table:
/// source column -> target field, via a parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub source: String,
    pub target: String,
    pub parser: FieldParser,
}

impl ColumnSpec {
    pub fn new(source: &str, target: &str, parser: FieldParser) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            parser,
        }
    }
}

/// Which records make it past the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPolicy {
    /// Fields that must all be present.
    pub required_fields: Vec<String>,
    /// At least one of these must be present (empty list disables the check).
    pub any_of_fields: Vec<String>,
    /// Numeric field the minimum-price predicate applies to.
    pub price_field: Option<String>,
    /// Records need `price_field` strictly greater than this.
    pub min_price: f64,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            required_fields: vec![
                "street_address".to_string(),
                "sale_date".to_string(),
                "sale_price".to_string(),
            ],
            any_of_fields: vec!["grantor".to_string(), "grantee".to_string()],
            price_field: Some("sale_price".to_string()),
            min_price: 100.0,
        }
    }
}

/// The Detroit property-sales columns the one-off scripts all mapped by hand.
pub fn default_mapping() -> Vec<ColumnSpec> {
    use FieldParser::*;
    vec![
        ColumnSpec::new("Sales ID", "sales_id", Int),
        ColumnSpec::new("Parcel Number", "parcel_number", Text),
        ColumnSpec::new("Sale Number", "sale_number", Int),
        ColumnSpec::new("Street Address", "street_address", Text),
        ColumnSpec::new("Street Number", "street_number", Text),
        ColumnSpec::new("Street Prefix", "street_prefix", Text),
        ColumnSpec::new("Street Name", "street_name", Text),
        ColumnSpec::new("Unit Number", "unit_number", Text),
        ColumnSpec::new("Sale Date", "sale_date", Date),
        ColumnSpec::new("Sale Price", "sale_price", Currency),
        ColumnSpec::new("Grantor", "grantor", Text),
        ColumnSpec::new("Grantee", "grantee", Text),
        ColumnSpec::new("Liber Page", "liber_page", Text),
        ColumnSpec::new("Terms of Sale", "terms_of_sale", Text),
        ColumnSpec::new("Sale Verification", "sale_verification", Text),
        ColumnSpec::new("Sale Instrument", "sale_instrument", Text),
        ColumnSpec::new(
            "Property Transfer Percentage",
            "property_transfer_percentage",
            Float,
        ),
        ColumnSpec::new("Property Class Code", "property_class_code", Text),
        ColumnSpec::new("ECF Neighborhood", "ecf_neighborhood", Text),
        ColumnSpec::new("x", "x_coordinate", Float),
        ColumnSpec::new("y", "y_coordinate", Float),
        ColumnSpec::new("ESRI_OID", "esri_oid", Int),
    ]
}

/// Pure row -> optional record transform. Field-level parse failures become
/// absent values; rows failing the policy return `None`. Never errors.
pub struct Normalizer {
    mapping: Vec<ColumnSpec>,
    policy: RecordPolicy,
    whitespace: Regex,
}

impl Normalizer {
    pub fn new(mapping: Vec<ColumnSpec>, policy: RecordPolicy) -> Self {
        Self {
            mapping,
            policy,
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    pub fn normalize(&self, row: &SourceRow) -> Option<SaleRecord> {
        let mut record = SaleRecord::new();

        for spec in &self.mapping {
            let Some(raw) = row.get(&spec.source) else {
                continue;
            };
            if let Some(value) = self.parse_cell(raw, spec.parser) {
                record.fields.insert(spec.target.clone(), value);
            }
        }

        if self.passes_policy(&record) {
            Some(record)
        } else {
            None
        }
    }

    fn parse_cell(
        &self,
        raw: &serde_json::Value,
        parser: FieldParser,
    ) -> Option<serde_json::Value> {
        match parser {
            FieldParser::Text => self.clean_text(raw).map(serde_json::Value::String),
            FieldParser::Date => parse_date(raw).map(serde_json::Value::String),
            FieldParser::Int => parse_int(raw).map(|n| serde_json::json!(n)),
            FieldParser::Float => parse_float(raw, false).map(|f| serde_json::json!(f)),
            FieldParser::Currency => parse_float(raw, true).map(|f| serde_json::json!(f)),
        }
    }

    /// Trim, collapse runs of whitespace, and map empty to absent.
    fn clean_text(&self, raw: &serde_json::Value) -> Option<String> {
        let text = match raw {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let cleaned = self.whitespace.replace_all(text.trim(), " ").to_string();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn passes_policy(&self, record: &SaleRecord) -> bool {
        for field in &self.policy.required_fields {
            if record.get(field).is_none() {
                return false;
            }
        }

        if !self.policy.any_of_fields.is_empty()
            && !self
                .policy
                .any_of_fields
                .iter()
                .any(|f| record.get(f).is_some())
        {
            return false;
        }

        if let Some(price_field) = &self.policy.price_field {
            match record.get(price_field).and_then(|v| v.as_f64()) {
                Some(price) if price > self.policy.min_price => {}
                _ => return false,
            }
        }

        true
    }
}

// Date formats seen in the source exports. Timestamps carry a time-of-day
// suffix that is cut at the first space before matching.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

fn parse_date(raw: &serde_json::Value) -> Option<String> {
    let text = raw.as_str()?.trim();
    let date_part = text.split_whitespace().next()?;

    for format in DATE_FORMATS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn parse_int(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn parse_float(raw: &serde_json::Value, currency: bool) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let mut s = s.trim().to_string();
            if currency {
                s = s.replace(['$', ','], "");
                s = s.trim().to_string();
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    }
}
