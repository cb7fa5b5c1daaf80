//! Aggregates sales records into customer, product and territory profiles.

use crate::records::{RawRow, SalesRecord};
use crate::types::{EntityProfile, EntityType};
use chrono::NaiveDate;
use sales_core::format::format_currency;
use sales_core::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

const UNKNOWN: &str = "Unknown";
const TOP_PRODUCT_LINES: usize = 3;

/// Customer activity derived from the order status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerStatus {
    /// At least one order was shipped
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "Active",
            CustomerStatus::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub territory: Option<String>,
    pub contact_name: Option<String>,
    pub total_orders: usize,
    pub total_sales: f64,
    pub avg_order_value: f64,
    /// Most frequently ordered product line
    pub preferred_product_line: Option<String>,
    /// Distinct deal sizes in first-seen order
    pub deal_sizes: Vec<String>,
    pub last_order_date: Option<NaiveDate>,
    pub status: CustomerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_line: String,
    pub product_code: String,
    pub total_sales: f64,
    pub avg_sales: f64,
    pub order_count: usize,
    pub avg_price: f64,
    pub total_quantity: f64,
    pub typical_deal_size: String,
    pub performance_score: f64,
}

impl ProductSummary {
    /// `"<line>_<code>"`
    pub fn key(&self) -> String {
        format!("{}_{}", self.product_line, self.product_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritorySummary {
    pub name: String,
    pub total_sales: f64,
    pub avg_sales: f64,
    pub total_orders: usize,
    pub unique_customers: usize,
    /// Up to three product lines with their order counts, most ordered first
    pub top_product_lines: Vec<(String, usize)>,
    /// Deal size order counts, most frequent first
    pub deal_distribution: Vec<(String, usize)>,
    /// Share of all sales, in percent
    pub market_share: f64,
    pub customers: Vec<String>,
}

/// Every aggregate of one dataset, each list sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesProfiles {
    pub customers: Vec<CustomerSummary>,
    pub products: Vec<ProductSummary>,
    pub territories: Vec<TerritorySummary>,
    pub total_records: usize,
    pub total_sales: f64,
}

impl SalesProfiles {
    pub fn build(records: &[SalesRecord]) -> Self {
        let total_sales = records.iter().map(|r| r.sales).sum();
        let profiles = Self {
            customers: aggregate_customers(records),
            products: aggregate_products(records),
            territories: aggregate_territories(records, total_sales),
            total_records: records.len(),
            total_sales,
        };

        tracing::info!(
            "Built {} customer, {} product and {} territory profiles from {} records",
            profiles.customers.len(),
            profiles.products.len(),
            profiles.territories.len(),
            records.len()
        );

        profiles
    }

    /// Embeddable profiles: customers, then products, then territories.
    pub fn entity_profiles(&self) -> Vec<EntityProfile> {
        self.customers
            .iter()
            .map(customer_profile)
            .chain(self.products.iter().map(product_profile))
            .chain(self.territories.iter().map(territory_profile))
            .collect()
    }
}

/// Parse raw rows and aggregate them into entity profiles.
///
/// Fails on the first row without a customer name or product code.
pub fn normalize(rows: &[RawRow]) -> AppResult<Vec<EntityProfile>> {
    let records = rows
        .iter()
        .map(SalesRecord::from_row)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(SalesProfiles::build(&records).entity_profiles())
}

fn aggregate_customers(records: &[SalesRecord]) -> Vec<CustomerSummary> {
    let mut groups: BTreeMap<&str, Vec<&SalesRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.customer_name.as_str()).or_default().push(r);
    }

    groups
        .into_iter()
        .map(|(name, rows)| {
            let total_sales: f64 = rows.iter().map(|r| r.sales).sum();
            let mut deal_sizes: Vec<String> = Vec::new();
            for size in rows.iter().filter_map(|r| r.deal_size.as_deref()) {
                if !deal_sizes.iter().any(|s| s == size) {
                    deal_sizes.push(size.to_string());
                }
            }

            CustomerSummary {
                name: name.to_string(),
                phone: first(&rows, |r| r.phone.as_deref()),
                city: first(&rows, |r| r.city.as_deref()),
                state: first(&rows, |r| r.state.as_deref()),
                country: first(&rows, |r| r.country.as_deref()),
                territory: first(&rows, |r| r.territory.as_deref()),
                contact_name: rows.iter().find_map(|r| r.contact_name()),
                total_orders: rows.len(),
                total_sales,
                avg_order_value: total_sales / rows.len() as f64,
                preferred_product_line: most_frequent(
                    rows.iter().filter_map(|r| r.product_line.as_deref()),
                ),
                deal_sizes,
                last_order_date: rows.iter().filter_map(|r| r.order_date).max(),
                status: if rows.iter().any(|r| r.is_shipped()) {
                    CustomerStatus::Active
                } else {
                    CustomerStatus::Inactive
                },
            }
        })
        .collect()
}

fn aggregate_products(records: &[SalesRecord]) -> Vec<ProductSummary> {
    let mut groups: BTreeMap<(&str, &str), Vec<&SalesRecord>> = BTreeMap::new();
    let mut per_code: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for r in records {
        let line = r.product_line.as_deref().unwrap_or(UNKNOWN);
        groups
            .entry((line, r.product_code.as_str()))
            .or_default()
            .push(r);

        let entry = per_code.entry(r.product_code.as_str()).or_default();
        entry.0 += 1;
        entry.1 += r.quantity;
    }

    let max_sales = records.iter().map(|r| r.sales).fold(0.0, f64::max);
    let max_orders = per_code.values().map(|(n, _)| *n).max().unwrap_or(0) as f64;
    let max_quantity = per_code.values().map(|(_, q)| *q).fold(0.0, f64::max);

    groups
        .into_iter()
        .map(|((line, code), rows)| {
            let order_count = rows.len();
            let total_sales: f64 = rows.iter().map(|r| r.sales).sum();
            let total_quantity: f64 = rows.iter().map(|r| r.quantity).sum();

            ProductSummary {
                product_line: line.to_string(),
                product_code: code.to_string(),
                total_sales,
                avg_sales: total_sales / order_count as f64,
                order_count,
                avg_price: rows.iter().map(|r| r.price_each).sum::<f64>() / order_count as f64,
                total_quantity,
                typical_deal_size: most_frequent(rows.iter().filter_map(|r| r.deal_size.as_deref()))
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                performance_score: 0.5 * ratio(total_sales, max_sales)
                    + 0.3 * ratio(order_count as f64, max_orders)
                    + 0.2 * ratio(total_quantity, max_quantity),
            }
        })
        .collect()
}

fn aggregate_territories(records: &[SalesRecord], grand_total: f64) -> Vec<TerritorySummary> {
    let mut groups: BTreeMap<&str, Vec<&SalesRecord>> = BTreeMap::new();
    for r in records {
        // Rows without a territory still count towards customers and products
        if let Some(territory) = r.territory.as_deref() {
            groups.entry(territory).or_default().push(r);
        }
    }

    groups
        .into_iter()
        .map(|(name, rows)| {
            let total_sales: f64 = rows.iter().map(|r| r.sales).sum();
            let customers: BTreeSet<&str> =
                rows.iter().map(|r| r.customer_name.as_str()).collect();

            let mut top_product_lines =
                ranked_counts(rows.iter().filter_map(|r| r.product_line.as_deref()));
            top_product_lines.truncate(TOP_PRODUCT_LINES);

            TerritorySummary {
                name: name.to_string(),
                total_sales,
                avg_sales: total_sales / rows.len() as f64,
                total_orders: rows.len(),
                unique_customers: customers.len(),
                top_product_lines,
                deal_distribution: ranked_counts(rows.iter().filter_map(|r| r.deal_size.as_deref())),
                market_share: ratio(total_sales, grand_total) * 100.0,
                customers: customers.into_iter().map(str::to_string).collect(),
            }
        })
        .collect()
}

fn first<'a>(
    rows: &[&'a SalesRecord],
    field: impl Fn(&'a SalesRecord) -> Option<&'a str>,
) -> Option<String> {
    rows.iter().find_map(|r| field(*r)).map(str::to_string)
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Value counts, highest first; equal counts in lexicographic order.
fn ranked_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(v, n)| (v.to_string(), n))
        .collect();
    // stable sort keeps the lexicographic order among ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    ranked_counts(values).into_iter().next().map(|(v, _)| v)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN)
}

fn customer_profile(c: &CustomerSummary) -> EntityProfile {
    let mut lines = vec![format!("Customer: {}", c.name)];

    let location: Vec<&str> = [c.city.as_deref(), c.state.as_deref(), c.country.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !location.is_empty() {
        lines.push(format!("Location: {}", location.join(", ")));
    }
    if let Some(territory) = &c.territory {
        lines.push(format!("Territory: {}", territory));
    }
    if let Some(contact) = &c.contact_name {
        lines.push(format!("Contact: {}", contact));
    }

    lines.push(String::new());
    lines.push("Sales Profile:".to_string());
    lines.push(format!("- Total Orders: {}", c.total_orders));
    lines.push(format!("- Total Sales: {}", format_currency(c.total_sales)));
    lines.push(format!(
        "- Average Order Value: {}",
        format_currency(c.avg_order_value)
    ));
    if let Some(line) = &c.preferred_product_line {
        lines.push(format!("- Preferred Products: {}", line));
    }
    if !c.deal_sizes.is_empty() {
        lines.push(format!("- Deal Sizes: {}", c.deal_sizes.join(", ")));
    }
    lines.push(format!("- Status: {}", c.status.as_str()));
    if let Some(date) = c.last_order_date {
        lines.push(format!("- Last Order: {}", date));
    }

    if let (Some(territory), Some(line)) = (&c.territory, &c.preferred_product_line) {
        lines.push(String::new());
        lines.push(format!(
            "Customer Segment: {} market with focus on {} products",
            territory, line
        ));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("territory".to_string(), json!(or_unknown(c.territory.as_deref())));
    metadata.insert("country".to_string(), json!(or_unknown(c.country.as_deref())));
    metadata.insert("total_sales".to_string(), json!(round2(c.total_sales)));
    metadata.insert("total_orders".to_string(), json!(c.total_orders));
    metadata.insert("customer_status".to_string(), json!(c.status.as_str()));

    EntityProfile::new(EntityType::Customer, c.name.clone(), lines.join("\n"), metadata)
}

fn product_profile(p: &ProductSummary) -> EntityProfile {
    let text = [
        format!("Product: {} - {}", p.product_line, p.product_code),
        String::new(),
        "Performance Metrics:".to_string(),
        format!("- Total Sales: {}", format_currency(p.total_sales)),
        format!("- Average Sales per Order: {}", format_currency(p.avg_sales)),
        format!("- Total Orders: {}", p.order_count),
        format!("- Average Price: {}", format_currency(p.avg_price)),
        format!("- Total Quantity Sold: {}", p.total_quantity),
        format!("- Typical Deal Size: {}", p.typical_deal_size),
        format!("- Performance Score: {:.3}", p.performance_score),
        String::new(),
        format!(
            "Product Category: {} with strong performance in {} market segment",
            p.product_line, p.typical_deal_size
        ),
    ]
    .join("\n");

    let mut metadata = BTreeMap::new();
    metadata.insert("product_line".to_string(), json!(p.product_line));
    metadata.insert("product_code".to_string(), json!(p.product_code));
    metadata.insert("total_sales".to_string(), json!(round2(p.total_sales)));
    metadata.insert(
        "performance_score".to_string(),
        json!((p.performance_score * 1000.0).round() / 1000.0),
    );
    metadata.insert("typical_deal_size".to_string(), json!(p.typical_deal_size));

    EntityProfile::new(EntityType::Product, p.key(), text, metadata)
}

fn territory_profile(t: &TerritorySummary) -> EntityProfile {
    let top: Vec<&str> = t.top_product_lines.iter().map(|(l, _)| l.as_str()).collect();
    let deals: Vec<String> = t
        .deal_distribution
        .iter()
        .map(|(size, n)| format!("{} {}", size, n))
        .collect();

    let mut lines = vec![
        format!("Territory: {}", t.name),
        String::new(),
        "Market Performance:".to_string(),
        format!("- Total Sales: {}", format_currency(t.total_sales)),
        format!("- Average Sales: {}", format_currency(t.avg_sales)),
        format!("- Total Orders: {}", t.total_orders),
        format!("- Unique Customers: {}", t.unique_customers),
        format!("- Market Share: {:.2}%", t.market_share),
        String::new(),
    ];
    if !top.is_empty() {
        lines.push(format!("Top Products: {}", top.join(", ")));
    }
    if !deals.is_empty() {
        lines.push(format!("Deal Distribution: {}", deals.join(", ")));
    }
    lines.push(format!("Customers: {}", t.customers.join(", ")));
    lines.push(String::new());
    lines.push(format!(
        "Market Characteristics: {} region with strong demand for {} products",
        t.name,
        top.first().copied().unwrap_or("various")
    ));

    let mut metadata = BTreeMap::new();
    metadata.insert("territory".to_string(), json!(t.name));
    metadata.insert("total_sales".to_string(), json!(round2(t.total_sales)));
    metadata.insert("market_share".to_string(), json!(round2(t.market_share)));
    metadata.insert("unique_customers".to_string(), json!(t.unique_customers));
    metadata.insert(
        "top_product_lines".to_string(),
        Value::Array(top.iter().map(|l| json!(l)).collect()),
    );

    EntityProfile::new(EntityType::Territory, t.name.clone(), lines.join("\n"), metadata)
}
