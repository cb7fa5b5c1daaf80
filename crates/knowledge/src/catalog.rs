//! Read-only queries over the normalized dataset.

use crate::ingest::{load_csv, IngestReport, SalesDataset};
use crate::normalizer::{CustomerSummary, ProductSummary, SalesProfiles, TerritorySummary};
use crate::types::EntityProfile;
use sales_core::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Dataset-level counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub customers: usize,
    pub products: usize,
    pub territories: usize,
    pub total_sales: f64,
    pub duplicates_removed: usize,
    pub rows_rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryInsights {
    pub total_territories: usize,
    /// Territory with the highest total sales
    pub top_territory: Option<TerritorySummary>,
    pub breakdown: Vec<TerritorySummary>,
}

/// Aggregates of one loaded dataset, shared cheaply between tasks.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: Arc<SalesProfiles>,
    report: IngestReport,
}

impl Catalog {
    pub fn from_dataset(dataset: &SalesDataset) -> Self {
        Self {
            profiles: Arc::new(SalesProfiles::build(&dataset.records)),
            report: dataset.report.clone(),
        }
    }

    /// Load and aggregate a sales CSV.
    pub fn load(path: &Path) -> AppResult<Self> {
        Ok(Self::from_dataset(&load_csv(path)?))
    }

    pub fn profiles(&self) -> &SalesProfiles {
        &self.profiles
    }

    pub fn entity_profiles(&self) -> Vec<EntityProfile> {
        self.profiles.entity_profiles()
    }

    /// Customers by total sales, highest first.
    pub fn top_customers(&self, n: usize) -> Vec<&CustomerSummary> {
        let mut customers: Vec<&CustomerSummary> = self.profiles.customers.iter().collect();
        customers.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));
        customers.truncate(n);
        customers
    }

    /// Products by performance score, highest first.
    pub fn top_products(&self, n: usize) -> Vec<&ProductSummary> {
        let mut products: Vec<&ProductSummary> = self.profiles.products.iter().collect();
        products.sort_by(|a, b| b.performance_score.total_cmp(&a.performance_score));
        products.truncate(n);
        products
    }

    pub fn territory_insights(&self) -> TerritoryInsights {
        let territories = &self.profiles.territories;
        let top_territory = territories
            .iter()
            .reduce(|best, t| if t.total_sales > best.total_sales { t } else { best })
            .cloned();

        TerritoryInsights {
            total_territories: territories.len(),
            top_territory,
            breakdown: territories.clone(),
        }
    }

    /// Case-insensitive exact customer lookup.
    pub fn customer(&self, name: &str) -> Option<&CustomerSummary> {
        let name = name.trim();
        self.profiles
            .customers
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            records: self.profiles.total_records,
            customers: self.profiles.customers.len(),
            products: self.profiles.products.len(),
            territories: self.profiles.territories.len(),
            total_sales: self.profiles.total_sales,
            duplicates_removed: self.report.duplicates_removed,
            rows_rejected: self.report.rows_rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_csv;

    const CSV: &str = "\
ORDERNUMBER,QUANTITYORDERED,PRICEEACH,SALES,ORDERDATE,STATUS,PRODUCTLINE,PRODUCTCODE,CUSTOMERNAME,TERRITORY,DEALSIZE
1,10,100,1000,1/6/2003 0:00,Shipped,Classic Cars,S10_1,Acme,EMEA,Medium
2,20,100,2000,1/7/2003 0:00,Shipped,Classic Cars,S10_1,Acme,EMEA,Medium
3,5,50,250,1/8/2003 0:00,Shipped,Ships,S24_2,Bolt Inc,NA,Small
4,8,100,800,1/9/2003 0:00,Cancelled,Planes,S18_3,Cinco SA,EMEA,Small
4,8,100,800,1/9/2003 0:00,Cancelled,Planes,S18_3,Cinco SA,EMEA,Small
";

    fn catalog() -> Catalog {
        Catalog::from_dataset(&parse_csv(CSV).unwrap())
    }

    #[test]
    fn test_top_customers_by_sales() {
        let catalog = catalog();
        let names: Vec<&str> = catalog.top_customers(2).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Cinco SA"]);
    }

    #[test]
    fn test_top_products_by_performance() {
        let catalog = catalog();
        let top = catalog.top_products(1);
        assert_eq!(top[0].key(), "Classic Cars_S10_1");
    }

    #[test]
    fn test_territory_insights() {
        let insights = catalog().territory_insights();
        assert_eq!(insights.total_territories, 2);
        let top = insights.top_territory.unwrap();
        assert_eq!(top.name, "EMEA");
        assert_eq!(top.unique_customers, 2);
    }

    #[test]
    fn test_summary_and_lookup() {
        let catalog = catalog();
        let summary = catalog.summary();
        assert_eq!(summary.records, 4);
        assert_eq!(summary.duplicates_removed, 1);
        assert_eq!(summary.customers, 3);
        assert_eq!(summary.total_sales, 4050.0);

        assert!(catalog.customer("acme").is_some());
        assert!(catalog.customer("Nobody").is_none());
    }
}
