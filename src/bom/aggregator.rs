//! BOM Expansion
//!
//! Expands report quantities through kit structures into one stock delta
//! per base product.

use serde::Serialize;
use std::collections::HashMap;

use crate::bom::{parse_structure, ProductCatalog};
use crate::error::BomError;
use crate::report::RawReport;

/// Net quantity to apply to one base product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockDelta {
    /// SKU, `None` when a component id is missing from the catalog.
    pub sku: Option<String>,
    /// ERP product id.
    pub id: String,
    /// Summed quantity.
    pub qtd: u64,
}

/// A catalog product whose structure could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomFailure {
    pub sku: String,
    pub error: BomError,
}

/// Outcome class of an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStatus {
    /// At least one delta was produced.
    Ready,
    /// No report SKU exists in the catalog.
    NoMatches,
    /// Every matched product failed to parse.
    AllFailed,
}

/// Result of expanding a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Deltas in first-contribution order.
    pub deltas: Vec<StockDelta>,
    /// Report SKUs found in the catalog.
    pub matched: usize,
    /// Report SKUs missing from the catalog.
    pub unmatched_skus: Vec<String>,
    /// Matched products skipped because of a malformed structure.
    pub failures: Vec<BomFailure>,
}

impl Expansion {
    pub fn status(&self) -> ExpansionStatus {
        if self.matched == 0 {
            ExpansionStatus::NoMatches
        } else if self.deltas.is_empty() {
            ExpansionStatus::AllFailed
        } else {
            ExpansionStatus::Ready
        }
    }

    /// Sum of all delta quantities.
    pub fn total_quantity(&self) -> u64 {
        self.deltas
            .iter()
            .fold(0u64, |total, delta| total.saturating_add(delta.qtd))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DeltaKey {
    Sku(String),
    UnresolvedId(String),
}

#[derive(Default)]
struct Accumulator {
    deltas: Vec<StockDelta>,
    index: HashMap<DeltaKey, usize>,
}

impl Accumulator {
    fn add(&mut self, sku: Option<&str>, id: &str, qtd: u64) {
        let key = match sku {
            Some(sku) => DeltaKey::Sku(sku.to_string()),
            None => DeltaKey::UnresolvedId(id.to_string()),
        };

        match self.index.get(&key) {
            Some(&position) => {
                let delta = &mut self.deltas[position];
                delta.qtd = delta.qtd.saturating_add(qtd);
            }
            None => {
                self.index.insert(key, self.deltas.len());
                self.deltas.push(StockDelta {
                    sku: sku.map(str::to_string),
                    id: id.to_string(),
                    qtd,
                });
            }
        }
    }
}

/// Expand a report through the catalog.
///
/// Report SKUs missing from the catalog are skipped. A plain product
/// contributes its own quantity; a kit contributes `component quantity *
/// report quantity` to each component. Contributions to the same SKU are
/// summed. A product with a malformed structure is recorded and skipped.
pub fn expand(report: &RawReport, catalog: &ProductCatalog) -> Expansion {
    let mut accumulator = Accumulator::default();
    let mut expansion = Expansion::default();

    for (sku, qtd) in report.iter() {
        let Some(product) = catalog.by_sku(sku) else {
            expansion.unmatched_skus.push(sku.to_string());
            continue;
        };
        expansion.matched += 1;

        let structure = match parse_structure(&product.structure) {
            Ok(structure) => structure,
            Err(error) => {
                tracing::warn!(sku = sku, id = %product.id, error = %error, "Skipping product with malformed structure");
                expansion.failures.push(BomFailure {
                    sku: sku.to_string(),
                    error,
                });
                continue;
            }
        };

        if structure.is_kit() {
            for component in &structure.components {
                let component_id = component.product.id.as_str();
                let component_sku = catalog.sku_for_id(component_id);
                if component_sku.is_none() {
                    tracing::debug!(kit = sku, component_id, "Kit component not in catalog");
                }
                accumulator.add(
                    component_sku,
                    component_id,
                    component.quantity.saturating_mul(qtd),
                );
            }
        } else {
            accumulator.add(Some(sku), &product.id, qtd);
        }
    }

    expansion.deltas = accumulator.deltas;

    tracing::info!(
        skus = report.len(),
        matched = expansion.matched,
        unmatched = expansion.unmatched_skus.len(),
        failed = expansion.failures.len(),
        deltas = expansion.deltas.len(),
        "Expanded stock report"
    );
    expansion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::Product;
    use pretty_assertions::assert_eq;

    fn kit(components: &[(&str, u64)]) -> String {
        let parts: Vec<String> = components
            .iter()
            .map(|(id, q)| format!("{{'produto': {{'id': {}}}, 'quantidade': {}}}", id, q))
            .collect();
        format!("{{'componentes': [{}]}}", parts.join(", "))
    }

    fn delta(sku: Option<&str>, id: &str, qtd: u64) -> StockDelta {
        StockDelta {
            sku: sku.map(str::to_string),
            id: id.to_string(),
            qtd,
        }
    }

    #[test]
    fn test_plain_and_kit_merge_into_one_delta() {
        let catalog = ProductCatalog::new(vec![
            Product::new("1", "A1", "{'componentes': []}"),
            Product::new("2", "K1", kit(&[("1", 2)])),
        ]);
        let report: RawReport = vec![("A1", 3), ("K1", 4)].into_iter().collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(expansion.deltas, vec![delta(Some("A1"), "1", 11)]);
        assert_eq!(expansion.status(), ExpansionStatus::Ready);
    }

    #[test]
    fn test_duplicate_rows_sum_before_expansion() {
        let catalog = ProductCatalog::new(vec![Product::new("1", "SKU1", "")]);
        let report: RawReport = vec![("SKU1", 3), ("SKU1", 2)].into_iter().collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(expansion.deltas, vec![delta(Some("SKU1"), "1", 5)]);
    }

    #[test]
    fn test_kit_contributes_once_per_component() {
        let catalog = ProductCatalog::new(vec![
            Product::new("1", "A1", ""),
            Product::new("2", "B1", ""),
            Product::new("3", "K1", kit(&[("1", 2), ("2", 3)])),
            Product::new("4", "K2", kit(&[("1", 1)])),
        ]);
        let report: RawReport = vec![("K1", 5), ("K2", 7)].into_iter().collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(
            expansion.deltas,
            vec![delta(Some("A1"), "1", 17), delta(Some("B1"), "2", 15)]
        );
        assert_eq!(expansion.total_quantity(), 32);
    }

    #[test]
    fn test_plain_products_conserve_quantity() {
        let catalog = ProductCatalog::new(vec![
            Product::new("1", "A1", ""),
            Product::new("2", "B1", "None"),
            Product::new("3", "C1", "{'componentes': []}"),
        ]);
        let report: RawReport = vec![("A1", 4), ("B1", 6), ("C1", 1), ("Z9", 100)]
            .into_iter()
            .collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(expansion.total_quantity(), 11);
        assert_eq!(expansion.unmatched_skus, vec!["Z9".to_string()]);
    }

    #[test]
    fn test_unresolved_components_are_kept_apart() {
        let catalog = ProductCatalog::new(vec![Product::new("3", "K1", kit(&[("98", 1), ("99", 2)]))]);
        let report: RawReport = vec![("K1", 2)].into_iter().collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(
            expansion.deltas,
            vec![delta(None, "98", 2), delta(None, "99", 4)]
        );
    }

    #[test]
    fn test_malformed_structure_does_not_stop_others() {
        let catalog = ProductCatalog::new(vec![
            Product::new("1", "A1", ""),
            Product::new("2", "BAD", "{'componentes': [{'produto': "),
        ]);
        let report: RawReport = vec![("A1", 2), ("BAD", 1)].into_iter().collect();

        let expansion = expand(&report, &catalog);
        assert_eq!(expansion.deltas, vec![delta(Some("A1"), "1", 2)]);
        assert_eq!(expansion.failures.len(), 1);
        assert_eq!(expansion.failures[0].sku, "BAD");
        assert_eq!(expansion.status(), ExpansionStatus::Ready);
    }

    #[test]
    fn test_statuses() {
        let catalog = ProductCatalog::new(vec![Product::new("2", "BAD", "{'x'")]);

        let none: RawReport = vec![("Z9", 1)].into_iter().collect();
        assert_eq!(expand(&none, &catalog).status(), ExpansionStatus::NoMatches);

        let bad: RawReport = vec![("BAD", 1)].into_iter().collect();
        assert_eq!(expand(&bad, &catalog).status(), ExpansionStatus::AllFailed);

        assert_eq!(
            expand(&RawReport::new(), &catalog).status(),
            ExpansionStatus::NoMatches
        );
    }
}
