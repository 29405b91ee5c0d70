//! Per-run rate table cache.
//!
//! [`RateTableCache`] resolves each tax year's tables once and hands out the
//! same [`Arc<RateTables>`] snapshot for the rest of the run, so every
//! employee in a run is calculated against identical figures. The cache is
//! an ordinary value owned by the caller; dropping it ends the run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::defaults::{
    DEFAULT_TAX_YEAR, default_ni_categories, default_ni_thresholds, default_nhs_pension_bands,
    default_student_loan_thresholds, default_tax_bands,
};
use super::provider::RateTableProvider;
use super::types::{
    RateTableKind, RateTables, validate_nhs_pension_bands, validate_ni_categories,
    validate_student_loan_thresholds,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{TaxRegion, TaxYear};

/// Caches resolved rate tables by tax year for one payroll run.
#[derive(Debug, Default)]
pub struct RateTableCache {
    tables: HashMap<TaxYear, Arc<RateTables>>,
}

impl RateTableCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached snapshot for a tax year, if resolved.
    pub fn get(&self, tax_year: TaxYear) -> Option<Arc<RateTables>> {
        self.tables.get(&tax_year).cloned()
    }

    /// Inserts a pre-built snapshot, replacing any existing one.
    pub fn insert(&mut self, tables: RateTables) -> Arc<RateTables> {
        let tables = Arc::new(tables);
        self.tables.insert(tables.tax_year(), Arc::clone(&tables));
        tables
    }

    /// Number of tax years resolved so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the snapshot for `tax_year`, fetching it on first use.
    ///
    /// Any table the provider fails to supply, returns empty, or returns in
    /// an invalid state is replaced by the built-in default and logged at
    /// warn level. Resolution never fails.
    pub async fn resolve<P: RateTableProvider>(
        &mut self,
        provider: &P,
        tax_year: TaxYear,
    ) -> Arc<RateTables> {
        if let Some(tables) = self.get(tax_year) {
            debug!(tax_year = %tax_year, "Rate tables served from cache");
            return tables;
        }

        let tables = fetch_rate_tables(provider, tax_year).await;
        self.insert(tables)
    }
}

/// Tracks which tables fell back while resolving a snapshot.
struct Resolution {
    tax_year: TaxYear,
    fallbacks: Vec<RateTableKind>,
}

impl Resolution {
    /// Accepts a fetched table if present and valid, else the default.
    fn accept<T>(
        &mut self,
        kind: RateTableKind,
        fetched: EngineResult<Option<T>>,
        validate: impl FnOnce(&T) -> EngineResult<()>,
        default: impl FnOnce() -> T,
    ) -> T {
        let reason = match fetched {
            Ok(Some(table)) => match validate(&table) {
                Ok(()) => return table,
                Err(err) => format!("table failed validation: {}", err),
            },
            Ok(None) => "provider returned no data".to_string(),
            Err(err) => format!("provider error: {}", err),
        };

        let signal = EngineError::RateTableUnavailable {
            table: kind.to_string(),
            tax_year: self.tax_year,
            reason,
        };
        warn!(
            table = %kind,
            tax_year = %self.tax_year,
            fallback_year = %DEFAULT_TAX_YEAR,
            error = %signal,
            "Using built-in rate table"
        );
        self.fallbacks.push(kind);
        default()
    }
}

/// Fetches every table for a tax year, falling back table by table.
async fn fetch_rate_tables<P: RateTableProvider>(provider: &P, tax_year: TaxYear) -> RateTables {
    let mut resolution = Resolution {
        tax_year,
        fallbacks: Vec::new(),
    };

    let mut tax_bands = Vec::with_capacity(TaxRegion::ALL.len());
    for region in TaxRegion::ALL {
        let fetched = provider.fetch_tax_bands(region, tax_year).await;
        tax_bands.push(resolution.accept(
            RateTableKind::TaxBands(region),
            fetched,
            |table| {
                if table.region != region {
                    return Err(EngineError::InvalidInput {
                        field: "tax_bands".to_string(),
                        message: format!("expected {} bands, got {}", region, table.region),
                    });
                }
                table.validate()
            },
            || default_tax_bands(region),
        ));
    }

    let ni_thresholds = resolution.accept(
        RateTableKind::NiThresholds,
        provider.fetch_ni_thresholds(tax_year).await,
        |thresholds| thresholds.validate(),
        default_ni_thresholds,
    );

    let ni_categories = resolution.accept(
        RateTableKind::NiCategories,
        provider.fetch_ni_category_tables(tax_year).await,
        |tables| validate_ni_categories(tables),
        default_ni_categories,
    );

    let nhs_pension_bands = resolution.accept(
        RateTableKind::NhsPensionBands,
        provider.fetch_nhs_pension_bands(tax_year).await,
        |bands| validate_nhs_pension_bands(bands),
        default_nhs_pension_bands,
    );

    let student_loans = resolution.accept(
        RateTableKind::StudentLoanThresholds,
        provider.fetch_student_loan_thresholds(tax_year).await,
        |plans| validate_student_loan_thresholds(plans),
        default_student_loan_thresholds,
    );

    debug!(
        tax_year = %tax_year,
        fallbacks = resolution.fallbacks.len(),
        "Rate tables resolved"
    );

    RateTables::new(
        tax_year,
        tax_bands,
        ni_thresholds,
        ni_categories,
        nhs_pension_bands,
        student_loans,
    )
    .with_fallbacks(resolution.fallbacks)
}
