//! Rate table provider interface.
//!
//! A [`RateTableProvider`] is the engine's only window onto live rate data.
//! Each fetch may come back empty (`Ok(None)`), in which case the built-in
//! table is used instead.

use std::future::Future;

use super::types::{
    NhsPensionBand, NiCategoryTable, NiThresholds, StudentLoanThreshold, TaxBandTable,
};
use crate::error::EngineResult;
use crate::models::{TaxRegion, TaxYear};

/// Source of band and rate tables for a tax year.
///
/// Implementations own any retry policy; the engine calls each method at
/// most once per tax year per run.
pub trait RateTableProvider {
    /// Income tax bands for a region.
    fn fetch_tax_bands(
        &self,
        region: TaxRegion,
        tax_year: TaxYear,
    ) -> impl Future<Output = EngineResult<Option<TaxBandTable>>> + Send;

    /// Monthly NI thresholds.
    fn fetch_ni_thresholds(
        &self,
        tax_year: TaxYear,
    ) -> impl Future<Output = EngineResult<Option<NiThresholds>>> + Send;

    /// Per-category NI rate tables.
    fn fetch_ni_category_tables(
        &self,
        tax_year: TaxYear,
    ) -> impl Future<Output = EngineResult<Option<Vec<NiCategoryTable>>>> + Send;

    /// NHS pension tiers.
    fn fetch_nhs_pension_bands(
        &self,
        tax_year: TaxYear,
    ) -> impl Future<Output = EngineResult<Option<Vec<NhsPensionBand>>>> + Send;

    /// Student loan thresholds.
    fn fetch_student_loan_thresholds(
        &self,
        tax_year: TaxYear,
    ) -> impl Future<Output = EngineResult<Option<Vec<StudentLoanThreshold>>>> + Send;
}

/// A provider with no live source: every table falls back to the built-in
/// defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRateSource;

impl RateTableProvider for DefaultRateSource {
    async fn fetch_tax_bands(
        &self,
        _region: TaxRegion,
        _tax_year: TaxYear,
    ) -> EngineResult<Option<TaxBandTable>> {
        Ok(None)
    }

    async fn fetch_ni_thresholds(&self, _tax_year: TaxYear) -> EngineResult<Option<NiThresholds>> {
        Ok(None)
    }

    async fn fetch_ni_category_tables(
        &self,
        _tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<NiCategoryTable>>> {
        Ok(None)
    }

    async fn fetch_nhs_pension_bands(
        &self,
        _tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<NhsPensionBand>>> {
        Ok(None)
    }

    async fn fetch_student_loan_thresholds(
        &self,
        _tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<StudentLoanThreshold>>> {
        Ok(None)
    }
}
