//! YAML rate table loading.
//!
//! This module provides [`YamlRateSource`], a [`RateTableProvider`] that
//! reads one tax year's rate tables from YAML files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::provider::RateTableProvider;
use super::types::{
    NhsPensionBand, NiCategoryTable, NiThresholds, StudentLoanThreshold, TaxBandTable,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{TaxRegion, TaxYear};

#[derive(Debug, Deserialize)]
struct NiCategoriesFile {
    categories: Vec<NiCategoryTable>,
}

#[derive(Debug, Deserialize)]
struct NhsPensionBandsFile {
    bands: Vec<NhsPensionBand>,
}

#[derive(Debug, Deserialize)]
struct StudentLoansFile {
    plans: Vec<StudentLoanThreshold>,
}

/// Reads rate tables from a directory of YAML files.
///
/// # Directory Structure
///
/// ```text
/// config/rates/
/// └── 2025-26/
///     ├── tax_bands_rest_of_uk.yaml
///     ├── tax_bands_scotland.yaml
///     ├── tax_bands_wales.yaml
///     ├── ni_thresholds.yaml
///     ├── ni_categories.yaml
///     ├── nhs_pension_bands.yaml
///     └── student_loans.yaml
/// ```
///
/// A missing file is reported as an empty table so that the built-in
/// default is used; a file that exists but cannot be read or parsed is an
/// error.
///
/// # Example
///
/// ```no_run
/// use uk_payroll_engine::config::{RateTableCache, YamlRateSource};
/// use uk_payroll_engine::models::TaxYear;
///
/// # async fn run() {
/// let source = YamlRateSource::new("./config/rates");
/// let mut cache = RateTableCache::new();
/// let tables = cache.resolve(&source, TaxYear::new(2025)).await;
/// println!("UEL: {}", tables.ni_thresholds().uel);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YamlRateSource {
    root: PathBuf,
}

impl YamlRateSource {
    /// Creates a source rooted at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
        }
    }

    /// The directory holding a tax year's files.
    pub fn year_dir(&self, tax_year: TaxYear) -> PathBuf {
        self.root.join(tax_year.to_string())
    }

    /// Loads and parses a YAML file, treating a missing file as empty.
    async fn load_yaml<T: DeserializeOwned>(path: &Path) -> EngineResult<Option<T>> {
        let path_str = path.display().to_string();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path_str, "Rate table file not present");
                return Ok(None);
            }
            Err(_) => return Err(EngineError::ConfigNotFound { path: path_str }),
        };

        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| EngineError::ConfigParseError {
                path: path_str,
                message: e.to_string(),
            })
    }
}

impl RateTableProvider for YamlRateSource {
    async fn fetch_tax_bands(
        &self,
        region: TaxRegion,
        tax_year: TaxYear,
    ) -> EngineResult<Option<TaxBandTable>> {
        let path = self
            .year_dir(tax_year)
            .join(format!("tax_bands_{}.yaml", region.as_str()));
        let table: Option<TaxBandTable> = Self::load_yaml(&path).await?;

        match table {
            Some(table) if table.region != region => Err(EngineError::ConfigParseError {
                path: path.display().to_string(),
                message: format!("file declares region {} but {} was requested", table.region, region),
            }),
            other => Ok(other),
        }
    }

    async fn fetch_ni_thresholds(&self, tax_year: TaxYear) -> EngineResult<Option<NiThresholds>> {
        Self::load_yaml(&self.year_dir(tax_year).join("ni_thresholds.yaml")).await
    }

    async fn fetch_ni_category_tables(
        &self,
        tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<NiCategoryTable>>> {
        let file: Option<NiCategoriesFile> =
            Self::load_yaml(&self.year_dir(tax_year).join("ni_categories.yaml")).await?;
        Ok(file.map(|f| f.categories))
    }

    async fn fetch_nhs_pension_bands(
        &self,
        tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<NhsPensionBand>>> {
        let file: Option<NhsPensionBandsFile> =
            Self::load_yaml(&self.year_dir(tax_year).join("nhs_pension_bands.yaml")).await?;
        Ok(file.map(|f| f.bands))
    }

    async fn fetch_student_loan_thresholds(
        &self,
        tax_year: TaxYear,
    ) -> EngineResult<Option<Vec<StudentLoanThreshold>>> {
        let file: Option<StudentLoansFile> =
            Self::load_yaml(&self.year_dir(tax_year).join("student_loans.yaml")).await?;
        Ok(file.map(|f| f.plans))
    }
}
