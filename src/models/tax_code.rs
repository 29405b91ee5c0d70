//! Parsed tax code model.
//!
//! A [`TaxCode`] is the structured form of an HMRC tax code string. It is
//! produced by [`crate::calculation::parse_tax_code`] and consumed by the
//! income tax calculation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The tax region a code or band table applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegion {
    /// England and Northern Ireland.
    RestOfUk,
    /// Scottish taxpayers (`S` prefix).
    Scotland,
    /// Welsh taxpayers (`C` prefix).
    Wales,
}

impl TaxRegion {
    /// All regions, in the order band tables are resolved.
    pub const ALL: [TaxRegion; 3] = [TaxRegion::RestOfUk, TaxRegion::Scotland, TaxRegion::Wales];

    /// Snake-case name used in rate table file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegion::RestOfUk => "rest_of_uk",
            TaxRegion::Scotland => "scotland",
            TaxRegion::Wales => "wales",
        }
    }
}

impl fmt::Display for TaxRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaxRegion::RestOfUk => "Rest of UK",
            TaxRegion::Scotland => "Scotland",
            TaxRegion::Wales => "Wales",
        };
        f.write_str(name)
    }
}

/// Flat-rate codes that tax all pay at a single rate with no allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlatRate {
    /// `BR`: basic rate, 20%.
    #[serde(rename = "BR")]
    Br,
    /// `D0`: higher rate, 40%.
    #[serde(rename = "D0")]
    D0,
    /// `D1`: additional rate, 45%.
    #[serde(rename = "D1")]
    D1,
}

impl FlatRate {
    /// The rate applied to all taxable pay.
    ///
    /// ```
    /// use uk_payroll_engine::models::FlatRate;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(FlatRate::D0.rate(), Decimal::new(40, 2));
    /// ```
    pub fn rate(&self) -> Decimal {
        match self {
            FlatRate::Br => Decimal::new(20, 2),
            FlatRate::D0 => Decimal::new(40, 2),
            FlatRate::D1 => Decimal::new(45, 2),
        }
    }

    /// The literal code for this rate.
    pub fn code(&self) -> &'static str {
        match self {
            FlatRate::Br => "BR",
            FlatRate::D0 => "D0",
            FlatRate::D1 => "D1",
        }
    }
}

/// Whether tax is calculated on year-to-date figures or per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBasis {
    /// Year-to-date figures are reconciled every period.
    #[default]
    Cumulative,
    /// Week1/Month1 emergency basis: each period is taxed in isolation.
    NonCumulative,
}

/// The kind of tax code, as a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "rate")]
pub enum TaxCodeKind {
    /// A numeric allowance with an `L`, `M`, `N` or `T` suffix.
    Standard,
    /// A `K` code: negative allowance that adds to taxable pay.
    KCode,
    /// `BR`, `D0` or `D1`: all pay taxed at one rate.
    FlatRate(FlatRate),
    /// `NT`: no tax is deducted.
    NoTax,
    /// `0T`: no allowance, normal bands apply.
    EmergencyZeroAllowance,
}

/// A parsed UK tax code.
///
/// # Example
///
/// ```
/// use uk_payroll_engine::calculation::parse_tax_code;
/// use uk_payroll_engine::models::TaxCodeKind;
///
/// let code = parse_tax_code("1257L").unwrap();
/// assert_eq!(code.kind, TaxCodeKind::Standard);
/// assert_eq!(code.annual_allowance, 1_257_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCode {
    /// The normalized code as entered (uppercase, no whitespace).
    pub raw: String,
    /// The kind of code.
    pub kind: TaxCodeKind,
    /// The region the code applies to.
    pub region: TaxRegion,
    /// Annual allowance in pence; negative for K codes.
    ///
    /// Zero for flat-rate, `0T` and `NT` codes. `NT` is never taxed, which
    /// is expressed through [`TaxCodeKind::NoTax`] rather than this field.
    pub annual_allowance: i64,
    /// Free pay per tax month; negative for K codes.
    pub monthly_free_pay: Decimal,
    /// The basis the code requests.
    pub basis: TaxBasis,
}

impl TaxCode {
    /// Returns true for `K` codes.
    pub fn is_k_code(&self) -> bool {
        self.kind == TaxCodeKind::KCode
    }

    /// Returns true for codes on the Week1/Month1 basis.
    pub fn is_non_cumulative(&self) -> bool {
        self.basis == TaxBasis::NonCumulative
    }
}

impl fmt::Display for TaxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rates() {
        assert_eq!(FlatRate::Br.rate(), Decimal::new(20, 2));
        assert_eq!(FlatRate::D0.rate(), Decimal::new(40, 2));
        assert_eq!(FlatRate::D1.rate(), Decimal::new(45, 2));
    }

    #[test]
    fn test_region_file_names() {
        assert_eq!(TaxRegion::RestOfUk.as_str(), "rest_of_uk");
        assert_eq!(TaxRegion::Scotland.as_str(), "scotland");
        assert_eq!(TaxRegion::Wales.as_str(), "wales");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&TaxCodeKind::FlatRate(FlatRate::D1)).unwrap();
        assert_eq!(json, r#"{"type":"flat_rate","rate":"D1"}"#);

        let json = serde_json::to_string(&TaxCodeKind::KCode).unwrap();
        assert_eq!(json, r#"{"type":"k_code"}"#);
    }

    #[test]
    fn test_basis_defaults_to_cumulative() {
        assert_eq!(TaxBasis::default(), TaxBasis::Cumulative);
    }
}
