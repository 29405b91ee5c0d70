//! Tax code parsing.
//!
//! This module turns an HMRC tax code string into a [`TaxCode`]. Parsing is
//! pure and strict: anything that is not a recognised code is an error and
//! never silently becomes a default.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{FlatRate, TaxBasis, TaxCode, TaxCodeKind, TaxRegion};

/// Longest accepted code after normalization, including any emergency marker.
pub const MAX_TAX_CODE_LENGTH: usize = 10;

/// Suffixes that put a code on the Week1/Month1 basis.
const EMERGENCY_MARKERS: [&str; 3] = ["W1", "M1", "X"];

/// Pence per unit of a tax code's numeric part (£10).
const PENCE_PER_CODE_UNIT: i64 = 1_000;

/// Allowance blocks of this many code units are worth exactly £5,000 a year.
const CODE_BLOCK: i64 = 500;

/// Trims, removes internal whitespace and uppercases a tax code.
pub fn normalize_tax_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Returns true if `input` parses as a supported tax code.
///
/// ```
/// use uk_payroll_engine::calculation::validate_tax_code;
///
/// assert!(validate_tax_code(" 1257l "));
/// assert!(validate_tax_code("K497"));
/// assert!(!validate_tax_code("ZZZZ"));
/// assert!(!validate_tax_code("S1257L"));
/// ```
pub fn validate_tax_code(input: &str) -> bool {
    parse_tax_code(input).is_ok()
}

/// Parses a tax code.
///
/// # Returns
///
/// Returns the parsed [`TaxCode`], or an error if:
/// - The code is empty, longer than [`MAX_TAX_CODE_LENGTH`] or not
///   alphanumeric (`UnrecognizedTaxCode`)
/// - The code carries an `S` or `C` region prefix (`UnsupportedTaxRegion`)
/// - The code matches no known format (`UnrecognizedTaxCode`)
///
/// # Free Pay
///
/// Standard and K codes use the HMRC divide-by-500 method: the numeric part
/// is split into whole blocks of 500 (each worth £5,000 a year) and a
/// remainder whose annual value is `remainder × 10 + 9`. The remainder's
/// monthly value is rounded up to the penny; the blocks are not rounded.
/// K codes negate the result.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::parse_tax_code;
/// use uk_payroll_engine::models::{TaxBasis, TaxCodeKind};
/// use rust_decimal::Decimal;
///
/// let code = parse_tax_code("K497").unwrap();
/// assert_eq!(code.kind, TaxCodeKind::KCode);
/// assert_eq!(code.monthly_free_pay, Decimal::new(-41492, 2));
///
/// let emergency = parse_tax_code("1257L M1").unwrap();
/// assert_eq!(emergency.basis, TaxBasis::NonCumulative);
/// ```
pub fn parse_tax_code(input: &str) -> EngineResult<TaxCode> {
    let raw = normalize_tax_code(input);
    let unrecognized = || EngineError::UnrecognizedTaxCode { code: raw.clone() };

    if raw.is_empty()
        || raw.len() > MAX_TAX_CODE_LENGTH
        || !raw.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(unrecognized());
    }

    let (body, basis) = split_emergency_marker(&raw);

    let region = region_for_prefix(body);
    if region != TaxRegion::RestOfUk {
        return Err(EngineError::UnsupportedTaxRegion { region });
    }

    let (kind, number) = classify(body).ok_or_else(unrecognized)?;
    let annual_allowance = match kind {
        TaxCodeKind::Standard => number * PENCE_PER_CODE_UNIT,
        TaxCodeKind::KCode => -number * PENCE_PER_CODE_UNIT,
        _ => 0,
    };

    let mut code = TaxCode {
        raw,
        kind,
        region,
        annual_allowance,
        monthly_free_pay: Decimal::ZERO,
        basis,
    };
    code.monthly_free_pay = free_pay_to_date(&code, 1);
    Ok(code)
}

/// Free pay accumulated over `periods` tax months.
///
/// Equal to `monthly_free_pay × periods`, but the £5,000 blocks are
/// multiplied before dividing by twelve so that whole-pound results stay
/// exact. Zero for every kind other than standard and K codes.
pub fn free_pay_to_date(code: &TaxCode, periods: u8) -> Decimal {
    let number = code.annual_allowance.abs() / PENCE_PER_CODE_UNIT;
    match code.kind {
        TaxCodeKind::Standard => divide_by_500_free_pay(number, periods),
        TaxCodeKind::KCode => -divide_by_500_free_pay(number, periods),
        TaxCodeKind::FlatRate(_) | TaxCodeKind::NoTax | TaxCodeKind::EmergencyZeroAllowance => {
            Decimal::ZERO
        }
    }
}

fn divide_by_500_free_pay(number: i64, periods: u8) -> Decimal {
    let periods = i64::from(periods);
    let blocks = number / CODE_BLOCK;
    let remainder = number % CODE_BLOCK;

    let remainder_annual = Decimal::from(remainder * 10 + 9);
    let remainder_monthly = round_up_to_penny(remainder_annual / Decimal::from(12));
    let blocks_to_date = Decimal::from(blocks * 5_000 * periods) / Decimal::from(12);

    remainder_monthly * Decimal::from(periods) + blocks_to_date
}

fn round_up_to_penny(amount: Decimal) -> Decimal {
    (amount * Decimal::ONE_HUNDRED).ceil() / Decimal::ONE_HUNDRED
}

fn split_emergency_marker(code: &str) -> (&str, TaxBasis) {
    EMERGENCY_MARKERS
        .iter()
        .find_map(|marker| code.strip_suffix(*marker).filter(|body| !body.is_empty()))
        .map_or((code, TaxBasis::Cumulative), |body| {
            (body, TaxBasis::NonCumulative)
        })
}

fn region_for_prefix(code: &str) -> TaxRegion {
    match code.as_bytes().first() {
        Some(b'S') => TaxRegion::Scotland,
        Some(b'C') => TaxRegion::Wales,
        _ => TaxRegion::RestOfUk,
    }
}

/// Matches the code body against the known formats, returning the kind
/// and the numeric part (zero for literal codes).
fn classify(body: &str) -> Option<(TaxCodeKind, i64)> {
    let literal = match body {
        "BR" => Some(TaxCodeKind::FlatRate(FlatRate::Br)),
        "D0" => Some(TaxCodeKind::FlatRate(FlatRate::D0)),
        "D1" => Some(TaxCodeKind::FlatRate(FlatRate::D1)),
        "NT" => Some(TaxCodeKind::NoTax),
        "0T" => Some(TaxCodeKind::EmergencyZeroAllowance),
        _ => None,
    };
    if let Some(kind) = literal {
        return Some((kind, 0));
    }

    if let Some(digits) = body.strip_prefix('K') {
        return parse_digits(digits).map(|number| (TaxCodeKind::KCode, number));
    }

    let (digits, suffix) = body.split_at(body.len().checked_sub(1)?);
    if !matches!(suffix, "L" | "M" | "N" | "T") {
        return None;
    }
    parse_digits(digits).map(|number| (TaxCodeKind::Standard, number))
}

/// Parses the numeric part of a code. Leading zeros are not issued, so
/// `00T` or `K05` is unrecognized rather than read as another code.
fn parse_digits(digits: &str) -> Option<i64> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
