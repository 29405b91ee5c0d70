//! National Insurance category letters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The NI category letter that selects an employee's rate table.
///
/// Parsing is strict: an unknown letter is an error, never category A.
///
/// ```
/// use uk_payroll_engine::models::NiCategory;
///
/// assert_eq!("m".parse::<NiCategory>().unwrap(), NiCategory::M);
/// assert!("Q".parse::<NiCategory>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NiCategory {
    /// Standard rate.
    A,
    /// Married women and widows entitled to pay reduced NI.
    B,
    /// Over State Pension age.
    C,
    /// Apprentice under 25.
    H,
    /// Deferred NI.
    J,
    /// Under 21.
    M,
    /// Armed forces veteran in the first civilian employment.
    V,
    /// No NI liability (e.g. under 16).
    X,
    /// Under 21 with deferred NI.
    Z,
}

impl NiCategory {
    /// Every supported category.
    pub const ALL: [NiCategory; 9] = [
        NiCategory::A,
        NiCategory::B,
        NiCategory::C,
        NiCategory::H,
        NiCategory::J,
        NiCategory::M,
        NiCategory::V,
        NiCategory::X,
        NiCategory::Z,
    ];

    /// The category letter.
    pub fn letter(&self) -> char {
        match self {
            NiCategory::A => 'A',
            NiCategory::B => 'B',
            NiCategory::C => 'C',
            NiCategory::H => 'H',
            NiCategory::J => 'J',
            NiCategory::M => 'M',
            NiCategory::V => 'V',
            NiCategory::X => 'X',
            NiCategory::Z => 'Z',
        }
    }

    /// Categories whose employer contributions start at the UEL instead of
    /// the Secondary Threshold.
    pub fn employer_relief_to_uel(&self) -> bool {
        matches!(
            self,
            NiCategory::M | NiCategory::H | NiCategory::V | NiCategory::Z
        )
    }
}

impl fmt::Display for NiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for NiCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidNiCategory {
            category: s.chars().take(2).collect(),
        };

        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        if chars.next().is_some() {
            return Err(invalid());
        }

        NiCategory::ALL
            .into_iter()
            .find(|category| category.letter() == letter.to_ascii_uppercase())
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for NiCategory {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NiCategory> for String {
    fn from(value: NiCategory) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_letters_case_insensitive() {
        for category in NiCategory::ALL {
            let lower = category.letter().to_ascii_lowercase().to_string();
            assert_eq!(lower.parse::<NiCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_letter_is_rejected() {
        let result = "Q".parse::<NiCategory>();
        assert!(matches!(
            result,
            Err(EngineError::InvalidNiCategory { category }) if category == "Q"
        ));
    }

    #[test]
    fn test_empty_and_multi_letter_are_rejected() {
        assert!("".parse::<NiCategory>().is_err());
        assert!("AB".parse::<NiCategory>().is_err());
    }

    #[test]
    fn test_employer_relief_categories() {
        let relieved: Vec<NiCategory> = NiCategory::ALL
            .into_iter()
            .filter(NiCategory::employer_relief_to_uel)
            .collect();
        assert_eq!(
            relieved,
            vec![NiCategory::H, NiCategory::M, NiCategory::V, NiCategory::Z]
        );
    }

    #[test]
    fn test_serde_as_letter() {
        let json = serde_json::to_string(&NiCategory::J).unwrap();
        assert_eq!(json, "\"J\"");
        let category: NiCategory = serde_json::from_str("\"z\"").unwrap();
        assert_eq!(category, NiCategory::Z);
    }
}
