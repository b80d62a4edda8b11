//! Shared traits and enums for engine records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for rows supplied by the data provider.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Associates rows with optional category ownership.
pub trait BelongsToCategory {
    fn category_id(&self) -> Option<Uuid>;
}

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three ASCII letters, as ISO 4217 alphabetic codes are.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|ch| ch.is_ascii_uppercase())
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Cadence at which a row repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn is_recurring(self) -> bool {
        !matches!(self, Frequency::Once)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Once => "once",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        };
        f.write_str(label)
    }
}

/// Label used for rows without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Renders an optional category id as the key used by per-category series.
pub fn category_key(category_id: Option<Uuid>) -> String {
    category_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_are_normalized() {
        let code = CurrencyCode::new(" eur ");
        assert_eq!(code.as_str(), "EUR");
        assert!(code.is_well_formed());
        assert!(!CurrencyCode::new("EURO").is_well_formed());
    }

    #[test]
    fn frequency_uses_lowercase_wire_names() {
        let parsed: Frequency = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(parsed, Frequency::Weekly);
        assert_eq!(serde_json::to_string(&Frequency::Once).unwrap(), "\"once\"");
    }

    #[test]
    fn missing_category_maps_to_bucket() {
        assert_eq!(category_key(None), UNCATEGORIZED);
        let id = Uuid::new_v4();
        assert_eq!(category_key(Some(id)), id.to_string());
    }
}
