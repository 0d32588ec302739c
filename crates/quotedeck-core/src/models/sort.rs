use std::fmt;
use std::str::FromStr;

use crate::error::QuotedeckError;

/// Fields the store can sort a listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Text,
    Author,
    CreatedAt,
    UpdatedAt,
}

pub const VALID_SORT_FIELDS: [&str; 4] = ["quote", "author", "created_at", "updated_at"];

impl SortField {
    /// Wire value for the `sort_by` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::Text => "quote",
            SortField::Author => "author",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for SortField {
    type Err = QuotedeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quote" => Ok(SortField::Text),
            "author" => Ok(SortField::Author),
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            other => Err(QuotedeckError::Validation(format!(
                "invalid sort field '{other}' (valid: {})",
                VALID_SORT_FIELDS.join(", ")
            ))),
        }
    }
}

/// The active sort order: which field, and which direction.
///
/// Reselecting the current field flips the direction; selecting a different
/// field switches to it ascending. The store default is newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            ascending: false,
        }
    }
}

impl SortSpec {
    pub fn new(field: SortField, ascending: bool) -> Self {
        Self { field, ascending }
    }

    /// Apply a sort-control click.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.ascending = !self.ascending;
        } else {
            self.field = field;
            self.ascending = true;
        }
    }

    /// Wire value for the `sort_order` query parameter.
    pub fn order_param(&self) -> &'static str {
        if self.ascending { "asc" } else { "desc" }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.order_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_roundtrip() {
        for name in VALID_SORT_FIELDS {
            let field: SortField = name.parse().unwrap();
            assert_eq!(field.as_param(), name);
        }
        assert!("popularity".parse::<SortField>().is_err());
    }

    #[test]
    fn test_default_is_newest_first() {
        let spec = SortSpec::default();
        assert_eq!(spec.field, SortField::CreatedAt);
        assert!(!spec.ascending);
        assert_eq!(spec.order_param(), "desc");
    }

    #[test]
    fn test_select_toggles_only_on_reselect() {
        let mut spec = SortSpec::default();

        spec.select(SortField::Author);
        assert_eq!(spec.field, SortField::Author);
        assert!(spec.ascending);

        spec.select(SortField::Author);
        assert!(!spec.ascending);

        spec.select(SortField::Author);
        assert!(spec.ascending);

        spec.select(SortField::Text);
        assert_eq!(spec.field, SortField::Text);
        assert!(spec.ascending);
    }
}
