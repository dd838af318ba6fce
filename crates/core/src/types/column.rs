//! Column definitions for user records.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::record::UserRecord;

/// A column of the user table.
///
/// Variant order is the fixed display and export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    FirstName,
    LastName,
    Email,
    Gender,
    City,
    Country,
    CountryCode,
    State,
    StreetAddress,
    JobTitle,
    CompanyName,
    Photo,
}

impl Column {
    /// Every column, in display and export order.
    pub const ALL: [Self; 13] = [
        Self::Id,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Gender,
        Self::City,
        Self::Country,
        Self::CountryCode,
        Self::State,
        Self::StreetAddress,
        Self::JobTitle,
        Self::CompanyName,
        Self::Photo,
    ];

    /// Columns that get a facet (select) filter.
    pub const FACETS: [Self; 6] = [
        Self::Gender,
        Self::City,
        Self::Country,
        Self::State,
        Self::JobTitle,
        Self::CompanyName,
    ];

    /// Column key, used as the table header, query parameter and export header.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Gender => "gender",
            Self::City => "city",
            Self::Country => "country",
            Self::CountryCode => "country_code",
            Self::State => "state",
            Self::StreetAddress => "street_address",
            Self::JobTitle => "job_title",
            Self::CompanyName => "company_name",
            Self::Photo => "photo",
        }
    }

    /// Human-readable label for filter controls.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Email => "Email",
            Self::Gender => "Gender",
            Self::City => "City",
            Self::Country => "Country",
            Self::CountryCode => "Country Code",
            Self::State => "State",
            Self::StreetAddress => "Street Address",
            Self::JobTitle => "Job Title",
            Self::CompanyName => "Company Name",
            Self::Photo => "Photo",
        }
    }

    /// Parse a column from its key.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Whether this column has a facet filter.
    #[must_use]
    pub fn is_facet(self) -> bool {
        Self::FACETS.contains(&self)
    }

    /// Borrow this column's value from a record.
    #[must_use]
    pub fn value(self, record: &UserRecord) -> &str {
        match self {
            Self::Id => &record.id,
            Self::FirstName => &record.first_name,
            Self::LastName => &record.last_name,
            Self::Email => &record.email,
            Self::Gender => &record.gender,
            Self::City => &record.city,
            Self::Country => &record.country,
            Self::CountryCode => &record.country_code,
            Self::State => &record.state,
            Self::StreetAddress => &record.street_address,
            Self::JobTitle => &record.job_title,
            Self::CompanyName => &record.company_name,
            Self::Photo => &record.photo,
        }
    }

    /// Mutable access to this column's value, used while normalizing rows.
    pub(crate) fn value_mut(self, record: &mut UserRecord) -> &mut String {
        match self {
            Self::Id => &mut record.id,
            Self::FirstName => &mut record.first_name,
            Self::LastName => &mut record.last_name,
            Self::Email => &mut record.email,
            Self::Gender => &mut record.gender,
            Self::City => &mut record.city,
            Self::Country => &mut record.country,
            Self::CountryCode => &mut record.country_code,
            Self::State => &mut record.state,
            Self::StreetAddress => &mut record.street_address,
            Self::JobTitle => &mut record.job_title,
            Self::CompanyName => &mut record.company_name,
            Self::Photo => &mut record.photo,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
