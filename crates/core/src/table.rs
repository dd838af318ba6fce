//! Owned table state for the user grid.
//!
//! `TableState` holds the loaded records with their facets, the current
//! filter and sort order, and hands out visible rows and pages. Loads are
//! guarded by generation tickets: only the most recently started load may
//! replace the rows, so a slow load that finishes late cannot overwrite a
//! newer one.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facets::{FacetSet, compute_facets};
use crate::filter::FilterState;
use crate::types::{Column, UserRecord};

/// Rows per page.
pub const PAGE_SIZE: usize = 10;

/// Errors returned when the table is used outside its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// No load has completed yet.
    #[error("Table has not been loaded yet")]
    NotLoaded,

    /// The table was disposed and must be recreated.
    #[error("Table has been disposed")]
    Disposed,

    /// A newer load was started after this one.
    #[error("Load {ticket} was superseded by load {latest}")]
    Superseded { ticket: u64, latest: u64 },
}

/// Generation token handed out by [`TableState::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Generation number of this load.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse "asc" / "desc" (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Query-string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Column and direction the visible rows are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: Column::Id,
            direction: SortDirection::Asc,
        }
    }
}

/// One page of visible rows.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    /// Rows on this page.
    pub rows: Vec<&'a UserRecord>,
    /// 1-based page number (clamped into range).
    pub number: usize,
    /// Number of pages, at least 1.
    pub page_count: usize,
    /// 1-based position of the first row on this page, 0 if there are none.
    pub first_position: usize,
    /// 1-based position of the last row on this page, 0 if there are none.
    pub last_position: usize,
    /// Rows passing the filter.
    pub visible_count: usize,
    /// Rows loaded.
    pub total_count: usize,
}

impl Page<'_> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    /// Whether the filter hid some of the loaded rows.
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.visible_count != self.total_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Uninitialized,
    Ready,
    Disposed,
}

/// State of one user's grid.
#[derive(Debug, Clone)]
pub struct TableState {
    records: Vec<UserRecord>,
    facets: FacetSet,
    title: String,
    filter: FilterState,
    sort: SortOrder,
    latest_generation: u64,
    status: Status,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new()
    }
}

impl TableState {
    /// Create an empty, not yet loaded table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            facets: FacetSet::default(),
            title: String::new(),
            filter: FilterState::default(),
            sort: SortOrder::default(),
            latest_generation: 0,
            status: Status::Uninitialized,
        }
    }

    /// Start a load. The returned ticket must be passed to [`Self::set_rows`].
    ///
    /// Starting a load invalidates every ticket handed out before it.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_generation += 1;
        LoadTicket(self.latest_generation)
    }

    /// Replace all rows with the result of a load.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Disposed` if the table was disposed, or
    /// `TableError::Superseded` if a newer load was started after `ticket`.
    /// The table is left unchanged in both cases.
    pub fn set_rows(
        &mut self,
        ticket: LoadTicket,
        records: Vec<UserRecord>,
        title: impl Into<String>,
    ) -> Result<(), TableError> {
        self.ensure_live()?;
        if ticket.0 != self.latest_generation {
            return Err(TableError::Superseded {
                ticket: ticket.0,
                latest: self.latest_generation,
            });
        }

        self.facets = compute_facets(&records);
        self.records = records;
        self.title = title.into();
        self.status = Status::Ready;
        Ok(())
    }

    /// Replace the current filter.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Disposed` if the table was disposed.
    pub fn set_filter(&mut self, filter: FilterState) -> Result<(), TableError> {
        self.ensure_live()?;
        self.filter = filter;
        Ok(())
    }

    /// Replace the current sort order.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Disposed` if the table was disposed.
    pub fn set_sort(&mut self, sort: SortOrder) -> Result<(), TableError> {
        self.ensure_live()?;
        self.sort = sort;
        Ok(())
    }

    /// Rows passing the current filter, in the current sort order.
    ///
    /// # Errors
    ///
    /// Returns `TableError::NotLoaded` before the first load completes and
    /// `TableError::Disposed` after disposal.
    pub fn visible_rows(&self) -> Result<Vec<&UserRecord>, TableError> {
        self.ensure_ready()?;
        let rows: Vec<&UserRecord> = self
            .records
            .iter()
            .filter(|record| self.filter.is_visible(record))
            .collect();
        Ok(self.sorted(rows))
    }

    /// One page of visible rows. Out-of-range page numbers are clamped.
    ///
    /// # Errors
    ///
    /// Same as [`Self::visible_rows`].
    pub fn page(&self, number: usize) -> Result<Page<'_>, TableError> {
        let visible = self.visible_rows()?;
        let visible_count = visible.len();
        let page_count = visible_count.div_ceil(PAGE_SIZE).max(1);
        let number = number.clamp(1, page_count);
        let offset = (number - 1) * PAGE_SIZE;

        let rows: Vec<&UserRecord> = visible.into_iter().skip(offset).take(PAGE_SIZE).collect();
        let (first_position, last_position) = if rows.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + rows.len())
        };

        Ok(Page {
            rows,
            number,
            page_count,
            first_position,
            last_position,
            visible_count,
            total_count: self.records.len(),
        })
    }

    /// Facets computed at the last load.
    ///
    /// # Errors
    ///
    /// Same as [`Self::visible_rows`].
    pub fn facets(&self) -> Result<&FacetSet, TableError> {
        self.ensure_ready()?;
        Ok(&self.facets)
    }

    /// Sheet title recorded at the last load.
    ///
    /// # Errors
    ///
    /// Same as [`Self::visible_rows`].
    pub fn title(&self) -> Result<&str, TableError> {
        self.ensure_ready()?;
        Ok(&self.title)
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Current sort order.
    #[must_use]
    pub const fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Whether a load has completed and the table is live.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == Status::Ready
    }

    /// Whether the table was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.status == Status::Disposed
    }

    /// Drop all rows. Every later operation fails with `TableError::Disposed`.
    pub fn dispose(&mut self) {
        self.records = Vec::new();
        self.facets = FacetSet::default();
        self.title.clear();
        self.status = Status::Disposed;
    }

    fn ensure_live(&self) -> Result<(), TableError> {
        if self.status == Status::Disposed {
            return Err(TableError::Disposed);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), TableError> {
        match self.status {
            Status::Ready => Ok(()),
            Status::Uninitialized => Err(TableError::NotLoaded),
            Status::Disposed => Err(TableError::Disposed),
        }
    }

    /// Stable sort. A column whose non-empty values all parse as numbers
    /// sorts numerically (empty first); any other column sorts as
    /// case-insensitive text.
    fn sorted<'a>(&'a self, rows: Vec<&'a UserRecord>) -> Vec<&'a UserRecord> {
        let column = self.sort.column;
        let direction = self.sort.direction;
        let apply = |ordering: Ordering| match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if self.is_numeric_column(column) {
            let mut keyed: Vec<(Option<f64>, &UserRecord)> = rows
                .into_iter()
                .map(|record| (parse_number(column.value(record)), record))
                .collect();
            keyed.sort_by(|a, b| apply(compare_numbers(a.0, b.0)));
            keyed.into_iter().map(|(_, record)| record).collect()
        } else {
            let mut keyed: Vec<(String, &UserRecord)> = rows
                .into_iter()
                .map(|record| (column.value(record).to_lowercase(), record))
                .collect();
            keyed.sort_by(|a, b| apply(a.0.cmp(&b.0)));
            keyed.into_iter().map(|(_, record)| record).collect()
        }
    }

    fn is_numeric_column(&self, column: Column) -> bool {
        let mut values = self
            .records
            .iter()
            .map(|record| column.value(record).trim())
            .filter(|value| !value.is_empty())
            .peekable();
        values.peek().is_some() && values.all(|value| parse_number(value).is_some())
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn compare_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
