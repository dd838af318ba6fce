//! Export matrix for writing the visible rows into a spreadsheet.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Column, UserRecord};

/// Last column letter of the export range (13 columns, A..M).
pub const LAST_COLUMN_LETTER: char = 'M';

static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src\s*=\s*"([^"]+)""#).expect("Invalid regex"));

/// Pull the image URL out of a photo cell.
///
/// Cells holding `<img src="...">` markup yield the `src` value. Markup
/// without a `src` attribute yields `""`. Anything else is treated as a plain
/// URL and returned trimmed.
#[must_use]
pub fn extract_photo_url(cell: &str) -> String {
    let trimmed = cell.trim();
    if let Some(captures) = IMG_SRC_RE.captures(trimmed) {
        return captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }
    if trimmed.starts_with('<') {
        return String::new();
    }
    trimmed.to_string()
}

/// Header row plus one row per exported record, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportMatrix {
    rows: Vec<Vec<String>>,
}

impl ExportMatrix {
    /// Build the matrix from records in display order.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UserRecord>) -> Self {
        let header: Vec<String> = Column::ALL
            .into_iter()
            .map(|column| column.key().to_string())
            .collect();

        let mut rows = vec![header];
        rows.extend(records.into_iter().map(|record| {
            Column::ALL
                .into_iter()
                .map(|column| match column {
                    Column::Photo => extract_photo_url(column.value(record)),
                    _ => column.value(record).to_string(),
                })
                .collect()
        }));

        Self { rows }
    }

    /// All rows, header first.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Consume the matrix, returning all rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    /// Total rows including the header.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows excluding the header.
    #[must_use]
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// A1 range covering the matrix on the given tab, e.g. `Users!A1:M4`.
    ///
    /// Tab names with anything other than letters, digits or `_` are quoted.
    #[must_use]
    pub fn range(&self, tab: &str) -> String {
        let tab = if tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            tab.to_string()
        } else {
            format!("'{}'", tab.replace('\'', "''"))
        };
        format!("{tab}!A1:{LAST_COLUMN_LETTER}{}", self.row_count())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn record(id: &str, photo: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            first_name: format!("User {id}"),
            photo: photo.to_string(),
            ..UserRecord::default()
        }
    }

    #[test]
    fn test_extract_from_img_markup() {
        assert_eq!(
            extract_photo_url(r#"<img src="https://x/a.png" width="40">"#),
            "https://x/a.png"
        );
    }

    #[test]
    fn test_markup_without_src_is_empty() {
        assert_eq!(extract_photo_url(r#"<img alt="nothing">"#), "");
    }

    #[test]
    fn test_plain_url_passes_through() {
        assert_eq!(extract_photo_url("  https://x/b.png "), "https://x/b.png");
        assert_eq!(extract_photo_url(""), "");
    }

    #[test]
    fn test_matrix_has_header_and_one_row_per_record() {
        let records = [
            record("1", r#"<img src="https://x/1.png">"#),
            record("2", ""),
            record("3", "https://x/3.png"),
        ];
        let matrix = ExportMatrix::from_records(&records);

        assert_eq!(matrix.row_count(), 4);
        assert_eq!(matrix.data_row_count(), 3);
        assert_eq!(matrix.rows()[0][0], "id");
        assert_eq!(matrix.rows()[0][12], "photo");
        assert_eq!(matrix.rows()[1][1], "User 1");
        assert_eq!(matrix.rows()[1][12], "https://x/1.png");
        assert_eq!(matrix.rows()[3][12], "https://x/3.png");
        assert_eq!(matrix.range("Users"), "Users!A1:M4");
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let matrix = ExportMatrix::from_records(std::iter::empty());
        assert_eq!(matrix.row_count(), 1);
        assert_eq!(matrix.data_row_count(), 0);
        assert_eq!(matrix.rows()[0].len(), 13);
        assert_eq!(matrix.range("Users"), "Users!A1:M1");
    }

    #[test]
    fn test_range_quotes_tab_names_with_spaces() {
        let matrix = ExportMatrix::from_records(std::iter::empty());
        assert_eq!(matrix.range("User List"), "'User List'!A1:M1");
        assert_eq!(matrix.range("Bob's"), "'Bob''s'!A1:M1");
    }
}
