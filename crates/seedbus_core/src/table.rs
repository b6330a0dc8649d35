//! Raw scenario tables.

use crate::error::{SeedError, SeedResult};

/// One raw row: external labels paired with unparsed cell text, in column
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow(Vec<(String, String)>);

impl RawRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from label/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Appends a cell.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.0.push((label.into(), value.into()));
    }

    /// Returns the value of the first cell with the given label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates cells in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// A pre-parsed scenario table: a header of external labels and rows of
/// cell text.
///
/// # Example
///
/// ```rust
/// use seedbus_core::Table;
///
/// let table = Table::from_rows(vec![
///     vec!["Name".to_string(), "Desc".to_string()],
///     vec!["Keynote".to_string(), "Opening talk".to_string()],
/// ])
/// .unwrap();
///
/// let rows = table.raw_rows();
/// assert_eq!(rows[0].get("Desc"), Some("Opening talk"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table with the given header and no rows.
    #[must_use]
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table whose first row is the header.
    ///
    /// An empty input yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::MalformedTable`] if a row is wider or narrower
    /// than the header.
    pub fn from_rows(rows: Vec<Vec<String>>) -> SeedResult<Self> {
        let mut rows = rows.into_iter();
        let Some(headers) = rows.next() else {
            return Ok(Self::default());
        };

        let mut table = Self {
            headers,
            rows: Vec::new(),
        };
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Appends a data row.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::MalformedTable`] on a width mismatch.
    pub fn push_row(&mut self, row: Vec<String>) -> SeedResult<()> {
        if row.len() != self.headers.len() {
            return Err(SeedError::malformed_table(format!(
                "row {} has {} cells but the header has {}",
                self.rows.len() + 1,
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the header labels.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pairs each data row with the header.
    #[must_use]
    pub fn raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn header_row_labels_cells() {
        let table = Table::from_rows(vec![
            cells(&["Name", "Date"]),
            cells(&["Launch", "01/02/2024"]),
            cells(&["Party", "03/02/2024"]),
        ])
        .unwrap();

        assert_eq!(table.headers(), &cells(&["Name", "Date"]));
        assert_eq!(table.len(), 2);

        let rows = table.raw_rows();
        assert_eq!(rows[1].get("Name"), Some("Party"));
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![("Name", "Launch"), ("Date", "01/02/2024")]
        );
    }

    #[test]
    fn width_mismatch_is_malformed() {
        let err = Table::from_rows(vec![cells(&["Name", "Date"]), cells(&["Launch"])])
            .unwrap_err();
        assert!(matches!(err, SeedError::MalformedTable { .. }));
    }

    #[test]
    fn empty_input_is_empty_table() {
        let table = Table::from_rows(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.raw_rows().is_empty());
    }

    #[test]
    fn raw_row_keeps_column_order() {
        let mut row = RawRow::new();
        row.push("b", "2");
        row.push("a", "1");
        assert_eq!(row.iter().map(|(l, _)| l).collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.get("missing"), None);
    }
}
