//! Raw spreadsheet rows.

/// Column positions of a sheet row.
pub const ID_COLUMN: usize = 0;
pub const ORDER_NUMBER_COLUMN: usize = 1;
pub const PRICE_COLUMN: usize = 2;
pub const DELIVERY_DATE_COLUMN: usize = 3;

/// One row as read from the sheet: `[id, order_number, price_usd, delivery_date]`.
///
/// The sheet omits trailing empty cells, so a row can be shorter than four
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow(Vec<String>);

impl RawRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Returns the field at `index`, if the row has one.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RawRow {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl<S: Into<String>> FromIterator<S> for RawRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
