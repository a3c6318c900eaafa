//! Turns raw screener rows into a deduplicated symbol listing

use crate::error::{Result, StocksError};
use crate::model::{RawRow, SourceTable, StockListing, StockRecord};

/// Header of the ticker column
pub const SYMBOL_COLUMN: &str = "Symbol";
/// Header of the company name column
pub const NAME_COLUMN: &str = "Name";
/// Header of the displayed intraday price column
pub const PRICE_COLUMN: &str = "Price (Intraday)";

/// Build a listing from a fetched table
pub fn normalize_table(table: &SourceTable) -> Result<StockListing> {
    normalize(&table.rows, &table.col_names)
}

/// Build a symbol → record listing from rows and their column headers
///
/// Column names must match exactly. When a symbol repeats, the last row
/// wins. An empty row set is a valid, empty listing.
pub fn normalize(rows: &[RawRow], col_names: &[String]) -> Result<StockListing> {
    let symbol_idx = column_index(col_names, SYMBOL_COLUMN)?;
    let name_idx = column_index(col_names, NAME_COLUMN)?;
    let price_idx = column_index(col_names, PRICE_COLUMN)?;

    let mut listing = StockListing::new();
    for (line, row) in rows.iter().enumerate() {
        let cell = |idx: usize, column: &str| {
            row.get(idx).cloned().ok_or_else(|| {
                StocksError::MalformedTable(format!(
                    "row {line} has {} cells, missing '{column}'",
                    row.len()
                ))
            })
        };

        let record = StockRecord {
            symbol: cell(symbol_idx, SYMBOL_COLUMN)?,
            name: cell(name_idx, NAME_COLUMN)?,
            price: cell(price_idx, PRICE_COLUMN)?,
        };
        listing.insert(record.symbol.clone(), record);
    }

    Ok(listing)
}

fn column_index(col_names: &[String], column: &str) -> Result<usize> {
    col_names
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| {
            tracing::error!(?col_names, "Source table is missing column '{}'", column);
            StocksError::MalformedTable(format!("missing column '{column}'"))
        })
}
