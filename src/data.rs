//! Purchase data loading and value cleaning using Polars

use polars::prelude::*;

use crate::error::{Error, Result};

/// One observed transaction, cleaned and normalized.
///
/// `discount` is a percentage in `[0, 100]`, already stripped of its `%`
/// suffix; `category` is the leading segment of the raw `A|B|C` category
/// path.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub consumer_id: String,
    pub price: f64,
    pub discount: f64,
    pub category: String,
}

/// Load purchase records from a CSV export.
///
/// Expects the columns `user_id`, `discounted_price`, `discount_percentage`
/// and `category`; any further columns are ignored. Values arrive dirty in
/// real exports (currency symbols, thousands separators, `%` suffixes,
/// multi-valued id cells) and are cleaned here, before the core ever sees
/// them.
pub fn load_purchases(path: &str) -> Result<Vec<PurchaseRecord>> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .map_err(|e| Error::Data(format!("cannot open {path}: {e}")))?
        .select([
            col("user_id").cast(DataType::String),
            col("discounted_price").cast(DataType::String),
            col("discount_percentage").cast(DataType::String),
            col("category").cast(DataType::String),
        ])
        .collect()
        .map_err(|e| Error::Data(format!("cannot read {path}: {e}")))?;

    let ids = string_column(&df, "user_id")?;
    let prices = string_column(&df, "discounted_price")?;
    let discounts = string_column(&df, "discount_percentage")?;
    let categories = string_column(&df, "category")?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let consumer_id = ids
            .get(row)
            .map(first_id)
            .ok_or_else(|| Error::Data(format!("row {row}: missing consumer id")))?;
        let price = prices
            .get(row)
            .and_then(first_number)
            .ok_or_else(|| Error::Data(format!("row {row}: missing or unparseable price")))?;
        let discount = discounts
            .get(row)
            .and_then(first_number)
            .ok_or_else(|| Error::Data(format!("row {row}: missing or unparseable discount")))?;
        let category = categories
            .get(row)
            .map(main_category)
            .ok_or_else(|| Error::Data(format!("row {row}: missing category")))?;

        records.push(PurchaseRecord {
            consumer_id,
            price,
            discount,
            category,
        });
    }

    Ok(records)
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .and_then(|s| s.str())
        .map_err(|e| Error::Data(format!("column {name}: {e}")))
}

/// Extract the first numeric token from a dirty value such as `"₹1,099.50"`
/// or `"64%"`. Thousands separators inside the number are dropped.
fn first_number(raw: &str) -> Option<f64> {
    let mut token = String::new();
    let mut started = false;
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            token.push(ch);
            started = true;
        } else if started && ch == ',' {
            // thousands separator
            continue;
        } else if started && ch == '.' && !token.contains('.') {
            token.push(ch);
        } else if started {
            break;
        }
    }
    token.parse().ok()
}

/// Multi-valued id cells hold comma-separated ids; the first one identifies
/// the consumer.
fn first_id(raw: &str) -> String {
    raw.split(',').next().unwrap_or("").trim().to_string()
}

/// Category paths look like `"Computers|Accessories|Cables"`; the leading
/// segment is the main category.
fn main_category(raw: &str) -> String {
    raw.split('|').next().unwrap_or("").trim().to_string()
}
