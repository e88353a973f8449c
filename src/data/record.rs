//! Inventory records and the fixed column layout of the grid

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GridError;

/// Keys of the fixed column set, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKey {
    Id,
    Code,
    Name,
    Brand,
    CarType,
    Price,
    PriceCode,
    Date,
    Quantity,
}

impl ColumnKey {
    pub const ALL: [ColumnKey; 9] = [
        ColumnKey::Id,
        ColumnKey::Code,
        ColumnKey::Name,
        ColumnKey::Brand,
        ColumnKey::CarType,
        ColumnKey::Price,
        ColumnKey::PriceCode,
        ColumnKey::Date,
        ColumnKey::Quantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKey::Id => "id",
            ColumnKey::Code => "code",
            ColumnKey::Name => "name",
            ColumnKey::Brand => "brand",
            ColumnKey::CarType => "car_type",
            ColumnKey::Price => "price",
            ColumnKey::PriceCode => "price_code",
            ColumnKey::Date => "date",
            ColumnKey::Quantity => "quantity",
        }
    }

    /// Title shown in the header row
    pub fn default_title(&self) -> &'static str {
        match self {
            ColumnKey::Id => "NO",
            ColumnKey::Code => "KODE BARANG",
            ColumnKey::Name => "NAMA BARANG",
            ColumnKey::Brand => "MEREK",
            ColumnKey::CarType => "TIPE MOBIL",
            ColumnKey::Price => "PRICELIST",
            ColumnKey::PriceCode => "HB AKHIR",
            ColumnKey::Date => "TB AKHIR",
            ColumnKey::Quantity => "QTY",
        }
    }

    /// The identifier column is excluded from user sorting and filtering
    pub fn is_identifier(&self) -> bool {
        matches!(self, ColumnKey::Id)
    }

    /// Columns a user may filter on
    pub fn filterable() -> impl Iterator<Item = ColumnKey> {
        Self::ALL.into_iter().filter(|key| !key.is_identifier())
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnKey {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| GridError::InvalidColumn(s.to_string()))
    }
}

/// A scalar cell value as the grid sees it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CellValue<'a> {
    Number(i64),
    Text(&'a str),
}

impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One stock item row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub brand: String,
    pub car_type: String,
    pub price: i64,
    pub price_code: String,
    pub date: String,
    pub quantity: i64,
}

impl Record {
    pub fn value(&self, key: ColumnKey) -> CellValue<'_> {
        match key {
            ColumnKey::Id => CellValue::Number(self.id),
            ColumnKey::Code => CellValue::Text(&self.code),
            ColumnKey::Name => CellValue::Text(&self.name),
            ColumnKey::Brand => CellValue::Text(&self.brand),
            ColumnKey::CarType => CellValue::Text(&self.car_type),
            ColumnKey::Price => CellValue::Number(self.price),
            ColumnKey::PriceCode => CellValue::Text(&self.price_code),
            ColumnKey::Date => CellValue::Text(&self.date),
            ColumnKey::Quantity => CellValue::Number(self.quantity),
        }
    }

    /// Display text of a single cell
    pub fn display_value(&self, key: ColumnKey) -> String {
        self.value(key).to_string()
    }

    /// Build a record holding, per column, the longest value found in `rows`.
    ///
    /// Used as the representative sample for column sizing so widths are
    /// measured once per result instead of once per row.
    pub fn widest_of<'a, I>(rows: I) -> Record
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut widest = Record::default();
        for row in rows {
            pick_wider_number(&mut widest.id, row.id);
            pick_wider_text(&mut widest.code, &row.code);
            pick_wider_text(&mut widest.name, &row.name);
            pick_wider_text(&mut widest.brand, &row.brand);
            pick_wider_text(&mut widest.car_type, &row.car_type);
            pick_wider_number(&mut widest.price, row.price);
            pick_wider_text(&mut widest.price_code, &row.price_code);
            pick_wider_text(&mut widest.date, &row.date);
            pick_wider_number(&mut widest.quantity, row.quantity);
        }
        widest
    }
}

fn pick_wider_text(current: &mut String, candidate: &str) {
    if candidate.chars().count() > current.chars().count() {
        *current = candidate.to_string();
    }
}

fn pick_wider_number(current: &mut i64, candidate: i64) {
    if candidate.to_string().len() > current.to_string().len() {
        *current = candidate;
    }
}

/// Ordered column keys with their titles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<(ColumnKey, String)>,
}

impl ColumnSpec {
    /// Iterate keys and titles in display order
    pub fn iter(&self) -> impl Iterator<Item = (ColumnKey, &str)> {
        self.columns.iter().map(|(key, title)| (*key, title.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.columns.iter().map(|(key, _)| *key)
    }

    pub fn title(&self, key: ColumnKey) -> Option<&str> {
        self.columns
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, title)| title.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn key_at(&self, index: usize) -> Option<ColumnKey> {
        self.columns.get(index).map(|(key, _)| *key)
    }

    /// Replace the title of a column, keeping the order intact
    pub fn with_title(mut self, key: ColumnKey, title: impl Into<String>) -> Self {
        if let Some(entry) = self.columns.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = title.into();
        }
        self
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            columns: ColumnKey::ALL
                .into_iter()
                .map(|key| (key, key.default_title().to_string()))
                .collect(),
        }
    }
}
