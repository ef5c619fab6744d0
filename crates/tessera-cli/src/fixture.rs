//! TOML fixtures: data set stores and legacy workbooks.
//!
//! A store lists data set lists with their attributes and data sets:
//!
//! ```toml
//! [[lists]]
//! name = "Customers"
//! attributes = [
//!     { name = "age" },
//!     { name = "tier", options = ["gold", "silver"] },
//!     { name = "address", references = "Addresses" },
//! ]
//!
//! [[lists.datasets]]
//! name = "alice"
//! values = { age = "42", tier = { option = "gold" }, address = { dataset = "home" } }
//! ```
//!
//! A workbook holds cells by sheet and address; row 1 names data sets and
//! column `A` names attributes:
//!
//! ```toml
//! [[sheets]]
//! name = "Customers"
//! cells = { B1 = "alice", A2 = "age", B2 = "=RANDBETWEEN(18,99)" }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use tessera::{
    TesseraError,
    migration::{Cell, CellLocation},
    store::{DataSetBuilder, ListBuilder, MemoryStore, MemoryStoreBuilder},
};

#[derive(Debug, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    lists: Vec<ListFixture>,
}

#[derive(Debug, Deserialize)]
struct ListFixture {
    name: String,
    #[serde(default)]
    attributes: Vec<AttributeFixture>,
    #[serde(default)]
    datasets: Vec<DataSetFixture>,
}

#[derive(Debug, Deserialize)]
struct AttributeFixture {
    name: String,
    options: Option<Vec<String>>,
    references: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataSetFixture {
    name: String,
    #[serde(default)]
    values: IndexMap<String, ValueFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValueFixture {
    Text(String),
    Choice { option: String },
    Reference { dataset: String },
}

impl StoreFixture {
    /// Parse a store fixture.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Fixture` for malformed TOML.
    pub fn from_toml(source: &str) -> Result<Self, TesseraError> {
        toml::from_str(source).map_err(|err| TesseraError::Fixture(err.to_string()))
    }

    /// Build the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Fixture` for an attribute that has both options
    /// and a reference target, and `TesseraError::Core` when names do not
    /// resolve.
    pub fn into_store(self) -> Result<MemoryStore, TesseraError> {
        let mut builder = MemoryStoreBuilder::default();
        for list in self.lists {
            builder = builder.add_list(list.into_builder()?);
        }
        Ok(builder.build()?)
    }
}

impl ListFixture {
    fn into_builder(self) -> Result<ListBuilder, TesseraError> {
        let mut builder = ListBuilder::new(&self.name);
        for attribute in self.attributes {
            builder = match (attribute.options, attribute.references) {
                (None, None) => builder.attribute(attribute.name),
                (Some(options), None) => builder.list_attribute(attribute.name, options),
                (None, Some(target)) => builder.reference_attribute(attribute.name, target),
                (Some(_), Some(_)) => {
                    return Err(TesseraError::Fixture(format!(
                        "attribute `{}` of list `{}` has both options and a reference",
                        attribute.name, self.name
                    )));
                }
            };
        }

        for dataset in self.datasets {
            let values = dataset.values.into_iter().fold(
                DataSetBuilder::new(dataset.name),
                |ds, (attribute, value)| match value {
                    ValueFixture::Text(text) => ds.text(attribute, text),
                    ValueFixture::Choice { option } => ds.list_value(attribute, option),
                    ValueFixture::Reference { dataset } => ds.reference(attribute, dataset),
                },
            );
            builder = builder.add_dataset(values);
        }
        Ok(builder)
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkbookFixture {
    #[serde(default)]
    sheets: Vec<SheetFixture>,
}

#[derive(Debug, Deserialize)]
struct SheetFixture {
    name: String,
    #[serde(default)]
    cells: IndexMap<String, String>,
}

impl WorkbookFixture {
    /// Parse a workbook fixture.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Fixture` for malformed TOML.
    pub fn from_toml(source: &str) -> Result<Self, TesseraError> {
        toml::from_str(source).map_err(|err| TesseraError::Fixture(err.to_string()))
    }

    /// Every cell, sheet by sheet in file order.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Fixture` for an address that is not column
    /// letters followed by a row number.
    pub fn into_cells(self) -> Result<Vec<Cell>, TesseraError> {
        let mut cells = Vec::new();
        for sheet in self.sheets {
            for (address, text) in sheet.cells {
                let (column, row) = split_address(&address).ok_or_else(|| {
                    TesseraError::Fixture(format!(
                        "invalid cell address `{address}` in sheet `{}`",
                        sheet.name
                    ))
                })?;
                cells.push(Cell::new(CellLocation::new(&sheet.name, column, row), text));
            }
        }
        Ok(cells)
    }
}

/// `B12` into (`B`, 12).
fn split_address(address: &str) -> Option<(&str, u32)> {
    let digits = address.find(|c: char| c.is_ascii_digit())?;
    let (column, row) = address.split_at(digits);
    if column.is_empty() || !column.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let row: u32 = row.parse().ok()?;
    (row > 0).then_some((column, row))
}
