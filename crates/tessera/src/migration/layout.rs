//! Mapping of workbook cells onto the data set graph.
//!
//! Each sheet holds one data set list. Row 1 names a data set per column,
//! column `A` names an attribute per row, and the cell at a data set's
//! column and an attribute's row holds that parameter:
//!
//! ```text
//!       A        B        C
//!   1            alice    bob
//!   2   name     Alice    Bob
//!   3   age      42       =B3
//! ```

use indexmap::IndexMap;

use crate::migration::{
    TransformationError,
    expr::CellRef,
    formula::{Cell, CellLocation},
};

/// Row holding data set names
pub const HEADER_ROW: u32 = 1;

/// Column holding attribute names
pub const LABEL_COLUMN: &str = "A";

/// Layout of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLayout {
    list: String,
    datasets: IndexMap<String, String>,
    attributes: IndexMap<u32, String>,
}

impl SheetLayout {
    /// A sheet whose data sets belong to `list`.
    pub fn new(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            ..Self::default()
        }
    }

    pub fn with_dataset(mut self, column: impl Into<String>, name: impl Into<String>) -> Self {
        self.datasets
            .insert(column.into().to_ascii_uppercase(), name.into());
        self
    }

    pub fn with_attribute(mut self, row: u32, name: impl Into<String>) -> Self {
        self.attributes.insert(row, name.into());
        self
    }

    pub fn list(&self) -> &str {
        &self.list
    }

    pub fn dataset(&self, column: &str) -> Option<&str> {
        self.datasets.get(column).map(String::as_str)
    }

    pub fn attribute(&self, row: u32) -> Option<&str> {
        self.attributes.get(&row).map(String::as_str)
    }
}

/// Layouts of every sheet of a workbook, by sheet name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookLayout {
    sheets: IndexMap<String, SheetLayout>,
}

impl WorkbookLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>, layout: SheetLayout) -> Self {
        self.sheets.insert(sheet.into(), layout);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetLayout> {
        self.sheets.get(name)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &SheetLayout)> {
        self.sheets.iter().map(|(name, layout)| (name.as_str(), layout))
    }

    /// Derive the layout from header and label cells. Each sheet maps to the
    /// list of the same name; formula cells never name anything.
    pub fn from_cells<'c>(cells: impl IntoIterator<Item = &'c Cell>) -> Self {
        let mut layout = Self::new();
        for cell in cells {
            let location = cell.location();
            let name = cell.text().trim();
            if cell.is_formula() || name.is_empty() {
                continue;
            }

            let sheet = layout
                .sheets
                .entry(location.sheet().to_string())
                .or_insert_with(|| SheetLayout::new(location.sheet()));
            let is_header = location.row() == HEADER_ROW;
            let is_label = location.column() == LABEL_COLUMN;
            match (is_header, is_label) {
                (true, false) => {
                    sheet
                        .datasets
                        .insert(location.column().to_string(), name.to_string());
                }
                (false, true) => {
                    sheet.attributes.insert(location.row(), name.to_string());
                }
                _ => {}
            }
        }
        layout
    }

    /// Macro text referencing `target` from a formula at `from`.
    ///
    /// The shortest alias that reaches the target is used: `ATTR` within
    /// the same data set column, `DS` within the same sheet, `DSL` across
    /// sheets.
    pub fn reference(
        &self,
        from: &CellLocation,
        target: &CellRef,
    ) -> Result<String, TransformationError> {
        let sheet_name = target.sheet().unwrap_or(from.sheet());
        let sheet = self
            .sheet(sheet_name)
            .ok_or_else(|| TransformationError::UnknownSheet(sheet_name.to_string()))?;

        let dataset = sheet
            .dataset(target.column())
            .ok_or_else(|| TransformationError::NotADataCell {
                reference: target.to_string(),
                reason: format!("column {} has no data set header", target.column()),
            })?;
        let attribute = sheet
            .attribute(target.row())
            .ok_or_else(|| TransformationError::NotADataCell {
                reference: target.to_string(),
                reason: format!("row {} has no attribute label", target.row()),
            })?;

        let same_sheet = sheet_name == from.sheet();
        Ok(if same_sheet && target.column() == from.column() {
            format!("#REF(ATTR.{attribute})")
        } else if same_sheet {
            format!("#REF(DS.{dataset}.{attribute})")
        } else {
            format!("#REF(DSL.{}.{dataset}.{attribute})", sheet.list())
        })
    }
}

/// One-based index of column letters: `A` is 1, `AA` is 27.
pub fn column_index(column: &str) -> u32 {
    column
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .fold(0, |index, letter| {
            index * 26 + u32::from(letter.to_ascii_uppercase() - b'A' + 1)
        })
}

/// Column letters of a one-based index.
pub fn column_name(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(char::from(b'A' + remainder as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells() -> Vec<Cell> {
        let cell = |sheet: &str, column: &str, row, text: &str| {
            Cell::new(CellLocation::new(sheet, column, row), text)
        };
        vec![
            cell("Customers", "B", 1, "alice"),
            cell("Customers", "C", 1, "bob"),
            cell("Customers", "A", 2, "name"),
            cell("Customers", "A", 3, "age"),
            cell("Customers", "B", 2, "Alice"),
            cell("Customers", "C", 3, "=B3"),
            cell("Addresses", "B", 1, "home"),
            cell("Addresses", "A", 2, "city"),
        ]
    }

    #[test]
    fn test_from_cells() {
        let layout = WorkbookLayout::from_cells(&cells());
        let customers = layout.sheet("Customers").expect("sheet");
        assert_eq!(customers.list(), "Customers");
        assert_eq!(customers.dataset("B"), Some("alice"));
        assert_eq!(customers.dataset("C"), Some("bob"));
        assert_eq!(customers.attribute(3), Some("age"));
        assert_eq!(customers.attribute(4), None);
        assert_eq!(layout.sheets().count(), 2);
    }

    #[test]
    fn test_reference_uses_shortest_alias() {
        let layout = WorkbookLayout::from_cells(&cells());
        let from = CellLocation::new("Customers", "C", 3);

        let same_column = CellRef::new(None, "C", 2);
        assert_eq!(
            layout.reference(&from, &same_column),
            Ok("#REF(ATTR.name)".to_string())
        );

        let same_sheet = CellRef::new(None, "B", 3);
        assert_eq!(
            layout.reference(&from, &same_sheet),
            Ok("#REF(DS.alice.age)".to_string())
        );

        let other_sheet = CellRef::new(Some("Addresses".to_string()), "B", 2);
        assert_eq!(
            layout.reference(&from, &other_sheet),
            Ok("#REF(DSL.Addresses.home.city)".to_string())
        );
    }

    #[test]
    fn test_reference_outside_data_area() {
        let layout = WorkbookLayout::from_cells(&cells());
        let from = CellLocation::new("Customers", "B", 2);

        assert!(matches!(
            layout.reference(&from, &CellRef::new(None, "Z", 2)),
            Err(TransformationError::NotADataCell { .. })
        ));
        assert!(matches!(
            layout.reference(&from, &CellRef::new(Some("Nope".to_string()), "B", 2)),
            Err(TransformationError::UnknownSheet(_))
        ));
    }

    #[test]
    fn test_explicit_layout() {
        let layout = WorkbookLayout::new().with_sheet(
            "Sheet1",
            SheetLayout::new("Orders")
                .with_dataset("b", "first")
                .with_attribute(2, "total"),
        );
        let from = CellLocation::new("Other", "B", 2);
        assert_eq!(
            layout.reference(&from, &CellRef::new(Some("Sheet1".to_string()), "B", 2)),
            Ok("#REF(DSL.Orders.first.total)".to_string())
        );
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_index("A"), 1);
        assert_eq!(column_index("Z"), 26);
        assert_eq!(column_index("AA"), 27);
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(28), "AB");
        assert_eq!(column_name(column_index("XFD")), "XFD");
    }
}
