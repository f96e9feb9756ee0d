use serde::{Deserialize, Serialize};

/// Column names of the record, in the order the model expects them.
pub const RECORD_COLUMNS: [&str; 7] = [
    "carat", "cut", "color", "clarity", "depth", "table", "xyz",
];

/// One fixed-schema row handed to the price model.
///
/// `xyz` is the product of the three measured dimensions, a proxy for volume.
/// A record only exists once every numeric input validated and every
/// categorical input was selected; see [`crate::pipeline::assemble`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondRecord {
    pub carat: f64,
    pub cut: String,
    pub color: String,
    pub clarity: String,
    pub depth: f64,
    pub table: f64,
    pub xyz: f64,
}

/// A single cell of a [`DiamondRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl DiamondRecord {
    /// Look up a cell by column name.
    pub fn value(&self, column: &str) -> Option<RecordValue<'_>> {
        match column {
            "carat" => Some(RecordValue::Number(self.carat)),
            "cut" => Some(RecordValue::Text(&self.cut)),
            "color" => Some(RecordValue::Text(&self.color)),
            "clarity" => Some(RecordValue::Text(&self.clarity)),
            "depth" => Some(RecordValue::Number(self.depth)),
            "table" => Some(RecordValue::Number(self.table)),
            "xyz" => Some(RecordValue::Number(self.xyz)),
            _ => None,
        }
    }

    /// All cells in schema order.
    pub fn values(&self) -> [RecordValue<'_>; 7] {
        [
            RecordValue::Number(self.carat),
            RecordValue::Text(&self.cut),
            RecordValue::Text(&self.color),
            RecordValue::Text(&self.clarity),
            RecordValue::Number(self.depth),
            RecordValue::Number(self.table),
            RecordValue::Number(self.xyz),
        ]
    }
}
