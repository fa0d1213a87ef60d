use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::parse::Cell;
use crate::schema::LogicalField;

/// One row as handed to a caller: original column names, nulls made explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn from_row(columns: &[String], row: &[Cell]) -> Self {
        Self {
            fields: columns
                .iter()
                .zip(row)
                .map(|(name, cell)| (name.clone(), cell.to_json()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Serialized as a JSON object in dataset column order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub total: usize,
    pub rows: Vec<Record>,
}

impl QueryResult {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            total: rows.len(),
            rows,
        }
    }
}

/// Distinct values with their frequency, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl ValueCounts {
    pub fn add(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(value.to_string(), self.entries.len());
                self.entries.push((value.to_string(), 1));
            }
        }
    }

    pub fn get(&self, value: &str) -> Option<u64> {
        self.index.get(value).map(|&i| self.entries[i].1)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(v, n)| (v.as_str(), *n))
    }
}

impl Serialize for ValueCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (value, count) in &self.entries {
            map.serialize_entry(value, count)?;
        }
        map.end()
    }
}

/// Overview of the loaded roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_records: usize,
    pub counts: BTreeMap<LogicalField, ValueCounts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_in_column_order_with_nulls() {
        let columns = vec!["documento".to_string(), "Top2011".to_string(), "Nombres".to_string()];
        let row = vec![Cell::Int(123), Cell::Float(f64::NAN), Cell::Text("ANA".into())];
        let rec = Record::from_row(&columns, &row);

        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"documento":123,"Top2011":null,"Nombres":"ANA"}"#);
        assert_eq!(rec.get("Top2011"), Some(&Value::Null));
    }

    #[test]
    fn value_counts_keep_first_seen_order() {
        let mut counts = ValueCounts::default();
        for v in ["LIMA", "CUSCO", "LIMA", "PIURA", "LIMA"] {
            counts.add(v);
        }
        let order: Vec<_> = counts.iter().collect();
        assert_eq!(order, vec![("LIMA", 3), ("CUSCO", 1), ("PIURA", 1)]);
        assert_eq!(counts.total(), 5);
        assert_eq!(serde_json::to_string(&counts).unwrap(), r#"{"LIMA":3,"CUSCO":1,"PIURA":1}"#);
    }
}
