// src/schema/mod.rs
//
// Column discovery. Resolution order per field: exact, case-sensitive
// canonical name; otherwise the first column (in file order) whose lower-cased
// name contains one of the field's fragments; otherwise unmapped.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub mod types;

pub use types::{LogicalField, MappedColumn};

/// Logical field → physical column, fixed for the lifetime of a loaded table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    fields: BTreeMap<LogicalField, MappedColumn>,
}

impl FieldMapping {
    pub fn get(&self, field: LogicalField) -> Option<&MappedColumn> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: LogicalField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalField, &MappedColumn)> {
        self.fields.iter().map(|(f, c)| (*f, c))
    }

    /// Column indexes of the mapped name-family fields, without repeats.
    pub fn name_columns(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(LogicalField::NAME_FAMILY.len());
        for field in LogicalField::NAME_FAMILY {
            if let Some(col) = self.get(field) {
                if !out.contains(&col.index) {
                    out.push(col.index);
                }
            }
        }
        out
    }
}

pub fn resolve<S: AsRef<str>>(columns: &[S]) -> FieldMapping {
    let mut fields = BTreeMap::new();
    for field in LogicalField::ALL {
        match find_column(field, columns) {
            Some(index) => {
                let name = columns[index].as_ref().to_string();
                debug!(field = %field, column = %name, "resolved");
                fields.insert(field, MappedColumn { index, name });
            }
            None => warn!(field = %field, "no matching column"),
        }
    }
    FieldMapping { fields }
}

fn find_column<S: AsRef<str>>(field: LogicalField, columns: &[S]) -> Option<usize> {
    let canonical = field.canonical_column();
    columns
        .iter()
        .position(|c| c.as_ref() == canonical)
        .or_else(|| {
            columns.iter().position(|c| {
                let lower = c.as_ref().to_lowercase();
                field.substrings().iter().any(|s| lower.contains(s))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header of the published roster (abridged).
    const ROSTER: &[&str] = &[
        "Edad", "Sexo", "Autogenerado", "Paterno", "Materno", "Nombres", "Situacion",
        "Tipodocumento", "documento", "Departamento", "E_nombre", "E_departamento", "Planilla",
    ];

    #[test]
    fn canonical_names_win_over_substrings() {
        let m = resolve(ROSTER);
        assert_eq!(m.len(), 8);
        // "Tipodocumento" comes first but the exact name is preferred
        assert_eq!(m.get(LogicalField::DocumentId).unwrap().name, "documento");
        assert_eq!(m.get(LogicalField::GivenNames).unwrap().name, "Nombres");
        assert_eq!(m.get(LogicalField::Department).unwrap().index, 9);
        assert_eq!(m.get(LogicalField::PayrollId).unwrap().index, 12);
    }

    #[test]
    fn renamed_columns_resolve_by_fragment_in_column_order() {
        let cols = ["NUM_DNI", "APELLIDO_PATERNO", "APELLIDO_MATERNO", "NOMBRES", "COD_PLANILLA"];
        let m = resolve(&cols);

        assert_eq!(m.get(LogicalField::DocumentId).unwrap().name, "NUM_DNI");
        assert_eq!(m.get(LogicalField::PaternalSurname).unwrap().name, "APELLIDO_PATERNO");
        // "materno" fragment, not the first "apellido" column
        assert_eq!(m.get(LogicalField::MaternalSurname).unwrap().name, "APELLIDO_MATERNO");
        assert_eq!(m.get(LogicalField::GivenNames).unwrap().name, "NOMBRES");
        assert_eq!(m.get(LogicalField::PayrollId).unwrap().name, "COD_PLANILLA");
        assert!(!m.contains(LogicalField::Sex));
        assert!(!m.contains(LogicalField::Status));
    }

    #[test]
    fn name_columns_are_deduplicated() {
        // one "Apellidos y Nombres" column serves every name field
        let m = resolve(&["dni", "Apellidos y Nombres", "a", "b", "c"]);
        assert_eq!(m.name_columns(), vec![1]);

        let m = resolve(&["x", "y", "z"]);
        assert!(m.is_empty());
        assert!(m.name_columns().is_empty());
    }

    #[test]
    fn field_names_round_trip() {
        for f in LogicalField::ALL {
            assert_eq!(LogicalField::from_str(f.as_str()), Some(f));
        }
        assert_eq!(LogicalField::from_str(" Sex "), Some(LogicalField::Sex));
        assert_eq!(LogicalField::from_str("age"), None);
    }
}
