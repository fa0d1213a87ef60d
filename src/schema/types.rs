// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable concept in the roster, independent of how the source names its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    DocumentId,
    PayrollId,
    GivenNames,
    PaternalSurname,
    MaternalSurname,
    Department,
    Status,
    Sex,
}

impl LogicalField {
    pub const ALL: [LogicalField; 8] = [
        LogicalField::DocumentId,
        LogicalField::PayrollId,
        LogicalField::GivenNames,
        LogicalField::PaternalSurname,
        LogicalField::MaternalSurname,
        LogicalField::Department,
        LogicalField::Status,
        LogicalField::Sex,
    ];

    /// Fields searched by name queries, in match order.
    pub const NAME_FAMILY: [LogicalField; 3] = [
        LogicalField::GivenNames,
        LogicalField::PaternalSurname,
        LogicalField::MaternalSurname,
    ];

    /// Fields reported by the stats overview.
    pub const CATEGORICAL: [LogicalField; 3] = [
        LogicalField::Department,
        LogicalField::Status,
        LogicalField::Sex,
    ];

    /// Physical name used by the published roster.
    pub fn canonical_column(&self) -> &'static str {
        match self {
            LogicalField::DocumentId => "documento",
            LogicalField::PayrollId => "Planilla",
            LogicalField::GivenNames => "Nombres",
            LogicalField::PaternalSurname => "Paterno",
            LogicalField::MaternalSurname => "Materno",
            LogicalField::Department => "Departamento",
            LogicalField::Status => "Situacion",
            LogicalField::Sex => "Sexo",
        }
    }

    /// Lower-case fragments that identify a renamed column.
    pub fn substrings(&self) -> &'static [&'static str] {
        match self {
            LogicalField::DocumentId => &["documento", "dni"],
            LogicalField::PayrollId => &["planilla"],
            LogicalField::GivenNames => &["nombre"],
            LogicalField::PaternalSurname => &["paterno", "apellido"],
            LogicalField::MaternalSurname => &["materno"],
            LogicalField::Department => &["departamento"],
            LogicalField::Status => &["situacion", "estado"],
            LogicalField::Sex => &["sexo"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::DocumentId => "document_id",
            LogicalField::PayrollId => "payroll_id",
            LogicalField::GivenNames => "given_names",
            LogicalField::PaternalSurname => "paternal_surname",
            LogicalField::MaternalSurname => "maternal_surname",
            LogicalField::Department => "department",
            LogicalField::Status => "status",
            LogicalField::Sex => "sex",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        LogicalField::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a logical field lives in one loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub index: usize,
    pub name: String,
}
