// src/query/mod.rs
//
// In-memory scans over one loaded dataset. Results always come back in the
// dataset's original row order.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::QueryError;
use crate::parse::Cell;
use crate::schema::LogicalField;

mod record;

pub use record::{QueryResult, Record, Stats, ValueCounts};

/// Which pass of a name search produced the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPass {
    /// Every term found in some name column.
    AllTerms,
    /// The whole phrase found inside a single name column.
    Phrase,
}

pub struct QueryEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> QueryEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Rows whose `field` cell, as a string, equals `key` exactly.
    pub fn exact_lookup(&self, field: LogicalField, key: &str) -> Result<QueryResult, QueryError> {
        let col = self.column(field)?;
        let hits = self.matching(|row| row[col].to_key_string().map_or(false, |v| v == key));
        if hits.is_empty() {
            return Err(QueryError::not_found(format!("no record with {} {}", field, key)));
        }
        Ok(self.collect(hits))
    }

    pub fn name_search(&self, query: &str) -> Result<QueryResult, QueryError> {
        self.name_search_with_pass(query).map(|(result, _)| result)
    }

    /// Name search that also reports which pass matched.
    ///
    /// Every term must appear in at least one name column; only when that
    /// finds nothing is the whole phrase tried against each column on its own.
    pub fn name_search_with_pass(
        &self,
        query: &str,
    ) -> Result<(QueryResult, SearchPass), QueryError> {
        let cols = self.dataset.mapping.name_columns();
        if cols.is_empty() {
            return Err(self.unsupported(LogicalField::GivenNames));
        }

        let terms = normalize_query(query);
        if terms.is_empty() {
            return Err(QueryError::not_found("empty name query"));
        }

        let hits = self.matching(|row| {
            let names = upper_names(row, &cols);
            terms.iter().all(|t| names.iter().any(|n| n.contains(t.as_str())))
        });
        if !hits.is_empty() {
            debug!(terms = terms.len(), hits = hits.len(), "name search matched all terms");
            return Ok((self.collect(hits), SearchPass::AllTerms));
        }

        let phrase = terms.join(" ");
        debug!(%phrase, "no row matched every term, trying phrase");
        let hits = self.matching(|row| {
            upper_names(row, &cols)
                .iter()
                .any(|n| n.contains(phrase.as_str()))
        });
        if hits.is_empty() {
            return Err(QueryError::not_found(format!("no names containing {}", query.trim())));
        }
        Ok((self.collect(hits), SearchPass::Phrase))
    }

    /// Frequency of each distinct non-null value, per requested field.
    pub fn aggregate(
        &self,
        fields: &[LogicalField],
    ) -> Result<BTreeMap<LogicalField, ValueCounts>, QueryError> {
        let cols = fields
            .iter()
            .map(|&f| self.column(f).map(|c| (f, c)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = BTreeMap::new();
        for (field, col) in cols {
            let mut counts = ValueCounts::default();
            for row in &self.dataset.table.rows {
                if let Some(v) = row[col].to_key_string() {
                    counts.add(&v);
                }
            }
            out.insert(field, counts);
        }
        Ok(out)
    }

    fn column(&self, field: LogicalField) -> Result<usize, QueryError> {
        self.dataset
            .mapping
            .get(field)
            .map(|c| c.index)
            .ok_or_else(|| self.unsupported(field))
    }

    pub(crate) fn unsupported(&self, field: LogicalField) -> QueryError {
        QueryError::FieldUnsupported {
            field,
            columns: self.dataset.table.columns.clone(),
        }
    }

    fn matching<F>(&self, pred: F) -> Vec<usize>
    where
        F: Fn(&[Cell]) -> bool + Sync,
    {
        self.dataset
            .table
            .rows
            .par_iter()
            .enumerate()
            .filter_map(|(i, row)| pred(row).then_some(i))
            .collect()
    }

    // Null normalization happens here, once per returned row.
    fn collect(&self, hits: Vec<usize>) -> QueryResult {
        let table = &self.dataset.table;
        QueryResult::new(
            hits.into_iter()
                .map(|i| Record::from_row(&table.columns, &table.rows[i]))
                .collect(),
        )
    }
}

/// `_` and `-` become spaces, then trim, upper-case and split on whitespace.
pub fn normalize_query(query: &str) -> Vec<String> {
    query
        .replace(['_', '-'], " ")
        .trim()
        .to_uppercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn upper_names(row: &[Cell], cols: &[usize]) -> Vec<String> {
    cols.iter()
        .filter_map(|&c| row[c].as_text())
        .map(str::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Table;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let table = Table {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Cell::infer(v)).collect())
                .collect(),
        };
        Dataset::new(table, "test.csv")
    }

    fn two_people() -> Dataset {
        dataset(
            &["documento", "Nombres", "Paterno", "Materno", "Planilla"],
            &[
                &["123", "ANA", "LOPEZ", "DIAZ", "P1"],
                &["456", "LUIS", "LOPEZ", "RUIZ", "P2"],
            ],
        )
    }

    fn docs(result: &QueryResult) -> Vec<serde_json::Value> {
        result
            .rows
            .iter()
            .map(|r| r.get("documento").cloned().unwrap())
            .collect()
    }

    #[test]
    fn lookup_by_document_scenario() {
        let ds = two_people();
        let q = QueryEngine::new(&ds);

        let r = q.exact_lookup(LogicalField::DocumentId, "123").unwrap();
        assert_eq!(r.total, 1);
        assert_eq!(r.rows[0].get("Nombres"), Some(&serde_json::json!("ANA")));
        assert_eq!(r.rows[0].get("Planilla"), Some(&serde_json::json!("P1")));

        assert!(matches!(
            q.exact_lookup(LogicalField::PayrollId, "P3"),
            Err(QueryError::NotFound { .. })
        ));
        assert!(matches!(
            q.exact_lookup(LogicalField::DocumentId, "12"),
            Err(QueryError::NotFound { .. })
        ));
    }

    #[test]
    fn exact_lookup_returns_every_match_in_order() {
        let ds = dataset(
            &["documento", "Nombres", "Paterno", "Materno", "Planilla"],
            &[
                &["1", "A", "X", "Y", "P9"],
                &["2", "B", "X", "Y", "P1"],
                &["3", "C", "X", "Y", "P9"],
                &["007", "D", "X", "Y", "P9"],
            ],
        );
        let q = QueryEngine::new(&ds);

        let r = q.exact_lookup(LogicalField::PayrollId, "P9").unwrap();
        assert_eq!(
            docs(&r),
            vec![serde_json::json!(1), serde_json::json!(3), serde_json::json!("007")]
        );
        assert_eq!(q.exact_lookup(LogicalField::DocumentId, "007").unwrap().total, 1);
        assert!(q.exact_lookup(LogicalField::DocumentId, "7").is_err());
    }

    #[test]
    fn name_search_scenario() {
        let ds = two_people();
        let q = QueryEngine::new(&ds);

        let r = q.name_search("lopez ana").unwrap();
        assert_eq!(r.total, 1);
        assert_eq!(docs(&r), vec![serde_json::json!(123)]);

        let r = q.name_search("lopez").unwrap();
        assert_eq!(r.total, 2);

        assert!(matches!(q.name_search("garcia"), Err(QueryError::NotFound { .. })));
        assert!(matches!(q.name_search(" _- "), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn name_search_is_stable_under_renormalization() {
        let ds = dataset(
            &["documento", "Nombres", "Paterno", "Materno", "Planilla"],
            &[
                &["1", "MARIA", "GARCIA", "LOPEZ", "P1"],
                &["2", "JUAN", "GARCIA", "PEREZ", "P1"],
                &["3", "ROSA", "LOPEZ", "GARCIA", "P1"],
            ],
        );
        let q = QueryEngine::new(&ds);

        let a = q.name_search("Garcia_Lopez").unwrap();
        let b = q.name_search("garcia lopez").unwrap();
        let c = q.name_search("GARCIA-LOPEZ").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(docs(&a), vec![serde_json::json!(1), serde_json::json!(3)]);
    }

    #[test]
    fn all_terms_pass_short_circuits_phrase_pass() {
        // the phrase "ANA LOPEZ" sits inside one column of rows 2 and 3; the
        // all-terms pass already matches row 1 (terms split across columns)
        let ds = dataset(
            &["documento", "Nombres", "Paterno", "Materno", "Planilla"],
            &[
                &["1", "ANA", "LOPEZ", "DIAZ", "P1"],
                &["2", "MARIA ANA LOPEZ", "RUIZ", "SOTO", "P1"],
                &["3", "JUANA LOPEZ", "PEREZ", "DIAZ", "P1"],
                &["4", "PEDRO", "RUIZ", "SOTO", "P1"],
            ],
        );
        let q = QueryEngine::new(&ds);

        let (r, pass) = q.name_search_with_pass("ana lopez").unwrap();
        assert_eq!(pass, SearchPass::AllTerms);
        assert_eq!(r.total, 3);
        assert_eq!(
            docs(&r),
            vec![serde_json::json!(1), serde_json::json!(2), serde_json::json!(3)]
        );
    }

    #[test]
    fn extra_whitespace_is_ignored() {
        let ds = two_people();
        let q = QueryEngine::new(&ds);
        let (r, pass) = q.name_search_with_pass("  luis   ruiz ").unwrap();
        assert_eq!(pass, SearchPass::AllTerms);
        assert_eq!(r.total, 1);
    }

    #[test]
    fn unmapped_fields_report_columns() {
        let ds = dataset(&["a", "b", "c", "d", "e"], &[&["1", "2", "3", "4", "5"]]);
        let q = QueryEngine::new(&ds);

        match q.exact_lookup(LogicalField::DocumentId, "1") {
            Err(QueryError::FieldUnsupported { field, columns }) => {
                assert_eq!(field, LogicalField::DocumentId);
                assert_eq!(columns, vec!["a", "b", "c", "d", "e"]);
            }
            other => panic!("expected FieldUnsupported, got {:?}", other),
        }
        assert!(matches!(
            q.name_search("ana"),
            Err(QueryError::FieldUnsupported { .. })
        ));
        assert!(matches!(
            q.aggregate(&[LogicalField::Sex]),
            Err(QueryError::FieldUnsupported { field: LogicalField::Sex, .. })
        ));
    }

    #[test]
    fn aggregate_counts_exclude_nulls() {
        let ds = dataset(
            &["documento", "Sexo", "Situacion", "Departamento", "Nombres"],
            &[
                &["1", "F", "ACTIVO", "LIMA", "A"],
                &["2", "M", "ACTIVO", "CUSCO", "B"],
                &["3", "", "BAJA", "LIMA", "C"],
                &["4", "F", "NaN", "LIMA", "D"],
                &["5", "F", "ACTIVO", "", "E"],
            ],
        );
        let q = QueryEngine::new(&ds);

        let agg = q
            .aggregate(&[LogicalField::Sex, LogicalField::Department, LogicalField::Status])
            .unwrap();
        let sex = &agg[&LogicalField::Sex];
        assert_eq!(sex.get("F"), Some(3));
        assert_eq!(sex.get("M"), Some(1));
        // one null Sex cell
        assert_eq!(sex.total(), ds.len() as u64 - 1);

        let dept: Vec<_> = agg[&LogicalField::Department].iter().collect();
        assert_eq!(dept, vec![("LIMA", 3), ("CUSCO", 1)]);
        assert_eq!(agg[&LogicalField::Status].total(), 4);
    }

    #[test]
    fn normalizes_queries() {
        assert_eq!(normalize_query(" garcia_lopez-diaz "), vec!["GARCIA", "LOPEZ", "DIAZ"]);
        assert!(normalize_query("  ").is_empty());
    }
}
