//! Study programs and their versions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// One row of the program/version join.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ProgramVersionRow {
    pub id: i64,
    pub name: String,
    pub version: String,
}

/// Program entity with its versions in catalogue order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub versions: Vec<String>,
}

/// Ordered association of programs, keyed by id.
///
/// Programs keep the order in which they were first seen and each program's
/// versions keep row order.
#[derive(Debug, Default)]
pub struct ProgramCatalog {
    entries: Vec<Program>,
    index: HashMap<i64, usize>,
}

impl ProgramCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ProgramVersionRow) {
        let position = match self.index.get(&row.id) {
            Some(&position) => position,
            None => {
                self.entries.push(Program {
                    id: row.id,
                    name: row.name,
                    versions: Vec::new(),
                });
                self.index.insert(row.id, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[position].versions.push(row.version);
    }

    pub fn into_programs(self) -> Vec<Program> {
        self.entries
    }
}

impl FromIterator<ProgramVersionRow> for ProgramCatalog {
    fn from_iter<I: IntoIterator<Item = ProgramVersionRow>>(rows: I) -> Self {
        let mut catalog = ProgramCatalog::new();
        for row in rows {
            catalog.push(row);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str, version: &str) -> ProgramVersionRow {
        ProgramVersionRow {
            id,
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_groups_interleaved_rows_in_first_seen_order() {
        let catalog: ProgramCatalog = vec![
            row(7, "Wirtschaftsinformatik", "PO2019"),
            row(2, "Informatik", "PO2016"),
            row(7, "Wirtschaftsinformatik", "PO2023"),
            row(2, "Informatik", "PO2022"),
            row(5, "Medieninformatik", "PO2020"),
        ]
        .into_iter()
        .collect();

        let programs = catalog.into_programs();
        let ids: Vec<i64> = programs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 2, 5]);
        assert_eq!(programs[0].versions, vec!["PO2019", "PO2023"]);
        assert_eq!(programs[1].versions, vec!["PO2016", "PO2022"]);
    }
}
