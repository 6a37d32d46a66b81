//! Code tables: human-readable descriptions of every observed combo code.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bit_index::BitIndexMap;
use crate::combo::ComboCode;
use crate::decoder::ComboDecoder;
use crate::error::PathwayResult;
use crate::generation::GenerationId;
use crate::traits::CohortNameLookup;
use crate::types::CohortId;

/// Separator between constituent names of a combined code.
pub const COMBINATION_NAME_SEPARATOR: &str = ", ";

/// One row of the flat codes table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeTableEntry {
    /// Generation of the producing unit of work.
    pub generation_id: GenerationId,
    /// The combo code.
    pub code: ComboCode,
    /// Constituent names joined in cohort index order.
    pub display_name: String,
    /// More than one event cohort in the code.
    pub is_combination: bool,
}

/// One row of the long codes table: a (code, constituent) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeLongEntry {
    /// Generation of the producing unit of work.
    pub generation_id: GenerationId,
    /// The combo code.
    pub code: ComboCode,
    /// Target cohort the code was observed in.
    pub target_cohort_id: CohortId,
    /// One constituent event cohort.
    pub event_cohort_id: CohortId,
    /// Its display name.
    pub event_cohort_name: String,
    /// More than one event cohort in the code.
    pub is_combination: bool,
    /// Number of constituents of the code.
    pub number_of_events: usize,
}

/// Both code tables for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTables {
    /// One row per code, sorted by code.
    pub codes: Vec<CodeTableEntry>,
    /// One row per code and constituent, sorted by code then cohort index.
    pub long: Vec<CodeLongEntry>,
}

impl CodeTables {
    /// Returns the flat entry for a code.
    pub fn entry(&self, code: &ComboCode) -> Option<&CodeTableEntry> {
        self.codes
            .binary_search_by(|e| e.code.cmp(code))
            .ok()
            .map(|idx| &self.codes[idx])
    }

    /// Returns the long rows for a code.
    pub fn constituents(&self, code: &ComboCode) -> impl Iterator<Item = &CodeLongEntry> + '_ {
        let code = code.clone();
        self.long.iter().filter(move |e| e.code == code)
    }
}

/// Builds code tables from observed codes.
pub struct CodeTableBuilder<'a> {
    decoder: ComboDecoder<'a>,
    names: &'a dyn CohortNameLookup,
}

impl<'a> CodeTableBuilder<'a> {
    /// Creates a builder over a bit index and a name lookup.
    pub fn new(bit_index: &'a BitIndexMap, names: &'a dyn CohortNameLookup) -> Self {
        Self {
            decoder: ComboDecoder::new(bit_index),
            names,
        }
    }

    /// Builds the tables for the distinct codes in `codes`.
    ///
    /// # Errors
    ///
    /// Fails with a decoding error on the first code the bit index cannot
    /// have produced; no partial tables are returned.
    pub fn build<'c, I>(
        &self,
        generation_id: &GenerationId,
        target_cohort_id: CohortId,
        codes: I,
    ) -> PathwayResult<CodeTables>
    where
        I: IntoIterator<Item = &'c ComboCode>,
    {
        let distinct: BTreeSet<&ComboCode> = codes.into_iter().collect();
        let mut tables = CodeTables::default();

        for code in distinct {
            let decoding = self.decoder.decode(code)?;
            let is_combination = decoding.is_combination();
            let number_of_events = decoding.number_of_events();

            let names: Vec<String> = decoding
                .event_cohort_ids
                .iter()
                .map(|&id| self.names.display_name(id))
                .collect();

            for (&event_cohort_id, name) in decoding.event_cohort_ids.iter().zip(&names) {
                tables.long.push(CodeLongEntry {
                    generation_id: generation_id.clone(),
                    code: code.clone(),
                    target_cohort_id,
                    event_cohort_id,
                    event_cohort_name: name.clone(),
                    is_combination,
                    number_of_events,
                });
            }

            tables.codes.push(CodeTableEntry {
                generation_id: generation_id.clone(),
                code: code.clone(),
                display_name: names.join(COMBINATION_NAME_SEPARATOR),
                is_combination,
            });
        }

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathwayError;
    use std::collections::HashMap;

    fn names() -> HashMap<CohortId, String> {
        [(10, "Metformin".to_string()), (20, "Insulin".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_builds_flat_and_long_tables() {
        let map = BitIndexMap::build(vec![10, 20], None).unwrap();
        let names = names();
        let builder = CodeTableBuilder::new(&map, &names);
        let generation = GenerationId::new("g1");
        let codes = [ComboCode::from(3), ComboCode::from(1), ComboCode::from(3)];

        let tables = builder.build(&generation, 100, &codes).unwrap();

        assert_eq!(tables.codes.len(), 2);
        assert_eq!(tables.codes[0].code, ComboCode::from(1));
        assert_eq!(tables.codes[0].display_name, "Metformin");
        assert!(!tables.codes[0].is_combination);
        assert_eq!(tables.codes[1].display_name, "Metformin, Insulin");
        assert!(tables.codes[1].is_combination);

        assert_eq!(tables.long.len(), 3);
        let combined: Vec<&CodeLongEntry> = tables.constituents(&ComboCode::from(3)).collect();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].event_cohort_id, 10);
        assert_eq!(combined[1].event_cohort_name, "Insulin");
        assert!(combined.iter().all(|e| e.number_of_events == 2 && e.is_combination));
        assert!(combined.iter().all(|e| e.target_cohort_id == 100));
    }

    #[test]
    fn test_constituents_do_not_borrow_the_code() {
        let map = BitIndexMap::build(vec![10, 20], None).unwrap();
        let names = names();
        let tables = CodeTableBuilder::new(&map, &names)
            .build(&GenerationId::new("g1"), 100, &[ComboCode::from(3)])
            .unwrap();

        let rows = {
            let code = ComboCode::from(3);
            tables.constituents(&code)
        };
        let ids: Vec<CohortId> = rows.map(|e| e.event_cohort_id).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[test]
    fn test_unknown_name_falls_back_to_id() {
        let map = BitIndexMap::build(vec![30], None).unwrap();
        let names = names();
        let builder = CodeTableBuilder::new(&map, &names);

        let tables = builder
            .build(&GenerationId::new("g1"), 100, &[ComboCode::from(1)])
            .unwrap();
        assert_eq!(tables.codes[0].display_name, "Cohort 30");
    }

    #[test]
    fn test_undecodable_code_fails_whole_build() {
        let map = BitIndexMap::build(vec![10, 20], None).unwrap();
        let names = names();
        let builder = CodeTableBuilder::new(&map, &names);

        let result = builder.build(
            &GenerationId::new("g1"),
            100,
            &[ComboCode::from(1), ComboCode::from(4)],
        );
        assert!(matches!(result, Err(PathwayError::Decoding { .. })));
    }

    #[test]
    fn test_build_is_idempotent() {
        let map = BitIndexMap::build(vec![10, 20], None).unwrap();
        let names = names();
        let builder = CodeTableBuilder::new(&map, &names);
        let generation = GenerationId::new("g1");
        let codes = [ComboCode::from(2), ComboCode::from(3), ComboCode::from(1)];

        let first = builder.build(&generation, 100, &codes).unwrap();
        let second = builder.build(&generation, 100, codes.iter().rev()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entry_lookup() {
        let map = BitIndexMap::build(vec![10, 20], None).unwrap();
        let names = names();
        let tables = CodeTableBuilder::new(&map, &names)
            .build(&GenerationId::new("g1"), 100, &[ComboCode::from(2)])
            .unwrap();

        assert_eq!(tables.entry(&ComboCode::from(2)).unwrap().display_name, "Insulin");
        assert!(tables.entry(&ComboCode::from(1)).is_none());
    }
}
