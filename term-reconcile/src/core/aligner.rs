//! Row alignment between a source batch and a target batch.
//!
//! The [`RowAligner`] turns two batches into an ordered list of
//! [`AlignedPair`]s. With a keyed [`AlignmentSpec`] rows are matched by their
//! [`AlignmentKey`]; with [`AlignmentSpec::Positional`] they are matched by
//! global ordinal.
//!
//! When carry-over is enabled, rows that found no counterpart in the current
//! batch are held back and offered again together with the next batch. They
//! only become `MISSING_*` pairs once [`RowAligner::drain`] is called after
//! both sources are exhausted, which makes the outcome independent of where
//! batch boundaries fall.

use super::report::FindingKind;
use super::result::{Anomaly, Side, Verdict};
use super::value::{AlignmentKey, Row, RowId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How source rows are paired with target rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentSpec {
    /// Match rows by the values of these columns, in order.
    Keyed(Vec<String>),
    /// Match rows by their ordinal position.
    #[default]
    Positional,
}

impl AlignmentSpec {
    /// Keyed alignment on the given columns.
    pub fn keyed<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AlignmentSpec::Keyed(columns.into_iter().map(Into::into).collect())
    }

    /// Key columns, empty for positional alignment.
    pub fn key_columns(&self) -> &[String] {
        match self {
            AlignmentSpec::Keyed(columns) => columns,
            AlignmentSpec::Positional => &[],
        }
    }
}

/// A source row and its target counterpart; either may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub row_id: RowId,
    pub source: Option<Row>,
    pub target: Option<Row>,
    /// Set for duplicate or unmatchable rows.
    pub anomaly: Option<Anomaly>,
}

impl AlignedPair {
    fn matched(row_id: RowId, source: Row, target: Row) -> Self {
        Self {
            row_id,
            source: Some(source),
            target: Some(target),
            anomaly: None,
        }
    }

    fn only(side: Side, row_id: RowId, row: Row, anomaly: Option<Anomaly>) -> Self {
        let (source, target) = match side {
            Side::Source => (Some(row), None),
            Side::Target => (None, Some(row)),
        };
        Self {
            row_id,
            source,
            target,
            anomaly,
        }
    }

    /// Returns true if both rows are present.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// The missing-row verdict of a one-sided pair, `None` when both rows are present.
    pub fn missing_verdict(&self) -> Option<Verdict> {
        match (&self.source, &self.target) {
            (Some(_), None) => Some(Verdict::MissingTarget),
            (None, Some(_)) => Some(Verdict::MissingSource),
            _ => None,
        }
    }
}

/// The output of aligning one batch pair.
#[derive(Debug, Default)]
pub struct Alignment {
    pub pairs: Vec<AlignedPair>,
    pub findings: Vec<FindingKind>,
}

/// Rows of one side waiting for a counterpart.
#[derive(Debug, Default)]
struct Pending {
    rows: Vec<(Option<AlignmentKey>, Row)>,
    /// Fresh rows seen so far on this side; used for unkeyed ordinals.
    seen: u64,
    /// Keys already taken by a regular row. Kept across batches with carry-over.
    keys: HashSet<AlignmentKey>,
    /// Total occurrences of every key seen more than once.
    occurrences: HashMap<AlignmentKey, u64>,
}

impl Pending {
    fn reset_keys(&mut self) {
        self.keys.clear();
        self.occurrences.clear();
    }
}

/// Pairs rows of successive batch pairs.
#[derive(Debug)]
pub struct RowAligner {
    spec: AlignmentSpec,
    carry_over: bool,
    source: Pending,
    target: Pending,
    next_ordinal: u64,
}

impl RowAligner {
    pub fn new(spec: AlignmentSpec) -> Self {
        Self {
            spec,
            carry_over: false,
            source: Pending::default(),
            target: Pending::default(),
            next_ordinal: 0,
        }
    }

    /// Holds unmatched rows back until [`drain`](Self::drain) instead of
    /// reporting them at the end of each batch.
    ///
    /// Duplicate keys are then also detected across batches. Memory is bounded
    /// by the number of rows still waiting for a partner plus the set of keys
    /// seen so far, not by the batch size: two sources in unrelated orders can
    /// hold back up to the whole result set. Sorting both queries by the key
    /// columns keeps the carried rows within about one batch.
    pub fn with_carry_over(mut self, carry_over: bool) -> Self {
        self.carry_over = carry_over;
        self
    }

    /// Number of `(source, target)` rows currently held back.
    pub fn pending(&self) -> (usize, usize) {
        (self.source.rows.len(), self.target.rows.len())
    }

    /// Aligns one batch pair, together with any rows carried from earlier batches.
    pub fn align(&mut self, source: Vec<Row>, target: Vec<Row>) -> Alignment {
        match self.spec.clone() {
            AlignmentSpec::Positional => self.align_positional(source, target),
            AlignmentSpec::Keyed(columns) => self.align_keyed(&columns, source, target),
        }
    }

    /// Emits every held-back row as a missing-row pair, source rows first.
    pub fn drain(&mut self) -> Vec<AlignedPair> {
        let mut pairs = Vec::with_capacity(self.source.rows.len() + self.target.rows.len());
        for side in [Side::Source, Side::Target] {
            let pending = self.pending_mut(side);
            pending.reset_keys();
            let rows = std::mem::take(&mut pending.rows);
            for (key, row) in rows {
                pairs.push(self.one_sided(side, key, row));
            }
        }
        pairs
    }

    fn pending_mut(&mut self, side: Side) -> &mut Pending {
        match side {
            Side::Source => &mut self.source,
            Side::Target => &mut self.target,
        }
    }

    fn one_sided(&mut self, side: Side, key: Option<AlignmentKey>, row: Row) -> AlignedPair {
        let row_id = match key {
            Some(key) => RowId::Key(key),
            None => {
                let id = RowId::Ordinal(self.next_ordinal);
                self.next_ordinal += 1;
                id
            }
        };
        AlignedPair::only(side, row_id, row, None)
    }

    fn align_positional(&mut self, source: Vec<Row>, target: Vec<Row>) -> Alignment {
        let mut source_rows: Vec<Row> = std::mem::take(&mut self.source.rows)
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        let mut target_rows: Vec<Row> = std::mem::take(&mut self.target.rows)
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        self.source.seen += source.len() as u64;
        self.target.seen += target.len() as u64;
        source_rows.extend(source);
        target_rows.extend(target);

        let paired = source_rows.len().min(target_rows.len());
        let source_extra = source_rows.split_off(paired);
        let target_extra = target_rows.split_off(paired);

        let mut pairs = Vec::with_capacity(paired + source_extra.len() + target_extra.len());
        for (s, t) in source_rows.into_iter().zip(target_rows) {
            pairs.push(AlignedPair::matched(RowId::Ordinal(self.next_ordinal), s, t));
            self.next_ordinal += 1;
        }

        if self.carry_over {
            self.source.rows = source_extra.into_iter().map(|r| (None, r)).collect();
            self.target.rows = target_extra.into_iter().map(|r| (None, r)).collect();
        } else {
            for row in source_extra {
                pairs.push(self.one_sided(Side::Source, None, row));
            }
            for row in target_extra {
                pairs.push(self.one_sided(Side::Target, None, row));
            }
        }

        Alignment {
            pairs,
            findings: Vec::new(),
        }
    }

    fn align_keyed(&mut self, columns: &[String], source: Vec<Row>, target: Vec<Row>) -> Alignment {
        let mut findings = Vec::new();
        let source = self.classify(Side::Source, columns, source, &mut findings);
        let target = self.classify(Side::Target, columns, target, &mut findings);

        // Index the first occurrence of every regular target key.
        let mut target_index: HashMap<&AlignmentKey, usize> = HashMap::new();
        for (idx, entry) in target.iter().enumerate() {
            if let Keyed::Regular(key, _) = entry {
                target_index.insert(key, idx);
            }
        }

        let source_partner: Vec<Option<usize>> = source
            .iter()
            .map(|entry| match entry {
                Keyed::Regular(key, _) => target_index.get(key).copied(),
                _ => None,
            })
            .collect();
        drop(target_index);

        let mut target_slots: Vec<Option<Keyed>> = target.into_iter().map(Some).collect();
        let mut pairs = Vec::new();
        let mut carried_source = Vec::new();
        let mut carried_target = Vec::new();

        for (entry, partner) in source.into_iter().zip(source_partner) {
            match (entry, partner) {
                (Keyed::Regular(key, row), Some(idx)) => {
                    if let Some(Keyed::Regular(_, target_row)) = target_slots[idx].take() {
                        pairs.push(AlignedPair::matched(RowId::Key(key), row, target_row));
                    }
                }
                (Keyed::Regular(key, row), None) if self.carry_over => {
                    carried_source.push((Some(key), row));
                }
                (entry, _) => pairs.push(entry.into_pair(Side::Source)),
            }
        }

        // Matched target rows were taken above; what is left has no partner.
        for entry in target_slots.into_iter().flatten() {
            match entry {
                Keyed::Regular(key, row) if self.carry_over => {
                    carried_target.push((Some(key), row));
                }
                entry => pairs.push(entry.into_pair(Side::Target)),
            }
        }

        if self.carry_over {
            debug!(
                carried.source = carried_source.len(),
                carried.target = carried_target.len(),
                "Holding unmatched rows for the next batch"
            );
        }
        self.source.rows = carried_source;
        self.target.rows = carried_target;

        Alignment { pairs, findings }
    }

    /// Prepends carried rows to a fresh batch and classifies every row.
    ///
    /// Carried rows keep their regular status. A fresh row whose key was
    /// already taken on its side, in this batch or (with carry-over) an
    /// earlier one, is a duplicate.
    fn classify(
        &mut self,
        side: Side,
        columns: &[String],
        fresh: Vec<Row>,
        findings: &mut Vec<FindingKind>,
    ) -> Vec<Keyed> {
        let carry_over = self.carry_over;
        let pending = self.pending_mut(side);
        if !carry_over {
            pending.reset_keys();
        }
        let carried = std::mem::take(&mut pending.rows);
        let first_ordinal = pending.seen;
        pending.seen += fresh.len() as u64;

        let mut out = Vec::with_capacity(carried.len() + fresh.len());
        for (key, row) in carried {
            match key {
                Some(key) => out.push(Keyed::Regular(key, row)),
                // positional leftovers never reach keyed alignment
                None => out.push(Keyed::Unmatchable(first_ordinal, row)),
            }
        }

        let mut duplicated: Vec<AlignmentKey> = Vec::new();
        for (i, row) in fresh.into_iter().enumerate() {
            let ordinal = first_ordinal + i as u64;
            match AlignmentKey::extract(&row, columns) {
                None => {
                    findings.push(FindingKind::UnmatchableRow { side, ordinal });
                    out.push(Keyed::Unmatchable(ordinal, row));
                }
                Some(key) if pending.keys.contains(&key) => {
                    let count = pending.occurrences.entry(key.clone()).or_insert(1);
                    *count += 1;
                    if !duplicated.contains(&key) {
                        duplicated.push(key.clone());
                    }
                    out.push(Keyed::Duplicate(key, row));
                }
                Some(key) => {
                    pending.keys.insert(key.clone());
                    out.push(Keyed::Regular(key, row));
                }
            }
        }

        duplicated.sort_by_key(|key| key.to_string());
        for key in duplicated {
            let occurrences = pending.occurrences.get(&key).copied().unwrap_or(2);
            findings.push(FindingKind::DuplicateKey {
                side,
                key: key.to_string(),
                occurrences,
            });
        }
        out
    }
}

/// A row of a keyed batch, classified by its key.
enum Keyed {
    /// First occurrence of a key on its side.
    Regular(AlignmentKey, Row),
    /// A later occurrence of a key already seen on the same side.
    Duplicate(AlignmentKey, Row),
    /// Null or absent key columns; the ordinal is the row's position on its side.
    Unmatchable(u64, Row),
}

impl Keyed {
    fn into_pair(self, side: Side) -> AlignedPair {
        match self {
            Keyed::Regular(key, row) => AlignedPair::only(side, RowId::Key(key), row, None),
            Keyed::Duplicate(key, row) => {
                AlignedPair::only(side, RowId::Key(key), row, Some(Anomaly::DuplicateKey))
            }
            Keyed::Unmatchable(ordinal, row) => AlignedPair::only(
                side,
                RowId::Unkeyed(ordinal),
                row,
                Some(Anomaly::UnmatchableRow),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn ids(values: &[i64]) -> Vec<Row> {
        values
            .iter()
            .map(|v| Row::from_pairs([("id", Value::Int(*v))]))
            .collect()
    }

    fn keyed() -> RowAligner {
        RowAligner::new(AlignmentSpec::keyed(["id"]))
    }

    fn key_of(pair: &AlignedPair) -> String {
        pair.row_id.to_string()
    }

    #[test]
    fn test_keyed_missing_target() {
        let alignment = keyed().align(ids(&[1, 2, 3]), ids(&[1, 3]));
        assert_eq!(alignment.pairs.len(), 3);
        let missing: Vec<_> = alignment
            .pairs
            .iter()
            .filter_map(AlignedPair::missing_verdict)
            .collect();
        assert_eq!(missing, vec![Verdict::MissingTarget]);
        assert_eq!(key_of(&alignment.pairs[1]), "2");
    }

    #[test]
    fn test_keyed_output_order() {
        let alignment = keyed().align(ids(&[3, 1, 2]), ids(&[5, 2, 4, 3]));
        let order: Vec<_> = alignment.pairs.iter().map(key_of).collect();
        assert_eq!(order, vec!["3", "1", "2", "5", "4"]);
        assert!(alignment.pairs[0].is_complete());
        assert_eq!(
            alignment.pairs[1].missing_verdict(),
            Some(Verdict::MissingTarget)
        );
        assert_eq!(
            alignment.pairs[3].missing_verdict(),
            Some(Verdict::MissingSource)
        );
    }

    #[test]
    fn test_duplicate_keys_are_flagged_not_dropped() {
        let alignment = keyed().align(ids(&[1, 1, 2]), ids(&[1, 2]));
        assert_eq!(alignment.pairs.len(), 3);
        assert!(alignment.pairs[0].is_complete());
        assert_eq!(alignment.pairs[1].anomaly, Some(Anomaly::DuplicateKey));
        assert_eq!(
            alignment.pairs[1].missing_verdict(),
            Some(Verdict::MissingTarget)
        );
        assert_eq!(
            alignment.findings,
            vec![FindingKind::DuplicateKey {
                side: Side::Source,
                key: "1".to_string(),
                occurrences: 2
            }]
        );
    }

    #[test]
    fn test_null_key_is_unmatchable() {
        let source = vec![
            Row::from_pairs([("id", Value::Null)]),
            Row::from_pairs([("id", Value::Int(1))]),
        ];
        let alignment = keyed().align(source, ids(&[1]));
        assert_eq!(alignment.pairs.len(), 2);
        assert_eq!(alignment.pairs[0].anomaly, Some(Anomaly::UnmatchableRow));
        assert_eq!(alignment.pairs[0].row_id, RowId::Unkeyed(0));
        assert_eq!(
            alignment.findings,
            vec![FindingKind::UnmatchableRow {
                side: Side::Source,
                ordinal: 0
            }]
        );
    }

    #[test]
    fn test_positional_ordinals_are_global() {
        let mut aligner = RowAligner::new(AlignmentSpec::Positional);
        let first = aligner.align(ids(&[1, 2]), ids(&[1, 2]));
        let second = aligner.align(ids(&[3]), ids(&[]));
        assert_eq!(first.pairs[1].row_id, RowId::Ordinal(1));
        assert_eq!(second.pairs.len(), 1);
        assert_eq!(second.pairs[0].row_id, RowId::Ordinal(2));
        assert_eq!(
            second.pairs[0].missing_verdict(),
            Some(Verdict::MissingTarget)
        );
    }

    #[test]
    fn test_carry_over_matches_across_batches() {
        let mut aligner = keyed().with_carry_over(true);
        let first = aligner.align(ids(&[1, 2]), ids(&[2, 3]));
        assert_eq!(first.pairs.len(), 1);
        assert_eq!(aligner.pending(), (1, 1));

        let second = aligner.align(ids(&[3]), ids(&[1]));
        assert_eq!(second.pairs.len(), 2);
        assert!(second.pairs.iter().all(AlignedPair::is_complete));
        assert_eq!(aligner.pending(), (0, 0));
        assert!(aligner.drain().is_empty());
    }

    #[test]
    fn test_drain_reports_leftovers() {
        let mut aligner = keyed().with_carry_over(true);
        aligner.align(ids(&[1, 2]), ids(&[1]));
        let leftovers = aligner.drain();
        assert_eq!(leftovers.len(), 1);
        assert_eq!(leftovers[0].missing_verdict(), Some(Verdict::MissingTarget));
        assert_eq!(aligner.pending(), (0, 0));
    }

    #[test]
    fn test_duplicates_detected_across_batches() {
        let mut aligner = keyed().with_carry_over(true);
        let first = aligner.align(ids(&[1]), ids(&[1]));
        assert_eq!(first.pairs.len(), 1);
        assert!(first.findings.is_empty());

        let second = aligner.align(ids(&[1]), ids(&[]));
        assert_eq!(second.pairs.len(), 1);
        assert_eq!(second.pairs[0].anomaly, Some(Anomaly::DuplicateKey));
        assert_eq!(
            second.pairs[0].missing_verdict(),
            Some(Verdict::MissingTarget)
        );
        assert_eq!(
            second.findings,
            vec![FindingKind::DuplicateKey {
                side: Side::Source,
                key: "1".to_string(),
                occurrences: 2
            }]
        );

        // occurrences keep counting in later batches
        let third = aligner.align(ids(&[1]), ids(&[]));
        assert_eq!(
            third.findings,
            vec![FindingKind::DuplicateKey {
                side: Side::Source,
                key: "1".to_string(),
                occurrences: 3
            }]
        );
        assert!(aligner.drain().is_empty());
    }

    #[test]
    fn test_duplicate_of_carried_row_is_flagged() {
        let mut aligner = keyed().with_carry_over(true);
        aligner.align(ids(&[7]), ids(&[]));
        assert_eq!(aligner.pending(), (1, 0));

        let second = aligner.align(ids(&[7]), ids(&[7]));
        assert_eq!(second.pairs.len(), 2);
        assert!(second.pairs[0].is_complete());
        assert_eq!(second.pairs[1].anomaly, Some(Anomaly::DuplicateKey));
        assert_eq!(aligner.pending(), (0, 0));
    }

    #[test]
    fn test_carried_rows_depend_on_ordering() {
        let forward: Vec<i64> = (0..20).collect();
        let backward: Vec<i64> = (0..20).rev().collect();

        let mut sorted = keyed().with_carry_over(true);
        let mut shuffled = keyed().with_carry_over(true);
        let mut peak = 0;
        for (s, t) in forward.chunks(5).zip(backward.chunks(5)) {
            sorted.align(ids(s), ids(s));
            assert_eq!(sorted.pending(), (0, 0));

            shuffled.align(ids(s), ids(t));
            let (held_source, held_target) = shuffled.pending();
            peak = peak.max(held_source + held_target);
        }
        // reversed order holds back half of each side before the halves meet
        assert_eq!(peak, 20);
        assert!(shuffled.drain().is_empty());
    }

    #[test]
    fn test_without_carry_over_duplicates_are_per_batch() {
        let mut aligner = keyed();
        aligner.align(ids(&[1]), ids(&[1]));
        let second = aligner.align(ids(&[1]), ids(&[1]));
        assert!(second.pairs[0].is_complete());
        assert!(second.findings.is_empty());
    }

    #[test]
    fn test_positional_carry_over_handles_short_batches() {
        let mut aligner = RowAligner::new(AlignmentSpec::Positional).with_carry_over(true);
        let first = aligner.align(ids(&[1, 2, 3]), ids(&[1]));
        assert_eq!(first.pairs.len(), 1);
        let second = aligner.align(ids(&[]), ids(&[2, 3]));
        assert_eq!(second.pairs.len(), 2);
        assert_eq!(second.pairs[1].row_id, RowId::Ordinal(2));
    }
}
