//! Per-technique bounded coordinate buffers.
//!
//! Appending is the only steady-state mutation, which is what lets the render
//! bridge extend chart traces one point at a time instead of redrawing.

use std::collections::{BTreeMap, VecDeque};

use crate::sample::{Sample, Technique};

/// Bounded x/y buffers for one technique, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueSeries {
    technique: Technique,
    x: VecDeque<f64>,
    y: VecDeque<f64>,
    sequences: VecDeque<u64>,
    appended: u64,
}

impl TechniqueSeries {
    fn new(technique: Technique) -> Self {
        Self {
            technique,
            x: VecDeque::new(),
            y: VecDeque::new(),
            sequences: VecDeque::new(),
            appended: 0,
        }
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn x(&self) -> &VecDeque<f64> {
        &self.x
    }

    pub fn y(&self) -> &VecDeque<f64> {
        &self.y
    }

    /// Sample identities parallel to `x`/`y`.
    pub fn sequences(&self) -> &VecDeque<u64> {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Samples ever appended since the last reset, evicted ones included.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.x.iter().zip(self.y.iter()).map(|(x, y)| [*x, *y])
    }

    pub fn last(&self) -> Option<(f64, f64, u64)> {
        Some((*self.x.back()?, *self.y.back()?, *self.sequences.back()?))
    }

    fn push(&mut self, sample: &Sample) {
        self.x.push_back(sample.x);
        self.y.push_back(sample.y);
        self.sequences.push_back(sample.sequence);
        self.appended += 1;
    }

    fn prune_by_points(&mut self, max_points: usize) -> usize {
        let mut evicted = 0;
        while self.x.len() > max_points {
            self.x.pop_front();
            self.y.pop_front();
            self.sequences.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// What an append did, enough for the render bridge to pick extend vs rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Position of the series in first-seen order.
    pub index: usize,
    /// The sample opened a new series.
    pub created: bool,
    /// Points dropped from the head to respect `max_points`.
    pub evicted: usize,
}

/// Read-only view of the store at one revision. Borrows, never copies.
#[derive(Debug, Clone, Copy)]
pub struct StoreSnapshot<'a> {
    pub revision: u64,
    pub max_points: usize,
    pub series: &'a [TechniqueSeries],
}

impl<'a> StoreSnapshot<'a> {
    pub fn total_points(&self) -> usize {
        self.series.iter().map(TechniqueSeries::len).sum()
    }
}

/// Owns every [`TechniqueSeries`], keyed by technique in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStore {
    series: Vec<TechniqueSeries>,
    index: BTreeMap<Technique, usize>,
    max_points: usize,
    revision: u64,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl SeriesStore {
    pub fn new(max_points: usize) -> Self {
        Self {
            series: Vec::new(),
            index: BTreeMap::new(),
            max_points: max_points.max(1),
            revision: 0,
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Bumped on every append, back to zero on reset.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, technique: &str) -> Option<&TechniqueSeries> {
        self.index.get(technique).map(|&i| &self.series[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechniqueSeries> {
        self.series.iter()
    }

    pub fn total_points(&self) -> usize {
        self.series.iter().map(TechniqueSeries::len).sum()
    }

    pub fn append(&mut self, sample: &Sample) -> AppendOutcome {
        let (index, created) = match self.index.get(&sample.technique) {
            Some(&i) => (i, false),
            None => {
                let i = self.series.len();
                self.series.push(TechniqueSeries::new(sample.technique.clone()));
                self.index.insert(sample.technique.clone(), i);
                (i, true)
            }
        };
        let series = &mut self.series[index];
        series.push(sample);
        let evicted = series.prune_by_points(self.max_points);
        self.revision += 1;
        AppendOutcome {
            index,
            created,
            evicted,
        }
    }

    pub fn reset(&mut self) {
        self.series.clear();
        self.index.clear();
        self.revision = 0;
    }

    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        StoreSnapshot {
            revision: self.revision,
            max_points: self.max_points,
            series: &self.series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(technique: &str, seq: u64, x: f64) -> Sample {
        Sample {
            technique: Technique::from(technique),
            x,
            y: x * 10.0,
            sequence: seq,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut store = SeriesStore::new(3);
        let mut evicted = 0;
        for (i, x) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            evicted += store.append(&sample("CV", i as u64 + 1, x)).evicted;
        }
        let cv = store.get("CV").unwrap();
        assert_eq!(cv.x().iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(cv.y().iter().copied().collect::<Vec<_>>(), vec![30.0, 40.0, 50.0]);
        assert_eq!(cv.sequences().iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(cv.appended(), 5);
        assert_eq!(evicted, 2);
    }

    #[test]
    fn insertion_order_is_first_seen() {
        let mut store = SeriesStore::new(10);
        assert!(store.append(&sample("OCV", 1, 0.0)).created);
        assert!(store.append(&sample("CV", 2, 0.0)).created);
        let again = store.append(&sample("OCV", 3, 1.0));
        assert!(!again.created);
        assert_eq!(again.index, 0);
        let names: Vec<_> = store.iter().map(|s| s.technique().to_string()).collect();
        assert_eq!(names, vec!["OCV", "CV"]);
    }

    #[test]
    fn reset_matches_fresh_store() {
        let mut store = SeriesStore::new(10);
        store.append(&sample("CV", 1, 0.0));
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store, SeriesStore::new(10));
        assert!(store.append(&sample("CV", 1, 0.0)).created);
    }
}
