//! Sequence ordering - the baseline order and the packing heuristics
//!
//! Every sheet is first sorted by (priority group, name). That baseline order
//! decides the serialized sequence indices and breaks ties in every packing
//! heuristic. Sequences added in later catalog revisions are given a higher
//! priority group so that older sequences keep their place.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Compatibility priority group per sequence name. Unknown names are group 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityMap {
    groups: HashMap<String, u32>,
}

impl PriorityMap {
    pub fn new(groups: HashMap<String, u32>) -> Self {
        Self { groups }
    }

    pub fn group(&self, name: &str) -> u32 {
        self.groups.get(name).copied().unwrap_or(0)
    }

    /// Compare two names by (group, name).
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.group(a).cmp(&self.group(b)).then_with(|| a.cmp(b))
    }
}

impl From<HashMap<String, u32>> for PriorityMap {
    fn from(groups: HashMap<String, u32>) -> Self {
        Self::new(groups)
    }
}

/// Sort items into baseline order by (priority group, name).
pub fn sort_baseline<T>(items: &mut [T], priority: &PriorityMap, name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| priority.compare(name(a), name(b)));
}

/// Visiting order used by one packing trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Ascending width
    Width,
    /// Ascending height
    Height,
    /// Ascending longest side
    LongestSide,
    /// Ascending area
    Area,
}

impl Heuristic {
    /// All heuristics in the order the search tries them.
    pub const ALL: [Heuristic; 4] = [
        Heuristic::Width,
        Heuristic::Height,
        Heuristic::LongestSide,
        Heuristic::Area,
    ];

    fn key(self, (w, h): (u32, u32)) -> u64 {
        match self {
            Heuristic::Width => w as u64,
            Heuristic::Height => h as u64,
            Heuristic::LongestSide => w.max(h) as u64,
            Heuristic::Area => w as u64 * h as u64,
        }
    }

    /// Visiting order over `sizes` (given in baseline order).
    ///
    /// The sort is stable, so equal keys keep their baseline order.
    pub fn order(self, sizes: &[(u32, u32)]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..sizes.len()).collect();
        order.sort_by_key(|&i| self.key(sizes[i]));
        order
    }
}

impl std::fmt::Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Heuristic::Width => write!(f, "width"),
            Heuristic::Height => write!(f, "height"),
            Heuristic::LongestSide => write!(f, "longest side"),
            Heuristic::Area => write!(f, "area"),
        }
    }
}
