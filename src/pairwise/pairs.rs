//! Deterministic pair enumeration over a symbol universe.

use serde::Serialize;

/// One unit of pairwise sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolPair<'a> {
    /// The universe has exactly one member
    Single(&'a str),
    /// An unordered pair, first element earlier in the universe
    Pair(&'a str, &'a str),
}

impl SymbolPair<'_> {
    /// Probes this unit expands to.
    pub fn probe_count(&self) -> u64 {
        match self {
            Self::Single(_) => 2,
            Self::Pair(..) => 4,
        }
    }
}

/// Sort, deduplicate and prefix raw symbol names.
pub fn build_universe<I, S>(names: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut universe: Vec<String> = names
        .into_iter()
        .map(|name| format!("{prefix}{}", name.as_ref()))
        .collect();
    universe.sort();
    universe.dedup();
    universe
}

/// Lazy enumeration of every 2-combination, in `(0,1),(0,2),…,(1,2),…` order,
/// or a single unit for a one-member universe.
///
/// The sequence is a pure function of the universe: call [`pairs`] again to
/// restart it.
#[derive(Debug, Clone)]
pub struct Pairs<'a> {
    universe: &'a [String],
    i: usize,
    j: usize,
    single_done: bool,
}

/// Enumerate the units of `universe`.
///
/// The universe is expected sorted and deduplicated (see [`build_universe`]);
/// the order of the output follows the order of the input.
pub fn pairs(universe: &[String]) -> Pairs<'_> {
    Pairs {
        universe,
        i: 0,
        j: 1,
        single_done: false,
    }
}

impl<'a> Pairs<'a> {
    /// Total units, independent of how far iteration has progressed.
    pub fn unit_count(&self) -> u64 {
        unit_count(self.universe.len())
    }

    /// Total probes, independent of how far iteration has progressed.
    pub fn probe_count(&self) -> u64 {
        probe_count(self.universe.len())
    }
}

impl<'a> Iterator for Pairs<'a> {
    type Item = SymbolPair<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let universe = self.universe;
        let n = universe.len();
        if n == 1 {
            if self.single_done {
                return None;
            }
            self.single_done = true;
            return Some(SymbolPair::Single(universe[0].as_str()));
        }

        if self.j >= n {
            self.i += 1;
            self.j = self.i + 1;
            if self.j >= n {
                return None;
            }
        }

        let pair = SymbolPair::Pair(universe[self.i].as_str(), universe[self.j].as_str());
        self.j += 1;
        Some(pair)
    }
}

/// Units for a universe of `n` symbols.
pub fn unit_count(n: usize) -> u64 {
    let n = n as u64;
    match n {
        0 => 0,
        1 => 1,
        _ => n * (n - 1) / 2,
    }
}

/// Probes for a universe of `n` symbols.
pub fn probe_count(n: usize) -> u64 {
    match n {
        0 => 0,
        1 => 2,
        _ => 4 * unit_count(n),
    }
}
