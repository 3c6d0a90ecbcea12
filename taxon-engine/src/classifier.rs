//! Classifier: the single authoritative oracle for trait membership
//!
//! Resolution order for a positive instantiation: explicit entry with an
//! exactly matching argument pattern, then the trait's programmatic
//! predicate, then the default `Negated`. A negated bound is resolved by
//! classifying its interior and flipping the result (the involution law,
//! never a second lookup).

use crate::types::{Sign, TraitBound, TraitId, TraitInst, TypeTerm};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Programmatic membership predicate over a trait's type arguments
pub type PredicateFn = Arc<dyn Fn(&[TypeTerm]) -> bool>;

/// One classifier entry: a pinned answer for an exact argument pattern, or a
/// predicate evaluated over the arguments
pub enum ClassifierEntry {
    Static { pattern: Vec<TypeTerm>, sign: Sign },
    Predicate(PredicateFn),
}

impl fmt::Debug for ClassifierEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { pattern, sign } => f
                .debug_struct("Static")
                .field("pattern", pattern)
                .field("sign", sign)
                .finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// Per-trait entry table: exact patterns (last write wins) and at most one
/// predicate (replaced on install)
#[derive(Default)]
struct TraitEntries {
    patterns: IndexMap<Vec<TypeTerm>, Sign>,
    predicate: Option<PredicateFn>,
}

impl fmt::Debug for TraitEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitEntries")
            .field("patterns", &self.patterns)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Process-scoped classifier state, mutated only during declaration
/// processing
#[derive(Debug, Default)]
pub struct Classifier {
    entries: IndexMap<TraitId, TraitEntries>,
    /// Answers pinned by membership assertions so the query path skips the
    /// general fallback
    membership_cache: IndexMap<TraitInst, Sign>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry for a trait
    pub fn install(&mut self, trait_id: TraitId, entry: ClassifierEntry) {
        let entries = self.entries.entry(trait_id).or_default();
        match entry {
            ClassifierEntry::Static { pattern, sign } => {
                entries.patterns.insert(pattern, sign);
            }
            ClassifierEntry::Predicate(pred) => {
                entries.predicate = Some(pred);
            }
        }
    }

    /// Pin an exact argument pattern to a sign (last write wins)
    pub fn install_static(&mut self, inst: &TraitInst, sign: Sign) {
        self.install(
            inst.trait_id.clone(),
            ClassifierEntry::Static {
                pattern: inst.args.clone(),
                sign,
            },
        );
    }

    /// Install the programmatic predicate for a trait, replacing any
    /// previous one
    pub fn install_predicate(&mut self, trait_id: TraitId, pred: PredicateFn) {
        self.install(trait_id, ClassifierEntry::Predicate(pred));
    }

    /// Record an assertion's answer on the fast membership-query path
    pub fn cache_membership(&mut self, inst: &TraitInst, sign: Sign) {
        self.membership_cache.insert(inst.clone(), sign);
    }

    /// Cached answer for an instantiation, if an assertion pinned one
    pub fn cached(&self, inst: &TraitInst) -> Option<Sign> {
        self.membership_cache.get(inst).copied()
    }

    /// Classify a signed bound.
    ///
    /// `classify(Not(T)) = negate(classify(T))`; the negated form is never
    /// looked up on its own.
    pub fn classify(&self, bound: &TraitBound) -> Sign {
        match bound {
            TraitBound::Positive(inst) => self.classify_inst(inst),
            TraitBound::Negated(inst) => self.classify_inst(inst).negate(),
        }
    }

    fn classify_inst(&self, inst: &TraitInst) -> Sign {
        let Some(entries) = self.entries.get(&inst.trait_id) else {
            return Sign::Negated;
        };
        if let Some(sign) = entries.patterns.get(&inst.args) {
            return *sign;
        }
        if let Some(pred) = &entries.predicate {
            return Sign::from_bool(pred(&inst.args));
        }
        Sign::Negated
    }
}
