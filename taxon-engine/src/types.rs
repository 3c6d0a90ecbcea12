//! Core term language for the taxon trait engine
//!
//! Traits classify types, so everything here is expressed over a small term
//! language: concrete type heads applied to argument terms, and still-generic
//! type variables. Trait instantiations bind a trait name to such terms, and
//! the negation wrapper carries the sign of a constraint.

use std::collections::HashMap;
use std::fmt;

/// Identifier for a concrete type head (e.g. `Int64`, `Vec`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeId(pub String);

impl TypeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Trait identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitId(pub String);

impl TraitId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A type argument term: either a concrete type (possibly parameterized) or a
/// still-generic type variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTerm {
    /// Concrete types: `Int64`, `Vec<Int64>`, `Map<String, Float64>`
    Concrete { id: TypeId, args: Vec<TypeTerm> },

    /// Type variables for still-generic positions: `X`, `Element`
    Variable { name: String },
}

impl TypeTerm {
    /// Create a concrete type with no arguments
    pub fn concrete(name: impl Into<String>) -> Self {
        Self::Concrete {
            id: TypeId::new(name),
            args: vec![],
        }
    }

    /// Create a parameterized concrete type (e.g. `Vec<Int64>`)
    pub fn parameterized(name: impl Into<String>, args: Vec<TypeTerm>) -> Self {
        Self::Concrete {
            id: TypeId::new(name),
            args,
        }
    }

    /// Create a type variable
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable { name: name.into() }
    }

    /// The head type name, if this is a concrete term
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Self::Concrete { id, .. } => Some(id.name()),
            Self::Variable { .. } => None,
        }
    }

    /// True iff no variable occurs anywhere in the term
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Variable { .. } => false,
            Self::Concrete { args, .. } => args.iter().all(TypeTerm::is_concrete),
        }
    }

    /// First variable name occurring in the term, if any
    pub fn first_variable(&self) -> Option<&str> {
        match self {
            Self::Variable { name } => Some(name),
            Self::Concrete { args, .. } => args.iter().find_map(TypeTerm::first_variable),
        }
    }
}

impl fmt::Display for TypeTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete { id, args } => {
                write!(f, "{}", id.name())?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Self::Variable { name } => write!(f, "{name}"),
        }
    }
}

/// A trait applied to type arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitInst {
    pub trait_id: TraitId,
    pub args: Vec<TypeTerm>,
}

impl TraitInst {
    pub fn new(trait_id: impl Into<String>, args: Vec<TypeTerm>) -> Self {
        Self {
            trait_id: TraitId::new(trait_id),
            args,
        }
    }

    /// True iff every type argument is fully concrete
    pub fn is_concrete(&self) -> bool {
        self.args.iter().all(TypeTerm::is_concrete)
    }

    /// First variable name occurring in any argument, if any
    pub fn first_variable(&self) -> Option<&str> {
        self.args.iter().find_map(TypeTerm::first_variable)
    }

    /// Apply a binding to every argument term
    pub fn substituted(&self, bindings: &Bindings) -> TraitInst {
        TraitInst {
            trait_id: self.trait_id.clone(),
            args: self.args.iter().map(|arg| bindings.apply(arg)).collect(),
        }
    }
}

impl fmt::Display for TraitInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trait_id.name())?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Classification outcome (and assertion sign) for a trait instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Confirmed,
    Negated,
}

impl Sign {
    pub fn negate(self) -> Self {
        match self {
            Self::Confirmed => Self::Negated,
            Self::Negated => Self::Confirmed,
        }
    }

    pub fn from_bool(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Negated
        }
    }

    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Negated => write!(f, "negated"),
        }
    }
}

/// A signed trait constraint: the instantiation itself, or its complement.
///
/// Negation is an involution: negating a `Negated` bound yields the original
/// `Positive` bound, so a doubly-wrapped value is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraitBound {
    Positive(TraitInst),
    Negated(TraitInst),
}

impl TraitBound {
    /// Structural complement; `b.negate().negate() == b`
    pub fn negate(self) -> Self {
        match self {
            Self::Positive(inst) => Self::Negated(inst),
            Self::Negated(inst) => Self::Positive(inst),
        }
    }

    /// The wrapped instantiation, sign stripped
    pub fn inst(&self) -> &TraitInst {
        match self {
            Self::Positive(inst) | Self::Negated(inst) => inst,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive(_))
    }

    /// The sign of the bound itself: `Confirmed` for positive, `Negated` for
    /// the complement form
    pub fn sign(&self) -> Sign {
        match self {
            Self::Positive(_) => Sign::Confirmed,
            Self::Negated(_) => Sign::Negated,
        }
    }

    /// Canonical positive rendering of the constraint plus its sign
    pub fn canonical(&self) -> (&TraitInst, Sign) {
        (self.inst(), self.sign())
    }
}

impl fmt::Display for TraitBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive(inst) => write!(f, "{inst}"),
            Self::Negated(inst) => write!(f, "!{inst}"),
        }
    }
}

/// Values that can report the type term they belong to.
///
/// This is the seam between the engine and whatever value representation a
/// client runs: dispatch only ever inspects the reported terms.
pub trait Typed {
    fn type_term(&self) -> TypeTerm;
}

/// Mapping from type-variable names to terms, built up while matching
/// parameter shapes against actual argument types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    mappings: HashMap<String, TypeTerm>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable, rejecting a conflicting rebind.
    ///
    /// Returns false when the variable is already bound to a different term.
    pub fn bind(&mut self, name: &str, term: &TypeTerm) -> bool {
        match self.mappings.get(name) {
            Some(existing) => existing == term,
            None => {
                self.mappings.insert(name.to_string(), term.clone());
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeTerm> {
        self.mappings.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Apply the binding to a term, replacing bound variables; unbound
    /// variables are left in place
    pub fn apply(&self, term: &TypeTerm) -> TypeTerm {
        match term {
            TypeTerm::Variable { name } => match self.mappings.get(name) {
                Some(bound) => bound.clone(),
                None => term.clone(),
            },
            TypeTerm::Concrete { id, args } => TypeTerm::Concrete {
                id: id.clone(),
                args: args.iter().map(|arg| self.apply(arg)).collect(),
            },
        }
    }
}
