//! Catalog of built-in type facts backing the property predicates

use lazy_static::lazy_static;
use std::collections::HashMap;
use taxon_engine::TypeTerm;

/// Per-type facts consulted by the property predicates.
///
/// Facts describe the head type; parameterized heads (e.g. `Vec<Int64>`)
/// are judged by their head name, except where a predicate documents
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFacts {
    /// Fixed bit width when the type is bit-representable
    pub bits: Option<u32>,
    pub immutable: bool,
    pub contiguous: bool,
    pub callable: bool,
    pub iterable: bool,
    pub linear_index: bool,
}

impl TypeFacts {
    fn scalar(bits: u32) -> Self {
        Self {
            bits: Some(bits),
            immutable: true,
            contiguous: false,
            callable: false,
            iterable: false,
            linear_index: false,
        }
    }

    fn container(contiguous: bool, linear_index: bool) -> Self {
        Self {
            bits: None,
            immutable: false,
            contiguous,
            callable: false,
            iterable: true,
            linear_index,
        }
    }
}

lazy_static! {
    /// Facts for the built-in model types, keyed by head type name
    pub static ref BUILTIN_FACTS: HashMap<&'static str, TypeFacts> = {
        let mut facts = HashMap::new();

        facts.insert("Int64", TypeFacts::scalar(64));
        facts.insert("Int32", TypeFacts::scalar(32));
        facts.insert("Float64", TypeFacts::scalar(64));
        facts.insert("Float32", TypeFacts::scalar(32));
        facts.insert("Bool", TypeFacts::scalar(8));
        facts.insert("Char", TypeFacts::scalar(32));
        facts.insert("Nothing", TypeFacts::scalar(0));

        // Strings own contiguous storage and iterate their characters
        facts.insert(
            "String",
            TypeFacts {
                bits: None,
                immutable: true,
                contiguous: true,
                callable: false,
                iterable: true,
                linear_index: true,
            },
        );

        facts.insert("Vec", TypeFacts::container(true, true));
        facts.insert("Array", TypeFacts::container(true, true));
        facts.insert(
            "Slice",
            TypeFacts {
                immutable: true,
                ..TypeFacts::container(true, true)
            },
        );
        facts.insert("Map", TypeFacts::container(false, false));
        facts.insert("Set", TypeFacts::container(false, false));

        // A range is two scalars and iterates linearly
        facts.insert(
            "Range",
            TypeFacts {
                bits: Some(128),
                immutable: true,
                contiguous: false,
                callable: false,
                iterable: true,
                linear_index: true,
            },
        );

        facts.insert(
            "Closure",
            TypeFacts {
                bits: None,
                immutable: true,
                contiguous: false,
                callable: true,
                iterable: false,
                linear_index: false,
            },
        );
        facts.insert(
            "Function",
            TypeFacts {
                bits: None,
                immutable: true,
                contiguous: false,
                callable: true,
                iterable: false,
                linear_index: false,
            },
        );

        facts
    };
}

/// Facts for a term's head type, if it is concrete and cataloged
pub fn facts_for(term: &TypeTerm) -> Option<&'static TypeFacts> {
    term.head_name().and_then(|name| BUILTIN_FACTS.get(name))
}
