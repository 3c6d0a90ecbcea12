//! Dispatch rewriting for trait-conditioned functions
//!
//! A declaration whose signature carries exactly one trait constraint is
//! installed as a dispatch site: the site is the outer resolver (it computes
//! the classifier's verdict over the bound type arguments) and holds one
//! branch per verdict. Redeclaring the same site replaces the branch in
//! place; the complementary sign lands on the same site as a sibling branch.
//!
//! Site identity is the canonical key (scope, name, type parameters,
//! parameter shapes, variadic flag, positive trait form), with type
//! parameters alpha-renamed positionally so a renamed redeclaration does not
//! create a second resolver.

use crate::classifier::Classifier;
use crate::error::{DispatchError, EngineError};
use crate::types::{Bindings, Sign, TraitBound, TraitId, TraitInst, TypeTerm, Typed};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callable branch implementation over client values
pub type Handler<V> = Arc<dyn Fn(&[V]) -> V>;

/// Factory for pre-specialized bodies: receives the concrete type-argument
/// binding and produces the handler for it
pub type StagedFactory<V> = Arc<dyn Fn(&[TypeTerm]) -> Handler<V>>;

/// A branch body: an ordinary expression, or a template expanded per
/// concrete type-argument binding
pub enum BranchBody<V> {
    Expr(Handler<V>),
    Staged(StagedFactory<V>),
}

impl<V> BranchBody<V> {
    pub fn expr(handler: impl Fn(&[V]) -> V + 'static) -> Self {
        Self::Expr(Arc::new(handler))
    }

    pub fn staged(factory: impl Fn(&[TypeTerm]) -> Handler<V> + 'static) -> Self {
        Self::Staged(Arc::new(factory))
    }
}

impl<V> fmt::Debug for BranchBody<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(_) => f.write_str("Expr(<fn>)"),
            Self::Staged(_) => f.write_str("Staged(<fn>)"),
        }
    }
}

/// One sign-specific branch of a dispatch site
pub struct Branch<V> {
    body: BranchBody<V>,
    /// Staged expansions, memoized per concrete type-argument binding.
    /// Interior mutability without locking: declaration and call processing
    /// are single-threaded in this engine.
    expansions: RefCell<HashMap<Vec<TypeTerm>, Handler<V>>>,
}

impl<V> Branch<V> {
    fn new(body: BranchBody<V>) -> Self {
        Self {
            body,
            expansions: RefCell::new(HashMap::new()),
        }
    }

    /// The handler for the given type-argument binding, expanding and
    /// caching staged bodies on first use
    pub fn handler(&self, type_args: &[TypeTerm]) -> Handler<V> {
        match &self.body {
            BranchBody::Expr(handler) => Arc::clone(handler),
            BranchBody::Staged(factory) => {
                let mut cache = self.expansions.borrow_mut();
                if let Some(handler) = cache.get(type_args) {
                    return Arc::clone(handler);
                }
                let handler = factory(type_args);
                cache.insert(type_args.to_vec(), Arc::clone(&handler));
                handler
            }
        }
    }

    /// Number of memoized staged expansions (always 0 for `Expr` bodies)
    pub fn expansion_count(&self) -> usize {
        self.expansions.borrow().len()
    }
}

impl<V> fmt::Debug for Branch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("body", &self.body)
            .field("expansions", &self.expansion_count())
            .finish()
    }
}

/// Parameter annotation in a declaration: an ordinary shape over the type
/// parameters, or the inline surface form attaching a unary trait bound
/// directly to the parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamAnnotation {
    Shape(TypeTerm),
    Bound { trait_id: TraitId, negated: bool },
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub annotation: ParamAnnotation,
}

impl ParamSpec {
    pub fn shaped(name: impl Into<String>, shape: TypeTerm) -> Self {
        Self {
            name: name.into(),
            annotation: ParamAnnotation::Shape(shape),
        }
    }

    pub fn bound(name: impl Into<String>, trait_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: ParamAnnotation::Bound {
                trait_id: TraitId::new(trait_id),
                negated: false,
            },
        }
    }

    pub fn bound_negated(name: impl Into<String>, trait_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: ParamAnnotation::Bound {
                trait_id: TraitId::new(trait_id),
                negated: true,
            },
        }
    }
}

/// A trait-function declaration, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDecl {
    pub scope: Vec<String>,
    pub name: String,
    pub type_params: Vec<String>,
    pub constraints: Vec<TraitBound>,
    pub params: Vec<ParamSpec>,
    pub variadic: bool,
}

impl FnDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scope: vec![],
            name: name.into(),
            type_params: vec![],
            constraints: vec![],
            params: vec![],
            variadic: false,
        }
    }

    pub fn in_scope(mut self, scope: &[&str]) -> Self {
        self.scope = scope.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn constraint(mut self, bound: TraitBound) -> Self {
        self.constraints.push(bound);
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Mark the final parameter as variadic
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Rendered `scope.name` for error messages
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.scope, &self.name)
    }
}

fn qualified_name(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

/// A declaration normalized to the internal shape: every parameter carries a
/// plain type term and exactly one trait constraint remains
#[derive(Debug, Clone)]
pub struct NormalizedFn {
    pub scope: Vec<String>,
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<(String, TypeTerm)>,
    pub variadic: bool,
    pub bound: TraitBound,
    /// Set when the constraint came from the inline surface form, with the
    /// carrying parameter's name
    pub inline_param: Option<String>,
}

impl NormalizedFn {
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.scope, &self.name)
    }
}

/// Normalize a declaration: resolve the inline surface form and enforce the
/// exactly-one-constraint rule.
pub fn normalize(decl: FnDecl) -> Result<NormalizedFn, EngineError> {
    let function = decl.qualified_name();
    let mut type_params = decl.type_params.clone();
    let mut bounds: Vec<TraitBound> = decl.constraints.clone();
    let mut params: Vec<(String, TypeTerm)> = Vec::with_capacity(decl.params.len());
    let mut inline_param = None;

    for spec in &decl.params {
        match &spec.annotation {
            ParamAnnotation::Shape(shape) => params.push((spec.name.clone(), shape.clone())),
            ParamAnnotation::Bound { trait_id, negated } => {
                // Synthesize a fresh type parameter for the constrained
                // argument and rewrite its annotation to that variable
                let fresh = fresh_type_param(&type_params);
                let inst = TraitInst {
                    trait_id: trait_id.clone(),
                    args: vec![TypeTerm::variable(fresh.clone())],
                };
                bounds.push(if *negated {
                    TraitBound::Negated(inst)
                } else {
                    TraitBound::Positive(inst)
                });
                params.push((spec.name.clone(), TypeTerm::variable(fresh.clone())));
                type_params.push(fresh);
                inline_param = Some(spec.name.clone());
            }
        }
    }

    let mut distinct: Vec<TraitBound> = Vec::new();
    for bound in bounds {
        if !distinct.contains(&bound) {
            distinct.push(bound);
        }
    }

    let bound = match distinct.len() {
        0 => {
            return Err(DispatchError::NoTraitInSignature { function }.into());
        }
        1 => distinct.into_iter().next().unwrap(),
        _ => {
            return Err(DispatchError::AmbiguousTraitSite {
                function,
                first: distinct[0].to_string(),
                second: distinct[1].to_string(),
            }
            .into());
        }
    };

    Ok(NormalizedFn {
        scope: decl.scope,
        name: decl.name,
        type_params,
        params,
        variadic: decl.variadic,
        bound,
        inline_param,
    })
}

fn fresh_type_param(taken: &[String]) -> String {
    let mut i = 0;
    loop {
        let candidate = format!("T{i}");
        if !taken.iter().any(|name| name == &candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Canonical identity of a dispatch site.
///
/// Type parameters are renamed positionally (`$0`, `$1`, ...) so renaming a
/// type variable in a redeclaration still addresses the same site, and the
/// trait constraint is keyed in its positive form so complementary
/// declarations collide into sibling branches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    pub scope: Vec<String>,
    pub name: String,
    pub type_param_count: usize,
    pub param_shapes: Vec<TypeTerm>,
    pub variadic: bool,
    pub constraint: TraitInst,
}

impl DispatchKey {
    fn for_normalized(norm: &NormalizedFn) -> Self {
        let mut renaming = Bindings::new();
        for (i, name) in norm.type_params.iter().enumerate() {
            renaming.bind(name, &TypeTerm::variable(format!("${i}")));
        }

        Self {
            scope: norm.scope.clone(),
            name: norm.name.clone(),
            type_param_count: norm.type_params.len(),
            param_shapes: norm
                .params
                .iter()
                .map(|(_, shape)| renaming.apply(shape))
                .collect(),
            variadic: norm.variadic,
            constraint: norm.bound.inst().substituted(&renaming),
        }
    }
}

/// Result of installing a declaration into the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
    /// A new site (outer resolver) was created
    NewSite,
    /// The sibling branch for the other sign was added to an existing site
    BranchAdded,
    /// The branch for this sign already existed and was replaced in place
    BranchReplaced,
}

/// One dispatch site: the outer resolver plus its sign-keyed branches
pub struct DispatchSite<V> {
    key: DispatchKey,
    type_params: Vec<String>,
    params: Vec<(String, TypeTerm)>,
    variadic: bool,
    /// Positive form of the site's trait constraint, over `type_params`
    constraint: TraitInst,
    when_confirmed: Option<Branch<V>>,
    when_negated: Option<Branch<V>>,
}

impl<V> DispatchSite<V> {
    fn new(norm: &NormalizedFn, key: DispatchKey) -> Self {
        Self {
            key,
            type_params: norm.type_params.clone(),
            params: norm.params.clone(),
            variadic: norm.variadic,
            constraint: norm.bound.inst().clone(),
            when_confirmed: None,
            when_negated: None,
        }
    }

    pub fn key(&self) -> &DispatchKey {
        &self.key
    }

    pub fn branch(&self, sign: Sign) -> Option<&Branch<V>> {
        match sign {
            Sign::Confirmed => self.when_confirmed.as_ref(),
            Sign::Negated => self.when_negated.as_ref(),
        }
    }

    pub fn branch_count(&self) -> usize {
        self.when_confirmed.is_some() as usize + self.when_negated.is_some() as usize
    }

    fn set_branch(&mut self, sign: Sign, branch: Branch<V>) -> DefineOutcome {
        let slot = match sign {
            Sign::Confirmed => &mut self.when_confirmed,
            Sign::Negated => &mut self.when_negated,
        };
        let outcome = if slot.is_some() {
            DefineOutcome::BranchReplaced
        } else {
            DefineOutcome::BranchAdded
        };
        *slot = Some(branch);
        outcome
    }

    /// Bind the site's parameter shapes against actual argument terms
    fn bind_args(&self, arg_terms: &[TypeTerm]) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        if self.variadic {
            let fixed = self.params.len().checked_sub(1)?;
            if arg_terms.len() < fixed {
                return None;
            }
            for (param, term) in self.params[..fixed].iter().zip(arg_terms) {
                if !match_shape(&param.1, term, &mut bindings) {
                    return None;
                }
            }
            let tail_shape = &self.params[fixed].1;
            for term in &arg_terms[fixed..] {
                if !match_shape(tail_shape, term, &mut bindings) {
                    return None;
                }
            }
        } else {
            if arg_terms.len() != self.params.len() {
                return None;
            }
            for (param, term) in self.params.iter().zip(arg_terms) {
                if !match_shape(&param.1, term, &mut bindings) {
                    return None;
                }
            }
        }
        Some(bindings)
    }
}

impl<V> fmt::Debug for DispatchSite<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSite")
            .field("key", &self.key)
            .field("constraint", &self.constraint)
            .field("branches", &self.branch_count())
            .finish()
    }
}

/// First-order matching of a parameter shape against a concrete argument
/// term, accumulating consistent variable bindings
fn match_shape(shape: &TypeTerm, actual: &TypeTerm, bindings: &mut Bindings) -> bool {
    match (shape, actual) {
        (TypeTerm::Variable { name }, _) => bindings.bind(name, actual),
        (
            TypeTerm::Concrete { id, args },
            TypeTerm::Concrete {
                id: actual_id,
                args: actual_args,
            },
        ) => {
            id == actual_id
                && args.len() == actual_args.len()
                && args
                    .iter()
                    .zip(actual_args)
                    .all(|(s, a)| match_shape(s, a, bindings))
        }
        (TypeTerm::Concrete { .. }, TypeTerm::Variable { .. }) => false,
    }
}

/// Process-scoped table of dispatch sites, keyed for replace-on-insert
pub struct DispatchTable<V> {
    sites: IndexMap<DispatchKey, DispatchSite<V>>,
    /// Declaration-ordered site keys per function name, used by the call
    /// path to locate the matching signature
    names: IndexMap<(Vec<String>, String), Vec<DispatchKey>>,
}

impl<V> Default for DispatchTable<V> {
    fn default() -> Self {
        Self {
            sites: IndexMap::new(),
            names: IndexMap::new(),
        }
    }
}

impl<V> DispatchTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a normalized declaration.
    ///
    /// The outer resolver is emitted once per key; repeated declarations
    /// replace the branch for their sign in place, and the complementary
    /// sign becomes a sibling branch of the same site.
    pub fn define(&mut self, norm: &NormalizedFn, body: BranchBody<V>) -> DefineOutcome {
        let key = DispatchKey::for_normalized(norm);
        let sign = norm.bound.sign();
        let branch = Branch::new(body);

        if let Some(site) = self.sites.get_mut(&key) {
            return site.set_branch(sign, branch);
        }

        let mut site = DispatchSite::new(norm, key.clone());
        site.set_branch(sign, branch);
        self.sites.insert(key.clone(), site);
        self.names
            .entry((norm.scope.clone(), norm.name.clone()))
            .or_default()
            .push(key);
        DefineOutcome::NewSite
    }

    pub fn site(&self, key: &DispatchKey) -> Option<&DispatchSite<V>> {
        self.sites.get(key)
    }

    /// Site keys declared under a function name, in declaration order
    pub fn sites_named(&self, scope: &[&str], name: &str) -> &[DispatchKey] {
        let lookup = (
            scope.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            name.to_string(),
        );
        self.names
            .get(&lookup)
            .map(|keys| keys.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Resolve and invoke a trait-conditioned function.
    ///
    /// The first declared site whose shapes bind the actual argument types
    /// wins; the classifier's verdict over the bound constraint selects the
    /// branch.
    pub fn call(
        &self,
        classifier: &Classifier,
        scope: &[&str],
        name: &str,
        args: &[V],
    ) -> Result<V, EngineError>
    where
        V: Typed,
    {
        let function = qualified_name(
            &scope.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            name,
        );
        let keys = self.sites_named(scope, name);
        if keys.is_empty() {
            return Err(DispatchError::UnknownFunction { function }.into());
        }

        let arg_terms: Vec<TypeTerm> = args.iter().map(Typed::type_term).collect();

        let (site, bindings) = keys
            .iter()
            .filter_map(|key| {
                let site = self.sites.get(key)?;
                site.bind_args(&arg_terms).map(|b| (site, b))
            })
            .next()
            .ok_or_else(|| DispatchError::SignatureMismatch {
                function: function.clone(),
                found: arg_terms
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let inst = site.constraint.substituted(&bindings);
        if let Some(variable) = inst.first_variable() {
            return Err(DispatchError::UnboundTraitParameter {
                function,
                parameter: variable.to_string(),
            }
            .into());
        }

        let verdict = classifier.classify(&TraitBound::Positive(inst.clone()));
        let branch = site
            .branch(verdict)
            .ok_or_else(|| DispatchError::NoMatchingBranch {
                function: function.clone(),
                sign: verdict,
                constraint: inst.to_string(),
            })?;

        let type_args: Vec<TypeTerm> = site
            .type_params
            .iter()
            .map(|p| {
                bindings
                    .get(p)
                    .cloned()
                    .unwrap_or_else(|| TypeTerm::variable(p.clone()))
            })
            .collect();

        let handler = branch.handler(&type_args);
        Ok(handler(args))
    }
}

impl<V> fmt::Debug for DispatchTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("sites", &self.sites.len())
            .finish()
    }
}
