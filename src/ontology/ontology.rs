use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Read;

use log::info;

use super::error::OntologyError;
use super::parser::parse_obo;
use super::term::{RelationKind, Term};

/// A DAG of ontology terms with memoized ancestor/descendant/parent queries.
///
/// Caches are read-mostly after construction and use interior mutability so
/// that query methods can take `&self` (see §9 design notes on caches: an
/// `Ontology` is rebuilt per scheduler packet rather than shared and mutated
/// concurrently, so a `RefCell` is sufficient and never observed across
/// threads).
#[derive(Debug)]
pub struct Ontology {
    terms: HashMap<String, Term>,
    parents_cache: RefCell<HashMap<String, Vec<String>>>,
    children_cache: RefCell<HashMap<String, Vec<String>>>,
    ancestors_cache: RefCell<HashMap<String, Vec<String>>>,
    descendants_cache: RefCell<HashMap<String, Vec<String>>>,
    alts_cache: RefCell<HashMap<String, String>>,
}

impl Ontology {
    /// Parse an OBO stream and materialize `parent_of` edges.
    pub fn from_obo(reader: impl Read) -> Result<Self, OntologyError> {
        let terms = parse_obo(reader)?;
        let obsolete = terms.values().filter(|t| t.obsolete).count();
        info!("parsed {} ontology terms ({obsolete} obsolete)", terms.len());
        let mut ontology = Ontology {
            terms,
            parents_cache: RefCell::new(HashMap::new()),
            children_cache: RefCell::new(HashMap::new()),
            ancestors_cache: RefCell::new(HashMap::new()),
            descendants_cache: RefCell::new(HashMap::new()),
            alts_cache: RefCell::new(HashMap::new()),
        };
        ontology.add_parent_of();
        Ok(ontology)
    }

    /// Build directly from already-parsed terms (used by tests and by
    /// construction helpers that assemble terms programmatically).
    pub fn from_terms(terms: HashMap<String, Term>) -> Self {
        let mut ontology = Ontology {
            terms,
            parents_cache: RefCell::new(HashMap::new()),
            children_cache: RefCell::new(HashMap::new()),
            ancestors_cache: RefCell::new(HashMap::new()),
            descendants_cache: RefCell::new(HashMap::new()),
            alts_cache: RefCell::new(HashMap::new()),
        };
        ontology.add_parent_of();
        ontology
    }

    fn add_parent_of(&mut self) {
        let mut additions: Vec<(String, String)> = Vec::new();
        for (child_id, term) in self.terms.iter() {
            for (kind, target) in &term.relations {
                if *kind == RelationKind::IsA && self.valid(target) {
                    additions.push((target.clone(), child_id.clone()));
                }
            }
        }
        for (parent, child) in additions {
            if let Some(parent_term) = self.terms.get_mut(&parent) {
                parent_term.add_relation(&child, RelationKind::ParentOf);
            }
        }
    }

    /// All primary ids. `including_obsolete = false` filters obsolete terms.
    pub fn ids(&self, including_obsolete: bool) -> Vec<String> {
        self.terms
            .values()
            .filter(|t| including_obsolete || !t.obsolete)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn has(&self, id: &str) -> bool {
        self.terms.contains_key(id)
    }

    pub fn valid(&self, id: &str) -> bool {
        self.terms.get(id).is_some_and(|t| !t.obsolete)
    }

    pub fn term(&self, id: &str) -> Option<&Term> {
        self.terms.get(id)
    }

    /// Resolve `id` to the canonical (primary) id of the term it refers to,
    /// trying a direct match, then the alt-id cache, then a linear scan of
    /// every term's alt-id set (which is cached for subsequent lookups).
    pub fn canonical(&self, id: &str) -> Option<String> {
        if self.terms.contains_key(id) {
            return Some(id.to_string());
        }
        if let Some(hit) = self.alts_cache.borrow().get(id) {
            return Some(hit.clone());
        }
        for (primary, term) in &self.terms {
            if term.alts.contains(id) {
                self.alts_cache
                    .borrow_mut()
                    .insert(id.to_string(), primary.clone());
                return Some(primary.clone());
            }
        }
        None
    }

    fn relation_targets(&self, id: &str, kind: RelationKind) -> Result<Vec<String>, OntologyError> {
        let term = self
            .terms
            .get(id)
            .ok_or_else(|| OntologyError::UnknownTerm(id.to_string()))?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for target in term.targets(kind) {
            if self.valid(target) && seen.insert(target.to_string()) {
                result.push(target.to_string());
            }
        }
        Ok(result)
    }

    pub fn parents(&self, id: &str) -> Result<Vec<String>, OntologyError> {
        if let Some(hit) = self.parents_cache.borrow().get(id) {
            return Ok(hit.clone());
        }
        let result = self.relation_targets(id, RelationKind::IsA)?;
        self.parents_cache
            .borrow_mut()
            .insert(id.to_string(), result.clone());
        Ok(result)
    }

    pub fn children(&self, id: &str) -> Result<Vec<String>, OntologyError> {
        if let Some(hit) = self.children_cache.borrow().get(id) {
            return Ok(hit.clone());
        }
        let result = self.relation_targets(id, RelationKind::ParentOf)?;
        self.children_cache
            .borrow_mut()
            .insert(id.to_string(), result.clone());
        Ok(result)
    }

    fn recursive_closure(
        &self,
        id: &str,
        kind: RelationKind,
        cache: &RefCell<HashMap<String, Vec<String>>>,
    ) -> Result<Vec<String>, OntologyError> {
        if let Some(hit) = cache.borrow().get(id) {
            return Ok(hit.clone());
        }
        // existence check up front so unknown ids fail the same way
        // `parents`/`children` do, even though recursion never re-queries id.
        if !self.terms.contains_key(id) {
            return Err(OntologyError::UnknownTerm(id.to_string()));
        }

        let mut result = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![id.to_string()];
        visited.insert(id.to_string());
        while let Some(current) = stack.pop() {
            let hits = self.relation_targets(&current, kind)?;
            for hit in hits {
                if visited.insert(hit.clone()) {
                    result.insert(hit.clone());
                    stack.push(hit);
                }
            }
        }
        result.remove(id);
        let result: Vec<String> = result.into_iter().collect();
        cache.borrow_mut().insert(id.to_string(), result.clone());
        Ok(result)
    }

    pub fn ancestors(&self, id: &str) -> Result<Vec<String>, OntologyError> {
        self.recursive_closure(id, RelationKind::IsA, &self.ancestors_cache)
    }

    pub fn descendants(&self, id: &str) -> Result<Vec<String>, OntologyError> {
        self.recursive_closure(id, RelationKind::ParentOf, &self.descendants_cache)
    }

    pub fn siblings(&self, id: &str) -> Result<Vec<String>, OntologyError> {
        let mut result = HashSet::new();
        for parent in self.parents(id)? {
            for child in self.children(&parent)? {
                result.insert(child);
            }
        }
        result.remove(id);
        Ok(result.into_iter().collect())
    }

    pub fn replaced_by(&self, id: &str) -> Result<Option<String>, OntologyError> {
        let hits = self.relation_targets(id, RelationKind::ReplacedBy)?;
        Ok(hits.into_iter().next())
    }

    /// Jaccard similarity over `ancestors(x) ∪ {x}`.
    pub fn sim_jaccard(&self, a: &str, b: &str) -> Result<f64, OntologyError> {
        let mut sa: HashSet<String> = self.ancestors(a)?.into_iter().collect();
        sa.insert(a.to_string());
        let mut sb: HashSet<String> = self.ancestors(b)?.into_iter().collect();
        sb.insert(b.to_string());
        let inter = sa.intersection(&sb).count();
        let union = sa.union(&sb).count();
        Ok(inter as f64 / union as f64)
    }
}
