use std::collections::HashSet;

/// The kind of a directed relation between two terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Child points at a parent. Primary relation; its transitive closure
    /// defines ancestry.
    IsA,
    /// Obsolete term points at the term that replaces it.
    ReplacedBy,
    /// Inverse of `IsA`, materialized once after parsing.
    ParentOf,
}

/// A single node in the ontology DAG.
#[derive(Debug, Clone, Default)]
pub struct Term {
    pub id: String,
    pub name: Option<String>,
    pub obsolete: bool,
    pub alts: HashSet<String>,
    pub synonyms: HashSet<String>,
    pub relations: Vec<(RelationKind, String)>,
}

impl Term {
    pub fn new(id: impl Into<String>) -> Self {
        Term {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn add_relation(&mut self, target: &str, kind: RelationKind) {
        // `is_a`/`replaced_by` values may carry a trailing comment after the
        // target id, separated by whitespace; keep only the first token.
        let target = target.split_whitespace().next().unwrap_or(target);
        self.relations.push((kind, target.to_string()));
    }

    pub fn add_alt(&mut self, alt_id: impl Into<String>) {
        self.alts.insert(alt_id.into());
    }

    pub fn add_synonym(&mut self, synonym: &str) -> bool {
        // synonyms equal to the term's name are not kept.
        if self.name.as_deref() == Some(synonym) {
            return false;
        }
        self.synonyms.insert(synonym.to_string());
        true
    }

    pub fn targets(&self, kind: RelationKind) -> impl Iterator<Item = &str> {
        self.relations
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, t)| t.as_str())
    }
}
