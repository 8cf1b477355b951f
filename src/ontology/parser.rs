//! Streaming reader for the OBO text format: `[Term]`/`[Typedef]` sections,
//! blank-line-terminated records, a fixed set of recognized fields.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use super::error::OntologyError;
use super::term::{RelationKind, Term};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ParserState {
    None,
    Term,
    Typedef,
}

/// Parse an OBO stream into a map from primary id to [`Term`].
///
/// `parent_of` edges are not materialized here; see
/// [`crate::ontology::Ontology::from_obo`], which calls this function and
/// then inverts `is_a` once.
pub fn parse_obo(reader: impl Read) -> Result<HashMap<String, Term>, OntologyError> {
    let buf = BufReader::new(reader);
    let mut result = HashMap::new();
    let mut state = ParserState::None;
    let mut current: Option<Term> = None;

    for line in buf.lines() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);

        if line == "[Term]" {
            state = ParserState::Term;
        } else if line == "[Typedef]" {
            state = ParserState::Typedef;
        }

        if state != ParserState::Term {
            continue;
        }

        if line.is_empty() {
            if let Some(term) = current.take() {
                if term.id.is_empty() {
                    return Err(OntologyError::InvalidOntologyRecord(
                        "incomplete [Term] record (missing id)".to_string(),
                    ));
                }
                result.insert(term.id.clone(), term);
            }
            continue;
        }

        if line == "[Term]" {
            current = Some(Term::default());
            continue;
        }

        let term = current
            .as_mut()
            .expect("state machine guarantees a term is open inside a [Term] block");
        parse_line(term, line)?;
    }

    if let Some(term) = current {
        if !term.id.is_empty() {
            result.insert(term.id.clone(), term);
        } else {
            return Err(OntologyError::InvalidOntologyRecord(
                "incomplete trailing [Term] record (missing id)".to_string(),
            ));
        }
    }

    Ok(result)
}

fn parse_line(term: &mut Term, line: &str) -> Result<(), OntologyError> {
    let Some((key, value)) = line.split_once(": ") else {
        return Ok(());
    };

    match key {
        "id" => term.id = value.to_string(),
        "is_obsolete" => {
            if value != "true" {
                return Err(OntologyError::InvalidOntologyRecord(format!(
                    "unknown value for field is_obsolete: '{value}'"
                )));
            }
            term.obsolete = true;
        }
        "alt_id" => term.add_alt(value),
        "replaced_by" => {
            if !term.obsolete {
                return Err(OntologyError::InvalidObsoleteReplacement(term.id.clone()));
            }
            term.add_relation(value, RelationKind::ReplacedBy);
        }
        "is_a" => term.add_relation(value, RelationKind::IsA),
        "name" => term.name = Some(value.to_string()),
        "synonym" => {
            if term.name.is_none() {
                return Err(OntologyError::InvalidOntologyRecord(format!(
                    "synonym parsed before name was set for term '{}'",
                    term.id
                )));
            }
            let synonym = extract_quoted(value);
            term.add_synonym(&synonym);
        }
        _ => {}
    }

    Ok(())
}

/// Extract the text between the first two double quotes in `value`, or
/// return `value` unchanged if it contains no quotes.
fn extract_quoted(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'"') {
        return value.to_string();
    }
    match value[1..].find('"') {
        Some(end) => value[1..1 + end].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_record() {
        let obo = "format-version: 1.2\n\n[Term]\nid: Y:001\nname: root\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms["Y:001"].name.as_deref(), Some("root"));
    }

    #[test]
    fn trailing_record_without_blank_line_is_accepted() {
        let obo = "[Term]\nid: Y:001\nname: root";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn is_a_drops_trailing_comment() {
        let obo = "[Term]\nid: Y:002\nis_a: Y:001 ! root term\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        let parents: Vec<_> = terms["Y:002"].targets(RelationKind::IsA).collect();
        assert_eq!(parents, vec!["Y:001"]);
    }

    #[test]
    fn replaced_by_without_obsolete_fails() {
        let obo = "[Term]\nid: Y:003\nreplaced_by: Y:004\n\n";
        let err = parse_obo(obo.as_bytes()).unwrap_err();
        assert!(matches!(err, OntologyError::InvalidObsoleteReplacement(_)));
    }

    #[test]
    fn obsolete_then_replaced_by_succeeds() {
        let obo = "[Term]\nid: Y:003\nis_obsolete: true\nreplaced_by: Y:004\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert!(terms["Y:003"].obsolete);
        let replacement: Vec<_> = terms["Y:003"].targets(RelationKind::ReplacedBy).collect();
        assert_eq!(replacement, vec!["Y:004"]);
    }

    #[test]
    fn synonym_equal_to_name_is_discarded() {
        let obo = "[Term]\nid: Y:001\nname: root\nsynonym: \"root\" EXACT []\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert!(terms["Y:001"].synonyms.is_empty());
    }

    #[test]
    fn synonym_different_from_name_is_kept() {
        let obo = "[Term]\nid: Y:001\nname: root\nsynonym: \"top\" EXACT []\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert!(terms["Y:001"].synonyms.contains("top"));
    }

    #[test]
    fn typedef_sections_are_ignored() {
        let obo = "[Term]\nid: Y:001\n\n[Typedef]\nid: is_a\nname: is_a\n\n[Term]\nid: Y:002\n\n";
        let terms = parse_obo(obo.as_bytes()).unwrap();
        assert_eq!(terms.len(), 2);
    }
}
