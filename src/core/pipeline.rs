//! Pipeline file reading and step selection.
//!
//! A pipeline file may hold several `---`-delimited YAML documents (e.g. a
//! build pipeline followed by a promote pipeline). Step extraction walks all
//! documents in file order; the resulting name list is the single source of
//! truth for valid step names, and user selections are always filtered
//! through it with [`reconcile`].

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};

/// One entry of a document's `steps` sequence. Only `name` drives execution;
/// `image` is carried for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub image: Option<String>,
}

/// Parse every YAML document in the file text.
///
/// Fails on the first malformed document with no partial result. Empty
/// documents parse to `Null` and are kept (they simply contribute no steps).
pub fn parse_documents(text: &str) -> Result<Vec<Value>> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)
            .map_err(|e| Error::pipeline_parse(e.to_string(), None))?;
        docs.push(value);
    }
    Ok(docs)
}

/// Look up a string field on a YAML mapping. `None` when the document is not
/// a mapping, the key is absent, or the value is not a string.
fn get_str<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    doc.as_mapping()?.get(Value::from(key))?.as_str()
}

/// Look up a sequence field on a YAML mapping.
fn get_sequence<'a>(doc: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match doc.as_mapping()?.get(Value::from(key))? {
        Value::Sequence(seq) => Some(seq),
        _ => None,
    }
}

/// Extract all steps across all documents, in document order then
/// within-document sequence order.
///
/// Documents without a `steps` sequence contribute nothing. Step entries
/// without a string `name` are skipped.
pub fn parse_steps(text: &str) -> Result<Vec<Step>> {
    let docs = parse_documents(text)?;
    let mut steps = Vec::new();

    for doc in &docs {
        let Some(entries) = get_sequence(doc, "steps") else {
            continue;
        };
        for entry in entries {
            let Some(name) = get_str(entry, "name") else {
                continue;
            };
            steps.push(Step {
                name: name.to_string(),
                image: get_str(entry, "image").map(str::to_string),
            });
        }
    }

    Ok(steps)
}

/// Step names across all documents: the canonical ordered step list.
pub fn parse_step_names(text: &str) -> Result<Vec<String>> {
    Ok(parse_steps(text)?.into_iter().map(|s| s.name).collect())
}

/// Top-level `name` of the first document, best effort. A missing or
/// non-string name is `None`, never an error.
pub fn pipeline_name(text: &str) -> Result<Option<String>> {
    let docs = parse_documents(text)?;
    Ok(docs
        .first()
        .and_then(|doc| get_str(doc, "name"))
        .map(str::to_string))
}

/// Intersect a requested step selection with the canonical step list.
///
/// The result keeps the order of `all_steps` (pipeline order), not the order
/// the user picked. Duplicates in `requested` collapse. Requested names not
/// present in `all_steps` are dropped without comment; a selection of
/// unknown names simply yields a smaller (possibly empty) result.
pub fn reconcile(all_steps: &[String], requested: &[String]) -> Vec<String> {
    all_steps
        .iter()
        .filter(|step| requested.iter().any(|r| r == *step))
        .cloned()
        .collect()
}
