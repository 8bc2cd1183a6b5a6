//! Template metadata and field resolution.
//!
//! A template ships with metadata describing its user inputs and the
//! substitution fields in its stream. Resolving the fields against the user's
//! values yields the [`FilterMap`] the template filter runs with.

use std::collections::HashMap;
use std::io::Read;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{Filter, FilterMap};
use crate::types::{ProduceError, ValueType};

/// Errors resolving substitution fields.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A pass made no progress: the remaining fields depend on each other or
    /// on fields that do not exist
    #[error("dependency deadlock: substitutions {unresolved:?} cannot be resolved")]
    DependencyDeadlock { unresolved: Vec<u32> },
    #[error("field '{field}' has unknown type '{type_name}'")]
    UnknownType { field: String, type_name: String },
    #[error("bad value '{value}' for field '{field}' of type '{type_name}'")]
    BadFieldValue {
        field: String,
        value: String,
        type_name: String,
        #[source]
        source: ProduceError,
    },
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Metadata of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Label")]
    pub label: String,
    #[serde(alias = "Version")]
    pub version: String,
    /// Logical groups user inputs are displayed in ("basic", "advanced").
    #[serde(rename = "input groups")]
    pub input_groups: Vec<String>,
    #[serde(rename = "user inputs")]
    pub inputs: Vec<Input>,
    #[serde(rename = "substitutions")]
    pub substitutions: Vec<Substitution>,
}

/// A user input of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    #[serde(alias = "Group")]
    pub group: String,
    /// Unique terse name, referenced by substitutions.
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Label")]
    pub label: String,
    #[serde(alias = "Default")]
    pub default: String,
}

/// A substitution field: one marker index in the template stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Substitution {
    /// Marker index as it appears in the template.
    #[serde(rename = "substitution index")]
    pub index: u32,
    /// Input the value is taken from; empty means always use the default.
    #[serde(alias = "Input")]
    pub input: String,
    /// Note for template maintainers.
    #[serde(alias = "Comment")]
    pub comment: String,
    #[serde(alias = "Default")]
    pub default: String,
    /// Type name, see [`ValueType::from_name`].
    #[serde(rename = "type", alias = "Type")]
    pub type_name: String,
    /// Indices whose values are passed to the producer after the input.
    #[serde(rename = "dependencies")]
    pub dependencies: Vec<u32>,
}

impl Metadata {
    /// Parse metadata from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse metadata from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ResolveError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Substitution {
    /// Input string for this field: the user's value if one was given for a
    /// named input, the default otherwise.
    fn input_value<'a>(&'a self, values: &'a HashMap<String, String>) -> &'a str {
        match values.get(&self.input) {
            Some(value) if !self.input.is_empty() => value,
            _ => &self.default,
        }
    }

    /// Produce this field's value, or `None` if a dependency is missing.
    fn resolve(&self, values: &HashMap<String, String>, resolved: &FilterMap) -> Result<Option<Vec<u8>>, ResolveError> {
        let mut inputs = Vec::with_capacity(1 + self.dependencies.len());
        inputs.push(self.input_value(values).to_owned());
        for dependency in &self.dependencies {
            match resolved.get(dependency) {
                Some(value) => inputs.push(String::from_utf8_lossy(value).into_owned()),
                None => return Ok(None),
            }
        }

        let value_type = ValueType::from_name(&self.type_name).ok_or_else(|| ResolveError::UnknownType {
            field: self.input.clone(),
            type_name: self.type_name.clone(),
        })?;

        let value = value_type.produce(&inputs).map_err(|source| ResolveError::BadFieldValue {
            field: self.input.clone(),
            value: inputs[0].clone(),
            type_name: self.type_name.clone(),
            source,
        })?;
        Ok(Some(value.into_bytes()))
    }
}

/// Resolve substitution fields into a filter map.
///
/// Fields are resolved in passes. Each pass resolves every field whose
/// dependencies are already available; fields left over are retried in the
/// next pass until none remain or a pass resolves nothing.
pub fn build_filter_map(
    substitutions: &[Substitution],
    values: &HashMap<String, String>,
) -> Result<FilterMap, ResolveError> {
    let mut output = FilterMap::new();
    let mut pending: Vec<&Substitution> = substitutions.iter().collect();
    let mut pass = 0;

    while !pending.is_empty() {
        pass += 1;
        let mut unmet = Vec::new();

        for sub in &pending {
            match sub.resolve(values, &output)? {
                Some(value) => {
                    output.insert(sub.index, value);
                }
                None => unmet.push(*sub),
            }
        }
        debug!(
            "resolve pass {}: {} resolved, {} waiting on dependencies",
            pass,
            pending.len() - unmet.len(),
            unmet.len()
        );

        if unmet.len() == pending.len() {
            let unresolved: Vec<u32> = unmet.iter().map(|sub| sub.index).collect();
            warn!("dependency deadlock on substitutions {:?}", unresolved);
            return Err(ResolveError::DependencyDeadlock { unresolved });
        }
        pending = unmet;
    }

    Ok(output)
}

/// Resolve a template's fields and return a filter over its stream.
pub fn generate<R: Read>(
    metadata: &Metadata,
    template: R,
    values: &HashMap<String, String>,
) -> Result<Filter<R>, ResolveError> {
    let map = build_filter_map(&metadata.substitutions, values)?;
    Ok(Filter::new(template, map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(index: u32, input: &str, default: &str, type_name: &str, dependencies: &[u32]) -> Substitution {
        Substitution {
            index,
            input: input.to_string(),
            comment: String::new(),
            default: default.to_string(),
            type_name: type_name.to_string(),
            dependencies: dependencies.to_vec(),
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_simple_build() {
        let subs = vec![
            sub(2, "first", "-", "literal", &[]),
            sub(13, "third", "!", "", &[]),
            sub(9, "second", "-", "literal", &[]),
        ];
        let map = build_filter_map(&subs, &values(&[("first", "Hello"), ("second", "World")])).unwrap();

        let expected = FilterMap::from([
            (2, b"Hello".to_vec()),
            (9, b"World".to_vec()),
            (13, b"!".to_vec()),
        ]);
        assert_eq!(map, expected);
    }

    #[test]
    fn test_unnamed_input_always_uses_default() {
        let subs = vec![sub(1, "", "fixed", "literal", &[])];
        let map = build_filter_map(&subs, &values(&[("", "ignored")])).unwrap();
        assert_eq!(map[&1], b"fixed");
    }

    #[test]
    fn test_dependencies_resolve_over_passes() {
        // listed before the field it depends on
        let subs = vec![
            sub(2, "", "", "double-coins", &[1]),
            sub(1, "reward", "50", "coins", &[]),
        ];
        let map = build_filter_map(&subs, &values(&[("reward", "12.5")])).unwrap();

        assert_eq!(map[&1], b"1250000000");
        assert_eq!(map[&2], b"12.50000000");
    }

    #[test]
    fn test_genesis_fields() {
        let subs = vec![
            sub(5, "", "", "genesis-block-hash", &[3, 4, 6, 1]),
            sub(1, "", "", "genesis-merkle-root", &[2, 7, 8]),
            sub(2, "reward", "50", "coins", &[]),
            sub(3, "timestamp", "", "uint32", &[]),
            sub(4, "", "1", "difficulty", &[]),
            sub(6, "nonce", "0", "uint32", &[]),
            sub(7, "message", "", "str", &[]),
            sub(8, "pubkey", "", "pubkey", &[]),
        ];
        let user = values(&[
            ("timestamp", "1231006505"),
            ("nonce", "2083236893"),
            ("message", "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks"),
            (
                "pubkey",
                "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb6\
                 49f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f",
            ),
        ]);
        let map = build_filter_map(&subs, &user).unwrap();

        assert_eq!(map[&1], b"4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b");
        assert_eq!(map[&5], b"000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f");
    }

    #[test]
    fn test_dependency_deadlock() {
        let subs = vec![
            sub(1, "", "a", "literal", &[2]),
            sub(2, "", "b", "literal", &[1]),
            sub(3, "", "c", "literal", &[]),
        ];
        let err = build_filter_map(&subs, &HashMap::new()).unwrap_err();
        match err {
            ResolveError::DependencyDeadlock { unresolved } => assert_eq!(unresolved, vec![1, 2]),
            other => panic!("unexpected error: {other}"),
        }

        let missing = vec![sub(1, "", "a", "literal", &[99])];
        assert!(matches!(
            build_filter_map(&missing, &HashMap::new()),
            Err(ResolveError::DependencyDeadlock { .. })
        ));
    }

    #[test]
    fn test_unknown_type() {
        let subs = vec![sub(1, "name", "x", "uint128", &[])];
        let err = build_filter_map(&subs, &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownType { ref field, ref type_name } if field == "name" && type_name == "uint128"
        ));
    }

    #[test]
    fn test_bad_field_value_reports_field() {
        let subs = vec![sub(1, "port", "8333", "uint16", &[])];
        let err = build_filter_map(&subs, &values(&[("port", "70000")])).unwrap_err();

        assert_eq!(err.to_string(), "bad value '70000' for field 'port' of type 'uint16'");
        assert!(matches!(err, ResolveError::BadFieldValue { source: ProduceError::Overflow(_), .. }));
    }

    #[test]
    fn test_metadata_wire_names() {
        let json = r#"{
            "Id": "simple",
            "label": "Simple Base Example",
            "version": "1.0",
            "input groups": ["basics"],
            "user inputs": [
                {"Group": "basics", "Id": "name", "Label": "the name", "Default": "roflcopter.com"}
            ],
            "substitutions": [
                {"substitution index": 1, "Input": "name", "Comment": "a comment",
                 "Default": "default.com", "Type": "literal", "dependencies": [2]}
            ]
        }"#;
        let meta = Metadata::from_json(json).unwrap();

        assert_eq!(meta.id, "simple");
        assert_eq!(meta.input_groups, vec!["basics"]);
        assert_eq!(meta.inputs[0].default, "roflcopter.com");
        assert_eq!(
            meta.substitutions[0],
            Substitution {
                index: 1,
                input: "name".to_string(),
                comment: "a comment".to_string(),
                default: "default.com".to_string(),
                type_name: "literal".to_string(),
                dependencies: vec![2],
            }
        );

        assert!(matches!(Metadata::from_json("{"), Err(ResolveError::Metadata(_))));
    }

    #[test]
    fn test_generate() {
        let meta = Metadata {
            substitutions: vec![sub(1, "name", "coin", "str-alpha-lower", &[])],
            ..Metadata::default()
        };
        let mut filter = generate(&meta, "name=__._1-;".as_bytes(), &values(&[("name", "NewCoin")])).unwrap();

        let mut out = String::new();
        filter.read_to_string(&mut out).unwrap();
        assert_eq!(out, "name=newcoin;");
    }
}
