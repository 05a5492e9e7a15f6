//! Registry input documents.
//!
//! Three document shapes are supported, each implementing [`RegistrySource`]:
//!
//! ## JSON map
//! ```json
//! { "pronom": ["pdf", "tif"], "linguist": [".rs", ".py"] }
//! ```
//! A registry name appearing twice in the object is rejected, as in JSON Lines.
//!
//! ## JSON Lines
//! One registry per non-blank line; keys other than `id` and `extensions` are ignored.
//! ```json
//! {"id": "pronom", "extensions": ["pdf", "tif"]}
//! {"id": "linguist", "extensions": [".rs", ".py"], "name": "GitHub Linguist"}
//! ```
//!
//! ## YAML extension index
//! Keyed by extension, listing the registries that record it. It is re-indexed by registry.
//! ```yaml
//! extensions:
//!   "*.pdf":
//!     identifiers:
//!       - regId: pronom
//!       - regId: fdd
//! ```
//!
//! All three normalize entries through [`crate::extension::normalize_extension`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use enum_dispatch::enum_dispatch;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::registry::{ExtensionSet, RegistryCollection};

/// Input document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[enum_dispatch]
pub enum SourceFormat {
    JsonMap(JsonMap),
    JsonLines(JsonLines),
    YamlIndex(YamlIndex),
}

/// Parser trait implemented by every input format.
#[enum_dispatch(SourceFormat)]
pub trait RegistrySource {
    /// Parses a whole document into a [`RegistryCollection`]
    fn parse(&self, input: &str) -> Result<RegistryCollection>;
    fn name(&self) -> &'static str;
}

impl SourceFormat {
    /// Picks a format from the file name: `.yml`/`.yaml` is a YAML index, `.jsonl`
    /// is JSON Lines and anything else is read as a JSON map.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                YamlIndex.into()
            }
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") => JsonLines.into(),
            _ => JsonMap.into(),
        }
    }

    /// Reads a whole document from `reader` and parses it
    pub fn load_reader<R: Read>(&self, mut reader: R) -> Result<RegistryCollection> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        self.parse(&input)
    }

    /// Reads and parses the document at `path`
    pub fn load_path(&self, path: &Path) -> Result<RegistryCollection> {
        let input = fs::read_to_string(path)?;
        let registries = self.parse(&input)?;
        info!(
            path = %path.display(),
            format = self.name(),
            registries = registries.len(),
            "loaded registry extension sets"
        );
        Ok(registries)
    }
}

/// Loads the document at `path`, detecting its format from the file name
pub fn load_path(path: &Path) -> Result<RegistryCollection> {
    SourceFormat::detect(path).load_path(path)
}

/// `{ "<registry>": ["ext", ...] }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonMap;

impl RegistrySource for JsonMap {
    fn parse(&self, input: &str) -> Result<RegistryCollection> {
        let RegistryEntries(entries) = serde_json::from_str(input)
            .map_err(|e| Error::DataFormat(format!("invalid JSON: {e}")))?;

        let mut registries = RegistryCollection::new();
        for (name, entries) in entries {
            let set = extension_array(&name, &entries).map_err(Error::DataFormat)?;
            if registries.insert(name.clone(), set).is_some() {
                return Err(Error::DataFormat(format!(
                    "registry '{name}' listed more than once"
                )));
            }
        }
        Ok(registries)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Top-level object entries in document order. `serde_json::Map` would fold repeated
/// keys into one.
struct RegistryEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RegistryEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RegistryEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object mapping registry names to extension arrays")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> core::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(RegistryEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// One `{"id": "<registry>", "extensions": [...]}` object per line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonLines;

#[derive(Deserialize)]
struct RegistryLine {
    id: String,
    extensions: Value,
}

impl RegistrySource for JsonLines {
    fn parse(&self, input: &str) -> Result<RegistryCollection> {
        let mut registries = RegistryCollection::new();
        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: RegistryLine = serde_json::from_str(line)
                .map_err(|e| Error::DataFormat(format!("line {line_no}: {e}")))?;
            let set = extension_array(&record.id, &record.extensions)
                .map_err(|e| Error::DataFormat(format!("line {line_no}: {e}")))?;
            if registries.insert(record.id.clone(), set).is_some() {
                return Err(Error::DataFormat(format!(
                    "line {line_no}: registry '{}' listed more than once",
                    record.id
                )));
            }
        }
        Ok(registries)
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// YAML document keyed by extension, each listing the registries that identify it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlIndex;

#[derive(Deserialize)]
struct ExtensionIndex {
    extensions: BTreeMap<String, IndexEntry>,
}

#[derive(Deserialize)]
struct IndexEntry {
    #[serde(default)]
    identifiers: Vec<Identifier>,
}

#[derive(Deserialize)]
struct Identifier {
    #[serde(rename = "regId")]
    reg_id: String,
}

impl ExtensionIndex {
    /// Re-indexes by registry. Also returns how many malformed extensions each
    /// registry lost, for registries that lost any.
    fn by_registry(&self) -> (RegistryCollection, BTreeMap<&str, usize>) {
        let mut registries = RegistryCollection::new();
        let mut dropped = BTreeMap::new();
        for (ext, entry) in &self.extensions {
            for identifier in &entry.identifiers {
                let registry = identifier.reg_id.as_str();
                if !registries.entry(registry).insert_raw(ext) {
                    *dropped.entry(registry).or_insert(0) += 1;
                }
            }
        }
        (registries, dropped)
    }
}

impl RegistrySource for YamlIndex {
    fn parse(&self, input: &str) -> Result<RegistryCollection> {
        let index: ExtensionIndex = serde_yaml::from_str(input)
            .map_err(|e| Error::DataFormat(format!("invalid extension index: {e}")))?;

        let (registries, dropped) = index.by_registry();
        for (registry, dropped) in dropped {
            debug!(
                registry,
                dropped,
                kept = registries.get(registry).map_or(0, ExtensionSet::len),
                "discarded malformed extensions"
            );
        }
        Ok(registries)
    }

    fn name(&self) -> &'static str {
        "yaml"
    }
}

/// Converts a JSON array of strings into a normalized [`ExtensionSet`]
fn extension_array(registry: &str, entries: &Value) -> core::result::Result<ExtensionSet, String> {
    let Value::Array(items) = entries else {
        return Err(format!(
            "registry '{registry}' is not a sequence of extension strings"
        ));
    };

    let raw = items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| format!("registry '{registry}' contains a non-string entry: {item}"))
        })
        .collect::<core::result::Result<Vec<&str>, String>>()?;

    let (set, dropped) = ExtensionSet::from_raw(raw);
    if dropped > 0 {
        debug!(registry, dropped, kept = set.len(), "discarded malformed extensions");
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn names(registries: &RegistryCollection) -> Vec<&str> {
        registries.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn exts<'a>(registries: &'a RegistryCollection, name: &str) -> Vec<&'a str> {
        registries
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test_case("registries.yml" => SourceFormat::YamlIndex(YamlIndex))]
    #[test_case("registries.YAML" => SourceFormat::YamlIndex(YamlIndex))]
    #[test_case("registries.jsonl" => SourceFormat::JsonLines(JsonLines))]
    #[test_case("registries.json" => SourceFormat::JsonMap(JsonMap))]
    #[test_case("registries" => SourceFormat::JsonMap(JsonMap))]
    fn test_detect(path: &str) -> SourceFormat {
        SourceFormat::detect(Path::new(path))
    }

    #[test]
    fn test_json_map() {
        let input = r#"{"pronom": ["PDF", "*.tif", "pdf"], "fdd": [".pdf", "", "jp2"]}"#;
        let registries = SourceFormat::from(JsonMap).parse(input).unwrap();
        assert_eq!(names(&registries), vec!["fdd", "pronom"]);
        assert_eq!(exts(&registries, "pronom"), vec!["pdf", "tif"]);
        assert_eq!(exts(&registries, "fdd"), vec!["jp2", "pdf"]);
    }

    #[test_case(r#"["pdf"]"#; "not an object")]
    #[test_case(r#"{"pronom": "pdf"}"#; "entry not an array")]
    #[test_case(r#"{"pronom": ["pdf", 7]}"#; "non-string extension")]
    #[test_case(r#"{"pronom": ["pdf""#; "truncated")]
    #[test_case(r#"{"pronom": ["pdf"], "fdd": ["tif"], "pronom": ["jp2"]}"#; "repeated registry")]
    fn test_json_map_rejects(input: &str) {
        let result = JsonMap.parse(input);
        assert!(matches!(result, Err(Error::DataFormat(_))), "{result:?}");
    }

    #[test]
    fn test_json_lines() {
        let input = concat!(
            r#"{"id": "pronom", "extensions": ["pdf", "tif"], "name": "PRONOM"}"#,
            "\n\n",
            r#"{"id": "linguist", "extensions": [".rs"]}"#,
            "\n",
        );
        let registries = JsonLines.parse(input).unwrap();
        assert_eq!(names(&registries), vec!["linguist", "pronom"]);
        assert_eq!(exts(&registries, "linguist"), vec!["rs"]);
    }

    #[test_case("{\"id\": \"a\", \"extensions\": [\"x\"]}\n{\"id\": \"a\", \"extensions\": [\"y\"]}" => "Malformed registry data: line 2: registry 'a' listed more than once".to_string(); "duplicate id")]
    #[test_case("{\"id\": \"a\", \"extensions\": \"x\"}" => "Malformed registry data: line 1: registry 'a' is not a sequence of extension strings".to_string(); "extensions not array")]
    fn test_json_lines_rejects(input: &str) -> String {
        JsonLines.parse(input).unwrap_err().to_string()
    }

    #[test]
    fn test_json_lines_missing_field() {
        let result = JsonLines.parse(r#"{"extensions": ["pdf"]}"#);
        assert!(matches!(result, Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_yaml_index_reindexes_by_registry() {
        let input = r#"
extensions:
  "*.PDF":
    identifiers:
      - regId: pronom
        id: fmt/18
      - regId: fdd
  "*.tif":
    identifiers:
      - regId: pronom
  "*.orphan": {}
"#;
        let registries = YamlIndex.parse(input).unwrap();
        assert_eq!(names(&registries), vec!["fdd", "pronom"]);
        assert_eq!(exts(&registries, "pronom"), vec!["pdf", "tif"]);
        assert_eq!(exts(&registries, "fdd"), vec!["pdf"]);
    }

    #[test]
    fn test_json_map_repeated_registry_message() {
        let err = JsonMap.parse(r#"{"a": ["x"], "a": ["y"]}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed registry data: registry 'a' listed more than once"
        );
    }

    #[test]
    fn test_yaml_index_counts_dropped_per_registry() {
        let input = r#"
extensions:
  "*.pdf":
    identifiers:
      - regId: pronom
      - regId: fdd
  "a b":
    identifiers:
      - regId: pronom
      - regId: fdd
  "*.":
    identifiers:
      - regId: pronom
  "*.tif":
    identifiers:
      - regId: linguist
"#;
        let index: ExtensionIndex = serde_yaml::from_str(input).unwrap();
        let (registries, dropped) = index.by_registry();
        assert_eq!(exts(&registries, "pronom"), vec!["pdf"]);
        assert_eq!(dropped.get("pronom"), Some(&2));
        assert_eq!(dropped.get("fdd"), Some(&1));
        assert_eq!(dropped.get("linguist"), None);
    }

    #[test]
    fn test_yaml_index_rejects_wrong_shape() {
        let result = YamlIndex.parse("- pdf\n- tif\n");
        assert!(matches!(result, Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_load_reader() {
        let registries = SourceFormat::from(JsonMap)
            .load_reader(r#"{"a": ["x"]}"#.as_bytes())
            .unwrap();
        assert_eq!(registries.len(), 1);
    }
}
