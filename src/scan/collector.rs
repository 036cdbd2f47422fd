//! Source collectors
//!
//! A collector hands the scan pass the current groups and unit sources.
//! `FlowFileCollector` reads a flow export: a JSON array of node objects
//! (or an object with a `flows` array) where `type: "tab"` objects are
//! groups and `type: "function"` objects carry their source in `func` and
//! their group id in `z`.

use super::ScanError;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSource {
    pub group_id: String,
    pub id: String,
    pub name: String,
    pub source: String,
}

/// Pull-based provider of groups and unit sources
pub trait SourceCollector {
    fn groups(&self) -> Result<Vec<GroupInfo>, ScanError>;

    fn units(&self) -> Result<Vec<UnitSource>, ScanError>;

    /// Whether the host can be enumerated yet
    fn is_ready(&self) -> bool {
        true
    }
}

/// Collector over a flow export file on disk
#[derive(Debug, Clone)]
pub struct FlowFileCollector {
    path: PathBuf,
}

impl FlowFileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn nodes(&self) -> Result<Vec<Value>, ScanError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ScanError::Read {
            path: self.path.clone(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&content).map_err(|source| ScanError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let format_err = |reason: &str| ScanError::Format {
            path: self.path.clone(),
            reason: reason.to_string(),
        };

        match doc {
            Value::Array(nodes) => Ok(nodes),
            Value::Object(mut obj) => match obj.remove("flows") {
                Some(Value::Array(nodes)) => Ok(nodes),
                _ => Err(format_err("expected an array of nodes or a `flows` array")),
            },
            _ => Err(format_err("expected an array of nodes")),
        }
    }

    /// Find one function unit by id
    pub fn find_unit(&self, unit_id: &str) -> Result<Option<UnitSource>, ScanError> {
        Ok(self.units()?.into_iter().find(|u| u.id == unit_id))
    }
}

impl SourceCollector for FlowFileCollector {
    fn groups(&self) -> Result<Vec<GroupInfo>, ScanError> {
        Ok(self.nodes()?.iter().filter_map(group_of).collect())
    }

    fn units(&self) -> Result<Vec<UnitSource>, ScanError> {
        Ok(self.nodes()?.iter().filter_map(unit_of).collect())
    }

    fn is_ready(&self) -> bool {
        self.path.is_file()
    }
}

fn str_field<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    node.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn group_of(node: &Value) -> Option<GroupInfo> {
    if str_field(node, "type")? != "tab" {
        return None;
    }
    let id = str_field(node, "id")?;
    let name = str_field(node, "label")
        .or_else(|| str_field(node, "name"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Flow {}", short_id(id)));
    Some(GroupInfo {
        id: id.to_string(),
        name,
    })
}

fn unit_of(node: &Value) -> Option<UnitSource> {
    if str_field(node, "type")? != "function" {
        return None;
    }
    let id = str_field(node, "id")?;
    let source = str_field(node, "func")?;
    let group_id = str_field(node, "z")?;
    let name = str_field(node, "name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("Function Node {}", short_id(id)));
    Some(UnitSource {
        group_id: group_id.to_string(),
        id: id.to_string(),
        name,
        source: source.to_string(),
    })
}
