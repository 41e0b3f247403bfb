//! Ultralytics export metadata.
//!
//! Values are Python literals such as `{0: 'person', 1: 'bicycle'}`, which
//! read as YAML flow collections.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;

use crate::domain::model::ClassNames;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNames {
    Map(HashMap<Value, String>),
    List(Vec<String>),
}

/// Parses the `names` entry. Keys may be integers or numeric strings.
pub fn parse_class_names(raw: &str) -> Option<ClassNames> {
    let names = match serde_yaml::from_str::<RawNames>(raw).ok()? {
        RawNames::Map(map) => map
            .into_iter()
            .map(|(key, name)| Some((class_index(&key)?, name)))
            .collect::<Option<HashMap<_, _>>>()?,
        RawNames::List(list) => list.into_iter().enumerate().collect(),
    };
    Some(ClassNames::new(names))
}

fn class_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether the export already applies NMS (`end2end`, or `nms` in `args`).
/// `None` when neither entry says.
pub fn parse_end_to_end(end2end: Option<&str>, args: Option<&str>) -> Option<bool> {
    let from_flag = end2end.and_then(|raw| serde_yaml::from_str::<bool>(raw.trim()).ok());
    let from_args = args
        .and_then(|raw| serde_yaml::from_str::<HashMap<String, Value>>(raw).ok())
        .and_then(|args| args.get("nms").and_then(Value::as_bool));

    match (from_flag, from_args) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (None, None) => None,
        _ => Some(false),
    }
}
