use rustc_hash::FxHashSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The set of hot function names selected for speculation.
///
/// Accepts a JSON object (keys are names, values ignored), an array of
/// `[name, value]` pairs, or an array of plain name strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    names: FxHashSet<String>,
}

impl Trace {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Trace {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(map.into_iter().map(|(name, _)| name).collect()),
            Value::Array(entries) => entries
                .into_iter()
                .map(|entry| match entry {
                    Value::String(name) => Ok(name),
                    Value::Array(mut pair) if pair.len() == 2 => match pair.swap_remove(0) {
                        Value::String(name) => Ok(name),
                        other => Err(D::Error::custom(format!(
                            "trace entry name must be a string, found {other}"
                        ))),
                    },
                    other => Err(D::Error::custom(format!(
                        "trace entry must be a name or a [name, value] pair, found {other}"
                    ))),
                })
                .collect(),
            other => Err(D::Error::custom(format!(
                "trace must be an object or an array, found {other}"
            ))),
        }
    }
}
