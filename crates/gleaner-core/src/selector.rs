//! Element descriptors: a tag plus the class tokens and attribute values an
//! element must carry.
//!
//! Descriptors live in the site profile rather than in extraction code. Both
//! the HTML extractor and the browser navigator consume them through
//! [`ElementSelector::to_css`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Describes the elements to look for.
///
/// In JSON, `class` may be written either as a list of tokens or as the
/// space-separated string found in the page's `class` attribute:
///
/// ```json
/// { "tag": "button", "attributes": { "aria-label": "View next page" } }
/// { "tag": "div", "class": "tvm__text tvm__text--low-emphasis" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_classes",
        deserialize_with = "deserialize_classes"
    )]
    pub class: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ElementSelector {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    /// Adds class tokens; a string with spaces adds one token per word.
    pub fn with_class(mut self, classes: &str) -> Self {
        self.class
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// True when the descriptor would match every element.
    pub fn is_empty(&self) -> bool {
        self.tag.as_deref().is_none_or(|t| t.trim().is_empty())
            && self.class.is_empty()
            && self.attributes.is_empty()
    }

    /// Render as a CSS selector. Class tokens and attribute names are escaped
    /// as identifiers, attribute values as quoted strings.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.trim().is_empty()) {
            css.push_str(tag.trim());
        }
        for class in &self.class {
            css.push('.');
            css.push_str(&escape_ident(class));
        }
        for (name, value) in &self.attributes {
            css.push('[');
            css.push_str(&escape_ident(name));
            css.push_str("=\"");
            css.push_str(&escape_string(value));
            css.push_str("\"]");
        }
        if css.is_empty() {
            css.push('*');
        }
        css
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassSpec {
    Joined(String),
    Tokens(Vec<String>),
}

fn deserialize_classes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tokens = match ClassSpec::deserialize(deserializer)? {
        ClassSpec::Joined(s) => s.split_whitespace().map(str::to_string).collect(),
        ClassSpec::Tokens(list) => list
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(str::to_string)
            .collect(),
    };
    Ok(tokens)
}

fn serialize_classes<S>(classes: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&classes.join(" "))
}
