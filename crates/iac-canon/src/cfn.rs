//! CloudFormation templates (YAML or JSON)
//!
//! A template is recognized by a non-empty top-level `AWSTemplateFormatVersion`. Short-form
//! intrinsic tags are rewritten to their long form while decoding:
//!
//! ```yaml
//! Tags: !Ref Environment
//! ```
//!
//! decodes as `{"Tags": {"Ref": "Environment"}}`. Mapping keys must be strings.
use crate::detect::{DetectOptions, Detection, Detector, Format, MalformedInput, Position};
use crate::input::InputFile;
use crate::loader::{ConfigurationUnit, Location, LocationIndex};
use crate::value::{insert_unique, Object, Value};
use indexmap::IndexMap;
use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use std::path::PathBuf;

/// Top-level field every template carries
pub const MARKER: &str = "AWSTemplateFormatVersion";

const EXTENSIONS: &[&str] = &["yaml", "yml", "json", "template"];

#[derive(Debug, Default)]
pub struct CfnDetector;

impl Detector for CfnDetector {
    fn format(&self) -> Format {
        Format::Cfn
    }

    fn detect_file(&self, file: &InputFile, options: &DetectOptions) -> Detection {
        if !options.ignore_ext && !file.has_extension(EXTENSIONS) {
            return Detection::Decline;
        }

        let contents = match file.contents() {
            Ok(contents) => contents,
            Err(err) => return Detection::unreadable(file.path(), err),
        };
        let Ok(text) = std::str::from_utf8(contents) else {
            return Detection::Decline;
        };

        let template = match decode(text) {
            Ok(template) => template,
            Err(err) if has_marker_line(text) => {
                let position = err
                    .location()
                    .map(|location| Position::new(location.line(), location.column()));
                return MalformedInput::new(
                    file.path(),
                    position,
                    format!("unable to parse template: {err}"),
                )
                .into();
            }
            Err(err) => {
                tracing::trace!(path=%file.path().display(), %err, "not yaml");
                return Detection::Decline;
            }
        };

        let version = template.get(MARKER).and_then(Value::as_str);
        if !matches!(version, Some(version) if !version.is_empty()) {
            tracing::trace!(path=%file.path().display(), "no {MARKER}");
            return Detection::Decline;
        }

        ConfigurationUnit::new(
            Format::Cfn,
            file.path(),
            vec![file.path().to_path_buf()],
            template,
            LocationIndex::Cfn(CfnLocations::new(file.path(), text)),
        )
        .into()
    }
}

/// Decodes a template document, rewriting short-form intrinsics
pub fn decode(text: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str::<TemplateNode>(text).map(|node| node.0)
}

/// Cheap textual check used to tell broken templates from other YAML
fn has_marker_line(text: &str) -> bool {
    text.lines().any(|line| {
        line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '{' | '"' | '\''))
            .starts_with(MARKER)
    })
}

/// Long form of a short-form intrinsic tag (`!Ref`, `!GetAtt`, ...)
fn long_form(tag: &str) -> Option<&'static str> {
    let long = match tag.trim_start_matches('!') {
        "And" => "Fn::And",
        "Base64" => "Fn::Base64",
        "Cidr" => "Fn::Cidr",
        "Equals" => "Fn::Equals",
        "FindInMap" => "Fn::FindInMap",
        "GetAtt" => "Fn::GetAtt",
        "GetAZs" => "Fn::GetAZs",
        "If" => "Fn::If",
        "ImportValue" => "Fn::ImportValue",
        "Join" => "Fn::Join",
        "Not" => "Fn::Not",
        "Or" => "Fn::Or",
        "Ref" => "Ref",
        "Split" => "Fn::Split",
        "Sub" => "Fn::Sub",
        "Transform" => "Fn::Transform",
        _ => return None,
    };
    Some(long)
}

struct TemplateNode(Value);

impl<'de> Deserialize<'de> for TemplateNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TemplateVisitor).map(TemplateNode)
    }
}

struct TemplateVisitor;

impl<'de> Visitor<'de> for TemplateVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a template node")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or(Value::Decimal(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Decimal(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        TemplateNode::deserialize(deserializer).map(|node| node.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut array = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(TemplateNode(element)) = seq.next_element()? {
            array.push(element);
        }
        Ok(Value::Array(array))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Object::new();
        while let Some(MapKey(key)) = map.next_key()? {
            let TemplateNode(value) = map.next_value()?;
            insert_unique::<A::Error>(&mut object, key, value)?;
        }
        Ok(Value::Object(object))
    }

    /// Tagged nodes
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (tag, variant): (String, _) = data.variant()?;
        let TemplateNode(payload) = variant.newtype_variant()?;

        match long_form(&tag) {
            Some(name) => {
                let mut object = Object::new();
                object.insert(name.to_string(), payload);
                Ok(Value::Object(object))
            }
            None => {
                tracing::debug!(%tag, "unknown tag, decoding plain value");
                Ok(payload)
            }
        }
    }
}

/// Mapping key, only string scalars are accepted
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor).map(MapKey)
    }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string mapping key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }
}

/// Source lines of a template's top-level keys and resources
///
/// Built from a line scan of block-style YAML; flow style and JSON templates resolve to the file.
#[derive(Debug)]
pub struct CfnLocations {
    path: PathBuf,
    sections: IndexMap<String, Position>,
    resources: IndexMap<String, Position>,
}

impl CfnLocations {
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut sections = IndexMap::new();
        let mut resources = IndexMap::new();
        let mut in_resources = false;
        let mut resource_indent = None;

        for (index, line) in text.lines().enumerate() {
            let content = line.trim_start();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            let indent = line.len() - content.len();
            let Some(key) = mapping_key(content) else {
                continue;
            };
            let position = Position::new(index + 1, indent + 1);

            if indent == 0 {
                in_resources = key == "Resources";
                resource_indent = None;
                sections.entry(key.to_string()).or_insert(position);
            } else if in_resources && *resource_indent.get_or_insert(indent) == indent {
                resources.entry(key.to_string()).or_insert(position);
            }
        }

        Self {
            path: path.into(),
            sections,
            resources,
        }
    }

    /// `[logical id, ...]` resolves to the resource, `[section, ...]` to a top-level key, anything
    /// else to the file
    pub fn resolve(&self, attribute_path: &[&str]) -> Option<Location> {
        let position = attribute_path.first().and_then(|first| {
            self.resources
                .get(*first)
                .or_else(|| self.sections.get(*first))
        });

        Some(Location {
            path: self.path.clone(),
            line: position.map(|p| p.line),
            column: position.map(|p| p.column),
        })
    }
}

/// `Key: ...` or `"Key": ...` at the start of a line
fn mapping_key(content: &str) -> Option<&str> {
    if content.starts_with('-') {
        return None;
    }
    let (key, _) = content.split_once(':')?;
    let key = key.trim().trim_matches(|c: char| c == '"' || c == '\'');
    (!key.is_empty() && !key.contains(char::is_whitespace)).then_some(key)
}
