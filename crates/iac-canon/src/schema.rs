//! resource type schemas
//!
//! A [Schema] describes one attribute (or a whole resource type at the root): the default value
//! substituted when the attribute is absent, the schemas of nested attributes and, for list/set/map
//! typed attributes, the schema of their elements. Block types are described like attributes whose
//! `attributes` are the members of the block body.
//!
//! Schemas are read-only while rendering and shared between all renders of a run. A missing schema
//! is never an error: rendering proceeds without filling defaults.
use crate::value::{Object, Value};
use indexmap::IndexMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schema {
    /// value used when the attribute is absent from a body
    pub default: Option<Value>,
    /// nested attributes (resource root, block bodies and object typed attributes)
    pub attributes: IndexMap<String, Schema>,
    /// element schema for list, set and map typed attributes
    pub elem: Option<Box<Schema>>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Schema> {
        self.attributes.get(name)
    }

    pub fn element(&self) -> Option<&Schema> {
        self.elem.as_deref()
    }

    /// Adds defaults for every declared attribute missing from `into`
    ///
    /// Keys already present are never touched.
    pub fn fill_defaults(&self, into: &mut Object) {
        for (name, attribute) in &self.attributes {
            if into.contains_key(name) {
                continue;
            }
            if let Some(default) = &attribute.default {
                tracing::trace!(attribute = %name, "filling default");
                into.insert(name.clone(), default.clone());
            }
        }
    }
}

/// Lookup of a nested attribute schema through an optional parent
pub fn attribute<'s>(schema: Option<&'s Schema>, name: &str) -> Option<&'s Schema> {
    schema.and_then(|schema| schema.attribute(name))
}

/// Source of per resource type schemas
///
/// The renderer asks for element schemas and default filling through the provider, so an
/// implementation can answer them differently than the plain [Schema] lookups.
pub trait SchemaProvider: Send + Sync + std::fmt::Debug {
    fn resource_schema(&self, resource_type: &str) -> Option<&Schema>;

    fn attribute_schema(&self, resource_type: &str, name: &str) -> Option<&Schema> {
        attribute(self.resource_schema(resource_type), name)
    }

    /// Schema of the elements of a list, set or map typed attribute
    fn element_schema<'s>(&self, schema: &'s Schema) -> Option<&'s Schema> {
        schema.element()
    }

    fn fill_defaults(&self, schema: &Schema, into: &mut Object) {
        schema.fill_defaults(into);
    }
}

/// Schemas keyed by resource type, loaded from a JSON or YAML bundle
///
/// ```yaml
/// aws_s3_bucket:
///   attributes:
///     acl:
///       default: private
///     versioning:
///       attributes:
///         enabled:
///           default: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(transparent)]
pub struct ResourceSchemas {
    types: IndexMap<String, Schema>,
}

impl ResourceSchemas {
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        tracing::info!(path=%path.display(), "loading resource schemas");
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parses a bundle, JSON documents are valid YAML
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn insert(&mut self, resource_type: impl Into<String>, schema: Schema) {
        self.types.insert(resource_type.into(), schema);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl SchemaProvider for ResourceSchemas {
    fn resource_schema(&self, resource_type: &str) -> Option<&Schema> {
        self.types.get(resource_type)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse schema bundle")]
    ParseFailed(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const BUNDLE: &str = r#"
aws_s3_bucket:
  attributes:
    acl:
      default: private
    force_destroy:
      default: false
    tags: {}
    versioning:
      attributes:
        enabled:
          default: false
"#;

    #[test]
    fn parse_bundle() {
        let schemas = ResourceSchemas::from_str(BUNDLE).unwrap();
        assert_eq!(schemas.len(), 1);

        let acl = schemas.attribute_schema("aws_s3_bucket", "acl").unwrap();
        assert_eq!(acl.default, Some(Value::from("private")));

        let versioning = schemas.attribute_schema("aws_s3_bucket", "versioning");
        let enabled = attribute(versioning, "enabled").unwrap();
        assert_eq!(enabled.default, Some(Value::Boolean(false)));

        assert!(schemas.resource_schema("aws_instance").is_none());
        assert!(schemas.element_schema(versioning.unwrap()).is_none());
    }

    #[test]
    fn provider_lookups() {
        let schemas = ResourceSchemas::from_str(
            r#"
aws_security_group:
  attributes:
    ingress:
      elem:
        attributes:
          protocol:
            default: tcp
"#,
        )
        .unwrap();

        assert!(schemas.attribute_schema("aws_security_group", "egress").is_none());
        assert!(schemas.attribute_schema("aws_instance", "ingress").is_none());

        let ingress = schemas
            .attribute_schema("aws_security_group", "ingress")
            .unwrap();
        let rule = schemas.element_schema(ingress).unwrap();

        let mut properties = Object::new();
        schemas.fill_defaults(rule, &mut properties);
        assert_eq!(properties.get("protocol"), Some(&Value::from("tcp")));
    }

    #[test]
    fn json_bundle() {
        let schemas =
            ResourceSchemas::from_str(r#"{"t": {"attributes": {"a": {"default": 3}}}}"#).unwrap();
        assert_eq!(
            schemas.attribute_schema("t", "a").unwrap().default,
            Some(Value::Integer(3))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ResourceSchemas::from_str("t: {defaults: 1}").is_err());
    }

    #[test]
    fn fill_defaults_keeps_present_keys() {
        let schemas = ResourceSchemas::from_str(BUNDLE).unwrap();
        let schema = schemas.resource_schema("aws_s3_bucket").unwrap();

        let mut properties = Object::new();
        properties.insert("acl".into(), "public-read".into());
        schema.fill_defaults(&mut properties);

        assert_eq!(properties.get("acl"), Some(&Value::from("public-read")));
        assert_eq!(properties.get("force_destroy"), Some(&Value::Boolean(false)));
        // no default declared
        assert!(!properties.contains_key("tags"));
        assert!(!properties.contains_key("versioning"));
    }
}
