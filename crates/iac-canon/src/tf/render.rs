//! Lowering of a [TfModule] into the canonical resource view
//!
//! ```json
//! {
//!   "hcl_resource_view_version": "0.0.1",
//!   "resources": {
//!     "aws_instance.web": { "_type": "aws_instance", "_provider": "aws", "id": "aws_instance.web", ... }
//!   }
//! }
//! ```
//!
//! Bodies render attribute by attribute. Blocks always render as arrays of objects, one entry per
//! occurrence. Attributes declared with a default in the resource schema but absent from the body
//! are filled in afterwards.
//!
//! References to other resources render as the referenced resource id (`aws_ami.latest`), never as
//! the referenced resource's rendered body. Variables that are not resources render as their
//! dotted path (`var.region`).
use super::module::{TfModule, TfResource};
use crate::schema::{self, Schema, SchemaProvider};
use crate::value::{Object, Value};
use crate::visit::VisitTraversals;
use hcl::eval::Evaluate;
use hcl::template::Element;
use hcl::{Expression, ObjectKey, Template, TemplateExpr, Traversal, TraversalOperator};
use hcl_edit::structure::Body;
use indexmap::IndexMap;

pub const RESOURCE_VIEW_VERSION: &str = "0.0.1";

/// Attributes that configure terraform itself rather than the resource
const META_ATTRIBUTES: &[&str] = &["count", "for_each", "provider", "depends_on"];
const META_BLOCKS: &[&str] = &["lifecycle", "connection", "provisioner"];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderIssue {
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("unable to render {resource}: {issue}")]
pub struct RenderError {
    pub resource: String,
    pub issue: RenderIssue,
}

#[derive(derive_new::new)]
pub struct Renderer<'m> {
    module: &'m TfModule,
    schemas: &'m dyn SchemaProvider,
    max_depth: usize,
}

impl<'m> Renderer<'m> {
    pub fn render_view(&self) -> Result<Value, RenderError> {
        let mut resources = Object::new();
        for resource in self.module.resources() {
            resources.insert(resource.id.clone(), self.render_resource(resource)?);
        }

        let mut view = Object::new();
        view.insert(
            "hcl_resource_view_version".to_string(),
            RESOURCE_VIEW_VERSION.into(),
        );
        view.insert("resources".to_string(), Value::Object(resources));
        Ok(Value::Object(view))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(id = %resource.id))]
    pub fn render_resource(&self, resource: &TfResource) -> Result<Value, RenderError> {
        let schema = self.schemas.resource_schema(&resource.resource_type);
        if schema.is_none() {
            tracing::trace!(resource_type = %resource.resource_type, "no schema");
        }

        let mut properties = Object::new();
        properties.insert("_type".to_string(), resource.resource_type.as_str().into());
        properties.insert("_provider".to_string(), resource.provider.as_str().into());
        properties.insert("id".to_string(), resource.id.as_str().into());

        let body = self
            .render_body(resource.body(), schema, 1, META_ATTRIBUTES, META_BLOCKS)
            .map_err(|issue| RenderError {
                resource: resource.id.clone(),
                issue,
            })?;
        properties.extend(body);

        Ok(Value::Object(properties))
    }

    fn render_body(
        &self,
        body: &Body,
        schema: Option<&Schema>,
        depth: usize,
        skip_attributes: &[&str],
        skip_blocks: &[&str],
    ) -> Result<Object, RenderIssue> {
        self.check_depth(depth)?;
        let mut properties = Object::new();

        for attribute in body.attributes() {
            let key = attribute.key.value().as_str();
            if skip_attributes.contains(&key) {
                continue;
            }

            let expr: Expression = attribute.value.clone().into();
            let value = self.render_expr(&expr, schema::attribute(schema, key), depth + 1)?;
            insert_unique(&mut properties, key.to_string(), value)?;
        }

        let mut blocks: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for block in body.blocks() {
            let block_type = block.ident.value().as_str();
            if skip_blocks.contains(&block_type) {
                continue;
            }

            let rendered = self.render_body(
                &block.body,
                schema::attribute(schema, block_type),
                depth + 1,
                &[],
                &[],
            )?;
            blocks
                .entry(block_type)
                .or_default()
                .push(Value::Object(rendered));
        }

        for (block_type, rendered) in blocks {
            insert_unique(&mut properties, block_type.to_string(), Value::Array(rendered))?;
        }

        if let Some(schema) = schema {
            self.schemas.fill_defaults(schema, &mut properties);
        }

        Ok(properties)
    }

    fn render_expr(
        &self,
        expr: &Expression,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Value, RenderIssue> {
        self.check_depth(depth)?;

        match expr {
            Expression::Parenthesis(inner) => self.render_expr(inner, schema, depth + 1),
            Expression::Variable(_) | Expression::Traversal(_) => match traversal_path(expr) {
                Some(path) => Ok(match self.resolve_reference(&path) {
                    Some(id) => Value::String(id),
                    None => Value::String(path.join(".")),
                }),
                None => self.evaluate(expr, schema, depth),
            },
            Expression::TemplateExpr(template_expr) => {
                self.render_template(template_expr, schema, depth)
            }
            Expression::Null => Ok(Value::Null),
            Expression::Bool(b) => Ok(Value::Boolean(*b)),
            Expression::Number(n) => Ok(Value::from(n.clone())),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Array(elements) => {
                let element_schema = self.element_schema(schema);
                let mut array = Vec::with_capacity(elements.len());
                for element in elements.iter().filter(|element| !is_void(element)) {
                    array.push(self.render_expr(element, element_schema, depth + 1)?);
                }
                Ok(Value::Array(array))
            }
            Expression::Object(object) => {
                let mut rendered = Object::new();
                for (key, value) in object.iter() {
                    let key = match key {
                        // keywords are interpreted as keys
                        ObjectKey::Identifier(ident) => Value::String(ident.to_string()),
                        ObjectKey::Expression(key_expr) => {
                            self.render_expr(key_expr, None, depth + 1)?
                        }
                        other => {
                            tracing::warn!(key = ?other, "skipping unsupported object key");
                            continue;
                        }
                    };
                    let Value::String(key) = key else {
                        tracing::warn!(?key, "skipping non-string object key");
                        continue;
                    };
                    let value = self.render_expr(value, None, depth + 1)?;
                    insert_unique(&mut rendered, key, value)?;
                }
                Ok(Value::Object(rendered))
            }
            other => {
                tracing::debug!(expression = %other, "evaluating expression without context");
                self.evaluate(other, schema, depth)
            }
        }
    }

    fn render_template(
        &self,
        template_expr: &TemplateExpr,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Value, RenderIssue> {
        let template = match Template::from_expr(template_expr) {
            Ok(template) => template,
            Err(err) => {
                tracing::warn!(%err, "unable to parse template");
                return Ok(Value::Null);
            }
        };

        match template.elements() {
            [] => Ok(Value::String(String::new())),
            [element] => self.render_element(element, schema, depth + 1),
            elements => {
                // templates are commonly used to embed references
                let mut references = self.template_references(&template);
                match references.len() {
                    0 => {}
                    1 => return Ok(Value::String(references.remove(0))),
                    _ => return Ok(references.into()),
                }

                let mut rendered = String::new();
                for element in elements {
                    if let Value::String(part) = self.render_element(element, schema, depth + 1)? {
                        rendered.push_str(&part);
                    }
                }
                Ok(Value::String(rendered))
            }
        }
    }

    fn render_element(
        &self,
        element: &Element,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Value, RenderIssue> {
        match element {
            Element::Literal(literal) => Ok(Value::String(literal.clone())),
            Element::Interpolation(interpolation) => {
                self.render_expr(&interpolation.expr, schema, depth)
            }
            Element::Directive(_) => {
                tracing::warn!("template directives are not rendered");
                Ok(Value::Null)
            }
        }
    }

    /// Resource ids referenced anywhere in the template, first occurrence first
    fn template_references(&self, template: &Template) -> Vec<String> {
        let mut references: Vec<String> = vec![];
        template.visit_traversals(&mut |traversal: &Traversal| {
            let Some(path) = traversal_segments(traversal) else {
                return;
            };
            if let Some(id) = self.resolve_reference(&path) {
                if !references.contains(&id) {
                    references.push(id);
                }
            }
        });
        references
    }

    /// The resource id a traversal path starts with, if that resource exists
    ///
    /// `aws_s3_bucket.logs.arn` refers to `aws_s3_bucket.logs`, `data.aws_ami.latest.id` to
    /// `data.aws_ami.latest`.
    fn resolve_reference(&self, path: &[String]) -> Option<String> {
        let len = if path.first().is_some_and(|root| root == "data") {
            3
        } else {
            2
        };
        if path.len() < len {
            return None;
        }

        let id = path[..len].join(".");
        self.module.contains_resource(&id).then_some(id)
    }

    /// Fallback for everything without a structural rendering (function calls, operations, ...)
    ///
    /// No variables are bound, anything that needs one degrades to null.
    fn evaluate(
        &self,
        expr: &Expression,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Value, RenderIssue> {
        match expr.evaluate(&hcl::eval::Context::new()) {
            Ok(value) => self.render_value(&value, schema, depth),
            Err(errors) => {
                tracing::warn!(%errors, expression = %expr, "unsupported expression, rendering null");
                Ok(Value::Null)
            }
        }
    }

    fn render_value(
        &self,
        value: &hcl::Value,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Value, RenderIssue> {
        self.check_depth(depth)?;

        match value {
            hcl::Value::Null => Ok(Value::Null),
            hcl::Value::Bool(b) => Ok(Value::Boolean(*b)),
            hcl::Value::Number(n) => Ok(Value::from(n.clone())),
            hcl::Value::String(s) => Ok(Value::String(s.clone())),
            hcl::Value::Array(elements) => {
                let element_schema = self.element_schema(schema);
                elements
                    .iter()
                    .map(|element| self.render_value(element, element_schema, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            hcl::Value::Object(members) => {
                let mut rendered = Object::new();
                for (key, member) in members {
                    let member =
                        self.render_value(member, schema::attribute(schema, key), depth + 1)?;
                    rendered.insert(key.clone(), member);
                }
                Ok(Value::Object(rendered))
            }
        }
    }

    fn element_schema<'s>(&self, schema: Option<&'s Schema>) -> Option<&'s Schema> {
        schema.and_then(|schema| self.schemas.element_schema(schema))
    }

    fn check_depth(&self, depth: usize) -> Result<(), RenderIssue> {
        if depth > self.max_depth {
            return Err(RenderIssue::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }
}

/// Named segments of a variable traversal (`var.a[0].b` is `["var", "a", "b"]`)
///
/// `None` for traversals that do not start at a variable.
pub(crate) fn traversal_path(expr: &Expression) -> Option<Vec<String>> {
    match expr {
        Expression::Variable(variable) => Some(vec![variable.to_string()]),
        Expression::Traversal(traversal) => traversal_segments(traversal),
        _ => None,
    }
}

fn traversal_segments(traversal: &Traversal) -> Option<Vec<String>> {
    let Expression::Variable(root) = &traversal.expr else {
        return None;
    };

    let mut path = vec![root.to_string()];
    for operator in &traversal.operators {
        if let TraversalOperator::GetAttr(ident) = operator {
            path.push(ident.to_string());
        }
    }
    Some(path)
}

/// Empty string literals and empty templates are left out of lists
fn is_void(expr: &Expression) -> bool {
    match expr {
        Expression::String(s) => s.is_empty(),
        Expression::TemplateExpr(template_expr) => Template::from_expr(template_expr)
            .map(|template| template.elements().is_empty())
            .unwrap_or(false),
        _ => false,
    }
}

fn insert_unique(object: &mut Object, key: String, value: Value) -> Result<(), RenderIssue> {
    if object.contains_key(&key) {
        return Err(RenderIssue::DuplicateKey(key));
    }
    object.insert(key, value);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::ResourceSchemas;
    use crate::tf_module;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn render(module: &TfModule) -> Value {
        render_with(module, &ResourceSchemas::default())
    }

    fn render_with(module: &TfModule, schemas: &ResourceSchemas) -> Value {
        Renderer::new(module, schemas, crate::detect::DEFAULT_MAX_DEPTH)
            .render_view()
            .expect("must render")
    }

    fn resource<'v>(view: &'v Value, id: &str) -> &'v Value {
        view.get("resources")
            .and_then(|resources| resources.get(id))
            .unwrap_or_else(|| panic!("missing resource {id}"))
    }

    fn json(value: &Value) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn reference_renders_as_id() {
        let module = tf_module! {r#"
        data "aws_ami" "ubuntu" {}
        resource "aws_ami" "latest" {
          name = "latest"
        }
        resource "aws_instance" "web" {
          ami       = aws_ami.latest.id
          base      = data.aws_ami.ubuntu.id
          subnet_id = aws_subnet.missing.id
          region    = var.region
        }
        "#};

        let view = render(&module);
        let web = resource(&view, "aws_instance.web");
        assert_eq!(web.get("ami"), Some(&Value::from("aws_ami.latest")));
        assert_eq!(web.get("base"), Some(&Value::from("data.aws_ami.ubuntu")));
        // dangling references keep the traversal path
        assert_eq!(web.get("subnet_id"), Some(&Value::from("aws_subnet.missing.id")));
        assert_eq!(web.get("region"), Some(&Value::from("var.region")));

        assert_eq!(
            resource(&view, "aws_ami.latest").get("name"),
            Some(&Value::from("latest"))
        );
    }

    #[test]
    fn resource_base_keys() {
        let module = tf_module! {r#"
        resource "aws_s3_bucket" "logs" {
          provider = aws.west
          count    = 2
          bucket   = "logs"
          lifecycle {
            prevent_destroy = true
          }
        }
        "#};

        let view = render(&module);
        assert_eq!(
            json(&view),
            serde_json::json!({
                "hcl_resource_view_version": "0.0.1",
                "resources": {
                    "aws_s3_bucket.logs": {
                        "_type": "aws_s3_bucket",
                        "_provider": "aws.west",
                        "id": "aws_s3_bucket.logs",
                        "bucket": "logs"
                    }
                }
            })
        );
    }

    #[test]
    fn blocks_are_always_arrays() {
        let module = tf_module! {r#"
        resource "aws_security_group" "one" {
          ingress {
            from_port = 22
          }
        }
        resource "aws_security_group" "three" {
          ingress {
            from_port = 22
          }
          ingress {
            from_port = 80
          }
          ingress {
            from_port = 443
          }
        }
        "#};

        let view = render(&module);
        let ingress = |id| {
            resource(&view, id)
                .get("ingress")
                .and_then(Value::as_array)
                .map(<[Value]>::len)
        };
        assert_eq!(ingress("aws_security_group.one"), Some(1));
        assert_eq!(ingress("aws_security_group.three"), Some(3));

        let first = &resource(&view, "aws_security_group.three")
            .get("ingress")
            .and_then(Value::as_array)
            .unwrap()[1];
        assert_eq!(first.get("from_port"), Some(&Value::Integer(80)));
    }

    #[test]
    fn integer_and_decimal_numbers() {
        let module = tf_module! {r#"
        resource "t" "n" {
          whole    = 5
          fraction = 5.5
          computed = 2 * 3
          listed   = [1, 1.5]
        }
        "#};

        let view = render(&module);
        let n = resource(&view, "t.n");
        assert_eq!(n.get("whole"), Some(&Value::Integer(5)));
        assert_eq!(n.get("fraction"), Some(&Value::Decimal(5.5)));
        assert_eq!(n.get("computed"), Some(&Value::Integer(6)));
        assert_eq!(
            n.get("listed"),
            Some(&Value::Array(vec![Value::Integer(1), Value::Decimal(1.5)]))
        );
    }

    #[test]
    fn templates() {
        let module = tf_module! {r#"
        resource "aws_s3_bucket" "a" {}
        resource "aws_s3_bucket" "b" {}
        resource "t" "templates" {
          single    = "${aws_s3_bucket.a.id}"
          literal   = "plain"
          both      = "${aws_s3_bucket.a.arn}/${aws_s3_bucket.b.arn}"
          repeated  = "${aws_s3_bucket.a.arn}-${aws_s3_bucket.a.id}"
          mixed     = "prefix-${var.name}-suffix"
          nested    = "arn:${upper(aws_s3_bucket.b.id)}"
        }
        "#};

        let view = render(&module);
        let t = resource(&view, "t.templates");
        assert_eq!(t.get("single"), Some(&Value::from("aws_s3_bucket.a")));
        assert_eq!(t.get("literal"), Some(&Value::from("plain")));
        assert_eq!(
            t.get("both"),
            Some(&Value::from(vec!["aws_s3_bucket.a", "aws_s3_bucket.b"]))
        );
        assert_eq!(t.get("repeated"), Some(&Value::from("aws_s3_bucket.a")));
        assert_eq!(t.get("mixed"), Some(&Value::from("prefix-var.name-suffix")));
        assert_eq!(t.get("nested"), Some(&Value::from("aws_s3_bucket.b")));
    }

    #[test]
    fn void_list_elements_are_elided() {
        let module = tf_module! {r#"
        resource "t" "list" {
          values = ["a", "", "b"]
        }
        "#};

        let view = render(&module);
        assert_eq!(
            resource(&view, "t.list").get("values"),
            Some(&Value::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn objects() {
        let module = tf_module! {r#"
        resource "aws_vpc" "main" {}
        resource "t" "tags" {
          tags = {
            Name          = "main"
            "quoted key"  = 1
            vpc           = aws_vpc.main.id
            (var.dynamic) = true
          }
        }
        "#};

        let view = render(&module);
        assert_eq!(
            json(resource(&view, "t.tags").get("tags").unwrap()),
            serde_json::json!({
                "Name": "main",
                "quoted key": 1,
                "vpc": "aws_vpc.main",
                "var.dynamic": true
            })
        );
    }

    #[test]
    fn non_string_object_keys_are_skipped() {
        let module = tf_module! {r#"
        resource "t" "tags" {
          tags = { (1) = "x", b = 2 }
        }
        "#};

        let view = render(&module);
        assert_eq!(
            json(resource(&view, "t.tags").get("tags").unwrap()),
            serde_json::json!({"b": 2})
        );
    }

    #[test]
    fn identifier_and_quoted_key_collide() {
        let module = tf_module! {r#"
        resource "t" "tags" {
          tags = { a = 1, "a" = 2 }
        }
        "#};

        let err = Renderer::new(&module, &ResourceSchemas::default(), 16)
            .render_view()
            .expect_err("must error");
        assert_eq!(err.issue, RenderIssue::DuplicateKey("a".to_string()));
    }

    #[test]
    fn template_directives_render_nothing() {
        let module = tf_module! {r#"
        resource "t" "directive" {
          conditional = "a-%{ if true }b%{ endif }-c"
        }
        "#};

        let view = render(&module);
        assert_eq!(
            resource(&view, "t.directive").get("conditional"),
            Some(&Value::from("a--c"))
        );
    }

    #[test]
    fn fallback_evaluation() {
        let module = tf_module! {r#"
        resource "t" "eval" {
          cond    = true ? "yes" : "no"
          call    = upper("x")
          unknown = var.enabled ? 1 : 2
          squares = [for n in [1, 2] : n * n]
        }
        "#};

        let view = render(&module);
        let eval = resource(&view, "t.eval");
        assert_eq!(eval.get("cond"), Some(&Value::from("yes")));
        // no functions are bound
        assert_eq!(eval.get("call"), Some(&Value::Null));
        assert_eq!(eval.get("unknown"), Some(&Value::Null));
        assert_eq!(
            eval.get("squares"),
            Some(&Value::Array(vec![Value::Integer(1), Value::Integer(4)]))
        );
    }

    #[test]
    fn schema_defaults() {
        let schemas = ResourceSchemas::from_str(
            r#"
aws_s3_bucket:
  attributes:
    acl:
      default: private
    force_destroy:
      default: false
    versioning:
      attributes:
        enabled:
          default: false
        mfa_delete:
          default: false
"#,
        )
        .unwrap();

        let module = tf_module! {r#"
        resource "aws_s3_bucket" "logs" {
          acl = "log-delivery-write"
          versioning {
            enabled = true
          }
        }
        resource "aws_instance" "no_schema" {
          ami = "ami-1"
        }
        "#};

        let view = render_with(&module, &schemas);
        assert_eq!(
            json(resource(&view, "aws_s3_bucket.logs")),
            serde_json::json!({
                "_type": "aws_s3_bucket",
                "_provider": "aws",
                "id": "aws_s3_bucket.logs",
                "acl": "log-delivery-write",
                "versioning": [{"enabled": true, "mfa_delete": false}],
                "force_destroy": false
            })
        );
        assert_eq!(
            resource(&view, "aws_instance.no_schema")
                .as_object()
                .map(Object::len),
            Some(4)
        );
    }

    /// Counts element lookups and marks every body it is asked to fill
    #[derive(Debug)]
    struct Recording {
        schemas: ResourceSchemas,
        element_lookups: AtomicUsize,
    }

    impl SchemaProvider for Recording {
        fn resource_schema(&self, resource_type: &str) -> Option<&Schema> {
            self.schemas.resource_schema(resource_type)
        }

        fn element_schema<'s>(&self, schema: &'s Schema) -> Option<&'s Schema> {
            self.element_lookups.fetch_add(1, Ordering::Relaxed);
            schema.element()
        }

        fn fill_defaults(&self, _schema: &Schema, into: &mut Object) {
            into.insert("_filled".to_string(), Value::Boolean(true));
        }
    }

    #[test]
    fn schema_lookups_go_through_the_provider() {
        let provider = Recording {
            schemas: ResourceSchemas::from_str(
                r#"
t:
  attributes:
    ports:
      elem: {}
    rule: {}
"#,
            )
            .unwrap(),
            element_lookups: AtomicUsize::new(0),
        };

        let module = tf_module! {r#"
        resource "t" "x" {
          ports = [1, 2]
          rule {}
        }
        resource "other" "y" {}
        "#};

        let view = Renderer::new(&module, &provider, crate::detect::DEFAULT_MAX_DEPTH)
            .render_view()
            .expect("must render");
        assert_eq!(
            json(resource(&view, "t.x")),
            serde_json::json!({
                "_type": "t",
                "_provider": "t",
                "id": "t.x",
                "ports": [1, 2],
                "rule": [{"_filled": true}],
                "_filled": true
            })
        );
        assert_eq!(resource(&view, "other.y").get("_filled"), None);
        assert_eq!(provider.element_lookups.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn rendering_is_idempotent() {
        let module = tf_module! {r#"
        resource "aws_vpc" "main" {}
        resource "aws_subnet" "a" {
          vpc_id = aws_vpc.main.id
          cidr   = "10.0.${1 + 1}.0/24"
          tags   = { a = [1, 2.5] }
        }
        "#};

        assert_eq!(render(&module), render(&module));
    }

    #[test]
    fn mutual_references_do_not_recurse() {
        let module = tf_module! {r#"
        resource "t" "a" {
          other = t.b.value
        }
        resource "t" "b" {
          other = t.a.value
        }
        "#};

        let view = render(&module);
        assert_eq!(resource(&view, "t.a").get("other"), Some(&Value::from("t.b")));
        assert_eq!(resource(&view, "t.b").get("other"), Some(&Value::from("t.a")));
    }

    #[test]
    fn duplicate_attribute_is_an_error() {
        let module = tf_module! {r#"
        resource "t" "dup" {
          a = 1
          a {}
        }
        "#};

        let err = Renderer::new(&module, &ResourceSchemas::default(), 16)
            .render_view()
            .expect_err("must error");
        assert_eq!(
            err,
            RenderError {
                resource: "t.dup".to_string(),
                issue: RenderIssue::DuplicateKey("a".to_string()),
            }
        );
    }

    #[test]
    fn nesting_guard() {
        let module = tf_module! {r#"
        resource "t" "deep" {
          a = [[[[["x"]]]]]
        }
        "#};

        let err = Renderer::new(&module, &ResourceSchemas::default(), 4)
            .render_view()
            .expect_err("must error");
        assert_eq!(err.issue, RenderIssue::NestingTooDeep(4));

        Renderer::new(&module, &ResourceSchemas::default(), 16)
            .render_view()
            .expect("must render");
    }
}
