//! Terraform module: the resources of all `.tf` files in one directory
//!
//! [TfModule] tracks
//! - the source files (path and line offsets, for locations)
//! - the `resource` and `data` blocks, keyed by resource id
//!
//! Ids are `<type>.<name>` for managed resources and `data.<type>.<name>` for data resources. An id
//! is unique within a module, a second declaration is reported as malformed input.
use super::check;
use super::render::RenderIssue;
use crate::detect::{MalformedInput, Position};
use crate::loader::Location;
use hcl_edit::structure::{Block, Body, Structure};
use hcl_edit::Span;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Default, Debug)]
pub struct TfModule {
    sources: Vec<Source>,
    resources: IndexMap<String, TfResource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMode {
    Managed,
    Data,
}

impl std::fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceMode::Managed => f.write_str("resource"),
            ResourceMode::Data => f.write_str("data"),
        }
    }
}

#[derive(Debug)]
pub struct TfResource {
    pub id: String,
    pub mode: ResourceMode,
    pub resource_type: String,
    pub name: String,
    /// provider for display, e.g. `aws` or `aws.west`
    pub provider: String,
    source_index: usize,
    block: Block,
}

impl TfResource {
    pub fn body(&self) -> &Body {
        &self.block.body
    }
}

#[derive(Debug)]
struct Source {
    path: PathBuf,
    /// byte offset of each line start
    line_starts: Vec<usize>,
}

impl Source {
    fn new(path: PathBuf, text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self { path, line_starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or_default();
        Position::new(line + 1, offset - line_start + 1)
    }

    fn location(&self, span: Option<std::ops::Range<usize>>) -> Location {
        let position = span.map(|span| self.position(span.start));
        Location {
            path: self.path.clone(),
            line: position.map(|p| p.line),
            column: position.map(|p| p.column),
        }
    }
}

impl TfModule {
    /// Inserts and indexes the resources of one parsed file
    ///
    /// `text` is the source `document` was parsed from.
    pub fn insert(
        &mut self,
        document: Body,
        path: impl Into<PathBuf>,
        text: &str,
    ) -> Result<(), MalformedInput> {
        let source = Source::new(path.into(), text);
        if let Some((span, key)) = check::merged_object_key(&document, text) {
            let position = source.position(span.start);
            return Err(MalformedInput::new(
                source.path,
                Some(position),
                RenderIssue::DuplicateKey(key).to_string(),
            ));
        }

        let source_index = self.sources.len();
        self.sources.push(source);

        for structure in document.into_iter() {
            let Structure::Block(block) = structure else {
                continue;
            };

            let mode = match block.ident.value().as_str() {
                "resource" => ResourceMode::Managed,
                "data" => ResourceMode::Data,
                other => {
                    tracing::trace!(block = other, "skipping non-resource block");
                    continue;
                }
            };

            let [resource_type, name] = block.labels.as_slice() else {
                return Err(self.malformed(
                    source_index,
                    &block,
                    format!("{mode} block requires exactly two labels"),
                ));
            };
            let resource_type = resource_type.as_str().to_string();
            let name = name.as_str().to_string();

            let id = match mode {
                ResourceMode::Managed => format!("{resource_type}.{name}"),
                ResourceMode::Data => format!("data.{resource_type}.{name}"),
            };

            if self.resources.contains_key(&id) {
                return Err(self.malformed(
                    source_index,
                    &block,
                    format!("duplicate resource {id}"),
                ));
            }

            let provider = provider_for_display(&block.body, &resource_type);
            tracing::trace!(%id, %provider, "add resource");
            self.resources.insert(
                id.clone(),
                TfResource {
                    id,
                    mode,
                    resource_type,
                    name,
                    provider,
                    source_index,
                    block,
                },
            );
        }

        Ok(())
    }

    /// Parses and inserts one file
    ///
    /// Text nesting deeper than `max_depth` is rejected before it reaches the parser.
    pub fn load_file(
        &mut self,
        path: &Path,
        contents: &[u8],
        max_depth: usize,
    ) -> Result<(), MalformedInput> {
        tracing::info!(path=%path.display(), "loading file");

        let text = std::str::from_utf8(contents).map_err(|err| {
            let source = Source::new(path.to_path_buf(), &String::from_utf8_lossy(contents));
            MalformedInput::new(
                path,
                Some(source.position(err.valid_up_to())),
                "invalid utf-8",
            )
        })?;

        if let Some(offset) = check::nesting_exceeds(text, max_depth) {
            let source = Source::new(path.to_path_buf(), text);
            return Err(MalformedInput::new(
                path,
                Some(source.position(offset)),
                RenderIssue::NestingTooDeep(max_depth).to_string(),
            ));
        }

        let body = hcl_edit::parser::parse_body(text).map_err(|err| {
            let location = err.location();
            MalformedInput::new(
                path,
                Some(Position::new(location.line(), location.column())),
                format!("unable to parse hcl: {}", err.message()),
            )
        })?;

        self.insert(body, path, text)
    }

    pub fn resource(&self, id: &str) -> Option<&TfResource> {
        self.resources.get(id)
    }

    pub fn contains_resource(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &TfResource> {
        self.resources.values()
    }

    pub fn loaded_files(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|source| source.path.clone()).collect()
    }

    /// Source position of a resource declaration
    pub fn resource_location(&self, resource: &TfResource) -> Location {
        self.sources[resource.source_index].location(resource.block.span())
    }

    /// Resolves `[resource id, attribute or block type, block index, ...]`
    ///
    /// Descends as far as the path matches and returns the deepest node found. An unknown resource
    /// id is not found.
    pub fn location(&self, attribute_path: &[&str]) -> Option<Location> {
        let (id, path) = attribute_path.split_first()?;
        let resource = self.resources.get(*id)?;

        let mut span = resource.block.span();
        let mut body = &resource.block.body;
        let mut segments = path.iter();

        while let Some(segment) = segments.next() {
            if let Some(attribute) = body
                .attributes()
                .find(|attribute| attribute.key.value().as_str() == *segment)
            {
                span = attribute.span().or(span);
                break;
            }

            let blocks: Vec<&Block> = body
                .blocks()
                .filter(|block| block.ident.value().as_str() == *segment)
                .collect();
            let Some(first) = blocks.first() else {
                break;
            };
            span = first.span().or(span);

            let Some(block) = segments
                .next()
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| blocks.get(index))
            else {
                break;
            };
            span = block.span().or(span);
            body = &block.body;
        }

        Some(self.sources[resource.source_index].location(span))
    }

    fn malformed(&self, source_index: usize, block: &Block, reason: String) -> MalformedInput {
        let source = &self.sources[source_index];
        let position = block.span().map(|span| source.position(span.start));
        MalformedInput::new(source.path.clone(), position, reason)
    }
}

/// `provider` meta-argument (`aws.west`) or the provider implied by the type prefix
fn provider_for_display(body: &Body, resource_type: &str) -> String {
    let explicit = body
        .attributes()
        .find(|attribute| attribute.key.value().as_str() == "provider")
        .and_then(|attribute| {
            let expr: hcl::Expression = attribute.value.clone().into();
            super::render::traversal_path(&expr)
        });

    match explicit {
        Some(path) => path.join("."),
        None => resource_type
            .split('_')
            .next()
            .unwrap_or(resource_type)
            .to_string(),
    }
}

/// Utility macro to create a [TfModule] in tests
///
/// ```ignore
/// tf_module! {
///   "main.tf" => r#"resource "aws_vpc" "main" {}"#,
///   "data.tf" => r#"data "aws_ami" "latest" {}"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
#[cfg(test)]
#[macro_export]
macro_rules! tf_module {
    // single document
    { $expr:expr } => {
        $crate::tf_module! { "main.tf" => $expr }
    };
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {{
        let mut module = $crate::tf::TfModule::default();
        $(
            module
                .insert(hcl_edit::parser::parse_body($expr).expect("body must parse"), $source, $expr)
                .expect("module must be valid");
        )+

        module
    }};
}
