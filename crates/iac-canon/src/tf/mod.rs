//! Terraform HCL configurations
//!
//! A directory holding at least one `.tf` file is a module. All of its `.tf` files load into one
//! [TfModule] which renders into a single configuration unit. A single `.tf` file given directly
//! is a module of its own.
mod check;
mod module;
mod render;

pub use module::{ResourceMode, TfModule, TfResource};
pub use render::{RenderError, RenderIssue, Renderer, RESOURCE_VIEW_VERSION};

use crate::detect::{DetectOptions, Detection, Detector, Format, MalformedInput};
use crate::input::{InputDirectory, InputFile};
use crate::loader::{ConfigurationUnit, LocationIndex};
use crate::schema::SchemaProvider;
use std::path::Path;
use std::sync::Arc;

const EXTENSIONS: &[&str] = &["tf"];

#[derive(Debug)]
pub struct TfDetector {
    schemas: Arc<dyn SchemaProvider>,
}

impl TfDetector {
    pub fn new(schemas: Arc<dyn SchemaProvider>) -> Self {
        Self { schemas }
    }

    fn claim(&self, path: &Path, module: TfModule, options: &DetectOptions) -> Detection {
        let rendered =
            Renderer::new(&module, self.schemas.as_ref(), options.max_depth).render_view();

        match rendered {
            Ok(content) => ConfigurationUnit::new(
                Format::Tf,
                path,
                module.loaded_files(),
                content,
                LocationIndex::Tf(module),
            )
            .into(),
            Err(err) => {
                let location = module
                    .resource(&err.resource)
                    .map(|resource| module.resource_location(resource));
                let (path, position) = match location {
                    Some(location) => (location.path.clone(), location.position()),
                    None => (path.to_path_buf(), None),
                };
                MalformedInput::new(path, position, err.to_string()).into()
            }
        }
    }
}

impl Detector for TfDetector {
    fn format(&self) -> Format {
        Format::Tf
    }

    fn detect_file(&self, file: &InputFile, options: &DetectOptions) -> Detection {
        let by_extension = file.has_extension(EXTENSIONS);
        if !by_extension && !options.ignore_ext {
            return Detection::Decline;
        }

        let contents = match file.contents() {
            Ok(contents) => contents,
            Err(err) => return Detection::unreadable(file.path(), err),
        };

        let mut module = TfModule::default();
        if let Err(err) = module.load_file(file.path(), contents, options.max_depth) {
            if by_extension {
                return err.into();
            }
            tracing::debug!(%err, "not hcl");
            return Detection::Decline;
        }

        // without the extension, only a module that declares resources counts
        if !by_extension && module.resources().next().is_none() {
            return Detection::Decline;
        }

        self.claim(file.path(), module, options)
    }

    fn detect_directory(&self, directory: &InputDirectory, options: &DetectOptions) -> Detection {
        let files = match directory.files_with_extension(EXTENSIONS) {
            Ok(files) => files,
            Err(err) => return Detection::unreadable(directory.path(), err),
        };

        if files.is_empty() {
            tracing::trace!(path=%directory.path().display(), "no .tf files");
            return Detection::Decline;
        }

        let mut module = TfModule::default();
        for file in &files {
            let contents = match file.contents() {
                Ok(contents) => contents,
                Err(err) => return Detection::unreadable(file.path(), err),
            };
            if let Err(err) = module.load_file(file.path(), contents, options.max_depth) {
                return err.into();
            }
        }

        self.claim(directory.path(), module, options)
    }
}
