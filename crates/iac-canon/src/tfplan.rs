//! Terraform plan JSON (`terraform show -json`)
//!
//! Plans are already resolved, the parsed document is the content as is. Locations point at the
//! plan file only.
use crate::detect::{DetectOptions, Detection, Detector, Format, MalformedInput, Position};
use crate::input::InputFile;
use crate::loader::{ConfigurationUnit, LocationIndex};
use crate::value::Value;

/// Top-level field every plan carries
pub const MARKER: &str = "terraform_version";

const EXTENSIONS: &[&str] = &["json"];

#[derive(Debug, Default)]
pub struct TfPlanDetector;

impl Detector for TfPlanDetector {
    fn format(&self) -> Format {
        Format::TfPlan
    }

    fn detect_file(&self, file: &InputFile, options: &DetectOptions) -> Detection {
        if !options.ignore_ext && !file.has_extension(EXTENSIONS) {
            return Detection::Decline;
        }

        let contents = match file.contents() {
            Ok(contents) => contents,
            Err(err) => return Detection::unreadable(file.path(), err),
        };

        let plan: Value = match serde_json::from_slice(contents) {
            Ok(plan) => plan,
            Err(err) if contains_marker(contents) => {
                let position = (err.line() > 0).then(|| Position::new(err.line(), err.column()));
                return MalformedInput::new(
                    file.path(),
                    position,
                    format!("unable to parse plan: {err}"),
                )
                .into();
            }
            Err(err) => {
                tracing::trace!(path=%file.path().display(), %err, "not json");
                return Detection::Decline;
            }
        };

        let is_plan = plan
            .as_object()
            .is_some_and(|object| object.contains_key(MARKER));
        if !is_plan {
            tracing::trace!(path=%file.path().display(), "no {MARKER}");
            return Detection::Decline;
        }

        ConfigurationUnit::new(
            Format::TfPlan,
            file.path(),
            vec![file.path().to_path_buf()],
            plan,
            LocationIndex::File(file.path().to_path_buf()),
        )
        .into()
    }
}

fn contains_marker(contents: &[u8]) -> bool {
    let quoted = format!("\"{MARKER}\"");
    contents
        .windows(quoted.len())
        .any(|window| window == quoted.as_bytes())
}
