//! Loading configuration units from input paths
//!
//! The [Loader] walks the requested paths and offers each one to its detectors in a fixed priority
//! order (tf-plan, cfn, tf):
//!
//! - a directory is first offered as a whole; if nobody claims it, its children are walked
//! - a file is offered to each detector until one claims it
//!
//! Every file a unit was built from is recorded, so a file that belongs to a claimed module
//! directory is never offered again on its own.
//!
//! A detector reporting malformed input does not end the search: the remaining detectors still get
//! their turn, and only if none of them claims the input the first malformed report aborts the load.
//! An input that cannot be read aborts the load right away.
use crate::cfn::{CfnDetector, CfnLocations};
use crate::detect::{
    DetectOptions, Detection, Detector, Format, FormatHint, MalformedInput, Position,
    DEFAULT_MAX_DEPTH,
};
use crate::input::{InputDirectory, InputPath};
use crate::schema::SchemaProvider;
use crate::tf::{TfDetector, TfModule};
use crate::tfplan::TfPlanDetector;
use crate::value::{Object, Value};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Path that reads from stdin
pub const STDIN_PATH: &str = "-";

/// Resolved source location
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Location {
    /// Location naming a whole file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
            column: None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.line?, self.column.unwrap_or(1)))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        Ok(())
    }
}

/// Per-unit index resolving attribute paths to source locations
#[derive(Debug)]
pub enum LocationIndex {
    /// single file without syntax positions
    File(PathBuf),
    Tf(TfModule),
    Cfn(CfnLocations),
}

impl LocationIndex {
    /// Not finding a location is a normal outcome
    pub fn resolve(&self, attribute_path: &[&str]) -> Option<Location> {
        match self {
            LocationIndex::File(path) => Some(Location::file(path)),
            LocationIndex::Tf(module) => module.location(attribute_path),
            LocationIndex::Cfn(locations) => locations.resolve(attribute_path),
        }
    }
}

/// One loaded and rendered artifact
///
/// Immutable once created.
#[derive(Debug)]
pub struct ConfigurationUnit {
    format: Format,
    path: PathBuf,
    loaded_files: Vec<PathBuf>,
    content: Value,
    locations: LocationIndex,
}

impl ConfigurationUnit {
    pub(crate) fn new(
        format: Format,
        path: impl Into<PathBuf>,
        loaded_files: Vec<PathBuf>,
        content: Value,
        locations: LocationIndex,
    ) -> Self {
        Self {
            format,
            path: path.into(),
            loaded_files,
            content,
            locations,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// File or directory the unit was claimed from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    /// `{"filepath": ..., "content": ...}` as handed to the evaluation engine
    pub fn canonical(&self) -> Value {
        let mut object = Object::new();
        object.insert(
            "filepath".to_string(),
            self.path.display().to_string().into(),
        );
        object.insert("content".to_string(), self.content.clone());
        object.into()
    }

    pub fn location(&self, attribute_path: &[&str]) -> Option<Location> {
        self.locations.resolve(attribute_path)
    }

    fn contains(&self, path: &Path) -> bool {
        let path = normalize(path);
        normalize(&self.path) == path
            || self.loaded_files.iter().any(|file| normalize(file) == path)
    }
}

/// Units loaded by one run
#[derive(Debug, Default)]
pub struct LoadedUnits {
    units: Vec<ConfigurationUnit>,
    /// unit paths and loaded files, normalized
    loaded_paths: HashSet<PathBuf>,
}

impl LoadedUnits {
    pub fn add(&mut self, unit: ConfigurationUnit) {
        tracing::debug!(path=%unit.path.display(), format=%unit.format, "loaded unit");
        self.loaded_paths.insert(normalize(&unit.path));
        self.loaded_paths.extend(unit.loaded_files.iter().map(|file| normalize(file)));
        self.units.push(unit);
    }

    /// `./module/main.tf` and `module/main.tf` are the same file
    pub fn already_loaded(&self, path: &Path) -> bool {
        self.loaded_paths.contains(&normalize(path))
    }

    pub fn count(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[ConfigurationUnit] {
        &self.units
    }

    /// Canonical values of all units, in load order
    pub fn canonical_values(&self) -> Vec<Value> {
        self.units.iter().map(ConfigurationUnit::canonical).collect()
    }

    /// Resolves an attribute path within the unit loaded from (or containing) `unit_path`
    pub fn location(&self, unit_path: &Path, attribute_path: &[&str]) -> Option<Location> {
        self.units
            .iter()
            .find(|unit| unit.contains(unit_path))?
            .location(attribute_path)
    }
}

#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// files and directories, `-` reads stdin
    pub paths: Vec<PathBuf>,
    #[new(default)]
    pub input_type: FormatHint,
    /// do not decline files based on their extension
    #[new(default)]
    pub ignore_ext: bool,
    #[new(value = "DEFAULT_MAX_DEPTH")]
    pub max_depth: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
    #[error("unable to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not {hint} input", .path.display())]
    FormatMismatch { path: PathBuf, hint: FormatHint },
}

/// Detection dispatcher
#[derive(Debug)]
pub struct Loader {
    detectors: Vec<Box<dyn Detector>>,
}

impl Loader {
    /// Loader with the built-in detectors
    pub fn new(schemas: Arc<dyn SchemaProvider>) -> Self {
        Self::with_detectors(vec![
            Box::new(TfPlanDetector),
            Box::new(CfnDetector),
            Box::new(TfDetector::new(schemas)),
        ])
    }

    /// Detectors are tried in the given order
    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn load(&self, options: &LoadOptions) -> Result<LoadedUnits, LoadError> {
        let mut units = LoadedUnits::default();

        for path in &options.paths {
            if units.already_loaded(path) {
                tracing::debug!(path=%path.display(), "already loaded");
                continue;
            }

            let input = match path.to_str() {
                Some(STDIN_PATH) => InputPath::stdin(),
                _ => InputPath::from_path(path),
            };
            let input = input.map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;

            let loaded_before = units.count();
            self.load_path(input, true, options, &mut units)?;

            if let FormatHint::Force(_) = options.input_type {
                if units.count() == loaded_before {
                    return Err(LoadError::FormatMismatch {
                        path: path.clone(),
                        hint: options.input_type,
                    });
                }
            }
        }

        Ok(units)
    }

    fn detectors(&self, hint: FormatHint) -> impl Iterator<Item = &dyn Detector> {
        self.detectors
            .iter()
            .map(|detector| detector.as_ref())
            .filter(move |detector| match hint {
                FormatHint::Auto => true,
                FormatHint::Force(format) => detector.format() == format,
            })
    }

    fn load_path(
        &self,
        input: InputPath,
        explicit: bool,
        options: &LoadOptions,
        units: &mut LoadedUnits,
    ) -> Result<(), LoadError> {
        match input {
            InputPath::File(file) => {
                if units.already_loaded(file.path()) {
                    tracing::trace!(path=%file.path().display(), "skipping loaded file");
                    return Ok(());
                }

                let forced = matches!(options.input_type, FormatHint::Force(_));
                let detect_options = DetectOptions {
                    ignore_ext: options.ignore_ext || (explicit && (forced || file.is_stdin())),
                    max_depth: options.max_depth,
                };

                let detection = self.first_claim(options.input_type, |detector| {
                    detector.detect_file(&file, &detect_options)
                })?;
                match detection {
                    Some(unit) => units.add(unit),
                    None => {
                        tracing::debug!(path=%file.path().display(), "no detector claimed file")
                    }
                }
            }
            InputPath::Directory(directory) => {
                if units.already_loaded(directory.path()) {
                    return Ok(());
                }

                let detect_options = DetectOptions {
                    ignore_ext: options.ignore_ext,
                    max_depth: options.max_depth,
                };
                let detection = self.first_claim(options.input_type, |detector| {
                    detector.detect_directory(&directory, &detect_options)
                })?;
                if let Some(unit) = detection {
                    units.add(unit);
                    return Ok(());
                }

                self.walk_directory(&directory, options, units)?;
            }
        }

        Ok(())
    }

    fn walk_directory(
        &self,
        directory: &InputDirectory,
        options: &LoadOptions,
        units: &mut LoadedUnits,
    ) -> Result<(), LoadError> {
        tracing::trace!(path=%directory.path().display(), "walking directory");
        let children = directory.children().map_err(|source| LoadError::Io {
            path: directory.path().to_path_buf(),
            source,
        })?;

        for child in children {
            self.load_path(child, false, options, units)?;
        }

        Ok(())
    }

    /// Offers an input to each detector until one claims it
    fn first_claim(
        &self,
        hint: FormatHint,
        mut detect: impl FnMut(&dyn Detector) -> Detection,
    ) -> Result<Option<ConfigurationUnit>, LoadError> {
        let mut malformed: Option<MalformedInput> = None;

        for detector in self.detectors(hint) {
            match detect(detector) {
                Detection::Decline => {
                    tracing::trace!(format=%detector.format(), "declined");
                }
                Detection::Claim(unit) => {
                    if let Some(err) = malformed {
                        tracing::warn!(%err, format=%detector.format(), "malformed report superseded by claim");
                    }
                    return Ok(Some(*unit));
                }
                Detection::Malformed(err) => {
                    tracing::debug!(%err, format=%detector.format(), "malformed");
                    malformed.get_or_insert(err);
                }
                Detection::Unreadable { path, source } => {
                    return Err(LoadError::Io { path, source });
                }
            }
        }

        match malformed {
            Some(err) => Err(err.into()),
            None => Ok(None),
        }
    }
}

/// Drops `.` components, `.` itself stays
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        return PathBuf::from(".");
    }
    normalized
}

/// Loads `options.paths` with the built-in detectors
pub fn load_paths(
    options: &LoadOptions,
    schemas: Arc<dyn SchemaProvider>,
) -> Result<LoadedUnits, LoadError> {
    Loader::new(schemas).load(options)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::InputFile;
    use pretty_assertions::assert_eq;

    /// Claims files containing `claim`, reports files containing `broken` as malformed
    #[derive(Debug)]
    struct Fake {
        format: Format,
        claim: &'static str,
    }

    impl Detector for Fake {
        fn format(&self) -> Format {
            self.format
        }

        fn detect_file(&self, file: &InputFile, _options: &DetectOptions) -> Detection {
            let contents = match file.contents_str() {
                Ok(contents) => contents,
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    return Detection::Decline;
                }
                Err(err) => return Detection::unreadable(file.path(), err),
            };
            if contents.contains(self.claim) {
                ConfigurationUnit::new(
                    self.format,
                    file.path(),
                    vec![file.path().to_path_buf()],
                    Value::from(self.claim),
                    LocationIndex::File(file.path().to_path_buf()),
                )
                .into()
            } else if contents.contains("broken") {
                MalformedInput::new(file.path(), None, format!("broken {}", self.format)).into()
            } else {
                Detection::Decline
            }
        }
    }

    fn loader() -> Loader {
        Loader::with_detectors(vec![
            Box::new(Fake {
                format: Format::TfPlan,
                claim: "plan",
            }),
            Box::new(Fake {
                format: Format::Cfn,
                claim: "cfn",
            }),
        ])
    }

    fn load_one(contents: &str) -> Result<Option<ConfigurationUnit>, LoadError> {
        let file = InputFile::from_contents("input", contents);
        loader().first_claim(FormatHint::Auto, |detector| {
            detector.detect_file(&file, &Default::default())
        })
    }

    #[test]
    fn first_claim_wins() {
        let unit = load_one("plan cfn").unwrap().unwrap();
        assert_eq!(unit.format(), Format::TfPlan);
    }

    #[test]
    fn decline_everywhere() {
        assert!(load_one("nothing").unwrap().is_none());
    }

    #[test]
    fn malformed_does_not_hide_later_claim() {
        let unit = load_one("broken cfn").unwrap().unwrap();
        assert_eq!(unit.format(), Format::Cfn);
    }

    #[test]
    fn first_malformed_is_reported() {
        let LoadError::Malformed(err) = load_one("broken").unwrap_err() else {
            panic!("must be malformed");
        };
        assert_eq!(err.reason, "broken tf-plan");
    }

    #[test]
    fn unreadable_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = InputFile::new(dir.path().join("missing.json"));

        let err = loader()
            .first_claim(FormatHint::Auto, |detector| {
                detector.detect_file(&file, &Default::default())
            })
            .expect_err("must fail");
        let LoadError::Io { path, source } = err else {
            panic!("must be an io error");
        };
        assert_eq!(path, dir.path().join("missing.json"));
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn forced_hint_filters_detectors() {
        let file = InputFile::from_contents("input", "plan cfn");
        let unit = loader()
            .first_claim(FormatHint::Force(Format::Cfn), |detector| {
                detector.detect_file(&file, &Default::default())
            })
            .unwrap()
            .unwrap();
        assert_eq!(unit.format(), Format::Cfn);
    }

    #[test]
    fn canonical_value() {
        let unit = ConfigurationUnit::new(
            Format::TfPlan,
            "plan.json",
            vec!["plan.json".into()],
            Value::from(true),
            LocationIndex::File("plan.json".into()),
        );
        assert_eq!(
            serde_json::to_value(unit.canonical()).unwrap(),
            serde_json::json!({"filepath": "plan.json", "content": true})
        );
        assert_eq!(unit.location(&["x"]), Some(Location::file("plan.json")));
    }

    #[test]
    fn loaded_units_dedup_and_lookup() {
        let mut units = LoadedUnits::default();
        units.add(ConfigurationUnit::new(
            Format::Tf,
            "module",
            vec!["module/a.tf".into(), "module/b.tf".into()],
            Value::Null,
            LocationIndex::File("module/a.tf".into()),
        ));

        assert!(units.already_loaded(Path::new("module")));
        assert!(units.already_loaded(Path::new("module/b.tf")));
        assert!(!units.already_loaded(Path::new("module/c.tf")));
        assert_eq!(units.count(), 1);

        let location = units.location(Path::new("module/b.tf"), &[]).unwrap();
        assert_eq!(location.path, PathBuf::from("module/a.tf"));
        assert_eq!(units.location(Path::new("other"), &[]), None);
    }

    #[test]
    fn current_dir_components_are_ignored() {
        let mut units = LoadedUnits::default();
        units.add(ConfigurationUnit::new(
            Format::Tf,
            "./mod",
            vec!["./mod/main.tf".into()],
            Value::Null,
            LocationIndex::File("./mod/main.tf".into()),
        ));

        assert!(units.already_loaded(Path::new("mod/main.tf")));
        assert!(units.already_loaded(Path::new("mod")));
        assert!(units.already_loaded(Path::new("./mod/./main.tf")));
        assert!(!units.already_loaded(Path::new("main.tf")));
        assert!(units.location(Path::new("mod/main.tf"), &[]).is_some());

        assert_eq!(normalize(Path::new(".")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("./a/./b")), PathBuf::from("a/b"));
    }

    #[test]
    fn location_display() {
        let location = Location {
            path: "main.tf".into(),
            line: Some(4),
            column: Some(3),
        };
        assert_eq!(location.to_string(), "main.tf:4:3");
        assert_eq!(Location::file("plan.json").to_string(), "plan.json");
    }

    #[test]
    fn load_options_defaults() {
        let options = LoadOptions::new(vec!["a".into()]);
        assert_eq!(options.input_type, FormatHint::Auto);
        assert!(!options.ignore_ext);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
