//! input paths offered to detectors
//!
//! An [InputPath] is either a file or a directory. File contents are read at most once, on first
//! request, so detectors that decline based on the extension never touch the disk.
use std::cell::OnceCell;
use std::io;
use std::path::{Path, PathBuf};

/// Path used for input read from stdin
pub const STDIN: &str = "<stdin>";

#[derive(Debug)]
pub enum InputPath {
    File(InputFile),
    Directory(InputDirectory),
}

impl InputPath {
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if std::fs::metadata(&path)?.is_dir() {
            Ok(InputPath::Directory(InputDirectory::new(path)))
        } else {
            Ok(InputPath::File(InputFile::new(path)))
        }
    }

    pub fn stdin() -> io::Result<Self> {
        let mut contents = Vec::new();
        io::Read::read_to_end(&mut io::stdin(), &mut contents)?;
        Ok(InputPath::File(InputFile::from_contents(STDIN, contents)))
    }

    pub fn path(&self) -> &Path {
        match self {
            InputPath::File(file) => file.path(),
            InputPath::Directory(directory) => directory.path(),
        }
    }
}

#[derive(Debug)]
pub struct InputFile {
    path: PathBuf,
    contents: OnceCell<Vec<u8>>,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: OnceCell::new(),
        }
    }

    /// A file whose contents are already known
    pub fn from_contents(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: OnceCell::from(contents.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_stdin(&self) -> bool {
        self.path == Path::new(STDIN)
    }

    /// Checks the extension (without dot, case insensitive)
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        let Some(ext) = self.path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext))
    }

    pub fn contents(&self) -> io::Result<&[u8]> {
        if let Some(contents) = self.contents.get() {
            return Ok(contents);
        }

        tracing::trace!(path=%self.path.display(), "reading file");
        let contents = std::fs::read(&self.path)?;
        Ok(self.contents.get_or_init(|| contents))
    }

    /// Contents as utf-8, invalid utf-8 is reported as [io::ErrorKind::InvalidData]
    pub fn contents_str(&self) -> io::Result<&str> {
        std::str::from_utf8(self.contents()?)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

#[derive(Debug, Clone)]
pub struct InputDirectory {
    path: PathBuf,
}

impl InputDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Children sorted by path
    ///
    /// Hidden entries (`.git`, `.terraform`, ...) are skipped.
    pub fn children(&self) -> io::Result<Vec<InputPath>> {
        let mut children = vec![];
        for dir_entry in std::fs::read_dir(&self.path)? {
            let dir_entry = dir_entry?;
            if dir_entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = dir_entry.path();
            if dir_entry.file_type()?.is_dir() {
                children.push(InputPath::Directory(InputDirectory::new(path)));
            } else {
                children.push(InputPath::File(InputFile::new(path)));
            }
        }

        children.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(children)
    }

    /// Direct child files with one of the given extensions, sorted by path
    pub fn files_with_extension(&self, extensions: &[&str]) -> io::Result<Vec<InputFile>> {
        Ok(self
            .children()?
            .into_iter()
            .filter_map(|child| match child {
                InputPath::File(file) if file.has_extension(extensions) => Some(file),
                _ => None,
            })
            .collect())
    }
}
