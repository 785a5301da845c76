//! Loading of the file based exposition sources.
use crate::{
    error::{
        Error,
        Result,
    },
    parse_exposition,
    InputSource,
    MetricFamilies,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::debug;

/// Parse the documents of a file based source.
///
/// A directory yields one collection per regular file, sorted by filename so the merge
/// order doesn't depend on the file system. `InputSource::Stream` has no documents of its
/// own and yields nothing; the caller supplies them.
pub fn load(source: &InputSource) -> Result<Vec<MetricFamilies>> {
    match source {
        InputSource::File(path) => Ok(vec![load_file(path)?]),
        InputSource::Directory(dir) => load_dir(dir),
        InputSource::Stream => Ok(Vec::new()),
    }
}

/// Parse a single exposition file.
pub fn load_file(path: &Path) -> Result<MetricFamilies> {
    let content = fs::read_to_string(path).map_err(|e| Error::source_unavailable(path, e))?;
    parse_exposition(&path.display().to_string(), &content)
}

/// Parse every regular file of `dir`, in filename order.
pub fn load_dir(dir: &Path) -> Result<Vec<MetricFamilies>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::source_unavailable(dir, e))? {
        let entry = entry.map_err(|e| Error::source_unavailable(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non regular file");
        }
    }
    sort_by_file_name(&mut files);
    debug!(dir = %dir.display(), files = files.len(), "Loading exposition directory");
    files.iter().map(|path| load_file(path)).collect()
}

fn sort_by_file_name(files: &mut [PathBuf]) {
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
}
