//! Text edits on source files.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::diagnostics::UnbedError;
use crate::format::canonicalize;

/// Insert `text` before each of `offsets` in `source`.
///
/// Offsets refer to the original text. They are applied from the largest to
/// the smallest, so an insertion never moves an offset that is still pending.
/// Duplicate offsets receive a single insertion.
pub fn apply_edits(source: &str, offsets: &[usize], text: &str) -> Result<String, UnbedError> {
    let mut sorted = offsets.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = source.to_string();
    for &offset in sorted.iter().rev() {
        if offset > source.len() || !source.is_char_boundary(offset) {
            return Err(UnbedError::format(
                format!("edit offset {offset} is not a character boundary in a {}-byte file", source.len()),
                PathBuf::new(),
            ));
        }
        out.insert_str(offset, text);
    }
    Ok(out)
}

/// Result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub path: PathBuf,
    pub edits: usize,
    /// The file content after the edits and formatting.
    pub content: String,
}

/// Apply `offsets` to the file at `path`, canonicalize the result and replace
/// the file with it unless `dry_run` is set.
pub fn rewrite_file(path: &Path, offsets: &[usize], text: &str, dry_run: bool) -> Result<Rewrite, UnbedError> {
    info!("=== {} ({} matches)", path.display(), offsets.len());
    let source = std::fs::read_to_string(path).map_err(|e| UnbedError::io(path, e))?;
    let located = |e: UnbedError| match e {
        UnbedError::Syntax { msg, .. } | UnbedError::Format { msg, .. } => UnbedError::format(msg, path),
        other => other,
    };
    let edited = apply_edits(&source, offsets, text).map_err(located)?;
    let content = canonicalize(&edited).map_err(located)?;

    if dry_run {
        debug!(path = %path.display(), "dry run, not writing");
    } else {
        replace_file(path, content.as_bytes())?;
    }
    Ok(Rewrite { path: path.to_path_buf(), edits: offsets.len(), content })
}

/// Write `content` to a sibling temporary file, then rename it over `path`.
fn replace_file(path: &Path, content: &[u8]) -> Result<(), UnbedError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| UnbedError::load(format!("{} is not a file path", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.unbed-tmp", file_name.to_string_lossy()));

    let write = || -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(content)?;
        file.sync_all()?;
        if let Ok(meta) = std::fs::metadata(path) {
            std::fs::set_permissions(&tmp, meta.permissions())?;
        }
        std::fs::rename(&tmp, path)
    };
    write().map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        UnbedError::io(path, e)
    })
}
