use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::UnbedError;

pub const MANIFEST_FILE: &str = "unbed.toml";

/// Workspace settings read from `unbed.toml` at the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Directories, relative to the root, that are never loaded.
    pub exclude: Vec<PathBuf>,
    /// Load `_test.go` files.
    pub tests: bool,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { exclude: Vec::new(), tests: true }
    }
}

impl Manifest {
    /// Whether `rel_dir` (relative to the root) is an excluded directory or
    /// lies inside one.
    pub fn excludes(&self, rel_dir: &Path) -> bool {
        self.exclude.iter().any(|ex| rel_dir.starts_with(ex))
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlManifest {
    workspace: Option<TomlWorkspace>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlWorkspace {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default = "default_tests")]
    tests: bool,
}

fn default_tests() -> bool {
    true
}

/// Read `unbed.toml` from `root`. A missing manifest yields the defaults.
pub fn load_manifest(root: &Path) -> Result<Manifest, UnbedError> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(Manifest::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| UnbedError::io(&path, e))?;
    parse_manifest(&content, &path)
}

pub fn parse_manifest(content: &str, path: &Path) -> Result<Manifest, UnbedError> {
    let toml: TomlManifest = toml::from_str(content)
        .map_err(|e| UnbedError::manifest(format!("failed to parse {MANIFEST_FILE}: {e}"), path.to_path_buf()))?;
    let Some(ws) = toml.workspace else {
        return Ok(Manifest::default());
    };

    let mut exclude = Vec::with_capacity(ws.exclude.len());
    for entry in ws.exclude {
        let rel = PathBuf::from(entry.trim_end_matches('/'));
        let relative = rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if entry.is_empty() || !relative {
            return Err(UnbedError::manifest(
                format!("exclude entry '{entry}' must be a relative path inside the workspace"),
                path.to_path_buf(),
            ));
        }
        let normalized: PathBuf = rel.components().filter(|c| !matches!(c, Component::CurDir)).collect();
        exclude.push(normalized);
    }
    Ok(Manifest { exclude, tests: ws.tests })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Manifest, UnbedError> {
        parse_manifest(content, Path::new("unbed.toml"))
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        assert_eq!(parse("").unwrap(), Manifest::default());
        assert!(Manifest::default().tests);
    }

    #[test]
    fn workspace_section() {
        let m = parse("[workspace]\nexclude = [\"third_party\", \"./gen/\"]\ntests = false\n").unwrap();
        assert_eq!(m.exclude, vec![PathBuf::from("third_party"), PathBuf::from("gen")]);
        assert!(!m.tests);
        assert!(m.excludes(Path::new("third_party/x/y")));
        assert!(m.excludes(Path::new("gen")));
        assert!(!m.excludes(Path::new("generated")));
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = parse("[workspace]\nexcludes = []\n").unwrap_err();
        assert!(matches!(err, UnbedError::Manifest { .. }));
        assert!(err.to_string().contains("failed to parse unbed.toml"));
    }

    #[test]
    fn escaping_exclude_rejected() {
        for bad in ["../other", "/abs", ""] {
            let err = parse(&format!("[workspace]\nexclude = [\"{bad}\"]\n")).unwrap_err();
            assert!(err.to_string().contains("must be a relative path"), "{bad}: {err}");
        }
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_manifest(dir.path()).unwrap(), Manifest::default());
        std::fs::write(dir.path().join(MANIFEST_FILE), "[workspace]\ntests = false\n").unwrap();
        assert!(!load_manifest(dir.path()).unwrap().tests);
    }
}
