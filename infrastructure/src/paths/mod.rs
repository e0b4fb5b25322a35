//! Home-relative path resolution: where conduct keeps its config and spec
//! directories, and how a `project/name` spec reference on the CLI maps to
//! one on disk.
//!
//! Resolves a `dirs::config_dir().join("conduct")` root, plus the
//! `<specs-root>/<project>/<name>-<hash>/` layout a spec reference expands
//! to, and honors `CLAUDE_HOME` as an override of `XDG_CONFIG_HOME`.

use conduct_domain::ComponentId;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("spec reference '{0}' is not in 'project/name' form and is not an existing path")]
    InvalidSpecRef(String),
    #[error("no spec directory found for '{project}/{name}' under {root}")]
    NotFound { project: String, name: String, root: String },
    #[error("spec directory for '{project}/{name}' already exists at {path}")]
    AlreadyExists { project: String, name: String, path: String },
    #[error("io error resolving spec directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Root directory conduct reads its config and spec directories from.
/// `CLAUDE_HOME`, if set, overrides the default
/// `$XDG_CONFIG_HOME/conduct` (or `~/.config/conduct`) location entirely.
pub fn conduct_home() -> PathBuf {
    if let Some(home) = std::env::var_os("CLAUDE_HOME") {
        return PathBuf::from(home);
    }
    dirs::config_dir()
        .map(|d| d.join("conduct"))
        .unwrap_or_else(|| PathBuf::from(".conduct"))
}

/// `<conduct-home>/specs`, the root every `project/name` spec reference is
/// resolved against.
pub fn specs_root() -> PathBuf {
    conduct_home().join("specs")
}

/// The on-disk layout of one spec directory: `manifest.json`, `SPEC.md`,
/// `state/<run-id>.json`, `CONTEXT.md`, `DECISIONS.md`, `brainstorm/`,
/// `components/<id>.md`.
#[derive(Debug, Clone)]
pub struct SpecLayout {
    root: PathBuf,
}

impl SpecLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn spec_doc_path(&self) -> PathBuf {
        self.root.join("SPEC.md")
    }

    /// Directory holding this spec's persisted run state, one JSON file per
    /// run id (see [`conduct_domain::RunId::derive`]). `--fresh` clears this
    /// directory; a normal `run`/`resume` invocation reads the most recent
    /// file in it to pick up where a prior run left off.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn context_path(&self) -> PathBuf {
        self.root.join("CONTEXT.md")
    }

    pub fn decisions_path(&self) -> PathBuf {
        self.root.join("DECISIONS.md")
    }

    pub fn brainstorm_dir(&self) -> PathBuf {
        self.root.join("brainstorm")
    }

    pub fn components_dir(&self) -> PathBuf {
        self.root.join("components")
    }

    pub fn component_path(&self, id: &ComponentId) -> PathBuf {
        self.components_dir().join(format!("{}.md", id.as_str()))
    }

    /// Create the directory skeleton (`components/`, `brainstorm/`) for a
    /// freshly created spec. Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.components_dir())?;
        std::fs::create_dir_all(self.brainstorm_dir())?;
        Ok(())
    }
}

/// Resolve a spec reference — either `project/name` against [`specs_root`],
/// or a full path that already exists — to its spec directory.
pub fn resolve_spec_ref(spec: &str) -> Result<SpecLayout, PathError> {
    let as_path = PathBuf::from(spec);
    if as_path.is_absolute() && as_path.exists() {
        return Ok(SpecLayout::new(as_path));
    }

    let (project, name) = spec
        .split_once('/')
        .ok_or_else(|| PathError::InvalidSpecRef(spec.to_string()))?;

    let project_dir = specs_root().join(project);
    let prefix = format!("{name}-");

    if project_dir.is_dir() {
        let mut matches: Vec<PathBuf> = std::fs::read_dir(&project_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(&prefix))
                        .unwrap_or(false)
            })
            .collect();
        matches.sort();
        if let Some(found) = matches.into_iter().next_back() {
            return Ok(SpecLayout::new(found));
        }
    }

    Err(PathError::NotFound {
        project: project.to_string(),
        name: name.to_string(),
        root: specs_root().display().to_string(),
    })
}

/// Create a fresh spec directory for `project/name`, deriving its
/// 8-hex-character suffix from the pair plus `created` (a caller-supplied
/// timestamp — path resolution never reads the clock itself, matching the
/// domain layer's own discipline around `RunId::derive`).
pub fn create_spec_dir(project: &str, name: &str, created: &str) -> Result<SpecLayout, PathError> {
    let project_dir = specs_root().join(project);
    std::fs::create_dir_all(&project_dir)?;

    let prefix = format!("{name}-");
    if project_dir.is_dir() {
        let already = std::fs::read_dir(&project_dir)?
            .filter_map(|entry| entry.ok())
            .any(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|n| n.starts_with(&prefix))
                    .unwrap_or(false)
            });
        if already {
            return Err(PathError::AlreadyExists {
                project: project.to_string(),
                name: name.to_string(),
                path: project_dir.display().to_string(),
            });
        }
    }

    let hash = hash_suffix(project, name, created);
    let dir_name = format!("{name}-{hash}");
    let root = project_dir.join(dir_name);
    std::fs::create_dir_all(&root)?;

    let layout = SpecLayout::new(root);
    layout.ensure_dirs()?;
    Ok(layout)
}

/// List every spec directory under `specs_root()`, optionally scoped to
/// one project.
pub fn list_spec_dirs(project: Option<&str>) -> std::io::Result<Vec<SpecLayout>> {
    let root = specs_root();
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let project_dirs: Vec<PathBuf> = match project {
        Some(p) => vec![root.join(p)],
        None => std::fs::read_dir(&root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
    };

    let mut specs = Vec::new();
    for dir in project_dirs {
        if !dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                specs.push(SpecLayout::new(path));
            }
        }
    }
    specs.sort_by(|a, b| a.root().cmp(b.root()));
    Ok(specs)
}

fn hash_suffix(project: &str, name: &str, created: &str) -> String {
    let mut hasher = DefaultHasher::new();
    project.hash(&mut hasher);
    name.hash(&mut hasher);
    created.hash(&mut hasher);
    format!("{:08x}", (hasher.finish() & 0xffff_ffff) as u32)
}
