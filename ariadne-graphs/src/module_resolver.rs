// Module path resolution: translate an import's textual specifier into a
// concrete project file path.
//
// Works over an in-memory set of project file paths, so resolution is pure
// and deterministic. Specifiers that point outside the project (bare npm
// packages, the Python stdlib, external crates) resolve to `None` and are
// retained as external imports; they never raise errors.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// The set of files the project currently tracks.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: BTreeSet<PathBuf>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, path: &Path) {
        self.files.insert(path.to_path_buf());
    }

    pub fn remove(&mut self, path: &Path) {
        self.files.remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }
}

/// JS/TS extension probing order.
const ECMA_EXTENSIONS: [&str; 6] = ["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Resolves import specifiers against a [`FileSet`].
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    project_root: PathBuf,
}

impl ModuleResolver {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    /// Resolve `specifier` as written in `from`, for the given language id.
    /// Returns `None` when the specifier is external or nothing matches.
    pub fn resolve(
        &self,
        files: &FileSet,
        from: &Path,
        specifier: &str,
        language: &str,
    ) -> Option<PathBuf> {
        match language {
            "typescript" | "javascript" => self.resolve_ecma(files, from, specifier),
            "python" => self.resolve_python(files, from, specifier),
            "rust" => self.resolve_rust(files, from, specifier),
            _ => None,
        }
    }

    // ── JS / TS ───────────────────────────────────────────────────────

    fn resolve_ecma(&self, files: &FileSet, from: &Path, specifier: &str) -> Option<PathBuf> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return None; // Bare specifier — external package
        }
        let base = from.parent().unwrap_or(Path::new(""));
        let joined = normalize(&base.join(specifier));

        // Specifier already carries an extension
        if files.contains(&joined) {
            return Some(joined);
        }

        for ext in ECMA_EXTENSIONS {
            let candidate = with_appended_extension(&joined, ext);
            if files.contains(&candidate) {
                return Some(candidate);
            }
        }
        for ext in ECMA_EXTENSIONS {
            let candidate = joined.join(format!("index.{ext}"));
            if files.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    // ── Python ────────────────────────────────────────────────────────

    fn resolve_python(&self, files: &FileSet, from: &Path, specifier: &str) -> Option<PathBuf> {
        let dots = specifier.chars().take_while(|&c| c == '.').count();
        let tail = &specifier[dots..];

        let mut base = if dots > 0 {
            // N leading dots: go up N-1 directories from the importing
            // file's package.
            let mut dir = from.parent().unwrap_or(Path::new("")).to_path_buf();
            for _ in 1..dots {
                dir = dir.parent().unwrap_or(Path::new("")).to_path_buf();
            }
            dir
        } else {
            self.project_root.clone()
        };

        for segment in tail.split('.').filter(|s| !s.is_empty()) {
            base.push(segment);
        }
        let base = normalize(&base);

        let as_file = with_appended_extension(&base, "py");
        if files.contains(&as_file) {
            return Some(as_file);
        }
        let as_package = base.join("__init__.py");
        if files.contains(&as_package) {
            return Some(as_package);
        }
        None
    }

    // ── Rust ──────────────────────────────────────────────────────────

    fn resolve_rust(&self, files: &FileSet, from: &Path, specifier: &str) -> Option<PathBuf> {
        let (anchor, rest) = if let Some(rest) = specifier.strip_prefix("crate::") {
            (self.crate_src_root(from), rest)
        } else if let Some(rest) = specifier.strip_prefix("super::") {
            let mut rest = rest;
            let mut dir = super_dir(from)?;
            while let Some(more) = rest.strip_prefix("super::") {
                dir = dir.parent()?.to_path_buf();
                rest = more;
            }
            (dir, rest)
        } else if let Some(rest) = specifier.strip_prefix("self::") {
            (self_dir(from)?, rest)
        } else {
            return None; // External crate path
        };

        let mut base = anchor;
        let segments: Vec<&str> = rest.split("::").filter(|s| !s.is_empty()).collect();
        let (last, dirs) = segments.split_last()?;
        for dir in dirs {
            base.push(dir);
        }

        let as_file = with_appended_extension(&base.join(last), "rs");
        if files.contains(&as_file) {
            return Some(as_file);
        }
        let as_mod = base.join(last).join("mod.rs");
        if files.contains(&as_mod) {
            return Some(as_mod);
        }
        None
    }

    /// The `src/` directory of the crate containing `from`, approximated as
    /// the nearest `src` ancestor component (falling back to the project
    /// root when the file lives outside one).
    fn crate_src_root(&self, from: &Path) -> PathBuf {
        let mut prefix = PathBuf::new();
        for component in from.components() {
            prefix.push(component);
            if matches!(component, Component::Normal(c) if c == "src") {
                return prefix;
            }
        }
        self.project_root.clone()
    }
}

/// Where the parent module's items resolve. For `a/b.rs` (module `a::b`)
/// the parent module is `a`, whose files live in `a/`; for `a/mod.rs` the
/// parent's files live one directory up. Crate roots have no `super`.
fn super_dir(from: &Path) -> Option<PathBuf> {
    let file_name = from.file_name()?.to_str()?;
    let parent = from.parent()?;
    match file_name {
        "lib.rs" | "main.rs" => None,
        "mod.rs" => Some(parent.parent()?.to_path_buf()),
        _ => Some(parent.to_path_buf()),
    }
}

/// Where `from`'s own child modules resolve: `a/b.rs` → `a/b/`, while
/// `mod.rs`/`lib.rs`/`main.rs` own their containing directory.
fn self_dir(from: &Path) -> Option<PathBuf> {
    let file_name = from.file_name()?.to_str()?;
    let parent = from.parent()?;
    if matches!(file_name, "mod.rs" | "lib.rs" | "main.rs") {
        Some(parent.to_path_buf())
    } else {
        Some(parent.join(from.file_stem()?))
    }
}

/// Append an extension without clobbering dots in the final segment
/// (`utils.helper` + `py` → `utils.helper.py`).
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────
