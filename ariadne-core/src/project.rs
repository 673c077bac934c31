// The project: the unit of analysis and the API surface consumed by CLIs
// and MCP tools.
//
// A project owns its file cache, scope graphs, resolutions, and
// reachability facts exclusively; nothing is shared between projects
// except the read-only language registry. Each mutation re-indexes the
// touched file, re-resolves the conservatively-affected reference set
// (the changed file, every file importing it transitively, and every file
// touching a name the changed file defines), and leaves the call graph to
// be rebuilt from resolutions on demand.
//
// Cancellation is checked between files; a cancelled operation commits
// nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use ariadne_graphs::call_graph::{CallGraph, CallGraphOptions, build_call_graph};
use ariadne_graphs::languages::LanguageRegistry;
use ariadne_graphs::module_resolver::{FileSet, ModuleResolver};
use ariadne_graphs::resolver::{Resolution, Resolver};
use ariadne_graphs::scope_graph::{Definition, ReferenceId, ScopeGraph, SymbolId};
use ariadne_graphs::type_tracker::IndirectReachability;
use ariadne_graphs::{Edit, TextRange};

use crate::cache::{self, FileEntry};
use crate::config::AnalyzerConfig;
use crate::error::{AriadneError, Result};

// ── Supporting types ──────────────────────────────────────────────────

/// One source file handed to the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

/// Shared cancellation handle. Phases check it between files; a cancelled
/// operation surfaces [`AriadneError::Cancelled`] and commits nothing.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A reference site, as reported by `find_references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub range: TextRange,
}

/// Source text plus attached documentation for a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContext {
    pub source: String,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
}

/// Aggregate counters for dashboards and logging.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProjectStats {
    pub files: usize,
    pub definitions: usize,
    pub references: usize,
    pub resolved_references: usize,
    pub unresolved_references: usize,
}

// ── Project ───────────────────────────────────────────────────────────

/// An analyzed project: tracked files, their scope graphs, and the
/// project-wide resolution state.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: AnalyzerConfig,
    entries: BTreeMap<PathBuf, FileEntry>,
    graphs: BTreeMap<PathBuf, ScopeGraph>,
    resolutions: BTreeMap<PathBuf, Vec<Resolution>>,
    reachability: BTreeMap<PathBuf, IndirectReachability>,
    cancel: CancellationFlag,
}

impl Project {
    pub fn new(root: &Path) -> Self {
        Self::with_config(root, AnalyzerConfig::default())
    }

    pub fn with_config(root: &Path, config: AnalyzerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            entries: BTreeMap::new(),
            graphs: BTreeMap::new(),
            resolutions: BTreeMap::new(),
            reachability: BTreeMap::new(),
            cancel: CancellationFlag::default(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(AriadneError::Cancelled)
        } else {
            Ok(())
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────

    /// Add or replace one file. With an [`Edit`], the cached tree is edited
    /// and handed back to the parser for incremental re-parsing; the scope
    /// graph is rebuilt either way and the affected references re-resolved.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn add_or_update_file(
        &mut self,
        path: &Path,
        content: &str,
        edit: Option<&Edit>,
    ) -> Result<()> {
        self.ensure_not_cancelled()?;
        let Some(lang) = LanguageRegistry::global().for_file(path) else {
            return Err(AriadneError::UnsupportedLanguage(path.display().to_string()));
        };

        // Names the old version contributed, for conservative invalidation.
        let mut affected = self.graphs.get(path).map(names_of).unwrap_or_default();

        let old_tree = match (edit, self.entries.get_mut(path)) {
            (Some(edit), Some(entry)) => entry.tree.as_mut().map(|tree| {
                tree.edit(&tree_sitter::InputEdit::from(edit));
                tree.clone()
            }),
            _ => None,
        };

        let indexed = cache::index_file(
            lang.as_ref(),
            path,
            content.to_string(),
            old_tree.as_ref(),
            self.config.parser.max_file_bytes,
            self.config.parser.split_oversize_files,
        );

        affected.extend(names_of(&indexed.graph));
        self.entries.insert(path.to_path_buf(), indexed.entry);
        self.graphs.insert(path.to_path_buf(), indexed.graph);

        self.re_resolve(BTreeSet::from([path.to_path_buf()]), affected)
    }

    /// Bulk ingestion. Parsing and per-file indexing of distinct files are
    /// data-parallel; resolution runs once afterwards. Files with an
    /// unsupported extension are skipped with a diagnostic.
    #[instrument(skip_all, fields(count = files.len()))]
    pub fn add_files(&mut self, files: Vec<SourceFile>) -> Result<()> {
        self.ensure_not_cancelled()?;
        let parser_config = self.config.parser.clone();

        let indexed: Vec<(PathBuf, cache::IndexedFile)> = files
            .into_par_iter()
            .filter_map(|file| {
                let Some(lang) = LanguageRegistry::global().for_file(&file.path) else {
                    warn!(path = %file.path.display(), "unsupported language, skipped");
                    return None;
                };
                let out = cache::index_file(
                    lang.as_ref(),
                    &file.path,
                    file.content,
                    None,
                    parser_config.max_file_bytes,
                    parser_config.split_oversize_files,
                );
                Some((file.path, out))
            })
            .collect();

        self.ensure_not_cancelled()?;
        for (path, file) in indexed {
            self.entries.insert(path.clone(), file.entry);
            self.graphs.insert(path, file.graph);
        }

        info!(files = self.graphs.len(), "project indexed");
        self.resolve_all()
    }

    /// Drop a file; references into it become unresolved.
    pub fn remove_file(&mut self, path: &Path) -> Result<()> {
        self.ensure_not_cancelled()?;
        let Some(graph) = self.graphs.remove(path) else {
            return Ok(());
        };
        self.entries.remove(path);
        self.resolutions.remove(path);
        self.reachability.remove(path);

        let affected = names_of(&graph);
        self.re_resolve(BTreeSet::from([path.to_path_buf()]), affected)
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn get_scope_graph(&self, path: &Path) -> Option<&ScopeGraph> {
        self.graphs.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.graphs.keys()
    }

    /// Every reference site that resolves to `symbol`, in (file, source)
    /// order.
    pub fn find_references(&self, symbol: &SymbolId) -> Vec<Location> {
        let mut out = Vec::new();
        for (path, resolutions) in &self.resolutions {
            let Some(graph) = self.graphs.get(path) else {
                continue;
            };
            let ranges: HashMap<&ReferenceId, TextRange> = graph
                .references
                .iter()
                .map(|r| (&r.id, r.range))
                .collect();
            for resolution in resolutions {
                if resolution.candidates.iter().any(|c| c == symbol) {
                    if let Some(range) = ranges.get(&resolution.reference) {
                        out.push(Location {
                            file: path.clone(),
                            range: *range,
                        });
                    }
                }
            }
        }
        out
    }

    /// The definitions the identifier at (row, column) refers to. On a
    /// definition itself, returns that definition.
    pub fn go_to_definition(&self, path: &Path, row: usize, column: usize) -> Vec<Definition> {
        let Some(graph) = self.graphs.get(path) else {
            return Vec::new();
        };

        if let Some(reference) = graph.reference_at(row, column) {
            if let Some(resolutions) = self.resolutions.get(path) {
                if let Some(resolution) = resolutions
                    .iter()
                    .find(|r| r.reference == reference.id)
                {
                    let defs: Vec<Definition> = resolution
                        .candidates
                        .iter()
                        .filter_map(|id| self.definition(id).cloned())
                        .collect();
                    if !defs.is_empty() {
                        return defs;
                    }
                }
            }
        }

        graph
            .definition_at(row, column)
            .cloned()
            .into_iter()
            .collect()
    }

    fn definition(&self, id: &SymbolId) -> Option<&Definition> {
        self.graphs
            .values()
            .flat_map(|g| g.definitions.iter())
            .find(|d| &d.id == id)
    }

    /// Build the project call graph from the current resolutions.
    pub fn get_call_graph(&self, options: Option<CallGraphOptions>) -> Result<CallGraph> {
        self.ensure_not_cancelled()?;
        let options = options.unwrap_or_default();

        let mut reachability = IndirectReachability::default();
        for file_reach in self.reachability.values() {
            reachability.merge(file_reach.clone());
        }

        let mut graph = build_call_graph(&self.graphs, &self.resolutions, &reachability, &options);

        if !self.config.entry_points.include_tests {
            let nodes = &graph.nodes;
            graph
                .entry_points
                .retain(|id| nodes.get(id).is_none_or(|n| !n.definition.is_test));
        }
        Ok(graph)
    }

    /// The definition's source slice plus its docstring and decorators.
    pub fn get_source_with_context(&self, definition: &Definition) -> Option<SourceContext> {
        let (path, _) = self
            .graphs
            .iter()
            .find(|(_, g)| g.definitions.iter().any(|d| d.id == definition.id))?;
        let entry = self.entries.get(path)?;
        let range = definition.enclosing_range.unwrap_or(definition.range);
        let source = entry.source.get(range.start_byte..range.end_byte)?.to_string();
        Some(SourceContext {
            source,
            docstring: definition.docstring.clone(),
            decorators: definition.decorators.clone(),
        })
    }

    pub fn stats(&self) -> ProjectStats {
        let definitions = self.graphs.values().map(|g| g.definitions.len()).sum();
        let references = self.graphs.values().map(|g| g.references.len()).sum();
        let resolved_references = self
            .resolutions
            .values()
            .flatten()
            .filter(|r| !r.candidates.is_empty())
            .count();
        ProjectStats {
            files: self.graphs.len(),
            definitions,
            references,
            resolved_references,
            unresolved_references: references - resolved_references.min(references),
        }
    }

    // ── Resolution ────────────────────────────────────────────────────

    fn resolve_all(&mut self) -> Result<()> {
        let resolver = Resolver::new(&self.graphs, &self.root, self.config.resolver_config());
        let mut computed = Vec::new();
        for path in self.graphs.keys() {
            self.ensure_not_cancelled()?;
            let (resolutions, reachability) = resolver.resolve_file(path);
            computed.push((path.clone(), resolutions, reachability));
        }
        drop(resolver);
        self.commit(computed);
        Ok(())
    }

    /// Re-resolve the conservative over-approximation of references whose
    /// resolution could depend on the changed files: the files themselves,
    /// every file importing an affected file (transitively, to cover
    /// aliased re-export chains), and every file touching an affected name.
    fn re_resolve(&mut self, changed: BTreeSet<PathBuf>, mut names: BTreeSet<String>) -> Result<()> {
        let files = FileSet::from_paths(self.graphs.keys().cloned());
        let modules = ModuleResolver::new(&self.root);

        let mut affected_files = changed;
        loop {
            let mut grew = false;
            for (path, graph) in &self.graphs {
                if affected_files.contains(path) {
                    continue;
                }
                let depends = graph.imports.iter().any(|import| {
                    modules
                        .resolve(&files, path, &import.module_path, &graph.language)
                        .is_some_and(|target| affected_files.contains(&target))
                });
                if depends {
                    affected_files.insert(path.clone());
                    names.extend(graph.imports.iter().map(|i| i.local_name.clone()));
                    names.extend(graph.export_aliases.iter().map(|a| a.exported.clone()));
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let resolver = Resolver::new(&self.graphs, &self.root, self.config.resolver_config());
        let mut computed = Vec::new();
        for (path, graph) in &self.graphs {
            self.ensure_not_cancelled()?;
            let needs = affected_files.contains(path)
                || !self.resolutions.contains_key(path)
                || graph.references.iter().any(|r| names.contains(&r.name));
            if needs {
                let (resolutions, reachability) = resolver.resolve_file(path);
                computed.push((path.clone(), resolutions, reachability));
            }
        }
        drop(resolver);

        debug!(
            files = computed.len(),
            names = names.len(),
            "re-resolved after change"
        );
        self.commit(computed);

        // Resolution entries for removed files are stale.
        let graphs = &self.graphs;
        self.resolutions.retain(|path, _| graphs.contains_key(path));
        self.reachability.retain(|path, _| graphs.contains_key(path));
        Ok(())
    }

    fn commit(&mut self, computed: Vec<(PathBuf, Vec<Resolution>, IndirectReachability)>) {
        for (path, resolutions, reachability) in computed {
            self.resolutions.insert(path.clone(), resolutions);
            self.reachability.insert(path, reachability);
        }
    }
}

/// Names a file contributes to resolution anywhere: its definitions, its
/// export aliases, and its import bindings.
fn names_of(graph: &ScopeGraph) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = graph.definitions.iter().map(|d| d.name.clone()).collect();
    names.extend(graph.export_aliases.iter().map(|a| a.exported.clone()));
    names.extend(graph.imports.iter().map(|i| i.local_name.clone()));
    names
}

// ── Tests ─────────────────────────────────────────────────────────────
