// Per-file cache entries and parsing, including the oversize-file path.
//
// Every tracked file keeps `{source, parse tree, scope graph}`. Updates with
// a known Edit re-invoke the parser with the edited old tree for incremental
// re-parsing. Files beyond the parser's byte ceiling are split at top-level
// declaration boundaries and indexed as virtual sub-files whose spans and
// symbol ids are rewritten to the original file; when no safe boundary
// exists the file is skipped with a diagnostic (tracked with an empty graph
// so references into it fail cleanly). Nothing is ever silently truncated.

use std::path::Path;

use tracing::{debug, warn};

use ariadne_graphs::languages::{LanguageSupport, parse_with_old_tree};
use ariadne_graphs::scope_graph::{Definition, ScopeGraph, ScopeId, SymbolId};
use ariadne_graphs::{SymbolKind, TextRange};

/// Source and parse state for one tracked file. The scope graph lives in
/// the project's graph map so the resolver can borrow all graphs at once.
#[derive(Debug)]
pub struct FileEntry {
    pub source: String,
    /// Absent when the file was indexed as split chunks or failed to parse.
    pub tree: Option<tree_sitter::Tree>,
}

/// Result of (re)indexing one file.
#[derive(Debug)]
pub struct IndexedFile {
    pub entry: FileEntry,
    pub graph: ScopeGraph,
}

/// Parse and index `source`, honoring the byte ceiling.
///
/// `old_tree` must already have had the edit applied via
/// [`tree_sitter::Tree::edit`].
pub fn index_file(
    lang: &dyn LanguageSupport,
    path: &Path,
    source: String,
    old_tree: Option<&tree_sitter::Tree>,
    max_file_bytes: usize,
    split_oversize: bool,
) -> IndexedFile {
    if source.len() <= max_file_bytes {
        return index_whole(lang, path, source, old_tree);
    }

    if split_oversize {
        if let Some(graph) = index_chunked(lang, path, &source, max_file_bytes) {
            return IndexedFile {
                entry: FileEntry { source, tree: None },
                graph,
            };
        }
    }

    warn!(
        path = %path.display(),
        size = source.len(),
        limit = max_file_bytes,
        "file exceeds parser limit and was skipped"
    );
    IndexedFile {
        entry: FileEntry { source, tree: None },
        graph: ScopeGraph::empty(path, lang.id()),
    }
}

fn index_whole(
    lang: &dyn LanguageSupport,
    path: &Path,
    source: String,
    old_tree: Option<&tree_sitter::Tree>,
) -> IndexedFile {
    match parse_with_old_tree(lang, &source, path, old_tree) {
        Ok(tree) => {
            let graph = lang
                .build_scope_graph(&tree, &source, path)
                .unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "indexing failed");
                    ScopeGraph::empty(path, lang.id())
                });
            IndexedFile {
                entry: FileEntry {
                    source,
                    tree: Some(tree),
                },
                graph,
            }
        }
        Err(e) => {
            // Parse failures still track the file, with an empty graph.
            warn!(path = %path.display(), error = %e, "parse failed");
            IndexedFile {
                entry: FileEntry { source, tree: None },
                graph: ScopeGraph::empty(path, lang.id()),
            }
        }
    }
}

// ── Oversize splitting ────────────────────────────────────────────────

/// A chunk of an oversize file: the byte/row offset where it starts, and
/// its text.
struct Chunk<'a> {
    byte_offset: usize,
    row_offset: usize,
    text: &'a str,
}

/// Index an oversize file as virtual sub-files and stitch the graphs back
/// together. Returns `None` when the file has no safe split boundaries.
fn index_chunked(
    lang: &dyn LanguageSupport,
    path: &Path,
    source: &str,
    max_bytes: usize,
) -> Option<ScopeGraph> {
    let chunks = split_top_level(source, max_bytes)?;
    debug!(path = %path.display(), chunks = chunks.len(), "splitting oversize file");

    let mut merged = ScopeGraph::empty(path, lang.id());
    merged.scopes[0].range = full_range(source);

    for chunk in &chunks {
        let Ok(tree) = parse_with_old_tree(lang, chunk.text, path, None) else {
            warn!(path = %path.display(), offset = chunk.byte_offset, "chunk parse failed, skipped");
            continue;
        };
        let Ok(mut graph) = lang.build_scope_graph(&tree, chunk.text, path) else {
            continue;
        };
        // Each chunk synthesizes its own module callable; the stitched file
        // gets exactly one, spanning the whole file.
        graph
            .definitions
            .retain(|d| !(d.kind == SymbolKind::Module && d.name == "<module>"));
        graph.shift(chunk.byte_offset, chunk.row_offset);
        merged.absorb_chunk(graph);
    }

    let file_range = full_range(source);
    merged.scopes[0].range = file_range;
    merged.definitions.push(module_definition(path, file_range));
    Some(merged)
}

fn module_definition(path: &Path, range: TextRange) -> Definition {
    Definition {
        id: SymbolId::new(SymbolKind::Module, path, &range, "<module>"),
        name: "<module>".to_string(),
        kind: SymbolKind::Module,
        range,
        enclosing_range: Some(range),
        scope: ScopeId::ROOT,
        exported: false,
        hoisted: true,
        is_test: false,
        access: None,
        container: None,
        superclasses: Vec::new(),
        type_names: Vec::new(),
        return_type: None,
        docstring: None,
        decorators: Vec::new(),
    }
}

fn full_range(source: &str) -> TextRange {
    let rows = source.lines().count();
    let last_len = source.lines().last().map_or(0, str::len);
    TextRange {
        start_byte: 0,
        end_byte: source.len(),
        start_row: 0,
        start_col: 0,
        end_row: rows.saturating_sub(1),
        end_col: last_len,
    }
}

/// Split at top-level declaration boundaries: lines whose first byte is a
/// plausible declaration start (not whitespace, not a closing bracket).
/// Greedily packs segments up to `max_bytes`. Returns `None` when any
/// segment alone exceeds the limit — there is no safe way to split.
fn split_top_level(source: &str, max_bytes: usize) -> Option<Vec<Chunk<'_>>> {
    // Byte offsets and rows of every safe boundary.
    let mut boundaries: Vec<(usize, usize)> = vec![(0, 0)];
    let mut offset = 0;
    for (row, line) in source.lines().enumerate() {
        if row > 0 && is_top_level_start(line) {
            boundaries.push((offset, row));
        }
        offset += line.len() + 1;
    }
    if boundaries.len() < 2 {
        return None;
    }

    let mut chunks = Vec::new();
    let mut start = boundaries[0];
    let mut end_byte;
    let mut i = 1;
    while i <= boundaries.len() {
        end_byte = if i < boundaries.len() {
            boundaries[i].0
        } else {
            source.len()
        };
        if end_byte - start.0 > max_bytes {
            // Close the chunk before the previous boundary
            let close_at = boundaries[i - 1];
            if close_at.0 == start.0 {
                return None; // A single segment exceeds the limit
            }
            chunks.push(Chunk {
                byte_offset: start.0,
                row_offset: start.1,
                text: &source[start.0..close_at.0],
            });
            start = close_at;
        }
        i += 1;
    }
    if start.0 < source.len() {
        chunks.push(Chunk {
            byte_offset: start.0,
            row_offset: start.1,
            text: &source[start.0..],
        });
    }

    // No chunk may exceed the limit
    if chunks.iter().any(|c| c.text.len() > max_bytes) {
        return None;
    }
    Some(chunks)
}

fn is_top_level_start(line: &str) -> bool {
    match line.bytes().next() {
        None => false,
        Some(b) => !b.is_ascii_whitespace() && !matches!(b, b'}' | b')' | b']'),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
