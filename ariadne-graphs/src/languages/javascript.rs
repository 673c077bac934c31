use std::path::Path;

use crate::Result;
use crate::scope_graph::ScopeGraph;

use super::LanguageSupport;
use super::ecma_scope::{EcmaCtx, walk_scope};
use super::helpers::ScopeGraphBuilder;
use super::typescript::is_test_path;

#[derive(Debug)]
pub struct JavaScriptSupport;

impl LanguageSupport for JavaScriptSupport {
    fn id(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn build_scope_graph(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<ScopeGraph> {
        let ctx = EcmaCtx {
            source,
            is_test_file: is_test_path(path),
        };
        let mut builder =
            ScopeGraphBuilder::new(path, self.id(), tree.root_node().range().into());
        let root = builder.root();
        walk_scope(&mut builder, &ctx, tree.root_node(), root, true);
        Ok(builder.build())
    }
}
