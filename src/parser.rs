use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs;
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

/// Shared TypeScript parsing context.
///
/// The `ParserContext` resolves the TypeScript grammar once and hands out
/// syntax trees for route and schema files. It holds no per-parse state: a
/// short-lived `tree_sitter::Parser` is created for each call, so a single
/// context can be borrowed by every component that needs to parse.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::parser::ParserContext;
///
/// let ctx = ParserContext::new().unwrap();
/// let parsed = ctx.parse_source("export async function GET() {}").unwrap();
/// assert_eq!(parsed.root().kind(), "program");
/// ```
pub struct ParserContext {
    language: Language,
}

/// A parsed TypeScript source together with its syntax tree.
///
/// The tree borrows nothing; node text is resolved against the retained
/// source bytes via [`ParsedSource::text`].
#[derive(Debug)]
pub struct ParsedSource {
    source: String,
    tree: Tree,
}

impl ParserContext {
    /// Creates a parsing context for TypeScript sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the compiled-in grammar is incompatible with the
    /// linked tree-sitter runtime.
    pub fn new() -> Result<Self> {
        let language = tree_sitter_typescript::language_typescript();

        // Setting the language once up front surfaces a version mismatch
        // before any file is read.
        let mut probe = Parser::new();
        probe
            .set_language(&language)
            .context("Failed to load the TypeScript grammar")?;

        Ok(Self { language })
    }

    /// Parses TypeScript source text into a syntax tree.
    ///
    /// tree-sitter is error-tolerant: malformed input still yields a tree
    /// with error nodes rather than a failure, so downstream extraction can
    /// recover whatever is recognizable.
    pub fn parse_source(&self, source: &str) -> Result<ParsedSource> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("Failed to load the TypeScript grammar")?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("Parser produced no syntax tree"))?;

        Ok(ParsedSource {
            source: source.to_string(),
            tree,
        })
    }

    /// Reads and parses a TypeScript file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the parser yields no
    /// tree for it.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedSource> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let parsed = self
            .parse_source(&content)
            .with_context(|| format!("Failed to parse TypeScript in file: {}", path.display()))?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(parsed)
    }
}

impl ParsedSource {
    /// The root `program` node of the tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// The raw source bytes the tree was parsed from.
    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// The text a node spans.
    pub fn text(&self, node: Node) -> &str {
        node_text(node, self.bytes())
    }
}

/// Returns the UTF-8 text a node spans within `source`.
pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

/// Strips matching string-literal quotes from a text slice.
pub fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

/// Reads a string-literal node, returning its unquoted contents.
pub fn string_literal(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() == "string" {
        Some(unquote(node_text(node, source)).to_string())
    } else {
        None
    }
}

/// Returns the `/** ... */` comment immediately preceding `node`, if any.
///
/// Line comments and ordinary block comments do not count; only JSDoc-style
/// comments carry route documentation.
pub fn doc_comment_before<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    let prev = node.prev_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let text = node_text(prev, source);
    if text.starts_with("/**") {
        Some(text)
    } else {
        None
    }
}
