use anyhow::{anyhow, Result};
use log::warn;
use std::path::Path;
use tree_sitter::Node;

use crate::parser::{doc_comment_before, node_text, ParserContext};
use crate::paths::{has_path_parameter, path_parameter_names, resource_name};
use crate::scanner::HttpMethod;

/// AST-level route parser for handler files.
///
/// Where the scanner only pre-filters files textually, the `RouteParser`
/// parses each route file into a syntax tree and extracts one
/// [`RouteFunction`] per exported handler, together with its parameters and
/// documentation. The borrowed [`ParserContext`] is shared read-only across
/// all files, so per-file parsing stays independent.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::parser::ParserContext;
/// use openapi_from_routes::route_parser::RouteParser;
/// use std::path::Path;
///
/// let ctx = ParserContext::new().unwrap();
/// let parser = RouteParser::new(&ctx);
/// let route = parser
///     .parse_route_file(Path::new("src/app/api/products/route.ts"), "/products")
///     .unwrap();
/// println!("Found {} handlers", route.functions.len());
/// ```
pub struct RouteParser<'a> {
    context: &'a ParserContext,
}

/// A fully parsed route file.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
    /// The API path this file serves, e.g. `/products/{id}`
    pub path: String,
    /// One entry per exported handler, in source order
    pub functions: Vec<RouteFunction>,
}

/// A single exported HTTP handler extracted from a route file.
///
/// A route file may legally export at most one handler per verb; duplicates
/// beyond the first are dropped during parsing.
#[derive(Debug, Clone)]
pub struct RouteFunction {
    /// The HTTP method the handler serves
    pub method: HttpMethod,
    /// Request parameters the operation accepts
    pub parameters: Vec<Parameter>,
    /// One-line operation summary
    pub summary: String,
    /// Longer operation description
    pub description: String,
}

/// A request parameter attached to an operation.
///
/// Within one [`RouteFunction`] the (name, location) pairs are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// The parameter name as it appears on the wire
    pub name: String,
    /// The parameter's primitive type name (currently always `string`)
    pub param_type: String,
    /// Whether a request must supply the parameter
    pub required: bool,
    /// Where the parameter value is carried
    pub location: ParameterLocation,
    /// Human-readable description
    pub description: String,
}

/// The location a parameter value is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    /// Query string parameter (e.g., `?page=1&limit=10`)
    Query,
    /// Path parameter embedded in the URL (e.g., `/products/{id}`)
    Path,
    /// Request body field
    Body,
}

impl ParameterLocation {
    /// The lowercase `in` value used in the generated document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Body => "body",
        }
    }
}

/// Optional query parameters attached to catalog-style collection resources.
///
/// This is enrichment by convention: the catalog currently covers the product
/// family only, and resources outside it get no query parameters. Extending
/// coverage to another resource family means adding its entries here.
const PRODUCT_QUERY_CATALOG: &[(&str, &str)] = &[
    ("search", "Free-text search over name and description"),
    ("status", "Filter by product status"),
    ("category", "Filter by category"),
    ("brand", "Filter by brand"),
    ("condition", "Filter by product condition"),
    ("supplierId", "Filter by supplier identifier"),
    ("warehouseId", "Filter by warehouse identifier"),
    ("sortBy", "Field to sort the result set by"),
    ("page", "Page number for pagination"),
    ("limit", "Maximum number of items per page"),
];

impl<'a> RouteParser<'a> {
    /// Creates a route parser borrowing a shared parsing context.
    pub fn new(context: &'a ParserContext) -> Self {
        Self { context }
    }

    /// Parses one route file and extracts its exported handlers.
    ///
    /// Handlers whose extraction fails are logged and excluded; the rest of
    /// the file's functions are still returned. Duplicate verbs keep the
    /// first occurrence in source order.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the route file on disk
    /// * `api_path` - The API path the file serves, from the scanner
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed at all.
    pub fn parse_route_file(&self, file_path: &Path, api_path: &str) -> Result<ParsedRoute> {
        let parsed = self.context.parse_file(file_path)?;
        let source = parsed.bytes();

        let mut functions: Vec<RouteFunction> = Vec::new();
        for node in collect_handler_nodes(parsed.root(), source) {
            match parse_route_function(node, source, api_path) {
                Ok(function) => {
                    if functions.iter().any(|f| f.method == function.method) {
                        warn!(
                            "Duplicate {} handler in {}, keeping the first",
                            function.method.as_str(),
                            file_path.display()
                        );
                    } else {
                        functions.push(function);
                    }
                }
                Err(e) => {
                    warn!("Skipping handler in {}: {}", file_path.display(), e);
                }
            }
        }

        Ok(ParsedRoute {
            path: api_path.to_string(),
            functions,
        })
    }
}

/// Collects exported async verb-named function declarations.
///
/// The traversal is a pure recursion over the whole tree returning its result
/// list; handler bodies themselves are not descended into.
fn collect_handler_nodes<'t>(node: Node<'t>, source: &[u8]) -> Vec<Node<'t>> {
    if is_exported_handler(node, source) {
        return vec![node];
    }

    let mut found = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        found.extend(collect_handler_nodes(child, source));
    }
    found
}

/// Returns true for `export async function VERB(...)` declarations.
fn is_exported_handler(node: Node, source: &[u8]) -> bool {
    if node.kind() != "function_declaration" {
        return false;
    }
    if !node
        .parent()
        .map_or(false, |p| p.kind() == "export_statement")
    {
        return false;
    }
    if !is_async(node) {
        return false;
    }

    node.child_by_field_name("name")
        .map_or(false, |name| {
            HttpMethod::from_name(node_text(name, source)).is_some()
        })
}

/// Checks for the `async` keyword among a function's anonymous children.
fn is_async(node: Node) -> bool {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "async" {
            return true;
        }
    }
    false
}

/// Builds one [`RouteFunction`] from a handler declaration node.
fn parse_route_function(node: Node, source: &[u8], api_path: &str) -> Result<RouteFunction> {
    let name_node = node
        .child_by_field_name("name")
        .ok_or_else(|| anyhow!("handler function has no name"))?;
    let method = HttpMethod::from_name(node_text(name_node, source))
        .ok_or_else(|| anyhow!("handler name is not a recognized HTTP method"))?;

    let parameters = extract_request_parameters(api_path);

    let with_id = has_path_parameter(api_path);
    let resource = resource_name(api_path);
    let mut summary = default_summary(method, with_id, &resource);
    let mut description = default_description(method, with_id, &resource);

    // Documentation annotations on the export win over the templates.
    if let Some(export) = node.parent() {
        if let Some(comment) = doc_comment_before(export, source) {
            let annotations = DocAnnotations::parse(comment);
            if let Some(s) = annotations.summary {
                summary = s;
            }
            if let Some(d) = annotations.description {
                description = d;
            }
        }
    }

    Ok(RouteFunction {
        method,
        parameters,
        summary,
        description,
    })
}

/// Synthesizes the parameter list for an operation from its API path.
///
/// Path parameters come from the brace-delimited placeholders, left to
/// right. Query parameters are appended from the fixed catalog when the path
/// belongs to a covered resource family; they are never derived from the
/// handler body.
pub fn extract_request_parameters(api_path: &str) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::new();

    for name in path_parameter_names(api_path) {
        let duplicate = parameters
            .iter()
            .any(|p| p.name == name && p.location == ParameterLocation::Path);
        if duplicate {
            continue;
        }
        parameters.push(Parameter {
            description: format!("{} identifier", name),
            name,
            param_type: "string".to_string(),
            required: true,
            location: ParameterLocation::Path,
        });
    }

    if api_path.contains("products") {
        for (name, description) in PRODUCT_QUERY_CATALOG {
            parameters.push(Parameter {
                name: (*name).to_string(),
                param_type: "string".to_string(),
                required: false,
                location: ParameterLocation::Query,
                description: (*description).to_string(),
            });
        }
    }

    parameters
}

/// Template summary for a handler without explicit documentation.
fn default_summary(method: HttpMethod, with_id: bool, resource: &str) -> String {
    match method {
        HttpMethod::Get if with_id => format!("Get {}", resource),
        HttpMethod::Get => format!("List {}", resource),
        HttpMethod::Post => format!("Create {}", resource),
        HttpMethod::Put => format!("Update {}", resource),
        HttpMethod::Patch => format!("Partially update {}", resource),
        HttpMethod::Delete => format!("Delete {}", resource),
        _ => format!("{} {}", method.as_str(), resource),
    }
}

/// Template description mirroring [`default_summary`] with one more sentence
/// of detail.
fn default_description(method: HttpMethod, with_id: bool, resource: &str) -> String {
    match method {
        HttpMethod::Get if with_id => format!("Retrieve a specific {} by ID", resource),
        HttpMethod::Get => format!("Retrieve a list of {} records", resource),
        HttpMethod::Post => format!("Create a new {}", resource),
        HttpMethod::Put => format!("Update an existing {}", resource),
        HttpMethod::Patch => format!("Partially update an existing {}", resource),
        HttpMethod::Delete => format!("Delete an existing {}", resource),
        _ => format!("{} operation on {}", method.as_str(), resource),
    }
}

/// `@summary` / `@description` annotations read from a JSDoc comment.
#[derive(Debug, Default, PartialEq, Eq)]
struct DocAnnotations {
    summary: Option<String>,
    description: Option<String>,
}

impl DocAnnotations {
    /// Parses a `/** ... */` block; the first occurrence of each tag wins.
    fn parse(comment: &str) -> Self {
        let mut annotations = Self::default();

        for line in comment.lines() {
            let line = line
                .trim()
                .trim_start_matches("/**")
                .trim_end_matches("*/")
                .trim()
                .trim_start_matches('*')
                .trim();

            if let Some(rest) = tag_value(line, "@summary") {
                if !rest.is_empty() && annotations.summary.is_none() {
                    annotations.summary = Some(rest.to_string());
                }
            } else if let Some(rest) = tag_value(line, "@description") {
                if !rest.is_empty() && annotations.description.is_none() {
                    annotations.description = Some(rest.to_string());
                }
            }
        }

        annotations
    }
}

/// Returns the trimmed text after `tag` when the line starts with exactly
/// that tag word. A longer tag sharing the prefix (`@summarize`,
/// `@descriptions`) does not match.
fn tag_value<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(tag)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}
