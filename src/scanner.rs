use anyhow::Result;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// HTTP methods recognized as exported route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Resolves an exported handler name such as `GET` to a method.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// The uppercase wire name, matching the exported function name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// The lowercase form used as an operation key in the generated document.
    pub fn lowercase(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

/// Matches exported route handlers, e.g. `export async function GET(...)`.
static HANDLER_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+async\s+function\s+(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b")
        .expect("handler export pattern is valid")
});

/// File scanner for traversing a file-based routing tree.
///
/// The `RouteScanner` recursively walks a routes directory (typically
/// `src/app/api` in the scanned project) to find all route handler files.
/// A route file is named `route.ts` or `route.js`, and its position in the
/// directory tree determines the API path it serves: directory names become
/// path segments, and bracketed directories such as `[id]` become path
/// parameters.
///
/// Hidden directories (those starting with `.`) and `node_modules` are
/// skipped automatically.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::scanner::RouteScanner;
/// use std::path::PathBuf;
///
/// let scanner = RouteScanner::new(PathBuf::from("./my-app/src/app/api"));
/// let result = scanner.scan_routes().unwrap();
/// println!("Found {} route files", result.routes.len());
/// ```
pub struct RouteScanner {
    routes_root: PathBuf,
}

/// A discovered route file together with the API path it serves.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Absolute or root-relative path to the route file on disk
    pub file_path: PathBuf,
    /// Location of the file relative to the routes root, with `/` separators
    pub relative_path: String,
    /// The API path derived from the file location, e.g. `/products/{id}`
    pub api_path: String,
    /// HTTP methods exported by the file, in order of appearance
    pub http_methods: Vec<HttpMethod>,
}

/// Result of a routes directory scan.
///
/// Contains the discovered routes and any warnings encountered during
/// scanning.
pub struct ScanResult {
    /// Discovered routes, sorted by API path
    pub routes: Vec<RouteInfo>,
    /// Warning messages for any issues encountered (e.g., unreadable files)
    pub warnings: Vec<String>,
}

impl RouteScanner {
    /// Creates a new `RouteScanner` for the specified routes directory.
    ///
    /// # Arguments
    ///
    /// * `routes_root` - The directory containing the file-based routing tree
    pub fn new(routes_root: PathBuf) -> Self {
        Self { routes_root }
    }

    /// Scans the routing tree and collects all route handler files.
    ///
    /// This method recursively traverses the directory tree starting from the
    /// routes root, collecting every `route.ts` / `route.js` file and deriving
    /// its API path. It automatically skips:
    /// - Hidden directories (starting with `.`)
    /// - The `node_modules` directory
    ///
    /// Route files that cannot be read, or that export no recognized handler
    /// functions, are skipped; scanning continues with the remaining files.
    /// The returned routes are sorted by API path so repeated scans of the
    /// same tree produce the same order.
    ///
    /// # Returns
    ///
    /// Returns a `ScanResult` containing the discovered routes and any
    /// warnings.
    pub fn scan_routes(&self) -> Result<ScanResult> {
        let mut routes = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.routes_root)
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.routes_root {
                    return true;
                }

                // Skip hidden directories and node_modules
                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                let is_node_modules = file_name == "node_modules";

                !is_hidden && !is_node_modules
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();

                    if path.is_file() && is_route_file(path) {
                        match self.read_route(path) {
                            Ok(Some(route)) => routes.push(route),
                            Ok(None) => {
                                debug!("No exported handlers in {}, skipping", path.display());
                            }
                            Err(e) => {
                                let warning =
                                    format!("Failed to read route file {}: {}", path.display(), e);
                                warn!("{}", warning);
                                warnings.push(warning);
                            }
                        }
                    }
                }
                Err(e) => {
                    // Record warning for inaccessible directories/files
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        routes.sort_by(|a, b| {
            a.api_path
                .cmp(&b.api_path)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });

        // Two files can map to the same API path only when route.ts and
        // route.js share a directory; the first one in sort order wins.
        routes.dedup_by(|b, a| {
            if a.api_path == b.api_path {
                let warning = format!(
                    "Duplicate route files for {}, ignoring {}",
                    a.api_path,
                    b.file_path.display()
                );
                warn!("{}", warning);
                warnings.push(warning);
                true
            } else {
                false
            }
        });

        Ok(ScanResult { routes, warnings })
    }

    /// Reads one route file and extracts its handler methods.
    ///
    /// Returns `Ok(None)` when the file exports no recognized handlers.
    fn read_route(&self, path: &Path) -> Result<Option<RouteInfo>> {
        let source = fs::read_to_string(path)?;
        let http_methods = extract_http_methods(&source);
        if http_methods.is_empty() {
            return Ok(None);
        }

        let relative = path.strip_prefix(&self.routes_root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");

        Ok(Some(RouteInfo {
            file_path: path.to_path_buf(),
            api_path: file_path_to_api_path(&relative),
            relative_path: relative,
            http_methods,
        }))
    }
}

/// Returns true for files named `route.ts` or `route.js`.
fn is_route_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|s| s.to_str()),
        Some("route.ts") | Some("route.js")
    )
}

/// Converts a route file path into the API path it serves.
///
/// Directory names become path segments and bracketed directories become
/// path parameters. A leading `api` segment is dropped, so the conversion
/// works both for paths relative to the api directory and for paths that
/// still include it:
///
/// - `api/products/[id]/route.ts` becomes `/products/{id}`
/// - `api/route.ts` becomes `/`
/// - `orders/[orderId]/items/route.ts` becomes `/orders/{orderId}/items`
pub fn file_path_to_api_path(file_path: &str) -> String {
    let mut segments: Vec<&str> = file_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    // Drop the route file itself.
    if segments
        .last()
        .map_or(false, |s| s.ends_with(".ts") || s.ends_with(".js"))
    {
        segments.pop();
    }

    if segments.first() == Some(&"api") {
        segments.remove(0);
    }

    let converted: Vec<String> = segments.iter().map(|s| convert_segment(s)).collect();

    if converted.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", converted.join("/"))
    }
}

/// Rewrites a bracketed directory name into a brace-delimited path parameter.
fn convert_segment(segment: &str) -> String {
    if segment.starts_with('[') && segment.ends_with(']') && segment.len() > 2 {
        format!("{{{}}}", &segment[1..segment.len() - 1])
    } else {
        segment.to_string()
    }
}

/// Extracts the HTTP methods a route file exports handlers for.
///
/// Scans the source for `export async function <METHOD>` declarations and
/// returns the matched methods in order of first appearance, without
/// duplicates. This is a fast textual pre-scan; the parser later confirms
/// each handler against the syntax tree.
pub fn extract_http_methods(source: &str) -> Vec<HttpMethod> {
    let mut methods = Vec::new();
    for capture in HANDLER_EXPORT.captures_iter(source) {
        if let Some(method) = HttpMethod::from_name(&capture[1]) {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_route(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_finds_route_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        write_route(
            root,
            "products/route.ts",
            "export async function GET() {}\nexport async function POST() {}\n",
        );
        write_route(
            root,
            "products/[id]/route.ts",
            "export async function GET() {}\nexport async function PUT() {}\nexport async function DELETE() {}\n",
        );
        write_route(root, "route.ts", "export async function GET() {}\n");
        // Not a route file, must be ignored.
        write_route(root, "products/helpers.ts", "export async function GET() {}\n");

        let scanner = RouteScanner::new(root.to_path_buf());
        let result = scanner.scan_routes().unwrap();

        assert!(result.warnings.is_empty());
        let paths: Vec<&str> = result.routes.iter().map(|r| r.api_path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/products", "/products/{id}"]);

        assert_eq!(
            result.routes[1].http_methods,
            vec![HttpMethod::Get, HttpMethod::Post]
        );
        assert_eq!(
            result.routes[2].http_methods,
            vec![HttpMethod::Get, HttpMethod::Put, HttpMethod::Delete]
        );
        assert_eq!(result.routes[2].relative_path, "products/[id]/route.ts");
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = RouteScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan_routes().unwrap();

        assert_eq!(result.routes.len(), 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_hidden_and_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        write_route(root, ".next/route.ts", "export async function GET() {}\n");
        write_route(
            root,
            "node_modules/pkg/route.ts",
            "export async function GET() {}\n",
        );
        write_route(root, "orders/route.ts", "export async function GET() {}\n");

        let scanner = RouteScanner::new(root.to_path_buf());
        let result = scanner.scan_routes().unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].api_path, "/orders");
    }

    #[test]
    fn test_scan_skips_files_without_handlers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        write_route(root, "internal/route.ts", "export const runtime = 'edge';\n");
        write_route(root, "orders/route.ts", "export async function GET() {}\n");

        let scanner = RouteScanner::new(root.to_path_buf());
        let result = scanner.scan_routes().unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].api_path, "/orders");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_accepts_javascript_route_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        write_route(root, "legacy/route.js", "export async function GET() {}\n");

        let scanner = RouteScanner::new(root.to_path_buf());
        let result = scanner.scan_routes().unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].api_path, "/legacy");
    }

    #[test]
    fn test_scan_dedups_same_path_route_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        write_route(root, "orders/route.ts", "export async function GET() {}\n");
        write_route(root, "orders/route.js", "export async function POST() {}\n");

        let scanner = RouteScanner::new(root.to_path_buf());
        let result = scanner.scan_routes().unwrap();

        // route.js sorts first and wins; the sibling file is dropped.
        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].api_path, "/orders");
        assert_eq!(result.routes[0].http_methods, vec![HttpMethod::Post]);

        // The dropped sibling is reported to callers, not only logged.
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Duplicate route files for /orders"));
        assert!(result.warnings[0].ends_with("route.ts"));
    }

    #[test]
    fn test_file_path_to_api_path() {
        assert_eq!(file_path_to_api_path("api/products/[id]/route.ts"), "/products/{id}");
        assert_eq!(file_path_to_api_path("api/route.ts"), "/");
        assert_eq!(file_path_to_api_path("route.ts"), "/");
        assert_eq!(file_path_to_api_path("products/route.ts"), "/products");
        assert_eq!(
            file_path_to_api_path("orders/[orderId]/items/[itemId]/route.ts"),
            "/orders/{orderId}/items/{itemId}"
        );
        assert_eq!(file_path_to_api_path("legacy/route.js"), "/legacy");
    }

    #[test]
    fn test_extract_http_methods_order_and_dedup() {
        let source = r#"
            export async function POST(request: Request) {}
            export async function GET(request: Request) {}
            export async function POST(request: Request) {}
        "#;
        assert_eq!(
            extract_http_methods(source),
            vec![HttpMethod::Post, HttpMethod::Get]
        );
    }

    #[test]
    fn test_extract_http_methods_requires_exported_async_handler() {
        // Neither a bare async function nor a non-async export counts.
        let source = r#"
            async function GET(request: Request) {}
            export function DELETE(request: Request) {}
            export async function handler(request: Request) {}
        "#;
        assert_eq!(extract_http_methods(source), Vec::<HttpMethod>::new());
    }

    #[test]
    fn test_http_method_names() {
        assert_eq!(HttpMethod::from_name("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_name("PATCH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_name("get"), None);
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
        assert_eq!(HttpMethod::Delete.lowercase(), "delete");
    }
}
