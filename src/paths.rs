//! Helpers for working with generated API path strings.
//!
//! An API path looks like `/products/{id}`: plain segments name resources,
//! brace-delimited segments are path parameters. The route parser and the
//! document generator both derive resource names from these paths, so the
//! rules live here once and the two derivations cannot drift apart.

use heck::ToUpperCamelCase;

/// Returns true for a brace-delimited parameter segment such as `{id}`.
pub fn is_parameter_segment(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2
}

/// Splits an API path into its non-empty segments.
pub fn path_segments(api_path: &str) -> Vec<&str> {
    api_path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Collects the parameter names of an API path in left-to-right order.
///
/// `/products/{id}/movements/{movementId}` yields `["id", "movementId"]`.
pub fn path_parameter_names(api_path: &str) -> Vec<String> {
    path_segments(api_path)
        .into_iter()
        .filter(|s| is_parameter_segment(s))
        .map(|s| s[1..s.len() - 1].to_string())
        .collect()
}

/// Returns true when the path carries at least one parameter segment.
pub fn has_path_parameter(api_path: &str) -> bool {
    path_segments(api_path)
        .iter()
        .any(|s| is_parameter_segment(s))
}

/// The last non-parameter segment of the path, naming the resource the path
/// operates on. Paths without one (such as `/`) fall back to `resource`.
pub fn last_resource_segment(api_path: &str) -> &str {
    path_segments(api_path)
        .into_iter()
        .rev()
        .find(|s| !is_parameter_segment(s))
        .unwrap_or("resource")
}

/// The first non-parameter segment of the path, used for operation tags.
pub fn first_resource_segment(api_path: &str) -> &str {
    path_segments(api_path)
        .into_iter()
        .find(|s| !is_parameter_segment(s))
        .unwrap_or("resource")
}

/// Drops one trailing `s` from a segment longer than one character.
///
/// This is a literal convention, not linguistics: `products` becomes
/// `product`, and `status` becomes `statu`. Consumers of the generated
/// document rely on the exact output, so the rule must not be "corrected".
pub fn singularize(segment: &str) -> &str {
    if segment.len() > 1 && segment.ends_with('s') {
        &segment[..segment.len() - 1]
    } else {
        segment
    }
}

/// PascalCase conversion with underscore/hyphen boundary capitalization.
pub fn pascal_case(name: &str) -> String {
    name.to_upper_camel_case()
}

/// The singularized resource name for an API path, as used in operation
/// summaries: `/products/{id}` yields `product`.
pub fn resource_name(api_path: &str) -> String {
    singularize(last_resource_segment(api_path)).to_string()
}

/// The PascalCase component-schema name a path resolves to:
/// `/products/{id}` yields `Product`.
pub fn resource_component_name(api_path: &str) -> String {
    pascal_case(singularize(last_resource_segment(api_path)))
}
