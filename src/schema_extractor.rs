use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tree_sitter::Node;

use crate::parser::{node_text, string_literal, unquote, ParserContext};
use crate::paths::pascal_case;

/// The table-definition builder recognized in the schema file.
const TABLE_BUILDER: &str = "pgTable";

/// The enum column builder; its second argument lists the allowed values.
const ENUM_BUILDER: &str = "pgEnum";

/// The chained modifier that marks a column as not-null.
///
/// Detection walks the whole builder chain by name, so a chain reusing the
/// same identifier for unrelated semantics would misfire. Documented
/// assumption, not type inference.
const NOT_NULL_MODIFIER: &str = "notNull";

/// An OpenAPI schema value.
///
/// One recursive shape covers component schemas, inline property schemas and
/// `$ref` stubs; unset fields stay out of the serialized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Allowed values for enum-typed strings
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Format qualifier for primitive types (e.g., "int32", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Example value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Schema {
    /// A schema with only a type.
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// A primitive schema with a format qualifier.
    pub fn typed_format(schema_type: &str, format: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: Some(format.to_string()),
            ..Self::default()
        }
    }

    /// An object schema; an empty required list is omitted entirely.
    pub fn object(properties: IndexMap<String, Schema>, required: Vec<String>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            ..Self::default()
        }
    }

    /// An array schema.
    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// A string schema restricted to fixed values.
    pub fn string_enum(values: Vec<String>) -> Self {
        Self {
            schema_type: Some("string".to_string()),
            enum_values: Some(values),
            ..Self::default()
        }
    }

    /// A `$ref` to a named component schema.
    pub fn component_ref(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{}", name)),
            ..Self::default()
        }
    }
}

/// Maps a column builder identifier to the schema shape it produces.
///
/// Adding support for another builder is a data change here, not a code
/// change in the dispatch below.
struct FieldTypeRule {
    builders: &'static [&'static str],
    schema_type: &'static str,
    format: Option<&'static str>,
}

const FIELD_TYPE_RULES: &[FieldTypeRule] = &[
    FieldTypeRule {
        builders: &["text", "varchar", "char", "uuid"],
        schema_type: "string",
        format: None,
    },
    FieldTypeRule {
        builders: &["integer", "serial"],
        schema_type: "integer",
        format: Some("int32"),
    },
    FieldTypeRule {
        builders: &["decimal", "numeric"],
        schema_type: "number",
        format: Some("decimal"),
    },
    FieldTypeRule {
        builders: &["boolean"],
        schema_type: "boolean",
        format: None,
    },
    FieldTypeRule {
        builders: &["date"],
        schema_type: "string",
        format: Some("date"),
    },
    FieldTypeRule {
        builders: &["timestamp"],
        schema_type: "string",
        format: Some("date-time"),
    },
];

/// Extracts component schemas from the table-definition source file.
///
/// The `SchemaExtractor` parses one TypeScript file declaring tables via
/// `pgTable("name", { column: builder-chain, ... })` and converts each table
/// into an OpenAPI object schema. The component name is the PascalCased
/// variable name of the declaration.
///
/// Extraction never fails: an unreadable or unparsable schema file is
/// replaced by a fixed fallback set, and the shared `Error`, `Pagination`
/// and `PaginatedResponse` schemas are merged in unconditionally so callers
/// can always reference them.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::parser::ParserContext;
/// use openapi_from_routes::schema_extractor::SchemaExtractor;
/// use std::path::PathBuf;
///
/// let ctx = ParserContext::new().unwrap();
/// let extractor = SchemaExtractor::new(PathBuf::from("src/db/schema.ts"), &ctx);
/// let schemas = extractor.extract_schemas();
/// assert!(schemas.contains_key("Error"));
/// ```
pub struct SchemaExtractor<'a> {
    schema_path: PathBuf,
    context: &'a ParserContext,
}

impl<'a> SchemaExtractor<'a> {
    /// Creates an extractor for the given schema file.
    pub fn new(schema_path: PathBuf, context: &'a ParserContext) -> Self {
        Self {
            schema_path,
            context,
        }
    }

    /// Extracts all component schemas.
    ///
    /// Returns discovered tables in declaration order, followed by the three
    /// common schemas. On schema-file failure the discovered tables are
    /// replaced by the fallback entities; the common schemas are present
    /// either way.
    pub fn extract_schemas(&self) -> IndexMap<String, Schema> {
        let mut schemas = match self.extract_table_schemas() {
            Ok(schemas) => schemas,
            Err(e) => {
                warn!(
                    "Could not extract schemas from {}: {}. Using fallback schemas",
                    self.schema_path.display(),
                    e
                );
                fallback_entity_schemas()
            }
        };

        for (name, schema) in common_schemas() {
            schemas.insert(name.to_string(), schema);
        }

        schemas
    }

    /// Parses the schema file and converts each table declaration.
    ///
    /// A single malformed table is skipped; the file failing to read or
    /// parse is the error case the caller substitutes fallbacks for.
    fn extract_table_schemas(&self) -> Result<IndexMap<String, Schema>> {
        let parsed = self.context.parse_file(&self.schema_path)?;
        let source = parsed.bytes();

        let mut schemas = IndexMap::new();
        for (name, call) in table_declarations(parsed.root(), source) {
            match parse_table_schema(call, source) {
                Ok(schema) => {
                    let component = pascal_case(&name);
                    debug!("Extracted schema {} from table '{}'", component, name);
                    schemas.insert(component, schema);
                }
                Err(e) => {
                    warn!(
                        "Skipping table '{}' in {}: {}",
                        name,
                        self.schema_path.display(),
                        e
                    );
                }
            }
        }

        Ok(schemas)
    }
}

/// Collects top-level variable declarations initialized by a table builder
/// call, in declaration order. Both exported and private declarations count.
fn table_declarations<'t>(node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
    match node.kind() {
        "program" | "export_statement" => {
            let mut found = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                found.extend(table_declarations(child, source));
            }
            found
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut found = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() != "variable_declarator" {
                    continue;
                }
                let name = match child.child_by_field_name("name") {
                    Some(name) => name,
                    None => continue,
                };
                let value = match child.child_by_field_name("value") {
                    Some(value) => value,
                    None => continue,
                };
                if is_table_builder_call(value, source) {
                    found.push((node_text(name, source).to_string(), value));
                }
            }
            found
        }
        _ => Vec::new(),
    }
}

/// Returns true for a direct `pgTable(...)` call.
fn is_table_builder_call(node: Node, source: &[u8]) -> bool {
    if node.kind() != "call_expression" {
        return false;
    }
    node.child_by_field_name("function")
        .map_or(false, |function| {
            function.kind() == "identifier" && node_text(function, source) == TABLE_BUILDER
        })
}

/// Converts one table builder call into an object schema.
///
/// The call's object-literal argument enumerates column name to builder
/// chain; each column becomes a property, and columns carrying the not-null
/// modifier join the required list.
fn parse_table_schema(call: Node, source: &[u8]) -> Result<Schema> {
    let arguments = call
        .child_by_field_name("arguments")
        .ok_or_else(|| anyhow!("table builder call has no arguments"))?;

    let mut cursor = arguments.walk();
    let columns = arguments
        .children(&mut cursor)
        .find(|c| c.kind() == "object")
        .ok_or_else(|| anyhow!("table builder call has no column object"))?;

    let mut properties = IndexMap::new();
    let mut required = Vec::new();

    let mut columns_cursor = columns.walk();
    for entry in columns.children(&mut columns_cursor) {
        if entry.kind() != "pair" {
            continue;
        }
        let key = match entry.child_by_field_name("key") {
            Some(key) => key,
            None => continue,
        };
        let value = match entry.child_by_field_name("value") {
            Some(value) => value,
            None => continue,
        };
        if value.kind() != "call_expression" {
            debug!(
                "Column '{}' is not a builder call, skipping",
                node_text(key, source)
            );
            continue;
        }

        let name = unquote(node_text(key, source)).to_string();
        if is_field_required(value, source) {
            required.push(name.clone());
        }
        properties.insert(name, field_type(value, source));
    }

    Ok(Schema::object(properties, required))
}

/// Maps a column's builder chain to its schema via the innermost builder.
fn field_type(node: Node, source: &[u8]) -> Schema {
    let (builder, call) = match innermost_builder(node, source) {
        Some(found) => found,
        None => return Schema::typed("string"),
    };

    if builder == ENUM_BUILDER {
        if let Some(values) = enum_literal_values(call, source) {
            return Schema::string_enum(values);
        }
        return Schema::typed("string");
    }

    for rule in FIELD_TYPE_RULES {
        if rule.builders.contains(&builder) {
            return match rule.format {
                Some(format) => Schema::typed_format(rule.schema_type, format),
                None => Schema::typed(rule.schema_type),
            };
        }
    }

    debug!("Unrecognized column builder '{}', defaulting to string", builder);
    Schema::typed("string")
}

/// Descends a chained builder call (`text("id").primaryKey().notNull()`) to
/// its innermost call, returning the builder identifier and that call node.
fn innermost_builder<'t, 's>(mut node: Node<'t>, source: &'s [u8]) -> Option<(&'s str, Node<'t>)> {
    loop {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => return Some((node_text(function, source), node)),
            "member_expression" => {
                node = function.child_by_field_name("object")?;
            }
            _ => return None,
        }
    }
}

/// Walks outward through a builder chain looking for the not-null modifier.
fn is_field_required(mut node: Node, source: &[u8]) -> bool {
    while node.kind() == "call_expression" {
        let function = match node.child_by_field_name("function") {
            Some(function) => function,
            None => return false,
        };
        if function.kind() != "member_expression" {
            return false;
        }
        if let Some(property) = function.child_by_field_name("property") {
            if node_text(property, source) == NOT_NULL_MODIFIER {
                return true;
            }
        }
        node = match function.child_by_field_name("object") {
            Some(object) => object,
            None => return false,
        };
    }
    false
}

/// Reads the string-literal array from an enum builder's arguments.
fn enum_literal_values(call: Node, source: &[u8]) -> Option<Vec<String>> {
    let arguments = call.child_by_field_name("arguments")?;

    let mut cursor = arguments.walk();
    let array = arguments.children(&mut cursor).find(|c| c.kind() == "array")?;

    let mut values = Vec::new();
    let mut array_cursor = array.walk();
    for child in array.children(&mut array_cursor) {
        if let Some(value) = string_literal(child, source) {
            values.push(value);
        }
    }

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// The schemas every generated document carries regardless of the source
/// file: error envelope, pagination block and the generic list wrapper.
fn common_schemas() -> Vec<(&'static str, Schema)> {
    let mut error_properties = IndexMap::new();
    error_properties.insert("error".to_string(), Schema::typed("string"));
    error_properties.insert("message".to_string(), Schema::typed("string"));
    error_properties.insert(
        "statusCode".to_string(),
        Schema::typed_format("integer", "int32"),
    );
    let error = Schema::object(
        error_properties,
        vec!["error".to_string(), "message".to_string()],
    );

    let mut pagination_properties = IndexMap::new();
    pagination_properties.insert("page".to_string(), Schema::typed_format("integer", "int32"));
    pagination_properties.insert("limit".to_string(), Schema::typed_format("integer", "int32"));
    pagination_properties.insert("total".to_string(), Schema::typed_format("integer", "int32"));
    pagination_properties.insert(
        "totalPages".to_string(),
        Schema::typed_format("integer", "int32"),
    );
    let pagination = Schema::object(
        pagination_properties,
        vec![
            "page".to_string(),
            "limit".to_string(),
            "total".to_string(),
            "totalPages".to_string(),
        ],
    );

    let mut paginated_properties = IndexMap::new();
    paginated_properties.insert("data".to_string(), Schema::array(Schema::typed("object")));
    paginated_properties.insert("pagination".to_string(), Schema::component_ref("Pagination"));
    let paginated = Schema::object(
        paginated_properties,
        vec!["data".to_string(), "pagination".to_string()],
    );

    vec![
        ("Error", error),
        ("Pagination", pagination),
        ("PaginatedResponse", paginated),
    ]
}

/// Sample entity schemas substituted when the schema file is unusable.
fn fallback_entity_schemas() -> IndexMap<String, Schema> {
    let mut product_properties = IndexMap::new();
    product_properties.insert("id".to_string(), Schema::typed("string"));
    product_properties.insert("name".to_string(), Schema::typed("string"));
    product_properties.insert("description".to_string(), Schema::typed("string"));
    product_properties.insert("price".to_string(), Schema::typed_format("number", "decimal"));
    product_properties.insert("status".to_string(), Schema::typed("string"));
    let product = Schema::object(
        product_properties,
        vec!["id".to_string(), "name".to_string()],
    );

    let mut customer_properties = IndexMap::new();
    customer_properties.insert("id".to_string(), Schema::typed("string"));
    customer_properties.insert("name".to_string(), Schema::typed("string"));
    customer_properties.insert("email".to_string(), Schema::typed("string"));
    customer_properties.insert("phone".to_string(), Schema::typed("string"));
    customer_properties.insert("address".to_string(), Schema::typed("string"));
    let customer = Schema::object(
        customer_properties,
        vec!["id".to_string(), "name".to_string()],
    );

    let mut schemas = IndexMap::new();
    schemas.insert("Product".to_string(), product);
    schemas.insert("Customer".to_string(), customer);
    schemas
}
