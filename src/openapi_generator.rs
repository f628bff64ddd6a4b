use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::paths::{first_resource_segment, has_path_parameter, pascal_case, resource_component_name};
use crate::route_parser::{ParameterLocation, ParsedRoute, RouteFunction, RouteParser};
use crate::scanner::{HttpMethod, RouteScanner};
use crate::schema_extractor::{Schema, SchemaExtractor};

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// API version
    pub version: String,
}

/// OpenAPI Server object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Base URL all paths are relative to
    pub url: String,
    /// Human-readable server description
    pub description: String,
}

/// OpenAPI Operation object - one verb on one path.
///
/// Summary, description, tags, parameters and responses are always present
/// in the serialized document, even when parameters is empty; only the
/// request body is conditional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    pub summary: String,
    /// Operation description
    pub description: String,
    /// Grouping tags; exactly one is generated per operation
    pub tags: Vec<String>,
    /// Parameters (path and query)
    pub parameters: Vec<ParameterObject>,
    /// Request body, for mutating verbs only
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterObject {
    /// Parameter name
    pub name: String,
    /// Parameter location (path or query)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
    /// Parameter description
    pub description: String,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content; absent for bodyless responses such as 204
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    /// Component schema definitions
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Server list
    pub servers: Vec<Server>,
    /// Paths mapping API path to lowercase verb to operation
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    /// Components (schemas)
    pub components: Components,
}

/// OpenAPI document generator.
///
/// The `OpenApiGenerator` orchestrates the whole pipeline: it scans the
/// routes tree, parses each discovered route file, extracts component
/// schemas once, and assembles everything into a single [`OpenApiSpec`]
/// value. The transform is a pure single pass; every serialized map is an
/// `IndexMap` filled in deterministic order, so an unchanged source tree
/// always yields a byte-identical document.
///
/// Individual unreadable route files are logged and dropped. Any failure
/// beyond that is propagated: a caller either receives a complete document
/// or an error, never a partial one.
pub struct OpenApiGenerator<'a> {
    scanner: RouteScanner,
    parser: RouteParser<'a>,
    extractor: SchemaExtractor<'a>,
    info: Info,
    servers: Vec<Server>,
}

impl<'a> OpenApiGenerator<'a> {
    /// Creates a generator over the three pipeline components with the
    /// default info and servers block.
    pub fn new(
        scanner: RouteScanner,
        parser: RouteParser<'a>,
        extractor: SchemaExtractor<'a>,
    ) -> Self {
        Self {
            scanner,
            parser,
            extractor,
            info: Info {
                title: "Business Management API".to_string(),
                description: Some(
                    "Automatically generated API documentation for quotations, invoices, \
                     deliveries, and inventory."
                        .to_string(),
                ),
                version: "1.0.0".to_string(),
            },
            servers: vec![Server {
                url: "/api".to_string(),
                description: "Application API root".to_string(),
            }],
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            description,
            version,
        };
        self
    }

    /// Runs the full pipeline and assembles the document.
    ///
    /// # Errors
    ///
    /// Returns an error when generation cannot produce a complete document;
    /// no partial document is ever returned.
    pub fn generate_spec(&self) -> Result<OpenApiSpec> {
        match self.generate_document() {
            Ok(spec) => Ok(spec),
            Err(e) => {
                error!("OpenAPI generation failed: {:#}", e);
                Err(e)
            }
        }
    }

    fn generate_document(&self) -> Result<OpenApiSpec> {
        let scan = self.scanner.scan_routes()?;
        debug!("Scanned {} route files", scan.routes.len());

        let mut parsed_routes = Vec::new();
        for route in &scan.routes {
            match self.parser.parse_route_file(&route.file_path, &route.api_path) {
                Ok(parsed) => parsed_routes.push(parsed),
                Err(e) => {
                    warn!(
                        "Skipping route file {}: {}",
                        route.file_path.display(),
                        e
                    );
                }
            }
        }

        let schemas = self.extractor.extract_schemas();
        let paths = self.generate_paths(&parsed_routes);

        Ok(OpenApiSpec {
            openapi: "3.0.3".to_string(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths,
            components: Components { schemas },
        })
    }

    /// Groups parsed routes into the `paths` map.
    ///
    /// Routes arrive sorted by API path; within a path, operations are keyed
    /// by lowercase verb in handler source order. A path with zero
    /// operations is omitted.
    fn generate_paths(
        &self,
        routes: &[ParsedRoute],
    ) -> IndexMap<String, IndexMap<String, Operation>> {
        let mut paths: IndexMap<String, IndexMap<String, Operation>> = IndexMap::new();

        for route in routes {
            if route.functions.is_empty() {
                continue;
            }
            let operations = paths.entry(route.path.clone()).or_default();
            for function in &route.functions {
                let operation = self.generate_operation(&route.path, function);
                operations.insert(function.method.lowercase().to_string(), operation);
            }
        }

        paths
    }

    /// Builds one operation object for a handler.
    fn generate_operation(&self, api_path: &str, function: &RouteFunction) -> Operation {
        let tag = pascal_case(first_resource_segment(api_path));

        // Body-located parameters describe the payload, not the wire; only
        // path and query parameters serialize into the parameter list.
        let parameters = function
            .parameters
            .iter()
            .filter(|p| p.location != ParameterLocation::Body)
            .map(|p| ParameterObject {
                name: p.name.clone(),
                location: p.location.as_str().to_string(),
                required: p.required,
                schema: Schema::typed(&p.param_type),
                description: p.description.clone(),
            })
            .collect();

        let request_body = match function.method {
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                Some(self.generate_request_body(api_path))
            }
            _ => None,
        };

        Operation {
            summary: function.summary.clone(),
            description: function.description.clone(),
            tags: vec![tag],
            parameters,
            request_body,
            responses: self.generate_responses(api_path, function.method),
        }
    }

    /// Builds the response map for one operation, in the fixed order
    /// 200, 201 (POST), 204 (DELETE), 500.
    fn generate_responses(
        &self,
        api_path: &str,
        method: HttpMethod,
    ) -> IndexMap<String, Response> {
        let success = self.generate_success_response(api_path, method);
        let created = if method == HttpMethod::Post {
            Some(Response {
                description: "Created successfully".to_string(),
                content: success.content.clone(),
            })
        } else {
            None
        };

        let mut responses = IndexMap::new();
        responses.insert("200".to_string(), success);
        if let Some(created) = created {
            responses.insert("201".to_string(), created);
        }
        if method == HttpMethod::Delete {
            responses.insert(
                "204".to_string(),
                Response {
                    description: "Deleted successfully".to_string(),
                    content: None,
                },
            );
        }
        responses.insert(
            "500".to_string(),
            Response {
                description: "Internal server error".to_string(),
                content: Some(json_content(Schema::component_ref("Error"))),
            },
        );

        responses
    }

    /// Builds the 200 response for an operation.
    ///
    /// A GET on a collection path wraps the resource in the list envelope
    /// with pagination; every other operation references the resource
    /// schema directly. The resource name comes from the shared path
    /// helpers, so it always matches the component keys the schema
    /// extractor produces for singular declarations.
    fn generate_success_response(&self, api_path: &str, method: HttpMethod) -> Response {
        let resource = resource_component_name(api_path);

        let schema = if method == HttpMethod::Get && !has_path_parameter(api_path) {
            let mut properties = IndexMap::new();
            properties.insert(
                "data".to_string(),
                Schema::array(Schema::component_ref(&resource)),
            );
            properties.insert("pagination".to_string(), Schema::component_ref("Pagination"));
            Schema::object(properties, Vec::new())
        } else {
            Schema::component_ref(&resource)
        };

        Response {
            description: "Successful response".to_string(),
            content: Some(json_content(schema)),
        }
    }

    /// Builds the request body for a mutating operation, referencing the
    /// same resource schema as the success response.
    fn generate_request_body(&self, api_path: &str) -> RequestBody {
        let resource = resource_component_name(api_path);
        RequestBody {
            description: Some("Request body".to_string()),
            required: true,
            content: json_content(Schema::component_ref(&resource)),
        }
    }
}

/// Wraps a schema as JSON content.
fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert("application/json".to_string(), MediaType { schema });
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserContext;
    use crate::route_parser::Parameter;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Builds a project tree, runs the whole pipeline and returns the spec.
    fn generate(routes: &[(&str, &str)], schema: Option<&str>) -> OpenApiSpec {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for (relative, content) in routes {
            write_file(root, &format!("api/{}", relative), content);
        }
        let schema_path = root.join("schema.ts");
        if let Some(schema) = schema {
            fs::write(&schema_path, schema).unwrap();
        }

        let ctx = ParserContext::new().unwrap();
        let scanner = RouteScanner::new(root.join("api"));
        let parser = RouteParser::new(&ctx);
        let extractor = SchemaExtractor::new(schema_path, &ctx);
        OpenApiGenerator::new(scanner, parser, extractor)
            .generate_spec()
            .unwrap()
    }

    const LIST_AND_CREATE: &str = r#"
export async function GET(request: Request) {
    return Response.json([]);
}

export async function POST(request: Request) {
    return Response.json({}, { status: 201 });
}
"#;

    const GET_UPDATE_DELETE: &str = r#"
export async function GET(request: Request) {
    return Response.json({});
}

export async function PUT(request: Request) {
    return Response.json({});
}

export async function DELETE(request: Request) {
    return new Response(null, { status: 204 });
}
"#;

    const PRODUCT_SCHEMA: &str = r#"
export const product = pgTable("products", {
    id: text("id").primaryKey().notNull(),
    name: text("name").notNull(),
    price: decimal("price", { precision: 10, scale: 2 }),
});
"#;

    #[test]
    fn test_generate_spec_structure() {
        let spec = generate(
            &[
                ("products/route.ts", LIST_AND_CREATE),
                ("products/[id]/route.ts", GET_UPDATE_DELETE),
            ],
            Some(PRODUCT_SCHEMA),
        );

        assert_eq!(spec.openapi, "3.0.3");
        assert_eq!(spec.info.title, "Business Management API");
        assert_eq!(spec.info.version, "1.0.0");
        assert_eq!(spec.servers.len(), 1);
        assert_eq!(spec.servers[0].url, "/api");

        let paths: Vec<&str> = spec.paths.keys().map(|k| k.as_str()).collect();
        assert_eq!(paths, vec!["/products", "/products/{id}"]);

        assert!(spec.components.schemas.contains_key("Product"));
        assert!(spec.components.schemas.contains_key("Error"));
        assert!(spec.components.schemas.contains_key("Pagination"));
        assert!(spec.components.schemas.contains_key("PaginatedResponse"));
    }

    #[test]
    fn test_collection_get_wraps_list_with_pagination() {
        let spec = generate(
            &[("products/route.ts", LIST_AND_CREATE)],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/products"]["get"];
        let content = operation.responses["200"].content.as_ref().unwrap();
        let schema = &content["application/json"].schema;

        assert_eq!(schema.schema_type.as_deref(), Some("object"));
        let properties = schema.properties.as_ref().unwrap();
        assert_eq!(
            properties["data"],
            Schema::array(Schema::component_ref("Product"))
        );
        assert_eq!(properties["pagination"], Schema::component_ref("Pagination"));
        assert!(schema.required.is_none());
    }

    #[test]
    fn test_item_get_references_resource_directly() {
        let spec = generate(
            &[("products/[id]/route.ts", GET_UPDATE_DELETE)],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/products/{id}"]["get"];
        let content = operation.responses["200"].content.as_ref().unwrap();
        assert_eq!(
            content["application/json"].schema,
            Schema::component_ref("Product")
        );
    }

    #[test]
    fn test_post_gets_request_body_and_201() {
        let spec = generate(
            &[("products/route.ts", LIST_AND_CREATE)],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/products"]["post"];

        let body = operation.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.description.as_deref(), Some("Request body"));
        assert_eq!(
            body.content["application/json"].schema,
            Schema::component_ref("Product")
        );

        let codes: Vec<&str> = operation.responses.keys().map(|k| k.as_str()).collect();
        assert_eq!(codes, vec!["200", "201", "500"]);

        let created = &operation.responses["201"];
        assert_eq!(created.description, "Created successfully");
        assert_eq!(
            created.content.as_ref().unwrap()["application/json"].schema,
            Schema::component_ref("Product")
        );
    }

    #[test]
    fn test_delete_gets_bodyless_204() {
        let spec = generate(
            &[("products/[id]/route.ts", GET_UPDATE_DELETE)],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/products/{id}"]["delete"];

        let codes: Vec<&str> = operation.responses.keys().map(|k| k.as_str()).collect();
        assert_eq!(codes, vec!["200", "204", "500"]);

        let deleted = &operation.responses["204"];
        assert_eq!(deleted.description, "Deleted successfully");
        assert!(deleted.content.is_none());

        // GET and PUT on the same path carry no request body for GET.
        assert!(spec.paths["/products/{id}"]["get"].request_body.is_none());
        assert!(spec.paths["/products/{id}"]["put"].request_body.is_some());
    }

    #[test]
    fn test_every_operation_references_error_on_500() {
        let spec = generate(
            &[("products/route.ts", LIST_AND_CREATE)],
            Some(PRODUCT_SCHEMA),
        );

        for operations in spec.paths.values() {
            for operation in operations.values() {
                let failure = &operation.responses["500"];
                assert_eq!(failure.description, "Internal server error");
                assert_eq!(
                    failure.content.as_ref().unwrap()["application/json"].schema,
                    Schema::component_ref("Error")
                );
            }
        }
    }

    #[test]
    fn test_operation_tag_and_parameters() {
        let spec = generate(
            &[("products/[id]/route.ts", GET_UPDATE_DELETE)],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/products/{id}"]["get"];
        assert_eq!(operation.tags, vec!["Products".to_string()]);

        // One path parameter plus the ten catalog query parameters.
        assert_eq!(operation.parameters.len(), 11);
        assert_eq!(operation.parameters[0].name, "id");
        assert_eq!(operation.parameters[0].location, "path");
        assert!(operation.parameters[0].required);
        assert_eq!(operation.parameters[0].schema, Schema::typed("string"));
        assert_eq!(operation.parameters[0].description, "id identifier");
        assert_eq!(operation.parameters[1].location, "query");
    }

    #[test]
    fn test_summaries_use_singularized_resource() {
        let spec = generate(
            &[
                ("products/route.ts", LIST_AND_CREATE),
                ("products/[id]/route.ts", GET_UPDATE_DELETE),
            ],
            Some(PRODUCT_SCHEMA),
        );

        assert_eq!(spec.paths["/products"]["get"].summary, "List product");
        assert_eq!(spec.paths["/products"]["post"].summary, "Create product");
        assert_eq!(spec.paths["/products/{id}"]["get"].summary, "Get product");
        assert_eq!(spec.paths["/products/{id}"]["put"].summary, "Update product");
        assert_eq!(
            spec.paths["/products/{id}"]["delete"].summary,
            "Delete product"
        );
    }

    #[test]
    fn test_missing_schema_file_still_generates() {
        let spec = generate(&[("products/route.ts", LIST_AND_CREATE)], None);

        // Fallback schemas keep the references resolvable.
        assert!(spec.components.schemas.contains_key("Product"));
        assert!(spec.components.schemas.contains_key("Error"));
        assert!(spec.paths.contains_key("/products"));
    }

    #[test]
    fn test_root_route_uses_resource_fallback() {
        let spec = generate(
            &[("route.ts", "export async function GET(request: Request) { return null; }\n")],
            Some(PRODUCT_SCHEMA),
        );

        let operation = &spec.paths["/"]["get"];
        assert_eq!(operation.summary, "List resource");
        assert_eq!(operation.tags, vec!["Resource".to_string()]);

        let content = operation.responses["200"].content.as_ref().unwrap();
        let properties = content["application/json"]
            .schema
            .properties
            .as_ref()
            .unwrap();
        assert_eq!(
            properties["data"],
            Schema::array(Schema::component_ref("Resource"))
        );
    }

    #[test]
    fn test_reference_names_use_literal_singularization() {
        let spec = generate(
            &[(
                "status/[id]/route.ts",
                "export async function GET(request: Request) { return null; }\n",
            )],
            None,
        );

        // The trailing-s rule applies verbatim, so the reference name is
        // Statu; consumers depend on the exact output.
        let operation = &spec.paths["/status/{id}"]["get"];
        assert_eq!(operation.summary, "Get statu");
        let content = operation.responses["200"].content.as_ref().unwrap();
        assert_eq!(
            content["application/json"].schema,
            Schema::component_ref("Statu")
        );
    }

    #[test]
    fn test_zero_operation_path_omitted() {
        let ctx = ParserContext::new().unwrap();
        let scanner = RouteScanner::new(PathBuf::from("/nonexistent"));
        let parser = RouteParser::new(&ctx);
        let extractor = SchemaExtractor::new(PathBuf::from("/nonexistent/schema.ts"), &ctx);
        let generator = OpenApiGenerator::new(scanner, parser, extractor);

        let routes = vec![
            ParsedRoute {
                path: "/empty".to_string(),
                functions: Vec::new(),
            },
            ParsedRoute {
                path: "/orders".to_string(),
                functions: vec![RouteFunction {
                    method: HttpMethod::Get,
                    parameters: Vec::<Parameter>::new(),
                    summary: "List order".to_string(),
                    description: "Retrieve a list of order records".to_string(),
                }],
            },
        ];

        let paths = generator.generate_paths(&routes);
        assert_eq!(paths.len(), 1);
        assert!(paths.contains_key("/orders"));
    }

    #[test]
    fn test_with_info_overrides_defaults() {
        let ctx = ParserContext::new().unwrap();
        let scanner = RouteScanner::new(PathBuf::from("/nonexistent"));
        let parser = RouteParser::new(&ctx);
        let extractor = SchemaExtractor::new(PathBuf::from("/nonexistent/schema.ts"), &ctx);
        let generator = OpenApiGenerator::new(scanner, parser, extractor).with_info(
            "Warehouse API".to_string(),
            "2.0.0".to_string(),
            None,
        );

        let spec = generator.generate_spec().unwrap();
        assert_eq!(spec.info.title, "Warehouse API");
        assert_eq!(spec.info.version, "2.0.0");
        assert!(spec.info.description.is_none());
    }

    #[test]
    fn test_serialized_document_shape() {
        let spec = generate(
            &[("products/route.ts", LIST_AND_CREATE)],
            Some(PRODUCT_SCHEMA),
        );

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["openapi"], "3.0.3");
        assert_eq!(value["servers"][0]["description"], "Application API root");
        assert_eq!(
            value["paths"]["/products"]["get"]["responses"]["200"]["description"],
            "Successful response"
        );
        assert_eq!(
            value["paths"]["/products"]["post"]["requestBody"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/Product"
        );
        assert_eq!(
            value["components"]["schemas"]["Product"]["required"],
            serde_json::json!(["id", "name"])
        );
        // GET carries no requestBody key at all.
        assert!(value["paths"]["/products"]["get"]
            .as_object()
            .unwrap()
            .get("requestBody")
            .is_none());
    }
}
