//! Route OpenAPI Generator - Automatic OpenAPI documentation from file-based route handlers.
//!
//! This library provides tools to automatically generate OpenAPI 3.0 documentation by analyzing
//! the source of a project that uses file-based routing. It uses static code analysis to extract
//! route handlers from `route.ts` files and component schemas from the database schema file,
//! without executing any of the analyzed code.
//!
//! # Expected Project Layout
//!
//! - **Routes**: a directory tree (typically `src/app/api`) where each `route.ts` or `route.js`
//!   file exports async handler functions named after HTTP methods (`GET`, `POST`, ...). The
//!   file's position in the tree determines its API path; bracketed directories such as `[id]`
//!   become path parameters.
//! - **Schema**: a single TypeScript file (typically `src/db/schema.ts`) declaring database
//!   tables with `pgTable(...)` builder calls, which become OpenAPI component schemas.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`scanner`] - Recursively scans the routes tree for route handler files
//! 2. [`parser`] - Loads the TypeScript grammar and parses source files into syntax trees
//! 3. [`paths`] - Pure helpers for API path segments and resource naming
//! 4. [`route_parser`] - Extracts handler functions, parameters and summaries per route file
//! 5. [`schema_extractor`] - Converts database table declarations to OpenAPI schemas
//! 6. [`openapi_generator`] - Constructs the complete OpenAPI document
//! 7. [`serializer`] - Serializes the document to JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     openapi_generator::OpenApiGenerator,
//!     parser::ParserContext,
//!     route_parser::RouteParser,
//!     scanner::RouteScanner,
//!     schema_extractor::SchemaExtractor,
//!     serializer::serialize_json,
//! };
//! use std::path::PathBuf;
//!
//! // Load the TypeScript grammar once
//! let context = ParserContext::new().unwrap();
//!
//! // Wire the pipeline against the project layout
//! let scanner = RouteScanner::new(PathBuf::from("./my-app/src/app/api"));
//! let parser = RouteParser::new(&context);
//! let extractor = SchemaExtractor::new(PathBuf::from("./my-app/src/db/schema.ts"), &context);
//!
//! // Generate the document
//! let generator = OpenApiGenerator::new(scanner, parser, extractor);
//! let document = generator.generate_spec().unwrap();
//!
//! // Serialize to JSON
//! let json = serialize_json(&document).unwrap();
//! println!("{}", json);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod scanner;
pub mod parser;
pub mod paths;
pub mod route_parser;
pub mod schema_extractor;
pub mod openapi_generator;
pub mod serializer;
