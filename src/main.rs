//! Route OpenAPI Generator - Command-line tool for generating OpenAPI documentation.
//!
//! This binary provides a command-line interface for automatically generating OpenAPI 3.0
//! documentation from file-based route handlers. It analyzes the route files and database
//! schema of your project, then generates a complete OpenAPI specification.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate JSON documentation:
//! ```bash
//! openapi-from-routes ./my-app -o openapi.json
//! ```
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-routes ./my-app -f yaml -o openapi.yaml
//! ```
//!
//! Point at a non-default routes tree:
//! ```bash
//! openapi-from-routes ./my-app --routes app/api --schema db/schema.ts
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-routes ./my-app -v
//! ```

mod cli;
mod scanner;
mod parser;
mod paths;
mod route_parser;
mod schema_extractor;
mod openapi_generator;
mod serializer;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // We need to parse args twice: once to get verbose flag, then again after logger init
    // First, do a quick parse just to check for verbose flag
    let args_for_verbose = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Route OpenAPI Generator starting...");

    // Now do the full parse with validation
    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    // Run the main workflow
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
