use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Route OpenAPI Generator - Automatically generate OpenAPI documentation from file-based route handlers
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the application project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Routes directory, relative to the project path
    #[arg(long = "routes", value_name = "DIR", default_value = "src/app/api")]
    pub routes_dir: PathBuf,

    /// Database schema file, relative to the project path
    #[arg(long = "schema", value_name = "FILE", default_value = "src/db/schema.ts")]
    pub schema_file: PathBuf,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    // Validate project path exists
    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    // Validate project path is a directory
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Routes directory: {}", args.routes_dir.display());
    info!("Schema file: {}", args.schema_file.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::openapi_generator::OpenApiGenerator;
    use crate::parser::ParserContext;
    use crate::route_parser::RouteParser;
    use crate::scanner::RouteScanner;
    use crate::schema_extractor::SchemaExtractor;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};

    info!("Starting OpenAPI document generation...");
    info!("Project path: {}", args.project_path.display());

    let routes_root = args.project_path.join(&args.routes_dir);
    let schema_path = args.project_path.join(&args.schema_file);

    // Step 1: Validate resolved project layout
    if !routes_root.is_dir() {
        anyhow::bail!(
            "Routes directory does not exist: {}",
            routes_root.display()
        );
    }
    if !schema_path.is_file() {
        log::warn!(
            "Schema file not found: {}, fallback schemas will be used",
            schema_path.display()
        );
    }

    // Step 2: Load the TypeScript grammar
    info!("Loading TypeScript grammar...");
    let context = ParserContext::new()?;

    // Step 3: Wire the pipeline components
    debug!("Routes root: {}", routes_root.display());
    debug!("Schema path: {}", schema_path.display());
    let scanner = RouteScanner::new(routes_root);
    let parser = RouteParser::new(&context);
    let extractor = SchemaExtractor::new(schema_path, &context);
    let generator = OpenApiGenerator::new(scanner, parser, extractor);

    // Step 4: Generate the OpenAPI document
    info!("Generating OpenAPI document...");
    let document = generator.generate_spec()?;
    info!("OpenAPI document built successfully");

    // Step 5: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Json => serialize_json(&document)?,
        OutputFormat::Yaml => serialize_yaml(&document)?,
    };

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!(
            "Successfully wrote OpenAPI document to {}",
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    // Step 7: Display summary
    let operation_count: usize = document.paths.values().map(|ops| ops.len()).sum();
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Operations: {}", operation_count);
    info!(
        "  - Component schemas: {}",
        document.components.schemas.len()
    );

    Ok(())
}
