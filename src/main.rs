use anyhow::Result;
use clap::{Parser, Subcommand};
use kha_mark::{
    build::BuildPipeline, config::Config, registry::CourseRegistry,
    service::CourseContentService,
};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

/// Renders course markdown into static JSON and serves it on demand.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project root holding kmark.toml
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every course into the destination tree (the default)
    Build,
    /// Render one course and print its document as JSON
    Render {
        course: String,
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Print the known courses as JSON
    Courses,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "info,kha_mark=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::discover(&args.root)?;

    match args.command.unwrap_or(Command::Build) {
        Command::Build => {
            let report = BuildPipeline::new(config.build).build()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Render { course, language } => {
            let registry = Arc::new(CourseRegistry::scan(&config.content.root)?);
            let service = CourseContentService::from_config(&config.content, registry);
            let content = service.get_content(&course, language.as_deref());

            println!("{}", serde_json::to_string_pretty(content.document())?);
        }
        Command::Courses => {
            let registry = CourseRegistry::scan(&config.content.root)?;
            println!("{}", serde_json::to_string_pretty(&registry)?);
        }
    }

    Ok(())
}
