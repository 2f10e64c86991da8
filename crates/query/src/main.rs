//! Trovato criterion compiler CLI
//!
//! Compiles a JSON query request to SQL and optionally runs it.
//!
//! Usage:
//!   trovato-query compile --request search.json --root location --count-limit 100

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use trovato_query::executor::{QueryExecutor, create_pool};
use trovato_query::sql::bind::inline;
use trovato_query::{EngineConfig, QueryCompiler, QueryRequest, QueryRoot};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a query request and print the SQL.
    Compile {
        /// JSON file holding `{criterion, sort_clauses, limit, offset}`.
        #[arg(long)]
        request: PathBuf,

        /// Table the search starts from: content or location.
        #[arg(long, default_value = "content")]
        root: QueryRoot,

        /// Compile a count of at most this many matches instead of rows.
        #[arg(long)]
        count_limit: Option<i64>,

        /// Run the compiled query against DATABASE_URL.
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = EngineConfig::from_env().context("failed to load configuration")?;

    match args.command {
        Command::Compile {
            request,
            root,
            count_limit,
            execute,
        } => compile(&config, &request, root, count_limit, execute).await,
    }
}

async fn compile(
    config: &EngineConfig,
    request_path: &Path,
    root: QueryRoot,
    count_limit: Option<i64>,
    execute: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(request_path)
        .with_context(|| format!("failed to read {}", request_path.display()))?;
    let request: QueryRequest =
        serde_json::from_str(&raw).context("failed to parse query request")?;

    let compiler = QueryCompiler::with_defaults(config);
    let query = match count_limit {
        Some(_) => compiler.compile_count(root, &request, count_limit)?,
        None => compiler.compile(root, &request)?,
    };

    let sql = query.get_sql();
    println!("{sql}");
    println!("{}", serde_json::to_string_pretty(query.parameters())?);
    println!("{}", inline(&sql, query.parameters()));

    if !execute {
        return Ok(());
    }

    let pool = create_pool(config).await?;
    let executor = QueryExecutor::new(pool, config);
    if count_limit.is_some() {
        let count = executor.fetch_count(&query).await?;
        println!("{count}");
    } else {
        for row in executor.fetch_rows(&query).await? {
            println!("{row}");
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trovato_query=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
