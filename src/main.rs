use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

mod load;
mod pipeline;
mod progress;
mod translate;

use load::{Load, Sqlite3Loader};
use pipeline::{Config, Pipeline};
use translate::ScriptTranslator;

/// Convert a MySQL database dump into a SQLite database, feeding the dialect
/// converter bounded batches instead of the whole dump at once.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// MySQL dump to convert
    #[clap(default_value = "libgen.sql")]
    source: PathBuf,

    /// Insertion statements accumulated before a batch goes to the converter
    #[clap(long, default_value_t = 100)]
    batch_threshold: usize,

    /// Drop every dump line starting with this prefix (repeatable)
    #[clap(long, default_value = "INSERT INTO `descr")]
    exclude: Vec<String>,

    /// Also write a <source>.struct.sql with insertion runs collapsed into comments
    #[clap(long)]
    emit_structure_only: bool,

    /// Target SQLite database (default: source path with a .sqlite extension)
    #[clap(long)]
    db: Option<PathBuf>,

    /// Do not stream translated batches into the database client
    #[clap(long)]
    no_load: bool,

    /// Dialect conversion script, invoked once per batch
    #[clap(long, default_value = "./mysql2sqlite.sh")]
    converter: PathBuf,

    /// Transient file holding the batch currently being converted
    #[clap(long, default_value = "temp.sql")]
    workfile: PathBuf,

    /// SQLite command-line client
    #[clap(long, default_value = "sqlite3")]
    sqlite3: String,
}

fn open_source(source: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(source).with_context(|| {
        format!("opening {}", source.display())
    })?))
}

fn main() -> Result<()> {
    std::env::set_var(
        "RUST_LOG",
        format!("info,{}", std::env::var("RUST_LOG").unwrap_or_default()),
    );
    let enable_color = std::env::var("NO_COLOR").is_err();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(enable_color)
        .init();

    let args = Cli::parse();
    tracing::debug!("{:?}", args);

    let config = Config {
        batch_threshold: args.batch_threshold,
        excluded_statement_prefixes: args.exclude.iter().cloned().collect(),
        emit_structure_only: args.emit_structure_only,
    };

    tracing::info!("Source file: {}", args.source.display());
    let script_path = args.source.with_extension("sqlite.sql");
    let structs_path = args.source.with_extension("struct.sql");
    let db_path = if args.no_load {
        None
    } else {
        Some(
            args.db
                .clone()
                .unwrap_or_else(|| args.source.with_extension("sqlite")),
        )
    };

    if config.emit_structure_only {
        let mut input = open_source(&args.source)?;
        let mut output = BufWriter::new(
            File::create(&structs_path)
                .with_context(|| format!("creating {}", structs_path.display()))?,
        );
        pipeline::write_structure_summary(&mut input, &mut output)?;
        output.flush().context("flushing structure summary")?;
        tracing::info!("Structure done. Result file: {}", structs_path.display());
    }

    let translator = ScriptTranslator::new(args.converter.clone(), args.workfile.clone());
    let mut loader = db_path
        .as_ref()
        .map(|db| Sqlite3Loader::new(args.sqlite3.clone(), db.clone()));

    let mut input = open_source(&args.source)?;
    let mut output = BufWriter::new(
        File::create(&script_path).with_context(|| format!("creating {}", script_path.display()))?,
    );
    let mut pipeline = Pipeline::new(
        &config,
        &translator,
        loader.as_mut().map(|l| l as &mut dyn Load),
    );
    let stats = pipeline.run(&mut input, &mut output)?;
    output.flush().context("flushing translated script")?;

    tracing::info!(
        "Converted {} lines into {} batches ({}), dropped {} excluded lines",
        stats.lines,
        stats.batches,
        humansize::format_size(stats.translated_bytes, humansize::BINARY),
        stats.dropped_lines
    );

    match &db_path {
        Some(db) => println!(
            "\nSQLite done. Result: {}\n\n\
             You should now run the following command to drop unnecessary data and create the search index:\n    \
             {} {} < compress-fiction.sql",
            db.display(),
            args.sqlite3,
            db.display()
        ),
        None => println!("\nSQLite script done. Result: {}", script_path.display()),
    }

    Ok(())
}
