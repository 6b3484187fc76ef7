use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    io::{BufRead, Write},
};

use crate::{load::Load, progress::line_progress, translate::Translate};

/// A new top-level insertion statement starts at this prefix; everything else
/// on a kept line is either structure or the continuation of a statement.
const INSERT_PREFIX: &str = "INSERT ";

#[derive(Debug, Clone)]
pub struct Config {
    /// Insertion statements accumulated before a batch is handed over.
    pub batch_threshold: usize,
    /// Lines starting with any of these prefixes are dropped outright.
    pub excluded_statement_prefixes: HashSet<String>,
    /// Write the <source>.struct.sql summary before converting.
    pub emit_structure_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batch_threshold: 100,
            // `descr` and `description_edited` dominate the dump size and are
            // not needed for the search index.
            excluded_statement_prefixes: HashSet::from(["INSERT INTO `descr".to_string()]),
            emit_structure_only: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub lines: u64,
    pub batches: u64,
    pub dropped_lines: u64,
    pub translated_bytes: u64,
}

/// Sequential filter/batch/convert pipeline over one dump.
///
/// The translator and loader are injected so that the batching arithmetic can
/// be exercised without spawning any external process.
pub struct Pipeline<'a> {
    config: &'a Config,
    translator: &'a dyn Translate,
    loader: Option<&'a mut dyn Load>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        translator: &'a dyn Translate,
        loader: Option<&'a mut dyn Load>,
    ) -> Self {
        Pipeline {
            config,
            translator,
            loader,
        }
    }

    fn is_excluded(&self, line: &str) -> bool {
        self.config
            .excluded_statement_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    fn flush(
        &mut self,
        batch: &str,
        output: &mut dyn Write,
        index: u64,
        statements: usize,
    ) -> Result<u64> {
        tracing::debug!(
            "batch {}: {} statements, {} bytes",
            index,
            statements,
            batch.len()
        );
        let fragment = self.translator.translate(batch).with_context(|| {
            format!(
                "converting batch {} ({} statements, {} bytes)",
                index,
                statements,
                batch.len()
            )
        })?;
        output
            .write_all(fragment.as_bytes())
            .context("writing translated fragment")?;
        if let Some(loader) = self.loader.as_deref_mut() {
            loader
                .load(&fragment)
                .with_context(|| format!("loading batch {} into the database", index))?;
        }
        Ok(fragment.len() as u64)
    }

    /// Read the dump once, end to end, converting it in bounded batches.
    ///
    /// A batch is cut only at the boundary before a new insertion statement,
    /// and only once more than `batch_threshold` statements have accumulated,
    /// so a single statement is never split across batches.
    pub fn run(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut accumulator = String::new();
        let mut count: usize = 0;
        let bar = line_progress("Converting");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).context("reading dump")? == 0 {
                break;
            }
            stats.lines += 1;
            bar.inc(1);
            // Invalid bytes degrade to U+FFFD; the line still takes part in
            // prefix matching and batching.
            let line = String::from_utf8_lossy(&buf);
            if self.is_excluded(&line) {
                stats.dropped_lines += 1;
                continue;
            }
            if line.starts_with(INSERT_PREFIX) {
                // The threshold is checked before this statement joins the
                // accumulator: a flushed batch holds at most
                // batch_threshold + 1 insertion statements.
                if count > self.config.batch_threshold {
                    stats.translated_bytes +=
                        self.flush(&accumulator, output, stats.batches, count)?;
                    stats.batches += 1;
                    accumulator.clear();
                    accumulator.push_str(&line);
                    count = 1;
                } else {
                    accumulator.push_str(&line);
                    count += 1;
                }
            } else {
                // Structure and continuation lines ride along for free.
                accumulator.push_str(&line);
            }
        }
        // The trailing batch always goes out, even when it is empty.
        stats.translated_bytes += self.flush(&accumulator, output, stats.batches, count)?;
        stats.batches += 1;
        bar.finish();
        Ok(stats)
    }
}

/// Write a copy of the dump with every run of insertion statements collapsed
/// into a comment noting how many were removed. Structure lines pass through
/// unmodified.
pub fn write_structure_summary(input: &mut dyn BufRead, output: &mut dyn Write) -> Result<()> {
    let mut insert_count: u64 = 0;
    let bar = line_progress("Collecting structure");
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("reading dump")? == 0 {
            break;
        }
        bar.inc(1);
        let line = String::from_utf8_lossy(&buf);
        if line.starts_with("INSERT INTO") {
            insert_count += 1;
        } else {
            if insert_count > 0 {
                writeln!(output, "/* INSERT INTO × {}*/", insert_count)
                    .context("writing structure summary")?;
                insert_count = 0;
            }
            output
                .write_all(line.as_bytes())
                .context("writing structure summary")?;
        }
    }
    bar.finish();
    Ok(())
}
