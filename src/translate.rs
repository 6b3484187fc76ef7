use anyhow::{Context, Result};
use std::{path::PathBuf, process::Command};

/// Opaque dialect conversion: MySQL-flavored SQL text in, SQLite-flavored
/// text out.
pub trait Translate {
    fn translate(&self, batch: &str) -> Result<String>;
}

/// Runs the awk-based `mysql2sqlite.sh` converter over a transient working
/// file and captures whatever it prints on stdout.
pub struct ScriptTranslator {
    script: PathBuf,
    workfile: PathBuf,
}

impl ScriptTranslator {
    pub fn new(script: PathBuf, workfile: PathBuf) -> Self {
        ScriptTranslator { script, workfile }
    }
}

impl Translate for ScriptTranslator {
    fn translate(&self, batch: &str) -> Result<String> {
        std::fs::write(&self.workfile, batch)
            .with_context(|| format!("writing batch to {}", self.workfile.display()))?;
        let output = Command::new("bash")
            .arg(&self.script)
            .arg(&self.workfile)
            .output()
            .with_context(|| {
                format!(
                    "running {}; problematic batch kept at {}",
                    self.script.display(),
                    self.workfile.display()
                )
            })?;
        if !output.status.success() {
            tracing::warn!(
                "{} exited with {}: {}",
                self.script.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let fragment = String::from_utf8(output.stdout).with_context(|| {
            format!(
                "{} produced non-UTF-8 output; problematic batch kept at {}",
                self.script.display(),
                self.workfile.display()
            )
        })?;
        // Reached only on a clean translation: an early return above leaves
        // the workfile behind for inspection.
        std::fs::remove_file(&self.workfile)
            .with_context(|| format!("removing {}", self.workfile.display()))?;
        Ok(fragment)
    }
}
