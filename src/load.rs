use anyhow::{Context, Result};
use std::{
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
};

/// Opaque sink applying a translated fragment to the target database.
pub trait Load {
    fn load(&mut self, fragment: &str) -> Result<()>;
}

/// Pipes each fragment into the `sqlite3` command-line client, one blocking
/// invocation per fragment, so the database grows while translation proceeds
/// instead of replaying a multi-gigabyte script at the end.
pub struct Sqlite3Loader {
    program: String,
    db: PathBuf,
}

impl Sqlite3Loader {
    pub fn new(program: String, db: PathBuf) -> Self {
        Sqlite3Loader { program, db }
    }
}

impl Load for Sqlite3Loader {
    fn load(&mut self, fragment: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(&self.db)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {} {}", self.program, self.db.display()))?;
        {
            let mut stdin = child.stdin.take().expect("get stdin failed");
            stdin
                .write_all(fragment.as_bytes())
                .context("feeding fragment to the database client")?;
        }
        let status = child
            .wait()
            .with_context(|| format!("waiting for {}", self.program))?;
        if !status.success() {
            tracing::warn!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}
