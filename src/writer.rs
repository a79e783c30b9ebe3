use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Sink for rendered statement blocks. One file per run; each non-empty
/// block is terminated with a trailing blank line so the dump stays
/// readable and concatenation-safe.
pub struct SqlFile {
    path: PathBuf,
    out: BufWriter<File>,
    blocks: usize,
}

impl SqlFile {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating output dir {}", dir.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("creating output file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "-- wh_scraper, generated {}", chrono::Utc::now().to_rfc3339())?;
        writeln!(out)?;
        Ok(SqlFile {
            path: path.to_path_buf(),
            out,
            blocks: 0,
        })
    }

    /// Append one page's statement block. Empty blocks (pages with no
    /// records) are dropped silently.
    pub fn append_block(&mut self, sql: &str) -> Result<()> {
        if sql.is_empty() {
            return Ok(());
        }
        self.out.write_all(sql.as_bytes())?;
        writeln!(self.out)?;
        self.blocks += 1;
        Ok(())
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}
