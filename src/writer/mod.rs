use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::StyleItemRecord;

mod stylx;

pub use stylx::{is_style_file, StylxWriter, STYLE_META};

/// スタイルコンテナへ行を書き込む側のインターフェース
pub trait StyleSink {
    fn insert(&mut self, record: &StyleItemRecord) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl StyleSink for Vec<StyleItemRecord> {
    fn insert(&mut self, record: &StyleItemRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// 1 行 1 レコードの JSON Lines 出力
pub struct JsonLinesWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonLinesWriter {
    /// 既存のファイルは置き換える
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl StyleSink for JsonLinesWriter {
    fn insert(&mut self, record: &StyleItemRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .with_context(|| format!("Failed to serialize record {}", record.id))?;
        self.writer
            .write_all(b"\n")
            .context("Failed to write record separator")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        tracing::info!(
            "Written {} style items to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }
}
