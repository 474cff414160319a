//! ArcGIS Pro のスタイルファイル（`.stylx`）出力。
//!
//! `.stylx` は SQLite データベース。ITEMS にレコードを入れ、CLASSES と meta は
//! 作成時に固定の内容で埋める。BINARIES 系のテーブルは空のまま作る。

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

use super::StyleSink;
use crate::model::{StyleClass, StyleItemRecord};

/// meta テーブルの内容
pub const STYLE_META: [(&str, &str); 7] = [
    ("version", "1.0"),
    ("cim_version", "3.1.0"),
    ("build", "41833"),
    ("content", "json"),
    ("colorModel", "RGB"),
    ("RGBColorProfile", "sRGB IEC61966-2.1"),
    ("CMYKColorProfile", "U.S. Web Coated (SWOP) v2"),
];

const GLB_BINARY_CLASS: (i64, &str) = (1, "GLB");

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS BINARIES (ID, MD5, CLASS, CONTENT);
CREATE TABLE IF NOT EXISTS BINARY_CLASSES (ID, NAME);
CREATE TABLE IF NOT EXISTS CLASSES (ID, NAME);
CREATE TABLE IF NOT EXISTS ITEMS (ID INTEGER PRIMARY KEY, CLASS INTEGER, CATEGORY TEXT, NAME TEXT, TAGS TEXT, CONTENT TEXT, KEY TEXT);
CREATE TABLE IF NOT EXISTS STYLE_ITEM_BINARY_REFERENCES (ID, ITEMS_ID, BINARIES_ID);
CREATE TABLE IF NOT EXISTS meta (key, value);
";

const INSERT_ITEM: &str = "INSERT INTO ITEMS(ID, CLASS, CATEGORY, NAME, TAGS, CONTENT, KEY) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub struct StylxWriter {
    path: PathBuf,
    conn: Connection,
    written: usize,
}

impl StylxWriter {
    /// 既存のファイルは削除してから作り直す
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove existing style file: {}", path.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to create style file: {}", path.display()))?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create style file tables")?;
        write_fixed_rows(&conn)?;

        // ITEMS への挿入は finish でまとめてコミットする
        conn.execute_batch("BEGIN")
            .context("Failed to start transaction")?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

fn write_fixed_rows(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO BINARY_CLASSES(ID, NAME) VALUES(?1, ?2)",
        params![GLB_BINARY_CLASS.0, GLB_BINARY_CLASS.1],
    )
    .context("Failed to write BINARY_CLASSES")?;

    let mut classes = conn
        .prepare("INSERT INTO CLASSES(ID, NAME) VALUES(?1, ?2)")
        .context("Failed to prepare CLASSES insert")?;
    for class in StyleClass::ALL {
        classes
            .execute(params![class.code(), class.name()])
            .with_context(|| format!("Failed to write class {}", class.name()))?;
    }

    let mut meta = conn
        .prepare("INSERT INTO meta(key, value) VALUES(?1, ?2)")
        .context("Failed to prepare meta insert")?;
    for (key, value) in STYLE_META {
        meta.execute(params![key, value])
            .with_context(|| format!("Failed to write meta '{}'", key))?;
    }

    Ok(())
}

impl StyleSink for StylxWriter {
    fn insert(&mut self, record: &StyleItemRecord) -> Result<()> {
        let id = i64::try_from(record.id)
            .with_context(|| format!("Record id {} is out of range", record.id))?;

        let mut statement = self
            .conn
            .prepare_cached(INSERT_ITEM)
            .context("Failed to prepare ITEMS insert")?;
        statement
            .execute(params![
                id,
                record.class_code,
                record.category,
                record.name,
                record.tags,
                record.content,
                record.key,
            ])
            .with_context(|| format!("Failed to write item {} ({})", record.id, record.name))?;

        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .with_context(|| format!("Failed to commit {}", self.path.display()))?;
        }

        tracing::info!(
            "Written {} style items to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }
}

/// 出力先の拡張子が `.stylx` かどうか
pub fn is_style_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("stylx"))
}
