//! ブロブ 1 件の抽出と、実行全体の採番・重複除去。
//!
//! 抽出はブロブごとに独立しているので並列に行い、採番と重複除去は
//! 入力順に 1 か所で行う。出力は並列度に関係なく同じになる。

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::colors::{color_tag, colors_in, ramp_tag};
use crate::config::ExtractConfig;
use crate::error::{Result, StyleError};
use crate::labeler::Labeler;
use crate::locator::locate;
use crate::model::{ExtractedStyle, LayerBlob, StyleClass, StyleItem, StyleItemRecord};
use crate::parser::parse_document;
use crate::splitter::{split_fragments, Piece, SplitMode};
use crate::writer::StyleSink;

/// ブロブ 1 件を採番前のスタイル項目に変換する
pub fn extract_blob(blob: &LayerBlob, config: &ExtractConfig) -> Result<Vec<ExtractedStyle>> {
    let doc = parse_document(&blob.text)?;
    let kind = classify(doc.root())?.into_result()?;
    let labeler = Labeler::new(&blob.file_name, config)?;

    let fragments = locate(&doc, kind, &labeler)?;
    let pieces = split_fragments(&fragments, SplitMode::for_kind(kind));

    debug!(
        "{}: {} renderer, {} fragment(s), {} piece(s)",
        blob.file_name,
        kind,
        fragments.len(),
        pieces.len()
    );

    pieces.into_iter().map(build_style).collect()
}

fn build_style(piece: Piece) -> Result<ExtractedStyle> {
    let (class, tags, derived) = describe(&piece)?;

    Ok(ExtractedStyle {
        item: StyleItem {
            class,
            name: piece.label.text,
            tags,
            content: piece.content,
        },
        derived,
    })
}

/// クラス、タグ、派生色を決める
fn describe(piece: &Piece) -> Result<(StyleClass, String, Vec<StyleItem>)> {
    let doc = parse_document(&piece.content)?;
    let type_name = doc
        .root()
        .type_name()
        .ok_or_else(|| StyleError::missing("type"))?;
    let class = StyleClass::from_cim_type(type_name)
        .ok_or_else(|| StyleError::malformed(format!("no style class for '{}'", type_name)))?;

    match class {
        StyleClass::Color => Ok((class, color_tag(&piece.content)?, Vec::new())),
        StyleClass::ColorScheme => Ok((class, ramp_tag(&piece.content)?, Vec::new())),
        _ => {
            let colors = colors_in(doc.root())?;
            let tags = match colors.first() {
                Some(color) => color_tag(&color.content)?,
                None => String::new(),
            };

            let mut derived = Vec::new();
            if class.carries_colors() {
                for color in colors {
                    derived.push(StyleItem {
                        class: StyleClass::Color,
                        name: format!("{}_{}", piece.label.text, color.kind),
                        tags: color_tag(&color.content)?,
                        content: color.content,
                    });
                }
            }
            Ok((class, tags, derived))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub emitted: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

/// 1 回の実行で共有する採番カウンタと出力済み内容の集合
#[derive(Debug)]
pub struct RunContext {
    next_id: u64,
    seen: HashSet<String>,
    summary: RunSummary,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            seen: HashSet::new(),
            summary: RunSummary::default(),
        }
    }

    /// 同じ内容がすでに出力済みなら None
    pub fn emit(&mut self, item: StyleItem) -> Option<StyleItemRecord> {
        if self.seen.contains(&item.content) {
            debug!("Duplicate content dropped: {}", item.name);
            self.summary.duplicates += 1;
            return None;
        }

        self.seen.insert(item.content.clone());
        let record = StyleItemRecord::from_item(self.next_id, item);
        self.next_id += 1;
        self.summary.emitted += 1;
        Some(record)
    }

    /// 親が重複で落ちた場合、その派生色も出力しない
    pub fn ingest(&mut self, styles: Vec<ExtractedStyle>) -> Vec<StyleItemRecord> {
        let mut records = Vec::new();
        for style in styles {
            let Some(record) = self.emit(style.item) else {
                continue;
            };
            records.push(record);
            records.extend(style.derived.into_iter().filter_map(|item| self.emit(item)));
        }
        records
    }

    pub fn record_skip(&mut self, file_name: &str, err: &StyleError) {
        self.summary.skipped += 1;
        if err.is_expected_skip() {
            warn!("Skipping {}: {}", file_name, err);
        } else {
            error!("Failed to extract {}: {}", file_name, err);
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}

/// 設定と実行コンテキストをまとめた抽出処理
#[derive(Debug)]
pub struct StylePipeline {
    config: ExtractConfig,
    context: RunContext,
}

impl StylePipeline {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            context: RunContext::new(),
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// ブロブ 1 件を処理する。失敗したブロブはスキップとして数える
    pub fn process(&mut self, blob: &LayerBlob) -> Result<Vec<StyleItemRecord>> {
        match extract_blob(blob, &self.config) {
            Ok(styles) => Ok(self.context.ingest(styles)),
            Err(err) => {
                self.context.record_skip(&blob.file_name, &err);
                Err(err)
            }
        }
    }

    /// 並列に抽出し、入力順に採番してシンクへ書き込む
    pub fn run<S: StyleSink>(
        &mut self,
        blobs: &[LayerBlob],
        sink: &mut S,
    ) -> anyhow::Result<RunSummary> {
        info!("Extracting styles from {} layer file(s)", blobs.len());

        let config = &self.config;
        let results: Vec<Result<Vec<ExtractedStyle>>> = blobs
            .par_iter()
            .map(|blob| extract_blob(blob, config))
            .collect();

        for (blob, result) in blobs.iter().zip(results) {
            match result {
                Ok(styles) => {
                    for record in self.context.ingest(styles) {
                        sink.insert(&record)?;
                    }
                }
                Err(err) => self.context.record_skip(&blob.file_name, &err),
            }
        }
        sink.finish()?;

        let summary = self.context.summary();
        info!(
            "Emitted {} style items ({} duplicates dropped, {} files skipped)",
            summary.emitted, summary.duplicates, summary.skipped
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        self.context.summary()
    }
}
