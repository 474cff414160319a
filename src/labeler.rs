use std::path::Path;

use crate::config::ExtractConfig;
use crate::error::{Result, StyleError};
use crate::model::Label;
use crate::parser::Node;

const LAYER_EXTENSION: &str = ".lyrx";
const BACKGROUND_SUFFIX: &str = "_background";
const ONLY_DEFAULT_SUFFIX: &str = "_only default";

/// 1 ブロブ分のラベル生成器。ファイル名由来の部品は生成時に一度だけ計算する。
#[derive(Debug, Clone)]
pub struct Labeler<'c> {
    base_name: String,
    map_suffix: String,
    config: &'c ExtractConfig,
}

impl<'c> Labeler<'c> {
    pub fn new(file_name: &str, config: &'c ExtractConfig) -> Result<Self> {
        let base_name = base_name(file_name);
        let map_suffix = map_suffix(&base_name, config).ok_or_else(|| {
            StyleError::UnknownMapName {
                file_name: file_name.to_string(),
            }
        })?;

        Ok(Self {
            base_name,
            map_suffix,
            config,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn map_suffix(&self) -> &str {
        &self.map_suffix
    }

    /// `label`、`defaultLabel`、ファイル名の順で決める
    pub fn label_entry(&self, window: Option<&Node<'_>>) -> Label {
        let matched = window.and_then(|node| {
            non_empty_str(node, "label").or_else(|| non_empty_str(node, "defaultLabel"))
        });
        self.label_text(matched.as_deref())
    }

    pub fn label_text(&self, matched: Option<&str>) -> Label {
        match matched {
            Some(text) if self.config.is_catch_all(text) => Label {
                text: format!("{}_{}", text, self.base_name),
                from_file_name: false,
            },
            Some(text) => Label {
                text: format!("{}{}", text, self.map_suffix),
                from_file_name: false,
            },
            None => self.file_label(),
        }
    }

    pub fn file_label(&self) -> Label {
        Label {
            text: self.base_name.clone(),
            from_file_name: true,
        }
    }

    pub fn background_label(&self) -> Label {
        Label {
            text: format!("{}{}", self.base_name, BACKGROUND_SUFFIX),
            from_file_name: true,
        }
    }

    /// 既定シンボルしか使わない個別値レンダラー用。複数値の既定シンボルと区別する。
    pub fn only_default_label(&self, window: Option<&Node<'_>>) -> Label {
        let label = self.label_entry(window);
        Label {
            text: format!("{}{}", label.text, ONLY_DEFAULT_SUFFIX),
            from_file_name: label.from_file_name,
        }
    }
}

fn non_empty_str(node: &Node<'_>, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|value| value.as_str())
        .filter(|text| !text.is_empty())
        .map(|text| text.into_owned())
}

/// ディレクトリと `.lyrx` 拡張子を除いたファイル名
pub fn base_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    name.strip_suffix(LAYER_EXTENSION)
        .unwrap_or(name)
        .to_string()
}

/// 一致したマップ名の直前の区切り文字から末尾まで。後に並ぶマップ名が優先。
pub fn map_suffix(base_name: &str, config: &ExtractConfig) -> Option<String> {
    let index = config
        .normalized_map_names()
        .filter(|name| !name.is_empty())
        .filter_map(|name| base_name.rfind(&name))
        .last()?;

    let start = base_name[..index]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(index);
    Some(base_name[start..].to_string())
}
