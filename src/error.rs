use thiserror::Error;

/// ブロブ単位の失敗。どれも実行全体は止めない。
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("no known renderer or colorizer marker found")]
    UnrecognizedRenderer,

    #[error("{kind} symbology cannot be added to a style file")]
    UnsupportedRenderer { kind: &'static str },

    #[error("malformed fragment: {context}")]
    MalformedFragment { context: String },

    #[error("layer text is not a readable document at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("file name '{file_name}' does not contain any known map name")]
    UnknownMapName { file_name: String },
}

impl StyleError {
    pub fn malformed(context: impl Into<String>) -> Self {
        StyleError::MalformedFragment {
            context: context.into(),
        }
    }

    pub fn missing(anchor: &str) -> Self {
        StyleError::MalformedFragment {
            context: format!("expected '{}' was not found", anchor),
        }
    }

    /// 既知の非対応種別によるスキップかどうか（データ不良とは区別する）
    pub fn is_expected_skip(&self) -> bool {
        matches!(self, StyleError::UnsupportedRenderer { .. })
    }
}

pub type Result<T> = std::result::Result<T, StyleError>;
