pub const DEFAULT_CATCH_ALL_LABELS: [&str; 2] = ["<all other values>", "<null>"];

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// 既知のマップ名。ファイル名との照合前にカンマを取り除く
    pub map_names: Vec<String>,
    /// そのままでは層どうしで区別できない「その他すべて」系のラベル
    pub catch_all_labels: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            map_names: Vec::new(),
            catch_all_labels: DEFAULT_CATCH_ALL_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExtractConfig {
    pub fn new<I, S>(map_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            map_names: map_names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// `63,360_FSBaseMap` -> `63360_FSBaseMap`
    pub fn normalized_map_names(&self) -> impl Iterator<Item = String> + '_ {
        self.map_names.iter().map(|name| name.replace(',', ""))
    }

    pub fn is_catch_all(&self, label: &str) -> bool {
        self.catch_all_labels.iter().any(|s| s == label)
    }
}
