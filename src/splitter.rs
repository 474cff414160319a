use crate::model::{FragmentRole, Label, RendererKind, SymbolFragment};
use crate::normalizer::normalize;

const VECTOR_OPENERS: [&str; 3] = [
    r#"{"type":"CIMPointSymbol""#,
    r#"{"type":"CIMLineSymbol""#,
    r#"{"type":"CIMPolygonSymbol""#,
];

const RASTER_OPENERS: [&str; 1] = [r#"{"type":"#];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Single,
    /// 連結されたポイント/ライン/ポリゴンシンボル
    VectorSymbols,
    /// 連結されたラスターの色エントリ
    RasterEntries,
}

impl SplitMode {
    pub fn for_kind(kind: RendererKind) -> Self {
        if kind.yields_symbols() {
            SplitMode::VectorSymbols
        } else if kind.yields_colors() {
            SplitMode::RasterEntries
        } else {
            SplitMode::Single
        }
    }

    fn openers(self) -> &'static [&'static str] {
        match self {
            SplitMode::Single => &[],
            SplitMode::VectorSymbols => &VECTOR_OPENERS,
            SplitMode::RasterEntries => &RASTER_OPENERS,
        }
    }
}

/// 整形済みで自己完結したシンボル定義 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub role: FragmentRole,
    pub label: Label,
    pub content: String,
}

/// 整形済みテキストを最上位のシンボルごとに分割する。
///
/// 分割位置は括弧の深さ 0 にある開始パターンだけなので、
/// `"symbol":` の下に入れ子になった同種のシンボルでは切らない。
/// テキストが開始パターンで始まらない場合は分割しない。
pub fn split(composite: &str, mode: SplitMode) -> Vec<String> {
    let starts = top_level_starts(composite, mode.openers());

    if starts.first() != Some(&0) {
        return vec![trim_separator(composite).to_string()];
    }

    let mut pieces = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(composite.len());
        let piece = trim_separator(&composite[start..end]);
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
    }
    pieces
}

/// 各フラグメントを整形・分割する。ラベルは分割後の各片に引き継ぎ、
/// 背景シンボルは最後に付け足す。
pub fn split_fragments(fragments: &[SymbolFragment<'_>], mode: SplitMode) -> Vec<Piece> {
    let (backgrounds, primaries): (Vec<_>, Vec<_>) =
        fragments.iter().partition(|fragment| fragment.is_background());

    let mut pieces = Vec::new();
    for fragment in primaries {
        let normalized = normalize(fragment.text);
        pieces.extend(split(&normalized, mode).into_iter().map(|content| Piece {
            role: fragment.role,
            label: fragment.label.clone(),
            content,
        }));
    }

    for background in backgrounds {
        pieces.push(Piece {
            role: FragmentRole::Background,
            label: background.label.clone(),
            content: normalize(background.text),
        });
    }

    pieces
}

fn trim_separator(text: &str) -> &str {
    text.trim_end_matches(',')
}

fn top_level_starts(text: &str, openers: &[&str]) -> Vec<usize> {
    let mut starts = Vec::new();
    if openers.is_empty() {
        return starts;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => {
                if depth == 0 && openers.iter().any(|opener| text[i..].starts_with(opener)) {
                    starts.push(i);
                }
                depth += 1;
            }
            '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;

    const POINT_A: &str = r#"{"type":"CIMPointSymbol","symbolLayers":[{"type":"CIMCharacterMarker","fontFamilyName":"ESRI Default Marker","symbol":{"type":"CIMPolygonSymbol","symbolLayers":[{"type":"CIMSolidFill","enable":true,"color":{"type":"CIMRGBColor","values":[0,0,0,100]}}]}}],"haloSize":1}"#;
    const POINT_B: &str = r#"{"type":"CIMPointSymbol","symbolLayers":[{"type":"CIMVectorMarker","markerGraphics":[{"type":"CIMMarkerGraphic","symbol":{"type":"CIMPointSymbol","symbolLayers":[]}}]}],"haloSize":2}"#;

    #[test]
    fn test_two_concatenated_points_split_back() {
        let composite = format!("{}{}", POINT_A, POINT_B);
        let pieces = split(&composite, SplitMode::VectorSymbols);
        assert_eq!(pieces, vec![POINT_A.to_string(), POINT_B.to_string()]);
    }

    #[test]
    fn test_nested_symbols_do_not_split() {
        let pieces = split(POINT_B, SplitMode::VectorSymbols);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0], POINT_B);
    }

    #[test]
    fn test_mixed_kinds_split_at_top_level() {
        let line = r#"{"type":"CIMLineSymbol","symbolLayers":[]}"#;
        let composite = format!("{},{}", POINT_A, line);
        let pieces = split(&composite, SplitMode::VectorSymbols);
        assert_eq!(pieces, vec![POINT_A.to_string(), line.to_string()]);
    }

    #[test]
    fn test_unknown_opener_is_kept_whole() {
        let text = r#"{"type":"CIMTextSymbol","height":10}"#;
        assert_eq!(split(text, SplitMode::VectorSymbols), vec![text.to_string()]);
    }

    #[test]
    fn test_raster_entries() {
        let composite = r#"{"type":"CIMRGBColor","values":[255,0,0,100]}{"type":"CIMRGBColor","values":[0,0,255,100]}"#;
        let pieces = split(composite, SplitMode::RasterEntries);
        assert_eq!(
            pieces,
            vec![
                r#"{"type":"CIMRGBColor","values":[255,0,0,100]}"#.to_string(),
                r#"{"type":"CIMRGBColor","values":[0,0,255,100]}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let composite = r#"{"type":"CIMRGBColor","name":"}{\"type\":"}{"type":"CIMRGBColor"}"#;
        assert_eq!(split(composite, SplitMode::RasterEntries).len(), 2);
    }

    #[test]
    fn test_background_is_appended_last() {
        let background_label = Label {
            text: "Towns_63360_FSBaseMap_background".to_string(),
            from_file_name: true,
        };
        let span = Span { start: 0, end: 0 };
        let fragments = vec![
            SymbolFragment {
                kind: RendererKind::Proportional,
                role: FragmentRole::Background,
                index: 0,
                span,
                text: "{ \"type\" : \"CIMPolygonSymbol\" }",
                label: background_label.clone(),
            },
            SymbolFragment {
                kind: RendererKind::Proportional,
                role: FragmentRole::Entry,
                index: 1,
                span,
                text: "{ \"type\" : \"CIMPointSymbol\" }",
                label: Label {
                    text: "Towns_63360_FSBaseMap".to_string(),
                    from_file_name: true,
                },
            },
        ];

        let pieces = split_fragments(&fragments, SplitMode::VectorSymbols);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].content, r#"{"type":"CIMPointSymbol"}"#);
        assert_eq!(pieces[1].role, FragmentRole::Background);
        assert_eq!(pieces[1].label, background_label);
        assert_eq!(pieces[1].content, r#"{"type":"CIMPolygonSymbol"}"#);
    }
}
