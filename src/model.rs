use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::Span;

/// レイヤーがフィーチャーにシンボルを割り当てる方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RendererKind {
    Simple,
    UniqueValue,
    Graduated,
    Proportional,
    Bivariate,
    Unclassed,
    RasterStretch,
    RasterDiscrete,
    RasterColorMap,
    RasterClassify,
    RasterUnique,
    Unsupported,
}

impl RendererKind {
    pub fn is_raster(self) -> bool {
        matches!(
            self,
            RendererKind::RasterStretch
                | RendererKind::RasterDiscrete
                | RendererKind::RasterColorMap
                | RendererKind::RasterClassify
                | RendererKind::RasterUnique
        )
    }

    /// フラグメントがポイント/ライン/ポリゴンのシンボル定義になる種別
    pub fn yields_symbols(self) -> bool {
        matches!(
            self,
            RendererKind::Simple
                | RendererKind::UniqueValue
                | RendererKind::Graduated
                | RendererKind::Proportional
        )
    }

    /// フラグメントが単色の定義になる種別
    pub fn yields_colors(self) -> bool {
        matches!(
            self,
            RendererKind::RasterColorMap | RendererKind::RasterClassify | RendererKind::RasterUnique
        )
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RendererKind::Simple => "simple",
            RendererKind::UniqueValue => "unique value",
            RendererKind::Graduated => "graduated",
            RendererKind::Proportional => "proportional",
            RendererKind::Bivariate => "bivariate",
            RendererKind::Unclassed => "unclassed",
            RendererKind::RasterStretch => "raster stretch",
            RendererKind::RasterDiscrete => "raster discrete",
            RendererKind::RasterColorMap => "raster colormap",
            RendererKind::RasterClassify => "raster classify",
            RendererKind::RasterUnique => "raster unique",
            RendererKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// フラグメントがレンダラー内で果たす役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRole {
    Entry,
    /// 他の値と併用されるデフォルトシンボル
    Default,
    /// デフォルトシンボルのみのユニーク値
    OnlyDefault,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    /// ラベル欄が見つからずファイル名から作った場合 true
    pub from_file_name: bool,
}

/// ブロブ中の 1 シンボル定義。ラベルは生成時点で結び付ける。
#[derive(Debug, Clone)]
pub struct SymbolFragment<'a> {
    pub kind: RendererKind,
    pub role: FragmentRole,
    pub index: usize,
    pub span: Span,
    pub text: &'a str,
    pub label: Label,
}

impl SymbolFragment<'_> {
    pub fn is_background(&self) -> bool {
        self.role == FragmentRole::Background
    }
}

/// スタイルコンテナの CLASSES テーブル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleClass {
    Color,
    ColorScheme,
    PointSymbol,
    LineSymbol,
    PolygonSymbol,
    TextSymbol,
    NorthArrow,
    ScaleBar,
    StandardLabelPlacement,
    MaplexLabelPlacement,
    Grid,
    MeshSymbol,
    Legend,
    TableFrame,
    MapSurround,
    LegendItem,
    TableFrameField,
}

impl StyleClass {
    pub const ALL: [StyleClass; 17] = [
        StyleClass::Color,
        StyleClass::ColorScheme,
        StyleClass::PointSymbol,
        StyleClass::LineSymbol,
        StyleClass::PolygonSymbol,
        StyleClass::TextSymbol,
        StyleClass::NorthArrow,
        StyleClass::ScaleBar,
        StyleClass::StandardLabelPlacement,
        StyleClass::MaplexLabelPlacement,
        StyleClass::Grid,
        StyleClass::MeshSymbol,
        StyleClass::Legend,
        StyleClass::TableFrame,
        StyleClass::MapSurround,
        StyleClass::LegendItem,
        StyleClass::TableFrameField,
    ];

    pub fn code(self) -> u32 {
        match self {
            StyleClass::Color => 1,
            StyleClass::ColorScheme => 2,
            StyleClass::PointSymbol => 3,
            StyleClass::LineSymbol => 4,
            StyleClass::PolygonSymbol => 5,
            StyleClass::TextSymbol => 6,
            StyleClass::NorthArrow => 7,
            StyleClass::ScaleBar => 8,
            StyleClass::StandardLabelPlacement => 9,
            StyleClass::MaplexLabelPlacement => 10,
            StyleClass::Grid => 11,
            StyleClass::MeshSymbol => 12,
            StyleClass::Legend => 13,
            StyleClass::TableFrame => 14,
            StyleClass::MapSurround => 15,
            StyleClass::LegendItem => 17,
            StyleClass::TableFrameField => 18,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StyleClass::Color => "Color",
            StyleClass::ColorScheme => "Color Scheme",
            StyleClass::PointSymbol => "Point Symbol",
            StyleClass::LineSymbol => "Line Symbol",
            StyleClass::PolygonSymbol => "Polygon Symbol",
            StyleClass::TextSymbol => "Text Symbol",
            StyleClass::NorthArrow => "North Arrow",
            StyleClass::ScaleBar => "Scale Bar",
            StyleClass::StandardLabelPlacement => "Standard Label Placement",
            StyleClass::MaplexLabelPlacement => "Maplex Label Placement",
            StyleClass::Grid => "Grid",
            StyleClass::MeshSymbol => "Mesh Symbol",
            StyleClass::Legend => "Legend",
            StyleClass::TableFrame => "Table Frame",
            StyleClass::MapSurround => "Map Surround",
            StyleClass::LegendItem => "Legend Item",
            StyleClass::TableFrameField => "Table Frame Field",
        }
    }

    /// `CIMPointSymbol` のような型名からクラスを決める
    pub fn from_cim_type(type_name: &str) -> Option<StyleClass> {
        let name = type_name.strip_prefix("CIM").unwrap_or(type_name);

        if name.ends_with("ColorRamp") {
            return Some(StyleClass::ColorScheme);
        }
        if name.ends_with("Color") {
            return Some(StyleClass::Color);
        }

        // 後に一致したクラスを優先する
        StyleClass::ALL
            .iter()
            .rev()
            .find(|class| name.contains(&class.name().replace(' ', "")))
            .copied()
    }

    /// 塗り・線の色を派生レコードとして書き出す対象か
    pub fn carries_colors(self) -> bool {
        matches!(
            self,
            StyleClass::PointSymbol
                | StyleClass::LineSymbol
                | StyleClass::PolygonSymbol
                | StyleClass::TextSymbol
        )
    }
}

/// 外部の GIS ツールから渡される 1 レイヤー分のテキスト
#[derive(Debug, Clone)]
pub struct LayerBlob {
    pub file_name: String,
    pub text: String,
}

impl LayerBlob {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }
}

/// 採番前のスタイル項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleItem {
    pub class: StyleClass,
    pub name: String,
    pub tags: String,
    pub content: String,
}

/// 1 フラグメントから得た項目と、そこから派生した色項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedStyle {
    pub item: StyleItem,
    pub derived: Vec<StyleItem>,
}

/// ITEMS テーブルの 1 行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleItemRecord {
    pub id: u64,
    pub class_code: u32,
    pub category: String,
    pub name: String,
    pub tags: String,
    pub content: String,
    pub key: String,
}

impl StyleItemRecord {
    pub fn from_item(id: u64, item: StyleItem) -> Self {
        Self {
            id,
            class_code: item.class.code(),
            category: String::new(),
            key: item.name.clone(),
            name: item.name,
            tags: item.tags,
            content: item.content,
        }
    }
}
