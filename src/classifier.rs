use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, StyleError};
use crate::model::RendererKind;
use crate::parser::{parse_document, Node, NodeValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: RendererKind,
    /// 非対応種別の名前（`RendererKind::Unsupported` のときのみ）
    pub unsupported: Option<&'static str>,
}

impl Classification {
    fn supported(kind: RendererKind) -> Self {
        Self {
            kind,
            unsupported: None,
        }
    }

    fn unsupported(name: &'static str) -> Self {
        Self {
            kind: RendererKind::Unsupported,
            unsupported: Some(name),
        }
    }

    pub fn into_result(self) -> Result<RendererKind> {
        match self.unsupported {
            Some(kind) => Err(StyleError::UnsupportedRenderer { kind }),
            None => Ok(self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Type(&'static str),
    TypeContaining(&'static str),
    Value(&'static str, &'static str),
    Key(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Kind(RendererKind),
    Unsupported(&'static str),
}

// 上から順に判定する
const VECTOR_RULES: &[(Marker, Outcome)] = &[
    (
        Marker::Type("CIMDotDensityRenderer"),
        Outcome::Unsupported("dot density"),
    ),
    (
        Marker::Type("CIMChartRenderer"),
        Outcome::Unsupported("chart"),
    ),
    (
        Marker::Value("arrangement", "Bivariate"),
        Outcome::Kind(RendererKind::Bivariate),
    ),
    (
        Marker::Type("CIMProportionalRenderer"),
        Outcome::Kind(RendererKind::Proportional),
    ),
    (
        Marker::Type("CIMUniqueValueRenderer"),
        Outcome::Kind(RendererKind::UniqueValue),
    ),
    (
        Marker::Type("CIMClassBreak"),
        Outcome::Kind(RendererKind::Graduated),
    ),
    // 等級色のマルチパートランプも weights を持つので CIMClassBreak の後
    (Marker::Key("weights"), Outcome::Kind(RendererKind::Unclassed)),
    (
        Marker::Type("CIMSimpleRenderer"),
        Outcome::Kind(RendererKind::Simple),
    ),
];

const RASTER_LAYER: &str = "CIMRasterLayer";

const RASTER_RULES: &[(Marker, Outcome)] = &[
    (
        Marker::Type("CIMRasterStretchColorizer"),
        Outcome::Kind(RendererKind::RasterStretch),
    ),
    (
        Marker::Type("CIMRasterDiscreteColorColorizer"),
        Outcome::Kind(RendererKind::RasterDiscrete),
    ),
    (
        Marker::Type("CIMRasterColorMapColorizer"),
        Outcome::Kind(RendererKind::RasterColorMap),
    ),
    (
        Marker::Type("CIMRasterClassifyColorizer"),
        Outcome::Kind(RendererKind::RasterClassify),
    ),
    (
        Marker::Type("CIMRasterUniqueValueColorizer"),
        Outcome::Kind(RendererKind::RasterUnique),
    ),
    (
        Marker::TypeContaining("VectorField"),
        Outcome::Unsupported("vector field"),
    ),
];

/// ドキュメント中に現れる判別用マーカーの集合
#[derive(Debug, Default)]
struct Markers<'a> {
    types: HashSet<&'a str>,
    keys: HashSet<&'a str>,
    values: HashSet<(&'a str, &'a str)>,
}

impl<'a> Markers<'a> {
    fn collect(root: &Node<'a>) -> Self {
        let mut markers = Markers::default();
        for node in root.descendants() {
            for member in node.members() {
                markers.keys.insert(member.key);
                if let NodeValue::String(raw) = member.value.value {
                    if member.key == "type" {
                        markers.types.insert(raw);
                    }
                    markers.values.insert((member.key, raw));
                }
            }
        }
        markers
    }

    fn matches(&self, marker: Marker) -> bool {
        match marker {
            Marker::Type(name) => self.types.contains(name),
            Marker::TypeContaining(part) => self.types.iter().any(|t| t.contains(part)),
            Marker::Value(key, value) => self.values.contains(&(key, value)),
            Marker::Key(key) => self.keys.contains(key),
        }
    }

    fn first_match(&self, rules: &[(Marker, Outcome)]) -> Option<Classification> {
        rules
            .iter()
            .find(|(marker, _)| self.matches(*marker))
            .map(|(_, outcome)| match *outcome {
                Outcome::Kind(kind) => Classification::supported(kind),
                Outcome::Unsupported(name) => Classification::unsupported(name),
            })
    }
}

/// レンダラー種別を判定する。ベクターの判定がラスターより先。
/// ベクターのマーカーは `renderer` の中だけを見る。
pub fn classify(root: &Node<'_>) -> Result<Classification> {
    let vector = root
        .find_key("renderer")
        .and_then(|renderer| Markers::collect(renderer).first_match(VECTOR_RULES));
    let classification = vector.or_else(|| {
        let markers = Markers::collect(root);
        if markers.types.contains(RASTER_LAYER) {
            markers.first_match(RASTER_RULES)
        } else {
            None
        }
    });

    match classification {
        Some(classification) => {
            debug!("Classified renderer as {}", classification.kind);
            Ok(classification)
        }
        None => Err(StyleError::UnrecognizedRenderer),
    }
}

pub fn classify_text(text: &str) -> Result<Classification> {
    let doc = parse_document(text)?;
    classify(doc.root())
}
