//! 種別ごとのシンボル定義の位置決め。
//!
//! ドキュメントツリーをキー名でたどり、各シンボル定義のノードをそのまま
//! フラグメントにする。ラベルはこの時点でフラグメントに結び付ける。

use tracing::debug;

use crate::error::{Result, StyleError};
use crate::labeler::Labeler;
use crate::model::{FragmentRole, Label, RendererKind, SymbolFragment};
use crate::parser::{Document, Node};

struct Fragments<'d, 'a> {
    doc: &'d Document<'a>,
    kind: RendererKind,
    items: Vec<SymbolFragment<'a>>,
}

impl<'d, 'a> Fragments<'d, 'a> {
    fn new(doc: &'d Document<'a>, kind: RendererKind) -> Self {
        Self {
            doc,
            kind,
            items: Vec::new(),
        }
    }

    fn push(&mut self, role: FragmentRole, node: &Node<'a>, label: Label) {
        self.items.push(SymbolFragment {
            kind: self.kind,
            role,
            index: self.items.len(),
            span: self.doc.span_of(node),
            text: node.text,
            label,
        });
    }

    fn finish(self) -> Result<Vec<SymbolFragment<'a>>> {
        if self.items.is_empty() {
            return Err(StyleError::malformed(format!(
                "{} renderer contains no symbol definitions",
                self.kind
            )));
        }
        debug!("Located {} fragment(s) for {} renderer", self.items.len(), self.kind);
        Ok(self.items)
    }
}

fn member<'n, 'a>(node: &'n Node<'a>, key: &str) -> Result<&'n Node<'a>> {
    node.get(key).ok_or_else(|| StyleError::missing(key))
}

fn array<'n, 'a>(node: &'n Node<'a>, key: &str) -> Result<&'n [Node<'a>]> {
    member(node, key)?
        .as_array()
        .ok_or_else(|| StyleError::malformed(format!("'{}' is not a list", key)))
}

fn optional_array<'n, 'a>(node: &'n Node<'a>, key: &str) -> &'n [Node<'a>] {
    node.get(key).and_then(|value| value.as_array()).unwrap_or(&[])
}

/// `CIMSymbolReference` を経由した実際のシンボル定義
fn referenced_symbol<'n, 'a>(entry: &'n Node<'a>, key: &str) -> Result<&'n Node<'a>> {
    let reference = member(entry, key)?;
    member(reference, "symbol")
}

fn find_required<'n, 'a>(root: &'n Node<'a>, key: &str) -> Result<&'n Node<'a>> {
    root.find_key(key).ok_or_else(|| StyleError::missing(key))
}

/// 判定済みの種別に従ってフラグメントを取り出す
pub fn locate<'a>(
    doc: &Document<'a>,
    kind: RendererKind,
    labeler: &Labeler<'_>,
) -> Result<Vec<SymbolFragment<'a>>> {
    let root = doc.root();
    let mut fragments = Fragments::new(doc, kind);

    match kind {
        RendererKind::Simple => {
            let renderer = find_required(root, "renderer")?;
            let symbol = referenced_symbol(renderer, "symbol")?;
            fragments.push(FragmentRole::Entry, symbol, labeler.label_entry(Some(renderer)));
        }
        RendererKind::UniqueValue => {
            let renderer = find_required(root, "renderer")?;
            locate_unique_values(renderer, labeler, &mut fragments)?;
        }
        RendererKind::Graduated => {
            let renderer = find_required(root, "renderer")?;
            for class_break in array(renderer, "breaks")? {
                let symbol = referenced_symbol(class_break, "symbol")?;
                fragments.push(
                    FragmentRole::Entry,
                    symbol,
                    labeler.label_entry(Some(class_break)),
                );
            }
            push_background(renderer, labeler, &mut fragments)?;
        }
        RendererKind::Proportional => {
            let renderer = find_required(root, "renderer")?;
            let symbol = referenced_symbol(renderer, "symbol")?;
            fragments.push(FragmentRole::Entry, symbol, labeler.label_entry(Some(renderer)));
            push_background(renderer, labeler, &mut fragments)?;
        }
        RendererKind::Bivariate | RendererKind::Unclassed => {
            let renderer = find_required(root, "renderer")?;
            let ramp = find_required(renderer, "colorRamp")?;
            fragments.push(FragmentRole::Entry, ramp, labeler.file_label());
        }
        RendererKind::RasterStretch | RendererKind::RasterDiscrete => {
            let colorizer = find_required(root, "colorizer")?;
            let ramp = member(colorizer, "colorRamp")?;
            fragments.push(FragmentRole::Entry, ramp, labeler.file_label());
        }
        RendererKind::RasterColorMap => {
            let colorizer = find_required(root, "colorizer")?;
            let labels = optional_array(colorizer, "labels");
            for (i, color) in array(colorizer, "colors")?.iter().enumerate() {
                let matched = labels
                    .get(i)
                    .and_then(|label| label.as_str())
                    .filter(|text| !text.is_empty());
                fragments.push(
                    FragmentRole::Entry,
                    color,
                    labeler.label_text(matched.as_deref()),
                );
            }
        }
        RendererKind::RasterClassify => {
            let colorizer = find_required(root, "colorizer")?;
            for class_break in array(colorizer, "classBreaks")? {
                let color = member(class_break, "color")?;
                fragments.push(
                    FragmentRole::Entry,
                    color,
                    labeler.label_entry(Some(class_break)),
                );
            }
        }
        RendererKind::RasterUnique => {
            let colorizer = find_required(root, "colorizer")?;
            for group in array(colorizer, "groups")? {
                for class in optional_array(group, "classes") {
                    let color = member(class, "color")?;
                    fragments.push(FragmentRole::Entry, color, labeler.label_entry(Some(class)));
                }
            }
        }
        RendererKind::Unsupported => {
            return Err(StyleError::malformed("unsupported renderer has no fragments"));
        }
    }

    fragments.finish()
}

fn locate_unique_values<'a>(
    renderer: &Node<'a>,
    labeler: &Labeler<'_>,
    fragments: &mut Fragments<'_, 'a>,
) -> Result<()> {
    let use_default = renderer
        .get("useDefaultSymbol")
        .and_then(|flag| flag.as_bool())
        .unwrap_or(false);
    let default_symbol = match renderer.get("defaultSymbol") {
        Some(_) if use_default => Some(referenced_symbol(renderer, "defaultSymbol")?),
        _ => None,
    };

    let classes: Vec<&Node<'a>> = optional_array(renderer, "groups")
        .iter()
        .flat_map(|group| optional_array(group, "classes"))
        .collect();

    if let Some(symbol) = default_symbol {
        if classes.is_empty() {
            fragments.push(
                FragmentRole::OnlyDefault,
                symbol,
                labeler.only_default_label(Some(renderer)),
            );
        } else {
            fragments.push(
                FragmentRole::Default,
                symbol,
                labeler.label_entry(Some(renderer)),
            );
        }
    }

    for class in classes {
        let symbol = referenced_symbol(class, "symbol")?;
        fragments.push(FragmentRole::Entry, symbol, labeler.label_entry(Some(class)));
    }

    Ok(())
}

fn push_background<'a>(
    renderer: &Node<'a>,
    labeler: &Labeler<'_>,
    fragments: &mut Fragments<'_, 'a>,
) -> Result<()> {
    if renderer.get("backgroundSymbol").is_some() {
        let symbol = referenced_symbol(renderer, "backgroundSymbol")?;
        fragments.push(FragmentRole::Background, symbol, labeler.background_label());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::parser::parse_document;

    fn config() -> ExtractConfig {
        ExtractConfig::new(["FSTopo_Continental", "63,360_FSBaseMap"])
    }

    fn feature_layer(renderer: &str) -> String {
        format!(
            r#"{{
  "type" : "CIMLayerDocument",
  "layerDefinitions" : [
    {{
      "type" : "CIMFeatureLayer",
      "name" : "Layer",
      "renderer" : {}
    }}
  ]
}}"#,
            renderer
        )
    }

    fn symbol_ref(symbol_type: &str, value: u32) -> String {
        format!(
            r#"{{ "type" : "CIMSymbolReference", "symbol" : {{ "type" : "{}", "symbolLayers" : [ {{ "type" : "CIMSolidFill", "color" : {{ "type" : "CIMRGBColor", "values" : [ {}, 0, 0, 100 ] }} }} ] }} }}"#,
            symbol_type, value
        )
    }

    #[test]
    fn test_simple_renderer() {
        let text = feature_layer(&format!(
            r#"{{ "type" : "CIMSimpleRenderer", "patch" : "Default", "symbol" : {} }}"#,
            symbol_ref("CIMPointSymbol", 1)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Wells_63360_FSBaseMap.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::Simple, &labeler).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].text.starts_with(r#"{ "type" : "CIMPointSymbol""#));
        assert_eq!(&text[fragments[0].span.start..fragments[0].span.end], fragments[0].text);
        assert_eq!(fragments[0].label.text, "Wells_63360_FSBaseMap");
        assert!(fragments[0].label.from_file_name);
    }

    #[test]
    fn test_unique_values_with_default() {
        let text = feature_layer(&format!(
            r#"{{
  "type" : "CIMUniqueValueRenderer",
  "defaultLabel" : "<all other values>",
  "defaultSymbol" : {},
  "groups" : [
    {{ "type" : "CIMUniqueValueGroup", "classes" : [
      {{ "type" : "CIMUniqueValueClass", "label" : "Paved", "symbol" : {} }},
      {{ "type" : "CIMUniqueValueClass", "label" : "Dirt", "symbol" : {} }}
    ] }}
  ],
  "useDefaultSymbol" : true
}}"#,
            symbol_ref("CIMLineSymbol", 0),
            symbol_ref("CIMLineSymbol", 1),
            symbol_ref("CIMLineSymbol", 2)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Roads_FSTopo_Continental.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::UniqueValue, &labeler).unwrap();
        let roles: Vec<FragmentRole> = fragments.iter().map(|f| f.role).collect();
        assert_eq!(
            roles,
            vec![FragmentRole::Default, FragmentRole::Entry, FragmentRole::Entry]
        );
        let labels: Vec<&str> = fragments.iter().map(|f| f.label.text.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "<all other values>_Roads_FSTopo_Continental",
                "Paved_FSTopo_Continental",
                "Dirt_FSTopo_Continental",
            ]
        );
        let indices: Vec<usize> = fragments.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_unique_values_default_not_used() {
        let text = feature_layer(&format!(
            r#"{{ "type" : "CIMUniqueValueRenderer", "defaultSymbol" : {}, "groups" : [ {{ "classes" : [ {{ "label" : "Paved", "symbol" : {} }} ] }} ], "useDefaultSymbol" : false }}"#,
            symbol_ref("CIMLineSymbol", 0),
            symbol_ref("CIMLineSymbol", 1)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Roads_FSTopo_Continental.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::UniqueValue, &labeler).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].role, FragmentRole::Entry);
    }

    #[test]
    fn test_unique_values_only_default() {
        let text = feature_layer(&format!(
            r#"{{ "type" : "CIMUniqueValueRenderer", "defaultLabel" : "<all other values>", "defaultSymbol" : {}, "useDefaultSymbol" : true }}"#,
            symbol_ref("CIMPolygonSymbol", 0)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Airfield FAA_63360_FSBaseMap.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::UniqueValue, &labeler).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].role, FragmentRole::OnlyDefault);
        assert_eq!(
            fragments[0].label.text,
            "<all other values>_Airfield FAA_63360_FSBaseMap_only default"
        );
    }

    #[test]
    fn test_graduated_with_background() {
        let text = feature_layer(&format!(
            r#"{{
  "type" : "CIMClassBreaksRenderer",
  "backgroundSymbol" : {},
  "breaks" : [
    {{ "type" : "CIMClassBreak", "label" : "0 - 10", "symbol" : {}, "upperBound" : 10 }},
    {{ "type" : "CIMClassBreak", "label" : "10 - 20", "symbol" : {}, "upperBound" : 20 }}
  ],
  "defaultSymbol" : {}
}}"#,
            symbol_ref("CIMPolygonSymbol", 9),
            symbol_ref("CIMPointSymbol", 1),
            symbol_ref("CIMPointSymbol", 2),
            symbol_ref("CIMPointSymbol", 3)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Towns_63360_FSBaseMap.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::Graduated, &labeler).unwrap();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].label.text, "0 - 10_63360_FSBaseMap");
        assert_eq!(fragments[1].label.text, "10 - 20_63360_FSBaseMap");
        assert!(fragments[2].is_background());
        assert_eq!(fragments[2].label.text, "Towns_63360_FSBaseMap_background");
        assert!(fragments[2].text.contains("CIMPolygonSymbol"));
    }

    #[test]
    fn test_proportional_skips_default_symbol() {
        let text = feature_layer(&format!(
            r#"{{ "type" : "CIMProportionalRenderer", "backgroundSymbol" : {}, "defaultSymbol" : {}, "symbol" : {} }}"#,
            symbol_ref("CIMPolygonSymbol", 9),
            symbol_ref("CIMPointSymbol", 7),
            symbol_ref("CIMPointSymbol", 1)
        ));
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Cities_63360_FSBaseMap.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::Proportional, &labeler).unwrap();
        let roles: Vec<FragmentRole> = fragments.iter().map(|f| f.role).collect();
        assert_eq!(roles, vec![FragmentRole::Entry, FragmentRole::Background]);
        assert!(fragments[0].text.contains("[ 1, 0, 0, 100 ]"));
        assert!(fragments.iter().all(|f| !f.text.contains("[ 7, 0, 0, 100 ]")));
        assert_eq!(fragments[0].label.text, "Cities_63360_FSBaseMap");
        assert!(fragments[0].label.from_file_name);
        assert_eq!(fragments[1].label.text, "Cities_63360_FSBaseMap_background");
    }

    #[test]
    fn test_raster_ramp_and_entries() {
        let stretch = r#"{ "type" : "CIMLayerDocument", "layerDefinitions" : [ { "type" : "CIMRasterLayer", "colorizer" : { "type" : "CIMRasterStretchColorizer", "colorRamp" : { "type" : "CIMLinearContinuousColorRamp" } } } ] }"#;
        let doc = parse_document(stretch).unwrap();
        let config = config();
        let labeler = Labeler::new("Hillshade_FSTopo_Continental.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::RasterStretch, &labeler).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, r#"{ "type" : "CIMLinearContinuousColorRamp" }"#);
        assert_eq!(fragments[0].label.text, "Hillshade_FSTopo_Continental");

        let unique = r#"{ "type" : "CIMLayerDocument", "layerDefinitions" : [ { "type" : "CIMRasterLayer", "colorizer" : { "type" : "CIMRasterUniqueValueColorizer", "groups" : [ { "classes" : [ { "label" : "Water", "color" : { "type" : "CIMRGBColor", "values" : [ 0, 0, 255, 100 ] } }, { "color" : { "type" : "CIMRGBColor", "values" : [ 9, 9, 9, 100 ] } } ] } ] } } ] }"#;
        let doc = parse_document(unique).unwrap();
        let fragments = locate(&doc, RendererKind::RasterUnique, &labeler).unwrap();
        let labels: Vec<&str> = fragments.iter().map(|f| f.label.text.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Water_FSTopo_Continental", "Hillshade_FSTopo_Continental"]
        );
    }

    #[test]
    fn test_raster_colormap_labels_by_index() {
        let text = r#"{
  "type" : "CIMLayerDocument",
  "layerDefinitions" : [ {
    "type" : "CIMRasterLayer",
    "colorizer" : {
      "type" : "CIMRasterColorMapColorizer",
      "colors" : [
        { "type" : "CIMRGBColor", "values" : [ 255, 0, 0, 100 ] },
        { "type" : "CIMRGBColor", "values" : [ 0, 0, 255, 100 ] }
      ],
      "labels" : [ "Forest" ]
    }
  } ]
}"#;
        let doc = parse_document(text).unwrap();
        let config = config();
        let labeler = Labeler::new("Cover_FSTopo_Continental.lyrx", &config).unwrap();

        let fragments = locate(&doc, RendererKind::RasterColorMap, &labeler).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].label.text, "Forest_FSTopo_Continental");
        assert_eq!(fragments[1].label.text, "Cover_FSTopo_Continental");
        assert!(fragments[1].label.from_file_name);
    }

    #[test]
    fn test_missing_symbol_is_malformed() {
        let text = feature_layer(r#"{ "type" : "CIMSimpleRenderer", "patch" : "Default" }"#);
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Wells_63360_FSBaseMap.lyrx", &config).unwrap();

        let result = locate(&doc, RendererKind::Simple, &labeler);
        assert!(matches!(result, Err(StyleError::MalformedFragment { .. })));
    }

    #[test]
    fn test_zero_fragments_is_malformed() {
        let text = feature_layer(r#"{ "type" : "CIMClassBreaksRenderer", "breaks" : [ ] }"#);
        let doc = parse_document(&text).unwrap();
        let config = config();
        let labeler = Labeler::new("Towns_63360_FSBaseMap.lyrx", &config).unwrap();

        let result = locate(&doc, RendererKind::Graduated, &labeler);
        assert!(matches!(result, Err(StyleError::MalformedFragment { .. })));
    }
}
