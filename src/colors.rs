use std::fmt;

use crate::error::{Result, StyleError};
use crate::parser::{parse_document, Node};

const TYPE_PREFIX: &str = r#"{"type":"CIM"#;

/// 派生レコードとして取り出す色ブロックの種類（取り出し順）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorKind {
    PictureFill,
    SolidFill,
    SolidStroke,
}

impl ColorKind {
    pub const ORDER: [ColorKind; 3] = [
        ColorKind::PictureFill,
        ColorKind::SolidFill,
        ColorKind::SolidStroke,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorKind::PictureFill => "PictureFill",
            ColorKind::SolidFill => "SolidFill",
            ColorKind::SolidStroke => "SolidStroke",
        }
    }

    fn cim_type(self) -> &'static str {
        match self {
            ColorKind::PictureFill => "CIMPictureFill",
            ColorKind::SolidFill => "CIMSolidFill",
            ColorKind::SolidStroke => "CIMSolidStroke",
        }
    }

    /// ブロック内で色の値を持つメンバー
    fn color_key(self) -> &'static str {
        match self {
            ColorKind::PictureFill => "newColor",
            ColorKind::SolidFill | ColorKind::SolidStroke => "color",
        }
    }
}

impl fmt::Display for ColorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFragment {
    pub kind: ColorKind,
    /// 整形済みの色定義（`{"type":"CIMRGBColor","values":[...]}`）
    pub content: String,
}

/// 整形済みのシンボル定義から、種類ごとに最初の色ブロックを取り出す
pub fn extract_colors(normalized: &str) -> Result<Vec<ColorFragment>> {
    let doc = parse_document(normalized)?;
    colors_in(doc.root())
}

/// 解析済みのシンボル定義から色ブロックを取り出す
pub fn colors_in(root: &Node<'_>) -> Result<Vec<ColorFragment>> {
    let mut colors = Vec::new();
    for kind in ColorKind::ORDER {
        let Some(block) = root.find_type(kind.cim_type()) else {
            continue;
        };
        let color = block
            .get(kind.color_key())
            .ok_or_else(|| StyleError::missing(kind.color_key()))?;
        colors.push(ColorFragment {
            kind,
            content: color.text.to_string(),
        });
    }

    Ok(colors)
}

/// `{"type":"CIMRGBColor","values":[51,51,51,100]}` -> `RGB;[51,51,51,100]`
///
/// 値は数値として解釈せず、そのまま写す。
pub fn color_tag(text: &str) -> Result<String> {
    let model = type_body(text)?;
    let model = model
        .find(r#"Color""#)
        .map(|end| &model[..end])
        .ok_or_else(|| StyleError::missing(r#"Color""#))?;

    let open = text.find('[').ok_or_else(|| StyleError::missing("["))?;
    let close = text[open..]
        .find(']')
        .map(|end| open + end)
        .ok_or_else(|| StyleError::missing("]"))?;

    Ok(format!("{};{}", model, &text[open..=close]))
}

/// `{"type":"CIMMultipartColorRamp",...}` -> `Multipart`
pub fn ramp_tag(text: &str) -> Result<String> {
    let body = type_body(text)?;
    body.find("ColorRamp")
        .map(|end| body[..end].to_string())
        .ok_or_else(|| StyleError::missing("ColorRamp"))
}

fn type_body(text: &str) -> Result<&str> {
    text.find(TYPE_PREFIX)
        .map(|start| &text[start + TYPE_PREFIX.len()..])
        .ok_or_else(|| StyleError::missing(TYPE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAPIDS: &str = r#"{"type":"CIMPolygonSymbol","symbolLayers":[{"type":"CIMVectorMarker","enable":true,"markerGraphics":[{"type":"CIMMarkerGraphic","symbol":{"type":"CIMPolygonSymbol","symbolLayers":[{"type":"CIMSolidStroke","enable":true,"width":0,"color":{"type":"CIMRGBColor","values":[51,51,51,100]}},{"type":"CIMSolidFill","enable":true,"color":{"type":"CIMCMYKColor","values":[100,45,0,0,100]}}],"angleAlignment":"Map"}}]}],"angleAlignment":"Map"}"#;

    #[test]
    fn test_extracts_fill_then_stroke() {
        let colors = extract_colors(RAPIDS).unwrap();
        assert_eq!(colors.len(), 2);

        assert_eq!(colors[0].kind, ColorKind::SolidFill);
        assert_eq!(
            colors[0].content,
            r#"{"type":"CIMCMYKColor","values":[100,45,0,0,100]}"#
        );
        assert_eq!(colors[1].kind, ColorKind::SolidStroke);
        assert_eq!(
            colors[1].content,
            r#"{"type":"CIMRGBColor","values":[51,51,51,100]}"#
        );

        let tags: Vec<String> = colors.iter().map(|c| color_tag(&c.content).unwrap()).collect();
        assert_eq!(tags, vec!["CMYK;[100,45,0,0,100]", "RGB;[51,51,51,100]"]);
    }

    #[test]
    fn test_picture_fill_uses_new_color() {
        let text = r#"{"type":"CIMPolygonSymbol","symbolLayers":[{"type":"CIMPictureFill","url":"file:///a b.png","newColor":{"type":"CIMHSVColor","values":[240,0,57,100]}}]}"#;
        let colors = extract_colors(text).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].kind, ColorKind::PictureFill);
        assert_eq!(color_tag(&colors[0].content).unwrap(), "HSV;[240,0,57,100]");
    }

    #[test]
    fn test_symbol_without_colors() {
        let text = r#"{"type":"CIMPointSymbol","symbolLayers":[{"type":"CIMCharacterMarker"}]}"#;
        assert!(extract_colors(text).unwrap().is_empty());
    }

    #[test]
    fn test_fill_without_color_is_malformed() {
        let text = r#"{"type":"CIMPolygonSymbol","symbolLayers":[{"type":"CIMSolidFill","enable":true}]}"#;
        assert!(matches!(
            extract_colors(text),
            Err(StyleError::MalformedFragment { .. })
        ));
    }

    #[test]
    fn test_ramp_tag() {
        let text = r#"{"type":"CIMMultipartColorRamp","colorRamps":[{"type":"CIMPolarContinuousColorRamp"}],"weights":[1,1,1]}"#;
        assert_eq!(ramp_tag(text).unwrap(), "Multipart");
    }

    #[test]
    fn test_tag_anchors_missing() {
        assert!(color_tag(r#"{"values":[1,2]}"#).is_err());
        assert!(color_tag(r#"{"type":"CIMRGBColor"}"#).is_err());
        assert!(ramp_tag(r#"{"type":"CIMPointSymbol"}"#).is_err());
    }
}
