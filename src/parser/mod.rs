//! レイヤー定義テキストの寛容なドキュメントツリー。
//!
//! 各ノードは自分が読み取られた元テキストの部分文字列を保持するので、
//! ブロブ内のバイト範囲をいつでも復元できる。末尾カンマと `NaN` / `Infinity`
//! は受け付ける。

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0},
    combinator::{map, opt},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, separated_pair, terminated},
    IResult, Offset, Parser,
};
use std::borrow::Cow;

use crate::error::{Result, StyleError};

/// ブロブ先頭からのバイト範囲（end は排他的）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue<'a> {
    Object(Vec<Member<'a>>),
    Array(Vec<Node<'a>>),
    /// 引用符の内側、エスケープ未解釈
    String(&'a str),
    Number(&'a str),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member<'a> {
    pub key: &'a str,
    pub value: Node<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    pub text: &'a str,
    pub value: NodeValue<'a>,
}

impl<'a> Node<'a> {
    pub fn get(&self, key: &str) -> Option<&Node<'a>> {
        match &self.value {
            NodeValue::Object(members) => members
                .iter()
                .find(|member| member.key == key)
                .map(|member| &member.value),
            _ => None,
        }
    }

    pub fn members(&self) -> &[Member<'a>] {
        match &self.value {
            NodeValue::Object(members) => members,
            _ => &[],
        }
    }

    pub fn as_array(&self) -> Option<&[Node<'a>]> {
        match &self.value {
            NodeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(flag) => Some(flag),
            _ => None,
        }
    }

    /// JSON エスケープを解釈した文字列値
    pub fn as_str(&self) -> Option<Cow<'a, str>> {
        match self.value {
            NodeValue::String(raw) if !raw.contains('\\') => Some(Cow::Borrowed(raw)),
            NodeValue::String(raw) => serde_json::from_str::<String>(&format!("\"{}\"", raw))
                .ok()
                .map(Cow::Owned),
            _ => None,
        }
    }

    /// `"type"` メンバーの値
    pub fn type_name(&self) -> Option<&'a str> {
        match self.get("type")?.value {
            NodeValue::String(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn is_type(&self, type_name: &str) -> bool {
        self.type_name() == Some(type_name)
    }

    /// 自身を含む深さ優先（先行順）の走査
    pub fn descendants(&self) -> Descendants<'_, 'a> {
        Descendants { stack: vec![self] }
    }

    /// 深さ優先で最初に見つかった `key` メンバーの値
    pub fn find_key(&self, key: &str) -> Option<&Node<'a>> {
        self.descendants().find_map(|node| node.get(key))
    }

    pub fn find_type(&self, type_name: &str) -> Option<&Node<'a>> {
        self.descendants().find(|node| node.is_type(type_name))
    }
}

pub struct Descendants<'n, 'a> {
    stack: Vec<&'n Node<'a>>,
}

impl<'n, 'a> Iterator for Descendants<'n, 'a> {
    type Item = &'n Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        match &node.value {
            NodeValue::Object(members) => self
                .stack
                .extend(members.iter().rev().map(|member| &member.value)),
            NodeValue::Array(items) => self.stack.extend(items.iter().rev()),
            _ => {}
        }
        Some(node)
    }
}

#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    root: Node<'a>,
}

impl<'a> Document<'a> {
    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn root(&self) -> &Node<'a> {
        &self.root
    }

    pub fn span_of(&self, node: &Node<'a>) -> Span {
        let start = self.source.offset(node.text);
        Span {
            start,
            end: start + node.text.len(),
        }
    }
}

pub fn parse_document(source: &str) -> Result<Document<'_>> {
    let body = source.strip_prefix('\u{feff}').unwrap_or(source);

    match ws(node).parse(body) {
        Ok(("", root)) => Ok(Document { source, root }),
        Ok((rest, _)) => Err(StyleError::Parse {
            offset: source.offset(rest),
            message: "unexpected characters after the document".to_string(),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(StyleError::Parse {
            offset: source.offset(e.input),
            message: format!("{:?}", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(StyleError::Parse {
            offset: source.len(),
            message: "unexpected end of text".to_string(),
        }),
    }
}

// --- Combinators ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn node(input: &str) -> IResult<&str, Node<'_>> {
    let (rest, value) = alt((object, array, string_value, keyword, number)).parse(input)?;
    let text = &input[..input.offset(rest)];
    Ok((rest, Node { text, value }))
}

fn object(input: &str) -> IResult<&str, NodeValue<'_>> {
    map(
        delimited(
            char('{'),
            terminated(separated_list0(char(','), ws(member)), opt(char(','))),
            ws(char('}')),
        ),
        NodeValue::Object,
    )
    .parse(input)
}

fn member(input: &str) -> IResult<&str, Member<'_>> {
    map(
        separated_pair(string_raw, ws(char(':')), node),
        |(key, value)| Member { key, value },
    )
    .parse(input)
}

fn array(input: &str) -> IResult<&str, NodeValue<'_>> {
    map(
        delimited(
            char('['),
            terminated(separated_list0(char(','), ws(node)), opt(char(','))),
            ws(char(']')),
        ),
        NodeValue::Array,
    )
    .parse(input)
}

fn string_value(input: &str) -> IResult<&str, NodeValue<'_>> {
    map(string_raw, NodeValue::String).parse(input)
}

fn string_raw(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('"').parse(input)?;

    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Ok((&body[i + 1..], &body[..i])),
            _ => escaped = false,
        }
    }

    // 閉じ引用符がない
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn keyword(input: &str) -> IResult<&str, NodeValue<'_>> {
    alt((
        map(tag("true"), |_| NodeValue::Bool(true)),
        map(tag("false"), |_| NodeValue::Bool(false)),
        map(tag("null"), |_| NodeValue::Null),
        map(alt((tag("NaN"), tag("-Infinity"), tag("Infinity"))), NodeValue::Number),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, NodeValue<'_>> {
    map(recognize_float, NodeValue::Number).parse(input)
}
