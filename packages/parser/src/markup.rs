//! Markup front-end.
//!
//! Parses tag-structured source (`<button label="Save" onClick={save}>`)
//! into a list of [`MarkupNode`]s. Tag interiors are lexed with logos;
//! content between tags is scanned directly since text has no tokens.

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::ops::Range;

/// Tokens inside `<...>`
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TagToken<'src> {
    #[regex(r"[A-Za-z_:@$][A-Za-z0-9_.:@$-]*", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| lex.slice())]
    SingleQuoted(&'src str),

    #[token("=")]
    Equals,

    #[token("{")]
    LBrace,

    #[token("/>")]
    SelfClose,

    #[token(">")]
    Close,

    #[token("/")]
    Slash,
}

/// Node of the markup intermediate structure
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    /// Text content, whitespace collapsed, then entities decoded
    Text(String),
    /// `{...}` in content position, raw source without braces
    Expression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
    pub span: Range<usize>,
}

impl MarkupElement {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    pub fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, MarkupNode::Element(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    pub pos: usize,
}

impl Attribute {
    fn new(name: &str, value: AttrValue, pos: usize) -> Self {
        Self {
            name: name.to_string(),
            value,
            pos,
        }
    }
}

/// Raw attribute value as written
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Bare attribute (`disabled`)
    Flag,
    /// Quoted string, entities decoded
    Quoted(String),
    /// `{...}` expression, raw source without braces
    Braced(String),
}

/// Elements that never have a body, matched case-insensitively
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Parse a markup document
pub fn parse_markup(source: &str) -> ParseResult<Vec<MarkupNode>> {
    MarkupParser::new(source).parse_document()
}

/// Parser over markup source
pub struct MarkupParser<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> MarkupParser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    /// Parse the whole source as a node list
    pub fn parse_document(&mut self) -> ParseResult<Vec<MarkupNode>> {
        self.parse_nodes(None)
    }

    /// Parse a single element starting at byte offset `pos` of `source`.
    /// Returns the nodes (several for a `<>` fragment) and the offset just
    /// past the element.
    pub fn parse_embedded(source: &'src str, pos: usize) -> ParseResult<(Vec<MarkupNode>, usize)> {
        let mut parser = Self { source, pos };
        let nodes = parser.parse_element()?;
        Ok((nodes, parser.pos))
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Parse sibling nodes until the parent's closing tag (or EOF at top level)
    fn parse_nodes(&mut self, parent: Option<(&str, usize)>) -> ParseResult<Vec<MarkupNode>> {
        let mut nodes = Vec::new();

        loop {
            if self.is_at_end() {
                return match parent {
                    Some((tag, pos)) => Err(ParseError::UnclosedTag {
                        pos,
                        tag: tag.to_string(),
                    }),
                    None => Ok(nodes),
                };
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_comment()?;
            } else if rest.starts_with("</") {
                let close_pos = self.pos;
                let name = self.parse_closing_tag()?;
                return match parent {
                    Some((tag, _)) if tag == name => Ok(nodes),
                    Some((tag, _)) => Err(ParseError::MismatchedClosingTag {
                        pos: close_pos,
                        expected: tag.to_string(),
                        found: name.to_string(),
                    }),
                    None => Err(ParseError::unexpected_token(
                        close_pos,
                        "element or text",
                        format!("</{}>", name),
                    )),
                };
            } else if rest.starts_with('<') {
                nodes.extend(self.parse_element()?);
            } else if rest.starts_with('{') {
                let (raw, end) = scan_braced(self.source, self.pos)?;
                self.pos = end;
                let raw = raw.trim();
                if !is_comment_expression(raw) {
                    nodes.push(MarkupNode::Expression(raw.to_string()));
                }
            } else {
                let end = rest
                    .find(|c| c == '<' || c == '{')
                    .map(|i| self.pos + i)
                    .unwrap_or(self.source.len());
                let text = decode_entities(&collapse_whitespace(&self.source[self.pos..end]));
                self.pos = end;
                if !text.is_empty() {
                    nodes.push(MarkupNode::Text(text));
                }
            }
        }
    }

    fn skip_comment(&mut self) -> ParseResult<()> {
        match self.rest().find("-->") {
            Some(i) => {
                self.pos += i + 3;
                Ok(())
            }
            None => Err(ParseError::unexpected_eof(self.source.len(), "'-->'")),
        }
    }

    /// Parse `</name>` (or `</>`) and return the name
    fn parse_closing_tag(&mut self) -> ParseResult<&'src str> {
        let base = self.pos + 2;
        let mut lex = TagToken::lexer(&self.source[base..]);

        let name = match lex.next() {
            Some(Ok(TagToken::Name(name))) => {
                match lex.next() {
                    Some(Ok(TagToken::Close)) => {}
                    Some(Ok(other)) => {
                        return Err(ParseError::unexpected_token(
                            base + lex.span().start,
                            "'>'",
                            format!("{:?}", other),
                        ))
                    }
                    Some(Err(())) => return Err(ParseError::lexer_error(base + lex.span().start)),
                    None => return Err(ParseError::unexpected_eof(self.source.len(), "'>'")),
                }
                name
            }
            Some(Ok(TagToken::Close)) => "",
            Some(Ok(other)) => {
                return Err(ParseError::unexpected_token(
                    base + lex.span().start,
                    "closing tag name",
                    format!("{:?}", other),
                ))
            }
            Some(Err(())) => return Err(ParseError::lexer_error(base + lex.span().start)),
            None => return Err(ParseError::unexpected_eof(self.source.len(), "closing tag name")),
        };

        self.pos = base + lex.span().end;
        Ok(name)
    }

    /// Parse `<tag attrs...>children</tag>`, `<tag/>` or `<>children</>`
    fn parse_element(&mut self) -> ParseResult<Vec<MarkupNode>> {
        let start = self.pos;
        let base = start + 1;
        let mut lex = TagToken::lexer(&self.source[base..]);

        let tag = match lex.next() {
            Some(Ok(TagToken::Name(name))) => name.to_string(),
            Some(Ok(TagToken::Close)) => {
                // Fragment: children are spliced into the enclosing list
                self.pos = base + lex.span().end;
                return self.parse_nodes(Some(("", start)));
            }
            Some(Ok(other)) => {
                return Err(ParseError::unexpected_token(
                    base + lex.span().start,
                    "tag name",
                    format!("{:?}", other),
                ))
            }
            Some(Err(())) => return Err(ParseError::lexer_error(base + lex.span().start)),
            None => return Err(ParseError::unexpected_eof(self.source.len(), "tag name")),
        };

        let mut attributes = Vec::new();
        let mut pending: Option<(&str, usize)> = None;
        let mut awaiting_value = false;

        let self_closing = loop {
            let token = match lex.next() {
                Some(Ok(token)) => token,
                Some(Err(())) => return Err(ParseError::lexer_error(base + lex.span().start)),
                None => return Err(ParseError::unexpected_eof(self.source.len(), "'>'")),
            };
            let at = base + lex.span().start;

            match token {
                TagToken::Name(name) => {
                    if awaiting_value {
                        return Err(ParseError::unexpected_token(at, "attribute value", name));
                    }
                    if let Some((prev, pos)) = pending.replace((name, at)) {
                        attributes.push(Attribute::new(prev, AttrValue::Flag, pos));
                    }
                }
                TagToken::Equals => {
                    if pending.is_none() || awaiting_value {
                        return Err(ParseError::unexpected_token(at, "attribute name", "="));
                    }
                    awaiting_value = true;
                }
                TagToken::DoubleQuoted(raw) | TagToken::SingleQuoted(raw) => {
                    let (name, pos) = match pending.take() {
                        Some(attr) if awaiting_value => attr,
                        _ => return Err(ParseError::unexpected_token(at, "attribute name", raw)),
                    };
                    awaiting_value = false;
                    let inner = &raw[1..raw.len() - 1];
                    attributes.push(Attribute::new(
                        name,
                        AttrValue::Quoted(decode_entities(inner)),
                        pos,
                    ));
                }
                TagToken::LBrace => {
                    let (raw, end) = scan_braced(self.source, at)?;
                    lex.bump(end - (base + lex.span().end));

                    if awaiting_value {
                        if let Some((name, pos)) = pending.take() {
                            attributes.push(Attribute::new(
                                name,
                                AttrValue::Braced(raw.trim().to_string()),
                                pos,
                            ));
                        }
                        awaiting_value = false;
                    } else {
                        if let Some((prev, pos)) = pending.take() {
                            attributes.push(Attribute::new(prev, AttrValue::Flag, pos));
                        }
                        tracing::warn!("Ignoring spread attribute {{{}}} on <{}>", raw.trim(), tag);
                    }
                }
                TagToken::Close | TagToken::SelfClose => {
                    if awaiting_value {
                        return Err(ParseError::unexpected_token(at, "attribute value", "'>'"));
                    }
                    if let Some((prev, pos)) = pending.take() {
                        attributes.push(Attribute::new(prev, AttrValue::Flag, pos));
                    }
                    break token == TagToken::SelfClose;
                }
                TagToken::Slash => {
                    return Err(ParseError::unexpected_token(at, "'>' or attribute", "/"));
                }
            }
        };

        self.pos = base + lex.span().end;

        let children = if self_closing || is_void_element(&tag) {
            Vec::new()
        } else {
            self.parse_nodes(Some((&tag, start)))?
        };

        Ok(vec![MarkupNode::Element(MarkupElement {
            tag,
            attributes,
            children,
            span: start..self.pos,
        })])
    }
}

/// Find the `}` matching the `{` at `open`, skipping strings and comments.
/// Returns the inner text and the offset just past the closing brace.
pub fn scan_braced(source: &str, open: usize) -> ParseResult<(&str, usize)> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok((&source[open + 1..i], i + 1));
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i = skip_quoted(bytes, i, quote)?;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                match source[i + 2..].find("*/") {
                    Some(end) => i += end + 4,
                    None => return Err(ParseError::unexpected_eof(source.len(), "'*/'")),
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    Err(ParseError::unexpected_eof(source.len(), "'}'"))
}

/// Index just past the closing quote of the string starting at `start`
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> ParseResult<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(ParseError::unexpected_eof(bytes.len(), "closing quote"))
}

fn is_comment_expression(raw: &str) -> bool {
    raw.is_empty() || (raw.starts_with("/*") && raw.ends_with("*/"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode named and numeric character references
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(el) => el,
            other => panic!("Expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse_markup("<outer><inner></inner></outer>").unwrap();
        assert_eq!(nodes.len(), 1);

        let outer = element(&nodes[0]);
        assert_eq!(outer.tag, "outer");
        assert_eq!(outer.children.len(), 1);
        assert_eq!(element(&outer.children[0]).tag, "inner");
    }

    #[test]
    fn test_attribute_forms() {
        let nodes = parse_markup(
            r#"<button label="Save" kind='primary' count={3} disabled onClick={() => save({ a: "}" })} />"#,
        )
        .unwrap();
        let button = element(&nodes[0]);

        assert_eq!(button.attribute("label"), Some(&AttrValue::Quoted("Save".into())));
        assert_eq!(button.attribute("kind"), Some(&AttrValue::Quoted("primary".into())));
        assert_eq!(button.attribute("count"), Some(&AttrValue::Braced("3".into())));
        assert_eq!(button.attribute("disabled"), Some(&AttrValue::Flag));
        assert_eq!(
            button.attribute("onClick"),
            Some(&AttrValue::Braced(r#"() => save({ a: "}" })"#.into()))
        );
        assert!(button.children.is_empty());
    }

    #[test]
    fn test_text_and_expression_children() {
        let nodes = parse_markup("<p>\n  Hello &amp;   welcome\n</p><span>{name}</span>").unwrap();
        assert_eq!(nodes.len(), 2);

        let p = element(&nodes[0]);
        assert_eq!(p.children, vec![MarkupNode::Text("Hello & welcome".into())]);

        let span = element(&nodes[1]);
        assert_eq!(span.children, vec![MarkupNode::Expression("name".into())]);
    }

    #[test]
    fn test_void_elements_and_comments() {
        let nodes = parse_markup("<div><!-- note --><img src=\"a.png\"><br/>{/* hidden */}</div>").unwrap();
        let div = element(&nodes[0]);
        assert_eq!(div.children.len(), 2);
        assert_eq!(element(&div.children[0]).tag, "img");
        assert_eq!(element(&div.children[1]).tag, "br");
    }

    #[test]
    fn test_fragment_children_are_spliced() {
        let nodes = parse_markup("<list><><a/><b/></></list>").unwrap();
        let list = element(&nodes[0]);
        let tags: Vec<_> = list.children.iter().map(|c| element(c).tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let err = parse_markup("<a><b></a>").unwrap_err();
        assert_eq!(
            err,
            ParseError::MismatchedClosingTag {
                pos: 6,
                expected: "b".into(),
                found: "a".into(),
            }
        );
    }

    #[test]
    fn test_unclosed_tag() {
        let err = parse_markup("<section><p>hi</p>").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnclosedTag {
                pos: 0,
                tag: "section".into(),
            }
        );
    }

    #[test]
    fn test_parse_embedded_reports_end() {
        let source = "return (<row><cell/></row>);";
        let start = source.find('<').unwrap();
        let (nodes, end) = MarkupParser::parse_embedded(source, start).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(&source[end..], ");");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; & c"), "a <b> AB & c");
        assert_eq!(decode_entities("&unknown; x"), "&unknown; x");
    }
}
