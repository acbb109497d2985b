//! Style front-end.
//!
//! Parses stylesheet source into a flat list of rules. Rules are not yet
//! correlated back onto components; the serializer's attribute selectors
//! (`[data-tandem-id="..."]`) are the intended hook for that.

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum StyleToken<'src> {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    // Selector, at-rule prelude or declaration text
    #[regex(r"[^{};\s/]([^{};]*[^{};\s])?", |lex| lex.slice())]
    Chunk(&'src str),
}

/// Parsed stylesheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub rules: Vec<StyleRule>,
    /// Statement at-rules such as `@import url(x);`
    pub statements: Vec<String>,
}

/// One selector block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
    /// Enclosing at-rule prelude (`@media (max-width: 600px)`), if nested
    pub at_rule: Option<String>,
    #[serde(skip)]
    pub span: Range<usize>,
}

impl StyleRule {
    pub fn declaration(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse a stylesheet
pub fn parse_stylesheet(source: &str) -> ParseResult<StyleSheet> {
    StyleParser::new(source)?.parse_sheet()
}

/// Parse inline declarations (`color: red; padding: 4px`)
pub fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

struct StyleParser<'src> {
    tokens: Vec<(StyleToken<'src>, Range<usize>)>,
    pos: usize,
    len: usize,
}

impl<'src> StyleParser<'src> {
    fn new(source: &'src str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for (result, span) in StyleToken::lexer(source).spanned() {
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(()) => return Err(ParseError::lexer_error(span.start)),
            }
        }

        Ok(Self {
            tokens,
            pos: 0,
            len: source.len(),
        })
    }

    fn parse_sheet(&mut self) -> ParseResult<StyleSheet> {
        let mut sheet = StyleSheet::default();
        self.parse_block_contents(&mut sheet, None, None)?;

        if let Some((_, span)) = self.peek() {
            return Err(ParseError::unexpected_token(span.start, "rule", "'}'"));
        }
        Ok(sheet)
    }

    /// Parse rules until a closing brace (left unconsumed) or EOF
    fn parse_block_contents(
        &mut self,
        sheet: &mut StyleSheet,
        parent_selector: Option<&str>,
        at_rule: Option<&str>,
    ) -> ParseResult<()> {
        while let Some((token, span)) = self.peek().cloned() {
            match token {
                StyleToken::RBrace => return Ok(()),
                StyleToken::Semicolon => {
                    self.advance();
                }
                StyleToken::LBrace => {
                    return Err(ParseError::unexpected_token(span.start, "selector", "'{'"));
                }
                StyleToken::Chunk(prelude) => {
                    self.advance();
                    if self.match_token(StyleToken::Semicolon) || self.peek().is_none() {
                        sheet.statements.push(prelude.to_string());
                        continue;
                    }
                    self.expect(StyleToken::LBrace)?;

                    if prelude.starts_with('@') {
                        self.parse_block_contents(sheet, parent_selector, Some(prelude))?;
                    } else {
                        let selector = nest_selector(parent_selector, prelude);
                        self.parse_rule_body(sheet, selector, at_rule, span.start)?;
                    }
                    self.expect(StyleToken::RBrace)?;
                }
            }
        }
        Ok(())
    }

    /// Parse declarations (and nested rules) up to the closing brace
    fn parse_rule_body(
        &mut self,
        sheet: &mut StyleSheet,
        selector: String,
        at_rule: Option<&str>,
        start: usize,
    ) -> ParseResult<()> {
        let index = sheet.rules.len();
        sheet.rules.push(StyleRule {
            selector: selector.clone(),
            declarations: Vec::new(),
            at_rule: at_rule.map(str::to_string),
            span: start..start,
        });

        while let Some((token, span)) = self.peek().cloned() {
            match token {
                StyleToken::RBrace => {
                    sheet.rules[index].span = start..span.end;
                    return Ok(());
                }
                StyleToken::Semicolon => {
                    self.advance();
                }
                StyleToken::LBrace => {
                    return Err(ParseError::unexpected_token(span.start, "declaration", "'{'"));
                }
                StyleToken::Chunk(text) => {
                    self.advance();
                    if self.match_token(StyleToken::LBrace) {
                        let nested = nest_selector(Some(&selector), text);
                        self.parse_rule_body(sheet, nested, at_rule, span.start)?;
                        self.expect(StyleToken::RBrace)?;
                        continue;
                    }

                    let (name, value) = text.split_once(':').ok_or_else(|| {
                        ParseError::invalid_syntax(span.start, format!("Expected declaration, found '{}'", text))
                    })?;
                    sheet.rules[index]
                        .declarations
                        .push((name.trim().to_string(), value.trim().to_string()));
                }
            }
        }

        Err(ParseError::unexpected_eof(self.len, "'}'"))
    }

    fn peek(&self) -> Option<&(StyleToken<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn check(&self, token: StyleToken) -> bool {
        matches!(self.peek(), Some((t, _)) if std::mem::discriminant(t) == std::mem::discriminant(&token))
    }

    fn match_token(&mut self, token: StyleToken) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: StyleToken) -> ParseResult<()> {
        if self.match_token(token) {
            return Ok(());
        }
        match self.peek() {
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                format!("{:?}", token),
                format!("{:?}", found),
            )),
            None => Err(ParseError::unexpected_eof(self.len, format!("{:?}", token))),
        }
    }
}

fn nest_selector(parent: Option<&str>, selector: &str) -> String {
    match parent {
        Some(parent) if selector.contains('&') => selector.replace('&', parent),
        Some(parent) => format!("{} {}", parent, selector),
        None => selector.to_string(),
    }
}
