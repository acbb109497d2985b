//! Script front-end.
//!
//! Extracts handler declarations and markup embedded in expression
//! position (`return <button/>`, `cond ? <a/> : <b/>`). Everything else
//! in a script is opaque; unknown characters are skipped rather than
//! rejected.

use crate::error::ParseResult;
use crate::markup::{MarkupNode, MarkupParser};
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum ScriptToken<'src> {
    // Keywords
    #[token("function")]
    Function,
    #[token("const")]
    Const,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("return")]
    Return,
    #[token("export")]
    Export,
    #[token("default")]
    Default,
    #[token("async")]
    Async,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    #[regex(r"`([^`\\]|\\.)*`")]
    Str,

    #[regex(r"[0-9][0-9_]*(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    // Punctuation
    #[token("=>")]
    Arrow,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("<")]
    Lt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Nullish,

    #[regex(r"[=!]==?|<=|>=")]
    Compare,

    #[regex(r"[-+*/%!.>|&^~#@\\]")]
    Punct,
}

impl ScriptToken<'_> {
    /// Whether an expression may start right after this token
    fn opens_expression(&self) -> bool {
        matches!(
            self,
            ScriptToken::Return
                | ScriptToken::Default
                | ScriptToken::LParen
                | ScriptToken::LBracket
                | ScriptToken::Eq
                | ScriptToken::Arrow
                | ScriptToken::Comma
                | ScriptToken::Question
                | ScriptToken::Colon
                | ScriptToken::AndAnd
                | ScriptToken::OrOr
                | ScriptToken::Nullish
        )
    }
}

/// Behavior module extracted from a script document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptModule {
    pub functions: Vec<FunctionDecl>,
    pub fragments: Vec<EmbeddedFragment>,
}

/// A named handler declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub exported: bool,
    pub pos: usize,
}

/// Markup found in expression position
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFragment {
    pub nodes: Vec<MarkupNode>,
    pub span: Range<usize>,
}

/// Parse a script document
pub fn parse_script(source: &str) -> ParseResult<ScriptModule> {
    let mut tokens: Vec<(ScriptToken, usize)> = Vec::new();
    let mut fragments = Vec::new();
    let mut lex = ScriptToken::lexer(source);

    while let Some(result) = lex.next() {
        let span = lex.span();
        let token = match result {
            Ok(token) => token,
            Err(()) => {
                tracing::trace!(pos = span.start, "skipping unrecognized script character");
                continue;
            }
        };

        if token == ScriptToken::Lt && starts_markup(source, span.end) {
            let in_expression = tokens
                .last()
                .map_or(true, |(prev, _)| prev.opens_expression());

            if in_expression {
                let (nodes, end) = MarkupParser::parse_embedded(source, span.start)?;
                fragments.push(EmbeddedFragment {
                    nodes,
                    span: span.start..end,
                });
                lex.bump(end - span.end);
                continue;
            }
        }

        tokens.push((token, span.start));
    }

    Ok(ScriptModule {
        functions: collect_functions(&tokens),
        fragments,
    })
}

fn starts_markup(source: &str, after_lt: usize) -> bool {
    source[after_lt..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '>')
}

/// Find `function name`, `const name = function` and
/// `const name = (...) =>` declarations
fn collect_functions(tokens: &[(ScriptToken, usize)]) -> Vec<FunctionDecl> {
    let mut functions = Vec::new();

    for (i, (token, pos)) in tokens.iter().enumerate() {
        let exported = i > 0
            && matches!(
                tokens.get(i - 1).map(|(t, _)| t),
                Some(ScriptToken::Export) | Some(ScriptToken::Default)
            );

        match token {
            ScriptToken::Function => {
                if let Some((ScriptToken::Ident(name), _)) = tokens.get(i + 1) {
                    // `const f = function g()` is reported once, as `f`
                    let assigned = i > 0 && matches!(tokens.get(i - 1), Some((ScriptToken::Eq, _)));
                    let assigned = assigned
                        || (i > 1
                            && matches!(tokens.get(i - 1), Some((ScriptToken::Async, _)))
                            && matches!(tokens.get(i - 2), Some((ScriptToken::Eq, _))));
                    if !assigned {
                        functions.push(FunctionDecl {
                            name: name.to_string(),
                            exported,
                            pos: *pos,
                        });
                    }
                }
            }
            ScriptToken::Const | ScriptToken::Let | ScriptToken::Var => {
                let (Some((ScriptToken::Ident(name), _)), Some((ScriptToken::Eq, _))) =
                    (tokens.get(i + 1), tokens.get(i + 2))
                else {
                    continue;
                };
                if is_function_value(tokens, i + 3) {
                    functions.push(FunctionDecl {
                        name: name.to_string(),
                        exported,
                        pos: *pos,
                    });
                }
            }
            _ => {}
        }
    }

    functions
}

fn is_function_value(tokens: &[(ScriptToken, usize)], mut i: usize) -> bool {
    if matches!(tokens.get(i), Some((ScriptToken::Async, _))) {
        i += 1;
    }

    match tokens.get(i) {
        Some((ScriptToken::Function, _)) => true,
        Some((ScriptToken::Ident(_), _)) => {
            matches!(tokens.get(i + 1), Some((ScriptToken::Arrow, _)))
        }
        Some((ScriptToken::LParen, _)) => {
            let mut depth = 0usize;
            for (offset, (token, _)) in tokens[i..].iter().enumerate() {
                match token {
                    ScriptToken::LParen => depth += 1,
                    ScriptToken::RParen => {
                        depth -= 1;
                        if depth == 0 {
                            return matches!(
                                tokens.get(i + offset + 1),
                                Some((ScriptToken::Arrow, _))
                            );
                        }
                    }
                    _ => {}
                }
            }
            false
        }
        _ => false,
    }
}
