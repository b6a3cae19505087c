use std::collections::HashSet;

use log::{debug, trace};

use crate::lexer::{LexError, Lexer, Spanned, Token};
use crate::schema::*;

/// A rejected schema, pointing at the offending line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("syntax error on line {line}: {kind} (`{content}`)")]
pub struct SyntaxError {
    /// 1-based line number.
    pub line: usize,
    /// The offending source line, trimmed.
    pub content: String,
    pub kind: SyntaxErrorKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected {found:?}, expected {expected}")]
    Unexpected { found: Token, expected: &'static str },
    #[error("table `{0}` is never closed")]
    UnterminatedBlock(String),
    #[error("annotation segment `{0}` has no `=`")]
    AnnotationMissingEquals(String),
    #[error("table `{0}` is declared twice")]
    DuplicateTable(String),
    #[error("attribute `{attribute}` is declared twice in table `{table}`")]
    DuplicateAttribute { table: String, attribute: String },
}

/// Parse DSL text into its tables, in declaration order.
pub fn parse(source: &str) -> Result<Vec<TableSchema>, SyntaxError> {
    Parser::new(source)?.parse()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, SyntaxError> {
        let tokens = Lexer::new(source).tokenize().map_err(|e| SyntaxError {
            line: e.line(),
            content: line_content(source, e.line()),
            kind: e.into(),
        })?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    fn current(&self) -> &Spanned {
        // The token stream always ends with Eof, which is never consumed past.
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.current().clone();
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(&self, line: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            line,
            content: line_content(self.source, line),
            kind,
        }
    }

    fn unexpected(&self, tok: Spanned, expected: &'static str) -> SyntaxError {
        self.error_at(
            tok.line,
            SyntaxErrorKind::Unexpected {
                found: tok.token,
                expected,
            },
        )
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), SyntaxError> {
        let tok = self.advance();
        if tok.token == expected {
            Ok(())
        } else {
            Err(self.unexpected(tok, what))
        }
    }

    fn expect_ident(&mut self, what: &'static str) -> Result<String, SyntaxError> {
        let tok = self.advance();
        match tok.token {
            Token::Ident(s) => Ok(s),
            _ => Err(self.unexpected(tok, what)),
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    pub fn parse(&mut self) -> Result<Vec<TableSchema>, SyntaxError> {
        let mut tables: Vec<TableSchema> = Vec::new();
        let mut seen = HashSet::new();

        loop {
            self.skip_newlines();
            if *self.peek() == Token::Eof {
                break;
            }
            if !self.check_ident("table") {
                let tok = self.advance();
                return Err(self.unexpected(tok, "`table`"));
            }

            let line = self.advance().line;
            let table = self.parse_table(line)?;
            if !seen.insert(table.name.clone()) {
                return Err(self.error_at(line, SyntaxErrorKind::DuplicateTable(table.name)));
            }
            trace!(table = table.name.as_str(), attributes = table.attributes.len(); "Parsed table");
            tables.push(table);
        }

        debug!(tables = tables.len(); "Schema parsed");
        Ok(tables)
    }

    fn parse_table(&mut self, line: usize) -> Result<TableSchema, SyntaxError> {
        let name = self.expect_ident("table name")?;
        self.expect(Token::LBrace, "`{`")?;

        let mut attributes: Vec<TableAttribute> = Vec::new();

        loop {
            self.skip_newlines();
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(self.error_at(line, SyntaxErrorKind::UnterminatedBlock(name)));
                }
                _ => {}
            }

            let attr_line = self.current().line;
            let attr = self.parse_attribute()?;
            if attributes.iter().any(|a| a.name == attr.name) {
                return Err(self.error_at(
                    attr_line,
                    SyntaxErrorKind::DuplicateAttribute {
                        table: name,
                        attribute: attr.name,
                    },
                ));
            }
            attributes.push(attr);

            // One attribute per line; the closing brace may share the last line.
            match self.peek() {
                Token::Newline => {
                    self.advance();
                }
                Token::RBrace => {}
                Token::Eof => {
                    return Err(self.error_at(line, SyntaxErrorKind::UnterminatedBlock(name)));
                }
                _ => {
                    let tok = self.advance();
                    return Err(self.unexpected(tok, "end of line"));
                }
            }
        }

        Ok(TableSchema { name, attributes })
    }

    fn parse_attribute(&mut self) -> Result<TableAttribute, SyntaxError> {
        let name = self.expect_ident("attribute name")?;

        let mut optional = self.eat(&Token::Question);
        let flags = if *self.peek() == Token::LParen {
            self.parse_flags()?
        } else {
            Vec::new()
        };
        if !optional {
            optional = self.eat(&Token::Question);
        }

        let tok = self.advance();
        let kind = match tok.token {
            Token::Colon => AttributeKind::Typed {
                ty: self.parse_type_text()?,
            },
            Token::Arrow if flags.is_empty() => {
                let table = self.expect_ident("referenced table")?;
                self.expect(Token::Dot, "`.`")?;
                let attribute = self.expect_ident("referenced attribute")?;
                AttributeKind::Reference { table, attribute }
            }
            Token::Arrow => return Err(self.unexpected(tok, "`:` after flags")),
            _ => return Err(self.unexpected(tok, "`:` or `->`")),
        };

        let extra = if let Token::Str(_) = self.peek() {
            self.parse_annotation()?
        } else {
            Vec::new()
        };

        Ok(TableAttribute {
            name,
            optional,
            flags,
            extra,
            kind,
        })
    }

    fn parse_flags(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(Token::LParen, "`(`")?;
        let mut flags = vec![self.expect_ident("flag name")?];
        while self.eat(&Token::Comma) {
            flags.push(self.expect_ident("flag name")?);
        }
        self.expect(Token::RParen, "`)`")?;
        Ok(flags)
    }

    /// Everything between `:` and the annotation or end of line, taken verbatim.
    fn parse_type_text(&mut self) -> Result<String, SyntaxError> {
        let mut span: Option<(usize, usize)> = None;
        while !matches!(
            self.peek(),
            Token::Newline | Token::RBrace | Token::Str(_) | Token::Eof
        ) {
            let tok = self.advance();
            span = Some(match span {
                Some((start, _)) => (start, tok.end),
                None => (tok.start, tok.end),
            });
        }

        match span {
            Some((start, end)) => Ok(self.source[start..end].trim().to_string()),
            None => {
                let tok = self.current().clone();
                Err(self.unexpected(tok, "type name"))
            }
        }
    }

    fn parse_annotation(&mut self) -> Result<Vec<Extra>, SyntaxError> {
        let tok = self.advance();
        let line = tok.line;
        let text = match tok.token {
            Token::Str(text) => text,
            found => {
                return Err(self.error_at(
                    line,
                    SyntaxErrorKind::Unexpected {
                        found,
                        expected: "annotation string",
                    },
                ));
            }
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        text.split(',')
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => Ok(Extra {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                }),
                None => Err(self.error_at(
                    line,
                    SyntaxErrorKind::AnnotationMissingEquals(segment.trim().to_string()),
                )),
            })
            .collect()
    }
}

fn line_content(source: &str, line: usize) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default()
        .trim()
        .to_string()
}
