use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),

    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    Colon,    // :
    Question, // ?
    Dot,      // .
    Arrow,    // ->
    /// Any other punctuation. Only meaningful inside a type name.
    Symbol(char),
    Newline,

    Eof,
}

/// A token with the 1-based line it starts on and its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character {ch:?}")]
    UnexpectedChar { ch: char, line: usize },
    #[error("unterminated string")]
    UnterminatedString { line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedChar { line, .. } | Self::UnterminatedString { line } => *line,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some((_, '\n')) => break,
                Some((_, c)) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some((_, '#')) => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(&(_, c)) = self.chars.peek() {
            if is_ident_char(c) {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(s),
                Some((_, '\\')) => {
                    if let Some((_, c)) = self.chars.next() {
                        match c {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            _ => s.push(c),
                        }
                    }
                }
                // Annotations never span lines.
                Some((_, '\n')) | None => {
                    return Err(LexError::UnterminatedString { line: self.line });
                }
                Some((_, c)) => s.push(c),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let (start, c) = match self.chars.next() {
            Some(next) => next,
            None => {
                let end = self.input.len();
                return Ok(Spanned {
                    token: Token::Eof,
                    line,
                    start: end,
                    end,
                });
            }
        };

        let token = match c {
            '\n' => {
                self.line += 1;
                Token::Newline
            }
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '?' => Token::Question,
            '.' => Token::Dot,
            '-' if matches!(self.chars.peek(), Some((_, '>'))) => {
                self.chars.next();
                Token::Arrow
            }
            '"' => Token::Str(self.read_string()?),
            c if is_ident_char(c) => Token::Ident(self.read_ident(c)),
            c if c.is_control() => return Err(LexError::UnexpectedChar { ch: c, line }),
            c => Token::Symbol(c),
        };

        Ok(Spanned {
            token,
            line,
            start,
            end: self.offset(),
        })
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.token == Token::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
