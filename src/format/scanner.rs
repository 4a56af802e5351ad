//! Scanner
//!
//! Splits tree descriptions into words and punctuation. A word is either a
//! run of characters that are neither whitespace nor punctuation, or a
//! double quoted string with `\` escapes. `//` and `/* */` comments are
//! skipped. Numbers are words; the parser decides how to read them.
use crate::errors::{ParseError, ParseErrorKind};
use std::borrow::Cow;
use std::fmt;

/// Characters that form tokens of their own.
pub const PUNCTUATION: &str = "{}(),:;|<>=[]~\"";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Punct(char),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "\"{}\"", w),
            Token::Punct(c) => write!(f, "'{}'", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !PUNCTUATION.contains(c)
}

/// Quote a name if the scanner would not read it back as one word.
pub fn quote(name: &str) -> Cow<'_, str> {
    let plain = !name.is_empty() && name.chars().all(is_word_char) && !name.contains("//") && !name.contains("/*");
    if plain {
        return Cow::Borrowed(name);
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Token stream over a string, always positioned on one token.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    token: Token,
    token_line: usize,
    token_column: usize,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned on the first token.
    pub fn new(src: &'a str) -> Result<Self, ParseError> {
        let mut scanner = Scanner {
            src,
            pos: 0,
            line: 1,
            column: 1,
            token: Token::Eof,
            token_line: 1,
            token_column: 1,
        };
        scanner.advance()?;
        Ok(scanner)
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Line and column of the current token, both starting at 1.
    pub fn position(&self) -> (usize, usize) {
        (self.token_line, self.token_column)
    }

    pub fn is_eof(&self) -> bool {
        self.token == Token::Eof
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.token == Token::Punct(c)
    }

    /// An error located at the current token.
    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.token_line, self.token_column)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_blanks(&mut self) {
        loop {
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if rest.starts_with("/*") {
                self.bump();
                self.bump();
                while !self.src[self.pos..].is_empty() && !self.src[self.pos..].starts_with("*/") {
                    self.bump();
                }
                self.bump();
                self.bump();
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            } else {
                return;
            }
        }
    }

    /// Read the next token.
    pub fn advance(&mut self) -> Result<(), ParseError> {
        self.skip_blanks();
        self.token_line = self.line;
        self.token_column = self.column;
        let Some(c) = self.peek() else {
            self.token = Token::Eof;
            return Ok(());
        };
        if c == '"' {
            self.bump();
            let mut word = String::new();
            loop {
                match self.bump() {
                    None => return Err(self.error(ParseErrorKind::UnterminatedString)),
                    Some('"') => break,
                    Some('\\') => match self.bump() {
                        Some(escaped) => word.push(escaped),
                        None => return Err(self.error(ParseErrorKind::UnterminatedString)),
                    },
                    Some(other) => word.push(other),
                }
            }
            self.token = Token::Word(word);
        } else if PUNCTUATION.contains(c) {
            self.bump();
            self.token = Token::Punct(c);
        } else {
            let start = self.pos;
            while self.peek().is_some_and(is_word_char) {
                let rest = &self.src[self.pos..];
                if rest.starts_with("//") || rest.starts_with("/*") {
                    break;
                }
                self.bump();
            }
            self.token = Token::Word(self.src[start..self.pos].to_string());
        }
        Ok(())
    }
}
