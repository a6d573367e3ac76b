//! Lexer for Quill
//!
//! Converts source text into a flat sequence of tokens. Whitespace and
//! comments are skipped; everything else becomes a lexeme.

use crate::error::LexError;
use crate::token::Token;

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Tokenize the entire source
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments()?;

        let Some(&(start, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let text = match ch {
            // Two-character operators take priority over their first char
            '-' if self.rest().starts_with("->") => {
                self.advance();
                self.advance();
                "->".to_string()
            }
            '=' if self.rest().starts_with("==") => {
                self.advance();
                self.advance();
                "==".to_string()
            }
            '!' if self.rest().starts_with("!=") => {
                self.advance();
                self.advance();
                "!=".to_string()
            }

            // String literals keep their quotes; no escape processing
            '"' => self.scan_string()?,

            // Number literals: digits and decimal points
            c if c.is_ascii_digit() || c == '.' => self.scan_number(),

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),

            // Everything else is a single-character symbol
            _ => {
                self.advance();
                self.source[start..self.current_pos].to_string()
            }
        };

        Ok(Some(Token::new(text)))
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
            Some(ch)
        } else {
            None
        }
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    /// The unconsumed tail of the source
    fn rest(&self) -> &str {
        &self.source[self.current_pos..]
    }

    /// Skip whitespace (including newlines) and both comment forms
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            let Some(&(_, ch)) = self.chars.peek() else {
                return Ok(());
            };

            match ch {
                c if c.is_whitespace() => {
                    self.advance();
                }

                '/' if self.rest().starts_with("//") => {
                    // Skip to end of line
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }

                '/' if self.rest().starts_with("/*") => {
                    self.advance();
                    self.advance();
                    loop {
                        if self.rest().starts_with("*/") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance().is_none() {
                            return Err(LexError::UnterminatedBlockComment);
                        }
                    }
                }

                _ => return Ok(()),
            }
        }
    }

    /// Scan a string literal, greedy up to the closing quote
    fn scan_string(&mut self) -> Result<String, LexError> {
        let start = self.current_pos;

        // Consume opening quote
        self.advance();

        loop {
            match self.advance() {
                Some('"') => return Ok(self.source[start..self.current_pos].to_string()),
                Some(_) => {}
                None => return Err(LexError::UnterminatedString),
            }
        }
    }

    /// Scan a number literal
    fn scan_number(&mut self) -> String {
        let start = self.current_pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        self.source[start..self.current_pos].to_string()
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> String {
        let start = self.current_pos;

        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.source[start..self.current_pos].to_string()
    }
}
