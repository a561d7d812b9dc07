use std::fmt;

use thiserror::Error;

use crate::token::Token;

/// 1-based location in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character {ch:?} at {position}")]
    UnexpectedChar { ch: char, position: Position },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("invalid escape sequence \\{escape} at {position}")]
    InvalidEscape { escape: String, position: Position },

    #[error("invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },

    #[error("non-ASCII character {ch:?} in byte string at {position}")]
    NonAsciiBytes { ch: char, position: Position },
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Where the next character sits.
    pub fn location(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    /// Skips blanks and comments, stopping at line breaks.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == '#' {
                while self.current_char().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Reads the character after a backslash, returning the code point it stands for.
    fn read_escape(&mut self, start: Position) -> Result<u32, LexError> {
        let escape_position = self.location();
        let Some(ch) = self.current_char() else {
            return Err(LexError::UnterminatedString { position: start });
        };
        self.advance();

        let code = match ch {
            'n' => '\n' as u32,
            't' => '\t' as u32,
            'r' => '\r' as u32,
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            '\\' | '\'' | '"' => ch as u32,
            'x' => {
                let digits: String = (0..2).filter_map(|i| self.peek_char(i)).collect();
                let code = match u32::from_str_radix(&digits, 16) {
                    Ok(code) if digits.len() == 2 => code,
                    _ => {
                        return Err(LexError::InvalidEscape {
                            escape: format!("x{digits}"),
                            position: escape_position,
                        });
                    }
                };
                self.advance();
                self.advance();
                code
            }
            other => {
                return Err(LexError::InvalidEscape {
                    escape: other.to_string(),
                    position: escape_position,
                });
            }
        };
        Ok(code)
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.location();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let code = self.read_escape(start)?;
                    // Every escape yields a code point below 256.
                    result.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_bytes(&mut self, quote: char) -> Result<Vec<u8>, LexError> {
        let start = self.location();
        let mut result = Vec::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let code = self.read_escape(start)?;
                    result.push(code as u8);
                }
                c if c.is_ascii() => {
                    result.push(c as u8);
                    self.advance();
                }
                c => {
                    return Err(LexError::NonAsciiBytes {
                        ch: c,
                        position: self.location(),
                    });
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.location();
        let mut number = String::new();
        let mut is_float = false;

        self.read_digits(&mut number);

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            number.push('.');
            self.advance();
            self.read_digits(&mut number);
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char(1), Some('+' | '-'));
            let digit_offset = if signed { 2 } else { 1 };
            if self.peek_char(digit_offset).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                number.push('e');
                self.advance();
                if signed {
                    number.push(self.current_char().unwrap_or('+'));
                    self.advance();
                }
                self.read_digits(&mut number);
            }
        }

        let invalid = |text: &str| LexError::InvalidNumber {
            text: text.to_string(),
            position: start,
        };

        if matches!(self.current_char(), Some('j' | 'J')) {
            self.advance();
            let value = number.parse::<f64>().map_err(|_| invalid(&number))?;
            return Ok(Token::Imaginary(value));
        }

        if self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            let tail = self.read_identifier();
            return Err(invalid(&format!("{number}{tail}")));
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| invalid(&number))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| invalid(&number))
        }
    }

    /// Next token together with the position it starts at.
    pub fn next_spanned(&mut self) -> Result<(Token, Position), LexError> {
        self.skip_whitespace();
        let start = self.location();
        let token = self.next_token_at(start)?;
        Ok((token, start))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.next_spanned().map(|(token, _)| token)
    }

    fn single(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        Ok(token)
    }

    fn double(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        self.advance();
        Ok(token)
    }

    fn next_token_at(&mut self, start: Position) -> Result<Token, LexError> {
        match self.current_char() {
            None => Ok(Token::Eof),
            Some('\n') => self.single(Token::Newline),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some(',') => self.single(Token::Comma),
            Some(':') => self.single(Token::Colon),
            Some('-') => self.single(Token::Minus),
            Some('+') => self.single(Token::Plus),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::EqEq)
                } else {
                    self.single(Token::Assign)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    Err(LexError::UnexpectedChar {
                        ch: '!',
                        position: start,
                    })
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::LtEq)
                } else {
                    self.single(Token::Lt)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some('.') => {
                if self.peek_char(1) == Some('.') && self.peek_char(2) == Some('.') {
                    self.advance();
                    self.double(Token::Ellipsis)
                } else {
                    Err(LexError::UnexpectedChar {
                        ch: '.',
                        position: start,
                    })
                }
            }
            Some(quote @ ('"' | '\'')) => self.read_string(quote).map(Token::String),
            Some('b') if matches!(self.peek_char(1), Some('"' | '\'')) => {
                self.advance();
                let quote = self.current_char().unwrap_or('\'');
                self.read_bytes(quote).map(Token::Bytes)
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "True" => Ok(Token::Boolean(true)),
                    "False" => Ok(Token::Boolean(false)),
                    "None" => Ok(Token::None),
                    _ => Ok(Token::Identifier(ident)),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) => Err(LexError::UnexpectedChar {
                ch,
                position: start,
            }),
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("None True False ... def");
    assert_eq!(lexer.next_token(), Ok(Token::None));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Ellipsis));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("def".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_instruction_line() {
    let mut lexer = Lexer::new("  4 COMPARE_OP <=  # x <= y\n");
    assert_eq!(lexer.next_token(), Ok(Token::Integer(4)));
    assert_eq!(
        lexer.next_token(),
        Ok(Token::Identifier("COMPARE_OP".to_string()))
    );
    assert_eq!(lexer.next_token(), Ok(Token::LtEq));
    assert_eq!(lexer.next_token(), Ok(Token::Newline));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_numbers() {
    let mut lexer = Lexer::new("123 1.5 1e-05 2j 1e456");
    assert_eq!(lexer.next_token(), Ok(Token::Integer(123)));
    assert_eq!(lexer.next_token(), Ok(Token::Float(1.5)));
    assert_eq!(lexer.next_token(), Ok(Token::Float(1e-05)));
    assert_eq!(lexer.next_token(), Ok(Token::Imaginary(2.0)));
    assert_eq!(lexer.next_token(), Ok(Token::Float(f64::INFINITY)));
}

#[test]
fn test_strings_and_bytes() {
    let mut lexer = Lexer::new(r"'a\'b' b'\x00\xff' 'tab\tend'");
    assert_eq!(lexer.next_token(), Ok(Token::String("a'b".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Bytes(vec![0x00, 0xff])));
    assert_eq!(lexer.next_token(), Ok(Token::String("tab\tend".to_string())));
}

#[test]
fn test_errors_carry_positions() {
    let mut lexer = Lexer::new("LOAD_CONST 'open\n");
    assert!(lexer.next_token().is_ok());
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnterminatedString {
            position: Position { line: 1, column: 12 }
        })
    );

    let mut lexer = Lexer::new("\n  $");
    assert_eq!(lexer.next_token(), Ok(Token::Newline));
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnexpectedChar {
            ch: '$',
            position: Position { line: 2, column: 3 }
        })
    );
}
