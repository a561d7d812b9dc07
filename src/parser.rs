use std::mem;

use thiserror::Error;

use crate::{
    ast::{BinaryOp, CompareOp, UnaryOp},
    instruction::{Container, Conversion, Instruction, Merge, Scope, unsupported_construct},
    lexer::{LexError, Lexer, Position},
    template::{Parameter, Template},
    token::Token,
    value::Value,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("unknown instruction '{mnemonic}' at {position}")]
    UnknownInstruction { mnemonic: String, position: Position },

    #[error("invalid header at {position}: {message}")]
    InvalidHeader { message: String, position: Position },

    #[error("invalid literal at {position}: {message}")]
    InvalidLiteral { message: String, position: Position },
}

/// Reads an instruction listing into a [`Template`].
///
/// ```text
/// def query(limit=10):
///     global table = 'events'
///     LOAD_GLOBAL select
///     LOAD_METHOD from_
///     ...
///     RETURN_VALUE
/// ```
///
/// Operands may also be given the way disassemblers print them
/// (`LOAD_FAST 0 (x)`); leading offsets, line numbers and `>>` markers
/// are skipped.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    position: Position,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let (current_token, position) = lexer.next_spanned()?;
        Ok(Parser {
            lexer,
            current_token,
            position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let (token, position) = self.lexer.next_spanned()?;
        self.current_token = token;
        self.position = position;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(&self.current_token, Token::Identifier(name) if name == keyword)
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::Unexpected {
            expected: expected.into(),
            found: self.current_token.describe(),
            position: self.position,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(expected.describe()));
        }
        self.advance()
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            other => {
                self.current_token = other;
                Err(self.unexpected("a name"))
            }
        }
    }

    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match self.current_token {
            Token::Newline => self.advance(),
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    /// Parses the whole listing.
    pub fn parse_template(&mut self) -> Result<Template, ParseError> {
        let mut header: Option<(String, Vec<Parameter>)> = None;
        let mut globals = Vec::new();
        let mut closure = Vec::new();
        let mut code = Vec::new();

        loop {
            if self.check(&Token::Eof) {
                break;
            }
            if self.check(&Token::Newline) {
                self.advance()?;
                continue;
            }

            if self.check_keyword("def") {
                if header.is_some() || !globals.is_empty() || !closure.is_empty() || !code.is_empty() {
                    return Err(ParseError::InvalidHeader {
                        message: "`def` must be the first line".to_string(),
                        position: self.position,
                    });
                }
                header = Some(self.parse_header()?);
            } else if self.check_keyword("global") {
                self.advance()?;
                globals.push(self.parse_binding()?);
            } else if self.check_keyword("closure") {
                self.advance()?;
                closure.push(self.parse_binding()?);
            } else {
                code.push(self.parse_instruction()?);
            }
            self.expect_line_end()?;
        }

        let (name, params) = header.unwrap_or_else(|| ("query".to_string(), Vec::new()));
        let mut template = Template::new(name).with_code(code);
        for param in params {
            template = template.with_parameter(param);
        }
        for (name, value) in globals {
            template = template.with_global(name, value);
        }
        for (name, value) in closure {
            template = template.with_closure(name, value);
        }
        Ok(template)
    }

    /// `def NAME(p1, p2=LITERAL, ...)[:]`
    fn parse_header(&mut self) -> Result<(String, Vec<Parameter>), ParseError> {
        self.advance()?; // def
        let name = self.expect_identifier()?;
        self.expect(Token::LParen)?;

        let mut params: Vec<Parameter> = Vec::new();
        while !self.check(&Token::RParen) {
            let position = self.position;
            let param = self.expect_identifier()?;
            if params.iter().any(|existing| existing.name == param) {
                return Err(ParseError::InvalidHeader {
                    message: format!("duplicate parameter '{param}'"),
                    position,
                });
            }

            let default = if self.check(&Token::Assign) {
                self.advance()?;
                Some(self.parse_literal()?)
            } else {
                if params.iter().any(|existing| existing.default.is_some()) {
                    return Err(ParseError::InvalidHeader {
                        message: format!("parameter '{param}' without a default follows one with a default"),
                        position,
                    });
                }
                None
            };
            params.push(Parameter { name: param, default });

            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                break;
            }
        }

        self.expect(Token::RParen)?;
        if self.check(&Token::Colon) {
            self.advance()?;
        }
        Ok((name, params))
    }

    /// `NAME = LITERAL`
    fn parse_binding(&mut self) -> Result<(String, Value), ParseError> {
        let name = self.expect_identifier()?;
        self.expect(Token::Assign)?;
        let value = self.parse_literal()?;
        Ok((name, value))
    }

    /// Skips offsets, line numbers and jump-target markers in front of a mnemonic.
    fn skip_line_prefix(&mut self) -> Result<(), ParseError> {
        while matches!(self.current_token, Token::Integer(_) | Token::Gt) {
            self.advance()?;
        }
        Ok(())
    }

    fn parse_instruction(&mut self) -> Result<Instruction, ParseError> {
        self.skip_line_prefix()?;
        let position = self.position;
        let mnemonic = self.expect_identifier()?;

        let instruction = match mnemonic.as_str() {
            "NOP" => Instruction::Nop,
            "EXTENDED_ARG" => Instruction::ExtendedArg(self.parse_count()? as u32),
            "POP_TOP" => Instruction::PopTop,
            "ROT_TWO" => Instruction::RotTwo,
            "ROT_THREE" => Instruction::RotThree,
            "ROT_FOUR" => Instruction::RotFour,
            "ROT_N" => Instruction::RotN(self.parse_count()?),
            "DUP_TOP" => Instruction::DupTop,
            "DUP_TOP_TWO" => Instruction::DupTopTwo,

            "UNARY_POSITIVE" => Instruction::Unary(UnaryOp::Positive),
            "UNARY_NEGATIVE" => Instruction::Unary(UnaryOp::Negative),
            "UNARY_NOT" => Instruction::Unary(UnaryOp::Not),
            "UNARY_INVERT" => Instruction::Unary(UnaryOp::Invert),

            "COMPARE_OP" => Instruction::Compare(self.parse_compare_operator()?),
            "IS_OP" => Instruction::Compare(if self.parse_count()? == 0 {
                CompareOp::Is
            } else {
                CompareOp::IsNot
            }),
            "CONTAINS_OP" => Instruction::Compare(if self.parse_count()? == 0 {
                CompareOp::In
            } else {
                CompareOp::NotIn
            }),
            "STORE_SUBSCR" => Instruction::StoreSubscript,
            "DELETE_SUBSCR" => Instruction::DeleteSubscript,

            "LOAD_CONST" => Instruction::LoadConst(self.parse_const_operand()?),
            "LOAD_ATTR" => Instruction::LoadAttr(self.parse_name_operand()?),
            "LOAD_METHOD" => Instruction::LoadMethod(self.parse_name_operand()?),

            "LIST_TO_TUPLE" => Instruction::ListToTuple,
            "UNPACK_SEQUENCE" => Instruction::UnpackSequence(self.parse_count()?),
            "UNPACK_EX" => {
                let operand = self.parse_count()?;
                Instruction::UnpackEx {
                    before: operand & 0xff,
                    after: operand >> 8,
                }
            }

            "CALL_FUNCTION" => Instruction::CallFunction(self.parse_count()?),
            "CALL_FUNCTION_KW" => Instruction::CallFunctionKw(self.parse_count()?),
            "CALL_FUNCTION_EX" => Instruction::CallFunctionEx {
                keywords: self.parse_count()? & 1 != 0,
            },
            "CALL_METHOD" => Instruction::CallMethod(self.parse_count()?),

            "FORMAT_VALUE" => {
                let flags = self.parse_count()?;
                let conversion = match flags & 0x03 {
                    0 => Conversion::None,
                    1 => Conversion::Str,
                    2 => Conversion::Repr,
                    _ => Conversion::Ascii,
                };
                Instruction::FormatValue {
                    conversion,
                    with_spec: flags & 0x04 != 0,
                }
            }
            "RETURN_VALUE" => Instruction::ReturnValue,

            other => {
                if let Some(op) = BinaryOp::from_mnemonic(other) {
                    Instruction::Binary(op)
                } else if let Some(container) = Container::from_mnemonic(other) {
                    Instruction::Build(container, self.parse_count()?)
                } else if let Some(merge) = Merge::from_mnemonic(other) {
                    Instruction::Merge(merge, self.parse_count()?)
                } else if let Some(instruction) = self.parse_scoped(other)? {
                    instruction
                } else if let Some(construct) = unsupported_construct(other) {
                    self.skip_operands()?;
                    Instruction::Unsupported {
                        mnemonic: other.to_string(),
                        construct,
                    }
                } else {
                    return Err(ParseError::UnknownInstruction {
                        mnemonic: other.to_string(),
                        position,
                    });
                }
            }
        };

        // Disassemblers annotate some numeric operands, e.g. `FORMAT_VALUE 2 (repr)`.
        if self.check(&Token::LParen) {
            self.skip_group()?;
        }
        Ok(instruction)
    }

    /// `LOAD_*`, `STORE_*` and `DELETE_*` over a name scope.
    fn parse_scoped(&mut self, mnemonic: &str) -> Result<Option<Instruction>, ParseError> {
        let Some((action, suffix)) = mnemonic.split_once('_') else {
            return Ok(None);
        };
        let Some(scope) = Scope::from_suffix(suffix) else {
            return Ok(None);
        };
        let instruction = match action {
            "LOAD" => Instruction::Load(scope, self.parse_name_operand()?),
            "STORE" => Instruction::Store(scope, self.parse_name_operand()?),
            "DELETE" => Instruction::Delete(scope, self.parse_name_operand()?),
            _ => return Ok(None),
        };
        Ok(Some(instruction))
    }

    fn parse_count(&mut self) -> Result<usize, ParseError> {
        match self.current_token {
            Token::Integer(n) if n >= 0 => {
                self.advance()?;
                Ok(n as usize)
            }
            _ => Err(self.unexpected("a non-negative integer operand")),
        }
    }

    /// `name`, or the disassembler form `INDEX (name)`.
    fn parse_name_operand(&mut self) -> Result<String, ParseError> {
        if matches!(self.current_token, Token::Integer(_)) {
            self.advance()?;
            self.expect(Token::LParen)?;
            let name = self.expect_identifier()?;
            self.expect(Token::RParen)?;
            return Ok(name);
        }
        self.expect_identifier()
    }

    /// A literal, or the disassembler form `INDEX (literal)`.
    fn parse_const_operand(&mut self) -> Result<Value, ParseError> {
        if matches!(self.current_token, Token::Integer(_)) {
            let value = self.parse_literal()?;
            if !self.check(&Token::LParen) {
                return Ok(value);
            }
            // The integer was a constant index; the shown value follows.
            return self.parse_literal();
        }
        self.parse_literal()
    }

    fn parse_compare_operator(&mut self) -> Result<CompareOp, ParseError> {
        if matches!(self.current_token, Token::Integer(_)) {
            self.advance()?;
            self.expect(Token::LParen)?;
            let op = self.parse_compare_operator()?;
            self.expect(Token::RParen)?;
            return Ok(op);
        }

        if self.check_keyword("is") {
            self.advance()?;
            if self.check_keyword("not") {
                self.advance()?;
                return Ok(CompareOp::IsNot);
            }
            return Ok(CompareOp::Is);
        }
        if self.check_keyword("not") {
            self.advance()?;
            if !self.check_keyword("in") {
                return Err(self.unexpected("'in'"));
            }
            self.advance()?;
            return Ok(CompareOp::NotIn);
        }

        let op = match &self.current_token {
            Token::Lt => CompareOp::Less,
            Token::LtEq => CompareOp::LessOrEquals,
            Token::EqEq => CompareOp::Equals,
            Token::NotEq => CompareOp::NotEquals,
            Token::Gt => CompareOp::Greater,
            Token::GtEq => CompareOp::GreaterOrEquals,
            Token::Identifier(word) if word == "in" => CompareOp::In,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance()?;
        Ok(op)
    }

    fn skip_operands(&mut self) -> Result<(), ParseError> {
        while !matches!(self.current_token, Token::Newline | Token::Eof) {
            self.advance()?;
        }
        Ok(())
    }

    fn skip_group(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.current_token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.advance();
                    }
                }
                Token::Newline | Token::Eof => return Err(self.unexpected("')'")),
                _ => {}
            }
            self.advance()?;
        }
    }

    fn invalid_literal(&self, message: impl Into<String>) -> ParseError {
        ParseError::InvalidLiteral {
            message: message.into(),
            position: self.position,
        }
    }

    /// Parses a constant literal.
    pub fn parse_literal(&mut self) -> Result<Value, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::None => {
                self.advance()?;
                Ok(Value::Null)
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Value::Boolean(b))
            }
            Token::Ellipsis => {
                self.advance()?;
                Ok(Value::Wildcard)
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Value::Text(s))
            }
            Token::Bytes(b) => {
                self.advance()?;
                Ok(Value::Bytes(b))
            }
            token @ (Token::Integer(_) | Token::Float(_) | Token::Imaginary(_)) => {
                self.current_token = token;
                self.parse_number(false)
            }
            Token::Minus => {
                self.advance()?;
                self.parse_number(true)
            }
            Token::Identifier(word) => {
                self.current_token = Token::Identifier(word.clone());
                match word.as_str() {
                    "inf" | "nan" => self.parse_number(false),
                    "Ellipsis" => {
                        self.advance()?;
                        Ok(Value::Wildcard)
                    }
                    "range" => self.parse_range(),
                    "set" => {
                        self.advance()?;
                        self.expect(Token::LParen)?;
                        self.expect(Token::RParen)?;
                        Ok(Value::Set(Vec::new()))
                    }
                    _ => Err(self.unexpected("a literal")),
                }
            }
            Token::LParen => {
                self.advance()?;
                self.parse_tuple()
            }
            Token::LBracket => {
                self.advance()?;
                let items = self.parse_items(Token::RBracket)?;
                Ok(Value::List(items))
            }
            Token::LBrace => {
                self.advance()?;
                self.parse_braced()
            }
            other => {
                self.current_token = other;
                Err(self.unexpected("a literal"))
            }
        }
    }

    fn parse_real(&mut self, negative: bool) -> Result<Value, ParseError> {
        let value = match self.current_token {
            Token::Integer(n) => Value::Integer(if negative { -n } else { n }),
            Token::Float(n) => Value::Float(if negative { -n } else { n }),
            Token::Identifier(ref word) if word == "inf" => {
                Value::Float(if negative { f64::NEG_INFINITY } else { f64::INFINITY })
            }
            Token::Identifier(ref word) if word == "nan" => Value::Float(f64::NAN),
            Token::Imaginary(n) => Value::Complex {
                re: 0.0,
                im: if negative { -n } else { n },
            },
            _ => return Err(self.unexpected("a number")),
        };
        self.advance()?;
        Ok(value)
    }

    /// A number, possibly followed by `+Nj` / `-Nj` to form a complex value.
    fn parse_number(&mut self, negative: bool) -> Result<Value, ParseError> {
        let real = self.parse_real(negative)?;

        let sign = match self.current_token {
            Token::Plus => 1.0,
            Token::Minus => -1.0,
            _ => return Ok(real),
        };
        let Some(re) = real.as_float() else {
            return Err(self.invalid_literal("complex literal needs a real part first"));
        };
        self.advance()?;
        match self.current_token {
            Token::Imaginary(im) => {
                self.advance()?;
                Ok(Value::Complex { re, im: sign * im })
            }
            _ => Err(self.unexpected("an imaginary number")),
        }
    }

    fn parse_integer(&mut self) -> Result<i64, ParseError> {
        match self.parse_number(false)? {
            Value::Integer(n) => Ok(n),
            _ => Err(self.invalid_literal("range bounds must be integers")),
        }
    }

    /// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`
    fn parse_range(&mut self) -> Result<Value, ParseError> {
        self.advance()?; // range
        self.expect(Token::LParen)?;

        let mut bounds = Vec::new();
        while !self.check(&Token::RParen) {
            let negative = self.check(&Token::Minus);
            if negative {
                self.advance()?;
            }
            let bound = self.parse_integer()?;
            bounds.push(if negative { -bound } else { bound });
            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect(Token::RParen)?;

        let (start, stop, step) = match bounds[..] {
            [stop] => (0, stop, 1),
            [start, stop] => (start, stop, 1),
            [start, stop, step] => (start, stop, step),
            _ => return Err(self.invalid_literal("range takes 1 to 3 bounds")),
        };
        if step == 0 {
            return Err(self.invalid_literal("range step must not be zero"));
        }
        Ok(Value::Range { start, stop, step })
    }

    /// After `(`: the empty tuple, a tuple, or a parenthesised literal.
    fn parse_tuple(&mut self) -> Result<Value, ParseError> {
        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(Value::Tuple(Vec::new()));
        }

        let first = self.parse_literal()?;
        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(first);
        }

        self.expect(Token::Comma)?;
        let mut items = vec![first];
        items.extend(self.parse_items(Token::RParen)?);
        Ok(Value::Tuple(items))
    }

    /// Comma-separated literals up to and including `close`; a trailing comma is allowed.
    fn parse_items(&mut self, close: Token) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.parse_literal()?);
            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    /// After `{`: a map (`{}` included) or a set.
    fn parse_braced(&mut self) -> Result<Value, ParseError> {
        if self.check(&Token::RBrace) {
            self.advance()?;
            return Ok(Value::Map(Vec::new()));
        }

        let first = self.parse_literal()?;
        if !self.check(&Token::Colon) {
            let mut items = vec![first];
            if self.check(&Token::Comma) {
                self.advance()?;
                items.extend(self.parse_items(Token::RBrace)?);
            } else {
                self.expect(Token::RBrace)?;
            }
            return Ok(Value::set(items));
        }

        let mut entries = Vec::new();
        let mut key = first;
        loop {
            self.expect(Token::Colon)?;
            let value = self.parse_literal()?;
            entries.push((key, value));

            if self.check(&Token::Comma) {
                self.advance()?;
            }
            if self.check(&Token::RBrace) {
                break;
            }
            key = self.parse_literal()?;
        }
        self.expect(Token::RBrace)?;
        Ok(Value::map(entries))
    }
}
