#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// Floating-point number; `inf` and `nan` arrive as identifiers
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e-05
    /// ```
    Float(f64),

    /// Imaginary number, a numeric literal with a `j` suffix
    ///
    /// # Examples
    /// ```text
    /// 2j
    /// 0.5j
    /// ```
    Imaginary(f64),

    /// Text literal in single or double quotes
    String(String),

    /// Byte-string literal, ASCII only
    ///
    /// # Examples
    /// ```text
    /// b'\x00\xff'
    /// ```
    Bytes(Vec<u8>),

    /// `True` / `False`
    Boolean(bool),

    /// `None`
    None,

    /// `...`, the wildcard marker
    Ellipsis,

    // Names
    /// Mnemonic, operand name or keyword (`def`, `global`, `closure`, `in`, `is`, `not`)
    ///
    /// Must start with a letter or underscore, followed by letters, digits, or underscores.
    Identifier(String),

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Newline,

    // Operators
    /// `=` in bindings and parameter defaults
    Assign,
    /// `-` before a numeric literal
    Minus,
    /// `+` joining the parts of a complex literal
    Plus,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    Eof,
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(n) => format!("integer {n}"),
            Token::Float(n) => format!("float {n}"),
            Token::Imaginary(n) => format!("imaginary {n}j"),
            Token::String(s) => format!("string {s:?}"),
            Token::Bytes(_) => "byte string".to_string(),
            Token::Boolean(b) => format!("boolean {b}"),
            Token::None => "None".to_string(),
            Token::Ellipsis => "'...'".to_string(),
            Token::Identifier(name) => format!("'{name}'"),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Newline => "end of line".to_string(),
            Token::Assign => "'='".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
