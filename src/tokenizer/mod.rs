//! Tokenizer for BASIC source code
//!
//! Scans raw source text into a flat sequence of classified tokens. Scanning
//! never fails: anything unrecognised becomes an `Invalid` token and an
//! unclosed string becomes `UnterminatedStringLiteral`, leaving rejection to
//! the parser.

use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Broad classification of a token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    Invalid,
    Number,
    String,
    Punctuation,
    Operator,
    Keyword,
    ControlKeyword,
    Identifier,
}

/// Every kind of token the scanner can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals and names
    NumericLiteral,
    StringLiteral,
    UnterminatedStringLiteral,
    Identifier,

    // Keywords
    Print,
    If,
    Goto,
    Input,
    Let,
    Gosub,
    Return,
    Clear,
    List,
    Run,
    End,

    // Single character operators
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Caret,
    Ampersand,
    Pipe,
    Tilde,
    ExclamationMark,
    QuestionMark,
    Period,
    Equals,
    LessThan,
    GreaterThan,

    // Two character operators
    EqualsEquals,
    ExclamationMarkEquals,
    LessThanGreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    DoubleAsterisk,
    DoubleAmpersand,
    DoublePipe,
    ShiftLeft,
    ShiftRight,

    // Punctuation
    Newline,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    CurlyOpen,
    CurlyClose,
    Comma,
    Colon,
    Semicolon,

    Invalid,
}

impl TokenKind {
    /// Category this kind belongs to
    pub fn category(self) -> TokenCategory {
        use TokenKind::*;
        match self {
            NumericLiteral => TokenCategory::Number,
            StringLiteral | UnterminatedStringLiteral => TokenCategory::String,
            Identifier => TokenCategory::Identifier,
            Let => TokenCategory::Keyword,
            Print | If | Goto | Input | Gosub | Return | Clear | List | Run | End => {
                TokenCategory::ControlKeyword
            }
            Plus | Minus | Asterisk | Slash | Percent | Caret | Ampersand | Pipe | Tilde
            | ExclamationMark | QuestionMark | Period | Equals | LessThan | GreaterThan
            | EqualsEquals | ExclamationMarkEquals | LessThanGreaterThan | LessThanEquals
            | GreaterThanEquals | DoubleAsterisk | DoubleAmpersand | DoublePipe | ShiftLeft
            | ShiftRight => TokenCategory::Operator,
            Newline | ParenOpen | ParenClose | BracketOpen | BracketClose | CurlyOpen
            | CurlyClose | Comma | Colon | Semicolon => TokenCategory::Punctuation,
            Invalid => TokenCategory::Invalid,
        }
    }

    /// Check if this kind starts a statement
    pub fn is_keyword(self) -> bool {
        matches!(
            self.category(),
            TokenCategory::Keyword | TokenCategory::ControlKeyword
        )
    }
}

/// A single classified slice of the source text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Exact source text of the token
    pub lexeme: &'a str,
    /// 1-based source line
    pub line: usize,
    /// 1-based column (in characters) of the first character
    pub column: usize,
    /// The full source line the token starts on, without its line break
    pub source_line: &'a str,
}

impl<'a> Token<'a> {
    pub fn category(&self) -> TokenCategory {
        self.kind.category()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "end of line"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

// Keyword table, case-sensitive
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("PRINT", TokenKind::Print),
    ("IF", TokenKind::If),
    ("GOTO", TokenKind::Goto),
    ("INPUT", TokenKind::Input),
    ("LET", TokenKind::Let),
    ("GOSUB", TokenKind::Gosub),
    ("RETURN", TokenKind::Return),
    ("CLEAR", TokenKind::Clear),
    ("LIST", TokenKind::List),
    ("RUN", TokenKind::Run),
    ("END", TokenKind::End),
];

// Tried before the single character table
const TWO_CHAR_TOKENS: &[(&str, TokenKind)] = &[
    ("==", TokenKind::EqualsEquals),
    ("!=", TokenKind::ExclamationMarkEquals),
    ("<>", TokenKind::LessThanGreaterThan),
    ("<=", TokenKind::LessThanEquals),
    (">=", TokenKind::GreaterThanEquals),
    ("**", TokenKind::DoubleAsterisk),
    ("&&", TokenKind::DoubleAmpersand),
    ("||", TokenKind::DoublePipe),
    ("<<", TokenKind::ShiftLeft),
    (">>", TokenKind::ShiftRight),
];

const SINGLE_CHAR_TOKENS: &[(char, TokenKind)] = &[
    ('\n', TokenKind::Newline),
    ('+', TokenKind::Plus),
    ('-', TokenKind::Minus),
    ('*', TokenKind::Asterisk),
    ('/', TokenKind::Slash),
    ('%', TokenKind::Percent),
    ('^', TokenKind::Caret),
    ('&', TokenKind::Ampersand),
    ('|', TokenKind::Pipe),
    ('~', TokenKind::Tilde),
    ('!', TokenKind::ExclamationMark),
    ('?', TokenKind::QuestionMark),
    ('.', TokenKind::Period),
    ('=', TokenKind::Equals),
    ('<', TokenKind::LessThan),
    ('>', TokenKind::GreaterThan),
    ('(', TokenKind::ParenOpen),
    (')', TokenKind::ParenClose),
    ('[', TokenKind::BracketOpen),
    (']', TokenKind::BracketClose),
    ('{', TokenKind::CurlyOpen),
    ('}', TokenKind::CurlyClose),
    (',', TokenKind::Comma),
    (':', TokenKind::Colon),
    (';', TokenKind::Semicolon),
];

/// Create the lookup tables used during scanning
pub fn create_token_maps() -> (
    HashMap<&'static str, TokenKind>,
    HashMap<&'static str, TokenKind>,
    HashMap<char, TokenKind>,
) {
    let keywords = KEYWORDS.iter().copied().collect();
    let two_char = TWO_CHAR_TOKENS.iter().copied().collect();
    let single_char = SINGLE_CHAR_TOKENS.iter().copied().collect();
    (keywords, two_char, single_char)
}

/// Tokenize a complete BASIC source text
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Tokenizer::new(source).tokenize()
}

/// Scanner state over one source text
pub struct Tokenizer<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    // 1-based character column of `position`
    column: usize,
    // Text of the line `position` is on
    current_line: &'a str,
    keywords: HashMap<&'static str, TokenKind>,
    two_char_tokens: HashMap<&'static str, TokenKind>,
    single_char_tokens: HashMap<char, TokenKind>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        let (keywords, two_char_tokens, single_char_tokens) = create_token_maps();
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
            current_line: line_text(source, 0),
            keywords,
            two_char_tokens,
            single_char_tokens,
        }
    }

    /// Scan the whole source into tokens, in order
    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.current_char() {
            if c != '\n' && c.is_whitespace() {
                self.advance();
                continue;
            }

            let start = self.position;
            let line = self.line;
            let column = self.column;
            let source_line = self.current_line;

            let kind = if c.is_ascii_digit() {
                self.scan_number()
            } else if c == '"' {
                self.scan_string()
            } else if is_identifier_start(c) {
                self.scan_identifier(start)
            } else {
                self.scan_operator()
            };

            let token = Token {
                kind,
                lexeme: &self.source[start..self.position],
                line,
                column,
                source_line,
            };
            trace!(?token.kind, lexeme = token.lexeme, line, "token");
            tokens.push(token);
        }

        tokens
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.position += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
                self.current_line = line_text(self.source, self.position);
            } else {
                self.column += 1;
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut has_decimal = false;
        while let Some(c) = self.current_char() {
            if c == '.' {
                if has_decimal {
                    break;
                }
                has_decimal = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            self.advance();
        }
        TokenKind::NumericLiteral
    }

    fn scan_string(&mut self) -> TokenKind {
        // Opening quote
        self.advance();
        loop {
            match self.current_char() {
                None => return TokenKind::UnterminatedStringLiteral,
                Some('"') => {
                    self.advance();
                    return TokenKind::StringLiteral;
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while self.current_char().is_some_and(is_identifier_middle) {
            self.advance();
        }
        let identifier = &self.source[start..self.position];
        self.keywords
            .get(identifier)
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn scan_operator(&mut self) -> TokenKind {
        let rest = &self.source[self.position..];
        let mut chars = rest.chars();
        if let (Some(first), Some(second)) = (chars.next(), chars.next()) {
            let two = &rest[..first.len_utf8() + second.len_utf8()];
            if let Some(&kind) = self.two_char_tokens.get(two) {
                self.advance();
                self.advance();
                return kind;
            }
        }

        let kind = self
            .current_char()
            .and_then(|c| self.single_char_tokens.get(&c).copied())
            .unwrap_or(TokenKind::Invalid);
        self.advance();
        kind
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_middle(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn line_text(source: &str, line_start: usize) -> &str {
    let rest = &source[line_start..];
    let line = rest.split('\n').next().unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}
