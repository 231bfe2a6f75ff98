//! Parser for BASIC programs
//!
//! Consumes the token sequence line by line and builds the program's AST.
//! Every line starts with a line number; the rest of the line is a single
//! statement selected by its leading keyword.

use crate::ast::{BinaryOperator, Node, NodeArena, NodeId, NodeKind};
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::program::Program;
use crate::tokenizer::{Token, TokenKind};
use tracing::{debug, trace};

/// Deepest nesting of parentheses and `IF` statements accepted in one line
pub const MAX_NESTING: usize = 256;

/// Parse a token sequence into a program
pub fn generate_ast(tokens: &[Token<'_>]) -> Result<Program, SyntaxError> {
    debug!(tokens = tokens.len(), "generating AST");
    let program = Parser::new(tokens).parse()?;
    Ok(program.with_source_lines(source_lines(tokens)))
}

/// Source text of every line the tokens came from, one copy per line
fn source_lines(tokens: &[Token<'_>]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for token in tokens {
        if token.line > lines.len() {
            // Lines holding only whitespace produce no tokens
            lines.resize(token.line - 1, String::new());
            lines.push(token.source_line.to_string());
        }
    }
    lines
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    arena: NodeArena,
    statements: Vec<NodeId>,
    // The next token must be a line number
    fresh_line: bool,
    // Open parentheses and nested IF statements
    depth: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            arena: NodeArena::new(),
            statements: Vec::new(),
            fresh_line: true,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxError> {
        while let Some(token) = self.peek() {
            trace!(kind = ?token.kind, lexeme = token.lexeme, "parser at token");

            if self.fresh_line {
                let label = self.parse_label()?;
                self.statements.push(label);
                self.fresh_line = false;
                continue;
            }

            if token.kind == TokenKind::Newline {
                self.pos += 1;
                self.fresh_line = true;
                continue;
            }

            let statement = self.parse_statement()?;
            self.statements.push(statement);
            self.expect_end_of_statement()?;
        }

        Program::new(self.arena, self.statements)
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn alloc(&mut self, kind: NodeKind, at: Token<'a>) -> NodeId {
        self.arena.alloc(Node::new(kind, at.line, at.column))
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested<T>(
        &mut self,
        at: Option<Token<'a>>,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(SyntaxErrorKind::NestingTooDeep(MAX_NESTING), at));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Build an error located at `token`, or at the end of the last token
    fn error(&self, kind: SyntaxErrorKind, token: Option<Token<'a>>) -> SyntaxError {
        match token.or_else(|| self.tokens.last().copied()) {
            Some(t) => SyntaxError::new(kind, t.line, t.column),
            None => SyntaxError::new(kind, 1, 1),
        }
    }

    fn describe(token: Option<Token<'a>>) -> String {
        token.map_or_else(|| "end of input".to_string(), |t| t.to_string())
    }

    fn parse_label(&mut self) -> Result<NodeId, SyntaxError> {
        let token = self.advance();
        match token {
            Some(t) if t.kind == TokenKind::NumericLiteral => {
                let line_number = parse_line_number(t.lexeme).ok_or_else(|| {
                    self.error(
                        SyntaxErrorKind::InvalidLineNumber(t.lexeme.to_string()),
                        token,
                    )
                })?;
                debug!(line_number, "found line number");
                Ok(self.alloc(NodeKind::Label(line_number), t))
            }
            _ => Err(self.error(SyntaxErrorKind::ExpectedLineNumber, token)),
        }
    }

    fn expect_end_of_statement(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(t) if t.kind == TokenKind::Newline => Ok(()),
            Some(t) => Err(self.error(
                SyntaxErrorKind::TrailingTokens(t.lexeme.to_string()),
                Some(t),
            )),
        }
    }

    /// Parse one statement starting at its keyword
    fn parse_statement(&mut self) -> Result<NodeId, SyntaxError> {
        let token = self.advance();
        let Some(keyword) = token else {
            return Err(self.error(
                SyntaxErrorKind::UnknownStatement(Self::describe(None)),
                None,
            ));
        };

        let kind = match keyword.kind {
            TokenKind::Print => NodeKind::Print(self.parse_expr_list()?),
            TokenKind::Let => {
                let name = self.expect_identifier()?;
                self.expect_equals()?;
                let value = self.parse_expression()?;
                NodeKind::Let { name, value }
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::Goto => NodeKind::Goto(self.parse_line_target()?),
            TokenKind::Gosub => NodeKind::Gosub(self.parse_line_target()?),
            TokenKind::Input => NodeKind::Input(self.expect_identifier()?),
            TokenKind::Return => NodeKind::Return,
            TokenKind::Clear => NodeKind::Clear,
            TokenKind::List => NodeKind::List,
            TokenKind::Run => NodeKind::Run,
            TokenKind::End => NodeKind::End,
            TokenKind::UnterminatedStringLiteral => {
                return Err(self.error(SyntaxErrorKind::UnterminatedString, token));
            }
            _ => {
                return Err(self.error(
                    SyntaxErrorKind::UnknownStatement(keyword.to_string()),
                    token,
                ));
            }
        };

        debug!(statement = ?keyword.kind, line = keyword.line, "found statement");
        Ok(self.alloc(kind, keyword))
    }

    /// IF condition [THEN] statement, or IF condition [THEN] line
    fn parse_if(&mut self) -> Result<NodeKind, SyntaxError> {
        let condition = self.parse_expression()?;

        if let Some(t) = self.peek() {
            if t.kind == TokenKind::Identifier && t.lexeme == "THEN" {
                self.pos += 1;
            }
        }

        let then = match self.peek() {
            Some(t) if t.kind == TokenKind::NumericLiteral => {
                let target = self.parse_line_target()?;
                self.alloc(NodeKind::Goto(target), t)
            }
            Some(t) if t.kind.is_keyword() => self.nested(Some(t), Self::parse_statement)?,
            other => {
                return Err(self.error(
                    SyntaxErrorKind::UnknownStatement(Self::describe(other)),
                    other,
                ));
            }
        };

        Ok(NodeKind::If { condition, then })
    }

    fn parse_line_target(&mut self) -> Result<u32, SyntaxError> {
        let token = self.advance();
        match token {
            Some(t) if t.kind == TokenKind::NumericLiteral => parse_line_number(t.lexeme)
                .ok_or_else(|| {
                    self.error(
                        SyntaxErrorKind::InvalidLineNumber(t.lexeme.to_string()),
                        token,
                    )
                }),
            _ => Err(self.error(SyntaxErrorKind::ExpectedLineNumber, token)),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SyntaxError> {
        let token = self.advance();
        match token {
            Some(t) if t.kind == TokenKind::Identifier => Ok(t.lexeme.to_string()),
            _ => Err(self.error(
                SyntaxErrorKind::ExpectedIdentifier(Self::describe(token)),
                token,
            )),
        }
    }

    fn expect_equals(&mut self) -> Result<(), SyntaxError> {
        let token = self.advance();
        match token {
            Some(t) if t.kind == TokenKind::Equals => Ok(()),
            _ => Err(self.error(
                SyntaxErrorKind::ExpectedEquals(Self::describe(token)),
                token,
            )),
        }
    }

    /// Whitespace separated expressions up to the end of the line
    fn parse_expr_list(&mut self) -> Result<Vec<NodeId>, SyntaxError> {
        let mut exprs = Vec::new();

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Newline => break,
                TokenKind::UnterminatedStringLiteral => {
                    return Err(self.error(SyntaxErrorKind::UnterminatedString, Some(token)));
                }
                kind if starts_operand(kind) => exprs.push(self.parse_expression()?),
                _ => {
                    return Err(self.error(
                        SyntaxErrorKind::UnexpectedToken(token.to_string()),
                        Some(token),
                    ));
                }
            }
        }

        Ok(exprs)
    }

    /// Comparisons bind looser than the arithmetic chain
    fn parse_expression(&mut self) -> Result<NodeId, SyntaxError> {
        let mut lhs = self.parse_arithmetic()?;

        while let Some(op) = self.peek_kind().and_then(comparison_operator) {
            let at = self.advance();
            let rhs = self.parse_arithmetic()?;
            lhs = self.binary(op, lhs, rhs, at);
        }

        Ok(lhs)
    }

    /// Left-associative chain of + - * / with a single precedence level
    fn parse_arithmetic(&mut self) -> Result<NodeId, SyntaxError> {
        let mut lhs = self.parse_operand()?;

        while let Some(op) = self.peek_kind().and_then(arithmetic_operator) {
            let at = self.advance();
            let rhs = self.parse_operand()?;
            lhs = self.binary(op, lhs, rhs, at);
        }

        Ok(lhs)
    }

    fn binary(
        &mut self,
        op: BinaryOperator,
        lhs: NodeId,
        rhs: NodeId,
        at: Option<Token<'a>>,
    ) -> NodeId {
        let (line, column) = match at {
            Some(t) => (t.line, t.column),
            None => {
                let first = self.arena.get(lhs);
                (first.line, first.column)
            }
        };
        self.arena
            .alloc(Node::new(NodeKind::BinaryOp { op, lhs, rhs }, line, column))
    }

    fn parse_operand(&mut self) -> Result<NodeId, SyntaxError> {
        let token = self.peek();
        let Some(t) = token else {
            return Err(self.error(
                SyntaxErrorKind::ExpectedExpression(Self::describe(None)),
                None,
            ));
        };

        let kind = match t.kind {
            TokenKind::NumericLiteral => {
                let value = t.lexeme.parse::<f64>().map_err(|_| {
                    self.error(
                        SyntaxErrorKind::ExpectedExpression(t.lexeme.to_string()),
                        token,
                    )
                })?;
                NodeKind::NumberLiteral(value)
            }
            TokenKind::StringLiteral => NodeKind::StringLiteral(unescape(t.lexeme)),
            TokenKind::UnterminatedStringLiteral => {
                return Err(self.error(SyntaxErrorKind::UnterminatedString, token));
            }
            TokenKind::Identifier => NodeKind::VariableRef(t.lexeme.to_string()),
            TokenKind::ParenOpen => {
                self.pos += 1;
                let inner = self.nested(token, Self::parse_expression)?;
                let close = self.advance();
                return match close {
                    Some(c) if c.kind == TokenKind::ParenClose => Ok(inner),
                    _ => Err(self.error(
                        SyntaxErrorKind::UnclosedParen(Self::describe(close)),
                        close,
                    )),
                };
            }
            _ => {
                return Err(self.error(
                    SyntaxErrorKind::ExpectedExpression(t.to_string()),
                    token,
                ));
            }
        };

        self.pos += 1;
        Ok(self.alloc(kind, t))
    }
}

fn starts_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::NumericLiteral
            | TokenKind::StringLiteral
            | TokenKind::Identifier
            | TokenKind::ParenOpen
    )
}

fn arithmetic_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        TokenKind::Asterisk => Some(BinaryOperator::Multiply),
        TokenKind::Slash => Some(BinaryOperator::Divide),
        _ => None,
    }
}

fn comparison_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Equals | TokenKind::EqualsEquals => Some(BinaryOperator::Equal),
        TokenKind::ExclamationMarkEquals | TokenKind::LessThanGreaterThan => {
            Some(BinaryOperator::NotEqual)
        }
        TokenKind::LessThan => Some(BinaryOperator::LessThan),
        TokenKind::LessThanEquals => Some(BinaryOperator::LessThanOrEqual),
        TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
        TokenKind::GreaterThanEquals => Some(BinaryOperator::GreaterThanOrEqual),
        _ => None,
    }
}

/// Line numbers are plain unsigned integers
fn parse_line_number(lexeme: &str) -> Option<u32> {
    if lexeme.chars().all(|c| c.is_ascii_digit()) {
        lexeme.parse().ok()
    } else {
        None
    }
}

/// Strip the quotes of a string literal and resolve backslash escapes
fn unescape(lexeme: &str) -> String {
    let inner = lexeme.strip_prefix('"').unwrap_or(lexeme);
    let inner = inner.strip_suffix('"').unwrap_or(inner);

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(c);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(source: &str) -> Result<Program, SyntaxError> {
        generate_ast(&tokenize(source))
    }

    fn statement_kinds(program: &Program) -> Vec<NodeKind> {
        program
            .statements()
            .map(|(_, id)| program.node(id).kind.clone())
            .collect()
    }

    fn error_kind(source: &str) -> SyntaxErrorKind {
        parse(source).unwrap_err().kind
    }

    #[test]
    fn test_no_newline_at_end() {
        let program = parse("10 PRINT \"Hello World!\"\n20 END").unwrap();
        assert_eq!(program.size(), 6);
    }

    #[test]
    fn test_label_precedes_statement() {
        let program = parse("10 PRINT \"Hello World!\"\n20 END").unwrap();
        let kinds = statement_kinds(&program);
        assert_eq!(kinds.len(), 4);
        assert_eq!(kinds[0], NodeKind::Label(10));
        assert!(matches!(kinds[1], NodeKind::Print(ref exprs) if exprs.len() == 1));
        assert_eq!(kinds[2], NodeKind::Label(20));
        assert_eq!(kinds[3], NodeKind::End);
    }

    #[test]
    fn test_string_literal_is_unquoted() {
        let program = parse(r#"10 PRINT "a \"b\" c""#).unwrap();
        let print = program.node(program.nodes()[1]);
        let NodeKind::Print(exprs) = &print.kind else {
            panic!("expected Print, got {:?}", print.kind);
        };
        assert_eq!(
            program.node(exprs[0]).kind,
            NodeKind::StringLiteral(r#"a "b" c"#.to_string())
        );
    }

    #[test]
    fn test_expression_list_splits_on_operands() {
        let program = parse("10 PRINT \"A\" 1 + 2 X").unwrap();
        let NodeKind::Print(exprs) = &program.node(program.nodes()[1]).kind else {
            panic!("expected Print");
        };
        assert_eq!(exprs.len(), 3);
        assert!(matches!(
            program.node(exprs[1]).kind,
            NodeKind::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
        assert_eq!(
            program.node(exprs[2]).kind,
            NodeKind::VariableRef("X".to_string())
        );
    }

    #[test]
    fn test_arithmetic_is_left_associative() {
        // 2 + 3 * 4 parses as (2 + 3) * 4
        let program = parse("10 LET X = 2 + 3 * 4").unwrap();
        let NodeKind::Let { value, .. } = &program.node(program.nodes()[1]).kind else {
            panic!("expected Let");
        };
        let NodeKind::BinaryOp { op, lhs, .. } = &program.node(*value).kind else {
            panic!("expected BinaryOp");
        };
        assert_eq!(*op, BinaryOperator::Multiply);
        assert!(matches!(
            program.node(*lhs).kind,
            NodeKind::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_parenthesized_expression() {
        let program = parse("10 LET X = 2 + (3 * 4)").unwrap();
        let NodeKind::Let { value, .. } = &program.node(program.nodes()[1]).kind else {
            panic!("expected Let");
        };
        let NodeKind::BinaryOp { op, rhs, .. } = &program.node(*value).kind else {
            panic!("expected BinaryOp");
        };
        assert_eq!(*op, BinaryOperator::Add);
        assert!(matches!(
            program.node(*rhs).kind,
            NodeKind::BinaryOp {
                op: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_let() {
        let program = parse("10 LET NAME = \"Ada\"").unwrap();
        assert!(matches!(
            &program.node(program.nodes()[1]).kind,
            NodeKind::Let { name, .. } if name == "NAME"
        ));
    }

    #[test]
    fn test_parse_control_statements() {
        let program = parse(
            "10 GOTO 30\n20 GOSUB 40\n30 RETURN\n40 INPUT A\n50 CLEAR\n60 LIST\n70 RUN\n80 END\n",
        )
        .unwrap();
        let kinds: Vec<_> = statement_kinds(&program)
            .into_iter()
            .filter(|k| !matches!(k, NodeKind::Label(_)))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Goto(30),
                NodeKind::Gosub(40),
                NodeKind::Return,
                NodeKind::Input("A".to_string()),
                NodeKind::Clear,
                NodeKind::List,
                NodeKind::Run,
                NodeKind::End,
            ]
        );
    }

    #[test]
    fn test_parse_if_with_statement() {
        let program = parse("10 IF X > 1 PRINT \"big\"").unwrap();
        let NodeKind::If { condition, then } = &program.node(program.nodes()[1]).kind else {
            panic!("expected If");
        };
        assert!(matches!(
            program.node(*condition).kind,
            NodeKind::BinaryOp {
                op: BinaryOperator::GreaterThan,
                ..
            }
        ));
        assert!(matches!(program.node(*then).kind, NodeKind::Print(_)));
    }

    #[test]
    fn test_parse_if_then_line_number() {
        let program = parse("10 IF X = 1 THEN 100").unwrap();
        let NodeKind::If { then, .. } = &program.node(program.nodes()[1]).kind else {
            panic!("expected If");
        };
        assert_eq!(program.node(*then).kind, NodeKind::Goto(100));
    }

    #[test]
    fn test_label_only_line() {
        let program = parse("10\n20 END").unwrap();
        assert_eq!(
            statement_kinds(&program),
            vec![NodeKind::Label(10), NodeKind::Label(20), NodeKind::End]
        );
    }

    #[test]
    fn test_node_positions() {
        let program = parse("10 END\n20 PRINT 1").unwrap();
        let print = program.node(program.nodes()[3]);
        assert_eq!(print.line, 2);
        assert_eq!(print.column, 4);
        assert_eq!(program.source_line(print.line), Some("20 PRINT 1"));
    }

    #[test]
    fn test_missing_line_number() {
        assert_eq!(error_kind("PRINT \"x\""), SyntaxErrorKind::ExpectedLineNumber);
        assert_eq!(
            error_kind("10 END\n\n20 END"),
            SyntaxErrorKind::ExpectedLineNumber
        );
    }

    #[test]
    fn test_invalid_line_number() {
        assert_eq!(
            error_kind("10.5 END"),
            SyntaxErrorKind::InvalidLineNumber("10.5".to_string())
        );
        assert_eq!(
            error_kind("10 GOTO 1.5"),
            SyntaxErrorKind::InvalidLineNumber("1.5".to_string())
        );
    }

    #[test]
    fn test_unexpected_token_in_expression_list() {
        assert_eq!(
            error_kind("10 PRINT \"a\", \"b\""),
            SyntaxErrorKind::UnexpectedToken(",".to_string())
        );
        // A keyword cannot follow an expression list on the same line
        assert_eq!(
            error_kind("10 PRINT 1 END"),
            SyntaxErrorKind::UnexpectedToken("END".to_string())
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            error_kind("10 PRINT \"oops"),
            SyntaxErrorKind::UnterminatedString
        );
        assert_eq!(
            error_kind("10 LET A = \"oops"),
            SyntaxErrorKind::UnterminatedString
        );
    }

    #[test]
    fn test_duplicate_label() {
        let err = parse("10 PRINT 1\n10 END").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::DuplicateLabel(10));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unknown_statement() {
        assert_eq!(
            error_kind("10 X = 1"),
            SyntaxErrorKind::UnknownStatement("X".to_string())
        );
        assert_eq!(
            error_kind("10 @"),
            SyntaxErrorKind::UnknownStatement("@".to_string())
        );
    }

    #[test]
    fn test_trailing_tokens() {
        assert_eq!(
            error_kind("10 END 5"),
            SyntaxErrorKind::TrailingTokens("5".to_string())
        );
    }

    #[test]
    fn test_let_errors() {
        assert_eq!(
            error_kind("10 LET 5 = 1"),
            SyntaxErrorKind::ExpectedIdentifier("5".to_string())
        );
        assert_eq!(
            error_kind("10 LET X 1"),
            SyntaxErrorKind::ExpectedEquals("1".to_string())
        );
        assert_eq!(
            error_kind("10 LET X ="),
            SyntaxErrorKind::ExpectedExpression("end of input".to_string())
        );
    }

    #[test]
    fn test_unclosed_paren() {
        assert_eq!(
            error_kind("10 PRINT (1 + 2"),
            SyntaxErrorKind::UnclosedParen("end of input".to_string())
        );
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("10 PRINT {}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&ok).is_ok());

        let deep = format!(
            "10 PRINT {}1{}",
            "(".repeat(MAX_NESTING + 1),
            ")".repeat(MAX_NESTING + 1)
        );
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::NestingTooDeep(MAX_NESTING));
        assert_eq!(err.column, 10 + MAX_NESTING);

        let nested_ifs = format!("10 {}END", "IF 1 ".repeat(MAX_NESTING + 1));
        assert_eq!(
            error_kind(&nested_ifs),
            SyntaxErrorKind::NestingTooDeep(MAX_NESTING)
        );
    }

    #[test]
    fn test_long_chain_parses_without_recursion() {
        let source = format!("10 PRINT 1{}", "+1".repeat(100_000));
        let program = parse(&source).unwrap();
        // Label, Print and the single outermost BinaryOp operand
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_source_lines_are_kept_once_per_line() {
        let program = parse("10 PRINT 1\r\n20 END\n").unwrap();
        assert_eq!(program.source_line(1), Some("10 PRINT 1"));
        assert_eq!(program.source_line(2), Some("20 END"));
        assert_eq!(program.source_line(3), None);
    }

    #[test]
    fn test_empty_source() {
        let program = parse("").unwrap();
        assert!(program.is_empty());
    }
}
