//! Recursive-descent parser for the debugger command language.
//!
//! Commands and expressions are parsed from the token stream produced by
//! `lexer::tokenize`. Binary operators use precedence climbing with a
//! parse-operand-then-fold loop per level, so long chains stay
//! left-associative without right recursion. Branch points are decided by
//! one-token (occasionally two-token) lookahead; the `watch` command also
//! uses a checkpoint/rewind pair so `watch not <expr>` can fall back to the
//! expression form after peeking past `not`.

use crate::ast::{
    AssignOp, BinaryOp, Expr, ExprKind, Instruction, InstructionKind, PathSegment, UnaryOp,
    VarPath,
};
use crate::diagnostics::Diagnostics;
use crate::token::{self, Span, Token, TokenKind, names};

pub mod error;

use error::SyntaxError;

/// Source window shown by a bare `list`.
const DEFAULT_LIST_WINDOW: u32 = 10;

const LOCATION: &str = "a '<file>:<line>' location";

static COMMAND_EXPECTED: &[&str] = &[
    "'break'",
    "'continue'",
    "'display'",
    "'do'",
    "'help'",
    "'history'",
    "'if'",
    "'let'",
    "'list'",
    "'load'",
    "'print'",
    "'step'",
    "'unlet'",
    "'var'",
    "'variables'",
    "'watch'",
];

static EXPR_EXPECTED: &[&str] = &[
    names::INT,
    names::UINT,
    names::FLOAT,
    names::STRING,
    names::CHAR,
    names::IDENTIFIER,
    "'true'",
    "'false'",
    "'('",
    "'not'",
    "'~'",
    "'-'",
    "'+'",
    "'exists'",
    "'typeof'",
    "'mapof'",
    "'listof'",
    "'@'",
    "'emptylist'",
    "'emptymap'",
];

static ASSIGN_EXPECTED: &[&str] = &[
    "':='", "'+='", "'-='", "'*='", "'/='", "'%='", "'<<='", "'>>='", "'&='", "'|='", "'^='",
];

/// Parses a single command; trailing semicolons are allowed.
pub fn parse_instruction<'a>(
    tokens: &[Token<'a>],
    diags: &mut Diagnostics,
) -> Result<Instruction, SyntaxError> {
    let mut parser = Parser::new(tokens, diags);
    let instruction = parser.instruction()?;
    while parser.eat(&TokenKind::Semicolon) {}
    parser.expect_eof()?;
    Ok(instruction)
}

/// Parses a `;`-separated command sequence.
pub fn parse_script<'a>(
    tokens: &[Token<'a>],
    diags: &mut Diagnostics,
) -> Result<Vec<Instruction>, SyntaxError> {
    let mut parser = Parser::new(tokens, diags);
    let mut instructions = Vec::new();
    loop {
        while parser.eat(&TokenKind::Semicolon) {}
        if matches!(parser.kind(), TokenKind::Eof) {
            break;
        }
        instructions.push(parser.instruction()?);
        if !matches!(parser.kind(), TokenKind::Semicolon | TokenKind::Eof) {
            return Err(parser.error(&[token::terminal_name(&TokenKind::Semicolon), names::EOF]));
        }
    }
    Ok(instructions)
}

/// Parses a bare expression covering the whole input.
pub fn parse_expression<'a>(
    tokens: &[Token<'a>],
    diags: &mut Diagnostics,
) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(tokens, diags);
    let expr = parser.expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

pub struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    position: usize,
    diags: &'t mut Diagnostics,
}

impl<'t, 'a> Parser<'t, 'a> {
    /// The token slice must end with an `Eof` token, as `lexer::tokenize`
    /// guarantees.
    pub fn new(tokens: &'t [Token<'a>], diags: &'t mut Diagnostics) -> Self {
        Self {
            tokens,
            position: 0,
            diags,
        }
    }

    // ----- instructions -----

    pub fn instruction(&mut self) -> Result<Instruction, SyntaxError> {
        let start = self.current().span;
        let kind = match self.kind() {
            TokenKind::Continue => {
                self.advance();
                InstructionKind::Continue
            }
            TokenKind::Help => {
                self.advance();
                InstructionKind::Help
            }
            TokenKind::Step => {
                self.advance();
                InstructionKind::Step
            }
            TokenKind::History => {
                self.advance();
                InstructionKind::History
            }
            TokenKind::Var | TokenKind::Variables => {
                self.advance();
                InstructionKind::Variables
            }
            TokenKind::Load => {
                self.advance();
                let (file_name, _) = self.expect_string()?;
                InstructionKind::Load { file_name }
            }
            TokenKind::Break => self.breakpoint_instruction()?,
            TokenKind::Watch => self.watchpoint_instruction()?,
            TokenKind::Do => self.do_instruction()?,
            TokenKind::Let => self.let_instruction()?,
            TokenKind::Unlet => {
                self.advance();
                let path = self.var_path()?;
                InstructionKind::Unlet { path }
            }
            TokenKind::Display => {
                self.advance();
                let path = self.var_path()?;
                InstructionKind::Display { path }
            }
            TokenKind::Print => {
                self.advance();
                let expr = self.expression()?;
                InstructionKind::Print { expr }
            }
            TokenKind::List => {
                self.advance();
                let window = if matches!(self.kind(), TokenKind::Int(_) | TokenKind::Uint(_)) {
                    self.expect_u32()?
                } else {
                    DEFAULT_LIST_WINDOW
                };
                InstructionKind::ListSource { window }
            }
            TokenKind::If => self.if_instruction()?,
            _ => return Err(self.error(COMMAND_EXPECTED)),
        };
        Ok(Instruction::new(kind, self.span_from(start)))
    }

    fn breakpoint_instruction(&mut self) -> Result<InstructionKind, SyntaxError> {
        self.advance(); // break
        match self.kind() {
            TokenKind::Not => {
                self.advance();
                if self.eat(&TokenKind::All) {
                    Ok(InstructionKind::BreakpointDeleteAll)
                } else if matches!(self.kind(), TokenKind::Int(_) | TokenKind::Uint(_)) {
                    let index = self.expect_u32()?;
                    Ok(InstructionKind::BreakpointDelete { index })
                } else {
                    Err(self.error(&[token::terminal_name(&TokenKind::All), names::INT]))
                }
            }
            TokenKind::Str(_) => {
                let (location, span) = self.expect_string()?;
                let (file_name, line) = split_location(&location, span)?;
                Ok(InstructionKind::BreakpointAdd { file_name, line })
            }
            _ => Ok(InstructionKind::BreakpointList),
        }
    }

    fn watchpoint_instruction(&mut self) -> Result<InstructionKind, SyntaxError> {
        self.advance(); // watch
        if self.at_instruction_end() {
            return Ok(InstructionKind::WatchpointList);
        }
        if matches!(self.kind(), TokenKind::Not) {
            let checkpoint = self.checkpoint();
            self.advance();
            if self.eat(&TokenKind::All) {
                return Ok(InstructionKind::WatchpointDeleteAll);
            }
            if matches!(self.kind(), TokenKind::Int(_) | TokenKind::Uint(_)) {
                let index = self.expect_u32()?;
                return Ok(InstructionKind::WatchpointDelete { index });
            }
            // `watch not <expr>` watches a negated expression.
            self.rewind(checkpoint);
        }
        let expr = self.expression()?;
        Ok(InstructionKind::WatchpointAdd { expr })
    }

    fn do_instruction(&mut self) -> Result<InstructionKind, SyntaxError> {
        self.advance(); // do
        if self.at_instruction_end() {
            return Ok(InstructionKind::DoPlain);
        }
        if matches!(self.kind(), TokenKind::Not) {
            self.advance();
            if self.eat(&TokenKind::All) {
                return Ok(InstructionKind::DoNotAll);
            }
            if matches!(self.kind(), TokenKind::Int(_) | TokenKind::Uint(_)) {
                let count = self.expect_u32()?;
                return Ok(InstructionKind::DoNot { count });
            }
            return Err(self.error(&[token::terminal_name(&TokenKind::All), names::INT]));
        }
        let inner = self.instruction()?;
        Ok(InstructionKind::Do {
            inner: Box::new(inner),
        })
    }

    fn let_instruction(&mut self) -> Result<InstructionKind, SyntaxError> {
        self.advance(); // let
        let path = self.var_path()?;
        if let Some(op) = assign_op(self.kind()) {
            self.advance();
            let expr = self.expression()?;
            Ok(InstructionKind::Let { path, op, expr })
        } else if self.at_instruction_end() {
            Ok(InstructionKind::LetUnconstructed { path })
        } else {
            Err(self.error(ASSIGN_EXPECTED))
        }
    }

    fn if_instruction(&mut self) -> Result<InstructionKind, SyntaxError> {
        self.advance(); // if
        let mut arms = Vec::new();
        let condition = self.expression()?;
        self.expect(TokenKind::Then)?;
        arms.push((condition, self.instruction_block()?));
        while self.eat(&TokenKind::Elseif) {
            let condition = self.expression()?;
            self.expect(TokenKind::Then)?;
            arms.push((condition, self.instruction_block()?));
        }
        let else_body = if self.eat(&TokenKind::Else) {
            self.instruction_block()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::Endif)?;
        Ok(InstructionKind::If { arms, else_body })
    }

    fn instruction_block(&mut self) -> Result<Vec<Instruction>, SyntaxError> {
        let mut body = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if matches!(
                self.kind(),
                TokenKind::Elseif | TokenKind::Else | TokenKind::Endif | TokenKind::Eof
            ) {
                break;
            }
            body.push(self.instruction()?);
            if !self.at_instruction_end() {
                return Err(self.error(&[
                    token::terminal_name(&TokenKind::Semicolon),
                    "'elseif'",
                    "'else'",
                    "'endif'",
                ]));
            }
        }
        Ok(body)
    }

    // ----- expressions -----

    pub fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.and_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::Xor => BinaryOp::Xor,
                _ => break,
            };
            self.advance();
            let right = self.and_expression()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.relational_expression()?;
        while matches!(self.kind(), TokenKind::And) {
            self.advance();
            let right = self.relational_expression()?;
            expr = binary(expr, BinaryOp::And, right);
        }
        Ok(expr)
    }

    fn relational_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.additive_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::NotEqual => BinaryOp::Ne,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::Less => BinaryOp::Lt,
                _ => break,
            };
            self.advance();
            let right = self.additive_expression()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn additive_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.multiplicative_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                TokenKind::Dot => {
                    let span = self.current().span;
                    self.diags.warning(
                        "'.' as an additive operator is deprecated",
                        span,
                        Some("+".to_string()),
                    );
                    BinaryOp::Add
                }
                _ => break,
            };
            self.advance();
            let right = self.multiplicative_expression()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn multiplicative_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.unary_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary_expression()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn unary_expression(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current().span;
        let op = match self.kind() {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.primary_expression(),
        };
        self.advance();
        let operand = self.unary_expression()?;
        let span = merge(start, operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn primary_expression(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Int(value), token.span))
            }
            TokenKind::Uint(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Uint(value), token.span))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Float(value), token.span))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(value), token.span))
            }
            TokenKind::Char(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Char(value), token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                let close = self.expect(TokenKind::RParen)?;
                let span = merge(token.span, close);
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::Exists => self.exists_expression(token.span),
            TokenKind::Typeof => self.conversion_expression(token.span, ExprKind::Typeof),
            TokenKind::Mapof => self.conversion_expression(token.span, ExprKind::Mapof),
            TokenKind::Listof => self.conversion_expression(token.span, ExprKind::Listof),
            TokenKind::Emptylist => {
                self.diags.warning(
                    "'emptylist' is deprecated",
                    token.span,
                    Some("@()".to_string()),
                );
                self.advance();
                Ok(Expr::new(ExprKind::ListCtor(Vec::new()), token.span))
            }
            TokenKind::Emptymap => {
                self.diags.warning(
                    "'emptymap' is deprecated",
                    token.span,
                    Some("@[]".to_string()),
                );
                self.advance();
                Ok(Expr::new(ExprKind::MapCtor(Vec::new()), token.span))
            }
            TokenKind::At => self.at_expression(token.span),
            TokenKind::Identifier(_) => self.reference_expression(),
            _ => Err(self.error(EXPR_EXPECTED)),
        }
    }

    /// `exists(path)` and `exists(path, default)`.
    fn exists_expression(&mut self, start: Span) -> Result<Expr, SyntaxError> {
        self.advance(); // exists
        self.expect(TokenKind::LParen)?;
        let path = self.var_path()?;
        let default = if self.eat(&TokenKind::Comma) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Exists { path, default },
            self.span_from(start),
        ))
    }

    fn conversion_expression(
        &mut self,
        start: Span,
        make: fn(Box<Expr>) -> ExprKind,
    ) -> Result<Expr, SyntaxError> {
        self.advance(); // typeof / mapof / listof
        self.expect(TokenKind::LParen)?;
        let inner = self.expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(make(Box::new(inner)), self.span_from(start)))
    }

    /// `@Type`, `@Type::Member` and the literal collection constructors
    /// `@( )`, `@[ ]`, `@{ }`, `@! !`.
    fn at_expression(&mut self, start: Span) -> Result<Expr, SyntaxError> {
        self.advance(); // @
        let token = self.current().clone();
        let kind = match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                let type_name = name.to_string();
                if self.eat(&TokenKind::ColonColon) {
                    let (member, _) = self.expect_identifier()?;
                    ExprKind::EnumLiteral { type_name, member }
                } else {
                    ExprKind::TypeLiteral { type_name }
                }
            }
            TokenKind::LParen => {
                self.advance();
                let items = self.expression_list(&TokenKind::RParen)?;
                self.expect(TokenKind::RParen)?;
                ExprKind::ListCtor(items)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut entries = Vec::new();
                if !matches!(self.kind(), TokenKind::RBracket) {
                    loop {
                        let key = self.expression()?;
                        self.expect(TokenKind::Colon)?;
                        let value = self.expression()?;
                        entries.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket)?;
                ExprKind::MapCtor(entries)
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                if !matches!(self.kind(), TokenKind::RBrace) {
                    loop {
                        let (name, _) = self.expect_identifier()?;
                        self.expect(TokenKind::Equal)?;
                        let value = self.expression()?;
                        fields.push((name, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace)?;
                ExprKind::StructCtor(fields)
            }
            TokenKind::Bang => {
                self.advance();
                let items = self.expression_list(&TokenKind::Bang)?;
                self.expect(TokenKind::Bang)?;
                ExprKind::SetCtor(items)
            }
            _ => {
                return Err(self.error(&[
                    names::IDENTIFIER,
                    token::terminal_name(&TokenKind::LParen),
                    token::terminal_name(&TokenKind::LBracket),
                    token::terminal_name(&TokenKind::LBrace),
                    token::terminal_name(&TokenKind::Bang),
                ]));
            }
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn expression_list(&mut self, closer: &TokenKind<'a>) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        if self.kind() != closer {
            items.push(self.expression()?);
            while self.eat(&TokenKind::Comma) {
                items.push(self.expression()?);
            }
        }
        Ok(items)
    }

    /// An identifier starts either a getter/function call or a variable
    /// path; one token of lookahead decides.
    fn reference_expression(&mut self) -> Result<Expr, SyntaxError> {
        if matches!(self.peek_kind(1), TokenKind::LParen) {
            let (name, start) = self.expect_identifier()?;
            let name = self.check_renamed_getter(name, start);
            self.expect(TokenKind::LParen)?;
            let args = self.expression_list(&TokenKind::RParen)?;
            self.expect(TokenKind::RParen)?;
            let span = self.span_from(start);
            return Ok(Expr::new(ExprKind::Call { name, args }, span));
        }
        let path = self.var_path()?;
        let span = path.span;
        Ok(Expr::new(ExprKind::Path(path), span))
    }

    fn check_renamed_getter(&mut self, name: String, span: Span) -> String {
        if name == "elementcount" {
            self.diags.warning(
                "getter 'elementcount' has been renamed to 'size'",
                span,
                Some("size".to_string()),
            );
            return "size".to_string();
        }
        name
    }

    /// `name`, `name[expr]`, further `[expr]` subscripts, chained with `::`.
    fn var_path(&mut self) -> Result<VarPath, SyntaxError> {
        let start = self.current().span;
        let mut segments = Vec::new();
        loop {
            let (name, _) = self.expect_identifier()?;
            if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                segments.push(PathSegment::Index { name, index });
                while self.eat(&TokenKind::LBracket) {
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    segments.push(PathSegment::Subscript { index });
                }
            } else {
                segments.push(PathSegment::Field { name });
            }
            if !self.eat(&TokenKind::ColonColon) {
                break;
            }
        }
        let span = self.span_from(start);
        Ok(VarPath { segments, span })
    }

    // ----- cursor plumbing -----

    fn current(&self) -> &Token<'a> {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .expect("token stream must end with Eof")
    }

    fn kind(&self) -> &TokenKind<'a> {
        &self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind<'a> {
        self.tokens
            .get(self.position + offset)
            .map_or(&TokenKind::Eof, |token| &token.kind)
    }

    fn advance(&mut self) {
        if !matches!(self.kind(), TokenKind::Eof) {
            self.position += 1;
        }
    }

    fn checkpoint(&self) -> usize {
        self.position
    }

    fn rewind(&mut self, checkpoint: usize) {
        self.position = checkpoint;
    }

    fn eat(&mut self, kind: &TokenKind<'a>) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>) -> Result<Span, SyntaxError> {
        if self.kind() == &kind {
            let span = self.current().span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error(&[token::terminal_name(&kind)]))
        }
    }

    fn expect_eof(&mut self) -> Result<(), SyntaxError> {
        if matches!(self.kind(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error(&[names::EOF]))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), SyntaxError> {
        let token = self.current().clone();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            Ok((name.to_string(), token.span))
        } else {
            Err(self.error(&[names::IDENTIFIER]))
        }
    }

    fn expect_string(&mut self) -> Result<(String, Span), SyntaxError> {
        let token = self.current().clone();
        if let TokenKind::Str(value) = token.kind {
            self.advance();
            Ok((value, token.span))
        } else {
            Err(self.error(&[names::STRING]))
        }
    }

    /// Accepts a non-negative integer literal that fits an index/count.
    fn expect_u32(&mut self) -> Result<u32, SyntaxError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Int(value) => {
                if let Ok(index) = u32::try_from(value) {
                    self.advance();
                    return Ok(index);
                }
            }
            TokenKind::Uint(value) => {
                if let Ok(index) = u32::try_from(value) {
                    self.advance();
                    return Ok(index);
                }
            }
            _ => {}
        }
        Err(self.error(&[names::INT]))
    }

    fn at_instruction_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::Elseif
                | TokenKind::Else
                | TokenKind::Endif
        )
    }

    fn error(&self, expected: &[&'static str]) -> SyntaxError {
        SyntaxError::new(
            expected.to_vec(),
            token::describe(self.kind()),
            self.current().span,
        )
    }

    fn span_from(&self, start: Span) -> Span {
        let end = self.tokens[..self.position]
            .last()
            .map_or(start.end, |token| token.span.end);
        Span {
            start: start.start,
            end,
            line: start.line,
            column: start.column,
        }
    }
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Assign),
        TokenKind::PlusAssign => Some(AssignOp::Add),
        TokenKind::MinusAssign => Some(AssignOp::Sub),
        TokenKind::StarAssign => Some(AssignOp::Mul),
        TokenKind::SlashAssign => Some(AssignOp::Div),
        TokenKind::PercentAssign => Some(AssignOp::Mod),
        TokenKind::ShlAssign => Some(AssignOp::Shl),
        TokenKind::ShrAssign => Some(AssignOp::Shr),
        TokenKind::AmpAssign => Some(AssignOp::And),
        TokenKind::PipeAssign => Some(AssignOp::Or),
        TokenKind::CaretAssign => Some(AssignOp::Xor),
        _ => None,
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = merge(left.span, right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn merge(start: Span, end: Span) -> Span {
    Span {
        start: start.start,
        end: end.end,
        line: start.line,
        column: start.column,
    }
}

/// Splits a `"<file>:<line>"` breakpoint location at the last colon.
fn split_location(text: &str, span: Span) -> Result<(String, u32), SyntaxError> {
    let error = || SyntaxError::new(vec![LOCATION], format!("string \"{text}\""), span);
    let (file_name, line) = text.rsplit_once(':').ok_or_else(&error)?;
    if file_name.is_empty() {
        return Err(error());
    }
    let line: u32 = line.parse().map_err(|_| error())?;
    Ok((file_name.to_string(), line))
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;
    use crate::lexer::tokenize;

    fn parse_cmd(input: &str) -> Instruction {
        let mut diags = Diagnostics::new();
        let tokens = tokenize(input, &mut diags);
        assert!(!diags.has_errors(), "lexical errors in {input:?}");
        parse_instruction(&tokens, &mut diags)
            .unwrap_or_else(|error| panic!("parse failed for {input:?}: {error}"))
    }

    fn parse_expr(input: &str) -> Expr {
        let mut diags = Diagnostics::new();
        let tokens = tokenize(input, &mut diags);
        assert!(!diags.has_errors(), "lexical errors in {input:?}");
        parse_expression(&tokens, &mut diags)
            .unwrap_or_else(|error| panic!("parse failed for {input:?}: {error}"))
    }

    fn cmd_error(input: &str) -> SyntaxError {
        let mut diags = Diagnostics::new();
        let tokens = tokenize(input, &mut diags);
        parse_instruction(&tokens, &mut diags).expect_err("expected syntax error")
    }

    fn int(value: i64) -> ExprKind {
        ExprKind::Int(BigInt::from(value))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("1 + 2 * 3");
        let ExprKind::Binary { op, left, right } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(left.kind, int(1));
        let ExprKind::Binary { op, left, right } = right.kind else {
            panic!("expected multiplication on the right");
        };
        assert_eq!(op, BinaryOp::Mul);
        assert_eq!(left.kind, int(2));
        assert_eq!(right.kind, int(3));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_expr("a or b and c");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn subtraction_chains_are_left_associative() {
        let expr = parse_expr("a - b - c");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(
            left.kind,
            ExprKind::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn unary_binds_tighter_than_and() {
        let expr = parse_expr("not a and b");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(
            left.kind,
            ExprKind::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn shift_sits_at_the_additive_level() {
        let expr = parse_expr("1 << 2 + 3");
        // Same level, left-associative: (1 << 2) + 3.
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            left.kind,
            ExprKind::Binary {
                op: BinaryOp::Shl,
                ..
            }
        ));
    }

    #[test]
    fn parenthesized_expressions_are_kept() {
        let expr = parse_expr("(1 + 2) * 3");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Mul);
        assert!(matches!(left.kind, ExprKind::Paren(_)));
    }

    #[test]
    fn deprecated_dot_parses_as_addition_with_fixit() {
        let mut diags = Diagnostics::new();
        let tokens = tokenize("1 . 2", &mut diags);
        let expr = parse_expression(&tokens, &mut diags).expect("parse");
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
        let warning = diags.iter().next().expect("expected a deprecation warning");
        assert_eq!(warning.fixit.as_deref(), Some("+"));
        assert!(!diags.has_errors());
    }

    #[test]
    fn deprecated_empty_constructors_warn_with_fixit() {
        let mut diags = Diagnostics::new();
        let tokens = tokenize("emptylist", &mut diags);
        let expr = parse_expression(&tokens, &mut diags).expect("parse");
        assert_eq!(expr.kind, ExprKind::ListCtor(Vec::new()));
        assert_eq!(diags.iter().next().and_then(|d| d.fixit.as_deref()), Some("@()"));

        let mut diags = Diagnostics::new();
        let tokens = tokenize("emptymap", &mut diags);
        let expr = parse_expression(&tokens, &mut diags).expect("parse");
        assert_eq!(expr.kind, ExprKind::MapCtor(Vec::new()));
        assert_eq!(diags.iter().next().and_then(|d| d.fixit.as_deref()), Some("@[]"));
    }

    #[test]
    fn renamed_getter_warns_and_normalizes() {
        let mut diags = Diagnostics::new();
        let tokens = tokenize("elementcount(x)", &mut diags);
        let expr = parse_expression(&tokens, &mut diags).expect("parse");
        let ExprKind::Call { name, args } = expr.kind else {
            panic!("expected call");
        };
        assert_eq!(name, "size");
        assert_eq!(args.len(), 1);
        assert_eq!(diags.iter().next().and_then(|d| d.fixit.as_deref()), Some("size"));
    }

    #[test]
    fn collection_constructors() {
        assert!(matches!(parse_expr("@()").kind, ExprKind::ListCtor(items) if items.is_empty()));
        assert!(matches!(parse_expr("@(1, 2)").kind, ExprKind::ListCtor(items) if items.len() == 2));
        assert!(
            matches!(parse_expr("@[1 : \"a\", 2 : \"b\"]").kind, ExprKind::MapCtor(entries) if entries.len() == 2)
        );
        assert!(
            matches!(parse_expr("@{mode = 1, name = \"x\"}").kind, ExprKind::StructCtor(fields) if fields.len() == 2)
        );
        assert!(matches!(parse_expr("@!1, 2, 3!").kind, ExprKind::SetCtor(items) if items.len() == 3));
        assert!(matches!(parse_expr("@!!").kind, ExprKind::SetCtor(items) if items.is_empty()));
    }

    #[test]
    fn type_and_enum_literals() {
        assert!(matches!(
            parse_expr("@OsTask").kind,
            ExprKind::TypeLiteral { type_name } if type_name == "OsTask"
        ));
        let ExprKind::EnumLiteral { type_name, member } = parse_expr("@OsTask::Ready").kind else {
            panic!("expected enum literal");
        };
        assert_eq!(type_name, "OsTask");
        assert_eq!(member, "Ready");
    }

    #[test]
    fn exists_with_and_without_default() {
        let ExprKind::Exists { path, default } = parse_expr("exists(cfg::timeout)").kind else {
            panic!("expected exists");
        };
        assert_eq!(path.segments.len(), 2);
        assert!(default.is_none());

        let ExprKind::Exists { default, .. } = parse_expr("exists(cfg::timeout, 50)").kind else {
            panic!("expected exists");
        };
        assert_eq!(default.map(|e| e.kind), Some(int(50)));
    }

    #[test]
    fn variable_paths_with_indexing_and_subscripts() {
        let ExprKind::Path(path) = parse_expr("tasks[2]::events[0][1]").kind else {
            panic!("expected path");
        };
        assert_eq!(path.segments.len(), 3);
        assert!(matches!(&path.segments[0], PathSegment::Index { name, .. } if name == "tasks"));
        assert!(matches!(&path.segments[1], PathSegment::Index { name, .. } if name == "events"));
        assert!(matches!(&path.segments[2], PathSegment::Subscript { .. }));
    }

    #[test]
    fn nullary_commands() {
        assert_eq!(parse_cmd("continue").kind, InstructionKind::Continue);
        assert_eq!(parse_cmd("help").kind, InstructionKind::Help);
        assert_eq!(parse_cmd("step").kind, InstructionKind::Step);
        assert_eq!(parse_cmd("history").kind, InstructionKind::History);
        assert_eq!(parse_cmd("variables").kind, InstructionKind::Variables);
        assert_eq!(parse_cmd("var").kind, InstructionKind::Variables);
    }

    #[test]
    fn breakpoint_command_forms() {
        assert_eq!(parse_cmd("break").kind, InstructionKind::BreakpointList);
        assert_eq!(
            parse_cmd("break \"foo.oil:42\"").kind,
            InstructionKind::BreakpointAdd {
                file_name: "foo.oil".to_string(),
                line: 42,
            }
        );
        assert_eq!(
            parse_cmd("break not 3").kind,
            InstructionKind::BreakpointDelete { index: 3 }
        );
        assert_eq!(
            parse_cmd("break not all").kind,
            InstructionKind::BreakpointDeleteAll
        );
    }

    #[test]
    fn malformed_breakpoint_location_is_a_syntax_error() {
        let error = cmd_error("break \"foo.oil\"");
        assert!(error.to_string().contains("'<file>:<line>'"));
    }

    #[test]
    fn watchpoint_command_forms() {
        assert_eq!(parse_cmd("watch").kind, InstructionKind::WatchpointList);
        assert_eq!(
            parse_cmd("watch not 2").kind,
            InstructionKind::WatchpointDelete { index: 2 }
        );
        assert_eq!(
            parse_cmd("watch not all").kind,
            InstructionKind::WatchpointDeleteAll
        );
        assert!(matches!(
            parse_cmd("watch counter > 10").kind,
            InstructionKind::WatchpointAdd { .. }
        ));
    }

    #[test]
    fn watch_not_expression_rewinds_to_the_expression_form() {
        let InstructionKind::WatchpointAdd { expr } = parse_cmd("watch not armed").kind else {
            panic!("expected watchpoint add");
        };
        assert!(matches!(
            expr.kind,
            ExprKind::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn do_command_forms() {
        assert_eq!(parse_cmd("do").kind, InstructionKind::DoPlain);
        assert_eq!(parse_cmd("do not 1").kind, InstructionKind::DoNot { count: 1 });
        assert_eq!(parse_cmd("do not all").kind, InstructionKind::DoNotAll);
        let InstructionKind::Do { inner } = parse_cmd("do print x").kind else {
            panic!("expected do");
        };
        assert!(matches!(inner.kind, InstructionKind::Print { .. }));
    }

    #[test]
    fn let_with_each_operator_spelling() {
        let cases = [
            (":=", AssignOp::Assign),
            ("+=", AssignOp::Add),
            ("-=", AssignOp::Sub),
            ("*=", AssignOp::Mul),
            ("/=", AssignOp::Div),
            ("%=", AssignOp::Mod),
            ("<<=", AssignOp::Shl),
            (">>=", AssignOp::Shr),
            ("&=", AssignOp::And),
            ("|=", AssignOp::Or),
            ("^=", AssignOp::Xor),
        ];
        for (spelling, expected) in cases {
            let InstructionKind::Let { op, .. } = parse_cmd(&format!("let x {spelling} 1")).kind
            else {
                panic!("expected let for {spelling}");
            };
            assert_eq!(op, expected, "operator {spelling}");
        }
    }

    #[test]
    fn let_without_assignment_declares_unconstructed() {
        let InstructionKind::LetUnconstructed { path } = parse_cmd("let scratch").kind else {
            panic!("expected unconstructed let");
        };
        assert_eq!(path.segments, vec![PathSegment::field("scratch")]);
    }

    #[test]
    fn if_with_elseif_and_else() {
        let source = "if armed then continue; step elseif idle then print 1 else help endif";
        let InstructionKind::If { arms, else_body } = parse_cmd(source).kind else {
            panic!("expected if");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].1.len(), 2);
        assert_eq!(arms[1].1.len(), 1);
        assert_eq!(else_body.len(), 1);
        assert_eq!(else_body[0].kind, InstructionKind::Help);
    }

    #[test]
    fn list_source_window() {
        assert_eq!(
            parse_cmd("list").kind,
            InstructionKind::ListSource { window: 10 }
        );
        assert_eq!(
            parse_cmd("list 25").kind,
            InstructionKind::ListSource { window: 25 }
        );
    }

    #[test]
    fn load_requires_a_string() {
        assert_eq!(
            parse_cmd("load \"app.oil\"").kind,
            InstructionKind::Load {
                file_name: "app.oil".to_string()
            }
        );
        let error = cmd_error("load 42");
        assert_eq!(error.to_string(), "Expected a string literal, got integer '42'");
    }

    #[test]
    fn unknown_command_lists_the_command_terminals() {
        let error = cmd_error("jump");
        let message = error.to_string();
        assert!(message.starts_with("Expected 'break', 'continue'"));
        assert!(message.contains("'watch'"));
        assert!(message.ends_with("got identifier 'jump'"));
    }

    #[test]
    fn missing_then_names_the_terminal() {
        let error = cmd_error("if armed continue endif");
        assert_eq!(error.to_string(), "Expected 'then', got 'continue'");
    }

    #[test]
    fn script_parsing_splits_on_semicolons() {
        let mut diags = Diagnostics::new();
        let tokens = tokenize("step; print 1; continue;", &mut diags);
        let script = parse_script(&tokens, &mut diags).expect("parse");
        assert_eq!(script.len(), 3);
        assert_eq!(script[0].kind, InstructionKind::Step);
        assert_eq!(script[2].kind, InstructionKind::Continue);
    }

    #[test]
    fn failed_rule_leaves_earlier_siblings_intact() {
        let mut diags = Diagnostics::new();
        let tokens = tokenize("step; print", &mut diags);
        let mut parser = Parser::new(&tokens, &mut diags);
        let first = parser.instruction().expect("first command parses");
        assert_eq!(first.kind, InstructionKind::Step);
        assert!(parser.eat(&TokenKind::Semicolon));
        assert!(parser.instruction().is_err());
        // The previously built sibling is unaffected by the failure.
        assert_eq!(first.kind, InstructionKind::Step);
    }

    #[test]
    fn spans_cover_whole_instructions() {
        let instruction = parse_cmd("print 1 + 2");
        assert_eq!(instruction.span.start, 0);
        assert_eq!(instruction.span.end, 11);
        assert_eq!(instruction.span.line, 1);
    }
}
