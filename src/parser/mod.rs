//=============================================
// File: parser/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: GatoScript recursive descent parser implementation
// Objective: Transform token streams into AST nodes consumed by the interpreter
//=============================================

//=============================================
//            Section 1: Imports
//=============================================

use std::sync::Arc;

use thiserror::Error;

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::tokenizer::{Position, Token, TokenKind};

/// Keep at least this much stack free before descending into a nested expression.
const RED_ZONE: usize = 64 * 1024;
/// Size of each additional stack segment allocated for deeply nested input.
const STACK_GROWTH: usize = 1024 * 1024;

//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} but found '{found}' at {position}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    #[error("unexpected end of input, expected {expected} at {position}")]
    UnexpectedEndOfInput { expected: String, position: Position },
    #[error("invalid syntax: {message} at {position}")]
    InvalidSyntax { message: String, position: Position },
}

//=============================================
//            Section 3: Parser State
//=============================================

/// Recursive descent parser for GatoScript
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    eof: Token,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens
            .last()
            .map(|token| token.position)
            .unwrap_or_else(|| Position::new(1, 1, 0));
        Self {
            tokens,
            current: 0,
            eof: Token::new(TokenKind::Eof, end),
        }
    }

    //=============================================
    //            Section 4: Statement Parsing
    //=============================================

    /// Parse a complete GatoScript program
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let name = self.consume_identifier("variable name")?;
        self.consume(&TokenKind::Equal, "'=' after variable name")?;
        let value = self.parse_expression()?;
        self.skip_semicolon();
        Ok(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let value = if self.is_at_end()
            || self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
        {
            Expression::Null
        } else {
            self.parse_expression()?
        };
        self.skip_semicolon();
        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.parse_expression()?;
        self.skip_semicolon();
        Ok(Statement::Expression(expr))
    }

    fn parse_block(&mut self) -> Result<BlockStatement, ParseError> {
        self.consume(&TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEndOfInput {
                    expected: "'}'".into(),
                    position: self.current_position(),
                });
            }
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(BlockStatement::new(statements))
    }

    //=============================================
    //            Section 5: Expression Parsing
    //=============================================

    /// Parse expression with precedence climbing
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.parse_assignment())
    }

    /// Parse assignment expression: target = value, target += value
    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_equality()?;

        let compound = match self.peek().kind {
            TokenKind::PlusEqual => Some(InfixOperator::Add),
            TokenKind::MinusEqual => Some(InfixOperator::Subtract),
            TokenKind::StarEqual => Some(InfixOperator::Multiply),
            TokenKind::SlashEqual => Some(InfixOperator::Divide),
            _ => None,
        };
        if compound.is_none() && !self.check(&TokenKind::Equal) {
            return Ok(expr);
        }

        let position = self.current_position();
        self.advance();
        let value = Box::new(self.parse_assignment()?);
        let name = match expr {
            Expression::Identifier(name) => name,
            other => {
                return Err(ParseError::InvalidSyntax {
                    message: format!("cannot assign to '{}'", other),
                    position,
                });
            }
        };

        Ok(match compound {
            Some(operator) => Expression::CompoundAssign {
                name,
                operator,
                value,
            },
            None => Expression::Assign { name, value },
        })
    }

    /// Parse equality expression: left == right, left != right
    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_comparison()?;
        while let Some(operator) = self.match_infix(&[
            (TokenKind::EqualEqual, InfixOperator::Equal),
            (TokenKind::NotEqual, InfixOperator::NotEqual),
        ]) {
            let right = self.parse_comparison()?;
            expr = infix(expr, operator, right);
        }
        Ok(expr)
    }

    /// Parse comparison expression: <, >, <=, >=
    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_term()?;
        while let Some(operator) = self.match_infix(&[
            (TokenKind::Less, InfixOperator::Less),
            (TokenKind::Greater, InfixOperator::Greater),
            (TokenKind::LessEqual, InfixOperator::LessEqual),
            (TokenKind::GreaterEqual, InfixOperator::GreaterEqual),
        ]) {
            let right = self.parse_term()?;
            expr = infix(expr, operator, right);
        }
        Ok(expr)
    }

    /// Parse term expression: +, -
    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_factor()?;
        while let Some(operator) = self.match_infix(&[
            (TokenKind::Plus, InfixOperator::Add),
            (TokenKind::Minus, InfixOperator::Subtract),
        ]) {
            let right = self.parse_factor()?;
            expr = infix(expr, operator, right);
        }
        Ok(expr)
    }

    /// Parse factor expression: *, /, %
    fn parse_factor(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_prefix()?;
        while let Some(operator) = self.match_infix(&[
            (TokenKind::Star, InfixOperator::Multiply),
            (TokenKind::Slash, InfixOperator::Divide),
            (TokenKind::Percent, InfixOperator::Modulo),
        ]) {
            let right = self.parse_prefix()?;
            expr = infix(expr, operator, right);
        }
        Ok(expr)
    }

    /// Parse prefix expression: !, -
    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Not => PrefixOperator::Not,
            TokenKind::Minus => PrefixOperator::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let right = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.parse_prefix())?;
        Ok(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    /// Parse call and index expressions: callee(args), target[index]
    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let arguments = self.parse_expression_list(&TokenKind::RightParen, "')'")?;
                expr = Expression::Call {
                    function: Box::new(expr),
                    arguments,
                };
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                let index = self.parse_expression()?;
                self.consume(&TokenKind::RightBracket, "']'")?;
                expr = Expression::Index {
                    left: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression::Integer(value))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expression::String(value))
            }
            TokenKind::Boolean(value) => {
                self.advance();
                Ok(Expression::Boolean(value))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.parse_expression_list(&TokenKind::RightBracket, "']'")?;
                Ok(Expression::Array(elements))
            }
            TokenKind::LeftBrace => self.parse_hash_literal(),
            TokenKind::Fn => self.parse_function_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::While => self.parse_while_expression(),
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".into(),
                position: token.position,
            }),
            found => Err(ParseError::UnexpectedToken {
                expected: "expression".into(),
                found,
                position: token.position,
            }),
        }
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.parse_expression()?;
            self.consume(&TokenKind::Colon, "':' after hash key")?;
            let value = self.parse_expression()?;
            pairs.push((key, value));
            if !self.check(&TokenKind::RightBrace) {
                self.consume(&TokenKind::Comma, "',' or '}'")?;
            }
        }
        self.advance();
        Ok(Expression::Hash(pairs))
    }

    fn parse_function_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        self.consume(&TokenKind::LeftParen, "'(' after fn")?;
        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                parameters.push(self.consume_identifier("parameter name")?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.consume(&TokenKind::RightParen, "')' after parameters")?;
        let body = self.parse_block()?;
        Ok(Expression::Function {
            parameters,
            body: Arc::new(body),
        })
    }

    fn parse_if_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        let condition = self.parse_expression()?;
        let consequence = self.parse_block()?;
        let alternative = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                let nested = self.parse_if_expression()?;
                Some(BlockStatement::new(vec![Statement::Expression(nested)]))
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_while_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Expression::While {
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_expression_list(
        &mut self,
        end: &TokenKind,
        expected: &str,
    ) -> Result<Vec<Expression>, ParseError> {
        let mut items = Vec::new();
        while !self.check(end) {
            items.push(self.parse_expression()?);
            if !self.check(end) {
                self.consume(&TokenKind::Comma, expected)?;
            }
        }
        self.advance();
        Ok(items)
    }

    //=============================================
    //            Section 6: Token Navigation
    //=============================================

    fn match_infix(&mut self, table: &[(TokenKind, InfixOperator)]) -> Option<InfixOperator> {
        let operator = table
            .iter()
            .find(|(kind, _)| self.check(kind))
            .map(|(_, operator)| *operator)?;
        self.advance();
        Some(operator)
    }

    // Utility: peek at current token
    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&self.eof)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            return Ok(());
        }
        Err(self.unexpected(expected))
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        Err(self.unexpected(expected))
    }

    fn skip_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: token.position,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.clone(),
                position: token.position,
            }
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_position(&self) -> Position {
        self.peek().position
    }
}

fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
    Expression::Infix {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}
