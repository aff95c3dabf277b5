use crate::ast::{BinaryOp, Expr, Statement, UnaryOp};
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, unquote, Token};
use loom_common::Value;

/// Parse a single expression; trailing tokens are an error
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a block of statements separated by `;` or simply juxtaposed
pub fn parse_block(source: &str) -> ParseResult<Vec<Statement>> {
    let mut parser = Parser::new(source)?;
    parser.parse_statements()
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    len: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            len: source.len(),
        })
    }

    fn parse_statements(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if self.match_token(Token::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let is_assignment = matches!(self.peek(), Some((Token::Ident(_), _)))
            && matches!(self.peek_ahead(1), Some((Token::Assign, _)));
        if is_assignment {
            let name = self.expect_ident()?;
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Statement::Assign { name, value });
        }
        Ok(Statement::Expr(self.parse_expression()?))
    }

    /// Parse an expression with full operator precedence
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_conditional_expression()
    }

    /// Parse `cond ? a : b` (right associative, lowest precedence)
    fn parse_conditional_expression(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_or_expression()?;
        if !self.match_token(Token::Question) {
            return Ok(condition);
        }
        let then_branch = self.parse_conditional_expression()?;
        self.expect(Token::Colon)?;
        let else_branch = self.parse_conditional_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_or_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expression()?;
        while self.match_token(Token::Or) {
            let right = self.parse_and_expression()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality_expression()?;
        while self.match_token(Token::And) {
            let right = self.parse_equality_expression()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    /// Parse equality expression (== !=)
    fn parse_equality_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison_expression()?;
        loop {
            let op = match self.peek() {
                Some((Token::EqEq, _)) => BinaryOp::Equal,
                Some((Token::NotEq, _)) => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison_expression()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// Parse comparison expression (< > <= >=)
    fn parse_comparison_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive_expression()?;
        loop {
            let op = match self.peek() {
                Some((Token::Lt, _)) => BinaryOp::Less,
                Some((Token::LtEq, _)) => BinaryOp::LessEqual,
                Some((Token::Gt, _)) => BinaryOp::Greater,
                Some((Token::GtEq, _)) => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expression()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// Parse additive expression (+ -)
    fn parse_additive_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative_expression()?;
        loop {
            let op = match self.peek() {
                Some((Token::Plus, _)) => BinaryOp::Add,
                Some((Token::Minus, _)) => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// Parse multiplicative expression (* / %)
    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary_expression()?;
        loop {
            let op = match self.peek() {
                Some((Token::Star, _)) => BinaryOp::Multiply,
                Some((Token::Slash, _)) => BinaryOp::Divide,
                Some((Token::Percent, _)) => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expression()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Some((Token::Not, _)) => UnaryOp::Not,
            Some((Token::Minus, _)) => UnaryOp::Negate,
            _ => return self.parse_postfix_expression(),
        };
        self.advance();
        let operand = self.parse_unary_expression()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Member access and indexing chained after a primary expression
    fn parse_postfix_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_expression()?;
        loop {
            if self.match_token(Token::Dot) {
                let property = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse primary expression (literals, names, calls, groups)
    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        let pos = self.peek_pos();
        let Some((token, _)) = self.advance().cloned() else {
            return Err(ParseError::unexpected_eof(pos));
        };

        match token {
            Token::True => Ok(Expr::Literal(Value::Boolean(true))),
            Token::False => Ok(Expr::Literal(Value::Boolean(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Number(n) => n
                .parse::<f64>()
                .map(|value| Expr::Literal(Value::Number(value)))
                .map_err(|_| ParseError::invalid_syntax(pos, format!("invalid number '{}'", n))),
            Token::String(s) => Ok(Expr::Literal(Value::String(unquote(s)))),
            Token::Ident(name) => {
                if self.match_token(Token::LParen) {
                    let args = self.parse_list(Token::RParen)?;
                    return Ok(Expr::Call {
                        function: name.to_string(),
                        args,
                    });
                }
                Ok(Expr::Ident(name.to_string()))
            }
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::List(self.parse_list(Token::RBracket)?)),
            Token::LBrace => self.parse_object(),
            other => Err(ParseError::unexpected_token(
                pos,
                "expression",
                other.to_string(),
            )),
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed
    fn parse_list(&mut self, close: Token) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close.clone()) {
            items.push(self.parse_expression()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        while !self.check(Token::RBrace) {
            let pos = self.peek_pos();
            let key = match self.advance().cloned() {
                Some((Token::Ident(name), _)) => name.to_string(),
                Some((Token::String(s), _)) => unquote(s),
                Some((other, _)) => {
                    return Err(ParseError::unexpected_token(pos, "object key", other.to_string()))
                }
                None => return Err(ParseError::unexpected_eof(pos)),
            };
            self.expect(Token::Colon)?;
            entries.push((key, self.parse_expression()?));
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Expr::Object(entries))
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_pos(&self) -> usize {
        self.peek().map(|(_, span)| span.start).unwrap_or(self.len)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            return Ok(());
        }
        match self.peek() {
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                token.to_string(),
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.len)),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                "identifier",
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.len)),
        }
    }

    fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                "end of expression",
                found.to_string(),
            )),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}
