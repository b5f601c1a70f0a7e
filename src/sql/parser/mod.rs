use std::iter::Peekable;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{Expression, FromItem, JoinType, Operation, OrderDirection};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};

pub mod ast;
mod lexer;

/// SQL Parser - Converts tokens into Abstract Syntax Tree (AST)
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
        }
    }

    /// Parses the input SQL statement into an AST
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let stmt = self.parse_statement()?;
        // The terminating semicolon is optional
        self.next_if_token(Token::Semicolon);
        if let Some(token) = self.peek()? {
            return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(t) => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Parse("[Parser] Unexpected end of input".into())),
        }
    }

    /// Parses a SELECT statement
    fn parse_select(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;
        let select = self.parse_select_list()?;

        self.next_expect(Token::Keyword(Keyword::From))?;
        let from = self.parse_from_clause()?;

        let where_clause = self.parse_optional_clause(&[Keyword::Where])?;
        let group_by = self.parse_optional_clause(&[Keyword::Group, Keyword::By])?;
        let having = self.parse_optional_clause(&[Keyword::Having])?;
        let order_by = self.parse_order_clause()?;
        let limit = self.parse_optional_clause(&[Keyword::Limit])?;
        let offset = self.parse_optional_clause(&[Keyword::Offset])?;

        Ok(ast::Statement::Select {
            select,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    /// Parses the projection list; `*` yields an empty list (all columns)
    fn parse_select_list(&mut self) -> Result<Vec<(Expression, Option<String>)>> {
        let mut select = Vec::new();
        if self.next_if_token(Token::Asterisk).is_some() {
            return Ok(select);
        }
        loop {
            let expr = self.parse_expression()?;
            let alias = match self.next_if_token(Token::Keyword(Keyword::As)) {
                Some(_) => Some(self.next_ident()?),
                None => None,
            };
            select.push((expr, alias));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(select)
    }

    /// Parses `table [AS alias]` followed by any number of joins
    fn parse_from_clause(&mut self) -> Result<FromItem> {
        let mut item = self.parse_table_ref()?;
        while let Some(join_type) = self.parse_join_type()? {
            let right = self.parse_table_ref()?;
            let predicate = match join_type {
                JoinType::Cross => None,
                _ => {
                    self.next_expect(Token::Keyword(Keyword::On))?;
                    Some(self.parse_expression()?)
                }
            };
            item = FromItem::Join {
                left: Box::new(item),
                right: Box::new(right),
                join_type,
                predicate,
            };
        }
        Ok(item)
    }

    fn parse_table_ref(&mut self) -> Result<FromItem> {
        let name = self.next_ident()?;
        let alias = if self.next_if_token(Token::Keyword(Keyword::As)).is_some() {
            Some(self.next_ident()?)
        } else {
            self.next_if(|t| matches!(t, Token::Ident(_)))
                .map(|t| t.to_string())
        };
        Ok(FromItem::Table { name, alias })
    }

    fn parse_join_type(&mut self) -> Result<Option<JoinType>> {
        let join_type = if self.next_if_token(Token::Keyword(Keyword::Cross)).is_some() {
            JoinType::Cross
        } else if self.next_if_token(Token::Keyword(Keyword::Left)).is_some() {
            self.next_if_token(Token::Keyword(Keyword::Outer));
            JoinType::Left
        } else if self.next_if_token(Token::Keyword(Keyword::Inner)).is_some() {
            JoinType::Inner
        } else if self.peek()? == Some(Token::Keyword(Keyword::Join)) {
            JoinType::Inner
        } else {
            return Ok(None);
        };
        self.next_expect(Token::Keyword(Keyword::Join))?;
        Ok(Some(join_type))
    }

    /// Parses `KEYWORD... expr` when the keywords are next, None otherwise
    fn parse_optional_clause(&mut self, keywords: &[Keyword]) -> Result<Option<Expression>> {
        let Some((first, rest)) = keywords.split_first() else {
            return Ok(None);
        };
        if self.next_if_token(Token::Keyword(*first)).is_none() {
            return Ok(None);
        }
        for keyword in rest {
            self.next_expect(Token::Keyword(*keyword))?;
        }
        Ok(Some(self.parse_expression()?))
    }

    fn parse_order_clause(&mut self) -> Result<Vec<(Expression, OrderDirection)>> {
        let mut order_by = Vec::new();
        if self.next_if_token(Token::Keyword(Keyword::Order)).is_none() {
            return Ok(order_by);
        }
        self.next_expect(Token::Keyword(Keyword::By))?;
        loop {
            let expr = self.parse_expression()?;
            let direction = match self.next_if(|t| {
                matches!(t, Token::Keyword(Keyword::Asc) | Token::Keyword(Keyword::Desc))
            }) {
                Some(Token::Keyword(Keyword::Desc)) => OrderDirection::Desc,
                _ => OrderDirection::Asc,
            };
            order_by.push((expr, direction));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(order_by)
    }

    /// Parses an expression: comparisons joined by AND
    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expr = self.parse_comparison()?;
        while self.next_if_token(Token::Keyword(Keyword::And)).is_some() {
            let rhs = self.parse_comparison()?;
            expr = Expression::Operation(Operation::And(Box::new(expr), Box::new(rhs)));
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let lhs = self.parse_primary()?;
        let op = match self.next_if(|t| {
            matches!(t, Token::Equal | Token::GreaterThan | Token::LessThan)
        }) {
            Some(op) => op,
            None => return Ok(lhs),
        };
        let lhs = Box::new(lhs);
        let rhs = Box::new(self.parse_primary()?);
        Ok(Expression::Operation(match op {
            Token::Equal => Operation::Equal(lhs, rhs),
            Token::GreaterThan => Operation::GreaterThan(lhs, rhs),
            _ => Operation::LessThan(lhs, rhs),
        }))
    }

    /// Parses a constant, column reference, function call or parenthesized expression
    fn parse_primary(&mut self) -> Result<Expression> {
        Ok(match self.next()? {
            Token::Number(n) => {
                // Lexer scans both 123 and 123.45 as Token::Number(String)
                if n.chars().all(|c| c.is_ascii_digit()) {
                    ast::Consts::Integer(n.parse()?).into()
                } else {
                    ast::Consts::Float(n.parse()?).into()
                }
            }
            Token::String(s) => ast::Consts::String(s).into(),
            Token::Keyword(Keyword::True) => ast::Consts::Boolean(true).into(),
            Token::Keyword(Keyword::False) => ast::Consts::Boolean(false).into(),
            Token::Keyword(Keyword::Null) => ast::Consts::Null.into(),
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.next_expect(Token::CloseParen)?;
                expr
            }
            Token::Ident(ident) => {
                if self.next_if_token(Token::OpenParen).is_some() {
                    let arg = if self.next_if_token(Token::Asterisk).is_some() {
                        None
                    } else {
                        Some(Box::new(self.parse_expression()?))
                    };
                    self.next_expect(Token::CloseParen)?;
                    Expression::Function(ident, arg)
                } else if self.next_if_token(Token::Period).is_some() {
                    Expression::Field(Some(ident), self.next_ident()?)
                } else {
                    Expression::Field(None, ident)
                }
            }
            t => {
                return Err(Error::Parse(format!(
                    "[Parser] Unexpected expression token {}",
                    t
                )))
            }
        })
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Parse("[Parser] Unexpected end of input".into())))
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}
