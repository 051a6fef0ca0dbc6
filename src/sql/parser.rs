use super::lexer::{SqlLexer, Token};
use crate::aggregate::AggOp;
use crate::error::{EngineError, EngineResult};

/// SQL Abstract Syntax Tree types

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    /// Text that is not a SELECT statement. Executing it returns the input
    /// dataset unchanged.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub columns: Vec<SelectColumn>,
    pub from: String,
    pub join: Option<JoinClause>,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<String>,
    pub limit: Option<LimitClause>,
}

impl SelectStatement {
    pub fn has_aggregates(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c, SelectColumn::Aggregate { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    /// Left operand of the ON equality, as written (`users.id` or `id`)
    pub left_column: String,
    /// Right operand of the ON equality, as written
    pub right_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    Star,
    Column {
        name: String,
        alias: Option<String>,
    },
    Aggregate {
        function: AggOp,
        argument: AggregateArg,
        alias: Option<String>,
    },
}

impl SelectColumn {
    /// Column name this item produces in the output row.
    pub fn output_name(&self) -> String {
        match self {
            SelectColumn::Star => "*".to_string(),
            SelectColumn::Column { name, alias } => alias.clone().unwrap_or_else(|| name.clone()),
            SelectColumn::Aggregate {
                function,
                argument,
                alias,
            } => alias.clone().unwrap_or_else(|| {
                let arg = match argument {
                    AggregateArg::Star => "*",
                    AggregateArg::Column(name) => name.as_str(),
                };
                format!("{}({})", function.as_sql(), arg)
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    Star,
    Column(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// `column operator literal`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitClause {
    pub count: usize,
    pub offset: usize,
}

/// Parse query text.
///
/// Text that does not begin with SELECT is not an error: it yields
/// `Statement::Passthrough`, and executing that returns the input unchanged.
/// This keeps free-form input in the query box from failing, at the cost of
/// hiding typos in the leading keyword.
pub fn parse(query: &str) -> EngineResult<Statement> {
    let mut probe = SqlLexer::new(query);
    if !matches!(probe.next_token(), Ok(Token::Select)) {
        tracing::warn!(query, "query is not a SELECT statement; returning input unchanged");
        return Ok(Statement::Passthrough);
    }

    SqlParser::new(query)?.parse()
}

/// SQL Parser
pub struct SqlParser {
    tokens: Vec<Token>,
    position: usize,
}

impl SqlParser {
    pub fn new(input: &str) -> EngineResult<Self> {
        let mut lexer = SqlLexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek_token(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.position + offset)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: Token) -> EngineResult<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(EngineError::ParseError(format!(
                "Expected {:?}, found {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn expect_identifier(&mut self) -> EngineResult<String> {
        let name = match self.current_token() {
            Token::Identifier(name) => name.clone(),
            // Aggregate names double as ordinary column names
            Token::Count => "count".to_string(),
            Token::Sum => "sum".to_string(),
            Token::Avg => "avg".to_string(),
            Token::Min => "min".to_string(),
            Token::Max => "max".to_string(),
            other => {
                return Err(EngineError::ParseError(format!(
                    "Expected identifier, found {:?}",
                    other
                )))
            }
        };
        self.advance();
        Ok(name)
    }

    /// Dotted name such as `users.id`, `address.city` or `sales.csv`.
    fn parse_dotted_name(&mut self) -> EngineResult<String> {
        let mut name = self.expect_identifier()?;

        while *self.current_token() == Token::Dot {
            self.advance();
            let part = match self.current_token().clone() {
                Token::Integer(n) => {
                    self.advance();
                    n.to_string()
                }
                _ => self.expect_identifier()?,
            };
            name = format!("{}.{}", name, part);
        }

        Ok(name)
    }

    pub fn parse(&mut self) -> EngineResult<Statement> {
        let stmt = self.parse_select()?;

        // Optional semicolon at end
        if *self.current_token() == Token::Semicolon {
            self.advance();
        }

        match self.current_token() {
            Token::Eof => Ok(Statement::Select(stmt)),
            Token::And | Token::Or => Err(EngineError::ParseError(
                "Combining conditions with AND/OR is not supported".to_string(),
            )),
            Token::Join | Token::Inner | Token::Left | Token::Right => Err(EngineError::ParseError(
                "Only a single JOIN is supported".to_string(),
            )),
            other => Err(EngineError::ParseError(format!(
                "Unexpected token after statement: {:?}",
                other
            ))),
        }
    }

    fn parse_select(&mut self) -> EngineResult<SelectStatement> {
        self.expect(Token::Select)?;

        let columns = self.parse_select_columns()?;

        // FROM clause
        self.expect(Token::From)?;
        let from = self.parse_dotted_name()?;

        let join = self.parse_join_clause()?;

        // WHERE clause
        let where_clause = if *self.current_token() == Token::Where {
            self.advance();
            Some(self.parse_predicate()?)
        } else {
            None
        };

        // GROUP BY clause
        let group_by = if *self.current_token() == Token::Group {
            self.advance();
            self.expect(Token::By)?;
            self.parse_identifier_list()?
        } else {
            Vec::new()
        };

        // LIMIT clause
        let limit = if *self.current_token() == Token::Limit {
            self.advance();
            Some(self.parse_limit()?)
        } else {
            None
        };

        Ok(SelectStatement {
            columns,
            from,
            join,
            where_clause,
            group_by,
            limit,
        })
    }

    fn parse_join_clause(&mut self) -> EngineResult<Option<JoinClause>> {
        let join_type = match self.current_token() {
            Token::Join => {
                self.advance();
                JoinType::Inner
            }
            Token::Inner => {
                self.advance();
                self.expect(Token::Join)?;
                JoinType::Inner
            }
            Token::Left => {
                self.advance();
                if *self.current_token() == Token::Outer {
                    self.advance();
                }
                self.expect(Token::Join)?;
                JoinType::Left
            }
            Token::Right => {
                self.advance();
                if *self.current_token() == Token::Outer {
                    self.advance();
                }
                self.expect(Token::Join)?;
                JoinType::Right
            }
            _ => return Ok(None),
        };

        let table = self.parse_dotted_name()?;

        self.expect(Token::On)?;
        let left_column = self.parse_dotted_name()?;
        self.expect(Token::Equal)?;
        let right_column = self.parse_dotted_name()?;

        Ok(Some(JoinClause {
            join_type,
            table,
            left_column,
            right_column,
        }))
    }

    fn parse_select_columns(&mut self) -> EngineResult<Vec<SelectColumn>> {
        let mut columns = Vec::new();

        loop {
            let col = self.parse_select_column()?;
            columns.push(col);

            if *self.current_token() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(columns)
    }

    fn parse_select_column(&mut self) -> EngineResult<SelectColumn> {
        if *self.current_token() == Token::Star {
            self.advance();
            return Ok(SelectColumn::Star);
        }

        let function = match self.current_token() {
            Token::Count => Some(AggOp::Count),
            Token::Sum => Some(AggOp::Sum),
            Token::Avg => Some(AggOp::Avg),
            Token::Min => Some(AggOp::Min),
            Token::Max => Some(AggOp::Max),
            _ => None,
        };

        if let Some(function) = function {
            if *self.peek_token(1) == Token::LeftParen {
                self.advance();
                self.expect(Token::LeftParen)?;

                let argument = if *self.current_token() == Token::Star {
                    self.advance();
                    AggregateArg::Star
                } else {
                    AggregateArg::Column(self.parse_dotted_name()?)
                };

                self.expect(Token::RightParen)?;
                let alias = self.parse_optional_alias()?;

                return Ok(SelectColumn::Aggregate {
                    function,
                    argument,
                    alias,
                });
            }
        }

        let name = self.parse_dotted_name()?;
        let alias = self.parse_optional_alias()?;

        Ok(SelectColumn::Column { name, alias })
    }

    fn parse_optional_alias(&mut self) -> EngineResult<Option<String>> {
        match self.current_token() {
            Token::As => {
                self.advance();
                Ok(Some(self.expect_identifier()?))
            }
            // Implicit alias; keywords lex as their own tokens so FROM etc. never land here
            Token::Identifier(name) => {
                let alias = name.clone();
                self.advance();
                Ok(Some(alias))
            }
            _ => Ok(None),
        }
    }

    fn parse_identifier_list(&mut self) -> EngineResult<Vec<String>> {
        let mut list = Vec::new();

        loop {
            list.push(self.parse_dotted_name()?);

            if *self.current_token() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(list)
    }

    fn parse_predicate(&mut self) -> EngineResult<Predicate> {
        let column = self.parse_dotted_name()?;

        let op = match self.current_token() {
            Token::Equal => CompareOp::Eq,
            Token::NotEqual => CompareOp::NotEq,
            Token::LessThan => CompareOp::Lt,
            Token::LessThanEq => CompareOp::LtEq,
            Token::GreaterThan => CompareOp::Gt,
            Token::GreaterThanEq => CompareOp::GtEq,
            other => {
                return Err(EngineError::ParseError(format!(
                    "Expected comparison operator, found {:?}",
                    other
                )))
            }
        };
        self.advance();

        let value = self.parse_literal()?;

        Ok(Predicate { column, op, value })
    }

    fn parse_literal(&mut self) -> EngineResult<Literal> {
        let negative = if *self.current_token() == Token::Minus {
            self.advance();
            true
        } else {
            false
        };

        let literal = match self.current_token().clone() {
            Token::Integer(n) => Literal::Number(n as f64),
            Token::Float(n) => Literal::Number(n),
            Token::String(s) if !negative => Literal::String(s),
            other => {
                return Err(EngineError::ParseError(format!(
                    "Expected literal, found {:?}",
                    other
                )))
            }
        };
        self.advance();

        Ok(match literal {
            Literal::Number(n) if negative => Literal::Number(-n),
            other => other,
        })
    }

    fn parse_count(&mut self, clause: &str) -> EngineResult<usize> {
        match self.current_token() {
            Token::Integer(n) if *n >= 0 => {
                let n = *n as usize;
                self.advance();
                Ok(n)
            }
            other => Err(EngineError::ParseError(format!(
                "Expected non-negative integer after {}, found {:?}",
                clause, other
            ))),
        }
    }

    /// `LIMIT n`, `LIMIT n OFFSET m`, or MySQL-style `LIMIT m, n` (offset first).
    fn parse_limit(&mut self) -> EngineResult<LimitClause> {
        let first = self.parse_count("LIMIT")?;

        match self.current_token() {
            Token::Comma => {
                self.advance();
                let count = self.parse_count("LIMIT")?;
                Ok(LimitClause {
                    count,
                    offset: first,
                })
            }
            Token::Offset => {
                self.advance();
                let offset = self.parse_count("OFFSET")?;
                Ok(LimitClause {
                    count: first,
                    offset,
                })
            }
            _ => Ok(LimitClause {
                count: first,
                offset: 0,
            }),
        }
    }
}
