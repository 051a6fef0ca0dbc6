//! SQL subset: lexer and recursive-descent parser.

pub mod lexer;
pub mod parser;

pub use lexer::{SqlLexer, Token};
pub use parser::{
    parse, AggregateArg, CompareOp, JoinClause, JoinType, LimitClause, Literal, Predicate,
    SelectColumn, SelectStatement, SqlParser, Statement,
};
