use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // SQL Keywords
    Select,
    From,
    Where,

    // Clauses
    Group,
    By,
    Limit,
    Offset,
    As,

    // Joins
    Join,
    Left,
    Right,
    Inner,
    Outer,
    On,

    // Logical (recognized only to be rejected)
    And,
    Or,

    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Literals and identifiers
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Operators
    Equal,         // =
    NotEqual,      // != or <>
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=
    Minus,         // -
    Star,          // *

    // Delimiters
    Comma,      // ,
    Dot,        // .
    LeftParen,  // (
    RightParen, // )
    Semicolon,  // ;

    // Special
    Eof,
}

pub struct SqlLexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl SqlLexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current_char {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip /
        self.advance(); // skip *
        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                break;
            }
            self.advance();
        }
    }

    /// Reads `12`, `3.5`, `.5`, `1e3` or `1.5E-2`. Anything with a dot or an
    /// exponent becomes a float.
    fn read_number(&mut self) -> EngineResult<Token> {
        let mut num_str = String::new();
        let mut is_float = false;
        let mut has_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                is_float = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(len) = self.exponent_len() {
            is_float = true;
            for _ in 0..len {
                if let Some(c) = self.current_char {
                    num_str.push(c);
                }
                self.advance();
            }
        }

        if is_float {
            num_str
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| EngineError::ParseError(format!("Invalid number: {}", num_str)))
        } else {
            num_str
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| EngineError::ParseError(format!("Invalid number: {}", num_str)))
        }
    }

    /// Length of an `e[+-]digits` exponent starting at the current position.
    fn exponent_len(&self) -> Option<usize> {
        if !matches!(self.current_char, Some('e' | 'E')) {
            return None;
        }
        let mut len = 1;
        if matches!(self.input.get(self.position + len), Some('+' | '-')) {
            len += 1;
        }
        let digits = self.input[(self.position + len).min(self.input.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        (digits > 0).then_some(len + digits)
    }

    /// True when the previous character belongs to a word, so a following
    /// `.` is a path separator rather than the start of a number.
    fn follows_word(&self) -> bool {
        self.position
            .checked_sub(1)
            .and_then(|i| self.input.get(i))
            .is_some_and(|c| c.is_alphanumeric() || matches!(*c, '_' | '$' | ']' | '`' | ')'))
    }

    fn read_string(&mut self, quote: char) -> EngineResult<Token> {
        self.advance(); // Skip opening quote

        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                // Doubled quote is an escaped quote
                if self.peek() == Some(quote) {
                    string.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return Ok(Token::String(string));
                }
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    string.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        _ => escaped,
                    });
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(EngineError::ParseError("Unterminated string".to_string()))
    }

    /// Reads a word. A directly attached `[n]` index suffix (as produced by
    /// flattening, e.g. `tags[0]`) stays part of the identifier.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                ident.push(ch);
                self.advance();
            } else if let Some(len) = (ch == '[').then(|| self.index_suffix_len()).flatten() {
                for _ in 0..len {
                    if let Some(c) = self.current_char {
                        ident.push(c);
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }

        match ident.to_uppercase().as_str() {
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "GROUP" => Token::Group,
            "BY" => Token::By,
            "LIMIT" => Token::Limit,
            "OFFSET" => Token::Offset,
            "AS" => Token::As,
            "JOIN" => Token::Join,
            "LEFT" => Token::Left,
            "RIGHT" => Token::Right,
            "INNER" => Token::Inner,
            "OUTER" => Token::Outer,
            "ON" => Token::On,
            "AND" => Token::And,
            "OR" => Token::Or,
            "COUNT" => Token::Count,
            "SUM" => Token::Sum,
            "AVG" => Token::Avg,
            "MIN" => Token::Min,
            "MAX" => Token::Max,
            _ => Token::Identifier(ident),
        }
    }

    /// Length of a `[digits]` run starting at the current position.
    fn index_suffix_len(&self) -> Option<usize> {
        let mut len = 1;
        while let Some(c) = self.input.get(self.position + len) {
            if c.is_ascii_digit() {
                len += 1;
            } else if *c == ']' && len > 1 {
                return Some(len + 1);
            } else {
                return None;
            }
        }
        None
    }

    fn read_quoted_identifier(&mut self, quote: char) -> EngineResult<Token> {
        self.advance(); // Skip opening quote

        let mut ident = String::new();
        let closing = if quote == '[' { ']' } else { quote };

        while let Some(ch) = self.current_char {
            if ch == closing {
                self.advance();
                return Ok(Token::Identifier(ident));
            }
            ident.push(ch);
            self.advance();
        }

        Err(EngineError::ParseError(
            "Unterminated quoted identifier".to_string(),
        ))
    }

    pub fn next_token(&mut self) -> EngineResult<Token> {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Ok(Token::Eof),
                Some('-') if self.peek() == Some('-') => {
                    self.skip_line_comment();
                    continue;
                }
                Some('/') if self.peek() == Some('*') => {
                    self.skip_block_comment();
                    continue;
                }
                _ => break,
            }
        }

        let token = match self.current_char {
            None => Token::Eof,

            Some(ch) if ch.is_ascii_digit() => {
                return self.read_number();
            }

            Some('.') if self.peek().is_some_and(|c| c.is_ascii_digit()) && !self.follows_word() => {
                return self.read_number();
            }

            Some(quote @ ('\'' | '"')) => {
                return self.read_string(quote);
            }

            Some(quote @ ('`' | '[')) => {
                return self.read_quoted_identifier(quote);
            }

            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                return Ok(self.read_identifier());
            }

            Some('=') => {
                self.advance();
                // Tolerate `==`
                if self.current_char == Some('=') {
                    self.advance();
                }
                Token::Equal
            }

            Some('!') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    return Err(EngineError::ParseError("Unexpected character: !".to_string()));
                }
            }

            Some('<') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessThanEq
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::NotEqual // <>
                } else {
                    Token::LessThan
                }
            }

            Some('>') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterThanEq
                } else {
                    Token::GreaterThan
                }
            }

            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some('(') => {
                self.advance();
                Token::LeftParen
            }
            Some(')') => {
                self.advance();
                Token::RightParen
            }
            Some(';') => {
                self.advance();
                Token::Semicolon
            }

            Some(ch) => {
                return Err(EngineError::ParseError(format!(
                    "Unexpected character: {}",
                    ch
                )));
            }
        };

        Ok(token)
    }

    pub fn tokenize(&mut self) -> EngineResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }
}
