//! Lexer and recursive-descent parser for the MVM surface language.
//!
//! Grammar:
//!
//! ```text
//! program   := stmt*
//! stmt      := "let" IDENT "=" expr ";"
//!            | "print" "(" expr ")" ";"
//!            | IDENT "(" args ")" ";"
//! expr      := term (("+" | "-") term)*
//! term      := primary (("*" | "/") primary)*
//! primary   := NUMBER | IDENT | IDENT "(" args ")" | "(" expr ")"
//! args      := (expr ("," expr)*)?
//! ```
//!
//! `//` line comments are stripped by the lexer. Any malformed input is a
//! fatal error naming the offending token and its position; no partial AST
//! is ever produced.

use thiserror::Error;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Num(i64),
    Let,
    Print,
    Eq,
    Semi,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Num(n) => write!(f, "{}", n),
            Token::Let => write!(f, "let"),
            Token::Print => write!(f, "print"),
            Token::Eq => write!(f, "="),
            Token::Semi => write!(f, ";"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A fatal compile-time syntax error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("syntax error at token {position}: expected {expected}, found `{found}`")]
    Unexpected {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("syntax error: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("syntax error: unrecognized character `{ch}`")]
    BadCharacter { ch: char },
    #[error("syntax error: integer literal `{literal}` is out of range")]
    LiteralOutOfRange { literal: String },
}

/// Binary operators of the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(i64),
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, value: Expr },
    Print(Expr),
    Call { callee: String, args: Vec<Expr> },
}

/// Tokenize source text, stripping `//` line comments.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| SyntaxError::LiteralOutOfRange { literal: digits })?;
                tokens.push(Token::Num(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "let" => Token::Let,
                    "print" => Token::Print,
                    _ => Token::Ident(word),
                });
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    // line comment
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ch => return Err(SyntaxError::BadCharacter { ch }),
        }
    }

    Ok(tokens)
}

/// Parse source text into a statement list.
pub fn parse(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn program(mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        while self.pos < self.tokens.len() {
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek() {
            Some(Token::Let) => {
                self.advance();
                let name = self.ident("variable name")?;
                self.expect(Token::Eq, "`=` after variable name")?;
                let value = self.expr()?;
                self.expect(Token::Semi, "`;` after assignment")?;
                Ok(Stmt::Let { name, value })
            }
            Some(Token::Print) => {
                self.advance();
                self.expect(Token::LParen, "`(` after print")?;
                let value = self.expr()?;
                self.expect(Token::RParen, "`)` after print expression")?;
                self.expect(Token::Semi, "`;` after print")?;
                Ok(Stmt::Print(value))
            }
            Some(Token::Ident(_)) => {
                let callee = self.ident("function name")?;
                self.expect(Token::LParen, "`(` after function name")?;
                let args = self.args()?;
                self.expect(Token::Semi, "`;` after call")?;
                Ok(Stmt::Call { callee, args })
            }
            Some(tok) => Err(SyntaxError::Unexpected {
                position: self.pos,
                expected: "statement",
                found: tok.to_string(),
            }),
            None => Err(SyntaxError::UnexpectedEof {
                expected: "statement",
            }),
        }
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            node = Expr::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.primary()?;
            node = Expr::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().cloned() {
            Some(Token::Num(n)) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let args = self.args()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let node = self.expr()?;
                self.expect(Token::RParen, "`)` after grouped expression")?;
                Ok(node)
            }
            Some(tok) => Err(SyntaxError::Unexpected {
                position: self.pos,
                expected: "expression",
                found: tok.to_string(),
            }),
            None => Err(SyntaxError::UnexpectedEof {
                expected: "expression",
            }),
        }
    }

    /// Parse a comma-separated argument list; consumes the closing paren.
    fn args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::RParen) => {
                    self.advance();
                    break;
                }
                Some(tok) => {
                    return Err(SyntaxError::Unexpected {
                        position: self.pos,
                        expected: "`,` or `)` in argument list",
                        found: tok.to_string(),
                    })
                }
                None => {
                    return Err(SyntaxError::UnexpectedEof {
                        expected: "`)` after argument list",
                    })
                }
            }
        }
        Ok(args)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, SyntaxError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(name)
            }
            Some(tok) => Err(SyntaxError::Unexpected {
                position: self.pos,
                expected,
                found: tok.to_string(),
            }),
            None => Err(SyntaxError::UnexpectedEof { expected }),
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(tok) if *tok == token => {
                self.advance();
                Ok(())
            }
            Some(tok) => Err(SyntaxError::Unexpected {
                position: self.pos,
                expected,
                found: tok.to_string(),
            }),
            None => Err(SyntaxError::UnexpectedEof { expected }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_let_and_print() {
        let stmts = parse("let x = 2 + 3 * 4; print(x);").unwrap();
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::Let { name, value } => {
                assert_eq!(name, "x");
                // * binds tighter than +
                match value {
                    Expr::Binary { op: BinOp::Add, rhs, .. } => {
                        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
                    }
                    other => panic!("expected addition, got {:?}", other),
                }
            }
            other => panic!("expected let, got {:?}", other),
        }
        assert!(matches!(stmts[1], Stmt::Print(_)));
    }

    #[test]
    fn test_parse_grouping() {
        let stmts = parse("let y = (1 + 2) * 3;").unwrap();
        match &stmts[0] {
            Stmt::Let { value, .. } => {
                assert!(matches!(value, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_statement_and_expression() {
        let stmts = parse("factorial(5); let x = multiply(2, 3);").unwrap();
        assert!(matches!(&stmts[0], Stmt::Call { callee, args } if callee == "factorial" && args.len() == 1));
        match &stmts[1] {
            Stmt::Let { value, .. } => {
                assert!(matches!(value, Expr::Call { args, .. } if args.len() == 2));
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_stripped() {
        let stmts = parse("// header\nlet x = 1; // trailing\nprint(x);").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_missing_equals_is_fatal() {
        let err = parse("let x 5;").unwrap_err();
        assert!(matches!(err, SyntaxError::Unexpected { found, .. } if found == "5"));
    }

    #[test]
    fn test_missing_paren_is_fatal() {
        assert!(parse("print 5;").is_err());
        assert!(parse("print(5;").is_err());
    }

    #[test]
    fn test_oversized_literal_is_fatal() {
        // one past i64::MAX
        let err = parse("let x = 9223372036854775808;").unwrap_err();
        assert_eq!(
            err,
            SyntaxError::LiteralOutOfRange {
                literal: "9223372036854775808".to_string()
            }
        );
        // the boundary value itself still parses
        assert!(parse("let x = 9223372036854775807;").is_ok());
    }

    #[test]
    fn test_error_names_position() {
        let err = parse("let x = ;").unwrap_err();
        match err {
            SyntaxError::Unexpected { position, .. } => assert_eq!(position, 3),
            other => panic!("expected Unexpected, got {:?}", other),
        }
    }
}
