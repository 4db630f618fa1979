use crate::ast::{BinOp, Expr};
use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    Null,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Not,
    Dot,
    Comma,
    LParen,
    RParen,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, bytes: src.as_bytes(), pos: 0 }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.pos >= self.bytes.len() {
                break;
            }
            let c = self.bytes[self.pos];
            match c {
                b'"' => out.push(self.lex_string()?),
                b'(' => {
                    self.pos += 1;
                    out.push(Token::LParen);
                }
                b')' => {
                    self.pos += 1;
                    out.push(Token::RParen);
                }
                b',' => {
                    self.pos += 1;
                    out.push(Token::Comma);
                }
                b'.' => {
                    self.pos += 1;
                    out.push(Token::Dot);
                }
                b'!' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        out.push(Token::Ne);
                    } else {
                        out.push(Token::Not);
                    }
                }
                b'=' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        out.push(Token::EqEq);
                    } else {
                        return Err(self.err("expected '==' "));
                    }
                }
                b'&' => {
                    self.pos += 1;
                    if self.peek() == Some(b'&') {
                        self.pos += 1;
                        out.push(Token::AndAnd);
                    } else {
                        return Err(self.err("expected '&&'"));
                    }
                }
                b'|' => {
                    self.pos += 1;
                    if self.peek() == Some(b'|') {
                        self.pos += 1;
                        out.push(Token::OrOr);
                    } else {
                        return Err(self.err("expected '||'"));
                    }
                }
                b'-' | b'0'..=b'9' => out.push(self.lex_int()?),
                c if c.is_ascii_alphabetic() || c == b'_' => out.push(self.lex_ident()),
                _ => return Err(self.err("unexpected character")),
            }
        }
        Ok(out)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn err(&self, message: &str) -> ExprError {
        ExprError::Parse { offset: self.pos, message: message.to_string() }
    }

    fn lex_string(&mut self) -> Result<Token, ExprError> {
        self.pos += 1; // opening quote
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'"' {
                let s = self.src[start..self.pos].to_string();
                self.pos += 1;
                return Ok(Token::Str(s));
            }
            self.pos += 1;
        }
        Err(self.err("unterminated string literal"))
    }

    fn lex_int(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos]
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.err("invalid integer literal"))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let s = &self.src[start..self.pos];
        match s {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(s.to_string()),
        }
    }
}

/// Recursive-descent parser over the HCL-style predicate grammar
/// (spec.md §4.2(b)): literals, `==`/`!=`, function calls, member access,
/// `&&`/`||`/`!`.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(src: &str) -> Result<Expr, ExprError> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut p = Parser { tokens, pos: 0 };
        let expr = p.parse_or()?;
        if p.pos != p.tokens.len() {
            return Err(ExprError::Parse { offset: p.pos, message: "trailing input".to_string() });
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Expr::BinOp(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.parse_primary()?;
        match self.peek() {
            Some(Token::EqEq) => {
                self.bump();
                let rhs = self.parse_primary()?;
                Ok(Expr::BinOp(BinOp::Eq, Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::Ne) => {
                self.bump();
                let rhs = self.parse_primary()?;
                Ok(Expr::BinOp(BinOp::Ne, Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ExprError::Parse { offset: self.pos, message: "expected ')'".to_string() }),
                }
            }
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.bump();
                    let args = self.parse_args()?;
                    Ok(Expr::Call(name, args))
                } else {
                    let mut path = vec![name];
                    while matches!(self.peek(), Some(Token::Dot)) {
                        self.bump();
                        match self.bump() {
                            Some(Token::Ident(seg)) => path.push(seg),
                            _ => {
                                return Err(ExprError::Parse {
                                    offset: self.pos,
                                    message: "expected identifier after '.'".to_string(),
                                })
                            }
                        }
                    }
                    Ok(Expr::Var(path))
                }
            }
            other => Err(ExprError::Parse {
                offset: self.pos,
                message: format!("unexpected token {:?}", other),
            }),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            match self.bump() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => {
                    return Err(ExprError::Parse {
                        offset: self.pos,
                        message: format!("expected ',' or ')', got {:?}", other),
                    })
                }
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equality_on_member_access() {
        let e = Parser::parse(r#"node.inputs.type == "postgres""#).unwrap();
        assert_eq!(
            e,
            Expr::BinOp(
                BinOp::Eq,
                Box::new(Expr::Var(vec!["node".into(), "inputs".into(), "type".into()])),
                Box::new(Expr::Str("postgres".into())),
            )
        );
    }

    #[test]
    fn parses_function_call_with_nested_calls() {
        let e = Parser::parse(r#"element(split(":", node.inputs.type), 0) == "postgres""#).unwrap();
        assert!(matches!(e, Expr::BinOp(BinOp::Eq, _, _)));
    }

    #[test]
    fn parses_and_or_not() {
        let e = Parser::parse(r#"!(a == "x") && (b != null || c == true)"#).unwrap();
        assert!(matches!(e, Expr::BinOp(BinOp::And, _, _)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(Parser::parse(r#"true true"#).is_err());
    }
}
