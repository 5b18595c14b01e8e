//! Formula lexer
//!
//! Turns formula text into tokens carrying their byte position.

use crate::error::{FormulaError, FormulaResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Function name, variable or boolean keyword
    Ident(String),
    Number(f64),
    /// Quoted string, quotes removed
    Str(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Eof,
}

impl TokenKind {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Ident(_) | TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::Eof => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> FormulaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let Some((pos, ch)) = self.chars.next() else {
            return Ok(Token::new(TokenKind::Eof, self.input.len()));
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '!' => self.pair('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.pair('=', TokenKind::LtEq, TokenKind::Lt),
            '>' => self.pair('=', TokenKind::GtEq, TokenKind::Gt),
            '=' => self.require('=', TokenKind::EqEq, pos, "'=='")?,
            '&' => self.require('&', TokenKind::AndAnd, pos, "'&&'")?,
            '|' => self.require('|', TokenKind::OrOr, pos, "'||'")?,
            '"' | '\'' => TokenKind::Str(self.read_string(ch, pos)?),
            '0'..='9' | '.' => TokenKind::Number(self.read_number(pos)?),
            c if c.is_alphabetic() || c == '_' => TokenKind::Ident(self.read_identifier(pos)),
            other => {
                return Err(FormulaError::syntax(
                    pos,
                    format!("unexpected character '{}'", other),
                ));
            }
        };

        Ok(Token::new(kind, pos))
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    /// Two-character operator if `second` follows, else the single one
    fn pair(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.chars.next_if(|&(_, c)| c == second).is_some() {
            double
        } else {
            single
        }
    }

    fn require(
        &mut self,
        second: char,
        kind: TokenKind,
        pos: usize,
        expected: &str,
    ) -> FormulaResult<TokenKind> {
        match self.chars.next_if(|&(_, c)| c == second) {
            Some(_) => Ok(kind),
            None => Err(FormulaError::syntax(pos, format!("expected {}", expected))),
        }
    }

    fn read_string(&mut self, quote: char, start: usize) -> FormulaResult<String> {
        let mut value = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                c if c == quote => return Ok(value),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(FormulaError::syntax(start, "unterminated string literal"))
    }

    fn read_number(&mut self, start: usize) -> FormulaResult<f64> {
        let mut end = start + 1;
        let mut seen_exponent = false;

        while let Some(&(i, ch)) = self.chars.peek() {
            match ch {
                '0'..='9' | '.' => {}
                'e' | 'E' if !seen_exponent => {
                    seen_exponent = true;
                    self.chars.next();
                    end = i + 1;
                    if let Some((j, _)) = self.chars.next_if(|&(_, c)| c == '+' || c == '-') {
                        end = j + 1;
                    }
                    continue;
                }
                _ => break,
            }
            self.chars.next();
            end = i + 1;
        }

        let text = &self.input[start..end];
        text.parse::<f64>()
            .map_err(|_| FormulaError::syntax(start, format!("invalid number '{}'", text)))
    }

    fn read_identifier(&mut self, start: usize) -> String {
        let mut end = self.input.len();
        while let Some(&(i, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.chars.next();
            } else {
                end = i;
                break;
            }
        }
        self.input[start..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_call() {
        assert_eq!(
            kinds("price(currentDate)"),
            vec![
                TokenKind::Ident("price".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("currentDate".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(kinds("20")[0], TokenKind::Number(20.0));
        assert_eq!(kinds("0.5")[0], TokenKind::Number(0.5));
        assert_eq!(kinds(".25")[0], TokenKind::Number(0.25));
        assert_eq!(kinds("1.5e-3")[0], TokenKind::Number(0.0015));
        assert_eq!(kinds("2E2")[0], TokenKind::Number(200.0));
    }

    #[test]
    fn test_minus_is_always_an_operator() {
        assert_eq!(
            kinds("a-5"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Minus,
                TokenKind::Number(5.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("<= >= == != && || ! < > ? : %"),
            vec![
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Question,
                TokenKind::Colon,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(kinds("'2020-01-01'")[0], TokenKind::Str("2020-01-01".to_string()));
        assert_eq!(kinds("\"a\\\"b\"")[0], TokenKind::Str("a\"b".to_string()));
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("  price ( x )").tokenize().unwrap();
        assert_eq!(tokens[0].position, 2);
        assert_eq!(tokens[1].position, 8);
        assert_eq!(tokens[4].position, 13);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Lexer::new("1 # 2").tokenize().unwrap_err(),
            FormulaError::syntax(2, "unexpected character '#'")
        );
        assert!(matches!(
            Lexer::new("a = b").tokenize(),
            Err(FormulaError::Syntax { position: 2, .. })
        ));
        assert!(matches!(
            Lexer::new("'open").tokenize(),
            Err(FormulaError::Syntax { position: 0, .. })
        ));
        assert!(matches!(
            Lexer::new("1.2.3").tokenize(),
            Err(FormulaError::Syntax { position: 0, .. })
        ));
    }
}
