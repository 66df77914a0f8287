//! Tokenizer + recursive-descent parser turning a byte stream of
//! s-expressions into `Expr` values.
use crate::expr::Expr;
use mesh_definitions::{Error, ErrorKind, Result};

struct Reader<'a> {
    chars: Vec<char>,
    pos: usize,
    _src: &'a str,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Reader {
            chars: src.chars().collect(),
            pos: 0,
            _src: src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            if self.peek() == Some(';') {
                while self.peek().map_or(false, |c| c != '\n') {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.skip_whitespace_and_comments();
        match self.peek() {
            None => Err(parse_err("unexpected end of input")),
            Some('(') => self.parse_list(),
            Some(')') => Err(parse_err("unexpected ')'")),
            Some('"') => self.parse_string(),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<Expr> {
        self.advance(); // consume '('
        let mut items = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(parse_err("unterminated list, missing ')'")),
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => items.push(self.parse_expr()?),
            }
        }
        Ok(Expr::list(items))
    }

    fn parse_string(&mut self) -> Result<Expr> {
        self.advance(); // consume opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(parse_err("unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(c) => s.push(c),
                    None => return Err(parse_err("unterminated escape in string literal")),
                },
                Some(c) => s.push(c),
            }
        }
        Ok(Expr::Str(s))
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == ';' {
                break;
            }
            s.push(c);
            self.advance();
        }
        if s.is_empty() {
            return Err(parse_err("empty atom"));
        }
        Ok(atom_from_str(&s))
    }
}

fn atom_from_str(s: &str) -> Expr {
    match s {
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        "nil" => Expr::Nil,
        _ => {
            if let Ok(n) = s.parse::<f64>() {
                Expr::Number(n)
            } else {
                Expr::Symbol(s.to_string())
            }
        }
    }
}

fn parse_err(msg: &str) -> Error {
    ErrorKind::ConfigParseError(msg.to_string()).into()
}

/// Parses a single root s-expression out of `src`, ignoring any trailing
/// whitespace/comments. Per the config file contains exactly
/// one root form.
pub fn parse_root(src: &str) -> Result<Expr> {
    let mut reader = Reader::new(src);
    let expr = reader.parse_expr()?;
    reader.skip_whitespace_and_comments();
    if reader.peek().is_some() {
        return Err(parse_err("trailing content after root expression"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists_and_atoms() {
        let e = parse_root("(cluster (metadata (name \"c1\")))").unwrap();
        assert_eq!(e.head(), Some("cluster"));
        let inner = e.as_list().unwrap()[1].clone();
        assert_eq!(inner.head(), Some("metadata"));
    }

    #[test]
    fn parses_numbers_bools_and_nil() {
        let e = parse_root("(list 1 2.5 true false nil)").unwrap();
        let items = e.as_list().unwrap();
        assert_eq!(items[1], Expr::Number(1.0));
        assert_eq!(items[2], Expr::Number(2.5));
        assert_eq!(items[3], Expr::Bool(true));
        assert_eq!(items[4], Expr::Bool(false));
        assert_eq!(items[5], Expr::Nil);
    }

    #[test]
    fn rejects_unterminated_list() {
        assert!(parse_root("(cluster (metadata )").is_err());
    }

    #[test]
    fn skips_semicolon_comments() {
        let e = parse_root("(cluster ; a comment\n (metadata))").unwrap();
        assert_eq!(e.head(), Some("cluster"));
    }
}
