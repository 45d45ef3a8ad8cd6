//! Token scanner for the declaration subset.
//!
//! Hand-rolled over the raw bytes, with the source language's automatic
//! semicolon insertion: a newline after an identifier, literal, or closing
//! bracket terminates the statement.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tok {
    Ident(String),
    Int(String),
    Float(String),
    Imag(String),
    Rune(String),
    /// Interpreted string literal, escapes resolved.
    Str(String),
    /// Raw (backquoted) string literal, verbatim.
    RawStr(String),
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Star,
    Pipe,
    Tilde,
    Arrow,
    Ellipsis,
    Assign,
    /// Any other operator byte; declaration parsing only ever skips these.
    Other(char),
    Eof,
}

impl Tok {
    pub fn is_ident(&self, word: &str) -> bool {
        matches!(self, Tok::Ident(name) if name == word)
    }
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Ident(name) => write!(f, "{name}"),
            Tok::Int(v) | Tok::Float(v) | Tok::Imag(v) => write!(f, "{v}"),
            Tok::Rune(v) => write!(f, "'{v}'"),
            Tok::Str(v) => write!(f, "{v:?}"),
            Tok::RawStr(v) => write!(f, "`{v}`"),
            Tok::LParen => f.write_str("("),
            Tok::RParen => f.write_str(")"),
            Tok::LBrack => f.write_str("["),
            Tok::RBrack => f.write_str("]"),
            Tok::LBrace => f.write_str("{"),
            Tok::RBrace => f.write_str("}"),
            Tok::Comma => f.write_str(","),
            Tok::Semi => f.write_str(";"),
            Tok::Dot => f.write_str("."),
            Tok::Star => f.write_str("*"),
            Tok::Pipe => f.write_str("|"),
            Tok::Tilde => f.write_str("~"),
            Tok::Arrow => f.write_str("<-"),
            Tok::Ellipsis => f.write_str("..."),
            Tok::Assign => f.write_str("="),
            Tok::Other(c) => write!(f, "{c}"),
            Tok::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug)]
pub struct ScanError {
    pub pos: Pos,
    pub message: String,
}

pub struct Scanner<'s> {
    src: &'s [u8],
    offset: usize,
    line: u32,
    col: u32,
    /// Whether a newline here would insert a semicolon.
    semi_pending: bool,
}

impl<'s> Scanner<'s> {
    pub fn new(src: &'s str) -> Self {
        Scanner {
            src: src.as_bytes(),
            offset: 0,
            line: 1,
            col: 1,
            semi_pending: false,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.offset).copied()
    }

    fn peek_byte_at(&self, n: usize) -> Option<u8> {
        self.src.get(self.offset + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            pos: self.pos(),
            message: message.into(),
        }
    }

    /// Scan the next token. Never returns `Tok::Semi` for a real `;` and an
    /// inserted one differently; callers cannot tell, as in the language.
    pub fn next(&mut self) -> Result<(Tok, Pos), ScanError> {
        loop {
            let Some(b) = self.peek_byte() else {
                let pos = self.pos();
                if self.semi_pending {
                    self.semi_pending = false;
                    return Ok((Tok::Semi, pos));
                }
                return Ok((Tok::Eof, pos));
            };
            match b {
                b'\n' => {
                    let pos = self.pos();
                    self.bump();
                    if self.semi_pending {
                        self.semi_pending = false;
                        return Ok((Tok::Semi, pos));
                    }
                }
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                }
                b'/' if self.peek_byte_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek_byte() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                b'/' if self.peek_byte_at(1) == Some(b'*') => {
                    self.bump();
                    self.bump();
                    let mut crossed_newline = false;
                    loop {
                        match self.bump() {
                            Some(b'*') if self.peek_byte() == Some(b'/') => {
                                self.bump();
                                break;
                            }
                            Some(b'\n') => crossed_newline = true,
                            Some(_) => {}
                            None => return Err(self.error("unterminated block comment")),
                        }
                    }
                    if crossed_newline && self.semi_pending {
                        self.semi_pending = false;
                        return Ok((Tok::Semi, self.pos()));
                    }
                }
                _ => break,
            }
        }

        let pos = self.pos();
        let b = self.peek_byte().unwrap_or(0);
        let tok = match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | 0x80.. => self.scan_ident()?,
            b'0'..=b'9' => self.scan_number()?,
            b'.' => {
                if matches!(self.peek_byte_at(1), Some(b'0'..=b'9')) {
                    self.scan_number()?
                } else if self.peek_byte_at(1) == Some(b'.') && self.peek_byte_at(2) == Some(b'.') {
                    self.bump();
                    self.bump();
                    self.bump();
                    Tok::Ellipsis
                } else {
                    self.bump();
                    Tok::Dot
                }
            }
            b'"' => self.scan_string()?,
            b'`' => self.scan_raw_string()?,
            b'\'' => self.scan_rune()?,
            b'(' => {
                self.bump();
                Tok::LParen
            }
            b')' => {
                self.bump();
                Tok::RParen
            }
            b'[' => {
                self.bump();
                Tok::LBrack
            }
            b']' => {
                self.bump();
                Tok::RBrack
            }
            b'{' => {
                self.bump();
                Tok::LBrace
            }
            b'}' => {
                self.bump();
                Tok::RBrace
            }
            b',' => {
                self.bump();
                Tok::Comma
            }
            b';' => {
                self.bump();
                Tok::Semi
            }
            b'*' => {
                self.bump();
                Tok::Star
            }
            b'|' => {
                self.bump();
                if self.peek_byte() == Some(b'|') {
                    self.bump();
                    Tok::Other('|')
                } else {
                    Tok::Pipe
                }
            }
            b'~' => {
                self.bump();
                Tok::Tilde
            }
            b'<' => {
                self.bump();
                if self.peek_byte() == Some(b'-') {
                    self.bump();
                    Tok::Arrow
                } else {
                    if self.peek_byte() == Some(b'=') || self.peek_byte() == Some(b'<') {
                        self.bump();
                    }
                    Tok::Other('<')
                }
            }
            b'=' => {
                self.bump();
                if self.peek_byte() == Some(b'=') {
                    self.bump();
                    Tok::Other('=')
                } else {
                    Tok::Assign
                }
            }
            b'/' => {
                self.bump();
                if self.peek_byte() == Some(b'=') {
                    self.bump();
                }
                Tok::Other('/')
            }
            _ => {
                let c = self.bump().unwrap_or(b'?') as char;
                // Fold multi-byte operators like :=, +=, &&, ++ into a
                // single Other token; declaration parsing skips them all.
                if matches!(self.peek_byte(), Some(b'=') | Some(b'&') | Some(b'+') | Some(b'-'))
                    && matches!(c, ':' | '+' | '-' | '&' | '!' | '>' | '%' | '^')
                {
                    self.bump();
                }
                Tok::Other(c)
            }
        };

        self.semi_pending = matches!(
            tok,
            Tok::Ident(_)
                | Tok::Int(_)
                | Tok::Float(_)
                | Tok::Imag(_)
                | Tok::Rune(_)
                | Tok::Str(_)
                | Tok::RawStr(_)
                | Tok::RParen
                | Tok::RBrack
                | Tok::RBrace
        );
        // `break`, `continue`, `fallthrough`, and `return` also trigger
        // insertion; they scan as identifiers, so the rule above covers
        // them. `++`/`--` only appear inside skipped bodies.

        Ok((tok, pos))
    }

    fn scan_ident(&mut self) -> Result<Tok, ScanError> {
        let start = self.offset;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80 {
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.offset])
            .map_err(|_| self.error("invalid UTF-8 in identifier"))?;
        Ok(Tok::Ident(text.to_owned()))
    }

    fn scan_number(&mut self) -> Result<Tok, ScanError> {
        let start = self.offset;
        let mut is_float = false;
        let mut is_imag = false;

        if self.peek_byte() == Some(b'0')
            && matches!(
                self.peek_byte_at(1),
                Some(b'x') | Some(b'X') | Some(b'b') | Some(b'B') | Some(b'o') | Some(b'O')
            )
        {
            self.bump();
            self.bump();
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_hexdigit() || b == b'_' {
                    self.bump();
                } else {
                    break;
                }
            }
        } else {
            while let Some(b) = self.peek_byte() {
                match b {
                    b'0'..=b'9' | b'_' => {
                        self.bump();
                    }
                    b'.' if !is_float
                        && self.peek_byte_at(1) != Some(b'.') =>
                    {
                        is_float = true;
                        self.bump();
                    }
                    b'e' | b'E' => {
                        is_float = true;
                        self.bump();
                        if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                            self.bump();
                        }
                    }
                    _ => break,
                }
            }
        }
        if self.peek_byte() == Some(b'i') {
            is_imag = true;
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.offset])
            .map_err(|_| self.error("invalid number"))?
            .to_owned();
        Ok(if is_imag {
            Tok::Imag(text)
        } else if is_float {
            Tok::Float(text)
        } else {
            Tok::Int(text)
        })
    }

    fn scan_string(&mut self) -> Result<Tok, ScanError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => {
                    let esc = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated string literal"))?;
                    match esc {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'\\' => out.push('\\'),
                        b'"' => out.push('"'),
                        b'\'' => out.push('\''),
                        // Other escape forms survive verbatim; the loader
                        // never interprets them.
                        other => {
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                }
                Some(b'\n') | None => return Err(self.error("unterminated string literal")),
                Some(b) => out.push(b as char),
            }
        }
        Ok(Tok::Str(out))
    }

    fn scan_raw_string(&mut self) -> Result<Tok, ScanError> {
        self.bump(); // opening backquote
        let start = self.offset;
        loop {
            match self.peek_byte() {
                Some(b'`') => break,
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated raw string literal")),
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.offset])
            .map_err(|_| self.error("invalid raw string"))?
            .to_owned();
        self.bump(); // closing backquote
        Ok(Tok::RawStr(text))
    }

    fn scan_rune(&mut self) -> Result<Tok, ScanError> {
        self.bump(); // opening quote
        let start = self.offset;
        loop {
            match self.bump() {
                Some(b'\'') => break,
                Some(b'\\') => {
                    self.bump();
                }
                Some(_) => {}
                None => return Err(self.error("unterminated rune literal")),
            }
        }
        let end = self.offset.saturating_sub(1);
        let text = std::str::from_utf8(&self.src[start..end])
            .unwrap_or_default()
            .to_owned();
        Ok(Tok::Rune(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        let mut s = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let (tok, _) = s.next().unwrap();
            if tok == Tok::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn scans_declaration_tokens() {
        let got = toks("type Foo struct { A int }");
        assert_eq!(
            got,
            vec![
                Tok::Ident("type".into()),
                Tok::Ident("Foo".into()),
                Tok::Ident("struct".into()),
                Tok::LBrace,
                Tok::Ident("A".into()),
                Tok::Ident("int".into()),
                Tok::RBrace,
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn inserts_semicolons_at_newlines() {
        let got = toks("x\ny");
        assert_eq!(
            got,
            vec![
                Tok::Ident("x".into()),
                Tok::Semi,
                Tok::Ident("y".into()),
                Tok::Semi,
            ]
        );
        // No insertion after an opening brace.
        let got = toks("struct {\n}");
        assert_eq!(
            got,
            vec![
                Tok::Ident("struct".into()),
                Tok::LBrace,
                Tok::RBrace,
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let got = toks("a // trailing\nb /* inline */ c");
        assert_eq!(
            got,
            vec![
                Tok::Ident("a".into()),
                Tok::Semi,
                Tok::Ident("b".into()),
                Tok::Ident("c".into()),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn multiline_block_comment_acts_as_newline() {
        let got = toks("a /* spans\nlines */ b");
        assert_eq!(
            got,
            vec![
                Tok::Ident("a".into()),
                Tok::Semi,
                Tok::Ident("b".into()),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn string_forms() {
        let got = toks(r#""a\"b" `raw \ text` 'x'"#);
        assert_eq!(
            got,
            vec![
                Tok::Str("a\"b".into()),
                Tok::RawStr(r"raw \ text".into()),
                Tok::Rune("x".into()),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn numbers() {
        let got = toks("42 3.14 0x1f 1e9 2i 1_000");
        assert_eq!(
            got,
            vec![
                Tok::Int("42".into()),
                Tok::Float("3.14".into()),
                Tok::Int("0x1f".into()),
                Tok::Float("1e9".into()),
                Tok::Imag("2i".into()),
                Tok::Int("1_000".into()),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn arrow_ellipsis_union() {
        let got = toks("<-chan int | ~string ...");
        assert_eq!(
            got,
            vec![
                Tok::Arrow,
                Tok::Ident("chan".into()),
                Tok::Ident("int".into()),
                Tok::Pipe,
                Tok::Tilde,
                Tok::Ident("string".into()),
                Tok::Ellipsis,
            ]
        );
    }
}
