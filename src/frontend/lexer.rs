//! Tokenizer for single lines of LLVM textual IR.

use crate::ir::Name;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `@name`, `@"quoted"`, `@0`.
    Global(Name),
    /// `%name`, `%"quoted"`, `%0`; numbered locals keep their digits.
    Local(String),
    /// Keywords, primitive types, bare words.
    Ident(String),
    /// Integer literal, possibly negative.
    Int(String),
    /// String literal contents, escapes undecoded.
    Str(String),
    /// `#0`.
    AttrGroup(String),
    /// `!name`, `!0`, or a bare `!` before `{`.
    Meta(String),
    Ellipsis,
    Punct(char),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Token::Global(name) => write!(f, "{}", name),
            Token::Local(name) => crate::ir::write_ident(f, '%', name),
            Token::Ident(s) | Token::Int(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::AttrGroup(s) => write!(f, "#{}", s),
            Token::Meta(s) => write!(f, "!{}", s),
            Token::Ellipsis => write!(f, "..."),
            Token::Punct(c) => write!(f, "{}", c),
        }
    }
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '_')
}

/// Find where the code part of a line ends (the start of a `;`
/// comment outside any string literal, or the line length).
pub fn code_end(line: &str) -> Result<usize, String> {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ';' if !in_string => return Ok(i),
            _ => {}
        }
    }
    if in_string {
        Err("unterminated string constant".to_string())
    } else {
        Ok(line.len())
    }
}

/// Net bracket nesting (`(`, `[`, `{` minus their closers) of the code
/// part of a line.
pub fn bracket_delta(line: &str) -> Result<i32, String> {
    let code = &line[..code_end(line)?];
    let mut in_string = false;
    let mut depth = 0;
    for c in code.chars() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' | '{' if !in_string => depth += 1,
            ')' | ']' | '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    Ok(depth)
}

/// Decode the `\XX` and `\\` escapes of a quoted name. Names must
/// decode to UTF-8.
fn unescape(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if bytes.get(i + 1) == Some(&b'\\') {
                out.push(b'\\');
                i += 2;
                continue;
            }
            let hex = raw
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).map_err(|_| format!("name \"{}\" is not valid UTF-8", raw))
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, f: F) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn string(&mut self) -> Result<&'a str, String> {
        // Opening quote already consumed.
        let start = self.pos;
        match self.src[start..].find('"') {
            Some(len) => {
                self.pos = start + len + 1;
                Ok(&self.src[start..start + len])
            }
            None => Err("unterminated string constant".to_string()),
        }
    }

    /// The name after a `@` or `%` sigil, decoded.
    fn sigil_name(&mut self) -> Result<String, String> {
        if self.peek() == Some('"') {
            self.bump();
            unescape(self.string()?)
        } else {
            Ok(self.take_while(is_ident_char).to_string())
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, String> {
        self.take_while(char::is_whitespace);
        let c = match self.peek() {
            None => return Ok(None),
            Some(';') => {
                self.pos = self.src.len();
                return Ok(None);
            }
            Some(c) => c,
        };
        let tok = match c {
            '@' => {
                self.bump();
                let name = self.sigil_name()?;
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
                    match name.parse() {
                        Ok(n) => Token::Global(Name::Numbered(n)),
                        Err(_) => Token::Global(Name::Named(name)),
                    }
                } else {
                    Token::Global(Name::Named(name))
                }
            }
            '%' => {
                self.bump();
                Token::Local(self.sigil_name()?)
            }
            '#' => {
                self.bump();
                Token::AttrGroup(self.take_while(is_ident_char).to_string())
            }
            '!' => {
                self.bump();
                Token::Meta(self.take_while(is_ident_char).to_string())
            }
            '"' => {
                self.bump();
                Token::Str(self.string()?.to_string())
            }
            '.' if self.src[self.pos..].starts_with("...") => {
                self.pos += 3;
                Token::Ellipsis
            }
            '-' if self.src[self.pos + 1..].starts_with(|c: char| c.is_ascii_digit()) => {
                self.bump();
                let digits = self.take_while(|c| c.is_ascii_digit());
                Token::Int(format!("-{}", digits))
            }
            c if c.is_ascii_digit() => {
                let word = self.take_while(is_ident_char);
                if word.chars().all(|c| c.is_ascii_digit()) {
                    Token::Int(word.to_string())
                } else {
                    Token::Ident(word.to_string())
                }
            }
            c if is_ident_char(c) => Token::Ident(self.take_while(is_ident_char).to_string()),
            c => {
                self.bump();
                Token::Punct(c)
            }
        };
        Ok(Some(tok))
    }
}

/// Tokenize the code part of `src`, stopping at a comment.
pub fn lex(src: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = vec![];
    while let Some(tok) = lexer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }

    #[test]
    fn header_tokens() {
        let toks = lex("define dso_local i32 @main(i32 noundef %0, ptr %argv) #0 { ; hi").unwrap();
        assert_eq!(
            toks,
            vec![
                ident("define"),
                ident("dso_local"),
                ident("i32"),
                Token::Global(Name::named("main")),
                Token::Punct('('),
                ident("i32"),
                ident("noundef"),
                Token::Local("0".to_string()),
                Token::Punct(','),
                ident("ptr"),
                Token::Local("argv".to_string()),
                Token::Punct(')'),
                Token::AttrGroup("0".to_string()),
                Token::Punct('{'),
            ]
        );
    }

    #[test]
    fn quoted_and_numbered_names() {
        let toks = lex(r#"@"a\22b" @12 @"\01foo" ..."#).unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Global(Name::named("a\"b")),
                Token::Global(Name::Numbered(12)),
                Token::Global(Name::named("\u{1}foo")),
                Token::Ellipsis,
            ]
        );
    }

    #[test]
    fn comments_and_strings() {
        assert_eq!(code_end("  ret void ; done").unwrap(), 11);
        assert_eq!(code_end(r#"c"a;b" ; x"#).unwrap(), 7);
        assert!(code_end(r#"c"abc"#).is_err());
        assert_eq!(bracket_delta("switch i32 %0, label %3 [").unwrap(), 1);
        assert_eq!(bracket_delta(r#"@s = constant [2 x i8] c"[\00" ; ["#).unwrap(), 0);
    }

    #[test]
    fn negative_ints() {
        assert_eq!(
            lex("i32 -1").unwrap(),
            vec![ident("i32"), Token::Int("-1".to_string())]
        );
    }

    #[test]
    fn non_utf8_names_are_rejected() {
        let err = lex(r#"define void @"\FF"()"#).unwrap_err();
        assert!(err.contains("not valid UTF-8"), "{}", err);
        assert_eq!(
            lex(r#"@"\C3\A9""#).unwrap(),
            vec![Token::Global(Name::named("é"))]
        );
    }
}
