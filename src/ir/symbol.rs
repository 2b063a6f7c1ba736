//! Module-level symbol names.

use super::{EscapedBytes, Func, Global};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The name of an `@`-prefixed module-level symbol.
///
/// LLVM gives unnamed symbols sequential numbers (`@0`, `@1`, ...);
/// for those the source-level name is the empty string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Name {
    Named(String),
    Numbered(u32),
}

impl Name {
    pub fn named<S: Into<String>>(name: S) -> Name {
        Name::Named(name.into())
    }

    /// The symbol's name as the program sees it. Empty for numbered
    /// symbols.
    pub fn as_str(&self) -> &str {
        match self {
            Name::Named(name) => name,
            Name::Numbered(_) => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

fn is_bare_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '_')
}

/// Whether `name` can be written after a sigil without quotes.
pub fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(is_bare_ident_char)
}

/// Write `name` after a sigil, quoting and escaping it if required.
pub fn write_ident(f: &mut Formatter, sigil: char, name: &str) -> FmtResult {
    if !needs_quotes(name) {
        return write!(f, "{}{}", sigil, name);
    }
    write!(f, "{}\"{}\"", sigil, EscapedBytes(name.as_bytes()))
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Name::Numbered(n) => write!(f, "@{}", n),
            Name::Named(name) => write_ident(f, '@', name),
        }
    }
}

/// What a module-level name refers to. Functions and global variables
/// share one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Func(Func),
    Global(Global),
}
