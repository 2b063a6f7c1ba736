//! Frontend: convert LLVM textual IR to our IR.

use crate::errors::ParseError;
use crate::ir::*;
use lazy_static::lazy_static;
use log::{debug, trace};
use smallvec::SmallVec;

mod lexer;
use lexer::{bracket_delta, code_end, is_ident_char, lex, Token};

lazy_static! {
    /// First-class types spelled as a single keyword, other than
    /// `void`, `iN` and `ptr`.
    static ref KEYWORD_TYPES: fxhash::FxHashSet<&'static str> = [
        "half", "bfloat", "float", "double", "fp128", "x86_fp80", "ppc_fp128", "x86_mmx",
        "x86_amx", "label", "metadata", "token", "opaque",
    ]
    .iter()
    .copied()
    .collect();
}

pub fn parse_module(text: &str) -> Result<Module, ParseError> {
    let lines = text.lines().collect::<Vec<_>>();
    let mut module = Module::empty();
    module.pointer_style = detect_pointer_style(&lines);
    debug!(
        "parsing {} lines of IR ({:?} pointers)",
        lines.len(),
        module.pointer_style
    );

    let mut i = 0;
    while i < lines.len() {
        let line = i + 1;
        let code = code_of(lines[i], line)?;
        let first = code.split_whitespace().next().unwrap_or("");
        i = match first {
            "define" => parse_definition(&mut module, &lines, i)?,
            "declare" => {
                let (text, next) = collect_statement(&lines, i)?;
                let header = parse_header(&text, line)?;
                add_func(&mut module, FuncDecl::Declaration(header), line)?;
                next
            }
            _ if first.starts_with('@') => {
                let (text, next) = collect_statement(&lines, i)?;
                let name = match lex(code).map_err(|msg| ParseError::new(line, msg))?.first() {
                    Some(Token::Global(name)) => name.clone(),
                    _ => return Err(ParseError::new(line, "expected global variable name")),
                };
                trace!("global {} at line {}", name, line);
                let data = GlobalData::Text {
                    name: name.clone(),
                    text,
                };
                if module.add_global(data).is_none() {
                    return Err(ParseError::new(
                        line,
                        format!("redefinition of global '{}'", name),
                    ));
                }
                next
            }
            _ => {
                let (text, next) = collect_statement(&lines, i)?;
                module.add_verbatim(text);
                next
            }
        };
    }

    Ok(module)
}

/// Opaque pointers if `ptr` appears anywhere, typed pointers if `*`
/// does, opaque otherwise.
pub fn detect_pointer_style<S: AsRef<str>>(lines: &[S]) -> PointerStyle {
    let mut typed = false;
    for line in lines {
        let tokens = match lex(line.as_ref()) {
            Ok(tokens) => tokens,
            Err(_) => continue,
        };
        for tok in &tokens {
            match tok {
                Token::Ident(word) if word == "ptr" => return PointerStyle::Opaque,
                Token::Punct('*') => typed = true,
                _ => {}
            }
        }
    }
    if typed {
        PointerStyle::Typed
    } else {
        PointerStyle::Opaque
    }
}

fn code_of(line: &str, line_no: usize) -> Result<&str, ParseError> {
    let end = code_end(line).map_err(|msg| ParseError::new(line_no, msg))?;
    Ok(line[..end].trim())
}

/// Gather the statement starting at `start`, following continuation
/// lines while brackets are open. Returns the raw text and the index
/// of the following line.
fn collect_statement(lines: &[&str], start: usize) -> Result<(String, usize), ParseError> {
    let mut depth = 0;
    let mut end = start;
    loop {
        depth += bracket_delta(lines[end]).map_err(|msg| ParseError::new(end + 1, msg))?;
        end += 1;
        if depth <= 0 {
            break;
        }
        if end == lines.len() {
            return Err(ParseError::new(start + 1, "unbalanced brackets at end of file"));
        }
    }
    Ok((lines[start..end].join("\n"), end))
}

fn add_func(module: &mut Module, decl: FuncDecl, line: usize) -> Result<Func, ParseError> {
    let name = decl.name().clone();
    trace!("function {} at line {}", name, line);
    module
        .add_func(decl)
        .ok_or_else(|| ParseError::new(line, format!("invalid redefinition of function '{}'", name)))
}

/// Tracks a `define` header across lines to find the brace that opens
/// the body: the first top-level `{` after the argument list. A
/// literal struct return type also starts with `{`, so a brace ending
/// the line is not enough.
#[derive(Default)]
struct HeaderScan {
    depth: i32,
    in_string: bool,
    seen_name: bool,
    args_closed: bool,
}

impl HeaderScan {
    /// Byte offset of the body brace in `code`, if it is on this line.
    fn body_brace(&mut self, code: &str) -> Option<usize> {
        for (i, c) in code.char_indices() {
            if self.in_string {
                self.in_string = c != '"';
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '@' if self.depth == 0 => self.seen_name = true,
                '{' if self.depth == 0 && self.args_closed => return Some(i),
                '(' | '[' | '{' | '<' => self.depth += 1,
                ')' | ']' | '}' | '>' => {
                    self.depth -= 1;
                    if c == ')' && self.depth == 0 && self.seen_name {
                        self.args_closed = true;
                    }
                }
                _ => {}
            }
        }
        None
    }
}

fn parse_definition(module: &mut Module, lines: &[&str], start: usize) -> Result<usize, ParseError> {
    let mut scan = HeaderScan::default();
    let mut header_lines = vec![];
    let mut i = start;
    let rest = loop {
        if i == lines.len() {
            return Err(ParseError::new(
                start + 1,
                "expected '{' to start function body",
            ));
        }
        let code = code_of(lines[i], i + 1)?;
        i += 1;
        if let Some(brace) = scan.body_brace(code) {
            header_lines.push(code[..brace].trim_end());
            break code[brace + 1..].trim();
        }
        header_lines.push(code);
    };
    let header = parse_header(&header_lines.join("\n"), start + 1)?;

    if !rest.is_empty() {
        // `define ... { ret void }` on one line.
        let line = i;
        let inner = rest
            .strip_suffix('}')
            .ok_or_else(|| ParseError::new(line, "expected end of line after '{'"))?
            .trim();
        let mut body = FunctionBody::new();
        if !inner.is_empty() {
            let opcode = parse_opcode(inner, line)?;
            if !opcode.is_terminator() {
                return Err(ParseError::new(
                    line,
                    "a one-line function body must hold a single terminator",
                ));
            }
            body.append_to_block(
                body.entry,
                InstData::Text {
                    opcode,
                    text: inner.to_string(),
                },
            );
        }
        add_func(module, FuncDecl::Definition(header, body), start + 1)?;
        return Ok(i);
    }

    let mut body = FunctionBody::new();
    let mut cur: Option<Block> = None;
    loop {
        if i == lines.len() {
            return Err(ParseError::new(
                start + 1,
                format!("unterminated body of function '{}'", header.name),
            ));
        }
        let line = i + 1;
        let code = code_of(lines[i], line)?;
        if code.is_empty() {
            i += 1;
            continue;
        }
        if code == "}" {
            i += 1;
            break;
        }
        if is_label(code) {
            let label = Some(lines[i].trim_end().to_string());
            cur = Some(match cur {
                None => {
                    body.blocks[body.entry].label = label;
                    body.entry
                }
                Some(_) => body.add_block(label),
            });
            i += 1;
            continue;
        }

        let (text, next) = collect_statement(lines, i)?;
        let opcode = parse_opcode(code, line)?;
        let block = match cur {
            None => body.entry,
            // A terminator ends its block even without a following label.
            Some(block) if ends_with_terminator(&body, block) => body.add_block(None),
            Some(block) => block,
        };
        cur = Some(block);
        // Debug records are indented one level deeper than
        // instructions; keep that.
        let text = if opcode.is_debug_record() {
            text.strip_prefix("  ").unwrap_or(&text).to_string()
        } else {
            text.trim_start().to_string()
        };
        body.append_to_block(block, InstData::Text { opcode, text });
        i = next;
    }

    trace!(
        "function {}: {} blocks, {} insts",
        header.name,
        body.blocks.len(),
        body.insts.len()
    );
    add_func(module, FuncDecl::Definition(header, body), start + 1)?;
    Ok(i)
}

fn ends_with_terminator(body: &FunctionBody, block: Block) -> bool {
    body.blocks[block]
        .insts
        .last()
        .map_or(false, |&inst| body.insts[inst].opcode().is_terminator())
}

/// `name:` or `"quoted name":`, comment already stripped.
fn is_label(code: &str) -> bool {
    let head = match code.strip_suffix(':') {
        Some(head) => head,
        None => return false,
    };
    if head.len() >= 2 && head.starts_with('"') && head.ends_with('"') {
        return !head[1..head.len() - 1].contains('"');
    }
    !head.is_empty() && head.chars().all(is_ident_char)
}

fn parse_opcode(code: &str, line: usize) -> Result<Opcode, ParseError> {
    if code.starts_with("#dbg_") {
        return Ok(Opcode::DebugRecord);
    }
    let tokens = lex(code).map_err(|msg| ParseError::new(line, msg))?;
    let mut rest = &tokens[..];
    if let [Token::Local(_), Token::Punct('='), tail @ ..] = rest {
        rest = tail;
    }
    if let [Token::Ident(prefix), tail @ ..] = rest {
        if prefix == "tail" || prefix == "musttail" || prefix == "notail" {
            rest = tail;
        }
    }
    match rest.first() {
        Some(Token::Ident(mnemonic)) => Ok(Opcode::from_mnemonic(mnemonic)),
        _ => Err(ParseError::new(line, "expected instruction opcode")),
    }
}

/// Parse a `define`/`declare` header (without the body brace).
fn parse_header(text: &str, line: usize) -> Result<FuncHeader, ParseError> {
    let mut tokens = vec![];
    for part in text.lines() {
        tokens.extend(lex(part).map_err(|msg| ParseError::new(line, msg))?);
    }
    let at = tokens
        .iter()
        .position(|tok| matches!(tok, Token::Global(_)))
        .ok_or_else(|| ParseError::new(line, "expected function name"))?;
    let name = match &tokens[at] {
        Token::Global(name) => name.clone(),
        _ => unreachable!(),
    };

    let ret = (1..at)
        .find_map(|pos| match parse_type(&tokens, pos) {
            Some((ty, next)) if next == at => Some(ty),
            _ => None,
        })
        .ok_or_else(|| ParseError::new(line, format!("expected return type of '{}'", name)))?;

    if tokens.get(at + 1) != Some(&Token::Punct('(')) {
        return Err(ParseError::new(line, "expected '(' in function argument list"));
    }
    let close = matching(&tokens, at + 1)
        .ok_or_else(|| ParseError::new(line, "expected ')' at end of argument list"))?;

    let mut params = SmallVec::new();
    let mut varargs = false;
    for group in split_top_level(&tokens[at + 2..close]) {
        match group {
            [] => {}
            [Token::Ellipsis] => varargs = true,
            _ => match parse_type(group, 0) {
                Some((ty, _)) => params.push(ty),
                None => {
                    return Err(ParseError::new(
                        line,
                        format!("expected parameter type, found '{}'", group[0]),
                    ))
                }
            },
        }
    }

    Ok(FuncHeader {
        name,
        sig: SignatureData {
            ret,
            params,
            varargs,
        },
        text: text.to_string(),
    })
}

/// Index of the bracket closing the one at `open`.
fn matching(tokens: &[Token], open: usize) -> Option<usize> {
    let mut stack = vec![];
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        match tok {
            Token::Punct(c @ ('(' | '[' | '{' | '<')) => stack.push(*c),
            Token::Punct(c @ (')' | ']' | '}' | '>')) => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    '}' => '{',
                    _ => '<',
                };
                if stack.pop() != Some(expected) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        if stack.is_empty() {
            return None;
        }
    }
    None
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut groups = vec![];
    let mut depth = 0;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::Punct('(' | '[' | '{' | '<') => depth += 1,
            Token::Punct(')' | ']' | '}' | '>') => depth -= 1,
            Token::Punct(',') if depth == 0 => {
                groups.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&tokens[start..]);
    groups
}

fn spell(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        let tight = match (i.checked_sub(1).map(|p| &tokens[p]), tok) {
            (None, _) => true,
            (_, Token::Punct(')' | ']' | '>' | ',' | '*')) => true,
            (Some(Token::Punct('(' | '[' | '<')), _) => true,
            _ => false,
        };
        if !tight {
            out.push(' ');
        }
        out.push_str(&tok.to_string());
    }
    out
}

fn parse_int_type(word: &str) -> Option<u32> {
    word.strip_prefix('i')?.parse().ok()
}

/// `addrspace(N)` at `pos`, if present.
fn parse_addrspace(tokens: &[Token], pos: usize) -> Option<(u32, usize)> {
    match tokens.get(pos..pos + 4)? {
        [Token::Ident(kw), Token::Punct('('), Token::Int(n), Token::Punct(')')]
            if kw == "addrspace" =>
        {
            Some((n.parse().ok()?, pos + 4))
        }
        _ => None,
    }
}

/// Parse a type starting at `pos`, returning it and the position after
/// it.
fn parse_type(tokens: &[Token], pos: usize) -> Option<(Type, usize)> {
    let (mut ty, mut pos) = match tokens.get(pos)? {
        Token::Ident(word) if word == "void" => (Type::Void, pos + 1),
        Token::Ident(word) if word == "ptr" => match parse_addrspace(tokens, pos + 1) {
            Some((addrspace, next)) => (Type::Ptr { addrspace }, next),
            None => (Type::Ptr { addrspace: 0 }, pos + 1),
        },
        Token::Ident(word) if parse_int_type(word).is_some() => {
            (Type::Int(parse_int_type(word)?), pos + 1)
        }
        Token::Ident(word) if KEYWORD_TYPES.contains(word.as_str()) => {
            (Type::Other(word.clone()), pos + 1)
        }
        Token::Local(name) => (Type::Named(name.clone()), pos + 1),
        Token::Punct('{' | '[' | '<') => {
            let end = matching(tokens, pos)?;
            (Type::Other(spell(&tokens[pos..=end])), end + 1)
        }
        _ => return None,
    };

    loop {
        match tokens.get(pos) {
            Some(Token::Punct('*')) => {
                ty = Type::TypedPtr {
                    pointee: Box::new(ty),
                    addrspace: 0,
                };
                pos += 1;
            }
            Some(Token::Ident(kw)) if kw == "addrspace" => match parse_addrspace(tokens, pos) {
                Some((addrspace, next)) if tokens.get(next) == Some(&Token::Punct('*')) => {
                    ty = Type::TypedPtr {
                        pointee: Box::new(ty),
                        addrspace,
                    };
                    pos = next + 1;
                }
                _ => break,
            },
            // Function type: `ret (params)`.
            Some(Token::Punct('(')) => {
                let end = matching(tokens, pos)?;
                ty = Type::Other(format!("{} {}", ty, spell(&tokens[pos..=end])));
                pos = end + 1;
            }
            _ => break,
        }
    }
    Some((ty, pos))
}
