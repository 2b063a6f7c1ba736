//! Printing IR back to LLVM textual form.

use super::{FuncDecl, FunctionBody, GlobalData, InstData, Item, Module, Operand, PointerStyle};

use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct ModuleDisplay<'a>(pub(crate) &'a Module);

impl Module {
    /// Display one instruction as it would be printed, without
    /// indentation.
    pub fn display_inst<'a>(&'a self, inst: &'a InstData) -> InstDisplay<'a> {
        InstDisplay(inst, self)
    }
}

impl<'a> Display for ModuleDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let module = self.0;
        for item in &module.items {
            match item {
                Item::Verbatim(text) => writeln!(f, "{}", text)?,
                Item::Global(global) => match &module.globals[*global] {
                    GlobalData::Text { text, .. } => writeln!(f, "{}", text)?,
                    GlobalData::CString { name, bytes } => writeln!(
                        f,
                        "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\", align 1",
                        name,
                        bytes.len() + 1,
                        EscapedBytes(bytes)
                    )?,
                },
                Item::Func(func) => match &module.funcs[*func] {
                    FuncDecl::Declaration(header) => writeln!(f, "{}", header.text)?,
                    FuncDecl::Definition(header, body) => {
                        writeln!(f, "{} {{", header.text)?;
                        write!(f, "{}", FunctionBodyDisplay(body, module))?;
                        writeln!(f, "}}")?;
                    }
                },
            }
        }
        Ok(())
    }
}

/// The blocks of a function body, without the enclosing braces.
pub struct FunctionBodyDisplay<'a>(pub(crate) &'a FunctionBody, pub(crate) &'a Module);

impl<'a> Display for FunctionBodyDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let body = self.0;
        for (block, def) in body.blocks.entries() {
            if block != body.entry {
                writeln!(f)?;
            }
            if let Some(label) = &def.label {
                writeln!(f, "{}", label)?;
            }
            for &inst in &def.insts {
                writeln!(f, "  {}", InstDisplay(&body.insts[inst], self.1))?;
            }
        }
        Ok(())
    }
}

pub struct InstDisplay<'a>(pub(crate) &'a InstData, pub(crate) &'a Module);

impl<'a> Display for InstDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let module = self.1;
        match self.0 {
            InstData::Text { text, .. } => write!(f, "{}", text),
            InstData::Call { callee, args } => {
                let header = module.funcs[*callee].header();
                let args = args
                    .iter()
                    .map(|arg| format!("{}", OperandDisplay(*arg, module)))
                    .collect::<Vec<_>>();
                if header.sig.varargs {
                    write!(f, "call {} ", header.sig)?;
                } else {
                    write!(f, "call {} ", header.sig.ret)?;
                }
                write!(f, "{}({})", header.name, args.join(", "))
            }
        }
    }
}

pub struct OperandDisplay<'a>(pub(crate) Operand, pub(crate) &'a Module);

impl<'a> Display for OperandDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let module = self.1;
        match self.0 {
            Operand::CStringPtr(global) => match (module.pointer_style, &module.globals[global]) {
                (PointerStyle::Opaque, data) => write!(f, "ptr {}", data.name()),
                (PointerStyle::Typed, GlobalData::CString { name, bytes }) => {
                    let len = bytes.len() + 1;
                    write!(
                        f,
                        "i8* getelementptr inbounds ([{} x i8], [{} x i8]* {}, i32 0, i32 0)",
                        len, len, name
                    )
                }
                (PointerStyle::Typed, data) => write!(f, "i8* {}", data.name()),
            },
        }
    }
}

/// Bytes in the escaped form of a `c"..."` literal.
pub struct EscapedBytes<'a>(pub &'a [u8]);

impl<'a> Display for EscapedBytes<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        for &b in self.0 {
            if b == b'"' || b == b'\\' || !(0x20..0x7f).contains(&b) {
                write!(f, "\\{:02X}", b)?;
            } else {
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!(EscapedBytes(b"main").to_string(), "main");
        assert_eq!(EscapedBytes(b"a\"b\\c\n").to_string(), "a\\22b\\5Cc\\0A");
        assert_eq!(EscapedBytes("é".as_bytes()).to_string(), "\\C3\\A9");
    }
}
