use super::{
    Func, FuncDecl, FuncHeader, Global, ModuleDisplay, Name, PointerStyle, SignatureData, Symbol,
};
use crate::entity::EntityVec;
use crate::errors::{DeclarationConflict, ParseError};
use crate::frontend;
use fxhash::FxHashMap;

/// An LLVM module, represented as a collection of IR entities plus
/// the layout of its top-level text.
///
/// The ordinary flow for a tool that rewrites a module is:
///
/// - Parse textual IR with `Module::from_text()`.
/// - Look up or declare functions and add globals through the module
///   (`get_or_insert_function()`, `add_cstring()`), which keeps the
///   symbol table consistent.
/// - Edit function bodies in place (`FuncDecl::body_mut()`).
/// - Print the result with `Module::display()`.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Functions, both declared and defined, in module order.
    pub funcs: EntityVec<Func, FuncDecl>,
    /// Global variables, aliases and string constants.
    pub globals: EntityVec<Global, GlobalData>,
    /// Top-level layout, in print order.
    pub items: Vec<Item>,
    /// How pointer types are spelled in newly created IR.
    pub pointer_style: PointerStyle,
    /// All `@` names defined in this module.
    symbols: FxHashMap<Name, Symbol>,
}

/// One top-level statement of the module text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// Anything not modelled (source_filename, type definitions,
    /// attribute groups, metadata, comments, blank lines), as written.
    Verbatim(String),
    Global(Global),
    Func(Func),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalData {
    /// A global variable, alias or ifunc as written.
    Text { name: Name, text: String },
    /// A private NUL-terminated string constant.
    CString { name: Name, bytes: Vec<u8> },
}

impl GlobalData {
    pub fn name(&self) -> &Name {
        match self {
            GlobalData::Text { name, .. } => name,
            GlobalData::CString { name, .. } => name,
        }
    }
}

/// Base name for string constants created by `add_cstring`.
pub const CSTRING_BASE_NAME: &str = ".str.entry";

impl Module {
    pub fn empty() -> Module {
        Module::default()
    }

    /// Parse LLVM textual IR.
    pub fn from_text(text: &str) -> Result<Module, ParseError> {
        frontend::parse_module(text)
    }

    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }

    pub fn to_text(&self) -> String {
        format!("{}", self.display())
    }

    pub fn lookup(&self, name: &Name) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    pub fn func_by_name(&self, name: &str) -> Option<Func> {
        match self.lookup(&Name::named(name)) {
            Some(Symbol::Func(func)) => Some(func),
            _ => None,
        }
    }

    pub fn func(&self, func: Func) -> &FuncDecl {
        &self.funcs[func]
    }

    pub fn func_mut(&mut self, func: Func) -> &mut FuncDecl {
        &mut self.funcs[func]
    }

    pub fn global(&self, global: Global) -> &GlobalData {
        &self.globals[global]
    }

    /// Append a function at the end of the module. Returns `None` if
    /// its name is already taken.
    pub fn add_func(&mut self, decl: FuncDecl) -> Option<Func> {
        let func = self.register_func(decl)?;
        self.items.push(Item::Func(func));
        Some(func)
    }

    /// Append a global at the end of the module. Returns `None` if its
    /// name is already taken.
    pub fn add_global(&mut self, data: GlobalData) -> Option<Global> {
        let global = self.register_global(data)?;
        self.items.push(Item::Global(global));
        Some(global)
    }

    pub fn add_verbatim<S: Into<String>>(&mut self, text: S) {
        self.items.push(Item::Verbatim(text.into()));
    }

    fn register_func(&mut self, decl: FuncDecl) -> Option<Func> {
        if self.symbols.contains_key(decl.name()) {
            return None;
        }
        let name = decl.name().clone();
        let func = self.funcs.push(decl);
        log::trace!("register_func: {} -> {}", name, func);
        self.symbols.insert(name, Symbol::Func(func));
        Some(func)
    }

    fn register_global(&mut self, data: GlobalData) -> Option<Global> {
        if self.symbols.contains_key(data.name()) {
            return None;
        }
        let name = data.name().clone();
        let global = self.globals.push(data);
        log::trace!("register_global: {} -> {}", name, global);
        self.symbols.insert(name, Symbol::Global(global));
        Some(global)
    }

    /// `base` if no symbol of that name exists, else the first free
    /// `base.N` for N = 1, 2, ...
    pub fn unique_name(&self, base: &str) -> Name {
        let name = Name::named(base);
        if !self.symbols.contains_key(&name) {
            return name;
        }
        (1..)
            .map(|n| Name::named(format!("{}.{}", base, n)))
            .find(|name| !self.symbols.contains_key(name))
            .unwrap()
    }

    /// Look up the function `name`, declaring it with `sig` if the
    /// module has no symbol of that name. Repeated calls with the same
    /// name and signature return the same function.
    pub fn get_or_insert_function(
        &mut self,
        name: &str,
        sig: SignatureData,
    ) -> Result<Func, DeclarationConflict> {
        let conflict = |reason: String| DeclarationConflict {
            name: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(conflict("symbol name is empty".to_string()));
        }
        let key = Name::named(name);
        match self.lookup(&key) {
            Some(Symbol::Func(func)) => {
                let existing = self.funcs[func].sig();
                if *existing == sig {
                    Ok(func)
                } else {
                    Err(conflict(format!(
                        "existing function has type `{}`, expected `{}`",
                        existing, sig
                    )))
                }
            }
            Some(Symbol::Global(_)) => Err(conflict(
                "name is already used by a global variable".to_string(),
            )),
            None => {
                let text = declaration_text(&key, &sig);
                let header = FuncHeader {
                    name: key,
                    sig,
                    text,
                };
                log::debug!("declaring function: {}", header.text);
                // Cannot fail: the name was just checked.
                let func = self
                    .register_func(FuncDecl::Declaration(header))
                    .ok_or_else(|| conflict("name is already defined".to_string()))?;
                let pos = match self.items.iter().rposition(|item| matches!(item, Item::Func(_)))
                {
                    Some(last) => last + 1,
                    None => self.items.len(),
                };
                let mut new_items = vec![];
                if pos > 0 && self.items[pos - 1] != Item::Verbatim(String::new()) {
                    new_items.push(Item::Verbatim(String::new()));
                }
                new_items.push(Item::Func(func));
                self.items.splice(pos..pos, new_items);
                Ok(func)
            }
        }
    }

    /// Add a private NUL-terminated string constant holding `bytes`,
    /// named after `CSTRING_BASE_NAME`. A new constant is created on
    /// every call.
    pub fn add_cstring(&mut self, bytes: &[u8]) -> Global {
        let name = self.unique_name(CSTRING_BASE_NAME);
        // `unique_name` only returns free names.
        let global = self
            .register_global(GlobalData::CString {
                name,
                bytes: bytes.to_vec(),
            })
            .unwrap();

        // Globals print after existing globals, or ahead of the first
        // function.
        if let Some(last) = self
            .items
            .iter()
            .rposition(|item| matches!(item, Item::Global(_)))
        {
            self.items.insert(last + 1, Item::Global(global));
        } else if let Some(first) = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Func(_)))
        {
            self.items.splice(
                first..first,
                vec![Item::Global(global), Item::Verbatim(String::new())],
            );
        } else {
            self.items.push(Item::Global(global));
        }
        global
    }
}

fn declaration_text(name: &Name, sig: &SignatureData) -> String {
    let mut params = sig
        .params
        .iter()
        .map(|ty| format!("{}", ty))
        .collect::<Vec<_>>();
    if sig.varargs {
        params.push("...".to_string());
    }
    format!("declare {} {}({})", sig.ret, name, params.join(", "))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Type;

    fn log_sig() -> SignatureData {
        SignatureData::new(Type::Void, vec![Type::Ptr { addrspace: 0 }])
    }

    #[test]
    fn get_or_insert_is_idempotent() {
        let mut module = Module::empty();
        let a = module.get_or_insert_function("log", log_sig()).unwrap();
        let b = module.get_or_insert_function("log", log_sig()).unwrap();
        assert_eq!(a, b);
        assert_eq!(module.funcs.len(), 1);
        assert_eq!(module.funcs[a].header().text, "declare void @log(ptr)");
    }

    #[test]
    fn get_or_insert_rejects_mismatch() {
        let mut module = Module::empty();
        module.get_or_insert_function("log", log_sig()).unwrap();
        let err = module
            .get_or_insert_function("log", SignatureData::new(Type::Int(32), vec![]))
            .unwrap_err();
        assert_eq!(err.name, "log");
        assert_eq!(module.funcs.len(), 1);
    }

    #[test]
    fn get_or_insert_rejects_global() {
        let mut module = Module::empty();
        module.add_global(GlobalData::Text {
            name: Name::named("log"),
            text: "@log = global i32 0".to_string(),
        });
        assert!(module.get_or_insert_function("log", log_sig()).is_err());
        assert!(module.funcs.is_empty());
    }

    #[test]
    fn cstring_names_are_unique() {
        let mut module = Module::empty();
        let a = module.add_cstring(b"a");
        let b = module.add_cstring(b"b");
        assert_eq!(module.global(a).name(), &Name::named(".str.entry"));
        assert_eq!(module.global(b).name(), &Name::named(".str.entry.1"));
    }
}
