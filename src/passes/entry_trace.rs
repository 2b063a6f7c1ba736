//! Function-entry tracing pass.
//!
//! Every eligible function gets a call to a logging primitive,
//! `void log_function_entry(const char *name)`, as the first ordinary
//! instruction of its entry block. The primitive is only declared;
//! its definition is linked in later from a separate object.

use crate::errors::DeclarationConflict;
use crate::ir::*;

/// Symbol of the logging primitive.
pub const LOG_FUNCTION_ENTRY: &str = "log_function_entry";

#[derive(Clone, Debug)]
pub struct EntryTraceOptions {
    /// Symbol to call on function entry.
    pub callee: String,
    /// Functions never to instrument, by name.
    pub exclude: Vec<String>,
    /// Which leading entry-block instructions the call goes after.
    pub prefix: PrefixPolicy,
}

impl Default for EntryTraceOptions {
    fn default() -> Self {
        EntryTraceOptions {
            callee: LOG_FUNCTION_ENTRY.to_string(),
            exclude: vec![],
            prefix: PrefixPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eligibility {
    Eligible,
    /// No body.
    Declaration,
    /// Numbered symbol, so there is no name to log.
    Unnamed,
    /// The logging primitive itself.
    CallTarget,
    /// Named in `EntryTraceOptions::exclude`.
    Excluded,
}

pub fn classify(decl: &FuncDecl, opts: &EntryTraceOptions) -> Eligibility {
    let name = decl.name().as_str();
    if decl.is_declaration() {
        Eligibility::Declaration
    } else if name.is_empty() {
        Eligibility::Unnamed
    } else if name == opts.callee {
        Eligibility::CallTarget
    } else if opts.exclude.iter().any(|excluded| excluded == name) {
        Eligibility::Excluded
    } else {
        Eligibility::Eligible
    }
}

/// Where the entry call goes: the entry block, after its
/// order-constrained prefix.
pub fn entry_insertion_point(body: &FunctionBody, policy: PrefixPolicy) -> (Block, usize) {
    (body.entry, body.first_insertion_point(body.entry, policy))
}

/// `void (i8*)` spelled for the module's pointer style.
pub fn callee_signature(style: PointerStyle) -> SignatureData {
    SignatureData::new(Type::Void, vec![Type::byte_ptr(style)])
}

/// Insert the entry call into one function. Nothing is added to the
/// module unless the callee can be resolved.
pub fn instrument_func(
    module: &mut Module,
    func: Func,
    opts: &EntryTraceOptions,
) -> Result<Inst, DeclarationConflict> {
    let decl = module.func(func);
    let name = decl.name().as_str().to_string();
    let no_body = || DeclarationConflict {
        name: name.clone(),
        reason: "function has no body".to_string(),
    };
    let (block, pos) = match decl.body() {
        Some(body) => entry_insertion_point(body, opts.prefix),
        None => return Err(no_body()),
    };

    // The only fallible step; it must come before anything is added.
    let sig = callee_signature(module.pointer_style);
    let callee = module.get_or_insert_function(&opts.callee, sig)?;

    let global = module.add_cstring(name.as_bytes());
    let call = InstData::Call {
        callee,
        args: vec![Operand::CStringPtr(global)],
    };
    let body = module.func_mut(func).body_mut().ok_or_else(no_body)?;
    Ok(body.insert_inst(block, pos, call))
}

/// What a run of the pass did.
#[derive(Clone, Debug, Default)]
pub struct EntryTraceReport {
    pub instrumented: Vec<Func>,
    pub skipped: Vec<(Func, Eligibility)>,
    pub conflicts: Vec<(Func, DeclarationConflict)>,
}

impl EntryTraceReport {
    /// Whether at least one call was inserted.
    pub fn modified(&self) -> bool {
        !self.instrumented.is_empty()
    }
}

/// Instrument every eligible function, in module order.
pub fn run(module: &mut Module, opts: &EntryTraceOptions) -> EntryTraceReport {
    let mut report = EntryTraceReport::default();
    let funcs = module.funcs.iter().collect::<Vec<_>>();
    for func in funcs {
        let eligibility = classify(&module.funcs[func], opts);
        if eligibility != Eligibility::Eligible {
            log::debug!(
                "entry_trace: skipping {} ({}): {:?}",
                func,
                module.funcs[func].name(),
                eligibility
            );
            report.skipped.push((func, eligibility));
            continue;
        }
        match instrument_func(module, func, opts) {
            Ok(inst) => {
                log::info!(
                    "Instrumented function: {}",
                    module.funcs[func].name().as_str()
                );
                if let Some(body) = module.funcs[func].body() {
                    log::trace!(
                        "entry_trace: {} gets {}",
                        func,
                        module.display_inst(&body.insts[inst])
                    );
                }
                report.instrumented.push(func);
            }
            Err(conflict) => {
                log::warn!(
                    "Could not instrument {}: {}",
                    module.funcs[func].name().as_str(),
                    conflict
                );
                report.conflicts.push((func, conflict));
            }
        }
    }
    report
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entity::EntityRef;

    fn module(text: &str) -> Module {
        Module::from_text(text).unwrap()
    }

    #[test]
    fn classification() {
        let m = module(
            "declare void @ext()\n\
             define void @0() {\n  ret void\n}\n\
             define void @log_function_entry(ptr %s) {\n  ret void\n}\n\
             define void @skip() {\n  ret void\n}\n\
             define void @f() {\n  ret void\n}\n",
        );
        let opts = EntryTraceOptions {
            exclude: vec!["skip".to_string()],
            ..EntryTraceOptions::default()
        };
        let results = m
            .funcs
            .values()
            .map(|decl| classify(decl, &opts))
            .collect::<Vec<_>>();
        assert_eq!(
            results,
            vec![
                Eligibility::Declaration,
                Eligibility::Unnamed,
                Eligibility::CallTarget,
                Eligibility::Excluded,
                Eligibility::Eligible,
            ]
        );
        // Pure: same answers when asked again, in reverse order.
        for (func, decl) in m.funcs.entries().collect::<Vec<_>>().into_iter().rev() {
            assert_eq!(classify(decl, &opts), results[func.index()]);
        }
    }

    #[test]
    fn custom_callee_is_not_instrumented() {
        let mut m = module("define void @trace(ptr %s) {\n  ret void\n}\n");
        let opts = EntryTraceOptions {
            callee: "trace".to_string(),
            ..EntryTraceOptions::default()
        };
        let report = run(&mut m, &opts);
        assert!(!report.modified());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].1, Eligibility::CallTarget);
    }

    #[test]
    fn conflict_leaves_module_untouched() {
        let text = "define void @f() {\n  ret void\n}\n\ndeclare i32 @log_function_entry(i32)\n";
        let mut m = module(text);
        let report = run(&mut m, &EntryTraceOptions::default());
        assert!(!report.modified());
        assert_eq!(report.conflicts.len(), 1);
        assert!(m.globals.is_empty());
        assert_eq!(m.to_text(), text);
    }

    #[test]
    fn one_declaration_shared() {
        let mut m = module(
            "define void @a() {\n  ret void\n}\n\ndefine void @b() {\n  ret void\n}\n",
        );
        let report = run(&mut m, &EntryTraceOptions::default());
        assert_eq!(report.instrumented.len(), 2);
        assert_eq!(m.funcs.len(), 3);
        assert_eq!(m.globals.len(), 2);
        assert!(m.funcs[m.func_by_name(LOG_FUNCTION_ENTRY).unwrap()].is_declaration());
    }

    #[test]
    fn after_allocas_by_default() {
        let mut m = module(
            "define i32 @f() {\n  %1 = alloca i32, align 4\n  store i32 0, ptr %1, align 4\n  ret i32 0\n}\n",
        );
        run(&mut m, &EntryTraceOptions::default());
        let body = m.funcs[m.func_by_name("f").unwrap()].body().unwrap();
        let opcodes = body.block_insts(body.entry).map(|i| i.opcode()).collect::<Vec<_>>();
        assert_eq!(
            opcodes,
            vec![Opcode::Alloca, Opcode::Call, Opcode::Other, Opcode::Ret]
        );
    }

    #[test]
    fn before_allocas_on_request() {
        let mut m = module(
            "define i32 @f() {\n  %1 = alloca i32, align 4\n  ret i32 0\n}\n",
        );
        let opts = EntryTraceOptions {
            prefix: PrefixPolicy { allocas: false },
            ..EntryTraceOptions::default()
        };
        run(&mut m, &opts);
        let body = m.funcs[m.func_by_name("f").unwrap()].body().unwrap();
        assert_eq!(
            body.block_insts(body.entry).next().unwrap().opcode(),
            Opcode::Call
        );
    }
}
