//! Instructions.

use super::{Func, Global};
use fxhash::FxHashMap;
use lazy_static::lazy_static;

/// The opcode classes that matter for placing new instructions. Every
/// other mnemonic is `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Phi,
    Alloca,
    LandingPad,
    CatchPad,
    CleanupPad,
    CatchSwitch,
    Call,
    Ret,
    Br,
    Switch,
    IndirectBr,
    Invoke,
    CallBr,
    Resume,
    CatchRet,
    CleanupRet,
    Unreachable,
    /// A `#dbg_*` record line. Not an instruction; it belongs to the
    /// instruction that follows it.
    DebugRecord,
    Other,
}

lazy_static! {
    static ref MNEMONICS: FxHashMap<&'static str, Opcode> = {
        let mut m = FxHashMap::default();
        m.insert("phi", Opcode::Phi);
        m.insert("alloca", Opcode::Alloca);
        m.insert("landingpad", Opcode::LandingPad);
        m.insert("catchpad", Opcode::CatchPad);
        m.insert("cleanuppad", Opcode::CleanupPad);
        m.insert("catchswitch", Opcode::CatchSwitch);
        m.insert("call", Opcode::Call);
        m.insert("ret", Opcode::Ret);
        m.insert("br", Opcode::Br);
        m.insert("switch", Opcode::Switch);
        m.insert("indirectbr", Opcode::IndirectBr);
        m.insert("invoke", Opcode::Invoke);
        m.insert("callbr", Opcode::CallBr);
        m.insert("resume", Opcode::Resume);
        m.insert("catchret", Opcode::CatchRet);
        m.insert("cleanupret", Opcode::CleanupRet);
        m.insert("unreachable", Opcode::Unreachable);
        m
    };
}

impl Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Opcode {
        MNEMONICS.get(mnemonic).copied().unwrap_or(Opcode::Other)
    }

    pub fn is_debug_record(self) -> bool {
        self == Opcode::DebugRecord
    }

    pub fn is_phi(self) -> bool {
        self == Opcode::Phi
    }

    pub fn is_alloca(self) -> bool {
        self == Opcode::Alloca
    }

    pub fn is_eh_pad(self) -> bool {
        matches!(
            self,
            Opcode::LandingPad | Opcode::CatchPad | Opcode::CleanupPad | Opcode::CatchSwitch
        )
    }

    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Ret
                | Opcode::Br
                | Opcode::Switch
                | Opcode::IndirectBr
                | Opcode::Invoke
                | Opcode::CallBr
                | Opcode::Resume
                | Opcode::CatchSwitch
                | Opcode::CatchRet
                | Opcode::CleanupRet
                | Opcode::Unreachable
        )
    }
}

/// An operand of an instruction built by a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Pointer to the first byte of a C-string global.
    CStringPtr(Global),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstData {
    /// An instruction as written in the input. `text` has no leading
    /// indentation; continuation lines of multi-line instructions
    /// (`switch`) are kept as-is.
    Text { opcode: Opcode, text: String },
    /// A call with no result, e.g. `call void @f(ptr @s)`.
    Call { callee: Func, args: Vec<Operand> },
}

impl InstData {
    pub fn opcode(&self) -> Opcode {
        match self {
            InstData::Text { opcode, .. } => *opcode,
            InstData::Call { .. } => Opcode::Call,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_mnemonics() {
        assert_eq!(Opcode::from_mnemonic("phi"), Opcode::Phi);
        assert_eq!(Opcode::from_mnemonic("store"), Opcode::Other);
        assert!(Opcode::from_mnemonic("landingpad").is_eh_pad());
        assert!(Opcode::from_mnemonic("catchswitch").is_eh_pad());
        assert!(Opcode::from_mnemonic("catchswitch").is_terminator());
        assert!(Opcode::from_mnemonic("switch").is_terminator());
        assert!(!Opcode::from_mnemonic("call").is_terminator());
        assert!(Opcode::from_mnemonic("alloca").is_alloca());
    }
}
