//! Types and function signatures.

use smallvec::SmallVec;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// `iN`.
    Int(u32),
    /// Opaque pointer: `ptr` or `ptr addrspace(N)`.
    Ptr { addrspace: u32 },
    /// Typed pointer: `T*` or `T addrspace(N)*`.
    TypedPtr { pointee: Box<Type>, addrspace: u32 },
    /// A named type reference: `%struct.S`.
    Named(String),
    /// Any other type, kept as spelled (with normalized spacing).
    Other(String),
}

impl Type {
    /// `i8*` in typed-pointer modules, `ptr` otherwise.
    pub fn byte_ptr(style: PointerStyle) -> Type {
        match style {
            PointerStyle::Opaque => Type::Ptr { addrspace: 0 },
            PointerStyle::Typed => Type::TypedPtr {
                pointee: Box::new(Type::Int(8)),
                addrspace: 0,
            },
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Ptr { addrspace: 0 } => write!(f, "ptr"),
            Type::Ptr { addrspace } => write!(f, "ptr addrspace({})", addrspace),
            Type::TypedPtr {
                pointee,
                addrspace: 0,
            } => write!(f, "{}*", pointee),
            Type::TypedPtr { pointee, addrspace } => {
                write!(f, "{} addrspace({})*", pointee, addrspace)
            }
            Type::Named(name) => super::symbol::write_ident(f, '%', name),
            Type::Other(spelling) => write!(f, "{}", spelling),
        }
    }
}

/// How pointer types are spelled in a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerStyle {
    /// `ptr` (LLVM 15 and later).
    Opaque,
    /// `i8*` and friends (clang 14 and earlier).
    Typed,
}

impl Default for PointerStyle {
    fn default() -> Self {
        PointerStyle::Opaque
    }
}

impl std::str::FromStr for PointerStyle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opaque" => Ok(PointerStyle::Opaque),
            "typed" => Ok(PointerStyle::Typed),
            _ => Err(format!("unknown pointer style `{}`", s)),
        }
    }
}

/// A function signature. Parameter attributes and names are not part
/// of the signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureData {
    pub ret: Type,
    pub params: SmallVec<[Type; 4]>,
    pub varargs: bool,
}

impl SignatureData {
    pub fn new<I: IntoIterator<Item = Type>>(ret: Type, params: I) -> Self {
        SignatureData {
            ret,
            params: params.into_iter().collect(),
            varargs: false,
        }
    }
}

impl Display for SignatureData {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let mut params = self
            .params
            .iter()
            .map(|ty| format!("{}", ty))
            .collect::<Vec<_>>();
        if self.varargs {
            params.push("...".to_string());
        }
        write!(f, "{} ({})", self.ret, params.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn byte_ptr_spelling() {
        assert_eq!(Type::byte_ptr(PointerStyle::Opaque).to_string(), "ptr");
        assert_eq!(Type::byte_ptr(PointerStyle::Typed).to_string(), "i8*");
    }

    #[test]
    fn signature_display() {
        let mut sig = SignatureData::new(Type::Int(32), vec![Type::Ptr { addrspace: 0 }]);
        sig.varargs = true;
        assert_eq!(sig.to_string(), "i32 (ptr, ...)");
        let sig = SignatureData::new(Type::Void, vec![]);
        assert_eq!(sig.to_string(), "void ()");
    }
}
