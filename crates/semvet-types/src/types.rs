//! Core type representation: ids, kinds, and shapes.
//!
//! The kind set mirrors the source language: basics, named types, type
//! parameters, pointers, slices, arrays, maps, channels, signatures,
//! structs, interfaces, and constraint unions. `TypeData` is the tagged
//! union the comparison engine dispatches on.

/// Handle to a type in a [`crate::TypeGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnionId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamedId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamId(pub u32);

/// Predeclared basic kinds, including the untyped constant kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        use BasicKind::*;
        match self {
            Invalid => "invalid type",
            Bool => "bool",
            Int => "int",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            Uint => "uint",
            Uint8 => "uint8",
            Uint16 => "uint16",
            Uint32 => "uint32",
            Uint64 => "uint64",
            Uintptr => "uintptr",
            Float32 => "float32",
            Float64 => "float64",
            Complex64 => "complex64",
            Complex128 => "complex128",
            String => "string",
            UnsafePointer => "unsafe.Pointer",
            UntypedBool => "untyped bool",
            UntypedInt => "untyped int",
            UntypedRune => "untyped rune",
            UntypedFloat => "untyped float",
            UntypedComplex => "untyped complex",
            UntypedString => "untyped string",
            UntypedNil => "untyped nil",
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_integer(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            Int | Int8
                | Int16
                | Int32
                | Int64
                | Uint
                | Uint8
                | Uint16
                | Uint32
                | Uint64
                | Uintptr
                | UntypedInt
                | UntypedRune
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedComplex
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_untyped(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            UntypedBool | UntypedInt | UntypedRune | UntypedFloat | UntypedComplex | UntypedString
                | UntypedNil
        )
    }
}

/// Channel directionality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChanDir {
    SendRecv,
    SendOnly,
    RecvOnly,
}

impl ChanDir {
    /// Prose form used in reason messages.
    pub fn describe(self) -> &'static str {
        match self {
            ChanDir::SendRecv => "send/receive",
            ChanDir::SendOnly => "send",
            ChanDir::RecvOnly => "receive",
        }
    }
}

/// The tagged union the engine dispatches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Basic(BasicKind),
    Named(NamedId),
    TypeParam(TypeParamId),
    Pointer(TypeId),
    Slice(TypeId),
    Array { len: u64, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Signature(SignatureId),
    Struct(StructId),
    Interface(InterfaceId),
    Union(UnionId),
}

/// A struct field. `pkg_path` is the import path of the declaring package;
/// unexported fields from different packages are never identical.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub tag: String,
    pub embedded: bool,
    pub pkg_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructShape {
    pub fields: Vec<Field>,
}

/// A method: on a named type or in an interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    pub sig: TypeId,
    pub pkg_path: String,
}

/// An interface as declared: explicit methods plus embedded elements
/// (other interfaces, union terms, or single types). The `comparable`
/// flag marks the predeclared `comparable` constraint; flattening
/// propagates it through embeds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceShape {
    pub methods: Vec<Method>,
    pub embeddeds: Vec<TypeId>,
    pub comparable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureShape {
    pub type_params: Vec<TypeParamId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    pub variadic: bool,
}

/// One element of a constraint type set. `tilde` means "any type whose
/// underlying type is this type".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    pub tilde: bool,
    pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnionShape {
    pub terms: Vec<Term>,
}

/// A named type declaration. The underlying type is patched in after all
/// declarations are allocated, which is what lets recursive and mutually
/// recursive types resolve.
#[derive(Clone, Debug)]
pub struct NamedDecl {
    pub name: String,
    pub pkg_path: String,
    pub type_params: Vec<TypeParamId>,
    pub underlying: TypeId,
    pub methods: Vec<Method>,
}

/// A declared type parameter and its constraint.
#[derive(Clone, Debug)]
pub struct TypeParamDecl {
    pub name: String,
    pub constraint: TypeId,
}
