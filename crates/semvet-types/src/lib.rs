//! Type graph and package model for semvet.
//!
//! Both snapshots of a module are loaded into one [`TypeGraph`]. Structural
//! types are hash-consed, so id equality is the built-in identity fast path;
//! named types and type parameters allocate a fresh id per declaration, which
//! is what makes the two copies of a nominally-identical type distinguishable
//! across snapshots.

mod graph;
mod package;
mod types;

pub use graph::{FlatInterface, TypeGraph};
pub use package::{LoadError, Loader, ModuleInfo, Package, is_exported, is_public};
pub use types::{
    BasicKind, ChanDir, Field, InterfaceId, InterfaceShape, Method, NamedDecl, NamedId,
    SignatureId, SignatureShape, StructId, StructShape, Term, TypeData, TypeId, TypeParamDecl,
    TypeParamId, UnionId, UnionShape,
};
