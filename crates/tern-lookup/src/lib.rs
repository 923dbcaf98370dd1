//! Binding and lookup for Java compilation.
//!
//! A [`LookupEnvironment`] owns every binding of one compilation session. Types
//! come from two places: binary class files handed over by a [`NameEnvironment`]
//! oracle, and parsed [`CompilationUnit`]s that go through the hierarchy
//! completion pipeline. Identity is structural: equal requests always produce the
//! same [`TypeId`].

pub mod ast;
pub mod binding;
mod binary_types;
mod environment;
mod generics;
mod listener;
pub mod memory;
mod method;
mod module;
mod nullness;
pub mod oracle;
mod package;
mod pipeline;
pub mod problem;
mod scope;
mod signature;
mod type_system;

pub use crate::ast::{CompilationUnit, ImportDecl, TypeDecl, TypeDeclKind, TypeRef};
pub use crate::binding::{
    AccessRestriction, AccessRule, BaseKind, ClassBinding, ClassOrigin, DeclKind, FieldId,
    MethodBinding, MethodId, MethodOrigin, ModuleId, PackageId, TypeId, TypeKind, UnitId,
    WildcardKind,
};
pub use crate::environment::{LookupEnvironment, ModuleEnvironment};
pub use crate::generics::Substitution;
pub use crate::listener::{ListenerRegistry, ResolutionListener};
pub use crate::memory::InMemoryNameEnvironment;
pub use crate::module::{ModuleBinding, ModuleOrigin, PackageExport};
pub use crate::nullness::NullTag;
pub use crate::oracle::{
    AnswerKind, DefaultRequestor, LookupModule, NameEnvironment, NameEnvironmentAnswer,
    SourceFile, TypeRequestor,
};
pub use crate::package::{Known, PackageBinding, PackageKind, PackageLookup, Packages};
pub use crate::pipeline::Step;
pub use crate::problem::{
    AbortCompilation, CollectingReporter, Problem, ProblemKind, ProblemReason, ProblemReporter,
};
pub use crate::signature::TypeAnnotationWalker;
pub use crate::type_system::TypeSystem;
