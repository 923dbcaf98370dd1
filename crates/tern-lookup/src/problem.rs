use std::cell::RefCell;

use tern_config::SourceLevel;
use tern_modules::{ModuleError, ModuleName};
use thiserror::Error;

use crate::binding::UnitId;

/// Why a name did not bind to a usable binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemReason {
    /// The oracle had no answer at all.
    NotFound,
    /// Found, but declared in a module the client does not read or hidden by its modifiers.
    NotVisible,
    /// Two or more equally valid, equally accessible candidates.
    Ambiguous,
    /// Found in a readable module whose package is not exported to the client.
    NotAccessible,
    /// A member type name given in binary form (`Outer$Inner`).
    InternalNameProvided,
    InheritedNameHidesEnclosingName,
}

/// A classified condition for the driver to format and report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    /// A type the engine needed is absent from the class path.
    IsClassPathCorrect { compound_name: Vec<String> },
    TypeNotFound { name: String },
    TypeNotVisible { name: String },
    TypeNotAccessible { name: String, module: ModuleName },
    AmbiguousType { name: String },
    ImportNotFound { name: String },
    ImportNotVisible { name: String },
    ImportAmbiguous { name: String },
    PackageCollidesWithType { package: String },
    DuplicateType { name: String },
    DuplicateField { type_name: String, field: String },
    DuplicateMethod { type_name: String, selector: String },
    HierarchyCircularity { type_name: String, supertype: String },
    SuperclassMustBeClass { type_name: String, supertype: String },
    SuperinterfaceMustBeInterface { type_name: String, supertype: String },
    /// A record declared for a release that has no records.
    RecordsNotSupported { type_name: String, source_level: SourceLevel },
    /// The same package is declared with compilation units by several readable modules.
    ConflictingPackageFromModules { package: String, modules: Vec<ModuleName> },
    ModuleNotFound { module: ModuleName },
    CyclicModuleDependency { module: ModuleName },
    InvalidModuleDeclaration(ModuleError),
    ServiceNotFound { module: ModuleName, service: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    /// The unit being completed when the problem was found.
    pub unit: Option<UnitId>,
}

pub trait ProblemReporter {
    fn report(&self, problem: Problem);
}

/// Keeps every reported problem in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    problems: RefCell<Vec<Problem>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> Vec<Problem> {
        self.problems.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<ProblemKind> {
        self.problems.borrow().iter().map(|p| p.kind.clone()).collect()
    }

    pub fn take(&self) -> Vec<Problem> {
        std::mem::take(&mut *self.problems.borrow_mut())
    }
}

impl ProblemReporter for CollectingReporter {
    fn report(&self, problem: Problem) {
        self.problems.borrow_mut().push(problem);
    }
}

/// Conditions that abandon the current compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortCompilation {
    #[error("corrupted signature: {0}")]
    Signature(#[from] tern_classfile::Error),
    #[error("undefined type variable `{name}` in signature `{signature}`")]
    UndefinedTypeVariable { name: String, signature: String },
    #[error("missing member type `{member}` of `{enclosing}`")]
    MissingMemberType { enclosing: String, member: String },
    #[error("class path misconfiguration while resolving `{0}`")]
    ClasspathMisconfiguration(String),
    #[error("type requestor failed: {0}")]
    Requestor(String),
}

pub type Result<T, E = AbortCompilation> = std::result::Result<T, E>;
