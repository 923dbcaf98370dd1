//! Collaborator seams: the name-environment oracle and the type requestor.
//!
//! Both are shared as `Rc<dyn ...>` by the environment. Their methods take `&self`
//! so a re-entrant call can hand `&mut LookupEnvironment` back in while the oracle
//! is still borrowed.

use std::rc::Rc;

use tern_classfile::BinaryType;
use tern_modules::{ModuleInfo, ModuleName};

use crate::ast::CompilationUnit;
use crate::binding::{AccessRestriction, ModuleId, PackageId, TypeId};
use crate::environment::LookupEnvironment;
use crate::problem::{AbortCompilation, Result};

/// Which module(s) an oracle query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupModule<'a> {
    Named(&'a ModuleName),
    /// Any module, the unnamed module included.
    Any,
    /// Any named module.
    AnyNamed,
}

impl<'a> LookupModule<'a> {
    pub fn matches(self, module: &ModuleName) -> bool {
        match self {
            LookupModule::Named(name) => name == module,
            LookupModule::Any => true,
            LookupModule::AnyNamed => !module.is_unnamed(),
        }
    }
}

/// A source file the driver still has to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub enum AnswerKind {
    Binary(Rc<BinaryType>),
    /// An already parsed unit (e.g. from an index).
    SourceUnit(Rc<CompilationUnit>),
    /// Unparsed source; only the driver's requestor can turn it into a unit.
    CompilationUnit(SourceFile),
    /// A binding the oracle already holds.
    Resolved(TypeId),
}

#[derive(Debug, Clone)]
pub struct NameEnvironmentAnswer {
    pub kind: AnswerKind,
    /// The module the answer was found in; `None` means the unnamed module.
    pub module_name: Option<ModuleName>,
    pub access_restriction: Option<AccessRestriction>,
}

impl NameEnvironmentAnswer {
    pub fn binary(binary: BinaryType, module_name: Option<ModuleName>) -> Self {
        Self {
            kind: AnswerKind::Binary(Rc::new(binary)),
            module_name,
            access_restriction: None,
        }
    }

    pub fn source(unit: CompilationUnit, module_name: Option<ModuleName>) -> Self {
        Self {
            kind: AnswerKind::SourceUnit(Rc::new(unit)),
            module_name,
            access_restriction: None,
        }
    }

    pub fn resolved(ty: TypeId, module_name: Option<ModuleName>) -> Self {
        Self {
            kind: AnswerKind::Resolved(ty),
            module_name,
            access_restriction: None,
        }
    }

    pub fn with_access_restriction(mut self, restriction: AccessRestriction) -> Self {
        self.access_restriction = Some(restriction);
        self
    }
}

/// The class-path/module-path oracle.
pub trait NameEnvironment {
    fn find_type(&self, compound_name: &[String], module: LookupModule<'_>)
        -> Option<NameEnvironmentAnswer>;

    fn find_type_in_package(
        &self,
        name: &str,
        package: &[String],
        module: LookupModule<'_>,
    ) -> Option<NameEnvironmentAnswer>;

    fn is_package(&self, package: &[String], module: LookupModule<'_>) -> bool;

    /// Names of every module (the unnamed module as the empty name) declaring `package`.
    fn modules_declaring_package(
        &self,
        package: &[String],
        module: LookupModule<'_>,
    ) -> Vec<ModuleName>;

    /// Whether `package` has compilation units in `module`. With `check_cus` false a
    /// declared package counts even when it only contains sub-packages.
    fn has_compilation_unit(
        &self,
        package: &[String],
        module: &ModuleName,
        check_cus: bool,
    ) -> bool;

    fn get_module(&self, name: &ModuleName) -> Option<ModuleInfo>;

    fn uses_module_system(&self) -> bool {
        true
    }
}

/// Installs oracle answers into the environment.
pub trait TypeRequestor {
    fn accept_binary_type(
        &self,
        env: &mut LookupEnvironment,
        binary: &BinaryType,
        package: PackageId,
        restriction: Option<AccessRestriction>,
    ) -> Result<Option<TypeId>> {
        env.create_binary_type_from(binary, package, restriction)
    }

    fn accept_source_unit(
        &self,
        env: &mut LookupEnvironment,
        unit: Rc<CompilationUnit>,
        module: ModuleId,
        restriction: Option<AccessRestriction>,
    ) -> Result<()> {
        let unit_id = env.build_type_bindings_in(unit, Some(module), restriction)?;
        env.complete_type_bindings_for(unit_id)
    }

    fn accept_compilation_unit(
        &self,
        _env: &mut LookupEnvironment,
        source: &SourceFile,
        _module: ModuleId,
        _restriction: Option<AccessRestriction>,
    ) -> Result<()> {
        Err(AbortCompilation::Requestor(format!(
            "no parser available for `{}`",
            source.file_name
        )))
    }

    fn accept_module(&self, env: &mut LookupEnvironment, info: &ModuleInfo) -> ModuleId {
        env.create_binary_module(info)
    }
}

/// Registers binary types and parsed units; rejects unparsed sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRequestor;

impl TypeRequestor for DefaultRequestor {}
