//! Hierarchy completion for source units.
//!
//! Units advance through the phases in lock step: every pending unit finishes a
//! phase before any unit starts the next one. Units that arrive while a batch is
//! running (through the oracle) are caught up to the last phase the batch finished
//! and taken through the rest by the next batch, never by a nested completion.

use std::collections::HashSet;
use std::rc::Rc;

use tern_classfile::flags;

use crate::ast::{CompilationUnit, ImportDecl, TypeDecl, TypeDeclKind, TypeParameterDecl};
use crate::binding::{
    AccessRestriction, ClassBinding, ClassOrigin, DeclKind, FieldBinding, HierarchyState,
    MethodBinding, MethodOrigin, ModuleId, PackageId, TypeId, TypeVariableBinding,
    TypeVariableOwner, UnitId,
};
use crate::environment::LookupEnvironment;
use crate::package::Known;
use crate::problem::{ProblemKind, ProblemReason, Result};
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Step {
    #[default]
    Initial,
    BuildTypeHierarchy,
    CheckAndSetImports,
    ConnectTypeHierarchy,
    BuildFieldsAndMethods,
}

impl Step {
    fn next(self) -> Option<Step> {
        Some(match self {
            Step::Initial => Step::BuildTypeHierarchy,
            Step::BuildTypeHierarchy => Step::CheckAndSetImports,
            Step::CheckAndSetImports => Step::ConnectTypeHierarchy,
            Step::ConnectTypeHierarchy => Step::BuildFieldsAndMethods,
            Step::BuildFieldsAndMethods => return None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedImports {
    /// Simple name to imported type.
    pub(crate) single_types: Vec<(String, TypeId)>,
    pub(crate) on_demand_packages: Vec<PackageId>,
    pub(crate) on_demand_types: Vec<TypeId>,
    pub(crate) static_members: Vec<(TypeId, String)>,
    pub(crate) static_on_demand: Vec<TypeId>,
    pub(crate) java_lang: Option<PackageId>,
}

#[derive(Debug)]
pub(crate) struct UnitState {
    pub(crate) unit: Rc<CompilationUnit>,
    pub(crate) module: ModuleId,
    pub(crate) package: PackageId,
    pub(crate) step: Step,
    pub(crate) top_level: Vec<TypeId>,
    /// Every source type of the unit, enclosing types before their members.
    pub(crate) types: Vec<TypeId>,
    pub(crate) imports: ResolvedImports,
}

/// Where a source type is declared: its unit and the index path through
/// `types`/`member_types`.
#[derive(Debug, Clone)]
pub(crate) struct SourceTypeInfo {
    pub(crate) unit: UnitId,
    pub(crate) path: Vec<usize>,
}

fn decl_at<'u>(unit: &'u CompilationUnit, path: &[usize]) -> Option<&'u TypeDecl> {
    let (first, rest) = path.split_first()?;
    let mut decl = unit.types.get(*first)?;
    for index in rest {
        decl = decl.member_types.get(*index)?;
    }
    Some(decl)
}

fn decl_kind(kind: TypeDeclKind) -> DeclKind {
    match kind {
        TypeDeclKind::Class => DeclKind::Class,
        TypeDeclKind::Interface => DeclKind::Interface,
        TypeDeclKind::Enum => DeclKind::Enum,
        TypeDeclKind::Record => DeclKind::Record,
        TypeDeclKind::Annotation => DeclKind::Annotation,
    }
}

fn implicit_modifiers(kind: TypeDeclKind, is_member_of_interface: bool) -> u16 {
    let mut modifiers = match kind {
        TypeDeclKind::Interface => flags::ACC_INTERFACE | flags::ACC_ABSTRACT,
        TypeDeclKind::Annotation => flags::ACC_INTERFACE | flags::ACC_ABSTRACT | flags::ACC_ANNOTATION,
        TypeDeclKind::Enum => flags::ACC_ENUM,
        TypeDeclKind::Class | TypeDeclKind::Record => 0,
    };
    if is_member_of_interface || kind != TypeDeclKind::Class {
        // nested interfaces, enums and records are implicitly static
        modifiers |= flags::ACC_STATIC;
    }
    modifiers
}

impl LookupEnvironment {
    /// Adds a parsed unit to the session in the unnamed module (or the module its
    /// `module_name` names) and builds its type skeletons.
    pub fn build_type_bindings(
        &mut self,
        unit: CompilationUnit,
        restriction: Option<AccessRestriction>,
    ) -> Result<UnitId> {
        self.build_type_bindings_in(Rc::new(unit), None, restriction)
    }

    /// Builds the skeletons of `unit`'s types: packages, source types, member types
    /// and type variables. Supertypes and members are filled in by later phases.
    pub fn build_type_bindings_in(
        &mut self,
        unit: Rc<CompilationUnit>,
        module: Option<ModuleId>,
        restriction: Option<AccessRestriction>,
    ) -> Result<UnitId> {
        let unit_id = UnitId::from_index(self.session.units.len());
        let module = match (&unit.module, module, &unit.module_name) {
            (Some(info), _, _) => self.define_source_module(info, unit_id),
            (None, Some(module), _) => module,
            (None, None, Some(name)) => self.source_module_named(name),
            (None, None, None) => self.unnamed,
        };
        let previous = self.session.unit_being_completed.replace(unit_id);

        let package = match &unit.package {
            Some(name) => match self.create_plain_package(module, name) {
                Some(package) => package,
                None => {
                    self.report(ProblemKind::PackageCollidesWithType {
                        package: name.join("."),
                    });
                    self.default_package(module)
                }
            },
            None => self.default_package(module),
        };

        let mut all = Vec::new();
        let mut top_level = Vec::new();
        for (index, decl) in unit.types.iter().enumerate() {
            let built = self.build_source_type(unit_id, module, package, decl, vec![index], None, &mut all);
            top_level.extend(built);
        }
        if let Some(restriction) = restriction {
            for ty in &all {
                self.access_restrictions.insert(*ty, restriction.clone());
            }
        }
        self.session.unit_being_completed = previous;

        tracing::debug!(target: "tern.lookup.pipeline", unit = %unit.file_name, types = all.len(), "type bindings built");
        self.session.units.push(UnitState {
            unit,
            module,
            package,
            step: Step::BuildTypeHierarchy,
            top_level,
            types: all,
            imports: ResolvedImports::default(),
        });
        if self.session.step == Step::Initial {
            self.session.step = Step::BuildTypeHierarchy;
        }
        Ok(unit_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_source_type(
        &mut self,
        unit: UnitId,
        module: ModuleId,
        package: PackageId,
        decl: &TypeDecl,
        path: Vec<usize>,
        enclosing: Option<(TypeId, &str, bool)>,
        all: &mut Vec<TypeId>,
    ) -> Option<TypeId> {
        let binary_name = match enclosing {
            Some((_, outer, _)) => format!("{outer}${}", decl.name),
            None => decl.name.clone(),
        };
        let mut compound_name = self.packages.get(package).compound_name.clone();
        compound_name.push(binary_name.clone());

        let placeholder = match self.packages.get(package).known_type(&binary_name) {
            Some(Known::Found(existing)) if self.types.class_of(existing).is_some_and(|c| c.is_unresolved()) => {
                Some(existing)
            }
            Some(Known::Found(_)) => {
                self.report(ProblemKind::DuplicateType {
                    name: compound_name.join("."),
                });
                return None;
            }
            _ => None,
        };

        let is_member_of_interface = enclosing.is_some_and(|(_, _, interface)| interface);
        let mut class = ClassBinding::skeleton(compound_name, package, module, ClassOrigin::Source(unit));
        class.decl_kind = decl_kind(decl.kind);
        class.modifiers = decl.modifiers | implicit_modifiers(decl.kind, is_member_of_interface);
        if enclosing.is_none() {
            class.modifiers &= !flags::ACC_STATIC;
        }
        class.source_name = decl.name.clone();
        class.enclosing = enclosing.map(|(outer, _, _)| outer);
        let ty = match placeholder {
            Some(existing) => {
                self.types.redefine_class(existing, class);
                existing
            }
            None => self.types.add_class(class),
        };
        self.add_type_to_package(package, &binary_name, ty);
        self.session.source_types.insert(
            ty,
            SourceTypeInfo {
                unit,
                path: path.clone(),
            },
        );
        all.push(ty);

        let variables = self.create_source_type_variables(&decl.type_parameters, TypeVariableOwner::Type(ty));
        let is_interface = decl_kind(decl.kind).is_interface();
        let mut members = Vec::with_capacity(decl.member_types.len());
        for (index, member) in decl.member_types.iter().enumerate() {
            let mut member_path = path.clone();
            member_path.push(index);
            let built = self.build_source_type(
                unit,
                module,
                package,
                member,
                member_path,
                Some((ty, &binary_name, is_interface)),
                all,
            );
            members.extend(built);
        }
        if let Some(class) = self.types.class_of_mut(ty) {
            class.type_variables = variables;
            class.member_types = members;
        }
        Some(ty)
    }

    fn create_source_type_variables(
        &mut self,
        parameters: &[TypeParameterDecl],
        owner: TypeVariableOwner,
    ) -> Vec<TypeId> {
        parameters
            .iter()
            .enumerate()
            .map(|(rank, parameter)| {
                self.types.add_type_variable(TypeVariableBinding {
                    name: parameter.name.clone(),
                    owner,
                    rank,
                    superclass: None,
                    superinterfaces: Vec::new(),
                    first_bound: None,
                })
            })
            .collect()
    }

    /// Runs every pending unit through the remaining phases, batch by batch, until
    /// no unit is pending. Inside a running completion this is a no-op: the outer
    /// loop picks up whatever arrived.
    pub fn complete_type_bindings(&mut self) -> Result<()> {
        if self.session.completing {
            return Ok(());
        }
        self.session.completing = true;
        let result = self.complete_pending_batches();
        self.session.completing = false;
        result
    }

    fn complete_pending_batches(&mut self) -> Result<()> {
        while self.session.completed < self.session.units.len() {
            let start = self.session.completed;
            let end = self.session.units.len();
            self.session.step = Step::BuildTypeHierarchy;
            for step in [
                Step::CheckAndSetImports,
                Step::ConnectTypeHierarchy,
                Step::BuildFieldsAndMethods,
            ] {
                tracing::debug!(target: "tern.lookup.pipeline", ?step, units = end - start, "phase started");
                for index in start..end {
                    self.advance_unit(UnitId::from_index(index), step)?;
                }
                self.session.step = step;
            }
            self.session.completed = self.session.completed.max(end);
        }
        self.session.step = Step::BuildFieldsAndMethods;
        Ok(())
    }

    /// Brings a unit that arrived late up to the last phase the running batch
    /// finished; the batch loop takes it through the rest. Outside a completion, a
    /// unit arriving after every phase ran is completed on its own batch.
    pub fn complete_type_bindings_for(&mut self, unit: UnitId) -> Result<()> {
        let reached = self.session.step;
        if reached == Step::BuildFieldsAndMethods && !self.session.completing {
            return self.complete_type_bindings();
        }
        self.advance_unit(unit, reached)
    }

    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn unit_count(&self) -> usize {
        self.session.units.len()
    }

    pub fn unit_step(&self, unit: UnitId) -> Option<Step> {
        self.session.units.get(unit.index()).map(|state| state.step)
    }

    pub fn unit_module(&self, unit: UnitId) -> Option<ModuleId> {
        self.session.units.get(unit.index()).map(|state| state.module)
    }

    /// Every source type of `unit`, enclosing types first.
    pub fn unit_types(&self, unit: UnitId) -> &[TypeId] {
        self.session
            .units
            .get(unit.index())
            .map(|state| state.types.as_slice())
            .unwrap_or(&[])
    }

    fn advance_unit(&mut self, unit: UnitId, target: Step) -> Result<()> {
        loop {
            let Some(state) = self.session.units.get(unit.index()) else {
                return Ok(());
            };
            if state.step >= target {
                return Ok(());
            }
            let Some(next) = state.step.next() else {
                return Ok(());
            };
            // Marked before running so re-entrant completions skip this unit.
            self.session.units[unit.index()].step = next;
            let previous = self.session.unit_being_completed.replace(unit);
            let result = match next {
                Step::CheckAndSetImports => self.check_and_set_imports(unit),
                Step::ConnectTypeHierarchy => self.connect_type_hierarchy(unit),
                Step::BuildFieldsAndMethods => self.build_fields_and_methods(unit),
                Step::Initial | Step::BuildTypeHierarchy => Ok(()),
            };
            self.session.unit_being_completed = previous;
            result?;
        }
    }

    fn check_and_set_imports(&mut self, unit: UnitId) -> Result<()> {
        let state = &self.session.units[unit.index()];
        let (ast, module) = (state.unit.clone(), state.module);
        if ast.module.is_some() {
            self.complete_module_directives(module);
            return Ok(());
        }

        let java_lang = ["java".to_string(), "lang".to_string()];
        let mut imports = ResolvedImports {
            java_lang: self.get_visible_package(module, &java_lang),
            ..ResolvedImports::default()
        };
        for import in &ast.imports {
            match import {
                ImportDecl::Single(name) => {
                    if let Some(ty) = self.resolve_import(module, name)? {
                        let simple = self
                            .types
                            .class_of(ty)
                            .map(|c| c.source_name.clone())
                            .unwrap_or_default();
                        imports.single_types.push((simple, ty));
                    }
                }
                ImportDecl::OnDemand(name) => {
                    if let Some(package) = self.get_visible_package(module, name) {
                        imports.on_demand_packages.push(package);
                    } else if let Some(ty) = self.resolve_import(module, name)? {
                        imports.on_demand_types.push(ty);
                    }
                }
                ImportDecl::StaticSingle { ty, member } => {
                    if let Some(owner) = self.resolve_import(module, ty)? {
                        imports.static_members.push((owner, member.clone()));
                    }
                }
                ImportDecl::StaticOnDemand(ty) => {
                    if let Some(owner) = self.resolve_import(module, ty)? {
                        imports.static_on_demand.push(owner);
                    }
                }
            }
        }
        tracing::trace!(target: "tern.lookup.pipeline", unit = %ast.file_name, imports = ast.imports.len(), "imports resolved");
        self.session.units[unit.index()].imports = imports;
        Ok(())
    }

    fn resolve_import(&mut self, module: ModuleId, name: &[String]) -> Result<Option<TypeId>> {
        let found = self.find_qualified_type(module, name)?;
        let resolved = found.filter(|ty| !self.types.is_problem(*ty));
        self.listeners().notify(name, resolved.is_some());
        if resolved.is_some() {
            return Ok(resolved);
        }
        let name = name.join(".");
        let reason = found.and_then(|ty| match self.types.kind(ty) {
            crate::binding::TypeKind::Problem(problem) => Some(problem.reason),
            _ => None,
        });
        let kind = match reason {
            Some(ProblemReason::Ambiguous) => ProblemKind::ImportAmbiguous { name },
            Some(ProblemReason::NotVisible | ProblemReason::NotAccessible) => {
                ProblemKind::ImportNotVisible { name }
            }
            _ => ProblemKind::ImportNotFound { name },
        };
        self.report(kind);
        Ok(None)
    }

    fn connect_type_hierarchy(&mut self, unit: UnitId) -> Result<()> {
        let types = self.session.units[unit.index()].types.clone();
        for ty in types {
            self.connect_source_type(ty)?;
        }
        Ok(())
    }

    /// Resolves type variable bounds and supertypes of one source type, connecting
    /// source supertypes first.
    fn connect_source_type(&mut self, ty: TypeId) -> Result<()> {
        let Some(class) = self.types.class_of(ty) else {
            return Ok(());
        };
        if class.hierarchy != HierarchyState::NotConnected {
            return Ok(());
        }
        let (module, type_variables, is_object) = (
            class.module,
            class.type_variables.clone(),
            class.compound_name == ["java", "lang", "Object"],
        );
        let Some(info) = self.session.source_types.get(&ty).cloned() else {
            return Ok(());
        };
        let ast = self.session.units[info.unit.index()].unit.clone();
        let Some(decl) = decl_at(&ast, &info.path) else {
            return Ok(());
        };
        if let Some(class) = self.types.class_of_mut(ty) {
            class.hierarchy = HierarchyState::Connecting;
        }
        self.session.types_being_connected.insert(ty);

        let scope = Scope::for_header(info.unit, ty);
        self.connect_type_variables(&scope, &type_variables, &decl.type_parameters, module)?;

        let superclass = if is_object {
            None
        } else {
            Some(match decl.kind {
                TypeDeclKind::Interface | TypeDeclKind::Annotation => self.java_lang_object(module),
                TypeDeclKind::Enum => {
                    let enum_type = self.well_known_type(module, &["java", "lang", "Enum"]);
                    self.types.parameterized_type(enum_type, &[ty], None, &[])
                }
                TypeDeclKind::Record if self.options.source_level.supports_records() => {
                    self.well_known_type(module, &["java", "lang", "Record"])
                }
                TypeDeclKind::Record => {
                    let type_name = self.types.readable_name(ty);
                    let source_level = self.options.source_level;
                    self.report(ProblemKind::RecordsNotSupported { type_name, source_level });
                    self.java_lang_object(module)
                }
                TypeDeclKind::Class => match &decl.superclass {
                    Some(reference) => {
                        let resolved = self.resolve_type_ref(&scope, reference)?;
                        match self.checked_supertype(ty, resolved, true)? {
                            Some(superclass) => superclass,
                            None => self.java_lang_object(module),
                        }
                    }
                    None => self.java_lang_object(module),
                },
            })
        };

        let mut superinterfaces = Vec::with_capacity(decl.interfaces.len());
        for reference in &decl.interfaces {
            let resolved = self.resolve_type_ref(&scope, reference)?;
            if let Some(interface) = self.checked_supertype(ty, resolved, false)? {
                if !superinterfaces.contains(&interface) {
                    superinterfaces.push(interface);
                }
            }
        }
        if decl.kind == TypeDeclKind::Annotation {
            superinterfaces.push(self.well_known_type(module, &["java", "lang", "annotation", "Annotation"]));
        }

        if let Some(class) = self.types.class_of_mut(ty) {
            class.superclass = superclass;
            class.superinterfaces = superinterfaces;
            class.hierarchy = HierarchyState::Connected;
        }
        self.session.types_being_connected.remove(&ty);
        Ok(())
    }

    /// Validates one declared supertype. Cycles and class/interface mismatches are
    /// reported and the supertype dropped.
    fn checked_supertype(&mut self, ty: TypeId, supertype: TypeId, expect_class: bool) -> Result<Option<TypeId>> {
        if self.types.is_problem(supertype) {
            return Ok(None);
        }
        let type_name = self.types.readable_name(ty);
        let Some(declaration) = self.types.declaration_of(supertype) else {
            let supertype = self.types.readable_name(supertype);
            self.report(if expect_class {
                ProblemKind::SuperclassMustBeClass { type_name, supertype }
            } else {
                ProblemKind::SuperinterfaceMustBeInterface { type_name, supertype }
            });
            return Ok(None);
        };
        let declaration = self.resolve_type(declaration, false)?;

        if !self.session.types_being_connected.contains(&declaration) {
            let needs_connecting = self
                .types
                .class_of(declaration)
                .is_some_and(|c| c.is_source() && c.hierarchy == HierarchyState::NotConnected);
            if needs_connecting {
                self.connect_source_type(declaration)?;
            }
        }
        if self.session.types_being_connected.contains(&declaration) {
            let supertype = self.types.readable_name(declaration);
            tracing::warn!(target: "tern.lookup.pipeline", %type_name, %supertype, "hierarchy cycle broken");
            self.report(ProblemKind::HierarchyCircularity { type_name, supertype });
            return Ok(None);
        }

        let is_interface = self.types.class_of(declaration).is_some_and(|c| c.is_interface());
        if expect_class && is_interface {
            let supertype = self.types.readable_name(declaration);
            self.report(ProblemKind::SuperclassMustBeClass { type_name, supertype });
            return Ok(None);
        }
        if !expect_class && !is_interface {
            let supertype = self.types.readable_name(declaration);
            self.report(ProblemKind::SuperinterfaceMustBeInterface { type_name, supertype });
            return Ok(None);
        }
        Ok(Some(supertype))
    }

    fn connect_type_variables(
        &mut self,
        scope: &Scope<'_>,
        variables: &[TypeId],
        parameters: &[TypeParameterDecl],
        module: ModuleId,
    ) -> Result<()> {
        for (variable, parameter) in variables.iter().zip(parameters) {
            let mut first_bound = None;
            let mut superclass = None;
            let mut superinterfaces = Vec::new();
            for (index, reference) in parameter.bounds.iter().enumerate() {
                let bound = self.resolve_type_ref(scope, reference)?;
                if self.types.is_problem(bound) {
                    continue;
                }
                first_bound.get_or_insert(bound);
                let is_interface = self
                    .types
                    .declaration_of(bound)
                    .and_then(|d| self.types.class_of(d))
                    .is_some_and(|c| c.is_interface());
                if index == 0 && !is_interface {
                    superclass = Some(bound);
                } else {
                    superinterfaces.push(bound);
                }
            }
            let superclass = match superclass {
                Some(superclass) => superclass,
                None => self.java_lang_object(module),
            };
            if let Some(id) = self.types.type_var_id(*variable) {
                let binding = self.types.type_var_mut(id);
                binding.first_bound = first_bound;
                binding.superclass = Some(superclass);
                binding.superinterfaces = superinterfaces;
            }
        }
        Ok(())
    }

    fn build_fields_and_methods(&mut self, unit: UnitId) -> Result<()> {
        let state = &self.session.units[unit.index()];
        let (ast, module, types) = (state.unit.clone(), state.module, state.types.clone());
        if ast.module.is_some() {
            self.complete_module_services(module);
            return Ok(());
        }
        for ty in types {
            let Some(info) = self.session.source_types.get(&ty).cloned() else {
                continue;
            };
            let Some(decl) = decl_at(&ast, &info.path) else {
                continue;
            };
            let type_name = self.types.readable_name(ty);
            let scope = Scope::for_type(unit, ty);

            let mut field_names = HashSet::new();
            let mut fields = Vec::with_capacity(decl.fields.len());
            for field in &decl.fields {
                if !field_names.insert(field.name.as_str()) {
                    self.report(ProblemKind::DuplicateField {
                        type_name: type_name.clone(),
                        field: field.name.clone(),
                    });
                    continue;
                }
                let field_type = self.resolve_type_ref(&scope, &field.ty)?;
                fields.push(self.types.add_field(FieldBinding {
                    name: field.name.clone(),
                    modifiers: field.modifiers,
                    declaring_class: ty,
                    ty: field_type,
                }));
            }

            let mut signatures: Vec<(String, Vec<TypeId>)> = Vec::new();
            let mut methods = Vec::with_capacity(decl.methods.len());
            for method in &decl.methods {
                let variables = self.create_source_type_variables(&method.type_parameters, TypeVariableOwner::Pending);
                let method_scope = scope.with_method_type_variables(&variables);
                self.connect_type_variables(&method_scope, &variables, &method.type_parameters, module)?;
                let mut parameters = Vec::with_capacity(method.parameters.len());
                for parameter in &method.parameters {
                    parameters.push(self.resolve_type_ref(&method_scope, parameter)?);
                }
                let return_type = match &method.return_type {
                    Some(reference) => self.resolve_type_ref(&method_scope, reference)?,
                    None => TypeId::VOID,
                };
                let mut thrown = Vec::with_capacity(method.throws.len());
                for reference in &method.throws {
                    thrown.push(self.resolve_type_ref(&method_scope, reference)?);
                }

                let erased: Vec<TypeId> = parameters.iter().map(|p| self.erasure(*p)).collect();
                let signature = (method.name.clone(), erased);
                if signatures.contains(&signature) {
                    self.report(ProblemKind::DuplicateMethod {
                        type_name: type_name.clone(),
                        selector: method.name.clone(),
                    });
                    continue;
                }
                signatures.push(signature);

                let id = self.types.add_method(MethodBinding {
                    selector: method.name.clone(),
                    modifiers: method.modifiers,
                    declaring_class: ty,
                    type_variables: variables.clone(),
                    parameters,
                    return_type,
                    thrown,
                    origin: MethodOrigin::Declared,
                    polymorphic_signature: false,
                });
                for variable in &variables {
                    if let Some(var_id) = self.types.type_var_id(*variable) {
                        self.types.type_var_mut(var_id).owner = TypeVariableOwner::Method(id);
                    }
                }
                methods.push(id);
            }

            if let Some(class) = self.types.class_of_mut(ty) {
                class.fields = fields;
                class.methods = methods;
            }
        }
        tracing::trace!(target: "tern.lookup.pipeline", unit = %ast.file_name, "fields and methods built");
        Ok(())
    }
}
