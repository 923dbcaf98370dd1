//! Resolution of type references written in source.

use std::collections::HashSet;

use crate::ast::{TypeArg, TypeRef, TypeRefSegment};
use crate::binding::{HierarchyState, ModuleId, TypeId, TypeKind, UnitId};
use crate::environment::LookupEnvironment;
use crate::problem::{ProblemReason, Result};

/// The context a source type reference is resolved in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'s> {
    pub(crate) unit: UnitId,
    /// Innermost enclosing type; its type variables and member types are visible.
    pub(crate) enclosing_type: Option<TypeId>,
    pub(crate) method_type_variables: &'s [TypeId],
    /// Set while resolving the `extends`/`implements` clauses of this type, whose
    /// own member types are not in scope there.
    pub(crate) header_of: Option<TypeId>,
}

impl<'s> Scope<'s> {
    pub(crate) fn for_type(unit: UnitId, ty: TypeId) -> Self {
        Self {
            unit,
            enclosing_type: Some(ty),
            method_type_variables: &[],
            header_of: None,
        }
    }

    pub(crate) fn for_header(unit: UnitId, ty: TypeId) -> Self {
        Self {
            header_of: Some(ty),
            ..Self::for_type(unit, ty)
        }
    }

    pub(crate) fn with_method_type_variables(self, variables: &'s [TypeId]) -> Self {
        Self {
            method_type_variables: variables,
            ..self
        }
    }
}

impl LookupEnvironment {
    /// Resolves `reference` in `scope`. Failures come back as reported problem types.
    pub(crate) fn resolve_type_ref(&mut self, scope: &Scope<'_>, reference: &TypeRef) -> Result<TypeId> {
        match reference {
            TypeRef::Primitive(base) => Ok(base.type_id()),
            TypeRef::Array {
                component,
                dimensions,
            } => {
                let leaf = self.resolve_type_ref(scope, component)?;
                if self.types.is_problem(leaf) {
                    return Ok(leaf);
                }
                Ok(self.types.array_type(leaf, *dimensions, &[]))
            }
            TypeRef::Named(segments) => {
                let resolved = self.resolve_named(scope, segments)?;
                if self.types.is_problem(resolved) {
                    self.report_type_problem(resolved);
                }
                Ok(resolved)
            }
        }
    }

    fn resolve_named(&mut self, scope: &Scope<'_>, segments: &[TypeRefSegment]) -> Result<TypeId> {
        let module = self.session.units[scope.unit.index()].module;
        let names: Vec<String> = segments.iter().map(|s| s.name.clone()).collect();
        let Some(first) = names.first() else {
            return Ok(self.problem(&names, None, ProblemReason::NotFound));
        };

        let (found, consumed) = match self.resolve_simple_name(scope, first)? {
            Some(found) => (found, 1),
            None => match self.resolve_qualified_prefix(module, &names)? {
                Some(found) => found,
                None => return Ok(self.problem(&names, None, ProblemReason::NotFound)),
            },
        };
        if self.types.is_problem(found) || self.types.is_type_variable(found) {
            return Ok(found);
        }

        let mut current = self.apply_type_arguments(scope, found, &segments[consumed - 1].arguments, None)?;
        for (index, segment) in segments.iter().enumerate().skip(consumed) {
            let declaration = self.types.declaration_of(current).unwrap_or(current);
            let Some(member) = self.find_member_type(declaration, &segment.name)? else {
                return Ok(self.problem(&names[..=index], None, ProblemReason::NotFound));
            };
            let enclosing = match self.types.kind(current) {
                TypeKind::Parameterized { .. } => Some(current),
                _ => None,
            };
            current = self.apply_type_arguments(scope, member, &segment.arguments, enclosing)?;
        }
        Ok(current)
    }

    /// Walks `a.b.C...` left to right: the shortest prefix naming a type wins.
    fn resolve_qualified_prefix(&mut self, module: ModuleId, names: &[String]) -> Result<Option<(TypeId, usize)>> {
        for end in 2..=names.len() {
            if let Some(found) = self.find_qualified_type(module, &names[..end])? {
                return Ok(Some((found, end)));
            }
        }
        Ok(None)
    }

    /// The simple name `name` in `scope`: method and type variables, member types of
    /// the enclosing chain, types of the unit, single-type imports, the unit's package,
    /// then on-demand imports (with `java.lang`).
    pub(crate) fn resolve_simple_name(&mut self, scope: &Scope<'_>, name: &str) -> Result<Option<TypeId>> {
        for variable in scope.method_type_variables {
            if self.is_type_variable_named(*variable, name) {
                return Ok(Some(*variable));
            }
        }

        let mut current = scope.enclosing_type;
        while let Some(ty) = current {
            let Some(class) = self.types.class_of(ty) else {
                break;
            };
            let (variables, enclosing, own_name) =
                (class.type_variables.clone(), class.enclosing, class.source_name.clone());
            if let Some(found) = variables.into_iter().find(|v| self.is_type_variable_named(*v, name)) {
                return Ok(Some(found));
            }
            if Some(ty) != scope.header_of {
                if let Some(member) = self.find_member_type(ty, name)? {
                    return Ok(Some(member));
                }
            }
            if own_name == name {
                return Ok(Some(ty));
            }
            current = enclosing;
        }

        let state = &self.session.units[scope.unit.index()];
        let (module, package) = (state.module, state.package);
        let top_level = state.top_level.clone();
        let imports = state.imports.clone();
        for ty in top_level {
            if self.types.class_of(ty).is_some_and(|c| c.source_name == name) {
                return Ok(Some(ty));
            }
        }
        if let Some((_, ty)) = imports.single_types.iter().find(|(simple, _)| simple == name) {
            return Ok(Some(*ty));
        }
        if let Some(found) = self.get_type_in_package(module, package, name)? {
            if !self.types.is_problem(found) {
                return Ok(Some(found));
            }
        }

        let mut found: Option<TypeId> = None;
        let mut ambiguous = false;
        let packages = imports.on_demand_packages.iter().copied().chain(imports.java_lang);
        for on_demand in packages {
            let Some(candidate) = self.get_type_in_package(module, on_demand, name)? else {
                continue;
            };
            if self.types.is_problem(candidate) {
                continue;
            }
            let accessible = match self.types.class_of(candidate).map(|c| c.package) {
                Some(candidate_package) => self.can_access(module, candidate_package),
                None => false,
            };
            if !accessible {
                continue;
            }
            match found {
                None => found = Some(candidate),
                Some(previous) if previous != candidate => ambiguous = true,
                Some(_) => {}
            }
        }
        for owner in &imports.on_demand_types {
            if let Some(candidate) = self.find_member_type(*owner, name)? {
                match found {
                    None => found = Some(candidate),
                    Some(previous) if previous != candidate => ambiguous = true,
                    Some(_) => {}
                }
            }
        }
        if ambiguous {
            let compound = vec![name.to_string()];
            return Ok(Some(self.problem(&compound, found, ProblemReason::Ambiguous)));
        }
        Ok(found)
    }

    fn is_type_variable_named(&self, variable: TypeId, name: &str) -> bool {
        self.types
            .type_var_id(variable)
            .is_some_and(|id| self.types.type_var(id).name == name)
    }

    /// Member type `name` of `ty` or of its connected supertypes.
    pub(crate) fn find_member_type(&mut self, ty: TypeId, name: &str) -> Result<Option<TypeId>> {
        let mut visited = HashSet::new();
        let mut pending = vec![ty];
        while let Some(next) = pending.pop() {
            let next = self.resolve_type(next, false)?;
            let Some(declaration) = self.types.declaration_of(next) else {
                continue;
            };
            if !visited.insert(declaration) {
                continue;
            }
            if let Some(member) = self.member_type(declaration, name)? {
                return Ok(Some(member));
            }
            let Some(class) = self.types.class_of(declaration) else {
                continue;
            };
            if class.hierarchy != HierarchyState::Connected {
                continue;
            }
            pending.extend(class.superinterfaces.iter().rev().copied());
            pending.extend(class.superclass);
        }
        Ok(None)
    }

    /// `generic` with the type arguments written at one segment. A generic type
    /// used without arguments becomes raw.
    fn apply_type_arguments(
        &mut self,
        scope: &Scope<'_>,
        generic: TypeId,
        arguments: &[TypeArg],
        enclosing: Option<TypeId>,
    ) -> Result<TypeId> {
        let generic = self.resolve_type(generic, false)?;
        let Some(class) = self.types.class_of(generic) else {
            return Ok(generic);
        };
        let (is_generic, is_static) = (class.is_generic(), class.is_static());
        if arguments.is_empty() {
            return Ok(if is_generic {
                self.types.raw_type(generic, enclosing, &[])
            } else {
                match enclosing {
                    Some(enclosing) if !is_static => self.types.parameterized_type(generic, &[], Some(enclosing), &[]),
                    _ => generic,
                }
            });
        }
        let mut resolved = Vec::with_capacity(arguments.len());
        for (rank, argument) in arguments.iter().enumerate() {
            let argument = match argument {
                TypeArg::Type(reference) => self.resolve_type_ref(scope, reference)?,
                TypeArg::Wildcard { kind, bound } => {
                    let bound = match bound {
                        Some(bound) => Some(self.resolve_type_ref(scope, bound)?),
                        None => None,
                    };
                    self.types.wildcard(generic, rank, bound, &[], *kind, &[])
                }
            };
            resolved.push(argument);
        }
        Ok(self.types.parameterized_type(generic, &resolved, enclosing, &[]))
    }
}
