//! The lookup environment: one root per compilation session.
//!
//! The root owns every arena (types, packages, modules) and all session-global
//! state. Per-module work goes through a [`ModuleEnvironment`] view, which is just
//! the root plus the module a query is made for.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tern_config::CompilerOptions;
use tern_modules::{ModuleKind, ModuleName};

use crate::binding::{
    AccessRestriction, ClassBinding, ClassOrigin, ModuleId, PackageId, ProblemType, TypeId,
    TypeKind, UnitId,
};
use crate::listener::ListenerRegistry;
use crate::method::MethodCaches;
use crate::module::{ModuleBinding, ModuleOrigin};
use crate::nullness::NullAnnotations;
use crate::oracle::{AnswerKind, LookupModule, NameEnvironment, NameEnvironmentAnswer, TypeRequestor};
use crate::package::{Known, PackageKind, PackageLookup, Packages};
use crate::pipeline::{Step, UnitState};
use crate::problem::{Problem, ProblemKind, ProblemReason, ProblemReporter, Result};
use crate::type_system::TypeSystem;

/// Session-global state shared by every module view.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) units: Vec<UnitState>,
    /// Units `..completed` went through every phase.
    pub(crate) completed: usize,
    /// The last phase every unit of the running batch finished.
    pub(crate) step: Step,
    /// Set while `complete_type_bindings` drives a batch.
    pub(crate) completing: bool,
    pub(crate) unit_being_completed: Option<UnitId>,
    pub(crate) missing_types: Vec<TypeId>,
    pub(crate) reported_missing: HashSet<Vec<String>>,
    pub(crate) types_being_connected: HashSet<TypeId>,
    /// Placeholders whose real binding lives under another id.
    pub(crate) resolved_placeholders: HashMap<TypeId, TypeId>,
    pub(crate) source_types: HashMap<TypeId, crate::pipeline::SourceTypeInfo>,
    pub(crate) method_caches: MethodCaches,
    pub(crate) capture_counter: u32,
    pub(crate) null_annotations: NullAnnotations,
}

pub struct LookupEnvironment {
    pub(crate) options: CompilerOptions,
    pub(crate) types: TypeSystem,
    pub(crate) packages: Packages,
    pub(crate) modules: Vec<ModuleBinding>,
    pub(crate) module_names: HashMap<ModuleName, ModuleId>,
    pub(crate) unnamed: ModuleId,
    pub(crate) oracle: Rc<dyn NameEnvironment>,
    pub(crate) requestor: Rc<dyn TypeRequestor>,
    pub(crate) reporter: Rc<dyn ProblemReporter>,
    pub(crate) session: Session,
    pub(crate) access_restrictions: HashMap<TypeId, AccessRestriction>,
    listeners: ListenerRegistry,
}

impl std::fmt::Debug for LookupEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupEnvironment")
            .field("types", &self.types.type_count())
            .field("packages", &self.packages.len())
            .field("modules", &self.modules.len())
            .field("units", &self.session.units.len())
            .field("step", &self.session.step)
            .finish()
    }
}

impl LookupEnvironment {
    pub fn new(
        options: CompilerOptions,
        oracle: Rc<dyn NameEnvironment>,
        requestor: Rc<dyn TypeRequestor>,
        reporter: Rc<dyn ProblemReporter>,
    ) -> Self {
        let types = TypeSystem::new(options.uses_annotated_type_system());
        let mut this = Self {
            options,
            types,
            packages: Packages::new(),
            modules: Vec::new(),
            module_names: HashMap::new(),
            unnamed: ModuleId::from_index(0),
            oracle,
            requestor,
            reporter,
            session: Session::default(),
            access_restrictions: HashMap::new(),
            listeners: ListenerRegistry::new(),
        };
        this.unnamed = this.add_module(ModuleName::unnamed(), ModuleKind::Unnamed, ModuleOrigin::Unnamed);
        this
    }

    /// Drops every binding, unit and cache; collaborators and listeners stay.
    pub fn reset(&mut self) {
        tracing::debug!(target: "tern.lookup", "lookup environment reset");
        self.types = TypeSystem::new(self.options.uses_annotated_type_system());
        self.packages = Packages::new();
        self.modules.clear();
        self.module_names.clear();
        self.session = Session::default();
        self.access_restrictions.clear();
        self.unnamed = self.add_module(ModuleName::unnamed(), ModuleKind::Unnamed, ModuleOrigin::Unnamed);
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn types(&self) -> &TypeSystem {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeSystem {
        &mut self.types
    }

    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    pub fn access_restriction(&self, ty: TypeId) -> Option<&AccessRestriction> {
        self.access_restrictions.get(&self.types.unannotated(ty))
    }

    pub fn uses_module_system(&self) -> bool {
        self.options.uses_module_system() && self.oracle.uses_module_system()
    }

    pub fn unnamed_module(&self) -> ModuleId {
        self.unnamed
    }

    pub fn module(&self, id: ModuleId) -> &ModuleBinding {
        &self.modules[id.index()]
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut ModuleBinding {
        &mut self.modules[id.index()]
    }

    pub fn module_named(&self, name: &ModuleName) -> Option<ModuleId> {
        if name.is_unnamed() {
            return Some(self.unnamed);
        }
        self.module_names.get(name).copied()
    }

    pub fn module_env(&mut self, module: ModuleId) -> ModuleEnvironment<'_> {
        ModuleEnvironment { root: self, module }
    }

    pub(crate) fn add_module(&mut self, name: ModuleName, kind: ModuleKind, origin: ModuleOrigin) -> ModuleId {
        let id = ModuleId::from_index(self.modules.len());
        let default_package = self.packages.add_plain(Vec::new(), id);
        if !name.is_unnamed() {
            self.module_names.insert(name.clone(), id);
        }
        self.modules
            .push(ModuleBinding::new(name, kind, origin, default_package));
        id
    }

    /// The oracle scope for queries made on behalf of `module`.
    pub(crate) fn lookup_name(&self, module: ModuleId) -> LookupModule<'_> {
        let binding = self.module(module);
        if binding.is_unnamed() {
            LookupModule::Any
        } else {
            LookupModule::Named(&binding.name)
        }
    }

    pub(crate) fn report(&self, kind: ProblemKind) {
        tracing::debug!(target: "tern.lookup", problem = ?kind, "problem reported");
        self.reporter.report(Problem {
            kind,
            unit: self.session.unit_being_completed,
        });
    }

    pub(crate) fn report_missing_type(&mut self, compound_name: &[String]) {
        if self.session.reported_missing.insert(compound_name.to_vec()) {
            self.report(ProblemKind::IsClassPathCorrect {
                compound_name: compound_name.to_vec(),
            });
        }
    }

    fn module_of_answer(&mut self, answer: &NameEnvironmentAnswer, default: ModuleId) -> ModuleId {
        match &answer.module_name {
            Some(name) if !name.is_unnamed() => self.get_module(name).unwrap_or(default),
            Some(_) => self.unnamed,
            None => default,
        }
    }

    /// Asks `others` in order and `client` last; an unnamed client makes a single
    /// query against any module.
    fn ask_modules<F>(
        &mut self,
        client: Option<ModuleId>,
        others: &[ModuleId],
        mut query: F,
    ) -> Vec<(NameEnvironmentAnswer, ModuleId)>
    where
        F: FnMut(&mut Self, ModuleId) -> Option<NameEnvironmentAnswer>,
    {
        if let Some(client) = client.filter(|c| self.module(*c).is_unnamed()) {
            let Some(answer) = query(self, client) else {
                return Vec::new();
            };
            let module = self.module_of_answer(&answer, self.unnamed);
            return vec![(answer, module)];
        }
        let mut answers = Vec::new();
        for other in others {
            if let Some(answer) = query(self, *other) {
                let module = self.module_of_answer(&answer, *other);
                answers.push((answer, module));
            }
        }
        if let Some(client) = client {
            if let Some(answer) = query(self, client) {
                let module = self.module_of_answer(&answer, client);
                answers.push((answer, module));
            }
        }
        answers
    }

    /// Installs one oracle answer. Binary types land in `package` (computed from the
    /// answering module when `None`).
    fn accept_answer(
        &mut self,
        answer: &NameEnvironmentAnswer,
        module: ModuleId,
        compound_name: &[String],
        package: Option<PackageId>,
    ) -> Result<()> {
        let requestor = self.requestor.clone();
        let restriction = answer.access_restriction.clone();
        match &answer.kind {
            AnswerKind::Binary(binary) => {
                let package =
                    package.unwrap_or_else(|| self.compute_package_from(module, compound_name, false));
                requestor.accept_binary_type(self, binary, package, restriction)?;
            }
            AnswerKind::SourceUnit(unit) => {
                requestor.accept_source_unit(self, unit.clone(), module, restriction)?;
            }
            AnswerKind::CompilationUnit(source) => {
                requestor.accept_compilation_unit(self, source, module, restriction)?;
            }
            AnswerKind::Resolved(_) => {}
        }
        Ok(())
    }

    /// Asks the oracle for `compound_name` on behalf of `client`, installs every
    /// answer and combines the results.
    pub fn ask_for_type(&mut self, compound_name: &[String], client: ModuleId) -> Result<Option<TypeId>> {
        tracing::debug!(target: "tern.lookup", name = %compound_name.join("."), client = ?client, "asking oracle for type");
        let oracle = self.oracle.clone();
        let answers = if self.uses_module_system() {
            let required = self.all_required_modules(client);
            self.ask_modules(Some(client), &required, |env, module| {
                oracle.find_type(compound_name, env.lookup_name(module))
            })
        } else {
            oracle
                .find_type(compound_name, LookupModule::Any)
                .map(|answer| (answer, self.unnamed))
                .into_iter()
                .collect()
        };
        let mut candidate = None;
        for (answer, module) in answers {
            if let AnswerKind::Resolved(ty) = answer.kind {
                candidate = self.combine(candidate, Some(ty), client);
                continue;
            }
            self.accept_answer(&answer, module, compound_name, None)?;
            let cached = self.get_cached_type(module, compound_name);
            candidate = self.combine(candidate, cached, client);
        }
        Ok(candidate)
    }

    /// Asks for the simple name `name` in `package` on behalf of `client`.
    pub fn ask_for_type_in_package(
        &mut self,
        package: PackageId,
        name: &str,
        client: ModuleId,
    ) -> Result<Option<TypeId>> {
        let package_name = self.packages.get(package).compound_name.clone();
        tracing::debug!(target: "tern.lookup", package = %package_name.join("."), name, "asking oracle for type in package");
        let oracle = self.oracle.clone();
        let answers = if self.uses_module_system() {
            let declaring = self.packages.declaring_modules(package);
            self.ask_modules(None, &declaring, |env, module| {
                env.from_split_or_oracle(module, package, name, &package_name)
            })
        } else {
            oracle
                .find_type_in_package(name, &package_name, LookupModule::Any)
                .map(|answer| (answer, self.packages.get(package).enclosing_module()))
                .into_iter()
                .collect()
        };
        let mut compound_name = package_name.clone();
        compound_name.push(name.to_string());
        let mut candidate = None;
        for (answer, module) in answers {
            if candidate.is_some_and(|c| self.is_ambiguous(c)) {
                return Ok(candidate);
            }
            let answer_package = if self.uses_module_system() {
                match self.packages.get_incarnation(package, module) {
                    Some(incarnation) => incarnation,
                    None => continue,
                }
            } else {
                package
            };
            if let AnswerKind::Resolved(ty) = answer.kind {
                candidate = self.combine(candidate, Some(ty), client);
                continue;
            }
            self.accept_answer(&answer, module, &compound_name, Some(answer_package))?;
            let known = self.type0(answer_package, name).and_then(Known::found);
            candidate = self.combine(candidate, known, client);
        }
        Ok(candidate)
    }

    fn from_split_or_oracle(
        &mut self,
        module: ModuleId,
        package: PackageId,
        name: &str,
        package_name: &[String],
    ) -> Option<NameEnvironmentAnswer> {
        if self.packages.get(package).is_split() {
            if let Some(incarnation) = self.packages.get_incarnation(package, module) {
                if let Some(Known::Found(ty)) = self.packages.get(incarnation).known_type(name) {
                    let ty = self.resolve_type(ty, false).unwrap_or(ty);
                    let valid = self
                        .types
                        .class_of(ty)
                        .is_some_and(|c| !c.is_unresolved() && !c.is_missing());
                    if valid {
                        return Some(NameEnvironmentAnswer::resolved(
                            ty,
                            Some(self.module(module).name.clone()),
                        ));
                    }
                }
            }
        }
        let oracle = self.oracle.clone();
        oracle.find_type_in_package(name, package_name, self.lookup_name(module))
    }

    fn is_ambiguous(&self, ty: TypeId) -> bool {
        matches!(self.types.kind(ty), TypeKind::Problem(p) if p.reason == ProblemReason::Ambiguous)
    }

    fn package_of(&self, ty: TypeId) -> Option<PackageId> {
        self.types.class_of(ty).map(|class| class.package)
    }

    fn is_accessible_from(&mut self, ty: TypeId, client: ModuleId) -> bool {
        match self.package_of(ty) {
            Some(package) => self.can_access(client, package),
            None => false,
        }
    }

    /// Merges two candidates for one name as seen from `client`: an inaccessible
    /// candidate loses; two distinct accessible ones are ambiguous.
    pub fn combine(&mut self, one: Option<TypeId>, two: Option<TypeId>, client: ModuleId) -> Option<TypeId> {
        let Some(one) = one else {
            return two;
        };
        let Some(two) = two else {
            return Some(one);
        };
        if !self.is_accessible_from(one, client) {
            return Some(two);
        }
        if !self.is_accessible_from(two, client) {
            return Some(one);
        }
        if one == two {
            return Some(one);
        }
        let compound_name = self
            .types
            .class_of(one)
            .map(|c| c.compound_name.clone())
            .unwrap_or_default();
        Some(self.types.add_problem(ProblemType {
            compound_name,
            closest_match: Some(one),
            reason: ProblemReason::Ambiguous,
        }))
    }

    /// The top-level type `compound_name` for `client`, asking the oracle on a cache miss.
    pub fn get_type(&mut self, client: ModuleId, compound_name: &[String]) -> Result<Option<TypeId>> {
        let Some((name, package_name)) = compound_name.split_last() else {
            return Ok(None);
        };
        let found = if package_name.is_empty() {
            let default = self.default_package(client);
            match self.type0(default, name) {
                Some(Known::Found(ty)) => Some(ty),
                Some(Known::NotFound) => return Ok(None),
                None => {
                    let collides = matches!(
                        self.module(client).known_packages.get(name.as_str()),
                        Some(Known::Found(_))
                    );
                    if collides {
                        return Ok(None);
                    }
                    let found = self.ask_for_type_in_package(default, name, client)?;
                    if found.is_none() {
                        self.add_not_found_type(default, name);
                    }
                    found
                }
            }
        } else {
            match self.cached_package(client, package_name) {
                Some(Known::NotFound) => return Ok(None),
                Some(Known::Found(package)) => match self.type0(package, name) {
                    Some(Known::Found(ty)) => Some(ty),
                    Some(Known::NotFound) => return Ok(None),
                    None => {
                        let found = self.ask_for_type_in_package(package, name, client)?;
                        if found.is_none() {
                            self.add_not_found_type(package, name);
                        }
                        found
                    }
                },
                None => self.ask_for_type(compound_name, client)?,
            }
        };
        let Some(found) = found else {
            return Ok(None);
        };
        let resolved = self.resolve_type(found, false)?;
        if self.types.class_of(resolved).is_some_and(|c| c.enclosing.is_some()) {
            return Ok(Some(self.types.add_problem(ProblemType {
                compound_name: compound_name.to_vec(),
                closest_match: Some(resolved),
                reason: ProblemReason::InternalNameProvided,
            })));
        }
        Ok(Some(resolved))
    }

    /// The package `package_name` cached for `client`, walking known levels only.
    fn cached_package(&self, client: ModuleId, package_name: &[String]) -> Option<Known<PackageId>> {
        let mut last = None;
        for end in 1..=package_name.len() {
            match self.module(client).known_packages.get(&package_name[..end].join(".")) {
                Some(Known::NotFound) => return Some(Known::NotFound),
                Some(found) => last = Some(*found),
                None => return None,
            }
        }
        last
    }

    /// `name` in `package` as seen from `client`; a failed oracle query is remembered.
    pub fn get_type_in_package(&mut self, client: ModuleId, package: PackageId, name: &str) -> Result<Option<TypeId>> {
        let found = match self.type0(package, name) {
            Some(Known::Found(ty)) => ty,
            Some(Known::NotFound) => return Ok(None),
            None => match self.ask_for_type_in_package(package, name, client)? {
                Some(ty) => ty,
                None => {
                    self.add_not_found_type(package, name);
                    return Ok(None);
                }
            },
        };
        self.resolve_type(found, false).map(Some)
    }

    /// The type `compound_name` if `client` already knows it, searching reachable
    /// modules on a miss. Never asks the oracle.
    pub fn get_cached_type(&mut self, client: ModuleId, compound_name: &[String]) -> Option<TypeId> {
        if let Some(Known::Found(ty)) = self.get_cached_type0(client, compound_name) {
            return Some(ty);
        }
        if !self.uses_module_system() {
            return None;
        }
        let others: Vec<ModuleId> = if self.module(client).is_unnamed() || self.module(client).is_automatic() {
            (0..self.modules.len()).map(ModuleId::from_index).collect()
        } else {
            self.all_required_modules(client)
        };
        others
            .into_iter()
            .filter(|m| *m != client)
            .find_map(|m| self.get_cached_type0(m, compound_name).and_then(Known::found))
            .filter(|ty| !self.types.is_problem(*ty))
    }

    /// Cache lookup in `module` alone; a split package is narrowed to the module's
    /// own incarnation.
    pub(crate) fn get_cached_type0(&mut self, module: ModuleId, compound_name: &[String]) -> Option<Known<TypeId>> {
        let (name, package_name) = compound_name.split_last()?;
        let package = if package_name.is_empty() {
            self.default_package(module)
        } else {
            let key = package_name.join(".");
            let binding = self.module(module);
            match binding.known_packages.get(&key) {
                Some(Known::Found(package)) => *package,
                Some(Known::NotFound) => return None,
                None => *binding.declared_packages.get(&key)?,
            }
        };
        let package = if self.packages.get(package).is_split() {
            self.packages.get_incarnation(package, module)?
        } else {
            package
        };
        self.type0(package, name)
    }

    /// The binding for a name read from a binary signature. Never asks the oracle:
    /// an unknown name becomes an unresolved placeholder in its package.
    pub fn get_type_from_compound_name(
        &mut self,
        module: ModuleId,
        compound_name: &[String],
        is_parameterized: bool,
        was_missing: bool,
    ) -> Result<TypeId> {
        let Some(name) = compound_name.last() else {
            return Err(crate::problem::AbortCompilation::ClasspathMisconfiguration(String::new()));
        };
        let mut binding = self.get_cached_type0(module, compound_name);
        if binding.is_none() {
            binding = self.get_cached_type(module, compound_name).map(Known::Found);
        }
        let package = match binding {
            Some(_) => None,
            None => {
                let package = self.compute_package_from(module, compound_name, false);
                if self.uses_module_system() {
                    binding = self.type0(package, name);
                }
                Some(package)
            }
        };
        let ty = match binding {
            Some(Known::Found(ty)) => ty,
            Some(Known::NotFound) => {
                if !was_missing {
                    self.report_missing_type(compound_name);
                }
                return Ok(self.create_missing_type(package, compound_name, module));
            }
            None => {
                let package = package.unwrap_or_else(|| self.default_package(module));
                let owner = self.packages.get(package).enclosing_module();
                let mut class = ClassBinding::skeleton(
                    compound_name.to_vec(),
                    package,
                    owner,
                    ClassOrigin::Unresolved { was_missing },
                );
                class.source_name = name.rsplit('$').next().unwrap_or(name).to_string();
                let ty = self.types.add_class(class);
                self.add_type_to_package(package, name, ty);
                tracing::trace!(target: "tern.lookup", name = %compound_name.join("."), "unresolved placeholder created");
                return Ok(ty);
            }
        };
        if is_parameterized {
            Ok(ty)
        } else {
            Ok(self.convert_unresolved_binary_to_raw_type(ty))
        }
    }

    /// A stand-in for a type the oracle cannot find. Its superclass is
    /// `java.lang.Object`, itself missing when absent. An unresolved placeholder of
    /// the same name is turned into the missing type in place.
    pub fn create_missing_type(
        &mut self,
        package: Option<PackageId>,
        compound_name: &[String],
        module: ModuleId,
    ) -> TypeId {
        let package = package.unwrap_or_else(|| self.compute_package_from(module, compound_name, true));
        let name = compound_name.last().cloned().unwrap_or_default();
        if let Some(Known::Found(existing)) = self.packages.get(package).known_type(&name) {
            if self.types.class_of(existing).is_some_and(|c| c.is_missing()) {
                return existing;
            }
        }
        let owner = self.packages.get(package).enclosing_module();
        let mut class = ClassBinding::skeleton(compound_name.to_vec(), package, owner, ClassOrigin::Missing);
        let is_object = compound_name == ["java", "lang", "Object"];
        let placeholder = match self.packages.get(package).known_type(&name) {
            Some(Known::Found(existing))
                if self.types.class_of(existing).is_some_and(|c| c.is_unresolved()) =>
            {
                Some(existing)
            }
            _ => None,
        };
        let ty = match placeholder {
            Some(existing) => {
                self.types.redefine_class(existing, class.clone());
                existing
            }
            None => self.types.add_class(class.clone()),
        };
        self.add_type_to_package(package, &name, ty);
        self.session.missing_types.push(ty);
        tracing::debug!(target: "tern.lookup", name = %compound_name.join("."), "missing type created");
        if !is_object {
            let object = self.java_lang_object(module);
            class.superclass = Some(object);
            class.hierarchy = crate::binding::HierarchyState::Connected;
            self.types.redefine_class(ty, class);
        }
        ty
    }

    pub(crate) fn java_lang_object(&mut self, module: ModuleId) -> TypeId {
        self.well_known_type(module, &["java", "lang", "Object"])
    }

    /// A platform type looked up from `java.base` (or `module` when there is no base
    /// module); reported once and replaced by a missing type when absent.
    pub(crate) fn well_known_type(&mut self, module: ModuleId, name: &[&str]) -> TypeId {
        let compound: Vec<String> = name.iter().map(|s| s.to_string()).collect();
        let base = self.java_base_module().unwrap_or(module);
        match self.get_type(base, &compound) {
            Ok(Some(ty)) if !self.types.is_problem(ty) => ty,
            _ => {
                self.report_missing_type(&compound);
                self.create_missing_type(None, &compound, base)
            }
        }
    }

    pub fn is_missing_type(&self, compound_name: &[String]) -> bool {
        self.session.missing_types.iter().any(|ty| {
            self.types
                .class_of(*ty)
                .is_some_and(|c| c.compound_name == compound_name)
        })
    }

    pub fn missing_types(&self) -> &[TypeId] {
        &self.session.missing_types
    }

    /// Replaces unresolved placeholders reachable from `ty` with real or missing types.
    pub fn resolve_type(&mut self, ty: TypeId, convert_generic_to_raw: bool) -> Result<TypeId> {
        match self.types.kind(ty).clone() {
            TypeKind::Class(_) => {
                let resolved = self.resolve_class(ty)?;
                if convert_generic_to_raw {
                    Ok(self.convert_unresolved_binary_to_raw_type(resolved))
                } else {
                    Ok(resolved)
                }
            }
            TypeKind::Parameterized {
                generic,
                arguments,
                enclosing,
            } => {
                let new_generic = self.resolve_class(generic)?;
                let mut new_arguments = Vec::with_capacity(arguments.len());
                for argument in &arguments {
                    new_arguments.push(self.resolve_type(*argument, false)?);
                }
                let new_enclosing = match enclosing {
                    Some(e) => Some(self.resolve_type(e, false)?),
                    None => None,
                };
                if new_generic == generic && new_arguments == arguments && new_enclosing == enclosing {
                    return Ok(ty);
                }
                let top = self.types.get(ty).top_annotations().to_vec();
                Ok(self
                    .types
                    .parameterized_type(new_generic, &new_arguments, new_enclosing, &top))
            }
            TypeKind::Raw { generic, enclosing } => {
                let new_generic = self.resolve_class(generic)?;
                let new_enclosing = match enclosing {
                    Some(e) => Some(self.resolve_type(e, false)?),
                    None => None,
                };
                if new_generic == generic && new_enclosing == enclosing {
                    return Ok(ty);
                }
                let top = self.types.get(ty).top_annotations().to_vec();
                Ok(self.types.raw_type(new_generic, new_enclosing, &top))
            }
            TypeKind::Array { leaf, dimensions } => {
                let new_leaf = self.resolve_type(leaf, convert_generic_to_raw)?;
                if new_leaf == leaf {
                    return Ok(ty);
                }
                let levels = self.types.get(ty).annotations.clone();
                Ok(self.types.array_type(new_leaf, dimensions, &levels))
            }
            TypeKind::Wildcard {
                generic,
                rank,
                bound,
                other_bounds,
                kind,
            } => {
                let new_bound = match bound {
                    Some(b) => Some(self.resolve_type(b, false)?),
                    None => None,
                };
                if new_bound == bound {
                    return Ok(ty);
                }
                let top = self.types.get(ty).top_annotations().to_vec();
                Ok(self
                    .types
                    .wildcard(generic, rank, new_bound, &other_bounds, kind, &top))
            }
            _ => Ok(ty),
        }
    }

    fn resolve_class(&mut self, ty: TypeId) -> Result<TypeId> {
        let plain = self.types.unannotated(ty);
        if let Some(forward) = self.session.resolved_placeholders.get(&plain).copied() {
            let levels = self.types.get(ty).annotations.clone();
            return Ok(self.types.annotated_type(forward, &levels));
        }
        let Some(class) = self.types.class_of(plain) else {
            return Ok(ty);
        };
        let ClassOrigin::Unresolved { was_missing } = class.origin else {
            return Ok(ty);
        };
        let package = class.package;
        let compound_name = class.compound_name.clone();
        let module = class.module;
        let name = compound_name.last().cloned().unwrap_or_default();

        let mut target = match self.type0(package, &name) {
            Some(Known::Found(found)) if found != plain => Some(found),
            _ => None,
        };
        if target.is_none() {
            target = match self.packages.get(package).kind.clone() {
                PackageKind::Split { client, .. } => self.ask_for_type_in_package(package, &name, client)?,
                PackageKind::Plain { .. } => self.ask_for_type(&compound_name, module)?,
            };
        }
        let still_unresolved = self.types.class_of(plain).is_some_and(|c| c.is_unresolved());
        if !still_unresolved {
            return Ok(ty);
        }
        let target = target.filter(|t| self.types.unannotated(*t) != plain);
        match target {
            Some(found) => {
                self.session.resolved_placeholders.insert(plain, found);
                let levels = self.types.get(ty).annotations.clone();
                Ok(self.types.annotated_type(found, &levels))
            }
            None => {
                if !was_missing {
                    self.report_missing_type(&compound_name);
                }
                self.create_missing_type(Some(package), &compound_name, module);
                Ok(ty)
            }
        }
    }

    /// Resolves a qualified type name on behalf of `client`, classifying failures:
    /// inaccessible packages give `NotAccessible`, types only known in modules the
    /// client does not read give `NotVisible`, and names nobody knows give a missing
    /// type (reported once).
    pub fn resolve_qualified_type(&mut self, client: ModuleId, compound_name: &[String]) -> Result<TypeId> {
        let result = match self.find_qualified_type(client, compound_name)? {
            Some(found) => found,
            None => {
                self.report_missing_type(compound_name);
                self.create_missing_type(None, compound_name, client)
            }
        };
        let resolved = !self.types.is_problem(result)
            && self.types.class_of(result).map_or(true, |c| !c.is_missing());
        self.listeners.notify(compound_name, resolved);
        Ok(result)
    }

    /// Like [`Self::resolve_qualified_type`], but `None` when nothing is known about
    /// the name anywhere.
    pub(crate) fn find_qualified_type(
        &mut self,
        client: ModuleId,
        compound_name: &[String],
    ) -> Result<Option<TypeId>> {
        if let Some(found) = self.get_type(client, compound_name)? {
            if self.types.is_problem(found) {
                return Ok(Some(found));
            }
            if let Some(package) = self.package_of(found) {
                if !self.can_access(client, package) {
                    return Ok(Some(self.problem(
                        compound_name,
                        Some(found),
                        ProblemReason::NotAccessible,
                    )));
                }
            }
            return Ok(Some(found));
        }

        // member types: the longest resolvable prefix, then member lookups
        for split in (2..compound_name.len()).rev() {
            if let Some(outer) = self.get_type(client, &compound_name[..split])? {
                if self.types.is_problem(outer) {
                    continue;
                }
                if let Some(member) = self.member_type_path(outer, &compound_name[split..])? {
                    return Ok(Some(member));
                }
            }
        }

        let Some(elsewhere) = self.find_in_other_modules(client, compound_name)? else {
            return Ok(None);
        };
        let owner = self.types.class_of(elsewhere).map(|c| c.module);
        let reads = match owner {
            Some(owner) => {
                owner == client
                    || self.module(client).is_unnamed()
                    || self.module(client).is_automatic()
                    || self.all_required_modules(client).contains(&owner)
            }
            None => false,
        };
        let reason = if reads {
            ProblemReason::NotAccessible
        } else {
            ProblemReason::NotVisible
        };
        Ok(Some(self.problem(compound_name, Some(elsewhere), reason)))
    }

    fn find_in_other_modules(&mut self, client: ModuleId, compound_name: &[String]) -> Result<Option<TypeId>> {
        for index in 0..self.modules.len() {
            let module = ModuleId::from_index(index);
            if let Some(Known::Found(ty)) = self.get_cached_type0(module, compound_name) {
                let valid = self
                    .types
                    .class_of(ty)
                    .is_some_and(|c| !c.is_missing() && !c.is_unresolved());
                if valid {
                    return Ok(Some(ty));
                }
            }
        }
        if !self.uses_module_system() || self.module(client).is_unnamed() {
            return Ok(None);
        }
        let oracle = self.oracle.clone();
        let Some(answer) = oracle.find_type(compound_name, LookupModule::AnyNamed) else {
            return Ok(None);
        };
        let module = self.module_of_answer(&answer, client);
        if let AnswerKind::Resolved(ty) = answer.kind {
            return Ok(Some(ty));
        }
        self.accept_answer(&answer, module, compound_name, None)?;
        Ok(self
            .get_cached_type0(module, compound_name)
            .and_then(Known::found))
    }

    pub(crate) fn member_type_path(&mut self, outer: TypeId, names: &[String]) -> Result<Option<TypeId>> {
        let mut current = outer;
        for name in names {
            match self.member_type(current, name)? {
                Some(member) => current = member,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// The member type `name` declared directly in `ty`.
    pub fn member_type(&mut self, ty: TypeId, name: &str) -> Result<Option<TypeId>> {
        let ty = self.resolve_type(ty, false)?;
        let Some(declaration) = self.types.declaration_of(ty) else {
            return Ok(None);
        };
        let members = match self.types.class_of(declaration) {
            Some(class) => class.member_types.clone(),
            None => return Ok(None),
        };
        for member in members {
            let member = self.resolve_type(member, false)?;
            if self.types.class_of(member).is_some_and(|c| c.source_name == name) {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    pub(crate) fn problem(
        &mut self,
        compound_name: &[String],
        closest_match: Option<TypeId>,
        reason: ProblemReason,
    ) -> TypeId {
        self.types.add_problem(ProblemType {
            compound_name: compound_name.to_vec(),
            closest_match,
            reason,
        })
    }

    /// Reports `ty` when it is a problem binding found for `name`.
    pub(crate) fn report_type_problem(&self, ty: TypeId) {
        let TypeKind::Problem(problem) = self.types.kind(ty) else {
            return;
        };
        let name = problem.compound_name.join(".");
        let kind = match problem.reason {
            ProblemReason::NotFound | ProblemReason::InternalNameProvided => {
                ProblemKind::TypeNotFound { name }
            }
            ProblemReason::NotVisible | ProblemReason::InheritedNameHidesEnclosingName => {
                ProblemKind::TypeNotVisible { name }
            }
            ProblemReason::Ambiguous => ProblemKind::AmbiguousType { name },
            ProblemReason::NotAccessible => {
                let module = problem
                    .closest_match
                    .and_then(|c| self.types.class_of(c))
                    .map(|c| self.module(c.module).name.clone())
                    .unwrap_or_else(ModuleName::unnamed);
                ProblemKind::TypeNotAccessible { name, module }
            }
        };
        self.report(kind);
    }
}

/// The root environment seen from one module.
pub struct ModuleEnvironment<'a> {
    root: &'a mut LookupEnvironment,
    module: ModuleId,
}

impl<'a> ModuleEnvironment<'a> {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn root(&mut self) -> &mut LookupEnvironment {
        self.root
    }

    pub fn get_type(&mut self, compound_name: &[String]) -> Result<Option<TypeId>> {
        self.root.get_type(self.module, compound_name)
    }

    pub fn get_cached_type(&mut self, compound_name: &[String]) -> Option<TypeId> {
        self.root.get_cached_type(self.module, compound_name)
    }

    pub fn ask_for_type(&mut self, compound_name: &[String]) -> Result<Option<TypeId>> {
        self.root.ask_for_type(compound_name, self.module)
    }

    pub fn resolve_qualified_type(&mut self, compound_name: &[String]) -> Result<TypeId> {
        self.root.resolve_qualified_type(self.module, compound_name)
    }

    pub fn get_visible_package(&mut self, compound_name: &[String]) -> Option<PackageId> {
        self.root.get_visible_package(self.module, compound_name)
    }

    pub fn resolve_package(&mut self, compound_name: &[String]) -> PackageLookup {
        self.root.resolve_package(self.module, compound_name)
    }

    pub fn compute_package_from(&mut self, compound_type_name: &[String]) -> PackageId {
        self.root.compute_package_from(self.module, compound_type_name, false)
    }

    pub fn can_access(&mut self, package: PackageId) -> bool {
        self.root.can_access(self.module, package)
    }

    pub fn all_required_modules(&mut self) -> Vec<ModuleId> {
        self.root.all_required_modules(self.module)
    }

    pub fn get_type_from_compound_name(&mut self, compound_name: &[String], is_parameterized: bool) -> Result<TypeId> {
        self.root
            .get_type_from_compound_name(self.module, compound_name, is_parameterized, false)
    }

    pub fn create_missing_type(&mut self, compound_name: &[String]) -> TypeId {
        self.root.create_missing_type(None, compound_name, self.module)
    }
}
