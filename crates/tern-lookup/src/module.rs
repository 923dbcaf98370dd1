//! Module bindings: the resolved form of module descriptors.
//!
//! Readability is computed from resolved `requires` edges; export and open checks
//! work on package incarnations so they agree with the split-package views built by
//! the package walks.

use std::collections::{HashMap, HashSet};

use tern_modules::{targets_admit, ModuleInfo, ModuleKind, ModuleName, ALL_UNNAMED, JAVA_BASE};

use crate::ast::split_dotted;
use crate::binding::{ModuleId, PackageId, TypeId, UnitId};
use crate::environment::LookupEnvironment;
use crate::package::Known;
use crate::problem::ProblemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    Unnamed,
    Binary,
    /// Declared by a `module-info` unit; `None` until that unit is built.
    Source(Option<UnitId>),
}

/// An `exports` or `opens` directive after its package was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
    pub package: PackageId,
    /// Empty for an unqualified directive. Names may refer to modules that never resolve.
    pub targets: Vec<ModuleName>,
}

impl PackageExport {
    fn admits(&self, client: &ModuleName) -> bool {
        targets_admit(&self.targets, client)
    }
}

#[derive(Debug, Clone)]
pub struct ModuleBinding {
    pub name: ModuleName,
    pub kind: ModuleKind,
    pub origin: ModuleOrigin,
    pub is_open: bool,
    pub requires: Vec<ModuleId>,
    pub requires_transitive: Vec<ModuleId>,
    pub exports: Vec<PackageExport>,
    pub opens: Vec<PackageExport>,
    pub uses: Vec<TypeId>,
    pub services: Vec<TypeId>,
    /// Service type to its providers.
    pub implementations: Vec<(TypeId, Vec<TypeId>)>,
    pub default_package: PackageId,
    pub(crate) declared_packages: HashMap<String, PackageId>,
    /// Packages as seen from this module, keyed by qualified name.
    pub(crate) known_packages: HashMap<String, Known<PackageId>>,
    pub(crate) required_cache: Option<Vec<ModuleId>>,
    /// Directives of a source module waiting for resolution.
    pub(crate) descriptor: Option<ModuleInfo>,
    pub(crate) directives_resolved: bool,
    pub(crate) services_resolved: bool,
    pub(crate) package_lookup_active: bool,
}

impl ModuleBinding {
    pub(crate) fn new(name: ModuleName, kind: ModuleKind, origin: ModuleOrigin, default_package: PackageId) -> Self {
        Self {
            name,
            kind,
            origin,
            is_open: false,
            requires: Vec::new(),
            requires_transitive: Vec::new(),
            exports: Vec::new(),
            opens: Vec::new(),
            uses: Vec::new(),
            services: Vec::new(),
            implementations: Vec::new(),
            default_package,
            declared_packages: HashMap::new(),
            known_packages: HashMap::new(),
            required_cache: None,
            descriptor: None,
            directives_resolved: false,
            services_resolved: false,
            package_lookup_active: false,
        }
    }

    pub fn is_unnamed(&self) -> bool {
        self.kind == ModuleKind::Unnamed
    }

    pub fn is_automatic(&self) -> bool {
        self.kind == ModuleKind::Automatic
    }

    pub fn declared_package_names(&self) -> impl Iterator<Item = &str> {
        self.declared_packages.keys().map(String::as_str)
    }
}

impl LookupEnvironment {
    /// Known module named `name`, or one the oracle can describe. The unnamed module
    /// answers for the empty name and `ALL-UNNAMED`.
    pub fn get_module(&mut self, name: &ModuleName) -> Option<ModuleId> {
        if name.is_unnamed() || name.as_str() == ALL_UNNAMED {
            return Some(self.unnamed);
        }
        if let Some(known) = self.module_names.get(name) {
            return Some(*known);
        }
        if !self.uses_module_system() {
            return Some(self.unnamed);
        }
        let oracle = self.oracle.clone();
        let info = oracle.get_module(name)?;
        tracing::debug!(target: "tern.modules", module = %name, "module descriptor loaded");
        let requestor = self.requestor.clone();
        Some(requestor.accept_module(self, &info))
    }

    /// `java.base`, when it resolves to a named module.
    pub fn java_base_module(&mut self) -> Option<ModuleId> {
        let base = self.get_module(&ModuleName::new(JAVA_BASE))?;
        (base != self.unnamed).then_some(base)
    }

    /// Registers a module read from a binary descriptor.
    pub fn create_binary_module(&mut self, info: &ModuleInfo) -> ModuleId {
        if let Some(existing) = self.module_names.get(&info.name) {
            return *existing;
        }
        let id = self.add_module(info.name.clone(), info.kind, ModuleOrigin::Binary);
        self.module_mut(id).is_open = info.is_open;
        self.apply_directives(id, info, None);
        for uses in &info.uses {
            let compound = split_dotted(&uses.service);
            if let Ok(service) = self.get_type_from_compound_name(id, &compound, false, false) {
                self.module_mut(id).uses.push(service);
            }
        }
        for provides in &info.provides {
            let compound = split_dotted(&provides.service);
            let Ok(service) = self.get_type_from_compound_name(id, &compound, false, false) else {
                continue;
            };
            let mut providers = Vec::new();
            for implementation in &provides.implementations {
                let compound = split_dotted(implementation);
                if let Ok(provider) = self.get_type_from_compound_name(id, &compound, false, false) {
                    providers.push(provider);
                }
            }
            let module = self.module_mut(id);
            module.services.push(service);
            module.implementations.push((service, providers));
        }
        let module = self.module_mut(id);
        module.directives_resolved = true;
        module.services_resolved = true;
        id
    }

    /// The source module a unit of `name` belongs to, created empty until its
    /// `module-info` unit arrives.
    pub(crate) fn source_module_named(&mut self, name: &ModuleName) -> ModuleId {
        if name.is_unnamed() {
            return self.unnamed;
        }
        if let Some(known) = self.module_names.get(name) {
            return *known;
        }
        self.add_module(name.clone(), ModuleKind::Explicit, ModuleOrigin::Source(None))
    }

    /// Binds a `module-info` unit. Directives are resolved later, when imports are
    /// checked, so every unit of the batch is known by then.
    pub(crate) fn define_source_module(&mut self, info: &ModuleInfo, unit: UnitId) -> ModuleId {
        let id = self.source_module_named(&info.name);
        let module = self.module_mut(id);
        module.kind = info.kind;
        module.origin = ModuleOrigin::Source(Some(unit));
        module.is_open = info.is_open;
        module.descriptor = Some(info.clone());
        module.directives_resolved = false;
        module.services_resolved = false;
        module.required_cache = None;
        id
    }

    /// Resolves `requires`, `exports` and `opens` of a source module once.
    pub(crate) fn complete_module_directives(&mut self, id: ModuleId) {
        if self.module(id).directives_resolved {
            return;
        }
        self.module_mut(id).directives_resolved = true;
        let Some(info) = self.module(id).descriptor.clone() else {
            return;
        };
        for error in info.validate() {
            self.report(ProblemKind::InvalidModuleDeclaration(error));
        }
        let unit = match self.module(id).origin {
            ModuleOrigin::Source(unit) => unit,
            _ => None,
        };
        self.apply_directives(id, &info, unit);
    }

    fn apply_directives(&mut self, id: ModuleId, info: &ModuleInfo, unit: Option<UnitId>) {
        for requires in &info.requires {
            match self.get_module(&requires.module) {
                Some(required) if required != id => {
                    let module = self.module_mut(id);
                    if !module.requires.contains(&required) {
                        module.requires.push(required);
                    }
                    if requires.is_transitive && !module.requires_transitive.contains(&required) {
                        module.requires_transitive.push(required);
                    }
                }
                Some(_) => {}
                None if unit.is_some() => {
                    self.report(ProblemKind::ModuleNotFound {
                        module: requires.module.clone(),
                    });
                }
                None => {
                    tracing::warn!(target: "tern.modules", module = %info.name, required = %requires.module, "required module not found");
                }
            }
        }
        for exports in &info.exports {
            let package = self.get_or_create_declared_package(id, &split_dotted(&exports.package));
            self.module_mut(id).exports.push(PackageExport {
                package,
                targets: exports.to.clone(),
            });
        }
        for opens in &info.opens {
            let package = self.get_or_create_declared_package(id, &split_dotted(&opens.package));
            self.module_mut(id).opens.push(PackageExport {
                package,
                targets: opens.to.clone(),
            });
        }
        self.module_mut(id).required_cache = None;
    }

    /// Resolves `uses` and `provides` of a source module to types.
    pub(crate) fn complete_module_services(&mut self, id: ModuleId) {
        if self.module(id).services_resolved {
            return;
        }
        self.module_mut(id).services_resolved = true;
        let Some(info) = self.module(id).descriptor.clone() else {
            return;
        };
        for uses in &info.uses {
            if let Some(service) = self.resolve_service(id, &uses.service) {
                self.module_mut(id).uses.push(service);
            }
        }
        for provides in &info.provides {
            let Some(service) = self.resolve_service(id, &provides.service) else {
                continue;
            };
            let providers = provides
                .implementations
                .iter()
                .filter_map(|name| self.resolve_service(id, name))
                .collect();
            let module = self.module_mut(id);
            module.services.push(service);
            module.implementations.push((service, providers));
        }
    }

    fn resolve_service(&mut self, module: ModuleId, name: &str) -> Option<TypeId> {
        let compound = split_dotted(name);
        let ty = match self.resolve_qualified_type(module, &compound) {
            Ok(ty) => ty,
            Err(abort) => {
                tracing::warn!(target: "tern.modules", service = %name, error = %abort, "service lookup aborted");
                return None;
            }
        };
        let usable = self
            .types
            .class_of(ty)
            .is_some_and(|class| !class.is_missing());
        if usable {
            Some(ty)
        } else {
            self.report(ProblemKind::ServiceNotFound {
                module: self.module(module).name.clone(),
                service: name.to_string(),
            });
            None
        }
    }

    /// Direct requires plus everything reachable through `requires transitive`, plus
    /// `java.base`. A module whose closure reaches itself gets an empty closure.
    pub fn all_required_modules(&mut self, id: ModuleId) -> Vec<ModuleId> {
        match self.module(id).kind {
            ModuleKind::Unnamed => return Vec::new(),
            ModuleKind::Automatic => {
                return (0..self.modules.len())
                    .map(ModuleId::from_index)
                    .filter(|m| *m != id && !self.module(*m).is_unnamed())
                    .collect();
            }
            ModuleKind::Explicit => {}
        }
        if let Some(cached) = &self.module(id).required_cache {
            return cached.clone();
        }
        let mut seen = HashSet::new();
        let mut closure = Vec::new();
        for required in self.module(id).requires.clone() {
            if seen.insert(required) {
                closure.push(required);
                self.collect_transitive(required, &mut seen, &mut closure);
            }
        }
        if seen.contains(&id) {
            let name = self.module(id).name.clone();
            tracing::warn!(target: "tern.modules", module = %name, "cyclic module dependency");
            self.report(ProblemKind::CyclicModuleDependency { module: name });
            self.module_mut(id).required_cache = Some(Vec::new());
            return Vec::new();
        }
        if !self.module(id).name.is_java_base() {
            if let Some(base) = self.java_base_module() {
                if !closure.contains(&base) {
                    closure.push(base);
                }
            }
        }
        self.module_mut(id).required_cache = Some(closure.clone());
        closure
    }

    fn collect_transitive(&self, from: ModuleId, seen: &mut HashSet<ModuleId>, out: &mut Vec<ModuleId>) {
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            for next in &self.module(current).requires_transitive {
                if seen.insert(*next) {
                    out.push(*next);
                    stack.push(*next);
                }
            }
        }
    }

    /// Whether `other` is re-exported by `id` through a chain of `requires transitive`.
    pub fn is_transitively_required(&self, id: ModuleId, other: ModuleId) -> bool {
        let mut seen = HashSet::new();
        let mut reached = Vec::new();
        self.collect_transitive(id, &mut seen, &mut reached);
        reached.contains(&other)
    }

    pub fn is_package_exported_to(&self, id: ModuleId, package: PackageId, client: ModuleId) -> bool {
        let Some(resolved) = self.packages.get_incarnation(package, id) else {
            return false;
        };
        let module = self.module(id);
        if module.is_automatic() || module.is_unnamed() {
            return self.packages.get(package).enclosing_module() == id
                && (module.is_automatic() || self.has_compilation_unit(resolved, true));
        }
        let client_name = &self.module(client).name;
        module
            .exports
            .iter()
            .any(|export| self.packages.subsumes(export.package, resolved) && export.admits(client_name))
    }

    pub fn is_package_opened_to(&self, id: ModuleId, package: PackageId, client: ModuleId) -> bool {
        let Some(resolved) = self.packages.get_incarnation(package, id) else {
            return false;
        };
        let module = self.module(id);
        if module.is_open || module.is_automatic() {
            return true;
        }
        let client_name = &self.module(client).name;
        module
            .opens
            .iter()
            .any(|open| self.packages.subsumes(open.package, resolved) && open.admits(client_name))
    }

    /// Whether code in `client` may use public types of `package`.
    pub fn can_access(&mut self, client: ModuleId, package: PackageId) -> bool {
        if self.module(client).is_unnamed() {
            return self.packages.incarnations(package).into_iter().any(|incarnation| {
                let owner = self.packages.get(incarnation).enclosing_module();
                owner == client || self.is_package_exported_to(owner, incarnation, client)
            });
        }
        if self.packages.is_declared_in(package, client) {
            return true;
        }
        self.all_required_modules(client)
            .into_iter()
            .any(|required| self.is_package_exported_to(required, package, client))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use tern_classfile::BinaryType;
    use tern_config::CompilerOptions;

    use super::*;
    use crate::memory::InMemoryNameEnvironment;
    use crate::oracle::DefaultRequestor;
    use crate::problem::CollectingReporter;

    fn env(oracle: InMemoryNameEnvironment) -> LookupEnvironment {
        LookupEnvironment::new(
            CompilerOptions::default(),
            Rc::new(oracle),
            Rc::new(DefaultRequestor),
            Rc::new(CollectingReporter::new()),
        )
    }

    #[test]
    fn qualified_targets_admit_listed_modules_only() {
        let export = PackageExport {
            package: PackageId::from_index(0),
            targets: vec![ModuleName::new("n")],
        };
        assert!(export.admits(&ModuleName::new("n")));
        assert!(!export.admits(&ModuleName::new("o")));
        assert!(!export.admits(&ModuleName::unnamed()));

        let to_unnamed = PackageExport {
            package: PackageId::from_index(0),
            targets: vec![ModuleName::new(ALL_UNNAMED)],
        };
        assert!(to_unnamed.admits(&ModuleName::unnamed()));
    }

    #[test]
    fn unnamed_clients_see_unqualified_and_all_unnamed_exports() {
        let mut oracle = InMemoryNameEnvironment::new();
        oracle
            .add_module(
                ModuleInfo::explicit("lib")
                    .with_exports("lib.api", &[])
                    .with_exports("lib.friends", &["app"])
                    .with_exports("lib.shared", &[ALL_UNNAMED]),
            )
            .add_binary(Some("lib"), BinaryType::new("lib/api/Service"))
            .add_binary(Some("lib"), BinaryType::new("lib/friends/Helper"))
            .add_binary(Some("lib"), BinaryType::new("lib/shared/Util"))
            .add_binary(Some("lib"), BinaryType::new("lib/internal/Impl"));
        let mut env = env(oracle);
        let unnamed = env.unnamed_module();
        let lib = env.get_module(&ModuleName::new("lib")).expect("lib is on the module path");

        let mut accessible = |name: &str| {
            let package = env
                .get_visible_package(lib, &split_dotted(name))
                .expect("lib declares the package");
            env.can_access(unnamed, package)
        };
        assert!(accessible("lib.api"));
        assert!(accessible("lib.shared"));
        assert!(!accessible("lib.friends"));
        assert!(!accessible("lib.internal"));

        let own = env
            .create_plain_package(unnamed, &split_dotted("local"))
            .expect("no type collides with the package");
        assert!(env.can_access(unnamed, own));
    }
}
