//! Package graph: module-owned plain packages and the split views that combine them.
//!
//! A split view is interned by its sorted incarnation set and the client module it
//! was computed for, so combining the same incarnations in any order, any number of
//! times, yields the same [`PackageId`].

use std::collections::HashMap;

use crate::binding::{ModuleId, PackageId, TypeId};
use crate::environment::LookupEnvironment;
use crate::oracle::LookupModule;
use crate::problem::ProblemKind;

/// A cache entry that remembers negative answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Known<T> {
    Found(T),
    NotFound,
}

impl<T: Copy> Known<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Known::Found(value) => Some(value),
            Known::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageKind {
    Plain { module: ModuleId },
    Split {
        /// Sorted, deduplicated plain packages.
        incarnations: Vec<PackageId>,
        client: ModuleId,
    },
}

#[derive(Debug, Clone)]
pub struct PackageBinding {
    pub compound_name: Vec<String>,
    pub kind: PackageKind,
    pub(crate) known_types: HashMap<String, Known<TypeId>>,
}

impl PackageBinding {
    pub fn qualified_name(&self) -> String {
        self.compound_name.join(".")
    }

    pub fn is_default(&self) -> bool {
        self.compound_name.is_empty()
    }

    pub fn is_split(&self) -> bool {
        matches!(self.kind, PackageKind::Split { .. })
    }

    /// The owning module for a plain package, the client for a split view.
    pub fn enclosing_module(&self) -> ModuleId {
        match &self.kind {
            PackageKind::Plain { module } => *module,
            PackageKind::Split { client, .. } => *client,
        }
    }

    pub fn known_type(&self, name: &str) -> Option<Known<TypeId>> {
        self.known_types.get(name).copied()
    }
}

/// Arena of packages plus the split-view interner.
#[derive(Debug, Default)]
pub struct Packages {
    packages: Vec<PackageBinding>,
    splits: HashMap<(Vec<PackageId>, ModuleId), PackageId>,
}

impl Packages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, id: PackageId) -> &PackageBinding {
        &self.packages[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: PackageId) -> &mut PackageBinding {
        &mut self.packages[id.index()]
    }

    pub(crate) fn add_plain(&mut self, compound_name: Vec<String>, module: ModuleId) -> PackageId {
        let id = PackageId::from_index(self.packages.len());
        self.packages.push(PackageBinding {
            compound_name,
            kind: PackageKind::Plain { module },
            known_types: HashMap::new(),
        });
        id
    }

    /// The plain packages behind `id`: itself, or a split's incarnations.
    pub fn incarnations(&self, id: PackageId) -> Vec<PackageId> {
        match &self.get(id).kind {
            PackageKind::Plain { .. } => vec![id],
            PackageKind::Split { incarnations, .. } => incarnations.clone(),
        }
    }

    /// The incarnation of `id` owned by `module`, if any.
    pub fn get_incarnation(&self, id: PackageId, module: ModuleId) -> Option<PackageId> {
        self.incarnations(id)
            .into_iter()
            .find(|p| self.get(*p).enclosing_module() == module)
    }

    pub fn is_declared_in(&self, id: PackageId, module: ModuleId) -> bool {
        self.get_incarnation(id, module).is_some()
    }

    pub fn declaring_modules(&self, id: PackageId) -> Vec<ModuleId> {
        self.incarnations(id)
            .into_iter()
            .map(|p| self.get(p).enclosing_module())
            .collect()
    }

    /// `a` covers every incarnation of `b`.
    pub fn subsumes(&self, a: PackageId, b: PackageId) -> bool {
        if a == b {
            return true;
        }
        match &self.get(a).kind {
            PackageKind::Plain { .. } => false,
            PackageKind::Split { incarnations, .. } => self
                .incarnations(b)
                .iter()
                .all(|p| incarnations.binary_search(p).is_ok()),
        }
    }

    /// The split view of `parts` (plain or split) for `client`.
    pub fn split(&mut self, parts: &[PackageId], client: ModuleId) -> PackageId {
        let mut incarnations: Vec<PackageId> =
            parts.iter().flat_map(|p| self.incarnations(*p)).collect();
        incarnations.sort();
        incarnations.dedup();
        if let [single] = incarnations.as_slice() {
            return *single;
        }
        let key = (incarnations.clone(), client);
        if let Some(existing) = self.splits.get(&key) {
            return *existing;
        }
        let compound_name = incarnations
            .first()
            .map(|p| self.get(*p).compound_name.clone())
            .unwrap_or_default();
        let id = PackageId::from_index(self.packages.len());
        self.packages.push(PackageBinding {
            compound_name,
            kind: PackageKind::Split {
                incarnations,
                client,
            },
            known_types: HashMap::new(),
        });
        self.splits.insert(key, id);
        tracing::trace!(target: "tern.lookup", package = ?id, "split package created");
        id
    }

    /// Merges `binding` into `previous` for `client`.
    ///
    /// Rank: absent < not found < valid; the higher rank wins. Two valid packages
    /// merge into a split view unless one already subsumes the other.
    pub fn combine(
        &mut self,
        binding: Option<Known<PackageId>>,
        previous: Option<Known<PackageId>>,
        client: ModuleId,
    ) -> Option<Known<PackageId>> {
        fn rank(p: Option<Known<PackageId>>) -> i8 {
            match p {
                None => -1,
                Some(Known::NotFound) => 0,
                Some(Known::Found(_)) => 1,
            }
        }
        let (prev_rank, cur_rank) = (rank(previous), rank(binding));
        if prev_rank < cur_rank {
            return binding;
        }
        if prev_rank > cur_rank {
            return previous;
        }
        match (binding, previous) {
            (Some(Known::Found(cur)), Some(Known::Found(prev))) => {
                if self.subsumes(prev, cur) {
                    previous
                } else if self.subsumes(cur, prev) {
                    binding
                } else {
                    Some(Known::Found(self.split(&[prev, cur], client)))
                }
            }
            _ => previous,
        }
    }
}

/// Result of resolving a package name for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageLookup {
    Package(PackageId),
    /// Several readable modules contribute compilation units to the package.
    Ambiguous(PackageId),
    NotFound,
}

impl LookupEnvironment {
    pub fn package(&self, id: PackageId) -> &PackageBinding {
        self.packages.get(id)
    }

    pub fn packages(&self) -> &Packages {
        &self.packages
    }

    pub fn default_package(&self, module: ModuleId) -> PackageId {
        self.module(module).default_package
    }

    pub(crate) fn add_type_to_package(&mut self, package: PackageId, name: &str, ty: TypeId) {
        self.packages
            .get_mut(package)
            .known_types
            .insert(name.to_string(), Known::Found(ty));
    }

    pub(crate) fn add_not_found_type(&mut self, package: PackageId, name: &str) {
        self.packages
            .get_mut(package)
            .known_types
            .entry(name.to_string())
            .or_insert(Known::NotFound);
    }

    /// The declared plain package `compound_name` of `module`. A package the oracle
    /// reports as declared by `module` is created on first request.
    pub fn declared_package(&mut self, module: ModuleId, compound_name: &[String]) -> Option<PackageId> {
        if compound_name.is_empty() {
            return Some(self.default_package(module));
        }
        let key = compound_name.join(".");
        if let Some(existing) = self.module(module).declared_packages.get(&key) {
            return Some(*existing);
        }
        if !self.uses_module_system() {
            return None;
        }
        let name = self.module(module).name.clone();
        let oracle = self.oracle.clone();
        let declaring = oracle.modules_declaring_package(compound_name, self.lookup_name(module));
        if declaring.contains(&name) {
            Some(self.get_or_create_declared_package(module, compound_name))
        } else {
            None
        }
    }

    pub(crate) fn get_or_create_declared_package(
        &mut self,
        module: ModuleId,
        compound_name: &[String],
    ) -> PackageId {
        if compound_name.is_empty() {
            return self.default_package(module);
        }
        let key = compound_name.join(".");
        if let Some(existing) = self.module(module).declared_packages.get(&key) {
            return *existing;
        }
        if compound_name.len() > 1 {
            self.get_or_create_declared_package(module, &compound_name[..compound_name.len() - 1]);
        }
        let id = self.packages.add_plain(compound_name.to_vec(), module);
        let binding = self.module_mut(module);
        binding.declared_packages.insert(key.clone(), id);
        binding.known_packages.entry(key).or_insert(Known::Found(id));
        tracing::trace!(target: "tern.lookup", package = %compound_name.join("."), module = ?module, "declared package created");
        id
    }

    /// One step of a visibility walk: `compound_name` as seen from `module`, assuming
    /// its parent is visible. Declared or read packages only; exports are not checked.
    fn visible_package_step(&mut self, module: ModuleId, compound_name: &[String]) -> Option<PackageId> {
        let key = compound_name.join(".");
        if let Some(known) = self.module(module).known_packages.get(&key) {
            return known.found();
        }
        let mut binding = self
            .declared_package(module, compound_name)
            .map(Known::Found);
        let mut declaring_names = None;
        if binding.is_none() {
            if self.uses_module_system() {
                let oracle = self.oracle.clone();
                let declaring =
                    oracle.modules_declaring_package(compound_name, self.lookup_name(module));
                let own_name = self.module(module).name.clone();
                if declaring.contains(&own_name) {
                    binding = Some(Known::Found(
                        self.get_or_create_declared_package(module, compound_name),
                    ));
                } else {
                    // visible but foreign
                    for name in &declaring {
                        let Some(declaring_module) = self.get_module(name) else {
                            continue;
                        };
                        if declaring_module == module {
                            continue;
                        }
                        let candidate = self
                            .declared_package(declaring_module, compound_name)
                            .map(Known::Found);
                        binding = self.packages.combine(candidate, binding, module);
                    }
                }
                declaring_names = Some(declaring);
            } else {
                let oracle = self.oracle.clone();
                if oracle.is_package(compound_name, LookupModule::Any) {
                    binding = Some(Known::Found(
                        self.get_or_create_declared_package(module, compound_name),
                    ));
                }
            }
        }
        let binding = self.combine_with_other_relevant_modules(
            module,
            binding,
            compound_name,
            declaring_names.as_deref(),
        );
        let result = binding.and_then(Known::found);
        self.module_mut(module)
            .known_packages
            .insert(key, result.map_or(Known::NotFound, Known::Found));
        result
    }

    fn combine_with_other_relevant_modules(
        &mut self,
        module: ModuleId,
        mut binding: Option<Known<PackageId>>,
        compound_name: &[String],
        declaring_names: Option<&[tern_modules::ModuleName]>,
    ) -> Option<Known<PackageId>> {
        let relevant: Vec<ModuleId> = match declaring_names {
            Some(names) if self.module(module).is_unnamed() => {
                names.iter().filter_map(|n| self.get_module(n)).collect()
            }
            _ => self.all_required_modules(module),
        };
        for other in relevant {
            if other == module || self.module(other).package_lookup_active {
                continue;
            }
            self.module_mut(other).package_lookup_active = true;
            let next = self.declared_package(other, compound_name).map(Known::Found);
            self.module_mut(other).package_lookup_active = false;
            binding = self.packages.combine(next, binding, module);
        }
        binding
    }

    /// `compound_name` as seen from `module`, walking one segment at a time.
    pub fn get_visible_package(&mut self, module: ModuleId, compound_name: &[String]) -> Option<PackageId> {
        if compound_name.is_empty() {
            return Some(self.default_package(module));
        }
        let mut current = None;
        for end in 1..=compound_name.len() {
            current = Some(self.visible_package_step(module, &compound_name[..end])?);
        }
        current
    }

    /// The package of the type named by `compound_type_name` (package segments plus the
    /// simple name), creating missing levels as declared packages of `module`.
    ///
    /// A split result is narrowed to its unique incarnation with compilation units;
    /// with several such incarnations the split view is returned.
    pub fn compute_package_from(
        &mut self,
        module: ModuleId,
        compound_type_name: &[String],
        is_missing: bool,
    ) -> PackageId {
        if compound_type_name.len() <= 1 {
            return self.default_package(module);
        }
        let package_name = &compound_type_name[..compound_type_name.len() - 1];
        let mut current = self.default_package(module);
        for end in 1..=package_name.len() {
            let prefix = &package_name[..end];
            let key = prefix.join(".");
            if let Some(Known::Found(cached)) = self.module(module).known_packages.get(&key).copied() {
                current = cached;
                continue;
            }
            let mut binding: Option<Known<PackageId>> = None;
            if self.uses_module_system() {
                if self.module(module).is_unnamed() {
                    let oracle = self.oracle.clone();
                    let declaring = oracle.modules_declaring_package(prefix, LookupModule::Any);
                    for name in &declaring {
                        let Some(declaring_module) = self.get_module(name) else {
                            continue;
                        };
                        let candidate = self
                            .get_visible_package(declaring_module, prefix)
                            .map(Known::Found);
                        binding = self.packages.combine(candidate, binding, module);
                    }
                } else {
                    binding = self.get_visible_package(module, prefix).map(Known::Found);
                }
            }
            current = match binding {
                Some(Known::Found(found)) => found,
                _ => self.get_or_create_declared_package(module, prefix),
            };
            if is_missing {
                tracing::debug!(target: "tern.lookup", package = %key, "package created for a missing type");
            }
            self.module_mut(module)
                .known_packages
                .insert(key, Known::Found(current));
        }

        if self.packages.get(current).is_split() {
            let mut candidate = None;
            for incarnation in self.packages.incarnations(current) {
                if self.has_compilation_unit(incarnation, false) {
                    if candidate.is_some() {
                        candidate = None;
                        break;
                    }
                    candidate = Some(incarnation);
                }
            }
            if let Some(candidate) = candidate {
                return candidate;
            }
        }
        current
    }

    /// Whether the package holds types, asking the oracle when nothing is cached yet.
    pub fn has_compilation_unit(&self, package: PackageId, check_cus: bool) -> bool {
        self.packages.incarnations(package).into_iter().any(|p| {
            let binding = self.packages.get(p);
            let has_known = binding.known_types.values().any(|known| match known {
                Known::Found(ty) => self
                    .types
                    .class_of(*ty)
                    .map_or(true, |class| !class.is_unresolved()),
                Known::NotFound => false,
            });
            has_known
                || (self.uses_module_system()
                    && self.oracle.has_compilation_unit(
                        &binding.compound_name,
                        &self.module(binding.enclosing_module()).name,
                        check_cus,
                    ))
        })
    }

    /// Creates (or finds) the plain package of a `package` declaration in `module`.
    /// Returns `None` when a segment collides with an existing type.
    pub fn create_plain_package(&mut self, module: ModuleId, compound_name: &[String]) -> Option<PackageId> {
        if compound_name.is_empty() {
            return Some(self.default_package(module));
        }
        let key = compound_name.join(".");
        if let Some(existing) = self.module(module).declared_packages.get(&key) {
            return Some(*existing);
        }
        let mut parent = self.get_or_create_declared_package(module, &compound_name[..1]);
        for end in 2..=compound_name.len() {
            let segment = &compound_name[end - 1];
            match self.packages.get(parent).known_type(segment) {
                Some(Known::Found(ty)) if !self.types.class_of(ty).is_some_and(|c| c.is_unresolved()) => {
                    return None;
                }
                _ => {}
            }
            let prefix = &compound_name[..end];
            if !self.module(module).declared_packages.contains_key(&prefix.join(".")) {
                let oracle = self.oracle.clone();
                let parent_name = &compound_name[..end - 1];
                if oracle
                    .find_type_in_package(segment, parent_name, self.lookup_name(module))
                    .is_some()
                {
                    return None;
                }
            }
            parent = self.get_or_create_declared_package(module, prefix);
        }
        Some(parent)
    }

    /// Resolves a package name for `client`, reporting packages contributed with
    /// compilation units by more than one readable module.
    pub fn resolve_package(&mut self, client: ModuleId, compound_name: &[String]) -> PackageLookup {
        let Some(package) = self.get_visible_package(client, compound_name) else {
            return PackageLookup::NotFound;
        };
        if !self.packages.get(package).is_split() {
            return PackageLookup::Package(package);
        }
        let with_units: Vec<PackageId> = self
            .packages
            .incarnations(package)
            .into_iter()
            .filter(|p| self.has_compilation_unit(*p, true))
            .collect();
        match with_units.as_slice() {
            [single] => PackageLookup::Package(*single),
            [] => PackageLookup::Package(package),
            many => {
                let modules = many
                    .iter()
                    .map(|p| self.module(self.packages.get(*p).enclosing_module()).name.clone())
                    .collect();
                self.report(ProblemKind::ConflictingPackageFromModules {
                    package: compound_name.join("."),
                    modules,
                });
                PackageLookup::Ambiguous(package)
            }
        }
    }

    /// The type `name` known in `package`, without asking the oracle.
    ///
    /// For a split view a valid type from an accessible incarnation wins; two such
    /// types are a conflict and yield nothing.
    pub(crate) fn type0(&mut self, package: PackageId, name: &str) -> Option<Known<TypeId>> {
        let binding = self.packages.get(package);
        let known = binding.known_type(name);
        let PackageKind::Split { incarnations, client } = binding.kind.clone() else {
            return known;
        };
        if let Some(Known::Found(ty)) = known {
            return Some(Known::Found(ty));
        }
        let mut candidate = None;
        let mut accessible = false;
        for incarnation in incarnations {
            let Some(next) = self.packages.get(incarnation).known_type(name) else {
                continue;
            };
            let valid = matches!(next, Known::Found(ty) if !self.types.is_problem(ty));
            if valid && self.can_access(client, incarnation) {
                if candidate.is_some() && accessible {
                    return None;
                }
                candidate = Some(next);
                accessible = true;
            } else if candidate.is_none() {
                candidate = Some(next);
            }
        }
        if let Some(Known::Found(ty)) = candidate {
            self.add_type_to_package(package, name, ty);
        }
        candidate
    }
}
