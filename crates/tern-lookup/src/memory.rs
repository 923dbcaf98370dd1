//! An oracle over in-memory class files and parsed units.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tern_classfile::BinaryType;
use tern_modules::{ModuleGraph, ModuleInfo, ModuleName};

use crate::ast::{split_dotted, CompilationUnit};
use crate::oracle::{AnswerKind, LookupModule, NameEnvironment, NameEnvironmentAnswer};

#[derive(Debug, Default)]
struct ModuleContents {
    /// Keyed by compound name; member types keep their binary simple name (`Map$Entry`).
    binaries: BTreeMap<Vec<String>, Rc<BinaryType>>,
    sources: BTreeMap<Vec<String>, Rc<CompilationUnit>>,
    /// Every declared package, parents included.
    packages: BTreeSet<Vec<String>>,
    /// Packages holding at least one type.
    packages_with_units: BTreeSet<Vec<String>>,
}

impl ModuleContents {
    fn declare_package(&mut self, package: &[String], with_units: bool) {
        for end in 1..=package.len() {
            self.packages.insert(package[..end].to_vec());
        }
        if with_units {
            self.packages_with_units.insert(package.to_vec());
        }
    }
}

/// Types, units and module descriptors registered up front. Content added without a
/// module name lands in the unnamed module.
#[derive(Debug)]
pub struct InMemoryNameEnvironment {
    uses_module_system: bool,
    graph: ModuleGraph,
    contents: BTreeMap<ModuleName, ModuleContents>,
    find_type_calls: Cell<usize>,
}

impl Default for InMemoryNameEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNameEnvironment {
    pub fn new() -> Self {
        Self {
            uses_module_system: true,
            graph: ModuleGraph::new(),
            contents: BTreeMap::new(),
            find_type_calls: Cell::new(0),
        }
    }

    /// A class-path-only oracle: module scoping of queries is ignored.
    pub fn without_module_system() -> Self {
        Self {
            uses_module_system: false,
            ..Self::new()
        }
    }

    pub fn add_module(&mut self, info: ModuleInfo) -> &mut Self {
        self.contents.entry(info.name.clone()).or_default();
        self.graph.insert(info);
        self
    }

    fn module_contents(&mut self, module: Option<&str>) -> &mut ModuleContents {
        let name = module.map(ModuleName::new).unwrap_or_else(ModuleName::unnamed);
        self.contents.entry(name).or_default()
    }

    pub fn add_binary(&mut self, module: Option<&str>, binary: BinaryType) -> &mut Self {
        let compound: Vec<String> = binary.internal_name.split('/').map(str::to_string).collect();
        let contents = self.module_contents(module);
        contents.declare_package(&compound[..compound.len() - 1], true);
        contents.binaries.insert(compound, Rc::new(binary));
        self
    }

    /// Registers a parsed unit under each of its top-level type names.
    pub fn add_source(&mut self, module: Option<&str>, unit: CompilationUnit) -> &mut Self {
        let package = unit.package.clone().unwrap_or_default();
        let names: Vec<String> = unit.types.iter().map(|t| t.name.clone()).collect();
        let unit = Rc::new(unit);
        let contents = self.module_contents(module);
        contents.declare_package(&package, true);
        for name in names {
            let mut compound = package.clone();
            compound.push(name);
            contents.sources.insert(compound, unit.clone());
        }
        self
    }

    /// Declares `package` (dotted) in `module` without adding any type to it.
    pub fn add_package(&mut self, module: Option<&str>, package: &str) -> &mut Self {
        self.module_contents(module).declare_package(&split_dotted(package), false);
        self
    }

    /// How many `find_type`/`find_type_in_package` queries reached this oracle.
    pub fn find_type_calls(&self) -> usize {
        self.find_type_calls.get()
    }

    fn matching<'a>(
        &'a self,
        module: LookupModule<'a>,
    ) -> impl Iterator<Item = (&'a ModuleName, &'a ModuleContents)> + 'a {
        let everywhere = !self.uses_module_system;
        self.contents
            .iter()
            .filter(move |(name, _)| everywhere || module.matches(name))
    }

    fn answer_module(name: &ModuleName) -> Option<ModuleName> {
        (!name.is_unnamed()).then(|| name.clone())
    }
}

impl NameEnvironment for InMemoryNameEnvironment {
    fn find_type(&self, compound_name: &[String], module: LookupModule<'_>) -> Option<NameEnvironmentAnswer> {
        self.find_type_calls.set(self.find_type_calls.get() + 1);
        self.matching(module).find_map(|(name, contents)| {
            let kind = if let Some(binary) = contents.binaries.get(compound_name) {
                AnswerKind::Binary(binary.clone())
            } else {
                AnswerKind::SourceUnit(contents.sources.get(compound_name)?.clone())
            };
            Some(NameEnvironmentAnswer {
                kind,
                module_name: Self::answer_module(name),
                access_restriction: None,
            })
        })
    }

    fn find_type_in_package(
        &self,
        name: &str,
        package: &[String],
        module: LookupModule<'_>,
    ) -> Option<NameEnvironmentAnswer> {
        let mut compound = package.to_vec();
        compound.push(name.to_string());
        self.find_type(&compound, module)
    }

    fn is_package(&self, package: &[String], module: LookupModule<'_>) -> bool {
        self.matching(module)
            .any(|(_, contents)| contents.packages.contains(package))
    }

    fn modules_declaring_package(&self, package: &[String], module: LookupModule<'_>) -> Vec<ModuleName> {
        self.matching(module)
            .filter(|(_, contents)| contents.packages.contains(package))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn has_compilation_unit(&self, package: &[String], module: &ModuleName, check_cus: bool) -> bool {
        self.contents.get(module).is_some_and(|contents| {
            if check_cus {
                contents.packages_with_units.contains(package)
            } else {
                contents.packages.contains(package)
            }
        })
    }

    fn get_module(&self, name: &ModuleName) -> Option<ModuleInfo> {
        self.graph.get(name).cloned()
    }

    fn uses_module_system(&self) -> bool {
        self.uses_module_system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dotted: &str) -> Vec<String> {
        split_dotted(dotted)
    }

    #[test]
    fn answers_are_scoped_to_the_asked_module() {
        let mut oracle = InMemoryNameEnvironment::new();
        oracle
            .add_module(ModuleInfo::explicit("m").with_exports("p", &[]))
            .add_binary(Some("m"), BinaryType::new("p/A"))
            .add_binary(None, BinaryType::new("q/B"));

        let m = ModuleName::new("m");
        let answer = oracle.find_type(&names("p.A"), LookupModule::Named(&m)).unwrap();
        assert_eq!(answer.module_name, Some(m.clone()));
        assert!(oracle.find_type(&names("q.B"), LookupModule::Named(&m)).is_none());
        assert!(oracle.find_type(&names("q.B"), LookupModule::AnyNamed).is_none());
        let unnamed = oracle.find_type(&names("q.B"), LookupModule::Any).unwrap();
        assert_eq!(unnamed.module_name, None);
        assert_eq!(oracle.find_type_calls(), 4);
    }

    #[test]
    fn parent_packages_are_declared_without_units() {
        let mut oracle = InMemoryNameEnvironment::new();
        oracle.add_binary(Some("m"), BinaryType::new("a/b/C"));

        let m = ModuleName::new("m");
        assert!(oracle.is_package(&names("a"), LookupModule::Any));
        assert!(oracle.has_compilation_unit(&names("a.b"), &m, true));
        assert!(!oracle.has_compilation_unit(&names("a"), &m, true));
        assert!(oracle.has_compilation_unit(&names("a"), &m, false));
        assert_eq!(oracle.modules_declaring_package(&names("a.b"), LookupModule::Any), vec![m]);
    }

    #[test]
    fn class_path_mode_ignores_module_scoping() {
        let mut oracle = InMemoryNameEnvironment::without_module_system();
        oracle.add_binary(Some("m"), BinaryType::new("p/A"));
        let other = ModuleName::new("other");
        assert!(oracle.find_type(&names("p.A"), LookupModule::Named(&other)).is_some());
        assert!(!oracle.uses_module_system());
    }
}
