//! Module descriptor model.
//!
//! A [`ModuleInfo`] is the unresolved, name-based form of a module declaration
//! (as read from a `module-info` source or class file). The lookup engine turns
//! descriptors into module bindings; this crate only knows names.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

pub const JAVA_BASE: &str = "java.base";

/// Target name standing for every unnamed module in qualified `exports`/`opens`.
pub const ALL_UNNAMED: &str = "ALL-UNNAMED";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The unnamed module has the empty name.
    pub fn unnamed() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_java_base(&self) -> bool {
        self.0 == JAVA_BASE
    }

    pub fn is_unnamed(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unnamed() {
            return f.write_str("<unnamed>");
        }
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Declared by a `module` declaration (source or binary).
    Explicit,
    /// A plain archive placed on the module path; reads and exports everything.
    Automatic,
    Unnamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: ModuleName,
    pub kind: ModuleKind,
    pub is_open: bool,
    pub requires: Vec<Requires>,
    pub exports: Vec<Exports>,
    pub opens: Vec<Opens>,
    pub uses: Vec<Uses>,
    pub provides: Vec<Provides>,
}

impl ModuleInfo {
    pub fn new(kind: ModuleKind, name: impl Into<ModuleName>) -> Self {
        Self {
            name: name.into(),
            kind,
            is_open: false,
            requires: Vec::new(),
            exports: Vec::new(),
            opens: Vec::new(),
            uses: Vec::new(),
            provides: Vec::new(),
        }
    }

    pub fn explicit(name: &str) -> Self {
        Self::new(ModuleKind::Explicit, ModuleName::new(name))
    }

    pub fn automatic(name: &str) -> Self {
        Self::new(ModuleKind::Automatic, ModuleName::new(name))
    }

    pub fn with_requires(mut self, module: &str, is_transitive: bool) -> Self {
        self.requires.push(Requires {
            module: ModuleName::new(module),
            is_transitive,
            is_static: false,
        });
        self
    }

    pub fn with_exports(mut self, package: &str, to: &[&str]) -> Self {
        self.exports.push(Exports {
            package: package.to_string(),
            to: to.iter().map(|m| ModuleName::new(*m)).collect(),
        });
        self
    }

    pub fn with_opens(mut self, package: &str, to: &[&str]) -> Self {
        self.opens.push(Opens {
            package: package.to_string(),
            to: to.iter().map(|m| ModuleName::new(*m)).collect(),
        });
        self
    }

    pub fn with_uses(mut self, service: &str) -> Self {
        self.uses.push(Uses {
            service: service.to_string(),
        });
        self
    }

    pub fn with_provides(mut self, service: &str, implementations: &[&str]) -> Self {
        self.provides.push(Provides {
            service: service.to_string(),
            implementations: implementations.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Check the structural rules of a module declaration.
    ///
    /// Every violation is returned; an empty vector means the descriptor is well formed.
    pub fn validate(&self) -> Vec<ModuleError> {
        let mut errors = Vec::new();

        let mut required = HashSet::new();
        for req in &self.requires {
            if req.module == self.name {
                errors.push(ModuleError::RequiresSelf {
                    module: self.name.clone(),
                });
            } else if !required.insert(&req.module) {
                errors.push(ModuleError::DuplicateRequires {
                    module: self.name.clone(),
                    required: req.module.clone(),
                });
            }
        }

        let mut exported = HashSet::new();
        for exports in &self.exports {
            if !exported.insert(exports.package.as_str()) {
                errors.push(ModuleError::DuplicateExports {
                    module: self.name.clone(),
                    package: exports.package.clone(),
                });
            }
        }

        let mut opened = HashSet::new();
        for opens in &self.opens {
            if self.is_open {
                errors.push(ModuleError::OpensInOpenModule {
                    module: self.name.clone(),
                    package: opens.package.clone(),
                });
            } else if !opened.insert(opens.package.as_str()) {
                errors.push(ModuleError::DuplicateOpens {
                    module: self.name.clone(),
                    package: opens.package.clone(),
                });
            }
        }

        let mut services = HashSet::new();
        for provides in &self.provides {
            if !services.insert(provides.service.as_str()) {
                errors.push(ModuleError::DuplicateProvides {
                    module: self.name.clone(),
                    service: provides.service.clone(),
                });
            }
            if provides.implementations.is_empty() {
                errors.push(ModuleError::MissingImplementations {
                    module: self.name.clone(),
                    service: provides.service.clone(),
                });
            }
        }

        errors
    }
}

/// Whether a qualified `exports`/`opens` target list admits `client`. An empty list
/// is unqualified; unnamed clients are admitted only through `ALL-UNNAMED`.
pub fn targets_admit(targets: &[ModuleName], client: &ModuleName) -> bool {
    if targets.is_empty() {
        return true;
    }
    if client.is_unnamed() {
        return targets.iter().any(|m| m.as_str() == ALL_UNNAMED);
    }
    targets.iter().any(|m| m == client)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requires {
    pub module: ModuleName,
    pub is_transitive: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exports {
    pub package: String,
    pub to: Vec<ModuleName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opens {
    pub package: String,
    pub to: Vec<ModuleName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uses {
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provides {
    pub service: String,
    pub implementations: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module `{module}` requires itself")]
    RequiresSelf { module: ModuleName },
    #[error("module `{module}` requires `{required}` more than once")]
    DuplicateRequires {
        module: ModuleName,
        required: ModuleName,
    },
    #[error("module `{module}` exports package `{package}` more than once")]
    DuplicateExports { module: ModuleName, package: String },
    #[error("module `{module}` opens package `{package}` more than once")]
    DuplicateOpens { module: ModuleName, package: String },
    #[error("open module `{module}` cannot declare `opens {package}`")]
    OpensInOpenModule { module: ModuleName, package: String },
    #[error("module `{module}` provides service `{service}` more than once")]
    DuplicateProvides { module: ModuleName, service: String },
    #[error("module `{module}` provides `{service}` without implementations")]
    MissingImplementations { module: ModuleName, service: String },
}

/// Every module descriptor known to a session, by name.
#[derive(Debug, Default, Clone)]
pub struct ModuleGraph {
    modules: HashMap<ModuleName, ModuleInfo>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `info`; a later descriptor for the same name replaces the earlier one.
    pub fn insert(&mut self, info: ModuleInfo) {
        let name = info.name.clone();
        if self.modules.insert(name.clone(), info).is_some() {
            tracing::debug!(target: "tern.modules", module = %name, "module descriptor replaced");
        }
    }

    pub fn get(&self, name: &ModuleName) -> Option<&ModuleInfo> {
        self.modules.get(name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn qualified_targets_admit_listed_modules_only() {
        let targets = [ModuleName::new("mod.a")];
        assert!(targets_admit(&targets, &ModuleName::new("mod.a")));
        assert!(!targets_admit(&targets, &ModuleName::new("mod.c")));
        assert!(!targets_admit(&targets, &ModuleName::unnamed()));
        assert!(targets_admit(&[], &ModuleName::unnamed()));
    }

    #[test]
    fn all_unnamed_target_admits_unnamed_clients() {
        let targets = [ModuleName::new(ALL_UNNAMED)];
        assert!(targets_admit(&targets, &ModuleName::unnamed()));
        assert!(!targets_admit(&targets, &ModuleName::new("other")));
    }

    #[test]
    fn validate_reports_duplicates() {
        let info = ModuleInfo::explicit("m")
            .with_requires("a", false)
            .with_requires("a", true)
            .with_requires("m", false)
            .with_exports("p", &[])
            .with_exports("p", &["x"]);
        let errors = info.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.contains(&ModuleError::RequiresSelf {
            module: ModuleName::new("m")
        }));
    }

    #[test]
    fn open_modules_reject_opens_and_services_need_providers() {
        let mut info = ModuleInfo::explicit("m")
            .with_opens("p", &[])
            .with_provides("s.Service", &[]);
        info.is_open = true;
        assert_eq!(
            info.validate(),
            vec![
                ModuleError::OpensInOpenModule {
                    module: ModuleName::new("m"),
                    package: "p".to_string(),
                },
                ModuleError::MissingImplementations {
                    module: ModuleName::new("m"),
                    service: "s.Service".to_string(),
                },
            ]
        );
    }

    #[test]
    fn later_descriptors_replace_earlier_ones() {
        let mut graph = ModuleGraph::new();
        graph.insert(ModuleInfo::explicit("m"));
        graph.insert(ModuleInfo::explicit("m").with_requires("n", true));
        let info = graph.get(&ModuleName::new("m")).expect("descriptor");
        assert_eq!(info.requires.len(), 1);
        assert!(graph.get(&ModuleName::new("n")).is_none());
    }
}
