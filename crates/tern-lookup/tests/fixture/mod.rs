//! Shared session builders for tern-lookup integration tests.
//!
//! The platform fixture is a hand-written slice of `java.base`: just the types the
//! lookup engine itself asks for, plus a few generic collections to build
//! signatures with.

use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;
use tern_classfile::{flags, BinaryMethod, BinaryType};
use tern_config::CompilerOptions;
use tern_lookup::{
    CollectingReporter, DefaultRequestor, InMemoryNameEnvironment, LookupEnvironment, ModuleId,
    ResolutionListener, TypeId,
};
use tern_modules::{ModuleInfo, ModuleName, JAVA_BASE};

pub fn names(dotted: &str) -> Vec<String> {
    dotted.split('.').map(str::to_string).collect()
}

const SINGLE_PARAMETER: &str = "<T:Ljava/lang/Object;>Ljava/lang/Object;";
const MAP_PARAMETERS: &str = "<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;";
const MEMBER_INTERFACE: u16 =
    flags::ACC_PUBLIC | flags::ACC_STATIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT;

/// Adds the platform types to `module` (`None` for the class path).
pub fn add_platform(oracle: &mut InMemoryNameEnvironment, module: Option<&str>) {
    let abstract_class = flags::ACC_PUBLIC | flags::ACC_ABSTRACT;
    let binaries = [
        BinaryType::new("java/lang/Object").with_super_class(None),
        BinaryType::new("java/lang/String").with_access_flags(flags::ACC_PUBLIC | flags::ACC_FINAL),
        BinaryType::new("java/lang/Number").with_access_flags(abstract_class),
        BinaryType::new("java/lang/Integer").with_super_class(Some("java/lang/Number")),
        BinaryType::new("java/lang/Void"),
        BinaryType::new("java/lang/Record").with_access_flags(abstract_class),
        BinaryType::new("java/lang/Class").with_signature(SINGLE_PARAMETER),
        BinaryType::new("java/lang/Enum")
            .with_access_flags(abstract_class)
            .with_signature("<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;"),
        BinaryType::interface("java/lang/Comparable").with_signature(SINGLE_PARAMETER),
        BinaryType::interface("java/lang/Cloneable"),
        BinaryType::interface("java/io/Serializable"),
        BinaryType::interface("java/lang/annotation/Annotation"),
        BinaryType::interface("java/util/List").with_signature("<E:Ljava/lang/Object;>Ljava/lang/Object;"),
        BinaryType::interface("java/util/Map")
            .with_signature(MAP_PARAMETERS)
            .with_member_type("Entry", MEMBER_INTERFACE),
        BinaryType::interface("java/util/Map$Entry")
            .with_access_flags(MEMBER_INTERFACE)
            .with_signature(MAP_PARAMETERS)
            .with_enclosing_type("java/util/Map"),
        BinaryType::new("java/lang/invoke/MethodHandle")
            .with_access_flags(abstract_class)
            .with_method(
                BinaryMethod::new("invokeExact", "([Ljava/lang/Object;)Ljava/lang/Object;").with_access_flags(
                    flags::ACC_PUBLIC | flags::ACC_FINAL | flags::ACC_NATIVE | flags::ACC_VARARGS,
                ),
            ),
    ];
    for binary in binaries {
        oracle.add_binary(module, binary);
    }
}

/// A class-path oracle holding the platform types.
pub fn class_path() -> InMemoryNameEnvironment {
    let mut oracle = InMemoryNameEnvironment::without_module_system();
    add_platform(&mut oracle, None);
    oracle
}

/// A module-path oracle with `java.base` exporting the platform packages.
pub fn module_path() -> InMemoryNameEnvironment {
    let mut oracle = InMemoryNameEnvironment::new();
    let mut base = ModuleInfo::explicit(JAVA_BASE);
    for package in [
        "java.lang",
        "java.lang.annotation",
        "java.lang.invoke",
        "java.io",
        "java.util",
    ] {
        base = base.with_exports(package, &[]);
    }
    oracle.add_module(base);
    add_platform(&mut oracle, Some(JAVA_BASE));
    oracle
}

pub struct Session {
    pub env: LookupEnvironment,
    pub reporter: Rc<CollectingReporter>,
}

impl Session {
    pub fn new(oracle: InMemoryNameEnvironment) -> Self {
        Self::with_options(oracle, CompilerOptions::default())
    }

    pub fn with_options(oracle: InMemoryNameEnvironment, options: CompilerOptions) -> Self {
        let reporter = Rc::new(CollectingReporter::new());
        let env = LookupEnvironment::new(
            options,
            Rc::new(oracle),
            Rc::new(DefaultRequestor),
            reporter.clone(),
        );
        Self { env, reporter }
    }

    pub fn unnamed(&self) -> ModuleId {
        self.env.unnamed_module()
    }

    pub fn module(&mut self, name: &str) -> ModuleId {
        self.env
            .get_module(&ModuleName::new(name))
            .unwrap_or_else(|| panic!("module {name} should be known to the oracle"))
    }

    /// Resolves `dotted` for `client`, failing the test on an abort.
    pub fn resolve(&mut self, client: ModuleId, dotted: &str) -> TypeId {
        self.env
            .resolve_qualified_type(client, &names(dotted))
            .expect("lookup should not abort")
    }

    pub fn class_name(&self, ty: TypeId) -> String {
        self.env.types().readable_name(ty)
    }
}

/// Records every qualified name reported to listeners.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<(String, bool)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<(String, bool)> {
        self.seen.lock().clone()
    }
}

impl ResolutionListener for RecordingListener {
    fn on_qualified_name(&self, compound_name: &[String], resolved: bool) {
        self.seen.lock().push((compound_name.join("."), resolved));
    }
}
