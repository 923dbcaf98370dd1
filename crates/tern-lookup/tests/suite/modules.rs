use pretty_assertions::assert_eq;
use tern_classfile::BinaryType;
use tern_lookup::{
    InMemoryNameEnvironment, LookupEnvironment, PackageLookup, ProblemKind, ProblemReason, TypeId,
    TypeKind,
};
use tern_modules::{ModuleInfo, ModuleName};

use crate::fixture::{module_path, names, RecordingListener, Session};

/// `lib` exports `lib.api` to everyone and `lib.friends` to `app` only; `other` is
/// read by nobody.
fn library_path() -> InMemoryNameEnvironment {
    let mut oracle = module_path();
    oracle
        .add_module(
            ModuleInfo::explicit("lib")
                .with_exports("lib.api", &[])
                .with_exports("lib.friends", &["app"]),
        )
        .add_binary(Some("lib"), BinaryType::new("lib/api/Service"))
        .add_binary(Some("lib"), BinaryType::new("lib/friends/Helper"))
        .add_binary(Some("lib"), BinaryType::new("lib/internal/Impl"))
        .add_module(ModuleInfo::explicit("app").with_requires("lib", false))
        .add_module(ModuleInfo::explicit("stranger").with_requires("lib", false))
        .add_module(ModuleInfo::explicit("other").with_exports("other.pkg", &[]))
        .add_binary(Some("other"), BinaryType::new("other/pkg/Hidden"));
    oracle
}

fn reason(env: &LookupEnvironment, ty: TypeId) -> Option<ProblemReason> {
    match env.types().kind(ty) {
        TypeKind::Problem(problem) => Some(problem.reason),
        _ => None,
    }
}

#[test]
fn exported_types_resolve_for_reading_modules() {
    let mut session = Session::new(library_path());
    let app = session.module("app");
    let service = session.resolve(app, "lib.api.Service");

    assert_eq!(reason(&session.env, service), None);
    let lib = session.module("lib");
    assert_eq!(session.env.types().class_of(service).map(|c| c.module), Some(lib));
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn qualified_exports_admit_only_their_targets() {
    let mut session = Session::new(library_path());
    let app = session.module("app");
    let stranger = session.module("stranger");

    let helper = session.resolve(app, "lib.friends.Helper");
    assert_eq!(reason(&session.env, helper), None);

    let denied = session.resolve(stranger, "lib.friends.Helper");
    assert_eq!(reason(&session.env, denied), Some(ProblemReason::NotAccessible));
    let TypeKind::Problem(problem) = session.env.types().kind(denied) else {
        panic!("expected a problem binding");
    };
    assert_eq!(problem.closest_match, Some(helper));

    let unnamed = session.unnamed();
    let from_class_path = session.resolve(unnamed, "lib.friends.Helper");
    assert_eq!(reason(&session.env, from_class_path), Some(ProblemReason::NotAccessible));
}

#[test]
fn packages_that_are_not_exported_are_not_accessible() {
    let mut session = Session::new(library_path());
    let listener = RecordingListener::new();
    session.env.listeners().add(listener.clone());
    let app = session.module("app");

    let internal = session.resolve(app, "lib.internal.Impl");
    assert_eq!(reason(&session.env, internal), Some(ProblemReason::NotAccessible));
    assert_eq!(listener.seen(), vec![("lib.internal.Impl".to_string(), false)]);
}

#[test]
fn types_of_unread_modules_are_not_visible() {
    let mut session = Session::new(library_path());
    let app = session.module("app");

    let hidden = session.resolve(app, "other.pkg.Hidden");
    assert_eq!(reason(&session.env, hidden), Some(ProblemReason::NotVisible));

    // the unnamed module reads every module
    let unnamed = session.unnamed();
    let from_class_path = session.resolve(unnamed, "other.pkg.Hidden");
    assert_eq!(reason(&session.env, from_class_path), None);
    let other = session.module("other");
    assert_eq!(session.env.types().class_of(from_class_path).map(|c| c.module), Some(other));
}

#[test]
fn requires_transitive_extends_the_closure() {
    let mut oracle = module_path();
    oracle
        .add_module(ModuleInfo::explicit("util").with_exports("util", &[]))
        .add_binary(Some("util"), BinaryType::new("util/Strings"))
        .add_module(ModuleInfo::explicit("lib").with_requires("util", true))
        .add_module(ModuleInfo::explicit("app").with_requires("lib", false));
    let mut session = Session::new(oracle);

    let app = session.module("app");
    let lib = session.module("lib");
    let util = session.module("util");
    let base = session.env.java_base_module().expect("java.base is on the module path");

    assert_eq!(session.env.all_required_modules(app), vec![lib, util, base]);
    assert_eq!(session.env.all_required_modules(base), Vec::new());
    assert!(session.env.is_transitively_required(lib, util));
    assert!(!session.env.is_transitively_required(app, util));

    let strings = session.resolve(app, "util.Strings");
    assert_eq!(reason(&session.env, strings), None);
}

#[test]
fn cyclic_requires_yield_an_empty_closure() {
    let mut oracle = module_path();
    oracle
        .add_module(ModuleInfo::explicit("a").with_requires("b", true))
        .add_module(ModuleInfo::explicit("b").with_requires("a", true));
    let mut session = Session::new(oracle);

    let a = session.module("a");
    assert_eq!(session.env.all_required_modules(a), Vec::new());
    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::CyclicModuleDependency {
            module: ModuleName::new("a")
        }]
    );

    // cached: asking again does not report twice
    assert_eq!(session.env.all_required_modules(a), Vec::new());
    assert_eq!(session.reporter.problems().len(), 1);
}

#[test]
fn split_packages_are_reported_but_types_still_resolve() {
    let mut oracle = module_path();
    oracle
        .add_module(ModuleInfo::explicit("x").with_exports("shared", &[]))
        .add_binary(Some("x"), BinaryType::new("shared/A"))
        .add_module(ModuleInfo::explicit("y").with_exports("shared", &[]))
        .add_binary(Some("y"), BinaryType::new("shared/B"))
        .add_module(
            ModuleInfo::explicit("client")
                .with_requires("x", false)
                .with_requires("y", false),
        );
    let mut session = Session::new(oracle);
    let client = session.module("client");

    let lookup = session.env.resolve_package(client, &names("shared"));
    let PackageLookup::Ambiguous(split) = lookup else {
        panic!("expected an ambiguous package, got {lookup:?}");
    };
    assert!(session.env.package(split).is_split());
    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::ConflictingPackageFromModules {
            package: "shared".to_string(),
            modules: vec![ModuleName::new("x"), ModuleName::new("y")],
        }]
    );

    let a = session.resolve(client, "shared.A");
    let b = session.resolve(client, "shared.B");
    let x = session.module("x");
    let y = session.module("y");
    assert_eq!(session.env.types().class_of(a).map(|c| c.module), Some(x));
    assert_eq!(session.env.types().class_of(b).map(|c| c.module), Some(y));
}

#[test]
fn the_unnamed_module_sees_sibling_declarations_as_ambiguous() {
    let mut oracle = module_path();
    oracle
        .add_module(ModuleInfo::explicit("x").with_exports("a.b", &[]))
        .add_binary(Some("x"), BinaryType::new("a/b/A"))
        .add_module(ModuleInfo::explicit("y").with_exports("a.b", &[]))
        .add_binary(Some("y"), BinaryType::new("a/b/B"));
    let mut session = Session::new(oracle);
    let unnamed = session.unnamed();

    let lookup = session.env.resolve_package(unnamed, &names("a.b"));
    let PackageLookup::Ambiguous(split) = lookup else {
        panic!("expected an ambiguous package, got {lookup:?}");
    };
    assert!(session.env.package(split).is_split());

    let kinds = session.reporter.kinds();
    let [ProblemKind::ConflictingPackageFromModules { package, modules }] = kinds.as_slice() else {
        panic!("expected one package conflict, got {kinds:?}");
    };
    assert_eq!(package, "a.b");
    let mut modules = modules.clone();
    modules.sort_by_key(|name| name.to_string());
    assert_eq!(modules, vec![ModuleName::new("x"), ModuleName::new("y")]);
}
