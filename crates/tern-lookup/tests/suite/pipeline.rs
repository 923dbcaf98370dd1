use pretty_assertions::assert_eq;
use tern_classfile::BinaryType;
use tern_lookup::ast::{FieldDecl, MethodDecl, TypeArg, TypeParameterDecl};
use tern_lookup::binding::TypeVariableOwner;
use tern_lookup::{
    ClassOrigin, CompilationUnit, ImportDecl, ModuleOrigin, ProblemKind, Step, TypeDecl, TypeDeclKind, TypeId, TypeRef,
};
use tern_config::{CompilerOptions, SourceLevel};
use tern_modules::ModuleInfo;

use crate::fixture::{class_path, module_path, RecordingListener, Session};

fn superclass(session: &Session, ty: TypeId) -> Option<TypeId> {
    session.env.types().class_of(ty).and_then(|c| c.superclass)
}

#[test]
fn units_advance_in_lock_step_and_connect_their_hierarchy() {
    let mut session = Session::new(class_path());
    let base_unit = CompilationUnit::new("p/Base.java", Some("p")).with_type(TypeDecl::class("Base"));
    let derived_unit = CompilationUnit::new("p/Derived.java", Some("p"))
        .with_import(ImportDecl::single("java.util.Map"))
        .with_type(
            TypeDecl::class("Derived")
                .extends(TypeRef::named("Base"))
                .implements(TypeRef::named("Comparable").with_args(vec![TypeArg::ty(TypeRef::named("Derived"))]))
                .with_field(FieldDecl::new(
                    "index",
                    TypeRef::named("Map").with_args(vec![
                        TypeArg::ty(TypeRef::named("String")),
                        TypeArg::ty(TypeRef::named("Derived")),
                    ]),
                ))
                .with_method(
                    MethodDecl::new("pick")
                        .with_type_parameter(TypeParameterDecl::new("T").bounded(TypeRef::named("Number")))
                        .with_parameter(TypeRef::named("T"))
                        .returns(TypeRef::named("T")),
                ),
        );

    let first = session.env.build_type_bindings(base_unit, None).expect("build");
    let second = session.env.build_type_bindings(derived_unit, None).expect("build");
    assert_eq!(session.env.step(), Step::BuildTypeHierarchy);
    assert_eq!(session.env.unit_step(first), Some(Step::BuildTypeHierarchy));
    let derived = session.env.unit_types(second)[0];
    assert!(superclass(&session, derived).is_none());

    session.env.complete_type_bindings().expect("complete");
    assert_eq!(session.env.step(), Step::BuildFieldsAndMethods);
    assert_eq!(session.env.unit_step(first), Some(Step::BuildFieldsAndMethods));
    assert_eq!(session.env.unit_step(second), Some(Step::BuildFieldsAndMethods));

    let unnamed = session.unnamed();
    let base = session.env.unit_types(first)[0];
    let comparable = session.resolve(unnamed, "java.lang.Comparable");
    let map = session.resolve(unnamed, "java.util.Map");
    let string = session.resolve(unnamed, "java.lang.String");
    let number = session.resolve(unnamed, "java.lang.Number");
    let object = session.resolve(unnamed, "java.lang.Object");
    assert_eq!(superclass(&session, base), Some(object));
    assert_eq!(superclass(&session, derived), Some(base));

    let comparable_of_derived = session
        .env
        .types_mut()
        .parameterized_type(comparable, &[derived], None, &[]);
    let map_of_derived = session
        .env
        .types_mut()
        .parameterized_type(map, &[string, derived], None, &[]);

    let types = session.env.types();
    let class = types.class_of(derived).expect("class");
    assert_eq!(class.superinterfaces, vec![comparable_of_derived]);
    assert_eq!(types.field(class.fields[0]).ty, map_of_derived);

    let pick = class.methods[0];
    let method = types.method(pick);
    let t = method.type_variables[0];
    assert_eq!(method.parameters, vec![t]);
    assert_eq!(method.return_type, t);
    let variable = types.type_var(types.type_var_id(t).expect("type variable"));
    assert_eq!(variable.owner, TypeVariableOwner::Method(pick));
    assert_eq!(variable.first_bound, Some(number));
    assert_eq!(variable.superclass, Some(number));
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn hierarchy_cycles_are_reported_and_broken() {
    let mut session = Session::new(class_path());
    let unit = CompilationUnit::new("c/Cycle.java", Some("c"))
        .with_type(TypeDecl::class("A").extends(TypeRef::named("B")))
        .with_type(TypeDecl::class("B").extends(TypeRef::named("A")));
    let id = session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    let (a, b) = (session.env.unit_types(id)[0], session.env.unit_types(id)[1]);
    let unnamed = session.unnamed();
    let object = session.resolve(unnamed, "java.lang.Object");
    assert_eq!(superclass(&session, a), Some(b));
    assert_eq!(superclass(&session, b), Some(object));
    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::HierarchyCircularity {
            type_name: "c.B".to_string(),
            supertype: "c.A".to_string(),
        }]
    );
}

#[test]
fn enums_records_and_annotations_get_implicit_supertypes() {
    let mut session = Session::new(class_path());
    let unit = CompilationUnit::new("k/Kinds.java", Some("k"))
        .with_type(TypeDecl::new(TypeDeclKind::Enum, "Color"))
        .with_type(TypeDecl::new(TypeDeclKind::Record, "Point"))
        .with_type(TypeDecl::new(TypeDeclKind::Annotation, "Marker"));
    let id = session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");
    let [color, point, marker] = [0, 1, 2].map(|index| session.env.unit_types(id)[index]);

    let unnamed = session.unnamed();
    let enum_type = session.resolve(unnamed, "java.lang.Enum");
    let record = session.resolve(unnamed, "java.lang.Record");
    let annotation = session.resolve(unnamed, "java.lang.annotation.Annotation");
    let object = session.resolve(unnamed, "java.lang.Object");
    let enum_of_color = session
        .env
        .types_mut()
        .parameterized_type(enum_type, &[color], None, &[]);

    assert_eq!(superclass(&session, color), Some(enum_of_color));
    assert_eq!(superclass(&session, point), Some(record));
    assert_eq!(superclass(&session, marker), Some(object));
    let marker_class = session.env.types().class_of(marker).expect("class");
    assert!(marker_class.is_interface());
    assert_eq!(marker_class.superinterfaces, vec![annotation]);
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn duplicate_declarations_are_reported_and_skipped() {
    let mut session = Session::new(class_path());
    let list_of = |argument: &str| TypeRef::named("java.util.List").with_args(vec![TypeArg::ty(TypeRef::named(argument))]);
    let unit = CompilationUnit::new("d/Twice.java", Some("d"))
        .with_type(TypeDecl::class("Twice"))
        .with_type(TypeDecl::class("Twice"))
        .with_type(
            TypeDecl::class("Members")
                .with_field(FieldDecl::new("x", TypeRef::named("String")))
                .with_field(FieldDecl::new("x", TypeRef::named("Integer")))
                .with_method(MethodDecl::new("m").with_parameter(list_of("String")))
                .with_method(MethodDecl::new("m").with_parameter(list_of("Integer"))),
        );
    let id = session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    assert_eq!(session.env.unit_types(id).len(), 2);
    let members = session.env.unit_types(id)[1];
    let class = session.env.types().class_of(members).expect("class");
    assert_eq!((class.fields.len(), class.methods.len()), (1, 1));
    assert_eq!(
        session.reporter.kinds(),
        vec![
            ProblemKind::DuplicateType {
                name: "d.Twice".to_string()
            },
            ProblemKind::DuplicateField {
                type_name: "d.Members".to_string(),
                field: "x".to_string(),
            },
            ProblemKind::DuplicateMethod {
                type_name: "d.Members".to_string(),
                selector: "m".to_string(),
            },
        ]
    );
}

#[test]
fn unresolvable_imports_are_reported() {
    let mut session = Session::new(class_path());
    let listener = RecordingListener::new();
    session.env.listeners().add(listener.clone());
    let unit = CompilationUnit::new("i/Uses.java", Some("i"))
        .with_import(ImportDecl::single("nowhere.Thing"))
        .with_import(ImportDecl::single("java.util.List"))
        .with_type(TypeDecl::class("Uses"));
    session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::ImportNotFound {
            name: "nowhere.Thing".to_string()
        }]
    );
    assert_eq!(
        listener.seen(),
        vec![
            ("nowhere.Thing".to_string(), false),
            ("java.util.List".to_string(), true),
        ]
    );
}

#[test]
fn source_units_found_by_the_oracle_are_completed_with_the_batch() {
    let mut oracle = class_path();
    oracle.add_source(
        None,
        CompilationUnit::new("q/Late.java", Some("q")).with_type(TypeDecl::class("Late")),
    );
    let mut session = Session::new(oracle);
    let unit = CompilationUnit::new("p/User.java", Some("p"))
        .with_type(TypeDecl::class("User").extends(TypeRef::named("q.Late")));
    let id = session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    assert_eq!(session.env.unit_count(), 2);
    let user = session.env.unit_types(id)[0];
    let unnamed = session.unnamed();
    let late = session.resolve(unnamed, "q.Late");
    assert_eq!(superclass(&session, user), Some(late));
    assert!(session.env.types().class_of(late).is_some_and(|c| c.is_source()));
    assert_eq!(session.env.unit_types(id), &[user]);

    let object = session.resolve(unnamed, "java.lang.Object");
    assert_eq!(superclass(&session, late), Some(object));
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn module_info_units_define_source_modules() {
    let mut oracle = module_path();
    oracle
        .add_module(ModuleInfo::explicit("lib").with_exports("lib.api", &[]))
        .add_binary(Some("lib"), BinaryType::new("lib/api/Service"))
        .add_binary(Some("lib"), BinaryType::new("lib/internal/Impl"));
    let mut session = Session::new(oracle);

    let descriptor = CompilationUnit::module_info(
        "module-info.java",
        ModuleInfo::explicit("app")
            .with_requires("lib", false)
            .with_uses("lib.api.Service"),
    );
    let main = CompilationUnit::new("app/main/Main.java", Some("app.main"))
        .in_module("app")
        .with_import(ImportDecl::single("lib.api.Service"))
        .with_import(ImportDecl::single("lib.internal.Impl"))
        .with_type(TypeDecl::class("Main").with_field(FieldDecl::new("service", TypeRef::named("Service"))));
    let descriptor_unit = session.env.build_type_bindings(descriptor, None).expect("build");
    let main_unit = session.env.build_type_bindings(main, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    let app = session.module("app");
    assert_eq!(session.env.unit_module(descriptor_unit), Some(app));
    assert_eq!(session.env.unit_module(main_unit), Some(app));
    assert_eq!(session.env.module(app).origin, ModuleOrigin::Source(Some(descriptor_unit)));

    let service = session.resolve(app, "lib.api.Service");
    assert_eq!(session.env.module(app).uses, vec![service]);
    let main_type = session.env.unit_types(main_unit)[0];
    let types = session.env.types();
    let field = types.class_of(main_type).map(|c| types.field(c.fields[0]).ty);
    assert_eq!(field, Some(service));

    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::ImportNotVisible {
            name: "lib.internal.Impl".to_string()
        }]
    );
}

#[test]
fn an_import_of_a_type_from_a_later_unit_of_the_batch_resolves() {
    let mut session = Session::new(class_path());
    let user = CompilationUnit::new("b/User.java", Some("b"))
        .with_import(ImportDecl::single("a.A"))
        .with_type(TypeDecl::class("User").extends(TypeRef::named("A")));
    let provider = CompilationUnit::new("a/A.java", Some("a")).with_type(TypeDecl::class("A"));
    let user_unit = session.env.build_type_bindings(user, None).expect("build");
    let provider_unit = session.env.build_type_bindings(provider, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    let user = session.env.unit_types(user_unit)[0];
    let a = session.env.unit_types(provider_unit)[0];
    assert_eq!(superclass(&session, user), Some(a));
    assert_eq!(session.class_name(a), "a.A");
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn a_unit_found_while_building_members_does_not_run_the_batch_ahead() {
    let mut oracle = class_path();
    oracle.add_source(
        None,
        CompilationUnit::new("q/Late.java", Some("q"))
            .with_type(TypeDecl::class("Late").with_field(FieldDecl::new("name", TypeRef::named("String")))),
    );
    let mut session = Session::new(oracle);
    let first = CompilationUnit::new("a/First.java", Some("a")).with_type(
        TypeDecl::class("First")
            .with_field(FieldDecl::new("late", TypeRef::named("q.Late")))
            .with_field(FieldDecl::new("twice", TypeRef::named("String")))
            .with_field(FieldDecl::new("twice", TypeRef::named("String"))),
    );
    let second = CompilationUnit::new("b/Second.java", Some("b")).with_type(
        TypeDecl::class("Second")
            .with_field(FieldDecl::new("twice", TypeRef::named("String")))
            .with_field(FieldDecl::new("twice", TypeRef::named("String"))),
    );
    session.env.build_type_bindings(first, None).expect("build");
    session.env.build_type_bindings(second, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    let reported: Vec<String> = session
        .reporter
        .kinds()
        .into_iter()
        .filter_map(|kind| match kind {
            ProblemKind::DuplicateField { type_name, .. } => Some(type_name),
            _ => None,
        })
        .collect();
    assert_eq!(reported, vec!["a.First".to_string(), "b.Second".to_string()]);

    assert_eq!(session.env.unit_count(), 3);
    let unnamed = session.unnamed();
    let late = session.resolve(unnamed, "q.Late");
    let class = session.env.types().class_of(late).expect("class");
    let ClassOrigin::Source(late_unit) = class.origin else {
        panic!("expected a source type, got {:?}", class.origin);
    };
    assert_eq!(class.fields.len(), 1);
    assert_eq!(session.env.unit_step(late_unit), Some(Step::BuildFieldsAndMethods));
    assert_eq!(session.env.step(), Step::BuildFieldsAndMethods);
}

#[test]
fn records_before_release_sixteen_are_reported() {
    let options = CompilerOptions {
        source_level: SourceLevel(11),
        ..CompilerOptions::default()
    };
    let mut session = Session::with_options(class_path(), options);
    let unit = CompilationUnit::new("k/Point.java", Some("k")).with_type(TypeDecl::new(TypeDeclKind::Record, "Point"));
    let id = session.env.build_type_bindings(unit, None).expect("build");
    session.env.complete_type_bindings().expect("complete");

    let point = session.env.unit_types(id)[0];
    let unnamed = session.unnamed();
    let object = session.resolve(unnamed, "java.lang.Object");
    assert_eq!(superclass(&session, point), Some(object));
    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::RecordsNotSupported {
            type_name: "k.Point".to_string(),
            source_level: SourceLevel(11),
        }]
    );
}
