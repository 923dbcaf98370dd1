use pretty_assertions::assert_eq;
use tern_classfile::{flags, BinaryField, BinaryType};
use tern_config::CompilerOptions;
use tern_lookup::binding::AnnotationBinding;
use tern_lookup::{
    AbortCompilation, ClassOrigin, InMemoryNameEnvironment, ProblemKind, TypeId, TypeKind, WildcardKind,
};

use crate::fixture::{class_path, names, RecordingListener, Session};

fn field_type(session: &Session, owner: TypeId, name: &str) -> TypeId {
    let types = session.env.types();
    let class = types.class_of(owner).expect("owner is a class");
    class
        .fields
        .iter()
        .map(|id| types.field(*id))
        .find(|field| field.name == name)
        .map(|field| field.ty)
        .unwrap_or_else(|| panic!("no field {name}"))
}

#[test]
fn member_type_signatures_keep_their_parameterized_enclosing_type() {
    let mut oracle = class_path();
    oracle.add_binary(
        None,
        BinaryType::new("p/Holder")
            .with_signature("<K:Ljava/lang/Object;>Ljava/lang/Object;")
            .with_field(
                BinaryField::new("entry", "Ljava/util/Map$Entry;")
                    .with_signature("Ljava/util/Map<TK;+Ljava/lang/Number;>.Entry<*>;"),
            ),
    );
    let mut session = Session::new(oracle);
    let unnamed = session.unnamed();

    let holder = session.resolve(unnamed, "p.Holder");
    let entry_field = field_type(&session, holder, "entry");
    let map = session.resolve(unnamed, "java.util.Map");
    let number = session.resolve(unnamed, "java.lang.Number");
    let entry = session
        .env
        .member_type(map, "Entry")
        .expect("lookup should not abort")
        .expect("Map declares Entry");
    let k = session.env.types().class_of(holder).expect("class").type_variables[0];

    let types = session.env.types_mut();
    let bounded = types.wildcard(map, 1, Some(number), &[], WildcardKind::Extends, &[]);
    let enclosing = types.parameterized_type(map, &[k, bounded], None, &[]);
    let any = types.wildcard(entry, 0, None, &[], WildcardKind::Unbound, &[]);
    let expected = types.parameterized_type(entry, &[any], Some(enclosing), &[]);
    assert_eq!(entry_field, expected);
    assert_eq!(
        session.class_name(entry_field),
        "java.util.Map$Entry<?>"
    );
    assert_eq!(
        session.env.types().class_of(entry).map(|c| c.enclosing),
        Some(Some(map))
    );
    assert!(session.reporter.problems().is_empty());
}

#[test]
fn a_missing_superclass_is_reported_once() {
    let mut oracle = class_path();
    oracle
        .add_binary(None, BinaryType::new("p/A").with_super_class(Some("q/Gone")))
        .add_binary(None, BinaryType::new("p/B").with_super_class(Some("q/Gone")));
    let mut session = Session::new(oracle);
    let unnamed = session.unnamed();

    let a = session.resolve(unnamed, "p.A");
    let b = session.resolve(unnamed, "p.B");
    let super_of = |session: &Session, ty: TypeId| {
        session
            .env
            .types()
            .class_of(ty)
            .and_then(|c| c.superclass)
            .expect("superclass")
    };
    let gone = super_of(&session, a);
    assert_eq!(super_of(&session, b), gone);

    let resolved = session.env.resolve_type(gone, false).expect("lookup should not abort");
    assert_eq!(resolved, gone);
    assert!(session.env.types().class_of(gone).is_some_and(|c| c.is_missing()));
    assert!(session.env.is_missing_type(&names("q.Gone")));

    // a second resolution of the same name does not report again
    session.env.resolve_type(gone, false).expect("lookup should not abort");
    session.resolve(unnamed, "q.Gone");
    assert_eq!(
        session.reporter.kinds(),
        vec![ProblemKind::IsClassPathCorrect {
            compound_name: names("q.Gone")
        }]
    );
}

#[test]
fn unknown_qualified_names_become_missing_types() {
    let mut session = Session::new(class_path());
    let listener = RecordingListener::new();
    session.env.listeners().add(listener.clone());
    let unnamed = session.unnamed();

    let missing = session.resolve(unnamed, "nowhere.Thing");
    let class = session.env.types().class_of(missing).expect("missing types are classes");
    assert_eq!(class.origin, ClassOrigin::Missing);
    let object = session.resolve(unnamed, "java.lang.Object");
    assert_eq!(session.env.types().class_of(missing).and_then(|c| c.superclass), Some(object));

    assert_eq!(session.resolve(unnamed, "nowhere.Thing"), missing);
    assert_eq!(session.env.missing_types(), &[missing]);
    assert_eq!(session.reporter.problems().len(), 1);
    assert_eq!(
        listener.seen(),
        vec![
            ("nowhere.Thing".to_string(), false),
            ("java.lang.Object".to_string(), true),
            ("nowhere.Thing".to_string(), false),
        ]
    );
}

#[test]
fn an_absent_member_type_aborts_the_lookup() {
    let mut oracle = class_path();
    oracle.add_binary(
        None,
        BinaryType::new("p/Broken").with_field(
            BinaryField::new("broken", "Ljava/util/Map$Nope;")
                .with_signature("Ljava/util/Map<Ljava/lang/String;Ljava/lang/String;>.Nope;"),
        ),
    );
    let mut session = Session::new(oracle);
    let unnamed = session.unnamed();

    let result = session.env.resolve_qualified_type(unnamed, &names("p.Broken"));
    assert!(
        matches!(
            &result,
            Err(AbortCompilation::MissingMemberType { member, .. }) if member == "Nope"
        ),
        "unexpected result: {result:?}"
    );
}

#[test]
fn polymorphic_signature_methods_get_one_variant_per_call_shape() {
    let mut session = Session::new(class_path());
    let unnamed = session.unnamed();
    let handle = session.resolve(unnamed, "java.lang.invoke.MethodHandle");
    let invoke = session.env.types().class_of(handle).expect("class").methods[0];
    assert!(session.env.types().method(invoke).polymorphic_signature);

    let first = session.env.polymorphic_method(invoke, &[TypeId::INT, TypeId::NULL]);
    let again = session.env.polymorphic_method(invoke, &[TypeId::INT, TypeId::NULL]);
    assert_eq!(first, again);

    let void = session.resolve(unnamed, "java.lang.Void");
    assert_eq!(session.env.types().method(first).parameters, vec![TypeId::INT, void]);

    let string = session.resolve(unnamed, "java.lang.String");
    let returning_string = session.env.update_polymorphic_method_return_type(first, string);
    assert_ne!(returning_string, first);
    assert_eq!(session.env.types().method(returning_string).return_type, string);
    assert_eq!(session.env.types().method(returning_string).original(returning_string), invoke);
}

#[test]
fn boxing_uses_the_platform_wrappers() {
    let mut session = Session::new(class_path());
    let unnamed = session.unnamed();
    let integer = session.resolve(unnamed, "java.lang.Integer");

    assert_eq!(session.env.compute_boxing_type(TypeId::INT).expect("no abort"), integer);
    assert_eq!(session.env.compute_boxing_type(integer).expect("no abort"), TypeId::INT);

    let long = session.env.compute_boxing_type(TypeId::LONG).expect("no abort");
    assert!(matches!(session.env.types().kind(long), TypeKind::Problem(_)));
}

fn annotated_class_path() -> InMemoryNameEnvironment {
    let mut oracle = class_path();
    oracle
        .add_binary(
            None,
            BinaryType::interface("p/Marker").with_access_flags(
                flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT | flags::ACC_ANNOTATION,
            ),
        )
        .add_binary(None, BinaryType::new("p/Tagged").with_annotation("p/Marker"));
    oracle
}

#[test]
fn declaration_annotations_are_kept_only_when_stored() {
    let options = CompilerOptions {
        store_annotations: true,
        ..CompilerOptions::default()
    };
    let mut session = Session::with_options(annotated_class_path(), options);
    let unnamed = session.unnamed();
    let tagged = session.resolve(unnamed, "p.Tagged");
    let marker = session.resolve(unnamed, "p.Marker");
    let class = session.env.types().class_of(tagged).expect("class");
    assert_eq!(
        class.annotations,
        vec![AnnotationBinding {
            annotation_type: marker
        }]
    );
    assert!(session.reporter.problems().is_empty());

    let mut plain = Session::new(annotated_class_path());
    let unnamed = plain.unnamed();
    let tagged = plain.resolve(unnamed, "p.Tagged");
    let class = plain.env.types().class_of(tagged).expect("class");
    assert_eq!(class.annotations, Vec::new());
}
