use pretty_assertions::assert_eq;
use tern_config::CompilerOptions;
use tern_lookup::binding::AnnotationBinding;
use tern_lookup::{BaseKind, TypeId, TypeKind, WildcardKind};

use crate::fixture::{class_path, Session};

#[test]
fn base_types_are_preinterned_in_declaration_order() {
    let session = Session::new(class_path());
    let types = session.env.types();
    for base in BaseKind::ALL {
        assert_eq!(types.kind(base.type_id()), &TypeKind::Base(base));
    }
    assert_eq!(TypeId::INT, BaseKind::Int.type_id());
    assert_eq!(TypeId::NULL.index(), 9);
    assert_eq!(types.readable_name(TypeId::VOID), "void");
}

#[test]
fn equal_requests_produce_the_same_binding() {
    let mut session = Session::new(class_path());
    let unnamed = session.unnamed();
    let list = session.resolve(unnamed, "java.util.List");
    let string = session.resolve(unnamed, "java.lang.String");
    let number = session.resolve(unnamed, "java.lang.Number");

    let types = session.env.types_mut();
    let first = types.parameterized_type(list, &[string], None, &[]);
    let second = types.parameterized_type(list, &[string], None, &[]);
    assert_eq!(first, second);
    assert_ne!(first, types.parameterized_type(list, &[number], None, &[]));

    let raw = types.raw_type(list, None, &[]);
    assert_eq!(raw, types.raw_type(list, None, &[]));
    assert_ne!(raw, first);

    let extends = types.wildcard(list, 0, Some(number), &[], WildcardKind::Extends, &[]);
    assert_eq!(extends, types.wildcard(list, 0, Some(number), &[], WildcardKind::Extends, &[]));
    assert_ne!(extends, types.wildcard(list, 0, Some(number), &[], WildcardKind::Super, &[]));
    assert_ne!(extends, types.wildcard(list, 1, Some(number), &[], WildcardKind::Extends, &[]));

    let unbound = types.wildcard(list, 0, None, &[], WildcardKind::Unbound, &[]);
    let of_wildcard = types.parameterized_type(list, &[unbound], None, &[]);
    assert_eq!(types.readable_name(of_wildcard), "java.util.List<?>");
}

#[test]
fn arrays_flatten_nested_leaves() {
    let mut session = Session::new(class_path());
    let unnamed = session.unnamed();
    let string = session.resolve(unnamed, "java.lang.String");

    let types = session.env.types_mut();
    let one = types.array_type(string, 1, &[]);
    let nested = types.array_type(one, 2, &[]);
    let direct = types.array_type(string, 3, &[]);
    assert_eq!(nested, direct);
    assert_eq!(
        types.kind(direct),
        &TypeKind::Array {
            leaf: string,
            dimensions: 3
        }
    );
    assert_eq!(types.array_type(string, 0, &[]), string);
    assert_eq!(types.readable_name(direct), "java.lang.String[][][]");
}

#[test]
fn annotations_only_take_part_in_identity_when_enabled() {
    let options = CompilerOptions {
        annotated_type_system: true,
        ..CompilerOptions::default()
    };
    let mut session = Session::with_options(class_path(), options);
    let unnamed = session.unnamed();
    let list = session.resolve(unnamed, "java.util.List");
    let string = session.resolve(unnamed, "java.lang.String");
    let marker = session.resolve(unnamed, "java.lang.annotation.Annotation");

    let types = session.env.types_mut();
    let annotation = AnnotationBinding {
        annotation_type: marker,
    };
    let plain = types.parameterized_type(list, &[string], None, &[]);
    let annotated = types.parameterized_type(list, &[string], None, &[annotation]);
    assert_ne!(plain, annotated);
    assert_eq!(types.unannotated(annotated), plain);
    assert_eq!(annotated, types.parameterized_type(list, &[string], None, &[annotation]));

    let annotated_string = types.annotated_type(string, &[vec![annotation]]);
    assert_ne!(annotated_string, string);
    assert_eq!(types.unannotated(annotated_string), string);
    assert_eq!(types.class_of(annotated_string).map(|c| c.this_type), types.class_of(string).map(|c| c.this_type));

    let mut plain_session = Session::new(class_path());
    let unnamed = plain_session.unnamed();
    let list = plain_session.resolve(unnamed, "java.util.List");
    let string = plain_session.resolve(unnamed, "java.lang.String");
    let marker = plain_session.resolve(unnamed, "java.lang.annotation.Annotation");
    let types = plain_session.env.types_mut();
    let annotation = AnnotationBinding {
        annotation_type: marker,
    };
    assert_eq!(
        types.parameterized_type(list, &[string], None, &[annotation]),
        types.parameterized_type(list, &[string], None, &[])
    );
    assert_eq!(types.annotated_type(string, &[vec![annotation]]), string);
}

#[test]
fn placeholders_keep_their_id_once_resolved() {
    let mut session = Session::new(class_path());
    let unnamed = session.unnamed();
    let integer = session.resolve(unnamed, "java.lang.Integer");

    let superclass = session
        .env
        .types()
        .class_of(integer)
        .and_then(|c| c.superclass)
        .expect("Integer has a superclass");
    assert!(session.env.types().class_of(superclass).is_some_and(|c| c.is_unresolved()));

    let number = session.resolve(unnamed, "java.lang.Number");
    assert_eq!(number, superclass);
    assert!(session.env.types().class_of(number).is_some_and(|c| !c.is_unresolved()));
    assert!(session.reporter.problems().is_empty());
}
