//! Nullness type annotations.
//!
//! The configured `@NonNull`/`@Nullable` annotation types are resolved once per
//! session and handed out as canonical [`AnnotationBinding`]s, so annotated types
//! built from them intern to the same ids.

use crate::ast::split_dotted;
use crate::binding::{AnnotationBinding, TypeId};
use crate::environment::LookupEnvironment;
use crate::problem::Result;

/// The nullness a type carries through its annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullTag {
    NonNull,
    Nullable,
}

#[derive(Debug, Default)]
pub(crate) struct NullAnnotations {
    non_null: Option<AnnotationBinding>,
    nullable: Option<AnnotationBinding>,
}

impl LookupEnvironment {
    pub fn non_null_annotation(&mut self) -> Result<AnnotationBinding> {
        self.null_annotation(NullTag::NonNull)
    }

    pub fn nullable_annotation(&mut self) -> Result<AnnotationBinding> {
        self.null_annotation(NullTag::Nullable)
    }

    fn null_annotation(&mut self, tag: NullTag) -> Result<AnnotationBinding> {
        let cached = match tag {
            NullTag::NonNull => self.session.null_annotations.non_null,
            NullTag::Nullable => self.session.null_annotations.nullable,
        };
        if let Some(annotation) = cached {
            return Ok(annotation);
        }

        let name = match tag {
            NullTag::NonNull => self.options.nullness.non_null.clone(),
            NullTag::Nullable => self.options.nullness.nullable.clone(),
        };
        let compound = split_dotted(&name);
        let unnamed = self.unnamed;
        let annotation_type = match self.get_type(unnamed, &compound)? {
            Some(ty) if !self.types.is_problem(ty) => ty,
            _ => {
                self.report_missing_type(&compound);
                self.create_missing_type(None, &compound, unnamed)
            }
        };
        tracing::trace!(target: "tern.lookup", annotation = %name, ?tag, "nullness annotation resolved");

        let annotation = AnnotationBinding { annotation_type };
        let cache = &mut self.session.null_annotations;
        match tag {
            NullTag::NonNull => cache.non_null = Some(annotation),
            NullTag::Nullable => cache.nullable = Some(annotation),
        }
        Ok(annotation)
    }

    /// The annotations expressing `tag`; empty for no nullness.
    pub fn null_annotations_from_tag(&mut self, tag: Option<NullTag>) -> Result<Vec<AnnotationBinding>> {
        Ok(match tag {
            Some(tag) => vec![self.null_annotation(tag)?],
            None => Vec::new(),
        })
    }

    /// `ty` annotated with `tag` at its top level.
    pub fn with_null_tag(&mut self, ty: TypeId, tag: NullTag) -> Result<TypeId> {
        let annotations = self.null_annotations_from_tag(Some(tag))?;
        Ok(self.types.annotated_type(ty, &[annotations]))
    }

    fn is_null_annotation(&self, annotation: &AnnotationBinding) -> bool {
        let name = self.types.readable_name(annotation.annotation_type);
        self.options.nullness.is_nullness_annotation(&name)
    }

    /// The nullness `annotations` express, if any; the first nullness annotation wins.
    pub fn null_tag_of(&self, annotations: &[AnnotationBinding]) -> Option<NullTag> {
        let nullness = &self.options.nullness;
        annotations.iter().find_map(|annotation| {
            if !self.is_null_annotation(annotation) {
                return None;
            }
            let name = self.types.readable_name(annotation.annotation_type);
            Some(if name == nullness.nullable {
                NullTag::Nullable
            } else {
                NullTag::NonNull
            })
        })
    }

    pub fn contains_null_type_annotation(&self, annotations: &[AnnotationBinding]) -> bool {
        annotations.iter().any(|annotation| self.is_null_annotation(annotation))
    }

    /// `annotations` without the nullness annotations.
    pub fn filter_null_type_annotations(&self, annotations: &[AnnotationBinding]) -> Vec<AnnotationBinding> {
        annotations
            .iter()
            .filter(|annotation| !self.is_null_annotation(annotation))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use tern_classfile::BinaryType;
    use tern_config::{CompilerOptions, NullnessAnnotations};

    use super::*;
    use crate::memory::InMemoryNameEnvironment;
    use crate::oracle::DefaultRequestor;
    use crate::problem::{CollectingReporter, ProblemKind};

    fn env(oracle: InMemoryNameEnvironment) -> (LookupEnvironment, Rc<CollectingReporter>) {
        let options = CompilerOptions {
            nullness: NullnessAnnotations {
                enabled: true,
                ..NullnessAnnotations::default()
            },
            ..CompilerOptions::default()
        };
        let reporter = Rc::new(CollectingReporter::new());
        let env = LookupEnvironment::new(options, Rc::new(oracle), Rc::new(DefaultRequestor), reporter.clone());
        (env, reporter)
    }

    fn annotations_oracle() -> InMemoryNameEnvironment {
        let mut oracle = InMemoryNameEnvironment::without_module_system();
        oracle
            .add_binary(None, BinaryType::new("java/lang/Object").with_super_class(None))
            .add_binary(None, BinaryType::new("java/lang/String"))
            .add_binary(None, BinaryType::interface("org/eclipse/jdt/annotation/NonNull"))
            .add_binary(None, BinaryType::interface("org/eclipse/jdt/annotation/Nullable"))
            .add_binary(None, BinaryType::interface("p/Marker"));
        oracle
    }

    #[test]
    fn null_annotations_are_resolved_once() {
        let (mut env, reporter) = env(annotations_oracle());
        let non_null = env.non_null_annotation().unwrap();
        assert_eq!(env.non_null_annotation().unwrap(), non_null);
        assert_eq!(
            env.types().readable_name(non_null.annotation_type),
            "org.eclipse.jdt.annotation.NonNull"
        );
        assert_ne!(env.nullable_annotation().unwrap(), non_null);
        assert_eq!(env.null_annotations_from_tag(None).unwrap(), Vec::new());
        assert!(reporter.problems().is_empty());
    }

    #[test]
    fn tagged_types_intern_and_filter() {
        let (mut env, _) = env(annotations_oracle());
        let unnamed = env.unnamed_module();
        let string = env
            .resolve_qualified_type(unnamed, &split_dotted("java.lang.String"))
            .unwrap();
        let marker = env.resolve_qualified_type(unnamed, &split_dotted("p.Marker")).unwrap();

        let nullable_string = env.with_null_tag(string, NullTag::Nullable).unwrap();
        assert_ne!(nullable_string, string);
        assert_eq!(env.with_null_tag(string, NullTag::Nullable).unwrap(), nullable_string);
        assert_eq!(env.types().unannotated(nullable_string), string);

        let marker = AnnotationBinding {
            annotation_type: marker,
        };
        let nullable = env.nullable_annotation().unwrap();
        let mixed = [marker, nullable];
        assert!(env.contains_null_type_annotation(&mixed));
        assert_eq!(env.null_tag_of(&mixed), Some(NullTag::Nullable));
        assert_eq!(env.filter_null_type_annotations(&mixed), vec![marker]);
        assert_eq!(env.null_tag_of(&[marker]), None);
    }

    #[test]
    fn an_absent_annotation_type_becomes_missing() {
        let mut oracle = InMemoryNameEnvironment::without_module_system();
        oracle.add_binary(None, BinaryType::new("java/lang/Object").with_super_class(None));
        let (mut env, reporter) = env(oracle);

        let non_null = env.non_null_annotation().unwrap();
        assert!(env
            .types()
            .class_of(non_null.annotation_type)
            .is_some_and(|c| c.is_missing()));
        assert_eq!(
            reporter.kinds(),
            vec![ProblemKind::IsClassPathCorrect {
                compound_name: split_dotted("org.eclipse.jdt.annotation.NonNull")
            }]
        );
    }
}
