//! Decoding of binary descriptors and generic signatures into bindings.
//!
//! Names are resolved with [`LookupEnvironment::get_type_from_compound_name`], so
//! decoding never asks the oracle for top-level types: anything not cached yet
//! becomes an unresolved placeholder.

use tern_classfile::{
    ClassTypeSignature, FieldType, TypeAnnotation, TypeAnnotationTarget, TypeArgument,
    TypePathEntry, TypeSignature,
};

use crate::binding::{AnnotationBinding, BaseKind, ModuleId, TypeId, TypeKind, WildcardKind};
use crate::environment::LookupEnvironment;
use crate::problem::{AbortCompilation, Result};

/// Cursor over the type annotations of one signature element, following JVMS
/// `type_path` steps.
#[derive(Debug, Clone, Default)]
pub struct TypeAnnotationWalker<'a> {
    candidates: Vec<&'a TypeAnnotation>,
    depth: usize,
}

impl<'a> TypeAnnotationWalker<'a> {
    pub fn new(annotations: &'a [TypeAnnotation], target: TypeAnnotationTarget) -> Self {
        Self {
            candidates: annotations.iter().filter(|a| a.target == target).collect(),
            depth: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn step(&self, entry: TypePathEntry) -> Self {
        if self.candidates.is_empty() {
            return Self::empty();
        }
        let candidates = self
            .candidates
            .iter()
            .copied()
            .filter(|a| a.path.get(self.depth) == Some(&entry))
            .collect();
        Self {
            candidates,
            depth: self.depth + 1,
        }
    }

    pub fn to_next_array_dimension(&self) -> Self {
        self.step(TypePathEntry::ArrayElement)
    }

    pub fn to_next_nested_type(&self) -> Self {
        self.step(TypePathEntry::NestedType)
    }

    pub fn to_wildcard_bound(&self) -> Self {
        self.step(TypePathEntry::WildcardBound)
    }

    pub fn to_type_argument(&self, rank: usize) -> Self {
        match u8::try_from(rank) {
            Ok(rank) => self.step(TypePathEntry::TypeArgument(rank)),
            Err(_) => Self::empty(),
        }
    }

    /// Internal names of the annotations whose path ends exactly here.
    pub fn annotations_at_cursor(&self) -> Vec<&'a str> {
        self.candidates
            .iter()
            .filter(|a| a.path.len() == self.depth)
            .map(|a| a.annotation_type.as_str())
            .collect()
    }
}

/// Where a signature is decoded: type variables are looked up in
/// `method_type_variables` first, then along the enclosing type chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SignatureScope<'s> {
    pub(crate) module: ModuleId,
    pub(crate) method_type_variables: &'s [TypeId],
    pub(crate) enclosing_type: Option<TypeId>,
    /// The signature text, for error messages.
    pub(crate) signature: &'s str,
    pub(crate) missing_names: &'s [String],
}

impl<'s> SignatureScope<'s> {
    fn was_missing(&self, internal_name: &str) -> bool {
        self.missing_names.iter().any(|m| m == internal_name)
    }
}

fn compound_of(internal_name: &str) -> Vec<String> {
    internal_name.split('/').map(str::to_string).collect()
}

impl LookupEnvironment {
    /// The class named by a constant-pool entry such as `java/util/Map$Entry`.
    /// Generic classes come back raw.
    pub fn type_from_constant_pool_name(
        &mut self,
        module: ModuleId,
        internal_name: &str,
        was_missing: bool,
    ) -> Result<TypeId> {
        self.get_type_from_compound_name(module, &compound_of(internal_name), false, was_missing)
    }

    pub(crate) fn type_from_field_type(
        &mut self,
        field_type: &FieldType,
        scope: &SignatureScope<'_>,
        walker: &TypeAnnotationWalker<'_>,
    ) -> Result<TypeId> {
        match field_type {
            FieldType::Base(base) => Ok(BaseKind::from(*base).type_id()),
            FieldType::Object(name) => {
                let ty = self.type_from_constant_pool_name(scope.module, name, scope.was_missing(name))?;
                let top = self.annotations_from(scope.module, walker)?;
                Ok(self.types.annotated_type(ty, &[top]))
            }
            FieldType::Array(_) => {
                let mut dimensions = 0;
                let mut current = field_type;
                let mut levels = Vec::new();
                let mut cursor = walker.clone();
                while let FieldType::Array(component) = current {
                    levels.push(self.annotations_from(scope.module, &cursor)?);
                    cursor = cursor.to_next_array_dimension();
                    dimensions += 1;
                    current = component;
                }
                let leaf = self.type_from_field_type(current, scope, &cursor)?;
                Ok(self.types.array_type(leaf, dimensions, &levels))
            }
        }
    }

    /// Decodes one `JavaTypeSignature`.
    pub(crate) fn type_from_type_signature(
        &mut self,
        signature: &TypeSignature,
        scope: &SignatureScope<'_>,
        walker: &TypeAnnotationWalker<'_>,
    ) -> Result<TypeId> {
        match signature {
            TypeSignature::Base(base) => Ok(BaseKind::from(*base).type_id()),
            TypeSignature::Array(_) => {
                let (dimensions, leaf) = signature.split_dimensions();
                let mut levels = Vec::with_capacity(dimensions);
                let mut cursor = walker.clone();
                for _ in 0..dimensions {
                    levels.push(self.annotations_from(scope.module, &cursor)?);
                    cursor = cursor.to_next_array_dimension();
                }
                let leaf = self.type_from_type_signature(leaf, scope, &cursor)?;
                Ok(self.types.array_type(leaf, dimensions, &levels))
            }
            TypeSignature::TypeVariable(name) => {
                let variable = self.lookup_type_variable(name, scope)?;
                let top = self.annotations_from(scope.module, walker)?;
                Ok(self.types.annotated_type(variable, &[top]))
            }
            TypeSignature::Class(class) => self.type_from_class_signature(class, scope, walker),
        }
    }

    /// Decodes `Lp/Outer<..>.Inner<..>;` left to right. Each `.` segment is a member
    /// of the previous segment's class, parameterized with the previous segment as
    /// its enclosing type.
    pub(crate) fn type_from_class_signature(
        &mut self,
        class: &ClassTypeSignature,
        scope: &SignatureScope<'_>,
        walker: &TypeAnnotationWalker<'_>,
    ) -> Result<TypeId> {
        let Some((first, members)) = class.segments.split_first() else {
            return Err(AbortCompilation::Signature(tern_classfile::Error::Other(
                "class type signature without a class name",
            )));
        };
        let outer_name = class.outer_compound_name();
        let outer_internal = outer_name.join("/");
        let is_parameterized = !first.type_arguments.is_empty() || !members.is_empty();
        let generic = self.get_type_from_compound_name(
            scope.module,
            &outer_name,
            is_parameterized,
            scope.was_missing(&outer_internal),
        )?;

        let mut cursor = walker.clone();
        let mut current = self.apply_segment(generic, &first.type_arguments, None, scope, &cursor)?;
        let mut internal_name = outer_internal;
        for member in members {
            cursor = cursor.to_next_nested_type();
            internal_name.push('$');
            internal_name.push_str(&member.name);
            let declaration = self.types.declaration_of(current).unwrap_or(current);
            let member_type = match self.member_type(declaration, &member.name)? {
                Some(found) => found,
                None => {
                    let enclosing_missing = self
                        .types
                        .class_of(declaration)
                        .is_some_and(|c| c.is_missing());
                    if !enclosing_missing {
                        return Err(AbortCompilation::MissingMemberType {
                            enclosing: self.types.readable_name(declaration),
                            member: member.name.clone(),
                        });
                    }
                    let compound = compound_of(&internal_name);
                    self.create_missing_type(None, &compound, scope.module)
                }
            };
            let enclosing = match self.types.kind(current) {
                TypeKind::Parameterized { .. } | TypeKind::Raw { .. } => Some(current),
                _ => None,
            };
            current = self.apply_segment(member_type, &member.type_arguments, enclosing, scope, &cursor)?;
        }
        Ok(current)
    }

    fn apply_segment(
        &mut self,
        generic: TypeId,
        arguments: &[TypeArgument],
        enclosing: Option<TypeId>,
        scope: &SignatureScope<'_>,
        walker: &TypeAnnotationWalker<'_>,
    ) -> Result<TypeId> {
        let top = self.annotations_from(scope.module, walker)?;
        if arguments.is_empty() {
            let ty = match enclosing {
                Some(enclosing) if !self.types.class_of(generic).is_some_and(|c| c.is_static()) => {
                    self.types.parameterized_type(generic, &[], Some(enclosing), &top)
                }
                _ => self.types.annotated_type(generic, &[top]),
            };
            return Ok(ty);
        }
        let mut decoded = Vec::with_capacity(arguments.len());
        for (rank, argument) in arguments.iter().enumerate() {
            let cursor = walker.to_type_argument(rank);
            let argument = match argument {
                TypeArgument::Any => {
                    let annotations = self.annotations_from(scope.module, &cursor)?;
                    self.types
                        .wildcard(generic, rank, None, &[], WildcardKind::Unbound, &annotations)
                }
                TypeArgument::Extends(bound) | TypeArgument::Super(bound) => {
                    let kind = if matches!(argument, TypeArgument::Extends(_)) {
                        WildcardKind::Extends
                    } else {
                        WildcardKind::Super
                    };
                    let annotations = self.annotations_from(scope.module, &cursor)?;
                    let bound = self.type_from_type_signature(bound, scope, &cursor.to_wildcard_bound())?;
                    self.types
                        .wildcard(generic, rank, Some(bound), &[], kind, &annotations)
                }
                TypeArgument::Exact(ty) => self.type_from_type_signature(ty, scope, &cursor)?,
            };
            decoded.push(argument);
        }
        Ok(self.types.parameterized_type(generic, &decoded, enclosing, &top))
    }

    fn lookup_type_variable(&mut self, name: &str, scope: &SignatureScope<'_>) -> Result<TypeId> {
        for variable in scope.method_type_variables {
            if self.type_variable_named(*variable, name) {
                return Ok(*variable);
            }
        }
        let mut current = scope.enclosing_type;
        while let Some(ty) = current {
            let ty = self.resolve_type(ty, false)?;
            let Some(class) = self.types.class_of(ty) else {
                break;
            };
            let (variables, enclosing) = (class.type_variables.clone(), class.enclosing);
            if let Some(found) = variables
                .into_iter()
                .find(|v| self.type_variable_named(*v, name))
            {
                return Ok(found);
            }
            current = enclosing;
        }
        Err(AbortCompilation::UndefinedTypeVariable {
            name: name.to_string(),
            signature: scope.signature.to_string(),
        })
    }

    fn type_variable_named(&self, variable: TypeId, name: &str) -> bool {
        self.types
            .type_var_id(variable)
            .is_some_and(|id| self.types.type_var(id).name == name)
    }

    /// Annotation bindings at the walker's cursor. Plain sessions skip the lookup.
    pub(crate) fn annotations_from(
        &mut self,
        module: ModuleId,
        walker: &TypeAnnotationWalker<'_>,
    ) -> Result<Vec<AnnotationBinding>> {
        if !self.types.is_annotated() || walker.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for name in walker.annotations_at_cursor() {
            let annotation_type = self.type_from_constant_pool_name(module, name, false)?;
            out.push(AnnotationBinding { annotation_type });
        }
        Ok(out)
    }
}
