//! Identity-preserving factory for type bindings.
//!
//! Every non-trivial instantiation goes through [`TypeSystem`], which interns it
//! under a structural key. Equal keys always yield the same [`TypeId`]; that is the
//! invariant the rest of the engine (and its clients) compare against.

use std::collections::HashMap;

use crate::binding::{
    AnnotationBinding, BaseKind, CaptureBinding, CaptureId, ClassBinding, ClassId, FieldBinding,
    FieldId, MethodBinding, MethodId, TypeBinding, TypeId, TypeKind, TypeVarId,
    TypeVariableBinding, UnitId, WildcardKind,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Parameterized {
        generic: TypeId,
        arguments: Vec<TypeId>,
        enclosing: Option<TypeId>,
        annotations: Vec<AnnotationBinding>,
    },
    Raw {
        generic: TypeId,
        enclosing: Option<TypeId>,
        annotations: Vec<AnnotationBinding>,
    },
    Wildcard {
        generic: TypeId,
        rank: usize,
        bound: Option<TypeId>,
        other_bounds: Vec<TypeId>,
        kind: WildcardKind,
        annotations: Vec<AnnotationBinding>,
    },
    Captured {
        wildcard: TypeId,
        context: TypeId,
        start: usize,
        end: usize,
        unit: Option<UnitId>,
    },
    Array {
        leaf: TypeId,
        dimensions: usize,
        annotations: Vec<Vec<AnnotationBinding>>,
    },
    Intersection(Vec<TypeId>),
    /// Declared types, type variables and captures carrying type-use annotations.
    Annotated {
        unannotated: TypeId,
        annotations: Vec<AnnotationBinding>,
    },
}

#[derive(Debug)]
pub struct TypeSystem {
    types: Vec<TypeBinding>,
    classes: Vec<ClassBinding>,
    type_vars: Vec<TypeVariableBinding>,
    captures: Vec<CaptureBinding>,
    methods: Vec<MethodBinding>,
    fields: Vec<FieldBinding>,
    interned: HashMap<TypeKey, TypeId>,
    annotated: bool,
}

impl TypeSystem {
    /// `annotated` selects the annotated type system, where type-use annotations are
    /// part of a binding's identity. Otherwise annotations are dropped on entry.
    pub fn new(annotated: bool) -> Self {
        let mut this = Self {
            types: Vec::new(),
            classes: Vec::new(),
            type_vars: Vec::new(),
            captures: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            interned: HashMap::new(),
            annotated,
        };
        for base in BaseKind::ALL {
            let id = this.push(TypeKind::Base(base), Vec::new(), None);
            debug_assert_eq!(id, base.type_id());
        }
        this
    }

    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn push(
        &mut self,
        kind: TypeKind,
        annotations: Vec<Vec<AnnotationBinding>>,
        unannotated: Option<TypeId>,
    ) -> TypeId {
        let id = TypeId::from_index(self.types.len());
        self.types.push(TypeBinding {
            kind,
            annotations,
            unannotated: unannotated.unwrap_or(id),
        });
        id
    }

    fn intern(
        &mut self,
        key: TypeKey,
        kind: TypeKind,
        annotations: Vec<Vec<AnnotationBinding>>,
        unannotated: Option<TypeId>,
    ) -> TypeId {
        if let Some(existing) = self.interned.get(&key) {
            tracing::trace!(target: "tern.lookup", id = ?existing, "type cache hit");
            return *existing;
        }
        let id = self.push(kind, annotations, unannotated);
        self.interned.insert(key, id);
        id
    }

    fn effective(&self, annotations: &[AnnotationBinding]) -> Vec<AnnotationBinding> {
        if self.annotated {
            annotations.to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeBinding {
        &self.types[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()].kind
    }

    pub fn unannotated(&self, id: TypeId) -> TypeId {
        self.types[id.index()].unannotated
    }

    pub fn parameterized_type(
        &mut self,
        generic: TypeId,
        arguments: &[TypeId],
        enclosing: Option<TypeId>,
        annotations: &[AnnotationBinding],
    ) -> TypeId {
        let generic = self.unannotated(generic);
        let annotations = self.effective(annotations);
        let plain = if annotations.is_empty() {
            None
        } else {
            Some(self.parameterized_type(generic, arguments, enclosing, &[]))
        };
        let key = TypeKey::Parameterized {
            generic,
            arguments: arguments.to_vec(),
            enclosing,
            annotations: annotations.clone(),
        };
        let kind = TypeKind::Parameterized {
            generic,
            arguments: arguments.to_vec(),
            enclosing,
        };
        self.intern(key, kind, levels(annotations), plain)
    }

    pub fn raw_type(
        &mut self,
        generic: TypeId,
        enclosing: Option<TypeId>,
        annotations: &[AnnotationBinding],
    ) -> TypeId {
        let generic = self.unannotated(generic);
        let annotations = self.effective(annotations);
        let plain = if annotations.is_empty() {
            None
        } else {
            Some(self.raw_type(generic, enclosing, &[]))
        };
        let key = TypeKey::Raw {
            generic,
            enclosing,
            annotations: annotations.clone(),
        };
        self.intern(
            key,
            TypeKind::Raw { generic, enclosing },
            levels(annotations),
            plain,
        )
    }

    pub fn wildcard(
        &mut self,
        generic: TypeId,
        rank: usize,
        bound: Option<TypeId>,
        other_bounds: &[TypeId],
        kind: WildcardKind,
        annotations: &[AnnotationBinding],
    ) -> TypeId {
        let generic = self.unannotated(generic);
        let annotations = self.effective(annotations);
        let plain = if annotations.is_empty() {
            None
        } else {
            Some(self.wildcard(generic, rank, bound, other_bounds, kind, &[]))
        };
        let key = TypeKey::Wildcard {
            generic,
            rank,
            bound,
            other_bounds: other_bounds.to_vec(),
            kind,
            annotations: annotations.clone(),
        };
        let type_kind = TypeKind::Wildcard {
            generic,
            rank,
            bound,
            other_bounds: other_bounds.to_vec(),
            kind,
        };
        self.intern(key, type_kind, levels(annotations), plain)
    }

    /// The capture of `wildcard` at `start..end` in `unit`, created with empty bounds
    /// the first time this position is seen.
    pub fn captured_wildcard(
        &mut self,
        wildcard: TypeId,
        context: TypeId,
        start: usize,
        end: usize,
        unit: Option<UnitId>,
        capture_id: u32,
    ) -> TypeId {
        let key = TypeKey::Captured {
            wildcard,
            context,
            start,
            end,
            unit,
        };
        if let Some(existing) = self.interned.get(&key) {
            return *existing;
        }
        let capture = CaptureId::from_index(self.captures.len());
        self.captures.push(CaptureBinding {
            wildcard,
            context,
            start,
            end,
            unit,
            capture_id,
            lower_bound: None,
            first_bound: None,
            superclass: None,
            superinterfaces: Vec::new(),
        });
        self.intern(key, TypeKind::Captured(capture), Vec::new(), None)
    }

    /// `leaf[]...` with `dimensions` levels. Array leaves are flattened, so the leaf of
    /// the result is never itself an array.
    pub fn array_type(
        &mut self,
        leaf: TypeId,
        dimensions: usize,
        annotations: &[Vec<AnnotationBinding>],
    ) -> TypeId {
        if dimensions == 0 {
            return leaf;
        }
        let mut all_levels: Vec<Vec<AnnotationBinding>> = if self.annotated {
            annotations.to_vec()
        } else {
            Vec::new()
        };
        let (leaf, dimensions) = match self.kind(leaf).clone() {
            TypeKind::Array {
                leaf: inner,
                dimensions: inner_dims,
            } => {
                let inner_levels = self.get(leaf).annotations.clone();
                if !inner_levels.is_empty() {
                    all_levels.resize(dimensions, Vec::new());
                    all_levels.extend(inner_levels);
                }
                (inner, dimensions + inner_dims)
            }
            _ => (leaf, dimensions),
        };
        while all_levels.last().is_some_and(Vec::is_empty) {
            all_levels.pop();
        }

        let plain = if all_levels.is_empty() {
            None
        } else {
            Some(self.array_type(leaf, dimensions, &[]))
        };
        let key = TypeKey::Array {
            leaf,
            dimensions,
            annotations: all_levels.clone(),
        };
        self.intern(key, TypeKind::Array { leaf, dimensions }, all_levels, plain)
    }

    pub fn intersection_type(&mut self, types: &[TypeId]) -> TypeId {
        if let [single] = types {
            return *single;
        }
        let key = TypeKey::Intersection(types.to_vec());
        self.intern(key, TypeKind::Intersection(types.to_vec()), Vec::new(), None)
    }

    /// `ty` with the given annotations per level; level 0 replaces the top-level annotations.
    pub fn annotated_type(&mut self, ty: TypeId, annotations: &[Vec<AnnotationBinding>]) -> TypeId {
        if !self.annotated || annotations.iter().all(Vec::is_empty) {
            return ty;
        }
        let top = annotations.first().cloned().unwrap_or_default();
        match self.kind(ty).clone() {
            TypeKind::Parameterized {
                generic,
                arguments,
                enclosing,
            } => self.parameterized_type(generic, &arguments, enclosing, &top),
            TypeKind::Raw { generic, enclosing } => self.raw_type(generic, enclosing, &top),
            TypeKind::Wildcard {
                generic,
                rank,
                bound,
                other_bounds,
                kind,
            } => self.wildcard(generic, rank, bound, &other_bounds, kind, &top),
            TypeKind::Array { leaf, dimensions } => {
                self.array_type(leaf, dimensions, annotations)
            }
            TypeKind::Problem(_) | TypeKind::Intersection(_) => ty,
            kind => {
                if top.is_empty() {
                    return ty;
                }
                let unannotated = self.unannotated(ty);
                let key = TypeKey::Annotated {
                    unannotated,
                    annotations: top.clone(),
                };
                self.intern(key, kind, vec![top], Some(unannotated))
            }
        }
    }

    pub fn add_class(&mut self, mut class: ClassBinding) -> TypeId {
        let class_id = ClassId::from_index(self.classes.len());
        let id = self.push(TypeKind::Class(class_id), Vec::new(), None);
        class.this_type = id;
        self.classes.push(class);
        id
    }

    /// Replace the data behind an existing class binding, keeping its identity.
    pub fn redefine_class(&mut self, ty: TypeId, mut class: ClassBinding) {
        if let Some(class_id) = self.class_id(ty) {
            class.this_type = self.unannotated(ty);
            self.classes[class_id.index()] = class;
        }
    }

    /// A fresh type variable; type variables are never interned.
    pub fn add_type_variable(&mut self, variable: TypeVariableBinding) -> TypeId {
        let var_id = TypeVarId::from_index(self.type_vars.len());
        self.type_vars.push(variable);
        self.push(TypeKind::TypeVariable(var_id), Vec::new(), None)
    }

    pub fn add_problem(&mut self, problem: crate::binding::ProblemType) -> TypeId {
        self.push(TypeKind::Problem(problem), Vec::new(), None)
    }

    pub fn add_method(&mut self, method: MethodBinding) -> MethodId {
        let id = MethodId::from_index(self.methods.len());
        self.methods.push(method);
        id
    }

    pub fn add_field(&mut self, field: FieldBinding) -> FieldId {
        let id = FieldId::from_index(self.fields.len());
        self.fields.push(field);
        id
    }

    pub fn class_id(&self, ty: TypeId) -> Option<ClassId> {
        match self.kind(ty) {
            TypeKind::Class(id) => Some(*id),
            _ => None,
        }
    }

    pub fn class(&self, id: ClassId) -> &ClassBinding {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassBinding {
        &mut self.classes[id.index()]
    }

    /// The declared class behind `ty` when `ty` is a (possibly annotated) class type.
    pub fn class_of(&self, ty: TypeId) -> Option<&ClassBinding> {
        self.class_id(ty).map(|id| self.class(id))
    }

    pub fn class_of_mut(&mut self, ty: TypeId) -> Option<&mut ClassBinding> {
        let id = self.class_id(ty)?;
        Some(self.class_mut(id))
    }

    /// The generic declaration behind class, parameterized and raw types.
    pub fn declaration_of(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Class(_) => Some(self.unannotated(ty)),
            TypeKind::Parameterized { generic, .. } | TypeKind::Raw { generic, .. } => {
                Some(*generic)
            }
            _ => None,
        }
    }

    pub fn type_var_id(&self, ty: TypeId) -> Option<TypeVarId> {
        match self.kind(ty) {
            TypeKind::TypeVariable(id) => Some(*id),
            _ => None,
        }
    }

    pub fn type_var(&self, id: TypeVarId) -> &TypeVariableBinding {
        &self.type_vars[id.index()]
    }

    pub fn type_var_mut(&mut self, id: TypeVarId) -> &mut TypeVariableBinding {
        &mut self.type_vars[id.index()]
    }

    pub fn capture(&self, id: CaptureId) -> &CaptureBinding {
        &self.captures[id.index()]
    }

    pub fn capture_mut(&mut self, id: CaptureId) -> &mut CaptureBinding {
        &mut self.captures[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodBinding {
        &self.methods[id.index()]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodBinding {
        &mut self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldBinding {
        &self.fields[id.index()]
    }

    pub fn is_base(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Base(_))
    }

    pub fn is_problem(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Problem(_))
    }

    pub fn is_type_variable(&self, ty: TypeId) -> bool {
        matches!(
            self.kind(ty),
            TypeKind::TypeVariable(_) | TypeKind::Captured(_)
        )
    }

    /// Whether `ty` mentions a type variable or a parameterized type anywhere.
    pub fn mentions_type_variables(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::TypeVariable(_) | TypeKind::Captured(_) => true,
            TypeKind::Parameterized { .. } => true,
            TypeKind::Array { leaf, .. } => self.mentions_type_variables(*leaf),
            TypeKind::Wildcard { bound, .. } => {
                bound.is_some_and(|b| self.mentions_type_variables(b))
            }
            TypeKind::Intersection(types) => types.iter().any(|t| self.mentions_type_variables(*t)),
            _ => false,
        }
    }

    /// A readable rendition such as `java.util.Map<K, ? extends java.lang.Number>`.
    pub fn readable_name(&self, ty: TypeId) -> String {
        let mut out = String::new();
        for annotation in self.get(ty).top_annotations() {
            out.push('@');
            out.push_str(&self.readable_name(annotation.annotation_type));
            out.push(' ');
        }
        match self.kind(ty) {
            TypeKind::Base(base) => out.push_str(base.keyword()),
            TypeKind::Class(id) => out.push_str(&self.class(*id).qualified_name()),
            TypeKind::TypeVariable(id) => out.push_str(&self.type_var(*id).name),
            TypeKind::Wildcard { bound, kind, .. } => {
                out.push('?');
                match (kind, bound) {
                    (WildcardKind::Extends, Some(b)) => {
                        out.push_str(" extends ");
                        out.push_str(&self.readable_name(*b));
                    }
                    (WildcardKind::Super, Some(b)) => {
                        out.push_str(" super ");
                        out.push_str(&self.readable_name(*b));
                    }
                    _ => {}
                }
            }
            TypeKind::Intersection(types) => {
                let parts: Vec<_> = types.iter().map(|t| self.readable_name(*t)).collect();
                out.push_str(&parts.join(" & "));
            }
            TypeKind::Parameterized {
                generic, arguments, ..
            } => {
                out.push_str(&self.readable_name(*generic));
                let args: Vec<_> = arguments.iter().map(|t| self.readable_name(*t)).collect();
                out.push('<');
                out.push_str(&args.join(", "));
                out.push('>');
            }
            TypeKind::Raw { generic, .. } => out.push_str(&self.readable_name(*generic)),
            TypeKind::Array { leaf, dimensions } => {
                out.push_str(&self.readable_name(*leaf));
                for _ in 0..*dimensions {
                    out.push_str("[]");
                }
            }
            TypeKind::Captured(id) => {
                let capture = self.capture(*id);
                out.push_str(&format!(
                    "capture#{}-of {}",
                    capture.capture_id,
                    self.readable_name(capture.wildcard)
                ));
            }
            TypeKind::Problem(problem) => out.push_str(&problem.compound_name.join(".")),
        }
        out
    }
}

fn levels(annotations: Vec<AnnotationBinding>) -> Vec<Vec<AnnotationBinding>> {
    if annotations.is_empty() {
        Vec::new()
    } else {
        vec![annotations]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ClassOrigin, ModuleId, PackageId, TypeVariableOwner};

    fn class(ts: &mut TypeSystem, name: &str) -> TypeId {
        let compound: Vec<String> = name.split('.').map(str::to_string).collect();
        ts.add_class(ClassBinding::skeleton(
            compound,
            PackageId::from_index(0),
            ModuleId::from_index(0),
            ClassOrigin::Binary,
        ))
    }

    fn type_var(ts: &mut TypeSystem, name: &str) -> TypeId {
        ts.add_type_variable(TypeVariableBinding {
            name: name.to_string(),
            owner: TypeVariableOwner::Pending,
            rank: 0,
            superclass: None,
            superinterfaces: Vec::new(),
            first_bound: None,
        })
    }

    #[test]
    fn base_types_are_pre_interned() {
        let ts = TypeSystem::new(false);
        for base in BaseKind::ALL {
            assert_eq!(ts.kind(base.type_id()), &TypeKind::Base(base));
        }
        assert_eq!(TypeId::INT, BaseKind::Int.type_id());
    }

    #[test]
    fn nested_arrays_flatten() {
        let mut ts = TypeSystem::new(false);
        let string = class(&mut ts, "java.lang.String");
        let one = ts.array_type(string, 1, &[]);
        let nested = ts.array_type(one, 2, &[]);
        let direct = ts.array_type(string, 3, &[]);
        assert_eq!(nested, direct);
        assert_eq!(ts.array_type(string, 0, &[]), string);
    }

    #[test]
    fn type_variables_are_never_shared() {
        let mut ts = TypeSystem::new(false);
        assert_ne!(type_var(&mut ts, "T"), type_var(&mut ts, "T"));
    }

    #[test]
    fn plain_system_drops_annotations() {
        let mut ts = TypeSystem::new(false);
        let list = class(&mut ts, "java.util.List");
        let nonnull = class(&mut ts, "p.NonNull");
        let annotation = AnnotationBinding {
            annotation_type: nonnull,
        };
        let string = class(&mut ts, "java.lang.String");
        let plain = ts.parameterized_type(list, &[string], None, &[]);
        let annotated = ts.parameterized_type(list, &[string], None, &[annotation]);
        assert_eq!(plain, annotated);
        assert_eq!(ts.annotated_type(string, &[vec![annotation]]), string);
    }

    #[test]
    fn annotated_system_keeps_an_unannotated_counterpart() {
        let mut ts = TypeSystem::new(true);
        let string = class(&mut ts, "java.lang.String");
        let nonnull = class(&mut ts, "p.NonNull");
        let annotation = AnnotationBinding {
            annotation_type: nonnull,
        };
        let annotated = ts.annotated_type(string, &[vec![annotation]]);
        assert_ne!(annotated, string);
        assert_eq!(ts.unannotated(annotated), string);
        assert_eq!(ts.class_id(annotated), ts.class_id(string));
        assert_eq!(ts.annotated_type(string, &[vec![annotation]]), annotated);
        assert_eq!(ts.readable_name(annotated), "@p.NonNull java.lang.String");
    }

    #[test]
    fn captures_are_keyed_by_position() {
        let mut ts = TypeSystem::new(false);
        let list = class(&mut ts, "java.util.List");
        let wildcard = ts.wildcard(list, 0, None, &[], WildcardKind::Unbound, &[]);
        let first = ts.captured_wildcard(wildcard, list, 10, 20, None, 1);
        let again = ts.captured_wildcard(wildcard, list, 10, 20, None, 2);
        let elsewhere = ts.captured_wildcard(wildcard, list, 30, 40, None, 3);
        assert_eq!(first, again);
        assert_ne!(first, elsewhere);
    }
}
