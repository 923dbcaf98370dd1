//! Per-session caches of derived method bindings, plus the raw and boxing
//! conversions those methods rely on.

use std::collections::HashMap;

use crate::binding::{
    BaseKind, MethodBinding, MethodId, MethodOrigin, TypeId, TypeKind, WildcardKind,
};
use crate::environment::LookupEnvironment;
use crate::generics::Substitution;
use crate::problem::{ProblemReason, Result};

/// Entries are never evicted within a session.
#[derive(Debug, Default)]
pub(crate) struct MethodCaches {
    /// Parameterized and raw instantiations per generic method.
    generic: HashMap<MethodId, Vec<MethodId>>,
    /// Polymorphic-signature variants per selector.
    polymorphic: HashMap<String, Vec<MethodId>>,
    get_class: HashMap<(TypeId, MethodId), MethodId>,
}

impl LookupEnvironment {
    /// `generic` instantiated with `arguments`. Reuses an entry with identical
    /// arguments, unchecked flag and target type.
    pub fn parameterized_generic_method(
        &mut self,
        generic: MethodId,
        arguments: &[TypeId],
        inferred_with_unchecked: bool,
        target: Option<TypeId>,
    ) -> MethodId {
        let cached = self.session.method_caches.generic.get(&generic).cloned().unwrap_or_default();
        for candidate in cached {
            let method = self.types.method(candidate);
            let MethodOrigin::ParameterizedGeneric {
                arguments: cached_arguments,
                inferred_with_unchecked: cached_unchecked,
                target: cached_target,
                ..
            } = &method.origin
            else {
                continue;
            };
            if cached_arguments != arguments || *cached_unchecked != inferred_with_unchecked || *cached_target != target {
                continue;
            }
            if inferred_with_unchecked {
                let leftover = std::iter::once(method.return_type)
                    .chain(method.thrown.iter().copied())
                    .any(|ty| self.is_parameterized_or_variable(ty));
                if leftover {
                    continue;
                }
            }
            return candidate;
        }

        let original = self.types.method(generic).clone();
        let substitution = Substitution::new(&original.type_variables, arguments);
        let parameters: Vec<TypeId> = original
            .parameters
            .iter()
            .map(|p| self.substitute(*p, &substitution))
            .collect();
        let mut return_type = self.substitute(original.return_type, &substitution);
        let mut thrown: Vec<TypeId> = original.thrown.iter().map(|t| self.substitute(*t, &substitution)).collect();
        if inferred_with_unchecked {
            return_type = self.erasure(return_type);
            thrown = thrown.into_iter().map(|t| self.erasure(t)).collect();
        }
        let id = self.types.add_method(MethodBinding {
            type_variables: Vec::new(),
            parameters,
            return_type,
            thrown,
            origin: MethodOrigin::ParameterizedGeneric {
                original: generic,
                arguments: arguments.to_vec(),
                inferred_with_unchecked,
                target,
            },
            ..original
        });
        self.session.method_caches.generic.entry(generic).or_default().push(id);
        tracing::trace!(target: "tern.lookup", ?generic, ?id, "parameterized generic method created");
        id
    }

    fn is_parameterized_or_variable(&self, ty: TypeId) -> bool {
        matches!(
            self.types.kind(ty),
            TypeKind::Parameterized { .. } | TypeKind::TypeVariable(_) | TypeKind::Captured(_)
        )
    }

    /// `generic` seen through `raw_type` (its declaring class when `None`): every
    /// signature type erased. One entry per declaring type.
    pub fn raw_generic_method(&mut self, generic: MethodId, raw_type: Option<TypeId>) -> MethodId {
        let declaring = raw_type.unwrap_or(self.types.method(generic).declaring_class);
        let cached = self.session.method_caches.generic.get(&generic).cloned().unwrap_or_default();
        if let Some(existing) = cached.into_iter().find(|candidate| {
            let method = self.types.method(*candidate);
            matches!(method.origin, MethodOrigin::RawGeneric { .. }) && method.declaring_class == declaring
        }) {
            return existing;
        }

        let original = self.types.method(generic).clone();
        let parameters = original.parameters.iter().map(|p| self.erasure(*p)).collect();
        let return_type = self.erasure(original.return_type);
        let thrown = original.thrown.iter().map(|t| self.erasure(*t)).collect();
        let id = self.types.add_method(MethodBinding {
            declaring_class: declaring,
            type_variables: Vec::new(),
            parameters,
            return_type,
            thrown,
            origin: MethodOrigin::RawGeneric {
                original: generic,
                raw_type: declaring,
            },
            ..original
        });
        self.session.method_caches.generic.entry(generic).or_default().push(id);
        id
    }

    /// The variant of a signature-polymorphic method for one call shape. Argument
    /// types are erased and `null` stands for `java.lang.Void`.
    pub fn polymorphic_method(&mut self, original: MethodId, arguments: &[TypeId]) -> MethodId {
        let mut parameters = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let parameter = if *argument == TypeId::NULL {
                let module = self.unnamed;
                self.well_known_type(module, &["java", "lang", "Void"])
            } else {
                self.erasure(*argument)
            };
            parameters.push(parameter);
        }
        let return_type = self.types.method(original).return_type;
        self.polymorphic_variant(original, parameters, return_type)
    }

    /// `binding` with its return type replaced, reusing a matching variant.
    pub fn update_polymorphic_method_return_type(&mut self, binding: MethodId, return_type: TypeId) -> MethodId {
        let method = self.types.method(binding);
        let original = method.original(binding);
        let parameters = method.parameters.clone();
        self.polymorphic_variant(original, parameters, return_type)
    }

    fn polymorphic_variant(&mut self, original: MethodId, parameters: Vec<TypeId>, return_type: TypeId) -> MethodId {
        let template = self.types.method(original).clone();
        let cached = self
            .session
            .method_caches
            .polymorphic
            .get(&template.selector)
            .cloned()
            .unwrap_or_default();
        // Variants of `invoke` on different handle classes share a selector.
        if let Some(existing) = cached.into_iter().find(|candidate| {
            let method = self.types.method(*candidate);
            method.parameters == parameters
                && method.return_type == return_type
                && method.declaring_class == template.declaring_class
        }) {
            return existing;
        }

        let selector = template.selector.clone();
        let id = self.types.add_method(MethodBinding {
            type_variables: Vec::new(),
            parameters,
            return_type,
            origin: MethodOrigin::Polymorphic { original },
            ..template
        });
        self.session.method_caches.polymorphic.entry(selector).or_default().push(id);
        id
    }

    /// `getClass()` specialized to `receiver`: returns `Class<? extends |receiver|>`.
    pub fn get_class_method(&mut self, receiver: TypeId, original: MethodId) -> MethodId {
        if let Some(existing) = self.session.method_caches.get_class.get(&(receiver, original)) {
            return *existing;
        }
        let template = self.types.method(original).clone();
        let return_type = match self.types.declaration_of(template.return_type) {
            Some(class_type) => {
                let bound = self.erasure(receiver);
                let wildcard = self.types.wildcard(class_type, 0, Some(bound), &[], WildcardKind::Extends, &[]);
                self.types.parameterized_type(class_type, &[wildcard], None, &[])
            }
            None => template.return_type,
        };
        let id = self.types.add_method(MethodBinding {
            return_type,
            origin: MethodOrigin::GetClass { original, receiver },
            ..template
        });
        self.session.method_caches.get_class.insert((receiver, original), id);
        id
    }

    /// Boxing for base types, unboxing for wrapper classes (also through the
    /// erasure of type variables, wildcards and intersections). Anything else is
    /// returned unchanged.
    pub fn compute_boxing_type(&mut self, ty: TypeId) -> Result<TypeId> {
        match self.types.kind(ty).clone() {
            TypeKind::Base(base) => {
                let Some(name) = base.box_name() else {
                    return Ok(ty);
                };
                let compound: Vec<String> = name.iter().map(|s| s.to_string()).collect();
                let module = self.java_base_module().unwrap_or(self.unnamed);
                match self.get_type(module, &compound)? {
                    Some(boxed) if !self.types.is_problem(boxed) => Ok(boxed),
                    _ => Ok(self.problem(&compound, None, ProblemReason::NotFound)),
                }
            }
            TypeKind::Class(_) => Ok(self.unboxed(ty).unwrap_or(ty)),
            TypeKind::TypeVariable(_)
            | TypeKind::Wildcard { .. }
            | TypeKind::Intersection(_)
            | TypeKind::Captured(_) => {
                let erased = self.erasure(ty);
                Ok(self.unboxed(erased).unwrap_or(ty))
            }
            _ => Ok(ty),
        }
    }

    fn unboxed(&self, ty: TypeId) -> Option<TypeId> {
        let class = self.types.class_of(ty)?;
        BaseKind::ALL
            .into_iter()
            .filter(|base| *base != BaseKind::Void)
            .find(|base| {
                base.box_name()
                    .is_some_and(|name| class.compound_name.iter().map(String::as_str).eq(name.iter().copied()))
            })
            .map(BaseKind::type_id)
    }

    fn is_java_lang_object(&self, ty: TypeId) -> bool {
        self.types
            .class_of(ty)
            .is_some_and(|c| c.compound_name == ["java", "lang", "Object"])
    }

    fn has_enclosing_instance_context(&self, ty: TypeId) -> bool {
        self.types
            .declaration_of(ty)
            .and_then(|d| self.types.class_of(d))
            .is_some_and(|c| c.enclosing.is_some() && !c.is_static())
    }

    fn enclosing_of(&self, ty: TypeId) -> Option<TypeId> {
        match self.types.kind(ty) {
            TypeKind::Parameterized { enclosing, .. } | TypeKind::Raw { enclosing, .. } => *enclosing,
            TypeKind::Class(_) => self.types.class_of(ty).and_then(|c| c.enclosing),
            _ => None,
        }
    }

    /// The leaf and dimension count of an array, or `ty` itself with zero.
    fn split_array(&self, ty: TypeId) -> (TypeId, usize) {
        match self.types.kind(ty) {
            TypeKind::Array { leaf, dimensions } => (*leaf, *dimensions),
            _ => (ty, 0),
        }
    }

    /// Whether a raw conversion applies: generic declarations and parameterized
    /// forms of generic declarations.
    fn needs_raw_conversion(&self, ty: TypeId) -> bool {
        match self.types.kind(ty) {
            TypeKind::Class(_) => self.types.class_of(ty).is_some_and(|c| c.is_generic()),
            TypeKind::Parameterized { generic, .. } => self.types.class_of(*generic).is_some_and(|c| c.is_generic()),
            _ => false,
        }
    }

    fn rebuild_array(&mut self, ty: TypeId, original_leaf: TypeId, converted: TypeId, dimensions: usize) -> TypeId {
        if converted == original_leaf {
            ty
        } else {
            self.types.array_type(converted, dimensions, &[])
        }
    }

    /// The raw form of `ty`: generic and parameterized types become raw, array
    /// leaves are converted, other forms are returned unchanged.
    /// `force_raw_enclosing` converts enclosing types of member types as well.
    pub fn convert_to_raw_type(&mut self, ty: TypeId, force_raw_enclosing: bool) -> TypeId {
        if matches!(
            self.types.kind(ty),
            TypeKind::Base(_) | TypeKind::TypeVariable(_) | TypeKind::Wildcard { .. } | TypeKind::Intersection(_) | TypeKind::Raw { .. }
        ) || self.is_java_lang_object(ty)
        {
            return ty;
        }
        let (leaf, dimensions) = self.split_array(ty);
        if !matches!(self.types.kind(leaf), TypeKind::Class(_) | TypeKind::Parameterized { .. }) {
            return ty;
        }
        let mut needs_converting = self.needs_raw_conversion(leaf);
        let force_raw_enclosing = force_raw_enclosing && !self.is_static_type(leaf);
        let erased = self.erasure(leaf);
        let converted = match self.enclosing_of(leaf) {
            None => {
                if needs_converting {
                    self.types.raw_type(erased, None, &[])
                } else {
                    leaf
                }
            }
            Some(enclosing) => {
                let converted_enclosing = if !self.has_enclosing_instance_context(leaf) {
                    self.types.declaration_of(enclosing).unwrap_or(enclosing)
                } else if matches!(self.types.kind(enclosing), TypeKind::Raw { .. }) {
                    needs_converting = true;
                    enclosing
                } else if force_raw_enclosing && !needs_converting {
                    let converted = self.convert_to_raw_type(enclosing, true);
                    needs_converting = converted != enclosing;
                    converted
                } else if needs_converting {
                    self.convert_to_raw_type(enclosing, false)
                } else {
                    self.convert_to_parameterized_type(enclosing)
                };
                if needs_converting {
                    self.types.raw_type(erased, Some(converted_enclosing), &[])
                } else if converted_enclosing != enclosing {
                    self.types.parameterized_type(erased, &[], Some(converted_enclosing), &[])
                } else {
                    leaf
                }
            }
        };
        self.rebuild_array(ty, leaf, converted, dimensions)
    }

    fn is_static_type(&self, ty: TypeId) -> bool {
        self.types
            .declaration_of(ty)
            .and_then(|d| self.types.class_of(d))
            .is_some_and(|c| c.is_static())
    }

    /// A generic declaration (or a member of one, in an instance context) as its
    /// own parameterization: `X<E>` becomes `X<E>` parameterized by its variables.
    pub fn convert_to_parameterized_type(&mut self, ty: TypeId) -> TypeId {
        let Some(class) = self.types.class_of(ty) else {
            return ty;
        };
        let (is_generic, variables, enclosing) = (class.is_generic(), class.type_variables.clone(), class.enclosing);
        let instance_context = self.has_enclosing_instance_context(ty);
        if !is_generic && !instance_context {
            return ty;
        }
        let mut needs_converting = is_generic;
        let mut converted_enclosing = enclosing;
        if let (Some(outer), true) = (enclosing, instance_context) {
            let converted = self.convert_to_parameterized_type(outer);
            needs_converting |= converted != outer;
            converted_enclosing = Some(converted);
        }
        if !needs_converting {
            return ty;
        }
        let arguments = if is_generic { variables } else { Vec::new() };
        self.types.parameterized_type(ty, &arguments, converted_enclosing, &[])
    }

    /// Raw conversion for types read from binaries: a generic type referenced
    /// without arguments is raw. Unresolved placeholders are left alone since
    /// their generics are not known yet.
    pub(crate) fn convert_unresolved_binary_to_raw_type(&mut self, ty: TypeId) -> TypeId {
        if matches!(
            self.types.kind(ty),
            TypeKind::Base(_) | TypeKind::TypeVariable(_) | TypeKind::Wildcard { .. } | TypeKind::Intersection(_) | TypeKind::Raw { .. }
        ) || self.is_java_lang_object(ty)
        {
            return ty;
        }
        let (leaf, dimensions) = self.split_array(ty);
        if !matches!(self.types.kind(leaf), TypeKind::Class(_) | TypeKind::Parameterized { .. }) {
            return ty;
        }
        if self.types.class_of(leaf).is_some_and(|c| c.is_unresolved()) {
            return ty;
        }
        let mut needs_converting = self.needs_raw_conversion(leaf);
        let converted = match self.enclosing_of(leaf) {
            None => {
                if needs_converting {
                    let erased = self.erasure(leaf);
                    self.types.raw_type(erased, None, &[])
                } else {
                    leaf
                }
            }
            Some(enclosing) => {
                if !needs_converting && self.is_static_type(leaf) {
                    return leaf;
                }
                let converted_enclosing = self.convert_unresolved_binary_to_raw_type(enclosing);
                needs_converting |= converted_enclosing != enclosing;
                if needs_converting {
                    let erased = self.erasure(leaf);
                    self.types.raw_type(erased, Some(converted_enclosing), &[])
                } else {
                    leaf
                }
            }
        };
        self.rebuild_array(ty, leaf, converted, dimensions)
    }
}
