//! Erasure, substitution, capture and subtyping over interned bindings.

use std::collections::{HashSet, VecDeque};

use crate::binding::{TypeId, TypeKind, UnitId, WildcardKind};
use crate::environment::LookupEnvironment;
use crate::problem::Result;

/// Type variables paired with the arguments that replace them.
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    variables: &'a [TypeId],
    arguments: &'a [TypeId],
}

impl<'a> Substitution<'a> {
    pub fn new(variables: &'a [TypeId], arguments: &'a [TypeId]) -> Self {
        Self { variables, arguments }
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() || self.arguments.is_empty()
    }

    fn get(&self, variable: TypeId) -> Option<TypeId> {
        let index = self.variables.iter().position(|v| *v == variable)?;
        self.arguments.get(index).copied()
    }
}

impl LookupEnvironment {
    /// The erasure of `ty` (JLS 4.6). Annotations are dropped.
    pub fn erasure(&mut self, ty: TypeId) -> TypeId {
        let ty = self.types.unannotated(ty);
        match self.types.kind(ty).clone() {
            TypeKind::Base(_) | TypeKind::Class(_) | TypeKind::Problem(_) => ty,
            TypeKind::Parameterized { generic, .. } | TypeKind::Raw { generic, .. } => {
                self.types.unannotated(generic)
            }
            TypeKind::Array { leaf, dimensions } => {
                let erased = self.erasure(leaf);
                if erased == leaf {
                    ty
                } else {
                    self.types.array_type(erased, dimensions, &[])
                }
            }
            TypeKind::TypeVariable(id) => {
                let bound = self.types.type_var(id).bounds().next();
                self.erasure_of_bound(bound)
            }
            TypeKind::Captured(id) => {
                let capture = self.types.capture(id);
                let bound = capture.first_bound.or(capture.superclass);
                match bound {
                    Some(bound) => self.erasure(bound),
                    None => {
                        let wildcard = capture.wildcard;
                        self.erasure(wildcard)
                    }
                }
            }
            TypeKind::Wildcard { bound, kind, .. } => match kind {
                WildcardKind::Extends => self.erasure_of_bound(bound),
                WildcardKind::Unbound | WildcardKind::Super => self.erasure_of_bound(None),
            },
            TypeKind::Intersection(types) => self.erasure_of_bound(types.first().copied()),
        }
    }

    fn erasure_of_bound(&mut self, bound: Option<TypeId>) -> TypeId {
        match bound {
            Some(bound) => self.erasure(bound),
            None => {
                let module = self.unnamed;
                self.java_lang_object(module)
            }
        }
    }

    /// `ty` with every variable of `substitution` replaced. Bindings that do not
    /// mention a substituted variable come back unchanged.
    pub fn substitute(&mut self, ty: TypeId, substitution: &Substitution<'_>) -> TypeId {
        if substitution.is_empty() {
            return ty;
        }
        let binding = self.types.get(ty).clone();
        let top = binding.top_annotations().to_vec();
        match binding.kind {
            TypeKind::TypeVariable(_) => substitution.get(self.types.unannotated(ty)).unwrap_or(ty),
            TypeKind::Parameterized {
                generic,
                arguments,
                enclosing,
            } => {
                let new_arguments: Vec<TypeId> = arguments.iter().map(|a| self.substitute(*a, substitution)).collect();
                let new_enclosing = enclosing.map(|e| self.substitute(e, substitution));
                if new_arguments == arguments && new_enclosing == enclosing {
                    return ty;
                }
                self.types
                    .parameterized_type(generic, &new_arguments, new_enclosing, &top)
            }
            TypeKind::Raw { generic, enclosing } => {
                let new_enclosing = enclosing.map(|e| self.substitute(e, substitution));
                if new_enclosing == enclosing {
                    return ty;
                }
                self.types.raw_type(generic, new_enclosing, &top)
            }
            TypeKind::Array { leaf, dimensions } => {
                let new_leaf = self.substitute(leaf, substitution);
                if new_leaf == leaf {
                    return ty;
                }
                self.types.array_type(new_leaf, dimensions, &binding.annotations)
            }
            TypeKind::Wildcard {
                generic,
                rank,
                bound,
                other_bounds,
                kind,
            } => {
                let new_bound = bound.map(|b| self.substitute(b, substitution));
                let new_others: Vec<TypeId> = other_bounds.iter().map(|b| self.substitute(*b, substitution)).collect();
                if new_bound == bound && new_others == other_bounds {
                    return ty;
                }
                self.types
                    .wildcard(generic, rank, new_bound, &new_others, kind, &top)
            }
            TypeKind::Intersection(types) => {
                let new_types: Vec<TypeId> = types.iter().map(|t| self.substitute(*t, substitution)).collect();
                if new_types == types {
                    return ty;
                }
                self.types.intersection_type(&new_types)
            }
            TypeKind::Base(_) | TypeKind::Class(_) | TypeKind::Captured(_) | TypeKind::Problem(_) => ty,
        }
    }

    /// Capture conversion (JLS 5.1.10) of a parameterized type at one position.
    /// Each wildcard argument becomes a capture whose bounds combine the wildcard
    /// bound with the declared bounds of its type variable.
    pub fn capture(&mut self, ty: TypeId, start: usize, end: usize, unit: Option<UnitId>) -> TypeId {
        let TypeKind::Parameterized {
            generic,
            arguments,
            enclosing,
        } = self.types.kind(ty).clone()
        else {
            return ty;
        };
        let has_wildcards = arguments
            .iter()
            .any(|a| matches!(self.types.kind(*a), TypeKind::Wildcard { .. }));
        if !has_wildcards {
            return ty;
        }

        let mut captured = Vec::with_capacity(arguments.len());
        let mut fresh = Vec::new();
        for argument in &arguments {
            if !matches!(self.types.kind(*argument), TypeKind::Wildcard { .. }) {
                captured.push(*argument);
                continue;
            }
            self.session.capture_counter += 1;
            let capture_id = self.session.capture_counter;
            let capture = self.types.captured_wildcard(*argument, ty, start, end, unit, capture_id);
            if let TypeKind::Captured(id) = self.types.kind(capture) {
                if self.types.capture(*id).first_bound.is_none() {
                    fresh.push((*id, *argument));
                }
            }
            captured.push(capture);
        }

        let variables = self
            .types
            .class_of(generic)
            .map(|c| c.type_variables.clone())
            .unwrap_or_default();
        let substitution = Substitution::new(&variables, &captured);
        for (id, wildcard) in fresh {
            let (rank, bound, kind) = match self.types.kind(wildcard).clone() {
                TypeKind::Wildcard { rank, bound, kind, .. } => (rank, bound, kind),
                _ => continue,
            };
            let (declared_first, declared_superclass, declared_interfaces) =
                match variables.get(rank).and_then(|v| self.types.type_var_id(*v)) {
                    Some(var) => {
                        let variable = self.types.type_var(var);
                        (variable.first_bound, variable.superclass, variable.superinterfaces.clone())
                    }
                    None => (None, None, Vec::new()),
                };
            let mut superclass = declared_superclass.map(|s| self.substitute(s, &substitution));
            let mut superinterfaces: Vec<TypeId> = declared_interfaces
                .iter()
                .map(|i| self.substitute(*i, &substitution))
                .collect();
            let mut lower_bound = None;
            match (kind, bound) {
                (WildcardKind::Extends, Some(bound)) => {
                    let is_interface = self
                        .types
                        .declaration_of(bound)
                        .and_then(|d| self.types.class_of(d))
                        .is_some_and(|c| c.is_interface());
                    if is_interface {
                        if !superinterfaces.contains(&bound) {
                            superinterfaces.insert(0, bound);
                        }
                    } else if !self.types.is_type_variable(bound) || superclass.is_none() {
                        superclass = Some(bound);
                    }
                }
                (WildcardKind::Super, Some(bound)) => lower_bound = Some(bound),
                _ => {}
            }
            let superclass = match superclass {
                Some(superclass) => superclass,
                None => {
                    let module = self.unnamed;
                    self.java_lang_object(module)
                }
            };
            let first_bound = match (kind, bound, declared_first) {
                (WildcardKind::Extends, Some(bound), _) => bound,
                (_, _, Some(declared)) => self.substitute(declared, &substitution),
                _ => superclass,
            };
            let capture = self.types.capture_mut(id);
            capture.lower_bound = lower_bound;
            capture.superclass = Some(superclass);
            capture.superinterfaces = superinterfaces;
            capture.first_bound = Some(first_bound);
        }
        self.types.parameterized_type(generic, &captured, enclosing, &[])
    }

    /// Whether `container` contains the type argument `contained` (JLS 4.5.1).
    pub fn type_arguments_contain(&mut self, container: TypeId, contained: TypeId) -> Result<bool> {
        let container = self.types.unannotated(container);
        let contained = self.types.unannotated(contained);
        if container == contained {
            return Ok(true);
        }
        let TypeKind::Wildcard { bound, kind, .. } = self.types.kind(container).clone() else {
            return Ok(false);
        };
        let (contained_kind, contained_bound) = match self.types.kind(contained) {
            TypeKind::Wildcard { bound, kind, .. } => (Some(*kind), *bound),
            _ => (None, Some(contained)),
        };
        match (kind, bound) {
            (WildcardKind::Unbound, _) => Ok(true),
            (WildcardKind::Extends, Some(upper)) => match (contained_kind, contained_bound) {
                (None | Some(WildcardKind::Extends), Some(inner)) => self.is_subtype(inner, upper),
                (Some(WildcardKind::Super), _) | (Some(WildcardKind::Unbound), _) => Ok(self.is_java_lang_object_type(upper)),
                _ => Ok(false),
            },
            (WildcardKind::Super, Some(lower)) => match (contained_kind, contained_bound) {
                (None | Some(WildcardKind::Super), Some(inner)) => self.is_subtype(lower, inner),
                _ => Ok(false),
            },
            _ => Ok(false),
        }
    }

    fn is_java_lang_object_type(&self, ty: TypeId) -> bool {
        self.types
            .class_of(ty)
            .is_some_and(|c| c.compound_name == ["java", "lang", "Object"])
    }

    /// Whether two type arguments are provably distinct (JLS 4.5).
    pub fn is_provably_distinct(&mut self, one: TypeId, two: TypeId) -> Result<bool> {
        let one = self.types.unannotated(one);
        let two = self.types.unannotated(two);
        if one == two {
            return Ok(false);
        }
        let one_open = self.is_variable_or_wildcard(one);
        let two_open = self.is_variable_or_wildcard(two);
        match (one_open, two_open) {
            (false, false) => Ok(true),
            (true, false) => {
                let bound = self.upper_bound(one);
                Ok(!self.is_subtype_of_erasure(bound, two)? && !self.is_subtype_of_erasure(two, bound)?)
            }
            (false, true) => {
                let bound = self.upper_bound(two);
                Ok(!self.is_subtype_of_erasure(bound, one)? && !self.is_subtype_of_erasure(one, bound)?)
            }
            (true, true) => {
                let (first, second) = (self.upper_bound(one), self.upper_bound(two));
                Ok(!self.is_subtype_of_erasure(first, second)? && !self.is_subtype_of_erasure(second, first)?)
            }
        }
    }

    fn is_variable_or_wildcard(&self, ty: TypeId) -> bool {
        matches!(
            self.types.kind(ty),
            TypeKind::TypeVariable(_) | TypeKind::Captured(_) | TypeKind::Wildcard { .. }
        )
    }

    fn upper_bound(&mut self, ty: TypeId) -> TypeId {
        match self.types.kind(ty).clone() {
            TypeKind::Wildcard {
                kind: WildcardKind::Extends,
                bound: Some(bound),
                ..
            } => bound,
            TypeKind::TypeVariable(id) => {
                let bound = self.types.type_var(id).bounds().next();
                match bound {
                    Some(bound) => bound,
                    None => self.erasure_of_bound(None),
                }
            }
            TypeKind::Captured(id) => {
                let capture = self.types.capture(id);
                match capture.first_bound.or(capture.superclass) {
                    Some(bound) => bound,
                    None => self.erasure_of_bound(None),
                }
            }
            _ => self.erasure_of_bound(None),
        }
    }

    /// Whether the erasure of `sub` is a subtype of the erasure of `sup`.
    pub fn is_subtype_of_erasure(&mut self, sub: TypeId, sup: TypeId) -> Result<bool> {
        let sub = self.erasure(sub);
        let sup = self.erasure(sup);
        self.is_subtype(sub, sup)
    }

    /// Subtyping between reference types, with containment for type arguments.
    /// A raw supertype never satisfies a parameterized one.
    pub fn is_subtype(&mut self, sub: TypeId, sup: TypeId) -> Result<bool> {
        let sub = self.types.unannotated(sub);
        let sup = self.types.unannotated(sup);
        if sub == sup {
            return Ok(true);
        }
        if self.types.is_base(sub) || self.types.is_base(sup) {
            return Ok(sub == TypeId::NULL && !self.types.is_base(sup));
        }
        if self.is_java_lang_object_type(sup) {
            return Ok(true);
        }

        match self.types.kind(sup).clone() {
            TypeKind::Intersection(types) => {
                for ty in types {
                    if !self.is_subtype(sub, ty)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
            TypeKind::Captured(id) => {
                if let Some(lower) = self.types.capture(id).lower_bound {
                    if self.is_subtype(sub, lower)? {
                        return Ok(true);
                    }
                }
            }
            _ => {}
        }

        match self.types.kind(sub).clone() {
            TypeKind::TypeVariable(id) => {
                let bounds: Vec<TypeId> = self.types.type_var(id).bounds().collect();
                self.any_subtype(&bounds, sup)
            }
            TypeKind::Captured(id) => {
                let capture = self.types.capture(id);
                let bounds: Vec<TypeId> = capture
                    .first_bound
                    .into_iter()
                    .chain(capture.superclass)
                    .chain(capture.superinterfaces.iter().copied())
                    .collect();
                self.any_subtype(&bounds, sup)
            }
            TypeKind::Intersection(types) => self.any_subtype(&types, sup),
            TypeKind::Array { leaf, dimensions } => self.is_array_subtype(leaf, dimensions, sup),
            TypeKind::Class(_) | TypeKind::Parameterized { .. } | TypeKind::Raw { .. } => {
                let Some(declaration) = self.types.declaration_of(sup) else {
                    return Ok(false);
                };
                let Some(found) = self.find_super_type_originating_from(sub, declaration)? else {
                    return Ok(false);
                };
                let TypeKind::Parameterized { arguments, .. } = self.types.kind(sup).clone() else {
                    return Ok(true);
                };
                let TypeKind::Parameterized {
                    arguments: found_arguments,
                    ..
                } = self.types.kind(found).clone()
                else {
                    return Ok(false);
                };
                if arguments.len() != found_arguments.len() {
                    return Ok(false);
                }
                for (container, contained) in arguments.iter().zip(&found_arguments) {
                    if !self.type_arguments_contain(*container, *contained)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn any_subtype(&mut self, candidates: &[TypeId], sup: TypeId) -> Result<bool> {
        for candidate in candidates {
            if self.is_subtype(*candidate, sup)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_array_subtype(&mut self, leaf: TypeId, dimensions: usize, sup: TypeId) -> Result<bool> {
        match self.types.kind(sup).clone() {
            TypeKind::Array {
                leaf: sup_leaf,
                dimensions: sup_dimensions,
            } => {
                if self.types.is_base(leaf) || self.types.is_base(sup_leaf) {
                    return Ok(leaf == sup_leaf && dimensions == sup_dimensions);
                }
                if dimensions < sup_dimensions {
                    return Ok(false);
                }
                let component = self.types.array_type(leaf, dimensions - sup_dimensions, &[]);
                self.is_subtype(component, sup_leaf)
            }
            _ => Ok(self.types.class_of(sup).is_some_and(|c| {
                c.compound_name == ["java", "lang", "Cloneable"] || c.compound_name == ["java", "io", "Serializable"]
            })),
        }
    }

    /// The supertype of `ty` (itself included) whose declaration is `declaration`,
    /// instantiated along the way: supertypes of a parameterized type are
    /// substituted and supertypes of a raw type are raw.
    pub fn find_super_type_originating_from(&mut self, ty: TypeId, declaration: TypeId) -> Result<Option<TypeId>> {
        let declaration = self.types.unannotated(declaration);
        let mut visited = HashSet::new();
        let mut pending = VecDeque::from([ty]);
        while let Some(next) = pending.pop_front() {
            let next = self.resolve_type(self.types.unannotated(next), false)?;
            let Some(current) = self.types.declaration_of(next) else {
                continue;
            };
            if current == declaration {
                return Ok(Some(next));
            }
            if !visited.insert(next) {
                continue;
            }
            pending.extend(self.direct_supertypes(next)?);
        }
        Ok(None)
    }

    /// Declared superclass and superinterfaces of `ty`, instantiated for `ty`.
    pub(crate) fn direct_supertypes(&mut self, ty: TypeId) -> Result<Vec<TypeId>> {
        let Some(declaration) = self.types.declaration_of(ty) else {
            return Ok(Vec::new());
        };
        let declaration = self.resolve_type(declaration, false)?;
        let Some(class) = self.types.class_of(declaration) else {
            return Ok(Vec::new());
        };
        let variables = class.type_variables.clone();
        let declared: Vec<TypeId> = class
            .superclass
            .into_iter()
            .chain(class.superinterfaces.iter().copied())
            .collect();
        let mut supertypes = Vec::with_capacity(declared.len());
        match self.types.kind(ty).clone() {
            TypeKind::Parameterized { arguments, .. } => {
                let substitution = Substitution::new(&variables, &arguments);
                for supertype in declared {
                    let supertype = self.resolve_type(supertype, false)?;
                    supertypes.push(self.substitute(supertype, &substitution));
                }
            }
            TypeKind::Raw { .. } => {
                for supertype in declared {
                    let supertype = self.resolve_type(supertype, false)?;
                    let erased = self.erasure(supertype);
                    supertypes.push(self.convert_to_raw_type(erased, false));
                }
            }
            _ => {
                for supertype in declared {
                    supertypes.push(self.resolve_type(supertype, false)?);
                }
            }
        }
        Ok(supertypes)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use tern_config::CompilerOptions;

    use super::*;
    use crate::binding::{ClassBinding, ClassOrigin, HierarchyState, TypeVariableBinding, TypeVariableOwner};
    use crate::memory::InMemoryNameEnvironment;
    use crate::oracle::DefaultRequestor;
    use crate::problem::CollectingReporter;

    struct Fixture {
        env: LookupEnvironment,
        object: TypeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut env = LookupEnvironment::new(
                CompilerOptions::default(),
                Rc::new(InMemoryNameEnvironment::without_module_system()),
                Rc::new(DefaultRequestor),
                Rc::new(CollectingReporter::new()),
            );
            let object = Self::declare(&mut env, &["java", "lang", "Object"], None, &[]);
            Self { env, object }
        }

        fn declare(env: &mut LookupEnvironment, name: &[&str], superclass: Option<TypeId>, variables: &[&str]) -> TypeId {
            let module = env.unnamed_module();
            let compound: Vec<String> = name.iter().map(|s| s.to_string()).collect();
            let (simple, package_name) = compound.split_last().unwrap();
            let package = env.create_plain_package(module, package_name).unwrap();
            let mut class = ClassBinding::skeleton(compound.clone(), package, module, ClassOrigin::Binary);
            class.superclass = superclass;
            class.hierarchy = HierarchyState::Connected;
            let ty = env.types_mut().add_class(class);
            env.add_type_to_package(package, simple, ty);
            let variables: Vec<TypeId> = variables
                .iter()
                .enumerate()
                .map(|(rank, name)| {
                    env.types_mut().add_type_variable(TypeVariableBinding {
                        name: name.to_string(),
                        owner: TypeVariableOwner::Type(ty),
                        rank,
                        superclass: None,
                        superinterfaces: Vec::new(),
                        first_bound: None,
                    })
                })
                .collect();
            env.types_mut().class_of_mut(ty).unwrap().type_variables = variables;
            ty
        }

        fn class(&mut self, name: &str, superclass: Option<TypeId>, variables: &[&str]) -> TypeId {
            let superclass = superclass.or(Some(self.object));
            Self::declare(&mut self.env, &[name], superclass, variables)
        }

        fn variables(&self, ty: TypeId) -> Vec<TypeId> {
            self.env.types().class_of(ty).unwrap().type_variables.clone()
        }
    }

    #[test]
    fn erasure_of_every_form() {
        let mut f = Fixture::new();
        let list = f.class("List", None, &["E"]);
        let element = f.variables(list)[0];
        let string = f.class("String", None, &[]);
        let parameterized = f.env.types_mut().parameterized_type(list, &[string], None, &[]);
        let array = f.env.types_mut().array_type(parameterized, 2, &[]);

        assert_eq!(f.env.erasure(parameterized), list);
        assert_eq!(f.env.erasure(element), f.object);
        let erased_array = f.env.erasure(array);
        assert_eq!(erased_array, f.env.types_mut().array_type(list, 2, &[]));
        let wildcard = f.env.types_mut().wildcard(list, 0, Some(string), &[], WildcardKind::Extends, &[]);
        assert_eq!(f.env.erasure(wildcard), string);
        assert_eq!(f.env.erasure(TypeId::INT), TypeId::INT);
    }

    #[test]
    fn substitution_rebuilds_only_what_changes() {
        let mut f = Fixture::new();
        let list = f.class("List", None, &["E"]);
        let element = f.variables(list)[0];
        let string = f.class("String", None, &[]);
        let list_of_e = f.env.types_mut().parameterized_type(list, &[element], None, &[]);

        let variables = [element];
        let arguments = [string];
        let substitution = Substitution::new(&variables, &arguments);
        let list_of_string = f.env.substitute(list_of_e, &substitution);
        assert_eq!(list_of_string, f.env.types_mut().parameterized_type(list, &[string], None, &[]));
        assert_eq!(f.env.substitute(string, &substitution), string);
    }

    #[test]
    fn subtyping_follows_substituted_supertypes() {
        let mut f = Fixture::new();
        let number = f.class("Number", None, &[]);
        let integer = f.class("Integer", Some(number), &[]);
        let collection = f.class("Collection", None, &["E"]);
        let list = f.class("List", None, &["T"]);
        let list_variable = f.variables(list)[0];
        let collection_of_t = f.env.types_mut().parameterized_type(collection, &[list_variable], None, &[]);
        f.env.types_mut().class_of_mut(list).unwrap().superclass = Some(collection_of_t);

        let list_of_integer = f.env.types_mut().parameterized_type(list, &[integer], None, &[]);
        let collection_of_integer = f.env.types_mut().parameterized_type(collection, &[integer], None, &[]);
        let collection_of_number = f.env.types_mut().parameterized_type(collection, &[number], None, &[]);
        let extends_number = f.env.types_mut().wildcard(collection, 0, Some(number), &[], WildcardKind::Extends, &[]);
        let collection_of_extends = f.env.types_mut().parameterized_type(collection, &[extends_number], None, &[]);

        assert!(f.env.is_subtype(list_of_integer, collection_of_integer).unwrap());
        assert!(!f.env.is_subtype(list_of_integer, collection_of_number).unwrap());
        assert!(f.env.is_subtype(list_of_integer, collection_of_extends).unwrap());
        assert!(f.env.is_subtype_of_erasure(list_of_integer, collection_of_number).unwrap());
        assert_eq!(
            f.env.find_super_type_originating_from(list_of_integer, collection).unwrap(),
            Some(collection_of_integer)
        );
    }

    #[test]
    fn provably_distinct_arguments() {
        let mut f = Fixture::new();
        let number = f.class("Number", None, &[]);
        let integer = f.class("Integer", Some(number), &[]);
        let string = f.class("String", None, &[]);
        let holder = f.class("Holder", None, &["T"]);
        let extends_number = f.env.types_mut().wildcard(holder, 0, Some(number), &[], WildcardKind::Extends, &[]);

        assert!(f.env.is_provably_distinct(integer, string).unwrap());
        assert!(!f.env.is_provably_distinct(integer, integer).unwrap());
        assert!(!f.env.is_provably_distinct(extends_number, integer).unwrap());
        assert!(f.env.is_provably_distinct(extends_number, string).unwrap());
    }

    #[test]
    fn capture_is_stable_per_position() {
        let mut f = Fixture::new();
        let number = f.class("Number", None, &[]);
        let list = f.class("List", None, &["E"]);
        let extends_number = f.env.types_mut().wildcard(list, 0, Some(number), &[], WildcardKind::Extends, &[]);
        let list_of_extends = f.env.types_mut().parameterized_type(list, &[extends_number], None, &[]);

        let captured = f.env.capture(list_of_extends, 3, 9, None);
        assert_eq!(captured, f.env.capture(list_of_extends, 3, 9, None));
        assert_ne!(captured, f.env.capture(list_of_extends, 12, 20, None));

        let TypeKind::Parameterized { arguments, .. } = f.env.types().kind(captured).clone() else {
            panic!("capture of a parameterized type stays parameterized");
        };
        let TypeKind::Captured(id) = f.env.types().kind(arguments[0]).clone() else {
            panic!("wildcard argument was not captured");
        };
        assert_eq!(f.env.types().capture(id).first_bound, Some(number));
        assert_eq!(f.env.erasure(arguments[0]), number);
        assert!(f.env.is_subtype(arguments[0], number).unwrap());
    }
}
