//! Bindings for class files handed over by the oracle.

use tern_classfile::{
    flags, parse_class_signature, parse_field_descriptor, parse_field_signature,
    parse_method_descriptor, parse_method_signature, BinaryMethod, BinaryType, ReturnType,
    TypeAnnotation, TypeAnnotationTarget, TypeParameter,
};

use crate::binding::{
    AccessRestriction, AnnotationBinding, ClassBinding, ClassOrigin, DeclKind, FieldBinding, HierarchyState,
    MethodBinding, MethodOrigin, ModuleId, PackageId, TypeId, TypeVariableBinding,
    TypeVariableOwner,
};
use crate::environment::LookupEnvironment;
use crate::package::Known;
use crate::problem::Result;
use crate::signature::{SignatureScope, TypeAnnotationWalker};

const POLYMORPHIC_SIGNATURE_OWNERS: [&str; 2] =
    ["java/lang/invoke/MethodHandle", "java/lang/invoke/VarHandle"];

fn compound_of(internal_name: &str) -> Vec<String> {
    internal_name.split('/').map(str::to_string).collect()
}

fn index_u8(index: usize) -> u8 {
    u8::try_from(index).unwrap_or(u8::MAX)
}

impl LookupEnvironment {
    /// Creates the binding for `binary` in `package`.
    ///
    /// An unresolved placeholder of the same name becomes this binding in place, so
    /// every id handed out for the placeholder keeps working. Returns the existing
    /// binding when the type is already known from a class file and `None` when a
    /// source type of that name exists.
    pub fn create_binary_type_from(
        &mut self,
        binary: &BinaryType,
        package: PackageId,
        restriction: Option<AccessRestriction>,
    ) -> Result<Option<TypeId>> {
        let compound_name = binary.compound_name();
        let name = compound_name.last().cloned().unwrap_or_default();
        let placeholder = match self.packages.get(package).known_type(&name) {
            Some(Known::Found(existing)) => match self.types.class_of(existing).map(|c| c.origin) {
                Some(ClassOrigin::Unresolved { .. }) => Some(existing),
                Some(ClassOrigin::Binary | ClassOrigin::Missing) => return Ok(Some(existing)),
                _ => return Ok(None),
            },
            _ => None,
        };

        let module = self.packages.get(package).enclosing_module();
        let mut class = ClassBinding::skeleton(compound_name.clone(), package, module, ClassOrigin::Binary);
        class.decl_kind = if binary.super_class.as_deref() == Some("java/lang/Record") {
            DeclKind::Record
        } else {
            DeclKind::from_access_flags(binary.access_flags)
        };
        class.modifiers = binary.access_flags;
        class.source_name = binary.simple_name().to_string();
        class.hierarchy = HierarchyState::Connecting;
        class.has_missing_type = !binary.missing_type_names.is_empty();
        let ty = match placeholder {
            Some(existing) => {
                self.types.redefine_class(existing, class);
                existing
            }
            None => self.types.add_class(class),
        };
        self.add_type_to_package(package, &name, ty);
        if let Some(restriction) = restriction {
            self.access_restrictions.insert(ty, restriction);
        }
        tracing::debug!(target: "tern.lookup", name = %binary.internal_name, placeholder = placeholder.is_some(), "binary type created");

        self.cache_binary_parts(ty, module, binary)?;
        if self.options.stores_annotations() {
            self.cache_binary_annotations(ty, module, binary)?;
        }
        if let Some(class) = self.types.class_of_mut(ty) {
            class.hierarchy = HierarchyState::Connected;
        }
        Ok(Some(ty))
    }

    fn cache_binary_annotations(&mut self, ty: TypeId, module: ModuleId, binary: &BinaryType) -> Result<()> {
        let mut annotations = Vec::with_capacity(binary.annotations.len());
        for name in &binary.annotations {
            let was_missing = binary.missing_type_names.iter().any(|m| m == name);
            let annotation_type = self.type_from_constant_pool_name(module, name, was_missing)?;
            annotations.push(AnnotationBinding { annotation_type });
        }
        if let Some(class) = self.types.class_of_mut(ty) {
            class.annotations = annotations;
        }
        Ok(())
    }

    fn cache_binary_parts(&mut self, ty: TypeId, module: ModuleId, binary: &BinaryType) -> Result<()> {
        let missing = &binary.missing_type_names;
        let is_missing = |name: &str| missing.iter().any(|m| m == name);

        if let Some(enclosing) = &binary.enclosing_type {
            let enclosing_type =
                self.get_type_from_compound_name(module, &compound_of(enclosing), true, is_missing(enclosing))?;
            if let Some(class) = self.types.class_of_mut(ty) {
                class.enclosing = Some(enclosing_type);
            }
        }
        let mut members = Vec::with_capacity(binary.member_types.len());
        for member in &binary.member_types {
            let member_type = self.get_type_from_compound_name(
                module,
                &compound_of(&member.internal_name),
                true,
                is_missing(&member.internal_name),
            )?;
            if let Some(class) = self.types.class_of_mut(member_type) {
                if class.is_unresolved() {
                    class.source_name = member.simple_name.clone();
                    class.modifiers = member.access_flags;
                }
            }
            members.push(member_type);
        }
        if let Some(class) = self.types.class_of_mut(ty) {
            class.member_types = members;
        }

        let class_signature = binary
            .signature
            .as_deref()
            .map(parse_class_signature)
            .transpose()?;
        let signature_text = binary.signature.clone().unwrap_or_default();
        let scope = SignatureScope {
            module,
            method_type_variables: &[],
            enclosing_type: Some(ty),
            signature: &signature_text,
            missing_names: missing,
        };

        if let Some(signature) = &class_signature {
            let variables = self.create_type_variables(&signature.type_parameters, TypeVariableOwner::Type(ty));
            if let Some(class) = self.types.class_of_mut(ty) {
                class.type_variables = variables.clone();
            }
            self.decode_type_variable_bounds(&variables, &signature.type_parameters, &scope, &binary.type_annotations, false)?;
        }

        let is_object = binary.internal_name == "java/lang/Object";
        let (superclass, superinterfaces) = match &class_signature {
            Some(signature) => {
                let superclass = if is_object {
                    None
                } else {
                    let walker = TypeAnnotationWalker::new(
                        &binary.type_annotations,
                        TypeAnnotationTarget::SuperType(TypeAnnotationTarget::SUPERCLASS),
                    );
                    Some(self.type_from_class_signature(&signature.super_class, &scope, &walker)?)
                };
                let mut interfaces = Vec::with_capacity(signature.interfaces.len());
                for (index, interface) in signature.interfaces.iter().enumerate() {
                    let walker = TypeAnnotationWalker::new(
                        &binary.type_annotations,
                        TypeAnnotationTarget::SuperType(u16::try_from(index).unwrap_or(u16::MAX - 1)),
                    );
                    interfaces.push(self.type_from_class_signature(interface, &scope, &walker)?);
                }
                (superclass, interfaces)
            }
            None => {
                let superclass = match &binary.super_class {
                    Some(name) if !is_object => {
                        Some(self.type_from_constant_pool_name(module, name, is_missing(name))?)
                    }
                    _ => None,
                };
                let mut interfaces = Vec::with_capacity(binary.interfaces.len());
                for name in &binary.interfaces {
                    interfaces.push(self.type_from_constant_pool_name(module, name, is_missing(name))?);
                }
                (superclass, interfaces)
            }
        };
        if let Some(class) = self.types.class_of_mut(ty) {
            class.superclass = superclass;
            class.superinterfaces = superinterfaces;
        }

        let mut fields = Vec::with_capacity(binary.fields.len());
        for field in &binary.fields {
            let walker = TypeAnnotationWalker::new(&field.type_annotations, TypeAnnotationTarget::Field);
            let field_type = match &field.signature {
                Some(signature) => {
                    let parsed = parse_field_signature(signature)?;
                    let scope = SignatureScope { signature, ..scope };
                    self.type_from_type_signature(&parsed, &scope, &walker)?
                }
                None => {
                    let parsed = parse_field_descriptor(&field.descriptor)?;
                    let scope = SignatureScope {
                        signature: &field.descriptor,
                        ..scope
                    };
                    self.type_from_field_type(&parsed, &scope, &walker)?
                }
            };
            fields.push(self.types.add_field(FieldBinding {
                name: field.name.clone(),
                modifiers: field.access_flags,
                declaring_class: ty,
                ty: field_type,
            }));
        }

        let polymorphic_owner = POLYMORPHIC_SIGNATURE_OWNERS.contains(&binary.internal_name.as_str());
        let mut methods = Vec::with_capacity(binary.methods.len());
        for method in &binary.methods {
            methods.push(self.create_binary_method(ty, method, &scope, polymorphic_owner)?);
        }
        if let Some(class) = self.types.class_of_mut(ty) {
            class.fields = fields;
            class.methods = methods;
        }
        Ok(())
    }

    fn create_binary_method(
        &mut self,
        declaring_class: TypeId,
        method: &BinaryMethod,
        class_scope: &SignatureScope<'_>,
        polymorphic_owner: bool,
    ) -> Result<crate::binding::MethodId> {
        let annotations = &method.type_annotations;
        let mut variables = Vec::new();
        let mut parameters = Vec::new();
        let mut thrown = Vec::new();
        let return_type;
        match &method.signature {
            Some(signature) => {
                let parsed = parse_method_signature(signature)?;
                variables = self.create_type_variables(&parsed.type_parameters, TypeVariableOwner::Pending);
                let scope = SignatureScope {
                    method_type_variables: &variables,
                    signature,
                    ..*class_scope
                };
                self.decode_type_variable_bounds(&variables, &parsed.type_parameters, &scope, annotations, true)?;
                for (index, parameter) in parsed.parameters.iter().enumerate() {
                    let walker = TypeAnnotationWalker::new(
                        annotations,
                        TypeAnnotationTarget::MethodFormalParameter(index_u8(index)),
                    );
                    parameters.push(self.type_from_type_signature(parameter, &scope, &walker)?);
                }
                return_type = match &parsed.return_type {
                    Some(ret) => {
                        let walker = TypeAnnotationWalker::new(annotations, TypeAnnotationTarget::MethodReturn);
                        self.type_from_type_signature(ret, &scope, &walker)?
                    }
                    None => TypeId::VOID,
                };
                for (index, exception) in parsed.throws.iter().enumerate() {
                    let walker = TypeAnnotationWalker::new(
                        annotations,
                        TypeAnnotationTarget::Throws(u16::try_from(index).unwrap_or(u16::MAX)),
                    );
                    thrown.push(self.type_from_type_signature(exception, &scope, &walker)?);
                }
            }
            None => {
                let parsed = parse_method_descriptor(&method.descriptor)?;
                let scope = SignatureScope {
                    signature: &method.descriptor,
                    ..*class_scope
                };
                for (index, parameter) in parsed.params.iter().enumerate() {
                    let walker = TypeAnnotationWalker::new(
                        annotations,
                        TypeAnnotationTarget::MethodFormalParameter(index_u8(index)),
                    );
                    parameters.push(self.type_from_field_type(parameter, &scope, &walker)?);
                }
                return_type = match &parsed.return_type {
                    ReturnType::Void => TypeId::VOID,
                    ReturnType::Type(ret) => {
                        let walker = TypeAnnotationWalker::new(annotations, TypeAnnotationTarget::MethodReturn);
                        self.type_from_field_type(ret, &scope, &walker)?
                    }
                };
            }
        }
        // the Exceptions attribute stands in for a signature without throws
        if thrown.is_empty() {
            for name in &method.exceptions {
                let was_missing = class_scope.missing_names.iter().any(|m| m == name);
                thrown.push(self.type_from_constant_pool_name(class_scope.module, name, was_missing)?);
            }
        }
        let polymorphic_signature = polymorphic_owner
            && method.access_flags & flags::ACC_NATIVE != 0
            && method.access_flags & flags::ACC_VARARGS != 0;
        let id = self.types.add_method(MethodBinding {
            selector: method.name.clone(),
            modifiers: method.access_flags,
            declaring_class,
            type_variables: variables.clone(),
            parameters,
            return_type,
            thrown,
            origin: MethodOrigin::Declared,
            polymorphic_signature,
        });
        for variable in variables {
            if let Some(var_id) = self.types.type_var_id(variable) {
                self.types.type_var_mut(var_id).owner = TypeVariableOwner::Method(id);
            }
        }
        Ok(id)
    }

    /// First pass over type parameters: named variables without bounds, so bounds
    /// may refer to any of them.
    fn create_type_variables(&mut self, parameters: &[TypeParameter], owner: TypeVariableOwner) -> Vec<TypeId> {
        parameters
            .iter()
            .enumerate()
            .map(|(rank, parameter)| {
                self.types.add_type_variable(TypeVariableBinding {
                    name: parameter.name.clone(),
                    owner,
                    rank,
                    superclass: None,
                    superinterfaces: Vec::new(),
                    first_bound: None,
                })
            })
            .collect()
    }

    /// Second pass: bounds. Interface bounds are numbered after the class bound slot.
    fn decode_type_variable_bounds(
        &mut self,
        variables: &[TypeId],
        parameters: &[TypeParameter],
        scope: &SignatureScope<'_>,
        annotations: &[TypeAnnotation],
        for_method: bool,
    ) -> Result<()> {
        for (index, (variable, parameter)) in variables.iter().zip(parameters).enumerate() {
            let bound_target = |bound: usize| {
                let (parameter, bound) = (index_u8(index), index_u8(bound));
                if for_method {
                    TypeAnnotationTarget::MethodTypeParameterBound { parameter, bound }
                } else {
                    TypeAnnotationTarget::ClassTypeParameterBound { parameter, bound }
                }
            };
            let mut first_bound = None;
            let mut superclass = None;
            if let Some(class_bound) = &parameter.class_bound {
                let walker = TypeAnnotationWalker::new(annotations, bound_target(0));
                let bound = self.type_from_type_signature(class_bound, scope, &walker)?;
                first_bound = Some(bound);
                superclass = Some(bound);
            }
            let mut superinterfaces = Vec::with_capacity(parameter.interface_bounds.len());
            for (position, interface_bound) in parameter.interface_bounds.iter().enumerate() {
                let walker = TypeAnnotationWalker::new(annotations, bound_target(position + 1));
                let bound = self.type_from_type_signature(interface_bound, scope, &walker)?;
                first_bound.get_or_insert(bound);
                superinterfaces.push(bound);
            }
            let superclass = match superclass {
                Some(superclass) => superclass,
                None => self.java_lang_object(scope.module),
            };
            if let Some(var_id) = self.types.type_var_id(*variable) {
                let binding = self.types.type_var_mut(var_id);
                binding.first_bound = first_bound;
                binding.superclass = Some(superclass);
                binding.superinterfaces = superinterfaces;
            }
        }
        Ok(())
    }
}
