//! The already-parsed source shape consumed by the binding pipeline.
//!
//! Only declarations are modelled; bodies never reach lookup.

use tern_modules::{ModuleInfo, ModuleName};

use crate::binding::{BaseKind, WildcardKind};

#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub file_name: String,
    /// Segments of the `package` declaration; `None` for the default package.
    pub package: Option<Vec<String>>,
    /// Present for `module-info` units.
    pub module: Option<ModuleInfo>,
    /// The module this unit is compiled into; the unnamed module when absent.
    pub module_name: Option<ModuleName>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
}

impl CompilationUnit {
    pub fn new(file_name: impl Into<String>, package: Option<&str>) -> Self {
        Self {
            file_name: file_name.into(),
            package: package.map(split_dotted),
            module: None,
            module_name: None,
            imports: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn module_info(file_name: impl Into<String>, module: ModuleInfo) -> Self {
        Self {
            file_name: file_name.into(),
            module_name: Some(module.name.clone()),
            module: Some(module),
            ..Self::default()
        }
    }

    pub fn in_module(mut self, module: &str) -> Self {
        self.module_name = Some(ModuleName::new(module));
        self
    }

    pub fn with_import(mut self, import: ImportDecl) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_type(mut self, ty: TypeDecl) -> Self {
        self.types.push(ty);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDecl {
    /// `import p.q.T;`
    Single(Vec<String>),
    /// `import p.q.*;` (a package or a type)
    OnDemand(Vec<String>),
    /// `import static p.q.T.m;`
    StaticSingle { ty: Vec<String>, member: String },
    /// `import static p.q.T.*;`
    StaticOnDemand(Vec<String>),
}

impl ImportDecl {
    pub fn single(name: &str) -> Self {
        ImportDecl::Single(split_dotted(name))
    }

    pub fn on_demand(name: &str) -> Self {
        ImportDecl::OnDemand(split_dotted(name))
    }

    pub fn static_single(ty: &str, member: &str) -> Self {
        ImportDecl::StaticSingle {
            ty: split_dotted(ty),
            member: member.to_string(),
        }
    }

    pub fn static_on_demand(ty: &str) -> Self {
        ImportDecl::StaticOnDemand(split_dotted(ty))
    }

    pub fn name(&self) -> String {
        match self {
            ImportDecl::Single(n) | ImportDecl::OnDemand(n) | ImportDecl::StaticOnDemand(n) => {
                n.join(".")
            }
            ImportDecl::StaticSingle { ty, member } => format!("{}.{member}", ty.join(".")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    pub modifiers: u16,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub member_types: Vec<TypeDecl>,
}

impl TypeDecl {
    pub fn new(kind: TypeDeclKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: tern_classfile::flags::ACC_PUBLIC,
            type_parameters: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeDeclKind::Class, name)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeDeclKind::Interface, name)
    }

    pub fn with_modifiers(mut self, modifiers: u16) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_type_parameter(mut self, param: TypeParameterDecl) -> Self {
        self.type_parameters.push(param);
        self
    }

    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_member_type(mut self, member: TypeDecl) -> Self {
        self.member_types.push(member);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TypeParameterDecl {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

impl TypeParameterDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    pub fn bounded(mut self, bound: TypeRef) -> Self {
        self.bounds.push(bound);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: u16,
    pub ty: TypeRef,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            modifiers: tern_classfile::flags::ACC_PRIVATE,
            ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: u16,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub parameters: Vec<TypeRef>,
    /// `None` for `void` and for constructors.
    pub return_type: Option<TypeRef>,
    pub throws: Vec<TypeRef>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: tern_classfile::flags::ACC_PUBLIC,
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            throws: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: u16) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_type_parameter(mut self, param: TypeParameterDecl) -> Self {
        self.type_parameters.push(param);
        self
    }

    pub fn with_parameter(mut self, ty: TypeRef) -> Self {
        self.parameters.push(ty);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn throws(mut self, ty: TypeRef) -> Self {
        self.throws.push(ty);
        self
    }
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Primitive(BaseKind),
    /// `a.b.C<X>.D<Y>`; each segment may carry type arguments.
    Named(Vec<TypeRefSegment>),
    Array { component: Box<TypeRef>, dimensions: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRefSegment {
    pub name: String,
    pub arguments: Vec<TypeArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Type(TypeRef),
    Wildcard {
        kind: WildcardKind,
        bound: Option<Box<TypeRef>>,
    },
}

impl TypeRef {
    pub fn named(name: &str) -> Self {
        TypeRef::Named(
            split_dotted(name)
                .into_iter()
                .map(|name| TypeRefSegment {
                    name,
                    arguments: Vec::new(),
                })
                .collect(),
        )
    }

    /// Attach type arguments to the last segment.
    pub fn with_args(mut self, args: Vec<TypeArg>) -> Self {
        if let TypeRef::Named(segments) = &mut self {
            if let Some(last) = segments.last_mut() {
                last.arguments = args;
            }
        }
        self
    }

    pub fn array(self, dimensions: usize) -> Self {
        TypeRef::Array {
            component: Box::new(self),
            dimensions,
        }
    }

    pub fn segment_names(&self) -> Vec<String> {
        match self {
            TypeRef::Named(segments) => segments.iter().map(|s| s.name.clone()).collect(),
            TypeRef::Primitive(base) => vec![base.keyword().to_string()],
            TypeRef::Array { component, .. } => component.segment_names(),
        }
    }
}

impl TypeArg {
    pub fn ty(ty: TypeRef) -> Self {
        TypeArg::Type(ty)
    }

    pub fn unbound() -> Self {
        TypeArg::Wildcard {
            kind: WildcardKind::Unbound,
            bound: None,
        }
    }

    pub fn extends(bound: TypeRef) -> Self {
        TypeArg::Wildcard {
            kind: WildcardKind::Extends,
            bound: Some(Box::new(bound)),
        }
    }

    pub fn super_(bound: TypeRef) -> Self {
        TypeArg::Wildcard {
            kind: WildcardKind::Super,
            bound: Some(Box::new(bound)),
        }
    }
}

pub(crate) fn split_dotted(name: &str) -> Vec<String> {
    name.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
