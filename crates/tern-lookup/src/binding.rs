//! Binding data: the canonical semantic objects produced by lookup.
//!
//! Every binding lives in an arena owned by the session and is addressed by a
//! `Copy` id. Two ids are equal exactly when they denote the same binding, which
//! is what downstream identity checks rely on.

use std::fmt;

use tern_classfile::{flags, BaseType};

use crate::problem::ProblemReason;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

arena_id!(
    /// Any type binding, including base types and problem types.
    TypeId
);
arena_id!(ClassId);
arena_id!(TypeVarId);
arena_id!(CaptureId);
arena_id!(MethodId);
arena_id!(FieldId);
arena_id!(PackageId);
arena_id!(ModuleId);
arena_id!(
    /// Index of a compilation unit in the session's unit list.
    UnitId
);

/// Base types are pre-interned at fixed ids `0..BaseKind::ALL.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    Null,
}

impl BaseKind {
    pub const ALL: [BaseKind; 10] = [
        BaseKind::Boolean,
        BaseKind::Byte,
        BaseKind::Char,
        BaseKind::Short,
        BaseKind::Int,
        BaseKind::Long,
        BaseKind::Float,
        BaseKind::Double,
        BaseKind::Void,
        BaseKind::Null,
    ];

    pub fn type_id(self) -> TypeId {
        TypeId(self as u32)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BaseKind::Boolean => "boolean",
            BaseKind::Byte => "byte",
            BaseKind::Char => "char",
            BaseKind::Short => "short",
            BaseKind::Int => "int",
            BaseKind::Long => "long",
            BaseKind::Float => "float",
            BaseKind::Double => "double",
            BaseKind::Void => "void",
            BaseKind::Null => "null",
        }
    }

    /// Qualified name of the wrapper class used for boxing.
    pub fn box_name(self) -> Option<&'static [&'static str]> {
        Some(match self {
            BaseKind::Boolean => &["java", "lang", "Boolean"],
            BaseKind::Byte => &["java", "lang", "Byte"],
            BaseKind::Char => &["java", "lang", "Character"],
            BaseKind::Short => &["java", "lang", "Short"],
            BaseKind::Int => &["java", "lang", "Integer"],
            BaseKind::Long => &["java", "lang", "Long"],
            BaseKind::Float => &["java", "lang", "Float"],
            BaseKind::Double => &["java", "lang", "Double"],
            BaseKind::Void => &["java", "lang", "Void"],
            BaseKind::Null => return None,
        })
    }
}

impl From<BaseType> for BaseKind {
    fn from(value: BaseType) -> Self {
        match value {
            BaseType::Boolean => BaseKind::Boolean,
            BaseType::Byte => BaseKind::Byte,
            BaseType::Char => BaseKind::Char,
            BaseType::Short => BaseKind::Short,
            BaseType::Int => BaseKind::Int,
            BaseType::Long => BaseKind::Long,
            BaseType::Float => BaseKind::Float,
            BaseType::Double => BaseKind::Double,
        }
    }
}

impl TypeId {
    pub const BOOLEAN: TypeId = TypeId(0);
    pub const BYTE: TypeId = TypeId(1);
    pub const CHAR: TypeId = TypeId(2);
    pub const SHORT: TypeId = TypeId(3);
    pub const INT: TypeId = TypeId(4);
    pub const LONG: TypeId = TypeId(5);
    pub const FLOAT: TypeId = TypeId(6);
    pub const DOUBLE: TypeId = TypeId(7);
    pub const VOID: TypeId = TypeId(8);
    pub const NULL: TypeId = TypeId(9);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardKind {
    /// `?`
    Unbound,
    /// `? extends B`
    Extends,
    /// `? super B`
    Super,
}

/// A type-use annotation attached to one level of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationBinding {
    pub annotation_type: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Base(BaseKind),
    /// A declared class or interface (source, binary, missing or unresolved).
    Class(ClassId),
    TypeVariable(TypeVarId),
    Wildcard {
        generic: TypeId,
        rank: usize,
        bound: Option<TypeId>,
        other_bounds: Vec<TypeId>,
        kind: WildcardKind,
    },
    Intersection(Vec<TypeId>),
    Parameterized {
        generic: TypeId,
        arguments: Vec<TypeId>,
        enclosing: Option<TypeId>,
    },
    Raw {
        generic: TypeId,
        enclosing: Option<TypeId>,
    },
    Array {
        leaf: TypeId,
        dimensions: usize,
    },
    Captured(CaptureId),
    Problem(ProblemType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBinding {
    pub kind: TypeKind,
    /// Annotations per type level; level 0 is the outermost (for arrays, the outermost `[]`).
    /// Empty for unannotated bindings.
    pub annotations: Vec<Vec<AnnotationBinding>>,
    /// The binding with the top-level annotations removed; `self` for plain bindings.
    pub unannotated: TypeId,
}

impl TypeBinding {
    pub fn has_annotations(&self) -> bool {
        self.annotations.iter().any(|level| !level.is_empty())
    }

    pub fn top_annotations(&self) -> &[AnnotationBinding] {
        self.annotations.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A name that could not be bound, with the best candidate found (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemType {
    pub compound_name: Vec<String>,
    pub closest_match: Option<TypeId>,
    pub reason: ProblemReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassOrigin {
    Source(UnitId),
    Binary,
    /// Synthesized for a name the oracle could not find.
    Missing,
    /// Referenced from a binary signature but not yet looked up.
    Unresolved { was_missing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl DeclKind {
    pub fn from_access_flags(access_flags: u16) -> Self {
        if access_flags & flags::ACC_ANNOTATION != 0 {
            DeclKind::Annotation
        } else if access_flags & flags::ACC_INTERFACE != 0 {
            DeclKind::Interface
        } else if access_flags & flags::ACC_ENUM != 0 {
            DeclKind::Enum
        } else {
            DeclKind::Class
        }
    }

    pub fn is_interface(self) -> bool {
        matches!(self, DeclKind::Interface | DeclKind::Annotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HierarchyState {
    #[default]
    NotConnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ClassBinding {
    pub this_type: TypeId,
    /// Package segments followed by the binary simple name (`Map$Entry`).
    pub compound_name: Vec<String>,
    pub source_name: String,
    pub package: PackageId,
    pub module: ModuleId,
    pub origin: ClassOrigin,
    pub decl_kind: DeclKind,
    pub modifiers: u16,
    pub enclosing: Option<TypeId>,
    pub member_types: Vec<TypeId>,
    pub type_variables: Vec<TypeId>,
    pub superclass: Option<TypeId>,
    pub superinterfaces: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub hierarchy: HierarchyState,
    /// Declaration annotations; only kept for binary types when annotations are stored.
    pub annotations: Vec<AnnotationBinding>,
    /// Some signature of this type mentions a type that was missing.
    pub has_missing_type: bool,
}

impl ClassBinding {
    pub(crate) fn skeleton(
        compound_name: Vec<String>,
        package: PackageId,
        module: ModuleId,
        origin: ClassOrigin,
    ) -> Self {
        let source_name = compound_name
            .last()
            .map(|last| last.rsplit('$').next().unwrap_or(last).to_string())
            .unwrap_or_default();
        Self {
            this_type: TypeId::VOID,
            compound_name,
            source_name,
            package,
            module,
            origin,
            decl_kind: DeclKind::Class,
            modifiers: flags::ACC_PUBLIC,
            enclosing: None,
            member_types: Vec::new(),
            type_variables: Vec::new(),
            superclass: None,
            superinterfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            hierarchy: HierarchyState::NotConnected,
            annotations: Vec::new(),
            has_missing_type: false,
        }
    }

    pub fn qualified_name(&self) -> String {
        self.compound_name.join(".")
    }

    pub fn is_generic(&self) -> bool {
        !self.type_variables.is_empty()
    }

    pub fn is_interface(&self) -> bool {
        self.decl_kind.is_interface()
    }

    pub fn is_public(&self) -> bool {
        self.modifiers & flags::ACC_PUBLIC != 0
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & flags::ACC_STATIC != 0
    }

    pub fn is_missing(&self) -> bool {
        self.origin == ClassOrigin::Missing
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.origin, ClassOrigin::Unresolved { .. })
    }

    pub fn is_source(&self) -> bool {
        matches!(self.origin, ClassOrigin::Source(_))
    }
}

/// The element that declares a type variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeVariableOwner {
    Type(TypeId),
    Method(MethodId),
    /// Not attached yet; set once the declaring method exists.
    Pending,
}

#[derive(Debug, Clone)]
pub struct TypeVariableBinding {
    pub name: String,
    pub owner: TypeVariableOwner,
    pub rank: usize,
    pub superclass: Option<TypeId>,
    pub superinterfaces: Vec<TypeId>,
    pub first_bound: Option<TypeId>,
}

impl TypeVariableBinding {
    pub fn bounds(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.first_bound
            .into_iter()
            .chain(self.superclass.filter(|s| Some(*s) != self.first_bound))
            .chain(
                self.superinterfaces
                    .iter()
                    .copied()
                    .filter(move |i| Some(*i) != self.first_bound),
            )
    }
}

/// A capture of one wildcard at one use site.
#[derive(Debug, Clone)]
pub struct CaptureBinding {
    pub wildcard: TypeId,
    pub context: TypeId,
    pub start: usize,
    pub end: usize,
    pub unit: Option<UnitId>,
    pub capture_id: u32,
    pub lower_bound: Option<TypeId>,
    pub first_bound: Option<TypeId>,
    pub superclass: Option<TypeId>,
    pub superinterfaces: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOrigin {
    Declared,
    /// A generic method instantiated with explicit or inferred type arguments.
    ParameterizedGeneric {
        original: MethodId,
        arguments: Vec<TypeId>,
        inferred_with_unchecked: bool,
        target: Option<TypeId>,
    },
    /// A generic method seen through a raw receiver.
    RawGeneric { original: MethodId, raw_type: TypeId },
    /// A signature-polymorphic method specialized to one call site shape.
    Polymorphic { original: MethodId },
    /// Synthetic `getClass()` specialized to a receiver type.
    GetClass { original: MethodId, receiver: TypeId },
}

#[derive(Debug, Clone)]
pub struct MethodBinding {
    pub selector: String,
    pub modifiers: u16,
    pub declaring_class: TypeId,
    pub type_variables: Vec<TypeId>,
    pub parameters: Vec<TypeId>,
    pub return_type: TypeId,
    pub thrown: Vec<TypeId>,
    pub origin: MethodOrigin,
    /// Annotated `@PolymorphicSignature` (e.g. `MethodHandle.invoke`).
    pub polymorphic_signature: bool,
}

impl MethodBinding {
    pub fn is_constructor(&self) -> bool {
        self.selector == "<init>"
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & flags::ACC_STATIC != 0
    }

    pub fn is_varargs(&self) -> bool {
        self.modifiers & flags::ACC_VARARGS != 0
    }

    pub fn is_generic(&self) -> bool {
        !self.type_variables.is_empty()
    }

    /// The declared method this binding was derived from.
    pub fn original(&self, this: MethodId) -> MethodId {
        match &self.origin {
            MethodOrigin::Declared => this,
            MethodOrigin::ParameterizedGeneric { original, .. }
            | MethodOrigin::RawGeneric { original, .. }
            | MethodOrigin::Polymorphic { original }
            | MethodOrigin::GetClass { original, .. } => *original,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub name: String,
    pub modifiers: u16,
    pub declaring_class: TypeId,
    pub ty: TypeId,
}

/// Side-table entry describing an access rule that matched a type's class-path location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessRestriction {
    pub rule: AccessRule,
    /// Name of the class-path entry that contributed the rule.
    pub classpath_entry: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRule {
    Accessible,
    Discouraged,
    NonAccessible,
}
