use crate::type_annotation::TypeAnnotation;

/// Access flags shared by classes, fields and methods.
pub mod flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_VARARGS: u16 = 0x0080;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
    pub const ACC_ENUM: u16 = 0x4000;
}

/// The member-level view of a decoded class file.
///
/// Names are internal binary names (`java/util/Map$Entry`). Signatures are kept as
/// their raw attribute text; decoding happens when the binding is built so a corrupt
/// signature aborts the unit that needs it rather than the class-path scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryType {
    pub internal_name: String,
    pub access_flags: u16,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    pub enclosing_type: Option<String>,
    pub member_types: Vec<MemberTypeInfo>,
    pub fields: Vec<BinaryField>,
    pub methods: Vec<BinaryMethod>,
    pub type_annotations: Vec<TypeAnnotation>,
    /// Internal names of the declaration annotations on the class.
    pub annotations: Vec<String>,
    /// Compound names (slash separated) the producer could not resolve when it wrote the class.
    pub missing_type_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTypeInfo {
    pub internal_name: String,
    pub simple_name: String,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryField {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub type_annotations: Vec<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMethod {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub type_annotations: Vec<TypeAnnotation>,
}

impl BinaryType {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            access_flags: flags::ACC_PUBLIC,
            super_class: Some("java/lang/Object".to_string()),
            ..Self::default()
        }
    }

    pub fn interface(internal_name: impl Into<String>) -> Self {
        Self {
            access_flags: flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT,
            ..Self::new(internal_name)
        }
    }

    pub fn with_access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn with_super_class(mut self, super_class: Option<&str>) -> Self {
        self.super_class = super_class.map(str::to_string);
        self
    }

    pub fn with_interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_enclosing_type(mut self, enclosing: impl Into<String>) -> Self {
        self.enclosing_type = Some(enclosing.into());
        self
    }

    pub fn with_member_type(mut self, simple_name: &str, access_flags: u16) -> Self {
        self.member_types.push(MemberTypeInfo {
            internal_name: format!("{}${simple_name}", self.internal_name),
            simple_name: simple_name.to_string(),
            access_flags,
        });
        self
    }

    pub fn with_field(mut self, field: BinaryField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: BinaryMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_type_annotation(mut self, annotation: TypeAnnotation) -> Self {
        self.type_annotations.push(annotation);
        self
    }

    pub fn with_annotation(mut self, internal_name: impl Into<String>) -> Self {
        self.annotations.push(internal_name.into());
        self
    }

    pub fn with_missing_type(mut self, internal_name: impl Into<String>) -> Self {
        self.missing_type_names.push(internal_name.into());
        self
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & flags::ACC_INTERFACE != 0
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags & flags::ACC_ANNOTATION != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & flags::ACC_ENUM != 0
    }

    /// Slash separated package part of the internal name (`""` for the default package).
    pub fn package_name(&self) -> &str {
        match self.internal_name.rfind('/') {
            Some(idx) => &self.internal_name[..idx],
            None => "",
        }
    }

    /// The simple source name; for member types the part after the enclosing type's `$`.
    pub fn simple_name(&self) -> &str {
        let last = match self.internal_name.rfind('/') {
            Some(idx) => &self.internal_name[idx + 1..],
            None => self.internal_name.as_str(),
        };
        match &self.enclosing_type {
            Some(enclosing) => self
                .internal_name
                .strip_prefix(enclosing.as_str())
                .and_then(|rest| rest.strip_prefix('$'))
                .unwrap_or(last),
            None => last,
        }
    }

    /// Package segments followed by the binary simple name (`Map$Entry` stays one segment).
    pub fn compound_name(&self) -> Vec<String> {
        self.internal_name.split('/').map(str::to_string).collect()
    }
}

impl BinaryField {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags: flags::ACC_PUBLIC,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            type_annotations: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn with_type_annotation(mut self, annotation: TypeAnnotation) -> Self {
        self.type_annotations.push(annotation);
        self
    }
}

impl BinaryMethod {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags: flags::ACC_PUBLIC,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            exceptions: Vec::new(),
            type_annotations: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn with_exceptions<I, S>(mut self, exceptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exceptions = exceptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type_annotation(mut self, annotation: TypeAnnotation) -> Self {
        self.type_annotations.push(annotation);
        self
    }

    pub fn is_varargs(&self) -> bool {
        self.access_flags & flags::ACC_VARARGS != 0
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & flags::ACC_STATIC != 0
    }
}
