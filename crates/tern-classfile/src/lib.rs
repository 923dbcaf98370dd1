#![forbid(unsafe_code)]

mod binary;
mod descriptor;
mod error;
mod signature;
mod type_annotation;

pub use crate::binary::{flags, BinaryField, BinaryMethod, BinaryType, MemberTypeInfo};
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
pub use crate::signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, parse_type_signature,
    ClassSignature, ClassTypeSignature, MethodSignature, SignatureCursor,
    SimpleClassTypeSignature, TypeArgument, TypeParameter, TypeSignature,
};
pub use crate::type_annotation::{
    parse_type_path, TypeAnnotation, TypeAnnotationTarget, TypePathEntry,
};
