//! `RuntimeVisibleTypeAnnotations` data (JVMS 4.7.20).

use crate::error::{Error, Result};

/// One step of a `type_path` structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePathEntry {
    /// Kind 0: deeper in an array type.
    ArrayElement,
    /// Kind 1: deeper in a nested type.
    NestedType,
    /// Kind 2: on the bound of a wildcard type argument.
    WildcardBound,
    /// Kind 3: on the type argument with the given index.
    TypeArgument(u8),
}

/// Parse a `type_path` structure: `u1 path_length` followed by `path_length` pairs of
/// `u1 type_path_kind, u1 type_argument_index`.
pub fn parse_type_path(bytes: &[u8]) -> Result<Vec<TypePathEntry>> {
    let (&len, rest) = bytes.split_first().ok_or(Error::UnexpectedEof)?;
    let len = len as usize;
    if rest.len() < len * 2 {
        return Err(Error::UnexpectedEof);
    }
    if rest.len() > len * 2 {
        return Err(Error::InvalidTypePath("trailing bytes after type path"));
    }

    rest.chunks_exact(2)
        .map(|pair| match (pair[0], pair[1]) {
            (0, 0) => Ok(TypePathEntry::ArrayElement),
            (1, 0) => Ok(TypePathEntry::NestedType),
            (2, 0) => Ok(TypePathEntry::WildcardBound),
            (3, index) => Ok(TypePathEntry::TypeArgument(index)),
            (0..=2, _) => Err(Error::InvalidTypePath(
                "type argument index must be zero for this path kind",
            )),
            _ => Err(Error::InvalidTypePath("unknown type path kind")),
        })
        .collect()
}

/// What a type annotation is attached to; only the targets visible to member signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAnnotationTarget {
    ClassTypeParameter(u8),
    /// `u16::MAX` is the superclass; otherwise an index into `interfaces`.
    SuperType(u16),
    ClassTypeParameterBound { parameter: u8, bound: u8 },
    MethodTypeParameter(u8),
    MethodTypeParameterBound { parameter: u8, bound: u8 },
    Field,
    MethodReturn,
    MethodReceiver,
    MethodFormalParameter(u8),
    Throws(u16),
}

impl TypeAnnotationTarget {
    pub const SUPERCLASS: u16 = u16::MAX;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub target: TypeAnnotationTarget,
    pub path: Vec<TypePathEntry>,
    /// Internal name of the annotation type, e.g. `org/example/NonNull`.
    pub annotation_type: String,
}

impl TypeAnnotation {
    pub fn new(
        target: TypeAnnotationTarget,
        path: Vec<TypePathEntry>,
        annotation_type: impl Into<String>,
    ) -> Self {
        Self {
            target,
            path,
            annotation_type: annotation_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_path_kind() {
        let path = parse_type_path(&[4, 0, 0, 1, 0, 3, 2, 2, 0]).unwrap();
        assert_eq!(
            path,
            vec![
                TypePathEntry::ArrayElement,
                TypePathEntry::NestedType,
                TypePathEntry::TypeArgument(2),
                TypePathEntry::WildcardBound,
            ]
        );
    }

    #[test]
    fn empty_path_targets_the_outer_type() {
        assert_eq!(parse_type_path(&[0]).unwrap(), Vec::new());
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(parse_type_path(&[]), Err(Error::UnexpectedEof));
        assert_eq!(parse_type_path(&[2, 0, 0]), Err(Error::UnexpectedEof));
        assert!(matches!(
            parse_type_path(&[1, 0, 1]),
            Err(Error::InvalidTypePath(_))
        ));
        assert!(matches!(
            parse_type_path(&[1, 7, 0]),
            Err(Error::InvalidTypePath(_))
        ));
    }
}
