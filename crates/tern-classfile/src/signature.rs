//! Generic signature grammar (JVMS 4.7.9.1).
//!
//! The parser is a recursive descent over the raw signature bytes. Each rule
//! consumes exactly the fragment it owns and leaves the shared cursor right
//! after it, so callers can chain rules the way the grammar composes them.

use crate::descriptor::BaseType;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Base(BaseType),
    Array(Box<TypeSignature>),
    Class(ClassTypeSignature),
    TypeVariable(String),
}

impl TypeSignature {
    /// Number of leading array dimensions and the leaf signature.
    pub fn split_dimensions(&self) -> (usize, &TypeSignature) {
        let mut dims = 0;
        let mut current = self;
        while let TypeSignature::Array(component) = current {
            dims += 1;
            current = component;
        }
        (dims, current)
    }
}

/// `L` package/`SimpleClassTypeSignature` (`.` `SimpleClassTypeSignature`)* `;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    /// Package segments, e.g. `["java", "util"]`.
    pub package: Vec<String>,
    /// The outermost class first; later segments are member classes.
    pub segments: Vec<SimpleClassTypeSignature>,
}

impl ClassTypeSignature {
    /// Compound name of the first segment, the part that names a class in the constant pool.
    pub fn outer_compound_name(&self) -> Vec<String> {
        let mut out = self.package.clone();
        if let Some(first) = self.segments.first() {
            out.push(first.name.clone());
        }
        out
    }

    /// Internal binary name of the innermost class (`java/util/Map$Entry`).
    pub fn internal_name(&self) -> String {
        let mut out = self.package.join("/");
        if !out.is_empty() {
            out.push('/');
        }
        let simple: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        out.push_str(&simple.join("$"));
        out
    }

    pub fn is_parameterized(&self) -> bool {
        self.segments.iter().any(|s| !s.type_arguments.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleClassTypeSignature {
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    /// `*`
    Any,
    /// `+` bound
    Extends(TypeSignature),
    /// `-` bound
    Super(TypeSignature),
    Exact(TypeSignature),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeSignature>,
    /// `None` for `V`.
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

pub fn parse_class_signature(signature: &str) -> Result<ClassSignature> {
    let mut cursor = SignatureCursor::new(signature.as_bytes());
    let type_parameters = cursor.type_parameters()?;
    let super_class = cursor.class_type_signature()?;
    let mut interfaces = Vec::new();
    while !cursor.at_end() {
        interfaces.push(cursor.class_type_signature()?);
    }
    Ok(ClassSignature {
        type_parameters,
        super_class,
        interfaces,
    })
}

pub fn parse_method_signature(signature: &str) -> Result<MethodSignature> {
    let mut cursor = SignatureCursor::new(signature.as_bytes());
    let type_parameters = cursor.type_parameters()?;
    cursor.expect(b'(', "`(`")?;
    let mut parameters = Vec::new();
    while cursor.peek() != Some(b')') {
        parameters.push(cursor.java_type_signature()?);
    }
    cursor.bump();
    let return_type = if cursor.eat(b'V') {
        None
    } else {
        Some(cursor.java_type_signature()?)
    };
    let mut throws = Vec::new();
    while cursor.eat(b'^') {
        throws.push(cursor.reference_type_signature()?);
    }
    cursor.finish()?;
    Ok(MethodSignature {
        type_parameters,
        parameters,
        return_type,
        throws,
    })
}

/// Field signatures are reference type signatures.
pub fn parse_field_signature(signature: &str) -> Result<TypeSignature> {
    let mut cursor = SignatureCursor::new(signature.as_bytes());
    let ty = cursor.reference_type_signature()?;
    cursor.finish()?;
    Ok(ty)
}

/// Any single Java type signature, base types included; also accepts field descriptors.
pub fn parse_type_signature(signature: &str) -> Result<TypeSignature> {
    let mut cursor = SignatureCursor::new(signature.as_bytes());
    let ty = cursor.java_type_signature()?;
    cursor.finish()?;
    Ok(ty)
}

/// Cursor over an immutable signature buffer.
#[derive(Debug, Clone)]
pub struct SignatureCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SignatureCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8, expected: &'static str) -> Result<()> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &'static str) -> Error {
        Error::signature(self.bytes, self.pos, expected)
    }

    pub fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("end of signature"))
        }
    }

    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("identifier"));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .map(str::to_string)
            .map_err(|_| Error::signature(self.bytes, start, "UTF-8 identifier"))
    }

    /// `BaseType | ReferenceTypeSignature`
    pub fn java_type_signature(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(code) => match BaseType::from_code(code) {
                Some(base) => {
                    self.pos += 1;
                    Ok(TypeSignature::Base(base))
                }
                None => self.reference_type_signature(),
            },
            None => Err(self.error("type signature")),
        }
    }

    /// `ClassTypeSignature | TypeVariableSignature | ArrayTypeSignature`
    pub fn reference_type_signature(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(b'L') => Ok(TypeSignature::Class(self.class_type_signature()?)),
            Some(b'T') => {
                self.pos += 1;
                let name = self.identifier()?;
                self.expect(b';', "`;` after type variable")?;
                Ok(TypeSignature::TypeVariable(name))
            }
            Some(b'[') => {
                self.pos += 1;
                let component = self.java_type_signature()?;
                Ok(TypeSignature::Array(Box::new(component)))
            }
            _ => Err(self.error("reference type signature")),
        }
    }

    pub fn class_type_signature(&mut self) -> Result<ClassTypeSignature> {
        self.expect(b'L', "`L`")?;

        let mut package = Vec::new();
        let mut name = self.identifier()?;
        while self.eat(b'/') {
            package.push(name);
            name = self.identifier()?;
        }

        let mut segments = vec![SimpleClassTypeSignature {
            name,
            type_arguments: self.type_arguments()?,
        }];
        while self.eat(b'.') {
            let name = self.identifier()?;
            segments.push(SimpleClassTypeSignature {
                name,
                type_arguments: self.type_arguments()?,
            });
        }
        self.expect(b';', "`;` after class type")?;

        Ok(ClassTypeSignature { package, segments })
    }

    fn type_arguments(&mut self) -> Result<Vec<TypeArgument>> {
        if !self.eat(b'<') {
            return Ok(Vec::new());
        }
        let mut args = Vec::new();
        loop {
            let arg = match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    TypeArgument::Any
                }
                Some(b'+') => {
                    self.pos += 1;
                    TypeArgument::Extends(self.reference_type_signature()?)
                }
                Some(b'-') => {
                    self.pos += 1;
                    TypeArgument::Super(self.reference_type_signature()?)
                }
                Some(b'>') if !args.is_empty() => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(_) => TypeArgument::Exact(self.reference_type_signature()?),
                None => return Err(self.error("type argument or `>`")),
            };
            args.push(arg);
        }
    }

    pub fn type_parameters(&mut self) -> Result<Vec<TypeParameter>> {
        if !self.eat(b'<') {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        while !self.eat(b'>') {
            if self.at_end() {
                return Err(self.error("`>` closing type parameters"));
            }
            let name = self.identifier()?;
            self.expect(b':', "`:` before class bound")?;
            let class_bound = match self.peek() {
                Some(b':') | Some(b'>') => None,
                _ => Some(self.reference_type_signature()?),
            };
            let mut interface_bounds = Vec::new();
            while self.eat(b':') {
                interface_bounds.push(self.reference_type_signature()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        if params.is_empty() {
            return Err(self.error("type parameter"));
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(package: &[&str], name: &str) -> ClassTypeSignature {
        ClassTypeSignature {
            package: package.iter().map(|s| s.to_string()).collect(),
            segments: vec![SimpleClassTypeSignature {
                name: name.to_string(),
                type_arguments: Vec::new(),
            }],
        }
    }

    #[test]
    fn class_signature_with_self_referential_bound() {
        let sig = parse_class_signature(
            "<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;",
        )
        .unwrap();
        assert_eq!(sig.type_parameters.len(), 1);
        assert_eq!(sig.type_parameters[0].name, "E");
        assert_eq!(sig.super_class, class(&["java", "lang"], "Object"));
        assert_eq!(sig.interfaces.len(), 1);
        assert_eq!(
            sig.interfaces[0].segments[0].type_arguments,
            vec![TypeArgument::Exact(TypeSignature::TypeVariable("E".into()))]
        );
    }

    #[test]
    fn interface_only_bound_has_no_class_bound() {
        let sig = parse_class_signature("<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;")
            .unwrap();
        assert_eq!(sig.type_parameters[0].class_bound, None);
        assert_eq!(sig.type_parameters[0].interface_bounds.len(), 1);
    }

    #[test]
    fn nested_generic_member_type() {
        let ty = parse_field_signature("Ljava/util/Map<TK;+Ljava/lang/Number;>.Entry<*>;").unwrap();
        let TypeSignature::Class(class) = ty else {
            panic!("expected class type");
        };
        assert_eq!(class.outer_compound_name(), vec!["java", "util", "Map"]);
        assert_eq!(class.internal_name(), "java/util/Map$Entry");
        assert_eq!(class.segments[1].type_arguments, vec![TypeArgument::Any]);
        assert!(matches!(
            class.segments[0].type_arguments[1],
            TypeArgument::Extends(TypeSignature::Class(_))
        ));
    }

    #[test]
    fn method_signature_with_throws() {
        let sig =
            parse_method_signature("<X:Ljava/lang/Throwable;>([ITX;)TX;^TX;^Ljava/io/IOException;")
                .unwrap();
        assert_eq!(sig.parameters.len(), 2);
        assert_eq!(
            sig.parameters[0],
            TypeSignature::Array(Box::new(TypeSignature::Base(BaseType::Int)))
        );
        assert_eq!(sig.return_type, Some(TypeSignature::TypeVariable("X".into())));
        assert_eq!(sig.throws.len(), 2);
    }

    #[test]
    fn void_return() {
        let sig = parse_method_signature("()V").unwrap();
        assert_eq!(sig.return_type, None);
    }

    #[test]
    fn corrupt_signatures_report_the_offset() {
        let err = parse_field_signature("Ljava/util/List<>;").unwrap_err();
        assert!(matches!(err, Error::InvalidSignature { position: 16, .. }), "{err:?}");

        let err = parse_type_signature("Q").unwrap_err();
        assert!(matches!(err, Error::InvalidSignature { position: 0, .. }), "{err:?}");

        assert!(parse_field_signature("Ljava/lang/String").is_err());
        assert!(parse_method_signature("(I").is_err());
    }

    #[test]
    fn descriptors_are_type_signatures() {
        let (dims, leaf) = parse_type_signature("[[J").map(|t| {
            let (d, l) = t.split_dimensions();
            (d, l.clone())
        })
        .unwrap();
        assert_eq!(dims, 2);
        assert_eq!(leaf, TypeSignature::Base(BaseType::Long));
    }
}
