use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};
use tracing::warn;
use wsdlgen_wsdl::types::{
    is_builtin_namespace, Attribute, ComplexType, Definition, Element, NamespacedName, Namespaces,
    SimpleType, SimpleTypeKind,
};

use super::{error::Error, naming};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Text,
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub rust: &'static str,
    pub kind: PrimitiveKind,
}

impl Primitive {
    pub const STRING: Primitive = Primitive::new("String", PrimitiveKind::Text);

    const fn new(rust: &'static str, kind: PrimitiveKind) -> Self {
        Self { rust, kind }
    }

    /// Whether `value` is representable by this integer type.
    pub fn holds(&self, value: i128) -> bool {
        match self.rust {
            "i8" => i8::try_from(value).is_ok(),
            "i16" => i16::try_from(value).is_ok(),
            "i32" => i32::try_from(value).is_ok(),
            "i64" => i64::try_from(value).is_ok(),
            "u8" => u8::try_from(value).is_ok(),
            "u16" => u16::try_from(value).is_ok(),
            "u32" => u32::try_from(value).is_ok(),
            "u64" => u64::try_from(value).is_ok(),
            _ => false,
        }
    }

    /// Whether `value` stays finite once narrowed to this float type.
    pub fn holds_float(&self, value: f64) -> bool {
        match self.rust {
            "f32" => (value as f32).is_finite(),
            "f64" => value.is_finite(),
            _ => false,
        }
    }
}

fn primitive(name: &str) -> Option<Primitive> {
    use PrimitiveKind::*;

    let primitive = match name {
        "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "ID"
        | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES" | "NMTOKEN" | "NMTOKENS" | "anyURI"
        | "QName" | "NOTATION" | "dateTime" | "date" | "time" | "duration" | "gYear"
        | "gYearMonth" | "gMonth" | "gMonthDay" | "gDay" | "base64Binary" | "hexBinary"
        | "anyType" | "anySimpleType" => Primitive::STRING,
        "boolean" => Primitive::new("bool", Boolean),
        "float" => Primitive::new("f32", Float),
        "double" | "decimal" => Primitive::new("f64", Float),
        "integer" | "long" | "nonPositiveInteger" | "negativeInteger" => Primitive::new("i64", Integer),
        "nonNegativeInteger" | "positiveInteger" | "unsignedLong" => Primitive::new("u64", Integer),
        "int" => Primitive::new("i32", Integer),
        "short" => Primitive::new("i16", Integer),
        "byte" => Primitive::new("i8", Integer),
        "unsignedInt" => Primitive::new("u32", Integer),
        "unsignedShort" => Primitive::new("u16", Integer),
        "unsignedByte" => Primitive::new("u8", Integer),
        _ => return None,
    };

    Some(primitive)
}

/// A type as it is spelled in generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// A generated type. `complex` marks structs, which fields box.
    Named { name: String, complex: bool },
    List(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: String, complex: bool) -> Self {
        TypeExpr::Named { name, complex }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, TypeExpr::Named { complex: true, .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl ToTokens for TypeExpr {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            TypeExpr::Primitive(primitive) => naming::ident(primitive.rust).to_tokens(tokens),
            TypeExpr::Named { name, .. } => naming::ident(name).to_tokens(tokens),
            TypeExpr::List(item) => tokens.extend(quote! { Vec<#item> }),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(primitive) => f.write_str(primitive.rust),
            TypeExpr::Named { name, .. } => f.write_str(name),
            TypeExpr::List(item) => write!(f, "Vec<{}>", item),
        }
    }
}

/// Maps schema references onto generated types across every merged schema.
pub struct Resolver<'a> {
    namespaces: &'a Namespaces,
    simple_types: HashMap<&'a NamespacedName, &'a SimpleType>,
    complex_types: HashMap<&'a NamespacedName, &'a ComplexType>,
    elements: HashMap<&'a NamespacedName, &'a Element>,
    attributes: HashMap<&'a NamespacedName, &'a Attribute>,
    deny_unmapped: bool,
    warnings: RefCell<BTreeSet<String>>,
}

impl<'a> Resolver<'a> {
    pub fn new(definition: &'a Definition, namespaces: &'a Namespaces, deny_unmapped: bool) -> Self {
        let mut resolver = Self {
            namespaces,
            simple_types: HashMap::new(),
            complex_types: HashMap::new(),
            elements: HashMap::new(),
            attributes: HashMap::new(),
            deny_unmapped,
            warnings: RefCell::default(),
        };

        for schema in &definition.schemas {
            for simple_type in &schema.simple_types {
                if let Some(name) = &simple_type.name {
                    resolver.simple_types.entry(name).or_insert(simple_type);
                }
            }

            for complex_type in &schema.complex_types {
                if let Some(name) = &complex_type.name {
                    resolver.complex_types.entry(name).or_insert(complex_type);
                }
            }

            for element in &schema.elements {
                resolver.elements.entry(&element.name).or_insert(element);
            }

            for attribute in &schema.attributes {
                resolver.attributes.entry(&attribute.name).or_insert(attribute);
            }
        }

        resolver
    }

    pub fn namespaces(&self) -> &'a Namespaces {
        self.namespaces
    }

    /// Primitives that fell back to `String`, in `{namespace}name` form.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().iter().cloned().collect()
    }

    /// Identifiers of every type the types artifact declares at top level.
    pub fn declared_type_names(&self) -> HashSet<String> {
        self.simple_types
            .keys()
            .chain(self.complex_types.keys())
            .chain(self.elements.keys())
            .map(|name| naming::type_name(&name.name))
            .collect()
    }

    fn builtin(&self, reference: &NamespacedName, context: &str) -> Result<Primitive, Error> {
        if let Some(primitive) = primitive(&reference.name) {
            return Ok(primitive);
        }

        let qualified = reference.display(self.namespaces).to_string();

        if self.deny_unmapped {
            return Err(Error::unsupported(format!("unmapped primitive {}", qualified), context));
        }

        warn!(primitive = %qualified, context, "unmapped primitive, falling back to String");
        self.warnings.borrow_mut().insert(qualified);

        Ok(Primitive::STRING)
    }

    /// Resolves a `type=`/`base=`/`itemType=` reference.
    pub fn resolve(&self, reference: &NamespacedName, context: &str) -> Result<TypeExpr, Error> {
        if is_builtin_namespace(reference.namespace(self.namespaces)) {
            return self.builtin(reference, context).map(TypeExpr::Primitive);
        }

        if self.simple_types.contains_key(reference) {
            Ok(TypeExpr::named(naming::type_name(&reference.name), false))
        } else if self.complex_types.contains_key(reference) {
            Ok(TypeExpr::named(naming::type_name(&reference.name), true))
        } else {
            Err(Error::unresolved(reference.display(self.namespaces), context))
        }
    }

    /// The type a simple type declaration stands for.
    pub fn resolve_simple_type(&self, simple_type: &SimpleType, context: &str) -> Result<TypeExpr, Error> {
        match &simple_type.kind {
            SimpleTypeKind::Restriction { base, .. } | SimpleTypeKind::Enumeration { base, .. } => {
                self.resolve(base, context)
            }
            SimpleTypeKind::List { item_type } => {
                Ok(TypeExpr::List(Box::new(self.resolve(item_type, context)?)))
            }
        }
    }

    /// The generated type standing for a top-level element.
    pub fn resolve_element(&self, reference: &NamespacedName, context: &str) -> Result<TypeExpr, Error> {
        let element = self
            .elements
            .get(reference)
            .ok_or_else(|| Error::unresolved(reference.display(self.namespaces), context))?;

        let name = naming::type_name(&element.name.name);

        match (&element.complex_type, &element.simple_type, &element.ty) {
            (Some(_), _, _) | (None, None, None) => Ok(TypeExpr::named(name, true)),
            (None, Some(_), _) => Ok(TypeExpr::named(name, false)),
            (None, None, Some(ty)) => {
                let resolved = self.resolve(ty, context)?;

                if resolved.name() == Some(name.as_str()) {
                    Ok(resolved)
                } else {
                    let complex = resolved.is_complex();
                    Ok(TypeExpr::named(name, complex))
                }
            }
        }
    }

    pub fn resolve_attribute(&self, reference: &NamespacedName, context: &str) -> Result<TypeExpr, Error> {
        let namespace = reference.namespace(self.namespaces);
        if is_builtin_namespace(namespace) || namespace == XML_NAMESPACE {
            return Ok(TypeExpr::Primitive(Primitive::STRING));
        }

        let attribute = self
            .attributes
            .get(reference)
            .ok_or_else(|| Error::unresolved(reference.display(self.namespaces), context))?;

        self.resolve_declared_attribute(attribute, context)
    }

    /// Type of an attribute declared with `type=` or an inline simple type.
    pub fn resolve_declared_attribute(&self, attribute: &Attribute, context: &str) -> Result<TypeExpr, Error> {
        match (&attribute.reference, &attribute.ty, &attribute.simple_type) {
            (Some(reference), _, _) => self.resolve_attribute(reference, context),
            (None, Some(ty), _) => self.resolve(ty, context),
            (None, None, Some(simple_type)) => self.resolve_simple_type(simple_type, context),
            (None, None, None) => Ok(TypeExpr::Primitive(Primitive::STRING)),
        }
    }

    /// The primitive at the bottom of an enumeration's restriction chain.
    pub fn enumeration_base(&self, base: &NamespacedName, context: &str) -> Result<Primitive, Error> {
        let mut visited = HashSet::new();
        let mut current = base;

        loop {
            if is_builtin_namespace(current.namespace(self.namespaces)) {
                return self.builtin(current, context);
            }

            if !visited.insert(current) {
                return Err(Error::unsupported(
                    format!("cyclic restriction through {}", current.display(self.namespaces)),
                    context,
                ));
            }

            match self.simple_types.get(current).map(|simple_type| &simple_type.kind) {
                Some(SimpleTypeKind::Restriction { base, .. } | SimpleTypeKind::Enumeration { base, .. }) => {
                    current = base;
                }
                Some(SimpleTypeKind::List { .. }) => {
                    return Err(Error::unsupported("enumeration of a list type", context))
                }
                None if self.complex_types.contains_key(current) => {
                    return Err(Error::unsupported("enumeration of a complex type", context))
                }
                None => return Err(Error::unresolved(current.display(self.namespaces), context)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wsdlgen_wsdl::types::{Enumeration, Schema, XSD_NAMESPACE};

    fn name(namespaces: &mut Namespaces, namespace: &str, local: &str) -> NamespacedName {
        NamespacedName::new(namespaces, namespace, local.into())
    }

    fn simple(name: NamespacedName, kind: SimpleTypeKind) -> SimpleType {
        SimpleType {
            name: Some(name),
            documentation: None,
            kind,
        }
    }

    fn element(name: NamespacedName, ty: Option<NamespacedName>) -> Element {
        Element {
            name,
            reference: None,
            ty,
            max_occurs: Default::default(),
            documentation: None,
            complex_type: None,
            simple_type: None,
        }
    }

    fn fixture() -> (Definition, Namespaces) {
        let mut namespaces = Namespaces::default();
        let int = name(&mut namespaces, XSD_NAMESPACE, "int");
        let string = name(&mut namespaces, XSD_NAMESPACE, "string");

        let ids = simple(
            name(&mut namespaces, "urn:a", "Ids"),
            SimpleTypeKind::List { item_type: int.clone() },
        );
        let level = simple(
            name(&mut namespaces, "urn:a", "Level"),
            SimpleTypeKind::Enumeration {
                base: int,
                values: vec![Enumeration {
                    value: "1".into(),
                    documentation: None,
                }],
            },
        );
        let small_level = simple(
            name(&mut namespaces, "urn:a", "SmallLevel"),
            SimpleTypeKind::Restriction {
                base: name(&mut namespaces, "urn:a", "Level"),
                pattern: None,
            },
        );

        let info = ComplexType::empty(Some(name(&mut namespaces, "urn:a", "GetInfo")));
        let get_info = element(
            name(&mut namespaces, "urn:a", "GetInfo"),
            Some(name(&mut namespaces, "urn:a", "GetInfo")),
        );
        let request = element(
            name(&mut namespaces, "urn:a", "Request"),
            Some(name(&mut namespaces, "urn:a", "GetInfo")),
        );
        let label = element(name(&mut namespaces, "urn:a", "Label"), Some(string));

        let definition = Definition {
            schemas: vec![Schema {
                target_namespace: "urn:a".into(),
                simple_types: vec![ids, level, small_level],
                complex_types: vec![info],
                elements: vec![get_info, request, label],
                attributes: Vec::new(),
            }],
            ..Default::default()
        };

        (definition, namespaces)
    }

    #[test]
    fn list_of_int_is_a_vec_of_i32() {
        let (definition, namespaces) = fixture();
        let resolver = Resolver::new(&definition, &namespaces, false);

        let ids = &definition.schemas[0].simple_types[0];
        let resolved = resolver.resolve_simple_type(ids, "test").unwrap();

        assert_eq!(resolved.to_string(), "Vec<i32>");
        assert_eq!(quote!(#resolved).to_string(), quote!(Vec<i32>).to_string());
    }

    #[test]
    fn declared_types_resolve_to_their_names() {
        let (definition, mut namespaces) = fixture();
        let info = name(&mut namespaces, "urn:a", "GetInfo");
        let level = name(&mut namespaces, "urn:a", "Level");
        let resolver = Resolver::new(&definition, &namespaces, false);

        assert_eq!(resolver.resolve(&info, "test").unwrap(), TypeExpr::named("GetInfo".into(), true));
        assert_eq!(resolver.resolve(&level, "test").unwrap(), TypeExpr::named("Level".into(), false));
    }

    #[test]
    fn missing_types_are_unresolved() {
        let (definition, mut namespaces) = fixture();
        let missing = name(&mut namespaces, "urn:a", "Missing");
        let resolver = Resolver::new(&definition, &namespaces, false);

        let err = resolver.resolve(&missing, "element Foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnresolvedType);
        assert!(err.to_string().contains("{urn:a}Missing"));
    }

    #[test]
    fn unmapped_primitives_warn_or_fail() {
        let (definition, mut namespaces) = fixture();
        let unknown = name(&mut namespaces, XSD_NAMESPACE, "yearMonthDuration");

        let lenient = Resolver::new(&definition, &namespaces, false);
        assert_eq!(
            lenient.resolve(&unknown, "test").unwrap(),
            TypeExpr::Primitive(Primitive::STRING)
        );
        assert_eq!(
            lenient.warnings(),
            vec![format!("{{{}}}yearMonthDuration", XSD_NAMESPACE)]
        );

        let strict = Resolver::new(&definition, &namespaces, true);
        let err = strict.resolve(&unknown, "test").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn elements_alias_their_types() {
        let (definition, mut namespaces) = fixture();
        let get_info = name(&mut namespaces, "urn:a", "GetInfo");
        let request = name(&mut namespaces, "urn:a", "Request");
        let label = name(&mut namespaces, "urn:a", "Label");
        let resolver = Resolver::new(&definition, &namespaces, false);

        assert_eq!(
            resolver.resolve_element(&get_info, "test").unwrap(),
            TypeExpr::named("GetInfo".into(), true)
        );
        assert_eq!(
            resolver.resolve_element(&request, "test").unwrap(),
            TypeExpr::named("Request".into(), true)
        );
        assert_eq!(
            resolver.resolve_element(&label, "test").unwrap(),
            TypeExpr::named("Label".into(), false)
        );
    }

    #[test]
    fn enumeration_base_walks_restrictions() {
        let (definition, mut namespaces) = fixture();
        let small_level = name(&mut namespaces, "urn:a", "SmallLevel");
        let resolver = Resolver::new(&definition, &namespaces, false);

        let primitive = resolver.enumeration_base(&small_level, "test").unwrap();

        assert_eq!(primitive.rust, "i32");
        assert_eq!(primitive.kind, PrimitiveKind::Integer);
        assert!(primitive.holds(-5));
        assert!(!primitive.holds(i128::from(i64::MAX)));
    }

    #[test]
    fn float_range_follows_width() {
        let single = primitive("float").unwrap();
        let double = primitive("double").unwrap();

        assert!(single.holds_float(3.4e38));
        assert!(!single.holds_float(1e40));
        assert!(double.holds_float(1e40));
        assert!(!double.holds_float(f64::INFINITY));
    }
}
