use proc_macro2::{Literal, TokenStream};
use quote::quote;
use std::collections::HashSet;
use wsdlgen_wsdl::types::{
    self as wsdl, ComplexType, Derivation, NamespacedName, SimpleType, SimpleTypeKind,
};

use super::{
    error::Error,
    naming::{self, UniqueNames},
    resolver::{Primitive, PrimitiveKind, Resolver, TypeExpr},
};

pub trait Codegen {
    fn codegen(&self, resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error>;
}

fn codegen_all(all: &[impl Codegen], resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error> {
    all.iter().try_for_each(|item| item.codegen(resolver, output))
}

/// Items of one artifact, with the identifiers they declare.
#[derive(Debug, Default)]
pub struct Output {
    items: Vec<TokenStream>,
    types: HashSet<String>,
    values: UniqueNames,
}

impl Output {
    pub fn declare_type(&mut self, name: &str, artifact: &'static str) -> Result<(), Error> {
        if self.types.insert(name.to_owned()) {
            Ok(())
        } else {
            Err(Error::Render {
                artifact,
                message: format!("type `{}` is declared more than once", name),
            })
        }
    }

    pub fn claim_value(&mut self, name: String) -> String {
        self.values.claim(name)
    }

    pub fn push(&mut self, item: TokenStream) {
        self.items.push(item);
    }

    pub fn into_tokens(self) -> TokenStream {
        let items = self.items;

        quote! {
            #(#items)*
        }
    }
}

const ARTIFACT: &str = "types";

impl Codegen for wsdl::Schema {
    fn codegen(&self, resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error> {
        codegen_all(&self.simple_types, resolver, output)?;
        codegen_all(&self.elements, resolver, output)?;
        codegen_all(&self.complex_types, resolver, output)
    }
}

impl Codegen for SimpleType {
    fn codegen(&self, resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error> {
        match &self.name {
            Some(name) => codegen_simple_type(
                &naming::type_name(&name.name),
                self,
                self.documentation.as_deref(),
                resolver,
                output,
            ),
            None => Ok(()),
        }
    }
}

impl Codegen for ComplexType {
    fn codegen(&self, resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error> {
        match &self.name {
            Some(name) => codegen_struct(
                &naming::type_name(&name.name),
                name,
                self,
                self.documentation.as_deref(),
                resolver,
                output,
            ),
            None => Ok(()),
        }
    }
}

/// Top-level elements.
impl Codegen for wsdl::Element {
    fn codegen(&self, resolver: &Resolver<'_>, output: &mut Output) -> Result<(), Error> {
        let name = naming::type_name(&self.name.name);

        match (&self.complex_type, &self.simple_type, &self.ty) {
            (Some(complex_type), _, _) => {
                let documentation = self
                    .documentation
                    .as_deref()
                    .or(complex_type.documentation.as_deref());

                codegen_struct(&name, &self.name, complex_type, documentation, resolver, output)
            }

            (None, Some(simple_type), _) => {
                let documentation = self
                    .documentation
                    .as_deref()
                    .or(simple_type.documentation.as_deref());

                codegen_simple_type(&name, simple_type, documentation, resolver, output)
            }

            (None, None, Some(ty)) => {
                let resolved = resolver.resolve(ty, &format!("element {}", self.name.name))?;

                if resolved.name() != Some(name.as_str()) {
                    output.declare_type(&name, ARTIFACT)?;

                    let ident = naming::ident(&name);
                    let docs = naming::doc_attributes(self.documentation.as_deref());

                    output.push(quote! {
                        #docs
                        pub type #ident = #resolved;
                    });
                }

                Ok(())
            }

            (None, None, None) => codegen_struct(
                &name,
                &self.name,
                &ComplexType::empty(None),
                self.documentation.as_deref(),
                resolver,
                output,
            ),
        }
    }
}

fn codegen_simple_type(
    name: &str,
    simple_type: &SimpleType,
    documentation: Option<&str>,
    resolver: &Resolver<'_>,
    output: &mut Output,
) -> Result<(), Error> {
    let context = format!("simple type {}", name);
    let underlying = resolver.resolve_simple_type(simple_type, &context)?;

    output.declare_type(name, ARTIFACT)?;

    let ident = naming::ident(name);
    let docs = naming::doc_attributes(documentation);

    let pattern = match &simple_type.kind {
        SimpleTypeKind::Restriction {
            pattern: Some(pattern),
            ..
        } => {
            let separator = documentation.map(|_| quote!(#[doc = ""]));
            let line = format!(" Pattern: `{}`", pattern);

            quote! {
                #separator
                #[doc = #line]
            }
        }
        _ => quote! {},
    };

    output.push(quote! {
        #docs
        #pattern
        pub type #ident = #underlying;
    });

    if let SimpleTypeKind::Enumeration { base, values } = &simple_type.kind {
        let primitive = resolver.enumeration_base(base, &context)?;

        for value in values {
            let constant = output.claim_value(format!("{}{}", name, naming::make_public(&value.value)));
            let constant = naming::ident(&constant);
            let docs = naming::doc_attributes(value.documentation.as_deref());

            let literal = enumeration_literal(primitive, &value.value, &context)?;
            let ty = match primitive.kind {
                PrimitiveKind::Text => quote!(&str),
                _ => quote!(#ident),
            };

            output.push(quote! {
                #docs
                pub const #constant: #ty = #literal;
            });
        }
    }

    Ok(())
}

fn enumeration_literal(primitive: Primitive, value: &str, context: &str) -> Result<TokenStream, Error> {
    let invalid = || {
        Error::unsupported(
            format!("enumeration value `{}` for a {} base", value, primitive.rust),
            context,
        )
    };

    let literal = match primitive.kind {
        PrimitiveKind::Text => {
            let literal = naming::string_literal(value);
            quote!(#literal)
        }

        PrimitiveKind::Integer => {
            let number = value.trim().parse::<i128>().map_err(|_| invalid())?;
            if !primitive.holds(number) {
                return Err(invalid());
            }

            let literal = Literal::u128_unsuffixed(number.unsigned_abs());
            if number < 0 {
                quote!(-#literal)
            } else {
                quote!(#literal)
            }
        }

        PrimitiveKind::Float => {
            let ty = naming::ident(primitive.rust);

            match value.trim() {
                "INF" => quote!(#ty::INFINITY),
                "-INF" => quote!(#ty::NEG_INFINITY),
                "NaN" => quote!(#ty::NAN),
                other => {
                    let number = other.parse::<f64>().map_err(|_| invalid())?;
                    if !primitive.holds_float(number) {
                        return Err(invalid());
                    }

                    let literal = Literal::f64_unsuffixed(number.abs());
                    if number < 0.0 {
                        quote!(-#literal)
                    } else {
                        quote!(#literal)
                    }
                }
            }
        }

        PrimitiveKind::Boolean => match value.trim() {
            "true" | "1" => quote!(true),
            "false" | "0" => quote!(false),
            _ => return Err(invalid()),
        },
    };

    Ok(literal)
}

/// Renders a struct for `complex_type`, hoisting anonymous nested types into
/// `output` ahead of it.
fn codegen_struct(
    name: &str,
    xml_name: &NamespacedName,
    complex_type: &ComplexType,
    documentation: Option<&str>,
    resolver: &Resolver<'_>,
    output: &mut Output,
) -> Result<(), Error> {
    output.declare_type(name, ARTIFACT)?;

    let context = format!("type {}", name);
    let mut names = UniqueNames::default();
    let mut fields = Vec::new();

    match &complex_type.derivation {
        Derivation::ComplexExtension(base) => {
            let resolved = resolver.resolve(base, &context)?;

            if resolved.is_complex() {
                let field = naming::ident(&names.claim(naming::field_name(&base.name)));

                fields.push(quote! {
                    #[serde(flatten)]
                    pub #field: #resolved,
                });
            }
        }

        Derivation::SimpleExtension(base) => {
            let resolved = resolver.resolve(base, &context)?;

            if resolved.is_complex() {
                let field = naming::ident(&names.claim(naming::field_name(&base.name)));

                fields.push(quote! {
                    #[serde(flatten)]
                    pub #field: #resolved,
                });
            } else {
                let field = naming::ident(&names.claim("value".into()));

                fields.push(quote! {
                    #[serde(rename = "$text")]
                    pub #field: #resolved,
                });
            }
        }

        Derivation::None => (),
    }

    for element in complex_type.particles.iter() {
        fields.push(codegen_element_field(name, element, &mut names, resolver, output)?);
    }

    for attribute in &complex_type.attributes {
        fields.push(codegen_attribute_field(attribute, &context, &mut names, resolver)?);
    }

    let ident = naming::ident(name);
    let docs = naming::doc_attributes(documentation);
    let xml = naming::string_literal(&xml_name.name);
    let namespace = naming::string_literal(xml_name.namespace(resolver.namespaces()));

    output.push(quote! {
        #docs
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename = #xml)]
        pub struct #ident {
            #(#fields)*
        }

        impl XmlName for #ident {
            const NAMESPACE: &'static str = #namespace;
            const NAME: &'static str = #xml;
        }
    });

    Ok(())
}

fn codegen_element_field(
    owner: &str,
    element: &wsdl::Element,
    names: &mut UniqueNames,
    resolver: &Resolver<'_>,
    output: &mut Output,
) -> Result<TokenStream, Error> {
    let context = format!("field {} of {}", element.name.name, owner);

    let ty = if let Some(reference) = &element.reference {
        resolver.resolve_element(reference, &context)?
    } else if let Some(ty) = &element.ty {
        resolver.resolve(ty, &context)?
    } else if let Some(simple_type) = &element.simple_type {
        resolver.resolve_simple_type(simple_type, &context)?
    } else if let Some(complex_type) = &element.complex_type {
        let nested = naming::type_name(&format!("{}{}", owner, naming::make_public(&element.name.name)));

        codegen_struct(
            &nested,
            &element.name,
            complex_type,
            complex_type.documentation.as_deref(),
            resolver,
            output,
        )?;

        TypeExpr::named(nested, true)
    } else {
        TypeExpr::Primitive(Primitive::STRING)
    };

    let field = naming::ident(&names.claim(naming::field_name(&element.name.name)));
    let rename = naming::string_literal(&element.name.name);
    let docs = naming::doc_attributes(element.documentation.as_deref());

    let field = if element.max_occurs.is_many() {
        quote! {
            #docs
            #[serde(rename = #rename, default, skip_serializing_if = "Vec::is_empty")]
            pub #field: Vec<#ty>,
        }
    } else if ty.is_complex() {
        quote! {
            #docs
            #[serde(rename = #rename, skip_serializing_if = "Option::is_none")]
            pub #field: Option<Box<#ty>>,
        }
    } else {
        quote! {
            #docs
            #[serde(rename = #rename, skip_serializing_if = "Option::is_none")]
            pub #field: Option<#ty>,
        }
    };

    Ok(field)
}

fn codegen_attribute_field(
    attribute: &wsdl::Attribute,
    owner: &str,
    names: &mut UniqueNames,
    resolver: &Resolver<'_>,
) -> Result<TokenStream, Error> {
    let context = format!("attribute {} of {}", attribute.name.name, owner);
    let ty = resolver.resolve_declared_attribute(attribute, &context)?;

    let field = naming::ident(&names.claim(naming::field_name(&attribute.name.name)));
    let rename = naming::string_literal(&format!("@{}", attribute.name.name));
    let docs = naming::doc_attributes(attribute.documentation.as_deref());

    Ok(quote! {
        #docs
        #[serde(rename = #rename, skip_serializing_if = "Option::is_none")]
        pub #field: Option<#ty>,
    })
}

/// Token stream of the types artifact: every schema, in document order.
pub fn codegen_types(definition: &wsdl::Definition, resolver: &Resolver<'_>) -> Result<TokenStream, Error> {
    let mut output = Output::default();
    codegen_all(&definition.schemas, resolver, &mut output)?;
    Ok(output.into_tokens())
}
