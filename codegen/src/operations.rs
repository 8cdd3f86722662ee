use proc_macro2::TokenStream;
use quote::quote;
use std::collections::{HashMap, HashSet};
use wsdlgen_wsdl::types::{self as wsdl, SoapVersion};

use super::{
    codegen::Output,
    error::Error,
    naming::{self, UniqueNames},
    resolver::{Resolver, TypeExpr},
    types,
};

const ARTIFACT: &str = "operations";

/// How a message travels as a request, response or header body.
struct Payload {
    ty: TypeExpr,
    namespace: String,
    name: String,
}

struct Context<'r, 'a> {
    resolver: &'r Resolver<'a>,
    declared: HashSet<String>,
    wrappers: HashMap<wsdl::NamespacedName, String>,
}

impl<'r, 'a> Context<'r, 'a> {
    /// Picks an identifier for a generated item, suffixing it when a schema
    /// type already owns the name.
    fn available(&mut self, name: String, suffix: &str) -> String {
        let name = if self.declared.contains(&name) {
            format!("{}{}", name, suffix)
        } else {
            name
        };

        self.declared.insert(name.clone());
        name
    }

    fn part_type(&self, part: &wsdl::Part, context: &str) -> Result<(TypeExpr, String, String), Error> {
        let namespaces = self.resolver.namespaces();

        match (&part.element, &part.ty) {
            (Some(element), _) => Ok((
                self.resolver.resolve_element(element, context)?,
                element.namespace(namespaces).to_owned(),
                element.name.clone(),
            )),
            (None, Some(ty)) => Ok((self.resolver.resolve(ty, context)?, String::new(), part.name.clone())),
            (None, None) => Err(Error::unresolved(format!("part {}", part.name), context)),
        }
    }

    fn payload(&self, message: &wsdl::Message, operation: &wsdl::NamespacedName) -> Result<Option<Payload>, Error> {
        let context = format!("message {}", message.name.name);

        if let Some(wrapper) = self.wrappers.get(&message.name) {
            return Ok(Some(Payload {
                ty: TypeExpr::named(wrapper.clone(), true),
                namespace: operation.namespace(self.resolver.namespaces()).to_owned(),
                name: operation.name.clone(),
            }));
        }

        match message.parts.first() {
            Some(part) => {
                let (ty, namespace, name) = self.part_type(part, &context)?;
                Ok(Some(Payload { ty, namespace, name }))
            }
            None => Ok(None),
        }
    }
}

fn codegen_wrapper(context: &Context<'_, '_>, message: &wsdl::Message, name: &str) -> Result<TokenStream, Error> {
    let description = format!("message {}", message.name.name);
    let mut names = UniqueNames::default();
    let mut fields = Vec::new();

    for part in &message.parts {
        let (ty, _, _) = context.part_type(part, &description)?;
        let field = naming::ident(&names.claim(naming::field_name(&part.name)));
        let rename = naming::string_literal(&part.name);

        fields.push(quote! {
            #[serde(rename = #rename)]
            pub #field: #ty,
        });
    }

    let ident = naming::ident(name);
    let xml = naming::string_literal(&message.name.name);
    let namespace = naming::string_literal(message.name.namespace(context.resolver.namespaces()));

    Ok(quote! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename = #xml)]
        pub struct #ident {
            #(#fields)*
        }

        impl XmlName for #ident {
            const NAMESPACE: &'static str = #namespace;
            const NAME: &'static str = #xml;
        }
    })
}

fn codegen_operation(
    context: &Context<'_, '_>,
    operation: &types::Operation<'_>,
    methods: &mut UniqueNames,
) -> Result<TokenStream, Error> {
    let method = naming::ident(&methods.claim(naming::field_name(&operation.name.name)));
    let docs = naming::doc_attributes(operation.documentation);
    let action = naming::string_literal(operation.action);

    let input = match operation.input {
        Some(message) => context.payload(message, operation.name)?,
        None => None,
    };
    let output = match operation.output {
        Some(message) => context.payload(message, operation.name)?,
        None => None,
    };

    let (parameter, namespace, name, request) = match &input {
        Some(Payload { ty, namespace, name }) => (
            quote!(, request: &#ty),
            namespace.as_str(),
            name.as_str(),
            quote!(Some(request)),
        ),
        None => (quote!(), "", "", quote!(None::<&()>)),
    };

    let namespace = naming::string_literal(namespace);
    let name = naming::string_literal(name);

    let mut items = vec![match &output {
        Some(Payload { ty, .. }) => quote! {
            #docs
            pub fn #method(&self #parameter) -> Result<#ty, SoapError> {
                self.client.call(#action, #namespace, #name, #request)
            }
        },
        None => quote! {
            #docs
            pub fn #method(&self #parameter) -> Result<(), SoapError> {
                self.client.send(#action, #namespace, #name, #request)
            }
        },
    }];

    let single = operation.headers.len() == 1;

    for header in &operation.headers {
        let description = format!("header {} of {}", header.part.name, operation.name.name);
        let (ty, namespace, name) = context.part_type(header.part, &description)?;

        let setter = if single {
            format!("set_{}_header", naming::field_name(&operation.name.name))
        } else {
            format!(
                "set_{}_{}_header",
                naming::field_name(&operation.name.name),
                naming::field_name(&header.part.name)
            )
        };
        let setter = naming::ident(&methods.claim(setter.replace("r#", "")));

        let namespace = naming::string_literal(&namespace);
        let name = naming::string_literal(&name);

        items.push(quote! {
            pub fn #setter(&mut self, header: &#ty) -> Result<(), SoapError> {
                self.client.set_header(#namespace, #name, header)
            }
        });
    }

    Ok(quote! {
        #(#items)*
    })
}

fn codegen_port_type(context: &mut Context<'_, '_>, port_type: &types::PortType<'_>) -> Result<TokenStream, Error> {
    let name = context.available(naming::type_name(&port_type.name.name), "PortType");
    let ident = naming::ident(&name);
    let docs = naming::doc_attributes(port_type.documentation);

    let mut methods = UniqueNames::default();
    methods.reserve("new");

    let constructors = port_type
        .ports
        .iter()
        .map(|port| {
            let constructor = naming::ident(&methods.claim(naming::field_name(&port.name.name)));
            let location = naming::string_literal(port.location);
            let version = match port.version {
                SoapVersion::Soap11 => quote!(SoapVersion::Soap11),
                SoapVersion::Soap12 => quote!(SoapVersion::Soap12),
            };

            quote! {
                pub fn #constructor(transport: T) -> Self {
                    Self::new(SoapClient::new(#location, transport).with_version(#version))
                }
            }
        })
        .collect::<Vec<_>>();

    let operations = port_type
        .operations
        .iter()
        .map(|operation| codegen_operation(context, operation, &mut methods))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(quote! {
        #docs
        pub struct #ident<T: SoapTransport> {
            client: SoapClient<T>,
        }

        impl<T: SoapTransport> #ident<T> {
            pub fn new(client: SoapClient<T>) -> Self {
                Self { client }
            }

            #(#constructors)*

            #(#operations)*
        }
    })
}

/// Token stream of the operations artifact: wrappers for multi-part messages,
/// then one client struct per port type.
pub fn codegen_operations(
    definition: &wsdl::Definition,
    port_types: &[types::PortType<'_>],
    resolver: &Resolver<'_>,
) -> Result<TokenStream, Error> {
    let mut context = Context {
        resolver,
        declared: resolver.declared_type_names(),
        wrappers: HashMap::new(),
    };
    let mut output = Output::default();

    for message in definition.messages.iter().filter(|message| message.parts.len() > 1) {
        let name = context.available(naming::type_name(&message.name.name), "Message");
        output.declare_type(&name, ARTIFACT)?;
        output.push(codegen_wrapper(&context, message, &name)?);
        context.wrappers.insert(message.name.clone(), name);
    }

    for port_type in port_types {
        let tokens = codegen_port_type(&mut context, port_type)?;
        output.push(tokens);
    }

    Ok(output.into_tokens())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessor;
    use wsdlgen_wsdl::types::{
        Binding, BindingMessage, BindingOperation, Element, MaxOccurs, Message, NamespacedName,
        Namespaces, Operation, Part, Port, PortType, Schema, Service, SoapHeader, XSD_NAMESPACE,
    };

    fn element(namespaces: &mut Namespaces, local: &str) -> Element {
        Element {
            name: NamespacedName::new(namespaces, "urn:ferry", local.into()),
            reference: None,
            ty: Some(NamespacedName::new(namespaces, XSD_NAMESPACE, "string".into())),
            max_occurs: MaxOccurs::default(),
            documentation: None,
            complex_type: None,
            simple_type: None,
        }
    }

    fn ferry() -> (wsdl::Definition, Namespaces) {
        let mut namespaces = Namespaces::default();
        let ns = &mut namespaces;
        let name = |namespaces: &mut Namespaces, local: &str| {
            NamespacedName::new(namespaces, "urn:ferry", local.into())
        };
        let part = |namespaces: &mut Namespaces, part: &str, local: &str| Part {
            name: part.into(),
            element: Some(name(namespaces, local)),
            ty: None,
        };

        let schema = Schema {
            target_namespace: "urn:ferry".into(),
            elements: vec![
                element(ns, "Book"),
                element(ns, "BookResponse"),
                element(ns, "Auth"),
                element(ns, "Trace"),
            ],
            ..Default::default()
        };

        let definition = wsdl::Definition {
            target_namespace: "urn:ferry".into(),
            schemas: vec![schema],
            messages: vec![
                Message {
                    name: name(ns, "BookIn"),
                    parts: vec![part(ns, "parameters", "Book")],
                },
                Message {
                    name: name(ns, "BookOut"),
                    parts: vec![part(ns, "parameters", "BookResponse")],
                },
                Message {
                    name: name(ns, "Headers"),
                    parts: vec![part(ns, "auth", "Auth"), part(ns, "trace", "Trace")],
                },
            ],
            port_types: vec![PortType {
                name: name(ns, "Ferry"),
                documentation: Some("Crossing bookings".into()),
                operations: vec![
                    Operation {
                        name: name(ns, "Book"),
                        documentation: None,
                        input: Some(name(ns, "BookIn")),
                        output: Some(name(ns, "BookOut")),
                    },
                    Operation {
                        name: name(ns, "Ping"),
                        documentation: None,
                        input: None,
                        output: None,
                    },
                ],
            }],
            bindings: vec![Binding {
                name: name(ns, "FerrySoap"),
                ty: name(ns, "Ferry"),
                version: Some(SoapVersion::Soap11),
                transport: None,
                style: None,
                operations: vec![BindingOperation {
                    name: name(ns, "Book"),
                    action: Some("urn:ferry/Book".into()),
                    style: None,
                    input: Some(BindingMessage {
                        body_use: Some("literal".into()),
                        headers: vec![SoapHeader {
                            message: name(ns, "Headers"),
                            part: Some("auth".into()),
                        }],
                    }),
                    output: None,
                }],
            }],
            services: vec![Service {
                name: name(ns, "FerryService"),
                documentation: None,
                ports: vec![Port {
                    name: name(ns, "FerrySoap"),
                    binding: name(ns, "FerrySoap"),
                    location: Some("http://example.com/ferry".into()),
                }],
            }],
        };

        (definition, namespaces)
    }

    fn render(definition: &wsdl::Definition, namespaces: &Namespaces) -> String {
        let resolver = Resolver::new(definition, namespaces, false);
        let port_types = preprocessor::preprocess(definition, namespaces).unwrap();

        codegen_operations(definition, &port_types, &resolver)
            .unwrap()
            .to_string()
    }

    #[test]
    fn port_types_become_clients() {
        let (definition, namespaces) = ferry();
        let rendered = render(&definition, &namespaces);

        let book = quote! {
            pub fn book(&self, request: &Book) -> Result<BookResponse, SoapError> {
                self.client.call("urn:ferry/Book", "urn:ferry", "Book", Some(request))
            }
        };
        let ping = quote! {
            pub fn ping(&self) -> Result<(), SoapError> {
                self.client.send("", "", "", None::<&()>)
            }
        };
        let constructor = quote! {
            pub fn ferry_soap(transport: T) -> Self {
                Self::new(SoapClient::new("http://example.com/ferry", transport).with_version(SoapVersion::Soap11))
            }
        };

        assert!(rendered.contains(&quote!(pub struct Ferry<T: SoapTransport>).to_string()));
        assert!(rendered.contains(&book.to_string()));
        assert!(rendered.contains(&ping.to_string()));
        assert!(rendered.contains(&constructor.to_string()));
    }

    #[test]
    fn soap_headers_get_a_setter() {
        let (definition, namespaces) = ferry();
        let rendered = render(&definition, &namespaces);

        let setter = quote! {
            pub fn set_book_header(&mut self, header: &Auth) -> Result<(), SoapError> {
                self.client.set_header("urn:ferry", "Auth", header)
            }
        };

        assert!(rendered.contains(&setter.to_string()));
    }

    #[test]
    fn multi_part_messages_get_wrappers() {
        let (definition, namespaces) = ferry();
        let rendered = render(&definition, &namespaces);

        let wrapper = quote! {
            pub struct Headers {
                #[serde(rename = "auth")]
                pub auth: Auth,
                #[serde(rename = "trace")]
                pub trace: Trace,
            }
        };

        assert!(rendered.contains(&wrapper.to_string()));
    }

    #[test]
    fn clashing_port_type_names_are_suffixed() {
        let (mut definition, mut namespaces) = ferry();
        let ferry = element(&mut namespaces, "Ferry");
        definition.schemas[0].elements.push(ferry);

        let rendered = render(&definition, &namespaces);

        assert!(rendered.contains(&quote!(pub struct FerryPortType<T: SoapTransport>).to_string()));
    }
}
