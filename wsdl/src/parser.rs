use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{collections::HashSet, io::BufRead};
use tracing::{debug, trace};
use url::Url;

use super::{
    error,
    loader::Loader,
    types::{
        Attribute, Binding, BindingMessage, BindingOperation, ComplexType, Definition,
        Derivation, Element, Enumeration, MaxOccurs, Message, NamespacedName, Namespaces,
        Operation, Part, Particles, Port, PortType, Schema, Service, SimpleType, SimpleTypeKind,
        SoapHeader, SoapVersion, SOAP11_BINDING_NAMESPACE, SOAP12_BINDING_NAMESPACE,
    },
};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

fn xml_error<B: BufRead>(reader: &Reader<B>, url: &Url, source: quick_xml::Error) -> error::Error {
    error::Error::XmlParseError {
        location: url.clone(),
        position: reader.buffer_position(),
        source,
    }
}

fn malformed(url: &Url, message: impl Into<String>) -> error::Error {
    error::Error::MalformedDocument {
        location: url.clone(),
        message: message.into(),
    }
}

fn unsupported(url: &Url, construct: impl Into<String>) -> error::Error {
    error::Error::UnsupportedConstruct {
        location: url.clone(),
        construct: construct.into(),
    }
}

fn get_attributes<B: BufRead, const N: usize>(
    reader: &Reader<B>,
    url: &Url,
    start: &BytesStart<'_>,
    names: [&'static str; N],
) -> Result<[Option<String>; N], error::Error> {
    const INIT: Option<String> = None;
    let mut result = [INIT; N];

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| xml_error(reader, url, err))?;
        let key = reader
            .decode(attribute.key)
            .map_err(|err| xml_error(reader, url, err))?;

        for (index, name) in names.iter().enumerate() {
            if key == *name {
                let value = attribute
                    .unescaped_value()
                    .map_err(|err| xml_error(reader, url, err))?;
                result[index] = Some(
                    reader
                        .decode(&value)
                        .map_err(|err| xml_error(reader, url, err))?
                        .to_owned(),
                );
                break;
            }
        }
    }

    Ok(result)
}

fn required(url: &Url, value: Option<String>, element: &str, attribute: &str) -> Result<String, error::Error> {
    value.ok_or_else(|| {
        malformed(
            url,
            format!("<{}> is missing the `{}` attribute", element, attribute),
        )
    })
}

fn split_namespaced_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, prefixed_name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compositor {
    Sequence,
    Choice,
    All,
}

#[derive(Debug)]
struct ContentDerivation {
    extension: bool,
    base: NamespacedName,
    particles: Particles,
    attributes: Vec<Attribute>,
}

#[derive(Debug)]
enum ParseState {
    Definitions,

    Types,
    Schema(Schema),
    Annotation(Option<String>),
    Documentation(Option<String>),
    Element(Element),
    Attribute(Attribute),
    ComplexType(ComplexType),
    Content {
        simple: bool,
        derivation: Option<ContentDerivation>,
    },
    Derivation(ContentDerivation),
    Group {
        compositor: Compositor,
        depth: usize,
        elements: Vec<Element>,
        nested_choice: Vec<Element>,
    },
    SimpleType {
        name: Option<NamespacedName>,
        documentation: Option<String>,
        kind: Option<SimpleTypeKind>,
    },
    Restriction {
        base: NamespacedName,
        pattern: Option<String>,
        values: Vec<Enumeration>,
    },
    Enumeration(Enumeration),

    Message(Message),
    Part(Part),
    PortType(PortType),
    Operation(Operation),

    Binding(Binding),
    BindingOperation(BindingOperation),
    BindingMessage {
        output: bool,
        message: BindingMessage,
    },

    Service(Service),
    Port(Port),

    Other(String),
}

impl ParseState {
    fn block_name(&self) -> &str {
        match self {
            ParseState::Definitions => "definitions",
            ParseState::Types => "types",
            ParseState::Schema(_) => "schema",
            ParseState::Annotation(_) => "annotation",
            ParseState::Documentation(_) => "documentation",
            ParseState::Element(_) => "element",
            ParseState::Attribute(_) => "attribute",
            ParseState::ComplexType(_) => "complex type",
            ParseState::Content { .. } => "content",
            ParseState::Derivation(_) => "derivation",
            ParseState::Group { .. } => "group",
            ParseState::SimpleType { .. } => "simple type",
            ParseState::Restriction { .. } => "restriction",
            ParseState::Enumeration(_) => "enumeration",
            ParseState::Message(_) => "message",
            ParseState::Part(_) => "part",
            ParseState::PortType(_) => "port type",
            ParseState::Operation(_) => "operation",
            ParseState::Binding(_) => "binding",
            ParseState::BindingOperation(_) => "binding operation",
            ParseState::BindingMessage { .. } => "binding message",
            ParseState::Service(_) => "service",
            ParseState::Port(_) => "port",
            ParseState::Other(name) => name,
        }
    }

    fn set_documentation(&mut self, text: String) {
        let slot = match self {
            ParseState::Annotation(slot) => slot,
            ParseState::Element(element) => &mut element.documentation,
            ParseState::Attribute(attribute) => &mut attribute.documentation,
            ParseState::ComplexType(complex_type) => &mut complex_type.documentation,
            ParseState::SimpleType { documentation, .. } => documentation,
            ParseState::Enumeration(enumeration) => &mut enumeration.documentation,
            ParseState::Operation(operation) => &mut operation.documentation,
            ParseState::PortType(port_type) => &mut port_type.documentation,
            ParseState::Service(service) => &mut service.documentation,
            _ => return,
        };

        match slot {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&text);
            }
            None => *slot = Some(text),
        }
    }
}

fn add_particles(
    particles: &mut Particles,
    compositor: Compositor,
    elements: Vec<Element>,
    nested_choice: Vec<Element>,
) {
    match compositor {
        Compositor::Sequence => particles.sequence.extend(elements),
        Compositor::Choice => particles.choice.extend(elements),
        Compositor::All => particles.all.extend(elements),
    }

    particles.sequence_choice.extend(nested_choice);
}

#[derive(Debug, Clone)]
struct TargetNamespace {
    namespace: String,
    /// Set for an included schema without its own `targetNamespace`.
    chameleon: bool,
    /// `elementFormDefault="qualified"`.
    qualified_elements: bool,
}

#[derive(Default)]
struct CurrentNamespaces {
    target: Vec<TargetNamespace>,
    scopes: Vec<Vec<(Option<String>, String)>>,
    inherited: Option<String>,
}

impl CurrentNamespaces {
    fn push_target_namespace(&mut self, namespace: String, chameleon: bool, qualified_elements: bool) {
        self.target.push(TargetNamespace {
            namespace,
            chameleon,
            qualified_elements,
        });
    }

    fn pop_target_namespace(&mut self) {
        self.target.pop();
    }

    fn target(&self) -> &str {
        self.target
            .last()
            .map(|target| target.namespace.as_str())
            .unwrap_or_default()
    }

    fn is_chameleon(&self) -> bool {
        self.target.last().map_or(false, |target| target.chameleon)
    }

    fn qualifies_elements(&self) -> bool {
        self.target.last().map_or(false, |target| target.qualified_elements)
    }

    fn push_scope(&mut self, declarations: Vec<(Option<String>, String)>) {
        self.scopes.push(declarations);
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }

        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(declared, _)| declared.as_deref() == prefix)
            .map(|(_, namespace)| namespace.as_str())
    }
}

struct Parser<L> {
    loader: L,
    loaded: HashSet<Url>,

    definition: Definition,
    namespaces: Namespaces,
    current_namespaces: CurrentNamespaces,
}

impl<L: Loader> Parser<L> {
    fn new(loader: L) -> Self {
        Self {
            loader,
            loaded: HashSet::new(),

            definition: Default::default(),
            namespaces: Default::default(),
            current_namespaces: Default::default(),
        }
    }

    fn push_target_namespace(&mut self, namespace: Option<String>, qualified_elements: bool) {
        let (namespace, chameleon) = match namespace {
            Some(namespace) => (namespace, false),
            None => match self.current_namespaces.inherited.clone() {
                Some(inherited) => (inherited, true),
                None => (String::new(), false),
            },
        };

        self.namespaces.add_or_get(&namespace);
        self.current_namespaces
            .push_target_namespace(namespace, chameleon, qualified_elements);
    }

    fn pop_target_namespace(&mut self) {
        self.current_namespaces.pop_target_namespace();
    }

    fn target_namespaced(&mut self, name: String) -> NamespacedName {
        let target = self.current_namespaces.target().to_owned();
        NamespacedName::new(&mut self.namespaces, &target, name)
    }

    fn resolve_namespace(&mut self, url: &Url, prefixed_name: &str) -> Result<NamespacedName, error::Error> {
        let (prefix, local_name) = split_namespaced_name(prefixed_name.trim());

        let namespace = match self.current_namespaces.lookup(prefix) {
            Some("") | None if prefix.is_none() && self.current_namespaces.is_chameleon() => {
                self.current_namespaces.target().to_owned()
            }
            Some(namespace) => namespace.to_owned(),
            None if prefix.is_none() => String::new(),
            None => {
                return Err(malformed(
                    url,
                    format!("unbound namespace prefix in `{}`", prefixed_name),
                ))
            }
        };

        Ok(NamespacedName::new(
            &mut self.namespaces,
            &namespace,
            local_name.to_owned(),
        ))
    }

    fn resolve_optional(&mut self, url: &Url, value: Option<String>) -> Result<Option<NamespacedName>, error::Error> {
        value
            .map(|value| self.resolve_namespace(url, &value))
            .transpose()
    }

    fn parse(mut self, root: Url) -> Result<(Definition, Namespaces), error::Error> {
        self.parse_url(root, None)?;
        Ok((self.definition, self.namespaces))
    }

    fn parse_url(&mut self, url: Url, inherited_namespace: Option<String>) -> Result<(), error::Error> {
        if !self.loaded.insert(url.clone()) {
            debug!(%url, "document already merged");
            return Ok(());
        }

        debug!(%url, "parsing document");
        let bytes = self.loader.load(&url)?;

        let scopes = std::mem::take(&mut self.current_namespaces.scopes);
        let inherited = std::mem::replace(
            &mut self.current_namespaces.inherited,
            inherited_namespace,
        );

        let mut reader = Reader::from_reader(bytes.as_slice());
        reader.trim_text(true);
        let result = self.parse_xml(&url, reader);

        self.current_namespaces.scopes = scopes;
        self.current_namespaces.inherited = inherited;

        debug!(%url, "finished parsing document");
        result
    }

    fn parse_xml<B: BufRead>(&mut self, url: &Url, mut reader: Reader<B>) -> Result<(), error::Error> {
        let mut stack = Vec::new();
        let mut buffer = Vec::new();

        loop {
            let event = match reader.read_event(&mut buffer) {
                Ok(event) => event,
                Err(err) => return Err(xml_error(&reader, url, err)),
            };

            match event {
                Event::Start(start) => self.handle_start(&mut stack, &reader, start, url)?,
                Event::End(..) => self.handle_end(&mut stack, url)?,

                Event::Empty(start) => {
                    self.handle_start(&mut stack, &reader, start, url)?;
                    self.handle_end(&mut stack, url)?;
                }

                Event::Text(text) => {
                    let unescaped = text.unescaped().map_err(|err| xml_error(&reader, url, err))?;
                    let text = reader
                        .decode(&unescaped)
                        .map_err(|err| xml_error(&reader, url, err))?;
                    Self::handle_text(&mut stack, text);
                }

                Event::CData(text) => {
                    let text = reader
                        .decode(text.escaped())
                        .map_err(|err| xml_error(&reader, url, err))?;
                    Self::handle_text(&mut stack, text);
                }

                Event::Eof => break,

                _ => (),
            }

            buffer.clear();
        }

        if stack.is_empty() {
            Ok(())
        } else {
            Err(malformed(url, "unexpected end of document"))
        }
    }

    /// Local elements only take the target namespace when their form is qualified.
    fn element_start(&mut self, url: &Url, local: bool, attributes: [Option<String>; 5]) -> Result<ParseState, error::Error> {
        let [name, reference, ty, max_occurs, form] = attributes;
        let reference = self.resolve_optional(url, reference)?;

        let qualified = match form.as_deref() {
            _ if !local => true,
            Some("qualified") => true,
            Some("unqualified") => false,
            Some(other) => return Err(malformed(url, format!("invalid form `{}`", other))),
            None => self.current_namespaces.qualifies_elements(),
        };

        let name = match (name, &reference) {
            (Some(name), _) if qualified => self.target_namespaced(name),
            (Some(name), _) => NamespacedName::new(&mut self.namespaces, "", name),
            (None, Some(reference)) => reference.clone(),
            (None, None) => return Err(malformed(url, "<element> needs a `name` or a `ref`")),
        };

        let ty = self.resolve_optional(url, ty)?;

        let max_occurs = match max_occurs {
            Some(value) => MaxOccurs::parse(&value)
                .ok_or_else(|| malformed(url, format!("invalid maxOccurs `{}`", value)))?,
            None => MaxOccurs::default(),
        };

        Ok(ParseState::Element(Element {
            name,
            reference,
            ty,
            max_occurs,
            documentation: None,
            complex_type: None,
            simple_type: None,
        }))
    }

    fn attribute_start(&mut self, url: &Url, attributes: [Option<String>; 3]) -> Result<ParseState, error::Error> {
        let [name, reference, ty] = attributes;
        let reference = self.resolve_optional(url, reference)?;

        let name = match (name, &reference) {
            (Some(name), _) => self.target_namespaced(name),
            (None, Some(reference)) => reference.clone(),
            (None, None) => return Err(malformed(url, "<attribute> needs a `name` or a `ref`")),
        };

        Ok(ParseState::Attribute(Attribute {
            name,
            reference,
            ty: self.resolve_optional(url, ty)?,
            simple_type: None,
            documentation: None,
        }))
    }

    fn schema_start<B: BufRead>(&mut self, reader: &Reader<B>, url: &Url, start: &BytesStart<'_>) -> Result<ParseState, error::Error> {
        let [namespace, element_form] =
            get_attributes(reader, url, start, ["targetNamespace", "elementFormDefault"])?;
        self.push_target_namespace(namespace, element_form.as_deref() == Some("qualified"));

        Ok(ParseState::Schema(Schema {
            target_namespace: self.current_namespaces.target().to_owned(),
            ..Default::default()
        }))
    }

    fn handle_start<B: BufRead>(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        start: BytesStart<'_>,
        url: &Url,
    ) -> Result<(), error::Error> {
        let qualified_name = reader
            .decode(start.name())
            .map_err(|err| xml_error(reader, url, err))?;
        let (prefix, local_name) = split_namespaced_name(qualified_name);

        let mut declarations = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| xml_error(reader, url, err))?;
            let key = reader
                .decode(attribute.key)
                .map_err(|err| xml_error(reader, url, err))?;

            let prefix = match split_namespaced_name(key) {
                (None, "xmlns") => None,
                (Some("xmlns"), prefix) => Some(prefix.to_owned()),
                _ => continue,
            };

            let value = attribute
                .unescaped_value()
                .map_err(|err| xml_error(reader, url, err))?;
            let value = reader
                .decode(&value)
                .map_err(|err| xml_error(reader, url, err))?;

            declarations.push((prefix, value.to_owned()));
        }

        self.current_namespaces.push_scope(declarations);

        let mut state = stack.pop();
        let mut new_state = ParseState::Other(local_name.to_owned());
        let in_complex_type = matches!(state, Some(ParseState::ComplexType(_)));

        match state.as_mut() {
            None => match local_name {
                "definitions" => {
                    let [namespace] = get_attributes(reader, url, &start, ["targetNamespace"])?;
                    self.push_target_namespace(namespace, true);

                    if self.definition.target_namespace.is_empty() {
                        self.definition.target_namespace =
                            self.current_namespaces.target().to_owned();
                    }

                    new_state = ParseState::Definitions;
                }

                "schema" => new_state = self.schema_start(reader, url, &start)?,

                _ => {
                    return Err(malformed(
                        url,
                        format!("expected <definitions> or <schema>, found <{}>", local_name),
                    ))
                }
            },

            Some(ParseState::Definitions) => match local_name {
                "import" => {
                    let [location] = get_attributes(reader, url, &start, ["location"])?;
                    let location = required(url, location, "import", "location")?;

                    self.parse_url(url.join(&location)?, None)?;
                    debug!("back to {}", url);
                }

                "types" => new_state = ParseState::Types,

                "documentation" => new_state = ParseState::Documentation(None),

                "message" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "message", "name")?;

                    new_state = ParseState::Message(Message {
                        name: self.target_namespaced(name),
                        parts: Vec::new(),
                    });
                }

                "portType" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "portType", "name")?;

                    new_state = ParseState::PortType(PortType {
                        name: self.target_namespaced(name),
                        documentation: None,
                        operations: Vec::new(),
                    });
                }

                "binding" => {
                    let [name, ty] = get_attributes(reader, url, &start, ["name", "type"])?;
                    let name = required(url, name, "binding", "name")?;
                    let ty = required(url, ty, "binding", "type")?;

                    new_state = ParseState::Binding(Binding {
                        name: self.target_namespaced(name),
                        ty: self.resolve_namespace(url, &ty)?,
                        version: None,
                        transport: None,
                        style: None,
                        operations: Vec::new(),
                    });
                }

                "service" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "service", "name")?;

                    new_state = ParseState::Service(Service {
                        name: self.target_namespaced(name),
                        documentation: None,
                        ports: Vec::new(),
                    });
                }

                _ => trace!("found {} inside definitions block", local_name),
            },

            Some(ParseState::Types) => match local_name {
                "schema" => new_state = self.schema_start(reader, url, &start)?,
                "documentation" => new_state = ParseState::Documentation(None),
                _ => trace!("found {} inside types block", local_name),
            },

            Some(ParseState::Schema(_)) => match local_name {
                "element" => {
                    let attributes = get_attributes(
                        reader,
                        url,
                        &start,
                        ["name", "ref", "type", "maxOccurs", "form"],
                    )?;
                    new_state = self.element_start(url, false, attributes)?;
                }

                "attribute" => {
                    let attributes =
                        get_attributes(reader, url, &start, ["name", "ref", "type"])?;
                    new_state = self.attribute_start(url, attributes)?;
                }

                "complexType" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "complexType", "name")?;

                    new_state =
                        ParseState::ComplexType(ComplexType::empty(Some(self.target_namespaced(name))));
                }

                "simpleType" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "simpleType", "name")?;

                    new_state = ParseState::SimpleType {
                        name: Some(self.target_namespaced(name)),
                        documentation: None,
                        kind: None,
                    };
                }

                "import" => {
                    let [location] = get_attributes(reader, url, &start, ["schemaLocation"])?;

                    match location {
                        Some(location) => {
                            self.parse_url(url.join(&location)?, None)?;
                            debug!("back to {}", url);
                        }
                        None => debug!("import without schemaLocation inside {}", url),
                    }
                }

                "include" => {
                    let [location] = get_attributes(reader, url, &start, ["schemaLocation"])?;
                    let location = required(url, location, "include", "schemaLocation")?;
                    let namespace = self.current_namespaces.target().to_owned();

                    self.parse_url(url.join(&location)?, Some(namespace))?;
                    debug!("back to {}", url);
                }

                "annotation" => new_state = ParseState::Annotation(None),

                "group" | "attributeGroup" | "redefine" => {
                    return Err(unsupported(url, format!("<{}>", local_name)))
                }

                _ => trace!("found {} inside schema block", local_name),
            },

            Some(ParseState::Element(_)) => match local_name {
                "complexType" => new_state = ParseState::ComplexType(ComplexType::empty(None)),

                "simpleType" => {
                    new_state = ParseState::SimpleType {
                        name: None,
                        documentation: None,
                        kind: None,
                    }
                }

                "annotation" => new_state = ParseState::Annotation(None),

                _ => trace!("found {} inside element block", local_name),
            },

            Some(ParseState::Attribute(_)) => match local_name {
                "simpleType" => {
                    new_state = ParseState::SimpleType {
                        name: None,
                        documentation: None,
                        kind: None,
                    }
                }

                "annotation" => new_state = ParseState::Annotation(None),

                _ => trace!("found {} inside attribute block", local_name),
            },

            Some(ParseState::ComplexType(_) | ParseState::Derivation(_)) => match local_name {
                "sequence" | "choice" | "all" => {
                    let compositor = match local_name {
                        "sequence" => Compositor::Sequence,
                        "choice" => Compositor::Choice,
                        _ => Compositor::All,
                    };

                    new_state = ParseState::Group {
                        compositor,
                        depth: 1,
                        elements: Vec::new(),
                        nested_choice: Vec::new(),
                    };
                }

                "complexContent" | "simpleContent" if in_complex_type => {
                    new_state = ParseState::Content {
                        simple: local_name == "simpleContent",
                        derivation: None,
                    }
                }

                "attribute" => {
                    let attributes =
                        get_attributes(reader, url, &start, ["name", "ref", "type"])?;
                    new_state = self.attribute_start(url, attributes)?;
                }

                "annotation" => new_state = ParseState::Annotation(None),

                "group" | "attributeGroup" => {
                    return Err(unsupported(url, format!("<{}>", local_name)))
                }

                _ => trace!("found {} inside complex type block", local_name),
            },

            Some(ParseState::Content { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, url, &start, ["base"])?;
                    let base = required(url, base, local_name, "base")?;

                    new_state = ParseState::Derivation(ContentDerivation {
                        extension: local_name == "extension",
                        base: self.resolve_namespace(url, &base)?,
                        particles: Particles::default(),
                        attributes: Vec::new(),
                    });
                }

                "annotation" => new_state = ParseState::Annotation(None),

                _ => trace!("found {} inside content block", local_name),
            },

            Some(ParseState::Group {
                compositor, depth, ..
            }) => match local_name {
                "element" => {
                    let attributes = get_attributes(
                        reader,
                        url,
                        &start,
                        ["name", "ref", "type", "maxOccurs", "form"],
                    )?;
                    new_state = self.element_start(url, true, attributes)?;
                }

                "sequence" | "choice" | "all" => {
                    if *depth > 1 {
                        return Err(unsupported(
                            url,
                            format!("<{}> nested more than one level deep", local_name),
                        ));
                    }

                    new_state = ParseState::Group {
                        compositor: match local_name {
                            "sequence" => Compositor::Sequence,
                            "choice" => Compositor::Choice,
                            _ => Compositor::All,
                        },
                        depth: *depth + 1,
                        elements: Vec::new(),
                        nested_choice: Vec::new(),
                    };
                }

                "group" => return Err(unsupported(url, "<group>")),

                "any" => debug!("ignoring wildcard inside {:?} group", compositor),

                "annotation" => new_state = ParseState::Annotation(None),

                _ => trace!("found {} inside group block", local_name),
            },

            Some(ParseState::SimpleType { kind, .. }) => match local_name {
                "restriction" => {
                    let [base] = get_attributes(reader, url, &start, ["base"])?;
                    let base = base.ok_or_else(|| unsupported(url, "<restriction> without base"))?;

                    new_state = ParseState::Restriction {
                        base: self.resolve_namespace(url, &base)?,
                        pattern: None,
                        values: Vec::new(),
                    };
                }

                "list" => {
                    let [item_type] = get_attributes(reader, url, &start, ["itemType"])?;
                    let item_type =
                        item_type.ok_or_else(|| unsupported(url, "<list> with an inline item type"))?;

                    *kind = Some(SimpleTypeKind::List {
                        item_type: self.resolve_namespace(url, &item_type)?,
                    });
                }

                "union" => return Err(unsupported(url, "<union>")),

                "annotation" => new_state = ParseState::Annotation(None),

                _ => trace!("found {} inside simple type block", local_name),
            },

            Some(ParseState::Restriction { pattern, .. }) => match local_name {
                "enumeration" => {
                    let [value] = get_attributes(reader, url, &start, ["value"])?;

                    new_state = ParseState::Enumeration(Enumeration {
                        value: required(url, value, "enumeration", "value")?,
                        documentation: None,
                    });
                }

                "pattern" => {
                    let [value] = get_attributes(reader, url, &start, ["value"])?;
                    let value = required(url, value, "pattern", "value")?;

                    *pattern = Some(match pattern.take() {
                        Some(existing) => format!("{}|{}", existing, value),
                        None => value,
                    });
                }

                _ => trace!("found {} inside restriction block", local_name),
            },

            Some(ParseState::Enumeration(_)) => match local_name {
                "annotation" => new_state = ParseState::Annotation(None),
                _ => trace!("found {} inside enumeration block", local_name),
            },

            Some(ParseState::Annotation(_)) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),
                _ => trace!("found {} inside annotation block", local_name),
            },

            Some(ParseState::Message(_)) => match local_name {
                "part" => {
                    let [name, element, ty] =
                        get_attributes(reader, url, &start, ["name", "element", "type"])?;

                    new_state = ParseState::Part(Part {
                        name: required(url, name, "part", "name")?,
                        element: self.resolve_optional(url, element)?,
                        ty: self.resolve_optional(url, ty)?,
                    });
                }

                "documentation" => new_state = ParseState::Documentation(None),

                _ => trace!("found {} inside message block", local_name),
            },

            Some(ParseState::PortType(_)) => match local_name {
                "operation" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "operation", "name")?;

                    new_state = ParseState::Operation(Operation {
                        name: self.target_namespaced(name),
                        documentation: None,
                        input: None,
                        output: None,
                    });
                }

                "documentation" => new_state = ParseState::Documentation(None),

                _ => trace!("found {} inside port type block", local_name),
            },

            Some(ParseState::Operation(operation)) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "input" | "output" => {
                    let [message] = get_attributes(reader, url, &start, ["message"])?;
                    let message = required(url, message, local_name, "message")?;
                    let message = self.resolve_namespace(url, &message)?;

                    if local_name == "input" {
                        operation.input = Some(message);
                    } else {
                        operation.output = Some(message);
                    }
                }

                _ => trace!("found {} inside operation block", local_name),
            },

            Some(ParseState::Binding(binding)) => match local_name {
                "binding" => {
                    let [transport, style] =
                        get_attributes(reader, url, &start, ["transport", "style"])?;

                    binding.version = match self.current_namespaces.lookup(prefix) {
                        Some(SOAP11_BINDING_NAMESPACE) => Some(SoapVersion::Soap11),
                        Some(SOAP12_BINDING_NAMESPACE) => Some(SoapVersion::Soap12),
                        _ => None,
                    };
                    binding.transport = transport;
                    binding.style = style;
                }

                "operation" => {
                    let [name] = get_attributes(reader, url, &start, ["name"])?;
                    let name = required(url, name, "operation", "name")?;

                    new_state = ParseState::BindingOperation(BindingOperation {
                        name: self.target_namespaced(name),
                        action: None,
                        style: None,
                        input: None,
                        output: None,
                    });
                }

                _ => trace!("found {} inside binding block", local_name),
            },

            Some(ParseState::BindingOperation(operation)) => match local_name {
                "operation" => {
                    let [action, style] =
                        get_attributes(reader, url, &start, ["soapAction", "style"])?;

                    operation.action = action;
                    operation.style = style;
                }

                "input" | "output" => {
                    new_state = ParseState::BindingMessage {
                        output: local_name == "output",
                        message: BindingMessage::default(),
                    }
                }

                _ => trace!("found {} inside binding operation block", local_name),
            },

            Some(ParseState::BindingMessage { message, .. }) => match local_name {
                "body" => {
                    let [body_use] = get_attributes(reader, url, &start, ["use"])?;
                    message.body_use = body_use;
                }

                "header" => {
                    let [header, part] = get_attributes(reader, url, &start, ["message", "part"])?;
                    let header = required(url, header, "header", "message")?;

                    message.headers.push(SoapHeader {
                        message: self.resolve_namespace(url, &header)?,
                        part,
                    });
                }

                _ => trace!("found {} inside binding message block", local_name),
            },

            Some(ParseState::Service(_)) => match local_name {
                "port" => {
                    let [name, binding] = get_attributes(reader, url, &start, ["name", "binding"])?;
                    let name = required(url, name, "port", "name")?;
                    let binding = required(url, binding, "port", "binding")?;

                    new_state = ParseState::Port(Port {
                        name: self.target_namespaced(name),
                        binding: self.resolve_namespace(url, &binding)?,
                        location: None,
                    });
                }

                "documentation" => new_state = ParseState::Documentation(None),

                _ => trace!("found {} inside service block", local_name),
            },

            Some(ParseState::Port(port)) => match local_name {
                "address" => {
                    let [location] = get_attributes(reader, url, &start, ["location"])?;
                    port.location = Some(required(url, location, "address", "location")?);
                }

                _ => trace!("found {} inside port block", local_name),
            },

            Some(other) => trace!("found {} inside {} block", local_name, other.block_name()),
        }

        stack.extend(state);
        stack.push(new_state);

        Ok(())
    }

    fn handle_end(&mut self, stack: &mut Vec<ParseState>, url: &Url) -> Result<(), error::Error> {
        self.current_namespaces.pop_scope();

        let finished_state = stack.pop();
        let mut next_state = stack.pop();

        let misplaced = |finished: &str, next: &Option<ParseState>| {
            malformed(
                url,
                format!(
                    "unexpected {} inside {}",
                    finished,
                    next.as_ref().map_or("document", ParseState::block_name)
                ),
            )
        };

        match finished_state {
            Some(ParseState::Definitions) => self.pop_target_namespace(),

            Some(ParseState::Schema(schema)) => {
                self.pop_target_namespace();
                self.definition.schemas.push(schema);
            }

            Some(ParseState::Annotation(Some(text)) | ParseState::Documentation(Some(text))) => {
                if let Some(next) = next_state.as_mut() {
                    next.set_documentation(text);
                }
            }

            Some(ParseState::Element(element)) => match next_state.as_mut() {
                Some(ParseState::Schema(schema)) => schema.elements.push(element),
                Some(ParseState::Group { elements, .. }) => elements.push(element),
                _ => return Err(misplaced("element", &next_state)),
            },

            Some(ParseState::Attribute(attribute)) => match next_state.as_mut() {
                Some(ParseState::Schema(schema)) => schema.attributes.push(attribute),
                Some(ParseState::ComplexType(complex_type)) => complex_type.attributes.push(attribute),
                Some(ParseState::Derivation(derivation)) => derivation.attributes.push(attribute),
                _ => return Err(misplaced("attribute", &next_state)),
            },

            Some(ParseState::ComplexType(complex_type)) => match next_state.as_mut() {
                Some(ParseState::Schema(schema)) => schema.complex_types.push(complex_type),
                Some(ParseState::Element(element)) => {
                    element.complex_type = Some(Box::new(complex_type))
                }
                _ => return Err(misplaced("complexType", &next_state)),
            },

            Some(ParseState::Group {
                compositor,
                elements,
                nested_choice,
                ..
            }) => match next_state.as_mut() {
                Some(ParseState::ComplexType(complex_type)) => {
                    add_particles(&mut complex_type.particles, compositor, elements, nested_choice)
                }

                Some(ParseState::Derivation(derivation)) => {
                    add_particles(&mut derivation.particles, compositor, elements, nested_choice)
                }

                Some(ParseState::Group {
                    compositor: parent,
                    elements: parent_elements,
                    nested_choice: parent_nested,
                    ..
                }) => {
                    if *parent == Compositor::Sequence && compositor == Compositor::Choice {
                        parent_nested.extend(elements);
                    } else {
                        parent_elements.extend(elements);
                    }

                    parent_nested.extend(nested_choice);
                }

                _ => return Err(misplaced("group", &next_state)),
            },

            Some(ParseState::Derivation(derivation)) => match next_state.as_mut() {
                Some(ParseState::Content {
                    derivation: slot, ..
                }) => *slot = Some(derivation),
                _ => return Err(misplaced("derivation", &next_state)),
            },

            Some(ParseState::Content { simple, derivation }) => match next_state.as_mut() {
                Some(ParseState::ComplexType(complex_type)) => {
                    if let Some(derivation) = derivation {
                        complex_type.derivation = match (simple, derivation.extension) {
                            (true, _) => Derivation::SimpleExtension(derivation.base),
                            (false, true) => Derivation::ComplexExtension(derivation.base),
                            (false, false) => Derivation::None,
                        };

                        let particles = derivation.particles;
                        complex_type.particles.sequence.extend(particles.sequence);
                        complex_type.particles.choice.extend(particles.choice);
                        complex_type
                            .particles
                            .sequence_choice
                            .extend(particles.sequence_choice);
                        complex_type.particles.all.extend(particles.all);
                        complex_type.attributes.extend(derivation.attributes);
                    }
                }
                _ => return Err(misplaced("content", &next_state)),
            },

            Some(ParseState::SimpleType {
                name,
                documentation,
                kind,
            }) => {
                let kind = kind.ok_or_else(|| malformed(url, "<simpleType> without restriction or list"))?;
                let simple_type = SimpleType {
                    name,
                    documentation,
                    kind,
                };

                match next_state.as_mut() {
                    Some(ParseState::Schema(schema)) => schema.simple_types.push(simple_type),
                    Some(ParseState::Element(element)) => {
                        element.simple_type = Some(Box::new(simple_type))
                    }
                    Some(ParseState::Attribute(attribute)) => {
                        attribute.simple_type = Some(Box::new(simple_type))
                    }
                    _ => return Err(misplaced("simpleType", &next_state)),
                }
            }

            Some(ParseState::Restriction {
                base,
                pattern,
                values,
            }) => match next_state.as_mut() {
                Some(ParseState::SimpleType { kind, .. }) => {
                    *kind = Some(if values.is_empty() {
                        SimpleTypeKind::Restriction { base, pattern }
                    } else {
                        SimpleTypeKind::Enumeration { base, values }
                    })
                }
                _ => return Err(misplaced("restriction", &next_state)),
            },

            Some(ParseState::Enumeration(enumeration)) => match next_state.as_mut() {
                Some(ParseState::Restriction { values, .. }) => values.push(enumeration),
                _ => return Err(misplaced("enumeration", &next_state)),
            },

            Some(ParseState::Message(message)) => self.definition.messages.push(message),

            Some(ParseState::Part(part)) => match next_state.as_mut() {
                Some(ParseState::Message(message)) => message.parts.push(part),
                _ => return Err(misplaced("part", &next_state)),
            },

            Some(ParseState::PortType(port_type)) => self.definition.port_types.push(port_type),

            Some(ParseState::Operation(operation)) => match next_state.as_mut() {
                Some(ParseState::PortType(port_type)) => port_type.operations.push(operation),
                _ => return Err(misplaced("operation", &next_state)),
            },

            Some(ParseState::Binding(binding)) => self.definition.bindings.push(binding),

            Some(ParseState::BindingOperation(operation)) => match next_state.as_mut() {
                Some(ParseState::Binding(binding)) => binding.operations.push(operation),
                _ => return Err(misplaced("operation", &next_state)),
            },

            Some(ParseState::BindingMessage { output, message }) => match next_state.as_mut() {
                Some(ParseState::BindingOperation(operation)) => {
                    if output {
                        operation.output = Some(message);
                    } else {
                        operation.input = Some(message);
                    }
                }
                _ => return Err(misplaced("binding message", &next_state)),
            },

            Some(ParseState::Service(service)) => self.definition.services.push(service),

            Some(ParseState::Port(port)) => match next_state.as_mut() {
                Some(ParseState::Service(service)) => service.ports.push(port),
                _ => return Err(misplaced("port", &next_state)),
            },

            _ => (),
        }

        stack.extend(next_state);
        Ok(())
    }

    fn handle_text(stack: &mut [ParseState], text: &str) {
        if text.trim().is_empty() {
            return;
        }

        if let Some(ParseState::Documentation(docs)) = stack.last_mut() {
            match docs {
                Some(existing) => existing.push_str(text),
                None => *docs = Some(text.to_owned()),
            }
        }
    }
}

pub fn parse<L: Loader>(loader: L, url: Url) -> Result<(Definition, Namespaces), error::Error> {
    Parser::new(loader).parse(url)
}
