use std::fmt;

/// Namespace URIs seen while parsing, interned so names compare by index.
#[derive(Default, Debug, Clone)]
pub struct Namespaces(Vec<String>);

/// A name resolved against the namespace URI it was declared in or referenced from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    namespace_idx: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    pub value: String,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleTypeKind {
    /// A plain restriction of `base`, possibly constrained by a pattern.
    Restriction {
        base: NamespacedName,
        pattern: Option<String>,
    },
    Enumeration {
        base: NamespacedName,
        values: Vec<Enumeration>,
    },
    List {
        item_type: NamespacedName,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// `None` for a type declared inline under an element or attribute.
    pub name: Option<NamespacedName>,
    pub documentation: Option<String>,
    pub kind: SimpleTypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    None,
    ComplexExtension(NamespacedName),
    SimpleExtension(NamespacedName),
}

/// Particle groups of a complex type. All four render as one ordered field list.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Particles {
    pub sequence: Vec<Element>,
    pub choice: Vec<Element>,
    /// Elements of a `choice` nested directly inside a `sequence`.
    pub sequence_choice: Vec<Element>,
    pub all: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// `None` for an anonymous type declared inline under an element.
    pub name: Option<NamespacedName>,
    pub documentation: Option<String>,
    pub derivation: Derivation,
    pub particles: Particles,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// For `ref` particles this is the referenced name.
    pub name: NamespacedName,
    pub reference: Option<NamespacedName>,
    pub ty: Option<NamespacedName>,
    pub max_occurs: MaxOccurs,
    pub documentation: Option<String>,
    pub complex_type: Option<Box<ComplexType>>,
    pub simple_type: Option<Box<SimpleType>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: NamespacedName,
    pub reference: Option<NamespacedName>,
    pub ty: Option<NamespacedName>,
    pub simple_type: Option<Box<SimpleType>>,
    pub documentation: Option<String>,
}

/// One `<xs:schema>` block after import and include merging.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Schema {
    pub target_namespace: String,
    pub simple_types: Vec<SimpleType>,
    pub complex_types: Vec<ComplexType>,
    pub elements: Vec<Element>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub element: Option<NamespacedName>,
    pub ty: Option<NamespacedName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortType {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoapHeader {
    pub message: NamespacedName,
    pub part: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct BindingMessage {
    pub body_use: Option<String>,
    pub headers: Vec<SoapHeader>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingOperation {
    pub name: NamespacedName,
    pub action: Option<String>,
    pub style: Option<String>,
    pub input: Option<BindingMessage>,
    pub output: Option<BindingMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    /// `None` for bindings that are not SOAP bindings (HTTP GET/POST).
    pub version: Option<SoapVersion>,
    pub transport: Option<String>,
    pub style: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: NamespacedName,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Definition {
    pub target_namespace: String,
    pub schemas: Vec<Schema>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const SOAP_ENCODING_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const SOAP11_BINDING_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_BINDING_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// `transport` URIs of SOAP over HTTP, compared without a trailing `/`.
const HTTP_TRANSPORTS: &[&str] = &[
    "http://schemas.xmlsoap.org/soap/http",
    "http://www.w3.org/2003/05/soap/bindings/HTTP",
];

/// Namespaces whose names denote built-in primitives rather than declarations.
pub fn is_builtin_namespace(namespace: &str) -> bool {
    matches!(
        namespace,
        XSD_NAMESPACE
            | "http://www.w3.org/1999/XMLSchema"
            | "http://www.w3.org/2000/10/XMLSchema"
            | SOAP_ENCODING_NAMESPACE
    )
}

impl Namespaces {
    pub fn namespaces(&self) -> &[String] {
        &self.0
    }

    pub fn add_or_get(&mut self, namespace: &str) -> usize {
        if let Some(index) = self.index_of(namespace) {
            index
        } else {
            let index = self.0.len();
            self.0.push(namespace.to_owned());
            index
        }
    }

    pub fn index_of(&self, namespace: &str) -> Option<usize> {
        self.0.iter().position(|value| value == namespace)
    }

    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or_default()
    }
}

impl NamespacedName {
    pub fn new(namespaces: &mut Namespaces, namespace: &str, name: String) -> Self {
        Self {
            namespace_idx: namespaces.add_or_get(namespace),
            name,
        }
    }

    pub fn namespace<'a>(&self, namespaces: &'a Namespaces) -> &'a str {
        namespaces.get(self.namespace_idx)
    }

    /// `{namespace}name`, the form used in diagnostics.
    pub fn display<'a>(&'a self, namespaces: &'a Namespaces) -> impl fmt::Display + 'a {
        DisplayName {
            namespace: self.namespace(namespaces),
            name: &self.name,
        }
    }
}

struct DisplayName<'a> {
    namespace: &'a str,
    name: &'a str,
}

impl fmt::Display for DisplayName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.name)
        }
    }
}

impl MaxOccurs {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "unbounded" => Some(Self::Unbounded),
            other => other.parse().ok().map(Self::Bounded),
        }
    }

    pub fn is_many(self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(count) => count > 1,
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl Particles {
    /// Every particle in rendering order: sequence, choice, sequence-choice, all.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.sequence
            .iter()
            .chain(&self.choice)
            .chain(&self.sequence_choice)
            .chain(&self.all)
    }
}

impl ComplexType {
    pub fn empty(name: Option<NamespacedName>) -> Self {
        Self {
            name,
            documentation: None,
            derivation: Derivation::None,
            particles: Particles::default(),
            attributes: Vec::new(),
        }
    }
}

impl Binding {
    /// A SOAP binding whose transport is HTTP, or left unspecified.
    pub fn is_soap_over_http(&self) -> bool {
        self.version.is_some()
            && self.transport.as_deref().map_or(true, |transport| {
                HTTP_TRANSPORTS.contains(&transport.trim().trim_end_matches('/'))
            })
    }

    /// `style` of `operation`, falling back to the binding default.
    pub fn style_of<'a>(&'a self, operation: &'a BindingOperation) -> &'a str {
        operation
            .style
            .as_deref()
            .or(self.style.as_deref())
            .unwrap_or("document")
    }
}

impl Definition {
    pub fn message(&self, name: &NamespacedName) -> Option<&Message> {
        self.messages.iter().find(|message| message.name == *name)
    }

    pub fn port_type(&self, name: &NamespacedName) -> Option<&PortType> {
        self.port_types.iter().find(|port_type| port_type.name == *name)
    }

    pub fn binding(&self, name: &NamespacedName) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == *name)
    }
}
