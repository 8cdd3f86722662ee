use wsdlgen_wsdl::types::{self as wsdl, NamespacedName, SoapVersion};

/// A port type joined with its SOAP binding and the service ports exposing it.
#[derive(Debug, Clone)]
pub struct PortType<'a> {
    pub name: &'a NamespacedName,
    pub documentation: Option<&'a str>,
    pub operations: Vec<Operation<'a>>,
    pub ports: Vec<Port<'a>>,
}

#[derive(Debug, Clone)]
pub struct Operation<'a> {
    pub name: &'a NamespacedName,
    pub documentation: Option<&'a str>,
    pub action: &'a str,
    pub input: Option<&'a wsdl::Message>,
    pub output: Option<&'a wsdl::Message>,
    pub headers: Vec<Header<'a>>,
}

#[derive(Debug, Clone)]
pub struct Header<'a> {
    pub message: &'a wsdl::Message,
    pub part: &'a wsdl::Part,
}

#[derive(Debug, Clone)]
pub struct Port<'a> {
    pub name: &'a NamespacedName,
    pub location: &'a str,
    pub version: SoapVersion,
}
