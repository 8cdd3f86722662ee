use proc_macro2::TokenStream;
use quote::quote;

/// Token stream of the header artifact.
pub fn codegen_header(source: &str, package: &str) -> TokenStream {
    let generated = format!(" Code generated by wsdlgen from `{}`. DO NOT EDIT.", source);
    let package = format!(" Package `{}`.", package);

    quote! {
        #![doc = #generated]
        #![doc = ""]
        #![doc = #package]
        #![allow(
            dead_code,
            unused_imports,
            non_camel_case_types,
            non_snake_case,
            non_upper_case_globals,
            clippy::all
        )]

        use serde::{Deserialize, Serialize};
    }
}

/// Token stream of the transport glue every generated client calls into.
pub fn codegen_soap() -> TokenStream {
    quote! {
        /// SOAP envelope version spoken by a port.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum SoapVersion {
            Soap11,
            Soap12,
        }

        impl SoapVersion {
            pub fn envelope_namespace(self) -> &'static str {
                match self {
                    SoapVersion::Soap11 => "http://schemas.xmlsoap.org/soap/envelope/",
                    SoapVersion::Soap12 => "http://www.w3.org/2003/05/soap-envelope",
                }
            }

            pub fn content_type(self) -> &'static str {
                match self {
                    SoapVersion::Soap11 => "text/xml; charset=utf-8",
                    SoapVersion::Soap12 => "application/soap+xml; charset=utf-8",
                }
            }
        }

        /// Namespace-qualified XML name of a generated type.
        pub trait XmlName {
            const NAMESPACE: &'static str;
            const NAME: &'static str;
        }

        /// Sends one serialized envelope and returns the raw response body.
        pub trait SoapTransport {
            fn post(&self, url: &str, action: &str, content_type: &str, body: String) -> Result<String, SoapError>;
        }

        #[derive(Debug)]
        pub enum SoapError {
            Transport(String),
            Serialize(String),
            Deserialize(String),
            Fault(SoapFault),
            EmptyResponse,
        }

        impl std::fmt::Display for SoapError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    SoapError::Transport(message) => write!(f, "transport error: {}", message),
                    SoapError::Serialize(message) => write!(f, "unable to serialize request: {}", message),
                    SoapError::Deserialize(message) => write!(f, "unable to deserialize response: {}", message),
                    SoapError::Fault(fault) => write!(f, "SOAP fault {}: {}", fault.faultcode, fault.faultstring),
                    SoapError::EmptyResponse => f.write_str("empty SOAP response body"),
                }
            }
        }

        impl std::error::Error for SoapError {}

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct SoapFault {
            #[serde(rename = "faultcode", default)]
            pub faultcode: String,
            #[serde(rename = "faultstring", default)]
            pub faultstring: String,
            #[serde(rename = "faultactor", default, skip_serializing_if = "Option::is_none")]
            pub faultactor: Option<String>,
        }

        #[derive(Deserialize)]
        struct ResponseEnvelope<T> {
            #[serde(rename = "Body", alias = "soap:Body", alias = "soapenv:Body", alias = "SOAP-ENV:Body", alias = "env:Body", alias = "s:Body")]
            body: ResponseBody<T>,
        }

        #[derive(Deserialize)]
        struct ResponseBody<T> {
            #[serde(rename = "Fault", alias = "soap:Fault", alias = "soapenv:Fault", alias = "SOAP-ENV:Fault", alias = "env:Fault", alias = "s:Fault", default)]
            fault: Option<SoapFault>,
            #[serde(rename = "$value")]
            content: Option<T>,
        }

        pub struct SoapClient<T> {
            url: String,
            transport: T,
            version: SoapVersion,
            headers: std::collections::BTreeMap<String, String>,
        }

        impl<T: SoapTransport> SoapClient<T> {
            pub fn new(url: impl Into<String>, transport: T) -> Self {
                Self {
                    url: url.into(),
                    transport,
                    version: SoapVersion::Soap11,
                    headers: std::collections::BTreeMap::new(),
                }
            }

            pub fn with_version(mut self, version: SoapVersion) -> Self {
                self.version = version;
                self
            }

            /// Stores a header entry sent with every following request.
            pub fn set_header<H: Serialize + ?Sized>(&mut self, namespace: &str, name: &str, header: &H) -> Result<(), SoapError> {
                let xml = quick_xml::se::to_string_with_root(name, header)
                    .map_err(|err| SoapError::Serialize(err.to_string()))?;

                self.headers.insert(name.to_owned(), qualify(&xml, namespace));
                Ok(())
            }

            pub fn clear_headers(&mut self) {
                self.headers.clear();
            }

            pub fn call<In: Serialize + ?Sized, Out: serde::de::DeserializeOwned>(
                &self,
                action: &str,
                namespace: &str,
                name: &str,
                request: Option<&In>,
            ) -> Result<Out, SoapError> {
                let response = self.exchange(action, namespace, name, request)?;
                let envelope: ResponseEnvelope<Out> = quick_xml::de::from_str(&response)
                    .map_err(|err| SoapError::Deserialize(err.to_string()))?;

                if let Some(fault) = envelope.body.fault {
                    return Err(SoapError::Fault(fault));
                }

                envelope.body.content.ok_or(SoapError::EmptyResponse)
            }

            /// Like `call`, for operations without a response message.
            pub fn send<In: Serialize + ?Sized>(
                &self,
                action: &str,
                namespace: &str,
                name: &str,
                request: Option<&In>,
            ) -> Result<(), SoapError> {
                let response = self.exchange(action, namespace, name, request)?;
                if response.trim().is_empty() {
                    return Ok(());
                }

                let envelope: ResponseEnvelope<serde::de::IgnoredAny> = quick_xml::de::from_str(&response)
                    .map_err(|err| SoapError::Deserialize(err.to_string()))?;

                match envelope.body.fault {
                    Some(fault) => Err(SoapError::Fault(fault)),
                    None => Ok(()),
                }
            }

            fn exchange<In: Serialize + ?Sized>(
                &self,
                action: &str,
                namespace: &str,
                name: &str,
                request: Option<&In>,
            ) -> Result<String, SoapError> {
                let body = match request {
                    Some(request) => {
                        let xml = quick_xml::se::to_string_with_root(name, request)
                            .map_err(|err| SoapError::Serialize(err.to_string()))?;
                        qualify(&xml, namespace)
                    }
                    None => String::new(),
                };

                let headers = self.headers.values().map(String::as_str).collect::<String>();
                let header = if headers.is_empty() {
                    String::new()
                } else {
                    format!("<soap:Header>{}</soap:Header>", headers)
                };

                let envelope = format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><soap:Envelope xmlns:soap=\"{}\">{}<soap:Body>{}</soap:Body></soap:Envelope>",
                    self.version.envelope_namespace(),
                    header,
                    body
                );

                self.transport.post(&self.url, action, self.version.content_type(), envelope)
            }
        }

        /// Declares `namespace` as the default namespace of the root element of `xml`.
        fn qualify(xml: &str, namespace: &str) -> String {
            if namespace.is_empty() || !xml.starts_with('<') {
                return xml.to_owned();
            }

            match xml.find(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
                Some(index) => format!("{} xmlns=\"{}\"{}", &xml[..index], namespace, &xml[index..]),
                None => xml.to_owned(),
            }
        }
    }
}
