use tracing::debug;
use wsdlgen_wsdl::types::{self as wsdl, Namespaces, SoapVersion};

use super::{error::Error, types};

/// Picks the binding generated methods follow, preferring SOAP 1.1.
fn preferred_binding<'a>(definition: &'a wsdl::Definition, port_type: &wsdl::PortType) -> Option<&'a wsdl::Binding> {
    let mut bindings = definition
        .bindings
        .iter()
        .filter(|binding| binding.ty == port_type.name && binding.is_soap_over_http())
        .collect::<Vec<_>>();

    bindings.sort_by_key(|binding| binding.version != Some(SoapVersion::Soap11));
    bindings.first().copied()
}

fn message<'a>(
    definition: &'a wsdl::Definition,
    namespaces: &Namespaces,
    name: &wsdl::NamespacedName,
    context: &str,
) -> Result<&'a wsdl::Message, Error> {
    definition
        .message(name)
        .ok_or_else(|| Error::unresolved(name.display(namespaces), context))
}

fn preprocess_operation<'a>(
    definition: &'a wsdl::Definition,
    namespaces: &Namespaces,
    binding: Option<&'a wsdl::Binding>,
    operation: &'a wsdl::Operation,
) -> Result<types::Operation<'a>, Error> {
    let context = format!("operation {}", operation.name.name);

    let binding_operation = binding.and_then(|binding| {
        binding
            .operations
            .iter()
            .find(|candidate| candidate.name.name == operation.name.name)
    });

    if let (Some(binding), Some(binding_operation)) = (binding, binding_operation) {
        if binding.style_of(binding_operation) == "rpc" {
            return Err(Error::unsupported("rpc style binding", &context));
        }

        let encoded = binding_operation
            .input
            .iter()
            .chain(&binding_operation.output)
            .any(|message| message.body_use.as_deref() == Some("encoded"));
        if encoded {
            return Err(Error::unsupported("SOAP encoded body", &context));
        }
    }

    let mut headers = Vec::new();
    let declared = binding_operation
        .and_then(|operation| operation.input.as_ref())
        .map_or(&[][..], |input| input.headers.as_slice());

    for header in declared {
        let message = message(definition, namespaces, &header.message, &context)?;

        let part = match &header.part {
            Some(part) => message.parts.iter().find(|candidate| candidate.name == *part),
            None => message.parts.first(),
        }
        .ok_or_else(|| {
            Error::unresolved(
                format!(
                    "{}#{}",
                    message.name.display(namespaces),
                    header.part.as_deref().unwrap_or_default()
                ),
                &context,
            )
        })?;

        headers.push(types::Header { message, part });
    }

    Ok(types::Operation {
        name: &operation.name,
        documentation: operation.documentation.as_deref(),
        action: binding_operation
            .and_then(|operation| operation.action.as_deref())
            .unwrap_or_default(),
        input: operation
            .input
            .as_ref()
            .map(|input| message(definition, namespaces, input, &context))
            .transpose()?,
        output: operation
            .output
            .as_ref()
            .map(|output| message(definition, namespaces, output, &context))
            .transpose()?,
        headers,
    })
}

/// Joins every port type with its binding, and every service port with the
/// port type its binding implements.
pub fn preprocess<'a>(
    definition: &'a wsdl::Definition,
    namespaces: &Namespaces,
) -> Result<Vec<types::PortType<'a>>, Error> {
    let mut port_types = Vec::new();

    for port_type in &definition.port_types {
        let binding = preferred_binding(definition, port_type);

        let operations = port_type
            .operations
            .iter()
            .map(|operation| preprocess_operation(definition, namespaces, binding, operation))
            .collect::<Result<Vec<_>, _>>()?;

        port_types.push(types::PortType {
            name: &port_type.name,
            documentation: port_type.documentation.as_deref(),
            operations,
            ports: Vec::new(),
        });
    }

    for service in &definition.services {
        for port in &service.ports {
            let context = format!("port {}", port.name.name);

            let binding = definition
                .binding(&port.binding)
                .ok_or_else(|| Error::unresolved(port.binding.display(namespaces), &context))?;

            let version = match binding.version {
                Some(version) if binding.is_soap_over_http() => version,
                _ => {
                    debug!(port = %port.name.name, "skipping port without a SOAP over HTTP binding");
                    continue;
                }
            };

            let port_type = port_types
                .iter_mut()
                .find(|port_type| *port_type.name == binding.ty)
                .ok_or_else(|| Error::unresolved(binding.ty.display(namespaces), &context))?;

            port_type.ports.push(types::Port {
                name: &port.name,
                location: port.location.as_deref().unwrap_or_default(),
                version,
            });
        }
    }

    Ok(port_types)
}
