use thiserror::Error;
use wsdlgen_wsdl::error as wsdl;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Wsdl(#[from] wsdl::Error),

    #[error("Unresolved reference {reference} in {context}")]
    UnresolvedType { reference: String, context: String },

    #[error("Unsupported construct {construct} in {context}")]
    UnsupportedConstruct { construct: String, context: String },

    #[error("Unable to render the {artifact} artifact: {message}")]
    Render {
        artifact: &'static str,
        message: String,
    },
}

/// The four failure classes a generation run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Document,
    UnresolvedType,
    UnsupportedConstruct,
    Render,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Wsdl(wsdl::Error::UnsupportedConstruct { .. }) => ErrorKind::UnsupportedConstruct,
            Error::Wsdl(_) => ErrorKind::Document,
            Error::UnresolvedType { .. } => ErrorKind::UnresolvedType,
            Error::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
            Error::Render { .. } => ErrorKind::Render,
        }
    }

    pub(crate) fn unresolved(reference: impl ToString, context: impl Into<String>) -> Self {
        Error::UnresolvedType {
            reference: reference.to_string(),
            context: context.into(),
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>, context: impl Into<String>) -> Self {
        Error::UnsupportedConstruct {
            construct: construct.into(),
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn document_errors_are_classified() {
        let location = Url::parse("file:///service.wsdl").unwrap();

        let malformed: Error = wsdl::Error::MalformedDocument {
            location: location.clone(),
            message: "missing name".into(),
        }
        .into();
        let union: Error = wsdl::Error::UnsupportedConstruct {
            location,
            construct: "<union>".into(),
        }
        .into();

        assert_eq!(malformed.kind(), ErrorKind::Document);
        assert_eq!(union.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(Error::unresolved("{urn:a}Foo", "element Bar").kind(), ErrorKind::UnresolvedType);
    }
}
