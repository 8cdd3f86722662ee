use proc_macro2::TokenStream;
use tracing::debug;
use url::Url;
use wsdlgen_wsdl::{
    self as wsdl,
    types::{Definition, Namespaces},
    Loader, UrlLoader,
};

mod codegen;
mod naming;
mod operations;
mod preprocessor;
mod resolver;
mod soap;
mod types;

pub mod error;

pub use error::{Error, ErrorKind};

#[derive(Debug, Clone)]
pub struct Config {
    /// Package label recorded in the header artifact.
    pub package: String,
    /// Fail instead of falling back to `String` for unmapped primitives.
    pub deny_unmapped_primitives: bool,
}

impl Config {
    pub fn new<S: Into<String>>(package: S) -> Self {
        Self {
            package: package.into(),
            deny_unmapped_primitives: false,
        }
    }

    pub fn deny_unmapped_primitives(mut self, deny: bool) -> Self {
        self.deny_unmapped_primitives = deny;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("myservice")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Header,
    Types,
    Operations,
    Soap,
}

impl ArtifactKind {
    /// Concatenation order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Header,
        ArtifactKind::Types,
        ArtifactKind::Operations,
        ArtifactKind::Soap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Header => "header",
            ArtifactKind::Types => "types",
            ArtifactKind::Operations => "operations",
            ArtifactKind::Soap => "soap",
        }
    }
}

/// The four generated source texts of one run.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    header: String,
    types: String,
    operations: String,
    soap: String,
    warnings: Vec<String>,
}

impl Artifacts {
    pub fn get(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Header => &self.header,
            ArtifactKind::Types => &self.types,
            ArtifactKind::Operations => &self.operations,
            ArtifactKind::Soap => &self.soap,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        ArtifactKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// All artifacts joined in order into one source file.
    pub fn concatenate(&self) -> String {
        self.iter()
            .map(|(_, text)| text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Unmapped primitives that were rendered as `String`.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn render(kind: ArtifactKind, tokens: TokenStream) -> Result<String, Error> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|err| Error::Render {
        artifact: kind.name(),
        message: err.to_string(),
    })?;

    debug!(artifact = kind.name(), items = file.items.len(), "rendered artifact");
    Ok(prettyplease::unparse(&file))
}

/// Generates code for the document at `location`, a URL or a filesystem path.
pub fn generate<S: AsRef<str>>(location: S, config: &Config) -> Result<Artifacts, Error> {
    let url = wsdl::resolve_location(location)?;
    generate_with(UrlLoader, &url, config)
}

pub fn generate_with<L: Loader>(loader: L, location: &Url, config: &Config) -> Result<Artifacts, Error> {
    let (definition, namespaces) = wsdl::parse_with(loader, location)?;
    from_definition(&definition, &namespaces, config, location.as_str())
}

/// Renders the four artifacts for an already merged definition. `source`
/// names the document in the header.
pub fn from_definition(
    definition: &Definition,
    namespaces: &Namespaces,
    config: &Config,
    source: &str,
) -> Result<Artifacts, Error> {
    let resolver = resolver::Resolver::new(definition, namespaces, config.deny_unmapped_primitives);

    let header = render(
        ArtifactKind::Header,
        soap::codegen_header(source, &config.package),
    )?;

    let types = render(
        ArtifactKind::Types,
        codegen::codegen_types(definition, &resolver)?,
    )?;

    let port_types = preprocessor::preprocess(definition, namespaces)?;
    let operations = render(
        ArtifactKind::Operations,
        operations::codegen_operations(definition, &port_types, &resolver)?,
    )?;

    let soap = render(ArtifactKind::Soap, soap::codegen_soap())?;

    Ok(Artifacts {
        header,
        types,
        operations,
        soap,
        warnings: resolver.warnings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_concatenate_in_order() {
        let artifacts = Artifacts {
            header: "//! header\n".into(),
            types: String::new(),
            operations: "fn operations() {}\n".into(),
            soap: "fn soap() {}\n".into(),
            warnings: Vec::new(),
        };

        assert_eq!(
            artifacts.concatenate(),
            "//! header\n\nfn operations() {}\n\nfn soap() {}\n"
        );
        assert_eq!(artifacts.get(ArtifactKind::Types), "");
    }

    #[test]
    fn empty_definition_still_renders_glue() {
        let artifacts = from_definition(
            &Definition::default(),
            &Namespaces::default(),
            &Config::default(),
            "empty.wsdl",
        )
        .unwrap();

        assert!(artifacts.get(ArtifactKind::Types).trim().is_empty());
        assert!(artifacts.get(ArtifactKind::Soap).contains("pub struct SoapClient"));
        assert!(syn::parse_file(&artifacts.concatenate()).is_ok());
    }

    #[test]
    fn invalid_tokens_are_render_errors() {
        let err = render(ArtifactKind::Types, quote::quote!(pub struct;)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(err.to_string().contains("types"));
    }
}
