use std::path::Path;
use url::Url;

mod parser;

pub mod error;
pub mod loader;
pub mod types;

pub use loader::{Loader, UrlLoader};

/// Turns a command-line location into a URL. Anything that is not already a
/// URL is treated as a filesystem path.
pub fn resolve_location<S: AsRef<str>>(location: S) -> Result<Url, error::Error> {
    match Url::parse(location.as_ref()) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(location.as_ref())
                .canonicalize()
                .map_err(|err| error::Error::PathConversionError(Some(err)))?;

            Url::from_file_path(&path).map_err(|()| error::Error::PathConversionError(None))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn parse<S: AsRef<str>>(
    location: S,
) -> Result<(types::Definition, types::Namespaces), error::Error> {
    parse_with(UrlLoader, &resolve_location(location)?)
}

/// Parses the document at `location` and everything it imports, fetching
/// each document through `loader`.
pub fn parse_with<L: Loader>(
    loader: L,
    location: &Url,
) -> Result<(types::Definition, types::Namespaces), error::Error> {
    parser::parse(loader, location.clone())
}
