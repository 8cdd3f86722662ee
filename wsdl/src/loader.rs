use url::Url;

use super::error;

/// Fetches the raw bytes of a document. Invoked once per distinct location.
pub trait Loader {
    fn load(&self, location: &Url) -> Result<Vec<u8>, error::Error>;
}

/// Loads `file:` URLs from disk and `http(s):` URLs with a blocking request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlLoader;

impl Loader for UrlLoader {
    fn load(&self, location: &Url) -> Result<Vec<u8>, error::Error> {
        match location.scheme() {
            "file" => {
                let path = location
                    .to_file_path()
                    .map_err(|()| error::Error::PathConversionError(None))?;

                std::fs::read(path).map_err(|source| error::Error::FileOpenError {
                    location: location.clone(),
                    source,
                })
            }

            "http" | "https" => {
                let body = reqwest::blocking::get(location.clone())
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.bytes())
                    .map_err(|source| error::Error::ReqwestError {
                        location: location.clone(),
                        source,
                    })?;

                Ok(body.to_vec())
            }

            other => Err(error::Error::UnsupportedScheme(other.into())),
        }
    }
}

impl<L: Loader + ?Sized> Loader for &L {
    fn load(&self, location: &Url) -> Result<Vec<u8>, error::Error> {
        (**self).load(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<schema/>").unwrap();

        let location = Url::from_file_path(file.path()).unwrap();
        let bytes = UrlLoader.load(&location).unwrap();

        assert_eq!(bytes, b"<schema/>");
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let location = Url::from_file_path(dir.path().join("missing.wsdl")).unwrap();

        let err = UrlLoader.load(&location).unwrap_err();

        assert!(matches!(err, error::Error::FileOpenError { .. }));
    }

    #[test]
    fn rejects_unknown_schemes() {
        let location = Url::parse("ftp://example.com/service.wsdl").unwrap();

        let err = UrlLoader.load(&location).unwrap_err();

        assert!(matches!(err, error::Error::UnsupportedScheme(scheme) if scheme == "ftp"));
    }
}
