use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to open file {location}")]
    FileOpenError {
        location: Url,
        source: std::io::Error,
    },

    #[error("Unable to get {location} from server")]
    ReqwestError {
        location: Url,
        source: reqwest::Error,
    },

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("Error parsing XML input {location} at byte {position}")]
    XmlParseError {
        location: Url,
        position: usize,
        source: quick_xml::Error,
    },

    #[error("Malformed document {location}: {message}")]
    MalformedDocument { location: Url, message: String },

    #[error("Unsupported schema construct {construct} in {location}")]
    UnsupportedConstruct { location: Url, construct: String },
}
