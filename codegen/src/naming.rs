use heck::ToSnakeCase;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use std::collections::HashSet;

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Keywords that cannot be written as raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Type names the generated file uses itself.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Self",
    "String",
    "Vec",
    "Option",
    "Box",
    "Result",
    "Ok",
    "Err",
    "Some",
    "None",
    "Serialize",
    "Deserialize",
    "SoapClient",
    "SoapError",
    "SoapFault",
    "SoapTransport",
    "SoapVersion",
    "XmlName",
    "ResponseEnvelope",
    "ResponseBody",
];

/// Strips a `prefix:` from a qualified name.
pub fn remove_namespace(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Keeps ASCII alphanumerics and underscores, turning `.` and `-` into `_`.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '.' | '-' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Exported spelling of a schema name: normalized with an upper-case first letter.
pub fn make_public(name: &str) -> String {
    let normalized = normalize(remove_namespace(name));

    if normalized.chars().all(|c| c == '_') {
        return "EmptyString".into();
    }

    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) if first.is_ascii_digit() => format!("_{}", normalized),
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => "EmptyString".into(),
    }
}

pub fn type_name(name: &str) -> String {
    let public = make_public(name);

    if RESERVED_TYPE_NAMES.contains(&public.as_str()) {
        format!("{}_", public)
    } else {
        public
    }
}

/// Field or method spelling. Keywords come back as raw identifiers (`r#type`).
pub fn field_name(name: &str) -> String {
    let snake = normalize(remove_namespace(name)).to_snake_case();

    if snake.chars().all(|c| c == '_') {
        return "empty".into();
    }

    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else if NON_RAW_KEYWORDS.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else if KEYWORDS.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

pub fn ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None => Ident::new(name, Span::call_site()),
    }
}

pub fn string_literal(value: &str) -> syn::LitStr {
    syn::LitStr::new(value, Span::call_site())
}

/// Documentation text as source comment lines, trimmed of surrounding blank lines.
pub fn comment_lines(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let lines = text.split(['\n', '\r']).map(str::trim).collect::<Vec<_>>();

    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());

    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end]
            .iter()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!(" {}", line)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// One `#[doc]` attribute per documentation line.
pub fn doc_attributes(documentation: Option<&str>) -> TokenStream {
    let lines = documentation.map(comment_lines).unwrap_or_default();

    quote! {
        #(#[doc = #lines])*
    }
}

/// Hands out identifiers, suffixing `_2`, `_3`, .. on repeats.
#[derive(Debug, Default)]
pub struct UniqueNames(HashSet<String>);

impl UniqueNames {
    pub fn reserve(&mut self, name: &str) {
        self.0.insert(name.to_owned());
    }

    pub fn claim(&mut self, name: String) -> String {
        if self.0.insert(name.clone()) {
            return name;
        }

        (2..)
            .map(|suffix| format!("{}_{}", name, suffix))
            .find(|candidate| !self.0.contains(candidate))
            .map(|candidate| {
                self.0.insert(candidate.clone());
                candidate
            })
            .unwrap_or(name)
    }
}
