//! Shared header parsing and formatting.
//!
//! Covers the `Link` header (RFC 8288) and media-type values.

use crate::core::error::{HateoasError, Result};
use std::collections::BTreeMap;

/// One link from a `Link` header, before resolution against a context URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkHeader {
    pub href: String,
    /// Relation types; a `rel` parameter may name several, space separated.
    pub rels: Vec<String>,
    /// Remaining target attributes (`title`, `type`, `hreflang`, ...), names lowercased.
    pub params: BTreeMap<String, String>,
}

impl LinkHeader {
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rels: vec![rel.into()],
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    #[inline]
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(rel))
    }
}

/// Parse a `Link` header value into its links.
///
/// Commas and semicolons inside `<...>` or quoted strings do not split.
pub fn parse_link_header(value: &str) -> Result<Vec<LinkHeader>> {
    let bytes = value.as_bytes();
    let mut pos = 0;
    let mut links = Vec::new();

    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if bytes[pos] != b'<' {
            return Err(HateoasError::HeaderParse(format!(
                "Invalid Link header: expected '<' at offset {} in '{}'",
                pos, value
            )));
        }
        let end = value[pos + 1..].find('>').ok_or_else(|| {
            HateoasError::HeaderParse(format!("Invalid Link header: unterminated '<' in '{}'", value))
        })?;
        let href = value[pos + 1..pos + 1 + end].trim().to_string();
        pos += end + 2;

        let mut rels: Option<Vec<String>> = None;
        let mut params = BTreeMap::new();

        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() || bytes[pos] == b',' {
                break;
            }
            if bytes[pos] != b';' {
                return Err(HateoasError::HeaderParse(format!(
                    "Invalid Link header: expected ';' at offset {} in '{}'",
                    pos, value
                )));
            }
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            let name_start = pos;
            while pos < bytes.len() && !matches!(bytes[pos], b'=' | b';' | b',') {
                pos += 1;
            }
            let name = value[name_start..pos].trim().to_ascii_lowercase();

            let mut param_value = String::new();
            if pos < bytes.len() && bytes[pos] == b'=' {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                if pos < bytes.len() && bytes[pos] == b'"' {
                    pos += 1;
                    let mut closed = false;
                    let mut chars = value[pos..].char_indices();
                    while let Some((i, c)) = chars.next() {
                        match c {
                            '\\' => {
                                if let Some((_, escaped)) = chars.next() {
                                    param_value.push(escaped);
                                }
                            }
                            '"' => {
                                pos += i + 1;
                                closed = true;
                                break;
                            }
                            _ => param_value.push(c),
                        }
                    }
                    if !closed {
                        return Err(HateoasError::HeaderParse(format!(
                            "Invalid Link header: unterminated quoted string in '{}'",
                            value
                        )));
                    }
                } else {
                    let value_start = pos;
                    while pos < bytes.len() && !matches!(bytes[pos], b';' | b',') {
                        pos += 1;
                    }
                    param_value = value[value_start..pos].trim().to_string();
                }
            }

            if name.is_empty() {
                continue;
            }
            if name == "rel" {
                // Only the first rel parameter counts.
                if rels.is_none() {
                    rels = Some(param_value.split_whitespace().map(str::to_string).collect());
                }
            } else {
                params.entry(name).or_insert(param_value);
            }
        }

        links.push(LinkHeader {
            href,
            rels: rels.unwrap_or_default(),
            params,
        });
    }

    Ok(links)
}

/// Format links as a single `Link` header value.
pub fn format_link_header(links: &[LinkHeader]) -> String {
    links
        .iter()
        .map(|link| {
            let mut out = format!("<{}>", link.href);
            if !link.rels.is_empty() {
                out.push_str(&format!("; rel=\"{}\"", link.rels.join(" ")));
            }
            for (k, v) in &link.params {
                out.push_str(&format!("; {}=\"{}\"", k, v.replace('"', "\\\"")));
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Media type of a `Content-Type` value: parameters dropped, lowercased.
///
/// Returns `None` when the value has no `type/subtype` shape.
pub fn parse_media_type(value: &str) -> Option<String> {
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    let (ty, subtype) = essence.split_once('/')?;
    if ty.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(essence)
}

/// `true` for `application/<anything>+json`.
pub fn is_json_suffix_type(media_type: &str) -> bool {
    media_type
        .strip_prefix("application/")
        .is_some_and(|sub| sub.len() > "+json".len() && sub.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header_single() {
        let links = parse_link_header("</next>; rel=\"next\"").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/next");
        assert_eq!(links[0].rels, vec!["next"]);
    }

    #[test]
    fn test_parse_link_header_multiple() {
        let links =
            parse_link_header("</a>; rel=\"prev\", </b>; rel=next; title=\"B, second\"").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].href, "/b");
        assert_eq!(links[1].rels, vec!["next"]);
        assert_eq!(links[1].param("title"), Some("B, second"));
    }

    #[test]
    fn test_parse_link_header_multiple_rels() {
        let links = parse_link_header("</x>; rel=\"invalidates inv-by\"").unwrap();
        assert!(links[0].has_rel("invalidates"));
        assert!(links[0].has_rel("inv-by"));
    }

    #[test]
    fn test_parse_link_header_comma_in_uri() {
        let links = parse_link_header("</search?q=a,b>; rel=\"search\"").unwrap();
        assert_eq!(links[0].href, "/search?q=a,b");
    }

    #[test]
    fn test_parse_link_header_escaped_quote() {
        let links = parse_link_header(r#"</a>; rel="x"; title="say \"hi\"""#).unwrap();
        assert_eq!(links[0].param("title"), Some("say \"hi\""));
    }

    #[test]
    fn test_parse_link_header_first_rel_wins() {
        let links = parse_link_header("</a>; rel=\"one\"; rel=\"two\"").unwrap();
        assert_eq!(links[0].rels, vec!["one"]);
    }

    #[test]
    fn test_parse_link_header_param_names_lowercased() {
        let links = parse_link_header("</a>; REL=\"up\"; Type=\"text/html\"").unwrap();
        assert_eq!(links[0].rels, vec!["up"]);
        assert_eq!(links[0].param("type"), Some("text/html"));
    }

    #[test]
    fn test_parse_link_header_empty() {
        assert!(parse_link_header("").unwrap().is_empty());
        assert!(parse_link_header("  ,  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_link_header_invalid() {
        assert!(parse_link_header("/no-brackets; rel=next").is_err());
        assert!(parse_link_header("</unterminated; rel=next").is_err());
        assert!(parse_link_header("</a>; title=\"open").is_err());
        assert!(parse_link_header("</a> rel=next").is_err());
    }

    #[test]
    fn test_format_link_header_parses_back() {
        let links = vec![
            LinkHeader::new("/a", "next").with_param("title", "A"),
            LinkHeader::new("/b", "prev"),
        ];
        let formatted = format_link_header(&links);
        assert_eq!(formatted, "</a>; rel=\"next\"; title=\"A\", </b>; rel=\"prev\"");
        assert_eq!(parse_link_header(&formatted).unwrap(), links);
    }

    #[test]
    fn test_parse_media_type() {
        assert_eq!(parse_media_type("text/html; charset=utf-8").as_deref(), Some("text/html"));
        assert_eq!(parse_media_type(" Application/JSON ").as_deref(), Some("application/json"));
        assert_eq!(parse_media_type("garbage"), None);
        assert_eq!(parse_media_type("/json"), None);
        assert_eq!(parse_media_type(""), None);
    }

    #[test]
    fn test_is_json_suffix_type() {
        assert!(is_json_suffix_type("application/geo+json"));
        assert!(is_json_suffix_type("application/vnd.foo.bar+json"));
        assert!(!is_json_suffix_type("application/json"));
        assert!(!is_json_suffix_type("text/x+json"));
        assert!(!is_json_suffix_type("application/+json"));
    }
}
