//! RFC 6570 URI template expansion (levels 1 through 4).
//!
//! Variables come from a JSON object: strings, numbers and booleans are
//! scalars, arrays are lists, objects are associative arrays and `null`
//! counts as undefined.

use crate::core::error::{HateoasError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Everything except RFC 3986 unreserved characters.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Everything except unreserved and reserved characters.
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

struct Operator {
    first: &'static str,
    sep: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn from_char(c: Option<char>) -> Result<(Self, bool)> {
        let op = |first, sep, named, if_empty, allow_reserved| Operator {
            first,
            sep,
            named,
            if_empty,
            allow_reserved,
        };
        Ok(match c {
            Some('+') => (op("", ",", false, "", true), true),
            Some('#') => (op("#", ",", false, "", true), true),
            Some('.') => (op(".", ".", false, "", false), true),
            Some('/') => (op("/", "/", false, "", false), true),
            Some(';') => (op(";", ";", true, "", false), true),
            Some('?') => (op("?", "&", true, "=", false), true),
            Some('&') => (op("&", "&", true, "=", false), true),
            Some(c @ ('=' | ',' | '!' | '@' | '|')) => {
                return Err(HateoasError::UriTemplate(format!(
                    "Reserved operator '{}' is not supported",
                    c
                )))
            }
            _ => (op("", ",", false, "", false), false),
        })
    }

    fn encode(&self, s: &str) -> String {
        if !self.allow_reserved {
            return utf8_percent_encode(s, UNRESERVED).to_string();
        }
        // Reserved expansion keeps existing pct-encoded triplets intact.
        let mut out = String::with_capacity(s.len());
        let bytes = s.as_bytes();
        let mut buf = [0u8; 4];
        for (i, c) in s.char_indices() {
            if c == '%'
                && bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit()
            {
                out.push('%');
                continue;
            }
            out.extend(utf8_percent_encode(c.encode_utf8(&mut buf), RESERVED));
        }
        out
    }
}

/// Does `href` contain any `{...}` expression?
pub fn is_template(href: &str) -> bool {
    href.find('{')
        .is_some_and(|open| href[open..].contains('}'))
}

/// Expand a URI template with the given variables.
pub fn expand_template(template: &str, vars: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..].find('}').ok_or_else(|| {
            HateoasError::UriTemplate(format!("Unterminated expression in '{}'", template))
        })?;
        let expression = &rest[open + 1..open + close];
        out.push_str(&expand_expression(expression, vars)?);
        rest = &rest[open + close + 1..];
    }
    if rest.contains('}') {
        return Err(HateoasError::UriTemplate(format!(
            "Unbalanced '}}' in '{}'",
            template
        )));
    }
    out.push_str(rest);
    Ok(out)
}

fn expand_expression(expression: &str, vars: &Map<String, Value>) -> Result<String> {
    let (op, has_op) = Operator::from_char(expression.chars().next())?;
    let body = if has_op { &expression[1..] } else { expression };

    let mut pieces = Vec::new();
    for spec in body.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(HateoasError::UriTemplate(format!(
                "Empty variable in '{{{}}}'",
                expression
            )));
        }
        let (name, explode, prefix) = parse_varspec(spec)?;
        let Some(value) = vars.get(name) else {
            continue;
        };
        if let Some(piece) = expand_value(&op, name, value, explode, prefix) {
            pieces.push(piece);
        }
    }

    if pieces.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}{}", op.first, pieces.join(op.sep)))
}

fn parse_varspec(spec: &str) -> Result<(&str, bool, Option<usize>)> {
    if let Some(name) = spec.strip_suffix('*') {
        return Ok((name, true, None));
    }
    if let Some((name, len)) = spec.split_once(':') {
        let len: usize = len.parse().map_err(|_| {
            HateoasError::UriTemplate(format!("Invalid prefix modifier in '{}'", spec))
        })?;
        return Ok((name, false, Some(len)));
    }
    Ok((spec, false, None))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn expand_value(
    op: &Operator,
    name: &str,
    value: &Value,
    explode: bool,
    prefix: Option<usize>,
) -> Option<String> {
    let named = |encoded: String| {
        if !op.named {
            encoded
        } else if encoded.is_empty() {
            format!("{}{}", name, op.if_empty)
        } else {
            format!("{}={}", name, encoded)
        }
    };

    match value {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar).collect();
            if items.is_empty() {
                return None;
            }
            if explode {
                Some(
                    items
                        .iter()
                        .map(|item| named(op.encode(item)))
                        .collect::<Vec<_>>()
                        .join(op.sep),
                )
            } else {
                let joined = items
                    .iter()
                    .map(|item| op.encode(item))
                    .collect::<Vec<_>>()
                    .join(",");
                Some(named(joined))
            }
        }
        Value::Object(map) => {
            let pairs: Vec<(&String, String)> = map
                .iter()
                .filter_map(|(k, v)| scalar(v).map(|v| (k, v)))
                .collect();
            if pairs.is_empty() {
                return None;
            }
            if explode {
                Some(
                    pairs
                        .iter()
                        .map(|(k, v)| format!("{}={}", op.encode(k), op.encode(v)))
                        .collect::<Vec<_>>()
                        .join(op.sep),
                )
            } else {
                let joined = pairs
                    .iter()
                    .map(|(k, v)| format!("{},{}", op.encode(k), op.encode(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                Some(named(joined))
            }
        }
        _ => {
            let mut s = scalar(value)?;
            if let Some(len) = prefix {
                s = s.chars().take(len).collect();
            }
            Some(named(op.encode(&s)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Map<String, Value> {
        json!({
            "var": "value",
            "hello": "Hello World!",
            "path": "/foo/bar",
            "empty": "",
            "list": ["red", "green", "blue"],
            "keys": {"semi": ";", "dot": ".", "comma": ","},
            "x": 1024,
            "y": 768,
            "missing": null
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn expand(t: &str) -> String {
        expand_template(t, &vars()).unwrap()
    }

    #[test]
    fn test_simple_expansion() {
        assert_eq!(expand("{var}"), "value");
        assert_eq!(expand("{hello}"), "Hello%20World%21");
        assert_eq!(expand("/items/{x}"), "/items/1024");
    }

    #[test]
    fn test_reserved_expansion() {
        assert_eq!(expand("{+path}/here"), "/foo/bar/here");
        assert_eq!(expand("{+hello}"), "Hello%20World!");
        assert_eq!(expand("X{#var}"), "X#value");
    }

    #[test]
    fn test_query_expansion() {
        assert_eq!(expand("/search{?x,y}"), "/search?x=1024&y=768");
        assert_eq!(expand("/search{?x,empty}"), "/search?x=1024&empty=");
        assert_eq!(expand("/search?fixed=1{&x}"), "/search?fixed=1&x=1024");
    }

    #[test]
    fn test_undefined_variables_vanish() {
        assert_eq!(expand("/search{?missing,nothere}"), "/search");
        assert_eq!(expand("/a{/missing}"), "/a");
    }

    #[test]
    fn test_path_label_and_params() {
        assert_eq!(expand("{/var,x}/here"), "/value/1024/here");
        assert_eq!(expand("X{.var}"), "X.value");
        assert_eq!(expand("{;x,y,empty}"), ";x=1024;y=768;empty");
    }

    #[test]
    fn test_lists_and_explode() {
        assert_eq!(expand("{list}"), "red,green,blue");
        assert_eq!(expand("{/list*}"), "/red/green/blue");
        assert_eq!(expand("{?list*}"), "?list=red&list=green&list=blue");
        assert_eq!(expand("{?list}"), "?list=red,green,blue");
    }

    #[test]
    fn test_associative_arrays() {
        assert_eq!(expand("{?keys*}"), "?comma=%2C&dot=.&semi=%3B");
        assert_eq!(expand("{keys}"), "comma,%2C,dot,.,semi,%3B");
    }

    #[test]
    fn test_prefix_modifier() {
        assert_eq!(expand("{var:3}"), "val");
        assert_eq!(expand("{var:30}"), "value");
    }

    #[test]
    fn test_malformed_templates() {
        assert!(expand_template("{unclosed", &vars()).is_err());
        assert!(expand_template("closed}", &vars()).is_err());
        assert!(expand_template("{var:abc}", &vars()).is_err());
        assert!(expand_template("{=var}", &vars()).is_err());
    }

    #[test]
    fn test_is_template() {
        assert!(is_template("/a{?b}"));
        assert!(!is_template("/a/b"));
        assert!(!is_template("/a{"));
    }
}
