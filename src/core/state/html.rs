//! HTML.
//!
//! Best effort: `<a>` and `<link>` elements with a `rel` become links and
//! `<form>` elements become forms without field metadata. The page itself is
//! kept as text.

use crate::core::action::form::parse_method;
use crate::core::action::Form;
use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::media_types;
use crate::core::state::factory::{base_state, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<(a|link|form)\b([^>]*)>").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .unwrap()
});

#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlStateFactory;

impl StateFactory for HtmlStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        let mut state = base_state(
            client,
            link,
            response,
            StateData::Text(body.clone()),
            StateFormat::Html,
        )?;
        let uri = state.uri.clone();

        for tag in TAG.captures_iter(&body) {
            let element = tag[1].to_ascii_lowercase();
            let attrs = attributes(&tag[2]);

            if element == "form" {
                let target = attrs
                    .get("action")
                    .and_then(|a| uri.join(a).ok())
                    .unwrap_or_else(|| uri.clone());
                let name = ["rel", "id", "name"]
                    .iter()
                    .find_map(|k| attrs.get(*k))
                    .cloned()
                    .unwrap_or_default();
                let content_type = attrs
                    .get("enctype")
                    .map(String::as_str)
                    .unwrap_or(media_types::FORM_URLENCODED);
                let form = Form::new(target, name, parse_method(attrs.get("method").map(String::as_str)))
                    .with_content_type(content_type);
                state.forms.push(form);
                continue;
            }

            let (Some(rel), Some(href)) = (attrs.get("rel"), attrs.get("href")) else {
                continue;
            };
            for rel in rel.split_ascii_whitespace() {
                let mut link = Link::new(rel, href.clone(), uri.clone());
                link.title = attrs.get("title").cloned();
                link.media_type = attrs.get("type").cloned();
                link.hreflang = attrs.get("hreflang").cloned();
                state.links.add(link);
            }
        }

        Ok(state)
    }
}

fn attributes(source: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(source)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect()
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
