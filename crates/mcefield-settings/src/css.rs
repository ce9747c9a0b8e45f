//! Compiles the field's style-format CSS into `style_formats` and
//! `content_style`.
//!
//! The dialect is a small subset of CSS:
//!
//! ```css
//! #Blocks p.lead { font-size: 1.2em; } /* Lead paragraph */
//! span.alert { COLOR: red; }
//! ```
//!
//! An optional `#Parent` token groups the entry under a submenu. A comment on
//! the same line as the closing brace titles that rule; a comment anywhere
//! else titles the rule that follows it. Upper-case properties are also forced
//! onto the element as inline styles.

use mcefield_common::Settings;
use serde_json::Value;

use crate::formats::{StyleFormat, merge_style_formats};

/// Elements inserted with an `inline` format.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "del",
    "dfn", "em", "i", "ins", "kbd", "label", "mark", "meter", "q", "s", "samp", "small", "span",
    "strong", "sub", "sup", "time", "u", "tt", "var", "wbr",
];

/// Elements inserted with a `block` format.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

const OTHER: &str = "Other";

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStyles {
    pub style_formats: Vec<StyleFormat>,
    pub content_style: String,
}

#[derive(Debug)]
struct Rule {
    title: Option<String>,
    selector: String,
    body: String,
    end_line: usize,
}

/// Compile `css` and merge the result into the existing formats and content
/// style.
pub fn compile(
    css: &str,
    existing_formats: Vec<StyleFormat>,
    existing_content_style: &str,
) -> CompiledStyles {
    let mut groups: Vec<(String, Vec<StyleFormat>)> = Vec::new();
    let mut content_style = String::from(existing_content_style);

    for rule in scan(css) {
        let (format, parent, css_rule) = compile_rule(&rule);
        content_style.push_str(&css_rule);
        match groups.iter_mut().find(|(name, _)| *name == parent) {
            Some((_, items)) => items.push(format),
            None => groups.push((parent, vec![format])),
        }
    }

    let mut compiled = Vec::new();
    let mut other = Vec::new();
    for (parent, items) in groups {
        if parent == OTHER {
            other = items;
        } else {
            compiled.push(StyleFormat::submenu(parent, items));
        }
    }
    compiled.extend(other);

    tracing::debug!(formats = compiled.len(), "compiled style formats");

    CompiledStyles {
        style_formats: merge_style_formats(existing_formats, compiled),
        content_style,
    }
}

/// Split the input into rules, attaching title comments.
fn scan(css: &str) -> Vec<Rule> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut pending_title: Option<String> = None;
    let mut rest = css;
    let mut line = 0usize;

    loop {
        let trimmed = rest.trim_start();
        line += rest[..rest.len() - trimmed.len()].matches('\n').count();
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        if let Some(after) = rest.strip_prefix("/*") {
            let Some(close) = after.find("*/") else {
                break;
            };
            let text = after[..close].trim();
            let comment_line = line;
            line += after[..close].matches('\n').count();
            rest = &after[close + 2..];
            if text.is_empty() {
                continue;
            }
            match rules.last_mut() {
                Some(last) if last.end_line == comment_line && last.title.is_none() => {
                    last.title = Some(text.to_owned());
                }
                _ => pending_title = Some(text.to_owned()),
            }
            continue;
        }

        let stop = rest.find(['{', '}']).unwrap_or(rest.len());
        let stop = rest[..stop].find("/*").unwrap_or(stop);
        if !rest[stop..].starts_with('{') {
            // Fragment without a rule body.
            let skip = if rest[stop..].starts_with('}') { stop + 1 } else { stop };
            line += rest[..skip].matches('\n').count();
            rest = &rest[skip..];
            continue;
        }

        // The selector is whatever follows the last line break or `;` before
        // the brace; anything earlier is a stray fragment.
        let region = &rest[..stop];
        let selector = &region[region.rfind(['\n', ';']).map_or(0, |i| i + 1)..];
        let after = &rest[stop + 1..];
        let Some(close) = after.find('}') else {
            tracing::debug!(selector = selector.trim(), "skipping unterminated style rule");
            break;
        };
        let body = &after[..close];
        line += region.matches('\n').count() + body.matches('\n').count();
        rules.push(Rule {
            title: pending_title.take(),
            selector: selector.split_whitespace().collect::<Vec<_>>().join(" "),
            body: body.to_owned(),
            end_line: line,
        });
        rest = &after[close + 1..];
    }

    rules
}

/// Build the format entry, its parent group and its content-style rule.
fn compile_rule(rule: &Rule) -> (StyleFormat, String, String) {
    let (parent, selector) = match rule.selector.strip_prefix('#') {
        Some(tagged) => {
            let (name, selector) = tagged.split_once(' ').unwrap_or((tagged, ""));
            (parent_name(name), selector.trim())
        }
        None => (OTHER.to_owned(), rule.selector.as_str()),
    };

    let (element, classes) = match selector.split_once('.') {
        Some((element, classes)) => (element, Some(classes.replace('.', " "))),
        None => (selector, None),
    };

    let mut declarations = String::new();
    let mut inline_styles = Settings::new();
    for declaration in rule.body.split(';') {
        let Some((key, value)) = declaration.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let key = if key.chars().any(char::is_alphabetic) && key == key.to_uppercase() {
            let lower = key.to_lowercase();
            inline_styles.insert(lower.clone(), Value::String(value.to_owned()));
            lower
        } else {
            key.to_owned()
        };
        declarations.push_str(&format!("{key}:{value};"));
    }

    let css_rule = match &classes {
        Some(classes) => format!("{element}.{} {{ {declarations} }} ", classes.replace(' ', ".")),
        None => format!("{element} {{ {declarations} }} "),
    };

    let element = if element.is_empty() { "*" } else { element };
    let lower = element.to_ascii_lowercase();
    let mut format = StyleFormat {
        title: Some(rule.title.clone().unwrap_or_else(|| selector.to_owned())),
        classes,
        styles: (!inline_styles.is_empty()).then_some(inline_styles),
        ..Default::default()
    };
    if INLINE_ELEMENTS.contains(&lower.as_str()) {
        format.inline = Some(element.to_owned());
    } else if BLOCK_ELEMENTS.contains(&element) {
        format.block = Some(element.to_owned());
    } else {
        format.selector = Some(element.to_owned());
    }

    (format, parent, css_rule)
}

/// `#BLOCKS` and `#blocks` both name the `Blocks` submenu.
fn parent_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => OTHER.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::formats_to_value;
    use serde_json::json;

    fn compiled_json(css: &str) -> (String, String) {
        let out = compile(css, Vec::new(), "");
        (
            formats_to_value(&out.style_formats).to_string(),
            out.content_style,
        )
    }

    #[test]
    fn blocks_submenu_and_other_leaf() {
        let (formats, content_style) =
            compiled_json("#Blocks blockquote.quote { color:red; } ins { color:green; }");

        insta::assert_snapshot!(formats, @r#"[{"title":"Blocks","items":[{"title":"blockquote.quote","block":"blockquote","classes":"quote"}]},{"title":"ins","inline":"ins"}]"#);
        assert_eq!(
            content_style,
            "blockquote.quote { color:red; } ins { color:green; } "
        );
    }

    #[test]
    fn titles_from_trailing_and_leading_comments() {
        let css = "\
#blocks p.lead { font-size: 1.2em; } /* Lead paragraph */
/* Small print */
span.fine { font-size: 0.8em; }
";
        let out = compile(css, Vec::new(), "");
        let value = formats_to_value(&out.style_formats);
        assert_eq!(value[0]["title"], json!("Blocks"));
        assert_eq!(value[0]["items"][0]["title"], json!("Lead paragraph"));
        assert_eq!(value[1]["title"], json!("Small print"));
        assert_eq!(value[1]["inline"], json!("span"));
        assert_eq!(value[1]["classes"], json!("fine"));
    }

    #[test]
    fn uppercase_properties_become_inline_styles() {
        let out = compile("span.alert { COLOR: red; font-weight: bold }", Vec::new(), "");
        let value = formats_to_value(&out.style_formats);
        assert_eq!(value[0]["styles"], json!({"color": "red"}));
        assert_eq!(
            out.content_style,
            "span.alert { color:red;font-weight:bold; } "
        );
    }

    #[test]
    fn multiline_rules_and_fragments() {
        let css = "stray text\n#Inline .marker.big {\n  background: yellow;\n}\nfigure { margin: 0 }\n";
        let out = compile(css, Vec::new(), "p { x:y; } ");
        let value = formats_to_value(&out.style_formats);

        assert_eq!(value[0]["title"], json!("Inline"));
        assert_eq!(value[0]["items"][0]["selector"], json!("*"));
        assert_eq!(value[0]["items"][0]["classes"], json!("marker big"));
        assert_eq!(value[1]["selector"], json!("figure"));
        assert_eq!(
            out.content_style,
            "p { x:y; } .marker.big { background:yellow; } figure { margin:0; } "
        );
    }

    #[test]
    fn unterminated_final_rule_is_skipped() {
        let out = compile("em.x { color: blue; } strong.y { color: red;", Vec::new(), "");
        assert_eq!(out.style_formats.len(), 1);
        assert_eq!(out.content_style, "em.x { color:blue; } ");
    }

    #[test]
    fn merges_into_existing_formats() {
        let existing = vec![StyleFormat::submenu(
            "Blocks",
            vec![StyleFormat {
                title: Some("Paragraph".into()),
                block: Some("p".into()),
                ..Default::default()
            }],
        )];
        let out = compile("#Blocks aside.note { padding: 1em; }", existing, "");
        assert_eq!(out.style_formats.len(), 1);
        let titles: Vec<_> = out.style_formats[0]
            .items
            .iter()
            .flatten()
            .filter_map(|f| f.title.as_deref())
            .collect();
        assert_eq!(titles, ["Paragraph", "aside.note"]);
    }
}
