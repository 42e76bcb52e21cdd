//! Template expansion for configuration files.
//!
//! Supports ERB-style tags embedded in otherwise plain text:
//!
//! - `<%= expr %>` is replaced by the rendered value of `expr`
//! - `<% expr %>` is evaluated but renders nothing
//! - `<%# comment %>` is dropped
//! - `<%%` produces a literal `<%`
//!
//! Closing a tag with `-%>` swallows the line break that follows it.

mod error;
mod expr;

pub use error::TemplateError;
pub use expr::{evaluate, Value};

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// Expands every template tag in `text`.
///
/// Text outside of tags is copied through unchanged. Each expression is
/// evaluated in a fresh context; nothing carries over between tags.
pub fn expand(text: &str) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        // Escape sequence: <%% -> <%
        if let Some(escaped) = after.strip_prefix('%') {
            output.push_str(OPEN);
            rest = escaped;
            continue;
        }

        let offset = text.len() - rest.len() + start;
        let end = after
            .find(CLOSE)
            .ok_or(TemplateError::UnclosedTag { offset })?;

        let (tag, trim_newline) = match after[..end].strip_suffix('-') {
            Some(tag) => (tag, true),
            None => (&after[..end], false),
        };

        render_tag(tag, &mut output)?;

        rest = &after[end + CLOSE.len()..];
        if trim_newline {
            rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
        }
    }

    output.push_str(rest);
    Ok(output)
}

fn render_tag(tag: &str, output: &mut String) -> Result<(), TemplateError> {
    if let Some(expression) = tag.strip_prefix('=') {
        let value = evaluate(expression.trim())?;
        output.push_str(&value.to_string());
    } else if !tag.starts_with('#') {
        let code = tag.trim();
        if !code.is_empty() {
            evaluate(code)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_arithmetic() {
        assert_eq!(
            expand("Hello world <%= 40 + 2 %>").unwrap(),
            "Hello world 42"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "local:\n  plain_attribute: value\n";
        assert_eq!(expand(text).unwrap(), text);
    }

    #[test]
    fn test_multiple_tags() {
        assert_eq!(
            expand("<%= 'a' + 'b' %>-<%= 2 * 3 %>-<%= 7 / 2 %>").unwrap(),
            "ab-6-3"
        );
    }

    #[test]
    fn test_comment_and_code_tags_render_nothing() {
        assert_eq!(expand("a<%# ignored %>b<% 1 + 1 %>c").unwrap(), "abc");
    }

    #[test]
    fn test_escape_sequence() {
        assert_eq!(expand("literal <%%= tag %>").unwrap(), "literal <%= tag %>");
    }

    #[test]
    fn test_trailing_dash_trims_newline() {
        assert_eq!(expand("<% 1 -%>\nnext").unwrap(), "next");
        assert_eq!(expand("<% 1 %>\nnext").unwrap(), "\nnext");
    }

    #[test]
    fn test_env_interpolation() {
        std::env::set_var("TOGGLE_TEMPLATE_TEST_HOST", "db.internal");
        assert_eq!(
            expand("host: <%= ENV['TOGGLE_TEMPLATE_TEST_HOST'] %>").unwrap(),
            "host: db.internal"
        );
        assert_eq!(
            expand("port: <%= ENV.fetch('TOGGLE_TEMPLATE_TEST_UNSET', 5432) %>").unwrap(),
            "port: 5432"
        );
    }

    #[test]
    fn test_unclosed_tag() {
        let result = expand("value: <%= 1 + 1");
        assert!(matches!(
            result,
            Err(TemplateError::UnclosedTag { offset: 7 })
        ));
    }

    #[test]
    fn test_invalid_expression_is_an_error() {
        assert!(matches!(
            expand("<%= 40 + %>"),
            Err(TemplateError::Parse { .. })
        ));
        assert!(matches!(
            expand("<%= 1 / 0 %>"),
            Err(TemplateError::Evaluation { .. })
        ));
    }
}
