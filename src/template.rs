//! Filename templating for per-chunk output artifacts.
//!
//! Templates are plain strings with `{placeholder}` tokens. Supported
//! placeholders: `{stem}` (input base name), `{index}` (artifact ordinal),
//! `{ext}` (output extension), `{chunk_start}` and `{chunk_end}` (seconds).
//! Numeric placeholders accept a zero-padding width, e.g. `{index:03}`.
//!
//! Rendering is strict: an unsupported placeholder name or a malformed token
//! fails with a template error instead of silently dropping the field.

use std::path::{Component, Path};

use crate::{Error, Result};

/// The values a template can reference, taken from the chunk that produced
/// the artifact. `chunk_start`/`chunk_end` are zero for a non-chunked run.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub stem: &'a str,
    pub index: usize,
    pub ext: &'a str,
    pub chunk_start: u32,
    pub chunk_end: u32,
}

enum Field<'a> {
    Text(&'a str),
    Number(u64),
}

/// Render an output filename template.
///
/// `{{` and `}}` escape literal braces.
pub fn render_filename(template: &str, values: &TemplateValues<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        if let Some(stripped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = stripped;
            continue;
        }
        if let Some(stripped) = tail.strip_prefix("}}") {
            out.push('}');
            rest = stripped;
            continue;
        }
        if tail.starts_with('}') {
            return Err(Error::template(
                "",
                "unmatched '}' in filename template.",
                "a closing brace must terminate a placeholder or be escaped as '}}'",
                "balance the braces or escape the literal brace",
            ));
        }

        let body_end = tail.find('}').ok_or_else(|| {
            Error::template(
                "",
                "unterminated placeholder in filename template.",
                "an opening '{' was never closed",
                "close the placeholder with '}' or escape the literal brace as '{{'",
            )
        })?;
        let body = &tail[1..body_end];
        let (name, spec) = match body.split_once(':') {
            Some((name, spec)) => (name, Some(spec)),
            None => (body, None),
        };

        out.push_str(&render_field(name, spec, values)?);
        rest = &tail[body_end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn render_field(name: &str, spec: Option<&str>, values: &TemplateValues<'_>) -> Result<String> {
    let field = match name {
        "stem" => Field::Text(values.stem),
        "ext" => Field::Text(values.ext),
        "index" => Field::Number(values.index as u64),
        "chunk_start" => Field::Number(u64::from(values.chunk_start)),
        "chunk_end" => Field::Number(u64::from(values.chunk_end)),
        other => {
            return Err(Error::template(
                other,
                format!("unsupported template placeholder '{other}'."),
                "filename rendering supports only deterministic placeholder values",
                "replace it with one of: stem, index, ext, chunk_start, chunk_end",
            ));
        }
    };

    match (field, spec) {
        (Field::Text(text), None) => Ok(text.to_owned()),
        (Field::Number(number), None) => Ok(number.to_string()),
        (Field::Number(number), Some(spec)) => {
            let width = parse_zero_pad_width(name, spec)?;
            Ok(format!("{number:0width$}"))
        }
        (Field::Text(_), Some(_)) => Err(Error::template(
            name,
            format!("placeholder '{name}' does not accept a format spec."),
            "padding applies only to numeric placeholders",
            format!("write '{{{name}}}' without a format spec"),
        )),
    }
}

/// Parse a `0N` zero-padding width such as the `03` in `{index:03}`.
fn parse_zero_pad_width(name: &str, spec: &str) -> Result<usize> {
    let digits = spec.strip_prefix('0').filter(|digits| !digits.is_empty());
    let width = digits.and_then(|digits| digits.parse::<usize>().ok());
    width.ok_or_else(|| {
        Error::template(
            name,
            format!("unsupported format spec '{spec}' on placeholder '{name}'."),
            "only zero-padded widths are supported",
            format!("write it as '{{{name}:0N}}', for example '{{{name}:03}}'"),
        )
    })
}

/// Validate a template without producing an artifact.
///
/// Renders against probe values so unsupported placeholders and malformed
/// tokens are caught before any provider call is made.
pub fn validate_template(template: &str) -> Result<()> {
    let probe = TemplateValues {
        stem: "audio",
        index: 0,
        ext: "txt",
        chunk_start: 0,
        chunk_end: 1,
    };
    render_filename(template, &probe).map(|_| ())
}

/// Ensure a rendered chunk filename stays within the output directory.
///
/// Chunk artifacts must be plain file names: no path separators, no
/// traversal segments, no absolute paths.
pub fn ensure_plain_filename(filename: &str) -> Result<()> {
    let candidate = Path::new(filename);
    let mut components = candidate.components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || filename.is_empty() {
        return Err(Error::config(
            format!("output template produced an unsafe path: '{filename}'."),
            "chunk output files must be plain filenames under the output directory",
            "remove path separators and traversal segments from the template",
        ));
    }
    Ok(())
}
