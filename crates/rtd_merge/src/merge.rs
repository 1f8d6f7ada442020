//! Template merger: validate a JSON payload, splice it verbatim into a
//! template at its `%s` placeholder, re-indent the result.
//!
//! Re-indenting works on tokens, not on a parsed tree: strings, numbers and
//! literals are copied byte for byte and duplicate keys survive. Only the
//! whitespace between tokens is rewritten, using serde_json's
//! [`PrettyFormatter`] for the layout.

use crate::error::{MergeError, TemplateError};
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::value::RawValue;
use std::io;

/// Substitution point inside a template.
pub const PLACEHOLDER: &str = "%s";

/// Indent unit for the pretty-printed output: one space per level.
const INDENT: &[u8] = b" ";

/// Combines a JSON payload with something fixed. Must be pure.
pub trait Merger: Send + Sync {
    fn get_merged(&self, data: &[u8]) -> Result<Vec<u8>, MergeError>;
}

/// A template split once around its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTemplateMerger {
    prefix: String,
    suffix: String,
}

impl JsonTemplateMerger {
    /// Fails unless `template` contains exactly one placeholder.
    ///
    /// The template itself is not checked for JSON validity here; a template
    /// that does not form a document around the payload surfaces as
    /// [`MergeError::Format`] on the first merge.
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let Some((prefix, suffix)) = template.split_once(PLACEHOLDER) else {
            return Err(TemplateError::MissingPlaceholder);
        };
        let extra = suffix.matches(PLACEHOLDER).count();
        if extra > 0 {
            return Err(TemplateError::MultiplePlaceholders { count: extra + 1 });
        }
        Ok(Self {
            prefix: prefix.to_owned(),
            suffix: suffix.to_owned(),
        })
    }

    fn substitute(&self, payload: &str) -> String {
        let mut doc = String::with_capacity(self.prefix.len() + payload.len() + self.suffix.len());
        doc.push_str(&self.prefix);
        doc.push_str(payload);
        doc.push_str(&self.suffix);
        doc
    }
}

impl Merger for JsonTemplateMerger {
    fn get_merged(&self, data: &[u8]) -> Result<Vec<u8>, MergeError> {
        let payload = json_text(data).ok_or(MergeError::InvalidJson)?;

        let doc = self.substitute(payload);
        serde_json::from_str::<&RawValue>(&doc).map_err(MergeError::Format)?;

        reindent(&doc).map_err(|e| MergeError::Format(serde_json::Error::io(e)))
    }
}

/// Full-grammar check without building a tree. Nesting depth is unbounded.
pub fn is_valid_json(data: &[u8]) -> bool {
    json_text(data).is_some()
}

fn json_text(data: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(data).ok()?;
    serde_json::from_str::<&RawValue>(text).ok()?;
    Some(text)
}

enum Frame {
    Array { first: bool },
    Object { first: bool, in_value: bool },
}

/// Lay out an already validated document. Malformed input is not detected
/// here.
fn reindent(doc: &str) -> io::Result<Vec<u8>> {
    let bytes = doc.as_bytes();
    let mut out = Vec::with_capacity(doc.len() * 2);
    let mut fmt = PrettyFormatter::with_indent(INDENT);
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | b',' => i += 1,
            b'{' => {
                begin_value(&mut fmt, &mut out, &mut stack)?;
                fmt.begin_object(&mut out)?;
                stack.push(Frame::Object { first: true, in_value: false });
                i += 1;
            }
            b'[' => {
                begin_value(&mut fmt, &mut out, &mut stack)?;
                fmt.begin_array(&mut out)?;
                stack.push(Frame::Array { first: true });
                i += 1;
            }
            b'}' => {
                stack.pop();
                fmt.end_object(&mut out)?;
                end_value(&mut fmt, &mut out, &mut stack)?;
                i += 1;
            }
            b']' => {
                stack.pop();
                fmt.end_array(&mut out)?;
                end_value(&mut fmt, &mut out, &mut stack)?;
                i += 1;
            }
            b':' => {
                fmt.end_object_key(&mut out)?;
                fmt.begin_object_value(&mut out)?;
                if let Some(Frame::Object { in_value, .. }) = stack.last_mut() {
                    *in_value = true;
                }
                i += 1;
            }
            b => {
                let end = if b == b'"' { string_end(bytes, i) } else { scalar_end(bytes, i) };
                let token = &doc[i..end];
                let is_key = matches!(stack.last(), Some(Frame::Object { in_value: false, .. }));
                if is_key {
                    if let Some(Frame::Object { first, .. }) = stack.last_mut() {
                        fmt.begin_object_key(&mut out, *first)?;
                        *first = false;
                    }
                    fmt.write_raw_fragment(&mut out, token)?;
                } else {
                    begin_value(&mut fmt, &mut out, &mut stack)?;
                    fmt.write_raw_fragment(&mut out, token)?;
                    end_value(&mut fmt, &mut out, &mut stack)?;
                }
                i = end;
            }
        }
    }
    Ok(out)
}

fn begin_value(fmt: &mut PrettyFormatter<'_>, out: &mut Vec<u8>, stack: &mut [Frame]) -> io::Result<()> {
    if let Some(Frame::Array { first }) = stack.last_mut() {
        fmt.begin_array_value(out, *first)?;
        *first = false;
    }
    Ok(())
}

fn end_value(fmt: &mut PrettyFormatter<'_>, out: &mut Vec<u8>, stack: &mut [Frame]) -> io::Result<()> {
    match stack.last_mut() {
        Some(Frame::Array { .. }) => fmt.end_array_value(out),
        Some(Frame::Object { in_value, .. }) => {
            *in_value = false;
            fmt.end_object_value(out)
        }
        None => Ok(()),
    }
}

/// Index just past the closing quote of the string starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn scalar_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b':'))
        .map_or(bytes.len(), |n| start + n)
}
