//! Whole-source expansion.
//!
//! The expander walks shader text once, copying it through verbatim except where a vocabulary
//! identifier appears. Function-like vocabulary is only recognised when an argument list follows;
//! its arguments are expanded first (vocabulary may nest, e.g. `mul(to_3x3(m), float3(n))`), then
//! the call is turned into an [`Op`](crate::vocab::Op) and lowered through the unit.
//!
//! Braces outside call arguments open and close blocks in the unit, which scopes the double
//! depth-remap check to a code path.

use serde::Serialize;
use tracing::debug;

use crate::config::TranslationConfig;
use crate::error::{ExpandError, TranslateError};
use crate::profile::TargetProfile;
use crate::unit::{Approximation, DeclaredResource, ShaderUnit};
use crate::vocab::{function_like, object_like, parse_call, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandOptions {
    /// Insert the profile's default precision declarations.
    pub emit_precision: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            emit_precision: true,
        }
    }
}

/// Result of expanding one shader source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedShader {
    pub glsl: String,
    pub profile: TargetProfile,
    pub bindings: Vec<DeclaredResource>,
    pub approximations: Vec<Approximation>,
}

/// Expand every vocabulary use in `source` for the configured profile.
pub fn expand_source(
    config: &TranslationConfig,
    source: &str,
    options: &ExpandOptions,
) -> Result<ExpandedShader, ExpandError> {
    debug!(
        profile = %config.profile(),
        bytes = source.len(),
        "expanding shader source"
    );

    let mut expander = Expander {
        unit: ShaderUnit::new(*config),
        profile: config.profile(),
    };
    let mut glsl = String::with_capacity(source.len() + source.len() / 4);
    expander.expand(source, 1, true, &mut glsl)?;

    if options.emit_precision {
        glsl = insert_prelude(&glsl, config.profile().precision_directives());
    }

    let (bindings, approximations) = expander.unit.finish();
    debug!(
        bindings = bindings.len(),
        approximations = approximations.len(),
        "expanded shader source"
    );
    Ok(ExpandedShader {
        glsl,
        profile: config.profile(),
        bindings,
        approximations,
    })
}

/// Insert `directives` after the `#version` line, or at the very top when there is none.
///
/// Blank lines and comments may precede `#version`.
pub fn insert_prelude(source: &str, directives: &[&str]) -> String {
    if directives.is_empty() {
        return source.to_owned();
    }
    let mut prelude = String::new();
    for directive in directives {
        prelude.push_str(directive);
        prelude.push('\n');
    }

    let leading = skip_leading_trivia(source.as_bytes());
    let first = &source[leading..];
    if !first.starts_with("#version") {
        return prelude + source;
    }

    let mut out = String::with_capacity(source.len() + prelude.len() + 1);
    match first.find('\n') {
        Some(newline) => {
            let split = leading + newline + 1;
            out.push_str(&source[..split]);
            out.push_str(&prelude);
            out.push_str(&source[split..]);
        }
        None => {
            out.push_str(source);
            out.push('\n');
            out.push_str(&prelude);
        }
    }
    out
}

struct Expander {
    unit: ShaderUnit,
    profile: TargetProfile,
}

/// One argument of a call: byte range within the text being scanned, and its first line.
struct ArgSpan {
    start: usize,
    end: usize,
    line: usize,
}

impl Expander {
    fn translate_error(&self, line: usize, source: TranslateError) -> ExpandError {
        ExpandError::Translate {
            line,
            profile: self.profile,
            source,
        }
    }

    /// Expand `text` into `out`. `line` is the source line `text` starts on; `top_level` is false
    /// for call arguments, whose braces are initializers rather than blocks.
    fn expand(
        &mut self,
        text: &str,
        mut line: usize,
        top_level: bool,
        out: &mut String,
    ) -> Result<(), ExpandError> {
        let bytes = text.as_bytes();
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line += 1;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i = skip_line_comment(bytes, i);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let (end, newlines) = skip_block_comment(bytes, i)
                        .ok_or(ExpandError::UnterminatedComment { line })?;
                    line += newlines;
                    i = end;
                }
                b'{' if top_level => {
                    self.unit.enter_block();
                    i += 1;
                }
                b'}' if top_level => {
                    self.unit.exit_block();
                    i += 1;
                }
                b'0'..=b'9' => {
                    // Numeric literals, including suffixes such as `1.0f` or `0x1Fu`.
                    while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b'.') {
                        i += 1;
                    }
                }
                b if is_ident_start(b) => {
                    let start = i;
                    while i < bytes.len() && is_ident_byte(bytes[i]) {
                        i += 1;
                    }
                    if start > 0 && bytes[start - 1] == b'.' {
                        continue;
                    }
                    let ident = &text[start..i];

                    if let Some((operation, _)) = function_like(ident) {
                        let open = skip_whitespace(bytes, i);
                        if bytes.get(open) != Some(&b'(') {
                            continue;
                        }
                        let args_line = line + count_newlines(&bytes[i..open]);
                        let (spans, close) = split_arguments(bytes, open, args_line).ok_or_else(|| {
                            ExpandError::UnterminatedCall {
                                line,
                                operation: operation.to_owned(),
                            }
                        })?;

                        let mut args = Vec::with_capacity(spans.len());
                        for span in &spans {
                            let mut arg = String::new();
                            self.expand(&text[span.start..span.end], span.line, false, &mut arg)?;
                            args.push(Expr::new(arg.trim()));
                        }
                        if args.len() == 1 && args[0].as_str().is_empty() {
                            args.clear();
                        }

                        let native = parse_call(operation, args)
                            .and_then(|op| match op {
                                Some(op) => {
                                    self.unit.set_line(line);
                                    self.unit.translate(&op)
                                }
                                None => Ok(ident.to_owned()),
                            })
                            .map_err(|err| self.translate_error(line, err))?;

                        out.push_str(&text[copied..start]);
                        out.push_str(&native);
                        line += count_newlines(&bytes[i..close]);
                        i = close + 1;
                        copied = i;
                    } else if let Some(op) = object_like(ident) {
                        self.unit.set_line(line);
                        let native = self
                            .unit
                            .translate(&op)
                            .map_err(|err| self.translate_error(line, err))?;
                        out.push_str(&text[copied..start]);
                        out.push_str(&native);
                        copied = i;
                    }
                }
                _ => i += 1,
            }
        }

        out.push_str(&text[copied..]);
        Ok(())
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index of the first byte that is neither whitespace nor part of a comment.
fn skip_leading_trivia(bytes: &[u8]) -> usize {
    let mut i = 0;
    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i..i + 2) {
            Some(b"//") => i = skip_line_comment(bytes, i),
            Some(b"/*") => match skip_block_comment(bytes, i) {
                Some((end, _)) => i = end,
                None => return i,
            },
            _ => return i,
        }
    }
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// Index of the `\n` ending the `//` comment at `start` (or the end of input).
fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| start + offset)
}

/// Index just past the `*/` closing the comment at `start`, and the newlines it spans.
fn skip_block_comment(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let body = start + 2;
    let close = bytes
        .get(body..)?
        .windows(2)
        .position(|w| w == b"*/")?;
    let end = body + close + 2;
    Some((end, count_newlines(&bytes[start..end])))
}

/// Split the argument list opening at `open` on top-level commas.
///
/// Returns the argument spans and the index of the closing `)`, or `None` when the list is not
/// closed before the end of the text.
fn split_arguments(bytes: &[u8], open: usize, mut line: usize) -> Option<(Vec<ArgSpan>, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut start_line = line;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => line += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line_comment(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let (end, newlines) = skip_block_comment(bytes, i)?;
                line += newlines;
                i = end;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' if depth == 0 => {
                spans.push(ArgSpan {
                    start,
                    end: i,
                    line: start_line,
                });
                return Some((spans, i));
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                spans.push(ArgSpan {
                    start,
                    end: i,
                    line: start_line,
                });
                start = i + 1;
                start_line = line;
            }
            _ => {}
        }
        i += 1;
    }
    None
}
