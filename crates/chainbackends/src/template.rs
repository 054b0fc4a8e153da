//! Positional placeholder substitution for command templates.
//!
//! `$<index>` refers to the index-th declared input (1-based, declaration
//! order). A placeholder with no matching declared input and a declared
//! input that never occurs in the template are both hard errors, at
//! deployment time and again at render time.

use chaincore::{BackendError, Parameter, Value};

/// Substitute every placeholder with the matching argument's string form.
pub fn render(template: &str, arguments: &[(Parameter, Value)]) -> Result<String, BackendError> {
    let mut out = String::with_capacity(template.len());
    let mut seen = vec![false; arguments.len()];
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let index = match take_index(&mut chars)? {
            // A bare `$` is ordinary text (e.g. a shell variable).
            None => {
                out.push('$');
                continue;
            }
            Some(index) => index,
        };
        if index == 0 || index > arguments.len() {
            return Err(BackendError::MissingArgument { index });
        }
        out.push_str(&arguments[index - 1].1.to_argument_string());
        seen[index - 1] = true;
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(BackendError::MissingPlaceholder {
            code: arguments[missing].0.code.clone(),
            index: missing + 1,
        });
    }

    Ok(out)
}

/// Deployment-time wiring check: every placeholder must have a declared
/// input and every declared input must have a placeholder.
pub fn check(template: &str, declared_inputs: &[Parameter]) -> Result<(), BackendError> {
    let mut seen = vec![false; declared_inputs.len()];
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            continue;
        }
        let Some(index) = take_index(&mut chars)? else {
            continue;
        };
        if index == 0 || index > declared_inputs.len() {
            return Err(BackendError::MissingArgument { index });
        }
        seen[index - 1] = true;
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(BackendError::MissingPlaceholder {
            code: declared_inputs[missing].code.clone(),
            index: missing + 1,
        });
    }

    Ok(())
}

/// Consume the digits following a `$`. `None` when the `$` is not followed
/// by digits. Multi-digit indices parse as one number, so `$12` is index
/// 12 rather than `$1` followed by `2`.
fn take_index(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Option<usize>, BackendError> {
    let mut digits = String::new();
    while let Some(&d) = chars.peek() {
        if !d.is_ascii_digit() {
            break;
        }
        digits.push(d);
        chars.next();
    }
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| BackendError::Configuration(format!("placeholder index out of range: ${}", digits)))
}
