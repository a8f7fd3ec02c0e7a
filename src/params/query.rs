//! `application/x-www-form-urlencoded` decoding with bracket notation.
//!
//! `a=1` stores a scalar. `a[]=1` appends to a list and `a[k]=1` sets a map
//! entry; bracketed pairs for the same top-level key merge into whatever is
//! already stored there. Plain repeated keys simply overwrite.

use log::debug;

use crate::params::value::{ParamMap, ParamValue, Params};

/// Decode a query string or form body.
///
/// Never fails. The whole input is percent-decoded before splitting; an
/// input with a malformed escape (`%` not followed by two hex digits) or
/// one that does not decode to UTF-8 yields an empty map. Pairs without
/// `=`, with an empty key, or with malformed brackets are skipped.
pub fn decode(form_encoded: &str) -> Params {
    let mut params = Params::new();

    if has_malformed_escape(form_encoded) {
        debug!("Discarding parameters with a malformed escape");
        return params;
    }

    let decoded = match urlencoding::decode(form_encoded) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Discarding undecodable parameters: {e}");
            return params;
        }
    };

    for pair in decoded.split('&').filter(|pair| !pair.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };

        match key.split_once('[') {
            None if key.is_empty() => continue,
            None => {
                params.insert(key.to_string(), ParamValue::from(value));
            }
            Some((name, brackets)) => {
                if name.is_empty() {
                    continue;
                }

                let Some(components) = bracket_components(brackets) else {
                    debug!("Dropping malformed parameter key {key:?}");
                    continue;
                };

                let nested = nest(&components, value);
                let merged = match params.remove(name) {
                    Some(existing) => existing.merge(nested),
                    None => nested,
                };
                params.insert(name.to_string(), merged);
            }
        }
    }

    params
}

fn has_malformed_escape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !matches!(
                bytes.get(i + 1..i + 3),
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
    })
}

/// Split `x][y][]` (everything after the first `[`) into `["x", "y", ""]`.
///
/// Returns `None` if any component lacks its closing `]`.
fn bracket_components(brackets: &str) -> Option<Vec<&str>> {
    brackets
        .split('[')
        .map(|component| component.strip_suffix(']'))
        .collect()
}

/// Wrap `value` from the innermost bracket outward.
fn nest(components: &[&str], value: &str) -> ParamValue {
    components
        .iter()
        .rev()
        .fold(ParamValue::from(value), |inner, component| {
            if component.is_empty() {
                ParamValue::Sequence(vec![inner])
            } else {
                ParamValue::Mapping(ParamMap::from_iter([(*component, inner)]))
            }
        })
}
