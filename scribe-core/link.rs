//! Bare URL detection for rendered message text.
//!
//! The heuristic is deliberately restricted: a token is only treated as a
//! link when it carries an explicit `http://` / `https://` scheme or a
//! leading `www.`, and the host portion contains at least one interior dot.
//! Anything fuzzier belongs in the caller's hands as an explicit text link.

use crate::chars::char_is_link_trailer;

/// Returns true when `token` looks like a bare URL.
///
/// Matching is case-insensitive. The token is expected to already have any
/// trailing sentence punctuation split off (see [`split_link_trailer`]).
pub fn is_plain_link(token: &str) -> bool {
  let lower = token.to_lowercase();

  let rest = if let Some(rest) = lower.strip_prefix("http://") {
    rest
  } else if let Some(rest) = lower.strip_prefix("https://") {
    rest
  } else if lower.starts_with("www.") {
    lower.as_str()
  } else {
    return false;
  };

  host_of(rest).is_some_and(has_interior_dot)
}

/// Splits one trailing punctuation character (`!`, `?`, `.`, `,`) off the
/// token, if present. Returns the remaining head and the optional trailer.
pub fn split_link_trailer(token: &str) -> (&str, Option<&str>) {
  match token.char_indices().next_back() {
    Some((idx, ch)) if char_is_link_trailer(ch) => (&token[..idx], Some(&token[idx..])),
    _ => (token, None),
  }
}

fn host_of(rest: &str) -> Option<&str> {
  let end = rest
    .find(|c| matches!(c, '/' | '?' | '#'))
    .unwrap_or(rest.len());
  let host = &rest[..end];
  (!host.is_empty()).then_some(host)
}

fn has_interior_dot(host: &str) -> bool {
  host
    .split('.')
    .filter(|label| !label.is_empty())
    .take(2)
    .count()
    == 2
}
