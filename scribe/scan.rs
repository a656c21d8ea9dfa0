//! Scanning the draft buffer for `@token` / `#token` occurrences.
//!
//! A match is a marker character at start-of-text or directly after
//! whitespace, followed by at least one word character. The match covers the
//! marker and the word body only; any following punctuation or whitespace is
//! outside it.

use ropey::RopeSlice;
use scribe_core::chars::char_is_word;

/// One `@token` / `#token` occurrence in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionMatch {
  /// Char offset of the marker character.
  pub start:  usize,
  /// Match length in chars, marker included.
  pub len:    usize,
  pub marker: char,
}

impl MentionMatch {
  /// Length of the word body, marker excluded.
  pub fn body_len(&self) -> usize {
    self.len - 1
  }
}

/// Finds all occurrences of `marker`-anchored tokens in `text`.
pub fn scan_mentions(text: RopeSlice, marker: char) -> Vec<MentionMatch> {
  let mut matches = Vec::new();
  let mut chars = text.chars().enumerate().peekable();
  let mut prev: Option<char> = None;

  while let Some((pos, ch)) = chars.next() {
    let at_word_start = prev.is_none_or(char::is_whitespace);
    prev = Some(ch);

    if ch != marker || !at_word_start {
      continue;
    }

    let mut len = 1;
    while let Some(&(_, next)) = chars.peek() {
      if !char_is_word(next) {
        break;
      }
      chars.next();
      prev = Some(next);
      len += 1;
    }

    if len > 1 {
      matches.push(MentionMatch { start: pos, len, marker });
    }
  }

  matches
}

/// The text covered by a match, as an owned string.
pub fn match_text(text: RopeSlice, m: &MentionMatch) -> String {
  text.slice(m.start..m.start + m.len).to_string()
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  fn scan(text: &str, marker: char) -> Vec<(usize, String)> {
    let rope = Rope::from(text);
    scan_mentions(rope.slice(..), marker)
      .into_iter()
      .map(|m| (m.start, match_text(rope.slice(..), &m)))
      .collect()
  }

  #[test]
  fn finds_tokens_at_word_starts() {
    assert_eq!(scan("@Mar", '@'), vec![(0, "@Mar".to_string())]);
    assert_eq!(scan("Hey, @Mar here", '@'), vec![(5, "@Mar".to_string())]);
    assert_eq!(scan("a #general b", '#'), vec![(2, "#general".to_string())]);
  }

  #[test]
  fn ignores_markers_inside_words() {
    assert_eq!(scan("mail@example", '@'), vec![]);
    assert_eq!(scan("foo#bar", '#'), vec![]);
  }

  #[test]
  fn requires_a_word_body() {
    assert_eq!(scan("@ alone", '@'), vec![]);
    assert_eq!(scan("@, punct", '@'), vec![]);
  }

  #[test]
  fn stops_at_non_word_characters() {
    assert_eq!(scan("ping @Jane, hi", '@'), vec![(5, "@Jane".to_string())]);
    assert_eq!(scan("@Mary Jonson", '@'), vec![(0, "@Mary".to_string())]);
  }

  #[test]
  fn multiple_matches() {
    assert_eq!(scan("@a_1 x @b2", '@'), vec![
      (0, "@a_1".to_string()),
      (7, "@b2".to_string()),
    ]);
  }

  #[test]
  fn unicode_bodies() {
    assert_eq!(scan("say @Jürgen now", '@'), vec![(4, "@Jürgen".to_string())]);
  }
}
