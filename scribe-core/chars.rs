//! Character classification for mention scanning and rendering.

/// Marker character that begins a user mention token.
pub const USER_MARKER: char = '@';

/// Marker character that begins a channel reference token.
pub const CHANNEL_MARKER: char = '#';

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if c.is_whitespace() => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

/// Characters that may form the body of a mention token, after the marker.
#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  use unicode_general_category::{
    GeneralCategory,
    get_general_category,
  };

  matches!(
    get_general_category(ch),
    GeneralCategory::OtherPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
  )
}

/// Sentence punctuation that is split off the end of a bare URL when it
/// appears directly after the link text.
#[inline]
pub fn char_is_link_trailer(ch: char) -> bool {
  matches!(ch, '!' | '?' | '.' | ',')
}

/// Strips trailing punctuation from a token, returning the remaining prefix.
pub fn trim_trailing_punctuation(token: &str) -> &str {
  token.trim_end_matches(char_is_punctuation)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn word_characters() {
    assert!(char_is_word('a'));
    assert!(char_is_word('Z'));
    assert!(char_is_word('7'));
    assert!(char_is_word('_'));
    assert!(char_is_word('é'));
    assert!(char_is_word('世'));
    assert!(!char_is_word('@'));
    assert!(!char_is_word(' '));
    assert!(!char_is_word('-'));
  }

  #[test]
  fn punctuation_trimming() {
    assert_eq!(trim_trailing_punctuation("Mar"), "Mar");
    assert_eq!(trim_trailing_punctuation("@Mar,"), "@Mar");
    assert_eq!(trim_trailing_punctuation("@Mar?!"), "@Mar");
    // The marker itself is Unicode punctuation.
    assert_eq!(trim_trailing_punctuation("@"), "");
    assert_eq!(trim_trailing_punctuation(""), "");
  }

  #[test]
  fn categories() {
    assert_eq!(categorize_char(' '), CharCategory::Whitespace);
    assert_eq!(categorize_char('x'), CharCategory::Word);
    assert_eq!(categorize_char(','), CharCategory::Punctuation);
  }
}
