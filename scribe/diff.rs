//! Whole-text replacement as a minimal edit script.
//!
//! A rich text widget often reports only "the text is now X". To keep span
//! bookkeeping on a single code path, the new text is diffed against the
//! current buffer at word-token granularity and replayed as ordinary
//! insert/remove edits.

use std::{
  ops::Range,
  sync::Arc,
  time::Instant,
};

use imara_diff::{
  Algorithm,
  Diff,
  Hunk,
  InternedInput,
};
use ropey::Rope;

use crate::Tendril;

/// One step of an edit script, applied left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
  /// Keep n characters unchanged.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at the current position.
  Insert(Tendril),
}

/// An ordered list of operations transforming a buffer of `len_before`
/// chars into one of `len_after` chars.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditScript {
  ops:        Vec<EditOp>,
  len_before: usize,
  len_after:  usize,
}

impl EditScript {
  pub fn ops(&self) -> &[EditOp] {
    &self.ops
  }

  /// The buffer length this script expects to be applied to.
  pub fn len_before(&self) -> usize {
    self.len_before
  }

  pub fn len_after(&self) -> usize {
    self.len_after
  }

  pub fn is_identity(&self) -> bool {
    self
      .ops
      .iter()
      .all(|op| matches!(op, EditOp::Retain(_)))
  }

  fn retain(&mut self, n: usize) {
    use EditOp::*;

    if n == 0 {
      return;
    }

    self.len_before += n;
    self.len_after += n;

    if let Some(Retain(count)) = self.ops.last_mut() {
      *count += n;
    } else {
      self.ops.push(Retain(n));
    }
  }

  fn delete(&mut self, n: usize) {
    use EditOp::*;

    if n == 0 {
      return;
    }

    self.len_before += n;

    if let Some(Delete(count)) = self.ops.last_mut() {
      *count += n;
    } else {
      self.ops.push(Delete(n));
    }
  }

  fn insert(&mut self, fragment: Tendril) {
    use EditOp::*;

    if fragment.is_empty() {
      return;
    }

    self.len_after += fragment.chars().count();

    // Keep the script canonical: adjacent inserts merge, and an insert
    // next to a delete always sits in front of it.
    let new_last = match self.ops.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&fragment);
        return;
      },
      [.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
      _ => Insert(fragment),
    };

    self.ops.push(new_last);
  }
}

/// A run of same-class characters. Diffing at this granularity keeps
/// replacements word-aligned instead of scattering single-char edits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct WordToken {
  text:      Arc<str>,
  len_chars: usize,
}

impl WordToken {
  fn new(text: String, len_chars: usize) -> Self {
    Self {
      text: Arc::from(text),
      len_chars,
    }
  }
}

// The token interner needs a placeholder value.
impl Default for WordToken {
  fn default() -> Self {
    Self {
      text:      Arc::from(""),
      len_chars: 0,
    }
  }
}

struct TokenizedSeq {
  tokens:       Vec<WordToken>,
  prefix_chars: Vec<usize>,
}

impl TokenizedSeq {
  fn new(tokens: Vec<WordToken>) -> Self {
    let mut prefix_chars = Vec::with_capacity(tokens.len() + 1);
    prefix_chars.push(0);
    for token in &tokens {
      let next = prefix_chars.last().copied().unwrap_or(0) + token.len_chars;
      prefix_chars.push(next);
    }
    Self {
      tokens,
      prefix_chars,
    }
  }

  fn char_len(&self, range: Range<u32>) -> usize {
    let start = range.start as usize;
    let end = range.end as usize;
    debug_assert!(end < self.prefix_chars.len());
    self.prefix_chars[end] - self.prefix_chars[start]
  }
}

fn tokenize_words<I: Iterator<Item = char>>(iter: I) -> TokenizedSeq {
  let mut tokens = Vec::new();
  let mut buf = String::new();
  let mut buf_len = 0usize;
  let mut class = None;

  for ch in iter {
    let next_class = scribe_core::chars::categorize_char(ch);
    if class == Some(next_class) {
      buf.push(ch);
      buf_len += 1;
      continue;
    }

    if buf_len > 0 {
      tokens.push(WordToken::new(std::mem::take(&mut buf), buf_len));
    }
    buf.push(ch);
    buf_len = 1;
    class = Some(next_class);
  }

  if buf_len > 0 {
    tokens.push(WordToken::new(std::mem::take(&mut buf), buf_len));
  }

  TokenizedSeq::new(tokens)
}

/// Diffs `before` against `after` and returns the edit script to replay.
pub fn compare(before: &Rope, after: &str) -> EditScript {
  let start = tracing::enabled!(tracing::Level::DEBUG).then(Instant::now);

  let mut before_tokens = tokenize_words(before.chars());
  let before_token_list = std::mem::take(&mut before_tokens.tokens);
  let after_tokens = tokenize_words(after.chars());

  let mut input = InternedInput::default();
  input.update_before(before_token_list.into_iter());
  input.update_after(after_tokens.tokens.into_iter());

  // The histogram heuristic gains little on short message bodies where the
  // same words reoccur; use Myers directly.
  let mut diff = Diff::default();
  diff.compute_with(
    Algorithm::Myers,
    &input.before,
    &input.after,
    input.interner.num_tokens(),
  );

  let mut script = EditScript::default();
  let mut pos = 0;
  for Hunk { before, after } in diff.hunks() {
    script.retain(before_tokens.char_len(pos..before.start));
    script.delete(before_tokens.char_len(before.start..before.end));
    pos = before.end;

    let mut fragment = Tendril::new();
    for &token in &input.after[after.start as usize..after.end as usize] {
      fragment.push_str(input.interner[token].text.as_ref());
    }
    script.insert(fragment);
  }
  script.retain(before_tokens.char_len(pos..input.before.len() as u32));

  if let Some(start) = start {
    tracing::debug!(
      "draft diff took {}us",
      Instant::now().duration_since(start).as_micros()
    );
  }
  script
}
