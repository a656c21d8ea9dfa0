//! Ordered, non-overlapping store for mention spans, plus the position
//! remapping applied on every buffer edit.
//!
//! # Remapping rules
//!
//! For `map_insert(offset, n)`:
//!
//! - `offset <= span.start` shifts the whole span right by `n`;
//! - an offset strictly inside the span grows it by `n` (text typed inside a
//!   mention extends it);
//! - an offset at or past the span end leaves it untouched.
//!
//! For `map_remove(offset, len)` the span shrinks by its overlap with the
//! removed range and shifts left by however much of the removal lies before
//! it.
//!
//! The rules are applied to each span independently; since spans never
//! overlap, no span's adjustment depends on another's. Zero-length edits are
//! no-ops. The store never deletes a span on its own: spans emptied by an
//! edit are culled later by revalidation, which keeps resizing and lifecycle
//! concerns separate.

use smallvec::SmallVec;
use thiserror::Error;

use crate::types::MentionSpan;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpanError {
  #[error("span {start}..{end} overlaps existing span {other_start}..{other_end}")]
  Overlap {
    start:       usize,
    end:         usize,
    other_start: usize,
    other_end:   usize,
  },
}

/// The mention span store. Spans are kept sorted by `(start, len, kind)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanSet {
  spans: SmallVec<[MentionSpan; 4]>,
}

impl SpanSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.spans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &MentionSpan> {
    self.spans.iter()
  }

  /// The span anchored exactly at `start`, if any.
  pub fn at_start(&self, start: usize) -> Option<&MentionSpan> {
    self
      .spans
      .iter()
      .find(|span| span.start == start)
  }

  /// Inserts a span, rejecting any overlap with an existing span.
  pub fn try_insert(&mut self, span: MentionSpan) -> Result<(), SpanError> {
    if let Some(other) = self.spans.iter().find(|other| other.overlaps(&span)) {
      return Err(SpanError::Overlap {
        start:       span.start,
        end:         span.end(),
        other_start: other.start,
        other_end:   other.end(),
      });
    }

    let idx = self
      .spans
      .binary_search(&span)
      .unwrap_or_else(|idx| idx);
    self.spans.insert(idx, span);
    Ok(())
  }

  /// Removes and returns the span anchored at `start`.
  pub fn remove_at(&mut self, start: usize) -> Option<MentionSpan> {
    let idx = self.spans.iter().position(|span| span.start == start)?;
    Some(self.spans.remove(idx))
  }

  pub fn retain(&mut self, mut f: impl FnMut(&MentionSpan) -> bool) {
    self.spans.retain(|span| f(span));
  }

  pub fn clear(&mut self) {
    self.spans.clear();
  }

  /// Remaps every span for an insertion of `n` chars at `offset`.
  pub fn map_insert(&mut self, offset: usize, n: usize) {
    if n == 0 {
      return;
    }

    for span in &mut self.spans {
      if offset <= span.start {
        span.start += n;
      } else if offset < span.end() {
        span.len += n;
      }
      // offset >= span.end(): untouched.
    }
  }

  /// Remaps every span for a removal of `len` chars at `offset`.
  pub fn map_remove(&mut self, offset: usize, len: usize) {
    if len == 0 {
      return;
    }

    let removal_end = offset + len;
    for span in &mut self.spans {
      let overlap_start = offset.max(span.start);
      let overlap_end = removal_end.min(span.end());
      if overlap_start < overlap_end {
        span.len -= overlap_end - overlap_start;
      }
      if offset < span.start {
        span.start -= len.min(span.start - offset);
      }
    }
  }
}

impl FromIterator<MentionSpan> for SpanSet {
  fn from_iter<I: IntoIterator<Item = MentionSpan>>(iter: I) -> Self {
    let mut spans: SmallVec<[MentionSpan; 4]> = iter.into_iter().collect();
    spans.sort();
    Self { spans }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::{
    MentionKind,
    UserId,
  };

  fn user_span(start: usize, len: usize) -> MentionSpan {
    MentionSpan::new(start, len, MentionKind::User(UserId::from("u1")))
  }

  #[test]
  fn insert_rejects_overlap() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();

    let err = set.try_insert(user_span(7, 3)).unwrap_err();
    assert_eq!(err, SpanError::Overlap {
      start:       7,
      end:         10,
      other_start: 5,
      other_end:   9,
    });

    // Touching ranges are fine.
    set.try_insert(user_span(9, 2)).unwrap();
    set.try_insert(user_span(0, 5)).unwrap();
    assert_eq!(set.len(), 3);

    // Sorted by start.
    let starts: Vec<_> = set.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![0, 5, 9]);
  }

  #[test]
  fn map_insert_before_shifts() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();

    set.map_insert(2, 3);
    assert_eq!(set.at_start(8), Some(&user_span(8, 4)));

    // Insertion exactly at the anchor also pushes the span right.
    set.map_insert(8, 1);
    assert_eq!(set.at_start(9), Some(&user_span(9, 4)));
  }

  #[test]
  fn map_insert_inside_grows() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();

    set.map_insert(6, 2);
    assert_eq!(set.at_start(5), Some(&user_span(5, 6)));

    // At the exclusive end: unchanged.
    set.map_insert(11, 5);
    assert_eq!(set.at_start(5), Some(&user_span(5, 6)));
  }

  #[test]
  fn map_insert_empty_is_noop() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();
    set.map_insert(5, 0);
    assert_eq!(set.at_start(5), Some(&user_span(5, 4)));
  }

  #[test]
  fn map_remove_before_shifts() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();

    set.map_remove(0, 3);
    assert_eq!(set.at_start(2), Some(&user_span(2, 4)));
  }

  #[test]
  fn map_remove_overlapping_shrinks() {
    // Removal eats the tail of the span.
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();
    set.map_remove(7, 5);
    assert_eq!(set.at_start(5), Some(&user_span(5, 2)));

    // Removal eats the head: span shrinks and shifts.
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();
    set.map_remove(3, 4);
    assert_eq!(set.at_start(3), Some(&user_span(3, 2)));

    // Removal swallows the span whole; length reaches zero but the span
    // stays in the store for revalidation to cull.
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();
    set.map_remove(4, 6);
    assert_eq!(set.at_start(4), Some(&user_span(4, 0)));
  }

  #[test]
  fn map_remove_inside_shrinks_in_place() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 6)).unwrap();
    set.map_remove(6, 2);
    assert_eq!(set.at_start(5), Some(&user_span(5, 4)));
  }

  #[test]
  fn round_trip_restores_spans() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(5, 4)).unwrap();
    set.try_insert(user_span(12, 3)).unwrap();
    let original = set.clone();

    for offset in [0usize, 5, 6, 9, 11, 14, 20] {
      set.map_insert(offset, 3);
      set.map_remove(offset, 3);
      assert_eq!(set, original, "offset {offset}");
    }
  }

  #[test]
  fn spans_stay_disjoint_under_edits() {
    let mut set = SpanSet::new();
    set.try_insert(user_span(0, 4)).unwrap();
    set.try_insert(user_span(6, 4)).unwrap();
    set.try_insert(user_span(12, 4)).unwrap();

    set.map_insert(7, 5);
    set.map_remove(2, 6);
    set.map_insert(0, 2);
    set.map_remove(0, 1);

    let spans: Vec<_> = set.iter().cloned().collect();
    for (i, a) in spans.iter().enumerate() {
      for b in &spans[i + 1..] {
        assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
      }
    }
  }
}
