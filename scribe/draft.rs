//! The message draft: a mutable text buffer with mention bookkeeping.
//!
//! Every public mutation funnels through the same two primitives (insert a
//! fragment at an offset, remove a range), which keep the span store's
//! positions accurate. Whole-text replacement is diffed into those
//! primitives; accepting a suggestion is a structured remove+insert.
//!
//! # Concurrency
//!
//! A draft is **not** safe for concurrent mutation. All mutating operations
//! are expected to be invoked serially from a single logical thread of
//! control, matching how a typing UI drives one draft at a time; no internal
//! locking is performed. Suggestion lookups (`revalidate`) are the only
//! asynchronous operations, and in-flight lookups are not cancelled by later
//! edits: each pass carries the revision it started at so the caller can
//! discard stale results (see [`SuggestionPass`]).

use std::{
  collections::HashMap,
  sync::Arc,
};

use ropey::Rope;
use scribe_core::chars::{
  CHANNEL_MARKER,
  USER_MARKER,
  trim_trailing_punctuation,
};
use thiserror::Error;

use crate::{
  Tendril,
  diff::{
    self,
    EditOp,
  },
  scan::{
    self,
    MentionMatch,
  },
  span::{
    SpanError,
    SpanSet,
  },
  suggest::{
    Candidate,
    LookupKind,
    Suggestion,
    SuggestionPass,
    SuggestionProvider,
    resolve_matches,
  },
  types::{
    ChannelId,
    DraftConfig,
    DraftSnapshot,
    FileAttachment,
    MentionKind,
    MentionSpan,
    QuotedMessage,
  },
};

pub type Result<T> = std::result::Result<T, DraftError>;

/// Tokens whose body is this short are not worth a directory search.
const MIN_SEARCH_BODY_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DraftError {
  #[error("offset {offset} is out of bounds for buffer length {len}")]
  OffsetOutOfBounds { offset: usize, len: usize },

  #[error("range {from}..{to} is out of bounds for buffer length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },

  #[error("character at {start} is not the expected '{expected}' marker")]
  AnchorMismatch { start: usize, expected: char },

  #[error(transparent)]
  Overlap(#[from] SpanError),

  #[error("quoted message belongs to channel '{found}', draft targets '{expected}'")]
  QuotedChannelMismatch {
    expected: ChannelId,
    found:    ChannelId,
  },

  #[error("suggestion for '{matched_text}' no longer matches the buffer at {start}")]
  StaleSuggestion { start: usize, matched_text: String },
}

/// Fire-and-forget typing notification boundary. Implementations must not
/// block; a failed notification must never fail the edit that caused it.
pub trait TypingSink: Send + Sync {
  fn notify_typing(&self, is_typing: bool);
}

/// A message being composed, with mention/link spans tracked across edits.
pub struct MessageDraft {
  text:     Rope,
  spans:    SpanSet,
  config:   DraftConfig,
  provider: Arc<dyn SuggestionProvider>,
  typing:   Option<Arc<dyn TypingSink>>,
  quoted:   Option<QuotedMessage>,
  files:    Vec<FileAttachment>,

  /// Bumped on every buffer mutation; used to detect stale suggestion
  /// passes.
  revision:      u64,
  typing_active: bool,
  cache:         HashMap<String, Vec<Candidate>>,
}

impl MessageDraft {
  pub fn new(config: DraftConfig, provider: Arc<dyn SuggestionProvider>) -> Self {
    Self {
      text: Rope::new(),
      spans: SpanSet::new(),
      config,
      provider,
      typing: None,
      quoted: None,
      files: Vec::new(),
      revision: 0,
      typing_active: false,
      cache: HashMap::new(),
    }
  }

  pub fn with_typing_sink(mut self, sink: Arc<dyn TypingSink>) -> Self {
    self.typing = Some(sink);
    self
  }

  pub fn text(&self) -> String {
    self.text.to_string()
  }

  pub fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  pub fn is_empty(&self) -> bool {
    self.text.len_chars() == 0
  }

  pub fn config(&self) -> &DraftConfig {
    &self.config
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }

  pub fn spans(&self) -> impl Iterator<Item = &MentionSpan> {
    self.spans.iter()
  }

  // Edit engine.
  //

  /// Inserts `fragment` at char offset `offset`, remapping all spans.
  pub fn insert(&mut self, offset: usize, fragment: &str) -> Result<()> {
    self.apply_insert(offset, fragment)?;
    self.finish_mutation();
    Ok(())
  }

  /// Removes `len` chars starting at `offset`, remapping all spans.
  pub fn remove(&mut self, offset: usize, len: usize) -> Result<()> {
    self.apply_remove(offset, len)?;
    self.finish_mutation();
    Ok(())
  }

  /// Replaces the whole buffer with `new_text` by replaying a minimal edit
  /// script through the same insert/remove primitives.
  ///
  /// Returns false when the new text is identical to the buffer.
  pub fn set_text(&mut self, new_text: &str) -> Result<bool> {
    let script = diff::compare(&self.text, new_text);
    if script.is_identity() {
      return Ok(false);
    }

    // A script built from the current buffer always replays cleanly; an
    // out-of-bounds step here means the diff itself broke its contract and
    // must not be papered over.
    let mut consumed = 0;
    for op in script.ops() {
      match op {
        EditOp::Retain(n) => consumed += n,
        EditOp::Delete(n) => self.apply_remove(consumed, *n)?,
        EditOp::Insert(fragment) => {
          self.apply_insert(consumed, fragment)?;
          consumed += fragment.chars().count();
        },
      }
    }

    self.finish_mutation();
    Ok(true)
  }

  /// Empties the buffer, dropping all spans.
  pub fn clear(&mut self) {
    self.text = Rope::new();
    self.spans.clear();
    self.finish_mutation();
  }

  // Mentions.
  //

  /// Manually attaches a span over existing text.
  ///
  /// Fails when the span is out of bounds, when its first character is not
  /// the marker its kind requires, or when it overlaps an existing span.
  /// These are caller programming errors and are not retried.
  pub fn add_mention(&mut self, span: MentionSpan) -> Result<()> {
    let len = self.text.len_chars();
    if span.end() > len {
      return Err(DraftError::RangeOutOfBounds {
        from: span.start,
        to:   span.end(),
        len,
      });
    }

    if let Some(expected) = span.kind.marker() {
      if self.text.get_char(span.start) != Some(expected) {
        return Err(DraftError::AnchorMismatch {
          start: span.start,
          expected,
        });
      }
    }

    self.spans.try_insert(span)?;
    Ok(())
  }

  /// Detaches and returns the span anchored at `start`. The text itself is
  /// untouched.
  pub fn remove_mention(&mut self, start: usize) -> Option<MentionSpan> {
    self.spans.remove_at(start)
  }

  /// Accepts a suggestion: replaces the matched token with the candidate's
  /// display name (marker retained) and attaches the resolved span.
  pub fn insert_suggested_mention(&mut self, suggestion: &Suggestion) -> Result<()> {
    let start = suggestion.anchor_start;
    let matched_len = suggestion.matched_text.chars().count();
    let end = start + matched_len;

    if end > self.text.len_chars() || self.text.slice(start..end) != suggestion.matched_text {
      return Err(DraftError::StaleSuggestion {
        start,
        matched_text: suggestion.matched_text.clone(),
      });
    }

    let (marker, kind) = match &suggestion.candidate {
      Candidate::User(user) => (USER_MARKER, MentionKind::User(user.id.clone())),
      Candidate::Channel(channel) => (CHANNEL_MARKER, MentionKind::Channel(channel.id.clone())),
    };

    let mut replacement = Tendril::new();
    replacement.push(marker);
    replacement.push_str(suggestion.candidate.display_name());
    let replacement_len = replacement.chars().count();

    // Remap a copy of the span store first: if the new span collides with
    // an existing one (a span straddling the token can grow into it), the
    // draft must be left untouched.
    let mut spans = self.spans.clone();
    spans.map_remove(start, matched_len);
    spans.map_insert(start, replacement_len);
    spans.try_insert(MentionSpan::new(start, replacement_len, kind))?;

    self.text.remove(start..end);
    self.text.insert(start, &replacement);
    self.spans = spans;

    self.finish_mutation();
    Ok(())
  }

  // Attachments.
  //

  /// Attaches a quoted message. Quoting across channels is rejected before
  /// any network effect can occur.
  pub fn attach_quoted_message(&mut self, quoted: QuotedMessage) -> Result<()> {
    if quoted.channel != self.config.channel {
      return Err(DraftError::QuotedChannelMismatch {
        expected: self.config.channel.clone(),
        found:    quoted.channel,
      });
    }
    self.quoted = Some(quoted);
    Ok(())
  }

  pub fn attach_file(&mut self, file: FileAttachment) {
    self.files.push(file);
  }

  pub fn quoted_message(&self) -> Option<&QuotedMessage> {
    self.quoted.as_ref()
  }

  pub fn files(&self) -> &[FileAttachment] {
    &self.files
  }

  /// The immutable view handed to the send boundary.
  pub fn snapshot(&self) -> DraftSnapshot {
    DraftSnapshot {
      text:   self.text.to_string(),
      spans:  self.spans.iter().cloned().collect(),
      quoted: self.quoted.clone(),
      files:  self.files.clone(),
    }
  }

  // Revalidation.
  //

  /// Reconciles stored spans against the current text, then looks up
  /// suggestions for tokens that still lack one.
  ///
  /// Stale user/channel spans are dropped first (their anchor vanished, or
  /// nothing but the anchor is left), so a stale span can neither keep an
  /// old lookup alive nor shadow a token that needs one. Tokens with a
  /// resolved span are skipped; tokens shorter than the search minimum are
  /// skipped; the rest are resolved concurrently, with per-token failures
  /// degrading to empty lists.
  pub async fn revalidate(&mut self) -> SuggestionPass {
    let revision = self.revision;

    let user_matches = scan::scan_mentions(self.text.slice(..), USER_MARKER);
    let channel_matches = scan::scan_mentions(self.text.slice(..), CHANNEL_MARKER);

    self.drop_stale_spans(&user_matches, &channel_matches);

    let users = self.unresolved(&user_matches);
    let channels = self.unresolved(&channel_matches);

    let unresolved = users
      .iter()
      .chain(channels.iter())
      .map(|(m, text)| (m.start, text.clone()))
      .collect();

    let searchable = |tokens: Vec<(MentionMatch, String)>| {
      tokens
        .into_iter()
        .filter(|(m, _)| m.body_len() >= MIN_SEARCH_BODY_LEN)
        .collect::<Vec<_>>()
    };
    let users = searchable(users);
    let channels = searchable(channels);

    let mut suggestions = resolve_matches(
      &self.provider,
      &self.config,
      &mut self.cache,
      LookupKind::Users,
      users,
    )
    .await;
    suggestions.extend(
      resolve_matches(
        &self.provider,
        &self.config,
        &mut self.cache,
        LookupKind::Channels,
        channels,
      )
      .await,
    );

    SuggestionPass {
      revision,
      unresolved,
      suggestions,
    }
  }

  fn drop_stale_spans(&mut self, user_matches: &[MentionMatch], channel_matches: &[MentionMatch]) {
    let text = self.text.slice(..);
    self.spans.retain(|span| {
      let matches = match span.kind.marker() {
        Some(USER_MARKER) => user_matches,
        Some(CHANNEL_MARKER) => channel_matches,
        // Link spans are not anchored and survive revalidation.
        _ => return true,
      };

      if !matches.iter().any(|m| m.start == span.start) {
        return false;
      }

      // Degenerate: nothing but the anchor left once trailing punctuation
      // is excluded.
      if span.len <= 1 {
        return false;
      }
      let body = text
        .slice(span.start + 1..span.end().min(text.len_chars()))
        .to_string();
      !trim_trailing_punctuation(&body).is_empty()
    });
  }

  fn unresolved(&self, matches: &[MentionMatch]) -> Vec<(MentionMatch, String)> {
    matches
      .iter()
      .filter(|m| self.spans.at_start(m.start).is_none())
      .map(|m| (m.clone(), scan::match_text(self.text.slice(..), m)))
      .collect()
  }

  // Primitives.
  //

  fn apply_insert(&mut self, offset: usize, fragment: &str) -> Result<()> {
    let len = self.text.len_chars();
    if offset > len {
      return Err(DraftError::OffsetOutOfBounds { offset, len });
    }
    if fragment.is_empty() {
      return Ok(());
    }

    self.text.insert(offset, fragment);
    self.spans.map_insert(offset, fragment.chars().count());
    Ok(())
  }

  fn apply_remove(&mut self, offset: usize, remove_len: usize) -> Result<()> {
    let len = self.text.len_chars();
    let end = offset + remove_len;
    if end > len {
      return Err(DraftError::RangeOutOfBounds {
        from: offset,
        to: end,
        len,
      });
    }
    if remove_len == 0 {
      return Ok(());
    }

    self.text.remove(offset..end);
    self.spans.map_remove(offset, remove_len);
    Ok(())
  }

  /// Bookkeeping shared by every successful mutation: cached lookups are
  /// invalidated, the revision advances, and the typing sink is told about
  /// state transitions.
  fn finish_mutation(&mut self) {
    self.cache.clear();
    self.revision += 1;

    if !self.config.notify_typing {
      return;
    }

    let is_typing = !self.is_empty();
    if is_typing != self.typing_active {
      self.typing_active = is_typing;
      if let Some(sink) = &self.typing {
        sink.notify_typing(is_typing);
      }
    }
  }
}

impl std::fmt::Debug for MessageDraft {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MessageDraft")
      .field("text", &self.text.to_string())
      .field("spans", &self.spans)
      .field("revision", &self.revision)
      .finish_non_exhaustive()
  }
}
