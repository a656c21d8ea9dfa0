//! Domain model shared across the composition engine.

use std::fmt;

use scribe_core::chars::{
  CHANNEL_MARKER,
  USER_MARKER,
};

macro_rules! id_type {
  ($name:ident) => {
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self {
        Self(id.to_string())
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }
  };
}

id_type!(UserId);
id_type!(ChannelId);

/// A user as returned by the suggestion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id:           UserId,
  pub display_name: String,
}

/// A channel as returned by the suggestion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
  pub id:   ChannelId,
  pub name: String,
}

/// What an annotated range in the draft refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionKind {
  User(UserId),
  Channel(ChannelId),
  Link(String),
}

impl MentionKind {
  /// The anchor character this kind of span must start with, if any.
  /// Link spans carry no marker.
  pub fn marker(&self) -> Option<char> {
    match self {
      MentionKind::User(_) => Some(USER_MARKER),
      MentionKind::Channel(_) => Some(CHANNEL_MARKER),
      MentionKind::Link(_) => None,
    }
  }

  /// Tie-break rank used when two spans share a start position.
  pub(crate) fn rank(&self) -> u8 {
    match self {
      MentionKind::User(_) => 0,
      MentionKind::Channel(_) => 1,
      MentionKind::Link(_) => 2,
    }
  }
}

/// An annotated, non-overlapping range over the draft's text.
///
/// `start` is the char offset of the span's first character; for user and
/// channel spans that character is the anchor marker and is counted in
/// `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionSpan {
  pub start: usize,
  pub len:   usize,
  pub kind:  MentionKind,
}

impl MentionSpan {
  pub fn new(start: usize, len: usize, kind: MentionKind) -> Self {
    Self { start, len, kind }
  }

  /// One past the last char covered by this span.
  pub fn end(&self) -> usize {
    self.start + self.len
  }

  pub fn overlaps(&self, other: &MentionSpan) -> bool {
    self.start < other.end() && other.start < self.end()
  }
}

impl PartialOrd for MentionSpan {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for MentionSpan {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    (self.start, self.len, self.kind.rank()).cmp(&(other.start, other.len, other.kind.rank()))
  }
}

/// Which directory user suggestions are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
  /// Members of a single channel.
  Members(ChannelId),
  /// The whole workspace directory.
  Directory,
}

/// Immutable per-draft configuration.
#[derive(Debug, Clone)]
pub struct DraftConfig {
  /// The channel this draft will be sent to.
  pub channel:          ChannelId,
  /// Scope for user suggestion lookups.
  pub user_scope:       SearchScope,
  /// Maximum results requested per suggestion lookup, per kind.
  pub suggestion_limit: usize,
  /// Whether edits drive the typing-notification sink.
  pub notify_typing:    bool,
}

impl DraftConfig {
  pub fn new(channel: ChannelId) -> Self {
    Self {
      user_scope: SearchScope::Members(channel.clone()),
      channel,
      suggestion_limit: 10,
      notify_typing: true,
    }
  }

  pub fn with_scope(mut self, scope: SearchScope) -> Self {
    self.user_scope = scope;
    self
  }

  pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
    self.suggestion_limit = limit;
    self
  }

  pub fn without_typing_notifications(mut self) -> Self {
    self.notify_typing = false;
    self
  }
}

/// Reference to an earlier message quoted by this draft. Opaque to the
/// editing engine; only the channel is inspected, when attaching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedMessage {
  pub id:      String,
  pub channel: ChannelId,
}

/// A file carried along with the draft. Opaque to the editing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
  pub name:       String,
  pub media_type: String,
}

/// Immutable view of the draft handed to the send boundary.
#[derive(Debug, Clone)]
pub struct DraftSnapshot {
  pub text:   String,
  pub spans:  Vec<MentionSpan>,
  pub quoted: Option<QuotedMessage>,
  pub files:  Vec<FileAttachment>,
}
