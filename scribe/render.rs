//! Rendering final message text into a typed element sequence.
//!
//! This is a pure, synchronous pass over finalized metadata, run at send
//! time; it does not consult the live span store. Text links are excised
//! into single anchor characters before whitespace tokenization so a link
//! whose display text contains spaces survives as one unit. Mentions and
//! channel references are matched by their token's start offset in the
//! original text; a stored display name containing spaces consumes that
//! many extra tokens, and whatever the consumed text carries beyond the
//! name (usually trailing punctuation) is put back as plain text.

use std::collections::HashMap;

use scribe_core::link::{
  is_plain_link,
  split_link_trailer,
};

use crate::types::{
  ChannelId,
  UserId,
};

/// Placeholder substituted for an excised text-link run. U+FFFC is the
/// object replacement character and cannot appear in chat text.
const LINK_ANCHOR: char = '\u{FFFC}';

/// A resolved user mention, keyed by the char offset of its `@` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMention {
  pub start:   usize,
  pub user:    UserId,
  pub display: String,
}

/// A resolved channel reference, keyed by the char offset of its `#` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChannel {
  pub start:   usize,
  pub channel: ChannelId,
  pub display: String,
}

/// An explicit text link covering `start..end` (char offsets) of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
  pub start: usize,
  pub end:   usize,
  pub url:   String,
}

/// One display element of the rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageElement {
  Text(String),
  Mention { user: UserId, display: String },
  ChannelRef { channel: ChannelId, display: String },
  TextLink { url: String, text: String },
  PlainLink(String),
}

/// Converts final text plus resolved metadata into display elements.
///
/// Adjacent plain-text runs are merged and a single trailing all-whitespace
/// element is trimmed from the end.
pub fn render_elements(
  text: &str,
  mentions: &[RenderedMention],
  channels: &[RenderedChannel],
  links: &[RenderedLink],
) -> Vec<MessageElement> {
  let chars: Vec<char> = text.chars().collect();

  // Excise link ranges into single anchor chars; `work` keeps each char
  // paired with its offset in the original text.
  let mut sorted_links: Vec<&RenderedLink> = links.iter().collect();
  sorted_links.sort_by_key(|link| link.start);

  let mut work: Vec<(char, usize)> = Vec::with_capacity(chars.len());
  let mut link_queue: Vec<(String, String)> = Vec::new(); // (url, display text)
  let mut pos = 0;
  for link in sorted_links {
    if link.start < pos || link.end > chars.len() || link.start >= link.end {
      // Malformed metadata; leave the covered text as plain.
      continue;
    }
    work.extend((pos..link.start).map(|idx| (chars[idx], idx)));
    let display: String = chars[link.start..link.end].iter().collect();
    link_queue.push((link.url.clone(), display));
    work.push((LINK_ANCHOR, link.start));
    pos = link.end;
  }
  work.extend((pos..chars.len()).map(|idx| (chars[idx], idx)));

  let mention_index: HashMap<usize, &RenderedMention> =
    mentions.iter().map(|m| (m.start, m)).collect();
  let channel_index: HashMap<usize, &RenderedChannel> =
    channels.iter().map(|c| (c.start, c)).collect();

  Emitter {
    work: &work,
    tokens: tokenize(&work),
    link_queue,
    mention_index,
    channel_index,
    elements: Vec::new(),
    pending: String::new(),
  }
  .run()
}

fn tokenize(work: &[(char, usize)]) -> Vec<std::ops::Range<usize>> {
  let mut tokens = Vec::new();
  let mut start = None;
  for (i, &(ch, _)) in work.iter().enumerate() {
    if ch.is_whitespace() {
      if let Some(s) = start.take() {
        tokens.push(s..i);
      }
    } else if start.is_none() {
      start = Some(i);
    }
  }
  if let Some(s) = start {
    tokens.push(s..work.len());
  }
  tokens
}

struct Emitter<'a> {
  work:          &'a [(char, usize)],
  tokens:        Vec<std::ops::Range<usize>>,
  link_queue:    Vec<(String, String)>,
  mention_index: HashMap<usize, &'a RenderedMention>,
  channel_index: HashMap<usize, &'a RenderedChannel>,
  elements:      Vec<MessageElement>,
  pending:       String,
}

impl Emitter<'_> {
  fn run(mut self) -> Vec<MessageElement> {
    let mut next_link = 0;
    let mut cursor = 0;
    let mut t = 0;

    while t < self.tokens.len() {
      let token = self.tokens[t].clone();
      self.push_chars(cursor..token.start);

      let token_str: String = self.work[token.clone()].iter().map(|&(c, _)| c).collect();
      let orig_start = self.work[token.start].1;

      if token_str.contains(LINK_ANCHOR) {
        self.emit_link_token(&token_str, &mut next_link);
        cursor = token.end;
        t += 1;
        continue;
      }

      match token_str.chars().next() {
        Some('@') if self.mention_index.contains_key(&orig_start) => {
          let mention = self.mention_index[&orig_start];
          let (user, display) = (mention.user.clone(), mention.display.clone());
          let last = self.consume_name_tokens(t, &display);
          let consumed = self.token_run_text(t, last);
          self.emit_reference(
            MessageElement::Mention {
              user,
              display: display.clone(),
            },
            &consumed,
            &format!("@{display}"),
          );
          cursor = self.tokens[last].end;
          t = last + 1;
          continue;
        },
        Some('#') if self.channel_index.contains_key(&orig_start) => {
          let channel = self.channel_index[&orig_start];
          let (id, display) = (channel.channel.clone(), channel.display.clone());
          let last = self.consume_name_tokens(t, &display);
          let consumed = self.token_run_text(t, last);
          self.emit_reference(
            MessageElement::ChannelRef {
              channel: id,
              display: display.clone(),
            },
            &consumed,
            &format!("#{display}"),
          );
          cursor = self.tokens[last].end;
          t = last + 1;
          continue;
        },
        _ => {},
      }

      let (head, trailer) = split_link_trailer(&token_str);
      if !head.is_empty() && is_plain_link(head) {
        self.flush();
        self.elements.push(MessageElement::PlainLink(head.to_string()));
        if let Some(trailer) = trailer {
          self.pending.push_str(trailer);
        }
      } else {
        self.pending.push_str(&token_str);
      }

      cursor = token.end;
      t += 1;
    }

    self.push_chars(cursor..self.work.len());
    self.flush();

    // A single trailing all-whitespace element is dropped.
    if matches!(
      self.elements.last(),
      Some(MessageElement::Text(text)) if text.chars().all(char::is_whitespace)
    ) {
      self.elements.pop();
    }

    self.elements
  }

  /// How far the token run for a multi-word display name extends: one token
  /// per whitespace-separated word of the name, bounded by the available
  /// tokens. Returns the index of the last consumed token.
  fn consume_name_tokens(&self, first: usize, display: &str) -> usize {
    let extra = display.split_whitespace().count().saturating_sub(1);
    (first + extra).min(self.tokens.len() - 1)
  }

  /// The working text from the start of token `first` through the end of
  /// token `last`, inner whitespace included.
  fn token_run_text(&self, first: usize, last: usize) -> String {
    self.work[self.tokens[first].start..self.tokens[last].end]
      .iter()
      .map(|&(c, _)| c)
      .collect()
  }

  /// Emits a mention/channel element, then diffs what was actually consumed
  /// against the expected `marker + name` text: anything past the common
  /// prefix (trailing punctuation, or a diverging tail) stays plain.
  fn emit_reference(&mut self, element: MessageElement, consumed: &str, expected: &str) {
    self.flush();
    self.elements.push(element);

    let matched = consumed
      .chars()
      .zip(expected.chars())
      .take_while(|(a, b)| a == b)
      .count();
    self.pending.extend(consumed.chars().skip(matched));
  }

  fn emit_link_token(&mut self, token_str: &str, next_link: &mut usize) {
    for (i, part) in token_str.split(LINK_ANCHOR).enumerate() {
      if i > 0 {
        let (url, text) = self.link_queue[*next_link].clone();
        *next_link += 1;
        self.flush();
        self.elements.push(MessageElement::TextLink { url, text });
      }
      self.pending.push_str(part);
    }
  }

  fn push_chars(&mut self, range: std::ops::Range<usize>) {
    self
      .pending
      .extend(self.work[range].iter().map(|&(c, _)| c));
  }

  fn flush(&mut self) {
    if !self.pending.is_empty() {
      let text = std::mem::take(&mut self.pending);
      self.elements.push(MessageElement::Text(text));
    }
  }
}
