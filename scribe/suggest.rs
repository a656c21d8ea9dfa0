//! Asynchronous suggestion lookups for unresolved mention tokens.
//!
//! Each unresolved token gets its own lookup against the configured
//! provider; lookups for one revalidation pass run concurrently and a
//! failed lookup degrades to an empty candidate list for that token only.
//! Results are cached per draft, keyed by the matched text, until the next
//! buffer mutation.

use std::{
  collections::{
    BTreeMap,
    HashMap,
  },
  sync::Arc,
};

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::{
  scan::MentionMatch,
  types::{
    Channel,
    DraftConfig,
    SearchScope,
    User,
  },
};

/// External directory/search boundary. Implementations must be
/// side-effect-free and are expected to be idempotent for the same prefix
/// within a short window, since results may be cached by the draft.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
  async fn search_users(
    &self,
    scope: SearchScope,
    prefix: &str,
    limit: usize,
  ) -> anyhow::Result<Vec<User>>;

  async fn search_channels(&self, prefix: &str, limit: usize) -> anyhow::Result<Vec<Channel>>;
}

/// A candidate offered for an unresolved token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
  User(User),
  Channel(Channel),
}

impl Candidate {
  /// The name shown (and inserted) when this candidate is accepted.
  pub fn display_name(&self) -> &str {
    match self {
      Candidate::User(user) => &user.display_name,
      Candidate::Channel(channel) => &channel.name,
    }
  }
}

/// A candidate tied back to the token it was looked up for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
  /// Char offset of the token's marker character.
  pub anchor_start: usize,
  /// The matched token, marker included.
  pub matched_text: String,
  pub candidate:    Candidate,
}

/// The outcome of one `revalidate` pass, tagged with the draft revision the
/// pass started at.
///
/// `unresolved` lists every scanned token without an attached span, keyed
/// by start offset; `suggestions` holds candidate lists for the subset of
/// those tokens long enough to be worth a lookup.
///
/// In-flight lookups are never cancelled, so a pass may complete after the
/// buffer has changed again. Callers compare `revision` against
/// `MessageDraft::revision` and discard stale passes.
#[derive(Debug, Default)]
pub struct SuggestionPass {
  pub revision:    u64,
  pub unresolved:  BTreeMap<usize, String>,
  pub suggestions: BTreeMap<usize, Vec<Suggestion>>,
}

/// What a lookup task searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupKind {
  Users,
  Channels,
}

/// Resolves unresolved matches to candidate lists, one lookup per unique
/// matched text. `cache` is the draft's instance-scoped result table.
pub(crate) async fn resolve_matches(
  provider: &Arc<dyn SuggestionProvider>,
  config: &DraftConfig,
  cache: &mut HashMap<String, Vec<Candidate>>,
  kind: LookupKind,
  matches: Vec<(MentionMatch, String)>,
) -> BTreeMap<usize, Vec<Suggestion>> {
  // One lookup per unique token text; every offset sharing the text gets
  // the same candidates.
  let mut offsets_by_text: HashMap<String, Vec<usize>> = HashMap::new();
  for (m, text) in matches {
    offsets_by_text.entry(text).or_default().push(m.start);
  }

  let mut lookups: JoinSet<(String, anyhow::Result<Vec<Candidate>>)> = JoinSet::new();
  for text in offsets_by_text.keys() {
    if cache.contains_key(text) {
      continue;
    }

    let provider = Arc::clone(provider);
    let text = text.clone();
    // The marker is not part of the search prefix.
    let prefix: String = text.chars().skip(1).collect();
    let scope = config.user_scope.clone();
    let limit = config.suggestion_limit;

    lookups.spawn(async move {
      let result = match kind {
        LookupKind::Users => {
          provider
            .search_users(scope, &prefix, limit)
            .await
            .map(|users| users.into_iter().map(Candidate::User).collect())
        },
        LookupKind::Channels => {
          provider
            .search_channels(&prefix, limit)
            .await
            .map(|channels| channels.into_iter().map(Candidate::Channel).collect())
        },
      };
      (text, result)
    });
  }

  while let Some(joined) = lookups.join_next().await {
    let Ok((text, result)) = joined else {
      // A panicked lookup task; nothing to attribute it to.
      tracing::warn!("suggestion lookup task failed to join");
      continue;
    };

    let candidates = match result {
      Ok(candidates) => candidates,
      Err(err) => {
        tracing::warn!(token = %text, "suggestion lookup failed: {err:#}");
        Vec::new()
      },
    };
    cache.insert(text, candidates);
  }

  let mut out = BTreeMap::new();
  for (text, offsets) in offsets_by_text {
    let candidates = cache.entry(text.clone()).or_default();
    for start in offsets {
      let suggestions = candidates
        .iter()
        .map(|candidate| Suggestion {
          anchor_start: start,
          matched_text: text.clone(),
          candidate:    candidate.clone(),
        })
        .collect();
      out.insert(start, suggestions);
    }
  }

  out
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use super::*;
  use crate::types::{
    ChannelId,
    UserId,
  };

  struct FakeProvider {
    user_calls: AtomicUsize,
    fail_users: bool,
  }

  impl FakeProvider {
    fn new() -> Self {
      Self {
        user_calls: AtomicUsize::new(0),
        fail_users: false,
      }
    }
  }

  #[async_trait]
  impl SuggestionProvider for FakeProvider {
    async fn search_users(
      &self,
      _scope: SearchScope,
      prefix: &str,
      limit: usize,
    ) -> anyhow::Result<Vec<User>> {
      self.user_calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_users {
        anyhow::bail!("directory unavailable");
      }
      Ok(
        vec![User {
          id:           UserId::new(format!("u-{prefix}")),
          display_name: format!("{prefix}ia"),
        }]
        .into_iter()
        .take(limit)
        .collect(),
      )
    }

    async fn search_channels(&self, prefix: &str, limit: usize) -> anyhow::Result<Vec<Channel>> {
      Ok(
        vec![Channel {
          id:   ChannelId::new(format!("c-{prefix}")),
          name: prefix.to_string(),
        }]
        .into_iter()
        .take(limit)
        .collect(),
      )
    }
  }

  fn config() -> DraftConfig {
    DraftConfig::new(ChannelId::from("ch1"))
  }

  fn matches_for(tokens: &[(usize, &str)]) -> Vec<(MentionMatch, String)> {
    tokens
      .iter()
      .map(|&(start, text)| {
        (
          MentionMatch {
            start,
            len: text.chars().count(),
            marker: text.chars().next().unwrap(),
          },
          text.to_string(),
        )
      })
      .collect()
  }

  #[tokio::test]
  async fn lookups_are_keyed_by_offset() {
    let provider: Arc<dyn SuggestionProvider> = Arc::new(FakeProvider::new());
    let mut cache = HashMap::new();

    let out = resolve_matches(
      &provider,
      &config(),
      &mut cache,
      LookupKind::Users,
      matches_for(&[(0, "@maria"), (10, "@markus")]),
    )
    .await;

    assert_eq!(out.len(), 2);
    assert_eq!(out[&0][0].matched_text, "@maria");
    assert_eq!(out[&0][0].anchor_start, 0);
    assert_eq!(out[&10][0].matched_text, "@markus");
    match &out[&10][0].candidate {
      Candidate::User(user) => assert_eq!(user.id, UserId::from("u-markus")),
      other => panic!("expected user candidate, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn duplicate_tokens_share_one_lookup() {
    let fake = Arc::new(FakeProvider::new());
    let provider: Arc<dyn SuggestionProvider> = fake.clone();
    let mut cache = HashMap::new();

    let out = resolve_matches(
      &provider,
      &config(),
      &mut cache,
      LookupKind::Users,
      matches_for(&[(0, "@maria"), (20, "@maria")]),
    )
    .await;

    assert_eq!(out.len(), 2);
    assert_eq!(fake.user_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn cache_short_circuits_lookups() {
    let fake = Arc::new(FakeProvider::new());
    let provider: Arc<dyn SuggestionProvider> = fake.clone();
    let mut cache = HashMap::new();

    for _ in 0..2 {
      let out = resolve_matches(
        &provider,
        &config(),
        &mut cache,
        LookupKind::Users,
        matches_for(&[(0, "@maria")]),
      )
      .await;
      assert_eq!(out[&0].len(), 1);
    }

    assert_eq!(fake.user_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failed_lookup_yields_empty_list() {
    let provider: Arc<dyn SuggestionProvider> = Arc::new(FakeProvider {
      user_calls: AtomicUsize::new(0),
      fail_users: true,
    });
    let mut cache = HashMap::new();

    let out = resolve_matches(
      &provider,
      &config(),
      &mut cache,
      LookupKind::Users,
      matches_for(&[(0, "@maria")]),
    )
    .await;

    assert_eq!(out[&0], Vec::new());
  }
}
