use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod diff;
pub mod draft;
pub mod render;
pub mod scan;
pub mod span;
pub mod suggest;
pub mod types;

pub type Tendril = SmartString<LazyCompact>;

pub use draft::{
  DraftError,
  MessageDraft,
  TypingSink,
};
pub use suggest::{
  Suggestion,
  SuggestionPass,
  SuggestionProvider,
};
