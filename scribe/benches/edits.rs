//! Benchmarks for span remapping and whole-text diffing.
//!
//! Run with: `cargo bench -p scribe --bench edits`

use divan::{
  Bencher,
  black_box,
};
use ropey::Rope;
use scribe::{
  diff,
  span::SpanSet,
  types::{
    MentionKind,
    MentionSpan,
    UserId,
  },
};

fn main() {
  divan::main();
}

fn make_text(words: usize) -> String {
  let mut s = String::new();
  for i in 0..words {
    if i % 7 == 0 {
      s.push_str(&format!("@user{i} "));
    } else {
      s.push_str("lorem ");
    }
  }
  s
}

fn make_spans(count: usize, stride: usize) -> SpanSet {
  (0..count)
    .map(|i| {
      MentionSpan::new(
        i * stride,
        stride / 2,
        MentionKind::User(UserId::new(format!("u{i}"))),
      )
    })
    .collect()
}

#[divan::bench(args = [8, 64, 512])]
fn span_remap_insert(bencher: Bencher, count: usize) {
  let spans = make_spans(count, 10);
  bencher.bench(|| {
    let mut spans = spans.clone();
    for offset in [0usize, 25, 250, 2500] {
      spans.map_insert(black_box(offset), 4);
    }
    spans
  });
}

#[divan::bench(args = [8, 64, 512])]
fn span_remap_remove(bencher: Bencher, count: usize) {
  let spans = make_spans(count, 10);
  bencher.bench(|| {
    let mut spans = spans.clone();
    for offset in [0usize, 25, 250, 2500] {
      spans.map_remove(black_box(offset), 4);
    }
    spans
  });
}

#[divan::bench(args = [32, 256, 2048])]
fn whole_text_diff(bencher: Bencher, words: usize) {
  let before = Rope::from(make_text(words));
  let mut after = make_text(words);
  after.insert_str(after.len() / 2, "something new in the middle ");
  bencher.bench(|| diff::compare(black_box(&before), black_box(&after)));
}
