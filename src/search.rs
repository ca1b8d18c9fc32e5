//! Typo-tolerant text search.
//!
//! A field matches a query when any of these holds, checked in order:
//!
//! 1. the query is a substring of the lowercased field,
//! 2. some word token of the field is similar enough to the query,
//! 3. (queries of 4+ chars) some query-length window of the field is similar
//!    enough to the query.
//!
//! Similarity is the Ratcliff/Obershelp ratio `2 * M / T`, where `M` is the
//! total size of the matching blocks and `T` the combined length of both strings.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Similarity a token or window needs to count as a match
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Queries shorter than this skip the sliding-window pass
const MIN_WINDOW_QUERY_LEN: usize = 4;

/// Candidates at least this long ignore characters that are too frequent to anchor a match
const POPULAR_MIN_LEN: usize = 200;

fn word_pattern() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

/// Matching-blocks similarity of `a` against `b`, in `[0, 1]`.
///
/// Two empty strings are identical (ratio 1).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = BlockMatcher::new(a, b).matched_len();
    2.0 * matched as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest common block within `a[alo..ahi]` and `b[blo..bhi]`,
    /// earliest in `a` (then in `b`) on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        // run length of the match ending at b[j], for the previous row of `a`
        let mut run_by_j: HashMap<usize, usize> = HashMap::new();
        for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(ch) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let run = j
                        .checked_sub(1)
                        .and_then(|prev| run_by_j.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run.insert(j, run);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            run_by_j = next_run;
        }

        // Popular characters never anchor a block but may still extend one.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    /// Total length of all matching blocks.
    fn matched_len(&self) -> usize {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            matched += size;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                pending.push((i + size, ahi, j + size, bhi));
            }
        }

        matched
    }
}

/// Whether `value` matches an already-lowercased `query`.
///
/// An empty query matches everything; callers treat a blank query as "no filter".
pub fn matches(value: &str, query: &str, threshold: f64) -> bool {
    let value = value.to_lowercase();

    if value.contains(query) {
        return true;
    }

    let query_chars: Vec<char> = query.chars().collect();

    for token in word_pattern().find_iter(&value) {
        let token: Vec<char> = token.as_str().chars().collect();
        if ratio_chars(&query_chars, &token) >= threshold {
            return true;
        }
    }

    let value_chars: Vec<char> = value.chars().collect();
    if query_chars.len() >= MIN_WINDOW_QUERY_LEN && value_chars.len() >= query_chars.len() {
        for window in value_chars.windows(query_chars.len()) {
            if ratio_chars(&query_chars, window) >= threshold {
                return true;
            }
        }
    }

    false
}

/// A record whose text fields take part in search.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Cow<'_, str>>;
}

/// Whether any field of `record` matches an already-normalized query.
pub fn record_matches<T: Searchable + ?Sized>(record: &T, query: &str, threshold: f64) -> bool {
    record
        .search_fields()
        .iter()
        .any(|field| matches(field, query, threshold))
}

/// Lowercase and trim a raw user query.
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Records matching `query` on any field, in input order.
///
/// A blank query applies no filter.
pub fn search_records<'a, T: Searchable>(records: &'a [T], query: &str, threshold: f64) -> Vec<&'a T> {
    let query = normalize_query(query);
    if query.is_empty() {
        return records.iter().collect();
    }

    let found: Vec<&T> = records
        .iter()
        .filter(|record| record_matches(*record, &query, threshold))
        .collect();
    tracing::debug!(query = %query, total = records.len(), matched = found.len(), "search");
    found
}
