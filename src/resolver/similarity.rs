//! Weighted-ratio string similarity on a 0-100 scale.
//!
//! `WeightedRatio` follows the well-known WRatio definition: plain Indel ratio,
//! token-sort and token-set ratios, and partial (best window) variants scaled
//! down as the length difference grows. LCS lengths use the bit-parallel
//! algorithm for needles up to 64 chars.

/// Pluggable similarity scorer used by the entity resolver
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of `query` to `choice`, 0.0 to 100.0
    fn score(&self, query: &str, choice: &str) -> f64;
}

/// Default scorer
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedRatio;

impl SimilarityScorer for WeightedRatio {
    fn score(&self, query: &str, choice: &str) -> f64 {
        wratio(query, choice)
    }
}

const UNBASE_SCALE: f64 = 0.95;

pub fn wratio(s1: &str, s2: &str) -> f64 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (len1, len2) = (a.len() as f64, b.len() as f64);
    let len_ratio = if len1 > len2 { len1 / len2 } else { len2 / len1 };

    let end_ratio = indel_ratio(&a, &b);
    if len_ratio < 1.5 {
        return end_ratio.max(token_ratio(s1, s2) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let end_ratio = end_ratio.max(partial_ratio_chars(&a, &b) * partial_scale);
    end_ratio.max(partial_token_ratio(s1, s2) * UNBASE_SCALE * partial_scale)
}

/// Normalized Indel similarity
pub fn ratio(s1: &str, s2: &str) -> f64 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    indel_ratio(&a, &b)
}

fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let lensum = a.len() + b.len();
    if lensum == 0 {
        return 100.0;
    }
    let dist = lensum - 2 * lcs_len(a, b);
    norm_sim(dist, lensum)
}

fn norm_sim(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        100.0
    } else {
        100.0 - 100.0 * dist as f64 / lensum as f64
    }
}

fn indel_distance(a: &[char], b: &[char]) -> usize {
    a.len() + b.len() - 2 * lcs_len(a, b)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }
    if short.len() <= 64 {
        lcs_bit_parallel(short, long)
    } else {
        lcs_dp(short, long)
    }
}

// Hyyrö's bit-vector LCS: one word per char of `needle`.
fn lcs_bit_parallel(needle: &[char], haystack: &[char]) -> usize {
    let mut masks: Vec<(char, u64)> = Vec::new();
    for (i, c) in needle.iter().enumerate() {
        match masks.iter_mut().find(|(m, _)| m == c) {
            Some((_, bits)) => *bits |= 1u64 << i,
            None => masks.push((*c, 1u64 << i)),
        }
    }
    let width_mask = if needle.len() == 64 { u64::MAX } else { (1u64 << needle.len()) - 1 };
    let mut s = u64::MAX;
    for c in haystack {
        let m = masks.iter().find(|(mc, _)| mc == c).map(|(_, b)| *b).unwrap_or(0);
        let u = s & m;
        s = s.wrapping_add(u) | (s.wrapping_sub(u));
    }
    (!s & width_mask).count_ones() as usize
}

fn lcs_dp(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { cur[j].max(prev[j + 1]) };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Best Indel ratio of the shorter string against every alignment window of the longer one
pub fn partial_ratio(s1: &str, s2: &str) -> f64 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    partial_ratio_chars(&a, &b)
}

fn partial_ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let m = short.len();
    let n = long.len();
    let mut best: f64 = 0.0;

    // Windows partially hanging off the left edge
    for k in 1..m {
        best = best.max(indel_ratio(short, &long[..k.min(n)]));
    }
    for start in 0..=(n - m) {
        best = best.max(indel_ratio(short, &long[start..start + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    // ... and off the right edge
    for k in 1..m {
        best = best.max(indel_ratio(short, &long[n - k.min(n)..]));
    }
    best
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn token_set(s: &str) -> Vec<&str> {
    let mut tokens = sorted_tokens(s);
    tokens.dedup();
    tokens
}

pub fn token_sort_ratio(s1: &str, s2: &str) -> f64 {
    ratio(&sorted_tokens(s1).join(" "), &sorted_tokens(s2).join(" "))
}

pub fn token_set_ratio(s1: &str, s2: &str) -> f64 {
    let a = token_set(s1);
    let b = token_set(s2);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersect: Vec<&str> = a.iter().copied().filter(|t| b.contains(t)).collect();
    let diff_ab: Vec<&str> = a.iter().copied().filter(|t| !b.contains(t)).collect();
    let diff_ba: Vec<&str> = b.iter().copied().filter(|t| !a.contains(t)).collect();

    if !intersect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined: Vec<char> = diff_ab.join(" ").chars().collect();
    let diff_ba_joined: Vec<char> = diff_ba.join(" ").chars().collect();
    let ab_len = diff_ab_joined.len();
    let ba_len = diff_ba_joined.len();
    let sect_len = intersect.join(" ").chars().count();
    let sep = usize::from(sect_len != 0);

    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    let dist = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let result = norm_sim(dist, sect_ab_len + sect_ba_len);
    if sect_len == 0 {
        return result;
    }

    let sect_ab_ratio = norm_sim(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = norm_sim(sep + ba_len, sect_len + sect_ba_len);
    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

fn token_ratio(s1: &str, s2: &str) -> f64 {
    token_sort_ratio(s1, s2).max(token_set_ratio(s1, s2))
}

pub fn partial_token_ratio(s1: &str, s2: &str) -> f64 {
    let set_a = token_set(s1);
    let set_b = token_set(s2);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    // A shared word is a full partial match
    if set_a.iter().any(|t| set_b.contains(t)) {
        return 100.0;
    }
    partial_ratio(&sorted_tokens(s1).join(" "), &sorted_tokens(s2).join(" "))
}
