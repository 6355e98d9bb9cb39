//! String similarity measures for fuzzy patient matching.
//!
//! All functions expect input already passed through
//! [`super::normalize::normalize_name`]. Scores are in [0, 1].

/// Weight of the blended full-name similarity in the composite score.
const W_NAME: f32 = 0.80;
/// Weight of the exact-word overlap ratio.
const W_OVERLAP: f32 = 0.15;
/// Weight of the word-order similarity.
const W_ORDER: f32 = 0.05;

/// Additive bonus when an extracted national ID matches the candidate.
const BONUS_NATIONAL_ID: f32 = 0.10;
/// Additive bonus for a matching birth date.
const BONUS_BIRTH_DATE: f32 = 0.05;
/// Additive bonus for a matching phone suffix.
const BONUS_PHONE_SUFFIX: f32 = 0.02;

/// Compute Levenshtein edit distance between two strings.
pub fn edit_distance(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n as u32;
    }
    if n == 0 {
        return m as u32;
    }

    let mut prev: Vec<u32> = (0..=n as u32).collect();
    let mut curr = vec![0u32; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Edit-distance similarity over whole strings: `1 - dist / max_len`.
pub fn char_similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f32 / max_len as f32
}

/// Word-level similarity: each word of the shorter side is matched against
/// its best counterpart on the other side, averaged. Tolerates reordered
/// name parts ("yilmaz ayse" vs "ayse yilmaz").
pub fn word_similarity(a: &str, b: &str) -> f32 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.is_empty() && b_words.is_empty() {
        return 1.0;
    }
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }

    let best_against = |from: &[&str], to: &[&str]| -> f32 {
        let sum: f32 = from
            .iter()
            .map(|w| {
                to.iter()
                    .map(|other| char_similarity(w, other))
                    .fold(0.0f32, f32::max)
            })
            .sum();
        sum / from.len() as f32
    };

    (best_against(&a_words, &b_words) + best_against(&b_words, &a_words)) / 2.0
}

/// Blended full-name similarity: average of the edit-distance measure and
/// the word-level measure.
pub fn name_similarity(a: &str, b: &str) -> f32 {
    (char_similarity(a, b) + word_similarity(a, b)) / 2.0
}

/// Ratio of exactly shared words to the larger word count.
pub fn word_overlap_ratio(a: &str, b: &str) -> f32 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let max_words = a_words.len().max(b_words.len());
    if max_words == 0 {
        return 0.0;
    }
    let shared = a_words.iter().filter(|w| b_words.contains(w)).count();
    shared as f32 / max_words as f32
}

/// How well the words the two names share keep their relative order.
/// 1.0 when every shared word appears in the same sequence on both sides.
pub fn word_order_similarity(a: &str, b: &str) -> f32 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let shared: Vec<&str> = a_words
        .iter()
        .filter(|w| b_words.contains(w))
        .copied()
        .collect();
    if shared.is_empty() {
        return 0.0;
    }

    let order_in_b: Vec<&str> = b_words
        .iter()
        .filter(|w| shared.contains(w))
        .copied()
        .collect();
    let in_order = shared
        .iter()
        .zip(order_in_b.iter())
        .filter(|(x, y)| x == y)
        .count();
    in_order as f32 / shared.len() as f32
}

/// Secondary signals that raise a candidate's composite score.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalBonuses {
    pub national_id: bool,
    pub birth_date: bool,
    pub phone_suffix: bool,
}

impl SignalBonuses {
    fn total(&self) -> f32 {
        let mut bonus = 0.0;
        if self.national_id {
            bonus += BONUS_NATIONAL_ID;
        }
        if self.birth_date {
            bonus += BONUS_BIRTH_DATE;
        }
        if self.phone_suffix {
            bonus += BONUS_PHONE_SUFFIX;
        }
        bonus
    }
}

/// Weighted composite score for a directory candidate, clipped to [0, 1].
pub fn composite_score(extracted: &str, candidate: &str, bonuses: SignalBonuses) -> f32 {
    let score = W_NAME * name_similarity(extracted, candidate)
        + W_OVERLAP * word_overlap_ratio(extracted, candidate)
        + W_ORDER * word_order_similarity(extracted, candidate)
        + bonuses.total();
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("ayse", "ayse"), 0);
    }

    #[test]
    fn identical_names_score_one() {
        assert!((name_similarity("ayse yilmaz", "ayse yilmaz") - 1.0).abs() < f32::EPSILON);
        assert!((word_overlap_ratio("ayse yilmaz", "ayse yilmaz") - 1.0).abs() < f32::EPSILON);
        assert!((word_order_similarity("ayse yilmaz", "ayse yilmaz") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn reordered_words_keep_high_word_similarity() {
        let s = word_similarity("yilmaz ayse", "ayse yilmaz");
        assert!(s > 0.99, "got {s}");
        // but the order measure penalizes it
        assert!(word_order_similarity("yilmaz ayse", "ayse yilmaz") < 1.0);
    }

    #[test]
    fn unrelated_names_score_low() {
        let s = composite_score("ayse yilmaz", "hasan kaya", SignalBonuses::default());
        assert!(s < 0.4, "got {s}");
    }

    #[test]
    fn ocr_typo_still_scores_high() {
        let s = composite_score("ayse yilmas", "ayse yilmaz", SignalBonuses::default());
        assert!(s > 0.6, "got {s}");
    }

    #[test]
    fn bonuses_are_additive_and_clipped() {
        let base = composite_score("ayse yilmaz", "ayse yilmaz", SignalBonuses::default());
        let boosted = composite_score(
            "ayse yilmaz",
            "ayse yilmaz",
            SignalBonuses {
                national_id: true,
                birth_date: true,
                phone_suffix: true,
            },
        );
        assert!(boosted >= base);
        assert!(boosted <= 1.0);
    }

    #[test]
    fn empty_extracted_name_scores_zero_against_real_name() {
        let s = composite_score("", "ayse yilmaz", SignalBonuses::default());
        assert!(s < 0.1, "got {s}");
    }
}
