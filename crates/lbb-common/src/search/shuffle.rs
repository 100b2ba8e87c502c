//! Daily reproducible reordering of a result page.
//!
//! Candidates sharing a ranking key (same distance in km, or same stars)
//! form a bucket. Each bucket is permuted with a seed derived from the day
//! of the year, so a page looks the same all day long and different the next.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::filters::SortMode;
use super::gateway::MatchCandidate;
use crate::office::stars;

/// Ordered page of candidates as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedPage {
    pub candidates: Vec<MatchCandidate>,
}

impl RankedPage {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.candidates.iter()
    }
}

/// Fraction of the year in `(0, 1]`, used as a constant "random" draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuffleSeed(f64);

impl ShuffleSeed {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(f64::from(date.ordinal()) / 366.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Swap position for slot `i`, as a Fisher-Yates pass would draw it.
    fn pick(&self, i: usize) -> usize {
        // On Dec 31 of a leap year the seed is exactly 1.0.
        ((self.0 * (i + 1) as f64) as usize).min(i)
    }

    fn permute<T>(&self, bucket: &mut [T]) {
        for i in (1..bucket.len()).rev() {
            bucket.swap(i, self.pick(i));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketKey {
    Distance(u32),
    Boosted,
    Stars(u64),
}

fn bucket_key(candidate: &MatchCandidate, sort: SortMode, occupation_code: &str) -> BucketKey {
    match sort {
        SortMode::ByDistance => BucketKey::Distance(candidate.distance_km),
        SortMode::ByScore if candidate.is_boosted() => BucketKey::Boosted,
        SortMode::ByScore => {
            // Offices without a score for this occupation rank on their base score.
            let score = candidate
                .occupation_score
                .as_ref()
                .filter(|s| s.occupation_code == occupation_code)
                .map(|s| s.value)
                .unwrap_or(f64::from(candidate.score));
            BucketKey::Stars(stars(score).to_bits())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultShuffler {
    seed: ShuffleSeed,
}

impl ResultShuffler {
    pub fn new(seed: ShuffleSeed) -> Self {
        Self { seed }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(ShuffleSeed::from_date(date))
    }

    /// Groups candidates by ranking key, permutes every bucket and
    /// concatenates them back. In score mode manually boosted offices come
    /// first; every other bucket keeps the position of its first member.
    pub fn shuffle(
        &self,
        candidates: Vec<MatchCandidate>,
        sort: SortMode,
        occupation_code: &str,
    ) -> RankedPage {
        let mut buckets: Vec<(BucketKey, Vec<MatchCandidate>)> = Vec::new();
        for candidate in candidates {
            let key = bucket_key(&candidate, sort, occupation_code);
            match buckets.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, bucket)) => bucket.push(candidate),
                None => buckets.push((key, vec![candidate])),
            }
        }

        if let Some(position) = buckets
            .iter()
            .position(|(key, _)| *key == BucketKey::Boosted)
        {
            let boosted = buckets.remove(position);
            buckets.insert(0, boosted);
        }

        let candidates = buckets
            .into_iter()
            .flat_map(|(_, mut bucket)| {
                self.seed.permute(&mut bucket);
                bucket
            })
            .collect();

        RankedPage { candidates }
    }
}
