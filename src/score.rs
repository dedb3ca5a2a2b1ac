//! Similarity scoring of a query spectrum against a reference library.
//!
//! Every query/reference pair is resampled onto the shared overlap of
//! their axes at a fixed resolution, then compared under three
//! complementary metrics:
//!
//! - Pearson correlation of the resampled intensities, range [-1, 1];
//! - cosine similarity of the resampled intensities, range [-1, 1];
//! - squared cosine similarity of the first differences (SFEC), range
//!   [0, 1], which rewards peak-shape agreement regardless of any
//!   baseline offset.
//!
//! A batch run never aborts on a single bad entry: each library entry
//! produces either a score triple or a recorded failure, and failed
//! entries score 0.0 in the ranking vectors.

use crate::library::ReferenceLibrary;
use crate::resample::{resample, InterpolationError};
use crate::spectrum::Spectrum;

/// Grid step used when comparing two spectra, in axis units.
pub const DEFAULT_RESOLUTION: f64 = 0.5;

/// How many candidates each ranked list carries.
pub const TOP_CANDIDATES: usize = 10;

/// One similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Squared first-difference cosine similarity.
    Sfec,
    /// Cosine similarity of raw intensities.
    Cosine,
    /// Pearson correlation coefficient.
    Pearson,
}

impl Metric {
    /// Report order: shape agreement first, plain correlation last.
    pub const ALL: [Metric; 3] = [Metric::Sfec, Metric::Cosine, Metric::Pearson];
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Sfec => write!(f, "SFEC"),
            Metric::Cosine => write!(f, "cosine"),
            Metric::Pearson => write!(f, "Pearson"),
        }
    }
}

/// Score triple for one query/reference pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScores {
    /// Pearson correlation coefficient.
    pub pearson: f64,
    /// Cosine similarity.
    pub cosine: f64,
    /// Squared first-difference cosine similarity.
    pub sfec: f64,
}

impl MatchScores {
    /// The value of one metric.
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Sfec => self.sfec,
            Metric::Cosine => self.cosine,
            Metric::Pearson => self.pearson,
        }
    }
}

/// Outcome for a single library entry in a batch run.
#[derive(Debug)]
pub struct EntryReport {
    /// Library entry key.
    pub key: String,
    /// Scores, or why the entry could not be compared.
    pub outcome: Result<MatchScores, InterpolationError>,
}

impl EntryReport {
    /// Metric value for ranking; failed entries score 0.0.
    pub fn score(&self, metric: Metric) -> f64 {
        match &self.outcome {
            Ok(scores) => scores.get(metric),
            Err(_) => 0.0,
        }
    }
}

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Library entry key.
    pub key: String,
    /// Metric value the ranking used.
    pub score: f64,
}

/// Batch scoring report, entries aligned with the library's key order.
#[derive(Debug, Default)]
pub struct MatchReport {
    entries: Vec<EntryReport>,
}

impl MatchReport {
    /// Per-entry outcomes in library order.
    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }

    /// Number of entries scored or failed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were processed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One metric's score vector, aligned with [`entries`](Self::entries).
    pub fn scores(&self, metric: Metric) -> Vec<f64> {
        self.entries.iter().map(|e| e.score(metric)).collect()
    }

    /// Entries that could not be compared, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &InterpolationError)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                Ok(_) => None,
                Err(err) => Some((e.key.as_str(), err)),
            })
    }

    /// The `limit` best candidates under one metric, descending; ties keep
    /// library order.
    pub fn top_candidates(&self, metric: Metric, limit: usize) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = self
            .entries
            .iter()
            .map(|e| Candidate {
                key: e.key.clone(),
                score: e.score(metric),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }

    /// Top candidate keys for every metric in [`Metric::ALL`] order,
    /// concatenated.
    pub fn ranked_keys(&self, limit: usize) -> Vec<String> {
        Metric::ALL
            .iter()
            .flat_map(|&metric| {
                self.top_candidates(metric, limit)
                    .into_iter()
                    .map(|candidate| candidate.key)
            })
            .collect()
    }
}

/// Compare one query/reference pair on their shared axis range.
pub fn score_pair(
    query: &Spectrum,
    reference: &Spectrum,
    resolution: f64,
) -> Result<MatchScores, InterpolationError> {
    let (query_lo, query_hi) = query.x_bounds();
    let (reference_lo, reference_hi) = reference.x_bounds();
    let xmin = query_lo.max(reference_lo);
    let xmax = query_hi.min(reference_hi);

    let (_, yq) = resample(query.x(), query.y(), xmin, xmax, resolution)?;
    let (_, yr) = resample(reference.x(), reference.y(), xmin, xmax, resolution)?;
    debug_assert_eq!(yq.len(), yr.len());

    let shape = cosine(&first_difference(&yq), &first_difference(&yr));
    Ok(MatchScores {
        pearson: pearson(&yq, &yr),
        cosine: cosine(&yq, &yr),
        sfec: (shape * shape).min(1.0),
    })
}

/// Score the query against every library entry.
///
/// Failures are recorded per entry and logged, never propagated; see the
/// module docs.
pub fn score_all(query: &Spectrum, library: &ReferenceLibrary, resolution: f64) -> MatchReport {
    let mut entries = Vec::with_capacity(library.len());
    for (key, reference) in library.iter() {
        let outcome = score_pair(query, reference, resolution);
        if let Err(err) = &outcome {
            log::warn!("cannot score {key}: {err}");
        }
        entries.push(EntryReport {
            key: key.to_string(),
            outcome,
        });
    }
    MatchReport { entries }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut numerator = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (ai, bi) in a.iter().zip(b) {
        let da = ai - mean_a;
        let db = bi - mean_b;
        numerator += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denominator = (var_a * var_b).sqrt();
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (ai, bi) in a.iter().zip(b) {
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }
    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        dot / denominator
    } else {
        0.0
    }
}

fn first_difference(v: &[f64]) -> Vec<f64> {
    v.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(center: f64) -> Spectrum {
        let x: Vec<f64> = (0..101).map(|i| 200.0 + 10.0 * f64::from(i)).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| 0.1 + (-((xi - center) / 40.0).powi(2)).exp())
            .collect();
        Spectrum::new(x, y).expect("spectrum")
    }

    fn library_of(entries: &[(&str, Spectrum)]) -> ReferenceLibrary {
        let mut library = ReferenceLibrary::new();
        for (key, spectrum) in entries {
            assert!(library.insert(key.to_string(), spectrum.clone()));
        }
        library
    }

    #[test]
    fn identical_spectra_score_one_everywhere() {
        let s = gaussian(500.0);
        let scores = score_pair(&s, &s, DEFAULT_RESOLUTION).expect("score");
        assert!((scores.pearson - 1.0).abs() < 1e-9);
        assert!((scores.cosine - 1.0).abs() < 1e-9);
        assert!((scores.sfec - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exact_copy_ranks_first_under_every_metric() {
        let query = gaussian(500.0);
        let library = library_of(&[
            ("match__780__R1", gaussian(500.0)),
            ("near__780__R2", gaussian(700.0)),
            ("far__780__R3", gaussian(900.0)),
        ]);

        let report = score_all(&query, &library, DEFAULT_RESOLUTION);
        for metric in Metric::ALL {
            let top = report.top_candidates(metric, TOP_CANDIDATES);
            assert_eq!(top[0].key, "match__780__R1", "metric {metric}");
        }
        let pearson = report.top_candidates(Metric::Pearson, 1)[0].score;
        let cosine = report.top_candidates(Metric::Cosine, 1)[0].score;
        assert!((pearson - 1.0).abs() < 1e-9);
        assert!((cosine - 1.0).abs() < 1e-9);
    }

    #[test]
    fn candidate_lists_are_bounded_and_drawn_from_the_library() {
        let query = gaussian(600.0);
        let entries: Vec<(String, Spectrum)> = (0..15)
            .map(|i| {
                (
                    format!("mineral{i}__780__R{i}"),
                    gaussian(300.0 + 50.0 * f64::from(i)),
                )
            })
            .collect();
        let mut library = ReferenceLibrary::new();
        for (key, spectrum) in &entries {
            library.insert(key.clone(), spectrum.clone());
        }

        let report = score_all(&query, &library, DEFAULT_RESOLUTION);
        assert_eq!(report.len(), 15);
        for metric in Metric::ALL {
            let top = report.top_candidates(metric, TOP_CANDIDATES);
            assert_eq!(top.len(), TOP_CANDIDATES);
            for candidate in &top {
                assert!(library.contains(&candidate.key));
            }
        }
        assert_eq!(report.ranked_keys(TOP_CANDIDATES).len(), 30);
    }

    #[test]
    fn disjoint_entry_fails_without_aborting_the_batch() {
        let query = gaussian(500.0);
        let offaxis_x: Vec<f64> = (0..20).map(|i| 5000.0 + 10.0 * f64::from(i)).collect();
        let offaxis_y = vec![1.0; 20];
        let library = library_of(&[
            ("good__780__R1", gaussian(520.0)),
            (
                "offaxis__780__R2",
                Spectrum::new(offaxis_x, offaxis_y).expect("spectrum"),
            ),
        ]);

        let report = score_all(&query, &library, DEFAULT_RESOLUTION);
        assert_eq!(report.len(), 2);

        let failed: Vec<&str> = report.failures().map(|(key, _)| key).collect();
        assert_eq!(failed, ["offaxis__780__R2"]);

        let scores = report.scores(Metric::Cosine);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn pearson_handles_degenerate_vectors() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
        let ramp = [1.0, 2.0, 3.0, 4.0];
        let flipped = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&ramp, &flipped) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_handles_zero_norms() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sfec_stays_in_unit_range_for_opposed_shapes() {
        let up = gaussian(500.0);
        let x: Vec<f64> = (0..101).map(|i| 200.0 + 10.0 * f64::from(i)).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| 2.0 - (-((xi - 500.0) / 40.0).powi(2)).exp())
            .collect();
        let dip = Spectrum::new(x, y).expect("spectrum");

        let scores = score_pair(&up, &dip, DEFAULT_RESOLUTION).expect("score");
        assert!(scores.sfec >= 0.0 && scores.sfec <= 1.0);
        assert!(scores.pearson < 0.0);
    }
}
