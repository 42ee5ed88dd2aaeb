//! Cross-lineage duplicate detection.
//!
//! # Responsibility
//! - Score candidate person pairs from two pools by weighted field closeness.
//! - Assign at most one partner per person, greedily, best scores first.
//!
//! # Invariants
//! - Known, different genders never match.
//! - Missing fields are neutral; they lower confidence but never exclude.
//! - Output is deterministic: identical inputs give identical results.
//! - Results are proposals only; nothing here applies them.

use crate::matching::normalize::name_similarity;
use crate::model::person::{Gender, LineageId, NamespacedId, Person};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tunable scoring policy.
///
/// Weights are relative; the aggregate score is normalized by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Minimum aggregate score for a pair to be proposed.
    pub threshold: f64,
    pub name_weight: f64,
    pub birth_year_weight: f64,
    pub gender_weight: f64,
    pub generation_weight: f64,
    /// Birth years at most this far apart earn partial credit.
    pub birth_year_tolerance: i32,
    /// Generation gap at which generation closeness reaches zero.
    pub generation_tolerance: i32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            name_weight: 0.55,
            birth_year_weight: 0.25,
            gender_weight: 0.10,
            generation_weight: 0.10,
            birth_year_tolerance: 2,
            generation_tolerance: 3,
        }
    }
}

/// One side of a comparison: a person scoped to its source lineage.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub person: &'a Person,
    pub lineage_id: LineageId,
    pub namespaced_id: NamespacedId,
}

impl<'a> MatchCandidate<'a> {
    pub fn from_person(person: &'a Person) -> Self {
        Self {
            person,
            lineage_id: person.lineage_id,
            namespaced_id: person.namespaced_id(),
        }
    }
}

/// Builds candidates for every person of one lineage.
pub fn candidates(persons: &[Person]) -> Vec<MatchCandidate<'_>> {
    persons.iter().map(MatchCandidate::from_person).collect()
}

/// Field that contributed positively to a proposed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Name,
    BirthYear,
    Gender,
    Generation,
}

/// Proposed identity pairing, pending human confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub primary_namespaced_id: NamespacedId,
    pub candidate_namespaced_id: NamespacedId,
    pub score: f64,
    pub matched_on: Vec<MatchField>,
}

/// Per-field breakdown of one pair's score.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub score: f64,
    pub name: f64,
    pub birth_year: f64,
    pub gender: f64,
    pub generation: f64,
    pub matched_on: Vec<MatchField>,
}

const NAME_MATCH_FLOOR: f64 = 0.8;
const NEUTRAL: f64 = 0.5;

/// Scores one pair; `None` when genders exclude the pair.
pub fn score_pair(a: &Person, b: &Person, policy: &MatchPolicy) -> Option<PairScore> {
    let gender = gender_score(a.gender, b.gender)?;
    let name = name_similarity(&a.full_name(), &b.full_name());
    let birth_year = birth_year_score(a.birth_year(), b.birth_year(), policy);
    let generation = generation_score(a.generation_number, b.generation_number, policy);

    let total_weight = policy.name_weight
        + policy.birth_year_weight
        + policy.gender_weight
        + policy.generation_weight;
    let score = if total_weight > 0.0 {
        (policy.name_weight * name
            + policy.birth_year_weight * birth_year
            + policy.gender_weight * gender
            + policy.generation_weight * generation)
            / total_weight
    } else {
        0.0
    };

    let mut matched_on = Vec::new();
    if name >= NAME_MATCH_FLOOR {
        matched_on.push(MatchField::Name);
    }
    if let (Some(left), Some(right)) = (a.birth_year(), b.birth_year()) {
        if within(left, right, policy.birth_year_tolerance) {
            matched_on.push(MatchField::BirthYear);
        }
    }
    if a.gender.is_known() && a.gender == b.gender {
        matched_on.push(MatchField::Gender);
    }
    if a.generation_number.is_some() && a.generation_number == b.generation_number {
        matched_on.push(MatchField::Generation);
    }

    Some(PairScore {
        score: score.clamp(0.0, 1.0),
        name,
        birth_year,
        gender,
        generation,
        matched_on,
    })
}

/// Proposes duplicates between `primary` and `others` with the default policy.
pub fn match_persons(
    primary: &[MatchCandidate<'_>],
    others: &[MatchCandidate<'_>],
) -> Vec<MatchResult> {
    match_persons_with_policy(primary, others, &MatchPolicy::default())
}

/// Proposes duplicates between `primary` and `others`.
///
/// Pairs inside the same lineage are never compared. Results are ordered by
/// descending score; each namespaced id appears in at most one result.
pub fn match_persons_with_policy(
    primary: &[MatchCandidate<'_>],
    others: &[MatchCandidate<'_>],
    policy: &MatchPolicy,
) -> Vec<MatchResult> {
    let mut scored: Vec<MatchResult> = Vec::new();
    for left in primary {
        for right in others {
            if left.lineage_id == right.lineage_id || left.namespaced_id == right.namespaced_id {
                continue;
            }
            let Some(pair) = score_pair(left.person, right.person, policy) else {
                continue;
            };
            if pair.score < policy.threshold {
                continue;
            }
            scored.push(MatchResult {
                primary_namespaced_id: left.namespaced_id,
                candidate_namespaced_id: right.namespaced_id,
                score: pair.score,
                matched_on: pair.matched_on,
            });
        }
    }
    let considered = scored.len();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.primary_namespaced_id.cmp(&b.primary_namespaced_id))
            .then_with(|| a.candidate_namespaced_id.cmp(&b.candidate_namespaced_id))
    });

    let mut claimed: HashSet<NamespacedId> = HashSet::new();
    let mut results = Vec::new();
    for proposal in scored {
        if claimed.contains(&proposal.primary_namespaced_id)
            || claimed.contains(&proposal.candidate_namespaced_id)
        {
            continue;
        }
        claimed.insert(proposal.primary_namespaced_id);
        claimed.insert(proposal.candidate_namespaced_id);
        results.push(proposal);
    }

    info!(
        "event=match_persons module=matching status=ok primary={} others={} above_threshold={} emitted={}",
        primary.len(),
        others.len(),
        considered,
        results.len()
    );
    results
}

fn gender_score(a: Gender, b: Gender) -> Option<f64> {
    if !a.is_known() || !b.is_known() {
        return Some(NEUTRAL);
    }
    (a == b).then_some(1.0)
}

fn birth_year_score(a: Option<i32>, b: Option<i32>, policy: &MatchPolicy) -> f64 {
    match (a, b) {
        (Some(left), Some(right)) if left == right => 1.0,
        (Some(left), Some(right)) if within(left, right, policy.birth_year_tolerance) => 0.5,
        (Some(_), Some(_)) => 0.0,
        _ => NEUTRAL,
    }
}

fn generation_score(a: Option<i32>, b: Option<i32>, policy: &MatchPolicy) -> f64 {
    match (a, b) {
        (Some(left), Some(right)) => {
            let tolerance = policy.generation_tolerance.max(1) as f64;
            let gap = f64::from(left.abs_diff(right));
            (1.0 - gap / tolerance).max(0.0)
        }
        _ => NEUTRAL,
    }
}

/// Whether two years lie at most `tolerance` apart; a negative tolerance
/// only admits equal years.
fn within(left: i32, right: i32, tolerance: i32) -> bool {
    left.abs_diff(right) <= tolerance.max(0).unsigned_abs()
}
