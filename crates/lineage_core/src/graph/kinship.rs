//! Vietnamese kinship terms (xưng hô) derived from relationship paths.
//!
//! # Responsibility
//! - Classify a shortest path by generation delta, direct line and side.
//! - Look up the term B is called from A's point of view.
//! - Compose in-law and spouse-relative terms for paths through marriage.
//!
//! # Invariants
//! - The side of a collateral relative is set by the first parent step:
//!   a mother gives the maternal (ngoại) side, anyone else the paternal (nội).
//! - Birth order is decided by generation number first, then birth year.
//! - Same person, unknown ids and unrelated persons yield no result.
//!
//! # See also
//! - graph::path

use crate::graph::path::{find_relationship_path, PathEdge, PathStep};
use crate::graph::GraphNode;
use crate::model::person::{Gender, Person, PersonId};
use log::debug;
use serde::{Deserialize, Serialize};

/// Family side a relative belongs to, seen from the starting person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinshipSide {
    /// Own parents, children, siblings and their descendants.
    Direct,
    /// Father's side (nội).
    Paternal,
    /// Mother's side (ngoại).
    Maternal,
}

/// Shape of the blood part of a relationship path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAnalysis {
    /// Parent steps minus child steps.
    pub generation_delta: i32,
    pub side: KinshipSide,
    /// Only upward or only downward steps.
    pub is_direct_line: bool,
    /// Person where the path turns from climbing to descending.
    pub common_ancestor: Option<PersonId>,
    /// First parent reached, if the path climbs at all.
    pub first_parent: Option<PersonId>,
}

/// Term B is called from A's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinshipResult {
    pub term: String,
    /// Persons visited after A, ending with B.
    pub path: Vec<PersonId>,
    pub description: String,
}

const MARRIAGE_RELATIVE: &str = "Họ hàng (qua hôn nhân)";

/// Spouse term by the spouse's own gender.
pub fn spouse_term(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Chồng",
        Gender::Female => "Vợ",
        Gender::Other | Gender::Unknown => "Vợ/Chồng",
    }
}

/// Looks up the blood kinship term for a relative of `gender`.
///
/// `is_older` compares the relative with A (same generation) or with A's
/// parent (uncles and aunts); terms that do not depend on birth order ignore
/// it. Collateral descendants fall back to direct-line terms. Beyond five
/// generations a counted ancestor or descendant term is returned.
pub fn lookup_kinship_term(
    generation_delta: i32,
    side: KinshipSide,
    gender: Gender,
    is_older: Option<bool>,
) -> Option<String> {
    let found = table_lookup(generation_delta, side, gender, is_older).or_else(|| {
        if side != KinshipSide::Direct && generation_delta < 0 {
            table_lookup(generation_delta, KinshipSide::Direct, gender, is_older)
        } else {
            None
        }
    });
    if let Some(term) = found {
        return Some(term.to_string());
    }
    if generation_delta > 5 {
        Some(format!("Tổ tiên {generation_delta} đời"))
    } else if generation_delta < -5 {
        Some(format!("Hậu duệ {} đời", generation_delta.unsigned_abs()))
    } else {
        None
    }
}

fn table_lookup(
    generation_delta: i32,
    side: KinshipSide,
    gender: Gender,
    is_older: Option<bool>,
) -> Option<&'static str> {
    is_older
        .and_then(|older| ranked_term(generation_delta, side, gender, older))
        .or_else(|| plain_term(generation_delta, side, gender))
}

/// Terms that do not depend on birth order.
fn plain_term(generation_delta: i32, side: KinshipSide, gender: Gender) -> Option<&'static str> {
    use Gender::{Female, Male};
    use KinshipSide::{Direct, Maternal, Paternal};

    let term = match (generation_delta, side, gender) {
        (1, Direct, Male) => "Cha",
        (1, Direct, Female) => "Mẹ",
        (1, Maternal, Male) => "Cậu",
        (2, Paternal, Male) => "Ông nội",
        (2, Paternal, Female) => "Bà nội",
        (2, Maternal, Male) => "Ông ngoại",
        (2, Maternal, Female) => "Bà ngoại",
        (3, Paternal, Male) => "Cụ ông nội",
        (3, Paternal, Female) => "Cụ bà nội",
        (3, Maternal, Male) => "Cụ ông ngoại",
        (3, Maternal, Female) => "Cụ bà ngoại",
        (4, Paternal, Male) => "Kỵ ông nội",
        (4, Paternal, Female) => "Kỵ bà nội",
        (4, Maternal, Male) => "Kỵ ông ngoại",
        (4, Maternal, Female) => "Kỵ bà ngoại",
        (5, Paternal, Male) => "Ông Sơ nội",
        (5, Paternal, Female) => "Bà Sơ nội",
        (5, Maternal, Male) => "Ông Sơ ngoại",
        (5, Maternal, Female) => "Bà Sơ ngoại",
        (-1, Direct, Male) => "Con trai",
        (-1, Direct, Female) => "Con gái",
        (-1, Paternal | Maternal, Male) | (-2, Direct, Male) => "Cháu trai",
        (-1, Paternal | Maternal, Female) | (-2, Direct, Female) => "Cháu gái",
        (-3, Direct, Male) => "Chắt trai",
        (-3, Direct, Female) => "Chắt gái",
        (-4, Direct, Male) => "Chút trai",
        (-4, Direct, Female) => "Chút gái",
        (-5, Direct, Male) => "Chít trai",
        (-5, Direct, Female) => "Chít gái",
        _ => return None,
    };
    Some(term)
}

/// Terms split by whether the relative is older.
fn ranked_term(
    generation_delta: i32,
    side: KinshipSide,
    gender: Gender,
    older: bool,
) -> Option<&'static str> {
    use Gender::{Female, Male};
    use KinshipSide::{Direct, Maternal, Paternal};

    let term = match (generation_delta, side, gender, older) {
        (0, Direct, Male, true) => "Anh",
        (0, Direct, Female, true) => "Chị",
        (0, Direct, Male, false) => "Em trai",
        (0, Direct, Female, false) => "Em gái",
        (0, Paternal, Male, true) => "Anh họ (nội)",
        (0, Paternal, Female, true) => "Chị họ (nội)",
        (0, Paternal, Male, false) => "Em họ trai (nội)",
        (0, Paternal, Female, false) => "Em họ gái (nội)",
        (0, Maternal, Male, true) => "Anh họ (ngoại)",
        (0, Maternal, Female, true) => "Chị họ (ngoại)",
        (0, Maternal, Male, false) => "Em họ trai (ngoại)",
        (0, Maternal, Female, false) => "Em họ gái (ngoại)",
        (1, Paternal, Male, true) => "Bác trai",
        (1, Paternal, Male, false) => "Chú",
        (1, Paternal | Maternal, Female, true) => "Bác gái",
        (1, Paternal, Female, false) => "Cô",
        (1, Maternal, Female, false) => "Dì",
        _ => return None,
    };
    Some(term)
}

/// Term for the spouse of a blood relative called `blood_term`.
fn in_law_term(blood_term: &str, spouse_gender: Gender) -> String {
    let term = match blood_term {
        "Con trai" => "Con dâu",
        "Con gái" => "Con rể",
        "Anh" => "Chị dâu",
        "Chị" => "Anh rể",
        "Em trai" => "Em dâu",
        "Em gái" => "Em rể",
        "Chú" => "Thím",
        "Cậu" => "Mợ",
        "Cô" | "Dì" => "Dượng",
        "Bác trai" => "Bác gái",
        "Bác gái" => "Bác trai",
        "Cháu trai" => "Cháu dâu",
        "Cháu gái" => "Cháu rể",
        other => return format!("{} của {other}", spouse_term(spouse_gender)),
    };
    term.to_string()
}

/// Term for a blood relative (called `blood_term` by the spouse) of A's
/// spouse of `spouse_gender`.
fn spouse_relative_term(blood_term: &str, spouse_gender: Gender) -> String {
    let suffix = match spouse_gender {
        Gender::Male => "chồng",
        Gender::Female => "vợ",
        Gender::Other | Gender::Unknown => "bên vợ/chồng",
    };
    let base = match blood_term {
        "Cha" => "Bố",
        other => other,
    };
    format!("{base} {suffix}")
}

/// Classifies the blood steps of a path starting at `start`.
///
/// Spouse steps are skipped. The path stays a direct line while it only
/// climbs or only descends; the first turn from climbing to descending marks
/// the common ancestor.
pub fn analyze_path(nodes: &[GraphNode], start: PersonId, steps: &[PathStep]) -> PathAnalysis {
    let mut generation_delta = 0;
    let mut going_up = true;
    let mut is_direct_line = true;
    let mut common_ancestor = None;
    let mut first_parent = None;
    let mut climbed = 0;
    let mut previous = start;

    for step in steps {
        match step.edge {
            PathEdge::Spouse => {}
            PathEdge::Parent => {
                generation_delta += 1;
                climbed += 1;
                first_parent.get_or_insert(step.person_id);
                if !going_up {
                    is_direct_line = false;
                }
            }
            PathEdge::Child => {
                if going_up {
                    going_up = false;
                    if climbed > 0 {
                        is_direct_line = false;
                        common_ancestor = Some(previous);
                    }
                }
                generation_delta -= 1;
            }
        }
        previous = step.person_id;
    }

    let siblings = climbed == 1 && generation_delta == 0 && common_ancestor.is_some();
    let side = match first_parent {
        Some(_) if siblings => KinshipSide::Direct,
        Some(parent) if !is_direct_line || generation_delta >= 2 => side_of(nodes, parent),
        _ => KinshipSide::Direct,
    };

    PathAnalysis {
        generation_delta,
        side,
        is_direct_line,
        common_ancestor,
        first_parent,
    }
}

fn person_of(nodes: &[GraphNode], id: PersonId) -> Option<&Person> {
    nodes.iter().find(|node| node.id == id).map(|node| &node.data)
}

fn side_of(nodes: &[GraphNode], parent: PersonId) -> KinshipSide {
    let mother = person_of(nodes, parent).is_some_and(|person| person.gender == Gender::Female);
    if mother {
        KinshipSide::Maternal
    } else {
        KinshipSide::Paternal
    }
}

/// Whether `b` is older than `a`: generation number first, then birth year.
pub fn is_older(a: &Person, b: &Person) -> Option<bool> {
    match (a.generation_number, b.generation_number) {
        (Some(gen_a), Some(gen_b)) if gen_a != gen_b => return Some(gen_b < gen_a),
        _ => {}
    }
    match (a.birth_year(), b.birth_year()) {
        (Some(year_a), Some(year_b)) => Some(year_b < year_a),
        _ => None,
    }
}

/// Blood term for `relative` seen from `start` along `steps`; `None` when
/// the steps pass through a marriage.
fn blood_term(
    nodes: &[GraphNode],
    start: &Person,
    relative: &Person,
    steps: &[PathStep],
) -> Option<String> {
    if steps.iter().any(|step| step.edge == PathEdge::Spouse) {
        return None;
    }
    let analysis = analyze_path(nodes, start.id, steps);
    let older = match analysis.generation_delta {
        0 => is_older(start, relative),
        1 if !analysis.is_direct_line && steps.len() >= 2 => analysis
            .first_parent
            .and_then(|parent| person_of(nodes, parent))
            .and_then(|mediator| is_older(mediator, relative)),
        _ => None,
    };
    lookup_kinship_term(analysis.generation_delta, analysis.side, relative.gender, older)
}

/// Kinship term of `b` from `a`'s point of view.
///
/// Paths ending in a marriage name the spouse of a blood relative; paths
/// starting with one name a relative of A's spouse. Any other marriage on the
/// path, or a blood relative without a table entry, gives a generic relative.
pub fn calculate_kinship(nodes: &[GraphNode], a: PersonId, b: PersonId) -> Option<KinshipResult> {
    if a == b {
        return None;
    }
    let path = find_relationship_path(nodes, a, b)?;
    let person_a = person_of(nodes, a)?;
    let person_b = person_of(nodes, b)?;

    let steps = &path.steps;
    let starts_married = steps.first().is_some_and(|step| step.edge == PathEdge::Spouse);
    let ends_married = steps.last().is_some_and(|step| step.edge == PathEdge::Spouse);

    let (term, generic) = if steps.len() == 1 && starts_married {
        (spouse_term(person_b.gender).to_string(), false)
    } else if starts_married && ends_married {
        (MARRIAGE_RELATIVE.to_string(), true)
    } else if ends_married {
        let blood = &steps[..steps.len() - 1];
        let relative = blood.last().and_then(|step| person_of(nodes, step.person_id))?;
        match blood_term(nodes, person_a, relative, blood) {
            Some(term) => (in_law_term(&term, person_b.gender), false),
            None => (MARRIAGE_RELATIVE.to_string(), true),
        }
    } else if starts_married {
        let spouse = person_of(nodes, steps[0].person_id)?;
        match blood_term(nodes, spouse, person_b, &steps[1..]) {
            Some(term) => (spouse_relative_term(&term, spouse.gender), false),
            None => (MARRIAGE_RELATIVE.to_string(), true),
        }
    } else {
        match blood_term(nodes, person_a, person_b, steps) {
            Some(term) => (term, false),
            None if path.through_marriage() => (MARRIAGE_RELATIVE.to_string(), true),
            None => (
                format!("Họ hàng ({} đời)", path.generation_delta.unsigned_abs()),
                true,
            ),
        }
    };

    let (name_a, name_b) = (person_a.full_name(), person_b.full_name());
    let description = if generic {
        format!("{name_b} là họ hàng của {name_a}")
    } else {
        format!("{name_b} là {term} của {name_a}")
    };
    debug!(
        "event=kinship module=graph status=ok steps={} generic={}",
        steps.len(),
        generic
    );

    Some(KinshipResult {
        term,
        path: steps.iter().map(|step| step.person_id).collect(),
        description,
    })
}
