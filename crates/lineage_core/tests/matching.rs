use lineage_core::matching::matcher::{candidates, score_pair};
use lineage_core::{
    match_persons, match_persons_with_policy, FlexibleDate, Gender, MatchField, MatchPolicy,
    Person,
};
use uuid::Uuid;

fn person(
    lineage: Uuid,
    family: &str,
    given: &str,
    gender: Gender,
    birth_year: Option<i32>,
    generation: Option<i32>,
) -> Person {
    let mut person = Person::new(lineage, given);
    person.family_name = Some(family.to_string());
    person.gender = gender;
    person.birth_date = birth_year.map(FlexibleDate::solar_year);
    person.generation_number = generation;
    person
}

#[test]
fn near_duplicate_root_is_proposed_once() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let a = person(primary_tree, "Nguyễn", "An", Gender::Male, Some(1920), Some(1));
    let a_dup = person(other_tree, "Nguyen", "An", Gender::Male, Some(1920), Some(1));
    let b = person(other_tree, "Nguyen", "Binh", Gender::Male, Some(1950), Some(2));
    let c = person(other_tree, "Tran", "Cuc", Gender::Female, Some(1952), Some(2));
    let primary = vec![a.clone()];
    let others = vec![a_dup.clone(), b, c];

    let results = match_persons(&candidates(&primary), &candidates(&others));

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.primary_namespaced_id, a.namespaced_id());
    assert_eq!(result.candidate_namespaced_id, a_dup.namespaced_id());
    assert!(result.score >= MatchPolicy::default().threshold);
    assert!(result.matched_on.contains(&MatchField::Name));
    assert!(result.matched_on.contains(&MatchField::BirthYear));
}

#[test]
fn each_person_appears_in_at_most_one_result() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let twin_one = person(primary_tree, "Le", "Hoa", Gender::Female, Some(1960), Some(3));
    let twin_two = person(primary_tree, "Le", "Hoa", Gender::Female, Some(1960), Some(3));
    let other = person(other_tree, "Le", "Hoa", Gender::Female, Some(1960), Some(3));
    let primary = vec![twin_one, twin_two];
    let others = vec![other.clone()];

    let results = match_persons(&candidates(&primary), &candidates(&others));

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].candidate_namespaced_id, other.namespaced_id());
}

#[test]
fn repeated_runs_yield_identical_results() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let primary: Vec<Person> = ["An", "Binh", "Cuc", "Dung"]
        .iter()
        .map(|name| person(primary_tree, "Pham", name, Gender::Unknown, None, None))
        .collect();
    let others: Vec<Person> = ["An", "Binh", "Cuong", "Dung"]
        .iter()
        .map(|name| person(other_tree, "Pham", name, Gender::Unknown, None, None))
        .collect();

    let first = match_persons(&candidates(&primary), &candidates(&others));
    let second = match_persons(&candidates(&primary), &candidates(&others));

    assert_eq!(first, second);
    for pair in first.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn mismatched_known_genders_are_never_proposed() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let husband = person(primary_tree, "Vo", "Minh", Gender::Male, Some(1940), Some(2));
    let wife = person(other_tree, "Vo", "Minh", Gender::Female, Some(1940), Some(2));

    assert!(score_pair(&husband, &wife, &MatchPolicy::default()).is_none());
    let results = match_persons(
        &candidates(std::slice::from_ref(&husband)),
        &candidates(std::slice::from_ref(&wife)),
    );
    assert!(results.is_empty());
}

#[test]
fn unknown_birth_year_is_neutral() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let dated = person(primary_tree, "Do", "Lan", Gender::Female, Some(1930), Some(1));
    let undated = person(other_tree, "Do", "Lan", Gender::Female, None, Some(1));

    let pair = score_pair(&dated, &undated, &MatchPolicy::default()).unwrap();

    assert!(pair.score >= MatchPolicy::default().threshold);
    assert!(!pair.matched_on.contains(&MatchField::BirthYear));
}

#[test]
fn generation_gap_lowers_score_without_excluding() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let base = person(primary_tree, "Ho", "Tam", Gender::Male, Some(1900), Some(1));
    let same_generation = person(other_tree, "Ho", "Tam", Gender::Male, Some(1900), Some(1));
    let far_generation = person(other_tree, "Ho", "Tam", Gender::Male, Some(1900), Some(9));
    let policy = MatchPolicy::default();

    let close = score_pair(&base, &same_generation, &policy).unwrap();
    let far = score_pair(&base, &far_generation, &policy).unwrap();

    assert!(far.score < close.score);
    assert!(far.score >= policy.threshold);
}

#[test]
fn persons_of_the_same_lineage_are_never_paired() {
    let tree = Uuid::new_v4();
    let first = person(tree, "Bui", "Khoa", Gender::Male, Some(1970), Some(4));
    let second = person(tree, "Bui", "Khoa", Gender::Male, Some(1970), Some(4));

    let results = match_persons(
        &candidates(std::slice::from_ref(&first)),
        &candidates(std::slice::from_ref(&second)),
    );

    assert!(results.is_empty());
}

#[test]
fn stricter_threshold_filters_weak_pairs() {
    let primary_tree = Uuid::new_v4();
    let other_tree = Uuid::new_v4();
    let a = person(primary_tree, "Dang", "Quang", Gender::Male, Some(1910), Some(1));
    let b = person(other_tree, "Dang", "Quang", Gender::Male, Some(1912), Some(1));
    let strict = MatchPolicy {
        threshold: 0.99,
        ..MatchPolicy::default()
    };

    let default_results = match_persons(
        &candidates(std::slice::from_ref(&a)),
        &candidates(std::slice::from_ref(&b)),
    );
    let strict_results = match_persons_with_policy(
        &candidates(std::slice::from_ref(&a)),
        &candidates(std::slice::from_ref(&b)),
        &strict,
    );

    assert_eq!(default_results.len(), 1);
    assert!(strict_results.is_empty());
}
