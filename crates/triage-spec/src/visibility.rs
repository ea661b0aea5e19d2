use std::collections::{BTreeMap, BTreeSet};

use crate::answers::AnswerSet;
use crate::spec::form::FormSpec;

pub type HiddenSet = BTreeSet<String>;

/// Question key -> keys whose visibility must be recomputed when it changes.
pub type DependentsMap = BTreeMap<String, BTreeSet<String>>;

/// Full recompute: every question whose display condition is false.
pub fn resolve_hidden(form: &FormSpec, answers: &AnswerSet) -> HiddenSet {
    form.questions()
        .filter(|question| !question.is_visible(answers))
        .map(|question| question.key.clone())
        .collect()
}

/// Declared `dependents` merged with the questions whose display condition
/// reads the key.
pub fn dependents_map(form: &FormSpec) -> DependentsMap {
    let mut map = DependentsMap::new();
    for question in form.questions() {
        map.entry(question.key.clone())
            .or_default()
            .extend(question.dependents.iter().cloned());
        if let Some(condition) = &question.display_condition {
            for key in condition.question_keys() {
                map.entry(key.to_string())
                    .or_default()
                    .insert(question.key.clone());
            }
        }
    }
    map
}

/// Partial recompute for the dependents of `changed`.
pub fn refresh_dependents(
    form: &FormSpec,
    dependents: &DependentsMap,
    changed: &str,
    answers: &AnswerSet,
    hidden: &mut HiddenSet,
) {
    let Some(keys) = dependents.get(changed) else {
        return;
    };
    for key in keys {
        let Some(question) = form.question(key) else {
            continue;
        };
        if question.is_visible(answers) {
            hidden.remove(key);
        } else {
            hidden.insert(key.clone());
        }
    }
}
