// mcdex-common/src/dependency/ordering.rs
use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::model::ModReference;

/// Orders references so every dependency comes before the references that
/// declare it. Ties are broken by manifest position, so the result only
/// depends on the manifest, never on resolution timing.
///
/// Returns indices into `references`. Members of a dependency cycle are
/// appended in manifest order after everything else.
pub fn install_order(references: &[ModReference]) -> Vec<usize> {
    let by_project: HashMap<u64, usize> = references
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.project_id.map(|id| (id, i)))
        .collect();

    let mut in_degree = vec![0usize; references.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); references.len()];

    for (index, reference) in references.iter().enumerate() {
        let Some(dependencies) = &reference.dependencies else {
            continue;
        };
        let mut seen = BTreeSet::new();
        for project_id in dependencies {
            match by_project.get(project_id) {
                Some(&dep_index) if dep_index != index && seen.insert(dep_index) => {
                    dependents[dep_index].push(index);
                    in_degree[index] += 1;
                }
                Some(_) => {}
                None => debug!(
                    "{} depends on project {} which is not in the manifest",
                    reference.display_name(),
                    project_id
                ),
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..references.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(references.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != references.len() {
        let stuck: Vec<usize> = (0..references.len())
            .filter(|&i| in_degree[i] > 0)
            .collect();
        warn!(
            "Dependency cycle between {}; installing them in manifest order",
            stuck
                .iter()
                .map(|&i| references[i].display_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        order.extend(stuck);
    }
    order
}
