//! Deciding which projects a change history invalidates.

use std::collections::{BTreeMap, BTreeSet};

use crate::changes::{ChangeStatus, Changeset};
use crate::core::{Output, Stage};
use crate::project::{matches_prefix, Project};
use crate::steps::StepRegistry;

/// Collects the files touched since the project's stored output for a stage
/// was last valid.
///
/// `history` must be most-recent-first. The walk stops at the first revision
/// the stored output was produced for; everything older is already covered.
/// For files touched in several revisions the most recent status wins.
#[must_use]
pub fn relevant_changes(
    stored: Option<&Output>,
    history: &[&Changeset],
) -> BTreeMap<String, ChangeStatus> {
    let mut relevant = BTreeMap::new();
    for changeset in history {
        if stored.is_some_and(|output| output.is_valid_for_revision(&changeset.sha)) {
            break;
        }
        for (file, status) in changeset.iter() {
            relevant.entry(file.to_string()).or_insert(status);
        }
    }
    relevant
}

/// Path prefixes whose changes invalidate `project` for `stage`.
///
/// Always contains the project's own root and the dependencies declared for
/// `stage`. With a registry, dependencies of every other stage whose step
/// produces the artifact this stage's step requires are added as well.
#[must_use]
pub fn invalidating_prefixes<'a>(
    project: &'a Project,
    stage: Stage,
    registry: Option<&StepRegistry>,
) -> BTreeSet<&'a str> {
    let mut prefixes: BTreeSet<&str> = BTreeSet::new();
    prefixes.insert(project.root_path.as_str());
    prefixes.extend(project.dependencies.for_stage(stage).iter().map(String::as_str));

    let Some(registry) = registry else {
        return prefixes;
    };
    let required = project
        .step_for(stage)
        .and_then(|step| registry.required_artifact(stage, step))
        .filter(|artifact_type| !artifact_type.is_none());
    let Some(required) = required else {
        return prefixes;
    };

    for upstream in Stage::ALL.into_iter().filter(|s| *s != stage) {
        let produces_required = project
            .step_for(upstream)
            .and_then(|step| registry.produced_artifact(upstream, step))
            == Some(required);
        if produces_required {
            prefixes.extend(
                project
                    .dependencies
                    .for_stage(upstream)
                    .iter()
                    .map(String::as_str),
            );
        }
    }
    prefixes
}

/// Keeps the relevant changes that fall under any of `prefixes`.
#[must_use]
pub fn invalidating_changes(
    relevant: BTreeMap<String, ChangeStatus>,
    prefixes: &BTreeSet<&str>,
) -> BTreeMap<String, ChangeStatus> {
    relevant
        .into_iter()
        .filter(|(file, _)| prefixes.iter().any(|prefix| matches_prefix(file, prefix)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, ArtifactType};
    use crate::testing::RecordingStep;
    use std::sync::Arc;

    fn built_for(revision: &str) -> Output {
        Output::success("built").with_artifact(Artifact::new(
            ArtifactType::DockerImage,
            revision,
            "Docker Build",
            serde_json::Value::Null,
        ))
    }

    #[test]
    fn test_walk_stops_at_valid_revision() {
        let newest = Changeset::new("c3", 3, [("apps/a/new", ChangeStatus::Added)]);
        let middle = Changeset::new("c2", 2, [("apps/a/mid", ChangeStatus::Modified)]);
        let oldest = Changeset::new("c1", 1, [("apps/a/old", ChangeStatus::Modified)]);
        let history = [&newest, &middle, &oldest];

        let stored = built_for("c2");
        let relevant = relevant_changes(Some(&stored), &history);
        assert_eq!(relevant.keys().collect::<Vec<_>>(), vec!["apps/a/new"]);

        let all = relevant_changes(None, &history);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_failed_output_does_not_stop_walk() {
        let newest = Changeset::new("c2", 2, [("apps/a/x", ChangeStatus::Added)]);
        let oldest = Changeset::new("c1", 1, [("apps/a/y", ChangeStatus::Added)]);
        let mut stored = built_for("c2");
        stored.success = false;

        let relevant = relevant_changes(Some(&stored), &[&newest, &oldest]);
        assert_eq!(relevant.len(), 2);
    }

    #[test]
    fn test_most_recent_status_wins() {
        let newest = Changeset::new("c2", 2, [("apps/a/x", ChangeStatus::Deleted)]);
        let oldest = Changeset::new("c1", 1, [("apps/a/x", ChangeStatus::Added)]);
        let relevant = relevant_changes(None, &[&newest, &oldest]);
        assert_eq!(relevant.get("apps/a/x"), Some(&ChangeStatus::Deleted));
    }

    #[test]
    fn test_prefixes_without_registry() {
        let project = Project::new("b", "apps/b/deployment/project.json")
            .with_step(Stage::Build, "Docker Build")
            .with_step(Stage::Deploy, "Helm Deploy")
            .with_dependencies(Stage::Build, ["libs/shared"]);

        let build = invalidating_prefixes(&project, Stage::Build, None);
        assert_eq!(build, BTreeSet::from(["apps/b", "libs/shared"]));

        let deploy = invalidating_prefixes(&project, Stage::Deploy, None);
        assert_eq!(deploy, BTreeSet::from(["apps/b"]));
    }

    #[test]
    fn test_prefixes_follow_required_artifact_producer() {
        let project = Project::new("b", "apps/b/deployment/project.json")
            .with_step(Stage::Build, "Docker Build")
            .with_step(Stage::Test, "Unit Tests")
            .with_step(Stage::Deploy, "Helm Deploy")
            .with_dependencies(Stage::Build, ["libs/shared"])
            .with_dependencies(Stage::Test, ["libs/testkit"]);
        let registry = StepRegistry::new()
            .with_step(Arc::new(
                RecordingStep::new("Docker Build", Stage::Build).producing(ArtifactType::DockerImage),
            ))
            .with_step(Arc::new(
                RecordingStep::new("Unit Tests", Stage::Test).producing(ArtifactType::JunitTests),
            ))
            .with_step(Arc::new(
                RecordingStep::new("Helm Deploy", Stage::Deploy).requiring(ArtifactType::DockerImage),
            ));

        let deploy = invalidating_prefixes(&project, Stage::Deploy, Some(&registry));
        assert_eq!(deploy, BTreeSet::from(["apps/b", "libs/shared"]));

        let test = invalidating_prefixes(&project, Stage::Test, Some(&registry));
        assert_eq!(test, BTreeSet::from(["apps/b", "libs/testkit"]));
    }

    #[test]
    fn test_invalidating_changes_filter() {
        let relevant: BTreeMap<_, _> = [
            ("apps/b/src/main.rs".to_string(), ChangeStatus::Modified),
            ("docs/readme.md".to_string(), ChangeStatus::Modified),
            ("libs/shared-utils/x.py".to_string(), ChangeStatus::Added),
            ("libs/shared/x.py".to_string(), ChangeStatus::Added),
        ]
        .into_iter()
        .collect();
        let prefixes = BTreeSet::from(["apps/b", "libs/shared"]);

        let invalidating = invalidating_changes(relevant, &prefixes);
        assert_eq!(
            invalidating.keys().collect::<Vec<_>>(),
            vec!["apps/b/src/main.rs", "libs/shared-utils/x.py", "libs/shared/x.py"]
        );
    }
}
