use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

use crate::jenkins::error::Result;

// Look here for docs
// https://www.jenkins.io/doc/book/using/remote-access-api/
// Every field has a zero default so sparse `tree=` responses still decode.

/// The server writes `null` for plenty of string fields; treat it as empty.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes any report payload (`/api/json`) into one of the types below.
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Running,
    Finished(BuildResult),
    /// Not building and no result yet.
    Pending,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Artifact {
    #[serde(rename = "displayPath", deserialize_with = "nullable")]
    pub display_path: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "relativePath")]
    pub relative_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScmAuthor {
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "absoluteUrl")]
    pub absolute_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScmChangeSetPath {
    #[serde(rename = "editType")]
    pub edit_type: String,
    #[serde(alias = "File")]
    pub file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ChangeSetItem {
    #[serde(rename = "affectedPaths")]
    pub affected_paths: Vec<String>,
    #[serde(rename = "commitId", deserialize_with = "nullable")]
    pub commit_id: String,
    pub timestamp: i64,
    pub author: ScmAuthor,
    #[serde(rename = "authorEmail", deserialize_with = "nullable")]
    pub author_email: String,
    #[serde(deserialize_with = "nullable")]
    pub comment: String,
    #[serde(deserialize_with = "nullable")]
    pub date: String,
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "msg", deserialize_with = "nullable")]
    pub message: String,
    pub paths: Vec<ScmChangeSetPath>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScmChangeSet {
    #[serde(deserialize_with = "nullable")]
    pub kind: String,
    pub items: Vec<ChangeSetItem>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Parameter {
    #[serde(rename = "_class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub name: String,
    /// String for most parameter types, bool for boolean parameters.
    pub value: Value,
}

impl Parameter {
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamCause {
    #[serde(rename = "_class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(rename = "shortDescription")]
    pub short_description: String,
    #[serde(rename = "upstreamBuild")]
    pub upstream_build: i64,
    #[serde(rename = "upstreamProject", deserialize_with = "nullable")]
    pub upstream_project: String,
    #[serde(rename = "upstreamUrl", deserialize_with = "nullable")]
    pub upstream_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Action {
    #[serde(rename = "_class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub parameters: Vec<Parameter>,
    pub causes: Vec<UpstreamCause>,
}

// Build entity docs:
// https://javadoc.jenkins.io/hudson/model/Run.html
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Build {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    pub number: i64,
    pub url: String,

    #[serde(rename = "displayName", deserialize_with = "nullable")]
    pub display_name: String,
    #[serde(rename = "fullDisplayName", deserialize_with = "nullable")]
    pub full_display_name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,

    pub timestamp: i64,
    pub duration: i64,
    #[serde(rename = "estimatedDuration")]
    pub estimated_duration: i64,

    pub building: bool,
    #[serde(rename = "keepLog")]
    pub keep_log: bool,
    pub result: Option<BuildResult>, // null while building

    pub artifacts: Vec<Artifact>,
    pub actions: Vec<Action>,

    #[serde(rename = "changeSet")]
    pub change_set: ScmChangeSet, // freestyle and maven builds
    #[serde(rename = "changeSets")]
    pub change_sets: Vec<ScmChangeSet>, // pipeline builds
}

impl Build {
    pub fn status(&self) -> BuildStatus {
        match (self.building, self.result) {
            (true, _) => BuildStatus::Running,
            (false, Some(result)) => BuildStatus::Finished(result),
            (false, None) => BuildStatus::Pending,
        }
    }

    /// First parameter called `name` across all actions, in report order.
    pub fn get_action_parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.actions
            .iter()
            .flat_map(|a| a.parameters.iter())
            .find(|p| p.name == name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct QueueExecutable {
    pub number: i64,
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct QueueItem {
    pub id: i64,
    pub blocked: bool,
    pub buildable: bool,
    #[serde(rename = "inQueueSince")]
    pub in_queue_since: i64,
    #[serde(deserialize_with = "nullable")]
    pub params: String,
    pub stuck: bool,
    pub url: String,
    #[serde(deserialize_with = "nullable")]
    pub why: String,
    pub task: Option<SubJobDescription>,
    pub executable: Option<QueueExecutable>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SubJobDescription {
    pub name: String,
    pub url: String,
    #[serde(deserialize_with = "nullable")]
    pub color: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Health {
    pub description: String,
    pub score: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct JobParameter {
    #[serde(rename = "defaultParameterValue")]
    pub default: Option<Parameter>,
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Property {
    #[serde(rename = "parameterDefinitions")]
    pub parameters: Vec<JobParameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum LastBuildKind {
    Completed,
    Failed,
    Stable,
    Successful,
    Unstable,
    Unsuccessful,
}

/// Job summary as returned by `/job/<name>/api/json`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Job {
    pub actions: Vec<Action>,
    pub name: String,
    pub url: String,
    #[serde(deserialize_with = "nullable")]
    pub color: String,

    pub jobs: Vec<SubJobDescription>, // folders

    pub buildable: bool,
    #[serde(rename = "inQueue")]
    pub in_queue: bool,
    pub builds: Vec<Build>,
    #[serde(rename = "displayName", deserialize_with = "nullable")]
    pub display_name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(rename = "healthReport")]
    pub health_report: Vec<Health>,

    #[serde(rename = "lastCompletedBuild")]
    pub last_completed_build: Option<Build>,
    #[serde(rename = "lastFailedBuild")]
    pub last_failed_build: Option<Build>,
    #[serde(rename = "lastStableBuild")]
    pub last_stable_build: Option<Build>,
    #[serde(rename = "lastSuccessfulBuild")]
    pub last_successful_build: Option<Build>,
    #[serde(rename = "lastUnstableBuild")]
    pub last_unstable_build: Option<Build>,
    #[serde(rename = "lastUnsuccessfulBuild")]
    pub last_unsuccessful_build: Option<Build>,

    #[serde(rename = "queueItem")]
    pub queue_item: Option<QueueItem>,

    pub property: Vec<Property>,
}

impl Job {
    pub fn last_build(&self, kind: LastBuildKind) -> Option<&Build> {
        match kind {
            LastBuildKind::Completed => self.last_completed_build.as_ref(),
            LastBuildKind::Failed => self.last_failed_build.as_ref(),
            LastBuildKind::Stable => self.last_stable_build.as_ref(),
            LastBuildKind::Successful => self.last_successful_build.as_ref(),
            LastBuildKind::Unstable => self.last_unstable_build.as_ref(),
            LastBuildKind::Unsuccessful => self.last_unsuccessful_build.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn first_matching_parameter_wins() {
        let build: Build = from_json(
            br#"{
                "number": 42,
                "actions": [
                    {"_class": "hudson.model.ParametersAction",
                     "parameters": [{"_class": "hudson.model.StringParameterValue", "name": "BRANCH", "value": "main"}]},
                    {},
                    {"parameters": [{"name": "BRANCH", "value": "dev"}, {"name": "DRY_RUN", "value": true}]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            build.get_action_parameter_by_name("BRANCH").and_then(Parameter::value_str),
            Some("main")
        );
        assert_eq!(
            build.get_action_parameter_by_name("DRY_RUN").map(|p| &p.value),
            Some(&json!(true))
        );
        assert!(build.get_action_parameter_by_name("branch").is_none());
        assert!(build.get_action_parameter_by_name("MISSING").is_none());
    }

    #[test]
    fn decodes_build_report() {
        let build: Build = from_json(
            br##"{
                "_class": "hudson.model.FreeStyleBuild",
                "id": "17", "number": 17, "url": "https://ci.example.com/job/widgets/17/",
                "displayName": "#17", "fullDisplayName": "widgets #17", "description": null,
                "timestamp": 1700000000000, "duration": 93000, "estimatedDuration": 90000,
                "building": false, "keepLog": false, "result": "UNSTABLE",
                "artifacts": [{"displayPath": "app.jar", "fileName": "app.jar", "relativePath": "target/app.jar"}],
                "changeSet": {"_class": "hudson.plugins.git.GitChangeSetList", "kind": "git", "items": [
                    {"affectedPaths": ["src/lib.rs"], "commitId": "abc123", "timestamp": 1699999999000,
                     "author": {"absoluteUrl": "https://ci.example.com/user/ana", "fullName": "Ana"},
                     "authorEmail": "ana@example.com", "comment": "fix\n", "date": "2023-11-14 22:13:19 +0000",
                     "id": "abc123", "msg": "fix", "paths": [{"editType": "edit", "file": "src/lib.rs"}]}
                ]},
                "changeSets": []
            }"##,
        )
        .unwrap();

        assert_eq!(build.id, "17");
        assert_eq!(build.display_name, "#17");
        assert_eq!(build.description, "");
        assert_eq!(build.status(), BuildStatus::Finished(BuildResult::Unstable));
        assert_eq!(build.artifacts[0].relative_path, "target/app.jar");
        let item = &build.change_set.items[0];
        assert_eq!(item.author.full_name, "Ana");
        assert_eq!(item.message, "fix");
        assert_eq!(item.paths[0].edit_type, "edit");
    }

    #[test]
    fn running_and_unknown_results() {
        let running: Build = from_json(br#"{"building": true, "result": null}"#).unwrap();
        assert_eq!(running.status(), BuildStatus::Running);

        let odd: Build = from_json(br#"{"result": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(odd.status(), BuildStatus::Finished(BuildResult::Unknown));

        let pending = Build::default();
        assert_eq!(pending.status(), BuildStatus::Pending);
        assert_eq!(BuildResult::NotBuilt.to_string(), "NOT_BUILT");
    }

    #[test]
    fn job_without_health_report_decodes() {
        let job: Job = from_json(
            br#"{"name": "widgets", "url": "https://ci.example.com/job/widgets/", "color": "blue",
                 "lastSuccessfulBuild": {"number": 9, "url": "https://ci.example.com/job/widgets/9/"},
                 "lastFailedBuild": null, "someFutureField": {"x": 1}}"#,
        )
        .unwrap();

        assert!(job.health_report.is_empty());
        assert_eq!(job.last_build(LastBuildKind::Successful).map(|b| b.number), Some(9));
        assert!(job.last_build(LastBuildKind::Failed).is_none());
        assert!(job.last_build(LastBuildKind::Stable).is_none());
        assert!(job.queue_item.is_none());
    }

    #[test]
    fn decodes_folder_and_parameter_definitions() {
        let job: Job = from_json(
            br#"{"name": "team", "jobs": [{"name": "api", "url": "u1", "color": "red"}, {"name": "sub", "url": "u2", "color": null}],
                 "healthReport": [{"description": "Build stability: 1 out of the last 5 builds failed.", "score": 80}],
                 "property": [{"parameterDefinitions": [
                    {"defaultParameterValue": {"name": "ENV", "value": "staging"}, "name": "ENV",
                     "description": null, "type": "ChoiceParameterDefinition", "choices": ["staging", "prod"]}
                 ]}]}"#,
        )
        .unwrap();

        assert_eq!(job.jobs.len(), 2);
        assert_eq!(job.jobs[1].color, "");
        assert_eq!(job.health_report[0].score, 80);
        let param = &job.property[0].parameters[0];
        assert_eq!(param.kind, "ChoiceParameterDefinition");
        assert_eq!(param.choices, vec!["staging", "prod"]);
        assert_eq!(
            param.default.as_ref().and_then(Parameter::value_str),
            Some("staging")
        );
    }

    #[test]
    fn decodes_queue_item() {
        let item: QueueItem = from_json(
            br#"{"_class": "hudson.model.Queue$BlockedItem", "id": 311, "blocked": true, "buildable": false,
                 "inQueueSince": 1700000001000, "params": "\nBRANCH=main", "stuck": false,
                 "task": {"name": "widgets", "url": "https://ci.example.com/job/widgets/", "color": "blue_anime"},
                 "url": "queue/item/311/", "why": "Build #16 is already in progress"}"#,
        )
        .unwrap();

        assert_eq!(item.id, 311);
        assert!(item.blocked);
        assert_eq!(item.why, "Build #16 is already in progress");
        assert_eq!(item.task.map(|t| t.name), Some("widgets".to_string()));
        assert!(item.executable.is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(from_json::<Job>(b"{\"name\": "), Err(Error::Json(_))));
    }

    #[test]
    fn last_build_kinds_parse_from_cli_names() {
        assert_eq!("unsuccessful".parse::<LastBuildKind>().unwrap(), LastBuildKind::Unsuccessful);
        assert_eq!(LastBuildKind::Completed.to_string(), "completed");
    }
}
