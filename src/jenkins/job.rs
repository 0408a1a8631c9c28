//! Job config documents (`config.xml`) and their conversion to and from bytes.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::jenkins::diagnostics::{DiagnosticSink, TracingSink};
use crate::jenkins::error::{Error, Result};
use crate::jenkins::variant::{
    PostBuildStep, Registry, ScmBinding, TriggerBinding, decode_list, encode_list,
};
use crate::jenkins::xml::{self, Element};

pub const MAVEN_ROOT: &str = "maven2-moduleset";
pub const PIPELINE_ROOT: &str = "flow-definition";

pub const CPS_FLOW_DEFINITION: &str = "org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition";
pub const CPS_SCM_FLOW_DEFINITION: &str = "org.jenkinsci.plugins.workflow.cps.CpsScmFlowDefinition";

/// One job configuration. Exactly one of the variants must be set for the
/// document to be encodable.
#[derive(Debug, Clone, Default)]
pub struct JobDocument {
    pub maven: Option<MavenJob>,
    pub pipeline: Option<PipelineJob>,
}

impl JobDocument {
    pub fn maven(job: MavenJob) -> Self {
        Self {
            maven: Some(job),
            pipeline: None,
        }
    }

    pub fn pipeline(job: PipelineJob) -> Self {
        Self {
            maven: None,
            pipeline: Some(job),
        }
    }

    pub fn summary(&self) -> String {
        fn state<T>(v: &Option<T>) -> &'static str {
            if v.is_some() { "set" } else { "unset" }
        }
        format!(
            "{MAVEN_ROOT}: {}, {PIPELINE_ROOT}: {}",
            state(&self.maven),
            state(&self.pipeline)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineJob {
    pub plugin: Option<String>,
    /// Children of `<actions>`, kept as written.
    pub actions: Vec<Element>,
    pub description: String,
    pub keep_dependencies: bool,
    /// Children of `<properties>`, kept as written.
    pub properties: Vec<Element>,
    pub definition: PipelineDefinition,
    pub triggers: Vec<TriggerBinding>,
    pub disabled: bool,
}

/// Where the pipeline script comes from: inline `script`, or `script_path`
/// inside the checkout described by `scm`.
#[derive(Debug, Clone, Default)]
pub struct PipelineDefinition {
    pub class: Option<String>,
    pub plugin: Option<String>,
    pub scm: Option<ScmBinding>,
    pub script_path: Option<String>,
    pub script: Option<String>,
    pub sandbox: Option<bool>,
}

impl PipelineDefinition {
    pub fn inline(script: impl Into<String>) -> Self {
        Self {
            class: Some(CPS_FLOW_DEFINITION.to_string()),
            script: Some(script.into()),
            sandbox: Some(true),
            ..Self::default()
        }
    }

    pub fn from_scm(scm: ScmBinding, script_path: impl Into<String>) -> Self {
        Self {
            class: Some(CPS_SCM_FLOW_DEFINITION.to_string()),
            scm: Some(scm),
            script_path: Some(script_path.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MavenJob {
    pub plugin: Option<String>,
    pub actions: Vec<Element>,
    pub description: String,
    pub keep_dependencies: bool,
    pub properties: Vec<Element>,
    pub scm: Option<ScmBinding>,
    pub can_roam: bool,
    pub disabled: bool,
    pub block_build_when_downstream_building: bool,
    pub block_build_when_upstream_building: bool,
    pub triggers: Vec<TriggerBinding>,
    pub concurrent_build: bool,
    pub goals: String,
    pub aggregator_style_build: bool,
    pub incremental_build: bool,
    /// Spelled `ignoreUpstremChanges` by the server.
    pub ignore_upstream_changes: bool,
    pub archiving_disabled: bool,
    pub site_archiving_disabled: bool,
    pub fingerprinting_disabled: bool,
    pub resolve_dependencies: bool,
    pub process_plugins: bool,
    pub maven_name: String,
    pub maven_validation_level: String,
    pub default_goals: String,
    pub run_headless: bool,
    pub disable_trigger_downstream_projects: bool,
    pub settings: Option<SettingsProvider>,
    pub global_settings: Option<SettingsProvider>,
    pub run_post_steps_if_result: Option<RunPostStepsIfResult>,
    pub postbuilders: Vec<PostBuildStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsProvider {
    pub class: Option<String>,
    pub children: Vec<Element>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPostStepsIfResult {
    pub name: String,
    pub ordinal: String,
    pub color: String,
    pub complete_build: bool,
}

fn raw_children(parent: &Element, name: &str) -> Vec<Element> {
    parent
        .child(name)
        .map(|c| c.children.clone())
        .unwrap_or_default()
}

fn raw_list(name: &str, children: &[Element]) -> Element {
    Element {
        name: name.to_string(),
        children: children.to_vec(),
        ..Element::default()
    }
}

fn decode_scm(
    parent: &Element,
    registry: &Registry,
    sink: &dyn DiagnosticSink,
) -> Result<Option<ScmBinding>> {
    parent
        .child("scm")
        .map(|scm| ScmBinding::decode(scm, registry, sink))
        .transpose()
}

fn decode_settings(parent: &Element, name: &str) -> Option<SettingsProvider> {
    parent.child(name).map(|s| SettingsProvider {
        class: s.attr("class").map(str::to_string),
        children: s.children.clone(),
    })
}

fn encode_settings(name: &str, settings: &SettingsProvider) -> Element {
    let mut element = raw_list(name, &settings.children);
    if let Some(class) = &settings.class {
        element.set_attr("class", class.as_str());
    }
    element
}

impl PipelineJob {
    fn decode(root: &Element, registry: &Registry, sink: &dyn DiagnosticSink) -> Result<Self> {
        let definition = match root.child("definition") {
            Some(def) => PipelineDefinition {
                class: def.attr("class").map(str::to_string),
                plugin: def.attr("plugin").map(str::to_string),
                scm: decode_scm(def, registry, sink)?,
                script_path: def.child_text_opt("scriptPath"),
                script: def.child_text_opt("script"),
                sandbox: def.child_bool_opt("sandbox")?,
            },
            None => PipelineDefinition::default(),
        };

        Ok(Self {
            plugin: root.attr("plugin").map(str::to_string),
            actions: raw_children(root, "actions"),
            description: root.child_text("description"),
            keep_dependencies: root.child_bool("keepDependencies")?,
            properties: raw_children(root, "properties"),
            definition,
            triggers: decode_list(root.child("triggers"), registry, sink)?,
            disabled: root.child_bool("disabled")?,
        })
    }

    fn encode(&self, registry: &Registry) -> Result<Element> {
        let mut root = Element::new(PIPELINE_ROOT);
        if let Some(plugin) = &self.plugin {
            root.set_attr("plugin", plugin.as_str());
        }

        let def = &self.definition;
        let mut definition = Element::new("definition");
        if let Some(class) = &def.class {
            definition.set_attr("class", class.as_str());
        }
        if let Some(plugin) = &def.plugin {
            definition.set_attr("plugin", plugin.as_str());
        }
        if let Some(scm) = &def.scm {
            definition.push(scm.encode("scm", registry)?);
        }
        definition
            .push_text_opt("scriptPath", def.script_path.as_deref())
            .push_text_opt("script", def.script.as_deref())
            .push_bool_opt("sandbox", def.sandbox);

        root.push(raw_list("actions", &self.actions))
            .push_text("description", &self.description)
            .push_bool("keepDependencies", self.keep_dependencies)
            .push(raw_list("properties", &self.properties))
            .push(definition)
            .push(encode_list("triggers", &self.triggers, registry)?)
            .push_bool("disabled", self.disabled);
        Ok(root)
    }
}

impl MavenJob {
    fn decode(root: &Element, registry: &Registry, sink: &dyn DiagnosticSink) -> Result<Self> {
        let run_post_steps_if_result = root
            .child("runPostStepsIfResult")
            .map(|r| -> Result<RunPostStepsIfResult> {
                Ok(RunPostStepsIfResult {
                    name: r.child_text("name"),
                    ordinal: r.child_text("ordinal"),
                    color: r.child_text("color"),
                    complete_build: r.child_bool("completeBuild")?,
                })
            })
            .transpose()?;

        Ok(Self {
            plugin: root.attr("plugin").map(str::to_string),
            actions: raw_children(root, "actions"),
            description: root.child_text("description"),
            keep_dependencies: root.child_bool("keepDependencies")?,
            properties: raw_children(root, "properties"),
            scm: decode_scm(root, registry, sink)?,
            can_roam: root.child_bool("canRoam")?,
            disabled: root.child_bool("disabled")?,
            block_build_when_downstream_building: root
                .child_bool("blockBuildWhenDownstreamBuilding")?,
            block_build_when_upstream_building: root.child_bool("blockBuildWhenUpstreamBuilding")?,
            triggers: decode_list(root.child("triggers"), registry, sink)?,
            concurrent_build: root.child_bool("concurrentBuild")?,
            goals: root.child_text("goals"),
            aggregator_style_build: root.child_bool("aggregatorStyleBuild")?,
            incremental_build: root.child_bool("incrementalBuild")?,
            ignore_upstream_changes: root.child_bool("ignoreUpstremChanges")?,
            archiving_disabled: root.child_bool("archivingDisabled")?,
            site_archiving_disabled: root.child_bool("siteArchivingDisabled")?,
            fingerprinting_disabled: root.child_bool("fingerprintingDisabled")?,
            resolve_dependencies: root.child_bool("resolveDependencies")?,
            process_plugins: root.child_bool("processPlugins")?,
            maven_name: root.child_text("mavenName"),
            maven_validation_level: root.child_text("mavenValidationLevel"),
            default_goals: root.child_text("defaultGoals"),
            run_headless: root.child_bool("runHeadless")?,
            disable_trigger_downstream_projects: root
                .child_bool("disableTriggerDownstreamProjects")?,
            settings: decode_settings(root, "settings"),
            global_settings: decode_settings(root, "globalSettings"),
            run_post_steps_if_result,
            postbuilders: decode_list(root.child("postbuilders"), registry, sink)?,
        })
    }

    fn encode(&self, registry: &Registry) -> Result<Element> {
        let mut root = Element::new(MAVEN_ROOT);
        if let Some(plugin) = &self.plugin {
            root.set_attr("plugin", plugin.as_str());
        }

        root.push(raw_list("actions", &self.actions))
            .push_text("description", &self.description)
            .push_bool("keepDependencies", self.keep_dependencies)
            .push(raw_list("properties", &self.properties));
        if let Some(scm) = &self.scm {
            root.push(scm.encode("scm", registry)?);
        }
        root.push_bool("canRoam", self.can_roam)
            .push_bool("disabled", self.disabled)
            .push_bool(
                "blockBuildWhenDownstreamBuilding",
                self.block_build_when_downstream_building,
            )
            .push_bool(
                "blockBuildWhenUpstreamBuilding",
                self.block_build_when_upstream_building,
            )
            .push(encode_list("triggers", &self.triggers, registry)?)
            .push_bool("concurrentBuild", self.concurrent_build)
            .push_text("goals", &self.goals)
            .push_bool("aggregatorStyleBuild", self.aggregator_style_build)
            .push_bool("incrementalBuild", self.incremental_build)
            .push_bool("ignoreUpstremChanges", self.ignore_upstream_changes)
            .push_bool("archivingDisabled", self.archiving_disabled)
            .push_bool("siteArchivingDisabled", self.site_archiving_disabled)
            .push_bool("fingerprintingDisabled", self.fingerprinting_disabled)
            .push_bool("resolveDependencies", self.resolve_dependencies)
            .push_bool("processPlugins", self.process_plugins)
            .push_text("mavenName", &self.maven_name)
            .push_text("mavenValidationLevel", &self.maven_validation_level)
            .push_text("defaultGoals", &self.default_goals)
            .push_bool("runHeadless", self.run_headless)
            .push_bool(
                "disableTriggerDownstreamProjects",
                self.disable_trigger_downstream_projects,
            );
        if let Some(settings) = &self.settings {
            root.push(encode_settings("settings", settings));
        }
        if let Some(settings) = &self.global_settings {
            root.push(encode_settings("globalSettings", settings));
        }
        if let Some(run) = &self.run_post_steps_if_result {
            let mut element = Element::new("runPostStepsIfResult");
            element
                .push_text("name", &run.name)
                .push_text("ordinal", &run.ordinal)
                .push_text("color", &run.color)
                .push_bool("completeBuild", run.complete_build);
            root.push(element);
        }
        root.push(encode_list("postbuilders", &self.postbuilders, registry)?);
        Ok(root)
    }
}

/// Reads and writes job documents with one set of dispatch tables.
#[derive(Clone)]
pub struct Codec {
    registry: Registry,
    sink: Arc<dyn DiagnosticSink>,
    indent: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            sink: Arc::new(TracingSink),
            indent: 2,
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("registry", &self.registry)
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Spaces per nesting level in encoded output, `0` for a single line.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn decode_job(&self, bytes: &[u8]) -> Result<JobDocument> {
        let root = xml::parse(bytes)?;
        self.decode_element(&root)
    }

    pub fn decode_element(&self, root: &Element) -> Result<JobDocument> {
        debug!(root = %root.name, "decoding job document");
        let sink = self.sink.as_ref();
        match root.name.as_str() {
            MAVEN_ROOT => Ok(JobDocument::maven(MavenJob::decode(root, &self.registry, sink)?)),
            PIPELINE_ROOT => Ok(JobDocument::pipeline(PipelineJob::decode(
                root,
                &self.registry,
                sink,
            )?)),
            other => Err(Error::UnknownRoot(other.to_string())),
        }
    }

    /// Builds the element tree of the single populated variant.
    pub fn encode_element(&self, document: &JobDocument) -> Result<Element> {
        match (&document.maven, &document.pipeline) {
            (Some(maven), None) => maven.encode(&self.registry),
            (None, Some(pipeline)) => pipeline.encode(&self.registry),
            _ => Err(Error::UnsupportedDocument(document.summary())),
        }
    }

    pub fn encode_job(&self, document: &JobDocument) -> Result<Vec<u8>> {
        let root = self.encode_element(document)?;
        xml::write(&root, self.indent)
    }
}

/// Converts `document` to config.xml bytes with the built-in shapes.
pub fn job_to_xml(document: &JobDocument) -> Result<Vec<u8>> {
    Codec::default().encode_job(document)
}

pub fn job_from_xml(bytes: &[u8]) -> Result<JobDocument> {
    Codec::default().decode_job(bytes)
}
