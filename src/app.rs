use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use jobconf::jenkins::types::LastBuildKind;
use jobconf::jenkins::variant::{Polymorphic, Slot};
use jobconf::jenkins::{
    Build, BuildStatus, CollectingSink, Codec, Diagnostic, DiagnosticSink, Job, JobDocument,
    QueueItem, TracingSink, from_json,
};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::cli::Command;
use crate::config::AppConfig;
use crate::time::{format_duration, format_epoch_millis};

pub struct App {
    config: AppConfig,
    codec: Codec,
    diagnostics: Arc<CollectingSink>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let diagnostics = Arc::new(CollectingSink::new());
        let collected = Arc::clone(&diagnostics);
        let sink = move |diagnostic: &Diagnostic| {
            TracingSink.report(diagnostic);
            collected.report(diagnostic);
        };
        let codec = Codec::new()
            .with_sink(Arc::new(sink))
            .with_indent(config.indent);

        Self {
            config,
            codec,
            diagnostics,
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        debug!("{command:?}");
        match command {
            Command::Job { ref file } => {
                let document = self.decode_job(file).await?;
                self.print_job(&document);
            }
            Command::Roundtrip { ref file } => {
                let document = self.decode_job(file).await?;
                let bytes = self.codec.encode_job(&document)?;
                let mut stdout = std::io::stdout();
                stdout.write_all(&bytes)?;
                writeln!(stdout)?;
            }
            Command::Build {
                ref file,
                ref param,
            } => {
                let build: Build = from_json(&read(file).await?)?;
                print_build(&build)?;
                if let Some(name) = param {
                    match build.get_action_parameter_by_name(name) {
                        Some(p) => println!("{}={}", p.name, display_value(&p.value)),
                        None => println!("parameter {name} is not set on this build"),
                    }
                }
            }
            Command::Status { ref file } => {
                let job: Job = from_json(&read(file).await?)?;
                print_job_report(&job)?;
            }
            Command::Queue { ref file } => {
                let item: QueueItem = from_json(&read(file).await?)?;
                println!("queue item #{} {}", item.id, item.url);
                println!("in queue since: {}", format_epoch_millis(item.in_queue_since)?);
                println!(
                    "blocked: {}, buildable: {}, stuck: {}",
                    item.blocked, item.buildable, item.stuck
                );
                if !item.why.is_empty() {
                    println!("why: {}", item.why);
                }
            }
            Command::InitConfig => {
                let path = self.config.save()?;
                println!("Saving config to {}", path.display());
            }
        }
        Ok(())
    }

    async fn decode_job(&self, file: &Path) -> Result<JobDocument> {
        let bytes = read(file).await?;
        let document = self.codec.decode_job(&bytes)?;

        let diagnostics = self.diagnostics.diagnostics();
        if self.config.strict_diagnostics && !diagnostics.is_empty() {
            return Err(eyre!(
                "{} contains {} unrecognised class(es): {:?}",
                file.display(),
                diagnostics.len(),
                diagnostics
            ));
        }
        Ok(document)
    }

    fn print_job(&self, document: &JobDocument) {
        if let Some(maven) = &document.maven {
            println!("maven job: {}", maven.description);
            println!("goals: {}", maven.goals);
            if let Some(scm) = &maven.scm {
                print_slot("scm", scm);
            }
            for trigger in &maven.triggers {
                print_slot("trigger", trigger);
            }
            for step in &maven.postbuilders {
                print_slot("post-build", step);
            }
        }
        if let Some(pipeline) = &document.pipeline {
            println!("pipeline job: {}", pipeline.description);
            let definition = &pipeline.definition;
            if let Some(scm) = &definition.scm {
                print_slot("scm", scm);
            }
            if let Some(path) = &definition.script_path {
                println!("script path: {path}");
            }
            if let Some(script) = &definition.script {
                println!("inline script: {} line(s)", script.lines().count());
            }
            for trigger in &pipeline.triggers {
                print_slot("trigger", trigger);
            }
        }
        info!("{} diagnostics", self.diagnostics.diagnostics().len());
    }
}

async fn read(file: &Path) -> Result<Vec<u8>> {
    async_fs::read(file)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))
}

fn print_slot<S: Slot>(label: &str, slot: &Polymorphic<S>) {
    let class = slot.class().unwrap_or("-");
    let plugin = slot.plugin().unwrap_or("-");
    let state = if slot.is_empty() { "unrecognised" } else { "decoded" };
    println!("{label}: {class} [{plugin}] {state}");
}

fn display_value(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn print_build(build: &Build) -> Result<()> {
    let status = match build.status() {
        BuildStatus::Running => "RUNNING".to_string(),
        BuildStatus::Finished(result) => result.to_string(),
        BuildStatus::Pending => "PENDING".to_string(),
    };
    println!("{} {}", build.full_display_name, status);
    println!("started: {}", format_epoch_millis(build.timestamp)?);
    println!("duration: {}", format_duration(build.duration)?);
    for artifact in &build.artifacts {
        println!("artifact: {}", artifact.relative_path);
    }
    Ok(())
}

fn print_job_report(job: &Job) -> Result<()> {
    println!("{} ({})", job.name, job.color);
    for health in &job.health_report {
        println!("health {}%: {}", health.score, health.description);
    }
    for kind in LastBuildKind::iter() {
        match job.last_build(kind) {
            Some(build) => println!("last {kind}: #{} {}", build.number, build.url),
            None => println!("last {kind}: -"),
        }
    }
    for sub in &job.jobs {
        println!("  {} ({})", sub.name, sub.color);
    }
    if let Some(item) = &job.queue_item {
        println!("queued: {}", item.why);
    }
    Ok(())
}
