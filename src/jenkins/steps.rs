//! Trigger and post-build realizations.

use crate::jenkins::error::Result;
use crate::jenkins::variant::Shape;
use crate::jenkins::xml::Element;

pub const SCM_TRIGGER_CLASS: &str = "hudson.triggers.SCMTrigger";
pub const SHELL_CLASS: &str = "hudson.tasks.Shell";

/// Polls source control on a cron-style `spec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScmTrigger {
    pub spec: String,
    pub ignore_post_commit_hooks: bool,
}

impl Shape for ScmTrigger {
    fn decode(element: &Element) -> Result<Self> {
        Ok(Self {
            spec: element.child_text("spec"),
            ignore_post_commit_hooks: element.child_bool("ignorePostCommitHooks")?,
        })
    }

    fn encode(&self, element: &mut Element) {
        element
            .push_text("spec", &self.spec)
            .push_bool("ignorePostCommitHooks", self.ignore_post_commit_hooks);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellBuilder {
    pub command: String,
}

impl Shape for ShellBuilder {
    fn decode(element: &Element) -> Result<Self> {
        Ok(Self {
            command: element.child_text("command"),
        })
    }

    fn encode(&self, element: &mut Element) {
        element.push_text("command", &self.command);
    }
}
