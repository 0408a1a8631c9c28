//! Source-control realizations for the `<scm>` slot.

use crate::jenkins::error::Result;
use crate::jenkins::variant::Shape;
use crate::jenkins::xml::Element;

pub const SUBVERSION_CLASS: &str = "hudson.scm.SubversionSCM";
// TODO: confirm the plugin id the server reports for subversion
pub const SUBVERSION_PLUGIN: &str = "svn@2.4.0";
pub const GIT_CLASS: &str = "hudson.plugins.git.GitSCM";
pub const GIT_PLUGIN: &str = "git@2.4.0";
pub const NULL_CLASS: &str = "hudson.scm.NullSCM";

const SVN_LOCATION: &str = "hudson.scm.SubversionSCM_-ModuleLocation";
const GIT_REMOTE: &str = "hudson.plugins.git.UserRemoteConfig";
const GIT_BRANCH: &str = "hudson.plugins.git.BranchSpec";
const GIT_LOCAL_BRANCH: &str = "hudson.plugins.git.extensions.impl.LocalBranch";

/// `<scm class="hudson.scm.NullSCM"/>`, written by the server for jobs without source control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullScm;

impl Shape for NullScm {
    fn decode(_: &Element) -> Result<Self> {
        Ok(Self)
    }

    fn encode(&self, _: &mut Element) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubversionScm {
    pub locations: Vec<SvnLocation>,
    pub excluded_regions: String,
    pub included_regions: String,
    pub excluded_users: String,
    pub excluded_revprop: String,
    pub excluded_commit_messages: String,
    /// `class` of `<workspaceUpdater>`, e.g. `hudson.scm.subversion.UpdateUpdater`.
    pub workspace_updater: Option<String>,
    pub ignore_dir_prop_changes: bool,
    pub filter_changelog: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnLocation {
    pub remote: String,
    pub credentials_id: Option<String>,
    pub local: String,
    pub depth_option: String,
    pub ignore_externals_option: bool,
}

impl Shape for SubversionScm {
    fn decode(element: &Element) -> Result<Self> {
        let locations = element
            .child("locations")
            .map(|l| {
                l.children_named(SVN_LOCATION)
                    .map(|loc| {
                        Ok(SvnLocation {
                            remote: loc.child_text("remote"),
                            credentials_id: loc.child_text_opt("credentialsId"),
                            local: loc.child_text("local"),
                            depth_option: loc.child_text("depthOption"),
                            ignore_externals_option: loc.child_bool("ignoreExternalsOption")?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            locations,
            excluded_regions: element.child_text("excludedRegions"),
            included_regions: element.child_text("includedRegions"),
            excluded_users: element.child_text("excludedUsers"),
            excluded_revprop: element.child_text("excludedRevprop"),
            excluded_commit_messages: element.child_text("excludedCommitMessages"),
            workspace_updater: element
                .child("workspaceUpdater")
                .and_then(|w| w.attr("class"))
                .map(str::to_string),
            ignore_dir_prop_changes: element.child_bool("ignoreDirPropChanges")?,
            filter_changelog: element.child_bool("filterChangelog")?,
        })
    }

    fn encode(&self, element: &mut Element) {
        let mut locations = Element::new("locations");
        for loc in &self.locations {
            let mut location = Element::new(SVN_LOCATION);
            location
                .push_text("remote", &loc.remote)
                .push_text_opt("credentialsId", loc.credentials_id.as_deref())
                .push_text("local", &loc.local)
                .push_text("depthOption", &loc.depth_option)
                .push_bool("ignoreExternalsOption", loc.ignore_externals_option);
            locations.push(location);
        }

        element
            .push(locations)
            .push_text("excludedRegions", &self.excluded_regions)
            .push_text("includedRegions", &self.included_regions)
            .push_text("excludedUsers", &self.excluded_users)
            .push_text("excludedRevprop", &self.excluded_revprop)
            .push_text("excludedCommitMessages", &self.excluded_commit_messages);
        if let Some(class) = &self.workspace_updater {
            element.push(Element::new("workspaceUpdater").with_attr("class", class.as_str()));
        }
        element
            .push_bool("ignoreDirPropChanges", self.ignore_dir_prop_changes)
            .push_bool("filterChangelog", self.filter_changelog);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitScm {
    pub config_version: Option<String>,
    pub user_remote_configs: Vec<UserRemoteConfig>,
    pub branches: Vec<BranchSpec>,
    pub do_generate_submodule_configurations: bool,
    pub browser: Option<GitBrowser>,
    /// `class` of `<submoduleCfg>`, usually `list` or `empty-list`.
    pub submodule_cfg: Option<SubmoduleCfg>,
    pub extensions: GitExtensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRemoteConfig {
    pub url: String,
    pub name: Option<String>,
    pub refspec: Option<String>,
    pub credentials_id: Option<String>,
}

impl UserRemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSpec {
    pub name: String,
}

impl BranchSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitBrowser {
    pub class: Option<String>,
    pub url: String,
    pub project_name: Option<String>,
}

/// `<submoduleCfg>`, entries are kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmoduleCfg {
    pub class: Option<String>,
    pub entries: Vec<Element>,
}

impl SubmoduleCfg {
    pub fn list() -> Self {
        Self {
            class: Some("list".to_string()),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitExtensions {
    pub class: Option<String>,
    pub items: Vec<GitExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitExtension {
    /// Check out to a local branch with the given name.
    LocalBranch(String),
    /// Any other extension, kept as written.
    Other(Element),
}

impl GitExtensions {
    pub fn local_branch(&self) -> Option<&str> {
        self.items.iter().find_map(|e| match e {
            GitExtension::LocalBranch(name) => Some(name.as_str()),
            GitExtension::Other(_) => None,
        })
    }
}

impl Shape for GitScm {
    fn decode(element: &Element) -> Result<Self> {
        let user_remote_configs = element
            .child("userRemoteConfigs")
            .map(|r| {
                r.children_named(GIT_REMOTE)
                    .map(|remote| UserRemoteConfig {
                        url: remote.child_text("url"),
                        name: remote.child_text_opt("name"),
                        refspec: remote.child_text_opt("refspec"),
                        credentials_id: remote.child_text_opt("credentialsId"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let branches = element
            .child("branches")
            .map(|b| {
                b.children_named(GIT_BRANCH)
                    .map(|spec| BranchSpec::new(spec.child_text("name")))
                    .collect()
            })
            .unwrap_or_default();

        let browser = element.child("browser").map(|b| GitBrowser {
            class: b.attr("class").map(str::to_string),
            url: b.child_text("url"),
            project_name: b.child_text_opt("projectName"),
        });

        let extensions = element
            .child("extensions")
            .map(|ext| GitExtensions {
                class: ext.attr("class").map(str::to_string),
                items: ext
                    .children
                    .iter()
                    .map(|item| match item.name.as_str() {
                        GIT_LOCAL_BRANCH => {
                            GitExtension::LocalBranch(item.child_text("localBranch"))
                        }
                        _ => GitExtension::Other(item.clone()),
                    })
                    .collect(),
            })
            .unwrap_or_default();

        Ok(Self {
            config_version: element.child_text_opt("configVersion"),
            user_remote_configs,
            branches,
            do_generate_submodule_configurations: element
                .child_bool("doGenerateSubmoduleConfigurations")?,
            browser,
            submodule_cfg: element.child("submoduleCfg").map(|s| SubmoduleCfg {
                class: s.attr("class").map(str::to_string),
                entries: s.children.clone(),
            }),
            extensions,
        })
    }

    fn encode(&self, element: &mut Element) {
        element.push_text_opt("configVersion", self.config_version.as_deref());

        let mut remotes = Element::new("userRemoteConfigs");
        for config in &self.user_remote_configs {
            let mut remote = Element::new(GIT_REMOTE);
            remote
                .push_text_opt("name", config.name.as_deref())
                .push_text_opt("refspec", config.refspec.as_deref())
                .push_text("url", &config.url)
                .push_text_opt("credentialsId", config.credentials_id.as_deref());
            remotes.push(remote);
        }
        element.push(remotes);

        let mut branches = Element::new("branches");
        for spec in &self.branches {
            let mut branch = Element::new(GIT_BRANCH);
            branch.push_text("name", &spec.name);
            branches.push(branch);
        }
        element.push(branches).push_bool(
            "doGenerateSubmoduleConfigurations",
            self.do_generate_submodule_configurations,
        );

        if let Some(browser) = &self.browser {
            let mut el = Element::new("browser");
            if let Some(class) = &browser.class {
                el.set_attr("class", class.as_str());
            }
            el.push_text("url", &browser.url)
                .push_text_opt("projectName", browser.project_name.as_deref());
            element.push(el);
        }
        if let Some(cfg) = &self.submodule_cfg {
            let mut el = Element::new("submoduleCfg");
            if let Some(class) = &cfg.class {
                el.set_attr("class", class.as_str());
            }
            el.children = cfg.entries.clone();
            element.push(el);
        }

        let mut extensions = Element::new("extensions");
        if let Some(class) = &self.extensions.class {
            extensions.set_attr("class", class.as_str());
        }
        for item in &self.extensions.items {
            match item {
                GitExtension::LocalBranch(name) => {
                    let mut local = Element::new(GIT_LOCAL_BRANCH);
                    local.push_text("localBranch", name);
                    extensions.push(local);
                }
                GitExtension::Other(raw) => {
                    extensions.push(raw.clone());
                }
            }
        }
        element.push(extensions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::xml::parse;
    use pretty_assertions::assert_eq;

    fn roundtrip<T: Shape>(shape: &T, tag: &str) -> T {
        let mut element = Element::new(tag);
        shape.encode(&mut element);
        T::decode(&element).unwrap()
    }

    #[test]
    fn decodes_git_scm_as_written_by_the_server() {
        let element = parse(
            br#"<scm class="hudson.plugins.git.GitSCM" plugin="git@4.11.3">
    <configVersion>2</configVersion>
    <userRemoteConfigs>
      <hudson.plugins.git.UserRemoteConfig>
        <url>https://github.com/acme/widgets.git</url>
        <credentialsId>github-token</credentialsId>
      </hudson.plugins.git.UserRemoteConfig>
    </userRemoteConfigs>
    <branches>
      <hudson.plugins.git.BranchSpec><name>*/main</name></hudson.plugins.git.BranchSpec>
      <hudson.plugins.git.BranchSpec><name>*/release-*</name></hudson.plugins.git.BranchSpec>
    </branches>
    <doGenerateSubmoduleConfigurations>false</doGenerateSubmoduleConfigurations>
    <browser class="hudson.plugins.git.browser.GithubWeb"><url>https://github.com/acme/widgets</url></browser>
    <submoduleCfg class="empty-list"/>
    <extensions>
      <hudson.plugins.git.extensions.impl.LocalBranch><localBranch>main</localBranch></hudson.plugins.git.extensions.impl.LocalBranch>
      <hudson.plugins.git.extensions.impl.CleanBeforeCheckout/>
    </extensions>
  </scm>"#,
        )
        .unwrap();

        let git = GitScm::decode(&element).unwrap();
        assert_eq!(git.config_version.as_deref(), Some("2"));
        assert_eq!(
            git.user_remote_configs,
            vec![UserRemoteConfig {
                url: "https://github.com/acme/widgets.git".to_string(),
                credentials_id: Some("github-token".to_string()),
                ..UserRemoteConfig::default()
            }]
        );
        assert_eq!(
            git.branches,
            vec![BranchSpec::new("*/main"), BranchSpec::new("*/release-*")]
        );
        assert_eq!(
            git.browser.as_ref().and_then(|b| b.class.as_deref()),
            Some("hudson.plugins.git.browser.GithubWeb")
        );
        assert_eq!(
            git.submodule_cfg.as_ref().and_then(|cfg| cfg.class.as_deref()),
            Some("empty-list")
        );
        assert_eq!(git.extensions.local_branch(), Some("main"));
        assert!(matches!(
            &git.extensions.items[1],
            GitExtension::Other(raw) if raw.name == "hudson.plugins.git.extensions.impl.CleanBeforeCheckout"
        ));
    }

    #[test]
    fn git_fields_survive_encoding() {
        let git = GitScm {
            config_version: Some("2".to_string()),
            user_remote_configs: vec![UserRemoteConfig {
                name: Some("origin".to_string()),
                refspec: Some("+refs/heads/*:refs/remotes/origin/*".to_string()),
                ..UserRemoteConfig::new("git@example.com:acme/widgets.git")
            }],
            branches: vec![BranchSpec::new("*/main")],
            do_generate_submodule_configurations: true,
            browser: Some(GitBrowser {
                class: Some("hudson.plugins.git.browser.GitLab".to_string()),
                url: "https://gitlab.example.com/acme/widgets".to_string(),
                project_name: Some("widgets".to_string()),
            }),
            submodule_cfg: Some(SubmoduleCfg::list()),
            extensions: GitExtensions {
                class: Some("list".to_string()),
                items: vec![
                    GitExtension::LocalBranch("feature".to_string()),
                    GitExtension::Other(Element::new("hudson.plugins.git.extensions.impl.WipeWorkspace")),
                ],
            },
        };
        assert_eq!(roundtrip(&git, "scm"), git);
    }

    #[test]
    fn missing_class_attributes_stay_missing() {
        let element = parse(
            br#"<scm class="hudson.plugins.git.GitSCM">
  <browser><url>https://git.example.com/widgets</url></browser>
  <submoduleCfg>
    <hudson.plugins.git.SubmoduleConfig><submoduleName>vendor</submoduleName></hudson.plugins.git.SubmoduleConfig>
  </submoduleCfg>
</scm>"#,
        )
        .unwrap();
        let git = GitScm::decode(&element).unwrap();
        assert_eq!(git.browser.as_ref().and_then(|b| b.class.as_deref()), None);
        let cfg = git.submodule_cfg.as_ref().unwrap();
        assert_eq!(cfg.class, None);
        assert_eq!(cfg.entries.len(), 1);

        let mut out = Element::new("scm");
        git.encode(&mut out);
        assert_eq!(out.child("browser").unwrap().attr("class"), None);
        let submodules = out.child("submoduleCfg").unwrap();
        assert!(submodules.attributes.is_empty());
        assert_eq!(submodules.children[0].child_text("submoduleName"), "vendor");
    }

    #[test]
    fn decodes_subversion_locations() {
        let element = parse(
            br#"<scm class="hudson.scm.SubversionSCM" plugin="subversion@2.12.1">
  <locations>
    <hudson.scm.SubversionSCM_-ModuleLocation>
      <remote>https://svn.example.com/repo/trunk</remote>
      <local>.</local>
      <depthOption>infinity</depthOption>
      <ignoreExternalsOption>true</ignoreExternalsOption>
    </hudson.scm.SubversionSCM_-ModuleLocation>
  </locations>
  <excludedRegions>docs/.*</excludedRegions>
  <includedRegions></includedRegions>
  <excludedUsers></excludedUsers>
  <excludedRevprop></excludedRevprop>
  <excludedCommitMessages></excludedCommitMessages>
  <workspaceUpdater class="hudson.scm.subversion.UpdateUpdater"/>
  <ignoreDirPropChanges>false</ignoreDirPropChanges>
  <filterChangelog>true</filterChangelog>
</scm>"#,
        )
        .unwrap();

        let svn = SubversionScm::decode(&element).unwrap();
        assert_eq!(
            svn.locations,
            vec![SvnLocation {
                remote: "https://svn.example.com/repo/trunk".to_string(),
                credentials_id: None,
                local: ".".to_string(),
                depth_option: "infinity".to_string(),
                ignore_externals_option: true,
            }]
        );
        assert_eq!(svn.excluded_regions, "docs/.*");
        assert_eq!(
            svn.workspace_updater.as_deref(),
            Some("hudson.scm.subversion.UpdateUpdater")
        );
        assert!(!svn.ignore_dir_prop_changes);
        assert!(svn.filter_changelog);
        assert_eq!(roundtrip(&svn, "scm"), svn);
    }

    #[test]
    fn null_scm_has_no_content() {
        let mut element = Element::new("scm");
        NullScm.encode(&mut element);
        assert!(element.children.is_empty());
    }
}
