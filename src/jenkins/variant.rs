//! Polymorphic slots of a job document.
//!
//! Source control, triggers and post-build steps are stored by the server as
//! elements whose shape is picked by a discriminator, usually the `class`
//! attribute. Each slot owns a [`VariantTable`] mapping a discriminator to a
//! decoder and a concrete Rust type back to its discriminator. Adding a shape
//! is a call to [`Registry::register_scm`] (or the trigger/post-builder
//! counterpart), the decode and encode paths below never change.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use strum::Display;

use crate::jenkins::diagnostics::{Diagnostic, DiagnosticSink};
use crate::jenkins::error::{Error, Result};
use crate::jenkins::scm::{self, GitScm, NullScm, SubversionScm};
use crate::jenkins::steps::{self, ScmTrigger, ShellBuilder};
use crate::jenkins::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SlotKind {
    #[strum(serialize = "scm")]
    Scm,
    #[strum(serialize = "trigger")]
    Trigger,
    #[strum(serialize = "post-build step")]
    PostBuilder,
}

/// Compile-time marker selecting which table a [`Polymorphic`] uses.
pub trait Slot: 'static {
    const KIND: SlotKind;
    /// List entries such as `<hudson.triggers.SCMTrigger>` are named after
    /// their discriminator instead of carrying it in `class`.
    const NAMED_BY_CLASS: bool;
}

#[derive(Debug)]
pub enum ScmSlot {}

#[derive(Debug)]
pub enum TriggerSlot {}

#[derive(Debug)]
pub enum PostBuilderSlot {}

impl Slot for ScmSlot {
    const KIND: SlotKind = SlotKind::Scm;
    const NAMED_BY_CLASS: bool = false;
}

impl Slot for TriggerSlot {
    const KIND: SlotKind = SlotKind::Trigger;
    const NAMED_BY_CLASS: bool = true;
}

impl Slot for PostBuilderSlot {
    const KIND: SlotKind = SlotKind::PostBuilder;
    const NAMED_BY_CLASS: bool = true;
}

/// A concrete shape with its own field mapping.
pub trait Shape: Clone + fmt::Debug + Send + Sync + 'static {
    fn decode(element: &Element) -> Result<Self>;

    /// Writes the shape's children into `element`. Discriminator attributes
    /// are attached by the slot, not here.
    fn encode(&self, element: &mut Element);
}

/// Object-safe handle to a stored [`Shape`].
pub trait Realization: fmt::Debug + Send + Sync {
    fn shape_type_id(&self) -> TypeId;
    fn shape_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn encode_into(&self, element: &mut Element);
    fn clone_box(&self) -> Box<dyn Realization>;
}

impl<T: Shape> Realization for T {
    fn shape_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn shape_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn encode_into(&self, element: &mut Element) {
        self.encode(element)
    }

    fn clone_box(&self) -> Box<dyn Realization> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Realization> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type DecodeFn = fn(&Element) -> Result<Box<dyn Realization>>;

fn decode_boxed<T: Shape>(element: &Element) -> Result<Box<dyn Realization>> {
    Ok(Box::new(T::decode(element)?))
}

/// `class` and `plugin` attribute values written for a registered shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub class: String,
    pub plugin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariantTable {
    kind: SlotKind,
    decoders: HashMap<String, DecodeFn>,
    discriminators: HashMap<TypeId, Discriminator>,
}

impl VariantTable {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            decoders: HashMap::new(),
            discriminators: HashMap::new(),
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn register<T: Shape>(&mut self, class: &str, plugin: Option<&str>) -> &mut Self {
        self.decoders.insert(class.to_string(), decode_boxed::<T>);
        self.discriminators.insert(
            TypeId::of::<T>(),
            Discriminator {
                class: class.to_string(),
                plugin: plugin.map(str::to_string),
            },
        );
        self
    }

    pub fn knows_class(&self, class: &str) -> bool {
        self.decoders.contains_key(class)
    }

    fn decoder(&self, class: &str) -> Option<DecodeFn> {
        self.decoders.get(class).copied()
    }

    pub fn discriminator_of(&self, realization: &dyn Realization) -> Option<&Discriminator> {
        self.discriminators.get(&realization.shape_type_id())
    }
}

/// Dispatch tables for every polymorphic slot.
#[derive(Debug, Clone)]
pub struct Registry {
    scm: VariantTable,
    triggers: VariantTable,
    post_builders: VariantTable,
}

impl Registry {
    /// A registry that recognises nothing.
    pub fn empty() -> Self {
        Self {
            scm: VariantTable::new(SlotKind::Scm),
            triggers: VariantTable::new(SlotKind::Trigger),
            post_builders: VariantTable::new(SlotKind::PostBuilder),
        }
    }

    pub fn table(&self, kind: SlotKind) -> &VariantTable {
        match kind {
            SlotKind::Scm => &self.scm,
            SlotKind::Trigger => &self.triggers,
            SlotKind::PostBuilder => &self.post_builders,
        }
    }

    pub fn register_scm<T: Shape>(&mut self, class: &str, plugin: Option<&str>) -> &mut Self {
        self.scm.register::<T>(class, plugin);
        self
    }

    pub fn register_trigger<T: Shape>(&mut self, class: &str, plugin: Option<&str>) -> &mut Self {
        self.triggers.register::<T>(class, plugin);
        self
    }

    pub fn register_post_builder<T: Shape>(
        &mut self,
        class: &str,
        plugin: Option<&str>,
    ) -> &mut Self {
        self.post_builders.register::<T>(class, plugin);
        self
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_scm::<SubversionScm>(scm::SUBVERSION_CLASS, Some(scm::SUBVERSION_PLUGIN))
            .register_scm::<GitScm>(scm::GIT_CLASS, Some(scm::GIT_PLUGIN))
            .register_scm::<NullScm>(scm::NULL_CLASS, None)
            .register_trigger::<ScmTrigger>(steps::SCM_TRIGGER_CLASS, None)
            .register_post_builder::<ShellBuilder>(steps::SHELL_CLASS, None);
        registry
    }
}

/// A slot value: the discriminator seen on the wire plus at most one realization.
///
/// `class` and `plugin` are only ever filled by decoding. Replacing the
/// realization clears them, and encoding always derives fresh attribute values
/// from the realization's type.
pub struct Polymorphic<S> {
    class: Option<String>,
    plugin: Option<String>,
    realization: Option<Box<dyn Realization>>,
    _slot: PhantomData<fn() -> S>,
}

pub type ScmBinding = Polymorphic<ScmSlot>;
pub type TriggerBinding = Polymorphic<TriggerSlot>;
pub type PostBuildStep = Polymorphic<PostBuilderSlot>;

impl<S> Default for Polymorphic<S> {
    fn default() -> Self {
        Self {
            class: None,
            plugin: None,
            realization: None,
            _slot: PhantomData,
        }
    }
}

impl<S> Clone for Polymorphic<S> {
    fn clone(&self) -> Self {
        Self {
            class: self.class.clone(),
            plugin: self.plugin.clone(),
            realization: self.realization.clone(),
            _slot: PhantomData,
        }
    }
}

impl<S: Slot> fmt::Debug for Polymorphic<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polymorphic")
            .field("slot", &S::KIND)
            .field("class", &self.class)
            .field("plugin", &self.plugin)
            .field("realization", &self.realization)
            .finish()
    }
}

impl<S: Slot> Polymorphic<S> {
    pub fn new<T: Shape>(shape: T) -> Self {
        Self {
            realization: Some(Box::new(shape)),
            ..Self::default()
        }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.realization.is_none()
    }

    pub fn realization(&self) -> Option<&dyn Realization> {
        self.realization.as_deref()
    }

    pub fn get<T: Shape>(&self) -> Option<&T> {
        self.realization
            .as_deref()
            .and_then(|r| r.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Shape>(&mut self) -> Option<&mut T> {
        self.realization
            .as_deref_mut()
            .and_then(|r| r.as_any_mut().downcast_mut::<T>())
    }

    pub fn set<T: Shape>(&mut self, shape: T) {
        *self = Self::new(shape);
    }

    /// Decodes `element` using the slot's table. Unknown discriminators are
    /// reported to `sink` and leave the realization empty; the attributes are
    /// kept either way.
    pub fn decode(
        element: &Element,
        registry: &Registry,
        sink: &dyn DiagnosticSink,
    ) -> Result<Self> {
        let mut class = element.attr("class").map(str::to_string);
        if class.is_none() && S::NAMED_BY_CLASS {
            class = Some(element.name.clone());
        }
        let plugin = element.attr("plugin").map(str::to_string);

        let table = registry.table(S::KIND);
        let realization = match class.as_deref().and_then(|c| table.decoder(c)) {
            Some(decode) => Some(decode(element)?),
            None => {
                sink.report(&Diagnostic::UnrecognizedClass {
                    slot: S::KIND,
                    class: class.clone().unwrap_or_default(),
                    plugin: plugin.clone(),
                });
                None
            }
        };

        Ok(Self {
            class,
            plugin,
            realization,
            _slot: PhantomData,
        })
    }

    /// Encodes the realization under `tag` (or under its discriminator for
    /// list entries). Unregistered or missing realizations are errors.
    pub fn encode(&self, tag: &str, registry: &Registry) -> Result<Element> {
        let realization = self.realization.as_deref().ok_or_else(|| Error::EmptyVariant {
            slot: S::KIND,
            class: self.class.clone(),
        })?;
        let discriminator = registry
            .table(S::KIND)
            .discriminator_of(realization)
            .ok_or(Error::UnsupportedVariant {
                slot: S::KIND,
                type_name: realization.shape_type_name(),
            })?;

        let mut element = if S::NAMED_BY_CLASS {
            Element::new(discriminator.class.as_str())
        } else {
            Element::new(tag).with_attr("class", discriminator.class.as_str())
        };
        if let Some(plugin) = &discriminator.plugin {
            element.set_attr("plugin", plugin.as_str());
        }
        realization.encode_into(&mut element);
        Ok(element)
    }
}

/// Decodes every child of `list` as an entry of slot `S`.
pub fn decode_list<S: Slot>(
    list: Option<&Element>,
    registry: &Registry,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<Polymorphic<S>>> {
    list.map(|l| l.children.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|entry| Polymorphic::decode(entry, registry, sink))
        .collect()
}

pub fn encode_list<S: Slot>(
    tag: &str,
    entries: &[Polymorphic<S>],
    registry: &Registry,
) -> Result<Element> {
    let mut list = Element::new(tag);
    for entry in entries {
        list.push(entry.encode(tag, registry)?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::diagnostics::CollectingSink;
    use crate::jenkins::scm::BranchSpec;
    use crate::jenkins::xml::parse;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Mercurial {
        source: String,
    }

    impl Shape for Mercurial {
        fn decode(element: &Element) -> Result<Self> {
            Ok(Self {
                source: element.child_text("source"),
            })
        }

        fn encode(&self, element: &mut Element) {
            element.push_text("source", &self.source);
        }
    }

    const GIT: &[u8] = br#"<scm class="hudson.plugins.git.GitSCM" plugin="git@3.9.1">
  <branches><hudson.plugins.git.BranchSpec><name>*/main</name></hudson.plugins.git.BranchSpec></branches>
</scm>"#;

    #[test]
    fn known_class_decodes_and_agrees_with_realization() {
        let sink = CollectingSink::new();
        let registry = Registry::default();
        let scm = ScmBinding::decode(&parse(GIT).unwrap(), &registry, &sink).unwrap();

        assert!(sink.is_empty());
        assert_eq!(scm.plugin(), Some("git@3.9.1"));
        let git = scm.get::<GitScm>().unwrap();
        assert_eq!(git.branches, vec![BranchSpec::new("*/main")]);

        let canonical = registry
            .table(SlotKind::Scm)
            .discriminator_of(scm.realization().unwrap())
            .unwrap();
        assert_eq!(scm.class(), Some(canonical.class.as_str()));
    }

    #[test]
    fn unknown_class_is_reported_and_left_empty() {
        let sink = CollectingSink::new();
        let element =
            parse(br#"<scm class="some.unknown.ScmPlugin" plugin="unknown@1.0"><x/></scm>"#)
                .unwrap();
        let scm = ScmBinding::decode(&element, &Registry::default(), &sink).unwrap();

        assert!(scm.is_empty());
        assert_eq!(scm.class(), Some("some.unknown.ScmPlugin"));
        assert_eq!(scm.plugin(), Some("unknown@1.0"));
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::UnrecognizedClass {
                slot: SlotKind::Scm,
                class: "some.unknown.ScmPlugin".to_string(),
                plugin: Some("unknown@1.0".to_string()),
            }]
        );
    }

    #[test]
    fn encode_derives_attributes_from_the_shape() {
        let scm = ScmBinding::new(GitScm {
            branches: vec![BranchSpec::new("*/dev")],
            ..GitScm::default()
        });
        assert_eq!(scm.class(), None);

        let element = scm.encode("scm", &Registry::default()).unwrap();
        assert_eq!(element.name, "scm");
        assert_eq!(element.attr("class"), Some(scm::GIT_CLASS));
        assert_eq!(element.attr("plugin"), Some(scm::GIT_PLUGIN));
    }

    #[test]
    fn encode_ignores_the_decoded_plugin_string() {
        let sink = CollectingSink::new();
        let registry = Registry::default();
        let scm = ScmBinding::decode(&parse(GIT).unwrap(), &registry, &sink).unwrap();
        let element = scm.encode("scm", &registry).unwrap();
        assert_eq!(element.attr("plugin"), Some(scm::GIT_PLUGIN));
    }

    #[test]
    fn unregistered_shape_fails_to_encode() {
        let scm = ScmBinding::new(Mercurial {
            source: "https://hg.example.com/repo".to_string(),
        });
        let err = scm.encode("scm", &Registry::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedVariant {
                slot: SlotKind::Scm,
                ..
            }
        ));
        assert!(err.to_string().contains("Mercurial"));
    }

    #[test]
    fn empty_slot_fails_to_encode() {
        let sink = CollectingSink::new();
        let element = parse(br#"<scm class="some.unknown.ScmPlugin"/>"#).unwrap();
        let scm = ScmBinding::decode(&element, &Registry::default(), &sink).unwrap();
        assert!(matches!(
            scm.encode("scm", &Registry::default()),
            Err(Error::EmptyVariant { slot: SlotKind::Scm, class: Some(_) })
        ));
    }

    #[test]
    fn registering_a_shape_extends_both_directions() {
        let mut registry = Registry::default();
        registry.register_scm::<Mercurial>(
            "hudson.plugins.mercurial.MercurialSCM",
            Some("mercurial@2.8"),
        );

        let element = parse(
            br#"<scm class="hudson.plugins.mercurial.MercurialSCM"><source>hg://x</source></scm>"#,
        )
        .unwrap();
        let sink = CollectingSink::new();
        let scm = ScmBinding::decode(&element, &registry, &sink).unwrap();
        assert_eq!(
            scm.get::<Mercurial>(),
            Some(&Mercurial {
                source: "hg://x".to_string()
            })
        );

        let encoded = scm.encode("scm", &registry).unwrap();
        assert_eq!(encoded.attr("plugin"), Some("mercurial@2.8"));
        assert_eq!(encoded.child_text("source"), "hg://x");
    }

    #[test]
    fn list_entries_use_their_element_name() {
        let sink = CollectingSink::new();
        let registry = Registry::default();
        let list = parse(
            br#"<triggers>
  <hudson.triggers.SCMTrigger><spec>H/15 * * * *</spec><ignorePostCommitHooks>false</ignorePostCommitHooks></hudson.triggers.SCMTrigger>
  <hudson.triggers.TimerTrigger><spec>@daily</spec></hudson.triggers.TimerTrigger>
</triggers>"#,
        )
        .unwrap();

        let triggers = decode_list::<TriggerSlot>(Some(&list), &registry, &sink).unwrap();
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].class(), Some(steps::SCM_TRIGGER_CLASS));
        assert_eq!(triggers[0].get::<ScmTrigger>().unwrap().spec, "H/15 * * * *");
        assert!(triggers[1].is_empty());
        assert_eq!(sink.diagnostics().len(), 1);

        let encoded = encode_list("triggers", &triggers[..1], &registry).unwrap();
        assert_eq!(encoded.children[0].name, steps::SCM_TRIGGER_CLASS);
        assert_eq!(encoded.children[0].attr("class"), None);
    }

    #[test]
    fn shapes_in_the_wrong_slot_are_rejected() {
        let trigger = TriggerBinding::new(ShellBuilder {
            command: "make".to_string(),
        });
        assert!(matches!(
            trigger.encode("triggers", &Registry::default()),
            Err(Error::UnsupportedVariant {
                slot: SlotKind::Trigger,
                ..
            })
        ));
    }

    #[test]
    fn set_replaces_realization_and_forgets_wire_attributes() {
        let sink = CollectingSink::new();
        let mut scm =
            ScmBinding::decode(&parse(GIT).unwrap(), &Registry::default(), &sink).unwrap();
        scm.set(NullScm);
        assert_eq!(scm.class(), None);
        assert_eq!(scm.plugin(), None);
        assert!(scm.get::<GitScm>().is_none());
        assert!(scm.get::<NullScm>().is_some());
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut scm = ScmBinding::new(GitScm::default());
        scm.get_mut::<GitScm>()
            .unwrap()
            .branches
            .push(BranchSpec::new("*/release"));
        assert_eq!(scm.get::<GitScm>().unwrap().branches.len(), 1);
    }
}
