use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::error::RuleError;
use super::rule::{Rule, RuleKind};

/// A node of the compiled rule tree, mirroring one level of the data paths.
#[derive(Debug, Clone, Default)]
pub struct RulesetNode {
    pub(crate) name: String,
    pub(crate) wildcard: bool,
    pub(crate) read: Option<Rule>,
    pub(crate) write: Option<Rule>,
    pub(crate) validate: Option<Rule>,
    pub(crate) index_on: Option<Vec<String>>,
    pub(crate) children: BTreeMap<String, RulesetNode>,
    pub(crate) wildchild: Option<Box<RulesetNode>>,
}

impl RulesetNode {
    /// The key this node was defined under (`$name` for wildcards, empty for
    /// the root).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    #[must_use]
    pub fn rule(&self, kind: RuleKind) -> Option<&Rule> {
        match kind {
            RuleKind::Read => self.read.as_ref(),
            RuleKind::Write => self.write.as_ref(),
            RuleKind::Validate => self.validate.as_ref(),
        }
    }

    #[must_use]
    pub fn index_on(&self) -> Option<&[String]> {
        self.index_on.as_deref()
    }

    /// Children with literal names.
    pub fn children(&self) -> impl Iterator<Item = &RulesetNode> {
        self.children.values()
    }

    #[must_use]
    pub fn wildchild(&self) -> Option<&RulesetNode> {
        self.wildchild.as_deref()
    }

    /// Resolve the rules for data key `name`: an exact child wins, otherwise
    /// the wildcard child matches and `wildcards` gains its binding.
    #[must_use]
    pub fn child(&self, name: &str, wildcards: &mut BTreeMap<String, String>) -> Option<&RulesetNode> {
        if let Some(child) = self.children.get(name) {
            return Some(child);
        }
        let wild = self.wildchild.as_deref()?;
        wildcards.insert(wild.name.clone(), name.to_owned());
        Some(wild)
    }

    /// Follow `segments` from this node, binding wildcards on the way.
    #[must_use]
    pub fn descend(
        &self,
        segments: &[&str],
        wildcards: &mut BTreeMap<String, String>,
    ) -> Option<&RulesetNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.child(segment, wildcards))
    }

    pub(crate) fn count(&self) -> (usize, usize) {
        let rules = [&self.read, &self.write, &self.validate]
            .iter()
            .filter(|r| r.is_some())
            .count();
        self.children
            .values()
            .chain(self.wildchild.as_deref())
            .map(RulesetNode::count)
            .fold((1, rules), |(n, r), (cn, cr)| (n + cn, r + cr))
    }
}

/// A compiled, immutable rule tree. Thread-safe and designed to live behind `Arc`.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub(crate) root: RulesetNode,
}

impl Ruleset {
    /// Compile a `{"rules": {...}}` definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] for a malformed tree or any rule that fails to
    /// parse or type-check. No partial ruleset is produced.
    pub fn from_json(definition: &JsonValue) -> Result<Self, RuleError> {
        crate::compile::compile(definition)
    }

    /// Parse rules JSON text, which may contain `//` and `/* */` comments.
    ///
    /// # Errors
    ///
    /// Returns [`Error`](crate::Error) on malformed text or an invalid ruleset.
    pub fn from_source(source: &str) -> Result<Self, crate::Error> {
        let stripped = crate::parse::strip_comments(source)?;
        let json: JsonValue = serde_json::from_str(&stripped)?;
        Ok(Self::from_json(&json)?)
    }

    /// Read a rules file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`Error`](crate::Error) on I/O, syntax or rule failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let source = std::fs::read_to_string(path)?;
        Self::from_source(&source)
    }

    #[must_use]
    pub fn root(&self) -> &RulesetNode {
        &self.root
    }

    /// Number of nodes and of compiled rules in the tree.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        self.root.count()
    }
}
