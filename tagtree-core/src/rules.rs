//! Tag syntax rules: which close modes a tag name may use.
//!
//! A [`RuleSet`] holds an optional default rule plus per-tag-name overrides.
//! The scanner only reads it. Lookups fall back to the default rule, and
//! with no default at all to [`CloseMode::ALL`], which is deliberately looser
//! than XML: any tag may close with an end tag, self-close, or stay void.

use std::collections::HashMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use phf::phf_set;

use crate::error::RuleError;

/// HTML elements that never take children or an end tag.
static HTML_VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
};

/// Set of ways a tag may terminate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CloseMode(u8);

impl CloseMode {
    /// No close mode at all.
    pub const NONE: CloseMode = CloseMode(0);
    /// Explicit end tag: `<div></div>`.
    pub const TAG: CloseMode = CloseMode(1);
    /// Self-closing opener: `<br />`.
    pub const SELF_CLOSE: CloseMode = CloseMode(2);
    /// Neither: `<meta>`.
    pub const VOID: CloseMode = CloseMode(4);
    /// Every mode.
    pub const ALL: CloseMode = CloseMode(1 | 2 | 4);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every mode in `other` is also in `self`.
    #[inline]
    pub const fn contains(self, other: CloseMode) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: CloseMode) -> CloseMode {
        CloseMode(self.0 | other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if exactly one mode is set.
    #[inline]
    pub const fn is_singular(self) -> bool {
        matches!(self.0, 1 | 2 | 4)
    }
}

impl BitOr for CloseMode {
    type Output = CloseMode;

    fn bitor(self, rhs: CloseMode) -> CloseMode {
        self.union(rhs)
    }
}

impl BitOrAssign for CloseMode {
    fn bitor_assign(&mut self, rhs: CloseMode) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for CloseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CloseMode({})", self)
    }
}

impl fmt::Display for CloseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names = [
            (CloseMode::TAG, "Tag"),
            (CloseMode::SELF_CLOSE, "SelfClose"),
            (CloseMode::VOID, "Void"),
        ];
        let mut first = true;
        for (mode, name) in names {
            if self.contains(mode) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Binds one or more tag names to an allowed close-mode set.
///
/// A rule with no tag names is only useful as a default rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSyntaxRule {
    tag_names: Vec<String>,
    close_modes: CloseMode,
}

impl TagSyntaxRule {
    /// Rule for a single tag, permitting every close mode until narrowed.
    pub fn for_tag(name: impl Into<String>) -> Self {
        TagSyntaxRule {
            tag_names: vec![name.into()],
            close_modes: CloseMode::ALL,
        }
    }

    /// Rule shared by several tags.
    pub fn for_tags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagSyntaxRule {
            tag_names: names.into_iter().map(Into::into).collect(),
            close_modes: CloseMode::ALL,
        }
    }

    /// Rule bound to no tag name, for use as a default.
    pub fn unnamed(close_modes: CloseMode) -> Self {
        TagSyntaxRule {
            tag_names: Vec::new(),
            close_modes,
        }
    }

    pub fn with_close_modes(mut self, close_modes: CloseMode) -> Self {
        self.close_modes = close_modes;
        self
    }

    pub fn set_close_modes(&mut self, close_modes: CloseMode) {
        self.close_modes = close_modes;
    }

    pub fn close_modes(&self) -> CloseMode {
        self.close_modes
    }

    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }
}

/// Per-tag close-mode configuration consulted by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    default_rule: Option<TagSyntaxRule>,
    overrides: HashMap<String, TagSyntaxRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    /// Permissive rule set: every tag allows `Tag | SelfClose | Void`.
    pub fn new() -> Self {
        RuleSet {
            default_rule: Some(TagSyntaxRule::unnamed(CloseMode::ALL)),
            overrides: HashMap::new(),
        }
    }

    /// Rule set without a default rule; unconfigured tags still fall back to
    /// [`CloseMode::ALL`].
    pub fn empty() -> Self {
        RuleSet {
            default_rule: None,
            overrides: HashMap::new(),
        }
    }

    /// XML-like rules: every tag must close with an end tag or self-close.
    pub fn strict_xml() -> Self {
        let mut rules = Self::empty();
        rules.set_default_rule(TagSyntaxRule::unnamed(CloseMode::TAG | CloseMode::SELF_CLOSE));
        rules
    }

    /// HTML-like rules: strict XML defaults, with the HTML void elements
    /// allowed to stay open or self-close but never take an end tag.
    pub fn html() -> Self {
        let mut rules = Self::strict_xml();
        let mut void_names: Vec<&str> = HTML_VOID_ELEMENTS.iter().copied().collect();
        void_names.sort_unstable();
        rules.add_rule(
            TagSyntaxRule::for_tags(void_names)
                .with_close_modes(CloseMode::VOID | CloseMode::SELF_CLOSE),
        );
        rules
    }

    /// True if `name` is an HTML void element.
    pub fn is_html_void_element(name: &str) -> bool {
        HTML_VOID_ELEMENTS.contains(name)
    }

    pub fn default_rule(&self) -> Option<&TagSyntaxRule> {
        self.default_rule.as_ref()
    }

    pub fn set_default_rule(&mut self, rule: TagSyntaxRule) -> &mut Self {
        self.default_rule = Some(rule);
        self
    }

    pub fn clear_default_rule(&mut self) -> &mut Self {
        self.default_rule = None;
        self
    }

    /// Register `rule` for each of its tag names, replacing earlier overrides
    /// for those names.
    pub fn add_rule(&mut self, rule: TagSyntaxRule) -> &mut Self {
        for name in rule.tag_names() {
            self.overrides.insert(name.clone(), rule.clone());
        }
        self
    }

    pub fn add_rules<I: IntoIterator<Item = TagSyntaxRule>>(&mut self, rules: I) -> &mut Self {
        for rule in rules {
            self.add_rule(rule);
        }
        self
    }

    pub fn remove_rule_for_tag(&mut self, name: &str) -> Option<TagSyntaxRule> {
        self.overrides.remove(name)
    }

    pub fn rule_for_tag(&self, name: &str) -> Option<&TagSyntaxRule> {
        self.overrides.get(name)
    }

    pub fn has_rule_for_tag(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    /// Apply every override of `other` on top of this set. The default rule is
    /// taken over only if `other` has one.
    pub fn merge(&mut self, other: &RuleSet) -> &mut Self {
        if let Some(rule) = &other.default_rule {
            self.default_rule = Some(rule.clone());
        }
        for (name, rule) in &other.overrides {
            self.overrides.insert(name.clone(), rule.clone());
        }
        self
    }

    /// Close modes allowed for `name`: its override, else the default rule.
    pub fn allowed_close_modes(&self, name: &str) -> CloseMode {
        self.overrides
            .get(name)
            .or(self.default_rule.as_ref())
            .map_or(CloseMode::ALL, TagSyntaxRule::close_modes)
    }

    /// Whether a single close `mode` is allowed for `name`.
    ///
    /// Asking about a combination of modes is a usage error.
    pub fn is_close_mode_allowed(&self, name: &str, mode: CloseMode) -> Result<bool, RuleError> {
        if !mode.is_singular() {
            return Err(RuleError::CombinedCloseMode(mode));
        }
        Ok(self.allowed_close_modes(name).contains(mode))
    }
}
