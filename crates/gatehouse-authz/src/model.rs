//! Policy model definitions and the textual model grammar.
//!
//! # Purpose
//! Builds the immutable [`Model`] (request, policy, role, effect and matcher
//! definitions) that every evaluator is compiled from.
//!
//! # How it fits
//! Configuration code builds a model once, either from a structured map or
//! from the `.conf` text form, and hands it to
//! [`PolicyStore::build_evaluator`](crate::PolicyStore::build_evaluator).
//!
//! # Key invariants
//! - A model never changes after it is built; rebuilding yields a new value.
//! - Section names map to fixed tags (`request_definition` -> `r`, ...); any
//!   other bracketed name maps to its first character.
//! - Missing effect or matcher definitions are only reported when an
//!   evaluator is built, never while parsing.
//!
//! # Examples
//! ```rust
//! use gatehouse_authz::Model;
//!
//! let model = Model::from_text(
//!     "[request_definition]\nr = sub, obj, act\n\n[matchers]\nm = r.sub == p.sub\n",
//! );
//! assert_eq!(model.get("r", "r"), Some("sub, obj, act"));
//! assert_eq!(model.get("m", "m"), Some("r.sub == p.sub"));
//! ```
//!
//! # Common pitfalls
//! - The default parser skips lines it does not understand. Use
//!   [`Model::from_text_strict`] when config files are authored by hand.
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act, eft

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = g(r.sub, p.sub) && keyMatch2(r.obj, p.obj) && keyMatch(r.act, p.act)
"#;

const DEFAULT_DOMAIN_MODEL: &str = r#"
[request_definition]
r = sub, dom, obj, act

[policy_definition]
p = sub, dom, obj, act, eft

[role_definition]
g = _, _, _

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = (g(r.sub, p.sub, r.dom) || g(r.sub, p.sub, "*")) && (r.dom == p.dom || p.dom == "*") && keyMatch2(r.obj, p.obj) && keyMatch(r.act, p.act)
"#;

// Canonical section order used when rendering the text form.
const SECTION_ORDER: [(&str, &str); 5] = [
    ("r", "request_definition"),
    ("p", "policy_definition"),
    ("g", "role_definition"),
    ("e", "policy_effect"),
    ("m", "matchers"),
];

pub fn default_model_string() -> &'static str {
    DEFAULT_MODEL
}

pub fn default_domain_model_string() -> &'static str {
    DEFAULT_DOMAIN_MODEL
}

/// Map a bracketed section name to its one-letter tag.
pub fn section_tag(name: &str) -> Option<String> {
    let tag = match name {
        "request_definition" => "r",
        "policy_definition" => "p",
        "role_definition" => "g",
        "policy_effect" => "e",
        "matchers" => "m",
        other => return other.chars().next().map(String::from),
    };
    Some(tag.to_string())
}

/// Definitions within one section, keyed by definition name.
pub type Section = BTreeMap<String, String>;

/// Immutable policy model.
///
/// # Invariants
/// - Section keys are one-letter tags.
/// - Definition names and expressions are stored trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    sections: BTreeMap<String, Section>,
}

impl Model {
    /// The built-in deny-override RBAC model.
    pub fn default_rbac() -> Self {
        Self::from_text(DEFAULT_MODEL)
    }

    /// The built-in deny-override RBAC model with domain-scoped roles.
    pub fn default_domain_rbac() -> Self {
        Self::from_text(DEFAULT_DOMAIN_MODEL)
    }

    /// Build a model from `section -> {name -> expression}` definitions.
    ///
    /// Section keys may be tags (`r`) or full section names
    /// (`request_definition`); both resolve through [`section_tag`].
    pub fn from_definitions<S, N, E, D>(definitions: impl IntoIterator<Item = (S, D)>) -> Self
    where
        S: AsRef<str>,
        N: AsRef<str>,
        E: AsRef<str>,
        D: IntoIterator<Item = (N, E)>,
    {
        let mut builder = ModelBuilder::new();
        for (section, defs) in definitions {
            for (name, expression) in defs {
                builder = builder.definition(section.as_ref(), name.as_ref(), expression.as_ref());
            }
        }
        builder.build()
    }

    /// Parse the textual grammar, skipping lines that do not fit it.
    pub fn from_text(text: &str) -> Self {
        // Permissive mode never produces an error.
        parse(text, false).unwrap_or_default()
    }

    /// Parse the textual grammar, rejecting malformed lines.
    ///
    /// # Errors
    /// - [`AuthzError::MalformedModelLine`] for an assignment outside any
    ///   section, a line without `=`, or an empty section header.
    pub fn from_text_strict(text: &str) -> AuthzResult<Self> {
        parse(text, true)
    }

    pub fn from_file(path: impl AsRef<Path>, strict: bool) -> AuthzResult<Self> {
        let text = std::fs::read_to_string(path)?;
        parse(&text, strict)
    }

    pub fn get(&self, tag: &str, name: &str) -> Option<&str> {
        self.sections
            .get(tag)
            .and_then(|section| section.get(name))
            .map(String::as_str)
    }

    pub fn section(&self, tag: &str) -> Option<&Section> {
        self.sections.get(tag)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .map(|(tag, section)| (tag.as_str(), section))
    }

    /// Whether `tag` holds at least one non-empty definition.
    pub fn has_definition(&self, tag: &str) -> bool {
        self.sections
            .get(tag)
            .is_some_and(|section| section.values().any(|value| !value.is_empty()))
    }

    /// Check that the model can drive an evaluator.
    ///
    /// # Errors
    /// - [`AuthzError::MissingDefinition`] when the effect or matcher section
    ///   is absent or empty.
    pub fn validate(&self) -> AuthzResult<()> {
        if !self.has_definition("e") {
            return Err(AuthzError::MissingDefinition("e"));
        }
        if !self.has_definition("m") {
            return Err(AuthzError::MissingDefinition("m"));
        }
        Ok(())
    }

    /// Whether the policy definition carries an `eft` column.
    pub fn policy_has_effect(&self) -> bool {
        self.get("p", "p")
            .is_some_and(|value| value.split(',').any(|token| token.trim() == "eft"))
    }

    /// Whether the request definition carries a domain column.
    pub fn request_has_domain(&self) -> bool {
        self.get("r", "r")
            .is_some_and(|value| value.split(',').any(|token| token.trim() == "dom"))
    }

    /// Render the model back into the textual grammar.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (tag, header) in SECTION_ORDER {
            if let Some(section) = self.sections.get(tag) {
                render_section(&mut out, header, section);
            }
        }
        for (tag, section) in &self.sections {
            if SECTION_ORDER.iter().any(|(known, _)| known == tag) {
                continue;
            }
            render_section(&mut out, tag, section);
        }
        out
    }
}

fn render_section(out: &mut String, header: &str, section: &Section) {
    out.push('[');
    out.push_str(header);
    out.push_str("]\n");
    for (name, expression) in section {
        out.push_str(name);
        out.push_str(" = ");
        out.push_str(expression);
        out.push('\n');
    }
    out.push('\n');
}

/// Incremental builder for [`Model`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    sections: BTreeMap<String, Section>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one definition. Later definitions with the same name replace
    /// earlier ones. A section name that maps to no tag is ignored.
    pub fn definition(mut self, section: &str, name: &str, expression: &str) -> Self {
        if let Some(tag) = section_tag(section.trim()) {
            self.sections
                .entry(tag)
                .or_default()
                .insert(name.trim().to_string(), expression.trim().to_string());
        }
        self
    }

    pub fn build(self) -> Model {
        Model {
            sections: self.sections,
        }
    }
}

fn parse(text: &str, strict: bool) -> AuthzResult<Model> {
    let mut builder = ModelBuilder::new();
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = section_tag(name.trim());
            if current.is_none() {
                malformed(strict, idx + 1, line)?;
            }
            continue;
        }

        match (current.as_deref(), line.split_once('=')) {
            (Some(tag), Some((key, value))) if !key.trim().is_empty() => {
                builder = builder.definition(tag, key, value);
            }
            _ => malformed(strict, idx + 1, line)?,
        }
    }

    Ok(builder.build())
}

fn malformed(strict: bool, line: usize, text: &str) -> AuthzResult<()> {
    if strict {
        return Err(AuthzError::MalformedModelLine {
            line,
            text: text.to_string(),
        });
    }
    tracing::debug!(line, text, "skipping unrecognized model line");
    Ok(())
}
