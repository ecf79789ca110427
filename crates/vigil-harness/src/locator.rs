//! Declarative element references.
//!
//! A [`Locator`] names an element by something the application exposes on
//! purpose (ARIA role and accessible name, label text, test id) or, as a last
//! resort, by CSS selector or visible text. Locators are plain data: they are
//! re-evaluated against the live page every time they are used and never
//! cache a match.
//!
//! Locators have a compact string form used in scenario files, logs and on
//! the command line:
//!
//! ```text
//! role=button[name="Create"]
//! label=Style Intensity
//! testid=prompt-input
//! css=textarea[aria-label="Animation prompt"]
//! text=Conservative
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A declarative reference to a page element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "LocatorRepr")]
pub enum Locator {
    /// ARIA role plus accessible name, e.g. `button` named `Create`.
    Role {
        /// ARIA role (explicit `role` attribute or implicit from the tag)
        role: String,
        /// Accessible name (aria-label, associated label, or text content)
        name: String,
    },
    /// Form control associated with a `<label>` or `aria-label` text.
    Label(String),
    /// Element carrying `data-testid`.
    TestId(String),
    /// Raw CSS selector.
    Selector(String),
    /// Element whose own visible text contains the given string.
    Text(String),
}

impl Locator {
    /// Locates by ARIA role and accessible name.
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Locates a form control by its label.
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label(text.into())
    }

    /// Locates by `data-testid`.
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Locates by CSS selector.
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Selector(selector.into())
    }

    /// Locates by visible text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Short name of the discriminator kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role { .. } => "role",
            Self::Label(_) => "label",
            Self::TestId(_) => "testid",
            Self::Selector(_) => "css",
            Self::Text(_) => "text",
        }
    }

    /// Checks that the discriminator is usable.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when a required part is blank.
    pub fn validate(&self) -> Result<(), String> {
        let blank = |s: &str| s.trim().is_empty();
        match self {
            Self::Role { role, name } => {
                if blank(role) {
                    return Err("role locator needs a role".to_string());
                }
                if blank(name) {
                    return Err(format!("role locator '{role}' needs an accessible name"));
                }
                Ok(())
            }
            Self::Label(v) | Self::TestId(v) | Self::Selector(v) | Self::Text(v) => {
                if blank(v) {
                    Err(format!("{} locator cannot be empty", self.kind()))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name } => {
                let quoted = serde_json::to_string(name).map_err(|_| fmt::Error)?;
                write!(f, "role={role}[name={quoted}]")
            }
            Self::Label(v) => write!(f, "label={v}"),
            Self::TestId(v) => write!(f, "testid={v}"),
            Self::Selector(v) => write!(f, "css={v}"),
            Self::Text(v) => write!(f, "text={v}"),
        }
    }
}

impl FromStr for Locator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once('=')
            .ok_or_else(|| format!("locator '{s}' must look like <kind>=<value>"))?;

        match kind.trim() {
            "role" => parse_role(value),
            "label" => Ok(Self::Label(value.to_string())),
            "testid" | "test_id" => Ok(Self::TestId(value.to_string())),
            "css" => Ok(Self::Selector(value.to_string())),
            "text" => Ok(Self::Text(value.to_string())),
            other => Err(format!(
                "unknown locator kind '{other}' (expected role, label, testid, css or text)"
            )),
        }
    }
}

fn parse_role(value: &str) -> Result<Locator, String> {
    let Some((role, rest)) = value.split_once('[') else {
        return Ok(Locator::role(value.trim(), ""));
    };

    let inner = rest
        .strip_suffix(']')
        .ok_or_else(|| format!("role locator '{value}' is missing a closing ']'"))?;
    let raw_name = inner
        .trim()
        .strip_prefix("name=")
        .ok_or_else(|| format!("role locator '{value}' only supports [name=...]"))?
        .trim();

    let name = if raw_name.starts_with('"') {
        serde_json::from_str::<String>(raw_name)
            .map_err(|e| format!("bad quoted name in '{value}': {e}"))?
    } else {
        raw_name.to_string()
    };

    Ok(Locator::role(role.trim(), name))
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

/// Accepted on-disk forms: the shorthand string or a table naming one kind.
#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Shorthand(String),
    Table(LocatorTable),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LocatorTable {
    role: Option<String>,
    name: Option<String>,
    label: Option<String>,
    #[serde(alias = "testid")]
    test_id: Option<String>,
    css: Option<String>,
    text: Option<String>,
}

impl TryFrom<LocatorRepr> for Locator {
    type Error = String;

    fn try_from(repr: LocatorRepr) -> Result<Self, Self::Error> {
        let table = match repr {
            LocatorRepr::Shorthand(s) => return s.parse(),
            LocatorRepr::Table(table) => table,
        };

        let mut found = Vec::new();
        if let Some(role) = table.role {
            found.push(Locator::role(role, table.name.unwrap_or_default()));
        } else if table.name.is_some() {
            return Err("'name' is only valid together with 'role'".to_string());
        }
        if let Some(v) = table.label {
            found.push(Locator::Label(v));
        }
        if let Some(v) = table.test_id {
            found.push(Locator::TestId(v));
        }
        if let Some(v) = table.css {
            found.push(Locator::Selector(v));
        }
        if let Some(v) = table.text {
            found.push(Locator::Text(v));
        }

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err("locator table names no kind (role, label, test_id, css, text)".to_string()),
            _ => Err("locator table names more than one kind".to_string()),
        }
    }
}
