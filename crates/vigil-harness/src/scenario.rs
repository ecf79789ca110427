//! Scenario and step definitions.
//!
//! A [`Scenario`] is an immutable, validated list of [`Step`]s plus the
//! application's entry URL. Validation happens once, when the scenario is
//! built (or deserialized), so a malformed locator is reported as a caller
//! bug before any browser is launched.

use crate::error::ScenarioError;
use crate::locator::Locator;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What "the page has loaded" means for a `Navigate` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// `document.readyState` is `interactive` or `complete`.
    #[default]
    DomContentLoaded,
    /// `document.readyState` is `complete`.
    Load,
    /// Loaded, and no new resource entries for a quiet window.
    NetworkIdle,
}

/// The condition a `WaitFor` step waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    /// At least one match exists in the DOM.
    Attached,
    /// At least one match is visible.
    #[default]
    Visible,
    /// No match is visible (including no match at all).
    Hidden,
    /// Nothing matches.
    Detached,
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Detached => "detached",
        })
    }
}

/// The action or check a step performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepKind {
    /// Load a URL (relative URLs resolve against the entry URL).
    Navigate {
        /// Target URL
        url: String,
    },
    /// Clear a unique input and type a value into it.
    Fill {
        /// Input to fill
        locator: Locator,
        /// Text to type
        value: String,
    },
    /// Click a unique element.
    Click {
        /// Element to click
        locator: Locator,
    },
    /// Wait until the locator reaches a state.
    WaitFor {
        /// Element to watch
        locator: Locator,
        /// State to wait for
        #[serde(default)]
        state: WaitState,
    },
    /// Check that a unique element is visible.
    AssertVisible {
        /// Element to check
        locator: Locator,
    },
    /// Check that no match is visible.
    AssertHidden {
        /// Element to check
        locator: Locator,
    },
    /// Check a unique element's normalized text.
    AssertText {
        /// Element to check
        locator: Locator,
        /// Expected text, compared after collapsing whitespace
        expected: String,
    },
    /// Wait until the page URL matches a glob pattern.
    WaitForUrl {
        /// Glob where `**` matches anything and `*` stays within a segment
        pattern: String,
    },
    /// Record a screenshot as evidence.
    Capture {
        /// Evidence label
        label: String,
    },
}

impl StepKind {
    /// Short action name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Fill { .. } => "fill",
            Self::Click { .. } => "click",
            Self::WaitFor { .. } => "wait_for",
            Self::AssertVisible { .. } => "assert_visible",
            Self::AssertHidden { .. } => "assert_hidden",
            Self::AssertText { .. } => "assert_text",
            Self::WaitForUrl { .. } => "wait_for_url",
            Self::Capture { .. } => "capture",
        }
    }

    /// The locator this step targets, if any.
    #[must_use]
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Fill { locator, .. }
            | Self::Click { locator }
            | Self::WaitFor { locator, .. }
            | Self::AssertVisible { locator }
            | Self::AssertHidden { locator }
            | Self::AssertText { locator, .. } => Some(locator),
            Self::Navigate { .. } | Self::WaitForUrl { .. } | Self::Capture { .. } => None,
        }
    }
}

/// One step of a scenario with its optional timeout override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// What the step does.
    #[serde(flatten)]
    pub kind: StepKind,

    /// Overrides the scenario's step timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Step {
    fn of(kind: StepKind) -> Self {
        Self {
            kind,
            timeout_ms: None,
        }
    }

    /// `Navigate(url)`.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::of(StepKind::Navigate { url: url.into() })
    }

    /// `Fill(locator, value)`.
    pub fn fill(locator: Locator, value: impl Into<String>) -> Self {
        Self::of(StepKind::Fill {
            locator,
            value: value.into(),
        })
    }

    /// `Click(locator)`.
    #[must_use]
    pub fn click(locator: Locator) -> Self {
        Self::of(StepKind::Click { locator })
    }

    /// `WaitFor(locator, visible)`.
    #[must_use]
    pub fn wait_for(locator: Locator) -> Self {
        Self::wait_for_state(locator, WaitState::Visible)
    }

    /// `WaitFor(locator, state)`.
    #[must_use]
    pub fn wait_for_state(locator: Locator, state: WaitState) -> Self {
        Self::of(StepKind::WaitFor { locator, state })
    }

    /// `AssertVisible(locator)`.
    #[must_use]
    pub fn assert_visible(locator: Locator) -> Self {
        Self::of(StepKind::AssertVisible { locator })
    }

    /// `AssertHidden(locator)`.
    #[must_use]
    pub fn assert_hidden(locator: Locator) -> Self {
        Self::of(StepKind::AssertHidden { locator })
    }

    /// `AssertText(locator, expected)`.
    pub fn assert_text(locator: Locator, expected: impl Into<String>) -> Self {
        Self::of(StepKind::AssertText {
            locator,
            expected: expected.into(),
        })
    }

    /// `WaitForUrl(pattern)`.
    pub fn wait_for_url(pattern: impl Into<String>) -> Self {
        Self::of(StepKind::WaitForUrl {
            pattern: pattern.into(),
        })
    }

    /// `Capture(label)`.
    pub fn capture(label: impl Into<String>) -> Self {
        Self::of(StepKind::Capture {
            label: label.into(),
        })
    }

    /// Sets a timeout override for this step.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The override, if one was set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self, index: usize) -> Result<(), ScenarioError> {
        if let Some(locator) = self.kind.locator() {
            locator
                .validate()
                .map_err(|reason| ScenarioError::InvalidLocator { index, reason })?;
        }

        let invalid = |reason: &str| ScenarioError::InvalidStep {
            index,
            reason: reason.to_string(),
        };
        match &self.kind {
            StepKind::Navigate { url } if url.trim().is_empty() => {
                Err(invalid("navigate needs a URL"))
            }
            StepKind::Capture { label } if label.trim().is_empty() => {
                Err(invalid("capture needs a label"))
            }
            StepKind::WaitForUrl { pattern } => UrlPattern::new(pattern)
                .map(|_| ())
                .map_err(|reason| invalid(&reason)),
            _ => Ok(()),
        }
    }
}

/// Scenario-level overrides of the harness defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSettings {
    /// Default timeout for steps without an override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_timeout_ms: Option<u64>,

    /// Budget for the whole run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout_ms: Option<u64>,

    /// Readiness signal for `Navigate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<Readiness>,
}

/// An ordered user-journey verification sequence.
///
/// Immutable once built; construct with [`Scenario::builder`] or deserialize
/// from a scenario file (both paths validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioDef", into = "ScenarioDef")]
pub struct Scenario {
    name: String,
    entry_url: String,
    settings: ScenarioSettings,
    steps: Vec<Step>,
}

impl Scenario {
    /// Starts building a scenario.
    pub fn builder(name: impl Into<String>, entry_url: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            name: name.into(),
            entry_url: entry_url.into(),
            settings: ScenarioSettings::default(),
            steps: Vec::new(),
        }
    }

    /// Scenario name, used to key evidence.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry URL of the application under test.
    #[must_use]
    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }

    /// Steps in declaration order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Scenario-level overrides.
    #[must_use]
    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    /// Resolves a step URL against the entry URL.
    ///
    /// Absolute URLs pass through untouched.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        const ABSOLUTE: [&str; 5] = ["http://", "https://", "about:", "data:", "file:"];
        if ABSOLUTE.iter().any(|scheme| url.starts_with(scheme)) {
            return url.to_string();
        }

        let base = self.entry_url.trim_end_matches('/');
        let path = url.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Builder for [`Scenario`].
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    entry_url: String,
    settings: ScenarioSettings,
    steps: Vec<Step>,
}

impl ScenarioBuilder {
    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends several steps.
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Default timeout for steps without an override.
    #[must_use]
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.settings.step_timeout_ms = Some(millis(timeout));
        self
    }

    /// Budget for the whole run.
    #[must_use]
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.settings.run_timeout_ms = Some(millis(timeout));
        self
    }

    /// Readiness signal for `Navigate` steps.
    #[must_use]
    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.settings.readiness = Some(readiness);
        self
    }

    /// Validates and freezes the scenario.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocator` for a blank discriminator, `InvalidStep` for
    /// unusable step arguments, and `EmptyName`/`EmptyEntryUrl` for a blank
    /// header.
    pub fn build(self) -> Result<Scenario, ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::EmptyName);
        }
        if self.entry_url.trim().is_empty() {
            return Err(ScenarioError::EmptyEntryUrl(self.name));
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }

        Ok(Scenario {
            name: self.name,
            entry_url: self.entry_url,
            settings: self.settings,
            steps: self.steps,
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// On-disk shape of a scenario file.
#[derive(Serialize, Deserialize)]
struct ScenarioDef {
    name: String,
    entry_url: String,
    #[serde(flatten)]
    settings: ScenarioSettings,
    #[serde(default)]
    steps: Vec<Step>,
}

impl TryFrom<ScenarioDef> for Scenario {
    type Error = ScenarioError;

    fn try_from(def: ScenarioDef) -> Result<Self, Self::Error> {
        let mut builder = Scenario::builder(def.name, def.entry_url).steps(def.steps);
        builder.settings = def.settings;
        builder.build()
    }
}

impl From<Scenario> for ScenarioDef {
    fn from(scenario: Scenario) -> Self {
        Self {
            name: scenario.name,
            entry_url: scenario.entry_url,
            settings: scenario.settings,
            steps: scenario.steps,
        }
    }
}

/// A compiled URL glob.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    source: String,
    regex: Regex,
}

impl UrlPattern {
    /// Compiles a glob: `**` matches anything, `*` matches within one path
    /// segment, everything else is literal.
    ///
    /// # Errors
    ///
    /// Returns a reason when the pattern is blank.
    pub fn new(pattern: &str) -> Result<Self, String> {
        if pattern.trim().is_empty() {
            return Err("URL pattern cannot be empty".to_string());
        }

        let mut expr = String::from("^");
        let mut rest = pattern;
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("**") {
                expr.push_str(".*");
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('*') {
                expr.push_str("[^/]*");
                rest = tail;
            } else {
                let end = rest.find('*').unwrap_or(rest.len());
                expr.push_str(&regex::escape(&rest[..end]));
                rest = &rest[end..];
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| format!("bad URL pattern '{pattern}': {e}"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// True if the URL matches.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
