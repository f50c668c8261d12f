//! Structured telemetry for match-state violations.
//!
//! The engines in this crate never panic on a broken expectation. Instead they
//! describe the problem as a [`ContractViolation`] and hand it to a
//! [`ViolationObserver`]. By default that observer is [`TracingObserver`], which
//! logs through `tracing`; tests swap in a [`CollectingObserver`] to assert on
//! what was reported.
//!
//! # Example
//!
//! ```
//! use touchline::telemetry::{CollectingObserver, ViolationKind};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//!
//! // ... drive a MatchSession built with `with_violation_observer(observer.clone())` ...
//!
//! assert!(!observer.has_violation(ViolationKind::Invariant));
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

/// How bad a violation is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Recoverable; the operation was refused or fell back.
    ///
    /// Example: a bench player refused because the team is at its limit.
    Warning,
    /// The operation completed but the outcome may be degraded.
    Error,
    /// An invariant is broken and state may be corrupt.
    ///
    /// Example: a player found in two slots at once.
    Critical,
}

impl ViolationSeverity {
    /// Label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engine reported the violation.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new violation categories
/// may be added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// The match clock, e.g. a poll instant earlier than the previous one.
    Clock,
    /// The lineup, e.g. a bench player refused for capacity.
    Assignment,
    /// A substitution batch that could not be applied.
    Substitution,
    /// The ledger, e.g. an undo that could not put a player back in their slot.
    Ledger,
    /// Match configuration.
    Configuration,
    /// A bug in this crate.
    InternalError,
    /// A runtime invariant check failed. Only checked in debug builds or
    /// with the `paranoid` feature.
    Invariant,
}

impl ViolationKind {
    /// Label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Assignment => "assignment",
            Self::Substitution => "substitution",
            Self::Ledger => "ledger",
            Self::Configuration => "configuration",
            Self::InternalError => "internal_error",
            Self::Invariant => "invariant",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported violation.
///
/// ```
/// use touchline::telemetry::{ContractViolation, ViolationSeverity, ViolationKind};
///
/// let violation = ContractViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::Ledger,
///     "slot GK was refilled",
///     "ledger.rs:42",
/// )
/// .with_match_second(2400);
///
/// assert_eq!(
///     violation.to_string(),
///     "[warning/ledger] slot GK was refilled (at ledger.rs:42, second=2400)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContractViolation {
    /// How bad it is.
    pub severity: ViolationSeverity,
    /// Which engine reported it.
    pub kind: ViolationKind,
    /// What went wrong.
    pub message: String,
    /// `file:line` of the report.
    pub location: &'static str,
    /// Match second at the time of the report, when a match is running.
    pub match_second: Option<u32>,
}

impl ContractViolation {
    /// Creates a violation with no match second.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            match_second: None,
        }
    }

    /// Stamps the match second.
    #[must_use]
    pub fn with_match_second(mut self, second: u32) -> Self {
        self.match_second = Some(second);
        self
    }

    /// Serializes to a JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(second) = self.match_second {
            write!(f, ", second={second}")?;
        }
        f.write_str(")")
    }
}

/// Receives violations.
///
/// With the `sync-send` feature, observers must be `Send + Sync`.
///
/// ```
/// use touchline::telemetry::{ViolationObserver, ContractViolation};
///
/// struct Alerting;
///
/// impl ViolationObserver for Alerting {
///     fn on_violation(&self, violation: &ContractViolation) {
///         eprintln!("touchline: {}", violation);
///     }
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called once per violation.
    fn on_violation(&self, violation: &ContractViolation);
}

#[cfg(not(feature = "sync-send"))]
/// Receives violations.
pub trait ViolationObserver {
    /// Called once per violation.
    fn on_violation(&self, violation: &ContractViolation);
}

/// Logs violations through `tracing`: warnings at `warn`, everything else at `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &ContractViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let second = violation.match_second;
        if violation.severity == ViolationSeverity::Warning {
            tracing::warn!(severity, kind, location, ?second, "{}", violation.message);
        } else {
            tracing::error!(severity, kind, location, ?second, "{}", violation.message);
        }
    }
}

/// Keeps every violation in memory, for tests.
///
/// ```
/// use touchline::telemetry::{CollectingObserver, ContractViolation, ViolationKind, ViolationObserver, ViolationSeverity};
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&ContractViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::Assignment,
///     "capacity reached",
///     "test.rs:1",
/// ));
///
/// assert_eq!(observer.len(), 1);
/// assert!(observer.has_violation(ViolationKind::Assignment));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<ContractViolation>>,
}

impl CollectingObserver {
    /// An empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything collected so far.
    #[must_use]
    pub fn violations(&self) -> Vec<ContractViolation> {
        self.violations.lock().clone()
    }

    /// Number collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// True if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// True if any collected violation is of `kind`.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &ContractViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Sends `violation` to `observer`, or to [`TracingObserver`] if there is none.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &ContractViolation,
) {
    match observer {
        Some(observer) => observer.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Reports a violation to [`TracingObserver`], recording the call site.
///
/// ```
/// use touchline::{report_violation, telemetry::{ViolationSeverity, ViolationKind}};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::Clock,
///     "elapsed {} beyond full time {}", 4801, 4800);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::ContractViolation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Like [`report_violation!`], but routed through an
/// `Option<Arc<dyn ViolationObserver>>`. An optional `at <second>` stamps the
/// match second.
///
/// ```
/// use touchline::{report_violation_to, telemetry::{ViolationSeverity, ViolationKind, CollectingObserver, ViolationObserver}};
/// use std::sync::Arc;
///
/// let collector = Arc::new(CollectingObserver::new());
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());
///
/// report_violation_to!(&observer, at 61, ViolationSeverity::Warning, ViolationKind::Assignment,
///     "rejected bench player {}", "p12");
///
/// assert_eq!(collector.violations()[0].match_second, Some(61));
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, at $second:expr, $severity:expr, $kind:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let violation = $crate::telemetry::ContractViolation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        )
        .with_match_second($second);
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let violation = $crate::telemetry::ContractViolation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};
}

/// Fails the test if `observer` collected anything.
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "expected no violations, found {}:\n{:#?}",
            violations.len(),
            violations
        );
    }};
}

/// Fails the test unless `observer` collected a violation of `kind`.
#[macro_export]
macro_rules! assert_violation {
    ($observer:expr, $kind:expr) => {{
        assert!(
            $observer.has_violation($kind),
            "expected a {:?} violation, found: {:#?}",
            $kind,
            $observer.violations()
        );
    }};
}

// ##########################
// # RUNTIME INVARIANTS     #
// ##########################

/// A broken invariant, as returned by [`InvariantChecker::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InvariantViolation {
    /// The type whose invariant broke.
    pub type_name: &'static str,
    /// Which invariant.
    pub invariant: String,
    /// Values involved, for diagnosis.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a violation without details.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Attaches details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Types that can check their own invariants at runtime.
///
/// ```
/// use touchline::telemetry::{InvariantChecker, InvariantViolation};
///
/// struct Scoreline {
///     ours: u32,
///     goals_by_player: Vec<u32>,
/// }
///
/// impl InvariantChecker for Scoreline {
///     fn check_invariants(&self) -> Result<(), InvariantViolation> {
///         let sum: u32 = self.goals_by_player.iter().sum();
///         if sum != self.ours {
///             return Err(InvariantViolation::new(
///                 "Scoreline",
///                 "team goals differ from the sum of player goals",
///             ).with_details(format!("ours={}, sum={}", self.ours, sum)));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait InvariantChecker {
    /// Returns the first broken invariant, if any.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Checks invariants in debug builds (or with `paranoid`), reporting failures
/// as critical [`ViolationKind::Invariant`] violations. Compiles to nothing
/// otherwise.
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{}",
                violation
            );
        }
    }};
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{}};
}

/// Panics on a broken invariant. For tests; a no-op in release builds
/// without `paranoid`.
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! assert_invariants {
    ($expr:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            panic!("invariant violation: {}", violation);
        }
    }};

    ($expr:expr, $context:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            panic!("invariant violation ({}): {}", $context, violation);
        }
    }};
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! assert_invariants {
    ($expr:expr) => {{}};
    ($expr:expr, $context:expr) => {{}};
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn warning(kind: ViolationKind) -> ContractViolation {
        ContractViolation::new(ViolationSeverity::Warning, kind, "test", "test.rs:1")
    }

    #[test]
    fn severities_are_ordered() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }

    #[test]
    fn display_includes_match_second_only_when_known() {
        let bare = warning(ViolationKind::Clock);
        assert_eq!(bare.to_string(), "[warning/clock] test (at test.rs:1)");
        assert!(bare
            .with_match_second(50)
            .to_string()
            .ends_with("second=50)"));
    }

    #[test]
    fn collector_filters_by_kind() {
        let observer = CollectingObserver::new();
        assert!(observer.is_empty());
        observer.on_violation(&warning(ViolationKind::Assignment));

        assert_eq!(observer.len(), 1);
        assert!(observer.has_violation(ViolationKind::Assignment));
        assert!(!observer.has_violation(ViolationKind::Clock));
        assert_violation!(observer, ViolationKind::Assignment);
    }

    #[test]
    fn report_to_routes_to_observer_with_second() {
        let collector = Arc::new(CollectingObserver::new());
        let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());

        report_violation_to!(
            &observer,
            at 75,
            ViolationSeverity::Warning,
            ViolationKind::Ledger,
            "{} stays benched",
            "p1"
        );
        report_violation_to!(
            &observer,
            ViolationSeverity::Error,
            ViolationKind::Substitution,
            "no second"
        );

        let violations = collector.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "p1 stays benched");
        assert_eq!(violations[0].match_second, Some(75));
        assert!(violations[0].location.contains("telemetry.rs"));
        assert_eq!(violations[1].match_second, None);
    }

    #[test]
    fn report_to_without_observer_falls_back_to_tracing() {
        let observer: Option<Arc<dyn ViolationObserver>> = None;
        report_violation_to!(
            &observer,
            ViolationSeverity::Error,
            ViolationKind::Ledger,
            "no observer"
        );
        assert_no_violations!(CollectingObserver::new());
    }

    struct Broken;

    impl InvariantChecker for Broken {
        fn check_invariants(&self) -> Result<(), InvariantViolation> {
            Err(InvariantViolation::new("Broken", "always").with_details("x=1"))
        }
    }

    #[test]
    fn invariant_violation_display() {
        assert_eq!(
            Broken.check_invariants().unwrap_err().to_string(),
            "Broken: always (x=1)"
        );
        // Reported through tracing, never panics.
        debug_check_invariants!(Broken);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "after kick-off")]
    fn assert_invariants_panics_with_context() {
        assert_invariants!(Broken, "after kick-off");
    }

    #[test]
    fn kinds_serialize_in_snake_case() {
        let json = serde_json::to_string(&ViolationKind::InternalError).unwrap();
        assert_eq!(json, r#""internal_error""#);
    }

    #[cfg(feature = "json")]
    #[test]
    fn violation_to_json() {
        let json = warning(ViolationKind::Clock)
            .with_match_second(42)
            .to_json()
            .unwrap();
        assert!(json.contains(r#""match_second":42"#));
        assert!(json.contains(r#""kind":"clock""#));
    }
}
