use std::sync::Arc;

use crate::config::MatchConfig;
use crate::error::InvalidRequestKind;
use crate::formation::{FormationCatalog, DEFAULT_FORMATION};
use crate::roster::Roster;
use crate::telemetry::ViolationObserver;
use crate::{MatchSession, TouchlineResult};

/// Default event queue size.
/// The oldest events are dropped once the queue is full.
const DEFAULT_EVENT_QUEUE_SIZE: usize = 100;

/// Builds a [`MatchSession`].
///
/// Only the roster is required. Everything else has a default: the built-in
/// formation catalog, the "1-4-4-2" formation, and an 80-minute match.
///
/// ```
/// use touchline::{MatchBuilder, MatchConfig, Player, Roster};
///
/// let roster = Roster::new(vec![
///     Player::new("p1", "Ann", "Able", 1, "GK"),
///     Player::new("p2", "Ben", "Baker", 2, "RB"),
/// ]).unwrap();
///
/// let session = MatchBuilder::new()
///     .with_roster(roster)
///     .with_formation("1-4-3-3")
///     .with_config(MatchConfig::full_length())
///     .build()
///     .unwrap();
/// assert_eq!(session.formation().name(), "1-4-3-3");
/// ```
#[must_use = "MatchBuilder must be consumed by calling build()"]
pub struct MatchBuilder {
    team_name: String,
    roster: Roster,
    catalog: FormationCatalog,
    formation: String,
    config: MatchConfig,
    /// Optional observer for rejected operations and invariant failures.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
    /// Maximum number of events to queue before the oldest are dropped.
    event_queue_size: usize,
}

impl std::fmt::Debug for MatchBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure so that a new field cannot be left out.
        let Self {
            team_name,
            roster,
            catalog,
            formation,
            config,
            violation_observer,
            event_queue_size,
        } = self;

        f.debug_struct("MatchBuilder")
            .field("team_name", team_name)
            .field("players", &roster.len())
            .field("formations", &catalog.names().collect::<Vec<_>>())
            .field("formation", formation)
            .field("config", config)
            .field("has_violation_observer", &violation_observer.is_some())
            .field("event_queue_size", event_queue_size)
            .finish()
    }
}

impl Default for MatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchBuilder {
    /// Construct a new builder with all values set to their defaults.
    pub fn new() -> Self {
        Self {
            team_name: String::new(),
            roster: Roster::default(),
            catalog: FormationCatalog::builtin(),
            formation: DEFAULT_FORMATION.to_owned(),
            config: MatchConfig::default(),
            violation_observer: None,
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
        }
    }

    /// Sets the match-day roster.
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }

    /// Names the team. The name is carried into every [`MatchSnapshot`](crate::MatchSnapshot).
    pub fn with_team_name(mut self, name: impl Into<String>) -> Self {
        self.team_name = name.into();
        self
    }

    /// Sets the match configuration. It is validated by [`build`](Self::build).
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Chooses the starting formation by name.
    pub fn with_formation(mut self, name: impl Into<String>) -> Self {
        self.formation = name.into();
        self
    }

    /// Replaces the formation catalog.
    pub fn with_catalog(mut self, catalog: FormationCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Routes rejected operations and invariant failures to `observer`
    /// instead of the default [`TracingObserver`](crate::telemetry::TracingObserver).
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Sets the maximum number of undrained events. Default is 100.
    ///
    /// # Errors
    /// - Returns [`InvalidRequest`] if `size` is zero.
    ///
    /// [`InvalidRequest`]: crate::TouchlineError::InvalidRequest
    pub fn with_event_queue_size(mut self, size: usize) -> TouchlineResult<Self> {
        if size == 0 {
            return Err(InvalidRequestKind::EventQueueTooSmall.into());
        }
        self.event_queue_size = size;
        Ok(self)
    }

    /// Consumes the builder.
    ///
    /// # Errors
    /// - [`InvalidRequest`] if the roster is empty or the formation is not in the catalog.
    /// - [`InvalidConfig`] if the configuration fails validation.
    ///
    /// [`InvalidRequest`]: crate::TouchlineError::InvalidRequest
    /// [`InvalidConfig`]: crate::TouchlineError::InvalidConfig
    pub fn build(self) -> TouchlineResult<MatchSession> {
        if self.roster.is_empty() {
            return Err(InvalidRequestKind::EmptyRoster.into());
        }
        self.config.validate()?;
        let formation = self.catalog.require(&self.formation)?.clone();
        Ok(MatchSession::new(
            self.team_name,
            self.roster,
            self.catalog,
            formation,
            self.config,
            self.violation_observer,
            self.event_queue_size,
        ))
    }
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
    use crate::roster::Player;
    use crate::telemetry::CollectingObserver;
    use crate::TouchlineError;

    fn roster() -> Roster {
        Roster::new(vec![Player::new("p1", "Ann", "Able", 1, "GK")]).unwrap()
    }

    #[test]
    fn empty_roster_is_rejected() {
        let err = MatchBuilder::new().build().unwrap_err();
        assert_eq!(
            err,
            TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::EmptyRoster
            }
        );
    }

    #[test]
    fn unknown_formation_is_rejected() {
        let err = MatchBuilder::new()
            .with_roster(roster())
            .with_formation("3-5-2")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::UnknownFormation { .. }
            }
        ));
    }

    #[test]
    fn odd_duration_is_rejected() {
        let err = MatchBuilder::new()
            .with_roster(roster())
            .with_config(MatchConfig::with_duration_minutes(75))
            .build()
            .unwrap_err();
        assert!(matches!(err, TouchlineError::InvalidConfig { .. }));
    }

    #[test]
    fn zero_event_queue_is_rejected() {
        assert!(MatchBuilder::new().with_event_queue_size(0).is_err());
        assert!(MatchBuilder::new().with_event_queue_size(1).is_ok());
    }

    #[test]
    fn defaults_build() {
        let session = MatchBuilder::new().with_roster(roster()).build().unwrap();
        assert_eq!(session.formation().name(), DEFAULT_FORMATION);
        assert_eq!(session.config().total_duration_minutes, 80);
    }

    #[test]
    fn team_name_reaches_the_session() {
        let session = MatchBuilder::new()
            .with_team_name("U12 Lions")
            .with_roster(roster())
            .build()
            .unwrap();
        assert_eq!(session.team_name(), "U12 Lions");
        assert_eq!(session.snapshot("vs Rovers").team_name, "U12 Lions");
    }

    #[test]
    fn debug_reports_observer_presence() {
        let builder = MatchBuilder::new()
            .with_violation_observer(Arc::new(CollectingObserver::new()));
        let debug = format!("{:?}", builder);
        assert!(debug.contains("has_violation_observer: true"));
        assert!(debug.contains("event_queue_size: 100"));
    }
}
