use std::collections::{BTreeMap, HashMap, VecDeque};

use glam::Vec2;
use tracing::{debug, warn};

use super::request::{MovementKind, MovementRequest, RequestSource};
use crate::config::ValidationTuning;
use crate::error::ValidationError;
use crate::EntityId;

/// Pipeline stage a rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValidationRule {
    Structure,
    ActionCombination,
    RateLimit,
    InputSpam,
}

/// Non-fatal findings attached to an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationWarning {
    RapidInput,
    Oscillation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub outcome: Result<(), ValidationError>,
    /// The coordinator must clear accumulated forces after applying this request.
    pub requires_accumulation_prevention: bool,
    pub oscillation_detected: bool,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    fn rejected(error: ValidationError) -> Self {
        Self {
            outcome: Err(error),
            requires_accumulation_prevention: false,
            oscillation_detected: false,
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error_message(&self) -> Option<String> {
        self.outcome.as_ref().err().map(ToString::to_string)
    }
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationStats {
    pub total: u64,
    pub passed: u64,
    pub failures: BTreeMap<ValidationRule, u64>,
    pub warnings: u64,
}

impl ValidationStats {
    /// Percentage of requests that passed; 100 when nothing was validated yet.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }

    fn record(&mut self, result: &ValidationResult) {
        self.total += 1;
        match &result.outcome {
            Ok(()) => self.passed += 1,
            Err(e) => *self.failures.entry(e.rule()).or_default() += 1,
        }
        self.warnings += result.warnings.len() as u64;
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    timestamp: f64,
    kind: MovementKind,
    direction: Vec2,
}

#[derive(Debug, Default)]
struct EntityHistory {
    /// Accepted requests inside the rate window, oldest first.
    accepted: VecDeque<Entry>,
    /// Last `oscillation_window` accepted requests.
    recent: VecDeque<Entry>,
    stats: ValidationStats,
}

/// Gate in front of every coordinator. Each call is independent, but the
/// validator remembers per-entity history for rate and thrash detection.
#[derive(Debug)]
pub struct RequestValidator {
    tuning: ValidationTuning,
    entities: HashMap<EntityId, EntityHistory>,
    global: ValidationStats,
}

impl RequestValidator {
    pub fn new(tuning: ValidationTuning) -> Self {
        Self {
            tuning,
            entities: HashMap::new(),
            global: ValidationStats::default(),
        }
    }

    pub fn tuning(&self) -> &ValidationTuning {
        &self.tuning
    }

    pub fn validate(&mut self, request: &MovementRequest) -> ValidationResult {
        let result = self.run_pipeline(request);
        let history = self.entities.entry(request.entity).or_default();
        history.stats.record(&result);
        self.global.record(&result);

        match &result.outcome {
            Ok(()) => debug!(entity = ?request.entity, kind = ?request.kind, warnings = ?result.warnings, "request accepted"),
            Err(e) => warn!(entity = ?request.entity, kind = ?request.kind, error = %e, "request rejected"),
        }
        result
    }

    fn run_pipeline(&mut self, request: &MovementRequest) -> ValidationResult {
        if let Err(e) = check_structure(request, self.tuning.direction_tolerance) {
            return ValidationResult::rejected(e);
        }
        if let Err(e) = check_combination(request, self.tuning.min_action_interval) {
            return ValidationResult::rejected(e);
        }

        let tuning = self.tuning;
        let history = self.entities.entry(request.entity).or_default();
        let now = request.timestamp;

        while history
            .accepted
            .front()
            .is_some_and(|e| e.timestamp <= now - tuning.rate_window)
        {
            history.accepted.pop_front();
        }
        if history.accepted.len() >= tuning.max_requests_per_second as usize {
            return ValidationResult::rejected(ValidationError::RateLimitExceeded);
        }
        let burst = history
            .accepted
            .iter()
            .filter(|e| e.timestamp > now - tuning.spam_window)
            .count();
        if burst >= tuning.spam_threshold as usize {
            return ValidationResult::rejected(ValidationError::InputSpam);
        }

        let mut warnings = Vec::new();
        let last = history.accepted.back().map(|e| e.timestamp);
        let rapid = request.is_rapid_input(tuning.rapid_input_interval)
            || last.is_some_and(|t| now - t < tuning.rapid_input_interval);
        if rapid {
            warnings.push(ValidationWarning::RapidInput);
        }

        let entry = Entry {
            timestamp: now,
            kind: request.kind,
            direction: request.direction,
        };
        history.accepted.push_back(entry);
        history.recent.push_back(entry);
        while history.recent.len() > tuning.oscillation_window {
            history.recent.pop_front();
        }
        let oscillating =
            is_oscillating(&history.recent, tuning.oscillation_window, tuning.oscillation_span);
        if oscillating {
            warn!(entity = ?request.entity, "movement oscillation detected");
            warnings.push(ValidationWarning::Oscillation);
        }

        ValidationResult {
            outcome: Ok(()),
            requires_accumulation_prevention: rapid,
            oscillation_detected: oscillating,
            warnings,
        }
    }

    /// Forget everything about `entity`; used on respawn.
    pub fn clear_entity_history(&mut self, entity: EntityId) {
        self.entities.remove(&entity);
    }

    pub fn entity_stats(&self, entity: EntityId) -> ValidationStats {
        self.entities
            .get(&entity)
            .map(|h| h.stats.clone())
            .unwrap_or_default()
    }

    pub fn global_stats(&self) -> &ValidationStats {
        &self.global
    }
}

fn check_structure(request: &MovementRequest, tolerance: f32) -> Result<(), ValidationError> {
    if !request.magnitude.is_finite() || request.magnitude < 0.0 {
        return Err(ValidationError::InvalidMagnitude(request.magnitude));
    }
    let d = request.direction;
    if !d.is_finite() {
        return Err(ValidationError::InvalidDirection("non-finite".into()));
    }
    if request.kind == MovementKind::Stop {
        if d != Vec2::ZERO {
            return Err(ValidationError::InvalidDirection(format!(
                "stop requires a zero direction, got {d}"
            )));
        }
    } else if (d.length() - 1.0).abs() > tolerance {
        return Err(ValidationError::InvalidDirection(format!(
            "expected a unit vector, got {d} (length {})",
            d.length()
        )));
    }
    Ok(())
}

/// Player jumps and dashes may not follow a jump or dash too closely unless
/// the request is an explicit combo.
fn check_combination(request: &MovementRequest, min_interval: f64) -> Result<(), ValidationError> {
    use MovementKind::*;
    if request.source != RequestSource::Player || request.is_combo_move || request.retry_count > 0 {
        return Ok(());
    }
    let (Some(previous), Some(interval)) = (request.previous_action, request.interval()) else {
        return Ok(());
    };
    let disallowed = matches!((previous, request.kind), (Jump, Jump) | (Dash, Jump) | (Dash, Dash));
    if disallowed && interval < min_interval {
        return Err(ValidationError::DisallowedCombination {
            previous,
            next: request.kind,
        });
    }
    Ok(())
}

/// Every adjacent pair in a full window cancels out, and the whole window fits
/// inside `span` seconds.
fn is_oscillating(recent: &VecDeque<Entry>, window: usize, span: f64) -> bool {
    if recent.len() < window {
        return false;
    }
    let (Some(first), Some(last)) = (recent.front(), recent.back()) else {
        return false;
    };
    if last.timestamp - first.timestamp > span {
        return false;
    }
    recent
        .iter()
        .zip(recent.iter().skip(1))
        .all(|(a, b)| a.kind.cancels(a.direction, b.kind, b.direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    fn validator() -> RequestValidator {
        RequestValidator::new(ValidationTuning::default())
    }

    fn entities(n: usize) -> Vec<EntityId> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    #[test]
    fn non_unit_direction_is_rejected() {
        let e = entities(1)[0];
        let mut v = validator();
        let r = v.validate(&MovementRequest::walk(e, Vec2::new(1.0, 1.0), 100.0, 0.0));
        assert!(matches!(r.outcome, Err(ValidationError::InvalidDirection(_))));

        let mut stop = MovementRequest::stop(e, 0.1);
        stop.direction = Vec2::X;
        assert!(!v.validate(&stop).is_valid());
        assert!(v.validate(&MovementRequest::stop(e, 0.2)).is_valid());
        assert!(v.validate(&MovementRequest::walk(e, Vec2::new(0.6, 0.8), 100.0, 0.3)).is_valid());
    }

    #[test]
    fn negative_or_nan_magnitude_is_rejected() {
        let e = entities(1)[0];
        let mut v = validator();
        for m in [-1.0, f32::NAN, f32::INFINITY] {
            let r = v.validate(&MovementRequest::walk(e, Vec2::X, m, 0.0));
            assert_eq!(r.outcome.unwrap_err().rule(), ValidationRule::Structure);
        }
    }

    #[test]
    fn rate_cap_rejects_excess_for_one_entity_only() {
        let ids = entities(2);
        let (a, b) = (ids[0], ids[1]);
        let mut v = validator();
        let mut rejected = Vec::new();
        // 66 requests 15 ms apart: too slow to count as a spam burst, too fast for the cap.
        for i in 0..66 {
            let t = i as f64 * 0.015;
            let r = v.validate(&MovementRequest::walk(a, Vec2::X, 100.0, t).with_source(RequestSource::Scripted));
            if let Err(e) = r.outcome {
                rejected.push(e);
            }
        }
        assert_eq!(rejected.len(), 6);
        assert!(rejected.iter().all(|e| *e == ValidationError::RateLimitExceeded));
        assert_eq!(
            v.validate(&MovementRequest::walk(b, Vec2::X, 100.0, 0.9)).outcome,
            Ok(())
        );
        let stats = v.entity_stats(a);
        assert_eq!(stats.total, 66);
        assert_eq!(stats.passed, 60);
        assert_eq!(stats.failures[&ValidationRule::RateLimit], 6);
        assert!((stats.pass_rate() - 6000.0 / 66.0).abs() < 1e-9);
    }

    #[test]
    fn window_slides_after_a_second() {
        let e = entities(1)[0];
        let mut v = validator();
        for i in 0..60 {
            assert!(v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, i as f64 * 0.015)).is_valid());
        }
        assert!(!v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 0.95)).is_valid());
        assert!(v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 2.0)).is_valid());
    }

    #[test]
    fn bursts_are_spam() {
        let e = entities(1)[0];
        let mut v = validator();
        let results: Vec<_> = (0..10)
            .map(|i| v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, i as f64 * 0.005)))
            .collect();
        assert!(results[..8].iter().all(ValidationResult::is_valid));
        assert_eq!(results[8].outcome, Err(ValidationError::InputSpam));
        assert_eq!(results[8].error_message().as_deref(), Some("Input spam detected"));
    }

    #[test]
    fn rapid_requests_pass_but_require_accumulation_prevention() {
        let e = entities(1)[0];
        let mut v = validator();
        assert!(!v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 1.0)).requires_accumulation_prevention);
        let r = v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 1.010));
        assert!(r.is_valid());
        assert!(r.requires_accumulation_prevention);
        assert!(r.warnings.contains(&ValidationWarning::RapidInput));
    }

    #[test]
    fn walk_stop_thrash_is_detected_from_the_fourth_entry() {
        let e = entities(1)[0];
        let mut v = validator();
        let sequence = [
            MovementRequest::walk(e, Vec2::X, 100.0, 0.0),
            MovementRequest::stop(e, 0.1),
            MovementRequest::walk(e, Vec2::X, 100.0, 0.2),
            MovementRequest::stop(e, 0.3),
            MovementRequest::walk(e, Vec2::X, 100.0, 0.4),
        ];
        let flags: Vec<bool> = sequence.iter().map(|r| v.validate(r).oscillation_detected).collect();
        assert_eq!(flags, vec![false, false, false, true, true]);
    }

    #[test]
    fn slow_direction_changes_are_not_oscillation() {
        let e = entities(1)[0];
        let mut v = validator();
        for i in 0..8 {
            let t = i as f64;
            let request = if i % 2 == 0 {
                MovementRequest::walk(e, Vec2::X, 100.0, t)
            } else {
                MovementRequest::stop(e, t)
            };
            let r = v.validate(&request);
            assert!(r.is_valid());
            assert!(!r.oscillation_detected, "request {i} flagged");
        }
        assert_eq!(v.entity_stats(e).warnings, 0);
    }

    #[test]
    fn steady_walking_is_not_oscillation() {
        let e = entities(1)[0];
        let mut v = validator();
        for i in 0..6 {
            let r = v.validate(&MovementRequest::walk(e, Vec2::X, 100.0, i as f64 * 0.2));
            assert!(!r.oscillation_detected);
        }
    }

    #[test]
    fn jump_after_dash_needs_combo_flag() {
        let e = entities(1)[0];
        let mut v = validator();
        let jump = MovementRequest::jump(e, 500.0, 1.05).after(Some((MovementKind::Dash, 1.0)));
        let r = v.validate(&jump);
        assert_eq!(
            r.outcome,
            Err(ValidationError::DisallowedCombination {
                previous: MovementKind::Dash,
                next: MovementKind::Jump
            })
        );
        assert!(v.validate(&jump.clone().as_combo()).is_valid());
        let late = MovementRequest::jump(e, 500.0, 1.5).after(Some((MovementKind::Dash, 1.0)));
        assert!(v.validate(&late).is_valid());
    }

    #[test]
    fn clearing_history_resets_counters() {
        let e = entities(1)[0];
        let mut v = validator();
        for i in 0..60 {
            v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, i as f64 * 0.015));
        }
        assert!(!v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 0.95)).is_valid());
        v.clear_entity_history(e);
        assert_eq!(v.entity_stats(e), ValidationStats::default());
        assert!(v.validate(&MovementRequest::walk(e, Vec2::X, 1.0, 0.96)).is_valid());
        assert_eq!(v.global_stats().total, 62);
    }
}
