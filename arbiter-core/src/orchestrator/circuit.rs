//! Per-provider circuit breaker
//!
//! # States
//! - Closed: provider attempted normally
//! - Open: provider skipped until the cooldown elapses
//! - Half-open: entered by the first availability check after the cooldown;
//!   the next failure reopens the circuit immediately
//!
//! # Transitions
//! ```text
//! Closed    -> Open:      consecutive_failures reaches the threshold
//! Open      -> Half-open: availability check after now - last_failure >= cooldown
//!                         (consecutive_failures reset to 0)
//! Half-open -> Open:      any failure
//! Half-open -> Closed:    any success
//! ```
//!
//! A success only decrements `consecutive_failures` by one; only the
//! cooldown fully resets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Failures needed to open a circuit
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Time an open circuit waits before half-opening
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(60_000);

/// Breaker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Read-only view of one provider's circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitState {
    pub provider_id: String,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_time: Option<DateTime<Utc>>,
    pub is_open: bool,
}

/// What a recorded failure did to the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    /// No state change
    Unchanged,
    /// Closed circuit reached the threshold and opened
    Opened,
    /// Half-open circuit failed its trial and reopened
    Reopened,
}

impl CircuitTransition {
    pub fn opened(&self) -> bool {
        !matches!(self, CircuitTransition::Unchanged)
    }
}

#[derive(Debug, Default)]
struct Cell {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    is_open: bool,
    half_open: bool,
}

/// Circuit breakers for a fixed set of providers, one lock per provider
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    cells: HashMap<String, Mutex<Cell>>,
    order: Vec<String>,
}

impl CircuitBreaker {
    pub fn new<I, S>(provider_ids: I, settings: BreakerSettings) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = provider_ids.into_iter().map(Into::into).collect();
        let cells = order
            .iter()
            .map(|id| (id.clone(), Mutex::new(Cell::default())))
            .collect();
        Self {
            settings,
            cells,
            order,
        }
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Whether the provider may be attempted now. May half-open the circuit.
    pub fn is_available(&self, provider_id: &str) -> bool {
        self.is_available_at(provider_id, Instant::now())
    }

    /// Availability check against an explicit clock reading
    pub fn is_available_at(&self, provider_id: &str, now: Instant) -> bool {
        let Some(cell) = self.cells.get(provider_id) else {
            return false;
        };
        let mut cell = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if !cell.is_open {
            return true;
        }

        let cooled_down = cell
            .last_failure
            .is_none_or(|last| now.saturating_duration_since(last) >= self.settings.cooldown);
        if cooled_down {
            cell.is_open = false;
            cell.half_open = true;
            cell.consecutive_failures = 0;
            info!("Circuit for {} half-open after cooldown", provider_id);
        }
        cooled_down
    }

    pub fn record_success(&self, provider_id: &str) {
        if let Some(cell) = self.cells.get(provider_id) {
            let mut cell = cell.lock().unwrap_or_else(PoisonError::into_inner);
            cell.consecutive_failures = cell.consecutive_failures.saturating_sub(1);
            if cell.half_open {
                cell.half_open = false;
                info!("Circuit for {} closed after successful trial", provider_id);
            }
        }
    }

    pub fn record_failure(&self, provider_id: &str) -> CircuitTransition {
        self.record_failure_at(provider_id, Instant::now())
    }

    /// Record a failure against an explicit clock reading
    pub fn record_failure_at(&self, provider_id: &str, now: Instant) -> CircuitTransition {
        let Some(cell) = self.cells.get(provider_id) else {
            return CircuitTransition::Unchanged;
        };
        let mut cell = cell.lock().unwrap_or_else(PoisonError::into_inner);
        cell.consecutive_failures += 1;
        cell.last_failure = Some(now);
        cell.last_failure_time = Some(Utc::now());

        if cell.half_open {
            cell.half_open = false;
            cell.is_open = true;
            warn!("Circuit for {} reopened: trial attempt failed", provider_id);
            return CircuitTransition::Reopened;
        }

        if !cell.is_open && cell.consecutive_failures >= self.settings.failure_threshold {
            cell.is_open = true;
            warn!(
                "Circuit for {} opened after {} consecutive failures",
                provider_id, cell.consecutive_failures
            );
            return CircuitTransition::Opened;
        }

        CircuitTransition::Unchanged
    }

    /// Current state without triggering a cooldown transition
    pub fn state(&self, provider_id: &str) -> Option<CircuitState> {
        self.cells.get(provider_id).map(|cell| {
            let cell = cell.lock().unwrap_or_else(PoisonError::into_inner);
            CircuitState {
                provider_id: provider_id.to_string(),
                consecutive_failures: cell.consecutive_failures,
                last_failure_time: cell.last_failure_time,
                is_open: cell.is_open,
            }
        })
    }

    pub fn snapshot(&self) -> Vec<CircuitState> {
        self.order.iter().filter_map(|id| self.state(id)).collect()
    }
}
