//! Position tracking

use super::{Position, TrackerEvent};
use crate::contract::{ContractEvaluator, DurationType, PositionStatus};
use crate::feed::Tick;
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Tracks every position until it is explicitly removed
pub struct PositionTracker {
    evaluator: ContractEvaluator,
    /// Insertion order is preserved for rendering
    positions: Vec<Position>,
    listeners: Vec<mpsc::UnboundedSender<TrackerEvent>>,
}

impl PositionTracker {
    /// Create a new position tracker
    pub fn new(evaluator: ContractEvaluator) -> Self {
        Self {
            evaluator,
            positions: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Register a listener for tracker events
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TrackerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// Start tracking a position.
    ///
    /// An open position with a known id is replaced. A settled one is kept
    /// as is; settlement is final.
    pub fn open(&mut self, position: Position) -> Uuid {
        let id = position.id;
        if self
            .positions
            .iter()
            .any(|p| p.id == id && p.status.is_settled())
        {
            tracing::warn!(%id, "Position already settled, ignoring re-open");
            return id;
        }
        tracing::info!(
            %id,
            contract_id = %position.contract_id,
            symbol = %position.symbol,
            prediction = %position.prediction,
            "Tracking position"
        );
        match self.positions.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = position,
            None => self.positions.push(position),
        }
        self.publish_gauges();
        id
    }

    /// Stop tracking a position
    pub fn remove(&mut self, id: Uuid) -> Option<Position> {
        let index = self.positions.iter().position(|p| p.id == id)?;
        let removed = self.positions.remove(index);
        self.publish_gauges();
        Some(removed)
    }

    pub fn get(&self, id: Uuid) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }

    /// Sum of every tracked position's P&L, recomputed from scratch
    pub fn total_pnl(&self) -> Decimal {
        self.positions.iter().map(Position::pnl).sum()
    }

    /// Apply a tick for `symbol` to every open position on that symbol.
    ///
    /// Ticks not newer than a position's entry or its last applied tick are
    /// ignored for that position. A time contract whose expiry has passed is
    /// settled on its last evaluated state without applying the tick. A tick
    /// contract is settled right after the tick that completes its count.
    /// Returns the total P&L after the tick.
    pub fn on_tick(&mut self, symbol: &str, tick: &Tick) -> Decimal {
        let mut events = Vec::new();

        for position in self
            .positions
            .iter_mut()
            .filter(|p| p.is_open() && p.symbol == symbol)
        {
            let stale = tick.timestamp <= position.entry_time
                || position.last_tick_at.is_some_and(|last| tick.timestamp <= last);
            if stale {
                continue;
            }

            if position.expiry().is_some_and(|expiry| tick.timestamp >= expiry) {
                settle(position, &mut events);
                continue;
            }

            let winning = self.evaluator.is_winning(
                position.prediction,
                position.entry_price,
                tick.price,
                position.barrier,
            );
            let changed =
                position.current_price != Some(tick.price) || position.is_winning != Some(winning);
            position.current_price = Some(tick.price);
            position.is_winning = Some(winning);
            position.ticks_elapsed += 1;
            position.last_tick_at = Some(tick.timestamp);

            if changed {
                events.push(TrackerEvent::PositionUpdated(position.clone()));
            }

            if position.duration_type == DurationType::Ticks
                && position.ticks_elapsed >= position.duration
            {
                settle(position, &mut events);
            }
        }

        let pnl = self.total_pnl();
        events.push(TrackerEvent::PnlUpdated(pnl));
        self.emit(events);
        self.publish_gauges();
        pnl
    }

    /// Settle time contracts whose expiry is at or before `now`
    pub fn settle_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut events = Vec::new();
        for position in self.positions.iter_mut().filter(|p| p.is_open()) {
            if position.expiry().is_some_and(|expiry| now >= expiry) {
                settle(position, &mut events);
            }
        }

        let settled = events.len();
        if settled > 0 {
            events.push(TrackerEvent::PnlUpdated(self.total_pnl()));
            self.emit(events);
            self.publish_gauges();
        }
        settled
    }

    fn emit(&mut self, events: Vec<TrackerEvent>) {
        if self.listeners.is_empty() {
            return;
        }
        self.listeners.retain(|listener| {
            events
                .iter()
                .all(|event| listener.send(event.clone()).is_ok())
        });
    }

    fn publish_gauges(&self) {
        set_gauge(GaugeMetric::OpenPositions, self.open_count() as f64);
        set_gauge(
            GaugeMetric::TotalPnl,
            self.total_pnl().to_f64().unwrap_or_default(),
        );
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(ContractEvaluator::default())
    }
}

/// OPEN -> WON/LOST on the last evaluated state; never reversed
fn settle(position: &mut Position, events: &mut Vec<TrackerEvent>) {
    if position.status.is_settled() {
        return;
    }
    position.status = if position.is_winning == Some(true) {
        PositionStatus::Won
    } else {
        PositionStatus::Lost
    };
    increment(CounterMetric::Settlements);
    tracing::info!(
        id = %position.id,
        contract_id = %position.contract_id,
        status = ?position.status,
        pnl = %position.pnl(),
        "Position settled"
    );
    events.push(TrackerEvent::PositionSettled(position.clone()));
}
