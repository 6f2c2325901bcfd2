//! The per-bar driver loop.
//!
//! `TrendEngine` owns the bar history and all detector state. One call —
//! `process_new_bar` — appends a bar and runs the full step: invalidate a
//! pierced uptrend candidate, advance containment, evaluate both rule
//! batteries against a snapshot of the candidates, apply confirmations
//! (inserting forced opposite signals where alternation demands it), then
//! scan the previous bar for new pending signals.
//!
//! The engine is single-threaded and synchronous; a rejected bar leaves
//! every piece of state untouched.

use std::collections::HashSet;

use crate::domain::{Bar, BarError, DowntrendRule, RuleType, SignalType, TrendEvent, UptrendRule};
use crate::patterns;

use super::alternation::find_intervening_extremum;
use super::containment::{update_containment, Containment};
use super::debug::{DebugContext, DebugRecord};
use super::rules::{evaluate_downtrend_rules, evaluate_uptrend_rules};
use super::state::{Candidate, EngineState, LastConfirmed, TrendDirection};

/// Forward-causal trend-start detector over one bar stream.
pub struct TrendEngine {
    contract_id: String,
    timeframe: String,
    bars: Vec<Bar>,
    state: EngineState,
    debug: DebugContext,
    /// Every event ever emitted, in emission order, duplicates included.
    /// `all_signals` sorts and dedups on demand.
    signals: Vec<TrendEvent>,
}

impl TrendEngine {
    pub fn new(contract_id: &str, timeframe: &str) -> Self {
        Self {
            contract_id: contract_id.to_string(),
            timeframe: timeframe.to_string(),
            bars: Vec::new(),
            state: EngineState::new(),
            debug: DebugContext::disabled(),
            signals: Vec::new(),
        }
    }

    /// Enable the structured debug trace for bars in `[start, end]` (1-based).
    pub fn enable_debug_range(&mut self, start: usize, end: usize) {
        self.debug = DebugContext::with_range(start, end);
    }

    /// Process one bar and return the events its arrival produced, deduped
    /// by `(confirmed_bar_index, signal_type)` in emission order.
    ///
    /// The bar must continue the stream: contiguous 1-based index, strictly
    /// increasing timestamp, well-formed OHLC. A rejected bar mutates
    /// nothing; the stream may continue with the next bar.
    pub fn process_new_bar(&mut self, bar: Bar) -> Result<Vec<TrendEvent>, BarError> {
        bar.validate(self.bars.last(), self.bars.len() + 1)?;
        self.bars.push(bar);

        let current = bar;
        self.debug.log(current.index, &self.state, || {
            format!(
                "Processing bar {} O:{} H:{} L:{} C:{}",
                current.index, current.open, current.high, current.low, current.close
            )
        });

        if self.bars.len() == 1 {
            return Ok(Vec::new());
        }
        let prev = self.bars[self.bars.len() - 2];
        let bar_before_prev = (self.bars.len() >= 3).then(|| self.bars[self.bars.len() - 3]);

        self.invalidate_pierced_uptrend_candidate(&current);
        update_containment(&mut self.state, &current, &mut self.debug);

        // Rules run against the candidates as they stand now; confirmations
        // below may reshape them mid-step.
        let up_snapshot = self.state.up_candidate;
        let down_snapshot = self.state.down_candidate;

        let suppressed = self
            .state
            .containment
            .map_or(false, |w| w.suppresses_confirmation(current.index));
        if suppressed {
            self.debug.log(current.index, &self.state, || {
                format!(
                    "Confirmations suppressed: bar {} is past the containment grace period",
                    current.index
                )
            });
        }

        let cus_fired: Option<UptrendRule> = if suppressed {
            None
        } else {
            up_snapshot.as_ref().and_then(|up| {
                evaluate_uptrend_rules(&current, &prev, up, down_snapshot.as_ref(), &self.bars)
            })
        };
        let cds_fired: Option<DowntrendRule> = if suppressed {
            None
        } else {
            down_snapshot
                .as_ref()
                .and_then(|peak| evaluate_downtrend_rules(&current, &prev, peak, &self.bars))
        };

        let mut emitted = Vec::new();

        if let (Some(rule), Some(up)) = (cus_fired, up_snapshot) {
            let confirmed = self.bars[up.index - 1];
            self.apply_uptrend_confirmation(&current, &confirmed, rule, &mut emitted);
        }
        if let (Some(rule), Some(down)) = (cds_fired, down_snapshot) {
            let confirmed = self.bars[down.index - 1];
            self.apply_downtrend_confirmation(&current, &confirmed, rule, &mut emitted);
        }

        self.scan_for_new_pending_signals(
            &current,
            &prev,
            bar_before_prev.as_ref(),
            cds_fired.is_some(),
            cus_fired.is_some(),
        );

        let mut deduped: Vec<TrendEvent> = Vec::with_capacity(emitted.len());
        for event in emitted {
            if !deduped.iter().any(|e| e.dedup_key() == event.dedup_key()) {
                deduped.push(event);
            }
        }
        Ok(deduped)
    }

    /// All events so far, sorted by `(confirmed_bar_index, signal_type,
    /// triggering_bar_index)` and deduped by `(confirmed_bar_index,
    /// signal_type)`, keeping the earliest emission.
    pub fn all_signals(&self) -> Vec<TrendEvent> {
        let mut sorted = self.signals.clone();
        sorted.sort_by_key(TrendEvent::sort_key);
        let mut seen = HashSet::new();
        sorted.retain(|event| seen.insert(event.dedup_key()));
        sorted
    }

    pub fn debug_records(&self) -> &[DebugRecord] {
        self.debug.records()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    /// Current uptrend candidate, if any.
    pub fn up_candidate(&self) -> Option<Candidate> {
        self.state.up_candidate
    }

    /// Current downtrend candidate, if any.
    pub fn down_candidate(&self) -> Option<Candidate> {
        self.state.down_candidate
    }

    pub fn containment(&self) -> Option<Containment> {
        self.state.containment
    }

    pub fn last_confirmed(&self) -> Option<LastConfirmed> {
        self.state.last_confirmed
    }

    /// Drop an uptrend candidate whose low was pierced by any bar strictly
    /// between it and the previous bar. A pierce by the previous bar itself
    /// is only seen on the next step.
    fn invalidate_pierced_uptrend_candidate(&mut self, current: &Bar) {
        let Some(up) = self.state.up_candidate else {
            return;
        };
        let first = up.index + 1;
        let last = current.index.saturating_sub(2);
        if first > last {
            return;
        }
        let pierced_by = self.bars[first - 1..last]
            .iter()
            .find(|bar| bar.low < up.low)
            .map(|bar| bar.index);
        if let Some(pierce_index) = pierced_by {
            self.state.clear_pending_uptrend();
            self.debug.log(current.index, &self.state, || {
                format!(
                    "Uptrend candidate bar {} (L:{}) invalidated by bar {}'s lower low",
                    up.index, up.low, pierce_index
                )
            });
        }
    }

    fn apply_uptrend_confirmation(
        &mut self,
        current: &Bar,
        confirmed: &Bar,
        rule: UptrendRule,
        out: &mut Vec<TrendEvent>,
    ) {
        if let Some(LastConfirmed {
            direction: TrendDirection::Up,
            bar_index,
        }) = self.state.last_confirmed
        {
            if confirmed.index > bar_index {
                self.insert_forced_event(
                    bar_index,
                    confirmed.index,
                    current.index,
                    RuleType::ForcedByUptrend(rule),
                    TrendDirection::Down,
                    out,
                );
            }
        }

        self.debug.log(current.index, &self.state, || {
            format!(
                "Uptrend start confirmed from bar {} by rule {} (trigger bar {})",
                confirmed.index,
                RuleType::Uptrend(rule),
                current.index
            )
        });
        self.emit(
            confirmed,
            SignalType::UptrendStart,
            current.index,
            RuleType::Uptrend(rule),
            out,
        );
        self.state.mark_confirmed(TrendDirection::Up, confirmed.index);
        self.state.clear_pending_uptrend();

        // Rule-dependent reseeding of the downtrend side.
        match rule {
            UptrendRule::HigherHighLowerLowDownClose => {
                let prev_to_current = (current.index >= 2).then(|| self.bars[current.index - 2]);
                self.state
                    .set_pending_downtrend(current, prev_to_current.as_ref());
            }
            UptrendRule::EngulfingUpPdsLowBreak => {}
            _ => {
                let nominates = patterns::is_lower_ohlc(current, confirmed)
                    || patterns::is_pending_downtrend_rule(current, confirmed)
                    || patterns::is_simple_pending_downtrend(current, confirmed);
                if nominates {
                    let prev_to_confirmed =
                        (confirmed.index >= 2).then(|| self.bars[confirmed.index - 2]);
                    self.state
                        .set_pending_downtrend(confirmed, prev_to_confirmed.as_ref());
                }
            }
        }
    }

    fn apply_downtrend_confirmation(
        &mut self,
        current: &Bar,
        confirmed: &Bar,
        rule: DowntrendRule,
        out: &mut Vec<TrendEvent>,
    ) {
        if let Some(LastConfirmed {
            direction: TrendDirection::Down,
            bar_index,
        }) = self.state.last_confirmed
        {
            if confirmed.index > bar_index {
                self.insert_forced_event(
                    bar_index,
                    confirmed.index,
                    current.index,
                    RuleType::ForcedByDowntrend(rule),
                    TrendDirection::Up,
                    out,
                );
            }
        }

        self.debug.log(current.index, &self.state, || {
            format!(
                "Downtrend start confirmed from bar {} by rule {} (trigger bar {})",
                confirmed.index,
                RuleType::Downtrend(rule),
                current.index
            )
        });
        self.emit(
            confirmed,
            SignalType::DowntrendStart,
            current.index,
            RuleType::Downtrend(rule),
            out,
        );
        self.state
            .mark_confirmed(TrendDirection::Down, confirmed.index);

        // An uptrend candidate strictly before the confirmed bar is stale;
        // one sitting on the confirmed bar itself survives.
        if self
            .state
            .up_candidate
            .map_or(false, |up| up.index < confirmed.index)
        {
            self.state.clear_pending_uptrend();
        }
        if self
            .state
            .down_candidate
            .map_or(false, |down| down.index == confirmed.index)
        {
            self.state.clear_pending_downtrend();
        }
    }

    /// Emit the forced opposite event demanded by strict alternation, on the
    /// intervening extremum bar. With no intervening bar there is nothing to
    /// force and the outer confirmation stands alone.
    fn insert_forced_event(
        &mut self,
        last_confirmed_index: usize,
        new_confirmed_index: usize,
        triggering_index: usize,
        rule: RuleType,
        forced_direction: TrendDirection,
        out: &mut Vec<TrendEvent>,
    ) {
        let Some(forced_bar) = find_intervening_extremum(
            &self.bars,
            last_confirmed_index,
            new_confirmed_index,
            forced_direction,
        )
        .copied() else {
            return;
        };
        let signal_type = match forced_direction {
            TrendDirection::Up => SignalType::UptrendStart,
            TrendDirection::Down => SignalType::DowntrendStart,
        };
        self.state.mark_confirmed(forced_direction, forced_bar.index);
        self.debug.log(triggering_index, &self.state, || {
            format!(
                "Forced {} from bar {} to keep alternation (rule {rule})",
                signal_type, forced_bar.index
            )
        });
        self.emit(&forced_bar, signal_type, triggering_index, rule, out);
    }

    /// Rule-C first (the current bar itself as a downtrend start on a higher
    /// high with a down close), then promotion of the previous bar, honoring
    /// the confirmed-this-step gates.
    fn scan_for_new_pending_signals(
        &mut self,
        current: &Bar,
        prev: &Bar,
        bar_before_prev: Option<&Bar>,
        cds_confirmed: bool,
        cus_confirmed: bool,
    ) {
        if self
            .state
            .containment
            .map_or(false, |w| w.suppresses_scanning(current.index))
        {
            self.debug.log(current.index, &self.state, || {
                "Signal scanning suppressed inside containment".to_string()
            });
            return;
        }

        let mut rule_c_set = false;
        if !cds_confirmed && current.high > prev.high && current.close < current.open {
            rule_c_set = self.state.set_pending_downtrend(current, Some(prev));
            if rule_c_set {
                self.debug.log(current.index, &self.state, || {
                    format!(
                        "Pending downtrend start on bar {} by Rule C",
                        current.index
                    )
                });
            }
        }

        if !cds_confirmed && !rule_c_set {
            let nominates = patterns::is_lower_ohlc(current, prev)
                || patterns::is_pending_downtrend_rule(current, prev)
                || patterns::is_simple_pending_downtrend(current, prev);
            if nominates && self.state.set_pending_downtrend(prev, bar_before_prev) {
                self.debug.log(current.index, &self.state, || {
                    format!("Pending downtrend start on bar {}", prev.index)
                });
            }
        }

        if !cus_confirmed && !rule_c_set {
            let nominates = patterns::is_higher_ohlc(current, prev)
                || patterns::is_pending_uptrend_rule(current, prev)
                || patterns::is_simple_pending_uptrend(current, prev)
                || patterns::is_hhll_down_close(current, prev);
            if nominates && self.state.set_pending_uptrend(prev) {
                self.debug.log(current.index, &self.state, || {
                    format!("Pending uptrend start on bar {}", prev.index)
                });
            }
        }
    }

    fn emit(
        &mut self,
        confirmed: &Bar,
        signal_type: SignalType,
        triggering_index: usize,
        rule: RuleType,
        out: &mut Vec<TrendEvent>,
    ) {
        let event = TrendEvent::new(
            confirmed,
            signal_type,
            triggering_index,
            rule,
            &self.contract_id,
            &self.timeframe,
        );
        self.signals.push(event.clone());
        out.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(index: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(index as i64),
            index,
            open,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn feed(engine: &mut TrendEngine, bars: &[Bar]) -> Vec<TrendEvent> {
        let mut all = Vec::new();
        for b in bars {
            all.extend(engine.process_new_bar(*b).unwrap());
        }
        all
    }

    #[test]
    fn first_bar_produces_no_events() {
        let mut engine = TrendEngine::new("MES", "1D");
        let events = engine.process_new_bar(bar(1, 10.0, 11.0, 9.0, 10.0)).unwrap();
        assert!(events.is_empty());
        assert!(engine.up_candidate().is_none());
        assert!(engine.down_candidate().is_none());
    }

    #[test]
    fn rejected_bar_leaves_state_untouched() {
        let mut engine = TrendEngine::new("MES", "1D");
        engine.process_new_bar(bar(1, 10.0, 11.0, 9.0, 10.0)).unwrap();
        engine.process_new_bar(bar(2, 10.5, 12.0, 10.0, 11.5)).unwrap();
        let candidate_before = engine.up_candidate();

        // index gap
        let err = engine.process_new_bar(bar(4, 11.0, 12.0, 10.5, 11.0));
        assert!(matches!(err, Err(BarError::NonContiguousIndex { .. })));
        assert_eq!(engine.bars().len(), 2);
        assert_eq!(engine.up_candidate(), candidate_before);

        // the stream continues with the correct bar
        assert!(engine.process_new_bar(bar(3, 11.0, 12.5, 10.5, 11.0)).is_ok());
        assert_eq!(engine.bars().len(), 3);
    }

    #[test]
    fn higher_ohlc_bar_nominates_previous_as_uptrend_candidate() {
        let mut engine = TrendEngine::new("MES", "1D");
        feed(
            &mut engine,
            &[bar(1, 10.0, 11.0, 9.0, 10.0), bar(2, 10.0, 12.0, 10.0, 11.5)],
        );
        let up = engine.up_candidate().unwrap();
        assert_eq!(up.index, 1);
        assert_eq!(up.low, 9.0);
    }

    #[test]
    fn rule_c_sets_downtrend_on_current_bar_and_skips_prev_promotion() {
        let mut engine = TrendEngine::new("MES", "1D");
        feed(
            &mut engine,
            &[
                bar(1, 10.0, 11.0, 9.0, 10.0),
                // higher high with a down close: the bar itself is the candidate
                bar(2, 11.0, 12.0, 9.8, 10.2),
            ],
        );
        let down = engine.down_candidate().unwrap();
        assert_eq!(down.index, 2);
        assert_eq!(down.high, 12.0);
    }

    #[test]
    fn lower_low_candidate_is_kept_over_a_shallower_one() {
        let mut engine = TrendEngine::new("MES", "1D");
        feed(
            &mut engine,
            &[
                bar(1, 10.0, 11.0, 9.0, 10.0),
                bar(2, 10.0, 12.0, 10.0, 11.5), // nominates bar 1 (low 9.0)
                bar(3, 11.5, 12.5, 11.0, 12.0), // nominates bar 2 (low 10.0): ignored
            ],
        );
        assert_eq!(engine.up_candidate().unwrap().index, 1);
    }

    #[test]
    fn exhaustion_reversal_emits_uptrend_start() {
        let mut engine = TrendEngine::new("MES", "1D");
        let events = feed(
            &mut engine,
            &[
                bar(1, 10.0, 11.0, 9.0, 10.0),
                bar(2, 10.0, 12.0, 10.0, 11.5),
                bar(3, 11.5, 12.5, 11.0, 12.0),
                bar(4, 12.0, 12.2, 10.5, 10.6), // lower OHLC: exhaustion
            ],
        );
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.signal_type, SignalType::UptrendStart);
        assert_eq!(event.confirmed_bar_index(), 1);
        assert_eq!(event.details.triggering_bar_index, 4);
        assert_eq!(
            event.details.rule_type,
            RuleType::Uptrend(UptrendRule::ExhaustionReversal)
        );
        // the confirmation consumed the candidate
        assert!(engine.up_candidate().is_none());
        assert_eq!(engine.last_confirmed().unwrap().direction, TrendDirection::Up);
    }

    #[test]
    fn all_signals_sorted_and_deduped() {
        let mut engine = TrendEngine::new("MES", "1D");
        feed(
            &mut engine,
            &[
                bar(1, 10.0, 11.0, 9.0, 10.0),
                bar(2, 10.0, 12.0, 10.0, 11.5),
                bar(3, 11.5, 12.5, 11.0, 12.0),
                bar(4, 12.0, 12.2, 10.5, 10.6),
            ],
        );
        let signals = engine.all_signals();
        assert_eq!(signals.len(), 1);
        let keys: Vec<_> = signals.iter().map(TrendEvent::sort_key).collect();
        let mut sorted_keys = keys.clone();
        sorted_keys.sort();
        assert_eq!(keys, sorted_keys);
    }

    #[test]
    fn determinism_two_engines_same_stream() {
        let stream = [
            bar(1, 10.0, 11.0, 9.0, 10.0),
            bar(2, 10.0, 12.0, 10.0, 11.5),
            bar(3, 11.5, 12.5, 11.0, 12.0),
            bar(4, 12.0, 12.2, 10.5, 10.6),
            bar(5, 10.6, 11.5, 10.6, 11.0),
            bar(6, 12.3, 12.4, 10.2, 11.2),
        ];
        let mut a = TrendEngine::new("MES", "1D");
        let mut b = TrendEngine::new("MES", "1D");
        feed(&mut a, &stream);
        feed(&mut b, &stream);
        let sig_a = a.all_signals();
        let sig_b = b.all_signals();
        assert_eq!(sig_a.len(), sig_b.len());
        for (x, y) in sig_a.iter().zip(sig_b.iter()) {
            assert_eq!(x.sort_key(), y.sort_key());
            assert_eq!(x.details.rule_type, y.details.rule_type);
        }
    }

    #[test]
    fn debug_trace_gated_by_range() {
        let mut engine = TrendEngine::new("MES", "1D");
        engine.enable_debug_range(2, 3);
        feed(
            &mut engine,
            &[
                bar(1, 10.0, 11.0, 9.0, 10.0),
                bar(2, 10.0, 12.0, 10.0, 11.5),
                bar(3, 11.5, 12.5, 11.0, 12.0),
                bar(4, 12.0, 12.2, 10.5, 10.6),
            ],
        );
        assert!(!engine.debug_records().is_empty());
        assert!(engine
            .debug_records()
            .iter()
            .all(|r| (2..=3).contains(&r.processing_bar_index)));
    }
}
