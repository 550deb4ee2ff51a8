//! In-memory implementation of `TrustLedger`.
//!
//! `InMemoryTrustLedger` keeps all records, dimension scores and the chained
//! event log behind one `Mutex`, so every read-modify-write of a score is
//! serialized and concurrent updates for the same agent cannot be lost.
//!
//! Reads are pure. Decay only happens through an explicit `decay` or `tick`
//! call with a caller-supplied clock value.

use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use atrian_contracts::{
    agent::AgentId,
    trust::{
        clamp_score, BoundaryCheck, DelegationScope, TrustBaseline, TrustDimension, TrustEvent,
        TrustLevel, TrustOutcome, TrustRecord, WarningLevel, TRUST_SCORE_MAX, TRUST_SCORE_MIN,
    },
};
use atrian_core::traits::TrustLedger;

use crate::{
    chain::{hash_event, verify_chain, ChainedEvent, GENESIS_HASH},
    config::LedgerConfig,
};

const DEFAULT_REASON: &str = "No reason provided";

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LedgerState {
    pub(crate) records: HashMap<AgentId, TrustRecord>,
    pub(crate) dimensions: HashMap<AgentId, BTreeMap<TrustDimension, f64>>,
    pub(crate) log: Vec<ChainedEvent>,
    pub(crate) last_hash: String,
}

impl LedgerState {
    fn append(&mut self, event: TrustEvent) {
        let sequence = self.log.len() as u64;
        let prev_hash = std::mem::take(&mut self.last_hash);
        let this_hash = hash_event(sequence, &event, &prev_hash);
        self.last_hash = this_hash.clone();
        self.log.push(ChainedEvent {
            sequence,
            event,
            prev_hash,
            this_hash,
        });
    }
}

// ── Public ledger ─────────────────────────────────────────────────────────────

pub struct InMemoryTrustLedger {
    config: LedgerConfig,
    baselines: HashMap<AgentId, TrustBaseline>,
    pub(crate) state: Mutex<LedgerState>,
}

impl InMemoryTrustLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            baselines: HashMap::new(),
            state: Mutex::new(LedgerState {
                records: HashMap::new(),
                dimensions: HashMap::new(),
                log: Vec::new(),
                last_hash: GENESIS_HASH.to_string(),
            }),
        }
    }

    /// Seed per-agent baselines from `trust_rules` entries. Later entries for
    /// the same agent replace earlier ones.
    pub fn with_baselines(mut self, baselines: impl IntoIterator<Item = TrustBaseline>) -> Self {
        for baseline in baselines {
            match AgentId::parse(&baseline.agent) {
                Some(id) => {
                    self.baselines.insert(id, baseline);
                }
                None => warn!("ignoring trust baseline with an empty agent id"),
            }
        }
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured level for `agent`: `None` when there is no baseline or
    /// its level name is not recognized.
    fn level_of(&self, agent: &AgentId) -> Option<TrustLevel> {
        let baseline = self.baselines.get(agent)?;
        match baseline.level.as_deref() {
            None => Some(TrustLevel::Medium),
            Some(name) => TrustLevel::from_str(name).ok(),
        }
    }

    /// Starting score for an agent without a record.
    fn baseline_score(&self, agent: &AgentId) -> f64 {
        let Some(baseline) = self.baselines.get(agent) else {
            return self.config.default_initial_trust;
        };
        match self.level_of(agent) {
            Some(level) => level.baseline_score(),
            None => {
                warn!(
                    agent_id = %agent,
                    level = ?baseline.level,
                    "unrecognized trust level; using default initial trust"
                );
                self.config.default_initial_trust
            }
        }
    }

    fn current_score(&self, state: &LedgerState, agent: &AgentId) -> f64 {
        state
            .records
            .get(agent)
            .map(|r| r.score)
            .unwrap_or_else(|| self.baseline_score(agent))
    }

    fn parse_agent(agent_id: &str) -> Option<AgentId> {
        let parsed = AgentId::parse(agent_id);
        if parsed.is_none() {
            warn!("empty or whitespace agent id");
        }
        parsed
    }

    /// Apply a typed outcome. Equivalent to `update_trust_score` with the
    /// outcome's string form.
    pub fn apply(
        &self,
        agent_id: &str,
        event_type: &str,
        outcome: TrustOutcome,
        magnitude: f64,
        reason: Option<&str>,
    ) -> f64 {
        self.update_trust_score(agent_id, event_type, outcome.as_str(), magnitude, reason)
    }

    /// The current record for an agent, if one has been created.
    pub fn record(&self, agent_id: &str) -> Option<TrustRecord> {
        let agent = AgentId::parse(agent_id)?;
        self.lock().records.get(&agent).cloned()
    }

    // ── Decay ─────────────────────────────────────────────────────────────────

    /// Decay one agent's score to `now` and return the resulting score.
    ///
    /// The score becomes `score × (1 − rate)^days` for the whole days since
    /// its last update, floored at `decay.floor`. A score already at or below
    /// the floor is left alone. Agents without a record are not touched.
    pub fn decay(&self, agent_id: &str, now: DateTime<Utc>) -> f64 {
        let Some(agent) = Self::parse_agent(agent_id) else {
            return TRUST_SCORE_MIN;
        };
        let mut state = self.lock();
        match state.records.get_mut(&agent) {
            Some(record) => {
                decay_record(record, &self.config, now);
                record.score
            }
            None => self.baseline_score(&agent),
        }
    }

    /// Decay every known agent to `now`. Returns how many scores changed.
    pub fn tick(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let mut changed = 0;
        for record in state.records.values_mut() {
            if decay_record(record, &self.config, now) {
                changed += 1;
            }
        }
        if changed > 0 {
            info!(agents = changed, "applied trust decay");
        }
        changed
    }

    // ── Boundaries & delegation ───────────────────────────────────────────────

    /// Compare an agent's score with the band for its configured level.
    ///
    /// Agents without a baseline use the `medium` band; unrecognized levels
    /// use the `blocked` band.
    pub fn check_boundaries(&self, agent_id: &str) -> BoundaryCheck {
        let Some(agent) = Self::parse_agent(agent_id) else {
            return BoundaryCheck {
                within_bounds: false,
                current_score: TRUST_SCORE_MIN,
                min_bound: TRUST_SCORE_MIN,
                max_bound: TRUST_SCORE_MAX,
                warning_level: Some(WarningLevel::Critical),
            };
        };

        let (min_bound, max_bound) = if self.baselines.contains_key(&agent) {
            self.level_of(&agent).unwrap_or(TrustLevel::Blocked).bounds()
        } else {
            TrustLevel::Medium.bounds()
        };
        let warning_threshold = min_bound + (max_bound - min_bound) * 0.2;

        let current_score = {
            let state = self.lock();
            self.current_score(&state, &agent)
        };

        let warning_level = if current_score < min_bound {
            Some(if current_score < min_bound * 0.8 {
                WarningLevel::Critical
            } else {
                WarningLevel::Low
            })
        } else if current_score > max_bound {
            Some(if current_score > max_bound * 1.2 {
                WarningLevel::Critical
            } else {
                WarningLevel::Low
            })
        } else if current_score <= warning_threshold {
            Some(WarningLevel::Low)
        } else {
            None
        };

        BoundaryCheck {
            within_bounds: (min_bound..=max_bound).contains(&current_score),
            current_score,
            min_bound,
            max_bound,
            warning_level,
        }
    }

    /// Whether `delegator` may hand work to `delegatee`.
    ///
    /// Requires a delegator baseline with a scope other than `none` that
    /// lists the delegatee (or `*`), and a delegatee score of at least
    /// `delegation_threshold`.
    pub fn can_delegate(&self, delegator: &str, delegatee: &str) -> bool {
        let (Some(from), Some(to)) = (Self::parse_agent(delegator), Self::parse_agent(delegatee))
        else {
            return false;
        };

        let Some(baseline) = self.baselines.get(&from) else {
            debug!(delegator = %from, "delegation denied: no baseline");
            return false;
        };
        if baseline.delegation == DelegationScope::None {
            debug!(delegator = %from, "delegation denied: scope is none");
            return false;
        }
        let listed = baseline
            .can_delegate_to
            .iter()
            .any(|name| name == "*" || name.trim() == to.as_str());
        if !listed {
            debug!(delegator = %from, delegatee = %to, "delegation denied: delegatee not listed");
            return false;
        }

        let score = {
            let state = self.lock();
            self.current_score(&state, &to)
        };
        if score < self.config.delegation_threshold {
            debug!(
                delegatee = %to,
                score,
                threshold = self.config.delegation_threshold,
                "delegation denied: delegatee trust below threshold"
            );
            return false;
        }
        true
    }

    // ── Integrity ─────────────────────────────────────────────────────────────

    /// The chained log, for export or inspection.
    pub fn chained_log(&self) -> Vec<ChainedEvent> {
        self.lock().log.clone()
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.lock().log)
    }
}

/// Apply decay to one record. Returns whether the score changed.
fn decay_record(record: &mut TrustRecord, config: &LedgerConfig, now: DateTime<Utc>) -> bool {
    if !config.decay.enabled {
        return false;
    }
    let days = (now - record.last_updated).num_days();
    if days <= 0 {
        return false;
    }

    let decayed = record.score * (1.0 - config.decay.rate_per_day).powi(days as i32);
    let next = record.score.min(decayed.max(config.decay.floor));
    record.last_updated += Duration::days(days);

    if next == record.score {
        return false;
    }
    debug!(
        agent_id = %record.agent_id,
        days,
        from = record.score,
        to = next,
        "decayed trust score"
    );
    record.score = clamp_score(next);
    true
}

// ── TrustLedger impl ──────────────────────────────────────────────────────────

impl TrustLedger for InMemoryTrustLedger {
    fn get_trust_score(&self, agent_id: &str) -> f64 {
        let Some(agent) = Self::parse_agent(agent_id) else {
            return TRUST_SCORE_MIN;
        };
        let state = self.lock();
        self.current_score(&state, &agent)
    }

    fn update_trust_score(
        &self,
        agent_id: &str,
        event_type: &str,
        outcome: &str,
        magnitude: f64,
        reason: Option<&str>,
    ) -> f64 {
        let Some(agent) = AgentId::parse(agent_id) else {
            error!(event_type = %event_type, "cannot update trust for empty agent id");
            return TRUST_SCORE_MIN;
        };

        let now = Utc::now();
        let mut state = self.lock();
        let original_score = self.current_score(&state, &agent);

        let parsed = TrustOutcome::from_str(outcome);
        let (adjustment, success) = match parsed {
            Ok(o) if magnitude.is_finite() => (o.signed(magnitude), true),
            Ok(_) => {
                warn!(agent_id = %agent, magnitude, "non-finite magnitude; score unchanged");
                (0.0, false)
            }
            Err(e) => {
                warn!(agent_id = %agent, error = %e, "score unchanged");
                (0.0, false)
            }
        };
        let new_score = clamp_score(original_score + adjustment);

        let record = state
            .records
            .entry(agent.clone())
            .or_insert_with(|| TrustRecord {
                agent_id: agent.clone(),
                score: original_score,
                last_updated: now,
            });
        if success {
            record.score = new_score;
            record.last_updated = now;
        }

        state.append(TrustEvent {
            agent_id: agent.clone(),
            event_type: event_type.to_string(),
            outcome: outcome.trim().to_lowercase(),
            magnitude,
            original_score,
            adjustment,
            new_score,
            reason: reason.unwrap_or(DEFAULT_REASON).to_string(),
            success,
            timestamp: now,
        });

        if success {
            info!(
                agent_id = %agent,
                event_type = %event_type,
                original_score,
                new_score,
                "trust score updated"
            );
        }
        new_score
    }

    fn get_trust_log(&self, agent_id: Option<&str>, last_n: Option<usize>) -> Vec<TrustEvent> {
        let filter = match agent_id {
            Some(raw) => match Self::parse_agent(raw) {
                Some(agent) => Some(agent),
                None => return Vec::new(),
            },
            None => None,
        };

        let state = self.lock();
        let matching: Vec<TrustEvent> = state
            .log
            .iter()
            .map(|entry| &entry.event)
            .filter(|event| filter.as_ref().map_or(true, |a| &event.agent_id == a))
            .cloned()
            .collect();

        match last_n {
            Some(n) => {
                let skip = matching.len().saturating_sub(n);
                matching.into_iter().skip(skip).collect()
            }
            None => matching,
        }
    }

    fn dimension_scores(&self, agent_id: &str) -> BTreeMap<TrustDimension, f64> {
        let Some(agent) = Self::parse_agent(agent_id) else {
            return TrustDimension::ALL
                .into_iter()
                .map(|d| (d, TRUST_SCORE_MIN))
                .collect();
        };
        let state = self.lock();
        match state.dimensions.get(&agent) {
            Some(dims) => dims.clone(),
            None => {
                let base = self.baseline_score(&agent);
                TrustDimension::ALL.into_iter().map(|d| (d, base)).collect()
            }
        }
    }

    fn update_dimension(&self, agent_id: &str, dimension: TrustDimension, adjustment: f64) -> f64 {
        let Some(agent) = Self::parse_agent(agent_id) else {
            return TRUST_SCORE_MIN;
        };
        if !adjustment.is_finite() {
            warn!(agent_id = %agent, dimension = %dimension, "non-finite dimension adjustment ignored");
            return self.dimension_scores(agent_id)[&dimension];
        }

        let base = self.baseline_score(&agent);
        let mut state = self.lock();
        let dims = state
            .dimensions
            .entry(agent.clone())
            .or_insert_with(|| TrustDimension::ALL.into_iter().map(|d| (d, base)).collect());
        let value = dims.entry(dimension).or_insert(base);
        let before = *value;
        *value = clamp_score(before + adjustment);

        debug!(
            agent_id = %agent,
            dimension = %dimension,
            from = before,
            to = *value,
            "dimension trust updated"
        );
        *value
    }

    fn snapshot_scores(&self) -> BTreeMap<String, f64> {
        self.lock()
            .records
            .values()
            .map(|r| (r.agent_id.to_string(), r.score))
            .collect()
    }

    fn restore_scores(&self, scores: &BTreeMap<String, f64>) {
        let now = Utc::now();
        let mut state = self.lock();
        for (raw, score) in scores {
            let Some(agent) = AgentId::parse(raw) else {
                warn!("skipping restored score with an empty agent id");
                continue;
            };
            if !score.is_finite() {
                warn!(agent_id = %agent, "skipping non-finite restored score");
                continue;
            }
            state.records.insert(
                agent.clone(),
                TrustRecord {
                    agent_id: agent,
                    score: clamp_score(*score),
                    last_updated: now,
                },
            );
        }
        info!(agents = scores.len(), "restored trust scores");
    }
}
