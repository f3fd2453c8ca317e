// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Habit-Streaks: recurrence and streak engine for a habit tracker
//!
//! This crate provides the backend API that expands habit repeat rules into
//! dated occurrences, records completions and progress, and computes streaks
//! and progress percentages for dashboards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SharedStore;
use services::{OccurrenceService, ProgressLedger, StatsAggregator, StreakEngine};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
    pub occurrences: OccurrenceService,
    pub progress: ProgressLedger,
    pub streaks: StreakEngine,
    pub stats: StatsAggregator,
}

impl AppState {
    /// Wire the engine services to a store.
    pub fn new(config: Config, store: SharedStore) -> Self {
        Self {
            occurrences: OccurrenceService::new(store.clone(), config.max_horizon_days),
            progress: ProgressLedger::new(store.clone()),
            streaks: StreakEngine::new(store.clone(), config.streak_threshold),
            stats: StatsAggregator::new(store.clone(), config.streak_threshold),
            config,
            store,
        }
    }
}
