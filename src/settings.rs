//! Scheduler settings persistence - load/save tuning knobs as JSON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tuning knobs for the tick loop and the task manager.
/// Missing fields in a settings file fall back to their defaults.
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// Fixed simulation step in seconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,
    /// Ticks a binding must last before higher-priority work may take its agent.
    #[serde(default = "default_min_dwell")]
    pub min_dwell_ticks: u64,
    /// Ticks before an agent that stopped on a task is offered it again.
    #[serde(default = "default_stopped_retry")]
    pub stopped_retry_ticks: u64,
    #[serde(default = "default_true")]
    pub allow_preemption: bool,
    /// Health fraction below which an agent asks for healing.
    #[serde(default = "default_heal_threshold")]
    pub heal_threshold: f32,
    /// Ticks before a failed path search is repeated in an unchanged world.
    #[serde(default = "default_replan_backoff")]
    pub replan_backoff_ticks: u64,
}

fn default_tick_seconds() -> f32 { 0.05 }
fn default_min_dwell() -> u64 { 40 }
fn default_stopped_retry() -> u64 { 20 }
fn default_true() -> bool { true }
fn default_heal_threshold() -> f32 { 0.5 }
fn default_replan_backoff() -> u64 { 10 }

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            min_dwell_ticks: default_min_dwell(),
            stopped_retry_ticks: default_stopped_retry(),
            allow_preemption: true,
            heal_threshold: default_heal_threshold(),
            replan_backoff_ticks: default_replan_backoff(),
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(SettingsError::Invalid("tick_seconds must be positive"));
        }
        if !(0.0..=1.0).contains(&self.heal_threshold) {
            return Err(SettingsError::Invalid("heal_threshold must be within 0..=1"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed settings in {}: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid settings: {0}")]
    Invalid(&'static str),
}

/// Read and validate a settings file.
pub fn try_load_settings(path: &Path) -> Result<SchedulerSettings, SettingsError> {
    let json = std::fs::read_to_string(path)
        .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
    let settings: SchedulerSettings = serde_json::from_str(&json)
        .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings, falling back to defaults on any error.
pub fn load_settings(path: &Path) -> SchedulerSettings {
    match try_load_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("{}, using default settings", e);
            SchedulerSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &SchedulerSettings) -> Result<(), SettingsError> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })?;
    std::fs::write(path, json).map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })
}
