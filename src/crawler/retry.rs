//! Retry policy for failed fetches
//!
//! | Failure | Action |
//! |---------|--------|
//! | Render timeout | Retry up to `max_retries` |
//! | Navigation / browser error | Retry up to `max_retries` |
//! | Non-2xx in `retryable_status_codes` | Retry up to `max_retries` |
//! | Any other non-2xx | Ignore immediately, never parsed |
//! | Invalid selector | Ignore immediately |
//!
//! A retry is a copy of the unit with `retry_count + 1`, its priority shifted by
//! `priority_adjust`, and the dedup bypass set.

use crate::config::RetryConfig;
use crate::crawler::WorkUnit;
use crate::render::RenderError;
use std::collections::HashSet;

/// How a failure is treated by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// May succeed on another attempt
    Retryable,
    /// Will not be retried; the branch is dropped
    Ignored,
}

/// Decides whether failed work units are resubmitted
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    retryable_status_codes: HashSet<u16>,
    priority_adjust: i32,
}

impl RetryPolicy {
    pub fn new(
        max_retries: u32,
        retryable_status_codes: impl IntoIterator<Item = u16>,
        priority_adjust: i32,
    ) -> Self {
        Self {
            max_retries,
            retryable_status_codes: retryable_status_codes.into_iter().collect(),
            priority_adjust,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retryable_status_codes.iter().copied(),
            config.priority_adjust,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn priority_adjust(&self) -> i32 {
        self.priority_adjust
    }

    /// Classifies a render failure
    pub fn classify(&self, error: &RenderError) -> FailureClass {
        match error {
            RenderError::Timeout { .. }
            | RenderError::Navigation { .. }
            | RenderError::Browser(_) => FailureClass::Retryable,
            RenderError::HttpStatus { status, .. } => {
                if self.retryable_status_codes.contains(status) {
                    FailureClass::Retryable
                } else {
                    FailureClass::Ignored
                }
            }
            RenderError::InvalidSelector(_) => FailureClass::Ignored,
        }
    }

    /// Returns the unit to resubmit after `error`, or `None` to drop the branch
    pub fn on_failure(&self, unit: &WorkUnit, error: &RenderError) -> Option<WorkUnit> {
        if self.classify(error) == FailureClass::Ignored {
            match error.status() {
                Some(status) => {
                    tracing::error!("Request failed with status {}: {}", status, unit.url)
                }
                None => tracing::error!("Request ignored for {}: {}", unit.url, error),
            }
            return None;
        }

        if unit.retry_count < self.max_retries {
            let retry = unit.retried(self.priority_adjust);
            tracing::info!(
                "Retrying {} due to {} (retry {}/{})",
                unit.url,
                error,
                retry.retry_count,
                self.max_retries
            );
            Some(retry)
        } else {
            tracing::info!(
                "Gave up retrying {} after {} attempts: {}",
                unit.url,
                unit.retry_count + 1,
                error
            );
            None
        }
    }

    /// One-line description for start-up logs
    pub fn describe(&self) -> String {
        let mut codes: Vec<u16> = self.retryable_status_codes.iter().copied().collect();
        codes.sort_unstable();
        format!(
            "max_retries={}, retryable_status_codes={:?}, priority_adjust={}",
            self.max_retries, codes, self.priority_adjust
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
