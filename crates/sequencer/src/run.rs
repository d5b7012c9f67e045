//! Run - the ordered step list for one invocation

use crate::error::{Error, Result};
use crate::step::{BoxedStep, Step};
use std::collections::HashSet;

/// The ordered sequence of steps for one invocation against one target
///
/// A run is built fresh per invocation and consumed by
/// [`execute`](crate::execute) exactly once.
#[derive(Debug)]
pub struct Run {
    target: String,
    steps: Vec<BoxedStep>,
}

impl Run {
    /// Create an empty run for a target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step; steps execute in the order they are added
    pub fn push(&mut self, step: BoxedStep) {
        self.steps.push(step);
    }

    /// Builder form of [`Run::push`]
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn steps(&self) -> &[BoxedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in declared order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Check that step names are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(Error::validation(format!(
                    "duplicate step name '{}' in run for {}",
                    step.name(),
                    self.target
                )));
            }
        }
        Ok(())
    }
}
