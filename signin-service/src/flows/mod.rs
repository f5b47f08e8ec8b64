//! Sign-in flows.
//!
//! Every flow validates its request with an ordered [`Pipeline`] of [`Step`]s
//! against the shared [`PolicySet`]; the first failing step decides the
//! outcome. Flows differ only in their steps and in what happens after
//! validation.

mod error;
pub mod passwordless_email;
pub mod steps;

pub use error::FlowError;
pub use passwordless_email::PasswordlessEmailFlow;
pub use steps::SignupContext;

use crate::policy::PolicySet;

/// Successful flow outcome. Carries nothing secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledged;

pub type Outcome = Result<Acknowledged, FlowError>;

/// One policy check. A step may also normalize the context it validates.
pub trait Step<C>: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, policy: &PolicySet, ctx: &mut C) -> Result<(), FlowError>;
}

/// Ordered steps run with short-circuit semantics.
pub struct Pipeline<C> {
    steps: Vec<Box<dyn Step<C>>>,
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<C> Pipeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl Step<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, policy: &PolicySet, ctx: &mut C) -> Result<(), FlowError> {
        for step in &self.steps {
            if let Err(e) = step.check(policy, ctx) {
                tracing::warn!(step = step.name(), error_code = e.error_code(), "Policy check failed");
                return Err(e);
            }
        }
        Ok(())
    }
}
