//! Confirmation wizard
//!
//! The wizard is a strict linear walk whose step list is recomputed from the
//! classification. Transitions clamp at both ends; there is no terminal
//! state.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;

/// A step of the confirmation wizard, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// Payment request entry
    Address,
    /// Amount entry
    Amount,
    /// Review and confirm
    Summary,
}

/// Ordered step list for a classification
///
/// An amount-fixed invoice skips the amount step; unrecognized input never
/// leaves the address step.
pub fn steps(classification: &Classification) -> &'static [WizardStep] {
    match classification {
        Classification::Lightning(invoice) if invoice.amount_fixed() => {
            &[WizardStep::Address, WizardStep::Summary]
        }
        Classification::Lightning(_) | Classification::Onchain(_) => {
            &[WizardStep::Address, WizardStep::Amount, WizardStep::Summary]
        }
        Classification::Unclassified | Classification::Invalid => &[WizardStep::Address],
    }
}

/// Where the wizard is, and where it just was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    /// Step currently shown
    pub current: WizardStep,
    /// Step before the last transition
    pub previous: Option<WizardStep>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current: WizardStep::Address,
            previous: None,
        }
    }
}

impl WizardState {
    /// Move forward one step; no-op at the last step. Returns whether moved.
    pub fn next(&mut self, steps: &[WizardStep]) -> bool {
        let idx = index_of(steps, self.current);
        self.move_to(steps[(idx + 1).min(steps.len().saturating_sub(1))])
    }

    /// Move back one step; no-op at the first. Returns whether moved.
    pub fn back(&mut self, steps: &[WizardStep]) -> bool {
        let idx = index_of(steps, self.current);
        self.move_to(steps[idx.saturating_sub(1)])
    }

    /// Snap back to the address step, forgetting history
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn move_to(&mut self, target: WizardStep) -> bool {
        if target == self.current {
            return false;
        }
        self.previous = Some(self.current);
        self.current = target;
        true
    }
}

fn index_of(steps: &[WizardStep], step: WizardStep) -> usize {
    steps.iter().position(|s| *s == step).unwrap_or(0)
}
