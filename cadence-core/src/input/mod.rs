//! Input handling
//!
//! Physical pin events enter through [`InputClassifier::on_pin_event`],
//! are routed by signal group, and leave as [`crate::events::SignalEvent`]s
//! once any debounce or latch protocol has resolved.

pub mod aux;
pub mod classifier;
pub mod debounce;
pub mod latch;

pub use aux::{AuxCtrl, AuxCtrlFunction, MAX_AUX_CTRL};
pub use classifier::InputClassifier;
pub use debounce::{DebounceAction, DebounceError, DebounceScheduler, Expired, Token, DEBOUNCE_SLOTS};
pub use latch::next_irq_mode;
