//! Embassy async tasks
//!
//! The stepper task runs on the high-priority interrupt executor; the rest
//! share the thread executor and talk through [`crate::channels`].

pub mod events;
pub mod inputs;
pub mod periph;
pub mod stepper;
pub mod systick;
pub mod watch;

pub use events::events_task;
pub use inputs::{inputs_task, Classifier};
pub use periph::{periph_task, PeriphResources};
pub use stepper::{stepper_task, StepperResources};
pub use systick::systick_task;
pub use watch::pin_watch_task;
