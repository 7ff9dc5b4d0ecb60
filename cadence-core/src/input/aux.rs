//! Aux input control bindings
//!
//! A board may dedicate a generic aux input to a control function. Events
//! on that port then feed the control snapshot instead of the aux event
//! stream.

use cadence_hal::irq::IrqMode;

use crate::signals::ControlSignals;

/// Maximum bound aux controls
pub const MAX_AUX_CTRL: usize = 4;

/// Control function an aux input can take over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuxCtrlFunction {
    SafetyDoor,
    MotorFault,
    MotorWarning,
    ProbeDisconnect,
}

impl AuxCtrlFunction {
    /// Control bit this function reports
    pub const fn control_bit(self) -> ControlSignals {
        match self {
            AuxCtrlFunction::SafetyDoor => ControlSignals::SAFETY_DOOR_AJAR,
            AuxCtrlFunction::MotorFault => ControlSignals::MOTOR_FAULT,
            AuxCtrlFunction::MotorWarning => ControlSignals::MOTOR_WARNING,
            AuxCtrlFunction::ProbeDisconnect => ControlSignals::PROBE_DISCONNECTED,
        }
    }
}

/// Aux input bound to a control function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuxCtrl {
    pub function: AuxCtrlFunction,
    /// Aux input port number
    pub port: u8,
    pub irq_mode: IrqMode,
    /// Door settle timer pending
    pub debouncing: bool,
}

impl AuxCtrl {
    pub const fn new(function: AuxCtrlFunction, port: u8, irq_mode: IrqMode) -> Self {
        Self {
            function,
            port,
            irq_mode,
            debouncing: false,
        }
    }
}
