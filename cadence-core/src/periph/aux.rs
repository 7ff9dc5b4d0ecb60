//! Auxiliary ports
//!
//! Analog outputs are PWM channels at a fixed 5 kHz taking 0..100 %.
//! Analog inputs are ADC reads. Ports used by a plugin or an aux-control
//! binding are claimed so they cannot be claimed twice.

use heapless::Vec;

use cadence_hal::{AnalogInput, HalResult, PwmChannel};

use crate::config::{ConfigError, SpindleSettings};
use crate::signals::{PinFunction, SignalGroup, SignalTable};

use super::spindle::PwmRamp;

/// Analog output PWM frequency
pub const ANALOG_OUT_FREQ_HZ: f32 = 5000.0;

/// Maximum analog ports of each direction
pub const MAX_ANALOG_PORTS: usize = 4;

/// Aux port class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuxPortKind {
    DigitalIn,
    DigitalOut,
    AnalogIn,
    AnalogOut,
}

impl AuxPortKind {
    pub const fn function(self, port: u8) -> PinFunction {
        match self {
            Self::DigitalIn => PinFunction::AuxIn(port),
            Self::DigitalOut => PinFunction::AuxOut(port),
            Self::AnalogIn => PinFunction::AnalogIn(port),
            Self::AnalogOut => PinFunction::AnalogOut(port),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Claimed aux ports, one bitmask per kind
#[derive(Debug, Clone, Copy, Default)]
pub struct PortClaims {
    claimed: [u32; 4],
}

impl PortClaims {
    pub const fn new() -> Self {
        Self { claimed: [0; 4] }
    }

    /// Claim `port` and label its pin with `description`
    pub fn claim(
        &mut self,
        table: &mut SignalTable,
        kind: AuxPortKind,
        port: u8,
        description: &'static str,
    ) -> Result<(), ConfigError> {
        let function = kind.function(port);
        if port >= 32 {
            return Err(ConfigError::MissingPin(function));
        }
        if self.is_claimed(kind, port) {
            return Err(ConfigError::AlreadyClaimed(function));
        }
        if !table.set_description(function, description) {
            return Err(ConfigError::MissingPin(function));
        }
        self.claimed[kind.index()] |= 1 << port;
        Ok(())
    }

    pub fn is_claimed(&self, kind: AuxPortKind, port: u8) -> bool {
        port < 32 && self.claimed[kind.index()] & (1 << port) != 0
    }
}

struct AnalogOut<P> {
    port: u8,
    pwm: P,
    ramp: Option<PwmRamp>,
    value: f32,
}

/// PWM-backed analog outputs
pub struct AnalogOutputs<P> {
    ports: Vec<AnalogOut<P>, MAX_ANALOG_PORTS>,
}

impl<P: PwmChannel> Default for AnalogOutputs<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PwmChannel> AnalogOutputs<P> {
    pub const fn new() -> Self {
        Self { ports: Vec::new() }
    }

    /// Add the PWM channel for analog output `port`
    pub fn add(&mut self, port: u8, pwm: P) -> Result<(), ConfigError> {
        if self.ports.iter().any(|p| p.port == port) {
            return Err(ConfigError::AlreadyClaimed(PinFunction::AnalogOut(port)));
        }
        self.ports
            .push(AnalogOut {
                port,
                pwm,
                ramp: None,
                value: 0.0,
            })
            .map_err(|_| ConfigError::TableFull)
    }

    /// Program every channel for 5 kHz, 0..100 %
    ///
    /// A channel that fails stays unavailable; the first error is returned.
    pub fn configure(&mut self, clock_hz: u32) -> HalResult<()> {
        let settings = SpindleSettings {
            pwm_freq_hz: ANALOG_OUT_FREQ_HZ,
            rpm_max: 100.0,
            ..Default::default()
        };
        let mut result = Ok(());
        for port in self.ports.iter_mut() {
            let ramp = PwmRamp::compute(&settings, clock_hz).and_then(|ramp| {
                port.pwm.configure(ramp.timing())?;
                Ok(ramp)
            });
            match ramp {
                Ok(ramp) => {
                    port.pwm.set_level(ramp.off_value);
                    port.value = 0.0;
                    port.ramp = Some(ramp);
                }
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("analog out {} unavailable: {}", port.port, e);
                    port.ramp = None;
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    /// Set analog output `port` to `value` percent
    ///
    /// Returns false if the port does not exist or its PWM is unavailable.
    pub fn analog_out(&mut self, port: u8, value: f32) -> bool {
        let Some(out) = self.ports.iter_mut().find(|p| p.port == port) else {
            return false;
        };
        let Some(ramp) = out.ramp.as_ref() else {
            return false;
        };
        out.pwm.set_level(ramp.value(value));
        out.value = value;
        true
    }

    /// Last value written to `port`
    pub fn value(&self, port: u8) -> Option<f32> {
        self.ports
            .iter()
            .find(|p| p.port == port && p.ramp.is_some())
            .map(|p| p.value)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// ADC-backed analog inputs
pub struct AnalogInputs<A> {
    adc: A,
    /// (port, GPIO) pairs from the signal table
    ports: Vec<(u8, u8), MAX_ANALOG_PORTS>,
}

impl<A: AnalogInput> AnalogInputs<A> {
    /// Collect the analog inputs of `table`
    pub fn new(adc: A, table: &SignalTable) -> Result<Self, ConfigError> {
        let mut ports = Vec::new();
        for input in table.inputs_in(SignalGroup::AuxInputAnalog) {
            if let PinFunction::AnalogIn(port) = input.function {
                ports
                    .push((port, input.pin))
                    .map_err(|_| ConfigError::TableFull)?;
            }
        }
        Ok(Self { adc, ports })
    }

    /// Raw conversion of analog input `port`
    pub fn analog_in(&mut self, port: u8) -> Option<u16> {
        let pin = self.ports.iter().find(|p| p.0 == port)?.1;
        self.adc.read(pin)
    }

    /// Full-scale reading of the ADC
    pub fn full_scale(&self) -> u16 {
        self.adc.full_scale()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
