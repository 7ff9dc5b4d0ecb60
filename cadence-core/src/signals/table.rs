//! Signal table
//!
//! Owns every pin descriptor of the board. Other components refer to
//! inputs by index and never keep copies of the mutable fields.

use heapless::Vec;

use super::pin::{
    BoardPin, InputSignal, OutputSignal, PeriphPin, PinFunction, PinInfo, PortKind, SignalGroup,
};
use crate::config::ConfigError;

/// Maximum watched inputs
pub const MAX_INPUTS: usize = 32;

/// Maximum driven outputs
pub const MAX_OUTPUTS: usize = 40;

/// Maximum peripheral-owned pins
pub const MAX_PERIPH_PINS: usize = 16;

/// Pins sharing a number collide only within the same physical space
fn space(port: PortKind) -> u8 {
    match port {
        PortKind::Gpio | PortKind::Sequencer | PortKind::Analog => 0,
        PortKind::ShiftRegister8 => 1,
        PortKind::ShiftRegister16 => 2,
        PortKind::Expander => 3,
    }
}

/// Static pin map with the runtime-mutable input fields
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    inputs: Vec<InputSignal, MAX_INPUTS>,
    outputs: Vec<OutputSignal, MAX_OUTPUTS>,
    periph: Vec<PeriphPin, MAX_PERIPH_PINS>,
}

impl SignalTable {
    pub const fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            periph: Vec::new(),
        }
    }

    /// Build a table from a board pin map
    pub fn from_board(pins: &[BoardPin]) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for p in pins {
            if p.function.is_input() {
                table.add_input(p.function, p.port, p.pin)?;
            } else if p.function.is_peripheral() {
                table.register_periph_pin(p.function, p.pin)?;
            } else {
                table.add_output(p.function, p.port, p.pin)?;
            }
        }
        Ok(table)
    }

    fn pin_in_use(&self, port: PortKind, pin: u8) -> bool {
        let s = space(port);
        self.inputs
            .iter()
            .any(|i| space(i.port) == s && i.pin == pin)
            || self
                .outputs
                .iter()
                .any(|o| space(o.port) == s && o.pin == pin)
            || (s == 0 && self.periph.iter().any(|p| p.pin == pin))
    }

    /// Add a watched input
    pub fn add_input(
        &mut self,
        function: PinFunction,
        port: PortKind,
        pin: u8,
    ) -> Result<usize, ConfigError> {
        let port_ok = match function {
            PinFunction::AnalogIn(_) => port == PortKind::Analog,
            f => f.is_input() && port.supports_irq(),
        };
        if !port_ok {
            return Err(ConfigError::UnsupportedPort(function));
        }
        if pin >= 32 {
            return Err(ConfigError::UnsupportedPort(function));
        }
        if self.pin_in_use(port, pin) {
            return Err(ConfigError::DuplicatePin(pin));
        }
        self.inputs
            .push(InputSignal::new(function, port, pin))
            .map_err(|_| ConfigError::TableFull)?;
        Ok(self.inputs.len() - 1)
    }

    /// Add a driven output
    pub fn add_output(
        &mut self,
        function: PinFunction,
        port: PortKind,
        pin: u8,
    ) -> Result<usize, ConfigError> {
        let port_ok = !function.is_input()
            && !function.is_peripheral()
            && match function.group() {
                SignalGroup::StepperStep | SignalGroup::StepperDir => matches!(
                    port,
                    PortKind::Gpio | PortKind::Sequencer | PortKind::ShiftRegister8
                ),
                SignalGroup::SpindlePwm => port == PortKind::Gpio,
                SignalGroup::AuxOutputAnalog => port == PortKind::Analog,
                _ => matches!(
                    port,
                    PortKind::Gpio | PortKind::ShiftRegister16 | PortKind::Expander
                ),
            };
        if !port_ok {
            return Err(ConfigError::UnsupportedPort(function));
        }
        if pin >= 32 {
            return Err(ConfigError::UnsupportedPort(function));
        }
        if self.pin_in_use(port, pin) {
            return Err(ConfigError::DuplicatePin(pin));
        }
        self.outputs
            .push(OutputSignal::new(function, port, pin))
            .map_err(|_| ConfigError::TableFull)?;
        Ok(self.outputs.len() - 1)
    }

    /// Record a GPIO claimed by a bus peripheral
    pub fn register_periph_pin(&mut self, function: PinFunction, pin: u8) -> Result<(), ConfigError> {
        if self.pin_in_use(PortKind::Gpio, pin) {
            return Err(ConfigError::DuplicatePin(pin));
        }
        self.periph
            .push(PeriphPin {
                function,
                group: function.group(),
                pin,
                description: None,
            })
            .map_err(|_| ConfigError::TableFull)
    }

    /// Attach a description to a registered peripheral pin
    ///
    /// Returns false if no peripheral pin has this function.
    pub fn set_periph_pin_description(
        &mut self,
        function: PinFunction,
        description: &'static str,
    ) -> bool {
        match self.periph.iter_mut().find(|p| p.function == function) {
            Some(p) => {
                p.description = Some(description);
                true
            }
            None => false,
        }
    }

    /// Attach a description to the input or output with `function`
    pub fn set_description(&mut self, function: PinFunction, description: &'static str) -> bool {
        if let Some(i) = self.inputs.iter_mut().find(|i| i.function == function) {
            i.description = Some(description);
            return true;
        }
        match self.outputs.iter_mut().find(|o| o.function == function) {
            Some(o) => {
                o.description = Some(description);
                true
            }
            None => false,
        }
    }

    pub fn inputs(&self) -> &[InputSignal] {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut [InputSignal] {
        &mut self.inputs
    }

    pub fn outputs(&self) -> &[OutputSignal] {
        &self.outputs
    }

    pub fn input(&self, idx: usize) -> Option<&InputSignal> {
        self.inputs.get(idx)
    }

    pub fn input_mut(&mut self, idx: usize) -> Option<&mut InputSignal> {
        self.inputs.get_mut(idx)
    }

    /// Index of the interrupt-capable input on GPIO `pin`
    ///
    /// Linear scan; the table is small and bounded.
    pub fn find_input(&self, pin: u8) -> Option<usize> {
        self.inputs
            .iter()
            .position(|i| i.pin == pin && i.port.supports_irq())
    }

    /// Index of the input with `function`
    pub fn find_input_fn(&self, function: PinFunction) -> Option<usize> {
        self.inputs.iter().position(|i| i.function == function)
    }

    /// First output with `function`
    pub fn find_output(&self, function: PinFunction) -> Option<&OutputSignal> {
        self.outputs.iter().find(|o| o.function == function)
    }

    /// Outputs in `group`
    pub fn outputs_in(&self, group: SignalGroup) -> impl Iterator<Item = &OutputSignal> + '_ {
        self.outputs.iter().filter(move |o| o.group == group)
    }

    /// Inputs in `group`
    pub fn inputs_in(&self, group: SignalGroup) -> impl Iterator<Item = &InputSignal> + '_ {
        self.inputs.iter().filter(move |i| i.group == group)
    }

    /// List every pin: inputs, outputs, then peripheral pins
    pub fn enumerate_pins(&self) -> impl Iterator<Item = PinInfo> + '_ {
        let inputs = self.inputs.iter().map(|i| PinInfo {
            function: i.function,
            group: i.group,
            port: i.port,
            pin: i.pin,
            is_input: true,
            description: i.description,
        });
        let outputs = self.outputs.iter().map(|o| PinInfo {
            function: o.function,
            group: o.group,
            port: o.port,
            pin: o.pin,
            is_input: false,
            description: o.description,
        });
        let periph = self.periph.iter().map(|p| PinInfo {
            function: p.function,
            group: p.group,
            port: PortKind::Gpio,
            pin: p.pin,
            is_input: matches!(
                p.function,
                PinFunction::UartRx | PinFunction::SpiMiso
            ),
            description: p.description,
        });
        inputs.chain(outputs).chain(periph)
    }
}
