//! Pin descriptors
//!
//! A pin function is the logical identity of a line ("X limit", "spindle
//! PWM"). Its [`SignalGroup`] decides how inputs are dispatched and which
//! façade drives an output.

use core::fmt;

use cadence_hal::gpio::Pull;
use cadence_hal::irq::IrqMode;

use super::Axis;

/// Which motor of a (possibly ganged) axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motor {
    /// First motor, bank 1
    Primary,
    /// Ganged second motor, bank 2
    Secondary,
}

/// Logical pin identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    // Limit switches
    LimitMin(Axis),
    LimitMin2(Axis),
    LimitMax(Axis),
    LimitMax2(Axis),

    // Control inputs
    Reset,
    EStop,
    FeedHold,
    CycleStart,
    SafetyDoor,
    LimitsOverride,
    BlockDelete,
    StopDisable,
    SingleBlock,

    Probe,
    MpgSelect,
    I2cStrobe,
    SpiIrq,
    AuxIn(u8),
    AnalogIn(u8),

    // Stepper outputs
    Step(Axis, Motor),
    Dir(Axis, Motor),
    StepperEnable(Axis),
    StepperEnableAll,

    // Spindle and coolant
    SpindleOn,
    SpindleDir,
    SpindlePwm,
    CoolantFlood,
    CoolantMist,

    AuxOut(u8),
    AnalogOut(u8),

    // Peripheral and board pins
    SdCardCs,
    SpiCs,
    SpiReset,
    SpiSck,
    SpiMosi,
    SpiMiso,
    I2cSda,
    I2cScl,
    UartTx,
    UartRx,
    Rts,
    Led,
}

impl PinFunction {
    /// Signal group this function belongs to
    pub const fn group(self) -> SignalGroup {
        use PinFunction::*;
        match self {
            LimitMin(_) | LimitMin2(_) => SignalGroup::Limit,
            LimitMax(_) | LimitMax2(_) => SignalGroup::LimitMax,
            Reset | EStop | FeedHold | CycleStart | SafetyDoor | LimitsOverride | BlockDelete
            | StopDisable | SingleBlock => SignalGroup::Control,
            Probe => SignalGroup::Probe,
            MpgSelect => SignalGroup::Mpg,
            I2cStrobe | I2cSda | I2cScl => SignalGroup::I2c,
            SpiIrq | SpiCs | SpiReset | SpiSck | SpiMosi | SpiMiso => SignalGroup::Spi,
            AuxIn(_) => SignalGroup::AuxInput,
            AnalogIn(_) => SignalGroup::AuxInputAnalog,
            Step(..) => SignalGroup::StepperStep,
            Dir(..) => SignalGroup::StepperDir,
            StepperEnable(_) | StepperEnableAll => SignalGroup::StepperEnable,
            SpindleOn | SpindleDir => SignalGroup::SpindleControl,
            SpindlePwm => SignalGroup::SpindlePwm,
            CoolantFlood | CoolantMist => SignalGroup::Coolant,
            AuxOut(_) => SignalGroup::AuxOutput,
            AnalogOut(_) => SignalGroup::AuxOutputAnalog,
            SdCardCs => SignalGroup::SdCard,
            UartTx | UartRx | Rts => SignalGroup::Uart,
            Led => SignalGroup::Led,
        }
    }

    /// Whether the classifier watches this pin
    pub const fn is_input(self) -> bool {
        use PinFunction::*;
        matches!(
            self,
            LimitMin(_)
                | LimitMin2(_)
                | LimitMax(_)
                | LimitMax2(_)
                | Reset
                | EStop
                | FeedHold
                | CycleStart
                | SafetyDoor
                | LimitsOverride
                | BlockDelete
                | StopDisable
                | SingleBlock
                | Probe
                | MpgSelect
                | I2cStrobe
                | SpiIrq
                | AuxIn(_)
                | AnalogIn(_)
        )
    }

    /// Bus pins owned by a peripheral rather than the motion core
    pub const fn is_peripheral(self) -> bool {
        use PinFunction::*;
        matches!(
            self,
            SpiSck | SpiMosi | SpiMiso | I2cSda | I2cScl | UartTx | UartRx
        )
    }

    /// Axis this function refers to, if any
    pub const fn axis(self) -> Option<Axis> {
        use PinFunction::*;
        match self {
            LimitMin(a) | LimitMin2(a) | LimitMax(a) | LimitMax2(a) | StepperEnable(a) => Some(a),
            Step(a, _) | Dir(a, _) => Some(a),
            _ => None,
        }
    }

    /// Control bit reported for this input
    pub const fn control_bit(self) -> super::ControlSignals {
        use super::ControlSignals as C;
        use PinFunction::*;
        match self {
            Reset => C::RESET,
            EStop => C::E_STOP,
            FeedHold => C::FEED_HOLD,
            CycleStart => C::CYCLE_START,
            SafetyDoor => C::SAFETY_DOOR_AJAR,
            LimitsOverride => C::LIMITS_OVERRIDE,
            BlockDelete => C::BLOCK_DELETE,
            StopDisable => C::STOP_DISABLE,
            SingleBlock => C::SINGLE_BLOCK,
            _ => C::NONE,
        }
    }
}

impl fmt::Display for PinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PinFunction::*;
        let motor = |m: &Motor| if *m == Motor::Secondary { "2" } else { "" };
        match self {
            LimitMin(a) => write!(f, "{} limit min", a.letter()),
            LimitMin2(a) => write!(f, "{}2 limit min", a.letter()),
            LimitMax(a) => write!(f, "{} limit max", a.letter()),
            LimitMax2(a) => write!(f, "{}2 limit max", a.letter()),
            Reset => f.write_str("Reset"),
            EStop => f.write_str("E-stop"),
            FeedHold => f.write_str("Feed hold"),
            CycleStart => f.write_str("Cycle start"),
            SafetyDoor => f.write_str("Safety door"),
            LimitsOverride => f.write_str("Limits override"),
            BlockDelete => f.write_str("Block delete"),
            StopDisable => f.write_str("Optional stop disable"),
            SingleBlock => f.write_str("Single block"),
            Probe => f.write_str("Probe"),
            MpgSelect => f.write_str("MPG mode select"),
            I2cStrobe => f.write_str("I2C strobe"),
            SpiIrq => f.write_str("SPI IRQ"),
            AuxIn(n) => write!(f, "Aux in {}", n),
            AnalogIn(n) => write!(f, "Aux analog in {}", n),
            Step(a, m) => write!(f, "{}{} step", a.letter(), motor(m)),
            Dir(a, m) => write!(f, "{}{} dir", a.letter(), motor(m)),
            StepperEnable(a) => write!(f, "{} enable", a.letter()),
            StepperEnableAll => f.write_str("Steppers enable"),
            SpindleOn => f.write_str("Spindle on"),
            SpindleDir => f.write_str("Spindle direction"),
            SpindlePwm => f.write_str("Spindle PWM"),
            CoolantFlood => f.write_str("Flood"),
            CoolantMist => f.write_str("Mist"),
            AuxOut(n) => write!(f, "Aux out {}", n),
            AnalogOut(n) => write!(f, "Aux analog out {}", n),
            SdCardCs => f.write_str("SD card CS"),
            SpiCs => f.write_str("SPI CS"),
            SpiReset => f.write_str("SPI reset"),
            SpiSck => f.write_str("SPI SCK"),
            SpiMosi => f.write_str("SPI MOSI"),
            SpiMiso => f.write_str("SPI MISO"),
            I2cSda => f.write_str("I2C SDA"),
            I2cScl => f.write_str("I2C SCL"),
            UartTx => f.write_str("UART TX"),
            UartRx => f.write_str("UART RX"),
            Rts => f.write_str("RTS"),
            Led => f.write_str("LED"),
        }
    }
}

/// Classification tag that routes a pin's events and output writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalGroup {
    Limit,
    LimitMax,
    Control,
    Probe,
    SpindleControl,
    SpindlePwm,
    Coolant,
    StepperStep,
    StepperDir,
    StepperEnable,
    AuxInput,
    AuxOutput,
    AuxInputAnalog,
    AuxOutputAnalog,
    I2c,
    Spi,
    Mpg,
    Uart,
    SdCard,
    Led,
}

/// Physical port a pin lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortKind {
    /// Direct GPIO
    #[default]
    Gpio,
    /// Programmable step sequencer (PIO)
    Sequencer,
    /// 8-bit step/dir shift register
    ShiftRegister8,
    /// 16-bit output shift register
    ShiftRegister16,
    /// I2C I/O expander
    Expander,
    /// ADC input or PWM analog output
    Analog,
}

impl PortKind {
    /// Whether inputs on this port can raise pin interrupts
    pub const fn supports_irq(self) -> bool {
        matches!(self, PortKind::Gpio)
    }
}

/// Debounce state of a watched input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchState {
    /// Interrupt enabled, steady state
    #[default]
    Armed,
    /// Interrupt disabled, recheck pending
    Debouncing,
    /// Active level captured, confirm pending
    Latched,
}

/// Input pin descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSignal {
    pub function: PinFunction,
    pub group: SignalGroup,
    pub port: PortKind,
    pub pin: u8,
    /// Port bit mask (`1 << pin`)
    pub bit: u32,
    /// Active level is low
    pub invert: bool,
    pub pull: Pull,
    /// Interrupt trigger the classifier restores when re-arming
    pub irq_mode: IrqMode,
    pub state: WatchState,
    pub description: Option<&'static str>,
}

impl InputSignal {
    pub const fn new(function: PinFunction, port: PortKind, pin: u8) -> Self {
        Self {
            function,
            group: function.group(),
            port,
            pin,
            bit: 1 << pin,
            invert: false,
            pull: Pull::Up,
            irq_mode: IrqMode::None,
            state: WatchState::Armed,
            description: None,
        }
    }

    /// Logical state for a raw electrical level
    pub const fn is_active(&self, level: bool) -> bool {
        level ^ self.invert
    }
}

/// Output pin descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputSignal {
    pub function: PinFunction,
    pub group: SignalGroup,
    pub port: PortKind,
    pub pin: u8,
    pub bit: u32,
    pub description: Option<&'static str>,
}

impl OutputSignal {
    pub const fn new(function: PinFunction, port: PortKind, pin: u8) -> Self {
        Self {
            function,
            group: function.group(),
            port,
            pin,
            bit: 1 << pin,
            description: None,
        }
    }
}

/// Pin claimed by an on-board peripheral (UART, SPI, I2C bus)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriphPin {
    pub function: PinFunction,
    pub group: SignalGroup,
    pub pin: u8,
    pub description: Option<&'static str>,
}

/// One entry of a board pin map, as produced at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardPin {
    pub function: PinFunction,
    pub port: PortKind,
    pub pin: u8,
}

impl BoardPin {
    pub const fn gpio(function: PinFunction, pin: u8) -> Self {
        Self {
            function,
            port: PortKind::Gpio,
            pin,
        }
    }
}

/// Enumeration record for pin listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinInfo {
    pub function: PinFunction,
    pub group: SignalGroup,
    pub port: PortKind,
    pub pin: u8,
    pub is_input: bool,
    pub description: Option<&'static str>,
}
