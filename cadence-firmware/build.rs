//! Build script for cadence-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time
//! - Generates the board pin table and the typed PWM/ADC pin setup

use std::collections::BTreeMap;
use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const AXES: [(&str, &str); 6] = [
    ("x", "X"),
    ("y", "Y"),
    ("z", "Z"),
    ("a", "A"),
    ("b", "B"),
    ("c", "C"),
];

const NUM_GPIO: i64 = 30;
const SEQUENCER_PINS: i64 = 6;
const AUX_PORTS: u8 = 8;
const ANALOG_PORTS: u8 = 4;

fn main() {
    setup_linker();
    let board = validate_board();
    generate_board(&board);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// What a pin name binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Input,
    AnalogIn,
    Step,
    Dir,
    SpindlePwm,
    AnalogOut,
    Output,
    Periph,
}

#[derive(Debug, Clone)]
struct Function {
    kind: Kind,
    /// Rust expression for the `PinFunction`
    expr: String,
    /// (axis, secondary) for step/dir outputs
    motor: Option<(&'static str, bool)>,
    /// Port number for aux/analog functions
    port: Option<u8>,
}

impl Function {
    fn new(kind: Kind, expr: impl Into<String>) -> Self {
        Self {
            kind,
            expr: expr.into(),
            motor: None,
            port: None,
        }
    }
}

#[derive(Debug)]
struct Pin {
    name: String,
    function: Function,
    port: String,
    pin: i64,
}

struct Board {
    name: String,
    pins: Vec<Pin>,
}

fn parse_function(name: &str) -> Option<Function> {
    let fixed = match name {
        "reset" => Some((Kind::Input, "Reset")),
        "estop" => Some((Kind::Input, "EStop")),
        "feed_hold" => Some((Kind::Input, "FeedHold")),
        "cycle_start" => Some((Kind::Input, "CycleStart")),
        "safety_door" => Some((Kind::Input, "SafetyDoor")),
        "limits_override" => Some((Kind::Input, "LimitsOverride")),
        "block_delete" => Some((Kind::Input, "BlockDelete")),
        "stop_disable" => Some((Kind::Input, "StopDisable")),
        "single_block" => Some((Kind::Input, "SingleBlock")),
        "probe" => Some((Kind::Input, "Probe")),
        "mpg_select" => Some((Kind::Input, "MpgSelect")),
        "i2c_strobe" => Some((Kind::Input, "I2cStrobe")),
        "spi_irq" => Some((Kind::Input, "SpiIrq")),
        "enable" => Some((Kind::Output, "StepperEnableAll")),
        "spindle_on" => Some((Kind::Output, "SpindleOn")),
        "spindle_dir" => Some((Kind::Output, "SpindleDir")),
        "spindle_pwm" => Some((Kind::SpindlePwm, "SpindlePwm")),
        "coolant_flood" => Some((Kind::Output, "CoolantFlood")),
        "coolant_mist" => Some((Kind::Output, "CoolantMist")),
        "sd_cs" => Some((Kind::Periph, "SdCardCs")),
        "spi_cs" => Some((Kind::Periph, "SpiCs")),
        "spi_reset" => Some((Kind::Periph, "SpiReset")),
        "spi_sck" => Some((Kind::Periph, "SpiSck")),
        "spi_mosi" => Some((Kind::Periph, "SpiMosi")),
        "spi_miso" => Some((Kind::Periph, "SpiMiso")),
        "i2c_sda" => Some((Kind::Periph, "I2cSda")),
        "i2c_scl" => Some((Kind::Periph, "I2cScl")),
        "uart_tx" => Some((Kind::Periph, "UartTx")),
        "uart_rx" => Some((Kind::Periph, "UartRx")),
        "rts" => Some((Kind::Periph, "Rts")),
        "led" => Some((Kind::Periph, "Led")),
        _ => None,
    };
    if let Some((kind, variant)) = fixed {
        return Some(Function::new(kind, format!("PinFunction::{}", variant)));
    }

    for (prefix, kind, variant, count) in [
        ("aux_in", Kind::Input, "AuxIn", AUX_PORTS),
        ("aux_out", Kind::Output, "AuxOut", AUX_PORTS),
        ("analog_in", Kind::AnalogIn, "AnalogIn", ANALOG_PORTS),
        ("analog_out", Kind::AnalogOut, "AnalogOut", ANALOG_PORTS),
    ] {
        if let Some(n) = name.strip_prefix(prefix).and_then(|n| n.parse::<u8>().ok()) {
            if n >= count {
                return None;
            }
            let mut f = Function::new(kind, format!("PinFunction::{}({})", variant, n));
            f.port = Some(n);
            return Some(f);
        }
    }

    for (axis, variant) in AXES {
        let axis_expr = format!("Axis::{}", variant);
        for (prefix, kind, ctor) in [("step", Kind::Step, "Step"), ("dir", Kind::Dir, "Dir")] {
            for (suffix, secondary) in [("", false), ("2", true)] {
                if name == format!("{}_{}{}", prefix, axis, suffix) {
                    let motor = if secondary { "Motor::Secondary" } else { "Motor::Primary" };
                    let mut f = Function::new(
                        kind,
                        format!("PinFunction::{}({}, {})", ctor, axis_expr, motor),
                    );
                    f.motor = Some((variant, secondary));
                    return Some(f);
                }
            }
        }
        if name == format!("enable_{}", axis) {
            return Some(Function::new(
                Kind::Output,
                format!("PinFunction::StepperEnable({})", axis_expr),
            ));
        }
        for (suffix, ctor) in [
            ("", "LimitMin"),
            ("2", "LimitMin2"),
            ("_max", "LimitMax"),
            ("2_max", "LimitMax2"),
        ] {
            if name == format!("limit_{}{}", axis, suffix) {
                return Some(Function::new(
                    Kind::Input,
                    format!("PinFunction::{}({})", ctor, axis_expr),
                ));
            }
        }
    }
    None
}

fn port_expr(port: &str) -> &'static str {
    match port {
        "gpio" => "PortKind::Gpio",
        "sequencer" => "PortKind::Sequencer",
        "sr8" => "PortKind::ShiftRegister8",
        "sr16" => "PortKind::ShiftRegister16",
        "expander" => "PortKind::Expander",
        _ => "PortKind::Analog",
    }
}

/// Pin number space; pins only clash within one space
fn port_space(port: &str) -> &'static str {
    match port {
        "gpio" | "sequencer" | "analog" => "gpio",
        "sr8" => "sr8",
        "sr16" => "sr16",
        _ => "expander",
    }
}

fn port_allowed(kind: Kind, port: &str) -> bool {
    match kind {
        Kind::Input | Kind::Periph | Kind::SpindlePwm => port == "gpio",
        Kind::AnalogIn | Kind::AnalogOut => port == "analog",
        // Only the PIO sequencer backend is wired up by this firmware
        Kind::Step => port == "sequencer",
        Kind::Dir | Kind::Output => port == "gpio",
    }
}

fn pin_range(port: &str) -> i64 {
    match port {
        "sr8" => 8,
        "sr16" | "expander" => 16,
        _ => NUM_GPIO,
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fail(title: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Validate board.toml and collect the pin map
fn validate_board() -> Board {
    println!("cargo:rerun-if-changed=board.toml");

    let path = Path::new("board.toml");
    if !path.exists() {
        fail(
            "board.toml not found",
            &["The firmware needs a board pin map in cadence-firmware/".to_string()],
        );
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&e.to_string())
        ),
    };

    let mut errors = Vec::new();

    let name = match config.get("board").and_then(|b| b.get("name")) {
        Some(toml::Value::String(s)) => s.clone(),
        _ => {
            errors.push("Missing [board] name".to_string());
            String::new()
        }
    };

    let table = match config.get("pins") {
        Some(toml::Value::Table(t)) => t.clone(),
        _ => fail("Missing [pins] section", &["At least one pin is required".to_string()]),
    };

    let mut pins = Vec::new();
    for (key, value) in &table {
        let Some(function) = parse_function(key) else {
            errors.push(format!("[pins] unknown signal '{}'", key));
            continue;
        };
        let port = match value.get("port") {
            Some(toml::Value::String(p))
                if ["gpio", "sequencer", "sr8", "sr16", "expander", "analog"]
                    .contains(&p.as_str()) =>
            {
                p.clone()
            }
            Some(_) => {
                errors.push(format!("[pins] {} has an unknown port", key));
                continue;
            }
            None => {
                errors.push(format!("[pins] {} missing 'port'", key));
                continue;
            }
        };
        let pin = match value.get("pin") {
            Some(toml::Value::Integer(n)) => *n,
            _ => {
                errors.push(format!("[pins] {} missing 'pin'", key));
                continue;
            }
        };
        if !port_allowed(function.kind, &port) {
            errors.push(format!("[pins] {} cannot use port '{}'", key, port));
        }
        if pin < 0 || pin >= pin_range(&port) {
            errors.push(format!("[pins] {} pin {} out of range", key, pin));
        }
        if function.kind == Kind::AnalogIn && !(26..=29).contains(&pin) {
            errors.push(format!("[pins] {} needs an ADC pin (26-29)", key));
        }
        pins.push(Pin {
            name: key.clone(),
            function,
            port,
            pin,
        });
    }

    // Duplicate pins within a number space
    let mut used: BTreeMap<(&str, i64), &str> = BTreeMap::new();
    for p in &pins {
        if let Some(other) = used.insert((port_space(&p.port), p.pin), &p.name) {
            errors.push(format!("{} and {} share pin {}", other, p.name, p.pin));
        }
    }

    // Every step output needs a direction output
    for p in pins.iter().filter(|p| p.function.kind == Kind::Step) {
        let motor = p.function.motor;
        let has_dir = pins
            .iter()
            .any(|d| d.function.kind == Kind::Dir && d.function.motor == motor);
        if !has_dir {
            errors.push(format!("{} has no matching dir output", p.name));
        }
    }

    // Sequencer window
    let seq: Vec<i64> = pins
        .iter()
        .filter(|p| p.port == "sequencer")
        .map(|p| p.pin)
        .collect();
    if let (Some(lo), Some(hi)) = (seq.iter().min(), seq.iter().max()) {
        if hi - lo >= SEQUENCER_PINS {
            errors.push(format!(
                "sequencer step pins span GPIO{}-{}, max {} pins",
                lo, hi, SEQUENCER_PINS
            ));
        }
        // The sequencer owns every pin of its window
        for p in pins.iter().filter(|p| p.port != "sequencer" && port_space(&p.port) == "gpio") {
            if (*lo..=*hi).contains(&p.pin) {
                errors.push(format!("{} sits inside the sequencer window", p.name));
            }
        }
    }

    // One PWM output per slice
    let mut slices: BTreeMap<i64, &str> = BTreeMap::new();
    for p in pins
        .iter()
        .filter(|p| matches!(p.function.kind, Kind::SpindlePwm | Kind::AnalogOut))
    {
        if let Some(other) = slices.insert((p.pin >> 1) & 7, &p.name) {
            errors.push(format!("{} and {} share a PWM slice", other, p.name));
        }
    }

    if !errors.is_empty() {
        fail("Invalid board.toml", &errors);
    }

    println!(
        "cargo:warning=board.toml validated successfully ({} pins)",
        pins.len()
    );
    Board { name, pins }
}

fn pwm_ctor(pin: i64) -> String {
    let slice = (pin >> 1) & 7;
    let (ctor, output) = if pin % 2 == 0 {
        ("new_output_a", "A")
    } else {
        ("new_output_b", "B")
    };
    format!(
        "RpPwm::new(Pwm::{}(p.PWM_SLICE{}, p.PIN_{}, PwmConfig::default()), SliceOutput::{})",
        ctor, slice, pin, output
    )
}

/// Write `board.rs` into OUT_DIR
fn generate_board(board: &Board) {
    let mut code = String::new();
    let _ = writeln!(code, "// Generated from board.toml by build.rs");
    let _ = writeln!(code);
    let _ = writeln!(code, "pub const BOARD_NAME: &str = {:?};", board.name);
    let _ = writeln!(code);
    let _ = writeln!(code, "pub const BOARD_PINS: &[BoardPin] = &[");
    for p in &board.pins {
        let _ = writeln!(
            code,
            "    BoardPin {{ function: {}, port: {}, pin: {} }},",
            p.function.expr,
            port_expr(&p.port),
            p.pin
        );
    }
    let _ = writeln!(code, "];");
    let _ = writeln!(code);

    // Pins that need their concrete type are taken out of the bank
    let mut typed = [false; NUM_GPIO as usize];
    let _ = writeln!(
        code,
        "pub fn split(p: Peripherals) -> (PinBank, BoardPeripherals) {{"
    );
    let _ = writeln!(code, "    let mut spindle_pwm = None;");
    let _ = writeln!(code, "    let mut analog_out = Vec::new();");
    let _ = writeln!(code, "    let mut analog_in = Vec::new();");
    for p in &board.pins {
        match p.function.kind {
            Kind::SpindlePwm => {
                typed[p.pin as usize] = true;
                let _ = writeln!(code, "    spindle_pwm = Some({});", pwm_ctor(p.pin));
            }
            Kind::AnalogOut => {
                typed[p.pin as usize] = true;
                let _ = writeln!(
                    code,
                    "    let _ = analog_out.push(({}, {}));",
                    p.function.port.unwrap_or(0),
                    pwm_ctor(p.pin)
                );
            }
            Kind::AnalogIn => {
                typed[p.pin as usize] = true;
                let _ = writeln!(
                    code,
                    "    let _ = analog_in.push(({}, Channel::new_pin(p.PIN_{}, Pull::None)));",
                    p.pin, p.pin
                );
            }
            _ => {}
        }
    }
    let _ = writeln!(code, "    let bank = PinBank::from_pins([");
    for (n, taken) in typed.iter().enumerate() {
        if *taken {
            let _ = writeln!(code, "        None,");
        } else {
            let _ = writeln!(code, "        Some(p.PIN_{}.into()),", n);
        }
    }
    let _ = writeln!(code, "    ]);");
    let _ = writeln!(code, "    let periph = BoardPeripherals {{");
    let _ = writeln!(code, "        pio0: p.PIO0,");
    let _ = writeln!(code, "        adc: p.ADC,");
    let _ = writeln!(code, "        spindle_pwm,");
    let _ = writeln!(code, "        analog_out,");
    let _ = writeln!(code, "        analog_in,");
    let _ = writeln!(code, "    }};");
    let _ = writeln!(code, "    (bank, periph)");
    let _ = writeln!(code, "}}");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board.rs"), code).unwrap();
}
