//! Analog input abstraction

/// ADC channel reader
pub trait AnalogInput {
    /// Read the raw conversion result of the input on GPIO `pin`
    ///
    /// Returns `None` if the pin has no ADC channel or the conversion failed.
    fn read(&mut self, pin: u8) -> Option<u16>;

    /// Full-scale conversion result
    fn full_scale(&self) -> u16 {
        (1 << 12) - 1
    }
}
