//! The `key: value` text format settings are saved in.
//!
//! ```text
//! product: T825
//! control_mode: serial
//! never_sleep: false
//! ...
//! scl_config: kill_switch pullup active_high
//! ...
//! ```

use super::{
    ControlMode, DecayMode, Pin, PinFunc, PinSettings, ScalingDegree, Settings, SoftErrorResponse,
    StepMode, Warnings,
};
use crate::error::{Error, Result};
use crate::product::Product;
use std::str::FromStr;

/// Renders a named code. Codes without a name are written as `unknown(N)` so they cannot be
/// mistaken for a name that happens to be a number, like the step modes.
fn code_name(name: Option<&'static str>, code: u8) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("unknown({})", code),
    }
}

/// Reads back a code written by [`code_name`] for a value without a name.
fn unnamed_code(value: &str) -> Option<u8> {
    value
        .strip_prefix("unknown(")?
        .strip_suffix(')')?
        .parse()
        .ok()
}

fn pin_text(pin: &PinSettings) -> String {
    let mut text = code_name(pin.func.name(), pin.func.0);
    if pin.pullup {
        text.push_str(" pullup");
    }
    if pin.analog {
        text.push_str(" analog");
    }
    if pin.polarity {
        text.push_str(" active_high");
    }
    text
}

impl Settings {
    /// Renders the settings as a text document with one `key: value` line per setting.
    ///
    /// [`Settings::from_text`] reads the result back into an identical record.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let p = self.product;
        let mut line = |key: &str, value: &dyn std::fmt::Display| {
            out.push_str(&format!("{}: {}\n", key, value));
        };

        line("product", &p.name());
        line(
            "control_mode",
            &code_name(self.control_mode.name(), self.control_mode.0),
        );
        line("never_sleep", &self.never_sleep);
        line("disable_safe_start", &self.disable_safe_start);
        line("ignore_err_line_high", &self.ignore_err_line_high);
        line("auto_clear_driver_error", &self.auto_clear_driver_error);
        line(
            "soft_error_response",
            &code_name(self.soft_error_response.name(), self.soft_error_response.0),
        );
        line("soft_error_position", &self.soft_error_position);
        line("serial_baud_rate", &self.serial_baud_rate);
        line("serial_device_number", &self.serial_device_number);
        line("i2c_device_address", &self.i2c_device_address);
        line("command_timeout", &self.command_timeout);
        line("serial_crc_enabled", &self.serial_crc_enabled);
        line("low_vin_timeout", &self.low_vin_timeout);
        line("low_vin_shutoff_voltage", &self.low_vin_shutoff_voltage);
        line("low_vin_startup_voltage", &self.low_vin_startup_voltage);
        line("high_vin_shutoff_voltage", &self.high_vin_shutoff_voltage);
        line("vin_calibration", &self.vin_calibration);
        line("rc_max_pulse_period", &self.rc_max_pulse_period);
        line("rc_bad_signal_timeout", &self.rc_bad_signal_timeout);
        line(
            "rc_consecutive_good_pulses",
            &self.rc_consecutive_good_pulses,
        );
        line("input_averaging_enabled", &self.input_averaging_enabled);
        line("input_hysteresis", &self.input_hysteresis);
        line("input_error_min", &self.input_error_min);
        line("input_error_max", &self.input_error_max);
        line(
            "input_scaling_degree",
            &code_name(self.input_scaling_degree.name(), self.input_scaling_degree.0),
        );
        line("input_invert", &self.input_invert);
        line("input_min", &self.input_min);
        line("input_neutral_min", &self.input_neutral_min);
        line("input_neutral_max", &self.input_neutral_max);
        line("input_max", &self.input_max);
        line("output_min", &self.output_min);
        line("output_max", &self.output_max);
        line("encoder_prescaler", &self.encoder_prescaler);
        line("encoder_postscaler", &self.encoder_postscaler);
        line("encoder_unlimited", &self.encoder_unlimited);
        for pin in Pin::ALL.iter() {
            line(
                &format!("{}_config", pin.name()),
                &pin_text(self.pin(*pin)),
            );
        }
        line("current_limit", &self.current_limit);
        match self.current_limit_during_error {
            Some(milliamps) => line("current_limit_during_error", &milliamps),
            None => line("current_limit_during_error", &-1),
        }
        line(
            "step_mode",
            &code_name(self.step_mode.name(), self.step_mode.0),
        );
        line(
            "decay_mode",
            &code_name(self.decay_mode.name(p), self.decay_mode.0),
        );
        line("starting_speed", &self.starting_speed);
        line("max_speed", &self.max_speed);
        line("max_decel", &self.max_decel);
        line("max_accel", &self.max_accel);
        line("invert_motor_direction", &self.invert_motor_direction);

        out
    }

    /// Reads a document written by [`Settings::to_text`].
    ///
    /// Keys may appear in any order; settings that are not mentioned keep the product's
    /// defaults. Unknown keys are skipped with a warning. The result is not fixed.
    pub fn from_text(text: &str) -> Result<(Settings, Warnings)> {
        let mut entries = Vec::new();
        let mut product = None;

        for (i, raw) in text.lines().enumerate() {
            let number = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = match trimmed.find(':') {
                Some(colon) => (trimmed[..colon].trim(), trimmed[colon + 1..].trim()),
                None => return Err(text_error(number, "Expected a line of the form \"key: value\".")),
            };
            if key == "product" {
                product = Some(
                    Product::from_name(value)
                        .ok_or_else(|| text_error(number, format!("Unknown product \"{}\".", value)))?,
                );
            } else {
                entries.push(Entry { number, key, value });
            }
        }

        let product = product.ok_or_else(|| text_error(1, "The product was not specified."))?;
        let mut settings = Settings::new(product);
        let mut warnings = Warnings::new();
        for entry in entries {
            if !settings.apply(&entry)? {
                warnings.push(format!(
                    "Warning: Unrecognized setting \"{}\" on line {} will be ignored.",
                    entry.key, entry.number
                ));
            }
        }
        Ok((settings, warnings))
    }

    /// Applies one line to the record. Returns `false` for unknown keys.
    fn apply(&mut self, e: &Entry<'_>) -> Result<bool> {
        let p = self.product;
        match e.key {
            "control_mode" => self.control_mode = ControlMode(e.code(ControlMode::from_name(e.value).map(|c| c.0))?),
            "never_sleep" => self.never_sleep = e.boolean()?,
            "disable_safe_start" => self.disable_safe_start = e.boolean()?,
            "ignore_err_line_high" => self.ignore_err_line_high = e.boolean()?,
            "auto_clear_driver_error" => self.auto_clear_driver_error = e.boolean()?,
            "soft_error_response" => {
                self.soft_error_response =
                    SoftErrorResponse(e.code(SoftErrorResponse::from_name(e.value).map(|c| c.0))?)
            }
            "soft_error_position" => self.soft_error_position = e.number()?,
            "serial_baud_rate" => self.serial_baud_rate = e.number()?,
            "serial_device_number" => self.serial_device_number = e.number()?,
            "i2c_device_address" => self.i2c_device_address = e.number()?,
            "command_timeout" => self.command_timeout = e.number()?,
            "serial_crc_enabled" => self.serial_crc_enabled = e.boolean()?,
            "low_vin_timeout" => self.low_vin_timeout = e.number()?,
            "low_vin_shutoff_voltage" => self.low_vin_shutoff_voltage = e.number()?,
            "low_vin_startup_voltage" => self.low_vin_startup_voltage = e.number()?,
            "high_vin_shutoff_voltage" => self.high_vin_shutoff_voltage = e.number()?,
            "vin_calibration" => self.vin_calibration = e.number()?,
            "rc_max_pulse_period" => self.rc_max_pulse_period = e.number()?,
            "rc_bad_signal_timeout" => self.rc_bad_signal_timeout = e.number()?,
            "rc_consecutive_good_pulses" => self.rc_consecutive_good_pulses = e.number()?,
            "input_averaging_enabled" => self.input_averaging_enabled = e.boolean()?,
            "input_hysteresis" => self.input_hysteresis = e.number()?,
            "input_error_min" => self.input_error_min = e.number()?,
            "input_error_max" => self.input_error_max = e.number()?,
            "input_scaling_degree" => {
                self.input_scaling_degree =
                    ScalingDegree(e.code(ScalingDegree::from_name(e.value).map(|c| c.0))?)
            }
            "input_invert" => self.input_invert = e.boolean()?,
            "input_min" => self.input_min = e.number()?,
            "input_neutral_min" => self.input_neutral_min = e.number()?,
            "input_neutral_max" => self.input_neutral_max = e.number()?,
            "input_max" => self.input_max = e.number()?,
            "output_min" => self.output_min = e.number()?,
            "output_max" => self.output_max = e.number()?,
            "encoder_prescaler" => self.encoder_prescaler = e.number()?,
            "encoder_postscaler" => self.encoder_postscaler = e.number()?,
            "encoder_unlimited" => self.encoder_unlimited = e.boolean()?,
            "current_limit" => self.current_limit = e.number()?,
            "current_limit_during_error" => {
                self.current_limit_during_error = match e.value {
                    "-1" => None,
                    _ => Some(e.number()?),
                }
            }
            "step_mode" => self.step_mode = StepMode(e.code(StepMode::from_name(e.value).map(|c| c.0))?),
            "decay_mode" => {
                self.decay_mode = DecayMode(e.code(DecayMode::from_name(p, e.value).map(|c| c.0))?)
            }
            "starting_speed" => self.starting_speed = e.number()?,
            "max_speed" => self.max_speed = e.number()?,
            "max_decel" => self.max_decel = e.number()?,
            "max_accel" => self.max_accel = e.number()?,
            "invert_motor_direction" => self.invert_motor_direction = e.boolean()?,
            key => match Pin::ALL
                .iter()
                .find(|pin| key.strip_suffix("_config") == Some(pin.name()))
            {
                Some(pin) => *self.pin_mut(*pin) = e.pin()?,
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}

/// A `key: value` line of a settings document.
struct Entry<'a> {
    number: usize,
    key: &'a str,
    value: &'a str,
}

impl Entry<'_> {
    fn invalid(&self) -> Error {
        text_error(
            self.number,
            format!("Invalid value for {}: \"{}\".", self.key, self.value),
        )
    }

    fn boolean(&self) -> Result<bool> {
        match self.value {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid()),
        }
    }

    fn number<T: FromStr>(&self) -> Result<T> {
        self.value.parse().map_err(|_| self.invalid())
    }

    /// Resolves an enumerated value that was either found by name or written as
    /// `unknown(N)`.
    fn code(&self, by_name: Option<u8>) -> Result<u8> {
        by_name
            .or_else(|| unnamed_code(self.value))
            .ok_or_else(|| self.invalid())
    }

    fn pin(&self) -> Result<PinSettings> {
        let mut words = self.value.split_whitespace();
        let func = words.next().ok_or_else(|| self.invalid())?;
        let mut pin = PinSettings {
            func: PinFunc::from_name(func)
                .or_else(|| unnamed_code(func).map(PinFunc))
                .ok_or_else(|| self.invalid())?,
            ..PinSettings::default()
        };
        for word in words {
            match word {
                "pullup" => pin.pullup = true,
                "analog" => pin.analog = true,
                "active_high" => pin.polarity = true,
                _ => {
                    return Err(text_error(
                        self.number,
                        format!("Unknown pin flag \"{}\" for {}.", word, self.key),
                    ))
                }
            }
        }
        Ok(pin)
    }
}

fn text_error(line: usize, message: impl Into<String>) -> Error {
    Error::Text {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document() {
        let text = Settings::new(Product::T825).to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "product: T825");
        assert_eq!(lines[1], "control_mode: serial");
        assert!(lines.contains(&"soft_error_response: decel_to_hold"));
        assert!(lines.contains(&"serial_baud_rate: 9600"));
        assert!(lines.contains(&"scl_config: default"));
        assert!(lines.contains(&"current_limit_during_error: -1"));
        assert!(lines.contains(&"step_mode: 1"));
        assert!(lines.contains(&"decay_mode: mixed"));
        assert!(lines.iter().all(|l| l.contains(": ")));
    }

    #[test]
    fn pin_lines() {
        let mut s = Settings::new(Product::T825);
        *s.pin_mut(Pin::Rx) = PinSettings {
            func: PinFunc::KILL_SWITCH,
            pullup: true,
            analog: true,
            polarity: true,
        };
        s.pin_mut(Pin::Scl).polarity = true;
        let text = s.to_text();
        assert!(text.contains("\nrx_config: kill_switch pullup analog active_high\n"));
        assert!(text.contains("\nscl_config: default active_high\n"));
    }

    #[test]
    fn round_trip() {
        let mut s = Settings::new(Product::T834);
        s.control_mode = ControlMode::RC_SPEED;
        s.decay_mode = DecayMode::from_name(Product::T834, "mixed50").unwrap();
        s.step_mode = StepMode::MICROSTEP8;
        s.vin_calibration = -12;
        s.output_min = -5000;
        s.current_limit = 1024;
        s.current_limit_during_error = Some(640);
        s.pin_mut(Pin::Tx).func = PinFunc::LIMIT_SWITCH_FORWARD;
        s.pin_mut(Pin::Tx).polarity = true;
        s.fix();

        let (read, warnings) = Settings::from_text(&s.to_text()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(read, s);
    }

    #[test]
    fn unfixed_codes_survive() {
        let mut s = Settings::new(Product::T500);
        s.control_mode = ControlMode(42);
        s.decay_mode = DecayMode(3);
        s.pin_mut(Pin::Rc).func = PinFunc(15);
        let text = s.to_text();
        assert!(text.contains("\ncontrol_mode: unknown(42)\n"));
        assert!(text.contains("\nrc_config: unknown(15)\n"));
        let (read, warnings) = Settings::from_text(&text).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(read, s);
    }

    #[test]
    fn unnamed_step_modes_are_not_read_as_named_ones() {
        let mut s = Settings::new(Product::T825);
        s.step_mode = StepMode(16);
        let text = s.to_text();
        assert!(text.contains("\nstep_mode: unknown(16)\n"));
        let (read, _) = Settings::from_text(&text).unwrap();
        assert_eq!(read.step_mode, StepMode(16));
        assert_ne!(read.step_mode, StepMode::MICROSTEP16);
    }

    #[test]
    fn partial_documents_use_defaults() {
        let text = "# saved by hand\nproduct: T500\n\nmax_speed: 1234\n";
        let (s, warnings) = Settings::from_text(text).unwrap();
        assert!(warnings.is_empty());
        let mut expected = Settings::new(Product::T500);
        expected.max_speed = 1234;
        assert_eq!(s, expected);
    }

    #[test]
    fn unknown_keys_are_warnings() {
        let (_, warnings) = Settings::from_text("product: T825\nspeed_min: 3\n").unwrap();
        assert_eq!(
            warnings.iter().collect::<Vec<_>>(),
            ["Warning: Unrecognized setting \"speed_min\" on line 2 will be ignored."]
        );
    }

    #[test]
    fn malformed_documents() {
        let cases = [
            ("control_mode: serial\n", 1),
            ("product: T825\nnever_sleep yes\n", 2),
            ("product: T825\nnever_sleep: yes\n", 2),
            ("product: T825\nserial_device_number: 300\n", 2),
            ("product: T825\nvin_calibration: 0x10\n", 2),
            ("product: T825\ntx_config: serial inverted\n", 2),
            ("product: T825\ntx_config:\n", 2),
            ("product: T825\ncontrol_mode: 42\n", 2),
            ("product: T825\nstep_mode: unknown(300)\n", 2),
            ("product: T825\nrx_config: unknown(\n", 2),
            ("product: T123\n", 1),
        ];
        for (text, expected_line) in cases.iter() {
            match Settings::from_text(text) {
                Err(Error::Text { line, .. }) => assert_eq!(line, *expected_line, "{:?}", text),
                other => panic!("{:?} was accepted: {:?}", text, other.map(|(s, _)| s)),
            }
        }
    }
}
