use super::current::{achievable_baud_rate, achievable_current_limit, max_current_limit};
use super::current::{MAX_BAUD_RATE, MIN_BAUD_RATE};
use super::{
    ControlMode, DecayMode, Pin, PinFunc, ScalingDegree, Settings, SoftErrorResponse, StepMode,
};
use std::fmt;

const MAX_COMMAND_TIMEOUT: u16 = 60_000;
const MAX_SERIAL_DEVICE_NUMBER: u8 = 127;
const MAX_I2C_DEVICE_ADDRESS: u8 = 127;
const MAX_LOW_VIN_SHUTOFF: u16 = 64_000;
const VIN_MARGIN: u16 = 500;
const MAX_VIN_CALIBRATION: i16 = 500;
const MAX_INPUT: u16 = 4095;
const DEFAULT_INPUT_SCALING: [u16; 4] = [0, 2015, 2080, 4095];
const MAX_ENCODER_SCALER: u32 = 0x7FFF_FFFF;
const MAX_SPEED: u32 = 500_000_000;
const SPEED_UNITS_PER_HZ: u32 = 10_000;
const MIN_ACCEL: u32 = 100;
const MAX_ACCEL: u32 = 0x7FFF_FFFF;

/// Warnings produced while fixing settings, one sentence each.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: impl Into<String>) {
        self.0.push(warning.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub(crate) fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.0 {
            writeln!(f, "{}", warning)?;
        }
        Ok(())
    }
}

impl Settings {
    /// Changes every setting that the firmware would reject or misinterpret into the closest
    /// acceptable value and describes each change.
    ///
    /// Running this on its own output changes nothing and produces no warnings.
    pub fn fix(&mut self) -> Warnings {
        let mut w = Warnings::new();
        self.fix_enums(&mut w);
        self.fix_serial(&mut w);
        self.fix_vin(&mut w);
        self.fix_scaling(&mut w);
        self.fix_encoder(&mut w);
        self.fix_current_limit(&mut w);
        self.fix_motion(&mut w);
        self.fix_pins(&mut w);
        w
    }

    /// Returns a fixed copy and discards the warnings.
    pub fn fixed(&self) -> Settings {
        let mut copy = self.clone();
        copy.fix();
        copy
    }

    fn fix_enums(&mut self, w: &mut Warnings) {
        if !self.control_mode.is_valid() {
            self.control_mode = ControlMode::SERIAL;
            w.push("Warning: The control mode was invalid so it will be changed to serial.");
        }

        if !self.soft_error_response.is_valid() {
            self.soft_error_response = SoftErrorResponse::DECEL_TO_HOLD;
            w.push(
                "Warning: The soft error response was invalid \
                 so it will be changed to decel_to_hold.",
            );
        }

        if !self.input_scaling_degree.is_valid() {
            self.input_scaling_degree = ScalingDegree::LINEAR;
            w.push("Warning: The scaling degree was invalid so it will be changed to linear.");
        }

        if !self.step_mode.is_valid_for(self.product) {
            self.step_mode = StepMode::FULL;
            w.push("Warning: The step mode is invalid so it will be changed to 1 (full step).");
        }

        if !self.decay_mode.is_valid_for(self.product) {
            self.decay_mode = DecayMode::default();
            w.push(format!(
                "Warning: The decay mode is invalid so it will be changed to {}.",
                DecayMode::default()
                    .name(self.product)
                    .unwrap_or("the default")
            ));
        }

        for pin in Pin::ALL.iter() {
            let settings = self.pin_mut(*pin);
            if !settings.func.is_valid() {
                settings.func = PinFunc::DEFAULT;
                w.push(format!(
                    "Warning: The {} pin function was invalid so it will be changed to the default.",
                    pin.label()
                ));
            }
        }

        if self.control_mode.is_speed()
            && self.soft_error_response == SoftErrorResponse::GO_TO_POSITION
        {
            self.soft_error_response = SoftErrorResponse::DECEL_TO_HOLD;
            w.push(
                "Warning: The soft error response cannot be go_to_position in a speed \
                 control mode, so it will be changed to decel_to_hold.",
            );
        }
    }

    fn fix_serial(&mut self, w: &mut Warnings) {
        if self.serial_baud_rate < MIN_BAUD_RATE {
            self.serial_baud_rate = MIN_BAUD_RATE;
            w.push(format!(
                "Warning: The serial baud rate is too low so it will be changed to {}.",
                MIN_BAUD_RATE
            ));
        }
        if self.serial_baud_rate > MAX_BAUD_RATE {
            self.serial_baud_rate = MAX_BAUD_RATE;
            w.push(format!(
                "Warning: The serial baud rate is too high so it will be changed to {}.",
                MAX_BAUD_RATE
            ));
        }
        self.serial_baud_rate = achievable_baud_rate(self.serial_baud_rate);

        if self.serial_device_number > MAX_SERIAL_DEVICE_NUMBER {
            self.serial_device_number = MAX_SERIAL_DEVICE_NUMBER;
            w.push(format!(
                "Warning: The serial device number is too high so it will be changed to {}.",
                MAX_SERIAL_DEVICE_NUMBER
            ));
        }

        if self.i2c_device_address > MAX_I2C_DEVICE_ADDRESS {
            self.i2c_device_address = MAX_I2C_DEVICE_ADDRESS;
            w.push(format!(
                "Warning: The I2C device address is too high so it will be changed to {}.",
                MAX_I2C_DEVICE_ADDRESS
            ));
        }

        if self.command_timeout > MAX_COMMAND_TIMEOUT {
            self.command_timeout = MAX_COMMAND_TIMEOUT;
            w.push(format!(
                "Warning: The command timeout is too high so it will be changed to {} ms.",
                MAX_COMMAND_TIMEOUT
            ));
        }
    }

    fn fix_vin(&mut self, w: &mut Warnings) {
        if self.low_vin_shutoff_voltage > MAX_LOW_VIN_SHUTOFF {
            self.low_vin_shutoff_voltage = MAX_LOW_VIN_SHUTOFF;
            w.push(format!(
                "Warning: The low VIN shutoff voltage will be changed to {} mV.",
                self.low_vin_shutoff_voltage
            ));
        }
        if self.low_vin_startup_voltage < self.low_vin_shutoff_voltage {
            self.low_vin_startup_voltage = self.low_vin_shutoff_voltage + VIN_MARGIN;
            w.push(format!(
                "Warning: The low VIN startup voltage will be changed to {} mV.",
                self.low_vin_startup_voltage
            ));
        }
        if self.high_vin_shutoff_voltage < self.low_vin_startup_voltage {
            self.high_vin_shutoff_voltage = self.low_vin_startup_voltage.saturating_add(VIN_MARGIN);
            w.push(format!(
                "Warning: The high VIN shutoff voltage will be changed to {} mV.",
                self.high_vin_shutoff_voltage
            ));
        }

        if self.vin_calibration < -MAX_VIN_CALIBRATION {
            self.vin_calibration = -MAX_VIN_CALIBRATION;
            w.push("Warning: The VIN calibration was too low so it will be raised to -500.");
        }
        if self.vin_calibration > MAX_VIN_CALIBRATION {
            self.vin_calibration = MAX_VIN_CALIBRATION;
            w.push("Warning: The VIN calibration was too high so it will be lowered to 500.");
        }
    }

    fn fix_scaling(&mut self, w: &mut Warnings) {
        if self.input_min > self.input_neutral_min
            || self.input_neutral_min > self.input_neutral_max
            || self.input_neutral_max > self.input_max
        {
            let [min, neutral_min, neutral_max, max] = DEFAULT_INPUT_SCALING;
            self.input_min = min;
            self.input_neutral_min = neutral_min;
            self.input_neutral_max = neutral_max;
            self.input_max = max;
            w.push(
                "Warning: The input scaling values are out of order \
                 so they will be reset to their default values.",
            );
        }

        let limits = [
            ("input minimum", &mut self.input_min),
            ("input neutral min", &mut self.input_neutral_min),
            ("input neutral max", &mut self.input_neutral_max),
            ("input maximum", &mut self.input_max),
            ("input error minimum", &mut self.input_error_min),
            ("input error maximum", &mut self.input_error_max),
        ];
        for (name, value) in limits {
            if *value > MAX_INPUT {
                *value = MAX_INPUT;
                w.push(format!(
                    "Warning: The {} is too high so it will be lowered to {}.",
                    name, MAX_INPUT
                ));
            }
        }

        if self.output_min > 0 {
            self.output_min = 0;
            w.push("Warning: The scaling output minimum is above 0 so it will be lowered to 0.");
        }
        if self.output_max < 0 {
            self.output_max = 0;
            w.push("Warning: The scaling output maximum is below 0 so it will be raised to 0.");
        }
    }

    fn fix_encoder(&mut self, w: &mut Warnings) {
        let scalers = [
            ("prescaler", &mut self.encoder_prescaler),
            ("postscaler", &mut self.encoder_postscaler),
        ];
        for (name, value) in scalers {
            if *value > MAX_ENCODER_SCALER {
                *value = MAX_ENCODER_SCALER;
                w.push(format!(
                    "Warning: The encoder {} is too high so it will be lowered to {}.",
                    name, MAX_ENCODER_SCALER
                ));
            }
            if *value < 1 {
                *value = 1;
                w.push(format!(
                    "Warning: The encoder {} is zero so it will be changed to 1.",
                    name
                ));
            }
        }
    }

    fn fix_current_limit(&mut self, w: &mut Warnings) {
        let max = max_current_limit(self.product);
        if self.current_limit > max {
            self.current_limit = max;
            w.push(format!(
                "Warning: The current limit is too high so it will be lowered to {} mA.",
                max
            ));
        }
        self.current_limit = achievable_current_limit(self.product, self.current_limit);

        if let Some(during_error) = self.current_limit_during_error {
            if during_error > self.current_limit {
                self.current_limit_during_error = None;
                w.push(
                    "Warning: The current limit during error is higher than the default \
                     current limit so it will be changed to be the same.",
                );
            } else {
                self.current_limit_during_error =
                    Some(achievable_current_limit(self.product, during_error));
            }
        }
    }

    fn fix_motion(&mut self, w: &mut Warnings) {
        if self.max_speed > MAX_SPEED {
            self.max_speed = MAX_SPEED;
            w.push(format!(
                "Warning: The maximum speed is too high so it will be lowered to {} ({} kHz).",
                MAX_SPEED,
                MAX_SPEED / SPEED_UNITS_PER_HZ / 1000
            ));
        }
        if self.starting_speed > self.max_speed {
            self.starting_speed = self.max_speed;
            w.push(format!(
                "Warning: The starting speed is greater than the maximum speed \
                 so it will be lowered to {}.",
                self.starting_speed
            ));
        }

        if self.max_decel > MAX_ACCEL {
            self.max_decel = MAX_ACCEL;
            w.push(format!(
                "Warning: The maximum deceleration is too high so it will be lowered to {}.",
                MAX_ACCEL
            ));
        }
        if self.max_decel != 0 && self.max_decel < MIN_ACCEL {
            self.max_decel = MIN_ACCEL;
            w.push(format!(
                "Warning: The maximum deceleration is too low so it will be raised to {}.",
                MIN_ACCEL
            ));
        }

        if self.max_accel > MAX_ACCEL {
            self.max_accel = MAX_ACCEL;
            w.push(format!(
                "Warning: The maximum acceleration is too high so it will be lowered to {}.",
                MAX_ACCEL
            ));
        }
        if self.max_accel < MIN_ACCEL {
            self.max_accel = MIN_ACCEL;
            w.push(format!(
                "Warning: The maximum acceleration is too low so it will be raised to {}.",
                MIN_ACCEL
            ));
        }
    }

    fn fix_pins(&mut self, w: &mut Warnings) {
        let mode = self.control_mode;

        // The pins carrying the primary input go first; the capability checks below must not
        // undo them.
        const ANALOG: &[(Pin, PinFunc, &str)] =
            &[(Pin::Sda, PinFunc::USER_INPUT, "an analog input")];
        const RC: &[(Pin, PinFunc, &str)] = &[(Pin::Rc, PinFunc::RC, "an RC input")];
        const ENCODER: &[(Pin, PinFunc, &str)] = &[
            (Pin::Tx, PinFunc::ENCODER, "an encoder input"),
            (Pin::Rx, PinFunc::ENCODER, "an encoder input"),
        ];
        let primary = if mode.is_analog() {
            ANALOG
        } else if mode.is_rc() {
            RC
        } else if mode.is_encoder() {
            ENCODER
        } else {
            &[]
        };
        for (pin, allowed, role) in primary {
            let func = &mut self.pins[*pin as usize].func;
            if *func != PinFunc::DEFAULT && *func != *allowed {
                *func = PinFunc::DEFAULT;
                w.push(format!(
                    "Warning: The {} pin must be used as {} \
                     so its function will be changed to the default.",
                    pin.label(),
                    role
                ));
            }
        }

        const IMPOSSIBLE: &[(Pin, PinFunc, &str)] = &[
            (Pin::Rc, PinFunc::USER_IO, "a user I/O pin"),
            (Pin::Sda, PinFunc::POT_POWER, "a potentiometer power pin"),
            (Pin::Tx, PinFunc::POT_POWER, "a potentiometer power pin"),
            (Pin::Rx, PinFunc::POT_POWER, "a potentiometer power pin"),
            (Pin::Rc, PinFunc::POT_POWER, "a potentiometer power pin"),
            (Pin::Rc, PinFunc::SERIAL, "a serial pin"),
            (Pin::Sda, PinFunc::RC, "an RC input"),
            (Pin::Scl, PinFunc::RC, "an RC input"),
            (Pin::Tx, PinFunc::RC, "an RC input"),
            (Pin::Rx, PinFunc::RC, "an RC input"),
            (Pin::Scl, PinFunc::ENCODER, "an encoder input"),
            (Pin::Sda, PinFunc::ENCODER, "an encoder input"),
            (Pin::Rc, PinFunc::ENCODER, "an encoder input"),
        ];
        for (pin, func, role) in IMPOSSIBLE {
            let settings = &mut self.pins[*pin as usize];
            if settings.func == *func {
                settings.func = PinFunc::DEFAULT;
                w.push(format!(
                    "Warning: The {} pin cannot be used as {} \
                     so its function will be changed to the default.",
                    pin.label(),
                    role
                ));
            }
        }

        if self.pin(Pin::Rc).analog {
            self.pin_mut(Pin::Rc).analog = false;
            w.push(
                "Warning: The RC pin cannot be an analog input so that feature will be disabled.",
            );
        }

        // Runs last because the checks above may leave SCL or SDA at their I2C default.
        let is_i2c = |func: PinFunc| {
            (func == PinFunc::DEFAULT && !mode.is_analog()) || func == PinFunc::SERIAL
        };
        let scl_is_i2c = is_i2c(self.pin(Pin::Scl).func);
        let sda_is_i2c = is_i2c(self.pin(Pin::Sda).func);
        if scl_is_i2c != sda_is_i2c {
            self.pin_mut(Pin::Scl).func = PinFunc::DEFAULT;
            self.pin_mut(Pin::Sda).func = PinFunc::DEFAULT;
            let (follower, leader) = if sda_is_i2c {
                ("SCL", "SDA")
            } else {
                ("SDA", "SCL")
            };
            w.push(format!(
                "Warning: The {} pin must be used for I2C if the {} pin is, \
                 so the SCL and SDA pin functions will be changed to the default.",
                follower, leader
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;

    fn messages(w: &Warnings) -> Vec<&str> {
        w.iter().collect()
    }

    fn assert_idempotent(s: &Settings) {
        let mut again = s.clone();
        assert!(again.fix().is_empty(), "second fix produced warnings");
        assert_eq!(&again, s);
    }

    #[test]
    fn defaults_are_already_fixed() {
        for product in Product::all() {
            let mut s = Settings::new(product);
            assert!(s.fix().is_empty(), "{}", product);
            assert_eq!(s, Settings::new(product));
        }
    }

    #[test]
    fn invalid_enums_are_reset() {
        let mut s = Settings::new(Product::T500);
        s.control_mode = ControlMode(9);
        s.soft_error_response = SoftErrorResponse(7);
        s.input_scaling_degree = ScalingDegree(3);
        s.step_mode = StepMode::MICROSTEP16;
        s.decay_mode = DecayMode(2);
        s.pin_mut(Pin::Tx).func = PinFunc(12);
        let w = s.fix();
        assert_eq!(w.len(), 6);
        assert_eq!(s.control_mode, ControlMode::SERIAL);
        assert_eq!(s.soft_error_response, SoftErrorResponse::DECEL_TO_HOLD);
        assert_eq!(s.input_scaling_degree, ScalingDegree::LINEAR);
        assert_eq!(s.step_mode, StepMode::FULL);
        assert_eq!(s.decay_mode, DecayMode(0));
        assert_eq!(s.pin(Pin::Tx).func, PinFunc::DEFAULT);
        assert_eq!(
            messages(&w)[4],
            "Warning: The decay mode is invalid so it will be changed to auto."
        );
        assert_idempotent(&s);
    }

    #[test]
    fn go_to_position_needs_a_position_mode() {
        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::ANALOG_SPEED;
        s.soft_error_response = SoftErrorResponse::GO_TO_POSITION;
        s.pin_mut(Pin::Scl).func = PinFunc::USER_IO;
        let w = s.fix();
        assert_eq!(w.len(), 1);
        assert_eq!(s.soft_error_response, SoftErrorResponse::DECEL_TO_HOLD);

        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::RC_POSITION;
        s.soft_error_response = SoftErrorResponse::GO_TO_POSITION;
        assert!(s.fix().is_empty());
    }

    #[test]
    fn baud_rate_is_clamped_and_made_achievable() {
        let mut s = Settings::new(Product::T825);
        s.serial_baud_rate = 101;
        assert_eq!(
            messages(&s.fix()),
            ["Warning: The serial baud rate is too low so it will be changed to 200."]
        );
        assert_eq!(s.serial_baud_rate, 200);

        s.serial_baud_rate = 115_200;
        assert!(s.fix().is_empty());
        assert_eq!(s.serial_baud_rate, 115_385);

        s.serial_baud_rate = 1_000_000;
        assert_eq!(s.fix().len(), 1);
        assert_eq!(s.serial_baud_rate, MAX_BAUD_RATE);
    }

    #[test]
    fn vin_thresholds_are_pushed_up() {
        let mut s = Settings::new(Product::T825);
        s.low_vin_shutoff_voltage = 65_000;
        s.low_vin_startup_voltage = 1000;
        s.high_vin_shutoff_voltage = 2000;
        let w = s.fix();
        assert_eq!(
            messages(&w),
            [
                "Warning: The low VIN shutoff voltage will be changed to 64000 mV.",
                "Warning: The low VIN startup voltage will be changed to 64500 mV.",
                "Warning: The high VIN shutoff voltage will be changed to 65000 mV.",
            ]
        );
        assert_idempotent(&s);
    }

    #[test]
    fn out_of_order_scaling_resets_all_four() {
        let mut s = Settings::new(Product::T825);
        s.input_min = 100;
        s.input_neutral_min = 3000;
        s.input_neutral_max = 2000;
        s.input_max = 3500;
        let w = s.fix();
        assert_eq!(w.len(), 1);
        assert_eq!(
            [s.input_min, s.input_neutral_min, s.input_neutral_max, s.input_max],
            DEFAULT_INPUT_SCALING
        );

        s.input_neutral_max = 5000;
        s.input_max = 5000;
        assert_eq!(s.fix().len(), 2);
        assert_eq!(s.input_max, 4095);
        assert_eq!(s.input_neutral_max, 4095);
    }

    #[test]
    fn output_bounds_straddle_zero() {
        let mut s = Settings::new(Product::T825);
        s.output_min = 5;
        s.output_max = -5;
        assert_eq!(s.fix().len(), 2);
        assert_eq!((s.output_min, s.output_max), (0, 0));
    }

    #[test]
    fn encoder_scalers() {
        let mut s = Settings::new(Product::T825);
        s.encoder_prescaler = 0;
        s.encoder_postscaler = u32::MAX;
        let w = s.fix();
        assert_eq!(w.len(), 2);
        assert_eq!(s.encoder_prescaler, 1);
        assert_eq!(s.encoder_postscaler, MAX_ENCODER_SCALER);
    }

    #[test]
    fn current_limits() {
        let mut s = Settings::new(Product::T825);
        s.current_limit = 5000;
        s.current_limit_during_error = Some(2100);
        let w = s.fix();
        assert_eq!(
            messages(&w),
            ["Warning: The current limit is too high so it will be lowered to 3968 mA."]
        );
        assert_eq!(s.current_limit, 3968);
        assert_eq!(s.current_limit_during_error, Some(2048));

        s.current_limit = 1000;
        s.current_limit_during_error = Some(1200);
        assert_eq!(s.fix().len(), 1);
        assert_eq!(s.current_limit, 992);
        assert_eq!(s.current_limit_during_error, None);
        assert_idempotent(&s);
    }

    #[test]
    fn same_current_during_error_is_left_alone() {
        let mut s = Settings::new(Product::T825);
        s.current_limit = 0;
        s.current_limit_during_error = None;
        assert!(s.fix().is_empty());
        assert_eq!(s.current_limit_during_error, None);
    }

    #[test]
    fn speeds_and_accelerations() {
        let mut s = Settings::new(Product::T825);
        s.max_speed = 600_000_000;
        s.starting_speed = 550_000_000;
        s.max_decel = 50;
        s.max_accel = 0;
        let w = s.fix();
        assert_eq!(
            messages(&w)[0],
            "Warning: The maximum speed is too high so it will be lowered to 500000000 (50 kHz)."
        );
        assert_eq!(w.len(), 4);
        assert_eq!(s.starting_speed, 500_000_000);
        assert_eq!(s.max_decel, MIN_ACCEL);
        assert_eq!(s.max_accel, MIN_ACCEL);

        s.max_decel = 0;
        assert!(s.fix().is_empty());
    }

    #[test]
    fn analog_pin_cannot_be_rc() {
        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::ANALOG_POSITION;
        s.pin_mut(Pin::Sda).func = PinFunc::RC;
        let w = s.fix();
        assert_eq!(w.len(), 1);
        let warning = messages(&w)[0];
        assert!(warning.contains("SDA"), "{}", warning);
        assert_eq!(s.pin(Pin::Sda).func, PinFunc::DEFAULT);
        assert_idempotent(&s);
    }

    #[test]
    fn primary_input_wins_over_pin_capabilities() {
        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::ENCODER_SPEED;
        s.pin_mut(Pin::Tx).func = PinFunc::POT_POWER;
        s.pin_mut(Pin::Rx).func = PinFunc::ENCODER;
        let w = s.fix();
        assert_eq!(
            messages(&w),
            [
                "Warning: The TX pin must be used as an encoder input \
                 so its function will be changed to the default."
            ]
        );
        assert_eq!(s.pin(Pin::Rx).func, PinFunc::ENCODER);
    }

    #[test]
    fn impossible_pin_functions() {
        let mut s = Settings::new(Product::T825);
        s.pin_mut(Pin::Rc).func = PinFunc::USER_IO;
        s.pin_mut(Pin::Rc).analog = true;
        s.pin_mut(Pin::Tx).func = PinFunc::RC;
        let w = s.fix();
        assert_eq!(w.len(), 3);
        assert_eq!(s.pin(Pin::Rc).func, PinFunc::DEFAULT);
        assert!(!s.pin(Pin::Rc).analog);
        assert_eq!(s.pin(Pin::Tx).func, PinFunc::DEFAULT);
        assert_idempotent(&s);
    }

    #[test]
    fn i2c_pins_come_in_pairs() {
        let mut s = Settings::new(Product::T825);
        s.pin_mut(Pin::Scl).func = PinFunc::USER_IO;
        let w = s.fix();
        assert_eq!(
            messages(&w),
            [
                "Warning: The SCL pin must be used for I2C if the SDA pin is, \
                 so the SCL and SDA pin functions will be changed to the default."
            ]
        );
        assert_eq!(s.pin(Pin::Scl).func, PinFunc::DEFAULT);

        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::ANALOG_SPEED;
        s.pin_mut(Pin::Scl).func = PinFunc::SERIAL;
        let w = s.fix();
        assert!(messages(&w)[0].starts_with("Warning: The SDA pin must be used for I2C"));
        assert_eq!(s.pin(Pin::Scl).func, PinFunc::DEFAULT);
        assert_idempotent(&s);

        let mut s = Settings::new(Product::T825);
        s.control_mode = ControlMode::ANALOG_SPEED;
        s.pin_mut(Pin::Scl).func = PinFunc::SERIAL;
        s.pin_mut(Pin::Sda).func = PinFunc::SERIAL;
        let w = s.fix();
        assert_eq!(w.len(), 2, "{}", w);
        assert!(messages(&w)[0].starts_with("Warning: The SDA pin must be used as an analog"));
        assert!(messages(&w)[1].starts_with("Warning: The SDA pin must be used for I2C"));
        assert_eq!(s.pin(Pin::Scl).func, PinFunc::DEFAULT);
    }

    #[test]
    fn warnings_render_one_per_line() {
        let mut s = Settings::new(Product::T825);
        s.output_min = 1;
        s.output_max = -1;
        assert_eq!(
            s.fix().to_string(),
            "Warning: The scaling output minimum is above 0 so it will be lowered to 0.\n\
             Warning: The scaling output maximum is below 0 so it will be raised to 0.\n"
        );
    }
}
