//! The settings record stored in a Tic's non-volatile memory, and everything that operates on it.
//!
//! A [`Settings`] value is plain data. It can be read from or written to the device's byte image
//! with [`decode`] and [`encode`], normalized with [`Settings::fix`], and turned into a text
//! document with [`Settings::to_text`] and back with [`Settings::from_text`].
//!
//! Enumerated fields are newtypes around the code stored on the device, so values read from a
//! device with newer firmware (or a corrupted EEPROM) survive until the fixer replaces them.
//!
//! ```rust
//! use tic_usb::settings::{ControlMode, Pin, PinFunc, Settings};
//! use tic_usb::Product;
//!
//! let mut settings = Settings::new(Product::T825);
//! settings.control_mode = ControlMode::ANALOG_POSITION;
//! settings.pin_mut(Pin::Sda).func = PinFunc::RC;
//!
//! let warnings = settings.fix();
//! assert_eq!(warnings.len(), 1);
//! assert_eq!(settings.pin(Pin::Sda).func, PinFunc::DEFAULT);
//! ```

mod codec;
mod current;
mod fix;
pub mod layout;
mod text;

pub use codec::{decode, encode};
pub use current::{
    achievable_baud_rate, achievable_current_limit, baud_rate_from_brg, baud_rate_to_brg,
    current_limit_code_to_ma, current_limit_ma_to_code, max_current_limit, MAX_BAUD_RATE,
    MIN_BAUD_RATE,
};
pub use fix::Warnings;

use crate::product::Product;

/// Declares a newtype over a one-byte device code with named constants and a name table.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:expr => $text:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(pub u8);

        impl $name {
            $($(#[$vmeta])* pub const $variant: $name = $name($code);)*

            const NAMES: &'static [(u8, &'static str)] = &[$(($code, $text)),*];

            /// Name used in settings files, or `None` if the code is not a known member.
            pub fn name(self) -> Option<&'static str> {
                Self::NAMES
                    .iter()
                    .find(|(code, _)| *code == self.0)
                    .map(|(_, name)| *name)
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::NAMES
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(code, _)| $name(*code))
            }

            pub fn is_valid(self) -> bool {
                self.name().is_some()
            }
        }
    };
}

code_enum! {
    /// What the controller takes its motion commands from.
    ControlMode {
        SERIAL = 0 => "serial",
        STEP_DIR = 1 => "step_dir",
        RC_POSITION = 2 => "rc_position",
        RC_SPEED = 3 => "rc_speed",
        ANALOG_POSITION = 4 => "analog_position",
        ANALOG_SPEED = 5 => "analog_speed",
        ENCODER_POSITION = 6 => "encoder_position",
        ENCODER_SPEED = 7 => "encoder_speed",
    }
}

impl ControlMode {
    pub fn is_speed(self) -> bool {
        matches!(
            self,
            ControlMode::RC_SPEED | ControlMode::ANALOG_SPEED | ControlMode::ENCODER_SPEED
        )
    }

    pub fn is_analog(self) -> bool {
        matches!(
            self,
            ControlMode::ANALOG_POSITION | ControlMode::ANALOG_SPEED
        )
    }

    pub fn is_rc(self) -> bool {
        matches!(self, ControlMode::RC_POSITION | ControlMode::RC_SPEED)
    }

    pub fn is_encoder(self) -> bool {
        matches!(
            self,
            ControlMode::ENCODER_POSITION | ControlMode::ENCODER_SPEED
        )
    }
}

code_enum! {
    /// What the controller does while a soft error is active.
    SoftErrorResponse {
        DEENERGIZE = 0 => "deenergize",
        HALT_AND_HOLD = 1 => "halt_and_hold",
        DECEL_TO_HOLD = 2 => "decel_to_hold",
        GO_TO_POSITION = 3 => "go_to_position",
    }
}

code_enum! {
    /// Shape of the curve mapping scaled input to target.
    ScalingDegree {
        LINEAR = 0 => "linear",
        QUADRATIC = 1 => "quadratic",
        CUBIC = 2 => "cubic",
    }
}

code_enum! {
    /// Microstepping mode; the name is the number of microsteps per full step.
    StepMode {
        FULL = 0 => "1",
        HALF = 1 => "2",
        MICROSTEP4 = 2 => "4",
        MICROSTEP8 = 3 => "8",
        MICROSTEP16 = 4 => "16",
        MICROSTEP32 = 5 => "32",
    }
}

impl StepMode {
    /// Whether this product's driver supports the mode.
    pub fn is_valid_for(self, product: Product) -> bool {
        self.0 < product.info().step_mode_count
    }
}

code_enum! {
    /// Function assigned to a control pin.
    PinFunc {
        DEFAULT = 0 => "default",
        USER_IO = 1 => "user_io",
        USER_INPUT = 2 => "user_input",
        POT_POWER = 3 => "pot_power",
        SERIAL = 4 => "serial",
        RC = 5 => "rc",
        ENCODER = 6 => "encoder",
        KILL_SWITCH = 7 => "kill_switch",
        LIMIT_SWITCH_FORWARD = 8 => "limit_switch_forward",
        LIMIT_SWITCH_REVERSE = 9 => "limit_switch_reverse",
    }
}

impl PinFunc {
    /// Whether the function makes the pin a switch input, for which polarity matters.
    pub fn is_switch(self) -> bool {
        matches!(
            self,
            PinFunc::KILL_SWITCH | PinFunc::LIMIT_SWITCH_FORWARD | PinFunc::LIMIT_SWITCH_REVERSE
        )
    }
}

impl Default for PinFunc {
    fn default() -> Self {
        PinFunc::DEFAULT
    }
}

/// Decay mode of the stepper driver. Code meanings differ between products.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct DecayMode(pub u8);

impl DecayMode {
    pub fn name(self, product: Product) -> Option<&'static str> {
        product
            .info()
            .decay_mode_names
            .get(self.0 as usize)
            .copied()
    }

    pub fn from_name(product: Product, name: &str) -> Option<Self> {
        product
            .info()
            .decay_mode_names
            .iter()
            .position(|n| *n == name)
            .map(|code| DecayMode(code as u8))
    }

    pub fn is_valid_for(self, product: Product) -> bool {
        self.name(product).is_some()
    }
}

/// The configurable control pins, in the order they are numbered by the firmware.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Pin {
    Scl = 0,
    Sda = 1,
    Tx = 2,
    Rx = 3,
    Rc = 4,
}

/// Number of entries in [`Settings::pins`].
pub const PIN_COUNT: usize = 5;

impl Pin {
    pub const ALL: [Pin; PIN_COUNT] = [Pin::Scl, Pin::Sda, Pin::Tx, Pin::Rx, Pin::Rc];

    /// Lowercase name, as used in settings file keys.
    pub fn name(self) -> &'static str {
        match self {
            Pin::Scl => "scl",
            Pin::Sda => "sda",
            Pin::Tx => "tx",
            Pin::Rx => "rx",
            Pin::Rc => "rc",
        }
    }

    /// Name as printed on the board, used in warnings.
    pub fn label(self) -> &'static str {
        match self {
            Pin::Scl => "SCL",
            Pin::Sda => "SDA",
            Pin::Tx => "TX",
            Pin::Rx => "RX",
            Pin::Rc => "RC",
        }
    }
}

/// Configuration of a single control pin.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct PinSettings {
    pub func: PinFunc,
    pub pullup: bool,

    /// Enables analog readings on the pin.
    pub analog: bool,

    /// Active high when set; only meaningful for switch functions.
    pub polarity: bool,
}

/// All persistent settings of a Tic.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    pub product: Product,

    pub control_mode: ControlMode,
    pub never_sleep: bool,
    pub disable_safe_start: bool,
    pub ignore_err_line_high: bool,
    pub auto_clear_driver_error: bool,
    pub soft_error_response: SoftErrorResponse,
    pub soft_error_position: i32,

    /// Serial baud rate in bits per second. Only rates the baud rate generator can produce
    /// survive a trip to the device.
    pub serial_baud_rate: u32,
    pub serial_device_number: u8,
    pub i2c_device_address: u8,

    /// Milliseconds without a command before a command timeout error; 0 disables it.
    pub command_timeout: u16,
    pub serial_crc_enabled: bool,

    pub low_vin_timeout: u16,

    /// Voltages in millivolts.
    pub low_vin_shutoff_voltage: u16,
    pub low_vin_startup_voltage: u16,
    pub high_vin_shutoff_voltage: u16,
    pub vin_calibration: i16,

    pub rc_max_pulse_period: u16,
    pub rc_bad_signal_timeout: u16,
    pub rc_consecutive_good_pulses: u8,

    pub input_averaging_enabled: bool,
    pub input_hysteresis: u16,
    pub input_error_min: u16,
    pub input_error_max: u16,
    pub input_scaling_degree: ScalingDegree,
    pub input_invert: bool,
    pub input_min: u16,
    pub input_neutral_min: u16,
    pub input_neutral_max: u16,
    pub input_max: u16,
    pub output_min: i32,
    pub output_max: i32,

    pub encoder_prescaler: u32,
    pub encoder_postscaler: u32,
    pub encoder_unlimited: bool,

    /// Indexed by [`Pin`]; see [`Settings::pin`].
    pub pins: [PinSettings; PIN_COUNT],

    /// Current limit in milliamps.
    pub current_limit: u32,

    /// Current limit while an error is active; `None` keeps the normal current limit.
    pub current_limit_during_error: Option<u32>,

    pub step_mode: StepMode,
    pub decay_mode: DecayMode,

    /// Speeds in microsteps per 10000 s, accelerations in microsteps per 100 s².
    pub starting_speed: u32,
    pub max_speed: u32,

    /// 0 means "same as `max_accel`".
    pub max_decel: u32,
    pub max_accel: u32,
    pub invert_motor_direction: bool,
}

impl Settings {
    /// Creates the settings a freshly initialized device of this product would have.
    pub fn new(product: Product) -> Self {
        Settings {
            product,
            control_mode: ControlMode::SERIAL,
            never_sleep: false,
            disable_safe_start: false,
            ignore_err_line_high: false,
            auto_clear_driver_error: true,
            soft_error_response: SoftErrorResponse::DECEL_TO_HOLD,
            soft_error_position: 0,
            serial_baud_rate: 9600,
            serial_device_number: 14,
            i2c_device_address: 14,
            command_timeout: 1000,
            serial_crc_enabled: false,
            low_vin_timeout: 250,
            low_vin_shutoff_voltage: 6000,
            low_vin_startup_voltage: 6500,
            high_vin_shutoff_voltage: product.info().default_high_vin_shutoff_voltage,
            vin_calibration: 0,
            rc_max_pulse_period: 100,
            rc_bad_signal_timeout: 500,
            rc_consecutive_good_pulses: 2,
            input_averaging_enabled: true,
            input_hysteresis: 0,
            input_error_min: 0,
            input_error_max: 4095,
            input_scaling_degree: ScalingDegree::LINEAR,
            input_invert: false,
            input_min: 0,
            input_neutral_min: 2015,
            input_neutral_max: 2080,
            input_max: 4095,
            output_min: -200,
            output_max: 200,
            encoder_prescaler: 1,
            encoder_postscaler: 1,
            encoder_unlimited: false,
            pins: [PinSettings::default(); PIN_COUNT],
            current_limit: 192,
            current_limit_during_error: None,
            step_mode: StepMode::FULL,
            decay_mode: DecayMode::default(),
            starting_speed: 0,
            max_speed: 2_000_000,
            max_decel: 0,
            max_accel: 40_000,
            invert_motor_direction: false,
        }
    }

    pub fn pin(&self, pin: Pin) -> &PinSettings {
        &self.pins[pin as usize]
    }

    pub fn pin_mut(&mut self, pin: Pin) -> &mut PinSettings {
        &mut self.pins[pin as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tables() {
        assert_eq!(ControlMode::ENCODER_SPEED.name(), Some("encoder_speed"));
        assert_eq!(ControlMode(8).name(), None);
        assert_eq!(
            SoftErrorResponse::from_name("halt_and_hold"),
            Some(SoftErrorResponse::HALT_AND_HOLD)
        );
        assert_eq!(StepMode::from_name("16"), Some(StepMode::MICROSTEP16));
        assert_eq!(PinFunc::from_name("Kill_Switch"), None);
    }

    #[test]
    fn decay_names_depend_on_product() {
        assert_eq!(DecayMode(2).name(Product::T825), Some("fast"));
        assert_eq!(DecayMode(2).name(Product::T834), Some("mixed50"));
        assert_eq!(DecayMode(2).name(Product::T500), None);
        assert_eq!(
            DecayMode::from_name(Product::T834, "mixed75"),
            Some(DecayMode(3))
        );
    }

    #[test]
    fn step_modes_per_product() {
        assert!(StepMode::MICROSTEP32.is_valid_for(Product::T825));
        assert!(!StepMode::MICROSTEP16.is_valid_for(Product::T500));
        assert!(StepMode::MICROSTEP8.is_valid_for(Product::T500));
    }

    #[test]
    fn control_mode_classes() {
        assert!(ControlMode::RC_SPEED.is_speed());
        assert!(ControlMode::RC_SPEED.is_rc());
        assert!(!ControlMode::STEP_DIR.is_speed());
        assert!(ControlMode::ANALOG_POSITION.is_analog());
        assert!(ControlMode::ENCODER_POSITION.is_encoder());
    }
}
