//! Byte layout of the settings area in the device's non-volatile memory.
//!
//! All multi-byte fields are little endian. Offset 0 holds the "not initialized" flag: the
//! firmware replaces the whole area with defaults on the next start when it is nonzero.

pub const NOT_INITIALIZED: u8 = 0x00;
pub const CONTROL_MODE: u8 = 0x01;
pub const NEVER_SLEEP: u8 = 0x02;
pub const DISABLE_SAFE_START: u8 = 0x03;
pub const IGNORE_ERR_LINE_HIGH: u8 = 0x04;
pub const SERIAL_BAUD_RATE_GENERATOR: u8 = 0x05;
pub const SERIAL_DEVICE_NUMBER: u8 = 0x07;
pub const AUTO_CLEAR_DRIVER_ERROR: u8 = 0x08;
pub const COMMAND_TIMEOUT: u8 = 0x09;
pub const SERIAL_CRC_ENABLED: u8 = 0x0B;
pub const LOW_VIN_TIMEOUT: u8 = 0x0C;
pub const LOW_VIN_SHUTOFF_VOLTAGE: u8 = 0x0E;
pub const LOW_VIN_STARTUP_VOLTAGE: u8 = 0x10;
pub const HIGH_VIN_SHUTOFF_VOLTAGE: u8 = 0x12;
pub const VIN_CALIBRATION: u8 = 0x14;
pub const RC_MAX_PULSE_PERIOD: u8 = 0x16;
pub const RC_BAD_SIGNAL_TIMEOUT: u8 = 0x18;
pub const RC_CONSECUTIVE_GOOD_PULSES: u8 = 0x1A;
pub const INVERT_MOTOR_DIRECTION: u8 = 0x1B;
pub const INPUT_ERROR_MIN: u8 = 0x1C;
pub const INPUT_ERROR_MAX: u8 = 0x1E;
pub const INPUT_SCALING_DEGREE: u8 = 0x20;
pub const INPUT_INVERT: u8 = 0x21;
pub const INPUT_MIN: u8 = 0x22;
pub const INPUT_NEUTRAL_MIN: u8 = 0x24;
pub const INPUT_NEUTRAL_MAX: u8 = 0x26;
pub const INPUT_MAX: u8 = 0x28;
pub const OUTPUT_MIN: u8 = 0x2A;
pub const INPUT_AVERAGING_ENABLED: u8 = 0x2E;
pub const INPUT_HYSTERESIS: u8 = 0x2F;
pub const CURRENT_LIMIT_DURING_ERROR: u8 = 0x31;
pub const OUTPUT_MAX: u8 = 0x32;
pub const SWITCH_POLARITY_MAP: u8 = 0x36;
pub const ENCODER_POSTSCALER: u8 = 0x37;
pub const SCL_CONFIG: u8 = 0x3B;
pub const SDA_CONFIG: u8 = 0x3C;
pub const TX_CONFIG: u8 = 0x3D;
pub const RX_CONFIG: u8 = 0x3E;
pub const RC_CONFIG: u8 = 0x3F;
pub const CURRENT_LIMIT: u8 = 0x40;
pub const STEP_MODE: u8 = 0x41;
pub const DECAY_MODE: u8 = 0x42;
pub const STARTING_SPEED: u8 = 0x43;
pub const MAX_SPEED: u8 = 0x47;
pub const MAX_DECEL: u8 = 0x4B;
pub const MAX_ACCEL: u8 = 0x4F;
pub const SOFT_ERROR_RESPONSE: u8 = 0x53;
pub const SOFT_ERROR_POSITION: u8 = 0x54;
pub const ENCODER_PRESCALER: u8 = 0x58;
pub const ENCODER_UNLIMITED: u8 = 0x5C;
pub const KILL_SWITCH_MAP: u8 = 0x5D;
pub const I2C_DEVICE_ADDRESS: u8 = 0x5E;

/// Size of the settings area, including the flag at offset 0.
pub const SETTINGS_SIZE: usize = 0x5F;

/// Pin config byte: function code.
pub const PIN_FUNC_MASK: u8 = 0x0F;

/// Pin config byte: analog readings enabled.
pub const PIN_ANALOG: u8 = 1 << 6;

/// Pin config byte: pull-up enabled.
pub const PIN_PULLUP: u8 = 1 << 7;

/// Config byte offsets, indexed by [`Pin`](super::Pin).
pub const PIN_CONFIG: [u8; super::PIN_COUNT] =
    [SCL_CONFIG, SDA_CONFIG, TX_CONFIG, RX_CONFIG, RC_CONFIG];

/// Value stored in [`CURRENT_LIMIT_DURING_ERROR`] to keep the normal current limit.
pub const CURRENT_LIMIT_DURING_ERROR_SAME: u8 = 0xFF;

/// A field of the settings area.
#[cfg(test)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Field {
    pub name: &'static str,
    pub offset: u8,

    /// Width in bytes: 1, 2 or 4.
    pub width: u8,
}

#[cfg(test)]
const fn field(name: &'static str, offset: u8, width: u8) -> Field {
    Field {
        name,
        offset,
        width,
    }
}

/// Every field stored in the settings area, in offset order. The codec tests check every
/// entry against `encode` and `decode`.
#[cfg(test)]
pub(crate) const FIELDS: &[Field] = &[
    field("not_initialized", NOT_INITIALIZED, 1),
    field("control_mode", CONTROL_MODE, 1),
    field("never_sleep", NEVER_SLEEP, 1),
    field("disable_safe_start", DISABLE_SAFE_START, 1),
    field("ignore_err_line_high", IGNORE_ERR_LINE_HIGH, 1),
    field("serial_baud_rate", SERIAL_BAUD_RATE_GENERATOR, 2),
    field("serial_device_number", SERIAL_DEVICE_NUMBER, 1),
    field("auto_clear_driver_error", AUTO_CLEAR_DRIVER_ERROR, 1),
    field("command_timeout", COMMAND_TIMEOUT, 2),
    field("serial_crc_enabled", SERIAL_CRC_ENABLED, 1),
    field("low_vin_timeout", LOW_VIN_TIMEOUT, 2),
    field("low_vin_shutoff_voltage", LOW_VIN_SHUTOFF_VOLTAGE, 2),
    field("low_vin_startup_voltage", LOW_VIN_STARTUP_VOLTAGE, 2),
    field("high_vin_shutoff_voltage", HIGH_VIN_SHUTOFF_VOLTAGE, 2),
    field("vin_calibration", VIN_CALIBRATION, 2),
    field("rc_max_pulse_period", RC_MAX_PULSE_PERIOD, 2),
    field("rc_bad_signal_timeout", RC_BAD_SIGNAL_TIMEOUT, 2),
    field("rc_consecutive_good_pulses", RC_CONSECUTIVE_GOOD_PULSES, 1),
    field("invert_motor_direction", INVERT_MOTOR_DIRECTION, 1),
    field("input_error_min", INPUT_ERROR_MIN, 2),
    field("input_error_max", INPUT_ERROR_MAX, 2),
    field("input_scaling_degree", INPUT_SCALING_DEGREE, 1),
    field("input_invert", INPUT_INVERT, 1),
    field("input_min", INPUT_MIN, 2),
    field("input_neutral_min", INPUT_NEUTRAL_MIN, 2),
    field("input_neutral_max", INPUT_NEUTRAL_MAX, 2),
    field("input_max", INPUT_MAX, 2),
    field("output_min", OUTPUT_MIN, 4),
    field("input_averaging_enabled", INPUT_AVERAGING_ENABLED, 1),
    field("input_hysteresis", INPUT_HYSTERESIS, 2),
    field("current_limit_during_error", CURRENT_LIMIT_DURING_ERROR, 1),
    field("output_max", OUTPUT_MAX, 4),
    field("switch_polarity_map", SWITCH_POLARITY_MAP, 1),
    field("encoder_postscaler", ENCODER_POSTSCALER, 4),
    field("scl_config", SCL_CONFIG, 1),
    field("sda_config", SDA_CONFIG, 1),
    field("tx_config", TX_CONFIG, 1),
    field("rx_config", RX_CONFIG, 1),
    field("rc_config", RC_CONFIG, 1),
    field("current_limit", CURRENT_LIMIT, 1),
    field("step_mode", STEP_MODE, 1),
    field("decay_mode", DECAY_MODE, 1),
    field("starting_speed", STARTING_SPEED, 4),
    field("max_speed", MAX_SPEED, 4),
    field("max_decel", MAX_DECEL, 4),
    field("max_accel", MAX_ACCEL, 4),
    field("soft_error_response", SOFT_ERROR_RESPONSE, 1),
    field("soft_error_position", SOFT_ERROR_POSITION, 4),
    field("encoder_prescaler", ENCODER_PRESCALER, 4),
    field("encoder_unlimited", ENCODER_UNLIMITED, 1),
    field("kill_switch_map", KILL_SWITCH_MAP, 1),
    field("i2c_device_address", I2C_DEVICE_ADDRESS, 1),
];
