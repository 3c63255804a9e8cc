use super::current::{
    baud_rate_from_brg, baud_rate_to_brg, current_limit_code_to_ma, current_limit_ma_to_code,
};
use super::layout::*;
use super::{
    ControlMode, DecayMode, PinFunc, PinSettings, ScalingDegree, Settings, SoftErrorResponse,
    StepMode, PIN_COUNT,
};
use crate::product::Product;

fn get_bool(buf: &[u8], offset: u8) -> bool {
    buf[offset as usize] & 1 != 0
}

fn get_u16(buf: &[u8], offset: u8) -> u16 {
    let o = offset as usize;
    u16::from_le_bytes([buf[o], buf[o + 1]])
}

fn get_u32(buf: &[u8], offset: u8) -> u32 {
    let o = offset as usize;
    u32::from_le_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]])
}

fn put(buf: &mut [u8], offset: u8, bytes: &[u8]) {
    let o = offset as usize;
    buf[o..o + bytes.len()].copy_from_slice(bytes);
}

/// Converts a settings record into the byte image stored on the device.
///
/// Offset 0 (the "not initialized" flag) is always 0. Values outside of their valid ranges are
/// stored as-is or truncated; run [`Settings::fix`] first.
pub fn encode(settings: &Settings) -> [u8; SETTINGS_SIZE] {
    let mut buf = [0u8; SETTINGS_SIZE];
    let s = settings;
    let product = s.product;

    put(&mut buf, CONTROL_MODE, &[s.control_mode.0]);
    put(&mut buf, NEVER_SLEEP, &[s.never_sleep as u8]);
    put(&mut buf, DISABLE_SAFE_START, &[s.disable_safe_start as u8]);
    put(&mut buf, IGNORE_ERR_LINE_HIGH, &[s.ignore_err_line_high as u8]);
    put(
        &mut buf,
        SERIAL_BAUD_RATE_GENERATOR,
        &baud_rate_to_brg(s.serial_baud_rate).to_le_bytes(),
    );
    put(&mut buf, SERIAL_DEVICE_NUMBER, &[s.serial_device_number]);
    put(
        &mut buf,
        AUTO_CLEAR_DRIVER_ERROR,
        &[s.auto_clear_driver_error as u8],
    );
    put(&mut buf, COMMAND_TIMEOUT, &s.command_timeout.to_le_bytes());
    put(&mut buf, SERIAL_CRC_ENABLED, &[s.serial_crc_enabled as u8]);
    put(&mut buf, LOW_VIN_TIMEOUT, &s.low_vin_timeout.to_le_bytes());
    put(
        &mut buf,
        LOW_VIN_SHUTOFF_VOLTAGE,
        &s.low_vin_shutoff_voltage.to_le_bytes(),
    );
    put(
        &mut buf,
        LOW_VIN_STARTUP_VOLTAGE,
        &s.low_vin_startup_voltage.to_le_bytes(),
    );
    put(
        &mut buf,
        HIGH_VIN_SHUTOFF_VOLTAGE,
        &s.high_vin_shutoff_voltage.to_le_bytes(),
    );
    put(&mut buf, VIN_CALIBRATION, &s.vin_calibration.to_le_bytes());
    put(&mut buf, RC_MAX_PULSE_PERIOD, &s.rc_max_pulse_period.to_le_bytes());
    put(
        &mut buf,
        RC_BAD_SIGNAL_TIMEOUT,
        &s.rc_bad_signal_timeout.to_le_bytes(),
    );
    put(
        &mut buf,
        RC_CONSECUTIVE_GOOD_PULSES,
        &[s.rc_consecutive_good_pulses],
    );
    put(
        &mut buf,
        INVERT_MOTOR_DIRECTION,
        &[s.invert_motor_direction as u8],
    );
    put(&mut buf, INPUT_ERROR_MIN, &s.input_error_min.to_le_bytes());
    put(&mut buf, INPUT_ERROR_MAX, &s.input_error_max.to_le_bytes());
    put(&mut buf, INPUT_SCALING_DEGREE, &[s.input_scaling_degree.0]);
    put(&mut buf, INPUT_INVERT, &[s.input_invert as u8]);
    put(&mut buf, INPUT_MIN, &s.input_min.to_le_bytes());
    put(&mut buf, INPUT_NEUTRAL_MIN, &s.input_neutral_min.to_le_bytes());
    put(&mut buf, INPUT_NEUTRAL_MAX, &s.input_neutral_max.to_le_bytes());
    put(&mut buf, INPUT_MAX, &s.input_max.to_le_bytes());
    put(&mut buf, OUTPUT_MIN, &s.output_min.to_le_bytes());
    put(
        &mut buf,
        INPUT_AVERAGING_ENABLED,
        &[s.input_averaging_enabled as u8],
    );
    put(&mut buf, INPUT_HYSTERESIS, &s.input_hysteresis.to_le_bytes());
    put(
        &mut buf,
        CURRENT_LIMIT_DURING_ERROR,
        &[match s.current_limit_during_error {
            Some(milliamps) => current_limit_ma_to_code(product, milliamps),
            None => CURRENT_LIMIT_DURING_ERROR_SAME,
        }],
    );
    put(&mut buf, OUTPUT_MAX, &s.output_max.to_le_bytes());
    put(&mut buf, ENCODER_POSTSCALER, &s.encoder_postscaler.to_le_bytes());

    let mut polarity_map = 0u8;
    let mut kill_switch_map = 0u8;
    for (i, pin) in s.pins.iter().enumerate() {
        let mut config = pin.func.0 & PIN_FUNC_MASK;
        if pin.analog {
            config |= PIN_ANALOG;
        }
        if pin.pullup {
            config |= PIN_PULLUP;
        }
        put(&mut buf, PIN_CONFIG[i], &[config]);

        if pin.polarity {
            polarity_map |= 1 << i;
        }
        if pin.func == PinFunc::KILL_SWITCH {
            kill_switch_map |= 1 << i;
        }
    }
    put(&mut buf, SWITCH_POLARITY_MAP, &[polarity_map]);
    put(&mut buf, KILL_SWITCH_MAP, &[kill_switch_map]);

    put(
        &mut buf,
        CURRENT_LIMIT,
        &[current_limit_ma_to_code(product, s.current_limit)],
    );
    put(&mut buf, STEP_MODE, &[s.step_mode.0]);
    put(&mut buf, DECAY_MODE, &[s.decay_mode.0]);
    put(&mut buf, STARTING_SPEED, &s.starting_speed.to_le_bytes());
    put(&mut buf, MAX_SPEED, &s.max_speed.to_le_bytes());
    put(&mut buf, MAX_DECEL, &s.max_decel.to_le_bytes());
    put(&mut buf, MAX_ACCEL, &s.max_accel.to_le_bytes());
    put(&mut buf, SOFT_ERROR_RESPONSE, &[s.soft_error_response.0]);
    put(
        &mut buf,
        SOFT_ERROR_POSITION,
        &s.soft_error_position.to_le_bytes(),
    );
    put(&mut buf, ENCODER_PRESCALER, &s.encoder_prescaler.to_le_bytes());
    put(&mut buf, ENCODER_UNLIMITED, &[s.encoder_unlimited as u8]);
    put(&mut buf, I2C_DEVICE_ADDRESS, &[s.i2c_device_address]);

    buf
}

/// Builds a settings record from the byte image stored on a device of the given product.
///
/// The "not initialized" flag and the kill switch map are ignored; the latter is implied by the
/// pin functions.
pub fn decode(product: Product, buf: &[u8; SETTINGS_SIZE]) -> Settings {
    let mut pins = [PinSettings::default(); PIN_COUNT];
    let polarity_map = buf[SWITCH_POLARITY_MAP as usize];
    for (i, pin) in pins.iter_mut().enumerate() {
        let config = buf[PIN_CONFIG[i] as usize];
        *pin = PinSettings {
            func: PinFunc(config & PIN_FUNC_MASK),
            pullup: config & PIN_PULLUP != 0,
            analog: config & PIN_ANALOG != 0,
            polarity: polarity_map >> i & 1 != 0,
        };
    }

    let current_limit_during_error = match buf[CURRENT_LIMIT_DURING_ERROR as usize] {
        CURRENT_LIMIT_DURING_ERROR_SAME => None,
        code => Some(current_limit_code_to_ma(product, code)),
    };

    Settings {
        product,
        control_mode: ControlMode(buf[CONTROL_MODE as usize]),
        never_sleep: get_bool(buf, NEVER_SLEEP),
        disable_safe_start: get_bool(buf, DISABLE_SAFE_START),
        ignore_err_line_high: get_bool(buf, IGNORE_ERR_LINE_HIGH),
        auto_clear_driver_error: get_bool(buf, AUTO_CLEAR_DRIVER_ERROR),
        soft_error_response: SoftErrorResponse(buf[SOFT_ERROR_RESPONSE as usize]),
        soft_error_position: get_u32(buf, SOFT_ERROR_POSITION) as i32,
        serial_baud_rate: baud_rate_from_brg(get_u16(buf, SERIAL_BAUD_RATE_GENERATOR)),
        serial_device_number: buf[SERIAL_DEVICE_NUMBER as usize],
        i2c_device_address: buf[I2C_DEVICE_ADDRESS as usize],
        command_timeout: get_u16(buf, COMMAND_TIMEOUT),
        serial_crc_enabled: get_bool(buf, SERIAL_CRC_ENABLED),
        low_vin_timeout: get_u16(buf, LOW_VIN_TIMEOUT),
        low_vin_shutoff_voltage: get_u16(buf, LOW_VIN_SHUTOFF_VOLTAGE),
        low_vin_startup_voltage: get_u16(buf, LOW_VIN_STARTUP_VOLTAGE),
        high_vin_shutoff_voltage: get_u16(buf, HIGH_VIN_SHUTOFF_VOLTAGE),
        vin_calibration: get_u16(buf, VIN_CALIBRATION) as i16,
        rc_max_pulse_period: get_u16(buf, RC_MAX_PULSE_PERIOD),
        rc_bad_signal_timeout: get_u16(buf, RC_BAD_SIGNAL_TIMEOUT),
        rc_consecutive_good_pulses: buf[RC_CONSECUTIVE_GOOD_PULSES as usize],
        input_averaging_enabled: get_bool(buf, INPUT_AVERAGING_ENABLED),
        input_hysteresis: get_u16(buf, INPUT_HYSTERESIS),
        input_error_min: get_u16(buf, INPUT_ERROR_MIN),
        input_error_max: get_u16(buf, INPUT_ERROR_MAX),
        input_scaling_degree: ScalingDegree(buf[INPUT_SCALING_DEGREE as usize]),
        input_invert: get_bool(buf, INPUT_INVERT),
        input_min: get_u16(buf, INPUT_MIN),
        input_neutral_min: get_u16(buf, INPUT_NEUTRAL_MIN),
        input_neutral_max: get_u16(buf, INPUT_NEUTRAL_MAX),
        input_max: get_u16(buf, INPUT_MAX),
        output_min: get_u32(buf, OUTPUT_MIN) as i32,
        output_max: get_u32(buf, OUTPUT_MAX) as i32,
        encoder_prescaler: get_u32(buf, ENCODER_PRESCALER),
        encoder_postscaler: get_u32(buf, ENCODER_POSTSCALER),
        encoder_unlimited: get_bool(buf, ENCODER_UNLIMITED),
        pins,
        current_limit: current_limit_code_to_ma(product, buf[CURRENT_LIMIT as usize]),
        current_limit_during_error,
        step_mode: StepMode(buf[STEP_MODE as usize]),
        decay_mode: DecayMode(buf[DECAY_MODE as usize]),
        starting_speed: get_u32(buf, STARTING_SPEED),
        max_speed: get_u32(buf, MAX_SPEED),
        max_decel: get_u32(buf, MAX_DECEL),
        max_accel: get_u32(buf, MAX_ACCEL),
        invert_motor_direction: get_bool(buf, INVERT_MOTOR_DIRECTION),
    }
}

impl Settings {
    /// Shorthand for [`encode`].
    pub fn to_bytes(&self) -> [u8; SETTINGS_SIZE] {
        encode(self)
    }

    /// Shorthand for [`decode`].
    pub fn from_bytes(product: Product, buf: &[u8; SETTINGS_SIZE]) -> Self {
        decode(product, buf)
    }
}
