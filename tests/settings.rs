use tic_usb::settings::{
    current_limit_code_to_ma, current_limit_ma_to_code, decode, encode, layout, ControlMode,
    DecayMode, Pin, PinFunc, ScalingDegree, Settings, StepMode,
};
use tic_usb::Product;

/// A record with something wrong in most groups of settings.
fn messy(product: Product) -> Settings {
    let mut settings = Settings::new(product);
    settings.control_mode = ControlMode::RC_SPEED;
    settings.input_scaling_degree = ScalingDegree(9);
    settings.step_mode = StepMode(7);
    settings.decay_mode = DecayMode(12);
    settings.serial_baud_rate = 1_000_000;
    settings.serial_device_number = 200;
    settings.low_vin_startup_voltage = 1000;
    settings.vin_calibration = -3000;
    settings.input_min = 3000;
    settings.input_max = 100;
    settings.output_min = 50;
    settings.encoder_prescaler = 0;
    settings.current_limit = 100_000;
    settings.starting_speed = 600_000_000;
    settings.max_accel = 0;
    settings.pin_mut(Pin::Rc).func = PinFunc::ENCODER;
    settings.pin_mut(Pin::Scl).func = PinFunc(15);
    settings
}

#[test]
fn defaults_need_no_fixing() {
    for product in Product::all() {
        let mut settings = Settings::new(product);
        let warnings = settings.fix();
        assert!(
            warnings.is_empty(),
            "{}: {:?}",
            product,
            warnings.iter().collect::<Vec<_>>()
        );
        assert_eq!(settings, Settings::new(product));
    }
}

#[test]
fn fixing_twice_changes_nothing() {
    for product in Product::all() {
        let mut settings = messy(product);
        assert!(!settings.fix().is_empty());

        let once = settings.clone();
        let warnings = settings.fix();
        assert!(
            warnings.is_empty(),
            "{}: {:?}",
            product,
            warnings.iter().collect::<Vec<_>>()
        );
        assert_eq!(settings, once);
    }
}

#[test]
fn fixed_records_survive_the_device_format() {
    for product in Product::all() {
        let settings = messy(product).fixed();
        assert_eq!(decode(product, &encode(&settings)), settings);
    }
}

#[test]
fn fixed_records_survive_the_text_format() {
    for product in Product::all() {
        let settings = messy(product).fixed();
        let (read, warnings) = Settings::from_text(&settings.to_text()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(read, settings);
    }
}

#[test]
fn encoded_records_leave_the_initialized_flag_clear() {
    let bytes = encode(&Settings::new(Product::T825));
    assert_eq!(bytes.len(), layout::SETTINGS_SIZE);
    assert_eq!(bytes[layout::NOT_INITIALIZED as usize], 0);
    assert_eq!(bytes[layout::CONTROL_MODE as usize], ControlMode::SERIAL.0);
}

#[test]
fn current_limits_grow_with_the_request() {
    for product in Product::all() {
        let max_code = product.info().max_current_code;
        let mut previous = 0;
        for milliamps in (0..6000).step_by(7) {
            let code = current_limit_ma_to_code(product, milliamps);
            assert!(code <= max_code);

            let achieved = current_limit_code_to_ma(product, code);
            assert!(achieved >= previous, "{} at {} mA", product, milliamps);
            previous = achieved;
        }
    }
}

#[test]
fn analog_pins_cannot_be_used_for_rc_in_analog_modes() {
    let mut settings = Settings::new(Product::T834);
    settings.control_mode = ControlMode::ANALOG_SPEED;
    settings.pin_mut(Pin::Sda).func = PinFunc::RC;

    let warnings = settings.fix();
    assert_eq!(warnings.len(), 1);
    assert!(warnings.iter().all(|w| w.contains("SDA")));
    assert_eq!(settings.pin(Pin::Sda).func, PinFunc::DEFAULT);
}
