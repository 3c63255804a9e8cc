//! Conversions between user-facing quantities and the codes the firmware stores.

use crate::product::Product;

/// Slowest serial baud rate the firmware accepts.
pub const MIN_BAUD_RATE: u32 = 200;

/// Fastest serial baud rate the firmware accepts.
pub const MAX_BAUD_RATE: u32 = 115_385;

const BAUD_CLOCK: u32 = 12_000_000;

/// Rounds a current limit code down to one the driver can actually use.
///
/// Codes above 32 must be even and codes above 64 multiples of four.
fn fix_current_limit_code(product: Product, code: u8) -> u8 {
    let max = product.info().max_current_code;
    if code > max {
        max
    } else if code > 64 {
        code & !3
    } else if code > 32 {
        code & !1
    } else {
        code
    }
}

/// Converts a current limit code to milliamps.
pub fn current_limit_code_to_ma(product: Product, code: u8) -> u32 {
    u32::from(fix_current_limit_code(product, code)) * product.info().current_units_ma
}

/// Converts milliamps to the highest current limit code that does not exceed them.
pub fn current_limit_ma_to_code(product: Product, milliamps: u32) -> u8 {
    let code = (milliamps / product.info().current_units_ma).min(u32::from(u8::MAX));
    fix_current_limit_code(product, code as u8)
}

/// Rounds a current limit down to the nearest value the product supports.
///
/// ```rust
/// use tic_usb::settings::achievable_current_limit;
/// use tic_usb::Product;
///
/// assert_eq!(achievable_current_limit(Product::T825, 2100), 2048);
/// assert_eq!(achievable_current_limit(Product::T825, 9000), 3968);
/// ```
pub fn achievable_current_limit(product: Product, milliamps: u32) -> u32 {
    current_limit_code_to_ma(product, current_limit_ma_to_code(product, milliamps))
}

/// Highest current limit in milliamps the product supports.
pub fn max_current_limit(product: Product) -> u32 {
    current_limit_code_to_ma(product, product.info().max_current_code)
}

/// Computes the baud rate generator value the firmware stores for a baud rate.
pub fn baud_rate_to_brg(baud_rate: u32) -> u16 {
    let baud_rate = baud_rate.max(1);
    let brg = (BAUD_CLOCK + baud_rate / 2) / baud_rate;
    brg.min(u32::from(u16::MAX)) as u16
}

/// Computes the baud rate a baud rate generator value produces.
pub fn baud_rate_from_brg(brg: u16) -> u32 {
    if brg == 0 {
        return 0;
    }
    let brg = u32::from(brg);
    (BAUD_CLOCK + brg / 2) / brg
}

/// Rounds a baud rate to the nearest one the baud rate generator can produce.
pub fn achievable_baud_rate(baud_rate: u32) -> u32 {
    baud_rate_from_brg(baud_rate_to_brg(baud_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_coarsened_above_thresholds() {
        let p = Product::T825;
        assert_eq!(current_limit_code_to_ma(p, 31), 31 * 32);
        assert_eq!(current_limit_code_to_ma(p, 33), 32 * 32);
        assert_eq!(current_limit_code_to_ma(p, 34), 34 * 32);
        assert_eq!(current_limit_code_to_ma(p, 67), 64 * 32);
        assert_eq!(current_limit_code_to_ma(p, 71), 68 * 32);
        assert_eq!(current_limit_code_to_ma(p, 200), 124 * 32);
    }

    #[test]
    fn conversion_is_monotonic_and_capped() {
        for product in Product::all() {
            let max_code = product.info().max_current_code;
            let mut previous = 0;
            for ma in (0..6000).step_by(7) {
                let code = current_limit_ma_to_code(product, ma);
                assert!(code <= max_code);
                let converted = current_limit_code_to_ma(product, code);
                assert!(converted >= previous, "{} mA on {}", ma, product);
                assert!(converted <= ma);
                previous = converted;
            }
        }
    }

    #[test]
    fn achievable_current_is_stable() {
        for product in Product::all() {
            for ma in (0..6000).step_by(13) {
                let once = achievable_current_limit(product, ma);
                assert_eq!(achievable_current_limit(product, once), once);
            }
        }
    }

    #[test]
    fn max_current_per_product() {
        assert_eq!(max_current_limit(Product::T825), 3968);
        assert_eq!(max_current_limit(Product::T834), 3456);
        assert_eq!(max_current_limit(Product::T500), 2496);
    }

    #[test]
    fn baud_rates() {
        assert_eq!(baud_rate_to_brg(9600), 1250);
        assert_eq!(baud_rate_from_brg(1250), 9600);
        assert_eq!(achievable_baud_rate(115_200), 115_385);
        assert_eq!(achievable_baud_rate(MIN_BAUD_RATE), MIN_BAUD_RATE);
        assert_eq!(achievable_baud_rate(MAX_BAUD_RATE), MAX_BAUD_RATE);
        assert_eq!(baud_rate_from_brg(0), 0);
    }
}
