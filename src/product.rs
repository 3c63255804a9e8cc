//! Static per-product data for the Tic family.

use std::fmt;

/// USB vendor ID shared by every device this crate knows about.
pub const USB_VENDOR_ID_POLOLU: u16 = 0x1FFB;

/// A member of the Tic stepper motor controller family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Product {
    T825,
    T834,
    T500,
}

/// Everything that differs between products, kept as immutable data.
#[derive(Debug)]
pub struct ProductInfo {
    pub product: Product,

    /// Short name used in settings files.
    pub name: &'static str,

    pub full_name: &'static str,

    /// USB product ID of the native application (not the bootloader).
    pub usb_product_id: u16,

    /// Milliamps per current limit code step.
    pub current_units_ma: u32,

    /// Highest current limit code the driver accepts.
    pub max_current_code: u8,

    /// Names of the decay modes, indexed by code.
    pub decay_mode_names: &'static [&'static str],

    /// Number of microstep modes available, starting at full step.
    pub step_mode_count: u8,

    pub default_high_vin_shutoff_voltage: u16,
}

static PRODUCTS: [ProductInfo; 3] = [
    ProductInfo {
        product: Product::T825,
        name: "T825",
        full_name: "Tic T825 Stepper Motor Controller",
        usb_product_id: 0x00B3,
        current_units_ma: 32,
        max_current_code: 124,
        decay_mode_names: &["mixed", "slow", "fast"],
        step_mode_count: 6,
        default_high_vin_shutoff_voltage: 35000,
    },
    ProductInfo {
        product: Product::T834,
        name: "T834",
        full_name: "Tic T834 Stepper Motor Controller",
        usb_product_id: 0x00B5,
        current_units_ma: 32,
        max_current_code: 108,
        decay_mode_names: &["slow", "mixed25", "mixed50", "mixed75"],
        step_mode_count: 6,
        default_high_vin_shutoff_voltage: 47000,
    },
    ProductInfo {
        product: Product::T500,
        name: "T500",
        full_name: "Tic T500 Stepper Motor Controller",
        usb_product_id: 0x00BD,
        current_units_ma: 24,
        max_current_code: 104,
        decay_mode_names: &["auto"],
        step_mode_count: 4,
        default_high_vin_shutoff_voltage: 35000,
    },
];

impl Product {
    pub fn all() -> impl Iterator<Item = Product> {
        PRODUCTS.iter().map(|info| info.product)
    }

    pub fn info(self) -> &'static ProductInfo {
        match self {
            Product::T825 => &PRODUCTS[0],
            Product::T834 => &PRODUCTS[1],
            Product::T500 => &PRODUCTS[2],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn from_name(name: &str) -> Option<Product> {
        PRODUCTS
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.product)
    }

    /// Looks up the product whose native application enumerates with this USB ID.
    pub fn from_usb_id(vendor_id: u16, product_id: u16) -> Option<Product> {
        if vendor_id != USB_VENDOR_ID_POLOLU {
            return None;
        }
        PRODUCTS
            .iter()
            .find(|info| info.usb_product_id == product_id)
            .map(|info| info.product)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
