//! Firmware archives (`.fmi` files): XML documents bundling firmware images for one or more
//! products.
//!
//! ```xml
//! <FirmwareArchive format="1.0" name="Tic firmware 1.06">
//!   <FirmwareImage product="00B2" uploadType="Standard">
//!     <Block address="2000">0C94...</Block>
//!   </FirmwareImage>
//! </FirmwareArchive>
//! ```

use crate::bootloader::UploadType;
use crate::error::{ArchiveError, ArchiveErrorKind};
use crate::product::USB_VENDOR_ID_POLOLU;
use std::path::Path;
use std::result::Result as StdResult;

type Result<T> = StdResult<T, ArchiveError>;

/// Major format version this parser understands. Any minor version is accepted.
const FORMAT_MAJOR: &str = "1";

/// Contiguous bytes at an absolute device address.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Block {
    pub address: u32,
    pub data: Vec<u8>,
}

impl Block {
    /// Whether the block only holds the erased value 0xFF and need not be written.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0xFF)
    }

    /// Address one past the last byte of the block. Wider than an address so blocks ending at
    /// the top of the address space cannot wrap around.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + self.data.len() as u64
    }
}

/// Firmware for one product. Always has at least one block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Image {
    pub usb_vendor_id: u16,

    /// Product ID of the bootloader the image is meant for.
    pub usb_product_id: u16,
    pub upload_type: UploadType,
    pub blocks: Vec<Block>,
}

/// A parsed firmware archive. Always has at least one image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Archive {
    pub name: String,
    pub images: Vec<Image>,
}

impl Archive {
    /// Parses an archive document.
    ///
    /// ```rust
    /// use tic_usb::archive::Archive;
    ///
    /// let archive = Archive::parse(
    ///     r#"<FirmwareArchive format="1.2">
    ///          <FirmwareImage product="B2"><Block address="2000">0102</Block></FirmwareImage>
    ///        </FirmwareArchive>"#,
    /// )
    /// .unwrap();
    /// let image = archive.find_image(0x1FFB, 0x00B2).unwrap();
    /// assert_eq!(image.blocks[0].data, [1, 2]);
    /// ```
    pub fn parse(document: &str) -> Result<Archive> {
        let document = roxmltree::Document::parse(document)
            .map_err(|e| ArchiveErrorKind::Xml(e.to_string()))?;
        let root = document.root_element();
        if root.tag_name().name() != "FirmwareArchive" {
            return Err(ArchiveErrorKind::InvalidRoot.into());
        }

        let format = root
            .attribute("format")
            .ok_or(ArchiveErrorKind::MissingFormat)?;
        if format.split('.').next() != Some(FORMAT_MAJOR) {
            return Err(ArchiveErrorKind::UnsupportedFormat(format.to_string()).into());
        }

        let images = children_named(root, "FirmwareImage")
            .enumerate()
            .map(|(i, node)| parse_image(i + 1, node))
            .collect::<Result<Vec<_>>>()?;
        if images.is_empty() {
            return Err(ArchiveErrorKind::NoImages.into());
        }

        Ok(Archive {
            name: root.attribute("name").unwrap_or_default().to_string(),
            images,
        })
    }

    /// Reads and parses an archive file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Archive> {
        let document = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ArchiveErrorKind::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Archive::parse(&document)
    }

    /// Returns the first image for the given USB IDs.
    pub fn find_image(&self, usb_vendor_id: u16, usb_product_id: u16) -> Option<&Image> {
        self.images
            .iter()
            .find(|i| i.usb_vendor_id == usb_vendor_id && i.usb_product_id == usb_product_id)
    }
}

fn children_named<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// Parses a hexadecimal number with an optional `0x` prefix.
fn parse_hex(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

fn parse_image(index: usize, node: roxmltree::Node<'_, '_>) -> Result<Image> {
    let product = node
        .attribute("product")
        .ok_or(ArchiveErrorKind::MissingProduct { image: index })?;
    let usb_product_id = parse_hex(product)
        .filter(|&id| id <= 0xFFFF)
        .ok_or_else(|| ArchiveErrorKind::InvalidProduct {
            image: index,
            value: product.to_string(),
        })? as u16;

    let upload_type = match node.attribute("uploadType") {
        None => UploadType::Standard,
        Some(name) => {
            UploadType::from_name(name).ok_or_else(|| ArchiveErrorKind::InvalidUploadType {
                image: index,
                value: name.to_string(),
            })?
        }
    };

    let blocks = children_named(node, "Block")
        .enumerate()
        .map(|(i, block)| parse_block(index, i + 1, block))
        .collect::<Result<Vec<_>>>()?;
    if blocks.is_empty() {
        return Err(ArchiveErrorKind::NoBlocks { image: index }.into());
    }

    Ok(Image {
        // Archives do not record the vendor.
        usb_vendor_id: USB_VENDOR_ID_POLOLU,
        usb_product_id,
        upload_type,
        blocks,
    })
}

fn parse_block(image: usize, block: usize, node: roxmltree::Node<'_, '_>) -> Result<Block> {
    let address = node
        .attribute("address")
        .ok_or(ArchiveErrorKind::MissingAddress { image, block })?;
    let address = parse_hex(address).ok_or_else(|| ArchiveErrorKind::InvalidAddress {
        image,
        block,
        value: address.to_string(),
    })?;

    let contents = node
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(ArchiveErrorKind::MissingContents { image, block })?;
    if contents.len() % 2 != 0 {
        return Err(ArchiveErrorKind::OddLength { image, block }.into());
    }

    let data = contents
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = (pair[0] as char).to_digit(16)?;
            let low = (pair[1] as char).to_digit(16)?;
            Some((high * 16 + low) as u8)
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or(ArchiveErrorKind::InvalidHexDigit { image, block })?;

    Ok(Block { address, data })
}
