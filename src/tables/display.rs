//! Display sub-block: default digit format, scroll timing and the list of
//! displayed quantities.

use crate::constants::MFG_TABLE_CONFIG;
use crate::error::PsemError;
use crate::tables::codec::{run_parser, DigitFormat};
use crate::tables::layout::MeterLayout;
use bytes::{BufMut, BytesMut};
use nom::{
    multi::count,
    number::complete::{le_u16, le_u32, le_u8},
    IResult,
};

/// Encoded size of one display item.
pub const DISPLAY_ITEM_LEN: usize = 7;

/// One displayed quantity. An item with LID 0 is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayItem {
    pub lid: u32,
    pub display_id: u16,
    pub format: DigitFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub default_format: DigitFormat,
    pub scroll_seconds: u8,
    /// Number of items in use, as recorded by the device.
    pub item_count: u8,
    /// All `display_items` slots.
    pub items: Vec<DisplayItem>,
}

fn display_item(i: &[u8]) -> IResult<&[u8], DisplayItem> {
    let (i, lid) = le_u32(i)?;
    let (i, display_id) = le_u16(i)?;
    let (i, format) = le_u8(i)?;
    Ok((
        i,
        DisplayItem {
            lid,
            display_id,
            format: DigitFormat::from_byte(format),
        },
    ))
}

impl DisplayConfig {
    /// Items actually in use.
    pub fn active_items(&self) -> &[DisplayItem] {
        &self.items[..usize::from(self.item_count).min(self.items.len())]
    }

    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        run_parser(MFG_TABLE_CONFIG, layout.display_len(), bytes, |i| {
            let (i, default_format) = le_u8(i)?;
            let (i, scroll_seconds) = le_u8(i)?;
            let (i, item_count) = le_u8(i)?;
            let (i, items) = count(display_item, layout.display_items)(i)?;
            Ok((
                i,
                DisplayConfig {
                    default_format: DigitFormat::from_byte(default_format),
                    scroll_seconds,
                    item_count,
                    items,
                },
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(3 + self.items.len() * DISPLAY_ITEM_LEN);
        buf.put_u8(self.default_format.to_byte());
        buf.put_u8(self.scroll_seconds);
        buf.put_u8(self.item_count);
        for item in &self.items {
            buf.put_u32_le(item.lid);
            buf.put_u16_le(item.display_id);
            buf.put_u8(item.format.to_byte());
        }
        buf.to_vec()
    }
}
