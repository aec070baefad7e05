//! LID to table-location mapping and transport-backed access.

use crate::constants::{
    MFG_TABLE_DIAGNOSTICS, MFG_TABLE_VQ_COUNTERS, STD_TABLE_CURRENT_REGISTER_DATA,
};
use crate::error::PsemError;
use crate::lid::{Lid, LidClass};
use crate::psem::transport::{PsemResponse, Transport, TransportError};
use crate::tables::codec::{field, FieldWidth};
use crate::tables::layout::MeterLayout;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Where a LID's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LidLocation {
    pub table: u16,
    pub offset: u32,
    pub width: FieldWidth,
}

impl LidLocation {
    fn end(&self) -> u32 {
        self.offset + self.width.len() as u32
    }
}

/// Maps a LID to its table location on a meter with `layout`.
pub fn resolve(layout: &MeterLayout, lid: Lid) -> Result<LidLocation, PsemError> {
    let invalid = || PsemError::InvalidLid(lid.0);
    let class = lid.class().ok_or_else(invalid)?;
    let (quantity, phase, rate) = (u32::from(lid.quantity()), lid.phase(), lid.rate());
    let slots = u32::from(layout.phase_slots);

    match class {
        LidClass::Energy | LidClass::Demand => {
            let limit = match class {
                LidClass::Energy => layout.energy_quantities,
                _ => layout.demand_quantities,
            };
            if quantity >= u32::from(limit) || phase >= layout.phase_slots || rate > layout.tiers {
                return Err(invalid());
            }
            let demand_base = match class {
                LidClass::Energy => 0,
                _ => u32::from(layout.energy_quantities) * slots * 4,
            };
            Ok(LidLocation {
                table: STD_TABLE_CURRENT_REGISTER_DATA,
                offset: 1
                    + u32::from(rate) * layout.register_block_len() as u32
                    + demand_base
                    + (quantity * slots + u32::from(phase)) * 4,
                width: FieldWidth::U32,
            })
        }
        LidClass::Diagnostic => {
            if quantity >= u32::from(layout.diagnostic_counters) || phase != 0 || rate != 0 {
                return Err(invalid());
            }
            Ok(LidLocation {
                table: MFG_TABLE_DIAGNOSTICS,
                offset: quantity * 2,
                width: FieldWidth::U16,
            })
        }
        LidClass::VoltageQuality => {
            if quantity >= u32::from(layout.vq_quantities) || phase >= layout.phase_slots || rate != 0 {
                return Err(invalid());
            }
            Ok(LidLocation {
                table: MFG_TABLE_VQ_COUNTERS,
                offset: (quantity * slots + u32::from(phase)) * 4,
                width: FieldWidth::U32,
            })
        }
    }
}

fn decode_at(bytes: &[u8], at: usize, width: FieldWidth) -> Option<u32> {
    let slice = bytes.get(at..at + width.len())?;
    field(width)(slice).ok().map(|(_, v)| v)
}

/// Reads and writes LID values through a borrowed transport.
pub struct LidResolver<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    layout: &'static MeterLayout,
}

impl<'a, T: Transport + ?Sized> LidResolver<'a, T> {
    pub fn new(transport: &'a mut T, layout: &'static MeterLayout) -> Self {
        Self { transport, layout }
    }

    pub fn read(&mut self, lid: Lid) -> Result<u32, PsemError> {
        let loc = resolve(self.layout, lid)?;
        let bytes = self
            .transport
            .read_table_range(loc.table, loc.offset, loc.width.len())
            .map_err(|response| PsemError::LidRead { lid: lid.0, response })?;
        decode_at(&bytes, 0, loc.width).ok_or(PsemError::LidRead {
            lid: lid.0,
            response: TransportError::Response(PsemResponse::Err),
        })
    }

    /// Reads several LIDs with one range read per table. Values are returned
    /// in request order.
    pub fn read_many(&mut self, lids: &[Lid]) -> Result<Vec<u32>, PsemError> {
        let locations = lids
            .iter()
            .map(|&lid| resolve(self.layout, lid))
            .collect::<Result<Vec<_>, _>>()?;

        let mut spans: BTreeMap<u16, (u32, u32, Lid)> = BTreeMap::new();
        for (loc, &lid) in locations.iter().zip(lids) {
            spans
                .entry(loc.table)
                .and_modify(|(start, end, _)| {
                    *start = (*start).min(loc.offset);
                    *end = (*end).max(loc.end());
                })
                .or_insert((loc.offset, loc.end(), lid));
        }

        let mut blocks: BTreeMap<u16, (u32, Vec<u8>)> = BTreeMap::new();
        for (table, (start, end, first)) in spans {
            debug!("Batched LID read: table {} bytes {}..{}", table, start, end);
            let bytes = self
                .transport
                .read_table_range(table, start, (end - start) as usize)
                .map_err(|response| {
                    warn!("LID read of table {} failed: {}", table, response);
                    PsemError::LidRead { lid: first.0, response }
                })?;
            blocks.insert(table, (start, bytes));
        }

        locations
            .iter()
            .zip(lids)
            .map(|(loc, lid)| {
                blocks
                    .get(&loc.table)
                    .and_then(|(start, bytes)| decode_at(bytes, (loc.offset - start) as usize, loc.width))
                    .ok_or(PsemError::LidRead {
                        lid: lid.0,
                        response: TransportError::Response(PsemResponse::Err),
                    })
            })
            .collect()
    }

    /// Presets a counter LID.
    pub fn write(&mut self, lid: Lid, value: u32) -> Result<(), PsemError> {
        let loc = resolve(self.layout, lid)?;
        if !lid.class().map_or(false, LidClass::is_writable) {
            return Err(PsemError::LidNotWritable(lid.0));
        }
        if value > loc.width.max() {
            return Err(PsemError::InvalidField {
                field: "lid_value",
                value: u64::from(value),
            });
        }
        let bytes = value.to_le_bytes();
        match self
            .transport
            .write_table_range(loc.table, loc.offset, &bytes[..loc.width.len()])?
        {
            PsemResponse::Ok => Ok(()),
            resp => Err(PsemError::Transport(TransportError::Response(resp))),
        }
    }
}
