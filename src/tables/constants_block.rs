//! Constants sub-block: program identity, transformer ratios and demand setup.

use crate::constants::MFG_TABLE_CONFIG;
use crate::error::PsemError;
use crate::tables::codec::{ascii, put_ascii, run_parser, AsciiField};
use bytes::{BufMut, BytesMut};
use nom::number::complete::{le_u16, le_u32, le_u8};

pub const CUSTOMER_ID_LEN: usize = 20;
pub const CONSTANTS_LEN: usize = 2 + CUSTOMER_ID_LEN + 2 + 2 + 4 + 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantsConfig {
    pub program_id: u16,
    pub customer_id: AsciiField<CUSTOMER_ID_LEN>,
    pub ct_ratio: u16,
    pub vt_ratio: u16,
    pub register_multiplier: u32,
    pub demand_interval_minutes: u8,
    pub demand_subintervals: u8,
    pub cold_load_pickup_minutes: u8,
}

impl ConstantsConfig {
    pub fn decode(bytes: &[u8]) -> Result<Self, PsemError> {
        run_parser(MFG_TABLE_CONFIG, CONSTANTS_LEN, bytes, |i| {
            let (i, program_id) = le_u16(i)?;
            let (i, customer_id) = ascii(i)?;
            let (i, ct_ratio) = le_u16(i)?;
            let (i, vt_ratio) = le_u16(i)?;
            let (i, register_multiplier) = le_u32(i)?;
            let (i, demand_interval_minutes) = le_u8(i)?;
            let (i, demand_subintervals) = le_u8(i)?;
            let (i, cold_load_pickup_minutes) = le_u8(i)?;
            Ok((
                i,
                ConstantsConfig {
                    program_id,
                    customer_id,
                    ct_ratio,
                    vt_ratio,
                    register_multiplier,
                    demand_interval_minutes,
                    demand_subintervals,
                    cold_load_pickup_minutes,
                },
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(CONSTANTS_LEN);
        buf.put_u16_le(self.program_id);
        put_ascii(&mut buf, &self.customer_id);
        buf.put_u16_le(self.ct_ratio);
        buf.put_u16_le(self.vt_ratio);
        buf.put_u32_le(self.register_multiplier);
        buf.put_u8(self.demand_interval_minutes);
        buf.put_u8(self.demand_subintervals);
        buf.put_u8(self.cold_load_pickup_minutes);
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_id_round_trip() {
        let constants = ConstantsConfig {
            program_id: 3,
            customer_id: "CAFÉ-01".into(),
            ..ConstantsConfig::default()
        };
        let bytes = constants.encode();
        assert_eq!(bytes.len(), CONSTANTS_LEN);

        let decoded = ConstantsConfig::decode(&bytes).unwrap();
        assert_eq!(decoded, constants);
        assert_eq!(decoded.customer_id.text(), "CAFÉ-01");
    }
}
