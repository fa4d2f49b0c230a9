//! Built-in frame kinds (panic-free).
//!
//! Parsing rules:
//! - Never index the payload; read through `Buf` after a `remaining()` check.
//! - 16-bit quantities are big-endian; scaled values use a 0.1 fixed point.

use bytes::Buf;
use serde::Serialize;

use crate::decoder::{DecodedReading, FrameDecoder};
use crate::error::{GatewayError, Result};

/// Battery management system status frame.
pub const BATTERY_FRAME_ID: u32 = 0x120;
/// Motor controller status frame.
pub const MOTOR_FRAME_ID: u32 = 0x300;

const BATTERY_MIN_LEN: usize = 8;
const MOTOR_MIN_LEN: usize = 8;

/// Temperatures in motor frames are sent with a +40 offset.
const MOTOR_TEMP_OFFSET: i16 = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    pub current_amps: f64,
    pub voltage_volts: f64,
    pub state_of_charge_percent: u8,
    pub state_of_health_percent: u8,
    pub temperature_celsius: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorReading {
    pub speed_rpm: u16,
    pub torque_newton_meters: f64,
    pub motor_temperature_celsius: i16,
    pub controller_temperature_celsius: i16,
}

fn deci(raw: u16) -> f64 {
    f64::from(raw) / 10.0
}

fn require_len(kind: &'static str, buf: &[u8], expected: usize) -> Result<()> {
    if buf.remaining() < expected {
        return Err(GatewayError::InvalidPayloadLength {
            kind,
            expected,
            actual: buf.remaining(),
        });
    }
    Ok(())
}

/// Layout: `[volt_hi, volt_lo, cur_hi, cur_lo, temp, reserved, soc, soh]`.
#[derive(Debug, Default)]
pub struct BatteryDecoder;

impl FrameDecoder for BatteryDecoder {
    fn frame_id(&self) -> u32 {
        BATTERY_FRAME_ID
    }

    fn kind(&self) -> &'static str {
        "battery"
    }

    fn decode(&self, payload: &[u8]) -> Result<DecodedReading> {
        let mut buf = payload;
        require_len(self.kind(), buf, BATTERY_MIN_LEN)?;

        let voltage = buf.get_u16();
        let current = buf.get_u16();
        let temperature = buf.get_u8();
        buf.advance(1);
        let soc = buf.get_u8();
        let soh = buf.get_u8();

        Ok(DecodedReading::Battery(BatteryReading {
            current_amps: deci(current),
            voltage_volts: deci(voltage),
            state_of_charge_percent: soc,
            state_of_health_percent: soh,
            temperature_celsius: i16::from(temperature),
        }))
    }
}

/// Layout: `[rpm_hi, rpm_lo, trq_hi, trq_lo, -, -, ctrl_temp+40, motor_temp+40]`.
#[derive(Debug, Default)]
pub struct MotorControllerDecoder;

impl FrameDecoder for MotorControllerDecoder {
    fn frame_id(&self) -> u32 {
        MOTOR_FRAME_ID
    }

    fn kind(&self) -> &'static str {
        "motorController"
    }

    fn decode(&self, payload: &[u8]) -> Result<DecodedReading> {
        let mut buf = payload;
        require_len(self.kind(), buf, MOTOR_MIN_LEN)?;

        let speed = buf.get_u16();
        let torque = buf.get_u16();
        buf.advance(2);
        let controller_temp = i16::from(buf.get_u8()) - MOTOR_TEMP_OFFSET;
        let motor_temp = i16::from(buf.get_u8()) - MOTOR_TEMP_OFFSET;

        Ok(DecodedReading::MotorController(MotorReading {
            speed_rpm: speed,
            torque_newton_meters: deci(torque),
            motor_temperature_celsius: motor_temp,
            controller_temperature_celsius: controller_temp,
        }))
    }
}
