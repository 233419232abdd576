//! GivEnergy protocol constants
//!
//! The GivEnergy inverter speaks a vendor variant of Modbus TCP: the MBAP
//! header fields are repurposed as fixed sentinels, and the length field
//! carries a fixed +2 bias left over from folding the unit-id and
//! function-id bytes into the header.

// ============================================================================
// Frame Layout Constants
// ============================================================================

/// Fixed pseudo-MBAP header length
/// Format: h1 sentinel(4) + length(2) + h2 sentinel(2) = 8 bytes
pub const HEADER_LEN: usize = 8;

/// First header sentinel (bytes 0..4)
/// The standard MBAP transaction-id and protocol-id fields, fixed by the
/// vendor to 0x5959 and 0x0001
pub const H1_SENTINEL: u32 = 0x5959_0001;

/// Second header sentinel (bytes 6..8)
/// The standard MBAP unit-id and function-id bytes, fixed to 0x01 and 0x02
pub const H2_SENTINEL: u16 = 0x0102;

/// Bias carried by the header length field
/// The declared length counts the unit-id and function-id bytes even though
/// they sit inside the 8-byte header: inner frame length = length field - 2
pub const LEN_FIELD_BIAS: u16 = 2;

/// Length of the data-adapter serial number field
pub const SERIAL_LEN: usize = 10;

/// Serial number placed in outgoing requests (any 10 ASCII bytes accepted)
pub const REQUEST_SERIAL: &[u8; SERIAL_LEN] = b"AB1234G567";

/// Padding byte written after the serial number (semantics unknown,
/// passed through unvalidated on decode)
pub const PAD_BYTE: u8 = 0x00;

/// Slave address used for all requests
/// 0x11 addresses the inverter directly but the cloud systems interfere;
/// 0x32 and up address the batteries
pub const SLAVE_ADDRESS: u8 = 0x32;

// ============================================================================
// Frame Size Limits
// ============================================================================

/// Minimum inner-frame length
/// serial(10) + pad(1) + addr(1) + func(1) + data(4) + crc(2): every valid
/// frame shape carries at least a 4-byte data section (base + count for
/// read requests, register + value for writes)
pub const MIN_INNER_LEN: usize = SERIAL_LEN + 1 + 1 + 1 + 4 + 2;

/// Upper bound on a complete frame (header + inner)
///
/// Calculation for the largest legal read response:
/// - header: 8 bytes
/// - serial(10) + pad(1) + addr(1) + func(1)
/// - data: inverter serial(10) + base(2) + count(2) + 125 registers x 2
/// - crc: 2 bytes
/// - total: 8 + 279 = 287 bytes; 512 provides safety margin
pub const MAX_FRAME_LEN: usize = 512;

/// Maximum number of registers in a single read request
///
/// Inherited from the standard Modbus response PDU limit:
/// 1 + 1 + (N x 2) <= 253, therefore N <= 125
pub const MAX_READ_REGISTERS: u16 = 125;

/// Transport receive buffer size (one full frame plus margin)
pub const READ_BUFFER_SIZE: usize = MAX_FRAME_LEN;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Bit set on the function code of device exception responses
pub const EXCEPTION_BIT: u8 = 0x80;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout_constants() {
        assert_eq!(HEADER_LEN, 8);
        assert_eq!(H1_SENTINEL.to_be_bytes(), [0x59, 0x59, 0x00, 0x01]);
        assert_eq!(H2_SENTINEL.to_be_bytes(), [0x01, 0x02]);
        assert_eq!(REQUEST_SERIAL.len(), SERIAL_LEN);
    }

    #[test]
    fn test_frame_size_limits() {
        // Smallest valid frame: read request shape
        assert_eq!(MIN_INNER_LEN, 19);

        // Largest legal read response must fit the cap
        let max_response_inner =
            SERIAL_LEN + 1 + 1 + 1 + (SERIAL_LEN + 2 + 2 + MAX_READ_REGISTERS as usize * 2) + 2;
        assert!(HEADER_LEN + max_response_inner <= MAX_FRAME_LEN);
    }
}
