//! # GivEnergy Modbus - Framer and Client for the GivEnergy TCP Variant
//!
//! GivEnergy solar inverters expose their registers through a data adapter
//! speaking a non-conformant variant of Modbus TCP: the MBAP header fields
//! are fixed sentinels, the length field carries a +2 bias, and every PDU
//! is wrapped in a serial number, a padding byte and a trailing CRC-16.
//! This crate frames that wire format and drives request/response
//! transactions over it.
//!
//! ## Supported Function Codes
//!
//! | Code | Function |
//! |------|----------|
//! | 0x03 | Read Holding Registers |
//! | 0x04 | Read Input Registers |
//! | 0x06 | Write Single Register |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use givenergy_modbus::{GivEnergyClient, GivEnergyConfig, GivResult};
//!
//! #[tokio::main]
//! async fn main() -> GivResult<()> {
//!     let config = GivEnergyConfig::new("192.168.1.60");
//!     let mut client = GivEnergyClient::connect(&config).await?;
//!
//!     // Holding registers carry inverter configuration
//!     let holding = client.read_holding_registers(0x0000, 60).await?;
//!     println!("serial-ish registers: {:?}", &holding[..6]);
//!
//!     // Input registers carry live telemetry
//!     let input = client.read_input_registers(0x0000, 60).await?;
//!     println!("telemetry: {:?}", &input[..8]);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! The framer is usable on its own, without the client or any I/O:
//!
//! ```rust
//! use givenergy_modbus::frame::{encode_request, FrameDecoder, Function};
//!
//! let request = encode_request(Function::ReadHolding, 0x0020, 6).unwrap();
//! assert_eq!(request.len(), 27);
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.feed(&request);
//! let frame = decoder.try_extract().unwrap().unwrap();
//! assert_eq!(frame.base_register, 0x0020);
//! ```

// ============================================================================
// Modules
// ============================================================================

/// Error types and result handling
pub mod error;

/// GivEnergy wire-protocol constants
pub mod constants;

/// Frame encoder and incremental decoder
pub mod frame;

/// Frame transport over TCP
pub mod transport;

/// Request/response client
pub mod client;

/// Session configuration
pub mod config;

/// Tracing initialisation helper
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::GivEnergyClient;
pub use config::GivEnergyConfig;
pub use error::{FrameError, GivEnergyError, GivResult};
pub use frame::{encode_request, DecodedFrame, FrameDecoder, Function, RecoveryStrategy};
pub use transport::{TcpTransport, Transport};

/// Default TCP port of the GivEnergy data adapter
pub const DEFAULT_TCP_PORT: u16 = 8899;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
