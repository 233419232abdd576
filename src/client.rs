//! High-level GivEnergy client
//!
//! Issues one request frame at a time over a [`Transport`] and matches the
//! returned frame against it: register reads come back as `Vec<u16>`, and
//! device exceptions become typed errors. The adapter handles a single
//! transaction at a time, so the client is strictly sequential.

use tracing::{debug, warn};

use crate::config::GivEnergyConfig;
use crate::error::{GivEnergyError, GivResult};
use crate::frame::{encode_request, DecodedFrame, Function};
use crate::transport::{TcpTransport, Transport};

/// Request/response client over any frame transport
pub struct GivEnergyClient<T: Transport> {
    transport: T,
}

impl GivEnergyClient<TcpTransport> {
    /// Connect to the adapter described by `config`
    pub async fn connect(config: &GivEnergyConfig) -> GivResult<Self> {
        let transport = TcpTransport::connect(config).await?;
        Ok(Self { transport })
    }
}

impl<T: Transport> GivEnergyClient<T> {
    /// Client over an already-established transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Read `count` holding registers starting at `base`
    pub async fn read_holding_registers(&mut self, base: u16, count: u16) -> GivResult<Vec<u16>> {
        let frame = self.transaction(Function::ReadHolding, base, count).await?;
        Ok(frame.registers)
    }

    /// Read `count` input registers starting at `base`
    pub async fn read_input_registers(&mut self, base: u16, count: u16) -> GivResult<Vec<u16>> {
        let frame = self.transaction(Function::ReadInput, base, count).await?;
        Ok(frame.registers)
    }

    /// Write one holding register
    pub async fn write_single_register(&mut self, register: u16, value: u16) -> GivResult<()> {
        self.transaction(Function::WriteSingle, register, value)
            .await?;
        Ok(())
    }

    /// Close the underlying transport
    pub async fn close(&mut self) -> GivResult<()> {
        self.transport.close().await
    }

    /// One request/response exchange, validated against the request
    async fn transaction(
        &mut self,
        function: Function,
        base: u16,
        count_or_value: u16,
    ) -> GivResult<DecodedFrame> {
        let request = encode_request(function, base, count_or_value)?;
        debug!(
            "transaction: {:?} base={:#06x} count_or_value={}",
            function, base, count_or_value
        );

        self.transport.send_frame(&request).await?;
        let response = self.transport.next_frame().await?;

        if response.exception {
            return Err(GivEnergyError::Exception {
                function: response.function.code(),
            });
        }
        if response.function != function {
            return Err(GivEnergyError::Protocol(format!(
                "response function {:?} does not match request {:?}",
                response.function, function
            )));
        }
        if response.base_register != base {
            return Err(GivEnergyError::Protocol(format!(
                "response base register {:#06x} does not match request {:#06x}",
                response.base_register, base
            )));
        }
        if function.is_read() && response.registers.len() != count_or_value as usize {
            warn!(
                "short read: requested {} registers, received {}",
                count_or_value,
                response.registers.len()
            );
        }

        Ok(response)
    }
}
