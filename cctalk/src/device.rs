//! High-level device interface

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use cctalk_core::{Header, Message, MessageBuilder};
use cctalk_transport::{TcpTransport, TransactionExecutor, Transport};
use cctalk_types::{DeviceInfo, EventSnapshot};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};

/// ccTalk peripheral
///
/// Every command is one request/response transaction. Commands take `&self`
/// and may be issued from several tasks; transactions are serialized per
/// device.
///
/// # Examples
///
/// ```no_run
/// use cctalk::{Device, DeviceConfig};
///
/// #[tokio::main]
/// async fn main() -> cctalk::Result<()> {
///     let device = Device::tcp("192.168.1.50", 4001, DeviceConfig::new(40));
///
///     let info = device.initialise().await?;
///     println!("Device: {}", info);
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    config: DeviceConfig,
    executor: TransactionExecutor,
}

impl Device {
    /// Create a device on an existing transport
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, config: DeviceConfig) -> Self {
        let executor = TransactionExecutor::new(transport, config.checksum_type);
        Self { config, executor }
    }

    /// Create a device reached through a serial-over-IP bridge
    pub fn tcp(host: impl Into<String>, port: u16, config: DeviceConfig) -> Self {
        Self::new(Arc::new(TcpTransport::new(host, port)), config)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.executor.transport().is_open()
    }

    /// Open the transport
    pub async fn connect(&self) -> Result<()> {
        info!(
            "Connecting to device {} via {}...",
            self.config.address,
            self.executor.transport().remote_addr()
        );
        self.executor.transport().open().await?;
        info!("Connected");
        Ok(())
    }

    /// Close the transport
    pub async fn disconnect(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }

        info!("Disconnecting from device {}...", self.config.address);
        self.executor.transport().close().await?;
        info!("Disconnected");
        Ok(())
    }

    /// Send a command and return the device's response
    ///
    /// NAK and BUSY replies are reported as [`Error::UnexpectedResponse`].
    pub async fn request(&self, header: impl Into<u8>, data: impl Into<Bytes>) -> Result<Message> {
        self.ensure_connected()?;

        let request = MessageBuilder::new(self.config.checksum_type)
            .destination(self.config.address)
            .source(self.config.master_address)
            .header(header)
            .data(data)
            .build()?;

        let response = self
            .executor
            .transact(&request, self.config.read_timeout)
            .await?;

        if response.is_nak() || response.is_busy() {
            return Err(Error::UnexpectedResponse(format!(
                "{} answered {}",
                request,
                header_name(response.header())
            )));
        }

        Ok(response)
    }

    /// Simple poll (254), answered by an ACK
    pub async fn simple_poll(&self) -> Result<()> {
        let response = self.request(Header::SimplePoll, Bytes::new()).await?;
        expect_ack(&response, Header::SimplePoll)
    }

    /// Check the device answers a simple poll
    ///
    /// Only timeouts are retried, up to `liveness_attempts` polls.
    ///
    /// # Errors
    ///
    /// [`Error::Unreachable`] once every attempt timed out; any other
    /// failure is returned as is.
    pub async fn check_alive(&self) -> Result<()> {
        let attempts = self.config.liveness_attempts;

        for attempt in 1..=attempts {
            match self.simple_poll().await {
                Ok(()) => {
                    debug!("Device {} alive (attempt {})", self.config.address, attempt);
                    return Ok(());
                }
                Err(Error::Transaction(err)) if err.is_timeout() => {
                    warn!(
                        "Simple poll {}/{} to device {} timed out",
                        attempt, attempts, self.config.address
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(Error::Unreachable { attempts })
    }

    pub async fn request_manufacturer_id(&self) -> Result<String> {
        self.request_ascii(Header::RequestManufacturerId).await
    }

    pub async fn request_equipment_category_id(&self) -> Result<String> {
        self.request_ascii(Header::RequestEquipmentCategoryId).await
    }

    pub async fn request_product_code(&self) -> Result<String> {
        self.request_ascii(Header::RequestProductCode).await
    }

    pub async fn request_build_code(&self) -> Result<String> {
        self.request_ascii(Header::RequestBuildCode).await
    }

    /// Get device identification
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let info = DeviceInfo::new(
            self.config.address,
            self.request_manufacturer_id().await?,
            self.request_equipment_category_id().await?,
            self.request_product_code().await?,
            self.request_build_code().await?,
        );

        debug!("Device info: {}", info);

        Ok(info)
    }

    /// Run the device self check and return its fault code (0: no fault)
    pub async fn perform_self_check(&self) -> Result<u8> {
        let response = self.request(Header::PerformSelfCheck, Bytes::new()).await?;

        // Some devices answer a plain ACK when no fault is found
        if response.is_ack() {
            return Ok(0);
        }

        match response.data().as_ref() {
            [fault] | [fault, _] => Ok(*fault),
            data => Err(Error::UnexpectedResponse(format!(
                "self check answered {} data byte(s)",
                data.len()
            ))),
        }
    }

    /// Request the master inhibit status
    ///
    /// Returns `true` in normal operation and `false` while the master
    /// inhibit is active (no bill accepted).
    pub async fn request_master_inhibit_status(&self) -> Result<bool> {
        let response = self
            .request(Header::RequestMasterInhibitStatus, Bytes::new())
            .await?;

        match response.data().as_ref() {
            [status] => Ok(status & 0x01 == 0x01),
            data => Err(Error::UnexpectedResponse(format!(
                "master inhibit status answered {} data byte(s)",
                data.len()
            ))),
        }
    }

    /// Set the master inhibit status, `true` for normal operation
    pub async fn modify_master_inhibit_status(&self, accepting: bool) -> Result<()> {
        debug!(
            "Setting master inhibit of device {} to {}",
            self.config.address,
            if accepting { "normal operation" } else { "inhibited" }
        );

        let response = self
            .request(
                Header::ModifyMasterInhibitStatus,
                Bytes::copy_from_slice(&[accepting as u8]),
            )
            .await?;
        expect_ack(&response, Header::ModifyMasterInhibitStatus)
    }

    /// Read the device event buffer
    pub async fn read_buffered_events(&self) -> Result<EventSnapshot> {
        let response = self
            .request(Header::ReadBufferedBillEvents, Bytes::new())
            .await?;
        Ok(EventSnapshot::from_response_data(response.data())?)
    }

    /// Bring the device up: connect, check it answers, run its self check
    ///
    /// # Errors
    ///
    /// [`Error::SelfCheckFault`] if the self check reports a fault.
    pub async fn initialise(&self) -> Result<DeviceInfo> {
        if !self.is_connected() {
            self.connect().await?;
        }

        self.check_alive().await?;

        let fault = self.perform_self_check().await?;
        if fault != 0 {
            return Err(Error::SelfCheckFault(fault));
        }

        let info = self.device_info().await?;
        info!("Initialised {}", info);

        Ok(info)
    }

    // Helper methods

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn request_ascii(&self, header: Header) -> Result<String> {
        let response = self.request(header, Bytes::new()).await?;
        let text = String::from_utf8_lossy(response.data());
        Ok(text.trim_end_matches(['\0', ' ']).to_string())
    }
}

fn expect_ack(response: &Message, command: Header) -> Result<()> {
    if response.is_ack() {
        return Ok(());
    }
    Err(Error::UnexpectedResponse(format!(
        "expected ACK to {}, got {}",
        command, response
    )))
}

fn header_name(header: u8) -> String {
    Header::try_from(header)
        .map(|h| h.to_string())
        .unwrap_or_else(|_| header.to_string())
}
