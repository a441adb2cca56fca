//! Simulated peripherals for unit tests

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cctalk_core::{ChecksumType, CrcMessage, Message};
use cctalk_transport::StreamTransport;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::{Device, DeviceConfig};

/// Answer every request on `port` with `respond`; `None` stays silent
pub fn spawn_device<F>(mut port: DuplexStream, checksum_type: ChecksumType, respond: F)
where
    F: Fn(&Message) -> Option<Vec<u8>> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let mut head = [0u8; 2];
            if port.read_exact(&mut head).await.is_err() {
                break;
            }
            let mut rest = vec![0u8; head[1] as usize + 3];
            if port.read_exact(&mut rest).await.is_err() {
                break;
            }

            let frame = [head.to_vec(), rest].concat();
            let request = Message::parse(checksum_type, &frame).unwrap();
            if let Some(reply) = respond(&request) {
                port.write_all(&reply).await.unwrap();
            }
        }
    });
}

/// CRC frame from the device to the host carrying `data`
pub fn reply(data: &[u8]) -> Option<Vec<u8>> {
    let message = CrcMessage::new(1, 0, Bytes::copy_from_slice(data)).unwrap();
    Some(message.encode().to_vec())
}

/// Buffered events payload after `counter` events, event n being a credit
/// of bill type n
pub fn event_buffer(counter: u8) -> Vec<u8> {
    let mut data = vec![counter];
    for i in 0..5u8 {
        match counter.checked_sub(i) {
            Some(n) if n > 0 => data.extend([n, 0]),
            _ => data.extend([0, 0]),
        }
    }
    data
}

/// Connected device at address 40 backed by `respond`
pub async fn device_with<F>(respond: F) -> Device
where
    F: Fn(&Message) -> Option<Vec<u8>> + Send + 'static,
{
    let config = DeviceConfig::new(40).with_read_timeout(Duration::from_millis(100));
    device_with_config(config, respond).await
}

pub async fn device_with_config<F>(config: DeviceConfig, respond: F) -> Device
where
    F: Fn(&Message) -> Option<Vec<u8>> + Send + 'static,
{
    let (ours, theirs) = tokio::io::duplex(256);
    spawn_device(theirs, config.checksum_type, respond);

    let device = Device::new(Arc::new(StreamTransport::from_stream(ours, "bench")), config);
    device.connect().await.unwrap();
    device
}
