//! Bill validator event polling example
//!
//! Set `CCTALK_BRIDGE` to the `host:port` of a serial-over-IP bridge and
//! `CCTALK_ADDRESS` to the validator address (default 40).

use std::sync::Arc;
use std::time::Duration;

use cctalk::constants::DEFAULT_BILL_VALIDATOR_ADDRESS;
use cctalk::{
    Device, DeviceConfig, Error, EventListener, EventLoss, EventPoller, EventReconciler,
    EventRecord,
};
use tracing_subscriber::EnvFilter;

struct PrintingListener;

impl EventListener for PrintingListener {
    fn on_new_event(&mut self, event: &EventRecord) {
        match event.bill_type() {
            Ok(bill) => println!("Bill type {} ({:?})", bill, event.kind()),
            Err(_) => println!("{:?}: {:?}", event.category(), event.kind()),
        }
    }

    fn on_lost_events(&mut self, loss: &EventLoss) {
        println!(
            "Lost {} event(s) between counters {} and {}",
            loss.lost_count,
            loss.previous.counter(),
            loss.current.counter()
        );
    }

    fn on_poll_error(&mut self, error: &Error) {
        println!("Poll failed: {}", error);
    }
}

#[tokio::main]
async fn main() -> cctalk::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let bridge = std::env::var("CCTALK_BRIDGE").unwrap_or_else(|_| "192.168.1.50:4001".to_string());
    let address = std::env::var("CCTALK_ADDRESS")
        .ok()
        .and_then(|a| a.parse().ok())
        .unwrap_or(DEFAULT_BILL_VALIDATOR_ADDRESS);

    let (host, port) = bridge.rsplit_once(':').unwrap_or((bridge.as_str(), "4001"));
    let port = port.parse().unwrap_or(4001);

    let config = DeviceConfig::new(address).with_poll_period(Duration::from_millis(200));
    let device = Arc::new(Device::tcp(host, port, config));

    let info = device.initialise().await?;
    println!("Device: {}", info);

    device.modify_master_inhibit_status(true).await?;
    println!("Accepting bills for 60 seconds...");

    let mut reconciler = EventReconciler::from_config(device.config());
    reconciler.add_listener(Box::new(PrintingListener));

    let poller = EventPoller::for_device(device.clone(), reconciler);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let reconciler = poller.stop(Duration::from_secs(2)).await?;
    println!("Last event counter: {:?}", reconciler.last_counter());

    device.modify_master_inhibit_status(false).await?;
    device.disconnect().await?;

    Ok(())
}
