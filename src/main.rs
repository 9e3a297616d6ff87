use anyhow::Context;
use embassy_time::{Duration, Instant};
use polled_sensors::{
    leaf::LeafWetness,
    logger,
    publish::{JsonLines, Latest},
    rangefinder::Sen0590,
    sensor::PolledSensor,
    Channel, Component, I2cBus, I2cTransport, Protocol, Publish,
};
use std::{cmp::Reverse, io};

mod sim;

static LATEST: Latest = Latest::new();

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const TICK: std::time::Duration = std::time::Duration::from_millis(5);
const RUN_FOR: Duration = Duration::from_secs(10);

/// Sensors sharing the bus are triggered this far apart, so that only one
/// transaction is ever in flight on it.
const STAGGER: Duration = Duration::from_millis(600);

const TWO_PHASE_ADDR: u8 = 0x75;

fn main() -> anyhow::Result<()> {
    logger::init().context("failed to initialize logger")?;
    log::info!("polled sensors sim is go!");

    let bus: I2cBus<sim::SimBus> = shared_bus::BusManager::new(sim::SimBus::new(
        &[sen0590::DEFAULT_ADDR, TWO_PHASE_ADDR],
        23,
    ));

    let mut components: Vec<Box<dyn Component + '_>> = vec![
        Box::new(PolledSensor::new(
            LeafWetness::new(),
            I2cTransport::new(bus.acquire_i2c()),
            publisher(LeafWetness::NAME),
        )),
        Box::new(PolledSensor::new(
            Sen0590::new(),
            I2cTransport::new(bus.acquire_i2c()),
            publisher(Sen0590::NAME),
        )),
        Box::new(PolledSensor::with_config(
            Sen0590::new(),
            Sen0590::two_phase_config().with_address(TWO_PHASE_ADDR),
            I2cTransport::new(bus.acquire_i2c()),
            publisher(Sen0590::NAME),
        )),
    ];

    components.sort_by_key(|c| Reverse(c.setup_priority()));
    for component in &mut components {
        component.setup();
    }

    let start = Instant::now();
    let mut next_update: Vec<Instant> = (0..components.len() as u32)
        .map(|i| start + STAGGER * i)
        .collect();

    while start.elapsed() < RUN_FOR {
        let now = Instant::now();
        for (component, next) in components.iter_mut().zip(&mut next_update) {
            if now >= *next {
                component.update();
                *next += POLL_INTERVAL;
            }

            if let Err(error) = component.poll(now) {
                log::warn!("error polling {}: {error:?}", component.name());
            }
        }
        std::thread::sleep(TICK);
    }

    log::info!("latest: {LATEST}");
    for component in &components {
        log::info!("{}: {}", component.name(), component.status());
    }
    Ok(())
}

fn publisher(sensor: &'static str) -> impl FnMut(Channel, f32) {
    let mut json = JsonLines::new(sensor, io::stdout());
    move |channel, value| {
        let mut latest = &LATEST;
        latest.publish(channel, value);
        json.publish(channel, value);
    }
}
