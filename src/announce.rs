//! Home Assistant entities for the enabled monitors.

use mqttbot_adapters::{cityflitzer, nextbike};
use mqttbot_sdk::discovery::{Device, SensorConfig};
use mqttbot_sdk::{suffix, Publish, PublishError, Topic};
use tracing::info;

use crate::settings::Settings;

/// Entity configs for every enabled monitor.
pub fn sensors(settings: &Settings) -> Vec<SensorConfig> {
    let device = Device::mqttbot(&settings.discovery.device_name);
    let id = |name: &str| format!("{}_{}", settings.discovery.device_name, name);
    let mut sensors = Vec::new();

    if settings.raid.enabled {
        let topic = Topic::new(&settings.raid.topic_prefix);
        sensors.push(SensorConfig::binary_sensor(
            "RAID healthy",
            id("raid_healthy"),
            topic.join(suffix::HEALTHY),
            device.clone(),
        ));
        sensors.push(SensorConfig::sensor(
            "RAID faulty devices",
            id("raid_faulty_devices"),
            topic.join(suffix::FAULTY_DEVICES),
            device.clone(),
        ));
        sensors.push(
            SensorConfig::sensor(
                "RAID error",
                id("raid_error"),
                topic.join(suffix::ERROR),
                device.clone(),
            )
            .with_entity_category("diagnostic"),
        );
        sensors.push(heartbeat("RAID last update", id("raid_update_date"), &topic, &device));
    }

    if settings.nextbike.enabled {
        let topic = Topic::new(&settings.nextbike.topic_prefix);
        sensors.push(SensorConfig::binary_sensor(
            "E-cargo bike available",
            id("nextbike_e_cargo_available"),
            topic.join(nextbike::FLAG_SUFFIX),
            device.clone(),
        ));
        sensors.push(heartbeat("Nextbike last update", id("nextbike_update_date"), &topic, &device));
    }

    if settings.cityflitzer.enabled {
        let topic = Topic::new(&settings.cityflitzer.topic_prefix);
        sensors.push(SensorConfig::binary_sensor(
            "Cityflitzer nearby",
            id("cityflitzer_nearby"),
            topic.join(cityflitzer::FLAG_SUFFIX),
            device.clone(),
        ));
        sensors.push(heartbeat("Cityflitzer last update", id("cityflitzer_update_date"), &topic, &device));
    }

    sensors
}

fn heartbeat(name: &str, unique_id: String, topic: &Topic, device: &Device) -> SensorConfig {
    SensorConfig::sensor(name, unique_id, topic.join(suffix::UPDATE_DATE), device.clone())
        .with_device_class("timestamp")
        .with_entity_category("diagnostic")
}

/// Publish the retained entity configs.
pub async fn announce(settings: &Settings, publisher: &dyn Publish) -> Result<(), PublishError> {
    let prefix = &settings.discovery.prefix;
    let sensors = sensors(settings);

    for sensor in &sensors {
        publisher.publish(sensor.to_fact(prefix)?).await?;
    }

    info!(entities = sensors.len(), prefix = %prefix, "announced Home Assistant entities");
    Ok(())
}
