use async_trait::async_trait;
use uuid::Uuid;
use verdant_core::zones::{DeliveryZone, ZoneDirectory};

/// Zone directory backed by a fixed list. An address matches a zone when
/// it contains the zone's city name, case-insensitively; anything else
/// is out-of-zone and needs admin pricing.
pub struct MemoryZoneDirectory {
    zones: Vec<DeliveryZone>,
}

impl MemoryZoneDirectory {
    pub fn new(zones: Vec<DeliveryZone>) -> Self {
        Self { zones }
    }

    pub fn with_zone(name: &str, price_minor: i64) -> Self {
        Self::new(vec![DeliveryZone {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_minor,
        }])
    }
}

#[async_trait]
impl ZoneDirectory for MemoryZoneDirectory {
    async fn lookup_zone(
        &self,
        address: &str,
    ) -> Result<Option<DeliveryZone>, Box<dyn std::error::Error + Send + Sync>> {
        let address = address.to_lowercase();
        Ok(self
            .zones
            .iter()
            .find(|z| address.contains(&z.name.to_lowercase()))
            .cloned())
    }
}
