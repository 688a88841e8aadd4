//! Geographic point value, backed by `google.type.LatLng` on the wire.

/// A point on the surface of the Earth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Convert from the generated `LatLng` message.
    pub fn from_proto(latlng: crate::pb::google::r#type::LatLng) -> Self {
        Self {
            latitude: latlng.latitude,
            longitude: latlng.longitude,
        }
    }

    /// Convert to the generated `LatLng` message.
    pub fn into_proto(self) -> crate::pb::google::r#type::LatLng {
        crate::pb::google::r#type::LatLng {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl PartialOrd for GeoPoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        (self.latitude, self.longitude).partial_cmp(&(other.latitude, other.longitude))
    }
}
