use serde::Deserialize;

/// On-disk description of a driving course and its fleet.
#[derive(Debug, Deserialize)]
pub struct PlantModelDto {
    pub points: Vec<PointDto>,
    pub paths: Vec<PathDto>,
    #[serde(default)]
    pub vehicles: Vec<VehicleDto>,
}

#[derive(Debug, Deserialize)]
pub struct PointDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDto {
    pub name: String,
    pub source: String,
    pub destination: String,
    pub length: u64,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub energy_level: Option<u32>,
    #[serde(default)]
    pub acceptable_order_types: Vec<String>,
}
