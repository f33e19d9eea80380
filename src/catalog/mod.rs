//! Reference-data catalogs used to fill option lists.
//!
//! A fetch failure never blocks editing: the affected list simply stays
//! empty and a warning is logged.

mod client;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use client::HttpCatalog;

macro_rules! data_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum DataType {
            $($variant),+
        }

        impl DataType {
            pub const ALL: &'static [DataType] = &[$(DataType::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(DataType::$variant => $name),+
                }
            }
        }
    };
}

data_types! {
    YieldTypes => "yield-types",
    CollectionTypes => "collection-types",
    Effects => "effects",
    RequirementTypes => "requirement-types",
    CoreClasses => "core-classes",
    Domains => "domains",
    FormationClasses => "formation-classes",
    UnitMovementClasses => "unit-movement-classes",
    Tags => "tags",
    DistrictTypes => "district-types",
    AdvisoryClassTypes => "advisory-class-types",
    Ages => "ages",
    ProgressionTrees => "progression-trees",
    TerrainTypes => "terrain-types",
    BiomeTypes => "biome-types",
    FeatureTypes => "feature-types",
    ConstructibleClasses => "constructible-classes",
    Civilizations => "civilizations",
    Leaders => "leaders",
    Wonders => "wonders",
    BuildingCultures => "building-cultures",
    BuildingCulturesPalace => "building-cultures-palace",
    BuildingCulturesBases => "building-cultures-bases",
    UnitCultures => "unit-cultures",
    Modifiers => "modifiers",
    Quotes => "quotes",
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown catalog data type `{0}`")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase().replace('_', "-");
        DataType::ALL
            .iter()
            .copied()
            .find(|data_type| data_type.as_str() == wanted)
            .ok_or_else(|| UnknownDataType(raw.to_string()))
    }
}

/// One catalog row. Only `id` is interpreted; everything else rides along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub values: Vec<CatalogEntry>,
}

/// Catalog rows fetched so far, keyed by data type.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: IndexMap<DataType, Vec<CatalogEntry>>,
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the outcome of a fetch. Errors degrade to an empty list.
    pub fn ingest(
        &mut self,
        data_type: DataType,
        fetched: anyhow::Result<CatalogResponse>,
    ) -> &[CatalogEntry] {
        let values = match fetched {
            Ok(response) => {
                let values: Vec<CatalogEntry> = response
                    .values
                    .into_iter()
                    .filter(|entry| !entry.id.trim().is_empty())
                    .collect();
                debug!(%data_type, count = values.len(), "catalog loaded");
                values
            }
            Err(err) => {
                warn!(%data_type, error = %format!("{err:#}"), "catalog unavailable, using empty list");
                Vec::new()
            }
        };
        self.entries.insert(data_type, values);
        self.entries(data_type)
    }

    pub fn is_loaded(&self, data_type: DataType) -> bool {
        self.entries.contains_key(&data_type)
    }

    pub fn entries(&self, data_type: DataType) -> &[CatalogEntry] {
        self.entries
            .get(&data_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn ids(&self, data_type: DataType) -> Vec<&str> {
        self.entries(data_type)
            .iter()
            .map(|entry| entry.id.as_str())
            .collect()
    }

    pub fn contains(&self, data_type: DataType, id: &str) -> bool {
        self.entries(data_type).iter().any(|entry| entry.id == id)
    }
}
