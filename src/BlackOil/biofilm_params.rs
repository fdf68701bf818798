//! Biofilm input data (BIOFILM switch, BIOFPARA records, PERMFACT and PCFACT tables)
//! and its conversion into the per-region parameters used by the biofilm module.
use super::errors::BlackOilError;
use crate::Numerics::tabulated::Tabulated1DFunction;
use crate::Utils::load_from_file::LoadData;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One BIOFPARA record, one per saturation region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiofparaRecord {
    /// kg/m^3
    pub density_biofilm: f64,
    /// 1/s
    pub microbial_death_rate: f64,
    /// 1/s
    pub maximum_growth_rate: f64,
    /// kg/m^3
    pub half_velocity_oxygen: f64,
    pub yield_growth_coefficient: f64,
}

/// Two-column table: porosity change versus a multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    pub porosity_change: Vec<f64>,
    pub multiplier: Vec<f64>,
}

fn one() -> usize {
    1
}

/// Deck keywords relevant for the biofilm module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiofilmDeck {
    /// BIOFILM keyword present
    #[serde(default)]
    pub biofilm: bool,
    #[serde(default = "one")]
    pub num_sat_regions: usize,
    #[serde(default)]
    pub biofpara: Vec<BiofparaRecord>,
    #[serde(default)]
    pub permfact: Vec<FactorTable>,
    #[serde(default)]
    pub pcfact: Vec<FactorTable>,
}

impl Default for BiofilmDeck {
    fn default() -> Self {
        Self {
            biofilm: false,
            num_sat_regions: 1,
            biofpara: Vec::new(),
            permfact: Vec::new(),
            pcfact: Vec::new(),
        }
    }
}

impl BiofilmDeck {
    pub fn from_json_str(s: &str) -> Result<Self, BlackOilError> {
        Ok(serde_json::from_str(s)?)
    }

    /// The `BIOFILM` section if the file has one, the whole file otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BlackOilError> {
        let loader = LoadData::new(path.as_ref().to_string_lossy().into_owned());
        let deck = if loader.has_section(&["BIOFILM"]).map_err(BlackOilError::Parameter)? {
            loader.load_section(&["BIOFILM"])
        } else {
            loader.load()
        };
        deck.map_err(BlackOilError::Parameter)
    }
}

/// Per saturation region biofilm parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiofilmParams {
    pub permfact_table: Vec<Tabulated1DFunction>,
    pub pcfact_table: Vec<Tabulated1DFunction>,
    pub density_biofilm: Vec<f64>,
    pub half_velocity_oxygen: Vec<f64>,
    pub maximum_growth_rate: Vec<f64>,
    pub microbial_death_rate: Vec<f64>,
    pub yield_growth_coefficient: Vec<f64>,
}

fn to_table(table: &FactorTable, keyword: &str, region: usize) -> Result<Tabulated1DFunction, BlackOilError> {
    Tabulated1DFunction::new(table.porosity_change.clone(), table.multiplier.clone())
        .map_err(|e| BlackOilError::InvalidTable(format!("{} table {}: {}", keyword, region, e)))
}

impl BiofilmParams {
    /// Fills the parameters from the deck. `ENABLED` is the compile-time switch of the
    /// module that will use them; a disagreement with the deck's BIOFILM flag is an error.
    pub fn init_from_deck<const ENABLED: bool>(deck: &BiofilmDeck) -> Result<Self, BlackOilError> {
        if ENABLED && !deck.biofilm {
            return Err(BlackOilError::ModuleMismatch(
                "Biofilm module enabled at compile time, but the deck does not contain BIOFILM!".to_string(),
            ));
        }
        if !ENABLED && deck.biofilm {
            return Err(BlackOilError::ModuleMismatch(
                "Biofilm module disabled at compile time, but deck contains BIOFILM!".to_string(),
            ));
        }
        if !deck.biofilm {
            return Ok(Self::default());
        }

        let num_sat_regions = deck.num_sat_regions;
        if num_sat_regions == 0 {
            return Err(BlackOilError::InvalidTable(
                "number of saturation regions must be positive".to_string(),
            ));
        }

        if deck.biofpara.is_empty() {
            return Err(BlackOilError::MissingKeyword("BIOFPARA"));
        }
        if deck.biofpara.len() < num_sat_regions {
            return Err(BlackOilError::InvalidTable(format!(
                "BIOFPARA has {} records for {} saturation regions",
                deck.biofpara.len(),
                num_sat_regions
            )));
        }
        let records = &deck.biofpara[..num_sat_regions];
        let mut params = Self {
            density_biofilm: records.iter().map(|r| r.density_biofilm).collect(),
            half_velocity_oxygen: records.iter().map(|r| r.half_velocity_oxygen).collect(),
            maximum_growth_rate: records.iter().map(|r| r.maximum_growth_rate).collect(),
            microbial_death_rate: records.iter().map(|r| r.microbial_death_rate).collect(),
            yield_growth_coefficient: records.iter().map(|r| r.yield_growth_coefficient).collect(),
            ..Self::default()
        };
        if let Some(region) = params.yield_growth_coefficient.iter().position(|y| *y <= 0.0) {
            return Err(BlackOilError::InvalidTable(format!(
                "BIOFPARA record {}: the yield coefficient must be positive",
                region
            )));
        }

        if deck.permfact.is_empty() {
            return Err(BlackOilError::MissingKeyword("PERMFACT"));
        }
        if deck.permfact.len() != num_sat_regions {
            return Err(BlackOilError::InvalidTable(format!(
                "PERMFACT has {} tables for {} saturation regions",
                deck.permfact.len(),
                num_sat_regions
            )));
        }
        params.permfact_table = deck
            .permfact
            .iter()
            .enumerate()
            .map(|(i, t)| to_table(t, "PERMFACT", i))
            .collect::<Result<_, _>>()?;

        if !deck.pcfact.is_empty() {
            if deck.pcfact.len() != num_sat_regions {
                return Err(BlackOilError::InvalidTable(format!(
                    "PCFACT has {} tables for {} saturation regions",
                    deck.pcfact.len(),
                    num_sat_regions
                )));
            }
            params.pcfact_table = deck
                .pcfact
                .iter()
                .enumerate()
                .map(|(i, t)| to_table(t, "PCFACT", i))
                .collect::<Result<_, _>>()?;
        }
        info!(
            "biofilm parameters read for {} saturation region(s), PCFACT {}",
            num_sat_regions,
            if params.pcfact_table.is_empty() { "absent" } else { "present" }
        );
        Ok(params)
    }

    pub fn num_sat_regions(&self) -> usize {
        self.density_biofilm.len()
    }
}
