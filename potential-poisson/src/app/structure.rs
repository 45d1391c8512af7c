//! Reads the device structure: a background permittivity and charge, overlaid by rectangular
//! regions. Regions are painted in the order they appear, so a later region overrides an
//! earlier one where they overlap.

use crate::{
    error::BuildError,
    fields::{FieldGrid, Fields},
};
use color_eyre::eyre::eyre;
use config::{Config, File};
use nalgebra::RealField;
use potential_mesher::{GridNode, SquareGrid};
use serde::{de::DeserializeOwned, Deserialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub(crate) struct Structure<T> {
    pub(crate) background_permittivity: T,
    pub(crate) background_charge: Option<T>,
    #[serde(default = "Vec::new")]
    pub(crate) regions: Vec<Region<T>>,
}

/// A rectangle of grid points, both ranges inclusive and 1-based
#[derive(Debug, Deserialize)]
pub(crate) struct Region<T> {
    pub(crate) columns: [usize; 2],
    pub(crate) rows: [usize; 2],
    pub(crate) permittivity: Option<T>,
    pub(crate) charge: Option<T>,
}

impl<T: DeserializeOwned> Structure<T> {
    pub(crate) fn build(path: PathBuf) -> color_eyre::Result<Self> {
        let s = Config::builder().add_source(File::from(path)).build()?;
        s.try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize structure: {:?}", e))
    }
}

impl<T: Copy + RealField> Structure<T> {
    /// Sample the structure on the points of `grid`
    pub(crate) fn fields(&self, grid: &SquareGrid) -> Result<Fields<T>, BuildError> {
        let mut permittivity = FieldGrid::from_element(grid, self.background_permittivity);
        let mut charge =
            FieldGrid::from_element(grid, self.background_charge.unwrap_or_else(T::zero));

        let side = grid.field_side();
        for (index, region) in self.regions.iter().enumerate() {
            let [i0, i1] = region.columns;
            let [j0, j1] = region.rows;
            if i0 == 0 || j0 == 0 || i0 > i1 || j0 > j1 || i1 > side || j1 > side {
                return Err(BuildError::Structure(format!(
                    "region {} spans columns {:?} and rows {:?}, which do not fit in 1..={}",
                    index, region.columns, region.rows, side
                )));
            }
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let node = GridNode::new(i, j);
                    if let Some(value) = region.permittivity {
                        permittivity.set(node, value);
                    }
                    if let Some(value) = region.charge {
                        charge.set(node, value);
                    }
                }
            }
        }

        tracing::info!(
            "Structure has {} regions over a background permittivity of {}",
            self.regions.len(),
            self.background_permittivity
        );
        Ok(Fields {
            permittivity,
            charge,
        })
    }
}
