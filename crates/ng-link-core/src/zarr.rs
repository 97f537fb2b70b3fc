//! OME-Zarr multiscale metadata
//!
//! Supports NGFF 0.4 groups (`.zattrs` with `multiscales`) and NGFF 0.5 /
//! zarr v3 groups (`zarr.json` with `attributes.ome.multiscales`). Only the
//! parts needed to lay out a viewer state are modelled: axes, the level-0
//! scale and the level-0 array shape.

use crate::source::MetadataSource;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// An axis as declared in `multiscales[].axes`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "AxisEntry")]
pub struct Axis {
    pub name: String,
    pub kind: Option<String>,
    pub unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AxisEntry {
    // NGFF 0.3 lists bare axis names
    Name(String),
    Full {
        name: String,
        #[serde(rename = "type")]
        kind: Option<String>,
        unit: Option<String>,
    },
}

impl From<AxisEntry> for Axis {
    fn from(entry: AxisEntry) -> Self {
        match entry {
            AxisEntry::Name(name) => Axis {
                name,
                kind: None,
                unit: None,
            },
            AxisEntry::Full { name, kind, unit } => Axis { name, kind, unit },
        }
    }
}

/// A coordinate transformation entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoordinateTransformation {
    Scale { scale: Vec<f64> },
    Translation { translation: Vec<f64> },
    Identity,
    #[serde(other)]
    Other,
}

/// One resolution level
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dataset {
    pub path: String,
    #[serde(default, rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

/// The first `multiscales` entry of a group
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Multiscale {
    #[serde(default)]
    pub axes: Vec<Axis>,
    pub datasets: Vec<Dataset>,
    #[serde(default, rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Physical voxel size of the full-resolution level in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSize {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Multiscale {
    /// Pull the first multiscale definition out of group attributes
    pub fn from_attributes(attrs: &Value) -> Result<Self> {
        let entries = attrs
            .get("multiscales")
            .or_else(|| attrs.get("ome").and_then(|ome| ome.get("multiscales")))
            .ok_or_else(|| Error::Metadata("group has no multiscales attribute".to_string()))?;

        let mut list: Vec<Multiscale> = serde_json::from_value(entries.clone())?;
        if list.is_empty() {
            return Err(Error::Metadata("multiscales list is empty".to_string()));
        }
        let multiscale = list.swap_remove(0);
        if multiscale.datasets.is_empty() {
            return Err(Error::Metadata("multiscale has no datasets".to_string()));
        }
        Ok(multiscale)
    }

    /// Axes with the NGFF 0.4 default (`t, c, z, y, x`, trimmed to rank) when none are declared
    pub fn effective_axes(&self, rank: usize) -> Vec<Axis> {
        if !self.axes.is_empty() {
            return self.axes.clone();
        }
        let defaults = ["t", "c", "z", "y", "x"];
        defaults[defaults.len().saturating_sub(rank)..]
            .iter()
            .map(|name| Axis {
                name: name.to_string(),
                kind: None,
                unit: None,
            })
            .collect()
    }

    /// Per-axis scale of the full-resolution level, including any global scale
    pub fn level0_scale(&self) -> Option<Vec<f64>> {
        let mut scale = scale_of(&self.datasets.first()?.coordinate_transformations)?;
        if let Some(global) = scale_of(&self.coordinate_transformations) {
            if global.len() == scale.len() {
                for (s, g) in scale.iter_mut().zip(global) {
                    *s *= g;
                }
            }
        }
        Some(scale)
    }

    /// Voxel size of level 0 converted to meters
    pub fn voxel_size(&self) -> Result<VoxelSize> {
        let scale = self
            .level0_scale()
            .ok_or_else(|| Error::Metadata("level 0 has no scale transformation".to_string()))?;
        let axes = self.effective_axes(scale.len());
        if axes.len() != scale.len() {
            return Err(Error::Metadata(format!(
                "{} axes but {} scale factors",
                axes.len(),
                scale.len()
            )));
        }

        let mut size = [None; 3];
        for (axis, factor) in axes.iter().zip(&scale) {
            let slot = match axis.name.as_str() {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                _ => continue,
            };
            size[slot] = Some(factor * unit_to_meters(axis.unit.as_deref()));
        }

        match size {
            [Some(x), Some(y), Some(z)] => Ok(VoxelSize { x, y, z }),
            _ => Err(Error::Metadata(
                "multiscale does not declare x, y and z axes".to_string(),
            )),
        }
    }

    /// Whether the image carries a channel axis
    pub fn has_channel_axis(&self) -> bool {
        let rank = self.level0_scale().map(|s| s.len()).unwrap_or(self.axes.len());
        self.effective_axes(rank)
            .iter()
            .any(|a| a.kind.as_deref() == Some("channel") || a.name == "c")
    }
}

fn scale_of(transforms: &[CoordinateTransformation]) -> Option<Vec<f64>> {
    transforms.iter().find_map(|t| match t {
        CoordinateTransformation::Scale { scale } => Some(scale.clone()),
        _ => None,
    })
}

/// Conversion factor from an NGFF space unit to meters
///
/// Missing units are taken as micrometers, the unit microscopy pipelines write.
pub fn unit_to_meters(unit: Option<&str>) -> f64 {
    match unit {
        Some("meter") | Some("m") => 1.0,
        Some("centimeter") | Some("cm") => 1e-2,
        Some("millimeter") | Some("mm") => 1e-3,
        Some("micrometer") | Some("um") | Some("µm") | Some("micron") | None => 1e-6,
        Some("nanometer") | Some("nm") => 1e-9,
        Some("angstrom") => 1e-10,
        Some("picometer") | Some("pm") => 1e-12,
        Some(other) => {
            warn!("Unknown axis unit '{}', assuming micrometer", other);
            1e-6
        }
    }
}

/// Metadata of an OME-Zarr image read from a source
#[derive(Debug, Clone, PartialEq)]
pub struct ZarrImage {
    pub multiscale: Multiscale,
    /// Shape of the level-0 array, when its array metadata is available
    pub shape: Option<Vec<u64>>,
}

impl ZarrImage {
    /// Read group and level-0 array metadata for the image rooted at `key`
    pub fn read<S: MetadataSource + ?Sized>(source: &S, key: &str) -> Result<Self> {
        let root = key.trim_end_matches('/');
        let attrs = read_group_attributes(source, root)?;
        let multiscale = Multiscale::from_attributes(&attrs)?;

        let level0 = format!("{}/{}", root, multiscale.datasets[0].path);
        let shape = read_array_shape(source, &level0)?;
        if shape.is_none() {
            debug!("No array metadata at {}, position left to the viewer", level0);
        }

        Ok(Self { multiscale, shape })
    }

    /// Centre of the volume in voxel coordinates, ordered x, y, z
    pub fn center(&self) -> Option<[f64; 3]> {
        let shape = self.shape.as_ref()?;
        let axes = self.multiscale.effective_axes(shape.len());
        if axes.len() != shape.len() {
            return None;
        }
        let mut center = [None; 3];
        for (axis, extent) in axes.iter().zip(shape) {
            let slot = match axis.name.as_str() {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                _ => continue,
            };
            center[slot] = Some(*extent as f64 / 2.0);
        }
        match center {
            [Some(x), Some(y), Some(z)] => Some([x, y, z]),
            _ => None,
        }
    }
}

fn read_group_attributes<S: MetadataSource + ?Sized>(source: &S, root: &str) -> Result<Value> {
    if let Some(attrs) = source.read_json(&format!("{}/.zattrs", root))? {
        return Ok(attrs);
    }
    if let Some(group) = source.read_json(&format!("{}/zarr.json", root))? {
        return group
            .get("attributes")
            .cloned()
            .ok_or_else(|| Error::Metadata(format!("{}/zarr.json has no attributes", root)));
    }
    Err(Error::Metadata(format!(
        "no .zattrs or zarr.json found under {}",
        root
    )))
}

fn read_array_shape<S: MetadataSource + ?Sized>(source: &S, array: &str) -> Result<Option<Vec<u64>>> {
    let meta = match source.read_json(&format!("{}/.zarray", array))? {
        Some(meta) => Some(meta),
        None => source.read_json(&format!("{}/zarr.json", array))?,
    };
    Ok(meta
        .and_then(|m| m.get("shape").cloned())
        .and_then(|shape| serde_json::from_value(shape).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exaspim_attrs() -> Value {
        json!({
            "multiscales": [{
                "version": "0.4",
                "name": "SPIM",
                "axes": [
                    {"name": "t", "type": "time", "unit": "millisecond"},
                    {"name": "c", "type": "channel"},
                    {"name": "z", "type": "space", "unit": "micrometer"},
                    {"name": "y", "type": "space", "unit": "micrometer"},
                    {"name": "x", "type": "space", "unit": "micrometer"}
                ],
                "datasets": [
                    {"path": "0", "coordinateTransformations": [
                        {"type": "scale", "scale": [1.0, 1.0, 1.0, 0.748, 0.748]},
                        {"type": "translation", "translation": [0.0, 0.0, 0.0, 0.0, 0.0]}
                    ]},
                    {"path": "1", "coordinateTransformations": [
                        {"type": "scale", "scale": [1.0, 1.0, 2.0, 1.496, 1.496]}
                    ]}
                ]
            }]
        })
    }

    #[test]
    fn test_voxel_size_in_meters() {
        let multiscale = Multiscale::from_attributes(&exaspim_attrs()).unwrap();
        let size = multiscale.voxel_size().unwrap();
        assert!((size.x - 0.748e-6).abs() < 1e-15);
        assert!((size.y - 0.748e-6).abs() < 1e-15);
        assert!((size.z - 1.0e-6).abs() < 1e-15);
        assert!(multiscale.has_channel_axis());
    }

    #[test]
    fn test_global_scale_is_applied() {
        let attrs = json!({
            "multiscales": [{
                "axes": [
                    {"name": "z", "type": "space", "unit": "nanometer"},
                    {"name": "y", "type": "space", "unit": "nanometer"},
                    {"name": "x", "type": "space", "unit": "nanometer"}
                ],
                "datasets": [{"path": "s0", "coordinateTransformations": [
                    {"type": "scale", "scale": [1.0, 2.0, 2.0]}
                ]}],
                "coordinateTransformations": [{"type": "scale", "scale": [4.0, 4.0, 4.0]}]
            }]
        });
        let size = Multiscale::from_attributes(&attrs).unwrap().voxel_size().unwrap();
        assert!((size.x - 8e-9).abs() < 1e-18);
        assert!((size.z - 4e-9).abs() < 1e-18);
    }

    #[test]
    fn test_zarr_v3_attributes_and_bare_axes() {
        let attrs = json!({
            "ome": {
                "version": "0.5",
                "multiscales": [{
                    "axes": ["z", "y", "x"],
                    "datasets": [{"path": "0", "coordinateTransformations": [
                        {"type": "scale", "scale": [2.0, 0.5, 0.5]}
                    ]}]
                }]
            }
        });
        let multiscale = Multiscale::from_attributes(&attrs).unwrap();
        assert_eq!(multiscale.axes[0].name, "z");
        assert!(!multiscale.has_channel_axis());
        let size = multiscale.voxel_size().unwrap();
        assert!((size.z - 2e-6).abs() < 1e-15);
    }

    #[test]
    fn test_missing_multiscales() {
        assert!(matches!(
            Multiscale::from_attributes(&json!({"other": 1})),
            Err(Error::Metadata(_))
        ));
        assert!(Multiscale::from_attributes(&json!({"multiscales": []})).is_err());
    }

    #[test]
    fn test_missing_spatial_axis() {
        let attrs = json!({
            "multiscales": [{
                "axes": [{"name": "y", "type": "space"}, {"name": "x", "type": "space"}],
                "datasets": [{"path": "0", "coordinateTransformations": [
                    {"type": "scale", "scale": [1.0, 1.0]}
                ]}]
            }]
        });
        let multiscale = Multiscale::from_attributes(&attrs).unwrap();
        assert!(multiscale.voxel_size().is_err());
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(unit_to_meters(Some("millimeter")), 1e-3);
        assert_eq!(unit_to_meters(Some("nanometer")), 1e-9);
        assert_eq!(unit_to_meters(None), 1e-6);
        assert_eq!(unit_to_meters(Some("furlong")), 1e-6);
    }

    #[test]
    fn test_center_from_shape() {
        let image = ZarrImage {
            multiscale: Multiscale::from_attributes(&exaspim_attrs()).unwrap(),
            shape: Some(vec![1, 1, 100, 2000, 3000]),
        };
        assert_eq!(image.center(), Some([1500.0, 1000.0, 50.0]));

        let no_shape = ZarrImage { shape: None, ..image };
        assert_eq!(no_shape.center(), None);
    }
}
