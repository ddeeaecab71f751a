//! Time directories, field files and cloud files of one case root.
//!
//! A field file is `<root>/<time>/<name>.json`:
//!
//! ```json
//! { "header": { "name": "U", "category": "vol", "value_type": "vector" },
//!   "internal": [[0.0, 0.0, 0.0], ...],
//!   "boundary": [[...], ...] }
//! ```
//!
//! Surface fields also record their `orientation`; point fields keep their
//! values in `internal` and leave `boundary` empty. A cloud is a directory
//! `<root>/<time>/lagrangian/<cloud>/` holding `positions.json` (positions
//! and cells), one file per attribute, and on processors
//! `particleIndices.json`.

use crate::field::{
    FaceOrientation, FieldValue, MeshField, PointField, SurfaceField, ValueType, VolField,
};
use crate::io::{WriteBatch, list_dir, read_json};
use crate::lagrangian::{Cloud, ParticleField, ProcCloud};
use crate::mesh_error::{FieldCategory, MeshError};
use crate::topology::Point;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LAGRANGIAN_DIR: &str = "lagrangian";
const POSITIONS_FILE: &str = "positions.json";
const PARTICLE_INDICES_FILE: &str = "particleIndices.json";

/// What a field file holds, readable without knowing its value type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHeader {
    pub name: String,
    pub category: FieldCategory,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<FaceOrientation>,
}

#[derive(Serialize)]
struct FieldFile<T> {
    header: FieldHeader,
    internal: Vec<T>,
    boundary: Vec<Vec<T>>,
}

/// A field file whose values are parsed only once the header is checked.
#[derive(Deserialize)]
struct UntypedFieldFile {
    header: FieldHeader,
    internal: serde_json::Value,
    #[serde(default)]
    boundary: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct HeaderOnly {
    header: FieldHeader,
}

#[derive(Serialize, Deserialize)]
struct CloudPositions {
    positions: Vec<Point>,
    cells: Vec<usize>,
}

/// Reader and writer for the time directories under one root.
///
/// The root is a case directory or one of its `processor<N>` directories.
#[derive(Clone, Debug)]
pub struct FieldStore {
    root: PathBuf,
}

impl FieldStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn time_dir(&self, time: &str) -> PathBuf {
        self.root.join(time)
    }

    /// Time directories (names parsing as finite numbers) in ascending time.
    pub fn times(&self) -> Result<Vec<String>, MeshError> {
        let mut times: Vec<(f64, String)> = list_dir(&self.root, |ft, name| {
            ft.is_dir() && name.parse::<f64>().is_ok_and(f64::is_finite)
        })?
        .into_iter()
        .filter_map(|name| name.parse::<f64>().ok().map(|t| (t, name)))
        .collect();
        times.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(times.into_iter().map(|(_, name)| name).collect())
    }

    fn field_path(&self, time: &str, name: &str) -> PathBuf {
        self.time_dir(time).join(format!("{name}.json"))
    }

    pub fn has_field(&self, time: &str, name: &str) -> bool {
        self.field_path(time, name).is_file()
    }

    /// Headers of every field file at `time`, sorted by name.
    pub fn fields(&self, time: &str) -> Result<Vec<FieldHeader>, MeshError> {
        list_dir(&self.time_dir(time), |ft, name| ft.is_file() && name.ends_with(".json"))?
            .into_iter()
            .map(|file| {
                let path = self.time_dir(time).join(&file);
                read_json::<HeaderOnly>(path).map(|h| h.header)
            })
            .collect()
    }

    fn read_typed<T: FieldValue>(
        &self,
        time: &str,
        name: &str,
        category: FieldCategory,
    ) -> Result<FieldFile<T>, MeshError> {
        let path = self.field_path(time, name);
        let raw: UntypedFieldFile = read_json(&path)?;
        if raw.header.category != category {
            return Err(MeshError::CategoryMismatch {
                field: name.to_string(),
                expected: category,
                found: raw.header.category,
            });
        }
        if raw.header.value_type != T::VALUE_TYPE {
            return Err(MeshError::ValueTypeMismatch {
                field: name.to_string(),
                expected: T::VALUE_TYPE.to_string(),
                found: raw.header.value_type.to_string(),
            });
        }
        let parse = |e: serde_json::Error| MeshError::parse(&path, e);
        let internal = serde_json::from_value(raw.internal).map_err(parse)?;
        let boundary = match raw.boundary {
            Some(values) => serde_json::from_value(values).map_err(parse)?,
            None => Vec::new(),
        };
        Ok(FieldFile {
            header: raw.header,
            internal,
            boundary,
        })
    }

    fn push_typed<T: FieldValue>(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        file: FieldFile<T>,
    ) -> Result<(), MeshError> {
        let path = self.field_path(time, &file.header.name);
        batch.push_json(path, &file)
    }

    pub fn read_vol<T: FieldValue>(&self, time: &str, name: &str) -> Result<VolField<T>, MeshError> {
        let file = self.read_typed::<T>(time, name, FieldCategory::Vol)?;
        Ok(VolField::new(name, file.internal, file.boundary))
    }

    pub fn read_surface<T: FieldValue>(
        &self,
        time: &str,
        name: &str,
    ) -> Result<SurfaceField<T>, MeshError> {
        let file = self.read_typed::<T>(time, name, FieldCategory::Surface)?;
        let orientation = file.header.orientation.unwrap_or_default();
        Ok(SurfaceField::new(name, orientation, file.internal, file.boundary))
    }

    pub fn read_point<T: FieldValue>(
        &self,
        time: &str,
        name: &str,
    ) -> Result<PointField<T>, MeshError> {
        let file = self.read_typed::<T>(time, name, FieldCategory::Point)?;
        Ok(PointField::new(name, file.internal))
    }

    pub fn push_vol<T: FieldValue>(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        field: &VolField<T>,
    ) -> Result<(), MeshError> {
        let file = FieldFile {
            header: header_of::<_, T>(field, None),
            internal: field.internal.clone(),
            boundary: field.boundary.clone(),
        };
        self.push_typed(batch, time, file)
    }

    pub fn push_surface<T: FieldValue>(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        field: &SurfaceField<T>,
    ) -> Result<(), MeshError> {
        let file = FieldFile {
            header: header_of::<_, T>(field, Some(field.orientation)),
            internal: field.internal.clone(),
            boundary: field.boundary.clone(),
        };
        self.push_typed(batch, time, file)
    }

    pub fn push_point<T: FieldValue>(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        field: &PointField<T>,
    ) -> Result<(), MeshError> {
        let file = FieldFile {
            header: header_of::<_, T>(field, None),
            internal: field.values.clone(),
            boundary: Vec::new(),
        };
        self.push_typed(batch, time, file)
    }

    fn cloud_dir(&self, time: &str, cloud: &str) -> PathBuf {
        self.time_dir(time).join(LAGRANGIAN_DIR).join(cloud)
    }

    /// Names of the clouds stored at `time`, sorted.
    pub fn clouds(&self, time: &str) -> Result<Vec<String>, MeshError> {
        list_dir(&self.time_dir(time).join(LAGRANGIAN_DIR), |ft, _| ft.is_dir())
    }

    pub fn has_cloud(&self, time: &str, name: &str) -> bool {
        self.cloud_dir(time, name).join(POSITIONS_FILE).is_file()
    }

    pub fn read_cloud(&self, time: &str, name: &str) -> Result<Cloud, MeshError> {
        let dir = self.cloud_dir(time, name);
        let CloudPositions { positions, cells } = read_json(dir.join(POSITIONS_FILE))?;
        let mut cloud = Cloud::new(name, positions, cells)?;
        let attributes = list_dir(&dir, |ft, file| {
            ft.is_file()
                && file.ends_with(".json")
                && file != POSITIONS_FILE
                && file != PARTICLE_INDICES_FILE
        })?;
        for file in attributes {
            let field: ParticleField = read_json(dir.join(&file))?;
            let attribute = file.trim_end_matches(".json");
            cloud.insert_field(attribute, field)?;
        }
        Ok(cloud)
    }

    pub fn push_cloud(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        cloud: &Cloud,
    ) -> Result<(), MeshError> {
        let dir = self.cloud_dir(time, &cloud.name);
        let positions = CloudPositions {
            positions: cloud.positions().to_vec(),
            cells: cloud.cells().to_vec(),
        };
        batch.push_json(dir.join(POSITIONS_FILE), &positions)?;
        for (attribute, field) in cloud.fields() {
            batch.push_json(dir.join(format!("{attribute}.json")), field)?;
        }
        Ok(())
    }

    /// A processor's cloud together with its particle indices.
    pub fn read_proc_cloud(&self, time: &str, name: &str) -> Result<ProcCloud, MeshError> {
        let cloud = self.read_cloud(time, name)?;
        let particle_indices: Vec<usize> =
            read_json(self.cloud_dir(time, name).join(PARTICLE_INDICES_FILE))?;
        if particle_indices.len() != cloud.n_particles() {
            return Err(MeshError::FieldLengthMismatch {
                field: format!("{name}.particleIndices"),
                expected: cloud.n_particles(),
                found: particle_indices.len(),
            });
        }
        Ok(ProcCloud {
            cloud,
            particle_indices,
        })
    }

    pub fn push_proc_cloud(
        &self,
        batch: &mut WriteBatch,
        time: &str,
        piece: &ProcCloud,
    ) -> Result<(), MeshError> {
        self.push_cloud(batch, time, &piece.cloud)?;
        let dir = self.cloud_dir(time, &piece.cloud.name);
        batch.push_json(dir.join(PARTICLE_INDICES_FILE), &piece.particle_indices)
    }
}

fn header_of<F: MeshField, T: FieldValue>(
    field: &F,
    orientation: Option<FaceOrientation>,
) -> FieldHeader {
    FieldHeader {
        name: field.name().to_string(),
        category: F::CATEGORY,
        value_type: T::VALUE_TYPE,
        orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Vector;
    use crate::io::test_dir::ScratchDir;
    use crate::lagrangian::CompactField;
    use crate::topology::hex_lattice;

    #[test]
    fn times_sort_numerically() {
        let dir = ScratchDir::new("times");
        for name in ["10", "0.5", "2", "constant", "processor0", "inf"] {
            std::fs::create_dir_all(dir.0.join(name)).unwrap();
        }
        let store = FieldStore::new(&dir.0);
        assert_eq!(store.times().unwrap(), vec!["0.5", "2", "10"]);
    }

    #[test]
    fn typed_reads_check_the_header() {
        let dir = ScratchDir::new("fields");
        let mesh = hex_lattice(2, 2, 1).unwrap();
        let store = FieldStore::new(&dir.0);
        let u = VolField::<Vector>::uniform("U", &mesh, [1.0, 0.0, 0.0]);
        let phi = SurfaceField::from_face_values(
            "phi",
            FaceOrientation::Oriented,
            &mesh,
            (0..mesh.n_faces()).map(|f| f as f64).collect(),
        )
        .unwrap();
        let mut batch = WriteBatch::new();
        store.push_vol(&mut batch, "0", &u).unwrap();
        store.push_surface(&mut batch, "0", &phi).unwrap();
        batch.commit().unwrap();

        let headers = store.fields("0").unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name, "U");
        assert_eq!(headers[1].orientation, Some(FaceOrientation::Oriented));

        assert_eq!(store.read_vol::<Vector>("0", "U").unwrap(), u);
        assert_eq!(store.read_surface::<f64>("0", "phi").unwrap(), phi);
        assert!(matches!(
            store.read_vol::<f64>("0", "U"),
            Err(MeshError::ValueTypeMismatch { .. })
        ));
        assert!(matches!(
            store.read_point::<f64>("0", "phi"),
            Err(MeshError::CategoryMismatch {
                expected: FieldCategory::Point,
                found: FieldCategory::Surface,
                ..
            })
        ));
    }

    #[test]
    fn value_type_is_checked_before_the_data_is_parsed() {
        let dir = ScratchDir::new("value-type");
        std::fs::create_dir_all(dir.0.join("0")).unwrap();
        // a point field as written by hand: no `boundary` entry
        std::fs::write(
            dir.0.join("0/pointDisplacement.json"),
            r#"{ "header": { "name": "pointDisplacement", "category": "point",
                             "value_type": "vector" },
                 "internal": [[0.0, 0.0, 0.5], [1.0, 0.0, 0.0]] }"#,
        )
        .unwrap();
        let store = FieldStore::new(&dir.0);

        let disp = store.read_point::<Vector>("0", "pointDisplacement").unwrap();
        assert_eq!(disp.values, vec![[0.0, 0.0, 0.5], [1.0, 0.0, 0.0]]);
        assert_eq!(
            store.read_point::<f64>("0", "pointDisplacement"),
            Err(MeshError::ValueTypeMismatch {
                field: "pointDisplacement".into(),
                expected: ValueType::Scalar.to_string(),
                found: ValueType::Vector.to_string(),
            })
        );
        assert!(matches!(
            store.read_vol::<f64>("0", "pointDisplacement"),
            Err(MeshError::CategoryMismatch { .. })
        ));
    }

    #[test]
    fn clouds_keep_their_attributes() {
        let dir = ScratchDir::new("clouds");
        let store = FieldStore::new(&dir.0);
        let mut cloud = Cloud::new("sprays", vec![[0.5; 3], [1.5, 0.5, 0.5]], vec![0, 1]).unwrap();
        cloud
            .insert_field("d", ParticleField::Scalar(vec![1e-3, 2e-3]))
            .unwrap();
        cloud
            .insert_field(
                "history",
                ParticleField::LabelList(CompactField::from_lists([vec![1, 2], vec![]])),
            )
            .unwrap();
        let piece = ProcCloud {
            cloud,
            particle_indices: vec![4, 7],
        };
        let mut batch = WriteBatch::new();
        store.push_proc_cloud(&mut batch, "1", &piece).unwrap();
        batch.commit().unwrap();

        assert_eq!(store.clouds("1").unwrap(), vec!["sprays"]);
        assert_eq!(store.read_proc_cloud("1", "sprays").unwrap(), piece);
        assert_eq!(store.read_cloud("1", "sprays").unwrap(), piece.cloud);
    }
}
