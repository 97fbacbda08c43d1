//! Model state as values: in-memory snapshots for a history manager and the
//! persisted project record.
//!
//! A project file is a short header followed by the bincode encoding of
//! [`ProjectRecord`], whose sections are, in order: palette, triangle soup,
//! welded vertex positions and the per-triangle vertex index table.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SerializationError};
use crate::geometry::Triangle;
use crate::math::Point3;
use crate::palette::Palette;

/// Magic bytes at the start of a project file.
pub const PROJECT_MAGIC: [u8; 4] = *b"MPJ1";

/// Current project format version.
pub const PROJECT_VERSION: u32 = 1;

/// Immutable copy of the palette and triangle soup of a model.
///
/// Holds no reference back to the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    palette: Palette,
    triangles: Vec<Triangle>,
}

impl Snapshot {
    /// Creates a snapshot from its parts.
    #[must_use]
    pub fn new(palette: Palette, triangles: Vec<Triangle>) -> Self {
        Self { palette, triangles }
    }

    /// The captured palette.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The captured triangle soup.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Checks that the snapshot can be loaded.
    ///
    /// A snapshot with both sections empty is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::EmptySection`] naming the empty section
    /// when the other one is not empty.
    pub fn validate(&self) -> Result<()> {
        match (self.palette.is_empty(), self.triangles.is_empty()) {
            (true, false) => Err(SerializationError::EmptySection("palette").into()),
            (false, true) => Err(SerializationError::EmptySection("triangles").into()),
            _ => Ok(()),
        }
    }

    pub(crate) fn into_parts(self) -> (Palette, Vec<Triangle>) {
        (self.palette, self.triangles)
    }
}

/// The persisted form of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    palette: Palette,
    triangles: Vec<Triangle>,
    vertices: Vec<Point3>,
    indices: Vec<[usize; 3]>,
}

impl ProjectRecord {
    /// Creates a record from its four sections.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the sections are inconsistent; see
    /// [`ProjectRecord::validate`].
    pub fn new(
        palette: Palette,
        triangles: Vec<Triangle>,
        vertices: Vec<Point3>,
        indices: Vec<[usize; 3]>,
    ) -> Result<Self> {
        let record = Self {
            palette,
            triangles,
            vertices,
            indices,
        };
        record.validate()?;
        Ok(record)
    }

    /// The palette section.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The triangle soup section.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Welded vertex positions.
    #[must_use]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Vertex index triple per triangle.
    #[must_use]
    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Checks that every section is non-empty, that there is one index
    /// triple per triangle, and that every index names a stored vertex.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::EmptySection`] or
    /// [`SerializationError::Inconsistent`].
    pub fn validate(&self) -> Result<()> {
        let sections = [
            ("palette", self.palette.is_empty()),
            ("triangles", self.triangles.is_empty()),
            ("vertices", self.vertices.is_empty()),
            ("indices", self.indices.is_empty()),
        ];
        if let Some((name, _)) = sections.iter().find(|(_, empty)| *empty) {
            return Err(SerializationError::EmptySection(*name).into());
        }

        if self.indices.len() != self.triangles.len() {
            return Err(SerializationError::Inconsistent(format!(
                "{} index triples for {} triangles",
                self.indices.len(),
                self.triangles.len()
            ))
            .into());
        }

        let count = self.vertices.len();
        if let Some((triangle, vertex)) = self
            .indices
            .iter()
            .enumerate()
            .flat_map(|(t, triple)| triple.iter().map(move |&v| (t, v)))
            .find(|&(_, v)| v >= count)
        {
            return Err(SerializationError::Inconsistent(format!(
                "triangle {triangle} references vertex {vertex} of {count}"
            ))
            .into());
        }
        Ok(())
    }

    /// Writes the header and the encoded record.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::Encode`] if writing or encoding fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(&PROJECT_MAGIC)
            .and_then(|()| writer.write_all(&PROJECT_VERSION.to_le_bytes()))
            .map_err(|e| SerializationError::Encode(e.to_string()))?;
        bincode::serialize_into(&mut *writer, self)
            .map_err(|e| SerializationError::Encode(e.to_string()))?;
        debug!(
            triangles = self.triangles.len(),
            vertices = self.vertices.len(),
            "project record written"
        );
        Ok(())
    }

    /// Reads and validates a record written by [`ProjectRecord::write_to`].
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::Decode`] for a bad header or malformed
    /// data, and the errors of [`ProjectRecord::validate`] for a record that
    /// decodes but is incomplete.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = [0_u8; 8];
        reader
            .read_exact(&mut header)
            .map_err(|e| SerializationError::Decode(format!("failed to read header: {e}")))?;
        if header[..4] != PROJECT_MAGIC {
            return Err(SerializationError::Decode("not a project file".into()).into());
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != PROJECT_VERSION {
            return Err(
                SerializationError::Decode(format!("unsupported version {version}")).into(),
            );
        }

        let record: Self = bincode::deserialize_from(reader)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    pub(crate) fn into_parts(self) -> (Palette, Vec<Triangle>, Vec<Point3>, Vec<[usize; 3]>) {
        (self.palette, self.triangles, self.vertices, self.indices)
    }
}
