use super::vector::Vector;
use indexmap::IndexMap;

/// A device as seen by the driver runtime or the server: a name and an
/// ordered set of vectors. Insertion order is preserved so repeated
/// `getProperties` replies enumerate vectors identically run to run.
#[derive(Debug, Clone)]
pub struct Device {
    /// Device name, unique within a driver/server
    pub devicename: String,
    /// Vectors keyed by name, in declaration order
    pub vectors: IndexMap<String, Vector>,
    /// `false` once every vector has been deleted and the device itself
    /// has been removed via a device-wide `delProperty`
    pub enable: bool,
}

impl Device {
    /// Construct an empty, enabled device.
    pub fn new(devicename: impl Into<String>) -> Self {
        Self {
            devicename: devicename.into(),
            vectors: IndexMap::new(),
            enable: true,
        }
    }

    /// Insert or replace a vector definition.
    pub fn insert_vector(&mut self, vector: Vector) {
        self.vectors.insert(vector.name.clone(), vector);
    }

    /// Look up a vector by name.
    pub fn vector(&self, name: &str) -> Option<&Vector> {
        self.vectors.get(name)
    }

    /// Look up a vector by name, mutably.
    pub fn vector_mut(&mut self, name: &str) -> Option<&mut Vector> {
        self.vectors.get_mut(name)
    }

    /// Mark a single vector deleted (`delProperty name="..."`), without
    /// removing it from the map — a disabled vector still blocks a new
    /// definition of the same name from silently reappearing unnoticed.
    pub fn delete_vector(&mut self, name: &str) {
        if let Some(vector) = self.vectors.get_mut(name) {
            vector.enable = false;
        }
    }

    /// Mark the whole device deleted (device-wide `delProperty`).
    pub fn delete(&mut self) {
        self.enable = false;
        for vector in self.vectors.values_mut() {
            vector.enable = false;
        }
    }
}
