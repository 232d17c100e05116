use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A 2-D coordinate: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// Feature properties as they appear on the wire.
pub type Properties = Map<String, Value>;

/// GeoJSON geometry, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Number of positions in this geometry, recursing into collections.
    pub fn coordinate_count(&self) -> usize {
        match self {
            Geometry::Point { .. } => 1,
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.len()
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().map(Vec::len).sum()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|polygon| polygon.iter().map(Vec::len).sum::<usize>())
                .sum(),
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().map(Geometry::coordinate_count).sum()
            }
        }
    }

    /// Visit every coordinate number (x and y of each position).
    pub fn for_each_ordinate(&self, f: &mut impl FnMut(f64)) {
        fn visit(positions: &[Position], f: &mut impl FnMut(f64)) {
            for [x, y] in positions {
                f(*x);
                f(*y);
            }
        }

        match self {
            Geometry::Point { coordinates } => visit(std::slice::from_ref(coordinates), f),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                visit(coordinates, f)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().for_each(|ring| visit(ring, f))
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flatten()
                .for_each(|ring| visit(ring, f)),
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().for_each(|g| g.for_each_ordinate(f))
            }
        }
    }

    /// Build a new geometry of the same shape with every ordinate mapped through `f`.
    pub fn map_ordinates(&self, f: &impl Fn(f64) -> f64) -> Geometry {
        let point = |[x, y]: &Position| [f(*x), f(*y)];
        let line = |positions: &Vec<Position>| positions.iter().map(point).collect::<Vec<_>>();
        let lines = |rings: &Vec<Vec<Position>>| rings.iter().map(line).collect::<Vec<_>>();

        match self {
            Geometry::Point { coordinates } => Geometry::Point {
                coordinates: point(coordinates),
            },
            Geometry::MultiPoint { coordinates } => Geometry::MultiPoint {
                coordinates: line(coordinates),
            },
            Geometry::LineString { coordinates } => Geometry::LineString {
                coordinates: line(coordinates),
            },
            Geometry::MultiLineString { coordinates } => Geometry::MultiLineString {
                coordinates: lines(coordinates),
            },
            Geometry::Polygon { coordinates } => Geometry::Polygon {
                coordinates: lines(coordinates),
            },
            Geometry::MultiPolygon { coordinates } => Geometry::MultiPolygon {
                coordinates: coordinates.iter().map(lines).collect(),
            },
            Geometry::GeometryCollection { geometries } => Geometry::GeometryCollection {
                geometries: geometries.iter().map(|g| g.map_ordinates(f)).collect(),
            },
        }
    }
}

fn feature_tag() -> String {
    "Feature".to_string()
}

fn collection_tag() -> String {
    "FeatureCollection".to_string()
}

/// A GeoJSON feature. `properties: null` deserializes to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_tag")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            kind: feature_tag(),
            geometry,
            properties: Some(properties),
            id: None,
        }
    }
}

/// A GeoJSON feature collection. Unknown top-level members (`crs`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_tag")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            kind: collection_tag(),
            name: Some(name.into()),
            features,
        }
    }

    /// Collection name, treating an empty string as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_feature_collection() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "name": "countries",
            "crs": { "type": "name" },
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [2, 48.5] },
                    "properties": { "NAME": "France" }
                },
                { "type": "Feature", "geometry": null, "properties": null }
            ]
        }))
        .unwrap();

        assert_eq!(fc.features.len(), 2);
        assert_eq!(
            fc.features[0].geometry,
            Some(Geometry::Point { coordinates: [2.0, 48.5] })
        );
        assert!(fc.features[1].geometry.is_none());
        assert!(fc.features[1].properties.is_none());
    }

    #[test]
    fn test_serialize_keeps_type_tags() {
        let feature = Feature::new(
            Some(Geometry::LineString {
                coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
            }),
            Properties::new(),
        );
        let fc = FeatureCollection::new("out", vec![feature]);
        let value = serde_json::to_value(&fc).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "LineString");
    }

    #[test]
    fn test_coordinate_count() {
        let polygon = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [5.0, 5.0]]],
            ],
        };
        let collection = Geometry::GeometryCollection {
            geometries: vec![polygon.clone(), Geometry::Point { coordinates: [0.0, 0.0] }],
        };

        assert_eq!(polygon.coordinate_count(), 7);
        assert_eq!(collection.coordinate_count(), 8);
    }

    #[test]
    fn test_map_ordinates_preserves_shape() {
        let geometry = Geometry::Polygon {
            coordinates: vec![vec![[1.0, 2.0], [3.0, 4.0]]],
        };
        let doubled = geometry.map_ordinates(&|v| v * 2.0);

        assert_eq!(
            doubled,
            Geometry::Polygon {
                coordinates: vec![vec![[2.0, 4.0], [6.0, 8.0]]],
            }
        );
        // Source untouched.
        assert_eq!(
            geometry,
            Geometry::Polygon {
                coordinates: vec![vec![[1.0, 2.0], [3.0, 4.0]]],
            }
        );
    }
}
