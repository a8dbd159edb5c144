//! GeoJSON and KML output of site features

use crate::error::{Result, SiteError};
use drygully_core::vector::{AttributeValue, Feature};
use drygully_core::CRS;
use geo::{Geometry, LineString, Polygon};
use geojson::feature::Id;
use geojson::GeoJson;
use serde_json::{json, Map, Value as JsonValue};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

type JsonObject = Map<String, JsonValue>;

fn to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => JsonValue::from(*f),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

pub fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn from_geojson_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(Geometry::<f64>::try_from(g.value)?),
        None => None,
    };
    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, from_json(v)))
        .collect();
    let id = match feature.id {
        Some(Id::String(s)) => Some(s),
        Some(Id::Number(n)) => Some(n.to_string()),
        None => None,
    };
    Ok(Feature { geometry, properties, id })
}

/// Write features as a GeoJSON FeatureCollection, naming `crs` when given
pub fn write_geojson(path: impl AsRef<Path>, features: &[Feature], crs: Option<CRS>) -> Result<()> {
    let foreign_members = crs.map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) }
            }),
        );
        members
    });
    let collection = geojson::FeatureCollection {
        bbox: None,
        features: features.iter().map(to_geojson_feature).collect(),
        foreign_members,
    };
    fs::write(path, GeoJson::FeatureCollection(collection).to_string())?;
    Ok(())
}

pub fn read_geojson(path: impl AsRef<Path>) -> Result<Vec<Feature>> {
    let text = fs::read_to_string(path.as_ref())?;
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().map(from_geojson_feature).collect(),
        GeoJson::Feature(f) => Ok(vec![from_geojson_feature(f)?]),
        GeoJson::Geometry(_) => Err(SiteError::Export(format!(
            "{} holds a bare geometry, expected features",
            path.as_ref().display()
        ))),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn kml_coords(out: &mut String, ring: &LineString<f64>) {
    out.push_str("<coordinates>");
    for (i, c) in ring.coords().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{},{},0", c.x, c.y);
    }
    out.push_str("</coordinates>");
}

fn kml_polygon(out: &mut String, polygon: &Polygon<f64>) {
    out.push_str("<Polygon><outerBoundaryIs><LinearRing>");
    kml_coords(out, polygon.exterior());
    out.push_str("</LinearRing></outerBoundaryIs>");
    for hole in polygon.interiors() {
        out.push_str("<innerBoundaryIs><LinearRing>");
        kml_coords(out, hole);
        out.push_str("</LinearRing></innerBoundaryIs>");
    }
    out.push_str("</Polygon>");
}

fn kml_geometry(out: &mut String, geometry: &Geometry<f64>) -> Result<()> {
    match geometry {
        Geometry::Polygon(p) => kml_polygon(out, p),
        Geometry::MultiPolygon(mp) => {
            out.push_str("<MultiGeometry>");
            mp.0.iter().for_each(|p| kml_polygon(out, p));
            out.push_str("</MultiGeometry>");
        }
        Geometry::LineString(ls) => {
            out.push_str("<LineString>");
            kml_coords(out, ls);
            out.push_str("</LineString>");
        }
        Geometry::MultiLineString(mls) => {
            out.push_str("<MultiGeometry>");
            for ls in &mls.0 {
                out.push_str("<LineString>");
                kml_coords(out, ls);
                out.push_str("</LineString>");
            }
            out.push_str("</MultiGeometry>");
        }
        other => {
            return Err(SiteError::Export(format!("KML output does not handle {:?}", other)));
        }
    }
    Ok(())
}

/// Write features as a KML document. Coordinates must be longitude and
/// latitude in degrees.
pub fn write_kml(path: impl AsRef<Path>, features: &[Feature], name: &str) -> Result<()> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>");
    let _ = write!(out, "<name>{}</name>", escape(name));

    for feature in features {
        let label = feature
            .get_property("Index")
            .map(|v| v.to_string())
            .or_else(|| feature.id.clone())
            .unwrap_or_default();
        let _ = write!(out, "<Placemark><name>{}</name><ExtendedData>", escape(&label));
        for (k, v) in &feature.properties {
            let _ = write!(
                out,
                "<Data name=\"{}\"><value>{}</value></Data>",
                escape(k),
                escape(&v.to_string())
            );
        }
        out.push_str("</ExtendedData>");
        if let Some(geometry) = &feature.geometry {
            kml_geometry(&mut out, geometry)?;
        }
        out.push_str("</Placemark>");
    }

    out.push_str("</Document></kml>\n");
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(138.0, -33.0), (138.1, -33.0), (138.1, -33.1), (138.0, -33.1), (138.0, -33.0)]),
            vec![],
        )
    }

    fn site_feature() -> Feature {
        let mut f = Feature::new(Geometry::MultiPolygon(MultiPolygon::new(vec![square()]))).with_id("RESDAM_4");
        f.set_property("Index", "RESDAM_4");
        f.set_property("Water_area_ha", 12.0);
        f.set_property("Dam_area_ha", 1.5);
        f
    }

    #[test]
    fn test_geojson_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.geojson");
        write_geojson(&path, &[site_feature()], Some(CRS::wgs84())).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("urn:ogc:def:crs:EPSG::4326"));

        let back = read_geojson(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id.as_deref(), Some("RESDAM_4"));
        // JSON objects do not keep key order
        let mut props = back[0].properties.clone();
        props.sort_by(|a, b| a.0.cmp(&b.0));
        let mut expected = site_feature().properties;
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(props, expected);
        assert_eq!(back[0].geometry, site_feature().geometry);
    }

    #[test]
    fn test_integer_property_stays_integer() {
        let mut f = Feature::new(Geometry::Polygon(square()));
        f.set_property("Count", 3i64);
        let back = from_geojson_feature(to_geojson_feature(&f)).unwrap();
        assert_eq!(back.get_property("Count"), Some(&AttributeValue::Int(3)));
    }

    #[test]
    fn test_kml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.kml");
        write_kml(&path, &[site_feature()], "RESDAM_4").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<Placemark><name>RESDAM_4</name>"));
        assert!(text.contains("<Data name=\"Water_area_ha\"><value>12</value></Data>"));
        assert!(text.contains("<MultiGeometry><Polygon><outerBoundaryIs>"));
        assert!(text.contains("138,-33,0 138.1,-33,0"));
    }

    #[test]
    fn test_kml_rejects_points() {
        let dir = tempfile::tempdir().unwrap();
        let f = Feature::new(Geometry::Point(geo::Point::new(1.0, 2.0)));
        assert!(write_kml(dir.path().join("p.kml"), &[f], "points").is_err());
    }
}
