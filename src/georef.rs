//! Affine georeferencing for raster images.
//!
//! GeoTIFF rasters are placed on the map with a six-parameter affine
//! transform. It comes from the file's own ModelTransformation or
//! ModelTiepoint/ModelPixelScale tags, or else from an ESRI world-file
//! sidecar (`.tfw`, `.tifw` or `.wld`) next to the image.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::format::FormatError;
use crate::model::Point;

/// Pixel to map transform: `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    pub fn apply_point(&self, point: Point) -> (f64, f64) {
        self.apply(f64::from(point.x), f64::from(point.y))
    }

    /// Inverse transform, `None` when singular.
    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(AffineTransform {
            a: ia,
            b: ib,
            c: -(ia * self.c + ib * self.f),
            d: id,
            e: ie,
            f: -(id * self.c + ie * self.f),
        })
    }

    /// Parse world-file text.
    ///
    /// Lines are A, D, B, E, C, F where C/F locate the centre of the top-left
    /// pixel; the result maps pixel corners.
    pub fn from_world_file(text: &str) -> Result<Self, FormatError> {
        let values: Vec<f64> = text
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| FormatError::invalid_format(format!("bad world file value '{v}'")))
            })
            .collect::<Result<_, _>>()?;
        let [a, d, b, e, c, f] = values[..] else {
            return Err(FormatError::invalid_format(format!(
                "world file needs 6 values, found {}",
                values.len()
            )));
        };
        Ok(AffineTransform {
            a,
            b,
            c: c - a / 2.0 - b / 2.0,
            d,
            e,
            f: f - d / 2.0 - e / 2.0,
        })
    }

    /// Transform from GeoTIFF model tags: a full ModelTransformation, or a
    /// single tiepoint with a pixel scale. Point-registered rasters are
    /// shifted half a pixel so the result maps pixel corners.
    pub fn from_geotiff_tags(
        transformation: Option<&[f64]>,
        tiepoint: Option<&[f64]>,
        pixel_scale: Option<&[f64]>,
        pixel_is_point: bool,
    ) -> Option<Self> {
        let corner = match (transformation, tiepoint, pixel_scale) {
            (Some(m), _, _) if m.len() >= 8 => AffineTransform {
                a: m[0],
                b: m[1],
                c: m[3],
                d: m[4],
                e: m[5],
                f: m[7],
            },
            (_, Some(&[i, j, _, x, y, _]), Some(&[sx, sy, ..])) => AffineTransform {
                a: sx,
                b: 0.0,
                c: x - i * sx,
                d: 0.0,
                e: -sy,
                f: y + j * sy,
            },
            _ => return None,
        };
        if !pixel_is_point {
            return Some(corner);
        }
        Some(AffineTransform {
            c: corner.c - corner.a / 2.0 - corner.b / 2.0,
            f: corner.f - corner.d / 2.0 - corner.e / 2.0,
            ..corner
        })
    }

    /// Load the transform for a GeoTIFF image: embedded tags first, then a
    /// world file.
    ///
    /// Returns `Ok(None)` for non-TIFF images or when neither is present.
    pub fn load_for_image(image_path: &Path) -> Result<Option<Self>, FormatError> {
        if !is_geotiff(image_path) {
            return Ok(None);
        }
        match read_geotiff_tags(image_path) {
            Ok(Some(transform)) => {
                log::info!("Using embedded georeferencing of {:?}", image_path);
                return Ok(Some(transform));
            }
            Ok(None) => {}
            Err(e) => log::debug!("No GeoTIFF tags read from {:?}: {}", image_path, e),
        }
        let Some(sidecar) = world_file_candidates(image_path).into_iter().find(|p| p.is_file()) else {
            log::debug!("No world file next to {:?}", image_path);
            return Ok(None);
        };
        log::info!("Using georeferencing from {:?}", sidecar);
        let text = fs::read_to_string(&sidecar)?;
        Self::from_world_file(&text).map(Some)
    }
}

/// Whether the path has a `.tif`/`.tiff` extension.
pub fn is_geotiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "tif" | "tiff"))
        .unwrap_or(false)
}

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

fn read_geotiff_tags(path: &Path) -> tiff::TiffResult<Option<AffineTransform>> {
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let mut f64_tag = |code: u16| -> tiff::TiffResult<Option<Vec<f64>>> {
        decoder
            .find_tag(Tag::from_u16_exhaustive(code))?
            .map(|value| value.into_f64_vec())
            .transpose()
    };
    let transformation = f64_tag(MODEL_TRANSFORMATION)?;
    let tiepoint = f64_tag(MODEL_TIEPOINT)?;
    let pixel_scale = f64_tag(MODEL_PIXEL_SCALE)?;

    let geo_keys = decoder
        .find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))?
        .map(|value| value.into_u16_vec())
        .transpose()?
        .unwrap_or_default();
    // Header of four shorts, then (key, location, count, value) entries.
    let pixel_is_point = geo_keys
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .any(|entry| {
            entry[0] == GT_RASTER_TYPE_KEY && entry[1] == 0 && entry[3] == RASTER_PIXEL_IS_POINT
        });

    Ok(AffineTransform::from_geotiff_tags(
        transformation.as_deref(),
        tiepoint.as_deref(),
        pixel_scale.as_deref(),
        pixel_is_point,
    ))
}

fn world_file_candidates(image_path: &Path) -> Vec<PathBuf> {
    ["tfw", "tifw", "wld"]
        .iter()
        .map(|ext| image_path.with_extension(ext))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD_FILE: &str = "0.5\n0.0\n0.0\n-0.5\n1000.25\n2000.25\n";

    fn approx(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_world_file_maps_pixel_corners() {
        let t = AffineTransform::from_world_file(WORLD_FILE).unwrap();
        assert!(approx(t.apply(0.0, 0.0), (1000.0, 2000.5)));
        assert!(approx(t.apply(2.0, 2.0), (1001.0, 1999.5)));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = AffineTransform {
            a: 2.0,
            b: 0.5,
            c: 10.0,
            d: -0.25,
            e: -3.0,
            f: 7.0,
        };
        let inv = t.inverse().unwrap();
        let (mx, my) = t.apply(12.5, -4.0);
        assert!(approx(inv.apply(mx, my), (12.5, -4.0)));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let t = AffineTransform {
            a: 1.0,
            b: 2.0,
            c: 0.0,
            d: 2.0,
            e: 4.0,
            f: 0.0,
        };
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_bad_world_file() {
        assert!(AffineTransform::from_world_file("1 2 3").is_err());
        assert!(AffineTransform::from_world_file("1 0 0 1 x 0").is_err());
    }

    #[test]
    fn test_load_for_image() {
        let dir = std::env::temp_dir().join(format!("segpaint_georef_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let tif = dir.join("scene.tif");
        let png = dir.join("scene.png");

        assert_eq!(AffineTransform::load_for_image(&png).unwrap(), None);
        assert_eq!(AffineTransform::load_for_image(&tif).unwrap(), None);

        fs::write(dir.join("scene.tfw"), WORLD_FILE).unwrap();
        let t = AffineTransform::load_for_image(&tif).unwrap().unwrap();
        assert!((t.a - 0.5).abs() < 1e-12);

        let _ = fs::remove_dir_all(&dir);
    }

    fn write_geotiff(path: &Path, scale: &[f64], tiepoint: &[f64], geo_keys: Option<&[u16]>) {
        use tiff::encoder::{TiffEncoder, colortype};

        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        let mut image = encoder.new_image::<colortype::Gray8>(4, 4).unwrap();
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), scale)
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), tiepoint)
            .unwrap();
        if let Some(keys) = geo_keys {
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), keys)
                .unwrap();
        }
        image.write_data(&[0u8; 16]).unwrap();
    }

    #[test]
    fn test_tiepoint_and_scale() {
        let t = AffineTransform::from_geotiff_tags(
            None,
            Some(&[0.0, 0.0, 0.0, 500000.0, 4100000.0, 0.0]),
            Some(&[0.5, 0.5, 0.0]),
            false,
        )
        .unwrap();
        assert!(approx(t.apply(0.0, 0.0), (500000.0, 4100000.0)));
        assert!(approx(t.apply(2.0, 2.0), (500001.0, 4099999.0)));

        let point = AffineTransform::from_geotiff_tags(
            None,
            Some(&[0.0, 0.0, 0.0, 500000.0, 4100000.0, 0.0]),
            Some(&[0.5, 0.5, 0.0]),
            true,
        )
        .unwrap();
        assert!(approx(point.apply(0.0, 0.0), (499999.75, 4100000.25)));
    }

    #[test]
    fn test_model_transformation_wins() {
        let m = [
            2.0, 0.0, 0.0, 100.0, //
            0.0, -2.0, 0.0, 200.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = AffineTransform::from_geotiff_tags(
            Some(&m),
            Some(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0]),
            Some(&[1.0, 1.0, 0.0]),
            false,
        )
        .unwrap();
        assert!(approx(t.apply(1.0, 1.0), (102.0, 198.0)));
        assert!(AffineTransform::from_geotiff_tags(None, None, Some(&[1.0, 1.0, 0.0]), false).is_none());
    }

    #[test]
    fn test_embedded_tags_preferred_over_world_file() {
        let dir = std::env::temp_dir().join(format!("segpaint_geotiff_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let tif = dir.join("ortho.tif");
        write_geotiff(
            &tif,
            &[0.5, 0.5, 0.0],
            &[0.0, 0.0, 0.0, 500000.0, 4100000.0, 0.0],
            None,
        );
        fs::write(dir.join("ortho.tfw"), WORLD_FILE).unwrap();

        let t = AffineTransform::load_for_image(&tif).unwrap().unwrap();
        assert!(approx(t.apply(0.0, 0.0), (500000.0, 4100000.0)));

        let point_tif = dir.join("points.tif");
        write_geotiff(
            &point_tif,
            &[0.5, 0.5, 0.0],
            &[0.0, 0.0, 0.0, 500000.0, 4100000.0, 0.0],
            Some(&[1, 1, 0, 1, GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_POINT]),
        );
        let t = AffineTransform::load_for_image(&point_tif).unwrap().unwrap();
        assert!(approx(t.apply(0.0, 0.0), (499999.75, 4100000.25)));

        let _ = fs::remove_dir_all(&dir);
    }
}
