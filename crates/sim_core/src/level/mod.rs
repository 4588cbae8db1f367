use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::geometry::{distance_between, Vec2};
use crate::sim::los::LineOfSight;

pub const WALL_THRESHOLD: u8 = 200;
pub const MARKER_THRESHOLD: u8 = 200;
const BYTES_PER_CELL: usize = 4;

/// One level-map pixel. The boss marker lives in alpha, so it is present when
/// the pixel is *less* opaque than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCell {
    pub boss_location: u8,
    pub wall: u8,
    pub generator_location: u8,
    pub hero_spawn: u8,
}

impl LevelCell {
    pub fn is_wall(&self) -> bool {
        self.wall > WALL_THRESHOLD
    }

    pub fn has_boss(&self) -> bool {
        self.boss_location <= MARKER_THRESHOLD
    }

    pub fn has_generator(&self) -> bool {
        self.generator_location >= MARKER_THRESHOLD
    }

    pub fn has_hero_spawn(&self) -> bool {
        self.hero_spawn >= MARKER_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelLayout {
    pub hero_spawns: Vec<Vec2>,
    pub generators: Vec<Vec2>,
    pub bosses: Vec<Vec2>,
    pub wall_cells: usize,
}

#[derive(Debug, Error)]
pub enum LevelMapError {
    #[error("level map must not be empty, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("level map {width}x{height} is too large to address")]
    TooLarge { width: u32, height: u32 },
    #[error("level map byte count mismatch: expected {expected}, got {actual}")]
    ByteCountMismatch { expected: usize, actual: usize },
    #[error("level map cell size must be finite and positive, got {0}")]
    InvalidCellSize(f32),
    #[error("failed to open level map {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode level map {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Level image centred on the world origin. Each pixel covers a square of
/// `cell_size` world units; row 0 is the top of the level (largest y).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelMap {
    width: u32,
    height: u32,
    cell_size: f32,
    argb: Vec<u8>,
}

impl LevelMap {
    pub fn from_argb_bytes(
        width: u32,
        height: u32,
        cell_size: f32,
        argb: Vec<u8>,
    ) -> Result<Self, LevelMapError> {
        if width == 0 || height == 0 {
            return Err(LevelMapError::Empty { width, height });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(LevelMapError::InvalidCellSize(cell_size));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|cells| cells.checked_mul(BYTES_PER_CELL))
            .ok_or(LevelMapError::TooLarge { width, height })?;
        if argb.len() != expected {
            return Err(LevelMapError::ByteCountMismatch {
                expected,
                actual: argb.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cell_size,
            argb,
        })
    }

    pub fn from_rgba_image(image: &image::RgbaImage, cell_size: f32) -> Result<Self, LevelMapError> {
        let mut argb = Vec::with_capacity(image.as_raw().len());
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            argb.extend_from_slice(&[a, r, g, b]);
        }
        Self::from_argb_bytes(image.width(), image.height(), cell_size, argb)
    }

    pub fn load_png(path: &Path, cell_size: f32) -> Result<Self, LevelMapError> {
        let reader = image::ImageReader::open(path).map_err(|source| LevelMapError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| LevelMapError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_rgba_image(&decoded.to_rgba8(), cell_size)?;
        info!(
            path = %path.display(),
            width = map.width,
            height = map.height,
            cell_size,
            "level_map_loaded"
        );
        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<LevelCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = BYTES_PER_CELL * (y as usize * self.width as usize + x as usize);
        let bytes = self.argb.get(index..index + BYTES_PER_CELL)?;
        Some(LevelCell {
            boss_location: bytes[0],
            wall: bytes[1],
            generator_location: bytes[2],
            hero_spawn: bytes[3],
        })
    }

    fn half_extent(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size * 0.5,
            self.height as f32 * self.cell_size * 0.5,
        )
    }

    pub fn world_to_cell(&self, position: Vec2) -> Option<(u32, u32)> {
        let half = self.half_extent();
        let column = ((position.x + half.x) / self.cell_size).floor();
        let row = ((half.y - position.y) / self.cell_size).floor();
        if !(column >= 0.0 && row >= 0.0) {
            return None;
        }
        let (column, row) = (column as u32, row as u32);
        if column >= self.width || row >= self.height {
            return None;
        }
        Some((column, row))
    }

    pub fn cell_center_world(&self, x: u32, y: u32) -> Option<Vec2> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let half = self.half_extent();
        Some(Vec2::new(
            (x as f32 + 0.5) * self.cell_size - half.x,
            half.y - (y as f32 + 0.5) * self.cell_size,
        ))
    }

    /// Anything outside the map counts as wall.
    pub fn is_wall_at(&self, position: Vec2) -> bool {
        self.world_to_cell(position)
            .and_then(|(x, y)| self.cell(x, y))
            .map_or(true, |cell| cell.is_wall())
    }

    /// Distance walked from `from` toward `to` before entering a wall cell, or
    /// the full segment length when the path is clear.
    pub fn distance_to_wall(&self, from: Vec2, to: Vec2) -> f32 {
        self.first_wall_along(from, to)
            .unwrap_or_else(|| distance_between(from, to))
    }

    fn first_wall_along(&self, from: Vec2, to: Vec2) -> Option<f32> {
        let length = distance_between(from, to);
        if self.is_wall_at(from) {
            return Some(0.0);
        }
        if length <= f32::EPSILON {
            return None;
        }
        let step = self.cell_size * 0.5;
        let direction = (to - from) * (1.0 / length);
        let mut travelled = step;
        while travelled < length {
            if self.is_wall_at(from + direction * travelled) {
                return Some(travelled);
            }
            travelled += step;
        }
        self.is_wall_at(to).then_some(length)
    }

    pub fn scan_layout(&self) -> LevelLayout {
        let mut layout = LevelLayout::default();
        for y in 0..self.height {
            for x in 0..self.width {
                let (Some(cell), Some(center)) = (self.cell(x, y), self.cell_center_world(x, y))
                else {
                    continue;
                };
                if cell.is_wall() {
                    layout.wall_cells += 1;
                }
                if cell.has_boss() {
                    layout.bosses.push(center);
                }
                if cell.has_generator() {
                    layout.generators.push(center);
                }
                if cell.has_hero_spawn() {
                    layout.hero_spawns.push(center);
                }
            }
        }
        layout
    }
}

impl LineOfSight for LevelMap {
    fn can_see(&self, from: Vec2, to: Vec2) -> bool {
        self.first_wall_along(from, to).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const FLOOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WALL: Rgba<u8> = Rgba([255, 0, 0, 255]);

    /// 8x8 map of 10-unit cells with a wall column at x = 4 rows 0..6.
    fn walled_image() -> RgbaImage {
        let mut image = RgbaImage::from_pixel(8, 8, FLOOR);
        for y in 0..6 {
            image.put_pixel(4, y, WALL);
        }
        image.put_pixel(1, 1, Rgba([0, 255, 0, 255]));
        image.put_pixel(6, 6, Rgba([0, 0, 255, 255]));
        image.put_pixel(2, 6, Rgba([0, 0, 0, 100]));
        image
    }

    fn walled_map() -> LevelMap {
        LevelMap::from_rgba_image(&walled_image(), 10.0).expect("map")
    }

    #[test]
    fn cell_reads_channels_at_four_bytes_per_pixel() {
        let argb = vec![
            1, 2, 3, 4, //
            10, 20, 30, 40, //
        ];
        let map = LevelMap::from_argb_bytes(2, 1, 1.0, argb).expect("map");

        assert_eq!(
            map.cell(1, 0),
            Some(LevelCell {
                boss_location: 10,
                wall: 20,
                generator_location: 30,
                hero_spawn: 40,
            })
        );
        assert_eq!(map.cell(2, 0), None);
    }

    #[test]
    fn byte_count_must_match_dimensions() {
        let result = LevelMap::from_argb_bytes(2, 2, 1.0, vec![0; 15]);

        assert!(matches!(
            result,
            Err(LevelMapError::ByteCountMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_allocating() {
        let result = LevelMap::from_argb_bytes(u32::MAX, u32::MAX, 1.0, Vec::new());

        assert!(matches!(
            result,
            Err(LevelMapError::TooLarge {
                width: u32::MAX,
                height: u32::MAX
            })
        ));
    }

    #[test]
    fn world_and_cell_coordinates_agree() {
        let map = walled_map();

        assert_eq!(map.world_to_cell(Vec2::new(-40.0, 40.0)), Some((0, 0)));
        assert_eq!(map.world_to_cell(Vec2::new(39.0, -39.0)), Some((7, 7)));
        assert_eq!(map.world_to_cell(Vec2::new(41.0, 0.0)), None);
        assert_eq!(map.cell_center_world(0, 0), Some(Vec2::new(-35.0, 35.0)));
        let center = map.cell_center_world(5, 2).expect("center");
        assert_eq!(map.world_to_cell(center), Some((5, 2)));
    }

    #[test]
    fn scan_layout_finds_markers_at_cell_centres() {
        let layout = walled_map().scan_layout();

        assert_eq!(layout.wall_cells, 6);
        assert_eq!(layout.generators, vec![Vec2::new(-25.0, 25.0)]);
        assert_eq!(layout.hero_spawns, vec![Vec2::new(25.0, -25.0)]);
        assert_eq!(layout.bosses, vec![Vec2::new(-15.0, -25.0)]);
    }

    #[test]
    fn wall_blocks_sight_and_gap_lets_it_through() {
        let map = walled_map();
        let left = map.cell_center_world(1, 2).expect("left");
        let right = map.cell_center_world(6, 2).expect("right");
        let low_left = map.cell_center_world(1, 7).expect("low left");
        let low_right = map.cell_center_world(6, 7).expect("low right");

        assert!(!map.can_see(left, right));
        assert!(map.can_see(low_left, low_right));
        let to_wall = map.distance_to_wall(left, right);
        assert!(to_wall > 0.0 && to_wall < distance_between(left, right));
        assert_eq!(
            map.distance_to_wall(low_left, low_right),
            distance_between(low_left, low_right)
        );
    }

    #[test]
    fn load_png_reads_level_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("level.png");
        walled_image().save(&path).expect("write png");

        let map = LevelMap::load_png(&path, 10.0).expect("load");

        assert_eq!(map, walled_map());
    }

    #[test]
    fn load_png_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.png");

        let error = LevelMap::load_png(&missing, 10.0).expect_err("missing file");
        assert!(matches!(error, LevelMapError::Open { .. }));
    }
}
