//! Sprite extraction via 4-connected component labelling.
//!
//! Any pixel with non-zero alpha is foreground. Components are discovered in
//! row-major order and grown breadth-first from a frontier queue, so large
//! contiguous regions never recurse.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;
use crate::error::{Result, PixelsError};

// ============================================================================
// TYPES
// ============================================================================

/// Inclusive pixel bounds of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    fn at(x: u32, y: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x);
        self.bottom = self.bottom.max(y);
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Spans more than one pixel on both axes
    pub fn is_sprite_sized(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }
}

/// A component cropped out of the source image
#[derive(Debug, Clone)]
pub struct Sprite {
    pub image: RgbaImage,
    pub bounds: BoundingBox,
}

impl Sprite {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Which pixels already belong to a component, indexed `y * width + x`
pub struct VisitedMask {
    width: u32,
    cells: Vec<bool>,
}

impl VisitedMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            cells: vec![false; width as usize * height as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn is_visited(&self, x: u32, y: u32) -> bool {
        self.cells[self.index(x, y)]
    }

    pub fn mark(&mut self, x: u32, y: u32) {
        let idx = self.index(x, y);
        self.cells[idx] = true;
    }
}

// ============================================================================
// FLOOD FILL
// ============================================================================

fn is_foreground(img: &RgbaImage, x: u32, y: u32) -> bool {
    img.get_pixel(x, y)[3] != 0
}

fn neighbors_4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = (x > 0).then(|| (x - 1, y));
    let right = (x + 1 < width).then(|| (x + 1, y));
    let up = (y > 0).then(|| (x, y - 1));
    let down = (y + 1 < height).then(|| (x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

/// Mark every foreground pixel reachable from the seed and return their bounds
fn flood_fill(img: &RgbaImage, mask: &mut VisitedMask, seed_x: u32, seed_y: u32) -> BoundingBox {
    let (width, height) = img.dimensions();
    let mut bounds = BoundingBox::at(seed_x, seed_y);
    let mut frontier = VecDeque::new();

    mask.mark(seed_x, seed_y);
    frontier.push_back((seed_x, seed_y));

    while let Some((x, y)) = frontier.pop_front() {
        bounds.include(x, y);

        for (nx, ny) in neighbors_4(x, y, width, height) {
            if !mask.is_visited(nx, ny) && is_foreground(img, nx, ny) {
                mask.mark(nx, ny);
                frontier.push_back((nx, ny));
            }
        }
    }

    bounds
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Bounding boxes of every sprite-sized component, in discovery order
pub fn find_components(img: &RgbaImage) -> Vec<BoundingBox> {
    let (width, height) = img.dimensions();
    let mut mask = VisitedMask::new(width, height);
    let mut boxes = Vec::new();
    let mut discarded = 0usize;

    for y in 0..height {
        for x in 0..width {
            if mask.is_visited(x, y) || !is_foreground(img, x, y) {
                continue;
            }

            let bounds = flood_fill(img, &mut mask, x, y);
            if bounds.is_sprite_sized() {
                boxes.push(bounds);
            } else {
                discarded += 1;
            }
        }
    }

    debug!(
        "Found {} components ({} too thin to be sprites)",
        boxes.len() + discarded,
        discarded
    );

    boxes
}

/// Segment a transparent-background image into cropped sprites
pub fn extract_sprites(img: &RgbaImage) -> Vec<Sprite> {
    find_components(img)
        .into_iter()
        .map(|bounds| Sprite {
            image: imageops::crop_imm(img, bounds.left, bounds.top, bounds.width(), bounds.height())
                .to_image(),
            bounds,
        })
        .collect()
}

/// Like `extract_sprites`, but an empty result is an error
pub fn extract_or_fail(img: &RgbaImage) -> Result<Vec<Sprite>> {
    let sprites = extract_sprites(img);
    if sprites.is_empty() {
        return Err(PixelsError::NoSpritesFound);
    }
    Ok(sprites)
}
