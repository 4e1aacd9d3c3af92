//! Source detection
//!
//! Thresholds the map, labels the 8-connected components of the foreground
//! and bounds the emission region of interest.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::Image;

/// Default minimum area [pixel] of a significant component
pub const MIN_AREA: usize = 500;

#[derive(thiserror::Error, Debug)]
pub enum DetectionError {
    #[error("no pixel above the {0:e} detection threshold")]
    NoSourceDetected(f64),
}
type Result<T> = std::result::Result<T, DetectionError>;

/// Pixel bounding box, rows `y1..y2` and columns `x1..x2` (upper bounds excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub y1: usize,
    pub x1: usize,
    pub y2: usize,
    pub x2: usize,
}
impl BoundingBox {
    fn pixel(row: usize, col: usize) -> Self {
        Self {
            y1: row,
            x1: col,
            y2: row + 1,
            x2: col + 1,
        }
    }
    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            y1: self.y1.min(other.y1),
            x1: self.x1.min(other.x1),
            y2: self.y2.max(other.y2),
            x2: self.x2.max(other.x2),
        }
    }
    pub fn height(&self) -> usize {
        self.y2 - self.y1
    }
    pub fn width(&self) -> usize {
        self.x2 - self.x1
    }
}

/// Connected component properties
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub label: u32,
    /// number of pixels
    pub area: usize,
    pub bbox: BoundingBox,
}

/// Detected emission region
#[derive(Debug, Clone)]
pub struct Region {
    /// label mask, 0 is background
    pub labels: DMatrix<u32>,
    /// box enclosing the retained components
    pub bbox: BoundingBox,
    /// all the components found above the threshold, ordered by label
    pub components: Vec<Component>,
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize];
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra < rb {
        parent[rb as usize] = ra;
    } else if rb < ra {
        parent[ra as usize] = rb;
    }
}

/// Labels the 8-connected components of a binary mask
///
/// Labels are numbered from 1 in raster order (row by row) of the components first pixel.
/// Returns the label matrix and the number of components.
pub fn label_components(mask: &DMatrix<bool>) -> (DMatrix<u32>, usize) {
    let (nrows, ncols) = mask.shape();
    let mut labels = DMatrix::<u32>::zeros(nrows, ncols);
    let mut parent: Vec<u32> = vec![0];

    for row in 0..nrows {
        for col in 0..ncols {
            if !mask[(row, col)] {
                continue;
            }
            let mut neighbors = Vec::with_capacity(4);
            if col > 0 {
                neighbors.push(labels[(row, col - 1)]);
            }
            if row > 0 {
                neighbors.push(labels[(row - 1, col)]);
                if col > 0 {
                    neighbors.push(labels[(row - 1, col - 1)]);
                }
                if col + 1 < ncols {
                    neighbors.push(labels[(row - 1, col + 1)]);
                }
            }
            neighbors.retain(|&l| l > 0);
            match neighbors.iter().min().copied() {
                None => {
                    let label = parent.len() as u32;
                    parent.push(label);
                    labels[(row, col)] = label;
                }
                Some(min_label) => {
                    labels[(row, col)] = min_label;
                    for &l in &neighbors {
                        union(&mut parent, min_label, l);
                    }
                }
            }
        }
    }

    let mut sequential: HashMap<u32, u32> = HashMap::new();
    for row in 0..nrows {
        for col in 0..ncols {
            let label = labels[(row, col)];
            if label == 0 {
                continue;
            }
            let root = find(&mut parent, label);
            let next = sequential.len() as u32 + 1;
            labels[(row, col)] = *sequential.entry(root).or_insert(next);
        }
    }
    (labels, sequential.len())
}

/// Area and bounding box of each labeled component, ordered by label
pub fn components(labels: &DMatrix<u32>, n_label: usize) -> Vec<Component> {
    let mut props: Vec<Option<Component>> = vec![None; n_label];
    for row in 0..labels.nrows() {
        for col in 0..labels.ncols() {
            let label = labels[(row, col)];
            if label == 0 {
                continue;
            }
            let pixel = BoundingBox::pixel(row, col);
            let entry = props[label as usize - 1].get_or_insert(Component {
                label,
                area: 0,
                bbox: pixel,
            });
            entry.area += 1;
            entry.bbox = entry.bbox.union(&pixel);
        }
    }
    props.into_iter().flatten().collect()
}

/// Detects the emission region above `threshold`
///
/// The primary component is the largest one (first label on ties) and the significant
/// components are those with an area larger than `min_area`.
/// With fewer than 2 significant components, the label mask keeps only the primary
/// component, relabeled 1, and the box is the primary component box.
/// Otherwise the label mask is left untouched and the box encloses all the significant
/// components.
pub fn detect(image: &Image, threshold: f64, min_area: usize) -> Result<Region> {
    let mask = image.map(|x| x >= threshold);
    let (labels, n_label) = label_components(&mask);
    let components = components(&labels, n_label);

    let primary = components
        .iter()
        .fold(None::<&Component>, |max, c| match max {
            Some(m) if m.area >= c.area => Some(m),
            _ => Some(c),
        })
        .cloned()
        .ok_or(DetectionError::NoSourceDetected(threshold))?;
    let significant: Vec<&Component> = components.iter().filter(|c| c.area > min_area).collect();
    log::debug!(
        "{} components above {:e}, {} larger than {} pixels, primary: #{} ({} pixels)",
        components.len(),
        threshold,
        significant.len(),
        min_area,
        primary.label,
        primary.area
    );

    let (labels, bbox) = if significant.len() < 2 {
        (
            labels.map(|l| u32::from(l == primary.label)),
            primary.bbox,
        )
    } else {
        let bbox = significant
            .iter()
            .fold(primary.bbox, |bbox, c| bbox.union(&c.bbox));
        (labels, bbox)
    };
    Ok(Region {
        labels,
        bbox,
        components,
    })
}
