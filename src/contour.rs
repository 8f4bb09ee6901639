//! Hierarchical contour tree of a binary frame.
//!
//! `OpenCV` reports contours as a flat list plus a `[next, previous,
//! first_child, parent]` hierarchy. [`extract_contour_tree`] turns that into
//! an owned tree under one synthetic root spanning the whole frame, with
//! children kept in discovery (raster scan) order.

use crate::{
    error::{Error, Result},
    utils::safe_cast::link_to_index,
};
use opencv::{
    core::{Mat, Point, Point2f, Vec4i, Vector},
    imgproc,
    prelude::*,
};

/// One boundary in the contour tree. A parent owns its children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContourNode {
    points: Vec<Point>,
    children: Vec<ContourNode>,
}

impl ContourNode {
    #[must_use]
    pub fn new(points: Vec<Point>, children: Vec<Self>) -> Self {
        Self { points, children }
    }

    /// A childless node
    #[must_use]
    pub fn leaf(points: Vec<Point>) -> Self {
        Self::new(points, Vec::new())
    }

    /// Synthetic root covering a `width` x `height` frame
    #[must_use]
    pub fn frame(width: i32, height: i32, children: Vec<Self>) -> Self {
        let points = vec![
            Point::new(0, 0),
            Point::new(width, 0),
            Point::new(width, height),
            Point::new(0, height),
        ];
        Self::new(points, children)
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes below this one
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Self> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Signed polygon area via the shoelace formula
    fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
        }
        twice_area / 2.0
    }

    /// Enclosed polygon area in square pixels
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Polygon centroid. Degenerate polygons fall back to the mean of their points.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Point2f {
        let n = self.points.len();
        if n == 0 {
            return Point2f::new(0.0, 0.0);
        }

        let area = self.signed_area();
        if area.abs() < f64::EPSILON {
            let (sx, sy) = self
                .points
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + f64::from(p.x), sy + f64::from(p.y)));
            return Point2f::new((sx / n as f64) as f32, (sy / n as f64) as f32);
        }

        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let cross = f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
            cx += (f64::from(a.x) + f64::from(b.x)) * cross;
            cy += (f64::from(a.y) + f64::from(b.y)) * cross;
        }
        let scale = 1.0 / (6.0 * area);
        Point2f::new((cx * scale) as f32, (cy * scale) as f32)
    }
}

/// Extract the full contour tree from a binary (single channel, 0/non-zero) image.
///
/// # Errors
///
/// Returns an error if `OpenCV` fails or reports an inconsistent hierarchy.
pub fn extract_contour_tree(binary: &Mat) -> Result<ContourNode> {
    let mut contours = Vector::<Vector<Point>>::new();
    let mut hierarchy = Vector::<Vec4i>::new();
    imgproc::find_contours_with_hierarchy(
        binary,
        &mut contours,
        &mut hierarchy,
        imgproc::RETR_TREE,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    let n = contours.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut top_level = Vec::new();
    for i in 0..n {
        let links = hierarchy.get(i)?;
        match link_to_index(links[3]) {
            Some(parent) if parent < n && parent != i => children[parent].push(i),
            _ => top_level.push(i),
        }
    }

    // Post-order build with an explicit stack so deep nesting cannot overflow
    let mut built: Vec<Option<ContourNode>> = vec![None; n];
    let mut stack: Vec<(usize, bool)> = top_level.iter().rev().map(|&i| (i, false)).collect();
    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            let kids = take_built(&mut built, &children[i])?;
            built[i] = Some(ContourNode::new(contours.get(i)?.to_vec(), kids));
        } else {
            stack.push((i, true));
            stack.extend(children[i].iter().rev().map(|&c| (c, false)));
        }
    }

    let top = take_built(&mut built, &top_level)?;
    Ok(ContourNode::frame(binary.cols(), binary.rows(), top))
}

fn take_built(built: &mut [Option<ContourNode>], indices: &[usize]) -> Result<Vec<ContourNode>> {
    indices
        .iter()
        .map(|&i| {
            built[i]
                .take()
                .ok_or_else(|| Error::InvalidInput(format!("contour {i} appears twice in hierarchy")))
        })
        .collect()
}
