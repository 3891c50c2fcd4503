//! Binary split container.
//!
//! A split owns exactly two tree children, `pack0` (left or top) and `pack1` (right or bottom),
//! separated by a draggable bar of the theme's split width.

use crate::region::{Point, Rect};
use crate::tree::{NodeId, Tree};

pub const MIN_RATIO: f64 = 0.05;
pub const MAX_RATIO: f64 = 0.95;

/// Orientation of the split bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitType {
    /// Horizontal bar, children stacked top to bottom.
    Horizontal,
    /// Vertical bar, children side by side.
    Vertical,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// Result of dividing a split's allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitAllocation {
    pub pack0: Rect,
    pub pack1: Rect,
    pub bar: Rect,
}

#[derive(Debug)]
pub struct Split {
    pub split_type: SplitType,
    ratio: f64,
    pub allocation: Rect,
    pub bar: Rect,
}

impl Split {
    pub fn new(split_type: SplitType, ratio: f64) -> Self {
        Self {
            split_type,
            ratio: clamp_ratio(ratio),
            allocation: Rect::default(),
            bar: Rect::default(),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = clamp_ratio(ratio);
    }

    /// The two packed children, once both are attached.
    pub fn packs(tree: &Tree, split: NodeId) -> Option<(NodeId, NodeId)> {
        match tree.children(split) {
            [pack0, pack1] => Some((*pack0, *pack1)),
            _ => None,
        }
    }

    /// Minimum size of a split given its children's minimums.
    pub fn min_size(split_type: SplitType, min0: Size, min1: Size, split_width: i32) -> Size {
        match split_type {
            SplitType::Vertical => Size::new(min0.w + split_width + min1.w, min0.h.max(min1.h)),
            SplitType::Horizontal => Size::new(min0.w.max(min1.w), min0.h + split_width + min1.h),
        }
    }
}

pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return 0.5;
    }
    ratio.clamp(MIN_RATIO, MAX_RATIO)
}

/// Divides `alloc` between the two children.
///
/// When a child's minimum exceeds its share the other child shrinks to compensate. A split
/// with a parent container must always honour both minimums when the allocation is large
/// enough to hold them.
pub fn compute_children_allocation(
    split_type: SplitType,
    ratio: f64,
    alloc: Rect,
    min0: Size,
    min1: Size,
    split_width: i32,
    has_parent: bool,
) -> SplitAllocation {
    let ratio = clamp_ratio(ratio);

    let (total, need0, need1) = match split_type {
        SplitType::Vertical => (alloc.w - split_width, min0.w, min1.w),
        SplitType::Horizontal => (alloc.h - split_width, min0.h, min1.h),
    };
    let total = total.max(0);

    let mut len0 = (f64::from(total) * ratio).round() as i32;
    if len0 < need0 {
        len0 = need0;
    }
    let mut len1 = total - len0;
    if len1 < need1 {
        len1 = need1;
        len0 = total - len1;
    }
    len0 = len0.clamp(0, total);
    len1 = total - len0;

    if has_parent && total >= need0 + need1 {
        assert!(
            len0 >= need0 && len1 >= need1,
            "split allocation {len0}+{len1} violates minimums {need0}+{need1}"
        );
    }

    match split_type {
        SplitType::Vertical => SplitAllocation {
            pack0: Rect::new(alloc.x, alloc.y, len0, alloc.h),
            bar: Rect::new(alloc.x + len0, alloc.y, split_width.min(alloc.w), alloc.h),
            pack1: Rect::new(alloc.x + len0 + split_width, alloc.y, len1, alloc.h),
        },
        SplitType::Horizontal => SplitAllocation {
            pack0: Rect::new(alloc.x, alloc.y, alloc.w, len0),
            bar: Rect::new(alloc.x, alloc.y + len0, alloc.w, split_width.min(alloc.h)),
            pack1: Rect::new(alloc.x, alloc.y + len0 + split_width, alloc.w, len1),
        },
    }
}

/// Ratio that puts the center of the bar under the pointer, clamped to the valid range.
pub fn compute_split_constraint(
    split_type: SplitType,
    alloc: Rect,
    pointer: Point,
    split_width: i32,
) -> f64 {
    let (offset, total) = match split_type {
        SplitType::Vertical => (pointer.x - alloc.x, alloc.w - split_width),
        SplitType::Horizontal => (pointer.y - alloc.y, alloc.h - split_width),
    };
    if total <= 0 {
        return 0.5;
    }
    let len0 = offset - split_width / 2;
    clamp_ratio(f64::from(len0) / f64::from(total))
}
