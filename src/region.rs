//! Rectangle and rectangle-set arithmetic.
//!
//! A [`Region`] is a list of pairwise disjoint, non-empty rectangles. Every operation that
//! produces a region merges neighbouring rectangles that share a full edge until a pass finds
//! nothing left to merge, which keeps the rectangle count small across repeated damage and
//! visibility computations. The algorithms are quadratic in the number of rectangles.

use std::fmt;
use std::ops::{Add, AddAssign, BitAnd, BitAndAssign, Sub, SubAssign};

use arrayvec::ArrayVec;
use page_config::Margins;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Self) -> Self::Output {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Self) -> Self::Output {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle spanning `[x0, x1) x [y0, y1)`.
    pub const fn from_extents(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.w) * i64::from(self.h)
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let r = Rect::from_extents(x0, y0, x1, y1);
        (!r.is_empty()).then_some(r)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`. Empty rectangles are contained everywhere.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Smallest rectangle covering both.
    pub fn bounding(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_extents(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Removes the margins from the edges, never producing a negative size.
    pub fn shrink(&self, margins: &Margins) -> Rect {
        Rect::new(
            self.x + margins.left,
            self.y + margins.top,
            (self.w - margins.horizontal()).max(0),
            (self.h - margins.vertical()).max(0),
        )
    }

    /// Adds the margins around the edges.
    pub fn grow(&self, margins: &Margins) -> Rect {
        Rect::new(
            self.x - margins.left,
            self.y - margins.top,
            self.w + margins.horizontal(),
            self.h + margins.vertical(),
        )
    }

    /// `self \ other` as at most four disjoint rectangles.
    ///
    /// The difference is first cut along the intersection into the eight cells surrounding it,
    /// empty cells are dropped and cells sharing a full edge are merged.
    pub fn subtract(&self, other: &Rect) -> ArrayVec<Rect, 8> {
        let mut out = ArrayVec::new();
        if self.is_empty() {
            return out;
        }

        let Some(i) = self.intersection(other) else {
            out.push(*self);
            return out;
        };

        let xs = [self.x, i.x, i.right(), self.right()];
        let ys = [self.y, i.y, i.bottom(), self.bottom()];
        for row in 0..3 {
            for col in 0..3 {
                if row == 1 && col == 1 {
                    continue;
                }
                let cell = Rect::from_extents(xs[col], ys[row], xs[col + 1], ys[row + 1]);
                if !cell.is_empty() {
                    out.push(cell);
                }
            }
        }

        merge_pass(&mut out);
        out
    }

    /// Joins two rectangles that share a full edge.
    pub fn merge(&self, other: &Rect) -> Option<Rect> {
        if self.y == other.y && self.h == other.h {
            if self.right() == other.x {
                return Some(Rect::new(self.x, self.y, self.w + other.w, self.h));
            }
            if other.right() == self.x {
                return Some(Rect::new(other.x, self.y, self.w + other.w, self.h));
            }
        }
        if self.x == other.x && self.w == other.w {
            if self.bottom() == other.y {
                return Some(Rect::new(self.x, self.y, self.w, self.h + other.h));
            }
            if other.bottom() == self.y {
                return Some(Rect::new(self.x, other.y, self.w, self.h + other.h));
            }
        }
        None
    }
}

/// Merges mergeable pairs until a full pass merges nothing.
fn merge_pass<A>(rects: &mut A)
where
    A: RectList,
{
    loop {
        let mut merged = false;
        'outer: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if let Some(m) = rects.at(i).merge(&rects.at(j)) {
                    rects.set(i, m);
                    rects.take(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }
}

trait RectList {
    fn len(&self) -> usize;
    fn at(&self, idx: usize) -> Rect;
    fn set(&mut self, idx: usize, rect: Rect);
    fn take(&mut self, idx: usize);
}

impl<const N: usize> RectList for ArrayVec<Rect, N> {
    fn len(&self) -> usize {
        ArrayVec::len(self)
    }

    fn at(&self, idx: usize) -> Rect {
        self[idx]
    }

    fn set(&mut self, idx: usize, rect: Rect) {
        self[idx] = rect;
    }

    fn take(&mut self, idx: usize) {
        self.remove(idx);
    }
}

impl RectList for Vec<Rect> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn at(&self, idx: usize) -> Rect {
        self[idx]
    }

    fn set(&mut self, idx: usize, rect: Rect) {
        self[idx] = rect;
    }

    fn take(&mut self, idx: usize) {
        self.remove(idx);
    }
}

/// Set of pixels described by disjoint rectangles.
#[derive(Default, Clone)]
pub struct Region {
    rects: Vec<Rect>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.rects.iter()).finish()
    }
}

impl Region {
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            Self::new()
        } else {
            Self { rects: vec![rect] }
        }
    }

    /// Union of possibly overlapping rectangles.
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.add_rect(rect);
        }
        region
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn area(&self) -> i64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// Bounding box, empty when the region is.
    pub fn extents(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.bounding(r))
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn add_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut pieces = vec![rect];
        for existing in &self.rects {
            pieces = pieces.iter().flat_map(|p| p.subtract(existing)).collect();
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
        self.clean();
    }

    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        if !self.rects.iter().any(|r| r.intersects(&rect)) {
            return;
        }
        self.rects = self.rects.iter().flat_map(|r| r.subtract(&rect)).collect();
        self.clean();
    }

    pub fn intersect_rect(&mut self, rect: Rect) {
        self.rects = self
            .rects
            .iter()
            .filter_map(|r| r.intersection(&rect))
            .collect();
        self.clean();
    }

    pub fn union(&self, other: &Region) -> Region {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    pub fn union_with(&mut self, other: &Region) {
        for r in &other.rects {
            self.add_rect(*r);
        }
    }

    pub fn subtract(&self, other: &Region) -> Region {
        let mut out = self.clone();
        out.subtract_with(other);
        out
    }

    pub fn subtract_with(&mut self, other: &Region) {
        for r in &other.rects {
            if self.is_empty() {
                break;
            }
            self.subtract_rect(*r);
        }
    }

    pub fn intersect(&self, other: &Region) -> Region {
        // Pairwise intersections of two disjoint sets are disjoint.
        let mut rects = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(i) = a.intersection(b) {
                    rects.push(i);
                }
            }
        }
        let mut out = Region { rects };
        out.clean();
        out
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        Region {
            rects: self.rects.iter().map(|r| r.translate(dx, dy)).collect(),
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.rects.iter().any(|r| r.contains_point(p))
    }

    pub fn contains_rect(&self, rect: &Rect) -> bool {
        let mut rest = Region::from_rect(*rect);
        rest.subtract_with(self);
        rest.is_empty()
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    pub fn intersects(&self, other: &Region) -> bool {
        other.rects.iter().any(|r| self.intersects_rect(r))
    }

    /// Drops empty rectangles and merges neighbours until stable.
    fn clean(&mut self) {
        self.rects.retain(|r| !r.is_empty());
        merge_pass(&mut self.rects);
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::from_rect(rect)
    }
}

/// Regions are equal when they cover the same pixels, whatever their decomposition.
impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.area() == other.area() && self.subtract(other).is_empty()
    }
}

impl Eq for Region {}

impl Add<&Region> for &Region {
    type Output = Region;

    fn add(self, rhs: &Region) -> Region {
        self.union(rhs)
    }
}

impl Sub<&Region> for &Region {
    type Output = Region;

    fn sub(self, rhs: &Region) -> Region {
        self.subtract(rhs)
    }
}

impl BitAnd<&Region> for &Region {
    type Output = Region;

    fn bitand(self, rhs: &Region) -> Region {
        self.intersect(rhs)
    }
}

impl AddAssign<&Region> for Region {
    fn add_assign(&mut self, rhs: &Region) {
        self.union_with(rhs);
    }
}

impl AddAssign<Rect> for Region {
    fn add_assign(&mut self, rhs: Rect) {
        self.add_rect(rhs);
    }
}

impl SubAssign<&Region> for Region {
    fn sub_assign(&mut self, rhs: &Region) {
        self.subtract_with(rhs);
    }
}

impl SubAssign<Rect> for Region {
    fn sub_assign(&mut self, rhs: Rect) {
        self.subtract_rect(rhs);
    }
}

impl BitAndAssign<&Region> for Region {
    fn bitand_assign(&mut self, rhs: &Region) {
        *self = self.intersect(rhs);
    }
}

impl BitAndAssign<Rect> for Region {
    fn bitand_assign(&mut self, rhs: Rect) {
        self.intersect_rect(rhs);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn disjoint(region: &Region) -> bool {
        let rects = region.rects();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                if a.intersects(b) {
                    return false;
                }
            }
        }
        true
    }

    fn arbitrary_rect() -> impl Strategy<Value = Rect> {
        (-20..60, -20..60, 0..40, 0..40).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    fn arbitrary_region() -> impl Strategy<Value = Region> {
        prop::collection::vec(arbitrary_rect(), 0..6).prop_map(Region::from_rects)
    }

    #[test]
    fn subtract_hole_in_the_middle() {
        let outer = Rect::new(0, 0, 30, 30);
        let inner = Rect::new(10, 10, 10, 10);
        let pieces = outer.subtract(&inner);
        assert_eq!(
            pieces.as_slice(),
            [
                Rect::new(0, 0, 30, 10),
                Rect::new(0, 10, 10, 20),
                Rect::new(20, 10, 10, 20),
                Rect::new(10, 20, 10, 10),
            ]
        );
        let total: i64 = pieces.iter().map(Rect::area).sum();
        assert_eq!(total, 30 * 30 - 10 * 10);
    }

    #[test]
    fn subtract_corner_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let pieces = a.subtract(&b);
        assert_eq!(
            pieces.as_slice(),
            [Rect::new(0, 0, 10, 5), Rect::new(0, 5, 5, 5)]
        );
    }

    #[test]
    fn subtract_disjoint_and_covering() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.subtract(&Rect::new(20, 20, 5, 5)).as_slice(), [a]);
        assert!(a.subtract(&Rect::new(-5, -5, 30, 30)).is_empty());
        assert!(Rect::new(0, 0, 0, 10).subtract(&a).is_empty());
    }

    #[test]
    fn adjacent_rects_merge() {
        let region = Region::from_rects([
            Rect::new(0, 0, 10, 10),
            Rect::new(10, 0, 10, 10),
            Rect::new(0, 10, 20, 5),
        ]);
        assert_eq!(region.rects(), [Rect::new(0, 0, 20, 15)]);
    }

    #[test]
    fn overlapping_union_area() {
        let region = Region::from_rects([Rect::new(0, 0, 10, 10), Rect::new(5, 5, 10, 10)]);
        assert_eq!(region.area(), 175);
        assert!(disjoint(&region));
        assert_eq!(region.extents(), Rect::new(0, 0, 15, 15));
    }

    #[test]
    fn containment() {
        let region = Region::from_rects([Rect::new(0, 0, 10, 10), Rect::new(10, 0, 10, 5)]);
        assert!(region.contains_point(Point::new(15, 2)));
        assert!(!region.contains_point(Point::new(15, 7)));
        assert!(region.contains_rect(&Rect::new(5, 0, 10, 5)));
        assert!(!region.contains_rect(&Rect::new(5, 0, 10, 6)));
    }

    #[test]
    fn rect_shrink_clamps() {
        let r = Rect::new(10, 10, 4, 4);
        let shrunk = r.shrink(&Margins::uniform(3));
        assert_eq!(shrunk, Rect::new(13, 13, 0, 0));
        assert!(shrunk.is_empty());
        assert_eq!(
            Rect::new(0, 0, 100, 50).shrink(&Margins::new(1, 2, 3, 4)),
            Rect::new(3, 1, 93, 47)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn results_stay_disjoint(a in arbitrary_region(), b in arbitrary_region()) {
            prop_assert!(disjoint(&a));
            prop_assert!(disjoint(&(&a + &b)));
            prop_assert!(disjoint(&(&a - &b)));
            prop_assert!(disjoint(&(&a & &b)));
        }

        #[test]
        fn difference_is_disjoint_from_subtrahend(a in arbitrary_region(), b in arbitrary_region()) {
            let diff = &a - &b;
            prop_assert!((&diff & &b).is_empty());
        }

        #[test]
        fn difference_plus_intersection_restores(a in arbitrary_region(), b in arbitrary_region()) {
            let restored = &(&a - &b) + &(&a & &b);
            prop_assert_eq!(restored, a);
        }

        #[test]
        fn intersection_is_idempotent(a in arbitrary_region()) {
            prop_assert_eq!(&a & &a, a.clone());
            prop_assert_eq!((&a & &a).area(), a.area());
        }

        #[test]
        fn subtracting_disjoint_region_is_identity(a in arbitrary_region(), offset in 200..300) {
            let b = a.translate(offset, offset);
            let diff = &a - &b;
            prop_assert_eq!(diff.rects(), a.rects());
        }

        #[test]
        fn union_area_inclusion_exclusion(a in arbitrary_region(), b in arbitrary_region()) {
            let union = &a + &b;
            let inter = &a & &b;
            prop_assert_eq!(union.area(), a.area() + b.area() - inter.area());
        }

        #[test]
        fn rect_subtract_covers_exact_difference(a in arbitrary_rect(), b in arbitrary_rect()) {
            let pieces = a.subtract(&b);
            let total: i64 = pieces.iter().map(Rect::area).sum();
            let inter = a.intersection(&b).map_or(0, |r| r.area());
            prop_assert_eq!(total, a.area() - inter);
            for p in &pieces {
                prop_assert!(a.contains_rect(p));
                prop_assert!(!p.intersects(&b));
            }
        }
    }
}
