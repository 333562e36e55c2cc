/// Integer pixel rectangle, `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        IRect { x, y, width, height }
    }

    pub const fn from_size(width: i32, height: i32) -> Self {
        IRect::new(0, 0, width, height)
    }

    /// Rectangle with no area.
    pub const EMPTY: IRect = IRect::new(0, 0, 0, 0);

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: IRect) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Overlapping part of both rectangles. Disjoint rectangles give an empty rectangle
    /// anchored at the overlap corner.
    pub fn intersection(&self, other: IRect) -> IRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        IRect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }

    /// Splits the rectangle into at most `count` horizontal bands. Every band except the last
    /// ends on an even absolute row so a 2x2 quad never straddles two bands.
    pub fn split_rows(&self, count: usize) -> Vec<IRect> {
        if self.is_empty() {
            return Vec::new();
        }
        let count = count.max(1) as i64;
        let mut bands = Vec::with_capacity(count as usize);
        let mut start = self.y;
        for i in 1..=count {
            let end = if i == count {
                self.bottom()
            } else {
                let target = self.y as i64 + self.height as i64 * i / count;
                (((target + 1) & !1) as i32).clamp(start, self.bottom())
            };
            if end > start {
                bands.push(IRect::new(self.x, start, self.width, end - start));
                start = end;
            }
        }
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = IRect::new(0, 0, 10, 10);
        let b = IRect::new(5, -3, 10, 6);
        assert_eq!(a.intersection(b), IRect::new(5, 0, 5, 3));
        assert!(a.intersects(b));
        assert!(!a.intersects(IRect::new(10, 0, 4, 4)));
    }

    #[test]
    fn split_rows_covers_everything_on_even_rows() {
        let rect = IRect::new(3, 1, 20, 101);
        for count in 1..12 {
            let bands = rect.split_rows(count);
            assert!(bands.len() <= count);
            assert_eq!(bands[0].y, rect.y);
            assert_eq!(bands.last().unwrap().bottom(), rect.bottom());
            for pair in bands.windows(2) {
                assert_eq!(pair[0].bottom(), pair[1].y);
                assert_eq!(pair[0].bottom() % 2, 0);
            }
        }
    }

    #[test]
    fn split_empty_rect_gives_nothing() {
        assert!(IRect::new(0, 0, 0, 5).split_rows(4).is_empty());
    }
}
