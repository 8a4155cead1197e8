//! Binary morphology on single-channel buffers: thresholding, Chebyshev
//! dilation and connected-component extraction.

use std::collections::VecDeque;

use crate::error::RasterError;
use crate::ocr::TextBox;

use super::PixelBuffer;

impl PixelBuffer {
    /// Binarize against channel 0: strictly greater than `cutoff` becomes
    /// 255, everything else 0. The output is single-channel.
    pub fn threshold(&self, cutoff: u8) -> Self {
        let plane = self.width as usize * self.height as usize;
        let mut data = vec![0u8; plane];
        for (i, out) in data.iter_mut().enumerate() {
            if self.data[i * self.channels] > cutoff {
                *out = 255;
            }
        }
        Self::from_parts(self.width, self.height, 1, data)
    }

    /// Dilate the foreground by `radius` under the Chebyshev metric.
    ///
    /// Equivalent to a `(2r+1) x (2r+1)` square structuring element: every
    /// pixel within L-infinity distance `radius` of a foreground pixel turns
    /// 255. Distances come from a two-pass 8-neighbor chamfer sweep. Only
    /// single-channel input is accepted.
    pub fn dilate(&self, radius: u32) -> Result<Self, RasterError> {
        if self.channels != 1 {
            return Err(RasterError::NotGrayscale(self.channels));
        }

        let w = self.width as usize;
        let h = self.height as usize;
        let mut dist = vec![u32::MAX; w * h];
        for (i, &px) in self.data.iter().enumerate() {
            if px != 0 {
                dist[i] = 0;
            }
        }

        // Forward sweep: left, up-left, up, up-right.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let mut best = dist[i];
                if x > 0 {
                    best = best.min(dist[i - 1].saturating_add(1));
                }
                if y > 0 {
                    let up = i - w;
                    best = best.min(dist[up].saturating_add(1));
                    if x > 0 {
                        best = best.min(dist[up - 1].saturating_add(1));
                    }
                    if x + 1 < w {
                        best = best.min(dist[up + 1].saturating_add(1));
                    }
                }
                dist[i] = best;
            }
        }

        // Reverse sweep: right, down-right, down, down-left.
        for y in (0..h).rev() {
            for x in (0..w).rev() {
                let i = y * w + x;
                let mut best = dist[i];
                if x + 1 < w {
                    best = best.min(dist[i + 1].saturating_add(1));
                }
                if y + 1 < h {
                    let down = i + w;
                    best = best.min(dist[down].saturating_add(1));
                    if x + 1 < w {
                        best = best.min(dist[down + 1].saturating_add(1));
                    }
                    if x > 0 {
                        best = best.min(dist[down - 1].saturating_add(1));
                    }
                }
                dist[i] = best;
            }
        }

        let data = dist
            .into_iter()
            .map(|d| if d <= radius { 255 } else { 0 })
            .collect();
        Ok(Self::from_parts(self.width, self.height, 1, data))
    }

    /// Bounding boxes of 8-connected components of non-zero pixels.
    ///
    /// Components are discovered in row-major order; components smaller than
    /// `min_area` pixels are dropped.
    pub fn contours(&self, min_area: usize) -> Vec<TextBox> {
        let w = self.width as usize;
        let h = self.height as usize;
        let fg = |x: usize, y: usize| self.data[(y * w + x) * self.channels] != 0;

        let mut visited = vec![false; w * h];
        let mut boxes = Vec::new();
        let mut queue = VecDeque::new();

        for start_y in 0..h {
            for start_x in 0..w {
                if visited[start_y * w + start_x] || !fg(start_x, start_y) {
                    continue;
                }

                let (mut min_x, mut max_x) = (start_x, start_x);
                let (mut min_y, mut max_y) = (start_y, start_y);
                let mut area = 0usize;

                visited[start_y * w + start_x] = true;
                queue.push_back((start_x, start_y));

                while let Some((x, y)) = queue.pop_front() {
                    area += 1;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);

                    let x_lo = x.saturating_sub(1);
                    let y_lo = y.saturating_sub(1);
                    for ny in y_lo..=(y + 1).min(h - 1) {
                        for nx in x_lo..=(x + 1).min(w - 1) {
                            let ni = ny * w + nx;
                            if !visited[ni] && fg(nx, ny) {
                                visited[ni] = true;
                                queue.push_back((nx, ny));
                            }
                        }
                    }
                }

                if area >= min_area {
                    boxes.push(TextBox::new(
                        min_x as u32,
                        min_y as u32,
                        (max_x - min_x + 1) as u32,
                        (max_y - min_y + 1) as u32,
                    ));
                }
            }
        }

        boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gray(width: u32, height: u32, data: Vec<u8>) -> PixelBuffer {
        PixelBuffer::from_raw(width, height, 1, data).unwrap()
    }

    #[test]
    fn threshold_is_binary_and_monotone() {
        let img = gray(4, 1, vec![0, 100, 128, 255]);

        let low = img.threshold(99);
        assert_eq!(low.channels(), 1);
        assert_eq!(low.data(), &[0, 255, 255, 255]);

        let high = img.threshold(128);
        assert_eq!(high.data(), &[0, 0, 0, 255]);

        // Raising the cutoff never adds foreground pixels.
        for (l, h) in low.data().iter().zip(high.data()) {
            assert!(h <= l);
        }
    }

    #[test]
    fn threshold_reads_channel_zero() {
        let img = PixelBuffer::from_raw(2, 1, 3, vec![200, 0, 0, 10, 255, 255]).unwrap();
        let out = img.threshold(128);
        assert_eq!(out.data(), &[255, 0]);
    }

    #[test]
    fn dilate_center_pixel() {
        // Single lit pixel at (3, 3) grows to a 3x3 block under radius 1.
        let mut data = vec![0u8; 64];
        data[3 * 8 + 3] = 255;
        let img = gray(8, 8, data);

        let out = img.dilate(1).unwrap();
        for y in 0..8u32 {
            for x in 0..8u32 {
                let expected = (2..=4).contains(&x) && (2..=4).contains(&y);
                let px = out.data()[(y * 8 + x) as usize];
                assert_eq!(px == 255, expected, "pixel ({x}, {y})");
            }
        }

        let boxes = out.contours(1);
        assert_eq!(boxes, vec![TextBox::new(2, 2, 3, 3)]);
    }

    #[test]
    fn dilate_zero_radius_is_identity() {
        let img = gray(4, 4, {
            let mut d = vec![0u8; 16];
            d[5] = 255;
            d[10] = 255;
            d
        });
        let out = img.dilate(0).unwrap();
        assert_eq!(out.data(), img.data());
    }

    #[test]
    fn dilate_grows_monotonically_with_radius() {
        let mut data = vec![0u8; 49];
        data[24] = 255;
        let img = gray(7, 7, data);

        let r1 = img.dilate(1).unwrap();
        let r2 = img.dilate(2).unwrap();
        for (a, b) in r1.data().iter().zip(r2.data()) {
            assert!(b >= a);
        }
        let lit = |b: &PixelBuffer| b.data().iter().filter(|&&p| p == 255).count();
        assert_eq!(lit(&r1), 9);
        assert_eq!(lit(&r2), 25);
    }

    #[test]
    fn dilate_rejects_multi_channel() {
        let img = PixelBuffer::from_raw(2, 2, 3, vec![0; 12]).unwrap();
        assert!(matches!(img.dilate(1), Err(RasterError::NotGrayscale(3))));
    }

    #[test]
    fn contours_partition_foreground() {
        // Two components: a 2x2 block and an L-shape, diagonal-connected.
        #[rustfmt::skip]
        let data = vec![
            255, 255, 0, 0, 0,
            255, 255, 0, 0, 0,
            0,   0,   0, 255, 0,
            0,   0,   255, 0, 0,
        ];
        let img = gray(5, 4, data);
        let boxes = img.contours(1);

        assert_eq!(
            boxes,
            vec![TextBox::new(0, 0, 2, 2), TextBox::new(2, 2, 2, 2)]
        );

        let foreground = img.data().iter().filter(|&&p| p != 0).count();
        assert_eq!(foreground, 6);
    }

    #[test]
    fn contours_discovery_order_is_row_major() {
        #[rustfmt::skip]
        let data = vec![
            0, 0, 0, 255,
            255, 0, 0, 0,
        ];
        let img = gray(4, 2, data);
        let boxes = img.contours(1);
        assert_eq!(
            boxes,
            vec![TextBox::new(3, 0, 1, 1), TextBox::new(0, 1, 1, 1)]
        );
    }

    #[test]
    fn contours_filters_small_components() {
        #[rustfmt::skip]
        let data = vec![
            255, 0, 0, 0,
            0, 0, 255, 255,
        ];
        let img = gray(4, 2, data);
        let boxes = img.contours(2);
        assert_eq!(boxes, vec![TextBox::new(2, 1, 2, 1)]);
    }
}
