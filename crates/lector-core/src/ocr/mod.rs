//! OCR pipeline using the PaddleOCR PP-OCR detection and recognition models.

mod detector;
mod engine;
mod recognizer;

pub use detector::TextDetector;
pub use engine::{OcrEngine, RawImage};
pub use recognizer::TextRecognizer;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// An axis-aligned text region in integer pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box with no pixels; such boxes are skipped by the recognizer.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// A recognized text region in source coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Decoded text content.
    pub text: String,

    /// Region the text was recognized in.
    pub bbox: TextBox,

    /// Mean per-step confidence; NaN when the decode emitted nothing.
    pub confidence: f32,
}

/// Recognition results grouped into reading-order lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// All text, space-separated within a line, newline-separated between
    /// lines.
    pub text: String,

    /// Reading-order lines of recognition results.
    pub lines: Vec<Vec<RecognitionResult>>,

    /// Arithmetic mean of the per-result confidences.
    pub confidence: f32,
}

/// Reading-order comparison: boxes whose vertical distance is less than a
/// quarter of their combined heights count as the same visual line and order
/// by x; otherwise top-to-bottom.
pub(crate) fn reading_order(a: &TextBox, b: &TextBox) -> Ordering {
    let dy = (a.y as i64 - b.y as i64).abs();
    if dy * 4 < a.height as i64 + b.height as i64 {
        a.x.cmp(&b.x)
    } else {
        a.y.cmp(&b.y)
    }
}

impl OcrResult {
    /// Group an already reading-ordered result sequence into lines.
    ///
    /// A result joins the current line while its vertical offset from the
    /// previous result stays within half of the line's running average
    /// height; otherwise it starts a new line.
    pub fn from_reading_order(results: &[RecognitionResult]) -> Self {
        let mut lines: Vec<Vec<RecognitionResult>> = Vec::new();
        let mut current: Vec<RecognitionResult> = Vec::new();
        let mut height_sum = 0.0f32;
        let mut prev_y = 0.0f32;

        for result in results {
            if current.is_empty() {
                height_sum = result.bbox.height as f32;
            } else {
                let avg_height = height_sum / current.len() as f32;
                if (result.bbox.y as f32 - prev_y).abs() <= avg_height * 0.5 {
                    height_sum += result.bbox.height as f32;
                } else {
                    lines.push(std::mem::take(&mut current));
                    height_sum = result.bbox.height as f32;
                }
            }
            prev_y = result.bbox.y as f32;
            current.push(result.clone());
        }
        if !current.is_empty() {
            lines.push(current);
        }

        let text = lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        let confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f32>() / results.len() as f32
        };

        Self {
            text,
            lines,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(text: &str, x: u32, y: u32, height: u32, confidence: f32) -> RecognitionResult {
        RecognitionResult {
            text: text.to_string(),
            bbox: TextBox::new(x, y, 40, height),
            confidence,
        }
    }

    #[test]
    fn reading_order_groups_near_rows_by_x() {
        // Heights 20 + 20, quarter is 10: dy of 2 keeps them on one row.
        let a = TextBox::new(50, 10, 40, 20);
        let b = TextBox::new(5, 12, 40, 20);
        assert_eq!(reading_order(&a, &b), Ordering::Greater);

        // dy of 30 separates the rows regardless of x.
        let c = TextBox::new(5, 40, 40, 20);
        assert_eq!(reading_order(&a, &c), Ordering::Less);
    }

    #[test]
    fn reading_order_boundary_is_exclusive() {
        // dy exactly equal to (ha + hb)/4 falls through to the y ordering.
        let a = TextBox::new(50, 0, 40, 20);
        let b = TextBox::new(5, 10, 40, 20);
        assert_eq!(reading_order(&a, &b), Ordering::Less);
    }

    #[test]
    fn grouping_splits_on_vertical_jumps() {
        let results = vec![
            result("invoice", 5, 10, 20, 0.9),
            result("2024", 60, 12, 20, 0.8),
            result("total", 5, 40, 20, 0.7),
        ];
        let grouped = OcrResult::from_reading_order(&results);

        assert_eq!(grouped.lines.len(), 2);
        assert_eq!(grouped.lines[0].len(), 2);
        assert_eq!(grouped.lines[1].len(), 1);
        assert_eq!(grouped.text, "invoice 2024\ntotal");
        assert!((grouped.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn grouping_tracks_running_average_height() {
        // Second box is tall, pulling the average up so the third still
        // joins the line despite a bigger jump.
        let results = vec![
            result("a", 0, 100, 20, 1.0),
            result("b", 50, 102, 60, 1.0),
            result("c", 120, 118, 20, 1.0),
        ];
        let grouped = OcrResult::from_reading_order(&results);
        assert_eq!(grouped.lines.len(), 1);
        assert_eq!(grouped.text, "a b c");
    }

    #[test]
    fn grouping_empty_input() {
        let grouped = OcrResult::from_reading_order(&[]);
        assert!(grouped.lines.is_empty());
        assert_eq!(grouped.text, "");
        assert_eq!(grouped.confidence, 0.0);
    }
}
