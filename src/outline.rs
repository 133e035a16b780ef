use ndarray::{Array2, ArrayView2};

/// Extract a 1-pixel external boundary from a label slice.
///
/// The slice is binarized to `label > 0`; a foreground pixel belongs to the
/// outline when any of its 4-neighbors is background (or lies outside the
/// image). `thickness > 1` dilates the outline by `thickness - 1` passes.
/// Returns `None` when the slice contains no foreground, meaning nothing to
/// render.
pub fn extract_outline(labels: ArrayView2<u8>, thickness: usize) -> Option<Array2<u8>> {
    let (rows, cols) = labels.dim();
    let mut outline = Array2::<u8>::zeros((rows, cols));
    let mut any_foreground = false;

    for ((r, c), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        any_foreground = true;
        let boundary = r == 0
            || c == 0
            || r == rows - 1
            || c == cols - 1
            || labels[[r - 1, c]] == 0
            || labels[[r + 1, c]] == 0
            || labels[[r, c - 1]] == 0
            || labels[[r, c + 1]] == 0;
        if boundary {
            outline[[r, c]] = 255;
        }
    }

    if !any_foreground {
        return None;
    }
    for _ in 1..thickness {
        outline = dilate(&outline);
    }
    Some(outline)
}

/// One 4-neighbor dilation pass.
fn dilate(mask: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    let mut grown = mask.clone();
    for ((r, c), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        if r > 0 {
            grown[[r - 1, c]] = 255;
        }
        if r + 1 < rows {
            grown[[r + 1, c]] = 255;
        }
        if c > 0 {
            grown[[r, c - 1]] = 255;
        }
        if c + 1 < cols {
            grown[[r, c + 1]] = 255;
        }
    }
    grown
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    #[test]
    fn empty_slice_produces_no_outline() {
        let labels = Array2::<u8>::zeros((16, 16));
        assert!(extract_outline(labels.view(), 1).is_none());
    }

    #[test]
    fn filled_square_outline_is_its_perimeter() {
        let mut labels = Array2::<u8>::zeros((20, 20));
        labels.slice_mut(s![5..15, 5..15]).fill(1);

        let outline = extract_outline(labels.view(), 1).unwrap();
        let set: usize = outline.iter().filter(|&&v| v > 0).count();
        // A 10x10 square has a 36-pixel perimeter ring.
        assert_eq!(set, 36);
        // Interior stays empty.
        assert!(outline.slice(s![6..14, 6..14]).iter().all(|&v| v == 0));
        // The ring itself is set.
        assert!(outline.slice(s![5, 5..15]).iter().all(|&v| v == 255));
        assert!(outline.slice(s![5..15, 14]).iter().all(|&v| v == 255));
    }

    #[test]
    fn foreground_touching_image_border_is_boundary() {
        let mut labels = Array2::<u8>::zeros((4, 4));
        labels[[0, 0]] = 3;
        let outline = extract_outline(labels.view(), 1).unwrap();
        assert_eq!(outline[[0, 0]], 255);
    }

    #[test]
    fn thickness_dilates_the_outline() {
        let mut labels = Array2::<u8>::zeros((20, 20));
        labels.slice_mut(s![5..15, 5..15]).fill(1);

        let thin = extract_outline(labels.view(), 1).unwrap();
        let thick = extract_outline(labels.view(), 2).unwrap();
        let thin_count = thin.iter().filter(|&&v| v > 0).count();
        let thick_count = thick.iter().filter(|&&v| v > 0).count();
        assert!(thick_count > thin_count);
    }

    #[test]
    fn multiple_regions_each_get_an_outline() {
        let mut labels = Array2::<u8>::zeros((20, 20));
        labels.slice_mut(s![2..6, 2..6]).fill(1);
        labels.slice_mut(s![10..16, 10..16]).fill(2);
        let outline = extract_outline(labels.view(), 1).unwrap();
        assert_eq!(outline[[2, 3]], 255);
        assert_eq!(outline[[10, 12]], 255);
        assert_eq!(outline[[12, 12]], 0);
    }
}
