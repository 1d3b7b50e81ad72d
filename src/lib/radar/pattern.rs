use ndarray::{Array2, s};

// Width of the bright bands drawn along each edge of the test image
const BORDER: usize = 256;

/// The image the emulator shows when nothing else is loaded: a dark sweep with
/// full intensity bands over the first and last spokes and over the nearest
/// and farthest samples of every spoke.
pub fn border_pattern(spokes: usize, spoke_len: usize) -> Array2<u8> {
    let mut image = Array2::<u8>::zeros((spokes, spoke_len));
    let rows = BORDER.min(spokes);
    let cols = BORDER.min(spoke_len);

    image.slice_mut(s![..rows, ..]).fill(u8::MAX);
    image.slice_mut(s![spokes - rows.., ..]).fill(u8::MAX);
    image.slice_mut(s![.., ..cols]).fill(u8::MAX);
    image.slice_mut(s![.., spoke_len - cols..]).fill(u8::MAX);
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_pattern_layout() {
        let image = border_pattern(2048, 1024);
        assert_eq!(image.dim(), (2048, 1024));

        assert!(image.row(0).iter().all(|&v| v == 255));
        assert!(image.row(2047).iter().all(|&v| v == 255));

        let middle = image.row(1024);
        assert_eq!(middle[0], 255);
        assert_eq!(middle[255], 255);
        assert_eq!(middle[256], 0);
        assert_eq!(middle[767], 0);
        assert_eq!(middle[768], 255);
        assert_eq!(middle[1023], 255);
    }
}
