//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the size of an image resized to fit inside a bounding box.
///
/// The aspect ratio is preserved and the smaller of the two scale factors wins, so the
/// result never exceeds `bounds` on either axis. Sources smaller than the box
/// are scaled up to meet it, as `image`'s `resize` does. Edges never drop
/// below 1px.
///
/// # Examples
/// ```
/// # use upload_pipeline::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((500, 500), (400, 400)), (400, 400));
/// assert_eq!(calculate_fit_dimensions((800, 600), (400, 400)), (400, 300));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }

    let ratio = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w, h)
}
