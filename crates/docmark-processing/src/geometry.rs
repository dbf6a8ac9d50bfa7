//! Placement grids shared by the raster and paged engines.

use docmark_core::models::Placement;

/// Grid stride for one tile dimension: `ceil(size * spacing)`, at least 1.
pub fn raster_stride(tile: u32, spacing: f32) -> u32 {
    ((tile as f32 * spacing).ceil() as u32).max(1)
}

/// Top-left pixel offsets for every copy of a `tile_w`×`tile_h` tile on a
/// `canvas_w`×`canvas_h` bitmap. Offsets may be negative when centering a
/// tile larger than the canvas; the compositor clips.
pub fn raster_placements(
    canvas_w: u32,
    canvas_h: u32,
    tile_w: u32,
    tile_h: u32,
    placement: Placement,
    spacing: f32,
) -> Vec<(i64, i64)> {
    match placement {
        Placement::Centered => vec![(
            (canvas_w as i64 - tile_w as i64) / 2,
            (canvas_h as i64 - tile_h as i64) / 2,
        )],
        Placement::Tiled => {
            let stride_x = raster_stride(tile_w, spacing) as usize;
            let stride_y = raster_stride(tile_h, spacing) as usize;
            (0..canvas_h as i64)
                .step_by(stride_y)
                .flat_map(|y| {
                    (0..canvas_w as i64)
                        .step_by(stride_x)
                        .map(move |x| (x, y))
                })
                .collect()
        }
    }
}

/// Lower-left offsets, in points relative to the page box origin, for every
/// copy of a `mark_w`×`mark_h` mark on a `page_w`×`page_h` page.
///
/// The tiled grid starts one stride outside the box so partially visible
/// copies cover the edges.
pub fn paged_placements(
    page_w: f32,
    page_h: f32,
    mark_w: f32,
    mark_h: f32,
    placement: Placement,
    spacing: f32,
) -> Vec<(f32, f32)> {
    match placement {
        Placement::Centered => vec![((page_w - mark_w) / 2.0, (page_h - mark_h) / 2.0)],
        Placement::Tiled => {
            let stride_x = (mark_w * spacing).max(1.0);
            let stride_y = (mark_h * spacing).max(1.0);
            let mut out = Vec::new();
            let mut y = -stride_y;
            while y < page_h + stride_y {
                let mut x = -stride_x;
                while x < page_w + stride_x {
                    out.push((x, y));
                    x += stride_x;
                }
                y += stride_y;
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_stride_rounds_up() {
        assert_eq!(raster_stride(10, 1.5), 15);
        assert_eq!(raster_stride(7, 1.5), 11);
        assert_eq!(raster_stride(0, 1.5), 1);
    }

    #[test]
    fn test_raster_tiled_grid_covers_canvas() {
        let placements = raster_placements(100, 60, 10, 10, Placement::Tiled, 1.5);
        // x: 0,15,...,90 (7), y: 0,15,30,45 (4)
        assert_eq!(placements.len(), 28);
        assert_eq!(placements[0], (0, 0));
        assert!(placements.iter().all(|&(x, y)| x < 100 && y < 60));
        assert!(placements.contains(&(90, 45)));
    }

    #[test]
    fn test_raster_centered_may_be_negative() {
        assert_eq!(
            raster_placements(100, 100, 20, 10, Placement::Centered, 1.5),
            vec![(40, 45)]
        );
        assert_eq!(
            raster_placements(10, 10, 30, 30, Placement::Centered, 1.5),
            vec![(-10, -10)]
        );
    }

    #[test]
    fn test_paged_tiled_grid_extends_past_edges() {
        let placements = paged_placements(600.0, 800.0, 100.0, 50.0, Placement::Tiled, 2.0);
        let first = placements[0];
        assert_eq!(first, (-200.0, -100.0));
        assert!(placements.iter().any(|&(x, y)| x >= 600.0 && y >= 800.0));
        assert!(placements
            .iter()
            .all(|&(x, y)| x < 800.0 && y < 900.0));
    }

    #[test]
    fn test_paged_centered() {
        assert_eq!(
            paged_placements(600.0, 800.0, 100.0, 50.0, Placement::Centered, 2.0),
            vec![(250.0, 375.0)]
        );
    }
}
