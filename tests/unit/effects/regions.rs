use super::*;

fn extent() -> Rect {
    Rect::new(0.0, 0.0, 1280.0, 720.0)
}

#[test]
fn rects_entirely_outside_are_skipped() {
    let plan = RegionPlan::from_rects(
        &[
            Rect::new(1300.0, 10.0, 1400.0, 80.0),
            Rect::new(10.0, 10.0, 110.0, 60.0),
            Rect::new(-200.0, -200.0, -10.0, -10.0),
        ],
        extent(),
    );
    assert_eq!(plan.included, vec![Rect::new(10.0, 10.0, 110.0, 60.0)]);
    assert_eq!(plan.skipped.len(), 2);
    assert!(
        plan.skipped
            .iter()
            .all(|s| s.reason == SkipReason::OutsideExtent)
    );
}

#[test]
fn partially_outside_rects_are_clipped() {
    let plan = RegionPlan::from_rects(&[Rect::new(1200.0, 700.0, 1400.0, 800.0)], extent());
    assert_eq!(plan.included, vec![Rect::new(1200.0, 700.0, 1280.0, 720.0)]);
    assert!(plan.skipped.is_empty());
}

#[test]
fn edge_touching_rect_counts_as_outside() {
    let plan = RegionPlan::from_rects(&[Rect::new(1280.0, 0.0, 1300.0, 50.0)], extent());
    assert!(plan.is_empty());
    assert!(plan.require_non_empty().is_err());
}

#[test]
fn overlapping_rects_are_skipped_in_order() {
    let plan = RegionPlan::from_rects(
        &[
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(50.0, 50.0, 150.0, 150.0),
            Rect::new(100.0, 0.0, 200.0, 100.0),
        ],
        extent(),
    );
    assert_eq!(plan.included.len(), 2);
    assert_eq!(plan.skipped[0].reason, SkipReason::Overlaps(0));
}

#[test]
fn degenerate_rects_are_skipped() {
    let plan = RegionPlan::from_rects(&[Rect::new(5.0, 5.0, 5.0, 50.0)], extent());
    assert_eq!(plan.skipped[0].reason, SkipReason::Degenerate);
}

#[test]
fn planning_is_idempotent() {
    let candidates = [
        Rect::new(-50.0, -50.0, 100.0, 100.0),
        Rect::new(90.0, 90.0, 300.0, 300.0),
        Rect::new(2000.0, 0.0, 2100.0, 10.0),
        Rect::new(1000.0, 600.0, 1500.0, 900.0),
    ];
    let first = RegionPlan::from_rects(&candidates, extent());
    let again = RegionPlan::from_rects(&candidates, extent());
    assert_eq!(first, again);

    let replanned = RegionPlan::from_rects(&first.included, extent());
    assert_eq!(replanned.included, first.included);
    assert!(replanned.skipped.is_empty());
}

#[test]
fn corner_candidates_sit_inside_margins() {
    let display = Size::new(1000.0, 2000.0);
    let rects = corner_candidates(display, 3).unwrap();
    assert_eq!(rects.len(), 3);
    let margin = 30.0;
    assert_eq!(
        rects[0],
        Rect::new(margin, margin, margin + 250.0, margin + 200.0)
    );
    assert_eq!(rects[1].x1, 1000.0 - margin);
    assert_eq!(rects[2].y1, 2000.0 - margin);

    let plan = plan_corner_regions(display, 3).unwrap();
    assert_eq!(plan.included.len(), 3);
    assert!(plan.skipped.is_empty());
}

#[test]
fn corner_count_is_bounded() {
    let display = Size::new(640.0, 480.0);
    assert!(corner_candidates(display, 0).is_err());
    assert!(corner_candidates(display, 4).is_err());
    assert_eq!(corner_candidates(display, 1).unwrap().len(), 1);
}
