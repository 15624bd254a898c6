use surfbridge_core::Rect;

use crate::doubles::{sample_transform, Harness};

#[test]
fn burst_of_notifications_costs_one_traversal_and_one_pull() {
    let mut h = Harness::new(Rect::from_size(320.0, 180.0));
    h.frame();
    let pulls_before = h.shared.log().pulls;

    for i in 0..10 {
        h.shared.push_frame(sample_transform(i as f32));
    }

    let report = h.frame();
    assert_eq!(report.requests, 1, "ten notifications must queue one request");
    assert_eq!(report.re_evaluated, 1);
    assert_eq!(report.pulls, 1);
    assert_eq!(report.new_frames, 1);
    assert_eq!(h.shared.log().pulls, pulls_before + 1);

    // Superseded frames are dropped: only the newest transform reaches the GPU.
    let last = h.gpu.transforms_at_draws().last().copied().flatten();
    assert_eq!(last, Some(*sample_transform(9.0).as_array()));
}

#[test]
fn quiet_traversal_queues_nothing() {
    let mut h = Harness::new(Rect::from_size(64.0, 64.0));
    h.frame();

    let report = h.frame();
    assert_eq!(report.requests, 0);
    assert_eq!(report.re_evaluated, 0);
}

#[test]
fn notification_after_publish_schedules_a_new_request() {
    let mut h = Harness::new(Rect::from_size(64.0, 64.0));
    h.frame();

    h.shared.push_frame(sample_transform(1.0));
    assert_eq!(h.frame().requests, 1);

    // The flag was cleared by the pull, so the next frame is not swallowed.
    h.shared.push_frame(sample_transform(2.0));
    let report = h.frame();
    assert_eq!(report.requests, 1);
    assert_eq!(report.new_frames, 1);
}

#[test]
fn requests_for_distinct_items_do_not_merge() {
    let mut h = Harness::new(Rect::from_size(64.0, 64.0));
    let (other, other_shared) =
        crate::doubles::add_fake_item(&mut h.render, Rect::new(64.0, 0.0, 128.0, 64.0), |_| {});
    h.frame();

    h.shared.push_frame(sample_transform(1.0));
    other_shared.push_frame(sample_transform(2.0));
    other_shared.push_frame(sample_transform(3.0));

    let report = h.frame();
    assert_eq!(report.requests, 2);
    assert_eq!(report.re_evaluated, 2);
    assert_eq!(report.new_frames, 2);
    assert_ne!(h.item, other);
}
