use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use stripchart::PlotError;
use stripchart::api::{LivePlot, LivePlotConfig, RedrawRequest, UpdateQueue};
use stripchart::core::{
    ArchiveConfig, Axis, AxisRange, Color, LineId, LineType, Viewport, XValueTransform,
};
use stripchart::render::NullRenderer;

fn line(id: i32) -> LineId {
    LineId::new(id)
}

fn plot() -> Arc<LivePlot> {
    LivePlot::new(LivePlotConfig::default()).expect("plot")
}

fn record_requests(plot: &LivePlot) -> Arc<Mutex<Vec<RedrawRequest>>> {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&requests);
    plot.on_redraw(move |_plot, request| {
        sink.lock().expect("requests lock").push(request.clone());
    });
    requests
}

#[test]
fn add_point_redraws_synchronously_outside_turbo_mode() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    let requests = record_requests(&plot);

    plot.add_point(line(1), 1.0, 2.0).expect("add");
    plot.add_point(line(1), 2.0, 3.0).expect("add");

    let requests = requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].lines.as_slice(), &[line(1)]);
    assert!(!requests[0].forced);
    assert!(plot.dirty_set().is_empty());
}

#[test]
fn batched_appends_coalesce_into_one_redraw() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    plot.initialize_line(line(2), "b", Axis::Secondary);
    let requests = record_requests(&plot);

    plot.append_point(line(1), 0.0, 0.0, false).expect("append");
    plot.append_point(line(2), 0.0, 1.0, false).expect("append");
    assert!(requests.lock().expect("requests lock").is_empty());

    plot.append_point(line(1), 1.0, 1.0, true).expect("append");
    let requests = requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].lines.as_slice(), &[line(1), line(2)]);
}

#[test]
fn on_update_without_dirty_lines_is_a_no_op_unless_forced() {
    let plot = plot();
    assert_eq!(plot.on_update(false), None);

    let forced = plot.on_update(true).expect("forced pass");
    assert!(forced.forced);
    assert!(forced.lines.is_empty());
    assert_eq!(plot.update_count(), 1);
}

#[test]
fn unknown_lines_are_reported() {
    let plot = plot();
    assert!(matches!(
        plot.add_point(line(9), 0.0, 0.0),
        Err(PlotError::UnknownLine(id)) if id == line(9)
    ));
    assert!(plot.set_visibility(line(9), false).is_err());
    assert!(!plot.delete_line(line(9)));
}

#[test]
fn line_numbering_and_replacement() {
    let plot = plot();
    assert_eq!(plot.next_available_line(), line(0));
    plot.initialize_line(line(0), "a", Axis::Primary);
    plot.initialize_line(line(3), "b", Axis::Primary);
    assert_eq!(plot.next_available_line(), line(4));

    plot.add_point(line(3), 1.0, 1.0).expect("add");
    let replaced = plot.initialize_line(line(3), "b2", Axis::Secondary);
    assert!(replaced.is_empty());
    assert_eq!(replaced.axis(), Axis::Secondary);
    assert_eq!(plot.line_ids(), vec![line(0), line(3)]);
    assert!(plot.collection(Axis::Primary).get(line(3)).is_none());

    plot.delete_all_lines();
    assert!(plot.line_ids().is_empty());
    assert_eq!(plot.next_available_line(), line(0));
}

#[test]
fn disabled_secondary_axis_forces_primary() {
    let plot = LivePlot::new(LivePlotConfig::default().with_secondary_axis(false)).expect("plot");
    let series = plot.initialize_line(line(1), "a", Axis::Secondary);
    assert_eq!(series.axis(), Axis::Primary);
    assert!(plot.collection(Axis::Secondary).is_empty());
}

#[test]
fn palette_and_style_setters() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    plot.initialize_line(line(2), "b", Axis::Primary);

    let palette = plot.current_config().palette;
    let info = plot.lines_info();
    assert_eq!(info[0].style.color, palette.color_for(line(1)));
    assert_ne!(info[0].style.color, info[1].style.color);

    plot.set_color(line(1), Color::rgb(0.2, 0.3, 0.4)).expect("color");
    assert!(plot.set_color(line(1), Color::rgb(2.0, 0.0, 0.0)).is_err());
    plot.set_line_name(line(1), "renamed").expect("name");
    plot.set_all_line_types(LineType::PointsOnly);
    plot.set_line_type(line(2), LineType::LineOnly).expect("line type");

    let info = plot.lines_info();
    assert_eq!(info[0].name, "renamed");
    assert_eq!(info[0].style.color, Color::rgb(0.2, 0.3, 0.4));
    assert_eq!(info[0].style.line_type, LineType::PointsOnly);
    assert_eq!(info[1].style.line_type, LineType::LineOnly);
}

#[test]
fn pinned_and_strip_bounds_only_apply_in_turbo_mode() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    for i in 0..=20 {
        plot.append_point(line(1), f64::from(i), 1.0, false).expect("append");
    }
    let pinned = AxisRange::new(5.0, 10.0).expect("range");
    plot.set_domain_bounds(Some(pinned)).expect("pin");

    let full = plot.domain_bounds(Axis::Primary).expect("domain").expect("data");
    assert_eq!(full, AxisRange { lower: 0.0, upper: 20.0 });

    plot.set_turbo_mode(true);
    assert_eq!(plot.domain_bounds(Axis::Primary).expect("domain"), Some(pinned));

    plot.set_domain_bounds(None).expect("unpin");
    plot.set_strip_width(Some(4.0)).expect("strip");
    plot.append_point(line(1), 21.0, 2.0, false).expect("append");
    let strip = plot.domain_bounds(Axis::Primary).expect("domain").expect("data");
    assert_eq!(strip, AxisRange { lower: 17.0, upper: 21.0 });

    plot.set_domain_bounds(Some(pinned)).expect("pin");
    assert_eq!(plot.strip_width(), None, "pinning clears the strip width");

    plot.set_strip_width(Some(4.0)).expect("strip");
    plot.set_turbo_mode(false);
    assert_eq!(plot.strip_width(), None, "leaving turbo clears the strip width");
}

#[test]
fn invalid_bounds_and_widths_are_rejected() {
    let plot = plot();
    assert!(plot.set_strip_width(Some(0.0)).is_err());
    assert!(plot.set_strip_width(Some(f64::NAN)).is_err());
    assert!(
        plot.set_domain_bounds(Some(AxisRange { lower: 2.0, upper: 1.0 }))
            .is_err()
    );
    assert!(
        plot.set_range_bounds(Axis::Primary, Some(AxisRange { lower: 1.0, upper: 1.0 }))
            .is_err()
    );
}

#[test]
fn x_value_transform_rescales_domain_bounds() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    for i in 0..=10 {
        plot.append_point(line(1), f64::from(i), 0.5, false).expect("append");
    }
    plot.set_x_value_transform(XValueTransform::new(2.0, 10.0).expect("transform"))
        .expect("set transform");

    let domain = plot.domain_bounds(Axis::Primary).expect("domain").expect("data");
    assert_eq!(domain, AxisRange { lower: 10.0, upper: 30.0 });
}

#[test]
fn copy_settings_takes_pinned_domain_and_strip_width() {
    let source = plot();
    source.set_strip_width(Some(12.5)).expect("strip");
    let target = plot();
    target.copy_settings(&source);
    assert_eq!(target.strip_width(), Some(12.5));
    assert_eq!(target.pinned_domain(), None);

    let pinned = AxisRange::new(1.0, 2.0).expect("range");
    source.set_domain_bounds(Some(pinned)).expect("pin");
    target.copy_settings(&source);
    assert_eq!(target.pinned_domain(), Some(pinned));
    assert_eq!(target.strip_width(), None);
}

#[test]
fn replace_points_truncates_and_redraws() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    let requests = record_requests(&plot);

    let kept = plot
        .replace_points(line(1), &[1.0, 2.0, 3.0], &[4.0, 5.0])
        .expect("replace");
    assert_eq!(kept, 2);
    assert_eq!(requests.lock().expect("requests lock").len(), 1);

    let range = plot.range_bounds(Axis::Primary).expect("range").expect("data");
    assert_eq!(range, AxisRange { lower: 4.0, upper: 5.0 });
}

#[test]
fn hiding_a_large_line_archives_it_and_unarchive_restores() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LivePlotConfig::default().with_archive(
        ArchiveConfig::default()
            .with_threshold_points(50)
            .with_folder(dir.path()),
    );
    let plot = LivePlot::new(config).expect("plot");
    let series = plot.initialize_line(line(1), "big", Axis::Primary);
    let small = plot.initialize_line(line(2), "small", Axis::Primary);
    for i in 0..51 {
        plot.append_point(line(1), f64::from(i), f64::from(i), false).expect("append");
    }
    small.append(0.0, 0.0).expect("append");

    assert!(plot.set_visibility(line(1), false).expect("hide"));
    assert!(series.is_archived());
    assert_eq!(series.max_x(), 50.0);

    plot.unarchive().expect("unarchive");
    assert!(!series.is_archived());

    assert_eq!(plot.archive(true, None), 1, "only lines over the threshold spill");
    assert!(series.is_archived());
    assert!(!small.is_archived());
}

#[test]
fn render_frame_draws_visible_lines() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    plot.initialize_line(line(2), "b", Axis::Secondary);
    plot.initialize_line(line(3), "hidden", Axis::Primary);
    for i in 0..10 {
        let x = f64::from(i);
        plot.append_point(line(1), x, x, false).expect("append");
        plot.append_point(line(2), x, -x, false).expect("append");
        plot.append_point(line(3), x, 100.0, false).expect("append");
    }
    plot.set_visibility(line(3), false).expect("hide");

    let mut renderer = NullRenderer::default();
    let frame = plot
        .render_frame(Viewport::new(400, 300), &mut renderer)
        .expect("render");

    assert_eq!(renderer.frames_rendered, 1);
    assert_eq!(frame.drawings.len(), 2);
    assert_eq!(frame.axes.len(), 2);
    let primary = frame.axis(Axis::Primary).expect("primary axis");
    assert_eq!(primary.range, AxisRange { lower: 0.0, upper: 9.0 });
    assert_eq!(renderer.last_segment_count, 18);
    assert_eq!(renderer.last_marker_count, 20);

    assert!(matches!(
        plot.render_frame(Viewport::new(0, 300), &mut renderer),
        Err(PlotError::InvalidViewport { width: 0, height: 300 })
    ));
}

#[test]
fn build_draw_path_needs_data() {
    let plot = plot();
    plot.initialize_line(line(1), "a", Axis::Primary);
    assert_eq!(plot.build_draw_path(line(1), Viewport::new(100, 100)).expect("build"), None);

    plot.append_point(line(1), 0.0, 0.0, false).expect("append");
    plot.append_point(line(1), 1.0, 1.0, false).expect("append");
    let drawing = plot
        .build_draw_path(line(1), Viewport::new(100, 100))
        .expect("build")
        .expect("drawing");
    assert_eq!(drawing.line, line(1));
    assert_eq!(drawing.path.expect("path").segment_count(), 1);
}

#[test]
fn turbo_updates_flow_through_the_queue() {
    let queue = UpdateQueue::spawn().expect("queue");
    let plot = LivePlot::new(LivePlotConfig::default().with_turbo_mode(true)).expect("plot");
    plot.attach_update_queue(queue.handle());
    for id in 0..4 {
        plot.initialize_line(line(id), format!("line {id}"), Axis::Primary);
    }
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    plot.on_redraw(move |plot, request| {
        counter.fetch_add(request.lines.len(), Ordering::SeqCst);
        let _ = plot.domain_bounds(Axis::Primary);
    });

    let producers: Vec<_> = (0..4)
        .map(|id| {
            let plot = Arc::clone(&plot);
            thread::spawn(move || {
                for i in 0..500 {
                    plot.add_point(line(id), f64::from(i), f64::from(id))
                        .expect("add");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer");
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while queue.processed_count() < 2_000 {
        assert!(Instant::now() < deadline, "queue did not drain");
        thread::sleep(Duration::from_millis(2));
    }

    assert!(plot.dirty_set().is_empty());
    assert!(seen.load(Ordering::SeqCst) >= 4);
    assert!(plot.update_count() <= 2_000);
    let domain = plot.domain_bounds(Axis::Primary).expect("domain").expect("data");
    assert_eq!(domain.upper, 499.0);
}

#[test]
fn config_json_round_trip_and_defaults() {
    let config = LivePlotConfig::default()
        .with_turbo_mode(true)
        .with_strip_width(Some(30.0))
        .with_archive(ArchiveConfig::default().with_threshold_points(1_000));
    let json = config.to_json_pretty().expect("serialize");
    let parsed = LivePlotConfig::from_json_str(&json).expect("parse");
    assert_eq!(parsed, config);

    let defaults = LivePlotConfig::from_json_str("{}").expect("defaults");
    assert_eq!(defaults, LivePlotConfig::default());
    assert!(defaults.secondary_axis_enabled);
    assert_eq!(defaults.archive.threshold_points, 500_000);

    assert!(LivePlotConfig::from_json_str(r#"{"strip_width": -1.0}"#).is_err());
    assert!(LivePlotConfig::from_json_str("not json").is_err());
}
