use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use stripchart::api::{LivePlot, LivePlotConfig};
use stripchart::core::{
    Axis, AxisRange, AxisScaleMode, AxisTransform, BoundsPolicy, Color, DataPoint, LineId,
    LineType, Series, SeriesCollection, SeriesStyle, Viewport, XValueTransform,
};
use stripchart::render::{DecimatingPathBuilder, PixelMapping};

fn wave(count: usize) -> Vec<DataPoint> {
    (0..count)
        .map(|i| {
            let x = i as f64 * 0.01;
            DataPoint::new(x, (x * 0.7).sin() * 100.0)
        })
        .collect()
}

fn bench_append_10k(c: &mut Criterion) {
    c.bench_function("live_plot_append_10k", |b| {
        b.iter(|| {
            let plot = LivePlot::new(LivePlotConfig::default().with_turbo_mode(true))
                .expect("plot init");
            plot.initialize_line(LineId::new(1), "bench", Axis::Primary);
            for i in 0..10_000 {
                let x = f64::from(i);
                plot.append_point(LineId::new(1), x, x.sin(), false)
                    .expect("append");
            }
            black_box(plot.on_update(false));
        })
    });
}

fn bench_full_scan_bounds_100k(c: &mut Criterion) {
    let collection = SeriesCollection::new(Axis::Primary);
    for id in 0..10 {
        let series = Arc::new(Series::new(
            LineId::new(id),
            "bench",
            Axis::Primary,
            SeriesStyle::with_color(Color::rgb(0.0, 0.0, 0.0)),
        ));
        series.extend(&wave(10_000)).expect("extend");
        collection.insert(series);
    }

    c.bench_function("full_scan_bounds_100k", |b| {
        b.iter(|| {
            collection.reset_bounds();
            black_box(
                collection
                    .range_bounds(BoundsPolicy::FullScan, &[])
                    .expect("bounds"),
            );
        })
    });
}

fn bench_decimate_100k(c: &mut Criterion) {
    let points = wave(100_000);
    let viewport = Viewport::new(1920, 1080);
    let mapping = PixelMapping {
        viewport,
        domain: AxisTransform::horizontal(
            AxisScaleMode::Linear,
            AxisRange::new(0.0, 1_000.0).expect("domain"),
            viewport,
        )
        .expect("x axis"),
        range: AxisTransform::vertical(
            AxisScaleMode::Linear,
            AxisRange::new(-100.0, 100.0).expect("range"),
            viewport,
        )
        .expect("y axis"),
        x_transform: XValueTransform::identity(),
    };
    let mut style = SeriesStyle::with_color(Color::rgb(0.0, 0.0, 1.0));
    style.line_type = LineType::LineAndPoints;
    let builder = DecimatingPathBuilder::default();

    c.bench_function("decimate_path_100k", |b| {
        b.iter(|| {
            black_box(builder.build_points(black_box(&points), style, mapping));
        })
    });
}

criterion_group!(
    benches,
    bench_append_10k,
    bench_full_scan_bounds_100k,
    bench_decimate_100k
);
criterion_main!(benches);
