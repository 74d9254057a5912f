// Anchor spline
// Fits the local cubic through the five trajectory anchors of a lane change
// and samples it the way the trajectory generator does.
//
// Author: Ryohei Sasaki(@rsasaki0109)
use highway_planner::path_planning::cubic_spline::CubicSpline;
use highway_planner::PlanningResult;

use plotlib::page::Page;
use plotlib::repr::Plot;
use plotlib::view::ContinuousView;
use plotlib::style::PointStyle;
use plotlib::style::LineStyle;

fn main() -> PlanningResult<()> {
    env_logger::init();

    // local frame: predecessor, reference point, then 30/60/90 m ahead one lane over
    let anchors = vec![
        (-1.0, 0.),
        (0., 0.),
        (30., 4.),
        (60., 4.),
        (90., 4.),
    ];
    let x: Vec<f64> = anchors.iter().map(|p| p.0).collect();
    let y: Vec<f64> = anchors.iter().map(|p| p.1).collect();
    let sp = CubicSpline::new(&x, &y)?;

    let dense: Vec<(f64, f64)> = (0..=900)
        .map(|i| {
            let xi = -1.0 + i as f64 * 0.1;
            (xi, sp.calc(xi))
        })
        .collect();

    // lateral acceleration at 49.5 mph is v^2 * curvature
    let (peak_x, peak_kappa) = dense.iter()
        .map(|&(xi, _)| (xi, sp.calcdd(xi) / (1.0 + sp.calcd(xi).powi(2)).powf(1.5)))
        .fold((0.0, 0.0), |best, (xi, k)| if k.abs() > f64::abs(best.1) { (xi, k) } else { best });
    log::info!(
        "peak curvature {:.5} 1/m at x = {:.1} m, {:.2} m/s^2 lateral",
        peak_kappa,
        peak_x,
        (49.5f64 / 2.24).powi(2) * peak_kappa.abs()
    );

    // 50 points at 49.5 mph
    let target_x: f64 = 30.;
    let step = target_x * 0.02 * (49.5 / 2.24) / target_x.hypot(sp.calc(target_x));
    let samples: Vec<(f64, f64)> = (1..=50)
        .map(|i| {
            let xi = step * i as f64;
            (xi, sp.calc(xi))
        })
        .collect();

    let s0: Plot = Plot::new(anchors).point_style(
        PointStyle::new()
            .colour("#000000"),
    );

    let s1: Plot = Plot::new(dense).line_style(
        LineStyle::new()
            .colour("#35C788")
            .width(2.),
    );

    let s2: Plot = Plot::new(samples).point_style(
        PointStyle::new()
            .colour("#DD3355")
            .size(1.5),
    );

    let v = ContinuousView::new()
        .add(s0)
        .add(s1)
        .add(s2)
        .x_range(-5., 95.)
        .y_range(-2., 6.)
        .x_label("x [m]")
        .y_label("y [m]");

    std::fs::create_dir_all("./img")?;
    if let Err(e) = Page::single(&v).save("./img/anchor_spline.svg") {
        log::error!("Could not save plot: {}", e);
    }
    Ok(())
}
