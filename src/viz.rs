//! Visualization functions using Plotters for cluster analysis

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use crate::model::{ClusterAssignment, NOISE};

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, MAGENTA, CYAN];

/// Noise points are drawn in gray.
const NOISE_COLOR: RGBColor = RGBColor(128, 128, 128);

fn label_color(label: i32) -> RGBColor {
    if label == NOISE {
        NOISE_COLOR
    } else if (label as usize) < CLUSTER_COLORS.len() {
        CLUSTER_COLORS[label as usize]
    } else {
        BLACK
    }
}

/// Scatter plot of the segmentation in standardized feature space
/// (mean price vs mean discount), colored by cluster.
pub fn create_cluster_scatter(
    matrix: &FeatureMatrix,
    assignment: &ClusterAssignment,
    title: &str,
    output_path: &str,
) -> Result<()> {
    let prices: Vec<f64> = matrix.features.column(0).to_vec();
    let discounts: Vec<f64> = matrix.features.column(1).to_vec();

    let x_min = prices.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - 0.5;
    let x_max = prices.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + 0.5;
    let y_min = discounts.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - 0.5;
    let y_max = discounts.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + 0.5;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc("Mean Price (Standardized)")
        .y_desc("Mean Discount (Standardized)")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(render_error)?;

    for (i, (&x, &y)) in prices.iter().zip(discounts.iter()).enumerate() {
        let color = label_color(assignment.labels[i]);
        chart
            .draw_series(std::iter::once(Circle::new((x, y), 4, color.filled())))
            .map_err(render_error)?;
    }

    root.present().map_err(render_error)?;
    println!("Cluster scatter saved to: {}", output_path);

    Ok(())
}

/// Bar chart of cluster sizes, noise bar last.
pub fn create_cluster_size_chart(
    assignment: &ClusterAssignment,
    title: &str,
    output_path: &str,
) -> Result<()> {
    let mut labels = assignment.cluster_labels();
    if assignment.noise_count() > 0 {
        labels.push(NOISE);
    }
    let sizes: Vec<usize> = labels
        .iter()
        .map(|&label| assignment.labels.iter().filter(|&&l| l == label).count())
        .collect();
    let max_size = *sizes.iter().max().unwrap_or(&1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..(labels.len() as f64), 0f64..(max_size * 1.1))
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc("Cluster")
        .y_desc("Number of Consumers")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(render_error)?;

    for (slot, (&label, &size)) in labels.iter().zip(sizes.iter()).enumerate() {
        let color = label_color(label);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [
                    (slot as f64 - 0.4 + 0.5, 0.0),
                    (slot as f64 + 0.4 + 0.5, size as f64),
                ],
                color.filled(),
            )))
            .map_err(render_error)?;
    }

    root.present().map_err(render_error)?;
    println!("Cluster size chart saved to: {}", output_path);

    Ok(())
}

/// Render the chart pair for one algorithm's segmentation.
///
/// Produces `{base}_{algo}.png` and `{base}_{algo}_sizes.png`.
pub fn render_cluster_charts(
    matrix: &FeatureMatrix,
    assignment: &ClusterAssignment,
    algo: &str,
    base_path: &str,
) -> Result<()> {
    let scatter_path = format!("{base_path}_{algo}.png");
    let title = format!("Consumer Segments ({algo})");
    create_cluster_scatter(matrix, assignment, &title, &scatter_path)?;

    let sizes_path = format!("{base_path}_{algo}_sizes.png");
    let sizes_title = format!("Cluster Sizes ({algo})");
    create_cluster_size_chart(assignment, &sizes_title, &sizes_path)?;

    Ok(())
}

fn render_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}
