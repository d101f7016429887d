use extract::ChartRequest;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::ops::Range;

use crate::{RenderError, Series};

const SIZE: (u32, u32) = (800, 600);

fn drawing<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// Y range covering zero and every value, with a little headroom.
fn value_range(values: &[f64]) -> Range<f64> {
    let lo = values.iter().copied().fold(0.0f64, f64::min);
    let hi = values.iter().copied().fold(0.0f64, f64::max);
    let pad = (hi - lo).max(1.0) * 0.1;
    let lo = if lo < 0.0 { lo - pad } else { lo };
    lo..(hi + pad)
}

fn category_label(labels: &[String], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn bar_chart(title: &str, request: &ChartRequest, series: &Series) -> Result<String, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let n = series.values.len() as u32;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..n).into_segmented(), value_range(&series.values))
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(series.labels.len())
            .x_label_formatter(&|v| category_label(&series.labels, v))
            .x_desc(request.directive.x_column.as_str())
            .y_desc(request.directive.y_column.as_str())
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.mix(0.8).filled())
                    .margin(5)
                    .data(series.values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
            )
            .map_err(drawing)?;

        root.present().map_err(drawing)?;
    }
    Ok(svg)
}

pub fn line_chart(title: &str, request: &ChartRequest, series: &Series) -> Result<String, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let n = series.values.len() as u32;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..n).into_segmented(), value_range(&series.values))
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .x_labels(series.labels.len())
            .x_label_formatter(&|v| category_label(&series.labels, v))
            .x_desc(request.directive.x_column.as_str())
            .y_desc(request.directive.y_column.as_str())
            .draw()
            .map_err(drawing)?;

        let points: Vec<(SegmentValue<u32>, f64)> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (SegmentValue::CenterOf(i as u32), *v))
            .collect();

        chart
            .draw_series(LineSeries::new(points.clone(), &BLUE))
            .map_err(drawing)?;
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 3, BLUE.filled())))
            .map_err(drawing)?;

        root.present().map_err(drawing)?;
    }
    Ok(svg)
}

/// Slices in row order, starting at twelve o'clock, with a legend on the right.
pub fn pie_chart(title: &str, series: &Series) -> Result<String, RenderError> {
    if series.values.iter().any(|v| *v < 0.0) {
        return Err(RenderError::InvalidPieValues);
    }
    let total: f64 = series.values.iter().sum();
    if total <= 0.0 {
        return Err(RenderError::InvalidPieValues);
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let root = root.titled(title, ("sans-serif", 30)).map_err(drawing)?;

        let (w, h) = root.dim_in_pixel();
        let radius = f64::from(w.min(h)) * 0.4;
        let center = ((f64::from(w) * 0.35) as i32, (f64::from(h) / 2.0) as i32);
        let legend_x = (f64::from(w) * 0.7) as i32;

        let mut start = -PI / 2.0;
        for (i, (label, value)) in series.labels.iter().zip(&series.values).enumerate() {
            let sweep = value / total * 2.0 * PI;
            let color = Palette99::pick(i).filled();

            // One vertex per degree keeps the arc smooth
            let steps = (sweep.to_degrees().ceil() as usize).max(1);
            let mut vertices = Vec::with_capacity(steps + 2);
            vertices.push(center);
            for step in 0..=steps {
                let angle = start + sweep * step as f64 / steps as f64;
                vertices.push((
                    center.0 + (radius * angle.cos()).round() as i32,
                    center.1 + (radius * angle.sin()).round() as i32,
                ));
            }
            root.draw(&Polygon::new(vertices, color)).map_err(drawing)?;

            let legend_y = 20 + 24 * i as i32;
            root.draw(&Rectangle::new(
                [(legend_x, legend_y), (legend_x + 14, legend_y + 14)],
                color,
            ))
            .map_err(drawing)?;
            root.draw(&Text::new(
                format!("{} ({:.1}%)", label, value / total * 100.0),
                (legend_x + 20, legend_y),
                ("sans-serif", 15).into_font(),
            ))
            .map_err(drawing)?;

            start += sweep;
        }

        root.present().map_err(drawing)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::request;
    use crate::render;
    use extract::ChartKind;

    const SALES: &[&[&str]] = &[
        &["Year", "Sales"],
        &["2021", "10"],
        &["2022", "-4"],
        &["2023", "14.5"],
    ];

    #[test]
    fn test_value_range_includes_zero() {
        let range = value_range(&[10.0, 20.0]);
        assert_eq!(range.start, 0.0);
        assert!(range.end > 20.0);

        let range = value_range(&[-5.0, 5.0]);
        assert!(range.start < -5.0);
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, &SegmentValue::CenterOf(1)), "b");
        assert_eq!(category_label(&labels, &SegmentValue::CenterOf(7)), "");
        assert_eq!(category_label(&labels, &SegmentValue::Exact(0)), "");
    }

    #[test]
    fn test_bar_chart_svg() {
        let chart = render(&request(ChartKind::Bar, SALES, "Year", "Sales")).unwrap();

        assert_eq!(chart.kind, ChartKind::Bar);
        assert!(chart.svg.starts_with("<svg"));
        assert!(chart.svg.contains("Bar Chart of Sales by Year"));
    }

    #[test]
    fn test_line_chart_svg() {
        let chart = render(&request(ChartKind::Line, SALES, "Year", "Sales")).unwrap();

        assert_eq!(chart.kind, ChartKind::Line);
        assert!(chart.svg.contains("<polyline"));
    }

    #[test]
    fn test_unknown_kind_draws_bar() {
        let chart = render(&request(ChartKind::Unknown, SALES, "Year", "Sales")).unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.title, "Bar Chart of Sales by Year");
    }

    #[test]
    fn test_pie_chart_svg() {
        let table: &[&[&str]] = &[&["Party", "Seats"], &["Red", "30"], &["Blue", "10"]];
        let chart = render(&request(ChartKind::Pie, table, "Party", "Seats")).unwrap();

        assert_eq!(chart.kind, ChartKind::Pie);
        assert!(chart.svg.contains("<polygon"));
        assert!(chart.svg.contains("Red (75.0%)"));
    }

    #[test]
    fn test_pie_rejects_negative_values() {
        let err = render(&request(ChartKind::Pie, SALES, "Year", "Sales")).unwrap_err();
        assert_eq!(err, RenderError::InvalidPieValues);

        let zeros: &[&[&str]] = &[&["A", "B"], &["x", "0"]];
        let err = render(&request(ChartKind::Pie, zeros, "A", "B")).unwrap_err();
        assert_eq!(err, RenderError::InvalidPieValues);
    }
}
