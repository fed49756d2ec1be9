use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{
    self, pos2, vec2, Align2, Color32, FontId, RichText, ScrollArea, Sense, Shape, Stroke, Ui,
};
use egui_plot::{
    uniform_grid_spacer, Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, MarkerShape,
    Plot, PlotPoints, Points,
};

use crate::color::{ColorMap, Gradient};
use crate::data::aggregate::{
    AggregationResult, BoxSummary, CategoryCount, DistributionSummary, GroupedSeries,
    NumericGroups, PivotCounts, ScatterGroups,
};
use crate::data::pipeline::{ChartKind, Dashboard};
use crate::state::AppState;

use super::table::preview_table;

const CHART_HEIGHT: f32 = 380.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render every chart of the current filter state.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if let Some(err) = &state.load_error {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(RichText::new(format!("Could not load the dataset.\n{err}")).color(Color32::RED));
        });
        return;
    }

    let type_colors = state.type_colors.clone();
    let Some(board) = state.dashboard() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to explore registrations  (File → Open…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            render_charts(ui, board, &type_colors);
            preview_table(ui, &board.preview, board.visible_rows);
        });
}

fn render_charts(ui: &mut Ui, board: &Dashboard, type_colors: &ColorMap) {
    for chart in &board.charts {
        ui.heading(chart.kind.title());
        ui.add_space(4.0);

        if chart.result.is_empty() {
            ui.label(RichText::new("No data for the current filters.").italics());
        } else {
            match &chart.result {
                AggregationResult::CategoryCount(counts) => ranking_bars(ui, chart.kind, counts),
                AggregationResult::GroupedSeries(series) => {
                    if chart.kind == ChartKind::YearHistogram {
                        year_bars(ui, chart.kind, series);
                    } else {
                        series_lines(ui, chart.kind, series);
                    }
                }
                AggregationResult::Distribution(dist) => donut(ui, dist, type_colors),
                AggregationResult::NumericGroups(groups) => {
                    let colors = if chart.kind == ChartKind::MsrpByType {
                        type_colors.clone()
                    } else {
                        ColorMap::new(groups.groups.iter().map(|(g, _)| g.as_str()))
                    };
                    box_plots(ui, chart.kind, groups, &colors);
                }
                AggregationResult::Scatter(groups) => scatter(ui, chart.kind, groups),
                AggregationResult::Pivot(pivot) => heatmap(ui, pivot),
            }
        }

        ui.add_space(12.0);
        ui.separator();
    }
}

/// Label for an integer tick on a categorical axis; blank between categories.
fn category_tick(labels: &[String], value: f64) -> String {
    let r = value.round();
    if (value - r).abs() > 1e-6 || r < 0.0 {
        return String::new();
    }
    labels.get(r as usize).cloned().unwrap_or_default()
}

fn year_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        String::new()
    }
}

fn plot_id(kind: ChartKind) -> String {
    format!("chart_{kind:?}")
}

// ---------------------------------------------------------------------------
// Horizontal ranking bars
// ---------------------------------------------------------------------------

/// Highest count on top; bar colour follows the count.
fn ranking_bars(ui: &mut Ui, kind: ChartKind, counts: &CategoryCount) {
    let n = counts.entries.len();
    let max = counts.entries.first().map_or(0.0, |(_, c)| *c as f64);
    let min = counts.entries.last().map_or(0.0, |(_, c)| *c as f64);
    let gradient = match kind {
        ChartKind::MakeRanking => Gradient::RedBlue,
        _ => Gradient::Viridis,
    };

    let bars: Vec<Bar> = counts
        .entries
        .iter()
        .enumerate()
        .map(|(i, (name, count))| {
            let value = *count as f64;
            Bar::new((n - 1 - i) as f64, value)
                .name(format!("{name}: {count}"))
                .fill(gradient.for_value(value, min, max))
                .width(0.7)
        })
        .collect();

    // Position 0 is the bottom bar, i.e. the last ranked entry.
    let labels: Vec<String> = counts.entries.iter().rev().map(|(c, _)| c.clone()).collect();

    Plot::new(plot_id(kind))
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
        .include_x(0.0)
        .x_axis_label(kind.value_label())
        .y_axis_label(kind.category_label())
        .y_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .y_axis_formatter(move |mark, _range| category_tick(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().name(kind.value_label()));
        });
}

/// Vertical bars per model year.
fn year_bars(ui: &mut Ui, kind: ChartKind, grouped: &GroupedSeries) {
    let bars: Vec<Bar> = grouped
        .series
        .iter()
        .flat_map(|s| s.points.iter())
        .map(|(year, count)| {
            Bar::new(*year as f64, *count as f64)
                .name(format!("{year}: {count}"))
                .fill(Color32::from_rgb(135, 206, 235))
                .width(0.8)
        })
        .collect();

    Plot::new(plot_id(kind))
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .include_y(0.0)
        .x_axis_label(kind.category_label())
        .y_axis_label(kind.value_label())
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .x_axis_formatter(|mark, _range| year_tick(mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(kind.value_label()));
        });
}

// ---------------------------------------------------------------------------
// Growth lines
// ---------------------------------------------------------------------------

/// One line with markers per series; absent years are simply not drawn.
fn series_lines(ui: &mut Ui, kind: ChartKind, grouped: &GroupedSeries) {
    let colors = ColorMap::new(grouped.series.iter().map(|s| s.name.as_str()));

    Plot::new(plot_id(kind))
        .height(CHART_HEIGHT + 60.0)
        .legend(Legend::default())
        .allow_scroll(false)
        .include_y(0.0)
        .x_axis_label("Model year")
        .y_axis_label(kind.value_label())
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .x_axis_formatter(|mark, _range| year_tick(mark.value))
        .show(ui, |plot_ui| {
            for series in &grouped.series {
                let color = colors.color_for(&series.name);
                let points: Vec<[f64; 2]> = series
                    .points
                    .iter()
                    .map(|(year, count)| [*year as f64, *count as f64])
                    .collect();

                plot_ui.line(
                    Line::new(PlotPoints::from(points.clone()))
                        .name(&series.name)
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(&series.name)
                        .color(color)
                        .shape(MarkerShape::Circle)
                        .radius(3.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Donut chart
// ---------------------------------------------------------------------------

/// Pie with a hole; slices start at twelve o'clock and run clockwise.
fn donut(ui: &mut Ui, dist: &DistributionSummary, colors: &ColorMap) {
    let size = vec2(ui.available_width(), CHART_HEIGHT);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let rect = response.rect;

    let radius = (rect.height() / 2.0 - 10.0).max(20.0);
    let center = pos2(rect.left() + radius + 20.0, rect.center().y);
    let hole = radius * 0.3;

    let mut hovered = None;
    let hover = response.hover_pos().and_then(|p| {
        let d = p - center;
        let dist_sq = d.length_sq();
        if dist_sq > radius * radius || dist_sq < hole * hole {
            return None;
        }
        // Clockwise angle from twelve o'clock in [0, TAU).
        Some((d.y.atan2(d.x) + FRAC_PI_2).rem_euclid(TAU))
    });

    let mut start = 0.0_f32;
    for (i, (name, count)) in dist.entries.iter().enumerate() {
        let sweep = dist.fraction(*count) as f32 * TAU;
        let color = colors.color_for(name);

        let steps = ((sweep / 0.05).ceil() as usize).max(2);
        let at = |angle: f32| {
            let a = angle - FRAC_PI_2;
            center + vec2(a.cos(), a.sin()) * radius
        };
        for k in 0..steps {
            let a0 = start + sweep * k as f32 / steps as f32;
            let a1 = start + sweep * (k + 1) as f32 / steps as f32;
            painter.add(Shape::convex_polygon(
                vec![center, at(a0), at(a1)],
                color,
                Stroke::NONE,
            ));
        }

        if hover.is_some_and(|a| a >= start && a < start + sweep) {
            hovered = Some(i);
        }

        let share = dist.fraction(*count);
        if share >= 0.04 {
            let mid = start + sweep / 2.0 - FRAC_PI_2;
            let label_r = (radius + hole) / 2.0;
            painter.text(
                center + vec2(mid.cos(), mid.sin()) * label_r,
                Align2::CENTER_CENTER,
                format!("{:.1}%", share * 100.0),
                FontId::proportional(13.0),
                Color32::BLACK,
            );
        }
        start += sweep;
    }

    painter.circle_filled(center, hole, ui.visuals().panel_fill);

    // Legend to the right of the pie.
    let mut y = rect.top() + 20.0;
    let x = center.x + radius + 40.0;
    for (name, count) in &dist.entries {
        painter.rect_filled(
            egui::Rect::from_min_size(pos2(x, y), vec2(12.0, 12.0)),
            2.0,
            colors.color_for(name),
        );
        painter.text(
            pos2(x + 18.0, y + 6.0),
            Align2::LEFT_CENTER,
            format!("{name}  {count} ({:.1}%)", dist.fraction(*count) * 100.0),
            FontId::proportional(13.0),
            ui.visuals().text_color(),
        );
        y += 20.0;
    }

    if let Some((name, count)) = hovered.and_then(|i| dist.entries.get(i)) {
        let share = dist.fraction(*count) * 100.0;
        response.on_hover_ui_at_pointer(|ui: &mut Ui| {
            ui.strong(name);
            ui.label(format!("Vehicles: {count} ({share:.1}%)"));
        });
    }
}

// ---------------------------------------------------------------------------
// Box plots
// ---------------------------------------------------------------------------

fn box_plots(ui: &mut Ui, kind: ChartKind, groups: &NumericGroups, colors: &ColorMap) {
    let mut boxes = Vec::new();
    let mut outliers: Vec<[f64; 2]> = Vec::new();

    for (i, (name, values)) in groups.groups.iter().enumerate() {
        let Some(summary) = BoxSummary::from_values(values) else {
            continue;
        };
        let x = i as f64;
        let color = colors.color_for(name);
        boxes.push(
            BoxElem::new(
                x,
                BoxSpread::new(
                    summary.lower_whisker,
                    summary.q1,
                    summary.median,
                    summary.q3,
                    summary.upper_whisker,
                ),
            )
            .name(name)
            .fill(color.linear_multiply(0.4))
            .stroke(Stroke::new(1.5, color))
            .box_width(0.5)
            .whisker_width(0.3),
        );
        outliers.extend(summary.outliers.iter().map(|v| [x, *v]));
    }

    let labels: Vec<String> = groups.groups.iter().map(|(g, _)| g.clone()).collect();

    Plot::new(plot_id(kind))
        .height(CHART_HEIGHT + 60.0)
        .allow_scroll(false)
        .x_axis_label(kind.category_label())
        .y_axis_label(kind.value_label())
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .x_axis_formatter(move |mark, _range| category_tick(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes).name(kind.value_label()));
            if !outliers.is_empty() {
                plot_ui.points(
                    Points::new(PlotPoints::from(outliers))
                        .name("Outliers")
                        .color(Color32::GRAY)
                        .radius(2.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Price vs range scatter
// ---------------------------------------------------------------------------

fn scatter(ui: &mut Ui, kind: ChartKind, groups: &ScatterGroups) {
    let colors = ColorMap::new(groups.groups.iter().map(|(g, _)| g.as_str()));

    Plot::new(plot_id(kind))
        .height(CHART_HEIGHT + 60.0)
        .legend(Legend::default())
        .allow_scroll(false)
        .x_axis_label("Base MSRP (USD)")
        .y_axis_label(kind.value_label())
        .show(ui, |plot_ui| {
            for (name, points) in &groups.groups {
                plot_ui.points(
                    Points::new(PlotPoints::from(points.clone()))
                        .name(name)
                        .color(colors.color_for(name).gamma_multiply(0.7))
                        .shape(MarkerShape::Circle)
                        .filled(true)
                        .radius(4.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// State × year heatmap
// ---------------------------------------------------------------------------

const HEAT_ROW_HEIGHT: f32 = 18.0;
const HEAT_LABEL_WIDTH: f32 = 64.0;
const HEAT_AXIS_HEIGHT: f32 = 22.0;

/// `(row, column)` of the cell at `offset` from the grid's top-left corner.
fn heat_cell(
    offset: egui::Vec2,
    cell_width: f32,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    if offset.x < 0.0 || offset.y < 0.0 {
        return None;
    }
    let row = (offset.y / HEAT_ROW_HEIGHT) as usize;
    let col = (offset.x / cell_width) as usize;
    (row < rows && col < cols).then_some((row, col))
}

/// One row per state, one column per model year; darker means more vehicles.
fn heatmap(ui: &mut Ui, pivot: &PivotCounts) {
    let gradient = Gradient::YellowGreenBlue;
    let max = pivot.max();
    let shade = |count: usize| {
        if max == 0 {
            gradient.at(0.0)
        } else {
            gradient.for_value(count as f64, 0.0, max as f64)
        }
    };

    let n_rows = pivot.rows.len();
    let n_cols = pivot.years.len().max(1);
    let height = n_rows as f32 * HEAT_ROW_HEIGHT + HEAT_AXIS_HEIGHT;
    let size = vec2(ui.available_width(), height);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let rect = response.rect;
    let origin = pos2(rect.left() + HEAT_LABEL_WIDTH, rect.top());
    let cell_width = ((rect.right() - origin.x) / n_cols as f32).max(1.0);
    let font = FontId::proportional(12.0);
    let text_color = ui.visuals().text_color();

    for (r, (name, counts)) in pivot.rows.iter().zip(&pivot.counts).enumerate() {
        let top = origin.y + r as f32 * HEAT_ROW_HEIGHT;
        painter.text(
            pos2(origin.x - 6.0, top + HEAT_ROW_HEIGHT / 2.0),
            Align2::RIGHT_CENTER,
            name,
            font.clone(),
            text_color,
        );
        for (c, count) in counts.iter().enumerate() {
            let cell = egui::Rect::from_min_size(
                pos2(origin.x + c as f32 * cell_width, top),
                vec2(cell_width, HEAT_ROW_HEIGHT),
            );
            painter.rect_filled(cell.shrink(0.5), 0.0, shade(*count));
        }
    }

    // Thin out year labels so they do not overlap on narrow cells.
    let step = ((36.0 / cell_width).ceil() as usize).max(1);
    let axis_y = origin.y + n_rows as f32 * HEAT_ROW_HEIGHT + HEAT_AXIS_HEIGHT / 2.0;
    for (c, year) in pivot.years.iter().enumerate().step_by(step) {
        painter.text(
            pos2(origin.x + (c as f32 + 0.5) * cell_width, axis_y),
            Align2::CENTER_CENTER,
            year.to_string(),
            font.clone(),
            text_color,
        );
    }

    let hovered = response
        .hover_pos()
        .and_then(|p| heat_cell(p - origin, cell_width, n_rows, pivot.years.len()));
    if let Some((r, c)) = hovered {
        let (state, year, count) = (&pivot.rows[r], pivot.years[c], pivot.counts[r][c]);
        response.on_hover_ui_at_pointer(|ui: &mut Ui| {
            ui.strong(state);
            ui.label(format!("Model year: {year}"));
            ui.label(format!("Vehicles: {count}"));
        });
    }
}
