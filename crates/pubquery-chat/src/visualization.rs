//! Visualization dispatch.
//!
//! Maps a result set and its [`VisualizationSpec`] onto exactly one concrete
//! rendering. Selection depends only on `spec.kind`; malformed input degrades
//! to a partial chart, the table fallback, or nothing, and never fails.

use serde_json::Value;

use crate::types::{ChartKind, Row, VisualizationSpec};

/// Fill color of bar charts.
pub const BAR_COLOR: &str = "#8884d8";

/// Colors assigned to line series without an explicit color, by index.
pub const LINE_PALETTE: [&str; 5] = ["#8884d8", "#82ca9d", "#ffc658", "#ff7c7c", "#a78bfa"];

/// Colors assigned to pie slices, by index.
pub const PIE_PALETTE: [&str; 8] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff7c7c", "#a78bfa", "#f59e0b", "#10b981", "#6366f1",
];

/// Default label column for pie charts.
pub const DEFAULT_LABEL_FIELD: &str = "name";
/// Default value column for pie charts.
pub const DEFAULT_VALUE_FIELD: &str = "value";

// =============================================================================
// Rendering types
// =============================================================================

/// Outcome of dispatching one result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendering {
    Chart(Chart),
    /// Plain tabular view of the rows.
    Table(TableView),
    /// Nothing to show.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bar(BarChart),
    Line(LineChart),
    Pie(PieChart),
}

impl Chart {
    pub fn kind(&self) -> ChartKind {
        match self {
            Chart::Bar(_) => ChartKind::Bar,
            Chart::Line(_) => ChartKind::Line,
            Chart::Pie(_) => ChartKind::Pie,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Chart::Bar(c) => &c.title,
            Chart::Line(c) => &c.title,
            Chart::Pie(c) => &c.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_field: Option<String>,
    pub y_field: String,
    pub color: &'static str,
    /// One bar per row, in row order.
    pub bars: Vec<Bar>,
}

/// A category and its height. A missing or non-numeric value is a blank bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_field: Option<String>,
    pub series: Vec<LineSeries>,
    /// One point per row; `values[i]` belongs to `series[i]`.
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub field: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePoint {
    pub x: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub title: String,
    pub label_field: String,
    pub value_field: String,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    /// Sum of all numeric slice values.
    pub fn total(&self) -> f64 {
        self.slices.iter().filter_map(|s| s.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    pub value: Option<f64>,
    pub color: &'static str,
}

/// Fallback rendering: every row as a line of text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: Vec<String>,
    /// `rows[r][c]` is the cell of column `columns[c]`; absent keys are empty.
    pub rows: Vec<Vec<String>>,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Select and parametrize the rendering for `rows` under `spec`.
pub fn render(rows: &[Row], spec: &VisualizationSpec) -> Rendering {
    match spec.kind {
        ChartKind::Bar => render_bar(rows, spec),
        ChartKind::Line => render_line(rows, spec),
        ChartKind::Pie => render_pie(rows, spec),
        ChartKind::None => table(rows),
    }
}

fn render_bar(rows: &[Row], spec: &VisualizationSpec) -> Rendering {
    let Some(y_field) = spec.y_field.clone() else {
        tracing::debug!("Bar chart without y_axis, rendering as table");
        return table(rows);
    };
    if rows.is_empty() {
        return Rendering::Empty;
    }

    let bars = rows
        .iter()
        .map(|row| Bar {
            label: spec
                .x_field
                .as_deref()
                .map(|x| scalar_label(row.get(x)))
                .unwrap_or_default(),
            value: numeric(row.get(&y_field)),
        })
        .collect();

    Rendering::Chart(Chart::Bar(BarChart {
        title: title_or(spec, "Bar Chart"),
        x_field: spec.x_field.clone(),
        y_field,
        color: BAR_COLOR,
        bars,
    }))
}

fn render_line(rows: &[Row], spec: &VisualizationSpec) -> Rendering {
    let series: Vec<LineSeries> = if !spec.series.is_empty() {
        spec.series
            .iter()
            .enumerate()
            .map(|(i, s)| LineSeries {
                field: s.field.clone(),
                label: s.label.clone(),
                color: s
                    .color
                    .clone()
                    .unwrap_or_else(|| LINE_PALETTE[i % LINE_PALETTE.len()].to_string()),
            })
            .collect()
    } else if let Some(y) = &spec.y_field {
        vec![LineSeries {
            field: y.clone(),
            label: y.clone(),
            color: LINE_PALETTE[0].to_string(),
        }]
    } else {
        tracing::debug!("Line chart without series or y_axis, rendering as table");
        return table(rows);
    };
    if rows.is_empty() {
        return Rendering::Empty;
    }

    let points = rows
        .iter()
        .map(|row| LinePoint {
            x: spec
                .x_field
                .as_deref()
                .map(|x| scalar_label(row.get(x)))
                .unwrap_or_default(),
            values: series.iter().map(|s| numeric(row.get(&s.field))).collect(),
        })
        .collect();

    Rendering::Chart(Chart::Line(LineChart {
        title: title_or(spec, "Line Chart"),
        x_field: spec.x_field.clone(),
        series,
        points,
    }))
}

fn render_pie(rows: &[Row], spec: &VisualizationSpec) -> Rendering {
    if rows.is_empty() {
        return Rendering::Empty;
    }
    let label_field = spec
        .label_field
        .clone()
        .unwrap_or_else(|| DEFAULT_LABEL_FIELD.to_string());
    let value_field = spec
        .value_field
        .clone()
        .unwrap_or_else(|| DEFAULT_VALUE_FIELD.to_string());

    let slices = rows
        .iter()
        .enumerate()
        .map(|(i, row)| PieSlice {
            name: scalar_label(row.get(&label_field)),
            value: numeric(row.get(&value_field)),
            color: PIE_PALETTE[i % PIE_PALETTE.len()],
        })
        .collect();

    Rendering::Chart(Chart::Pie(PieChart {
        title: title_or(spec, "Pie Chart"),
        label_field,
        value_field,
        slices,
    }))
}

/// Tabular fallback; columns in first-appearance order across rows.
fn table(rows: &[Row]) -> Rendering {
    if rows.is_empty() {
        return Rendering::Empty;
    }

    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return Rendering::Empty;
    }

    let cells = rows
        .iter()
        .map(|row| columns.iter().map(|c| scalar_label(row.get(c))).collect())
        .collect();

    Rendering::Table(TableView {
        columns,
        rows: cells,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn title_or(spec: &VisualizationSpec, default: &str) -> String {
    spec.title.clone().unwrap_or_else(|| default.to_string())
}

/// Text form of a cell. Missing and null values are empty.
pub fn scalar_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric form of a cell: numbers and numeric strings; anything else is blank.
pub fn numeric(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesSpec;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn spec(value: Value) -> VisualizationSpec {
        VisualizationSpec::from_value(&value)
    }

    fn expect_chart(rendering: Rendering) -> Chart {
        match rendering {
            Rendering::Chart(chart) => chart,
            other => panic!("expected a chart, got {:?}", other),
        }
    }

    // ---- Pie ----

    #[test]
    fn test_pie_default_fields() {
        let data = rows(json!([{"name": "A", "value": 1}, {"name": "B", "value": 2}]));
        let Chart::Pie(pie) = expect_chart(render(&data, &VisualizationSpec::of_kind(ChartKind::Pie)))
        else {
            panic!("expected pie");
        };
        assert_eq!(pie.label_field, "name");
        assert_eq!(pie.value_field, "value");
        assert_eq!(
            pie.slices,
            vec![
                PieSlice {
                    name: "A".to_string(),
                    value: Some(1.0),
                    color: PIE_PALETTE[0],
                },
                PieSlice {
                    name: "B".to_string(),
                    value: Some(2.0),
                    color: PIE_PALETTE[1],
                },
            ]
        );
        assert_eq!(pie.title, "Pie Chart");
        assert_eq!(pie.total(), 3.0);
    }

    #[test]
    fn test_pie_explicit_fields() {
        let data = rows(json!([{"venue": "NeurIPS", "papers": 12}, {"venue": "ICML", "papers": "9"}]));
        let s = spec(json!({"type": "pie", "title": "By venue", "label_field": "venue", "value_field": "papers"}));
        let Chart::Pie(pie) = expect_chart(render(&data, &s)) else {
            panic!("expected pie");
        };
        assert_eq!(pie.title, "By venue");
        assert_eq!(pie.slices[0].name, "NeurIPS");
        assert_eq!(pie.slices[1].value, Some(9.0));
    }

    #[test]
    fn test_pie_palette_cycles() {
        let data: Vec<Row> = (0..10)
            .map(|i| rows(json!([{"name": format!("s{}", i), "value": i}])).remove(0))
            .collect();
        let Chart::Pie(pie) = expect_chart(render(&data, &VisualizationSpec::of_kind(ChartKind::Pie)))
        else {
            panic!("expected pie");
        };
        assert_eq!(pie.slices[8].color, PIE_PALETTE[0]);
        assert_eq!(pie.slices[9].color, PIE_PALETTE[1]);
    }

    #[test]
    fn test_pie_missing_fields_degrade_to_blank_slices() {
        let data = rows(json!([{"other": 1}]));
        let Chart::Pie(pie) = expect_chart(render(&data, &VisualizationSpec::of_kind(ChartKind::Pie)))
        else {
            panic!("expected pie");
        };
        assert_eq!(pie.slices[0].name, "");
        assert_eq!(pie.slices[0].value, None);
    }

    // ---- Bar ----

    #[test]
    fn test_bar_binds_fields() {
        let data = rows(json!([{"year": 2020, "count": 41}, {"year": 2021, "count": 57}]));
        let s = spec(json!({"type": "bar", "x_axis": "year", "y_axis": "count"}));
        let Chart::Bar(bar) = expect_chart(render(&data, &s)) else {
            panic!("expected bar");
        };
        assert_eq!(bar.title, "Bar Chart");
        assert_eq!(bar.color, BAR_COLOR);
        assert_eq!(bar.y_field, "count");
        assert_eq!(
            bar.bars,
            vec![
                Bar {
                    label: "2020".to_string(),
                    value: Some(41.0)
                },
                Bar {
                    label: "2021".to_string(),
                    value: Some(57.0)
                },
            ]
        );
    }

    #[test]
    fn test_bar_missing_keys_are_blank_bars() {
        let data = rows(json!([{"year": 2020}, {"count": 3}, {"year": "2022", "count": "n/a"}]));
        let s = spec(json!({"type": "bar", "x_axis": "year", "y_axis": "count"}));
        let Chart::Bar(bar) = expect_chart(render(&data, &s)) else {
            panic!("expected bar");
        };
        assert_eq!(bar.bars.len(), 3);
        assert_eq!(bar.bars[0].value, None);
        assert_eq!(bar.bars[1].label, "");
        assert_eq!(bar.bars[1].value, Some(3.0));
        assert_eq!(bar.bars[2].label, "2022");
        assert_eq!(bar.bars[2].value, None);
    }

    #[test]
    fn test_bar_without_y_field_falls_back_to_table() {
        let data = rows(json!([{"year": 2020, "count": 41}]));
        let s = spec(json!({"type": "bar", "x_axis": "year"}));
        assert!(matches!(render(&data, &s), Rendering::Table(_)));
    }

    #[test]
    fn test_bar_without_rows_is_empty() {
        let s = spec(json!({"type": "bar", "x_axis": "year", "y_axis": "count"}));
        assert_eq!(render(&[], &s), Rendering::Empty);
    }

    // ---- Line ----

    #[test]
    fn test_line_single_implied_series() {
        let data = rows(json!([{"year": 2020, "citations": 10}, {"year": 2021, "citations": 25}]));
        let s = spec(json!({"type": "line", "x_axis": "year", "y_axis": "citations"}));
        let Chart::Line(line) = expect_chart(render(&data, &s)) else {
            panic!("expected line");
        };
        assert_eq!(line.title, "Line Chart");
        assert_eq!(line.series.len(), 1);
        assert_eq!(line.series[0].field, "citations");
        assert_eq!(line.series[0].label, "citations");
        assert_eq!(line.series[0].color, LINE_PALETTE[0]);
        assert_eq!(line.points[1].x, "2021");
        assert_eq!(line.points[1].values, vec![Some(25.0)]);
    }

    #[test]
    fn test_line_multiple_series_palette_and_explicit_color() {
        let data = rows(json!([{"year": 2020, "a": 1, "b": 2, "c": 3}]));
        let s = VisualizationSpec {
            kind: ChartKind::Line,
            x_field: Some("year".to_string()),
            series: ["a", "b", "c", "d", "e", "f"]
                .iter()
                .map(|f| SeriesSpec {
                    field: f.to_string(),
                    label: f.to_uppercase(),
                    color: (*f == "b").then(|| "#000000".to_string()),
                })
                .collect(),
            ..VisualizationSpec::default()
        };
        let Chart::Line(line) = expect_chart(render(&data, &s)) else {
            panic!("expected line");
        };
        let colors: Vec<&str> = line.series.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(
            colors,
            vec![LINE_PALETTE[0], "#000000", LINE_PALETTE[2], LINE_PALETTE[3], LINE_PALETTE[4], LINE_PALETTE[0]]
        );
        assert_eq!(line.series[0].label, "A");
        assert_eq!(
            line.points[0].values,
            vec![Some(1.0), Some(2.0), Some(3.0), None, None, None]
        );
    }

    #[test]
    fn test_line_series_take_precedence_over_y_field() {
        let data = rows(json!([{"x": 1, "y": 2, "z": 3}]));
        let s = spec(json!({"type": "line", "x_axis": "x", "y_axis": "y", "lines": [{"field": "z", "label": "Z"}]}));
        let Chart::Line(line) = expect_chart(render(&data, &s)) else {
            panic!("expected line");
        };
        assert_eq!(line.series.len(), 1);
        assert_eq!(line.series[0].field, "z");
    }

    #[test]
    fn test_line_without_bindings_falls_back_to_table() {
        let data = rows(json!([{"x": 1}]));
        let s = spec(json!({"type": "line", "x_axis": "x"}));
        assert!(matches!(render(&data, &s), Rendering::Table(_)));
    }

    // ---- None / unrecognized ----

    #[test]
    fn test_unrecognized_kind_falls_back_to_table() {
        let data = rows(json!([{"name": "A", "value": 1}]));
        let s = spec(json!({"type": "scatter"}));
        let Rendering::Table(table) = render(&data, &s) else {
            panic!("expected table fallback");
        };
        assert_eq!(table.columns, vec!["name", "value"]);
        assert_eq!(table.rows, vec![vec!["A".to_string(), "1".to_string()]]);
    }

    #[test]
    fn test_none_kind_and_unrecognized_kind_render_identically() {
        let data = rows(json!([{"a": 1}]));
        assert_eq!(
            render(&data, &spec(json!({"type": "none"}))),
            render(&data, &spec(json!({"type": "heatmap"})))
        );
    }

    #[test]
    fn test_none_without_rows_is_empty() {
        assert_eq!(render(&[], &VisualizationSpec::default()), Rendering::Empty);
    }

    #[test]
    fn test_table_columns_union_first_appearance() {
        let data = rows(json!([{"b": 1}, {"a": true, "b": 2}, {"c": null}]));
        let Rendering::Table(table) = render(&data, &VisualizationSpec::default()) else {
            panic!("expected table");
        };
        assert_eq!(table.columns, vec!["b", "a", "c"]);
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["2", "true", ""]);
        assert_eq!(table.rows[2], vec!["", "", ""]);
    }

    #[test]
    fn test_table_of_empty_rows_is_empty() {
        let data = rows(json!([{}, {}]));
        assert_eq!(render(&data, &VisualizationSpec::default()), Rendering::Empty);
    }

    // ---- Determinism ----

    #[test]
    fn test_render_is_deterministic() {
        let data = rows(json!([{"year": 2020, "count": 41}, {"year": 2021, "count": 57}]));
        for s in [
            spec(json!({"type": "bar", "x_axis": "year", "y_axis": "count"})),
            spec(json!({"type": "line", "x_axis": "year", "y_axis": "count"})),
            spec(json!({"type": "pie", "label_field": "year", "value_field": "count"})),
            spec(json!({"type": "none"})),
        ] {
            assert_eq!(render(&data, &s), render(&data, &s));
        }
    }

    #[test]
    fn test_chart_kind_and_title_accessors() {
        let data = rows(json!([{"name": "A", "value": 1}]));
        let chart = expect_chart(render(&data, &spec(json!({"type": "pie", "title": "Share"}))));
        assert_eq!(chart.kind(), ChartKind::Pie);
        assert_eq!(chart.title(), "Share");
    }

    // ---- Helpers ----

    #[test]
    fn test_scalar_label() {
        assert_eq!(scalar_label(None), "");
        assert_eq!(scalar_label(Some(&Value::Null)), "");
        assert_eq!(scalar_label(Some(&json!("x"))), "x");
        assert_eq!(scalar_label(Some(&json!(1.5))), "1.5");
        assert_eq!(scalar_label(Some(&json!(false))), "false");
    }

    #[test]
    fn test_numeric() {
        assert_eq!(numeric(Some(&json!(3))), Some(3.0));
        assert_eq!(numeric(Some(&json!(" 2.5 "))), Some(2.5));
        assert_eq!(numeric(Some(&json!("abc"))), None);
        assert_eq!(numeric(Some(&json!("NaN"))), None);
        assert_eq!(numeric(Some(&json!(true))), None);
        assert_eq!(numeric(None), None);
    }
}
