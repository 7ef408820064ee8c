//! Plain-text rendering of conversation messages for the console.

use std::fmt::Write;

use chrono::Local;

use pubquery_chat::visualization::{BarChart, LineChart, PieChart};
use pubquery_chat::{Chart, Message, Rendering, ResponseSummary, Role};

/// Width of the longest bar in a bar chart.
const BAR_WIDTH: usize = 40;

/// One message with its local timestamp, plus the answer details for
/// assistant messages.
pub fn render_message(message: &Message) -> String {
    let time = message.created_at.with_timezone(&Local).format("%H:%M:%S");
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };

    let mut out = format!("[{}] {}: {}\n", time, speaker, message.text);
    if let Some(summary) = ResponseSummary::for_message(message) {
        out.push_str(&render_summary(&summary));
    }
    out
}

pub fn render_summary(summary: &ResponseSummary) -> String {
    let mut out = String::new();
    if !summary.sql.trim().is_empty() {
        out.push_str("  SQL:\n");
        for line in summary.sql.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    let _ = writeln!(out, "  {}", summary.caption);

    let rendering = render_rendering(&summary.rendering);
    for line in rendering.lines() {
        let _ = writeln!(out, "  {}", line);
    }

    if !summary.follow_ups.is_empty() {
        out.push_str("  Follow-ups:\n");
        for follow_up in &summary.follow_ups {
            let _ = writeln!(out, "    /{} {}", follow_up.index + 1, follow_up.question);
        }
    }
    out
}

pub fn render_rendering(rendering: &Rendering) -> String {
    match rendering {
        Rendering::Chart(Chart::Bar(chart)) => render_bar(chart),
        Rendering::Chart(Chart::Line(chart)) => render_line(chart),
        Rendering::Chart(Chart::Pie(chart)) => render_pie(chart),
        Rendering::Table(table) => render_table(&table.columns, &table.rows),
        Rendering::Empty => "(no rows)\n".to_string(),
    }
}

fn render_bar(chart: &BarChart) -> String {
    let mut out = format!("{}\n", chart.title);
    let max = chart
        .bars
        .iter()
        .filter_map(|b| b.value)
        .fold(0.0_f64, f64::max);
    let label_width = chart
        .bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);

    for bar in &chart.bars {
        let length = match bar.value {
            Some(v) if v > 0.0 && max > 0.0 => ((v / max) * BAR_WIDTH as f64).round() as usize,
            _ => 0,
        };
        let line = format!(
            "{:<width$} | {} {}",
            bar.label,
            "#".repeat(length),
            format_value(bar.value),
            width = label_width
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn render_line(chart: &LineChart) -> String {
    let mut columns = vec![chart.x_field.clone().unwrap_or_else(|| "x".to_string())];
    columns.extend(chart.series.iter().map(|s| s.label.clone()));

    let rows: Vec<Vec<String>> = chart
        .points
        .iter()
        .map(|point| {
            let mut row = vec![point.x.clone()];
            row.extend(point.values.iter().map(|v| format_value(*v)));
            row
        })
        .collect();

    format!("{}\n{}", chart.title, render_table(&columns, &rows))
}

fn render_pie(chart: &PieChart) -> String {
    let mut out = format!("{}\n", chart.title);
    let total = chart.total();
    let name_width = chart
        .slices
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);

    for slice in &chart.slices {
        let share = match slice.value {
            Some(v) if total > 0.0 => format!("{:.1}%", v / total * 100.0),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<width$}  {} ({})",
            slice.name,
            format_value(slice.value),
            share,
            width = name_width
        );
    }
    out
}

/// Columns padded to their widest cell, separated by `|`.
fn render_table(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = *width)
            })
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", format_row(columns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
    out
}

/// Whole numbers without decimals, others to two places. Blank values are `-`.
fn format_value(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.0}", v),
        Some(v) => {
            let text = format!("{:.2}", v);
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubquery_chat::visualization::{Bar, LinePoint, LineSeries, PieSlice};
    use pubquery_chat::{ChartKind, ConversationStore, QueryResponse, VisualizationSpec};
    use serde_json::json;

    fn bar_chart(values: &[(&str, Option<f64>)]) -> BarChart {
        BarChart {
            title: "Papers per year".to_string(),
            x_field: Some("year".to_string()),
            y_field: "count".to_string(),
            color: "#8884d8",
            bars: values
                .iter()
                .map(|(label, value)| Bar {
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(14.0)), "14");
        assert_eq!(format_value(Some(0.5)), "0.5");
        assert_eq!(format_value(Some(2.126)), "2.13");
        assert_eq!(format_value(Some(-3.0)), "-3");
    }

    #[test]
    fn test_bars_scale_to_widest() {
        let out = render_bar(&bar_chart(&[("2020", Some(10.0)), ("2021", Some(5.0))]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Papers per year");
        assert_eq!(lines[1], format!("2020 | {} 10", "#".repeat(40)));
        assert_eq!(lines[2], format!("2021 | {} 5", "#".repeat(20)));
    }

    #[test]
    fn test_blank_and_negative_bars_have_no_length() {
        let out = render_bar(&bar_chart(&[("a", None), ("bb", Some(-2.0))]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "a  |  -");
        assert_eq!(lines[2], "bb |  -2");
    }

    #[test]
    fn test_pie_shows_shares() {
        let chart = PieChart {
            title: "Papers by venue".to_string(),
            label_field: "name".to_string(),
            value_field: "value".to_string(),
            slices: vec![
                PieSlice {
                    name: "NeurIPS".to_string(),
                    value: Some(3.0),
                    color: "#0088FE",
                },
                PieSlice {
                    name: "ICML".to_string(),
                    value: Some(1.0),
                    color: "#00C49F",
                },
            ],
        };
        let out = render_pie(&chart);
        assert!(out.contains("NeurIPS  3 (75.0%)"));
        assert!(out.contains("ICML     1 (25.0%)"));
    }

    #[test]
    fn test_line_renders_as_table() {
        let chart = LineChart {
            title: "Trend".to_string(),
            x_field: Some("year".to_string()),
            series: vec![LineSeries {
                field: "papers".to_string(),
                label: "Papers".to_string(),
                color: "#8884d8".to_string(),
            }],
            points: vec![
                LinePoint {
                    x: "2020".to_string(),
                    values: vec![Some(12.0)],
                },
                LinePoint {
                    x: "2021".to_string(),
                    values: vec![None],
                },
            ],
        };
        let out = render_line(&chart);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Trend");
        assert_eq!(lines[1], "year | Papers");
        assert_eq!(lines[2], "-----+-------");
        assert_eq!(lines[3], "2020 | 12");
        assert_eq!(lines[4], "2021 | -");
    }

    #[test]
    fn test_table_pads_columns() {
        let out = render_table(
            &["author".to_string(), "n".to_string()],
            &[
                vec!["Ada".to_string(), "7".to_string()],
                vec!["Grace Hopper".to_string(), "12".to_string()],
            ],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "author       | n");
        assert_eq!(lines[1], "-------------+---");
        assert_eq!(lines[2], "Ada          | 7");
        assert_eq!(lines[3], "Grace Hopper | 12");
    }

    #[test]
    fn test_empty_rendering() {
        assert_eq!(render_rendering(&Rendering::Empty), "(no rows)\n");
    }

    #[test]
    fn test_user_message_line() {
        let mut store = ConversationStore::new();
        let message = store.append_user_message("top venues").clone();
        let out = render_message(&message);
        assert!(out.starts_with('['));
        assert!(out.trim_end().ends_with("] you: top venues"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_assistant_message_includes_summary() {
        let mut spec = VisualizationSpec::of_kind(ChartKind::Bar);
        spec.x_field = Some("venue".to_string());
        spec.y_field = Some("papers".to_string());
        let rows = vec![json!({"venue": "NeurIPS", "papers": 14})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();

        let mut store = ConversationStore::new();
        let message = store
            .append_assistant_message(QueryResponse {
                sql: "SELECT venue, COUNT(*) AS papers\nFROM papers GROUP BY venue".to_string(),
                row_count: 1,
                confidence: 0.9,
                rows,
                visualization: spec,
                suggested_questions: vec!["And in 2020?".to_string()],
            })
            .clone();

        let out = render_message(&message);
        assert!(out.contains("] assistant: Query returned 1 row."));
        assert!(out.contains("  SQL:\n    SELECT venue, COUNT(*) AS papers\n    FROM papers GROUP BY venue\n"));
        assert!(out.contains("  1 rows \u{2022} 90% confidence\n"));
        assert!(out.contains(&format!("NeurIPS | {} 14", "#".repeat(40))));
        assert!(out.contains("  Follow-ups:\n    /1 And in 2020?\n"));
    }
}
