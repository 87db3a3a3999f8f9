//! Chart model built by extractors and drawn with plotters.
//!
//! Extractors only assemble a [`Chart`] from their own tables; nothing here
//! reaches back into an extractor. Time axes are drawn as fractional days
//! since the first plotted day so every panel shares one numeric x range.

use crate::config::ChartOptions;
use crate::error::{MetricsError, Result};
use chrono::{Duration, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    /// The metric's own series
    Data,
    /// Horizontal thresholds such as the peak or the routine value
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub label: String,
    pub style: LineStyle,
    pub points: Vec<(NaiveDateTime, f64)>,
}

impl ChartLine {
    pub fn data(label: &str, points: Vec<(NaiveDateTime, f64)>) -> Self {
        Self {
            label: label.to_string(),
            style: LineStyle::Data,
            points,
        }
    }

    /// Constant line at `value` across `[start, end]`.
    pub fn reference(label: &str, start: NaiveDateTime, end: NaiveDateTime, value: f64) -> Self {
        Self {
            label: label.to_string(),
            style: LineStyle::Reference,
            points: vec![(start, value), (end, value)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub label: String,
    pub at: NaiveDateTime,
    pub value: f64,
}

/// Shaded calendar range, e.g. a detected season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub text: String,
    pub at: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGroup {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PanelBody {
    Lines {
        lines: Vec<ChartLine>,
        markers: Vec<Marker>,
        spans: Vec<Span>,
        notes: Vec<Note>,
    },
    /// One bar per category and group, groups side by side
    Bars {
        categories: Vec<String>,
        groups: Vec<BarGroup>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub y_label: String,
    pub body: PanelBody,
}

impl Panel {
    pub fn lines(title: &str, y_label: &str, lines: Vec<ChartLine>) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            body: PanelBody::Lines {
                lines,
                markers: Vec::new(),
                spans: Vec::new(),
                notes: Vec::new(),
            },
        }
    }

    pub fn bars(title: &str, y_label: &str, categories: Vec<String>, groups: Vec<BarGroup>) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            body: PanelBody::Bars { categories, groups },
        }
    }

    pub fn with_marker(mut self, label: &str, at: NaiveDateTime, value: f64) -> Self {
        if let PanelBody::Lines { markers, .. } = &mut self.body {
            markers.push(Marker {
                label: label.to_string(),
                at,
                value,
            });
        }
        self
    }

    pub fn with_span(mut self, label: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if let PanelBody::Lines { spans, .. } = &mut self.body {
            spans.push(Span {
                label: label.to_string(),
                start,
                end,
            });
        }
        self
    }

    pub fn with_note(mut self, text: &str, at: NaiveDateTime, value: f64) -> Self {
        if let PanelBody::Lines { notes, .. } = &mut self.body {
            notes.push(Note {
                text: text.to_string(),
                at,
                value,
            });
        }
        self
    }

    pub fn line_count(&self) -> usize {
        match &self.body {
            PanelBody::Lines { lines, .. } => lines.len(),
            PanelBody::Bars { groups, .. } => groups.len(),
        }
    }

    fn time_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let PanelBody::Lines {
            lines,
            markers,
            spans,
            notes,
        } = &self.body
        else {
            return None;
        };
        let times = lines
            .iter()
            .flat_map(|l| l.points.iter().map(|(t, _)| *t))
            .chain(markers.iter().map(|m| m.at))
            .chain(spans.iter().flat_map(|s| [s.start, s.end]))
            .chain(notes.iter().map(|n| n.at));
        times.fold(None, |acc, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }

    fn value_bounds(&self) -> (f64, f64) {
        let values: Vec<f64> = match &self.body {
            PanelBody::Lines {
                lines,
                markers,
                notes,
                ..
            } => lines
                .iter()
                .flat_map(|l| l.points.iter().map(|(_, v)| *v))
                .chain(markers.iter().map(|m| m.value))
                .chain(notes.iter().map(|n| n.value))
                .collect(),
            PanelBody::Bars { groups, .. } => groups
                .iter()
                .flat_map(|g| g.values.iter().copied())
                .chain(std::iter::once(0.0))
                .collect(),
        };
        let lo = values.iter().copied().filter(|v| v.is_finite()).fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().filter(|v| v.is_finite()).fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let pad = ((hi - lo) * 0.1).max(1.0);
        (lo - pad, hi + pad)
    }

    fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        options: &ChartOptions,
    ) -> Result<()> {
        match &self.body {
            PanelBody::Lines { .. } => self.draw_lines(area, options),
            PanelBody::Bars { categories, groups } => self.draw_bars(area, options, categories, groups),
        }
    }

    fn draw_lines<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        options: &ChartOptions,
    ) -> Result<()> {
        let PanelBody::Lines {
            lines,
            markers,
            spans,
            notes,
        } = &self.body
        else {
            return Ok(());
        };
        let Some((first, last)) = self.time_bounds() else {
            return Ok(());
        };
        let origin = first.date().and_hms_opt(0, 0, 0).unwrap_or(first);
        let x = |t: NaiveDateTime| (t - origin).num_seconds() as f64 / 86_400.0;
        let (y0, y1) = self.value_bounds();
        let x1 = x(last).max(1.0);
        let font = f64::from(options.font_size);

        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, ("sans-serif", font + 6.0).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0..x1, y0..y1)
            .map_err(chart_err)?;

        let day_label = |v: &f64| {
            let at = origin + Duration::seconds((*v * 86_400.0) as i64);
            at.format("%b %d").to_string()
        };
        chart
            .configure_mesh()
            .y_desc(self.y_label.as_str())
            .x_label_formatter(&day_label)
            .label_style(("sans-serif", font).into_font())
            .draw()
            .map_err(chart_err)?;

        for span in spans {
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x(span.start), y0), (x(span.end), y1)],
                    RGBColor(255, 165, 0).mix(0.2).filled(),
                )))
                .map_err(chart_err)?
                .label(span.label.as_str())
                .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], RGBColor(255, 165, 0).mix(0.4).filled()));
        }

        let palette = [BLUE, GREEN, MAGENTA, CYAN, BLACK];
        let mut data_lines = 0;
        for line in lines {
            let color = match line.style {
                LineStyle::Data => {
                    data_lines += 1;
                    palette[(data_lines - 1) % palette.len()]
                }
                LineStyle::Reference => RED,
            };
            chart
                .draw_series(LineSeries::new(
                    line.points.iter().map(|(t, v)| (x(*t), *v)),
                    color.stroke_width(2),
                ))
                .map_err(chart_err)?
                .label(line.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .draw_series(markers.iter().map(|m| Circle::new((x(m.at), m.value), 4, BLACK.filled())))
            .map_err(chart_err)?;
        chart
            .draw_series(markers.iter().filter(|m| !m.label.is_empty()).map(|m| {
                Text::new(
                    m.label.clone(),
                    (x(m.at), m.value),
                    ("sans-serif", font).into_font(),
                )
            }))
            .map_err(chart_err)?;
        chart
            .draw_series(notes.iter().map(|n| {
                Text::new(n.text.clone(), (x(n.at), n.value), ("sans-serif", font).into_font())
            }))
            .map_err(chart_err)?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", font).into_font())
            .draw()
            .map_err(chart_err)?;
        Ok(())
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        options: &ChartOptions,
        categories: &[String],
        groups: &[BarGroup],
    ) -> Result<()> {
        if categories.is_empty() || groups.is_empty() {
            return Ok(());
        }
        let (y0, y1) = self.value_bounds();
        let font = f64::from(options.font_size);
        let n = categories.len() as f64;

        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, ("sans-serif", font + 6.0).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0..n, y0.min(0.0)..y1)
            .map_err(chart_err)?;

        let no_label = |_: &f64| String::new();
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&no_label)
            .y_desc(self.y_label.as_str())
            .label_style(("sans-serif", font).into_font())
            .draw()
            .map_err(chart_err)?;

        // category names sit just above the zero line of each group
        chart
            .draw_series(categories.iter().enumerate().map(|(i, name)| {
                Text::new(name.clone(), (i as f64 + 0.1, 0.0), ("sans-serif", font).into_font())
            }))
            .map_err(chart_err)?;

        let palette = [BLUE, RED, GREEN, MAGENTA];
        let width = 0.8 / groups.len() as f64;
        for (g, group) in groups.iter().enumerate() {
            let color = palette[g % palette.len()];
            chart
                .draw_series(group.values.iter().enumerate().map(|(i, v)| {
                    let left = i as f64 + 0.1 + g as f64 * width;
                    Rectangle::new([(left, 0.0), (left + width, *v)], color.filled())
                }))
                .map_err(chart_err)?
                .label(group.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", font).into_font())
            .draw()
            .map_err(chart_err)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Chart {
    pub fn new(title: &str, panels: Vec<Panel>) -> Self {
        Self {
            title: title.to_string(),
            panels,
        }
    }

    /// A titled chart with no panels, for metrics that do not apply.
    pub fn empty(title: &str) -> Self {
        Self::new(title, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Draws the chart to `path`; SVG when the extension is `.svg`, PNG
    /// otherwise. Panels are stacked vertically.
    pub fn save(&self, path: &Path, options: &ChartOptions) -> Result<()> {
        let rows = self.panels.len().max(1) as u32;
        let size = (options.width, options.height * rows);
        let is_svg = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            let root = SVGBackend::new(path, size).into_drawing_area();
            self.draw(&root, options)
        } else {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            self.draw(&root, options)
        }
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        options: &ChartOptions,
    ) -> Result<()> {
        root.fill(&WHITE).map_err(chart_err)?;
        let body = root
            .titled(&self.title, ("sans-serif", f64::from(options.font_size) * 2.0).into_font())
            .map_err(chart_err)?;

        if !self.panels.is_empty() {
            let areas = body.split_evenly((self.panels.len(), 1));
            for (panel, area) in self.panels.iter().zip(areas.iter()) {
                panel.draw(area, options)?;
            }
        }

        root.present().map_err(chart_err)?;
        Ok(())
    }
}

fn chart_err<E: std::fmt::Debug>(e: E) -> MetricsError {
    MetricsError::Chart(format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_panel_bounds() {
        let panel = Panel::lines(
            "Net Load",
            "MW",
            vec![ChartLine::data("Net Load", vec![(ts(2, 0), 10.0), (ts(4, 6), 50.0)])],
        )
        .with_span("Season", ts(1, 0), ts(3, 0));
        assert_eq!(panel.time_bounds(), Some((ts(1, 0), ts(4, 6))));
        let (lo, hi) = panel.value_bounds();
        assert!(lo < 10.0 && hi > 50.0);
    }

    #[test]
    fn test_builders_ignore_bar_panels() {
        let panel = Panel::bars("Capacity", "MW", vec!["Solar".to_string()], vec![])
            .with_marker("Peak", ts(1, 0), 1.0);
        assert_eq!(panel.line_count(), 0);
        assert!(panel.time_bounds().is_none());
    }

    #[test]
    fn test_save_svg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.svg");
        let chart = Chart::new(
            "Capacity",
            vec![Panel::bars(
                "Power (MW)",
                "MW",
                vec!["Solar".to_string(), "Onshore Wind".to_string()],
                vec![
                    BarGroup {
                        label: "p_nom".to_string(),
                        values: vec![10.0, 5.0],
                    },
                    BarGroup {
                        label: "p_nom_opt".to_string(),
                        values: vec![12.0, 8.0],
                    },
                ],
            )],
        );
        chart.save(&path, &ChartOptions::default()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
    }
}
