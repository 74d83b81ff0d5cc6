//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - monthly revenue: `o` markers joined by a `-` line
//! - breakdown rows: horizontal `#` bars scaled to the largest value

use crate::domain::GroupTotal;

/// Render the monthly revenue series as a line plot.
///
/// Months are spaced evenly on the x axis (labels are categorical).
/// Returns an empty string for an empty series.
pub fn render_monthly_plot(series: &[GroupTotal], width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return String::new();
    };

    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(series);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_max = (series.len() - 1).max(1) as f64;

    let points: Vec<(usize, usize)> = series
        .iter()
        .enumerate()
        .map(|(i, g)| {
            (
                map_x(i as f64, x_max, width),
                map_y(g.revenue, y_min, y_max, height),
            )
        })
        .collect();

    let mut grid = vec![vec![' '; width]; height];

    // Line first so markers overlay it.
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &(x, y) in &points {
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: month=[{}, {}] | revenue=[{y_min:.2}, {y_max:.2}]\n",
        first.key, last.key
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Horizontal bar for `value` relative to `max`, at most `width` cells.
///
/// Non-positive values (net returns) render as an empty bar.
pub fn hbar(value: f64, max: f64, width: usize) -> String {
    if !(value > 0.0 && max > 0.0) {
        return String::new();
    }
    let n = ((value / max).min(1.0) * width as f64).round() as usize;
    "#".repeat(n.max(1))
}

fn y_range(series: &[GroupTotal]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for g in series {
        min_y = min_y.min(g.revenue);
        max_y = max_y.max(g.revenue);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return (0.0, 1.0);
    }
    if max_y > min_y {
        (min_y, max_y)
    } else {
        (min_y - 1.0, max_y + 1.0)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(key: &str, revenue: f64) -> GroupTotal {
        GroupTotal {
            key: key.to_string(),
            revenue,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let series = vec![g("2011-01", 100.0), g("2011-02", 110.0)];
        let txt = render_monthly_plot(&series, 10, 5);
        let expected = concat!(
            "Plot: month=[2011-01, 2011-02] | revenue=[99.50, 110.50]\n",
            "        -o\n",
            "      --  \n",
            "    --    \n",
            "  --      \n",
            "o-        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn single_month_plots_one_marker() {
        let txt = render_monthly_plot(&[g("2011-01", 42.0)], 10, 5);
        let grid: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[2], "o         ");
        assert!(grid.iter().all(|row| !row.contains('-')));
    }

    #[test]
    fn empty_series_renders_nothing() {
        assert_eq!(render_monthly_plot(&[], 10, 5), "");
    }

    #[test]
    fn bars_scale_to_max() {
        assert_eq!(hbar(50.0, 100.0, 10), "#####");
        assert_eq!(hbar(100.0, 100.0, 10), "##########");
        assert_eq!(hbar(0.1, 100.0, 10), "#");
        assert_eq!(hbar(-5.0, 100.0, 10), "");
    }
}
