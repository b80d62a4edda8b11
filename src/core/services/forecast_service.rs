use timeledger_domain::MonthKey;

use crate::calendar::MonthGrid;
use crate::core::context::ForecastSettings;
use crate::core::series::HoursSeries;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// Grid months followed by the projected months.
    pub labels: Vec<MonthKey>,
    /// Actual burn at history positions, projections in the tail.
    pub net: Vec<Option<f64>>,
    pub projected_breakeven_month: Option<MonthKey>,
}

pub struct ForecastService;

impl ForecastService {
    /// Extends `burn` with a least-squares line fitted over the trailing known values.
    pub fn project(grid: &MonthGrid, burn: &HoursSeries, settings: ForecastSettings) -> Forecast {
        let history: Vec<Option<f64>> = grid
            .iter()
            .map(|month| burn.get(&month).copied().flatten())
            .collect();
        let points: Vec<(f64, f64)> = history
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.map(|value| (index as f64, value)))
            .collect();
        let trailing = settings.trailing_months.max(1) as usize;
        let window = &points[points.len().saturating_sub(trailing)..];
        let line = fit_line(window);

        let future = grid.following(settings.horizon_months);
        let projections: Vec<Option<f64>> = (0..future.len())
            .map(|offset| {
                let x = (history.len() + offset) as f64;
                line.map(|(slope, intercept)| slope * x + intercept)
            })
            .collect();

        let history_total: f64 = history.iter().flatten().sum();
        let projected_breakeven_month = first_crossing(history_total, &future, &projections);

        let mut labels = grid.months().to_vec();
        labels.extend(future);
        let mut net = history;
        net.extend(projections);
        Forecast {
            labels,
            net,
            projected_breakeven_month,
        }
    }
}

/// `(slope, intercept)`; a single point gives a flat line, no points give none.
fn fit_line(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    match points {
        [] => None,
        [(_, y)] => Some((0.0, *y)),
        _ => {
            let n = points.len() as f64;
            let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
            let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
            let covariance: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
            let variance: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
            if variance == 0.0 {
                return Some((0.0, mean_y));
            }
            let slope = covariance / variance;
            Some((slope, mean_y - slope * mean_x))
        }
    }
}

/// First projected month where the running total reaches or leaves zero. A total
/// sitting at zero only crosses once it moves off it.
fn first_crossing(start: f64, months: &[MonthKey], values: &[Option<f64>]) -> Option<MonthKey> {
    let mut cumulative = start;
    for (month, value) in months.iter().zip(values) {
        let previous = cumulative;
        cumulative += (*value)?;
        let crossed = if previous == 0.0 {
            cumulative != 0.0
        } else {
            previous.signum() != cumulative.signum() || cumulative == 0.0
        };
        if crossed {
            return Some(*month);
        }
    }
    None
}
