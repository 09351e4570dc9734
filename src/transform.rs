use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::ClimateError;
use crate::table::Record;

pub const GAP_THRESHOLD_YEARS: f64 = 5000.0;
pub const GAP_MARKER_OFFSET_YEARS: f64 = 1000.0;

pub fn insert_gaps(mut records: Vec<Record>, threshold: f64, name: &str) -> Vec<Record> {
    records.sort_by(|a, b| a.year.total_cmp(&b.year));
    let markers: Vec<Record> = records
        .windows(2)
        .filter(|pair| pair[1].year - pair[0].year > threshold)
        .map(|pair| Record::new(pair[0].year + GAP_MARKER_OFFSET_YEARS, name, f64::NAN))
        .collect();
    records.extend(markers);
    records.sort_by(|a, b| a.year.total_cmp(&b.year));
    records
}

pub fn row_mean(columns: &[Vec<f64>]) -> Result<Vec<f64>, ClimateError> {
    let Some(first) = columns.first() else {
        return Ok(Vec::new());
    };
    if columns.iter().any(|column| column.len() != first.len()) {
        return Err(ClimateError::Shape("columns to average differ in length".to_string()));
    }
    Ok((0..first.len())
        .map(|row| {
            let (sum, count) = columns
                .iter()
                .map(|column| column[row])
                .filter(|value| !value.is_nan())
                .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
            if count == 0 { f64::NAN } else { sum / count as f64 }
        })
        .collect())
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|idx| {
            if idx + 1 < window {
                return f64::NAN;
            }
            let slice = &values[idx + 1 - window..=idx];
            if slice.iter().any(|value| value.is_nan()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

/// Linear interpolation by position. Leading NaNs stay, trailing NaNs repeat the last value.
pub fn interpolate_linear(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    let mut last_valid: Option<usize> = None;
    for idx in 0..out.len() {
        if out[idx].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid {
            if idx > prev + 1 {
                let step = (out[idx] - out[prev]) / (idx - prev) as f64;
                for fill in prev + 1..idx {
                    out[fill] = out[prev] + step * (fill - prev) as f64;
                }
            }
        }
        last_valid = Some(idx);
    }
    if let Some(prev) = last_valid {
        let tail = out[prev];
        for value in out.iter_mut().skip(prev + 1) {
            *value = tail;
        }
    }
    out
}

pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|&value| {
            if value.is_nan() {
                last
            } else {
                last = value;
                value
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<LinearFit, ClimateError> {
    if xs.len() != ys.len() {
        return Err(ClimateError::Shape(format!(
            "cannot fit {} x values against {} y values",
            xs.len(),
            ys.len()
        )));
    }
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if points.len() < 2 {
        return Err(ClimateError::Shape("a trend needs at least two points".to_string()));
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
        (sxy + (x - mean_x) * (y - mean_y), sxx + (x - mean_x).powi(2))
    });
    if sxx == 0.0 {
        return Err(ClimateError::Shape("x values have no spread".to_string()));
    }
    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub fit: LinearFit,
    pub line: Vec<f64>,
}

pub fn trendline(values: &[f64]) -> Result<Trend, ClimateError> {
    let xs: Vec<f64> = (0..values.len()).map(|idx| idx as f64).collect();
    let fit = linear_fit(&xs, values)?;
    let line = xs.iter().map(|x| fit.at(*x)).collect();
    Ok(Trend { fit, line })
}

pub fn gradient(ys: &[f64], xs: &[f64]) -> Result<Vec<f64>, ClimateError> {
    if ys.len() != xs.len() {
        return Err(ClimateError::Shape(format!(
            "gradient of {} values over {} coordinates",
            ys.len(),
            xs.len()
        )));
    }
    let n = ys.len();
    if n < 2 {
        return Err(ClimateError::Shape("gradient needs at least two samples".to_string()));
    }
    let mut out = vec![0.0; n];
    out[0] = (ys[1] - ys[0]) / (xs[1] - xs[0]);
    out[n - 1] = (ys[n - 1] - ys[n - 2]) / (xs[n - 1] - xs[n - 2]);
    for i in 1..n - 1 {
        let hd = xs[i] - xs[i - 1];
        let hs = xs[i + 1] - xs[i];
        out[i] = (hd * hd * ys[i + 1] - hs * hs * ys[i - 1] + (hs * hs - hd * hd) * ys[i])
            / (hs * hd * (hd + hs));
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityValue {
    pub entity: String,
    pub year: i32,
    pub value: f64,
}

/// Divides each entity's quantity by its population, row by row in year order.
///
/// Entities whose two series differ in length are dropped, as are entities without
/// population data.
pub fn per_capita(quantity: &[EntityValue], population: &[EntityValue]) -> Vec<EntityValue> {
    let quantity = group_by_entity(quantity);
    let population = group_by_entity(population);

    let mut out = Vec::new();
    for (entity, amounts) in &quantity {
        let Some(people) = population.get(entity) else {
            debug!(entity = %entity, "no population series; dropping entity");
            continue;
        };
        if amounts.len() != people.len() {
            debug!(
                entity = %entity,
                quantity = amounts.len(),
                population = people.len(),
                "series lengths differ; dropping entity"
            );
            continue;
        }
        out.extend(amounts.iter().zip(people.iter()).map(|(amount, person)| EntityValue {
            entity: entity.clone(),
            year: amount.year,
            value: amount.value / person.value,
        }));
    }
    out
}

fn group_by_entity(rows: &[EntityValue]) -> BTreeMap<String, Vec<&EntityValue>> {
    let mut grouped: BTreeMap<String, Vec<&EntityValue>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.entity.clone()).or_default().push(row);
    }
    for series in grouped.values_mut() {
        series.sort_by_key(|row| row.year);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn gaps_follow_large_jumps() {
        let records = vec![
            Record::new(-20000.0, "CO2_hist", 190.0),
            Record::new(-800000.0, "CO2_hist", 280.0),
            Record::new(-798000.0, "CO2_hist", 275.0),
        ];
        let out = insert_gaps(records, GAP_THRESHOLD_YEARS, "CO2_hist");
        assert_eq!(out.len(), 4);
        assert_eq!(out[2].year, -797000.0);
        assert!(out[2].is_gap());
        assert_eq!(out[3].year, -20000.0);
    }

    #[test]
    fn gap_threshold_is_exclusive() {
        let records = vec![
            Record::new(0.0, "N2O_hist", 260.0),
            Record::new(5000.0, "N2O_hist", 262.0),
        ];
        let out = insert_gaps(records, GAP_THRESHOLD_YEARS, "N2O_hist");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn row_mean_skips_nan() {
        let mean = row_mean(&[vec![1.0, f64::NAN, f64::NAN], vec![3.0, 4.0, f64::NAN]]).unwrap();
        assert_eq!(mean[0], 2.0);
        assert_eq!(mean[1], 4.0);
        assert!(mean[2].is_nan());
    }

    #[test]
    fn rolling_mean_waits_for_full_window() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(out[2], 2.0);
        assert_eq!(out[3], 3.0);
    }

    #[test]
    fn interpolate_fills_interior_and_tail() {
        let out = interpolate_linear(&[f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN]);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn trendline_recovers_exact_line() {
        let values: Vec<f64> = (0..24).map(|t| -0.05 * t as f64 + 14.2).collect();
        let trend = trendline(&values).unwrap();
        assert!(approx(trend.fit.slope, -0.05));
        assert!(approx(trend.fit.intercept, 14.2));
        assert!(approx(trend.line[10], values[10]));
    }

    #[test]
    fn gradient_of_line_is_constant() {
        let xs = [1993.0, 1993.1, 1993.3, 1994.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.3 * x - 10.0).collect();
        for slope in gradient(&ys, &xs).unwrap() {
            assert!((slope - 3.3).abs() < 1e-6);
        }
    }

    #[test]
    fn per_capita_drops_mismatched_entities() {
        let row = |entity: &str, year, value| EntityValue {
            entity: entity.to_string(),
            year,
            value,
        };
        let quantity = vec![row("France", 2000, 10.0), row("France", 2001, 12.0), row("Chad", 2000, 1.0)];
        let population = vec![
            row("France", 2001, 4.0),
            row("France", 2000, 5.0),
            row("Chad", 2000, 1.0),
            row("Chad", 2001, 1.0),
        ];
        let out = per_capita(&quantity, &population);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|row| row.entity == "France"));
        assert_eq!(out[0].value, 2.0);
        assert_eq!(out[1].value, 3.0);
    }
}
