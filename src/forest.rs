//! Grouped mean / SD / standard error / normal-theory confidence intervals
//! feeding the forest plot.

use crate::config::MissingGroups;
use crate::data::{Column, Dataset};
use crate::error::RenderError;
use crate::stats;
use serde::Serialize;

pub const OVERALL_LABEL: &str = "Overall";
pub const MISSING_GROUP_LABEL: &str = "(missing)";

/// One estimate line of a forest plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestRow {
    pub group: String,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub n: usize,
    pub se: Option<f64>,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
}

impl ForestRow {
    fn from_values(group: String, values: &[f64], z: Option<f64>) -> Self {
        let n = values.len();
        let mean = stats::mean(values);
        let sd = stats::sample_sd(values);
        let se = sd.map(|sd| sd / (n as f64).sqrt());
        let (ci_lower, ci_upper) = match (mean, se, z) {
            (Some(m), Some(se), Some(z)) => (Some(m - z * se), Some(m + z * se)),
            _ => (None, None),
        };
        Self { group, mean, sd, n, se, ci_lower, ci_upper }
    }
}

/// Aggregate `variable` overall (no `group`) or per distinct group value.
/// Groups follow first-appearance order.
pub fn aggregate(
    dataset: &Dataset,
    variable: &str,
    group: Option<&str>,
    ci_level: f64,
    missing_groups: MissingGroups,
) -> Result<Vec<ForestRow>, RenderError> {
    let column = dataset
        .column(variable)
        .ok_or_else(|| RenderError::ColumnNotFound(variable.to_string()))?;
    if !column.is_numeric() {
        return Err(RenderError::UnsupportedType {
            column: variable.to_string(),
            expected: "numeric",
        });
    }

    let z = stats::z_for_level(ci_level);

    let Some(group) = group else {
        let all: Vec<usize> = (0..dataset.row_count()).collect();
        let values = present_values(column, &all);
        return Ok(vec![ForestRow::from_values(OVERALL_LABEL.to_string(), &values, z)]);
    };

    let group_col = dataset
        .column(group)
        .ok_or_else(|| RenderError::ColumnNotFound(group.to_string()))?;

    let rows = group_col
        .partition()
        .into_iter()
        .filter_map(|(key, rows)| {
            let label = match (key, missing_groups) {
                (Some(label), _) => label,
                (None, MissingGroups::Partition) => MISSING_GROUP_LABEL.to_string(),
                (None, MissingGroups::Exclude) => return None,
            };
            Some(ForestRow::from_values(label, &present_values(column, &rows), z))
        })
        .collect();

    Ok(rows)
}

fn present_values(column: &Column, rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&r| column.number(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_csv;
    use crate::loader::sample_dataset;

    fn grouped() -> Dataset {
        parse_csv(b"g,v\na,1\nb,2\na,3\n,4\nb,NA\nc,5\nNA,6\n").unwrap()
    }

    #[test]
    fn test_overall_single_value() {
        let ds = parse_csv(b"v\n7\n").unwrap();
        let rows = aggregate(&ds, "v", None, 0.95, MissingGroups::Exclude).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, "Overall");
        assert_eq!(rows[0].mean, Some(7.0));
        assert_eq!(rows[0].n, 1);
        assert_eq!(rows[0].ci_lower, None);
        assert_eq!(rows[0].ci_upper, None);
    }

    #[test]
    fn test_nan_cells_are_not_counted() {
        let ds = parse_csv(b"v\n1\nNAN\n3\n").unwrap();
        let row = &aggregate(&ds, "v", None, 0.95, MissingGroups::Exclude).unwrap()[0];
        assert_eq!(row.n, 2);
        assert!((row.mean.unwrap() - 2.0).abs() < 1e-12);
        assert!(row.ci_lower.unwrap().is_finite());
    }

    #[test]
    fn test_overall_interval() {
        let ds = parse_csv(b"v\n1\n2\n3\n4\n5\n").unwrap();
        let row = &aggregate(&ds, "v", None, 0.95, MissingGroups::Exclude).unwrap()[0];
        let sd = 2.5f64.sqrt();
        let se = sd / 5f64.sqrt();
        assert!((row.mean.unwrap() - 3.0).abs() < 1e-12);
        assert!((row.se.unwrap() - se).abs() < 1e-12);
        assert!((row.ci_lower.unwrap() - (3.0 - 1.959964 * se)).abs() < 1e-5);
        assert!((row.ci_upper.unwrap() - (3.0 + 1.959964 * se)).abs() < 1e-5);
    }

    #[test]
    fn test_grouped_excluding_missing_groups() {
        let rows = aggregate(&grouped(), "v", Some("g"), 0.95, MissingGroups::Exclude).unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(rows[0].n, 2);
        assert_eq!(rows[1].n, 1);
        assert_eq!(rows[2].n, 1);
        // rows with a group value and a present v: a,b,a,c
        assert_eq!(rows.iter().map(|r| r.n).sum::<usize>(), 4);
    }

    #[test]
    fn test_grouped_with_missing_partition() {
        let rows = aggregate(&grouped(), "v", Some("g"), 0.95, MissingGroups::Partition).unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "(missing)", "c"]);
        assert_eq!(rows[2].n, 2);
        assert_eq!(rows[2].mean, Some(5.0));
        // every present v is counted once
        assert_eq!(rows.iter().map(|r| r.n).sum::<usize>(), 6);
    }

    #[test]
    fn test_empty_partition_is_undefined() {
        let ds = parse_csv(b"g,v\na,1\nb,NA\n").unwrap();
        let rows = aggregate(&ds, "v", Some("g"), 0.95, MissingGroups::Exclude).unwrap();
        assert_eq!(rows[1].n, 0);
        assert_eq!(rows[1].mean, None);
        assert_eq!(rows[1].sd, None);
        assert_eq!(rows[1].ci_lower, None);
    }

    #[test]
    fn test_sample_by_region() {
        let ds = sample_dataset(42);
        let rows = aggregate(&ds, "Sales", Some("Region"), 0.95, MissingGroups::Exclude).unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(labels, vec!["North", "South", "East", "West"]);
        assert!(rows.iter().all(|r| r.n == 50));
        assert!(rows.iter().all(|r| r.ci_lower.unwrap() < r.mean.unwrap()));
    }

    #[test]
    fn test_wider_level_widens_interval() {
        let ds = sample_dataset(42);
        let narrow = &aggregate(&ds, "Sales", None, 0.80, MissingGroups::Exclude).unwrap()[0];
        let wide = &aggregate(&ds, "Sales", None, 0.99, MissingGroups::Exclude).unwrap()[0];
        let width = |r: &ForestRow| r.ci_upper.unwrap() - r.ci_lower.unwrap();
        assert!(width(wide) > width(narrow));
    }

    #[test]
    fn test_errors() {
        let ds = grouped();
        assert!(matches!(
            aggregate(&ds, "g", None, 0.95, MissingGroups::Exclude),
            Err(RenderError::UnsupportedType { .. })
        ));
        assert!(matches!(
            aggregate(&ds, "nope", None, 0.95, MissingGroups::Exclude),
            Err(RenderError::ColumnNotFound(_))
        ));
        assert!(matches!(
            aggregate(&ds, "v", Some("nope"), 0.95, MissingGroups::Exclude),
            Err(RenderError::ColumnNotFound(_))
        ));
    }
}
