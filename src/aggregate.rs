// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregation pipeline: `$group` with `$sum`/`$count`/`$min`/`$max`/`$avg` accumulators.

use crate::record::Record;
use std::collections::BTreeMap;

/// One accumulator attached to a `$group` stage's output field.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Sum(String),
    Count,
    Min(String),
    Max(String),
    Avg(String),
}

/// A `$group` stage: group by `group_field`, compute one or more named accumulators.
#[derive(Debug, Clone)]
pub struct GroupStage {
    pub group_field: String,
    pub outputs: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone)]
pub enum Stage {
    Group(GroupStage),
}

/// Runs the pipeline over `records`. `$group` is the only stage this evaluator runs.
pub fn aggregate(records: &[Record], pipeline: &[Stage]) -> Vec<Record> {
    let mut current = records.to_vec();
    for stage in pipeline {
        match stage {
            Stage::Group(group) => current = run_group(&current, group),
        }
    }
    current
}

fn run_group(records: &[Record], group: &GroupStage) -> Vec<Record> {
    struct Acc {
        sums: BTreeMap<String, Vec<f64>>,
        counts: BTreeMap<String, i64>,
        mins: BTreeMap<String, Option<f64>>,
        maxs: BTreeMap<String, Option<f64>>,
        avgs: BTreeMap<String, Vec<f64>>,
    }

    // group key -> accumulator state; `None` key (missing group field) is a legitimate group.
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: BTreeMap<Option<String>, Acc> = BTreeMap::new();

    for record in records {
        let key = record.get(&group.group_field).map(|s| s.to_string());
        if !groups.contains_key(&key) {
            order.push(key.clone());
            groups.insert(
                key.clone(),
                Acc {
                    sums: BTreeMap::new(),
                    counts: BTreeMap::new(),
                    mins: BTreeMap::new(),
                    maxs: BTreeMap::new(),
                    avgs: BTreeMap::new(),
                },
            );
        }
        let acc = groups.get_mut(&key).unwrap();
        for (out_field, accumulator) in &group.outputs {
            match accumulator {
                Accumulator::Sum(field) => {
                    let v = record.get(field).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
                    acc.sums.entry(out_field.clone()).or_default().push(v);
                }
                Accumulator::Count => {
                    *acc.counts.entry(out_field.clone()).or_insert(0) += 1;
                }
                Accumulator::Min(field) => {
                    if let Some(v) = record.get(field).and_then(|s| s.parse::<f64>().ok()) {
                        let slot = acc.mins.entry(out_field.clone()).or_insert(None);
                        *slot = Some(slot.map_or(v, |cur| cur.min(v)));
                    } else {
                        acc.mins.entry(out_field.clone()).or_insert(None);
                    }
                }
                Accumulator::Max(field) => {
                    if let Some(v) = record.get(field).and_then(|s| s.parse::<f64>().ok()) {
                        let slot = acc.maxs.entry(out_field.clone()).or_insert(None);
                        *slot = Some(slot.map_or(v, |cur| cur.max(v)));
                    } else {
                        acc.maxs.entry(out_field.clone()).or_insert(None);
                    }
                }
                Accumulator::Avg(field) => {
                    let v = record.get(field).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
                    acc.avgs.entry(out_field.clone()).or_default().push(v);
                }
            }
        }
    }

    order
        .into_iter()
        .map(|key| {
            let acc = groups.remove(&key).unwrap();
            let mut out = Record::new();
            out.set("_id", key.unwrap_or_default());
            for (out_field, accumulator) in &group.outputs {
                match accumulator {
                    Accumulator::Sum(_) => {
                        let total: f64 = acc.sums.get(out_field).map(|v| v.iter().sum()).unwrap_or(0.0);
                        out.set(out_field.clone(), format_number(total));
                    }
                    Accumulator::Count => {
                        let count = acc.counts.get(out_field).copied().unwrap_or(0);
                        out.set(out_field.clone(), count.to_string());
                    }
                    Accumulator::Min(_) => {
                        if let Some(Some(v)) = acc.mins.get(out_field) {
                            out.set(out_field.clone(), format_number(*v));
                        }
                    }
                    Accumulator::Max(_) => {
                        if let Some(Some(v)) = acc.maxs.get(out_field) {
                            out.set(out_field.clone(), format_number(*v));
                        }
                    }
                    Accumulator::Avg(_) => {
                        let values = acc.avgs.get(out_field).cloned().unwrap_or_default();
                        let avg = if values.is_empty() {
                            0.0
                        } else {
                            values.iter().sum::<f64>() / values.len() as f64
                        };
                        out.set(out_field.clone(), format_number(avg));
                    }
                }
            }
            out
        })
        .collect()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(dept: &str, salary: &str) -> Record {
        let mut r = Record::new();
        r.set("dept", dept);
        r.set("salary", salary);
        r
    }

    #[test]
    fn groups_and_computes_sum_count_avg() {
        let records = vec![
            rec("A", "100"),
            rec("A", "200"),
            rec("B", "300"),
            rec("B", "400"),
        ];
        let stage = Stage::Group(GroupStage {
            group_field: "dept".to_string(),
            outputs: vec![
                ("total".to_string(), Accumulator::Sum("salary".to_string())),
                ("n".to_string(), Accumulator::Count),
                ("avg".to_string(), Accumulator::Avg("salary".to_string())),
            ],
        });
        let out = aggregate(&records, &[stage]);
        assert_eq!(out.len(), 2);
        let a = out.iter().find(|r| r.get_or_empty("_id") == "A").unwrap();
        assert_eq!(a.get_or_empty("total"), "300");
        assert_eq!(a.get_or_empty("n"), "2");
        assert_eq!(a.get_or_empty("avg"), "150");
        let b = out.iter().find(|r| r.get_or_empty("_id") == "B").unwrap();
        assert_eq!(b.get_or_empty("total"), "700");
        assert_eq!(b.get_or_empty("avg"), "350");
    }

    #[test]
    fn min_and_max() {
        let records = vec![rec("A", "5"), rec("A", "15"), rec("A", "25")];
        let stage = Stage::Group(GroupStage {
            group_field: "dept".to_string(),
            outputs: vec![
                ("lo".to_string(), Accumulator::Min("salary".to_string())),
                ("hi".to_string(), Accumulator::Max("salary".to_string())),
            ],
        });
        let out = aggregate(&records, &[stage]);
        assert_eq!(out[0].get_or_empty("lo"), "5");
        assert_eq!(out[0].get_or_empty("hi"), "25");
    }

    #[test]
    fn missing_group_field_is_a_legitimate_group() {
        let records = vec![rec("A", "5"), Record::new()];
        let stage = Stage::Group(GroupStage {
            group_field: "dept".to_string(),
            outputs: vec![("n".to_string(), Accumulator::Count)],
        });
        let out = aggregate(&records, &[stage]);
        assert_eq!(out.len(), 2);
    }
}
