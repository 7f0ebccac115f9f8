use std::io::Write;

use crate::domain::rail_system_model::export::load_summary::{ResourceUtilization, TimelineSlot};
use crate::domain::rail_system_model::scenario::scenario_result::ScenarioResult;
use crate::domain::rail_system_model::utils::time::format_minutes;
use crate::error::Result;

pub const RESOURCE_HEADERS: [&str; 3] = ["Resource", "Utilization (%)", "Status"];
pub const SCENARIO_HEADERS: [&str; 6] = ["Scenario Name", "Timestamp", "Total Delay (min)", "Throughput (/h)", "Utilization (%)", "Conflicts"];
pub const TIMELINE_HEADERS: [&str; 5] = ["Start", "End", "Conflicts", "Utilization (%)", "Status"];

/// Floats are written with one decimal so equal state always yields equal bytes.
fn fixed(value: f64) -> String {
    format!("{:.1}", value)
}

/// Writes `Resource,Utilization (%),Status` rows, sorted by resource id.
pub fn write_resource_utilization<W: Write>(writer: W, rows: &[ResourceUtilization]) -> Result<()> {
    let mut sorted: Vec<&ResourceUtilization> = rows.iter().collect();
    sorted.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

    let mut csv_wtr = csv::Writer::from_writer(writer);
    csv_wtr.write_record(RESOURCE_HEADERS)?;

    for row in sorted {
        csv_wtr.write_record([row.resource_id.to_string(), fixed(row.utilization_percent), row.status.to_string()])?;
    }

    csv_wtr.flush()?;
    Ok(())
}

/// Writes one row per saved scenario result, sorted by name and then timestamp.
pub fn write_scenario_results<W: Write>(writer: W, results: &[ScenarioResult]) -> Result<()> {
    let mut sorted: Vec<&ScenarioResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.timestamp.cmp(&b.timestamp)));

    let mut csv_wtr = csv::Writer::from_writer(writer);
    csv_wtr.write_record(SCENARIO_HEADERS)?;

    for result in sorted {
        let metrics = &result.metrics;
        csv_wtr.write_record([
            result.name.clone(),
            result.timestamp.clone(),
            metrics.total_delay_minutes.to_string(),
            fixed(metrics.throughput_per_hour),
            fixed(metrics.mean_utilization_percent()),
            metrics.conflict_count.to_string(),
        ])?;
    }

    csv_wtr.flush()?;
    Ok(())
}

/// Writes the timeline load summary in slot order.
pub fn write_timeline<W: Write>(writer: W, slots: &[TimelineSlot]) -> Result<()> {
    let mut csv_wtr = csv::Writer::from_writer(writer);
    csv_wtr.write_record(TIMELINE_HEADERS)?;

    for slot in slots {
        csv_wtr.write_record([
            format_minutes(slot.interval.start),
            format_minutes(slot.interval.end),
            slot.conflicts.to_string(),
            fixed(slot.utilization_percent),
            slot.status.to_string(),
        ])?;
    }

    csv_wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rail_system_model::export::load_summary::ResourceLoadStatus;
    use crate::domain::rail_system_model::scenario::scenario_metrics::ScenarioMetrics;
    use crate::domain::rail_system_model::utils::id::ResourceId;
    use std::collections::BTreeMap;

    #[test]
    fn test_resource_rows_are_sorted_with_fixed_precision() {
        let rows = vec![
            ResourceUtilization { resource_id: ResourceId::new("P2"), utilization_percent: 62.5, status: ResourceLoadStatus::Medium },
            ResourceUtilization { resource_id: ResourceId::new("P1"), utilization_percent: 100.0 / 3.0, status: ResourceLoadStatus::Low },
        ];

        let mut out = Vec::new();
        write_resource_utilization(&mut out, &rows).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Resource,Utilization (%),Status\nP1,33.3,low\nP2,62.5,medium\n");
    }

    #[test]
    fn test_scenario_rows() {
        let metrics = ScenarioMetrics {
            total_delay_minutes: 12,
            throughput_per_hour: 0.5,
            utilization_percent: BTreeMap::from([(ResourceId::new("P1"), 50.0), (ResourceId::new("P2"), 25.0)]),
            conflict_count: 0,
        };
        let result = ScenarioResult::new("Delay T1", "2024-03-01T14:00:00Z".to_string(), metrics);

        let mut out = Vec::new();
        write_scenario_results(&mut out, &[result]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Scenario Name,Timestamp,Total Delay (min),Throughput (/h),Utilization (%),Conflicts\nDelay T1,2024-03-01T14:00:00Z,12,0.5,37.5,0\n"
        );
    }
}
