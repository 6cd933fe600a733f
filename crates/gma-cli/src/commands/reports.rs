use super::session::{Credentials, connect};
use anyhow::{Context, Result};
use gma_core::role::Role;
use gma_interaction::{GmaClient, Report, SaveOutcome};
use std::path::Path;

pub async fn assignments(config_path: Option<&Path>, credentials: &Credentials, role: Role) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let assignments = client.get_assignments(role).await?;

    if assignments.is_empty() {
        println!("No {role} assignments");
    }
    for assignment in assignments.list() {
        println!("{:>8}  {}", assignment.node_id(), assignment.short_name());
    }
    Ok(())
}

pub async fn reports(
    config_path: Option<&Path>,
    credentials: &Credentials,
    node: &str,
    role: Role,
) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let reports = client.get_reports_for_node(node, role).await?;

    if reports.is_empty() {
        println!("No {role} reports for node {node}");
    }
    for report in &reports {
        println!("{:>8}  {}", report.id(), report.period());
    }
    Ok(())
}

/// The report covering `date`, or the latest one.
async fn find_report(client: &GmaClient, node: &str, role: Role, date: Option<&str>) -> Result<Report> {
    match date {
        Some(date) => client
            .report_for_date(node, role, date)
            .await?
            .with_context(|| format!("No {role} report of node {node} covers {date}")),
        None => client
            .get_reports_for_node(node, role)
            .await?
            .into_iter()
            .next()
            .with_context(|| format!("No {role} reports for node {node}")),
    }
}

pub async fn measurements(
    config_path: Option<&Path>,
    credentials: &Credentials,
    node: &str,
    role: Role,
    date: Option<&str>,
) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let report = find_report(&client, node, role, date).await?;
    let groups = report.measurements().await?;

    println!("Report {} ({})", report.id(), report.period());
    for group in groups {
        println!("{}", group.strategy);
        for measurement in group.measurements {
            println!(
                "  {:>8}  {:<40} {}",
                measurement.id(),
                measurement.label(),
                measurement.value()
            );
        }
    }
    Ok(())
}

pub async fn set_value(
    config_path: Option<&Path>,
    credentials: &Credentials,
    node: &str,
    role: Role,
    date: Option<&str>,
    measurement_id: &str,
    value: f64,
) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let report = find_report(&client, node, role, date).await?;
    report.measurements().await?;

    let measurement = report
        .measurement(measurement_id)
        .with_context(|| format!("Measurement {measurement_id} is not part of report {}", report.id()))?;
    let previous = measurement.value();
    measurement.set_value(value);

    match report.save().await? {
        SaveOutcome::Saved => println!("{}: {previous} -> {value}", measurement.label()),
        SaveOutcome::Unchanged | SaveOutcome::Cancelled => {
            println!("{} is already {value}, nothing saved", measurement.label())
        }
    }
    Ok(())
}
