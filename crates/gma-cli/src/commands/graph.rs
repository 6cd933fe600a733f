use super::session::{Credentials, connect};
use anyhow::Result;
use gma_application::{GraphOptions, GraphService};
use gma_core::report::GraphResult;
use std::path::Path;

pub struct GraphArgs {
    pub node: String,
    pub strategies: Vec<String>,
    pub measurements: Vec<String>,
    pub language: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub json: bool,
}

impl GraphArgs {
    fn options(&self) -> GraphOptions {
        let mut options = GraphOptions::new(self.node.as_str());
        for strategy in &self.strategies {
            options = options.with_strategy(strategy.as_str());
        }
        for measurement in &self.measurements {
            options = options.with_measurement(measurement.as_str());
        }
        if let Some(language) = &self.language {
            options = options.with_language(language.as_str());
        }
        if let Some(start) = &self.start {
            options = options.with_start_date(start.as_str());
        }
        if let Some(end) = &self.end {
            options = options.with_end_date(end.as_str());
        }
        options
    }
}

pub async fn run(config_path: Option<&Path>, credentials: &Credentials, args: GraphArgs) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let service = GraphService::for_client(client);
    let result = service.get_graph_data(&args.options()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_table(&result);
    }
    Ok(())
}

fn print_table(result: &GraphResult) {
    println!("{}", result.title);
    if !result.info.is_empty() {
        println!("{}", result.info);
    }
    println!();

    let label_width = result
        .measurements
        .iter()
        .map(|m| m.name.chars().count())
        .chain(result.strategies.iter().map(|s| s.name.chars().count()))
        .max()
        .unwrap_or(0)
        .max(12)
        + 2;

    print!("{:label_width$}", "");
    for period in &result.periods {
        print!("  {period:>10}");
    }
    println!();

    for strategy in &result.strategies {
        println!("{}", strategy.name);
        for series in result
            .measurements
            .iter()
            .filter(|m| m.strategy_id.as_deref() == Some(strategy.id.as_str()))
        {
            print!("{:label_width$}", format!("  {}", series.name));
            for value in &series.values {
                print!("  {:>10}", value.to_string());
            }
            println!();
        }
    }

    let orphans: Vec<_> = result
        .measurements
        .iter()
        .filter(|m| m.strategy_id.is_none())
        .collect();
    for series in orphans {
        print!("{:label_width$}", series.name);
        for value in &series.values {
            print!("  {:>10}", value.to_string());
        }
        println!();
    }
}
