use hdx_core::{
    dataset::{Dataset, SearchOptions},
    error::HdxError,
    Hdx, HdxObject, HdxResult,
};
use nu_ansi_term::Color::{Cyan, Green};
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{Panel, Style},
};
use tracing::{debug, info};

use crate::utils::{cell, join_names, Colored};

fn dataset_json(dataset: &Dataset) -> Value {
    let mut data = dataset.data().clone();
    let resources: Vec<Value> = dataset
        .get_resources()
        .iter()
        .map(|resource| Value::Object(resource.data().clone()))
        .collect();
    data.insert("resources".into(), Value::Array(resources));
    Value::Object(data)
}

fn summary_rows(dataset: &Dataset) -> Vec<[String; 2]> {
    let frequency = dataset.get_expected_update_frequency().unwrap_or_default();
    vec![
        ["Name".into(), cell(dataset.get("name"))],
        ["Title".into(), cell(dataset.get("title"))],
        [
            "Organization".into(),
            dataset
                .get("organization")
                .and_then(|organization| organization.get("title"))
                .map(|title| cell(Some(title)))
                .unwrap_or_else(|| cell(dataset.get("owner_org"))),
        ],
        ["Time period".into(), cell(dataset.get("dataset_date"))],
        ["Update frequency".into(), frequency],
        ["Locations".into(), dataset.get_location_iso3s().join(", ")],
        ["Tags".into(), join_names(dataset.get("tags"), "name")],
        ["Url".into(), dataset.get_hdx_url().unwrap_or_default()],
    ]
}

pub fn show_dataset(hdx: &Hdx, identifier: &str, json: bool) -> HdxResult<()> {
    debug!("reading dataset {identifier}");
    let dataset = Dataset::read_from_hdx(hdx, identifier)?
        .ok_or_else(|| HdxError::invalid(format!("Dataset {identifier} not found!")))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dataset_json(&dataset))?);
        return Ok(());
    }

    let mut builder = Builder::new();
    for row in summary_rows(&dataset) {
        builder.push_record(row);
    }
    let table = builder
        .build()
        .with(Panel::header("Dataset"))
        .with(Style::rounded())
        .to_string();
    println!("{table}");

    if dataset.number_of_resources() == 0 {
        info!("No resources");
        return Ok(());
    }
    let mut builder = Builder::new();
    builder.push_record(["#", "Name", "Format", "Url"]);
    for (index, resource) in dataset.get_resources().iter().enumerate() {
        builder.push_record([
            index.to_string(),
            cell(resource.get("name")),
            resource.get_format().unwrap_or_default(),
            cell(resource.get("url")),
        ]);
    }
    let table = builder
        .build()
        .with(Panel::header("Resources"))
        .with(Style::rounded())
        .to_string();
    println!("{table}");
    Ok(())
}

pub fn search_datasets(
    hdx: &Hdx,
    query: &str,
    fq: Option<String>,
    rows: Option<usize>,
    sort: Option<String>,
    json: bool,
) -> HdxResult<()> {
    let options = SearchOptions {
        rows,
        fq,
        sort,
        ..Default::default()
    };
    let datasets = Dataset::search_in_hdx(hdx, query, &options)?;

    if json {
        let datasets: Vec<Value> = datasets.iter().map(dataset_json).collect();
        println!("{}", serde_json::to_string_pretty(&json!(datasets))?);
        return Ok(());
    }

    if datasets.is_empty() {
        info!("No datasets found for {query}");
        return Ok(());
    }
    let mut builder = Builder::new();
    builder.push_record(["Name", "Title", "Time period", "Resources"]);
    for dataset in &datasets {
        builder.push_record([
            cell(dataset.get("name")),
            cell(dataset.get("title")),
            cell(dataset.get("dataset_date")),
            dataset.number_of_resources().to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    info!(
        "{} datasets matched {}",
        Colored(Green, datasets.len()),
        Colored(Cyan, query)
    );
    Ok(())
}
