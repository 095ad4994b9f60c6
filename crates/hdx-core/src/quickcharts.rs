//! QuickCharts resource views built from HXL preview templates.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use hdx_config::loader::load_yaml_str;
use hdx_utils::dict::merge_two_dictionaries;
use serde_json::Value;

use crate::{
    error::HdxError,
    object::HdxObject,
    resource_view::ResourceView,
    HdxResult,
};

const INDICATOR_TEMPLATE: &str = include_str!("indicator_resource_view_template.yaml");
const INDICATOR_TEMPLATE_NAME: &str = "indicator_resource_view_template.yaml";
/// Looked up relative to the working directory when no path or indicators
/// are given.
pub const STATIC_TEMPLATE_PATH: &str = "config/hdx_resource_view_static.yml";
const BITES: usize = 3;

/// An indicator shown in one QuickCharts bite. Unset columns fall back to the
/// HXL hashtags of the standard indicator layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuickChartIndicator {
    pub code: String,
    pub title: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub code_col: Option<String>,
    pub value_col: Option<String>,
    pub date_col: Option<String>,
    pub aggregate_col: Option<String>,
}

/// Parameters for [`crate::Dataset::generate_resource_view`].
#[derive(Clone, Debug, Default)]
pub struct QuickChartOptions {
    /// YAML resource view to start from. Defaults to
    /// [`STATIC_TEMPLATE_PATH`], or the built in indicator template when
    /// `indicators` is set.
    pub path: Option<PathBuf>,
    /// Bites to drop, in order.
    pub bites_disabled: Option<[bool; BITES]>,
    pub indicators: Option<Vec<Option<QuickChartIndicator>>>,
    /// Replacements applied to the final preview configuration.
    pub findreplace: BTreeMap<String, String>,
}

/// `value` escaped for use inside a JSON string.
fn json_text(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().filter(|value| !value.is_empty()).unwrap_or(default)
}

impl QuickChartIndicator {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Fills the placeholders of bite `number`, counting from 1.
    fn fill(&self, config: &str, number: usize) -> String {
        let aggregate = match self.aggregate_col.as_deref().filter(|col| !col.is_empty()) {
            Some(col) => format!("\"{}\"", json_text(col)),
            None => "null".to_string(),
        };
        let replacements = [
            (format!("CODE_VALUE_{number}"), json_text(&self.code)),
            (
                format!("DESCRIPTION_VALUE_{number}"),
                json_text(self.description.as_deref().unwrap_or_default()),
            ),
            (format!("TITLE_VALUE_{number}"), json_text(&self.title)),
            (
                format!("UNIT_VALUE_{number}"),
                json_text(self.unit.as_deref().unwrap_or_default()),
            ),
            (
                format!("CODE_COL_{number}"),
                json_text(or_default(&self.code_col, "#indicator+code")),
            ),
            (
                format!("VALUE_COL_{number}"),
                json_text(or_default(&self.value_col, "#indicator+value+num")),
            ),
            (
                format!("DATE_COL_{number}"),
                json_text(or_default(&self.date_col, "#date+year")),
            ),
            (format!("\"AGGREGATE_COL_{number}\""), aggregate),
        ];
        replacements
            .iter()
            .fold(config.to_string(), |config, (find, replace)| config.replace(find, replace))
    }
}

/// Merges the view template into `view`.
pub(crate) fn load_template(view: &mut ResourceView, path: Option<&Path>, use_indicators: bool) -> HdxResult<()> {
    match path {
        Some(path) => view.update_from_yaml(path),
        None if use_indicators => {
            let template = load_yaml_str(INDICATOR_TEMPLATE, Path::new(INDICATOR_TEMPLATE_NAME))?;
            merge_two_dictionaries(view.data_mut(), template)?;
            Ok(())
        }
        None => view.update_from_yaml(STATIC_TEMPLATE_PATH),
    }
}

/// Builds the `hxl_preview_config` of a QuickCharts view from its template.
///
/// Each given indicator fills the placeholders of its bite. Bites that are
/// disabled, or whose indicator is missing, are dropped and the result is
/// written as compact JSON before `findreplace` is applied. Returns `None`
/// when there is nothing left to chart.
pub fn hxl_preview_config(
    template: &str,
    bites_disabled: [bool; BITES],
    indicators: Option<&[Option<QuickChartIndicator>]>,
    findreplace: &BTreeMap<String, String>,
) -> HdxResult<Option<String>> {
    if bites_disabled == [true; BITES] {
        return Ok(None);
    }
    let mut config = template.to_string();
    let mut missing = [false; BITES];
    if let Some(indicators) = indicators {
        if indicators.is_empty() {
            return Ok(None);
        }
        missing = [true; BITES];
        for (index, indicator) in indicators.iter().take(BITES).enumerate() {
            if let Some(indicator) = indicator {
                config = indicator.fill(&config, index + 1);
                missing[index] = false;
            }
        }
        if missing == [true; BITES] {
            return Ok(None);
        }
    }

    let mut parsed: Value = serde_json::from_str(&config)?;
    let Some(Value::Array(bites)) = parsed.get_mut("bites") else {
        return Err(HdxError::invalid("QuickCharts configuration has no bites!"));
    };
    for index in (0..BITES).rev() {
        if (bites_disabled[index] || missing[index]) && index < bites.len() {
            bites.remove(index);
        }
    }
    let mut config = serde_json::to_string(&parsed)?;
    for (find, replace) in findreplace {
        config = config.replace(find, replace);
    }
    Ok(Some(config))
}
