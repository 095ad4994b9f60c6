//! Collecting pipeline errors and warnings, and writing flagged errors back to
//! the HDX resources they concern.

use std::{
    collections::{BTreeMap, BTreeSet},
    env,
    fmt::Display,
};

use tracing::{error, info, warn};

use crate::{
    context::Hdx,
    dataset::{Dataset, ResourceSelector},
    error::HdxError,
    HdxResult,
};

/// Read when no explicit choice is made. Unset means errors are written.
pub const ERR_TO_HDX_ENV: &str = "ERR_TO_HDX";
const FALSE_VALUES: [&str; 7] = ["false", "False", "FALSE", "N", "n", "0", ""];
const MAX_LISTED_VALUES: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageType {
    #[default]
    Error,
    Warning,
}

/// The pipeline, dataset and resource a message is about.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorSource {
    pub pipeline: String,
    pub identifier: String,
    pub resource_name: String,
}

impl ErrorSource {
    pub fn new(pipeline: &str, identifier: &str, resource_name: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            identifier: identifier.to_string(),
            resource_name: resource_name.to_string(),
        }
    }

    /// `pipeline - identifier`, the heading messages are logged under.
    pub fn category(&self) -> String {
        format!("{} - {}", self.pipeline, self.identifier)
    }
}

pub fn missing_value_message(value_type: &str, value: impl Display) -> String {
    format!("{value_type} {value} not found")
}

/// `n text: v1, v2, ...`, listing at most the first 10 values. None for no
/// values.
pub fn multi_valued_message<T: Display>(text: &str, values: &[T]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let suffix = if values.len() > MAX_LISTED_VALUES {
        ". First 10 values"
    } else {
        ""
    };
    let listed: Vec<String> = values
        .iter()
        .take(MAX_LISTED_VALUES)
        .map(ToString::to_string)
        .collect();
    Some(format!("{} {text}{suffix}: {}", values.len(), listed.join(", ")))
}

fn is_true(value: &str) -> bool {
    !FALSE_VALUES.contains(&value)
}

#[derive(Debug, Default)]
pub struct HdxErrorHandler {
    write_to_hdx: bool,
    messages: BTreeMap<MessageType, BTreeMap<String, BTreeSet<String>>>,
    hdx_errors: BTreeMap<ErrorSource, BTreeSet<String>>,
}

impl HdxErrorHandler {
    /// `write_to_hdx` is parsed like the `ERR_TO_HDX` variable, which is used
    /// when it is None.
    pub fn new(write_to_hdx: Option<&str>) -> Self {
        let write_to_hdx = match write_to_hdx {
            Some(value) => is_true(value),
            None => env::var(ERR_TO_HDX_ENV).map_or(true, |value| is_true(&value)),
        };
        if write_to_hdx {
            info!("Errors will be written to HDX");
        } else {
            info!("Errors won't be written to HDX");
        }
        Self {
            write_to_hdx,
            ..Default::default()
        }
    }

    pub fn write_to_hdx(&self) -> bool {
        self.write_to_hdx
    }

    pub fn messages(&self, message_type: MessageType) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        self.messages.get(&message_type)
    }

    pub fn hdx_errors(&self) -> &BTreeMap<ErrorSource, BTreeSet<String>> {
        &self.hdx_errors
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .get(&MessageType::Error)
            .is_some_and(|categories| !categories.is_empty())
    }

    /// Queues `text` for the resource named in `source` when `err_to_hdx` is set.
    pub fn errors_to_hdx(&mut self, source: &ErrorSource, text: &str, err_to_hdx: bool) {
        if err_to_hdx {
            self.hdx_errors
                .entry(source.clone())
                .or_default()
                .insert(text.to_string());
        }
    }

    pub fn add_message(&mut self, source: &ErrorSource, text: &str, message_type: MessageType, err_to_hdx: bool) {
        self.messages
            .entry(message_type)
            .or_default()
            .entry(source.category())
            .or_default()
            .insert(text.to_string());
        self.errors_to_hdx(source, text, err_to_hdx);
    }

    pub fn add_missing_value_message(
        &mut self,
        source: &ErrorSource,
        value_type: &str,
        value: impl Display,
        message_type: MessageType,
        err_to_hdx: bool,
    ) {
        let text = missing_value_message(value_type, value);
        self.add_message(source, &text, message_type, err_to_hdx);
    }

    /// Returns whether a message was added.
    pub fn add_multi_valued_message<T: Display>(
        &mut self,
        source: &ErrorSource,
        text: &str,
        values: &[T],
        message_type: MessageType,
        err_to_hdx: bool,
    ) -> bool {
        let Some(text) = multi_valued_message(text, values) else {
            return false;
        };
        self.add_message(source, &text, message_type, err_to_hdx);
        true
    }

    /// Logs every message under its category, sorted.
    pub fn log(&self) {
        for (message_type, categories) in &self.messages {
            for (category, texts) in categories {
                for text in texts {
                    match message_type {
                        MessageType::Error => error!("{category} - {text}"),
                        MessageType::Warning => warn!("{category} - {text}"),
                    }
                }
            }
        }
    }

    /// Writes each resource's queued errors to HDX. Returns how many
    /// resources changed.
    pub fn write_errors_to_hdx(&self, hdx: &Hdx) -> usize {
        info!("Writing errors to HDX");
        self.hdx_errors
            .iter()
            .filter(|(source, errors)| write_errors_to_resource(hdx, source, errors))
            .count()
    }

    /// Logs the messages, then writes the queued errors when enabled.
    pub fn output_errors(&self, hdx: &Hdx) {
        self.log();
        if self.write_to_hdx {
            self.write_errors_to_hdx(hdx);
        }
    }
}

fn add_errors(hdx: &Hdx, source: &ErrorSource, error_text: &str) -> HdxResult<bool> {
    let mut dataset = Dataset::read_from_hdx(hdx, &source.identifier)?
        .ok_or_else(|| HdxError::invalid(format!("Dataset {} not found!", source.identifier)))?;
    dataset.add_hapi_error(error_text, ResourceSelector::IdOrName(&source.resource_name))
}

/// Sets the resource's error to the sorted errors joined by `, `. Returns
/// whether it changed. Failures are logged rather than returned.
pub fn write_errors_to_resource(hdx: &Hdx, source: &ErrorSource, errors: &BTreeSet<String>) -> bool {
    let error_text = errors.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    match add_errors(hdx, source, &error_text) {
        Ok(true) => {
            info!("Wrote error message to {}", source.identifier);
            true
        }
        Ok(false) => false,
        Err(err) => {
            error!("Could not write error to {}: {err}", source.identifier);
            false
        }
    }
}
