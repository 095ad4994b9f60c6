use std::{
    collections::HashMap,
    fs::File,
    io::Write,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use hdx_config::{Configuration, ConfigurationOptions};
use hdx_remote::{
    error::{RemoteError, Result},
    FileUpload, RemoteCkan,
};
use serde_json::{json, Map, Value};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::context::Hdx;

type Handler = Box<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub action: String,
    pub data: Value,
    pub files: Vec<FileUpload>,
}

/// `RemoteCkan` that answers from scripted handlers and records every call.
#[derive(Default)]
pub struct MockCkan {
    handlers: Mutex<HashMap<String, Handler>>,
    texts: Mutex<HashMap<String, String>>,
    redirects: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCkan {
    pub fn on<F>(&self, action: &str, handler: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action.to_string(), Box::new(handler));
    }

    pub fn on_result(&self, action: &str, result: Value) {
        self.on(action, move |_| Ok(result.clone()));
    }

    pub fn on_not_found(&self, action: &str) {
        let action_name = action.to_string();
        self.on(action, move |_| {
            Err(RemoteError::NotFound {
                action: action_name.clone(),
                message: "Not found".into(),
            })
        });
    }

    pub fn on_failure(&self, action: &str, message: &str) {
        let action_name = action.to_string();
        let message = message.to_string();
        self.on(action, move |_| {
            Err(RemoteError::Ckan {
                action: action_name.clone(),
                kind: "Error".into(),
                message: message.clone(),
            })
        });
    }

    pub fn on_text(&self, url: &str, text: &str) {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), text.to_string());
    }

    pub fn on_redirect(&self, url: &str, location: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), location.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_for(&self, action: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.action == action)
            .collect()
    }
}

impl RemoteCkan for MockCkan {
    fn call_action(&self, action: &str, data: &Value, files: &[FileUpload]) -> Result<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                action: action.to_string(),
                data: data.clone(),
                files: files.to_vec(),
            });
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        match handlers.get(action) {
            Some(handler) => handler(data),
            None => {
                Err(RemoteError::Ckan {
                    action: action.to_string(),
                    kind: "Unscripted".into(),
                    message: "no mock response".into(),
                })
            }
        }
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| {
                RemoteError::HttpError {
                    status: 404,
                    url: url.to_string(),
                }
            })
    }

    fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let text = self.fetch_text(url)?;
        std::fs::write(path, &text).map_err(|source| {
            RemoteError::Io {
                action: format!("writing {}", path.display()),
                source,
            }
        })?;
        Ok(text.len() as u64)
    }

    fn redirect_location(&self, url: &str) -> Result<Option<String>> {
        Ok(self
            .redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned())
    }
}

pub fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn test_configuration(extra: Value) -> Configuration {
    let mut hdx_config = map(json!({"hdx_site": "prod", "hdx_key": "12345"}));
    hdx_config.extend(map(extra));
    Configuration::new(ConfigurationOptions {
        user_agent: Some("test".into()),
        hdx_config_dict: Some(hdx_config),
        ..Default::default()
    })
    .expect("test configuration")
}

/// A handle on the production site backed by a fresh [`MockCkan`].
pub fn mock_hdx() -> (Hdx, Arc<MockCkan>) {
    mock_hdx_with(json!({}))
}

pub fn mock_hdx_with(extra_config: Value) -> (Hdx, Arc<MockCkan>) {
    let mock = Arc::new(MockCkan::default());
    let hdx = Hdx::new(Arc::new(test_configuration(extra_config)), mock.clone());
    (hdx, mock)
}

fn column_name(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Writes a one sheet xlsx workbook of inline strings. `compressed` changes
/// the bytes of the file but not its cells.
pub fn write_xlsx<const N: usize>(path: &Path, rows: &[[&str; N]], compressed: bool) {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
        for (column, value) in row.iter().enumerate() {
            sheet.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{value}</t></is></c>"#,
                column_name(column),
                row_index + 1
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let method = if compressed {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    let options = SimpleFileOptions::default().compression_method(method);
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}
