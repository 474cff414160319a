use ::lyrx_style::model::StyleItemRecord;
use ::lyrx_style::{classify_text, normalize, ExtractConfig, LayerBlob, StylePipeline};
use pyo3::prelude::*;

#[pymodule]
fn lyrx_style(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyStyleRun>()?;
    m.add_class::<PyStyleItem>()?;
    m.add_function(wrap_pyfunction!(classify_renderer, m)?)?;
    m.add_function(wrap_pyfunction!(normalize_fragment, m)?)?;
    Ok(())
}

#[pyclass(name = "StyleItem")]
#[derive(Clone)]
pub struct PyStyleItem {
    #[pyo3(get)]
    pub id: u64,
    #[pyo3(get)]
    pub class_code: u32,
    #[pyo3(get)]
    pub category: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub tags: String,
    #[pyo3(get)]
    pub content: String,
    #[pyo3(get)]
    pub key: String,
}

impl From<StyleItemRecord> for PyStyleItem {
    fn from(record: StyleItemRecord) -> Self {
        PyStyleItem {
            id: record.id,
            class_code: record.class_code,
            category: record.category,
            name: record.name,
            tags: record.tags,
            content: record.content,
            key: record.key,
        }
    }
}

#[pymethods]
impl PyStyleItem {
    fn __repr__(&self) -> String {
        format!(
            "StyleItem(id={}, class_code={}, name='{}', tags='{}')",
            self.id, self.class_code, self.name, self.tags
        )
    }
}

/// 1 回の実行。採番と重複除去はこのオブジェクトの中で共有される
#[pyclass(name = "StyleRun")]
pub struct PyStyleRun {
    pipeline: StylePipeline,
}

#[pymethods]
impl PyStyleRun {
    #[new]
    #[pyo3(signature = (map_names, catch_all_labels=None))]
    fn new(map_names: Vec<String>, catch_all_labels: Option<Vec<String>>) -> Self {
        let mut config = ExtractConfig::new(map_names);
        if let Some(labels) = catch_all_labels {
            config.catch_all_labels = labels;
        }
        PyStyleRun {
            pipeline: StylePipeline::new(config),
        }
    }

    fn process(&mut self, text: &str, file_name: &str) -> PyResult<Vec<PyStyleItem>> {
        let blob = LayerBlob::new(file_name, text);
        let records = self.pipeline.process(&blob).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "Skipped {}: {}",
                file_name, e
            ))
        })?;
        Ok(records.into_iter().map(PyStyleItem::from).collect())
    }

    /// (emitted, duplicates, skipped)
    fn summary(&self) -> (u64, u64, u64) {
        let summary = self.pipeline.summary();
        (summary.emitted, summary.duplicates, summary.skipped)
    }

    fn __repr__(&self) -> String {
        let summary = self.pipeline.summary();
        format!(
            "StyleRun(map_names={:?}, emitted={}, skipped={})",
            self.pipeline.config().map_names,
            summary.emitted,
            summary.skipped
        )
    }
}

#[pyfunction]
pub fn classify_renderer(text: &str) -> PyResult<String> {
    let classification = classify_text(text).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "Failed to classify renderer: {}",
            e
        ))
    })?;
    Ok(match classification.unsupported {
        Some(kind) => format!("unsupported ({})", kind),
        None => classification.kind.to_string(),
    })
}

#[pyfunction]
pub fn normalize_fragment(text: &str) -> String {
    normalize(text)
}
