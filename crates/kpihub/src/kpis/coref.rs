use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use serde_json::Value;

use super::{task_id, task_str};
use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::pipeline::KpiScheme;
use crate::remote::TaskBatch;

lazy_static! {
    /// Document number on the line after the header.
    static ref DOC_NUMBER: Regex =
        Regex::new(r"#begin document [(].+[)];\n([0-9]+)").expect("valid regex");
    /// The header line itself, rewritten during normalization.
    static ref DOC_HEADER: Regex =
        Regex::new(r"#begin document [(].+[)];").expect("valid regex");
}

/// Coreference resolution over CoNLL-formatted documents.
///
/// Tasks carry a whole CoNLL block per question. The header is normalized
/// to the `#begin document(<n>); part 0` form the agent expects, and the
/// answer is the coreference column extracted from the predicted block.
pub struct CorefScheme;

impl KpiScheme for CorefScheme {
    fn name(&self) -> &'static str {
        "coref"
    }

    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error> {
        tasks
            .qas()?
            .iter()
            .map(|task| {
                Ok(Observation::new(
                    task_id(task)?,
                    normalize_conll(task_str(task, "question")?)?,
                ))
            })
            .collect()
    }

    fn single_observation(
        &self,
        text1: &str,
        _text2: Option<&str>,
    ) -> Result<Observation, Error> {
        Ok(Observation::new("dummy", normalize_conll(text1)?))
    }

    fn answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        let lines = prediction
            .get("valid_conll")
            .and_then(|conll| conll.get(0))
            .and_then(Value::as_array)
            .ok_or_else(|| Error::inference("prediction is missing `valid_conll`"))?;
        let block = lines
            .iter()
            .map(|line| line.as_str().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Value::String(extract_markup(&block)))
    }
}

/// Rewrites the document header and guarantees a blank line before the
/// end marker.
fn normalize_conll(conll: &str) -> Result<String, Error> {
    let doc_number = DOC_NUMBER
        .captures(conll)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| Error::MalformedReply {
            context: "benchmark task fetch",
            detail: "conll block is missing a document header".into(),
        })?
        .as_str();

    let header = format!("#begin document({doc_number}); part 0");
    let rewritten = DOC_HEADER.replace_all(conll, NoExpand(&header));

    if rewritten.contains("\n\n#end document") {
        Ok(rewritten.into_owned())
    } else {
        Ok(rewritten.replace("\n#end document", "\n\n#end document"))
    }
}

/// Collects the coreference column: one token per row, markers and blank
/// rows contributing a bare space.
fn extract_markup(conll: &str) -> String {
    let mut markup = String::new();
    for line in conll.split('\n') {
        if line.starts_with("#begin") || line.starts_with("#end document") {
            markup.push(' ');
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() == 1 {
            markup.push(' ');
        } else {
            markup.push_str(fields[fields.len() - 1]);
            markup.push(' ');
        }
    }
    markup
}
