use serde::Serialize;
use serde_json::Value;

use crate::error::ClimateError;
use crate::sources::YearColumns;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErfTables {
    pub central: YearColumns,
    pub pc05: YearColumns,
    pub pc95: YearColumns,
}

pub fn erf_tables(central: &Table, pc05: &Table, pc95: &Table) -> Result<ErfTables, ClimateError> {
    Ok(ErfTables {
        central: YearColumns::from_table(central, "year")?,
        pc05: YearColumns::from_table(pc05, "year")?,
        pc95: YearColumns::from_table(pc95, "year")?,
    })
}

pub const FEEDBACK_GENERATIONS: [&str; 2] = ["cmip5", "cmip6"];
const DROPPED_FEEDBACK_COLUMNS: [&str; 2] = ["models", "resid_fbk"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub generation: String,
    pub feedback: String,
    pub value: f64,
}

pub fn feedback_label(column: &str) -> &str {
    match column {
        "ALB_fbk" => "Surface Albedo",
        "NET_fbk" => "Net",
        "CLD_fbk" => "Cloud",
        "WVLR_fbk" => "Water Vapour + Lapse Rate",
        "PL_fbk" => "Planck",
        other => other,
    }
}

pub fn climate_feedbacks(source_id: &str, json: &Value) -> Result<Vec<FeedbackRecord>, ClimateError> {
    let parse_error = |message: String| ClimateError::Parse {
        source_id: source_id.to_string(),
        message,
    };

    let mut records = Vec::new();
    for generation in FEEDBACK_GENERATIONS {
        let columns = json
            .get(generation)
            .and_then(Value::as_object)
            .ok_or_else(|| parse_error(format!("missing object `{generation}`")))?;
        for (column, values) in columns {
            if DROPPED_FEEDBACK_COLUMNS.contains(&column.as_str()) {
                continue;
            }
            let values = values
                .as_array()
                .ok_or_else(|| parse_error(format!("`{generation}.{column}` is not an array")))?;
            for value in values {
                let value = match value {
                    Value::Null => f64::NAN,
                    other => other.as_f64().ok_or_else(|| {
                        parse_error(format!("`{generation}.{column}` holds non-numeric {other}"))
                    })?,
                };
                records.push(FeedbackRecord {
                    generation: generation.to_string(),
                    feedback: feedback_label(column).to_string(),
                    value,
                });
            }
        }
    }
    Ok(records)
}
