//! One-off expression evaluation

use crate::Status;
use anyhow::{Context, Result, bail};
use blockflow_core::{Decimal, Value, evaluate};
use std::collections::BTreeMap;
use std::str::FromStr;

pub fn run_eval_command(expression: &str, vars: &[String]) -> Result<Status> {
    let bindings = parse_bindings(vars)?;
    match evaluate(expression, &bindings) {
        Ok(value) => {
            println!("{value}");
            Ok(Status::Success)
        }
        Err(err) => {
            eprintln!("error: {err}");
            Ok(Status::Failed)
        }
    }
}

fn parse_bindings(vars: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut bindings = BTreeMap::new();
    for var in vars {
        let Some((name, raw)) = var.split_once('=') else {
            bail!("Invalid binding `{var}`: expected NAME=VALUE");
        };
        let value = parse_value(raw.trim())
            .with_context(|| format!("Invalid value for `{}`", name.trim()))?;
        bindings.insert(name.trim().to_string(), value);
    }
    Ok(bindings)
}

fn parse_value(raw: &str) -> Result<Value> {
    match raw {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Ok(Value::Decimal(
            Decimal::from_str(raw).with_context(|| format!("`{raw}` is not a decimal"))?,
        )),
    }
}
